//! libconfig bridge.
//!
//! Arrays and lists both become lists; 32-bit integers are widened to the
//! tree's 64-bit representation.

mod reader;

use tracing::trace;

use self::reader::Node;
use super::{checked_key, open_list, store, store_group};
use crate::cast::checked_cast;
use crate::config::Configuration;
use crate::error::{ConfigError, Result};

pub(crate) fn parse(text: &str) -> Result<Configuration> {
    let mut config = Configuration::new();
    for (name, node) in reader::read(text)? {
        handle_node(node, &mut config, checked_key(&name)?, false)?;
    }
    Ok(config)
}

fn handle_node(node: Node, config: &mut Configuration, fqn: &str, append: bool) -> Result<()> {
    trace!(%fqn, append, "visiting libconfig node");
    match node {
        Node::Boolean(b) => store(config, fqn, b, append),
        Node::Int(i) => {
            let widened = checked_cast::<i64, i32>(i)
                .map_err(|e| ConfigError::cast(format!("cannot widen '{fqn}'"), e))?;
            store(config, fqn, widened, append)
        }
        Node::Int64(i) => store(config, fqn, i, append),
        Node::Float(f) => store(config, fqn, f, append),
        Node::Str(s) => store(config, fqn, s, append),
        Node::Array(items) | Node::List(items) => {
            let list = open_list(config, fqn, append)?;
            for item in items {
                handle_node(item, config, &list, true)?;
            }
            Ok(())
        }
        Node::Group(settings) => {
            let mut group = Configuration::new();
            for (name, child) in settings {
                handle_node(child, &mut group, checked_key(&name)?, false)?;
            }
            store_group(config, fqn, group, append)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigType;
    use crate::error::ErrorKind;

    const DOCUMENT: &str = r#"
// Application settings
version = "1.0";

application:
{
  window:
  {
    title = "My Application";
    size = { w = 640; h = 480; };
    pos = { x = 350; y = 250; };
  };

  list = ( ( "abc", 123, true ), 1.234, ( /* an empty list */ ) );

  books = ( { title  = "Treasure Island";
              price  = 29.95;
              qty    = 5; },
            { title  = "Snow Crash";
              price  = 9.99;
              qty    = 8; } );

  misc:
  {
    pi = 3.141592654;
    bigint = 9223372036854775807L;
    columns = [ "Last Name", "First Name", "MI" ];
    bitmask = 0x1FC3;
    escaped = "\x46\x6f\x6f";
  };
};
"#;

    #[test]
    fn test_parse_document() {
        let config = parse(DOCUMENT).unwrap();

        assert_eq!(config.get_string("version").unwrap(), "1.0");
        assert_eq!(config.get_i32("application.window.size.w").unwrap(), 640);
        assert_eq!(config.get_string("application.list[0][0]").unwrap(), "abc");
        assert!(config.get_bool("application.list[0][2]").unwrap());
        assert_eq!(config.get_f64("application.list[1]").unwrap(), 1.234);
        assert_eq!(config.list_len("application.list[2]").unwrap(), 0);
        assert_eq!(config.get_string("application.books[1].title").unwrap(), "Snow Crash");
        assert_eq!(config.get_f64("application.books[0].price").unwrap(), 29.95);
        assert_eq!(config.get_i64("application.misc.bigint").unwrap(), i64::MAX);
        assert_eq!(
            config.get_string_list("application.misc.columns").unwrap(),
            vec!["Last Name", "First Name", "MI"]
        );
        assert_eq!(config.get_i32("application.misc.bitmask").unwrap(), 0x1FC3);
        assert_eq!(config.get_string("application.misc.escaped").unwrap(), "Foo");
        assert_eq!(config.type_of("application.books").unwrap(), ConfigType::List);
    }

    #[test]
    fn test_wildcard_names_are_rejected() {
        let err = parse("a* = 1;").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
