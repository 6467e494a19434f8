//! gtfmt - formatter and rewrite tool for Go-style templates
//!
//! This library canonicalizes the code inside `{{ }}` template actions
//! without touching surrounding literal text, and performs syntax-aware
//! renaming of function identifiers and dotted field paths.
//!
//! # Example
//!
//! ```rust
//! let out = gtfmt::format("tpl", "{{  index   \"index\"   \"d\"  }}").unwrap();
//! assert_eq!(out, "{{index \"index\" \"d\"}}");
//!
//! let out = gtfmt::fix("tpl", "{{index .A}}", "index", "strings.Index").unwrap();
//! assert_eq!(out, "{{strings.Index .A}}");
//! ```

pub mod error;
pub mod parser;
pub mod rewrite;

pub use error::ParseError;
pub use parser::{parse, Node};
pub use rewrite::Rule;

use thiserror::Error;

/// Errors surfaced by [`format`], [`formatted`] and [`fix`]
#[derive(Debug, Error)]
pub enum Error {
    /// The source does not conform to the template grammar
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The source defines more than one named template unit, which this
    /// tool deliberately does not handle
    #[error("sub templates not currently supported")]
    SubTemplates,
}

/// Parse `source`, requiring it to hold exactly one named template
fn single_tree(name: &str, source: &str) -> Result<Node, Error> {
    let trees = parser::parse(name, source)?;
    if trees.len() != 1 {
        return Err(Error::SubTemplates);
    }
    trees.into_values().next().ok_or(Error::SubTemplates)
}

/// Format the code inside template actions without changing any other
/// surrounding text
pub fn format(name: &str, source: &str) -> Result<String, Error> {
    Ok(single_tree(name, source)?.to_string())
}

/// Report whether the template is already canonically formatted
pub fn formatted(name: &str, source: &str) -> Result<bool, Error> {
    Ok(single_tree(name, source)?.to_string() == source)
}

/// Replace `orig` with `repl` throughout the template
///
/// `orig` must be a function name or a `.` path (e.g. `.Foo.Bar`); a
/// leading `.` selects path mode. The result is rendered canonically, so
/// callers can compare it against `source` to detect whether anything
/// changed.
pub fn fix(name: &str, source: &str, orig: &str, repl: &str) -> Result<String, Error> {
    let mut tree = single_tree(name, source)?;
    rewrite::rewrite(&mut tree, &Rule::new(orig, repl));
    Ok(tree.to_string())
}
