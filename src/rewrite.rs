//! In-place renaming of functions and field paths in a parsed tree
//!
//! A rule is selected once per call: a pattern starting with `.` renames
//! dotted field paths, anything else renames function identifiers. Both
//! share one walk; they differ only in which node kind they touch and how
//! equality is computed.

use crate::parser::ast::{Node, Pipe};

/// A single rename rule
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Rename identifiers whose name equals `orig` exactly
    Function { orig: String, repl: String },
    /// Replace a contiguous run of path segments; both sides are stored
    /// with a trailing dot so matches land on segment boundaries
    Path { pattern: String, repl: String },
}

impl Rule {
    /// Build a rule from a rewrite pair; a leading `.` on `orig` selects
    /// path mode
    pub fn new(orig: &str, repl: &str) -> Self {
        if !orig.starts_with('.') {
            return Rule::Function {
                orig: orig.to_string(),
                repl: repl.to_string(),
            };
        }
        let mut pattern = orig.to_string();
        if !pattern.ends_with('.') {
            pattern.push('.');
        }
        let mut repl = repl.to_string();
        if !repl.ends_with('.') {
            repl.push('.');
        }
        Rule::Path { pattern, repl }
    }
}

/// Apply `rule` to every eligible node reachable from `tree`, mutating in
/// place
///
/// Depth-first, pre-order: branches walk their controlling pipe before
/// their body so a path in a `range`/`with` expression is eligible too.
/// Exactly one substitution is applied per matching field node; there is
/// no fixpoint iteration.
pub fn rewrite(tree: &mut Node, rule: &Rule) {
    walk(tree, rule);
}

fn walk(node: &mut Node, rule: &Rule) {
    match node {
        Node::List(nodes) => {
            for node in nodes {
                walk(node, rule);
            }
        }
        Node::Action(pipe) | Node::Pipe(pipe) => walk_pipe(pipe, rule),
        Node::Branch(branch) => {
            walk_pipe(&mut branch.pipe, rule);
            for node in &mut branch.list {
                walk(node, rule);
            }
            if let Some(else_list) = &mut branch.else_list {
                for node in else_list {
                    walk(node, rule);
                }
            }
        }
        Node::Template(call) => {
            if let Some(pipe) = &mut call.pipe {
                walk_pipe(pipe, rule);
            }
        }
        Node::Identifier(name) => {
            if let Rule::Function { orig, repl } = rule {
                if name == orig {
                    *name = repl.clone();
                }
            }
        }
        Node::Field(segments) => {
            if let Rule::Path { pattern, repl } = rule {
                let canonical = format!(".{}.", segments.join("."));
                if canonical.contains(pattern.as_str()) {
                    let replaced = canonical.replacen(pattern.as_str(), repl, 1);
                    *segments = replaced
                        .trim_matches('.')
                        .split('.')
                        .map(str::to_string)
                        .collect();
                }
            }
        }
        Node::Text(_)
        | Node::Variable(_)
        | Node::Str(_)
        | Node::Number(_)
        | Node::Bool(_)
        | Node::Dot
        | Node::Nil => {}
    }
}

fn walk_pipe(pipe: &mut Pipe, rule: &Rule) {
    // Declared variable names are not rewrite targets.
    for cmd in &mut pipe.cmds {
        for arg in &mut cmd.args {
            walk(arg, rule);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn apply(source: &str, orig: &str, repl: &str) -> String {
        let mut trees = parser::parse("tpl", source).expect("should parse");
        let mut tree = trees.remove("tpl").expect("root tree");
        rewrite(&mut tree, &Rule::new(orig, repl));
        tree.to_string()
    }

    #[test]
    fn test_function_rename_exact_match_only() {
        // The string literal "index" and the field segment named index
        // must remain untouched.
        assert_eq!(
            apply(r#"{{index "index" .index.Foo}}"#, "index", "strings.Index"),
            r#"{{strings.Index "index" .index.Foo}}"#
        );
    }

    #[test]
    fn test_function_rename_no_partial_match() {
        assert_eq!(apply("{{indexOf .A}}", "index", "find"), "{{indexOf .A}}");
    }

    #[test]
    fn test_path_rename_full_path() {
        assert_eq!(
            apply(r#"{{.Foo.Bar ".Foo.Bar"}}"#, ".Foo.Bar", ".Foo.Baz"),
            r#"{{.Foo.Baz ".Foo.Bar"}}"#
        );
    }

    #[test]
    fn test_path_rename_segment_boundary() {
        // `.Foo.Barn` shares a textual prefix with `.Foo.Bar` but not a
        // segment boundary.
        assert_eq!(
            apply("{{.Foo.Barn}}", ".Foo.Bar", ".Foo.Baz"),
            "{{.Foo.Barn}}"
        );
    }

    #[test]
    fn test_path_rename_interior_run() {
        assert_eq!(
            apply("{{.Index.Foo.Bar}}", ".Foo", ".Foo.Baz"),
            "{{.Index.Foo.Baz.Bar}}"
        );
    }

    #[test]
    fn test_path_rename_single_substitution() {
        // One substitution per node: the second occurrence stays.
        assert_eq!(apply("{{.A.X.A}}", ".A", ".B"), "{{.B.X.A}}");
    }

    #[test]
    fn test_rewrite_reaches_controlling_pipe() {
        assert_eq!(
            apply("{{range .Items}}{{.Name}}{{end}}", ".Items", ".Rows"),
            "{{range .Rows}}{{.Name}}{{end}}"
        );
    }

    #[test]
    fn test_rewrite_reaches_else_list() {
        assert_eq!(
            apply("{{if .A}}{{foo}}{{else}}{{foo}}{{end}}", "foo", "bar"),
            "{{if .A}}{{bar}}{{else}}{{bar}}{{end}}"
        );
    }

    #[test]
    fn test_rewrite_reaches_template_argument() {
        assert_eq!(
            apply(r#"{{template "x" .Old}}"#, ".Old", ".New"),
            r#"{{template "x" .New}}"#
        );
    }

    #[test]
    fn test_rewrite_reaches_parenthesized_pipeline() {
        assert_eq!(
            apply("{{not (eq .Old 1)}}", ".Old", ".New"),
            "{{not (eq .New 1)}}"
        );
    }

    #[test]
    fn test_declared_variables_untouched() {
        assert_eq!(
            apply("{{range $v := .Items}}{{$v}}{{end}}", "v", "w"),
            "{{range $v := .Items}}{{$v}}{{end}}"
        );
    }

    #[test]
    fn test_variable_references_untouched_by_path_rule() {
        assert_eq!(apply("{{$x.Foo}}", ".Foo", ".Bar"), "{{$x.Foo}}");
    }

    #[test]
    fn test_function_rule_ignores_fields() {
        assert_eq!(apply("{{.Foo}}", "Foo", "Bar"), "{{.Foo}}");
    }

    #[test]
    fn test_noop_rule_leaves_tree_unchanged() {
        let canonical = "{{if .Ok}}{{len .Items}}{{end}}";
        assert_eq!(apply(canonical, "missing", "other"), canonical);
        assert_eq!(apply(canonical, ".Missing", ".Other"), canonical);
    }

    #[test]
    fn test_rule_selection() {
        assert_eq!(
            Rule::new("foo", "bar"),
            Rule::Function {
                orig: "foo".to_string(),
                repl: "bar".to_string(),
            }
        );
        assert_eq!(
            Rule::new(".Foo.Bar", ".Foo.Baz"),
            Rule::Path {
                pattern: ".Foo.Bar.".to_string(),
                repl: ".Foo.Baz.".to_string(),
            }
        );
    }
}
