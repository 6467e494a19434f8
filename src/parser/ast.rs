//! Syntax tree for template source, with canonical rendering
//!
//! The `Display` impls define the one true textual form of a parsed tree:
//! no padding inside `{{ }}` delimiters, single spaces between command
//! arguments, ` | ` between pipeline stages. Literal text outside actions
//! is reproduced byte for byte. Rendering a tree and comparing against the
//! original source is how both "already formatted" and "rewrite changed
//! nothing" are decided.

use std::fmt;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Control keyword of a branch construct
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchTag {
    If,
    Range,
    With,
}

impl BranchTag {
    pub fn keyword(self) -> &'static str {
        match self {
            BranchTag::If => "if",
            BranchTag::Range => "range",
            BranchTag::With => "with",
        }
    }
}

/// A pipeline: optional variable declarations followed by one or more
/// commands chained with `|`
#[derive(Debug, Clone, PartialEq)]
pub struct Pipe {
    /// Declared variable names including the `$`, e.g. `["$i", "$v"]`
    pub decls: Vec<String>,
    /// `$v = x` assignment rather than `$v := x` declaration
    pub is_assign: bool,
    pub cmds: Vec<Command>,
}

/// One function or value application within a pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub args: Vec<Node>,
}

/// Shared shape of `if`, `range` and `with` constructs
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub tag: BranchTag,
    pub pipe: Pipe,
    pub list: Vec<Node>,
    /// Present only when the source had an `else` clause
    pub else_list: Option<Vec<Node>>,
}

/// Inclusion of a named sub-template, with an optional argument pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateCall {
    pub name: String,
    pub pipe: Option<Pipe>,
}

/// A node in the template tree
///
/// The set is closed: the rewrite walk matches on it exhaustively, so a
/// new kind cannot be added without deciding how the walk treats it.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Sequence of sibling nodes (a template body)
    List(Vec<Node>),
    /// Literal text outside `{{ }}` delimiters, kept verbatim
    Text(String),
    /// A `{{ ... }}` unit with no control keyword
    Action(Pipe),
    Branch(Branch),
    Template(TemplateCall),
    /// A parenthesized pipeline in argument position
    Pipe(Pipe),
    /// A bare function name reference
    Identifier(String),
    /// A dotted context path; segments carry no dots and no leading empty
    /// entry for the leading dot
    Field(Vec<String>),
    /// A `$name` reference, stored with the `$` (and any field suffix)
    Variable(String),
    /// A string literal, raw source text including quotes
    Str(String),
    /// A number literal, raw source text
    Number(String),
    Bool(bool),
    /// The bare `.`
    Dot,
    Nil,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::List(nodes) => {
                for node in nodes {
                    write!(f, "{}", node)?;
                }
                Ok(())
            }
            Node::Text(text) => f.write_str(text),
            Node::Action(pipe) => write!(f, "{{{{{}}}}}", pipe),
            Node::Branch(branch) => write!(f, "{}", branch),
            Node::Template(call) => match &call.pipe {
                Some(pipe) => write!(f, "{{{{template {:?} {}}}}}", call.name, pipe),
                None => write!(f, "{{{{template {:?}}}}}", call.name),
            },
            Node::Pipe(pipe) => write!(f, "({})", pipe),
            Node::Identifier(name) => f.write_str(name),
            Node::Field(segments) => {
                for segment in segments {
                    write!(f, ".{}", segment)?;
                }
                Ok(())
            }
            Node::Variable(name) => f.write_str(name),
            Node::Str(raw) | Node::Number(raw) => f.write_str(raw),
            Node::Bool(value) => f.write_str(if *value { "true" } else { "false" }),
            Node::Dot => f.write_str("."),
            Node::Nil => f.write_str("nil"),
        }
    }
}

impl fmt::Display for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.decls.is_empty() {
            f.write_str(&self.decls.join(", "))?;
            f.write_str(if self.is_assign { " = " } else { " := " })?;
        }
        for (i, cmd) in self.cmds.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", cmd)?;
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", arg)?;
        }
        Ok(())
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{} {}}}}}", self.tag.keyword(), self.pipe)?;
        for node in &self.list {
            write!(f, "{}", node)?;
        }
        // An else holding exactly one if renders as an `else if` chain
        // sharing the outer end.
        let mut else_list = self.else_list.as_deref();
        while let Some(list) = else_list {
            if let [Node::Branch(inner)] = list {
                if inner.tag == BranchTag::If {
                    write!(f, "{{{{else if {}}}}}", inner.pipe)?;
                    for node in &inner.list {
                        write!(f, "{}", node)?;
                    }
                    else_list = inner.else_list.as_deref();
                    continue;
                }
            }
            f.write_str("{{else}}")?;
            for node in list {
                write!(f, "{}", node)?;
            }
            else_list = None;
        }
        f.write_str("{{end}}")
    }
}
