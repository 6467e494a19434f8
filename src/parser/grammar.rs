//! Parser turning template source into named trees
//!
//! The outer scanner splits the source into literal text runs and `{{ }}`
//! actions, honoring trim markers, comment actions and string literals
//! that contain `}}`. Action interiors are lexed with logos and parsed by
//! recursive descent. The result is a mapping from template name to root
//! list: the name passed by the caller keys the top-level body, and every
//! `define` block adds an entry of its own.

use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::parser::ast::{Branch, BranchTag, Command, Node, Pipe, TemplateCall};
use crate::parser::lexer::{self, Span, Token};

/// Parse template source into a mapping from template name to tree
///
/// No function-table validation is performed: an identifier in call
/// position may name a function unknown to any builtin table, which is
/// what allows rewriting to and from intentionally undeclared functions.
pub fn parse(name: &str, source: &str) -> Result<BTreeMap<String, Node>, ParseError> {
    let mut trees = BTreeMap::new();
    let root = Parser::new(source).parse_root(&mut trees)?;
    if trees.contains_key(name) {
        return Err(ParseError::new(
            format!("multiple definition of template {:?}", name),
            0..source.len(),
        ));
    }
    trees.insert(name.to_string(), root);
    Ok(trees)
}

/// How a template body stopped parsing
enum Term {
    Eof,
    End(Span),
    /// `{{else}}`, or `{{else if pipe}}` when a pipe is carried
    Else(Span, Option<Pipe>),
}

/// One scanned `{{ ... }}` window
struct ActionWindow {
    /// Body range with delimiters and trim markers stripped
    body: Span,
    trim_left: bool,
    trim_right: bool,
    /// Position just past the closing `}}`
    end: usize,
    comment: bool,
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Parser { source, pos: 0 }
    }

    fn parse_root(&mut self, trees: &mut BTreeMap<String, Node>) -> Result<Node, ParseError> {
        let (nodes, term) = self.parse_list(trees, true)?;
        match term {
            Term::Eof => Ok(Node::List(nodes)),
            Term::End(span) => Err(ParseError::new("unexpected {{end}}", span)),
            Term::Else(span, _) => Err(ParseError::new("unexpected {{else}}", span)),
        }
    }

    /// Parse sibling nodes until EOF or a terminating `{{end}}`/`{{else}}`
    fn parse_list(
        &mut self,
        trees: &mut BTreeMap<String, Node>,
        top: bool,
    ) -> Result<(Vec<Node>, Term), ParseError> {
        let mut nodes = Vec::new();
        loop {
            let Some(rel) = self.source[self.pos..].find("{{") else {
                let text = &self.source[self.pos..];
                if !text.is_empty() {
                    nodes.push(Node::Text(text.to_string()));
                }
                self.pos = self.source.len();
                return Ok((nodes, Term::Eof));
            };
            let open = self.pos + rel;
            let window = self.scan_action(open)?;

            let mut text = &self.source[self.pos..open];
            if window.trim_left {
                text = text.trim_end();
            }
            if !text.is_empty() {
                nodes.push(Node::Text(text.to_string()));
            }

            self.pos = window.end;
            if window.trim_right {
                let rest = &self.source[self.pos..];
                self.pos += rest.len() - rest.trim_start().len();
            }
            if window.comment {
                continue;
            }

            let action_span = open..window.end;
            let tokens = lexer::lex_action(&self.source[window.body.clone()], window.body.start)?;
            let Some((first, first_span)) = tokens.first() else {
                return Err(ParseError::new("missing value for command", action_span));
            };

            match first {
                Token::End => {
                    if tokens.len() > 1 {
                        return Err(ParseError::new(
                            "unexpected text after {{end}}",
                            tokens[1].1.clone(),
                        ));
                    }
                    return Ok((nodes, Term::End(action_span)));
                }
                Token::Else => {
                    let pipe = match tokens.get(1) {
                        None => None,
                        Some((Token::If, _)) => Some(parse_pipe(&tokens[2..], &action_span)?),
                        Some((_, span)) => {
                            return Err(ParseError::new(
                                "unexpected text after {{else}}",
                                span.clone(),
                            ));
                        }
                    };
                    return Ok((nodes, Term::Else(action_span, pipe)));
                }
                Token::If | Token::Range | Token::With => {
                    let tag = match first {
                        Token::Range => BranchTag::Range,
                        Token::With => BranchTag::With,
                        _ => BranchTag::If,
                    };
                    let pipe = parse_pipe(&tokens[1..], &action_span)?;
                    let branch = self.parse_branch(trees, tag, pipe, &action_span)?;
                    nodes.push(Node::Branch(branch));
                }
                Token::Template => {
                    let name = parse_name(&tokens[1..], "template", &action_span)?;
                    let pipe = if tokens.len() > 2 {
                        Some(parse_pipe(&tokens[2..], &action_span)?)
                    } else {
                        None
                    };
                    nodes.push(Node::Template(TemplateCall { name, pipe }));
                }
                Token::Define => {
                    if !top {
                        return Err(ParseError::new(
                            "template definitions are only allowed at the top level",
                            first_span.clone(),
                        ));
                    }
                    let name = parse_name(&tokens[1..], "define", &action_span)?;
                    if tokens.len() > 2 {
                        return Err(ParseError::new(
                            "unexpected text after define name",
                            tokens[2].1.clone(),
                        ));
                    }
                    let body = self.parse_defined_body(trees, &action_span)?;
                    self.insert_definition(trees, name, body, &action_span)?;
                }
                Token::Block => {
                    // A block is a define plus an inclusion of it in place.
                    let name = parse_name(&tokens[1..], "block", &action_span)?;
                    let pipe = parse_pipe(&tokens[2..], &action_span)?;
                    let body = self.parse_defined_body(trees, &action_span)?;
                    self.insert_definition(trees, name.clone(), body, &action_span)?;
                    nodes.push(Node::Template(TemplateCall {
                        name,
                        pipe: Some(pipe),
                    }));
                }
                _ => {
                    let pipe = parse_pipe(&tokens, &action_span)?;
                    nodes.push(Node::Action(pipe));
                }
            }
        }
    }

    /// Parse a branch body plus any else clauses, up to the shared end
    fn parse_branch(
        &mut self,
        trees: &mut BTreeMap<String, Node>,
        tag: BranchTag,
        pipe: Pipe,
        open_span: &Span,
    ) -> Result<Branch, ParseError> {
        let (list, term) = self.parse_list(trees, false)?;
        let else_list = match term {
            Term::End(_) => None,
            Term::Else(_, None) => {
                let (else_nodes, term) = self.parse_list(trees, false)?;
                match term {
                    Term::End(_) => Some(else_nodes),
                    Term::Else(span, _) => {
                        return Err(ParseError::new("unexpected {{else}}", span));
                    }
                    Term::Eof => return Err(self.unclosed(tag, open_span)),
                }
            }
            Term::Else(span, Some(else_pipe)) => {
                let inner = self.parse_branch(trees, BranchTag::If, else_pipe, &span)?;
                Some(vec![Node::Branch(inner)])
            }
            Term::Eof => return Err(self.unclosed(tag, open_span)),
        };
        Ok(Branch {
            tag,
            pipe,
            list,
            else_list,
        })
    }

    fn unclosed(&self, tag: BranchTag, open_span: &Span) -> ParseError {
        ParseError::new(
            format!("unclosed {{{{{}}}}}", tag.keyword()),
            open_span.clone(),
        )
    }

    /// Parse the body of a define or block, up to its end
    fn parse_defined_body(
        &mut self,
        trees: &mut BTreeMap<String, Node>,
        open_span: &Span,
    ) -> Result<Vec<Node>, ParseError> {
        let (body, term) = self.parse_list(trees, false)?;
        match term {
            Term::End(_) => Ok(body),
            Term::Else(span, _) => Err(ParseError::new("unexpected {{else}}", span)),
            Term::Eof => Err(ParseError::new("unclosed {{define}}", open_span.clone())),
        }
    }

    fn insert_definition(
        &self,
        trees: &mut BTreeMap<String, Node>,
        name: String,
        body: Vec<Node>,
        span: &Span,
    ) -> Result<(), ParseError> {
        if trees.contains_key(&name) {
            return Err(ParseError::new(
                format!("multiple definition of template {:?}", name),
                span.clone(),
            ));
        }
        trees.insert(name, Node::List(body));
        Ok(())
    }

    /// Scan the delimiters, trim markers and extent of the action at `open`
    fn scan_action(&self, open: usize) -> Result<ActionWindow, ParseError> {
        let source = self.source;
        let mut start = open + 2;
        let mut trim_left = false;
        if source[start..].starts_with('-')
            && source[start + 1..].starts_with(|c: char| c.is_whitespace())
        {
            trim_left = true;
            start += 1;
        }

        // Comment actions are scanned as a unit so their text cannot
        // confuse the string-aware delimiter search below.
        let lead = source[start..].trim_start();
        if lead.starts_with("/*") {
            return self.scan_comment(open, start + (source[start..].len() - lead.len()), trim_left);
        }

        let close = self.find_action_end(start, open)?;
        let mut body_end = close;
        let mut trim_right = false;
        let body = &source[start..close];
        if body.ends_with('-') && body[..body.len() - 1].ends_with(|c: char| c.is_whitespace()) {
            trim_right = true;
            body_end = close - 1;
        }
        Ok(ActionWindow {
            body: start..body_end,
            trim_left,
            trim_right,
            end: close + 2,
            comment: false,
        })
    }

    fn scan_comment(
        &self,
        open: usize,
        content_at: usize,
        trim_left: bool,
    ) -> Result<ActionWindow, ParseError> {
        let source = self.source;
        let Some(rel) = source[content_at..].find("*/") else {
            return Err(ParseError::new("unclosed comment", open..source.len()));
        };
        let after = content_at + rel + 2;
        let rest = &source[after..];
        if rest.starts_with("}}") {
            return Ok(ActionWindow {
                body: content_at..after,
                trim_left,
                trim_right: false,
                end: after + 2,
                comment: true,
            });
        }
        let trimmed = rest.trim_start();
        if trimmed.len() < rest.len() && trimmed.starts_with("-}}") {
            let end = after + (rest.len() - trimmed.len()) + 3;
            return Ok(ActionWindow {
                body: content_at..after,
                trim_left,
                trim_right: true,
                end,
                comment: true,
            });
        }
        Err(ParseError::new(
            "comment must end right before closing delimiter",
            open..after,
        ))
    }

    /// Find the `}}` closing the action whose body starts at `start`,
    /// skipping over string literals
    fn find_action_end(&self, start: usize, open: usize) -> Result<usize, ParseError> {
        let bytes = self.source.as_bytes();
        let len = bytes.len();
        let mut i = start;
        while i < len {
            match bytes[i] {
                quote @ (b'"' | b'\'') => {
                    i += 1;
                    while i < len && bytes[i] != quote {
                        if bytes[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                    if i >= len {
                        return Err(ParseError::new("unterminated string literal", open..len));
                    }
                    i += 1;
                }
                b'`' => {
                    i += 1;
                    while i < len && bytes[i] != b'`' {
                        i += 1;
                    }
                    if i >= len {
                        return Err(ParseError::new("unterminated raw string literal", open..len));
                    }
                    i += 1;
                }
                b'}' if i + 1 < len && bytes[i + 1] == b'}' => return Ok(i),
                _ => i += 1,
            }
        }
        Err(ParseError::new("unclosed action", open..len))
    }
}

/// Parse a pipeline from the tokens of one action
fn parse_pipe(tokens: &[(Token, Span)], at: &Span) -> Result<Pipe, ParseError> {
    let mut decls = Vec::new();
    let mut is_assign = false;
    let mut rest = tokens;

    // Leading `$a :=` / `$a, $b :=` declarations
    {
        let mut i = 0;
        let mut vars = Vec::new();
        let mut found = false;
        loop {
            let Some((Token::Variable(name), _)) = rest.get(i) else {
                break;
            };
            vars.push(name.clone());
            i += 1;
            match rest.get(i) {
                Some((Token::Comma, _)) => i += 1,
                Some((Token::Declare, _)) => {
                    found = true;
                    i += 1;
                    break;
                }
                Some((Token::Assign, _)) => {
                    found = true;
                    is_assign = true;
                    i += 1;
                    break;
                }
                _ => break,
            }
        }
        if found {
            decls = vars;
            rest = &rest[i..];
        }
    }

    // Split commands on top-level `|`
    let mut cmds = Vec::new();
    let mut depth = 0usize;
    let mut seg_start = 0;
    for (i, (token, span)) in rest.iter().enumerate() {
        match token {
            Token::ParenOpen => depth += 1,
            Token::ParenClose => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| ParseError::new("unexpected ')'", span.clone()))?;
            }
            Token::Pipe if depth == 0 => {
                cmds.push(parse_command(&rest[seg_start..i], at)?);
                seg_start = i + 1;
            }
            _ => {}
        }
    }
    if depth > 0 {
        return Err(ParseError::new("unclosed '('", at.clone()));
    }
    cmds.push(parse_command(&rest[seg_start..], at)?);

    Ok(Pipe {
        decls,
        is_assign,
        cmds,
    })
}

/// Parse one command: a sequence of argument nodes
fn parse_command(tokens: &[(Token, Span)], at: &Span) -> Result<Command, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::new("missing value for command", at.clone()));
    }
    let mut args = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let (token, span) = &tokens[i];
        let arg = match token {
            Token::Ident(name) => {
                if let Some((Token::Field(_), next)) = tokens.get(i + 1) {
                    if next.start == span.end {
                        return Err(ParseError::new(
                            "unexpected '.' after function name",
                            next.clone(),
                        ));
                    }
                }
                Node::Identifier(name.clone())
            }
            Token::Field(text) => Node::Field(split_field(text)),
            Token::Variable(name) => {
                // `$x.Foo` lexes as a variable plus an adjacent field
                if let Some((Token::Field(field), next)) = tokens.get(i + 1) {
                    if next.start == span.end {
                        i += 1;
                        Node::Variable(format!("{}{}", name, field))
                    } else {
                        Node::Variable(name.clone())
                    }
                } else {
                    Node::Variable(name.clone())
                }
            }
            Token::Str(raw) => Node::Str(raw.clone()),
            Token::Number(raw) => Node::Number(raw.clone()),
            Token::True => Node::Bool(true),
            Token::False => Node::Bool(false),
            Token::Dot => Node::Dot,
            Token::Nil => Node::Nil,
            Token::ParenOpen => {
                let mut depth = 1usize;
                let mut j = i + 1;
                while j < tokens.len() {
                    match tokens[j].0 {
                        Token::ParenOpen => depth += 1,
                        Token::ParenClose => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    j += 1;
                }
                if depth != 0 {
                    return Err(ParseError::new("unclosed '('", span.clone()));
                }
                let inner = parse_pipe(&tokens[i + 1..j], span)?;
                i = j;
                Node::Pipe(inner)
            }
            other => {
                return Err(ParseError::new(
                    format!("unexpected {} in command", describe(other)),
                    span.clone(),
                ));
            }
        };
        args.push(arg);
        i += 1;
    }
    Ok(Command { args })
}

/// Expect a quoted name, as after `template`, `define` or `block`
fn parse_name(tokens: &[(Token, Span)], what: &str, at: &Span) -> Result<String, ParseError> {
    match tokens.first() {
        Some((Token::Str(raw), span)) => unquote(raw, span),
        Some((other, span)) => Err(ParseError::new(
            format!("expected quoted {} name, found {}", what, describe(other)),
            span.clone(),
        )),
        None => Err(ParseError::new(
            format!("expected quoted {} name", what),
            at.clone(),
        )),
    }
}

/// Resolve a quoted or raw string literal to its text
fn unquote(raw: &str, span: &Span) -> Result<String, ParseError> {
    if let Some(inner) = raw.strip_prefix('`') {
        return Ok(inner.trim_end_matches('`').to_string());
    }
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    else {
        return Err(ParseError::new(
            "template name must be a quoted string",
            span.clone(),
        ));
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(escaped) => out.push(escaped),
            None => break,
        }
    }
    Ok(out)
}

fn split_field(text: &str) -> Vec<String> {
    text.split('.').skip(1).map(str::to_string).collect()
}

/// Describe a token for error messages
fn describe(token: &Token) -> String {
    match token {
        Token::Ident(name) => format!("identifier '{}'", name),
        Token::Field(text) => format!("field '{}'", text),
        Token::Variable(name) => format!("variable '{}'", name),
        Token::Str(raw) => format!("string {}", raw),
        Token::Number(raw) => format!("number {}", raw),
        Token::If => "keyword 'if'".to_string(),
        Token::Else => "keyword 'else'".to_string(),
        Token::End => "keyword 'end'".to_string(),
        Token::Range => "keyword 'range'".to_string(),
        Token::With => "keyword 'with'".to_string(),
        Token::Template => "keyword 'template'".to_string(),
        Token::Define => "keyword 'define'".to_string(),
        Token::Block => "keyword 'block'".to_string(),
        Token::Nil => "'nil'".to_string(),
        Token::True => "'true'".to_string(),
        Token::False => "'false'".to_string(),
        Token::Declare => "':='".to_string(),
        Token::Assign => "'='".to_string(),
        Token::Pipe => "'|'".to_string(),
        Token::Comma => "','".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::Dot => "'.'".to_string(),
    }
}
