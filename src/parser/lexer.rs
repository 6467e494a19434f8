//! Lexer for template action interiors using logos
//!
//! Only the text between `{{` and `}}` is lexed; literal text outside the
//! delimiters never reaches the lexer. Literal tokens (strings, numbers)
//! keep their raw source text so rendering reproduces them verbatim.

use logos::Logos;

use crate::error::ParseError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Control keywords
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("end")]
    End,
    #[token("range")]
    Range,
    #[token("with")]
    With,
    #[token("template")]
    Template,
    #[token("define")]
    Define,
    #[token("block")]
    Block,

    // Literal keywords
    #[token("nil")]
    Nil,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // Operators (longer patterns first)
    #[token(":=")]
    Declare,
    #[token("=")]
    Assign,
    #[token("|")]
    Pipe,
    #[token(",")]
    Comma,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(".")]
    Dot,

    // A `$` reference; the bare `$` names the root context
    #[regex(r"\$[a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Variable(String),

    // A dotted path like `.Foo.Bar`
    #[regex(r"(\.[a-zA-Z_][a-zA-Z0-9_]*)+", |lex| lex.slice().to_string())]
    Field(String),

    // Identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    // String literals, raw text kept including the quotes
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice().to_string())]
    #[regex(r"`[^`]*`", |lex| lex.slice().to_string())]
    #[regex(r"'([^'\\]|\\.)*'", |lex| lex.slice().to_string())]
    Str(String),

    // Number literals, raw text kept
    #[regex(
        r"[+-]?(0[xX][0-9a-fA-F]+|[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?|\.[0-9]+)",
        |lex| lex.slice().to_string()
    )]
    Number(String),
}

/// Lex one action body into tokens with spans offset into the full source
pub fn lex_action(body: &str, offset: usize) -> Result<Vec<(Token, Span)>, ParseError> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(body).spanned() {
        match result {
            Ok(token) => tokens.push((token, offset + span.start..offset + span.end)),
            Err(()) => {
                return Err(ParseError::new(
                    format!("unrecognized character {:?} in action", &body[span.clone()]),
                    offset + span.start..offset + span.end,
                ));
            }
        }
    }
    Ok(tokens)
}
