//! Lexer: tokenises DSL source text into a flat, position-tagged token stream.

use crate::{error::Error, span::Span};
use pest::Parser;

#[allow(clippy::empty_docs)]
mod derived {
    use pest_derive::Parser;

    #[derive(Parser)]
    #[grammar = "mamegen.pest"]
    pub(super) struct Tokenizer;
}

pub(crate) use derived::Rule;
use derived::Tokenizer;

/// The kind of a single lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// A bare identifier (`[A-Za-z_][A-Za-z0-9_]*`), used for keywords and unquoted names alike.
    Identifier,
    /// A single- or double-quoted string literal.
    String,
    /// A decimal integer literal.
    Integer,
    /// A decimal floating-point literal.
    Float,
    /// One of the forbidden bare symbols `:` or `=`.
    Symbol,
    /// A line break, significant for the "one rule per line" restriction.
    Newline,
    /// `{`
    OpenBrace,
    /// `}`
    CloseBrace,
    /// `[`
    OpenBracket,
    /// `]`
    CloseBracket,
    /// `..`
    RangeDots,
    /// `,`
    Comma,
    /// The end of the source text.
    Eof,
}

/// A single token, with its original text and source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: Kind,
    /// The raw source text of the token (quotes included for strings).
    pub text: String,
    /// Where in the source this token starts.
    pub span: Span,
}

impl Token {
    /// Returns the string content of a `string` token with its surrounding quotes stripped.
    ///
    /// # Panics
    ///
    /// Panics if this token is not a `String` token.
    pub fn unquoted(&self) -> &str {
        assert_eq!(self.kind, Kind::String);
        &self.text[1..self.text.len() - 1]
    }
}

fn kind_of(rule: Rule) -> Option<Kind> {
    Some(match rule {
        Rule::ident => Kind::Identifier,
        Rule::string => Kind::String,
        Rule::integer => Kind::Integer,
        Rule::float => Kind::Float,
        Rule::symbol => Kind::Symbol,
        Rule::newline => Kind::Newline,
        Rule::open_brace => Kind::OpenBrace,
        Rule::close_brace => Kind::CloseBrace,
        Rule::open_bracket => Kind::OpenBracket,
        Rule::close_bracket => Kind::CloseBracket,
        Rule::range_dots => Kind::RangeDots,
        Rule::comma => Kind::Comma,
        Rule::token_stream | Rule::EOI | Rule::WHITESPACE | Rule::token => return None,
    })
}

/// Tokenises `input` into a flat stream, terminated with a single `Eof` token.
pub fn tokenize(input: &str) -> Result<Vec<Token>, Error> {
    let pairs = Tokenizer::parse(Rule::token_stream, input)?;
    let mut tokens = Vec::new();
    for pair in pairs.flatten() {
        let Some(kind) = kind_of(pair.as_rule()) else { continue };
        let (line, column) = pair.as_span().start_pos().line_col();
        tokens.push(Token {
            kind,
            text: pair.as_str().to_owned(),
            span: Span::new(line, column),
        });
    }
    let eof_span = tokens.last().map_or_else(Span::default, |t| t.span);
    tokens.push(Token {
        kind: Kind::Eof,
        text: String::new(),
        span: eof_span,
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_rule_line() {
        let tokens = tokenize("seq 1..10 digits 3\n").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                Kind::Identifier,
                Kind::Integer,
                Kind::RangeDots,
                Kind::Integer,
                Kind::Identifier,
                Kind::Integer,
                Kind::Newline,
                Kind::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_float_from_integer() {
        let tokens = tokenize("1 1.5 -2 -2.5").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![Kind::Integer, Kind::Float, Kind::Integer, Kind::Float, Kind::Eof]
        );
    }

    #[test]
    fn reads_quoted_strings_either_way() {
        let tokens = tokenize(r#""hello" 'world'"#).unwrap();
        assert_eq!(tokens[0].unquoted(), "hello");
        assert_eq!(tokens[1].unquoted(), "world");
    }

    #[test]
    fn flags_forbidden_symbols_as_tokens() {
        let tokens = tokenize("type: CSV").unwrap();
        assert_eq!(tokens[0].kind, Kind::Identifier);
        assert_eq!(tokens[1].kind, Kind::Symbol);
        assert_eq!(tokens[1].text, ":");
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(tokenize("\"unterminated").is_err());
    }
}
