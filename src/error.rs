//! Error types for the `mamegen` library.

use crate::span::Span;
use std::path::PathBuf;
use thiserror::Error as ThisError;

/// Errors produced by the `mamegen` library.
#[derive(ThisError, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A lexical or syntactic violation: forbidden symbol, multiple rules on one line, an open
    /// range, an unquoted reference label, or stray tokens after a rule's arguments.
    #[error("syntax error at {span}: {message}")]
    Syntax {
        /// Human-readable description of the violation.
        message: String,
        /// Where in the source the violation was found.
        span: Span,
    },

    /// A rule, selector, or config value is syntactically well-formed but semantically invalid
    /// (inverted label range, missing `output`, out-of-range probability, duplicate class, ...).
    #[error("invalid rule: {0}")]
    InvalidRule(String),

    /// A selector or value-producing rule names a header column that does not exist.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    /// A `reference` rule names a table that was never defined.
    #[error("unknown reference table '{0}'")]
    UnknownReference(String),

    /// An unrecoverable state reached while generating rows, such as an empty reverse lookup
    /// colliding with `allow_null=false`, or a `seq` configured with an empty interval.
    #[error("generation error: {0}")]
    Generation(String),

    /// Invalid regular expression in a `regex` rule.
    #[error("invalid regex")]
    InvalidRegex(#[from] rand_regex::Error),

    /// Generic I/O error, annotated with the action and path that failed.
    #[error("failed to {action} at {}", path.display())]
    Io {
        /// Action causing the error.
        action: &'static str,
        /// File path causing the I/O error.
        path: PathBuf,
        /// Source of error.
        #[source]
        source: std::io::Error,
    },
}

impl From<pest::error::Error<crate::token::Rule>> for Error {
    fn from(e: pest::error::Error<crate::token::Rule>) -> Self {
        let (line, column) = match e.line_col {
            pest::error::LineColLocation::Pos(pos) => pos,
            pest::error::LineColLocation::Span(start, _) => start,
        };
        Self::Syntax {
            message: e.variant.message().into_owned(),
            span: Span::new(line, column),
        }
    }
}

impl From<regex_syntax::Error> for Error {
    fn from(e: regex_syntax::Error) -> Self {
        Self::InvalidRegex(e.into())
    }
}
