//! The concrete section tree produced by the parser, before selector resolution, class
//! expansion, and rule flattening (all performed by the analyser).

use crate::span::S;

/// A raw configuration value, as written in a `CONFIG` body.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// An identifier used as a bare word, e.g. `CSV` or `true`.
    Ident(String),
    /// An integer literal.
    Int(i64),
    /// A quoted string literal.
    Str(String),
}

/// A reference-table cell value, as written in a `REFERENCE` body.
#[derive(Debug, Clone, PartialEq)]
pub enum RefValue {
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
    /// A string.
    Str(String),
}

/// A column selector, as written at the start of a `COLUMN_RULES` block.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// `INDEX n`
    Index(i64),
    /// `INDICES a..b`
    IndexRange(i64, i64),
    /// `INDICES [n, ...]`
    IndexList(Vec<i64>),
    /// `LABEL "s"`
    Label(String),
    /// `LABELS "s1".."s2"`
    LabelRange(String, String),
    /// `LABELS ["s", ...]`
    LabelList(Vec<String>),
}

/// A single scalar literal used as a rule operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
    /// A string.
    Str(String),
}

/// The kind of character set a `charset` rule draws from.
#[derive(Debug, Clone, PartialEq)]
pub enum CharsetKind {
    /// `[A-Za-z]`
    Alphabet,
    /// `[A-Za-z0-9]`
    Alnum,
    /// `[0-9]`
    Digits,
    /// A literal set of characters given as a quoted string.
    Literal(String),
}

/// Which side of a reference row a reference-bearing column emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSide {
    /// Emit the row's label.
    Label,
    /// Emit the row's value.
    Value,
}

/// Whether a reverse lookup names its source column explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSource {
    /// `value_source` with no argument: scan leftward for the nearest `output label` column
    /// sharing the same reference key.
    Implicit,
    /// `value_source <col>`: read the named column's already-emitted cell.
    Explicit(String),
}

/// A single rule-body entry, as written inside a `{ ... }` block, one per source line.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleForm {
    /// `seq start..end`
    Seq(i64, i64),
    /// `digits n`
    Digits(u32),
    /// `step k`
    Step(i64),
    /// `charset <kind>`
    Charset(CharsetKind),
    /// `length n`
    Length(u32),
    /// `enum [v, ...]`
    Enum(Vec<Literal>),
    /// `fixed v`
    Fixed(Literal),
    /// `range lo..hi`
    Range(Literal, Literal),
    /// `date_range "d1".."d2"` with an optional explicit format string.
    DateRange(String, String, Option<String>),
    /// `datetime`
    Datetime,
    /// `copy col`
    Copy(String),
    /// `join "sep" [col, ...]`
    Join(String, Vec<String>),
    /// `regex "pattern"`
    Regex(String),
    /// `reference "key"`
    Reference(String),
    /// `output label|value`
    Output(OutputSide),
    /// `value_source` / `value_source col`
    ValueSource(ValueSource),
    /// `allow_null bool`
    AllowNull(bool),
    /// `null_probability p`
    NullProbability(f64),
    /// `class "name"`
    Class(String),
}

/// A top-level section of the DSL program.
#[derive(Debug, Clone)]
pub enum Section {
    /// `CONFIG { key value ... }`
    Config(Vec<(String, ConfigValue)>),
    /// `HEADER { ["a", "b", ...] }`
    Header(Vec<String>),
    /// `REFERENCE "name" { "label" value ... }`
    Reference { name: String, rows: Vec<(String, RefValue)> },
    /// `CLASS "name" { <rule body> }`
    Class { name: String, body: Vec<S<RuleForm>> },
    /// `COLUMN_RULES { <selector> { <rule body> } ... }`
    ColumnRules(Vec<(S<Selector>, Vec<S<RuleForm>>)>),
}
