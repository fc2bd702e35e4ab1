//! The resolved program: the output of the analyser, ready for generation.
//!
//! Unlike the concrete [`crate::ast`] tree, every rule here is flattened into a single
//! struct-of-`Option`s per column, with later rule forms in source order overriding earlier
//! ones for the same field ("last writer wins").

use crate::ast::{CharsetKind, Literal};

/// The output format chosen for generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Comma-separated values, one record per line.
    Csv,
    /// An array of JSON objects, keyed by header label.
    Json,
}

/// Resolved `CONFIG` values, merged across all `CONFIG` sections (last writer wins).
#[derive(Debug, Clone)]
pub struct Config {
    /// Output format. May be overridden by the output path's extension at the CLI boundary.
    pub format: OutputFormat,
    /// Number of records to generate.
    pub count: u64,
    /// Whether generation uses a fixed seed, for byte-identical repeated runs.
    pub reproducible: bool,
    /// Output character encoding label (e.g. `utf-8`, `shift_jis`), resolved via `encoding_rs`.
    pub encoding: String,
    /// Whether the CSV writer emits a header row, and the JSON writer emits objects (`true`) or
    /// bare arrays (`false`).
    pub with_header: bool,
    /// Whether CSV data cells are quoted even when not strictly necessary.
    pub quote_strings: bool,
    /// Whether the CSV header row is quoted even when not strictly necessary.
    pub quote_header: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: OutputFormat::Csv,
            count: 0,
            reproducible: false,
            encoding: "utf-8".to_owned(),
            with_header: true,
            quote_strings: false,
            quote_header: false,
        }
    }
}

/// Which side of a reference row a column emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSide {
    /// Emit the row's label.
    Label,
    /// Emit the row's value.
    Value,
}

/// How a reverse lookup finds its source reference draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Scan leftward for the nearest column with the same `reference` and `output label`. Resolved
    /// to [`ValueSource::ImplicitResolved`] or [`ValueSource::ImplicitUnresolved`] by the analyser
    /// before reaching the generator.
    Implicit,
    /// The analysed form of `Implicit`: the resolved source column's label. Looked up by label
    /// only, with no value fallback.
    ImplicitResolved(String),
    /// The analysed form of `Implicit` when no preceding column references the same table with
    /// `output label`. Always emits an empty cell, gated by `allow_null` like any other miss.
    ImplicitUnresolved,
    /// Read the named column's reference draw directly. Looked up by label first, then by value.
    Explicit(String),
}

/// The value-producing mechanism a column uses, after flattening.
#[derive(Debug, Clone, PartialEq)]
pub enum Producer {
    /// A sequential counter starting at `start`, incremented by `step` (default 1) each record,
    /// wrapping back to `start` after `end`. Always rendered as its decimal string form,
    /// left-zero-padded to at least `digits` characters (default 0, i.e. no padding).
    Sequence { start: i64, end: i64, step: i64, digits: u32 },
    /// Random characters drawn from a charset (default alnum) of fixed `length`.
    CharString { charset: CharsetKind, length: u32 },
    /// A uniform pick among an explicit list of literal values.
    Enum(Vec<Literal>),
    /// A constant value repeated for every record.
    Fixed(Literal),
    /// A uniformly distributed number in `[lo, hi]`, integer or float depending on the operands.
    Range(Literal, Literal),
    /// A uniformly distributed date in `[lo, hi]` (inclusive), formatted with `strftime` pattern
    /// `format` (default `%Y-%m-%d`). When `with_time` is set, a uniformly distributed
    /// time-of-day is drawn alongside the date and the whole moment is rendered as
    /// timezone-naive ISO-8601 to the second, ignoring `format`.
    DateRange { lo: String, hi: String, format: String, with_time: bool },
    /// Copies another column's already-generated cell verbatim.
    Copy(String),
    /// Concatenates other columns' already-generated cells with a separator.
    Join(String, Vec<String>),
    /// A string matching a regular expression, sampled uniformly over matching strings up to a
    /// bounded repetition count.
    Regex(String),
    /// No explicit value rule; the column is driven entirely by its `reference` draw.
    None,
}

/// A fully resolved column: its name, value-producing rule, and reference wiring.
#[derive(Debug, Clone)]
pub struct Column {
    /// The column's header label.
    pub label: String,
    /// Zero-based position in the header.
    pub index: usize,
    /// How this column's value is produced.
    pub producer: Producer,
    /// The reference table this column draws a row from, if any.
    pub reference: Option<String>,
    /// Which side of the reference row this column emits, if `reference` is set.
    pub output: Option<OutputSide>,
    /// How a `reference`-less column recovers the row drawn by a sibling, if this column is a
    /// reverse lookup.
    pub value_source: Option<ValueSource>,
    /// Whether this column may emit `NULL`.
    pub allow_null: bool,
    /// Probability of emitting `NULL` for a record, when `allow_null` is true.
    pub null_probability: f64,
}

/// A reference table: an ordered set of (label, value) rows.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    /// The table's name, as named by `REFERENCE "name"` and by `reference "name"` rules.
    pub name: String,
    /// Rows in declaration order.
    pub rows: Vec<(String, crate::ast::RefValue)>,
}

/// The fully resolved program, ready to hand to the generator.
#[derive(Debug, Clone)]
pub struct Program {
    /// Resolved configuration.
    pub config: Config,
    /// Header labels, in output order.
    pub header: Vec<String>,
    /// Resolved columns, in header order.
    pub columns: Vec<Column>,
    /// Reference tables, keyed by name.
    pub references: Vec<ReferenceTable>,
}
