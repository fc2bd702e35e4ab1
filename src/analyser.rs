//! Semantic analysis: merges repeated sections, resolves selectors against the header, expands
//! `class` references one level deep, flattens each column's rule body with last-writer-wins
//! semantics, and precomputes implicit reverse lookups.

use crate::{
    ast::{ConfigValue, Literal, RuleForm, Section, Selector},
    error::Error,
    ir::{Column, Config, OutputFormat, OutputSide, Producer, Program, ReferenceTable, ValueSource},
    span::S,
};
use std::collections::HashMap;

/// The date window a bare `datetime` rule draws from when no `date_range` is also set.
const DEFAULT_DATETIME_RANGE: (&str, &str) = ("1970-01-01", "2099-12-31");

/// Resolves a parsed section tree into a program ready for generation.
pub fn analyse(sections: Vec<Section>) -> Result<Program, Error> {
    let mut config_entries = Vec::new();
    let mut header: Option<Vec<String>> = None;
    let mut references: HashMap<String, Vec<(String, crate::ast::RefValue)>> = HashMap::new();
    let mut reference_order = Vec::new();
    let mut classes: HashMap<String, Vec<S<RuleForm>>> = HashMap::new();
    let mut column_blocks: Vec<(S<Selector>, Vec<S<RuleForm>>)> = Vec::new();

    for section in sections {
        match section {
            Section::Config(entries) => config_entries.extend(entries),
            Section::Header(names) => {
                if header.is_some() {
                    return Err(Error::InvalidRule("HEADER must appear exactly once".to_owned()));
                }
                header = Some(names);
            }
            Section::Reference { name, rows } => {
                if let Some(existing) = references.get_mut(&name) {
                    existing.extend(rows);
                } else {
                    reference_order.push(name.clone());
                    references.insert(name, rows);
                }
            }
            Section::Class { name, body } => {
                if classes.contains_key(&name) {
                    return Err(Error::InvalidRule(format!("class '{name}' redefines an existing class name")));
                }
                classes.insert(name, body);
            }
            Section::ColumnRules(blocks) => column_blocks.extend(blocks),
        }
    }

    let header = header.ok_or_else(|| Error::InvalidRule("a HEADER section is required".to_owned()))?;
    if header.is_empty() {
        return Err(Error::InvalidRule("HEADER must not be empty".to_owned()));
    }
    let config = resolve_config(config_entries)?;

    let reference_tables: Vec<ReferenceTable> = reference_order
        .into_iter()
        .map(|name| {
            let rows = references.remove(&name).expect("name was just pushed from this map");
            if rows.is_empty() {
                return Err(Error::InvalidRule(format!("reference table '{name}' must not be empty")));
            }
            Ok(ReferenceTable { name, rows })
        })
        .collect::<Result<_, Error>>()?;

    let mut builders: Vec<ColumnBuilder> = (0..header.len())
        .map(|index| ColumnBuilder::new(header[index].clone(), index))
        .collect();

    for (selector, body) in column_blocks {
        let indices = resolve_selector(&selector, &header)?;
        for index in indices {
            apply_body(&mut builders[index], &body, &classes, 0)?;
        }
    }

    let mut columns: Vec<Column> = builders.into_iter().map(ColumnBuilder::finish).collect::<Result<_, _>>()?;
    resolve_implicit_value_sources(&mut columns);
    validate_references(&columns, &reference_tables)?;

    Ok(Program {
        config,
        header,
        columns,
        references: reference_tables,
    })
}

fn resolve_config(entries: Vec<(String, ConfigValue)>) -> Result<Config, Error> {
    let mut config = Config::default();
    for (key, value) in entries {
        match key.as_str() {
            "type" => {
                let ConfigValue::Ident(ident) = &value else {
                    return Err(Error::InvalidRule("'type' must be a bare identifier".to_owned()));
                };
                config.format = match ident.as_str() {
                    "CSV" => OutputFormat::Csv,
                    "JSON" => OutputFormat::Json,
                    other => return Err(Error::InvalidRule(format!("unknown output type '{other}'"))),
                };
            }
            "count" => {
                let ConfigValue::Int(n) = value else {
                    return Err(Error::InvalidRule("'count' must be an integer".to_owned()));
                };
                config.count = u64::try_from(n).map_err(|_| Error::InvalidRule("'count' must not be negative".to_owned()))?;
            }
            "reproducible" => {
                let ConfigValue::Ident(ident) = &value else {
                    return Err(Error::InvalidRule("'reproducible' must be true or false".to_owned()));
                };
                config.reproducible = parse_config_bool(ident)?;
            }
            "output_encoding" | "encoding" => {
                let label = match value {
                    ConfigValue::Str(s) => s,
                    ConfigValue::Ident(s) => s,
                    ConfigValue::Int(_) => return Err(Error::InvalidRule(format!("'{key}' must be a name"))),
                };
                if encoding_rs::Encoding::for_label(label.as_bytes()).is_none() {
                    return Err(Error::InvalidRule(format!("unrecognised output encoding '{label}'")));
                }
                config.encoding = label;
            }
            "with_header" => {
                let ConfigValue::Ident(ident) = &value else {
                    return Err(Error::InvalidRule("'with_header' must be true or false".to_owned()));
                };
                config.with_header = parse_config_bool(ident)?;
            }
            "quote_strings" => {
                let ConfigValue::Ident(ident) = &value else {
                    return Err(Error::InvalidRule("'quote_strings' must be true or false".to_owned()));
                };
                config.quote_strings = parse_config_bool(ident)?;
            }
            "quote_header" => {
                let ConfigValue::Ident(ident) = &value else {
                    return Err(Error::InvalidRule("'quote_header' must be true or false".to_owned()));
                };
                config.quote_header = parse_config_bool(ident)?;
            }
            other => return Err(Error::InvalidRule(format!("unknown config key '{other}'"))),
        }
    }
    Ok(config)
}

fn parse_config_bool(ident: &str) -> Result<bool, Error> {
    match ident {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(Error::InvalidRule(format!("expected true or false, found '{other}'"))),
    }
}

fn resolve_selector(selector: &S<Selector>, header: &[String]) -> Result<Vec<usize>, Error> {
    let label_index = |label: &str| -> Result<usize, Error> {
        header
            .iter()
            .position(|h| h == label)
            .ok_or_else(|| Error::UnknownColumn(label.to_owned()))
    };
    // `INDEX`/`INDICES` are 1-based in source text; convert to a 0-based header position here.
    let bounds_check = |i: i64| -> Result<usize, Error> {
        if i < 1 || i as usize > header.len() {
            return Err(Error::UnknownColumn(format!("index {i} out of range")));
        }
        Ok((i - 1) as usize)
    };

    match &selector.inner {
        Selector::Index(i) => Ok(vec![bounds_check(*i)?]),
        Selector::IndexList(items) => items.iter().map(|&i| bounds_check(i)).collect(),
        Selector::IndexRange(lo, hi) => {
            if lo > hi {
                return Err(Error::InvalidRule(format!("index range {lo}..{hi} is inverted")));
            }
            (*lo..=*hi).map(bounds_check).collect()
        }
        Selector::Label(label) => Ok(vec![label_index(label)?]),
        Selector::LabelList(labels) => labels.iter().map(|l| label_index(l)).collect(),
        Selector::LabelRange(lo, hi) => {
            let lo_i = label_index(lo)?;
            let hi_i = label_index(hi)?;
            if lo_i > hi_i {
                return Err(Error::InvalidRule(format!("label range '{lo}'..'{hi}' is inverted")));
            }
            Ok((lo_i..=hi_i).collect())
        }
    }
}

/// Applies a rule body to a column builder, expanding `class` references one level deep.
/// `depth` guards against a `class` rule appearing inside an expanded class body.
fn apply_body(
    builder: &mut ColumnBuilder,
    body: &[S<RuleForm>],
    classes: &HashMap<String, Vec<S<RuleForm>>>,
    depth: u32,
) -> Result<(), Error> {
    for rule in body {
        if let RuleForm::Class(name) = &rule.inner {
            if depth > 0 {
                return Err(Error::InvalidRule(format!(
                    "class '{name}' cannot reference another class"
                )));
            }
            let class_body = classes
                .get(name)
                .ok_or_else(|| Error::InvalidRule(format!("unknown class '{name}'")))?;
            apply_body(builder, class_body, classes, depth + 1)?;
            continue;
        }
        builder.apply(rule)?;
    }
    Ok(())
}

struct ColumnBuilder {
    label: String,
    index: usize,
    seq: Option<(i64, i64)>,
    digits: Option<u32>,
    step: Option<i64>,
    charset: Option<crate::ast::CharsetKind>,
    length: Option<u32>,
    enum_vals: Option<Vec<Literal>>,
    fixed: Option<Literal>,
    range: Option<(Literal, Literal)>,
    date_range: Option<(String, String, Option<String>)>,
    datetime: bool,
    copy: Option<String>,
    join: Option<(String, Vec<String>)>,
    regex: Option<String>,
    reference: Option<String>,
    output: Option<OutputSide>,
    value_source: Option<ValueSource>,
    allow_null: Option<bool>,
    null_probability: Option<f64>,
}

impl ColumnBuilder {
    fn new(label: String, index: usize) -> Self {
        Self {
            label,
            index,
            seq: None,
            digits: None,
            step: None,
            charset: None,
            length: None,
            enum_vals: None,
            fixed: None,
            range: None,
            date_range: None,
            datetime: false,
            copy: None,
            join: None,
            regex: None,
            reference: None,
            output: None,
            value_source: None,
            allow_null: None,
            null_probability: None,
        }
    }

    fn apply(&mut self, rule: &S<RuleForm>) -> Result<(), Error> {
        match &rule.inner {
            RuleForm::Seq(lo, hi) => self.seq = Some((*lo, *hi)),
            RuleForm::Digits(n) => self.digits = Some(*n),
            RuleForm::Step(n) => self.step = Some(*n),
            RuleForm::Charset(kind) => self.charset = Some(kind.clone()),
            RuleForm::Length(n) => self.length = Some(*n),
            RuleForm::Enum(values) => self.enum_vals = Some(values.clone()),
            RuleForm::Fixed(v) => self.fixed = Some(v.clone()),
            RuleForm::Range(lo, hi) => self.range = Some((lo.clone(), hi.clone())),
            RuleForm::DateRange(lo, hi, fmt) => self.date_range = Some((lo.clone(), hi.clone(), fmt.clone())),
            RuleForm::Datetime => self.datetime = true,
            RuleForm::Copy(col) => self.copy = Some(col.clone()),
            RuleForm::Join(sep, cols) => self.join = Some((sep.clone(), cols.clone())),
            RuleForm::Regex(pattern) => self.regex = Some(pattern.clone()),
            RuleForm::Reference(name) => self.reference = Some(name.clone()),
            RuleForm::Output(side) => {
                self.output = Some(match side {
                    crate::ast::OutputSide::Label => OutputSide::Label,
                    crate::ast::OutputSide::Value => OutputSide::Value,
                })
            }
            RuleForm::ValueSource(src) => {
                self.value_source = Some(match src {
                    crate::ast::ValueSource::Implicit => ValueSource::Implicit,
                    crate::ast::ValueSource::Explicit(col) => ValueSource::Explicit(col.clone()),
                })
            }
            RuleForm::AllowNull(b) => self.allow_null = Some(*b),
            RuleForm::NullProbability(p) => {
                if !(0.0..=1.0).contains(p) {
                    return Err(Error::InvalidRule(format!("null_probability {p} is outside 0.0..=1.0")));
                }
                self.null_probability = Some(*p);
            }
            RuleForm::Class(_) => unreachable!("class rules are expanded before reaching apply"),
        }
        Ok(())
    }

    fn finish(self) -> Result<Column, Error> {
        let producer = if let Some((start, end)) = self.seq {
            if start > end {
                return Err(Error::InvalidRule(format!("seq range {start}..{end} is inverted")));
            }
            Producer::Sequence {
                start,
                end,
                step: self.step.unwrap_or(1),
                digits: self.digits.unwrap_or(0),
            }
        } else if self.charset.is_some() || self.length.is_some() {
            Producer::CharString {
                charset: self.charset.unwrap_or(crate::ast::CharsetKind::Alnum),
                length: self.length.unwrap_or(8),
            }
        } else if let Some(values) = self.enum_vals {
            Producer::Enum(values)
        } else if let Some(v) = self.fixed {
            Producer::Fixed(v)
        } else if let Some((lo, hi)) = self.range {
            Producer::Range(lo, hi)
        } else if self.date_range.is_some() || self.datetime {
            let (lo, hi, fmt) = self
                .date_range
                .unwrap_or_else(|| (DEFAULT_DATETIME_RANGE.0.to_owned(), DEFAULT_DATETIME_RANGE.1.to_owned(), None));
            Producer::DateRange {
                lo,
                hi,
                format: fmt.unwrap_or_else(|| "%Y-%m-%d".to_owned()),
                with_time: self.datetime,
            }
        } else if let Some(col) = self.copy {
            Producer::Copy(col)
        } else if let Some((sep, cols)) = self.join {
            Producer::Join(sep, cols)
        } else if let Some(pattern) = self.regex {
            Producer::Regex(pattern)
        } else {
            Producer::None
        };

        if matches!(producer, Producer::None) && self.reference.is_none() {
            return Err(Error::InvalidRule(format!(
                "column '{}' has neither a value rule nor a reference",
                self.label
            )));
        }
        if self.reference.is_some() && self.output.is_none() {
            return Err(Error::InvalidRule(format!(
                "column '{}' has 'reference' but no 'output' side",
                self.label
            )));
        }

        Ok(Column {
            label: self.label,
            index: self.index,
            producer,
            reference: self.reference,
            output: self.output,
            value_source: self.value_source,
            allow_null: self.allow_null.unwrap_or(false),
            null_probability: self.null_probability.unwrap_or(0.0),
        })
    }
}

/// Resolves every `value_source` with no explicit column into the nearest preceding column that
/// draws the same reference and emits its label. A column with no such predecessor resolves to
/// `ImplicitUnresolved`, which always emits an empty cell at generation time (gated, like any
/// other miss, by `allow_null`) rather than being rejected here.
fn resolve_implicit_value_sources(columns: &mut [Column]) {
    for index in 0..columns.len() {
        if !matches!(columns[index].value_source, Some(ValueSource::Implicit)) {
            continue;
        }
        let table = columns[index].reference.clone();
        let found = columns[..index]
            .iter()
            .rev()
            .find(|c| c.reference == table && c.output == Some(OutputSide::Label))
            .map(|c| c.label.clone());
        columns[index].value_source = Some(match found {
            Some(label) => ValueSource::ImplicitResolved(label),
            None => ValueSource::ImplicitUnresolved,
        });
    }
}

fn validate_references(columns: &[Column], references: &[ReferenceTable]) -> Result<(), Error> {
    for column in columns {
        if let Some(name) = &column.reference {
            if !references.iter().any(|r| &r.name == name) {
                return Err(Error::UnknownReference(name.clone()));
            }
        }
        if let Some(ValueSource::Explicit(col) | ValueSource::ImplicitResolved(col)) = &column.value_source {
            if !columns.iter().any(|c| &c.label == col) {
                return Err(Error::UnknownColumn(col.clone()));
            }
        }
        if let Producer::Copy(col) = &column.producer {
            if !columns.iter().any(|c| &c.label == col) {
                return Err(Error::UnknownColumn(col.clone()));
            }
        }
        if let Producer::Join(_, cols) = &column.producer {
            for col in cols {
                if !columns.iter().any(|c| &c.label == col) {
                    return Err(Error::UnknownColumn(col.clone()));
                }
            }
        }
    }
    Ok(())
}
