//! Recursive-descent parser: builds the concrete section tree from a flat token stream.
//!
//! `CONFIG`, `HEADER`, `REFERENCE`, `CLASS`, and `COLUMN_RULES` sections may appear in any order
//! and may repeat (the analyser merges repetitions). Inside `CLASS` bodies and `COLUMN_RULES`
//! rule bodies, exactly one rule is allowed per source line; `CONFIG` and `REFERENCE` bodies are
//! not line-restricted since their entries carry no ambiguity about where one ends and the next
//! begins.

use crate::{
    ast::{CharsetKind, ConfigValue, Literal, OutputSide, RefValue, RuleForm, Section, Selector, ValueSource},
    error::Error,
    span::{SpanExt, S},
    token::{self, Kind, Token},
};

/// Parses DSL source text into its section tree.
pub fn parse(input: &str) -> Result<Vec<Section>, Error> {
    let tokens = token::tokenize(input)?;
    let mut cursor = Cursor { tokens: &tokens, pos: 0 };
    let mut sections = Vec::new();
    loop {
        cursor.skip_newlines();
        if cursor.at_eof() {
            break;
        }
        sections.push(parse_section(&mut cursor)?);
    }
    Ok(sections)
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> &'a Token {
        &self.tokens[self.pos]
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == Kind::Eof
    }

    fn advance(&mut self) -> &'a Token {
        let token = &self.tokens[self.pos];
        if token.kind != Kind::Eof {
            self.pos += 1;
        }
        token
    }

    fn skip_newlines(&mut self) {
        while self.peek().kind == Kind::Newline {
            self.advance();
        }
    }

    fn syntax_error(&self, message: impl Into<String>) -> Error {
        Error::Syntax {
            message: message.into(),
            span: self.peek().span,
        }
    }

    fn expect_kind(&mut self, kind: Kind, what: &str) -> Result<&'a Token, Error> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.syntax_error(format!("expected {what}, found '{}'", self.peek().text)))
        }
    }

    fn expect_integer(&mut self, what: &str) -> Result<i64, Error> {
        let token = self.expect_kind(Kind::Integer, what)?;
        token
            .text
            .parse()
            .map_err(|_| self.syntax_error(format!("'{}' is not a valid integer", token.text)))
    }

    fn expect_string(&mut self, what: &str) -> Result<String, Error> {
        Ok(self.expect_kind(Kind::String, what)?.unquoted().to_owned())
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, Error> {
        Ok(self.expect_kind(Kind::Identifier, what)?.text.clone())
    }

    /// Ensures the current rule's operands end the line: either a newline (consumed) or the
    /// closing brace of the enclosing block (left for the caller to consume).
    fn end_of_rule(&mut self) -> Result<(), Error> {
        match self.peek().kind {
            Kind::Newline => {
                self.advance();
                Ok(())
            }
            Kind::CloseBrace => Ok(()),
            _ => Err(self.syntax_error(format!(
                "only one rule is allowed per line, found extra token '{}'",
                self.peek().text
            ))),
        }
    }
}

fn parse_section(cursor: &mut Cursor<'_>) -> Result<Section, Error> {
    let keyword = cursor.expect_ident("a section keyword")?;
    match keyword.as_str() {
        "CONFIG" => parse_config(cursor),
        "HEADER" => parse_header(cursor),
        "REFERENCE" => parse_reference(cursor),
        "CLASS" => parse_class(cursor),
        "COLUMN_RULES" => parse_column_rules(cursor),
        other => Err(cursor.syntax_error(format!("unknown section '{other}'"))),
    }
}

fn parse_config(cursor: &mut Cursor<'_>) -> Result<Section, Error> {
    cursor.expect_kind(Kind::OpenBrace, "'{'")?;
    let mut entries = Vec::new();
    loop {
        cursor.skip_newlines();
        if cursor.peek().kind == Kind::CloseBrace {
            cursor.advance();
            break;
        }
        let key = cursor.expect_ident("a config key")?;
        let value = match cursor.peek().kind {
            Kind::Integer => ConfigValue::Int(cursor.expect_integer("a config value")?),
            Kind::String => ConfigValue::Str(cursor.expect_string("a config value")?),
            Kind::Identifier => ConfigValue::Ident(cursor.expect_ident("a config value")?),
            _ => return Err(cursor.syntax_error(format!("expected a config value, found '{}'", cursor.peek().text))),
        };
        entries.push((key, value));
    }
    Ok(Section::Config(entries))
}

fn parse_header(cursor: &mut Cursor<'_>) -> Result<Section, Error> {
    cursor.expect_kind(Kind::OpenBrace, "'{'")?;
    cursor.skip_newlines();
    let names = parse_string_list(cursor)?;
    cursor.skip_newlines();
    cursor.expect_kind(Kind::CloseBrace, "'}'")?;
    Ok(Section::Header(names))
}

fn parse_reference(cursor: &mut Cursor<'_>) -> Result<Section, Error> {
    let name = cursor.expect_string("a quoted reference table name")?;
    cursor.expect_kind(Kind::OpenBrace, "'{'")?;
    let mut rows = Vec::new();
    loop {
        cursor.skip_newlines();
        if cursor.peek().kind == Kind::CloseBrace {
            cursor.advance();
            break;
        }
        if cursor.peek().kind != Kind::String {
            return Err(cursor.syntax_error("reference labels must be quoted"));
        }
        let label = cursor.expect_string("a quoted label")?;
        let value = match cursor.peek().kind {
            Kind::Integer => RefValue::Int(cursor.expect_integer("a reference value")?),
            Kind::Float => RefValue::Float(parse_float(cursor)?),
            Kind::String => RefValue::Str(cursor.expect_string("a reference value")?),
            _ => return Err(cursor.syntax_error("a reference value must be an integer, float, or quoted string")),
        };
        rows.push((label, value));
        if cursor.peek().kind == Kind::Comma {
            cursor.advance();
        }
    }
    Ok(Section::Reference { name, rows })
}

fn parse_class(cursor: &mut Cursor<'_>) -> Result<Section, Error> {
    let name = cursor.expect_string("a quoted class name")?;
    cursor.expect_kind(Kind::OpenBrace, "'{'")?;
    let body = parse_rule_body(cursor)?;
    Ok(Section::Class { name, body })
}

fn parse_column_rules(cursor: &mut Cursor<'_>) -> Result<Section, Error> {
    cursor.expect_kind(Kind::OpenBrace, "'{'")?;
    let mut blocks = Vec::new();
    loop {
        cursor.skip_newlines();
        if cursor.peek().kind == Kind::CloseBrace {
            cursor.advance();
            break;
        }
        let selector = parse_selector(cursor)?;
        cursor.expect_kind(Kind::OpenBrace, "'{'")?;
        let body = parse_rule_body(cursor)?;
        blocks.push((selector, body));
    }
    Ok(Section::ColumnRules(blocks))
}

fn parse_selector(cursor: &mut Cursor<'_>) -> Result<S<Selector>, Error> {
    let span = cursor.peek().span;
    let keyword = cursor.expect_ident("a selector keyword")?;
    let selector = match keyword.as_str() {
        "INDEX" => Selector::Index(cursor.expect_integer("a column index")?),
        "INDICES" => {
            if cursor.peek().kind == Kind::OpenBracket {
                Selector::IndexList(parse_int_list(cursor)?)
            } else {
                let lo = cursor.expect_integer("a column index")?;
                cursor.expect_kind(Kind::RangeDots, "'..'")?;
                let hi = cursor.expect_integer("a column index")?;
                Selector::IndexRange(lo, hi)
            }
        }
        "LABEL" => Selector::Label(cursor.expect_string("a quoted column label")?),
        "LABELS" => {
            if cursor.peek().kind == Kind::OpenBracket {
                Selector::LabelList(parse_string_list(cursor)?)
            } else {
                let lo = cursor.expect_string("a quoted column label")?;
                cursor.expect_kind(Kind::RangeDots, "'..'")?;
                let hi = cursor.expect_string("a quoted column label")?;
                Selector::LabelRange(lo, hi)
            }
        }
        other => return Err(cursor.syntax_error(format!("unknown selector '{other}'"))),
    };
    Ok(selector.at(span))
}

fn parse_rule_body(cursor: &mut Cursor<'_>) -> Result<Vec<S<RuleForm>>, Error> {
    let mut rules = Vec::new();
    loop {
        cursor.skip_newlines();
        if cursor.peek().kind == Kind::CloseBrace {
            cursor.advance();
            break;
        }
        rules.push(parse_rule_form(cursor)?);
    }
    Ok(rules)
}

fn parse_rule_form(cursor: &mut Cursor<'_>) -> Result<S<RuleForm>, Error> {
    let span = cursor.peek().span;
    let keyword = cursor.expect_ident("a rule keyword")?;
    let rule = match keyword.as_str() {
        "seq" => {
            let lo = cursor.expect_integer("the start of a seq range")?;
            require_range_dots(cursor, "seq")?;
            let hi = cursor.expect_integer("the end of a seq range")?;
            RuleForm::Seq(lo, hi)
        }
        "digits" => {
            let n = cursor.expect_integer("a digit width")?;
            RuleForm::Digits(non_negative(cursor, n)?)
        }
        "step" => RuleForm::Step(cursor.expect_integer("a step amount")?),
        "charset" => RuleForm::Charset(parse_charset_kind(cursor)?),
        "length" => {
            let n = cursor.expect_integer("a length")?;
            RuleForm::Length(non_negative(cursor, n)?)
        }
        "enum" => RuleForm::Enum(parse_literal_list(cursor)?),
        "fixed" => RuleForm::Fixed(parse_literal(cursor)?),
        "range" => {
            let lo = parse_literal(cursor)?;
            require_range_dots(cursor, "range")?;
            let hi = parse_literal(cursor)?;
            RuleForm::Range(lo, hi)
        }
        "date_range" => {
            let lo = cursor.expect_string("the start of a date range")?;
            require_range_dots(cursor, "date_range")?;
            let hi = cursor.expect_string("the end of a date range")?;
            let format = if cursor.peek().kind == Kind::Identifier && cursor.peek().text == "format" {
                cursor.advance();
                Some(cursor.expect_string("a format string")?)
            } else {
                None
            };
            RuleForm::DateRange(lo, hi, format)
        }
        "datetime" => RuleForm::Datetime,
        "copy" => RuleForm::Copy(cursor.expect_ident("a column name")?),
        "join" => {
            let sep = cursor.expect_string("a join separator")?;
            RuleForm::Join(sep, parse_ident_list(cursor)?)
        }
        "regex" => RuleForm::Regex(cursor.expect_string("a regex pattern")?),
        "reference" => RuleForm::Reference(cursor.expect_string("a quoted reference table name")?),
        "output" => {
            let side = cursor.expect_ident("'label' or 'value'")?;
            RuleForm::Output(match side.as_str() {
                "label" => OutputSide::Label,
                "value" => OutputSide::Value,
                _ => return Err(cursor.syntax_error(format!("output side must be 'label' or 'value', found '{side}'"))),
            })
        }
        "value_source" => {
            if matches!(cursor.peek().kind, Kind::Newline | Kind::CloseBrace) {
                RuleForm::ValueSource(ValueSource::Implicit)
            } else {
                RuleForm::ValueSource(ValueSource::Explicit(cursor.expect_ident("a column name")?))
            }
        }
        "allow_null" => RuleForm::AllowNull(parse_bool(cursor)?),
        "null_probability" => RuleForm::NullProbability(parse_number_as_f64(cursor)?),
        "class" => RuleForm::Class(cursor.expect_string("a quoted class name")?),
        other => return Err(cursor.syntax_error(format!("unknown rule '{other}'"))),
    };
    cursor.end_of_rule()?;
    Ok(rule.at(span))
}

fn require_range_dots(cursor: &mut Cursor<'_>, rule: &str) -> Result<(), Error> {
    if cursor.peek().kind == Kind::RangeDots {
        cursor.advance();
        Ok(())
    } else {
        Err(cursor.syntax_error(format!("'{rule}' requires a closed range, e.g. '{rule} 1..10'")))
    }
}

fn non_negative(cursor: &Cursor<'_>, n: i64) -> Result<u32, Error> {
    u32::try_from(n).map_err(|_| cursor.syntax_error(format!("expected a non-negative integer, found {n}")))
}

fn parse_bool(cursor: &mut Cursor<'_>) -> Result<bool, Error> {
    match cursor.expect_ident("'true' or 'false'")?.as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(cursor.syntax_error(format!("expected 'true' or 'false', found '{other}'"))),
    }
}

fn parse_float(cursor: &mut Cursor<'_>) -> Result<f64, Error> {
    let token = cursor.expect_kind(Kind::Float, "a float")?;
    token
        .text
        .parse()
        .map_err(|_| cursor.syntax_error(format!("'{}' is not a valid float", token.text)))
}

fn parse_number_as_f64(cursor: &mut Cursor<'_>) -> Result<f64, Error> {
    match cursor.peek().kind {
        Kind::Float => parse_float(cursor),
        Kind::Integer => Ok(cursor.expect_integer("a number")? as f64),
        _ => Err(cursor.syntax_error(format!("expected a number, found '{}'", cursor.peek().text))),
    }
}

fn parse_charset_kind(cursor: &mut Cursor<'_>) -> Result<CharsetKind, Error> {
    match cursor.peek().kind {
        Kind::String => Ok(CharsetKind::Literal(cursor.expect_string("a literal character set")?)),
        Kind::Identifier => match cursor.expect_ident("a charset kind")?.as_str() {
            "alphabet" => Ok(CharsetKind::Alphabet),
            "alnum" => Ok(CharsetKind::Alnum),
            "digits" => Ok(CharsetKind::Digits),
            other => Err(cursor.syntax_error(format!("unknown charset kind '{other}'"))),
        },
        _ => Err(cursor.syntax_error("expected a charset kind or a quoted literal set")),
    }
}

fn parse_literal(cursor: &mut Cursor<'_>) -> Result<Literal, Error> {
    match cursor.peek().kind {
        Kind::Integer => Ok(Literal::Int(cursor.expect_integer("a literal")?)),
        Kind::Float => Ok(Literal::Float(parse_float(cursor)?)),
        Kind::String => Ok(Literal::Str(cursor.expect_string("a literal")?)),
        _ => Err(cursor.syntax_error(format!("expected a literal value, found '{}'", cursor.peek().text))),
    }
}

fn parse_literal_list(cursor: &mut Cursor<'_>) -> Result<Vec<Literal>, Error> {
    cursor.expect_kind(Kind::OpenBracket, "'['")?;
    let mut items = Vec::new();
    loop {
        if cursor.peek().kind == Kind::CloseBracket {
            cursor.advance();
            break;
        }
        items.push(parse_literal(cursor)?);
        if cursor.peek().kind == Kind::Comma {
            cursor.advance();
        }
    }
    Ok(items)
}

fn parse_string_list(cursor: &mut Cursor<'_>) -> Result<Vec<String>, Error> {
    cursor.expect_kind(Kind::OpenBracket, "'['")?;
    let mut items = Vec::new();
    loop {
        if cursor.peek().kind == Kind::CloseBracket {
            cursor.advance();
            break;
        }
        items.push(cursor.expect_string("a quoted string")?);
        if cursor.peek().kind == Kind::Comma {
            cursor.advance();
        }
    }
    Ok(items)
}

fn parse_ident_list(cursor: &mut Cursor<'_>) -> Result<Vec<String>, Error> {
    cursor.expect_kind(Kind::OpenBracket, "'['")?;
    let mut items = Vec::new();
    loop {
        if cursor.peek().kind == Kind::CloseBracket {
            cursor.advance();
            break;
        }
        items.push(cursor.expect_ident("a column name")?);
        if cursor.peek().kind == Kind::Comma {
            cursor.advance();
        }
    }
    Ok(items)
}

fn parse_int_list(cursor: &mut Cursor<'_>) -> Result<Vec<i64>, Error> {
    cursor.expect_kind(Kind::OpenBracket, "'['")?;
    let mut items = Vec::new();
    loop {
        if cursor.peek().kind == Kind::CloseBracket {
            cursor.advance();
            break;
        }
        items.push(cursor.expect_integer("a column index")?);
        if cursor.peek().kind == Kind::Comma {
            cursor.advance();
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_csv_program() {
        let src = "
            CONFIG { type CSV count 2 reproducible true }
            HEADER { [\"id\"] }
            COLUMN_RULES {
                LABEL \"id\" {
                    seq 1..10
                    digits 3
                }
            }
        ";
        let sections = parse(src).unwrap();
        assert_eq!(sections.len(), 3);
        match &sections[2] {
            Section::ColumnRules(blocks) => {
                assert_eq!(blocks.len(), 1);
                assert_eq!(blocks[0].0.inner, Selector::Label("id".to_owned()));
                assert_eq!(blocks[0].1.len(), 2);
            }
            other => panic!("expected ColumnRules, got {other:?}"),
        }
    }

    #[test]
    fn accepts_two_rules_on_separate_lines() {
        let src = "COLUMN_RULES {\n  LABEL \"x\" {\n    seq 1..10\n    digits 4\n  }\n}\n";
        assert!(parse(src).is_ok());
    }

    #[test]
    fn rejects_multiple_rules_on_one_line() {
        let bad = "COLUMN_RULES { LABEL \"x\" { seq 1..10 digits 4 } }";
        assert!(parse(bad).is_err());
    }

    #[test]
    fn rejects_open_seq_range() {
        let src = "COLUMN_RULES { LABEL \"x\" { seq 1.. } }";
        assert!(matches!(parse(src), Err(Error::Syntax { .. })));
    }

    #[test]
    fn rejects_forbidden_symbol() {
        let src = "CONFIG { type: CSV }";
        assert!(parse(src).is_err());
    }

    #[test]
    fn parses_reference_table() {
        let src = r#"
            REFERENCE "Q1" {
                "X" 1
                "Y" 2
            }
        "#;
        let sections = parse(src).unwrap();
        match &sections[0] {
            Section::Reference { name, rows } => {
                assert_eq!(name, "Q1");
                assert_eq!(rows, &vec![("X".to_owned(), RefValue::Int(1)), ("Y".to_owned(), RefValue::Int(2))]);
            }
            other => panic!("expected Reference, got {other:?}"),
        }
    }
}
