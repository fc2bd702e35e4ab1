//! Record output: CSV (via the `csv` crate) or JSON (via `serde_json`), re-encoded to the
//! configured character encoding.

use crate::{
    error::Error,
    ir::{Config, OutputFormat},
    value::Value,
};
use encoding_rs::Encoding;
use std::io::Write;

/// Writes a full stream of records to `output` in the given format and character encoding.
#[derive(Debug)]
pub struct RecordWriter<'a, W: Write> {
    output: W,
    format: OutputFormat,
    header: &'a [String],
    encoding: &'static Encoding,
    with_header: bool,
    quote_strings: bool,
    quote_header: bool,
    json_first: bool,
}

impl<'a, W: Write> RecordWriter<'a, W> {
    /// Builds a writer. The output encoding is resolved at analysis time, so `config.encoding` is
    /// always a label `encoding_rs` recognises.
    pub fn new(mut output: W, config: &Config, header: &'a [String]) -> Result<Self, Error> {
        let encoding = Encoding::for_label(config.encoding.as_bytes()).unwrap_or(encoding_rs::UTF_8);
        if config.format == OutputFormat::Json {
            write_encoded(&mut output, encoding, "[")?;
        }
        Ok(Self {
            output,
            format: config.format,
            header,
            encoding,
            with_header: config.with_header,
            quote_strings: config.quote_strings,
            quote_header: config.quote_header,
            json_first: true,
        })
    }

    /// Writes the CSV header row. No-op for JSON output, or when `with_header` is false.
    pub fn write_header(&mut self) -> Result<(), Error> {
        if self.format != OutputFormat::Csv || !self.with_header {
            return Ok(());
        }
        let quote_style = if self.quote_header { csv::QuoteStyle::Always } else { csv::QuoteStyle::Necessary };
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .quote_style(quote_style)
            .from_writer(Vec::new());
        writer
            .write_record(self.header)
            .map_err(|e| Error::Generation(format!("failed to format CSV header: {e}")))?;
        let line = writer
            .into_inner()
            .map_err(|e| Error::Generation(format!("failed to flush CSV header: {e}")))?;
        let line = String::from_utf8(line).expect("header labels are valid utf-8");
        write_encoded(&mut self.output, self.encoding, &line)
    }

    /// Writes a single record.
    pub fn write_record(&mut self, values: &[Value]) -> Result<(), Error> {
        match self.format {
            OutputFormat::Csv => self.write_csv_record(values),
            OutputFormat::Json => self.write_json_record(values),
        }
    }

    fn write_csv_record(&mut self, values: &[Value]) -> Result<(), Error> {
        let quote_style = if self.quote_strings { csv::QuoteStyle::NonNumeric } else { csv::QuoteStyle::Necessary };
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .quote_style(quote_style)
            .from_writer(Vec::new());
        writer
            .write_record(values.iter().map(Value::to_csv_field))
            .map_err(|e| Error::Generation(format!("failed to format CSV record: {e}")))?;
        let line = writer
            .into_inner()
            .map_err(|e| Error::Generation(format!("failed to flush CSV record: {e}")))?;
        let line = String::from_utf8(line).expect("csv writer only emits valid utf-8 for these field kinds");
        write_encoded(&mut self.output, self.encoding, &line)
    }

    fn write_json_record(&mut self, values: &[Value]) -> Result<(), Error> {
        let rendered = if self.with_header {
            let object: serde_json::Map<String, serde_json::Value> = self
                .header
                .iter()
                .zip(values)
                .map(|(key, value)| (key.clone(), serde_json::to_value(value).expect("Value always serializes")))
                .collect();
            serde_json::to_string(&object).expect("a flat map of scalars always serializes")
        } else {
            serde_json::to_string(values).expect("a flat array of scalars always serializes")
        };
        let prefix = if self.json_first { "" } else { "," };
        self.json_first = false;
        write_encoded(&mut self.output, self.encoding, &format!("{prefix}{rendered}"))
    }

    /// Finishes the output, closing the JSON array if needed.
    pub fn finish(mut self) -> Result<(), Error> {
        if self.format == OutputFormat::Json {
            write_encoded(&mut self.output, self.encoding, "]")?;
        }
        self.output
            .flush()
            .map_err(|source| Error::Io { action: "flush output", path: Default::default(), source })
    }
}

fn write_encoded(output: &mut impl Write, encoding: &'static Encoding, text: &str) -> Result<(), Error> {
    let (bytes, _, _) = encoding.encode(text);
    output
        .write_all(&bytes)
        .map_err(|source| Error::Io { action: "write output", path: Default::default(), source })
}
