//! Command-line front end: argument parsing, logging setup, and orchestration of the
//! parse → analyse → generate → write pipeline.

use crate::{analyser, error::Error, gen::Generator, ir::OutputFormat, parser, writer::RecordWriter};
use clap::Parser;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::PathBuf,
    sync::OnceLock,
};

/// Generates mock tabular data from a small rule-based DSL.
#[derive(Debug, Parser)]
#[command(name = "mamegen", version, about)]
pub struct Args {
    /// Path to the DSL program to run.
    pub input: PathBuf,

    /// Path to write the generated records to. Format is chosen by this path's extension
    /// (`.csv`, `.json`) when recognised, else by `CONFIG.type`.
    pub output: PathBuf,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

static LOGGING: OnceLock<()> = OnceLock::new();

/// Initialises `env_logger` exactly once, honouring `RUST_LOG` but defaulting to a level derived
/// from `-v`/`-vv`.
pub fn init_logging(verbose: u8) {
    LOGGING.get_or_init(|| {
        let default_level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    });
}

/// Runs the CLI end to end.
pub fn run(args: &Args) -> Result<(), Error> {
    init_logging(args.verbose);

    log::info!("reading program from {}", args.input.display());
    let source = fs::read_to_string(&args.input).map_err(|source| Error::Io {
        action: "read program",
        path: args.input.clone(),
        source,
    })?;

    let sections = parser::parse(&source)?;
    log::debug!("parsed {} top-level section(s)", sections.len());
    let mut program = analyser::analyse(sections)?;
    log::debug!(
        "resolved program: {} column(s), {} reference table(s), count={}",
        program.columns.len(),
        program.references.len(),
        program.config.count
    );

    if let Some(format) = format_from_extension(&args.output) {
        program.config.format = format;
    }

    let mut generator = Generator::new(&program)?;

    let file_out = BufWriter::new(File::create(&args.output).map_err(|source| Error::Io {
        action: "create output file",
        path: args.output.clone(),
        source,
    })?);

    let mut writer = RecordWriter::new(file_out, &program.config, &program.header)?;
    writer.write_header()?;
    let mut emitted = 0u64;
    while let Some(record) = generator.next_record()? {
        writer.write_record(&record)?;
        emitted += 1;
    }
    writer.finish()?;
    log::info!("wrote {emitted} record(s) to {}", args.output.display());
    Ok(())
}

/// Chooses an output format from a recognised file extension, if any.
fn format_from_extension(path: &std::path::Path) -> Option<OutputFormat> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => Some(OutputFormat::Csv),
        Some("json") => Some(OutputFormat::Json),
        _ => None,
    }
}
