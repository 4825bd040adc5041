use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dbsnp_build::app::App;
use dbsnp_build::config::{ConfigLoader, parse_delimiter};
use dbsnp_build::domain::MissingPathPolicy;
use dbsnp_build::error::ResolverError;
use dbsnp_build::output::{ConsoleSink, JsonOutput, OutputMode, print_human_summary};
use dbsnp_build::remote::FtpSessionProvider;
use dbsnp_build::resolver::DirectoryResolver;
use dbsnp_build::retry::ThreadSleeper;
use dbsnp_build::table::{RecordReader, RecordWriter};

#[derive(Parser)]
#[command(name = "dbsnp-build")]
#[command(about = "Fill in the latest dbSNP build number for each species in a table")]
#[command(version, author)]
struct Cli {
    /// Species table to read
    #[arg(long)]
    input: Option<Utf8PathBuf>,

    /// Enriched table to write
    #[arg(long)]
    output: Option<Utf8PathBuf>,

    /// JSON config file (defaults to ./dbsnp-build.json when present)
    #[arg(long)]
    config: Option<String>,

    /// Single-character field delimiter
    #[arg(long)]
    delimiter: Option<String>,

    /// What to do when a species directory does not exist on the server
    #[arg(long, value_enum)]
    missing_path: Option<MissingPathPolicy>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<ResolverError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ResolverError) -> u8 {
    if error.is_fatal() { 2 } else { 1 }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(input) = cli.input {
        config.input = input;
    }
    if let Some(output) = cli.output {
        config.output = output;
    }
    if let Some(delimiter) = cli.delimiter.as_deref() {
        config.delimiter = parse_delimiter(delimiter)?;
    }
    if let Some(policy) = cli.missing_path {
        config.missing_path = policy;
    }

    let mut reader = RecordReader::open(&config.input, config.delimiter)?;
    let mut writer = RecordWriter::create(&config.output, config.delimiter)?;
    info!(input = %config.input, output = %config.output, host = %config.ftp.host, "starting run");

    let resolver = DirectoryResolver::new(&config.root, config.retry, config.missing_path);
    let app = App::new(FtpSessionProvider::new(config.ftp), resolver, ThreadSleeper);
    let summary = app.run(&mut reader, &mut writer, &ConsoleSink)?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_summary(&summary).into_diagnostic()?,
        OutputMode::Human => print_human_summary(&summary),
    }
    Ok(())
}
