use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use tabula_api::document::Document;
use tabula_engine::{EngineError, Query};

#[derive(Parser)]
#[command(name = "tabula", about = "Shape CSV or JSON documents into typed frames")]
struct Cli {
    /// Query file (.toml or .json).
    #[arg(long, env = "TABULA_QUERY")]
    query: PathBuf,

    /// Input document. `-` reads stdin.
    #[arg(long, default_value = "-")]
    input: PathBuf,

    /// Input format. Guessed from the input extension when omitted.
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Pretty-print the frame.
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Csv,
    Json,
}

impl Format {
    fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Format::Csv,
            _ => Format::Json,
        }
    }
}

fn read_input(path: &Path) -> Result<String, EngineError> {
    let result = if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).map(|_| text)
    } else {
        std::fs::read_to_string(path)
    };
    result.map_err(|source| EngineError::Read {
        path: path.display().to_string(),
        source,
    })
}

fn run(cli: &Cli) -> Result<String, EngineError> {
    tracing::info!(query = %cli.query.display(), "loading query");
    let query = Query::load(&cli.query)?;

    let format = cli.format.unwrap_or_else(|| Format::detect(&cli.input));
    let text = read_input(&cli.input)?;
    let document: Document = match format {
        Format::Csv => codec_csv::parse(&text, &query.csv)?,
        Format::Json => codec_json::parse(&text)?,
    };

    let frame = tabula_engine::run(document, &query)?;
    tracing::info!(
        frame = %frame.name,
        columns = frame.columns.len(),
        rows = frame.row_count(),
        "frame ready"
    );

    let json = if cli.pretty {
        serde_json::to_string_pretty(&frame)
    } else {
        serde_json::to_string(&frame)
    };
    json.map_err(|e| EngineError::Config(format!("cannot serialize frame: {e}")))
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!(error = %e, kind = ?e.kind(), "conversion failed");
            std::process::exit(1);
        }
    }
}
