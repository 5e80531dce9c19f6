mod config;
mod display;
mod engine;

use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use nerlight_core::{
    Analysis, Analyzer, DEFAULT_TEXT, Infer, LabelCatalog, NerError, PredictionRecord,
    SpanResolver,
};
use tracing::warn;

use crate::engine::LazyClassifier;

const EMPTY_INPUT_WARNING: &str = "Please enter a sentence.";

#[derive(Parser)]
#[command(name = "nerlight", version, about = "Named entity recognition with highlighted output")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Tag entities in a piece of text.
    Analyze {
        /// Text to analyse.
        #[arg(default_value = DEFAULT_TEXT)]
        text: String,
        #[command(flatten)]
        model: ModelArgs,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Resolve precomputed pipeline predictions (JSON array) against text.
    Resolve {
        #[arg(long, default_value = DEFAULT_TEXT)]
        text: String,
        /// Predictions file, or `-` for stdin.
        #[arg(long)]
        predictions: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Read lines from stdin and tag each one, loading the model once.
    Repl {
        #[command(flatten)]
        model: ModelArgs,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Show the label legend.
    Labels,
}

#[derive(clap::Args)]
struct ModelArgs {
    /// Directory containing model.onnx, tokenizer.json and config.json.
    #[arg(long, env = config::MODEL_DIR_ENV)]
    model_dir: Option<PathBuf>,
    /// Model label to leave out of the output; repeatable (default: O).
    #[arg(long = "ignore-label", value_name = "LABEL")]
    ignore_labels: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Html,
    Json,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("nerlight v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Analyze {
            text,
            model,
            format,
        } => {
            let mut analyzer = build_analyzer(&model)?;
            if let Some(analysis) = run_request(&mut analyzer, &text)? {
                emit(&analysis, format)?;
            }
        }
        Command::Resolve {
            text,
            predictions,
            format,
        } => {
            if text.trim().is_empty() {
                warn_empty();
                return Ok(());
            }
            let records = read_records(&predictions)?;
            let resolution = SpanResolver::default().resolve_records(&text, records);
            emit(&Analysis { text, resolution }, format)?;
        }
        Command::Repl { model, format } => {
            let mut analyzer = build_analyzer(&model)?;
            eprintln!("Enter text to analyse, one line at a time (Ctrl-D to quit).");
            for line in std::io::stdin().lock().lines() {
                let line = line.context("reading stdin")?;
                match run_request(&mut analyzer, &line) {
                    Ok(Some(analysis)) => emit(&analysis, format)?,
                    Ok(None) => {}
                    Err(e) => eprintln!("Error: {e:#}"),
                }
            }
        }
        Command::Labels => display::print_legend(&LabelCatalog),
    }

    Ok(())
}

fn build_analyzer(model: &ModelArgs) -> anyhow::Result<Analyzer<LazyClassifier>> {
    let model_dir = config::find_model_dir(model.model_dir.as_deref())?;
    let engine = LazyClassifier::new(model_dir).with_ignore_labels(model.ignore_labels.clone());
    Ok(Analyzer::new(engine))
}

/// Analyse one text. Blank input is a warning, not an error.
fn run_request<I: Infer>(
    analyzer: &mut Analyzer<I>,
    text: &str,
) -> anyhow::Result<Option<Analysis>> {
    match analyzer.analyze(text) {
        Ok(analysis) => Ok(Some(analysis)),
        Err(NerError::EmptyInput) => {
            warn_empty();
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn warn_empty() {
    warn!("empty input, skipping inference");
    eprintln!("{EMPTY_INPUT_WARNING}");
}

fn read_records(path: &Path) -> anyhow::Result<Vec<Result<PredictionRecord, String>>> {
    let mut raw = String::new();
    if path == Path::new("-") {
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("reading predictions from stdin")?;
    } else {
        raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
    }
    parse_records(&raw)
}

/// Parse a pipeline JSON array. Only a malformed array is an error; each
/// item is decoded separately so one bad record cannot reject the rest.
fn parse_records(raw: &str) -> anyhow::Result<Vec<Result<PredictionRecord, String>>> {
    let items: Vec<serde_json::Value> =
        serde_json::from_str(raw).context("predictions must be a JSON array")?;
    Ok(items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|e| e.to_string()))
        .collect())
}

fn emit(analysis: &Analysis, format: Format) -> anyhow::Result<()> {
    match format {
        Format::Text => display::print_analysis(analysis, false),
        Format::Html => display::print_analysis(analysis, true),
        Format::Json => {
            println!("{}", display::render_json(analysis)?);
            Ok(())
        }
    }
}
