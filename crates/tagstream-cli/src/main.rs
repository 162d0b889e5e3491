//! TagStream CLI
//!
//! Splits a recorded LLM completion stream (SSE body, as saved from the
//! wire) into reasoning and deliverable text.
//!
//! ```text
//! tagstream --input completion.sse --format json
//! curl -sN ... | tagstream --think-start "<reasoning>" --think-end "</reasoning>"
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio_util::io::ReaderStream;
use tracing::info;

mod config;
mod pipeline;

use config::StreamConfig;
use pipeline::Outcome;

/// How the result is printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Labelled think and content sections
    #[default]
    Text,
    /// The full outcome as JSON
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "tagstream")]
#[command(about = "Split streamed LLM output into reasoning and content", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "tagstream.yaml")]
    config: String,

    /// Recorded stream body (reads stdin when omitted)
    #[arg(short, long)]
    input: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Use the one-shot analysis instead of the streaming result
    #[arg(long)]
    one_shot: bool,

    /// Byte stream encoding (utf-8, latin1)
    #[arg(long, env = "TAGSTREAM_ENCODING")]
    encoding: Option<String>,

    /// Payload adapter (openai, anthropic)
    #[arg(long, env = "TAGSTREAM_ADAPTER")]
    adapter: Option<String>,

    /// Thinking block start marker
    #[arg(long)]
    think_start: Option<String>,

    /// Thinking block end marker
    #[arg(long)]
    think_end: Option<String>,

    /// Deliverable fence start marker
    #[arg(long)]
    fence_start: Option<String>,

    /// Deliverable fence end marker
    #[arg(long)]
    fence_end: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config = StreamConfig::load(&cli.config, &cli)?;
    info!(
        adapter = ?config.decoder.adapter,
        encoding = ?config.decoder.encoding,
        think_start = %config.markers.think_start,
        "configuration loaded"
    );

    let outcome = match &cli.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {path}"))?;
            pipeline::run(ReaderStream::new(file), &config).await?
        }
        None => pipeline::run(ReaderStream::new(tokio::io::stdin()), &config).await?,
    };

    print_outcome(&outcome, cli.format, cli.one_shot)
}

fn print_outcome(outcome: &Outcome, format: OutputFormat, one_shot: bool) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(outcome)?);
        }
        OutputFormat::Text => {
            let (think, content) = if one_shot {
                (&outcome.one_shot.think, &outcome.one_shot.content)
            } else {
                (&outcome.stream.think, &outcome.stream.content)
            };
            println!("== think ==\n{think}\n== content ==\n{content}");
        }
    }
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("tagstream=debug,tagstream_core=debug,tagstream_classifier=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tagstream=info"))
    };

    // Logs go to stderr so stdout carries only the result
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
