//! CLI binary for pitchdeck-analyzer.
//!
//! A thin shim over the library crate: maps flags to `AnalyzerConfig` /
//! `ServerConfig`, resolves the LLM provider, and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pitchdeck_analyzer::pipeline::input::resolve_input;
use pitchdeck_analyzer::{
    serve, AnalysisOrchestrator, AnalysisOutcome, AnalysisRecord, AnalyzerConfig, AppState,
    ProviderClient, ServerConfig, TextExtractor,
};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the upload endpoint on :3000
  deck-analyzer serve

  # Analyze a local deck, human-readable summary
  deck-analyzer analyze seed-deck.pdf

  # Same, but print the endpoint's JSON body
  deck-analyzer analyze --json https://example.com/decks/series-a.pdf

  # Check what text the extractor sees (no API key needed)
  deck-analyzer extract seed-deck.pdf

  # Use a specific provider and model
  deck-analyzer --provider anthropic --model claude-sonnet-4-20250514 analyze deck.pdf

ENDPOINT:
  POST /api/DeckAnalyzer   multipart/form-data, file field "pitchDeck"
  GET  /health

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY     OpenAI API key (preferred when set)
  ANTHROPIC_API_KEY  Anthropic API key
  GEMINI_API_KEY     Google Gemini API key
  DECK_MODEL         Override model ID (default gpt-4o)
  DECK_PROVIDER      Override provider (openai, anthropic, gemini, ollama, azure)
  PDFIUM_LIB_PATH    Directory or file of the pdfium shared library
  RUST_LOG           Override the log filter
"#;

/// Analyze startup pitch decks with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "deck-analyzer",
    version,
    about = "Analyze startup pitch decks with an LLM",
    long_about = "Extract the text of a pitch-deck PDF, ask a language model for a structured \
investor analysis (market, product, team, traction, red flags), and validate its JSON reply. \
Runs as an HTTP endpoint or one-shot from the command line.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    analyzer: AnalyzerArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DECK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DECK_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct AnalyzerArgs {
    /// LLM model ID.
    #[arg(long, global = true, env = "DECK_MODEL", default_value = "gpt-4o")]
    model: String,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        global = true,
        env = "DECK_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          OPENAI_API_KEY wins when several keys are present."
    )]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "DECK_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, global = true, env = "DECK_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Characters of extracted text sent to the model.
    #[arg(long, global = true, env = "DECK_MAX_CHARS", default_value_t = 8000)]
    max_chars: usize,

    /// Decks with fewer extracted characters are rejected.
    #[arg(long, global = true, env = "DECK_MIN_CHARS", default_value_t = 50)]
    min_chars: usize,

    /// Pages read by the page-wise fallback reader.
    #[arg(long, global = true, env = "DECK_MAX_PAGES", default_value_t = 20)]
    max_pages: usize,

    /// Concurrent page reads in the fallback reader.
    #[arg(long, global = true, env = "DECK_PAGE_CONCURRENCY", default_value_t = 20)]
    page_concurrency: usize,

    /// Directory (or file) of the pdfium shared library.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP endpoint.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "DECK_BIND", default_value = "0.0.0.0:3000")]
        bind: SocketAddr,

        /// Path of the analysis endpoint.
        #[arg(long, env = "DECK_ROUTE", default_value = "/api/DeckAnalyzer")]
        route: String,

        /// Largest accepted upload in MiB.
        #[arg(long, env = "DECK_MAX_UPLOAD_MB", default_value_t = 20)]
        max_upload_mb: usize,
    },

    /// Analyze one deck and print the result.
    Analyze {
        /// Local PDF/DOCX path or HTTP/HTTPS URL.
        input: String,

        /// Print the endpoint's JSON response body.
        #[arg(long, env = "DECK_JSON")]
        json: bool,

        /// HTTP download timeout in seconds.
        #[arg(long, env = "DECK_DOWNLOAD_TIMEOUT", default_value_t = 120)]
        download_timeout: u64,
    },

    /// Print the normalized text the model would see. No API key needed.
    Extract {
        /// Local PDF/DOCX path or HTTP/HTTPS URL.
        input: String,

        /// HTTP download timeout in seconds.
        #[arg(long, env = "DECK_DOWNLOAD_TIMEOUT", default_value_t = 120)]
        download_timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // One-shot commands show a spinner, so library INFO logs are muted
    // unless --verbose; the server logs at INFO by default.
    let serving = matches!(cli.command, Command::Serve { .. });
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || !serving {
        "error"
    } else {
        "info,tower_http=debug"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli.analyzer)?;

    match cli.command {
        Command::Serve {
            bind,
            route,
            max_upload_mb,
        } => {
            let server_config = ServerConfig {
                bind,
                route,
                max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
            };
            let orchestrator = build_orchestrator(&config)?;
            serve(&server_config, AppState::new(Arc::new(orchestrator)))
                .await
                .context("Server failed")?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Analyze {
            input,
            json,
            download_timeout,
        } => run_analyze(&config, &input, json, download_timeout, cli.quiet).await,
        Command::Extract {
            input,
            download_timeout,
        } => run_extract(&config, &input, download_timeout, cli.quiet).await,
    }
}

/// Map CLI args to `AnalyzerConfig`.
fn build_config(args: &AnalyzerArgs) -> Result<AnalyzerConfig> {
    let mut builder = AnalyzerConfig::builder()
        .model(args.model.clone())
        .temperature(args.temperature)
        .max_text_chars(args.max_chars)
        .min_text_chars(args.min_chars)
        .max_fallback_pages(args.max_pages)
        .page_concurrency(args.page_concurrency);

    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(n) = args.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(ref path) = args.pdfium_lib {
        builder = builder.pdfium_library_path(path.clone());
    }

    builder.build().context("Invalid configuration")
}

fn build_orchestrator(config: &AnalyzerConfig) -> Result<AnalysisOrchestrator> {
    let model = ProviderClient::from_config(config).context("Failed to set up LLM provider")?;
    Ok(AnalysisOrchestrator::new(config, Arc::new(model)))
}

fn spinner(quiet: bool, prefix: &'static str) -> Option<ProgressBar> {
    if quiet {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix(prefix);
    bar.enable_steady_tick(Duration::from_millis(80));
    Some(bar)
}

async fn run_analyze(
    config: &AnalyzerConfig,
    input: &str,
    json: bool,
    download_timeout: u64,
    quiet: bool,
) -> Result<ExitCode> {
    let orchestrator = build_orchestrator(config)?;
    let bar = spinner(quiet, "Analyzing");

    if let Some(ref b) = bar {
        b.set_message("reading input…");
    }
    let document = resolve_input(input, download_timeout)
        .await
        .with_context(|| format!("Failed to read '{input}'"))?;

    if let Some(ref b) = bar {
        b.set_message(format!("asking {}…", config.model));
    }
    let outcome = orchestrator.run(Some(document)).await;
    if let Some(b) = bar {
        b.finish_and_clear();
    }

    if json {
        let body = serde_json::to_string_pretty(&outcome).context("Failed to serialise output")?;
        println!("{body}");
    } else {
        print_outcome(&outcome);
    }

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_extract(
    config: &AnalyzerConfig,
    input: &str,
    download_timeout: u64,
    quiet: bool,
) -> Result<ExitCode> {
    let document = resolve_input(input, download_timeout)
        .await
        .with_context(|| format!("Failed to read '{input}'"))?;

    let extractor = TextExtractor::from_config(config);
    let Some(content_type) = document.content_type() else {
        eprintln!(
            "{} Unsupported file type '{}'. Expected a PDF or DOCX file.",
            red("✘"),
            document.declared_type()
        );
        return Ok(ExitCode::FAILURE);
    };

    let bar = spinner(quiet, "Extracting");
    let result = extractor.extract(document.into_bytes(), content_type).await;
    if let Some(b) = bar {
        b.finish_and_clear();
    }

    match result {
        Ok(text) => {
            println!("{}", text.as_str());
            if !quiet {
                eprintln!(
                    "{} {} chars{}  via {}",
                    green("✔"),
                    bold(&text.char_count().to_string()),
                    if text.truncated() { " (truncated)" } else { "" },
                    dim(&extractor.strategy_names().join(" → ")),
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{} {}", red("✘"), e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_outcome(outcome: &AnalysisOutcome) {
    match outcome {
        AnalysisOutcome::Success { record, metadata } => {
            print_record(record);
            eprintln!(
                "{} {} chars analysed at {}",
                green("✔"),
                metadata.text_extracted,
                dim(&metadata.timestamp.to_rfc3339()),
            );
        }
        AnalysisOutcome::Failure(failure) => {
            eprintln!("{} {:?}: {}", red("✘"), failure.kind, failure.message);
            if let Some(ref debug) = failure.debug {
                eprintln!("{}", dim("── raw model reply ──"));
                eprintln!("{}", debug.raw_response);
            }
        }
    }
}

fn print_record(record: &AnalysisRecord) {
    let sections = [
        ("Market size", record.market_size()),
        ("Product", record.product_summary()),
        ("Team", record.team_overview()),
        ("Traction", record.traction_summary()),
    ];
    for (title, body) in sections {
        println!("{}\n{}\n", bold(title), body);
    }

    println!("{}", bold("Red flags"));
    if record.red_flags().is_empty() {
        println!("{}", dim("none listed"));
    }
    for flag in record.red_flags() {
        println!("  • {flag}");
    }

    for (key, value) in record.extra() {
        println!("\n{}\n{}", bold(key), value);
    }
}
