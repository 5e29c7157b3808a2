//! Interactive chat over a token-budgeted context window.
//!
//! Reads one user turn per line from stdin and prints each response. The API
//! key comes from the `OPENROUTER_KEY` environment variable.
//!
//! # Examples
//!
//! ```sh
//! # Chat with a 1024-token window; old attachments get summarized
//! cinch-window --overview "You are a Python debugging assistant." \
//!   --max-tokens 1024 --data-policy summarize --data-file trace.txt
//!
//! # No network: responses echo the last user turn
//! printf 'hello\n/show\n/usage\n' | cinch-window --offline --estimate-tokens
//!
//! # Watch compaction and fitting decisions
//! RUST_LOG=cinch_window=debug cinch-window --offline
//! ```
//!
//! Line commands: `/show` prints the compacted ledger, `/usage` prints the
//! token usage, `/quit` exits.

use cinch_window::api::{CompletionService, ScriptedService};
use cinch_window::context::{
    CharRatioTokenizer, ContextConfig, ContextWindow, DEFAULT_MAX_TOKENS, DataPolicy,
    TiktokenTokenizer, Tokenizer, UserTurn,
};
use cinch_window::{DEFAULT_MODEL, OpenRouterClient};
use clap::Parser;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Chat with a model through a token-budgeted, self-compacting context window.
#[derive(Parser)]
#[command(name = "cinch-window")]
struct Cli {
    // ── Conversation ───────────────────────────────────────────
    /// System overview pinned at the start of every request
    #[arg(long, default_value = "You are a helpful assistant.")]
    overview: String,

    /// Model to use
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Sampling temperature
    #[arg(long, default_value_t = 0.0)]
    temperature: f32,

    // ── Budget and compaction ──────────────────────────────────
    /// Maximum tokens per request, overview included
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: usize,

    /// What happens to a turn's data once it ages: pure, remove, or summarize
    #[arg(long, default_value = "pure")]
    data_policy: DataPolicy,

    /// Attach this file's contents as data to the first turn
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// System instruction for the summarizer
    #[arg(long)]
    summarization_system: Option<String>,

    /// Count tokens with a characters-per-token estimate instead of tiktoken
    #[arg(long)]
    estimate_tokens: bool,

    // ── Service ────────────────────────────────────────────────
    /// Retries after the first attempt for malformed responses
    #[arg(long, default_value_t = 1)]
    retries: u32,

    /// Delay between attempts, in milliseconds
    #[arg(long, default_value_t = 1000)]
    wait_ms: u64,

    /// Do not call any API; responses echo the last user turn
    #[arg(long)]
    offline: bool,

    /// OpenRouter API key
    #[arg(long, env = "OPENROUTER_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

fn build_service(cli: &Cli) -> Result<Box<dyn CompletionService>, String> {
    if cli.offline {
        return Ok(Box::new(ScriptedService::new()));
    }
    let Some(key) = cli.api_key.as_deref() else {
        return Err("OPENROUTER_KEY environment variable is not set (or pass --offline)".into());
    };
    let client = OpenRouterClient::with_headers(
        key,
        "https://github.com/tacryt-socryp/cinch-rs",
        "cinch-window",
    )
    .map_err(|e| format!("failed to create API client: {e}"))?;
    Ok(Box::new(client))
}

fn build_tokenizer(cli: &Cli) -> Result<Box<dyn Tokenizer>, String> {
    if cli.estimate_tokens {
        return Ok(Box::new(CharRatioTokenizer::default()));
    }
    let tokenizer = TiktokenTokenizer::for_model(&cli.model).map_err(|e| e.to_string())?;
    Ok(Box::new(tokenizer))
}

fn build_config(cli: &Cli) -> ContextConfig {
    let mut config = ContextConfig::new(&cli.overview)
        .with_model(&cli.model)
        .with_max_tokens(cli.max_tokens)
        .with_default_data_policy(cli.data_policy)
        .with_temperature(cli.temperature)
        .with_retries(cli.retries)
        .with_wait_time(Duration::from_millis(cli.wait_ms));
    if let Some(system) = &cli.summarization_system {
        config = config.with_summarization_system(system);
    }
    config
}

async fn run(cli: &Cli) -> Result<(), String> {
    let service = build_service(cli)?;
    let tokenizer = build_tokenizer(cli)?;
    let mut data = match &cli.data_file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read data file '{}': {e}", path.display()))?,
        ),
        None => None,
    };

    let mut window = ContextWindow::new(build_config(cli), service.as_ref(), tokenizer.as_ref())
        .map_err(|e| e.to_string())?;

    for line in io::stdin().lock().lines() {
        let line = line.map_err(|e| format!("failed to read stdin: {e}"))?;
        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/show" => println!("{}", window.visualize()),
            "/usage" => println!("{}", window.usage().to_log_string()),
            text => {
                let mut turn = UserTurn::new(text);
                if let Some(data) = data.take() {
                    turn = turn.with_data(data);
                }
                let reply = window.add_message(turn).await.map_err(|e| e.to_string())?;
                println!("{reply}");
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
