//! reactor-worker — host glue around the rule engine.
//!
//! Reads newline-delimited JSON event envelopes and feeds each one to the
//! matching entry point:
//! - `{"event":"actionCreated","action":{...}}`
//! - `{"event":"thngPropertiesChanged","thng":{"id":...},"changes":{...}}`
//!
//! Events are handled one at a time; the next line is read only after the
//! previous event signalled completion.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use reactor_core::{Config, HostEvent};
use reactor_remote::{DryRunApi, EntityApi, HttpEntityApi, OutputDispatcher};
use reactor_rules::validation::validate_table;
use reactor_rules::{Completion, Reactor, RuleEvaluator, RuleTable};

// ── CLI ─────────────────────────────────────────────────────────────

/// Rule engine worker — evaluates action and property-change events.
#[derive(Parser, Debug)]
#[command(name = "reactor-worker", version, about)]
struct Cli {
    /// Rule table to use instead of the embedded one.
    #[arg(long, env = "REACTOR_RULES")]
    rules: Option<PathBuf>,

    /// Log remote calls instead of sending them.
    #[arg(long, env = "REACTOR_DRY_RUN")]
    dry_run: bool,

    /// Entity API base URL (overrides API_URL).
    #[arg(long)]
    api_url: Option<String>,

    /// Entity API key (overrides API_KEY).
    #[arg(long)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process event envelopes from a file, or stdin when omitted.
    Run {
        #[arg(long)]
        events: Option<PathBuf>,
    },
    /// Validate the rule table and print a JSON report.
    Validate,
    /// Classify one raw payload and dispatch it to a thng.
    Dispatch {
        #[arg(long)]
        thng: String,
        /// Payload JSON, e.g. '{"key":"active","value":true}'.
        #[arg(long)]
        payload: String,
    },
}

// ── helpers ─────────────────────────────────────────────────────────

fn load_table(cli: &Cli) -> anyhow::Result<Arc<RuleTable>> {
    match &cli.rules {
        Some(path) => {
            let table = RuleTable::from_path(path)
                .with_context(|| format!("failed to load rules from {}", path.display()))?;
            info!(path = %path.display(), rules = table.len(), "loaded rule table");
            Ok(RuleTable::install(table)?)
        }
        None => Ok(RuleTable::global()?),
    }
}

fn build_api(cli: &Cli, config: &Config) -> anyhow::Result<Arc<dyn EntityApi>> {
    if cli.dry_run {
        return Ok(Arc::new(DryRunApi));
    }

    let mut api_config = config.api.clone();
    if let Some(url) = &cli.api_url {
        api_config.url = url.clone();
    }
    if let Some(key) = &cli.api_key {
        api_config.key = Some(key.clone());
    }
    if !api_config.is_configured() {
        warn!("no API key configured; the entity API will likely reject requests");
    }
    Ok(Arc::new(HttpEntityApi::from_config(&api_config)?))
}

#[derive(Debug, Default)]
struct RunStats {
    succeeded: u64,
    failed: u64,
    skipped: u64,
}

async fn run_events<R>(reactor: &Reactor, reader: R) -> anyhow::Result<RunStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = RunStats::default();
    let mut lines = reader.lines();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let event: HostEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping undecodable event");
                stats.skipped += 1;
                continue;
            }
        };

        let mut outcome = None;
        reactor.on_event(event, |c| outcome = Some(c)).await;
        match outcome {
            Some(Completion::Succeeded) => stats.succeeded += 1,
            Some(Completion::Failed) | None => stats.failed += 1,
        }
    }

    Ok(stats)
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    reactor_core::config::load_dotenv();
    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_summary();

    let table = load_table(&cli)?;

    match &cli.command {
        Command::Validate => {
            let report = validate_table(&table);
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.valid {
                anyhow::bail!("{} invalid rule(s)", report.errors.len());
            }
        }
        Command::Dispatch { thng, payload } => {
            let raw: serde_json::Value =
                serde_json::from_str(payload).context("payload is not valid JSON")?;
            let dispatcher = OutputDispatcher::new(build_api(&cli, &config)?);
            let response = dispatcher.dispatch_value(thng, &raw).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Run { events } => {
            let report = validate_table(&table);
            for e in &report.errors {
                warn!(path = %e.path, rule = %e.rule, error = %e.message, "invalid rule will fail every event");
            }

            let dispatcher = OutputDispatcher::new(build_api(&cli, &config)?);
            info!(api = dispatcher.api_name(), rules = table.len(), "reactor-worker starting");
            let reactor = Reactor::new(RuleEvaluator::new(table.clone(), dispatcher));

            let stats = match events {
                Some(path) => {
                    let file = tokio::fs::File::open(path)
                        .await
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    run_events(&reactor, BufReader::new(file)).await?
                }
                None => run_events(&reactor, BufReader::new(tokio::io::stdin())).await?,
            };

            info!(
                succeeded = stats.succeeded,
                failed = stats.failed,
                skipped = stats.skipped,
                "reactor-worker exited cleanly"
            );
        }
    }

    Ok(())
}
