use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use proxy_radar::{
    database::{SettingsDatabase, Theme},
    proxy::{
        fetcher::DEFAULT_RELAY_RAW_ENDPOINT, launch_link, probe::DEFAULT_RELAY_PROBE_ENDPOINT,
        ConsoleSink, EntryParser, Feed, FeedKind, PageSize, Pipeline, ProbeConfig, ProbeResult,
        RunContext, Summary,
    },
    tui::App,
    Config,
};
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fetches public Telegram proxy and V2Ray config lists and probes their latency
#[derive(Parser)]
#[command(name = "proxy-radar")]
#[command(about = "Fetches public Telegram proxy and V2Ray config lists and probes their latency")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Database URL for persisted settings
    #[arg(short, long, default_value = "sqlite://proxy-radar.db")]
    database: String,

    /// Relay endpoint used when a list cannot be fetched directly
    #[arg(long, default_value = DEFAULT_RELAY_RAW_ENDPOINT)]
    relay_raw: String,

    /// Relay endpoint wrapping each latency probe
    #[arg(long, default_value = DEFAULT_RELAY_PROBE_ENDPOINT)]
    relay_probe: String,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Append logs to this file (the TUI logs nothing without it)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive TUI
    Tui {
        /// Built-in list to open (telegram, v2ray)
        #[arg(short, long, default_value = "telegram")]
        feed: String,
        /// Custom list URL, parsed as the kind given by --feed
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Fetch and parse a list without probing
    Fetch {
        /// Built-in list to fetch (telegram, v2ray)
        #[arg(short, long, default_value = "telegram")]
        feed: String,
        /// Custom list URL
        #[arg(short, long)]
        url: Option<String>,
        /// Parse a local file instead of fetching
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Save the recognized lines to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch, parse and probe a list, then print the fastest page
    Check {
        /// Built-in list to check (telegram, v2ray)
        #[arg(short, long, default_value = "telegram")]
        feed: String,
        /// Custom list URL
        #[arg(short, long)]
        url: Option<String>,
        /// Probe the lines of a local file instead of fetching
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Number of concurrent probes
        #[arg(short = 'n', long, default_value = "20")]
        concurrency: usize,
        /// Timeout per probe in seconds
        #[arg(long, default_value = "8")]
        timeout: u64,
        /// How many results to print (a number or 'all')
        #[arg(short, long, default_value = "10")]
        page: PageSize,
        /// Probe in list order instead of shuffling
        #[arg(long)]
        no_shuffle: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or set the persisted UI theme
    Theme {
        /// New theme (light, dark)
        value: Option<String>,
    },
}

#[derive(Serialize)]
struct CheckReport<'a> {
    run_id: u64,
    checked: usize,
    summary: Summary,
    results: &'a [ProbeResult],
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let interactive = matches!(cli.command, Some(Commands::Tui { .. }) | None);
    init_logging(cli.verbose, cli.log_file.as_deref(), interactive)?;

    let config = Config::new()
        .with_database_url(cli.database.clone())
        .with_relays(Some(cli.relay_raw.clone()), Some(cli.relay_probe.clone()));

    match cli.command {
        Some(Commands::Tui { feed, url }) => run_tui(config, &feed, url).await?,
        None => run_tui(config, "telegram", None).await?,
        Some(Commands::Fetch {
            feed,
            url,
            input,
            output,
            json,
        }) => {
            let descriptors = match input {
                Some(path) => {
                    let descriptors = EntryParser::parse_file(&path)?;
                    println!("Parsed {} endpoints from {:?}", descriptors.len(), path);
                    descriptors
                }
                None => {
                    let (feed, _) = resolve_feed(&feed, url)?;
                    let pipeline = Pipeline::from_config(&config)?;
                    let (descriptors, stats) = pipeline.fetch_descriptors(&feed).await?;
                    println!(
                        "Parsed {} endpoints from {} ({} lines, {} skipped, {} without host/port)",
                        descriptors.len(),
                        feed.name,
                        stats.total_lines,
                        stats.excluded,
                        stats.unresolved
                    );
                    descriptors
                }
            };

            if let Some(output_path) = output {
                EntryParser::save_to_file(&descriptors, &output_path)?;
                println!("Saved endpoints to {:?}", output_path);
            } else if json {
                println!("{}", serde_json::to_string_pretty(&descriptors)?);
            } else {
                for descriptor in &descriptors {
                    println!("{}", descriptor);
                }
            }
        }
        Some(Commands::Check {
            feed,
            url,
            input,
            concurrency,
            timeout,
            page,
            no_shuffle,
            json,
        }) => {
            let probe = ProbeConfig::new()
                .with_concurrency(concurrency)
                .with_timeout(Duration::from_secs(timeout))
                .with_shuffle(!no_shuffle);
            let config = config.with_probe(probe);
            let pipeline = Pipeline::from_config(&config)?;

            let runs = RunContext::new();
            let token = runs.begin();
            let mut sink = ConsoleSink::new();

            let outcome = match input {
                Some(path) => {
                    let descriptors = EntryParser::parse_file(&path)?;
                    pipeline.engine().run(descriptors, &token, &mut sink).await
                }
                None => {
                    let (feed, _) = resolve_feed(&feed, url)?;
                    pipeline.run(&feed, &token, &mut sink).await?
                }
            };

            let summary = outcome.aggregator.summary();
            let results = outcome.aggregator.page(page);
            let thresholds = *outcome.aggregator.thresholds();

            if json {
                let report = CheckReport {
                    run_id: outcome.run_id,
                    checked: outcome.completed,
                    summary,
                    results,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for (i, result) in results.iter().enumerate() {
                    let tier = result
                        .tier(&thresholds)
                        .map_or_else(String::new, |t| t.to_string());
                    println!(
                        "{:>3}. {:<30} {:>6}ms  {:<4}  {}",
                        i + 1,
                        result.descriptor.to_string(),
                        result.elapsed_ms.unwrap_or_default(),
                        tier,
                        launch_link(&result.descriptor)
                    );
                }
                println!(
                    "\nResults: {} working of {} checked | good: {} | mid: {} | bad: {}",
                    summary.total, outcome.completed, summary.good, summary.mid, summary.bad
                );
            }
        }
        Some(Commands::Theme { value }) => {
            let db = SettingsDatabase::new(&config.database_url).await?;
            if let Some(value) = value {
                let theme: Theme = value.parse()?;
                db.set_theme(theme).await?;
                println!("Theme set to {}", theme);
            } else {
                let theme = db.theme().await?;
                match db.theme_updated_at().await? {
                    Some(at) => println!("{} (since {})", theme, at.format("%Y-%m-%d %H:%M:%S UTC")),
                    None => println!("{} (default)", theme),
                }
            }
        }
    }

    Ok(())
}

async fn run_tui(config: Config, feed: &str, url: Option<String>) -> Result<()> {
    let (feed, pinned) = resolve_feed(feed, url)?;
    let settings = SettingsDatabase::new(&config.database_url).await?;
    let pipeline = Pipeline::from_config(&config)?;
    let mut app = App::new(pipeline, settings, feed, pinned).await?;
    app.run().await
}

/// Built-in feed of the given kind, or a custom URL pinned to it
fn resolve_feed(kind: &str, url: Option<String>) -> Result<(Feed, bool)> {
    let kind: FeedKind = kind.parse().map_err(|e: String| anyhow!(e))?;
    Ok(match url {
        Some(url) => (Feed::custom(&url, kind), true),
        None => (Feed::builtin(kind), false),
    })
}

fn init_logging(verbose: u8, log_file: Option<&Path>, interactive: bool) -> Result<()> {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    } else if interactive {
        // Anything on stderr would tear the alternate screen.
        builder.filter_level(log::LevelFilter::Off);
    }

    builder.init();
    Ok(())
}
