mod api;
mod cache;
mod catalog;
mod error;
mod parser;
mod report;
mod service;
mod source;
mod stats;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};

use catalog::{Catalog, DirCatalog, HttpCatalog, DEFAULT_CATALOG_URL};
use service::PlayService;
use source::{DocumentSource, FileSource, HttpSource};
use stats::Ranking;

#[derive(Parser)]
#[command(name = "play_stats", about = "Character and word statistics for play scripts")]
struct Cli {
    /// Index page listing the plays
    #[arg(long, env = "PLAYS_CATALOG_URL", default_value = DEFAULT_CATALOG_URL, global = true)]
    catalog_url: String,

    /// Read plays from a local directory of XML files instead of the catalog URL
    #[arg(long, env = "PLAYS_DIR", global = true)]
    dir: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long, env = "PLAYS_TIMEOUT_SECS", default_value = "30", global = true)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the plays in the catalog
    List,
    /// Character roster and line counts for one play
    Play {
        index: usize,
        /// Print the raw JSON analysis
        #[arg(long)]
        json: bool,
    },
    /// Most used words, for the top characters or a single one
    Words {
        index: usize,
        /// Character name, matched exactly (bypasses the cache)
        #[arg(short, long)]
        character: Option<String>,
    },
    /// Side-by-side summary of two plays
    Compare { first: usize, second: usize },
    /// Analyse every play in the catalog
    Report {
        /// Plays analysed at once
        #[arg(short = 'j', long, env = "PLAYS_CONCURRENCY", default_value_t = report::DEFAULT_CONCURRENCY)]
        concurrency: usize,
        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },
    /// Serve the JSON API
    Serve {
        #[arg(long, env = "PLAYS_BIND", default_value = "0.0.0.0:4567")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let service = Arc::new(build_service(&cli)?);

    let result = match cli.command {
        Commands::List => {
            let plays = service.plays().await;
            if plays.is_empty() {
                println!("No plays found.");
                return Ok(());
            }
            for (i, p) in plays.iter().enumerate() {
                println!("{:>3} | {}", i, p.title);
            }
            Ok(())
        }
        Commands::Play { index, json } => {
            let (entry, cached) = service.play(index).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&cached.entry)?);
                return Ok(());
            }
            let Some(a) = cached.entry.analysis() else {
                anyhow::bail!(
                    "Error analyzing {}: {}",
                    entry.title,
                    cached.entry.error().unwrap_or_default()
                );
            };
            println!("{}", entry.title);
            println!("{} characters, {} lines\n", a.total_characters, a.total_lines);
            println!("{:>3} | {:<28} | {:>6}", "#", "Character", "Lines");
            println!("{}", "-".repeat(43));
            for (i, (name, lines)) in a.characters_lines.iter().enumerate() {
                println!("{:>3} | {:<28} | {:>6}", i + 1, truncate(name, 28), lines);
            }
            Ok(())
        }
        Commands::Words { index, character } => match character {
            Some(name) => {
                let words = service.character_words(index, &name).await?;
                if words.words.is_empty() {
                    println!("No words for {:?}.", name);
                    return Ok(());
                }
                println!("{}", name);
                print_words(&words.words);
                Ok(())
            }
            None => {
                let (entry, cached) = service.play(index).await?;
                let Some(a) = cached.entry.analysis() else {
                    anyhow::bail!(
                        "Error analyzing {}: {}",
                        entry.title,
                        cached.entry.error().unwrap_or_default()
                    );
                };
                println!("{}\n", entry.title);
                for (name, words) in &a.word_analysis {
                    println!("{}", name);
                    print_words(words);
                    println!();
                }
                Ok(())
            }
        },
        Commands::Compare { first, second } => {
            let cmp = service.compare(first, second).await?;
            for side in [&cmp.play1, &cmp.play2] {
                match side.analysis.analysis() {
                    Some(a) => {
                        let top = a
                            .characters_lines
                            .first()
                            .map(|(n, l)| format!("{} ({})", n, l))
                            .unwrap_or_else(|| "-".into());
                        println!(
                            "{:<40} | {:>4} characters | {:>6} lines | top: {}",
                            truncate(&side.name, 40),
                            a.total_characters,
                            a.total_lines,
                            top
                        );
                    }
                    None => println!(
                        "{:<40} | error: {}",
                        truncate(&side.name, 40),
                        side.analysis.error().unwrap_or_default()
                    ),
                }
            }
            Ok(())
        }
        Commands::Report { concurrency, json } => {
            let report = report::analyze_catalog(Arc::clone(&service), concurrency).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report.rows)?);
                return Ok(());
            }
            if report.rows.is_empty() {
                println!("No plays found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<40} | {:>5} | {:>6} | {:<24}",
                "#", "Play", "Chars", "Lines", "Top character"
            );
            println!("{}", "-".repeat(90));
            for r in &report.rows {
                match &r.error {
                    Some(e) => println!("{:>3} | {:<40} | error: {}", r.index, truncate(&r.title, 40), e),
                    None => {
                        let top = r
                            .top_character
                            .as_ref()
                            .map(|(n, l)| format!("{} ({})", truncate(n, 16), l))
                            .unwrap_or_else(|| "-".into());
                        println!(
                            "{:>3} | {:<40} | {:>5} | {:>6} | {:<24}",
                            r.index,
                            truncate(&r.title, 40),
                            r.total_characters,
                            r.total_lines,
                            top
                        );
                    }
                }
            }
            println!(
                "\n{} plays ({} ok, {} errors)",
                report.rows.len(),
                report.ok,
                report.errors
            );
            Ok(())
        }
        Commands::Serve { bind } => api::serve(service, &bind).await,
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Pick the source/catalog pair: a local directory when `--dir` is set,
/// otherwise the HTTP catalog.
fn build_service(cli: &Cli) -> anyhow::Result<PlayService> {
    let timeout = Duration::from_secs(cli.timeout_secs);
    let (source, catalog): (Arc<dyn DocumentSource>, Arc<dyn Catalog>) = match &cli.dir {
        Some(dir) => (Arc::new(FileSource), Arc::new(DirCatalog::new(dir))),
        None => (
            Arc::new(HttpSource::new(timeout).context("Failed to build HTTP client")?),
            Arc::new(
                HttpCatalog::new(cli.catalog_url.clone(), timeout)
                    .context("Failed to build HTTP client")?,
            ),
        ),
    };
    Ok(PlayService::new(source, catalog))
}

fn print_words(words: &Ranking) {
    for (word, count) in words {
        println!("  {:<20} {:>5}", truncate(word, 20), count);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
