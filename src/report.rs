use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::service::PlayService;

pub const DEFAULT_CONCURRENCY: usize = 8;

/// One catalog play, summarised.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub index: usize,
    pub title: String,
    pub total_characters: usize,
    pub total_lines: usize,
    pub top_character: Option<(String, usize)>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

pub struct Report {
    pub rows: Vec<ReportRow>,
    pub ok: usize,
    pub errors: usize,
}

/// Analyse every play in the catalog through the shared cache, at most
/// `concurrency` at a time. Rows come back in catalog order.
pub async fn analyze_catalog(service: Arc<PlayService>, concurrency: usize) -> Result<Report> {
    let plays = service.plays().await;
    let total = plays.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Workers send rows, the loop below collects them
    let (tx, mut rx) = tokio::sync::mpsc::channel::<ReportRow>(concurrency.max(1) * 2);

    for (index, play) in plays.iter().cloned().enumerate() {
        let service = Arc::clone(&service);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire_owned().await else {
                return;
            };
            let start = Instant::now();
            let cached = service.analysis(&play.location).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            let row = match cached.entry.analysis() {
                Some(a) => ReportRow {
                    index,
                    title: play.title,
                    total_characters: a.total_characters,
                    total_lines: a.total_lines,
                    top_character: a.characters_lines.first().cloned(),
                    error: None,
                    elapsed_ms,
                },
                None => {
                    warn!("Analysis failed for {}", play.location);
                    ReportRow {
                        index,
                        title: play.title,
                        total_characters: 0,
                        total_lines: 0,
                        top_character: None,
                        error: cached.entry.error().map(str::to_string),
                        elapsed_ms,
                    }
                }
            };
            let _ = tx.send(row).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut rows = Vec::with_capacity(total);
    let mut ok = 0usize;
    let mut errors = 0usize;
    while let Some(row) = rx.recv().await {
        if row.error.is_some() {
            errors += 1;
        } else {
            ok += 1;
        }
        rows.push(row);
        pb.inc(1);
    }

    pb.finish_and_clear();
    rows.sort_by_key(|r| r.index);
    info!("Analyzed {} plays ({} ok, {} errors)", total, ok, errors);

    Ok(Report { rows, ok, errors })
}
