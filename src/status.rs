//! Corpus store overview (`ragline status`).
//!
//! Reads only the sidecar, so it is cheap even for large corpora. A store
//! that has not been built yet is reported, not treated as a failure.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::embedding::configured_model;
use crate::error::RaglineError;
use crate::store::CorpusStore;

/// Run the status command and print a summary.
pub fn run_status(config: &Config) -> Result<()> {
    let store = CorpusStore::new(&config.corpus.store_dir);
    let (configured, _) = configured_model(&config.embedding);

    println!("ragline corpus status");
    println!("=====================");
    println!();
    println!("  Corpus root: {}", config.corpus.root.display());
    println!("  Store:       {}", store.dir().display());

    let info = match store.info() {
        Ok(info) => info,
        Err(e)
            if matches!(
                e.downcast_ref::<RaglineError>(),
                Some(RaglineError::CorpusNotBuilt { .. })
            ) =>
        {
            println!();
            println!("  Not built. Run `ragline prepare` to build the corpus.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    println!("  Index size:  {}", format_bytes(info.index_bytes));
    println!();
    println!("  Sources:     {}", info.source_count);
    println!("  Chunks:      {}", info.chunk_count);
    println!("  Model:       {} ({} dims)", info.model, info.dims);
    if info.model != configured {
        println!("               (config names '{}'; re-run prepare)", configured);
    }
    println!(
        "  Built:       {}",
        info.built_at
            .map(format_relative)
            .unwrap_or_else(|| "unknown".to_string())
    );
    println!();
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// e.g. "2026-01-01 12:00 UTC (3 hours ago)".
fn format_relative(at: DateTime<Utc>) -> String {
    let delta = (Utc::now() - at).num_seconds();
    let ago = if delta < 0 {
        return at.format("%Y-%m-%d %H:%M UTC").to_string();
    } else if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        plural(delta / 60, "min")
    } else if delta < 86_400 {
        plural(delta / 3600, "hour")
    } else {
        plural(delta / 86_400, "day")
    };
    format!("{} ({})", at.format("%Y-%m-%d %H:%M UTC"), ago)
}

fn plural(n: i64, unit: &str) -> String {
    format!("{} {}{} ago", n, unit, if n == 1 { "" } else { "s" })
}
