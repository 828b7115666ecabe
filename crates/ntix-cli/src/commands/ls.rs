//! Ls command - enumerate every entry of the index.

use crate::app::{App, Listing};
use crate::filter::NameFilter;
use crate::OutputFormat;
use std::time::Instant;
use tracing::debug;

/// Run the ls command.
pub fn run(
    app: &App,
    filter: Option<&str>,
    all: bool,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let filter = filter.map(NameFilter::new).transpose()?;
    let show_sentinels = all || app.config.index.show_sentinels;

    let start = Instant::now();
    let mut listings = Vec::new();
    let mut skipped = 0usize;

    for entry in app.index.iter()? {
        let listing = Listing::new(entry?);

        if listing.entry.is_last_index_entry_in_subnode() && !show_sentinels {
            skipped += 1;
            continue;
        }
        if !all && listing.file_name.as_ref().is_some_and(|n| n.is_dos_only()) {
            skipped += 1;
            continue;
        }
        if let Some(filter) = &filter {
            match &listing.file_name {
                Some(name) if filter.matches(&name.name()) => {}
                _ => {
                    skipped += 1;
                    continue;
                }
            }
        }

        listings.push(listing);
    }
    let elapsed = start.elapsed();
    debug!(shown = listings.len(), skipped, "Enumeration finished");

    match output {
        OutputFormat::Text => {
            for listing in &listings {
                println!("{}", listing.to_text());
            }

            eprintln!();
            eprintln!(
                "{} entries ({} hidden) in {:.3}ms",
                listings.len(),
                skipped,
                elapsed.as_secs_f64() * 1000.0
            );
        }
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = listings.iter().map(Listing::to_json).collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}
