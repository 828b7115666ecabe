//! Find command - look up one file name.

use crate::app::{App, Listing};
use crate::OutputFormat;
use ntix_core::{CollationRule, FileNameCollation};
use std::time::Instant;
use tracing::warn;

/// Run the find command.
pub fn run(app: &App, name: &str, output: OutputFormat) -> anyhow::Result<()> {
    let root = app.index.root()?;
    if root.collation_rule() != CollationRule::FileName {
        warn!(
            collation = %root.collation_rule(),
            "Index is not collated by file name, lookup results may be wrong"
        );
    }

    let mut collation = FileNameCollation::new(name);
    let start = Instant::now();
    let found = app.index.search(&mut collation)?;
    let elapsed = start.elapsed();

    match output {
        OutputFormat::Text => {
            match &found {
                Some(entry) => println!("{}", Listing::new(entry.clone()).to_text()),
                None => println!("{}: not found", name),
            }

            eprintln!();
            eprintln!(
                "Compared {} keys in {:.3}ms",
                collation.visited(),
                elapsed.as_secs_f64() * 1000.0
            );
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "query": name,
                "found": found.map(|entry| Listing::new(entry).to_json()),
                "compared": collation.visited(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}
