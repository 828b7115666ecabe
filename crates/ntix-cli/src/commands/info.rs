//! Info command - show index root metadata.

use crate::app::App;

/// Run the info command.
pub fn run(app: &App) -> anyhow::Result<()> {
    let root = app.index.root()?;
    let header = root.header();

    println!("ntix Index Info");
    println!("===============");
    println!();
    println!("Index:               {}", app.index.name());
    println!("Indexed attribute:   {}", root.indexed_attribute_type());
    println!("Collation rule:      {}", root.collation_rule());
    println!("Index block size:    {} bytes", root.index_block_size());
    println!("Clusters per block:  {}", root.clusters_per_index_block());
    match root.index_cluster_size() {
        Ok(size) => println!("Index cluster size:  {} bytes", size),
        Err(e) => println!("Index cluster size:  invalid ({})", e),
    }
    println!();
    println!("Root node:");
    println!("  First entry offset: {:#x}", header.first_entry_offset());
    println!("  Used size:          {} bytes", header.used_size());
    println!("  Allocated size:     {} bytes", header.allocated_size());
    println!("  Has children:       {}", header.has_children());
    println!("  Entries:            {}", root.entries().count());
    println!();

    match app.index.allocation()? {
        Some(allocation) => {
            println!("Allocation:");
            println!("  Cluster size:       {} bytes", allocation.cluster_size());
            println!("  Clusters:           {}", allocation.total_clusters());
            println!(
                "  Bytes:              {}",
                allocation.total_clusters() * allocation.cluster_size() as u64
            );
        }
        None => println!("Allocation:          none (root-only index)"),
    }

    Ok(())
}
