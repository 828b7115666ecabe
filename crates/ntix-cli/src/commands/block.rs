//! Block command - dump one index block.

use crate::app::{App, Listing};
use ntix_core::{BlockLocation, Vcn};

/// Run the block command.
pub fn run(app: &App, vcn: i64) -> anyhow::Result<()> {
    let vcn = Vcn::new(vcn);
    let root = app.index.root()?;
    let allocation = app
        .index
        .allocation()?
        .ok_or_else(|| anyhow::anyhow!("index {} has no allocation", app.index.name()))?;

    let location = BlockLocation::compute(
        vcn,
        root.index_block_size(),
        root.index_cluster_size()?,
        allocation.cluster_size(),
    )?;
    let block = allocation.index_block(&root, vcn)?;
    let header = block.header();

    println!("Index block {}", block.index_block_vcn());
    println!("  Cluster:            {}", location.fs_vcn);
    println!("  Clusters read:      {}", location.fs_clusters);
    println!("  Offset in cluster:  {:#x}", location.offset_into_vcn);
    println!("  LSN:                {:#x}", block.log_file_sequence_number());
    println!("  First entry offset: {:#x}", header.first_entry_offset());
    println!("  Used size:          {} bytes", header.used_size());
    println!("  Allocated size:     {} bytes", header.allocated_size());
    println!("  Has children:       {}", header.has_children());
    println!();

    for entry in block.entries() {
        let entry = entry?;
        println!(
            "{:#06x} {:>4} {:#04x} {}",
            entry.offset() - block.offset(),
            entry.size(),
            entry.index_flags().bits(),
            Listing::new(entry).to_text().trim_start()
        );
    }

    Ok(())
}
