//! Print size, compressed size and compression method of one archive entry.

use anyhow::Result;
use clap::Parser;

use zipstore::{InspectCli, inspect_entry};

fn main() -> Result<()> {
    let cli = InspectCli::parse();

    match inspect_entry(&cli.archive, &cli.entry)? {
        Some(report) => println!("{report}"),
        None => println!("Entry not found: {}", cli.entry),
    }

    Ok(())
}
