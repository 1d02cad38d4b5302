//! Create an archive holding a single file STORED.

use anyhow::Result;
use clap::Parser;

use zipstore::{StoreCli, store_file};

fn main() -> Result<()> {
    let cli = StoreCli::parse();

    let stored = store_file(&cli.source, &cli.output, &cli.entry)?;

    if !cli.is_quiet() {
        println!(
            "Added {} as STORED to {} ({} bytes, crc32 {:08x})",
            stored.entry,
            cli.output.display(),
            stored.size,
            stored.crc32
        );
    }

    Ok(())
}
