//! Rewrite an archive so that one entry is STORED.
//!
//! A wrong number of positional arguments prints usage and exits
//! successfully; I/O and format errors exit non-zero.

use anyhow::Result;
use clap::{CommandFactory, Parser};

use zipstore::cli::is_argument_count_error;
use zipstore::{RepackCli, repack_entry};

fn main() -> Result<()> {
    let cli = match RepackCli::try_parse() {
        Ok(cli) => cli,
        Err(err) if is_argument_count_error(&err) => {
            print_usage();
            return Ok(());
        }
        Err(err) => err.exit(),
    };

    if !cli.is_quiet() {
        println!("Extracting {} from {}...", cli.entry, cli.archive.display());
    }

    let report = repack_entry(&cli.archive, &cli.entry, &cli.output, &cli.work_dir)?;

    if !cli.is_quiet() {
        println!(
            "Stored {} ({} bytes, crc32 {:08x}), copied {} other entries",
            report.entry, report.size, report.crc32, report.copied
        );
        println!("Original archive: {}", cli.archive.display());
        println!("Modified archive: {}", cli.output.display());
    }

    Ok(())
}

fn print_usage() {
    let mut cmd = RepackCli::command();
    println!("{}", cmd.render_usage());
    println!("Example: repack app-debug-2.apk assets/SignatureKiller/origin.apk app-debug-2-stored.apk");
}
