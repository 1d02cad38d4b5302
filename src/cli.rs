use clap::Parser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use std::path::PathBuf;

use crate::inspect::{DEFAULT_ARCHIVE, DEFAULT_ENTRY};
use crate::repack::DEFAULT_WORK_DIR;

#[derive(Parser, Debug)]
#[command(name = "inspect")]
#[command(version)]
#[command(about = "Show size and compression method of a ZIP/APK entry", long_about = None)]
pub struct InspectCli {
    /// ZIP or APK file path
    #[arg(value_name = "ARCHIVE", default_value = DEFAULT_ARCHIVE)]
    pub archive: PathBuf,

    /// Entry path inside the archive (exact, case-sensitive)
    #[arg(value_name = "ENTRY", default_value = DEFAULT_ENTRY)]
    pub entry: String,
}

#[derive(Parser, Debug)]
#[command(name = "repack")]
#[command(version)]
#[command(about = "Rewrite an archive with one entry STORED (uncompressed)", long_about = None)]
#[command(after_help = "Example:\n  \
  repack app-debug-2.apk assets/SignatureKiller/origin.apk app-debug-2-stored.apk")]
pub struct RepackCli {
    /// Source ZIP or APK file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Entry to store uncompressed
    #[arg(value_name = "ENTRY")]
    pub entry: String,

    /// Output archive (overwritten if it exists)
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Scratch directory for the extracted entry; must not exist yet
    #[arg(long = "work-dir", value_name = "DIR", default_value = DEFAULT_WORK_DIR)]
    pub work_dir: PathBuf,

    /// Quiet mode
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl RepackCli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }
}

#[derive(Parser, Debug)]
#[command(name = "store")]
#[command(version)]
#[command(about = "Create an archive holding one file STORED (uncompressed)", long_about = None)]
pub struct StoreCli {
    /// File to add
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Archive to create (overwritten if it exists)
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Entry name inside the archive
    #[arg(value_name = "ENTRY")]
    pub entry: String,

    /// Quiet mode
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl StoreCli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }
}

/// Whether a parse failure comes from too few or too many positional
/// arguments rather than from `--help`, `--version`, an unknown flag or a
/// bad value.
pub fn is_argument_count_error(err: &clap::Error) -> bool {
    match err.kind() {
        ErrorKind::MissingRequiredArgument | ErrorKind::TooManyValues => true,
        // An extra positional is reported as an unexpected argument too.
        ErrorKind::UnknownArgument => !matches!(
            err.get(ContextKind::InvalidArg),
            Some(ContextValue::String(arg)) if arg.starts_with('-')
        ),
        _ => false,
    }
}
