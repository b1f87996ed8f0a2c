use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, value_parser};

#[derive(Clone, Debug, Parser)]
#[command(name = "coldstore", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// TOML file with default settings.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log detail (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "p", name = "pack", about = "Pack an archive or directory into a verified .tar.zst")]
    Pack(PackArgs),
    #[command(alias = "v", name = "verify", about = "Verify a .tar.zst artifact")]
    Verify(VerifyArgs),
    #[command(alias = "x", name = "extract", about = "Extract a .tar.zst artifact")]
    Extract(ExtractArgs),
    #[command(alias = "pr", name = "process", about = "Verify then extract a .tar.zst artifact")]
    Process(ProcessArgs),
    #[command(alias = "r", name = "repair", about = "Verify or repair an artifact from its PAR2 data")]
    Repair(RepairArgs),
}

#[derive(Clone, Debug, Args)]
pub struct PackArgs {
    /// Archive file, plain file or directory to pack.
    pub input: PathBuf,

    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// zstd level.
    #[arg(short, long, value_parser = value_parser!(i32).range(1..=22))]
    pub level: Option<i32>,

    /// zstd worker threads, 0 for the codec default.
    #[arg(short, long)]
    pub threads: Option<u32>,

    /// Write outputs directly into the output directory.
    #[arg(long)]
    pub flat: bool,

    /// Disable long-distance matching.
    #[arg(long)]
    pub no_long: bool,

    /// Skip tar, frame and digest checks.
    #[arg(long)]
    pub no_check: bool,

    /// Skip PAR2 recovery data.
    #[arg(long)]
    pub no_par2: bool,

    /// PAR2 redundancy percentage.
    #[arg(short, long, value_parser = value_parser!(u8).range(1..=100))]
    pub recovery_percent: Option<u8>,
}

#[derive(Clone, Debug, Args)]
pub struct VerifyArgs {
    pub archive: PathBuf,
}

#[derive(Clone, Debug, Args)]
pub struct ExtractArgs {
    pub archive: PathBuf,

    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Extract into a non-empty directory.
    #[arg(short, long)]
    pub force: bool,

    /// Skip verification before extracting.
    #[arg(long)]
    pub no_check: bool,
}

#[derive(Clone, Debug, Args)]
pub struct ProcessArgs {
    pub archive: PathBuf,

    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Stop after verification.
    #[arg(long, conflicts_with = "no_check")]
    pub verify_only: bool,

    #[arg(short, long)]
    pub force: bool,

    #[arg(long)]
    pub no_check: bool,
}

#[derive(Clone, Debug, Args)]
pub struct RepairArgs {
    /// The artifact or its .par2 index.
    pub archive: PathBuf,

    /// Report damage without repairing.
    #[arg(long)]
    pub verify_only: bool,
}
