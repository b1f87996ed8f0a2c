use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use coldstore_par2::RecoveryOutcome;
use coldstore_platform::ChildRegistry;
use tracing_subscriber::EnvFilter;

use crate::cli::{App, Commands, ExtractArgs, PackArgs, ProcessArgs, RepairArgs, VerifyArgs};
use crate::config::Config;
use crate::layout::LayoutMode;
use crate::pipeline::{self, Context, ExtractOptions, PackOptions, ProcessOptions, RepairOptions, RepairOutcome};
use crate::report::Aggregate;

/// `warn` with `-q`, `info` by default, then `debug` and `trace` per `-v`.
pub fn log_level(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// Log to stderr; `RUST_LOG` takes precedence over the flags.
pub fn init_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(verbose, quiet)));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

pub fn run(app: App) -> anyhow::Result<ExitCode> {
    let mut config = Config::load(app.config.as_deref())?;
    if let Commands::Pack(args) = &app.cmd {
        apply_pack_overrides(&mut config, args)?;
    }

    let ctx = Context::new(config);
    let ctx = if app.quiet {
        ctx.with_progress(crate::progress::IndicatifProgress::hidden())
    } else {
        ctx
    };
    coldstore_fs::install_signal_hooks(ctx.tracker.clone()).context("failed to install signal handlers")?;
    ctx.tracker.add_callback("child processes", || {
        let killed = ChildRegistry::global().terminate_all();
        if killed > 0 {
            tracing::warn!(killed, "terminated external tools still running");
        }
    });
    let _guard = ctx.tracker.guard();

    let swept = ctx.tracker.sweep_orphans();
    if !swept.removed.is_empty() {
        tracing::info!(removed = swept.removed.len(), "removed stale temporaries from an earlier run");
    }

    match app.cmd {
        Commands::Pack(args) => pack(&ctx, args),
        Commands::Verify(args) => verify(&ctx, args),
        Commands::Extract(args) => extract(&ctx, args),
        Commands::Process(args) => process(&ctx, args),
        Commands::Repair(args) => repair(&ctx, args),
    }
}

/// Explicit flags win over the config file.
pub fn apply_pack_overrides(config: &mut Config, args: &PackArgs) -> crate::Result<()> {
    let pack = &mut config.pack;
    if let Some(dir) = &args.output_dir {
        pack.output_dir = dir.clone();
    }
    if let Some(level) = args.level {
        pack.level = level;
    }
    if let Some(threads) = args.threads {
        pack.threads = threads;
    }
    if args.no_long {
        pack.long_mode = false;
    }
    if let Some(percent) = args.recovery_percent {
        pack.recovery_percent = percent;
    }
    config.validate()
}

fn pack(ctx: &Context, args: PackArgs) -> anyhow::Result<ExitCode> {
    let opts = PackOptions {
        input:      args.input,
        output_dir: ctx.config.pack.output_dir.clone(),
        mode:       if args.flat { LayoutMode::Flat } else { LayoutMode::Organized },
        check:      !args.no_check,
        par2:       !args.no_par2,
    };
    let summary = pipeline::pack(ctx, &opts)?;
    println!("{}", summary.layout.artifact().display());
    Ok(ExitCode::SUCCESS)
}

fn verify(ctx: &Context, args: VerifyArgs) -> anyhow::Result<ExitCode> {
    let report = pipeline::verify(ctx, &args.archive)?;
    println!("{}", report.render());
    Ok(match report.aggregate() {
        Aggregate::Failed => ExitCode::FAILURE,
        Aggregate::Passed | Aggregate::Incomplete => ExitCode::SUCCESS,
    })
}

fn extract(ctx: &Context, args: ExtractArgs) -> anyhow::Result<ExitCode> {
    let opts = ExtractOptions {
        archive:    args.archive,
        output_dir: output_dir(args.output_dir),
        force:      args.force,
        check:      !args.no_check,
    };
    let summary = pipeline::extract(ctx, &opts)?;
    if let Some(report) = &summary.verification {
        println!("{}", report.render());
    }
    println!("{}", summary.destination.display());
    Ok(ExitCode::SUCCESS)
}

fn process(ctx: &Context, args: ProcessArgs) -> anyhow::Result<ExitCode> {
    let opts = ProcessOptions {
        archive:     args.archive,
        output_dir:  output_dir(args.output_dir),
        verify_only: args.verify_only,
        force:       args.force,
        check:       !args.no_check,
    };
    let outcome = pipeline::process(ctx, &opts)?;
    let mut code = ExitCode::SUCCESS;
    if let Some(report) = &outcome.verification {
        println!("{}", report.render());
        if report.aggregate() == Aggregate::Failed {
            code = ExitCode::FAILURE;
        }
    }
    if let Some(extraction) = &outcome.extraction {
        println!("{}", extraction.destination.display());
    }
    Ok(code)
}

fn repair(ctx: &Context, args: RepairArgs) -> anyhow::Result<ExitCode> {
    let opts = RepairOptions {
        target:      args.archive,
        verify_only: args.verify_only,
    };
    Ok(match pipeline::repair(ctx, &opts)? {
        RepairOutcome::Recovered(RecoveryOutcome::Intact(v)) => {
            println!("all {} files intact", v.files_verified);
            ExitCode::SUCCESS
        }
        RepairOutcome::Recovered(RecoveryOutcome::Repaired { repair, .. }) => {
            println!("repaired {} files", repair.files_repaired);
            ExitCode::SUCCESS
        }
        RepairOutcome::Damaged(v) => {
            println!(
                "{} missing, {} damaged, {}",
                v.files_missing,
                v.files_damaged,
                if v.repairable { "repairable" } else { "not repairable, restore from backup" }
            );
            ExitCode::FAILURE
        }
    })
}

/// Extraction defaults to the current directory.
fn output_dir(flag: Option<PathBuf>) -> PathBuf { flag.unwrap_or_else(|| PathBuf::from(".")) }
