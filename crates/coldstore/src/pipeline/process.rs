use std::path::PathBuf;

use super::Context;
use super::extract::{ExtractOptions, ExtractSummary, extract};
use super::verify::verify;
use crate::error::{Error, Result};
use crate::report::{Aggregate, VerificationReport};

#[derive(Clone, Debug)]
pub struct ProcessOptions {
    pub archive:     PathBuf,
    pub output_dir:  PathBuf,
    pub verify_only: bool,
    pub force:       bool,
    pub check:       bool,
}

#[derive(Debug, Default)]
pub struct ProcessOutcome {
    pub verification: Option<VerificationReport>,
    pub extraction:   Option<ExtractSummary>,
}

/// Verify, then extract unless `verify_only`.
pub fn process(ctx: &Context, opts: &ProcessOptions) -> Result<ProcessOutcome> {
    let mut outcome = ProcessOutcome::default();
    if opts.check || opts.verify_only {
        let report = verify(ctx, &opts.archive)?;
        let aggregate = report.aggregate();
        let failed = report.failed();
        outcome.verification = Some(report);
        if opts.verify_only {
            return Ok(outcome);
        }
        if aggregate == Aggregate::Failed {
            return Err(Error::VerificationFailed {
                path:   opts.archive.clone(),
                checks: failed,
            });
        }
    }

    let extract_opts = ExtractOptions {
        archive:    opts.archive.clone(),
        output_dir: opts.output_dir.clone(),
        force:      opts.force,
        check:      false,
    };
    outcome.extraction = Some(extract(ctx, &extract_opts)?);
    Ok(outcome)
}
