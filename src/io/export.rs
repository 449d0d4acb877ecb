//! Export fit results to JSON.
//!
//! The export is meant to be easy to consume in downstream scripts.

use std::fs::File;
use std::path::Path;

use crate::domain::{FitReportFile, GaussianFit};
use crate::error::AppError;
use crate::report::ResidualStats;

/// Collect the exportable view of a fit.
pub fn build_fit_report(fit: &GaussianFit, stats: &ResidualStats) -> FitReportFile {
    let diag = fit.diagnostics.as_ref();
    FitReportFile {
        tool: format!("gfit {}", env!("CARGO_PKG_VERSION")),
        ndim: fit.params.ndim(),
        guess: fit.guess.clone(),
        params: fit.params.clone(),
        errors: fit.errors.clone(),
        status: diag.map(|r| r.status.code()),
        message: diag.map(|r| r.status.message().to_string()),
        evaluations: diag.map(|r| r.evaluations),
        rms_residual: stats.rms,
    }
}

/// Write a fit report as pretty-printed JSON.
pub fn write_fit_json(path: &Path, report: &FitReportFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create fit JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(4, format!("Failed to write fit JSON: {e}")))?;
    Ok(())
}
