//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::domain::{CombineConfig, Combined, FitConfig, GaussianFit, GaussianParams};
use crate::math::stats::median;
use crate::report::ResidualStats;

/// Header describing the synthetic sample a `gfit fit` run works on.
pub fn format_run_header(config: &FitConfig) -> String {
    let mut out = String::new();
    let ndim = config.truth.ndim();
    let last = config.axis_start + config.axis_step * config.samples_per_axis.saturating_sub(1) as f64;

    out.push_str("=== gfit - N-dimensional Gaussian fit ===\n");
    out.push_str(&format!(
        "Grid: {ndim}D, {} samples/axis, x=[{:.3}, {:.3}] step {:.4}\n",
        config.samples_per_axis, config.axis_start, last, config.axis_step
    ));
    out.push_str(&format!("Noise: sigma={} | seed={}\n", config.noise, config.seed));
    out.push_str(&format!("Truth: {}\n", fmt_params(&config.truth)));
    out
}

/// Format the parameter guess.
pub fn format_guess(guess: &GaussianParams) -> String {
    format!("Guess: {}\n", fmt_params(guess))
}

/// Format a converged fit: parameters ± standard errors and residual statistics.
pub fn format_fit(fit: &GaussianFit, stats: &ResidualStats) -> String {
    let mut out = String::new();

    out.push_str(&format_guess(&fit.guess));
    out.push_str("\nFitted parameters:\n");
    out.push_str(&format!("{:<10} {:>14} {:>14}\n", "param", "value", "std err"));
    out.push_str(&format!("{:-<10} {:-<14} {:-<14}\n", "", "", ""));

    let mut row = |name: String, v: f64, e: f64| {
        out.push_str(&format!("{name:<10} {v:>14.6} {e:>14.6}\n"));
    };
    for (j, (v, e)) in fit.params.widths.iter().zip(fit.width_errors()).enumerate() {
        row(format!("width[{j}]"), *v, *e);
    }
    for (j, (v, e)) in fit.params.center.iter().zip(fit.center_errors()).enumerate() {
        row(format!("center[{j}]"), *v, *e);
    }
    row("height".to_string(), fit.params.height_or_normalized(), fit.height_error());

    if let Some(report) = &fit.diagnostics {
        out.push_str(&format!(
            "\nSolver: status {} | evaluations={} jacobians={} iterations={} lambda={:.3e}\n",
            report.status.code(),
            report.evaluations,
            report.jacobian_evaluations,
            report.iterations,
            report.lambda
        ));
        out.push_str(&format!("  {}\n", report.status.message()));
    }

    out.push_str(&format!(
        "Residuals: n={} SSE={:.6e} RMS={:.6e} max|r|={:.6e}\n",
        stats.n, stats.sse, stats.rms, stats.max_abs
    ));
    out
}

/// Format the result of a normalized median combine.
pub fn format_combine(config: &CombineConfig, combined: &Combined) -> String {
    let mut out = String::new();
    let (rows, cols) = combined.frame.dim();

    out.push_str("=== gfit - normalized median combine ===\n");
    out.push_str(&format!(
        "Frames: {} of {rows}x{cols} | region {} | final correction: {}\n",
        config.levels.len(),
        config.region,
        if config.final_correction { "on" } else { "off" }
    ));

    out.push_str("\nNormalization factors:\n");
    out.push_str(&format!("{:<6} {:>14} {:>14}\n", "frame", "level", "factor"));
    out.push_str(&format!("{:-<6} {:-<14} {:-<14}\n", "", "", ""));
    for (i, (level, factor)) in config.levels.iter().zip(&combined.factors).enumerate() {
        out.push_str(&format!("{i:<6} {level:>14.4} {factor:>14.4}\n"));
    }

    let (min, max) = combined
        .frame
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let med = median(combined.frame.iter().copied()).unwrap_or(f64::NAN);
    out.push_str(&format!(
        "\nCombined frame: min={min:.6} median={med:.6} max={max:.6}\n"
    ));
    out
}

fn fmt_params(p: &GaussianParams) -> String {
    let height = match p.height {
        Some(h) => format!("{h:.6}"),
        None => format!("{:.6} (normalized)", p.height_or_normalized()),
    };
    format!(
        "width={} center={} height={height}",
        fmt_vec(&p.widths),
        fmt_vec(&p.center)
    )
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}
