use anyhow::Context;
use tracing::{info, warn};

use crate::aggregate::{self, StateSeries};
use crate::chart::{self, ChartRenderer};
use crate::config::PipelineConfig;
use crate::models::{DayStateTally, RunSummary};
use crate::resolver::PatientRegistry;
use crate::{delimiter, reconcile, report, resolver, temporal};

/// State accumulated by the normalization stages, owned by the caller.
#[derive(Debug, Default)]
pub struct PipelineState {
    pub tally: DayStateTally,
    pub registry: PatientRegistry,
}

/// Runs the four normalization stages in order, each reading the file the
/// previous one wrote.
pub fn run_stages(config: &PipelineConfig, state: &mut PipelineState) -> anyhow::Result<RunSummary> {
    std::fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("failed to create {}", config.work_dir.display()))?;

    let raw_rows = delimiter::run_stage(config.input(), &config.cleaned_path())
        .with_context(|| format!("failed to clean {}", config.input().display()))?;
    let reconciled_rows = reconcile::run_stage(&config.cleaned_path(), &config.reconciled_path())
        .context("failed to reconcile columns")?;
    let normalized_rows = temporal::run_stage(
        &config.reconciled_path(),
        &config.normalized_path(),
        &mut state.tally,
    )
    .context("failed to normalize dates")?;
    let patients = resolver::run_stage(
        &config.normalized_path(),
        &config.patients_path(),
        &mut state.registry,
    )
    .context("failed to resolve patients")?;

    Ok(RunSummary {
        raw_rows,
        reconciled_rows,
        normalized_rows,
        patients,
        days: state.tally.len(),
    })
}

/// Full run: normalization stages, both aggregate charts and the report.
pub fn run(config: &PipelineConfig, renderer: &dyn ChartRenderer) -> anyhow::Result<RunSummary> {
    let mut state = PipelineState::default();
    let summary = run_stages(config, &mut state)?;

    if state.registry.is_empty() {
        warn!(input = %config.input().display(), "no patients resolved");
    }

    let buckets = aggregate::fatality_by_age(state.registry.records());
    renderer.render(&chart::fatality_chart(&buckets), &config.fatality_chart_path())?;

    let series = StateSeries::from_tally(&state.tally);
    renderer.render(&chart::time_series_chart(&series), &config.time_series_chart_path())?;

    let report = report::build_report(config.input(), &summary, &buckets, &state.tally);
    std::fs::write(config.report_path(), report)
        .with_context(|| format!("failed to write {}", config.report_path().display()))?;

    info!(
        patients = summary.patients,
        days = summary.days,
        buckets = buckets.len(),
        work_dir = %config.work_dir.display(),
        "pipeline complete"
    );
    Ok(summary)
}
