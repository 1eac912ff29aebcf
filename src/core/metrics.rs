use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

/// Counts one executed GraphQL operation, labelled `query` or `mutation`.
pub(crate) fn record_graphql_operation(kind: &'static str, had_errors: bool) {
    metrics::counter!(
        "graphql_operations_total",
        "kind" => kind,
        "outcome" => if had_errors { "error" } else { "ok" }
    )
    .increment(1);
}

pub(crate) fn record_submission(outcome: &'static str) {
    metrics::counter!("questionnaire_submissions_total", "outcome" => outcome).increment(1);
}
