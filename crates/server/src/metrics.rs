//! Prometheus metrics
//!
//! Installs the recorder at startup and exposes small helpers used at the
//! session seams; rendered at `/metrics`.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::ServerError;

/// Install the Prometheus recorder
///
/// A second install attempt (another state built in the same process)
/// keeps the existing global recorder and returns a working handle.
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    if metrics::set_global_recorder(recorder).is_err() {
        tracing::debug!("metrics recorder already installed, reusing it");
    }
    Ok(handle)
}

/// A media stream connected
pub fn record_call_started() {
    metrics::counter!("call_agent_calls_started_total").increment(1);
}

/// A media stream ended
pub fn record_call_ended() {
    metrics::counter!("call_agent_calls_ended_total").increment(1);
}

/// A finalized caller transcript was forwarded to the orchestrator
pub fn record_transcript(seconds_since_start: f64) {
    metrics::counter!("call_agent_transcripts_total").increment(1);
    metrics::histogram!("call_agent_transcript_offset_seconds").record(seconds_since_start);
}

/// An agent reply segment was handed to synthesis
pub fn record_reply_segment() {
    metrics::counter!("call_agent_reply_segments_total").increment(1);
}
