//! Turns enumerated windows into fresh PENDING records.

use crate::{
    duration::{Span, parse_duration},
    error::{Result, TrackerError},
    record::{PipelineExecutionDetails, PipelinePhase, PipelineStatus, TrackingRecord},
    tz,
    window::TimeWindow,
};

/// Builds [`TrackingRecord`]s for one pipeline/config pair.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    pipeline_name: String,
    config_name: String,
    window_length_text: String,
    window_length: Span,
    skip_phases: Vec<PipelinePhase>,
}

impl RecordBuilder {
    /// Parses `window_length_text` once; every built window must match it exactly.
    pub fn new(
        pipeline_name: impl Into<String>,
        config_name: impl Into<String>,
        window_length_text: &str,
    ) -> Result<Self> {
        let window_length =
            parse_duration(window_length_text)?.ensure_positive("query_interval_window")?;
        Ok(Self {
            pipeline_name: pipeline_name.into(),
            config_name: config_name.into(),
            window_length_text: window_length_text.trim().to_string(),
            window_length,
            skip_phases: Vec::new(),
        })
    }

    /// Phases copied into `user_requested_to_skip_phases` of every record.
    pub fn with_skip_phases(mut self, skip_phases: &[PipelinePhase]) -> Self {
        self.skip_phases = skip_phases.to_vec();
        self
    }

    /// A PENDING record for `window` with a fresh execution document.
    ///
    /// Errors with `INVALID_WINDOW` when the window is not exactly one
    /// configured length long.
    pub fn build(&self, window: &TimeWindow) -> Result<TrackingRecord> {
        if window.end - window.start != self.window_length.as_delta() {
            return Err(TrackerError::InvalidWindow {
                start: tz::to_rfc3339_millis(&window.start),
                end: tz::to_rfc3339_millis(&window.end),
                expected: self.window_length_text.clone(),
            });
        }

        Ok(TrackingRecord {
            tracking_id: None,
            pipeline_name: self.pipeline_name.clone(),
            config_name: self.config_name.clone(),
            query_window_start: window.start,
            query_window_end: window.end,
            query_window_day: window.day(),
            query_window_duration: self.window_length_text.clone(),
            pipeline_execution_details: PipelineExecutionDetails::fresh(&self.skip_phases),
            source_count: None,
            stage_count: None,
            target_count: None,
            pipeline_status: PipelineStatus::Pending,
            created_at: None,
            updated_at: None,
        })
    }

    /// [`RecordBuilder::build`] over a slice, preserving order.
    pub fn build_many(&self, windows: &[TimeWindow]) -> Result<Vec<TrackingRecord>> {
        windows.iter().map(|w| self.build(w)).collect()
    }
}
