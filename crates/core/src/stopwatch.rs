//! Per-stage timing for the dispatch pipelines.

use std::time::{Duration, Instant};

/// Logs the elapsed time of each pipeline stage as it finishes.
#[derive(Debug)]
pub struct StagedStopwatch {
    stage_start: Instant,
    stages: Vec<(String, Duration)>,
}

impl StagedStopwatch {
    pub fn start() -> Self {
        tracing::debug!("timing started");
        Self {
            stage_start: Instant::now(),
            stages: Vec::new(),
        }
    }

    /// Record the end of a stage and start timing the next one.
    pub fn finish_stage(&mut self, stage: &str) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.stage_start);
        tracing::info!(
            stage,
            elapsed_ms = elapsed.as_millis() as u64,
            "finished {stage} in {}",
            format_elapsed(elapsed)
        );
        self.stages.push((stage.to_string(), elapsed));
        self.stage_start = now;
        elapsed
    }

    /// Names of the timed stages in order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Sum of the timed stages.
    pub fn total(&self) -> Duration {
        self.stages.iter().map(|(_, elapsed)| *elapsed).sum()
    }
}

/// `<seconds>.<millis>s`, millis zero-padded.
fn format_elapsed(elapsed: Duration) -> String {
    format!("{}.{:03}s", elapsed.as_secs(), elapsed.subsec_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_seconds_and_millis() {
        assert_eq!(format_elapsed(Duration::from_millis(1_042)), "1.042s");
        assert_eq!(format_elapsed(Duration::from_millis(7)), "0.007s");
    }

    #[test]
    fn records_stages_in_order() {
        let mut stopwatch = StagedStopwatch::start();
        stopwatch.finish_stage("retrieving bundle");
        stopwatch.finish_stage("building model");
        assert_eq!(
            stopwatch.stage_names(),
            ["retrieving bundle", "building model"]
        );
        assert!(stopwatch.total() >= Duration::ZERO);
    }
}
