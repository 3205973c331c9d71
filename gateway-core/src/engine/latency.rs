//! Per-turn latency accounting.

use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimedLog {
    pub label: String,
    pub millis: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LatencyBreakdown {
    pub over_all_time: u64,
    pub model_execution_time: u64,
    pub execution_time_logs: Vec<TimedLog>,
    pub function_time_logs: Vec<TimedLog>,
}

/// Accumulates segment timings across one turn; not `Send`-shared, owned
/// per in-flight request.
pub struct LatencyTracker {
    started_at: Instant,
    model_execution_time: u64,
    execution_time_logs: Vec<TimedLog>,
    function_time_logs: Vec<TimedLog>,
}

impl LatencyTracker {
    pub fn start() -> Self {
        LatencyTracker {
            started_at: Instant::now(),
            model_execution_time: 0,
            execution_time_logs: Vec::new(),
            function_time_logs: Vec::new(),
        }
    }

    pub fn record_model_call(&mut self, millis: u64) {
        self.model_execution_time += millis;
        self.execution_time_logs.push(TimedLog { label: "model_call".to_string(), millis });
    }

    pub fn record_function(&mut self, label: &str, millis: u64) {
        self.function_time_logs.push(TimedLog { label: label.to_string(), millis });
    }

    pub fn finish(self) -> LatencyBreakdown {
        LatencyBreakdown {
            over_all_time: self.started_at.elapsed().as_millis() as u64,
            model_execution_time: self.model_execution_time,
            execution_time_logs: self.execution_time_logs,
            function_time_logs: self.function_time_logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_model_time_across_calls() {
        let mut tracker = LatencyTracker::start();
        tracker.record_model_call(100);
        tracker.record_model_call(50);
        let breakdown = tracker.finish();
        assert_eq!(breakdown.model_execution_time, 150);
        assert_eq!(breakdown.execution_time_logs.len(), 2);
    }
}
