//! Per-message structured logging: every queue message processed — success
//! or dead-lettered — gets a timed log row independent of the conversation
//! log.

use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueOutcome {
    Success,
    DeadLettered,
    Retried,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueLogRow {
    pub queue_name: String,
    pub message_id: String,
    pub outcome: QueueOutcome,
    pub millis: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct QueueMessageTimer {
    queue_name: String,
    message_id: String,
    started_at: Instant,
}

impl QueueMessageTimer {
    pub fn start(queue_name: &str, message_id: &str) -> Self {
        QueueMessageTimer { queue_name: queue_name.to_string(), message_id: message_id.to_string(), started_at: Instant::now() }
    }

    pub fn finish(self, outcome: QueueOutcome, error: Option<String>) -> QueueLogRow {
        let row = QueueLogRow {
            queue_name: self.queue_name,
            message_id: self.message_id,
            outcome,
            millis: self.started_at.elapsed().as_millis() as u64,
            error,
        };
        match row.outcome {
            QueueOutcome::Success => tracing::info!(queue = %row.queue_name, message_id = %row.message_id, millis = row.millis, "queue message processed"),
            QueueOutcome::Retried => tracing::warn!(queue = %row.queue_name, message_id = %row.message_id, millis = row.millis, error = ?row.error, "queue message retried"),
            QueueOutcome::DeadLettered => tracing::error!(queue = %row.queue_name, message_id = %row.message_id, millis = row.millis, error = ?row.error, "queue message dead-lettered"),
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_records_elapsed_time_and_outcome() {
        let timer = QueueMessageTimer::start("AI-MIDDLEWARE-primary", "m1");
        let row = timer.finish(QueueOutcome::Success, None);
        assert_eq!(row.outcome, QueueOutcome::Success);
        assert!(row.error.is_none());
    }
}
