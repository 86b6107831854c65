//! Background jobs: retention cleanup and batch generation

pub mod recommendation_cleaner;
pub mod recommendation_generator;

use serde::Serialize;
use std::time::Duration;

pub use recommendation_cleaner::start_recommendation_cleaner;
pub use recommendation_generator::{run_generation_batch, start_recommendation_generator};

/// Per-run error messages kept on a `JobResult`
pub const MAX_ERROR_MESSAGES: usize = 10;

/// Outcome of one batch run
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobResult {
    pub success: bool,
    pub users_processed: usize,
    pub recommendations_generated: usize,
    pub errors: usize,
    pub duration: Duration,
    pub error_messages: Vec<String>,
}

impl JobResult {
    pub fn record_error(&mut self, message: String) {
        self.errors += 1;
        if self.error_messages.len() < MAX_ERROR_MESSAGES {
            self.error_messages.push(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_capped() {
        let mut result = JobResult::default();
        for i in 0..15 {
            result.record_error(format!("member {} failed", i));
        }
        assert_eq!(result.errors, 15);
        assert_eq!(result.error_messages.len(), MAX_ERROR_MESSAGES);
    }
}
