use flume::{bounded, Receiver, Sender};
use tracing::{info, warn};

use super::types::ActivityLog;

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Queue capacity (max logs in memory before dropping)
    pub queue_capacity: usize,

    pub worker_count: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            worker_count: 1,
        }
    }
}

/// Async activity logger with queue mechanism.
///
/// Producers never wait: [`ActivityLogger::log`] drops the record when the
/// queue is full. Workers drain the queue into structured `tracing` events
/// on the `activity` target.
#[derive(Clone)]
pub struct ActivityLogger {
    sender: Sender<ActivityLog>,
}

impl ActivityLogger {
    /// Must be called inside a tokio runtime; workers are spawned here.
    pub fn new(config: LoggerConfig) -> Self {
        let (sender, receiver) = bounded(config.queue_capacity.max(1));

        info!(
            "Initializing ActivityLogger: queue={}, workers={}",
            config.queue_capacity, config.worker_count
        );

        for worker_id in 0..config.worker_count.max(1) {
            let receiver = receiver.clone();
            tokio::spawn(async move {
                Self::worker_loop(worker_id, receiver).await;
            });
        }

        Self { sender }
    }

    /// Log activity (non-blocking, fire-and-forget)
    pub fn log(&self, activity: ActivityLog) {
        if let Err(e) = self.sender.try_send(activity) {
            warn!("Failed to enqueue activity log (queue full?): {}", e);
        }
    }

    async fn worker_loop(worker_id: usize, receiver: Receiver<ActivityLog>) {
        info!("Activity worker {} started", worker_id);

        while let Ok(log) = receiver.recv_async().await {
            Self::emit(&log);
        }

        info!("Activity worker {} shutting down (channel closed)", worker_id);
    }

    fn emit(log: &ActivityLog) {
        info!(
            target: "activity",
            mode = log.mode,
            conversation_id = log.conversation_id.as_deref(),
            activity_type = log.activity_type.as_str(),
            activity_status = log.activity_status.as_str(),
            prompt_chars = log.prompt_chars,
            response_chars = log.response_chars,
            context_turns = log.context_turns,
            tool_name = log.tool_name.as_deref(),
            tool_calls = log.tool_calls,
            processing_time_ms = log.processing_time_ms,
            error_message = log.error_message.as_deref(),
            error_type = log.error_type.as_deref(),
            created_at = %log.created_at.to_rfc3339(),
        );
    }

    /// Get queue statistics (for monitoring)
    pub fn queue_len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_queue_full(&self) -> bool {
        self.sender.is_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::types::ActivityType;

    #[tokio::test]
    async fn test_log_is_drained_by_worker() {
        let logger = ActivityLogger::new(LoggerConfig::default());
        logger.log(ActivityLog::builder("stateless", ActivityType::RequestReceived).build());

        for _ in 0..50 {
            if logger.queue_len() == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(logger.queue_len(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_full_queue_drops_without_blocking() {
        let logger = ActivityLogger::new(LoggerConfig {
            queue_capacity: 1,
            worker_count: 1,
        });

        // the worker cannot run until this task yields
        logger.log(ActivityLog::builder("smart", ActivityType::MessageSent).build());
        logger.log(ActivityLog::builder("smart", ActivityType::MessageSent).build());

        assert!(logger.is_queue_full());
        assert_eq!(logger.queue_len(), 1);
    }
}
