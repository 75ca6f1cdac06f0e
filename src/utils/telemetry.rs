// file: src/utils/telemetry.rs
// description: timing helpers for training, classification and reconstruction runs

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Wall-clock timer for a named operation.
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        debug!("Starting operation: {}", operation);
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        info!(
            "Completed {} in {:.3}s",
            self.operation,
            elapsed.as_secs_f64()
        );
        elapsed
    }

    /// Logs the throughput of `count` processed `unit`s and returns the metrics.
    pub fn finish_with_count(self, count: usize, unit: &str) -> PerformanceMetrics {
        let metrics = PerformanceMetrics::new(&self.operation, count, self.elapsed());
        info!(
            "Completed {}: {} {} in {:.3}s ({:.2} {}/sec)",
            self.operation,
            count,
            unit,
            metrics.duration_ms as f64 / 1000.0,
            metrics.throughput,
            unit
        );
        metrics
    }

    pub fn checkpoint(&self, message: &str) {
        debug!(
            "Checkpoint [{}]: {} at {:.3}s",
            self.operation,
            message,
            self.elapsed().as_secs_f64()
        );
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub operation: String,
    pub count: usize,
    pub duration_ms: u64,
    /// Items per second.
    pub throughput: f64,
    pub avg_item_time_ms: f64,
}

impl PerformanceMetrics {
    pub fn new(operation: &str, count: usize, duration: Duration) -> Self {
        let duration_ms = duration.as_millis() as u64;
        let duration_secs = duration.as_secs_f64();

        let throughput = if duration_secs > 0.0 {
            count as f64 / duration_secs
        } else {
            0.0
        };

        let avg_item_time_ms = if count > 0 {
            duration_secs * 1000.0 / count as f64
        } else {
            0.0
        };

        Self {
            operation: operation.to_string(),
            count,
            duration_ms,
            throughput,
            avg_item_time_ms,
        }
    }

    pub fn format(&self) -> String {
        format!(
            "{}: {} items in {}ms ({:.2} items/sec, {:.3}ms per item)",
            self.operation, self.count, self.duration_ms, self.throughput, self.avg_item_time_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_performance_metrics() {
        let metrics = PerformanceMetrics::new("classify", 100, Duration::from_secs(10));
        assert_eq!(metrics.count, 100);
        assert_eq!(metrics.throughput, 10.0);
        assert_eq!(metrics.avg_item_time_ms, 100.0);
        assert!(metrics.format().starts_with("classify: 100 items"));
    }

    #[test]
    fn test_performance_metrics_empty_run() {
        let metrics = PerformanceMetrics::new("train", 0, Duration::ZERO);
        assert_eq!(metrics.throughput, 0.0);
        assert_eq!(metrics.avg_item_time_ms, 0.0);
    }

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::new("mean");
        std::thread::sleep(Duration::from_millis(10));
        let metrics = timer.finish_with_count(5, "matrices");
        assert!(metrics.duration_ms >= 10);
        assert_eq!(metrics.count, 5);
    }
}
