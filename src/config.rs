//! Pipeline configuration.

use std::thread;
use std::time::Duration;

use crate::error::{Result, SortError};
use crate::transport::TransportKind;
use crate::worker::LocalSort;

/// Smallest worker count that yields a defined bucket width.
pub const MIN_WORKERS: usize = 2;

/// Settings for one [`Coordinator`](crate::Coordinator).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Number of buckets, and of workers (one per bucket).
    pub worker_count: usize,
    pub transport: TransportKind,
    /// Local sort every worker applies.
    pub algorithm: LocalSort,
    /// Abandon workers that have not replied this long after the gather
    /// starts. `None` waits forever. Channel transport only.
    pub gather_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            worker_count: default_worker_count(),
            transport: TransportKind::default(),
            algorithm: LocalSort::default(),
            gather_timeout: None,
        }
    }
}

impl PipelineConfig {
    pub fn new(worker_count: usize) -> Self {
        PipelineConfig {
            worker_count,
            ..Self::default()
        }
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_algorithm(mut self, algorithm: LocalSort) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_gather_timeout(mut self, timeout: Duration) -> Self {
        self.gather_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.check_worker_count()?;
        if let Some(timeout) = self.gather_timeout {
            if timeout.is_zero() {
                return Err(SortError::configuration("gather_timeout must be positive"));
            }
            if self.transport != TransportKind::Channel {
                return Err(SortError::configuration(format!(
                    "gather_timeout is only supported by the channel transport, not {}",
                    self.transport
                )));
            }
        }
        Ok(())
    }

    /// A single bucket has no width: `(max - min) / (P - 1)` divides by zero.
    pub fn check_worker_count(&self) -> Result<()> {
        if self.worker_count < MIN_WORKERS {
            return Err(SortError::configuration(format!(
                "worker_count must be at least {MIN_WORKERS}, got {}",
                self.worker_count
            )));
        }
        Ok(())
    }
}

/// One worker per available core, but never fewer than [`MIN_WORKERS`].
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_WORKERS)
        .max(MIN_WORKERS)
}
