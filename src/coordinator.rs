//! Coordinator: drives one scatter/sort/gather round.
//!
//! ```text
//! Idle -> BoundaryComputed -> Partitioned -> Distributing -> AwaitingResults -> Aggregating -> Done
//!   \________________________________________________________________________________/
//!                                   any step -> Failed
//! ```
//!
//! `Distributing` covers the transport round: buckets go out and workers
//! sort. The transport only returns once every worker has answered or been
//! declared lost, which is the collective barrier. `AwaitingResults` checks
//! that every bucket answered exactly once and that no worker failed.
//! Concatenation only starts after that check passes.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::boundary::Boundaries;
use crate::config::PipelineConfig;
use crate::error::{Result, SortError};
use crate::key::SortKey;
use crate::partition::{partition, Bucket};
use crate::transport::{AnyTransport, Reply, Transport};
use crate::worker::{LocalSort, SortedBucket, Worker};

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    BoundaryComputed,
    Partitioned,
    Distributing,
    AwaitingResults,
    Aggregating,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// Successor on the success path.
    pub fn next(self) -> Option<PipelineState> {
        use PipelineState::*;
        match self {
            Idle => Some(BoundaryComputed),
            BoundaryComputed => Some(Partitioned),
            Partitioned => Some(Distributing),
            Distributing => Some(AwaitingResults),
            AwaitingResults => Some(Aggregating),
            Aggregating => Some(Done),
            Done | Failed => None,
        }
    }

    pub fn can_transition_to(self, to: PipelineState) -> bool {
        if to == PipelineState::Failed {
            return !self.is_terminal();
        }
        self.next() == Some(to)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// State trail of a single run.
#[derive(Debug)]
struct Progress {
    visited: Vec<PipelineState>,
}

impl Progress {
    fn new() -> Self {
        Progress {
            visited: vec![PipelineState::Idle],
        }
    }

    fn current(&self) -> PipelineState {
        self.visited
            .last()
            .copied()
            .unwrap_or(PipelineState::Idle)
    }

    fn advance(&mut self, to: PipelineState) {
        let from = self.current();
        debug_assert!(from.can_transition_to(to), "illegal transition {from} -> {to}");
        debug!(%from, %to, "pipeline state");
        self.visited.push(to);
    }
}

/// Measurements from one successful run.
#[derive(Debug, Clone)]
pub struct RunStats {
    pub worker_count: usize,
    pub transport: &'static str,
    pub algorithm: LocalSort,
    pub input_len: usize,
    /// Elements per bucket, by bucket index.
    pub bucket_sizes: Vec<usize>,
    /// Time each worker spent sorting, by bucket index.
    pub worker_times: Vec<Duration>,
    /// Boundary calculation plus partitioning.
    pub partition_time: Duration,
    /// Full transport round: scatter, local sorts and gather.
    pub exchange_time: Duration,
    pub total_time: Duration,
    /// Every state the run passed through, starting at `Idle`.
    pub states: Vec<PipelineState>,
}

impl RunStats {
    pub fn largest_bucket(&self) -> usize {
        self.bucket_sizes.iter().copied().max().unwrap_or(0)
    }

    /// Largest bucket relative to a perfectly even split. 1.0 is ideal.
    pub fn imbalance(&self) -> f64 {
        if self.input_len == 0 || self.worker_count == 0 {
            return 1.0;
        }
        let even = self.input_len as f64 / self.worker_count as f64;
        self.largest_bucket() as f64 / even
    }
}

/// Sorted sequence plus run measurements.
#[derive(Debug, Clone)]
pub struct SortOutput<T> {
    pub values: Vec<T>,
    pub stats: RunStats,
}

/// Owns the input for a run and drives it from boundaries to the final
/// concatenation. Holds no state between runs.
#[derive(Debug, Clone)]
pub struct Coordinator<Tr = AnyTransport> {
    config: PipelineConfig,
    worker: Worker,
    transport: Tr,
}

impl Coordinator<AnyTransport> {
    /// Validate `config` and build the transport it names.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let transport =
            AnyTransport::build(config.transport, config.worker_count, config.gather_timeout)?;
        Ok(Coordinator {
            worker: Worker::new(config.algorithm),
            config,
            transport,
        })
    }
}

impl<Tr: Transport> Coordinator<Tr> {
    /// Use a caller-supplied transport. `config.transport` is ignored.
    pub fn with_transport(config: PipelineConfig, transport: Tr) -> Result<Self> {
        config.check_worker_count()?;
        Ok(Coordinator {
            worker: Worker::new(config.algorithm),
            config,
            transport,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn transport(&self) -> &Tr {
        &self.transport
    }

    /// Sort `input`, discarding run measurements.
    pub fn sort<T: SortKey>(&self, input: Vec<T>) -> Result<Vec<T>> {
        self.run(input).map(|output| output.values)
    }

    /// Sort `input` and report how the run went.
    pub fn run<T: SortKey>(&self, input: Vec<T>) -> Result<SortOutput<T>> {
        let started = Instant::now();
        let mut progress = Progress::new();
        info!(
            input_len = input.len(),
            workers = self.config.worker_count,
            transport = self.transport.name(),
            algorithm = %self.worker.algorithm(),
            "sample sort started"
        );

        match self.drive(input, &mut progress, started) {
            Ok(output) => {
                info!(
                    total_ms = output.stats.total_time.as_secs_f64() * 1000.0,
                    largest_bucket = output.stats.largest_bucket(),
                    "sample sort finished"
                );
                Ok(output)
            }
            Err(err) => {
                let from = progress.current();
                progress.advance(PipelineState::Failed);
                warn!(
                    %from,
                    kind = %err.kind(),
                    bucket = ?err.bucket(),
                    error = %err,
                    "sample sort failed"
                );
                Err(err)
            }
        }
    }

    fn drive<T: SortKey>(
        &self,
        input: Vec<T>,
        progress: &mut Progress,
        started: Instant,
    ) -> Result<SortOutput<T>> {
        let worker_count = self.config.worker_count;
        let input_len = input.len();

        let boundaries = Boundaries::compute(&input, worker_count)?;
        progress.advance(PipelineState::BoundaryComputed);
        debug!(
            min = ?boundaries.min,
            max = ?boundaries.max,
            width = boundaries.width,
            "boundaries computed"
        );

        let buckets = partition(&input, &boundaries);
        drop(input);
        let partition_time = started.elapsed();
        let bucket_sizes: Vec<usize> = buckets.iter().map(Bucket::len).collect();
        progress.advance(PipelineState::Partitioned);
        debug!(?bucket_sizes, "input partitioned");

        progress.advance(PipelineState::Distributing);
        let exchange_start = Instant::now();
        let replies = self.transport.exchange(self.worker, buckets);
        let exchange_time = exchange_start.elapsed();

        progress.advance(PipelineState::AwaitingResults);
        let sorted = collect_replies(replies, worker_count)?;

        progress.advance(PipelineState::Aggregating);
        let mut values = Vec::with_capacity(input_len);
        let mut worker_times = Vec::with_capacity(worker_count);
        for bucket in sorted {
            worker_times.push(bucket.elapsed);
            values.extend(bucket.values);
        }

        progress.advance(PipelineState::Done);
        Ok(SortOutput {
            values,
            stats: RunStats {
                worker_count,
                transport: self.transport.name(),
                algorithm: self.worker.algorithm(),
                input_len,
                bucket_sizes,
                worker_times,
                partition_time,
                exchange_time,
                total_time: started.elapsed(),
                states: progress.visited.clone(),
            },
        })
    }
}

/// Put replies back in bucket order, checking that each of the
/// `worker_count` buckets answered exactly once and successfully. When
/// several buckets fail, the lowest bucket index wins.
fn collect_replies<T>(replies: Vec<Reply<T>>, worker_count: usize) -> Result<Vec<SortedBucket<T>>> {
    let mut slots: Vec<Option<SortedBucket<T>>> = (0..worker_count).map(|_| None).collect();
    let mut errors: Vec<SortError> = Vec::new();

    for (index, reply) in replies {
        match reply {
            Err(err) => errors.push(err),
            Ok(_) if index >= worker_count => {
                errors.push(SortError::transport(index, "reply for a bucket that was never sent"));
            }
            Ok(sorted) if sorted.index != index => {
                errors.push(SortError::transport(
                    index,
                    format!("reply carries bucket {} instead", sorted.index),
                ));
            }
            Ok(_) if slots[index].is_some() => {
                errors.push(SortError::transport(index, "duplicate reply"));
            }
            Ok(sorted) => slots[index] = Some(sorted),
        }
    }

    for (index, slot) in slots.iter().enumerate() {
        let already_failed = errors.iter().any(|e| e.bucket() == Some(index));
        if slot.is_none() && !already_failed {
            errors.push(SortError::transport(index, "no reply received"));
        }
    }

    if let Some(first) = errors.iter().min_by_key(|e| e.bucket()) {
        if errors.len() > 1 {
            warn!(failed_buckets = errors.len(), "several buckets failed");
        }
        return Err(first.clone());
    }

    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transport::{InlineTransport, TransportKind};

    fn sorted(index: usize, values: Vec<u32>) -> SortedBucket<u32> {
        SortedBucket {
            index,
            values,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_state_transitions() {
        use PipelineState::*;
        let path = [Idle, BoundaryComputed, Partitioned, Distributing, AwaitingResults, Aggregating, Done];
        for w in path.windows(2) {
            assert!(w[0].can_transition_to(w[1]));
            assert!(w[0].can_transition_to(Failed));
        }
        assert!(!Idle.can_transition_to(Partitioned));
        assert!(!Done.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Idle));
        assert!(Done.is_terminal() && Failed.is_terminal());
    }

    #[test]
    fn test_run_visits_every_state() {
        let coordinator = Coordinator::from_config(PipelineConfig::new(4)).unwrap();
        let output = coordinator.run(vec![2u32, 3, 9, 0, 4, 5, 1, 8, 7, 6]).unwrap();
        use PipelineState::*;
        assert_eq!(
            output.stats.states,
            vec![Idle, BoundaryComputed, Partitioned, Distributing, AwaitingResults, Aggregating, Done]
        );
        assert_eq!(output.stats.bucket_sizes, vec![1, 3, 3, 3]);
        assert_eq!(output.stats.worker_times.len(), 4);
        assert_eq!(output.values, (0..10).collect::<Vec<u32>>());
    }

    #[test]
    fn test_collect_restores_order() {
        let replies = vec![
            (2, Ok(sorted(2, vec![7, 8]))),
            (0, Ok(sorted(0, vec![1]))),
            (1, Ok(sorted(1, vec![]))),
        ];
        let buckets = collect_replies(replies, 3).unwrap();
        let indices: Vec<usize> = buckets.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_collect_missing_reply() {
        let replies = vec![(0, Ok(sorted(0, vec![1]))), (2, Ok(sorted(2, vec![5])))];
        let err = collect_replies(replies, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
        assert_eq!(err.bucket(), Some(1));
    }

    #[test]
    fn test_collect_duplicate_reply() {
        let replies = vec![
            (0, Ok(sorted(0, vec![1]))),
            (1, Ok(sorted(1, vec![2]))),
            (1, Ok(sorted(1, vec![2]))),
        ];
        let err = collect_replies(replies, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
        assert_eq!(err.bucket(), Some(1));
    }

    #[test]
    fn test_collect_mislabelled_reply() {
        let replies = vec![(0, Ok(sorted(1, vec![1]))), (1, Ok(sorted(1, vec![2])))];
        let err = collect_replies(replies, 2).unwrap_err();
        assert_eq!(err.bucket(), Some(0));
    }

    #[test]
    fn test_collect_lowest_failure_wins() {
        let replies = vec![
            (3, Err(SortError::transport(3, "lost"))),
            (0, Ok(sorted(0, vec![1]))),
            (1, Err(SortError::InvalidElement {
                bucket: 1,
                position: 0,
                value: "NaN".into(),
            })),
            (2, Ok(sorted(2, vec![4]))),
        ];
        let err = collect_replies(replies, 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidElement);
        assert_eq!(err.bucket(), Some(1));
    }

    #[test]
    fn test_with_transport_rejects_single_worker() {
        let err = Coordinator::with_transport(PipelineConfig::new(1), InlineTransport).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_from_config_builds_named_transport() {
        for kind in TransportKind::ALL {
            let c = Coordinator::from_config(PipelineConfig::new(3).with_transport(kind)).unwrap();
            assert_eq!(c.transport().name(), kind.name());
            assert_eq!(c.config().transport, kind);
            assert_eq!(c.config().worker_count, 3);
        }
    }

    #[test]
    fn test_imbalance() {
        let coordinator = Coordinator::from_config(PipelineConfig::new(3)).unwrap();
        let output = coordinator.run(vec![5u32, 5, 5, 5]).unwrap();
        assert_eq!(output.stats.largest_bucket(), 4);
        assert!((output.stats.imbalance() - 3.0).abs() < 1e-9);
    }
}
