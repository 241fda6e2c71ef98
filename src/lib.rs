//! Range-partitioned sample sort.
//!
//! An unordered collection is cut into `P` value ranges of equal width. Each
//! range (a *bucket*) is copied out and handed to its own worker, every
//! worker sorts its bucket, and the coordinator concatenates the sorted
//! buckets in bucket order. Bucket ranges never overlap, so the concatenation
//! is globally sorted without a merge step.
//!
//! ```
//! let sorted = sample_sort::sort_distributed(vec![2u32, 3, 9, 0, 4, 5, 1, 8, 7, 6], 4).unwrap();
//! assert_eq!(sorted, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
//! ```
//!
//! For control over the transport, the local sort or the gather timeout,
//! build a [`Coordinator`] from a [`PipelineConfig`].

pub mod boundary;
pub mod config;
pub mod coordinator;
pub mod cpu_parallel_sort;
pub mod cpu_radix_sort;
pub mod cpu_sort;
pub mod error;
pub mod input;
pub mod key;
pub mod partition;
pub mod report;
pub mod transport;
pub mod worker;

pub use boundary::Boundaries;
pub use config::PipelineConfig;
pub use coordinator::{Coordinator, PipelineState, RunStats, SortOutput};
pub use error::{ErrorKind, InputError, Result, SortError};
pub use key::SortKey;
pub use partition::{partition, Bucket};
pub use transport::{
    AnyTransport, ChannelTransport, InlineTransport, RayonTransport, Reply, Transport,
    TransportKind,
};
pub use worker::{LocalSort, SortedBucket, Worker};

/// Sort `input` across `worker_count` workers with the default transport
/// (one thread per bucket) and local sort.
///
/// Fails with [`SortError::Configuration`] when `worker_count < 2` or
/// `input` is empty, before any bucket is computed.
pub fn sort_distributed<T: SortKey>(input: Vec<T>, worker_count: usize) -> Result<Vec<T>> {
    Coordinator::from_config(PipelineConfig::new(worker_count))?.sort(input)
}
