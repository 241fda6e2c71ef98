//! Worker transports: how buckets reach their workers and come back.
//!
//! A transport runs one scatter/gather round. It hands bucket `k` to the
//! worker for bucket `k`, waits for every worker, and returns one reply per
//! bucket tagged with the index the bucket was sent under. Replies may come
//! back in any order; the coordinator restores bucket order.
//!
//! Three transports ship with the crate:
//!
//! - [`ChannelTransport`]: one named thread per bucket, each with a bounded
//!   inbox, replying on a shared channel. The only transport that can give
//!   up on a slow worker (see [`ChannelTransport::with_timeout`]).
//! - [`RayonTransport`]: one task per bucket on a Rayon pool.
//! - [`InlineTransport`]: sorts every bucket on the calling thread.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel as channel;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{Result, SortError};
use crate::key::SortKey;
use crate::partition::Bucket;
use crate::worker::{SortedBucket, Worker};

/// A worker's answer for one bucket, tagged with the index it was sent under.
pub type Reply<T> = (usize, Result<SortedBucket<T>>);

/// One scatter/gather round between the coordinator and its workers.
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Deliver each bucket to its own worker and block until every worker
    /// has answered or is known to be lost. Lost buckets should come back as
    /// [`SortError::TransportFailure`] replies.
    fn exchange<T: SortKey>(&self, worker: Worker, buckets: Vec<Bucket<T>>) -> Vec<Reply<T>>;
}

/// Run a worker on one bucket, turning a panic into a transport failure for
/// that bucket.
pub fn run_worker<T: SortKey>(worker: Worker, bucket: Bucket<T>) -> Result<SortedBucket<T>> {
    let index = bucket.index;
    panic::catch_unwind(AssertUnwindSafe(|| worker.sort(bucket))).unwrap_or_else(|payload| {
        let reason = panic_message(payload.as_ref());
        warn!(bucket = index, %reason, "worker panicked");
        Err(SortError::transport(index, format!("worker panicked: {reason}")))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ============================================================================
// ChannelTransport
// ============================================================================

/// Actor per bucket over `crossbeam-channel`.
///
/// All worker threads are started before any bucket is sent, so each worker
/// sits blocked on its inbox until the scatter reaches it.
#[derive(Debug, Clone, Default)]
pub struct ChannelTransport {
    gather_timeout: Option<Duration>,
}

impl ChannelTransport {
    /// Wait for workers indefinitely.
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up on workers that have not replied `timeout` after the gather
    /// starts. Their buckets fail with a transport error; the threads are
    /// left to finish on their own.
    pub fn with_timeout(timeout: Duration) -> Self {
        ChannelTransport {
            gather_timeout: Some(timeout),
        }
    }

    pub fn gather_timeout(&self) -> Option<Duration> {
        self.gather_timeout
    }
}

impl Transport for ChannelTransport {
    fn name(&self) -> &'static str {
        "channel"
    }

    fn exchange<T: SortKey>(&self, worker: Worker, buckets: Vec<Bucket<T>>) -> Vec<Reply<T>> {
        let expected = buckets.len();
        let (reply_tx, reply_rx) = channel::unbounded::<Reply<T>>();
        let mut replies: Vec<Reply<T>> = Vec::with_capacity(expected);
        let mut inboxes = Vec::with_capacity(expected);
        let mut handles = Vec::with_capacity(expected);

        for bucket in &buckets {
            let index = bucket.index;
            let (inbox_tx, inbox_rx) = channel::bounded::<Bucket<T>>(1);
            let reply_tx = reply_tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("bucket-worker-{index}"))
                .spawn(move || {
                    let Ok(bucket) = inbox_rx.recv() else {
                        return;
                    };
                    // The coordinator may have stopped listening after a timeout.
                    let _ = reply_tx.send((index, run_worker(worker, bucket)));
                });
            match spawned {
                Ok(handle) => {
                    handles.push(handle);
                    inboxes.push(Some(inbox_tx));
                }
                Err(err) => {
                    replies.push((
                        index,
                        Err(SortError::transport(
                            index,
                            format!("failed to start worker thread: {err}"),
                        )),
                    ));
                    inboxes.push(None);
                }
            }
        }
        drop(reply_tx);

        let sent: Vec<usize> = buckets.iter().map(|b| b.index).collect();
        for (bucket, inbox) in buckets.into_iter().zip(inboxes) {
            let Some(inbox) = inbox else { continue };
            let index = bucket.index;
            debug!(bucket = index, len = bucket.len(), "bucket sent");
            if inbox.send(bucket).is_err() {
                replies.push((
                    index,
                    Err(SortError::transport(index, "worker hung up before receiving its bucket")),
                ));
            }
        }

        let deadline = self.gather_timeout.map(|t| Instant::now() + t);
        let mut timed_out = false;
        while replies.len() < expected {
            let received = match deadline {
                Some(deadline) => reply_rx.recv_deadline(deadline).map_err(|err| match err {
                    channel::RecvTimeoutError::Timeout => {
                        timed_out = true;
                        format!(
                            "no reply within {} ms",
                            self.gather_timeout.unwrap_or_default().as_millis()
                        )
                    }
                    channel::RecvTimeoutError::Disconnected => {
                        "worker exited without replying".to_string()
                    }
                }),
                None => reply_rx
                    .recv()
                    .map_err(|_| "worker exited without replying".to_string()),
            };

            match received {
                Ok(reply) => {
                    debug!(bucket = reply.0, "reply received");
                    replies.push(reply);
                }
                Err(reason) => {
                    let answered: HashSet<usize> = replies.iter().map(|(i, _)| *i).collect();
                    for &index in sent.iter().filter(|i| !answered.contains(i)) {
                        warn!(bucket = index, %reason, "bucket lost in transport");
                        replies.push((index, Err(SortError::transport(index, reason.clone()))));
                    }
                    break;
                }
            }
        }

        // Threads still sorting after a timeout are left detached.
        if !timed_out {
            for handle in handles {
                if handle.join().is_err() {
                    warn!("worker thread panicked outside its sort");
                }
            }
        }

        replies
    }
}

// ============================================================================
// RayonTransport
// ============================================================================

/// One Rayon task per bucket. `collect` is the join barrier.
#[derive(Clone, Default)]
pub struct RayonTransport {
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl RayonTransport {
    /// Run on Rayon's global pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run on a dedicated pool with `threads` threads.
    pub fn with_threads(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("bucket-pool-{i}"))
            .build()
            .map_err(|err| SortError::configuration(format!("cannot build worker pool: {err}")))?;
        Ok(RayonTransport {
            pool: Some(Arc::new(pool)),
        })
    }
}

impl fmt::Debug for RayonTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RayonTransport")
            .field("threads", &self.pool.as_ref().map(|p| p.current_num_threads()))
            .finish()
    }
}

impl Transport for RayonTransport {
    fn name(&self) -> &'static str {
        "rayon"
    }

    fn exchange<T: SortKey>(&self, worker: Worker, buckets: Vec<Bucket<T>>) -> Vec<Reply<T>> {
        let round = move || {
            buckets
                .into_par_iter()
                .map(|bucket| (bucket.index, run_worker(worker, bucket)))
                .collect::<Vec<_>>()
        };
        match &self.pool {
            Some(pool) => pool.install(round),
            None => round(),
        }
    }
}

// ============================================================================
// InlineTransport
// ============================================================================

/// Sorts each bucket in turn on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineTransport;

impl Transport for InlineTransport {
    fn name(&self) -> &'static str {
        "inline"
    }

    fn exchange<T: SortKey>(&self, worker: Worker, buckets: Vec<Bucket<T>>) -> Vec<Reply<T>> {
        buckets
            .into_iter()
            .map(|bucket| (bucket.index, run_worker(worker, bucket)))
            .collect()
    }
}

// ============================================================================
// Runtime selection
// ============================================================================

/// Transport chosen at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    Channel,
    Rayon,
    Inline,
}

impl TransportKind {
    pub const ALL: [TransportKind; 3] = [
        TransportKind::Channel,
        TransportKind::Rayon,
        TransportKind::Inline,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TransportKind::Channel => "channel",
            TransportKind::Rayon => "rayon",
            TransportKind::Inline => "inline",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TransportKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown transport {s:?} (expected channel, rayon or inline)"))
    }
}

/// Any of the built-in transports.
#[derive(Debug, Clone)]
pub enum AnyTransport {
    Channel(ChannelTransport),
    Rayon(RayonTransport),
    Inline(InlineTransport),
}

impl AnyTransport {
    /// Build the transport for `kind`. The Rayon transport gets a dedicated
    /// pool with one thread per bucket.
    pub fn build(
        kind: TransportKind,
        worker_count: usize,
        gather_timeout: Option<Duration>,
    ) -> Result<Self> {
        Ok(match kind {
            TransportKind::Channel => AnyTransport::Channel(ChannelTransport { gather_timeout }),
            TransportKind::Rayon => AnyTransport::Rayon(RayonTransport::with_threads(worker_count)?),
            TransportKind::Inline => AnyTransport::Inline(InlineTransport),
        })
    }
}

impl Transport for AnyTransport {
    fn name(&self) -> &'static str {
        match self {
            AnyTransport::Channel(t) => t.name(),
            AnyTransport::Rayon(t) => t.name(),
            AnyTransport::Inline(t) => t.name(),
        }
    }

    fn exchange<T: SortKey>(&self, worker: Worker, buckets: Vec<Bucket<T>>) -> Vec<Reply<T>> {
        match self {
            AnyTransport::Channel(t) => t.exchange(worker, buckets),
            AnyTransport::Rayon(t) => t.exchange(worker, buckets),
            AnyTransport::Inline(t) => t.exchange(worker, buckets),
        }
    }
}
