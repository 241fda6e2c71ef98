use std::cmp::Ordering;
use std::thread;
use std::time::Duration;

use sample_sort::transport::run_worker;
use sample_sort::{
    Bucket, ChannelTransport, Coordinator, ErrorKind, LocalSort, PipelineConfig, Reply, SortError,
    SortKey, Transport, TransportKind, Worker,
};

// ============================================================================
// Test keys
// ============================================================================

/// Panics when its radix encoding is taken for the value 13.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
struct Fragile(i32);

impl SortKey for Fragile {
    const KEY_BITS: u32 = 32;

    fn to_f64(self) -> f64 {
        self.0 as f64
    }

    fn key_cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }

    fn radix_key(self) -> u64 {
        if self.0 == 13 {
            panic!("unlucky element");
        }
        self.0.radix_key()
    }
}

/// Takes a long time to encode for the value 99.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
struct Sluggish(u32);

impl SortKey for Sluggish {
    const KEY_BITS: u32 = 32;

    fn to_f64(self) -> f64 {
        self.0 as f64
    }

    fn key_cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }

    fn radix_key(self) -> u64 {
        if self.0 == 99 {
            thread::sleep(Duration::from_millis(100));
        }
        self.0 as u64
    }
}

// ============================================================================
// Test transports
// ============================================================================

/// Never delivers one bucket.
struct LossyTransport {
    lost: usize,
}

impl Transport for LossyTransport {
    fn name(&self) -> &'static str {
        "lossy"
    }

    fn exchange<T: SortKey>(&self, worker: Worker, buckets: Vec<Bucket<T>>) -> Vec<Reply<T>> {
        buckets
            .into_iter()
            .filter(|b| b.index != self.lost)
            .map(|b| (b.index, run_worker(worker, b)))
            .collect()
    }
}

/// Answers every bucket twice.
struct EchoTransport;

impl Transport for EchoTransport {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn exchange<T: SortKey>(&self, worker: Worker, buckets: Vec<Bucket<T>>) -> Vec<Reply<T>> {
        buckets
            .into_iter()
            .flat_map(|b| {
                let reply = (b.index, run_worker(worker, b));
                [reply.clone(), reply]
            })
            .collect()
    }
}

/// Swaps the labels of buckets 0 and 1 on the way back.
struct CrossedWiresTransport;

impl Transport for CrossedWiresTransport {
    fn name(&self) -> &'static str {
        "crossed"
    }

    fn exchange<T: SortKey>(&self, worker: Worker, buckets: Vec<Bucket<T>>) -> Vec<Reply<T>> {
        buckets
            .into_iter()
            .map(|b| {
                let label = match b.index {
                    0 => 1,
                    1 => 0,
                    i => i,
                };
                (label, run_worker(worker, b))
            })
            .collect()
    }
}

fn scenario_a() -> Vec<u32> {
    vec![2, 3, 9, 0, 4, 5, 1, 8, 7, 6]
}

// ============================================================================
// InvalidElement
// ============================================================================

#[test]
fn test_nan_fails_run_on_every_transport() {
    for kind in TransportKind::ALL {
        let coordinator =
            Coordinator::from_config(PipelineConfig::new(3).with_transport(kind)).unwrap();
        let err = coordinator
            .sort(vec![1.0f64, f64::NAN, 5.0, 9.0])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidElement, "transport {kind}");
        assert_eq!(err.bucket(), Some(0));
        assert_eq!(
            err,
            SortError::InvalidElement {
                bucket: 0,
                position: 1,
                value: "NaN".to_string(),
            }
        );
    }
}

#[test]
fn test_all_nan_input() {
    let err = Coordinator::from_config(PipelineConfig::new(2))
        .unwrap()
        .sort(vec![f32::NAN, f32::NAN])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidElement);
    assert_eq!(err.bucket(), Some(0));
}

// ============================================================================
// TransportFailure
// ============================================================================

#[test]
fn test_lost_bucket_is_transport_failure() {
    let coordinator =
        Coordinator::with_transport(PipelineConfig::new(4), LossyTransport { lost: 2 }).unwrap();
    let err = coordinator.sort(scenario_a()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportFailure);
    assert_eq!(err.bucket(), Some(2));
}

#[test]
fn test_duplicate_reply_is_transport_failure() {
    let coordinator = Coordinator::with_transport(PipelineConfig::new(4), EchoTransport).unwrap();
    let err = coordinator.sort(scenario_a()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportFailure);
    assert_eq!(err.bucket(), Some(0));
}

#[test]
fn test_mislabelled_reply_is_transport_failure() {
    let coordinator =
        Coordinator::with_transport(PipelineConfig::new(4), CrossedWiresTransport).unwrap();
    let err = coordinator.sort(scenario_a()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportFailure);
    assert_eq!(err.bucket(), Some(0));
}

#[test]
fn test_worker_panic_is_transport_failure() {
    let input: Vec<Fragile> = (0..40).map(Fragile).collect();
    for kind in TransportKind::ALL {
        let config = PipelineConfig::new(4)
            .with_transport(kind)
            .with_algorithm(LocalSort::Radix);
        let err = Coordinator::from_config(config)
            .unwrap()
            .sort(input.clone())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportFailure, "transport {kind}");
        // min 0, max 39, width 13: 13 sits on the first interior cut point.
        assert_eq!(err.bucket(), Some(1));
        assert!(err.to_string().contains("unlucky element"), "{err}");
    }
}

#[test]
fn test_panicking_key_fine_without_radix() {
    let input: Vec<Fragile> = (0..40).map(Fragile).collect();
    let sorted = Coordinator::from_config(PipelineConfig::new(4))
        .unwrap()
        .sort(input.clone())
        .unwrap();
    assert_eq!(sorted, input);
}

#[test]
fn test_gather_timeout() {
    let config = PipelineConfig::new(2)
        .with_algorithm(LocalSort::Radix)
        .with_gather_timeout(Duration::from_millis(20));
    let coordinator = Coordinator::from_config(config).unwrap();
    let input: Vec<Sluggish> = [0, 1, 50, 98, 99].into_iter().map(Sluggish).collect();

    let err = coordinator.sort(input).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportFailure);
    assert_eq!(err.bucket(), Some(1));
    assert!(err.to_string().contains("no reply within 20 ms"), "{err}");
}

#[test]
fn test_no_timeout_waits_for_slow_worker() {
    let coordinator = Coordinator::with_transport(
        PipelineConfig::new(2).with_algorithm(LocalSort::Radix),
        ChannelTransport::new(),
    )
    .unwrap();
    let input: Vec<Sluggish> = [99, 0, 1].into_iter().map(Sluggish).collect();
    let sorted = coordinator.sort(input).unwrap();
    assert_eq!(sorted, vec![Sluggish(0), Sluggish(1), Sluggish(99)]);
}

#[test]
fn test_timeout_rejected_for_rayon() {
    let config = PipelineConfig::new(4)
        .with_transport(TransportKind::Rayon)
        .with_gather_timeout(Duration::from_millis(5));
    let err = Coordinator::from_config(config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
