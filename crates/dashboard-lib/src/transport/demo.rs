//! Synthetic demo feed
//!
//! Keeps the dashboard populated when neither the push channel nor polling
//! delivers anything. Samples are drawn from fixed catalogs with a small
//! xorshift generator; no backend is involved.

use super::DashboardEvent;
use crate::models::TelemetrySample;
use crate::window::{BoundedWindow, TELEMETRY_CAPACITY};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

const SERVICES: &[&str] = &["fetcher", "indexer", "ranker", "ingestor", "api"];
const PROVIDERS: &[&str] = &["aws", "gcp", "azure", "oracle"];
const REGIONS: &[&str] = &["us-east-1", "eu-west-1", "ap-south-1", "us-west-2"];

/// Samples produced by `start()`, spaced one second apart
pub const INITIAL_BATCH: usize = 8;

const BATCH_SPACING_MS: i64 = 1000;

/// Random telemetry source
#[derive(Debug, Clone)]
pub struct DemoSampler {
    state: u64,
}

impl DemoSampler {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    /// Seed from the wall clock
    pub fn from_entropy() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::with_seed(nanos)
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform in [0, 1)
    fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_unit()
    }

    fn pick<'a>(&mut self, catalog: &[&'a str]) -> &'a str {
        catalog[(self.next_u64() % catalog.len() as u64) as usize]
    }

    /// One sample stamped with `timestamp` (ms since epoch)
    pub fn generate_entry(&mut self, timestamp: i64) -> TelemetrySample {
        let cpu = round_to(self.uniform(0.1, 2.0), 2);
        let memory = round_to(self.uniform(32.0, 1024.0), 2);
        let latency_ms = self.uniform(10.0, 350.0).round() as i64;

        TelemetrySample {
            timestamp,
            service: self.pick(SERVICES).to_string(),
            provider: self.pick(PROVIDERS).to_string(),
            region: self.pick(REGIONS).to_string(),
            cpu,
            memory,
            latency_ms,
            cost_per_min: demo_cost(cpu, memory, latency_ms),
        }
    }

    /// `count` samples spaced one second apart, the newest one second before `now`
    pub fn generate_batch(&mut self, count: usize, now: i64) -> Vec<TelemetrySample> {
        (0..count)
            .map(|i| self.generate_entry(now - (count - i) as i64 * BATCH_SPACING_MS))
            .collect()
    }
}

/// Cost model of the synthetic feed
pub fn demo_cost(cpu: f64, memory: f64, latency_ms: i64) -> f64 {
    let raw = 0.005 * cpu + 0.002 * (memory / 1024.0) + latency_ms as f64 / 10_000.0;
    round_to(raw, 6)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Owns the demo tick task
pub struct DemoGenerator {
    tick: Duration,
    events: mpsc::Sender<DashboardEvent>,
    task: Option<JoinHandle<()>>,
    forced: bool,
}

impl DemoGenerator {
    pub fn new(tick: Duration, events: mpsc::Sender<DashboardEvent>) -> Self {
        Self {
            tick,
            events,
            task: None,
            forced: false,
        }
    }

    /// Start the feed.
    ///
    /// Returns the initial batch for the caller to apply right away, or `None`
    /// if the feed is already running. Later samples arrive as
    /// [`DashboardEvent::DemoTail`], each carrying the whole local buffer.
    pub fn start(&mut self) -> Option<Vec<TelemetrySample>> {
        if self.is_running() {
            return None;
        }

        let mut sampler = DemoSampler::from_entropy();
        let initial = sampler.generate_batch(INITIAL_BATCH, now_millis());

        let mut buffer = BoundedWindow::new(TELEMETRY_CAPACITY);
        buffer.merge(initial.clone());

        let events = self.events.clone();
        let tick = self.tick;
        debug!(tick_ms = tick.as_millis() as u64, "Starting demo feed");

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + tick, tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                buffer.push(sampler.generate_entry(now_millis()));
                if events
                    .send(DashboardEvent::DemoTail(buffer.to_vec()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }));

        Some(initial)
    }

    /// Stop the tick unless the force override is set.
    ///
    /// Returns true if the feed was running and has been stopped.
    pub fn stop(&mut self) -> bool {
        if self.forced {
            return false;
        }
        self.shutdown()
    }

    /// Stop regardless of the force override
    pub fn shutdown(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                debug!("Demo feed stopped");
                true
            }
            None => false,
        }
    }

    pub fn set_forced(&mut self, forced: bool) {
        self.forced = forced;
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }
}

impl Drop for DemoGenerator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_stay_within_catalogs_and_ranges() {
        let mut sampler = DemoSampler::with_seed(42);

        for i in 0..500 {
            let entry = sampler.generate_entry(i);
            assert!(SERVICES.contains(&entry.service.as_str()));
            assert!(PROVIDERS.contains(&entry.provider.as_str()));
            assert!(REGIONS.contains(&entry.region.as_str()));
            assert!((0.1..=2.0).contains(&entry.cpu), "cpu {}", entry.cpu);
            assert!((32.0..=1024.0).contains(&entry.memory), "memory {}", entry.memory);
            assert!((10..=350).contains(&entry.latency_ms));
            assert_eq!(
                entry.cost_per_min,
                demo_cost(entry.cpu, entry.memory, entry.latency_ms)
            );
        }
    }

    #[test]
    fn test_cost_formula() {
        // 0.005 + 0.001 + 0.01
        assert!((demo_cost(1.0, 512.0, 100) - 0.016).abs() < 1e-12);
        assert_eq!(demo_cost(0.123, 100.0, 37), 0.004510);
    }

    #[test]
    fn test_batch_spacing() {
        let mut sampler = DemoSampler::with_seed(7);
        let batch = sampler.generate_batch(INITIAL_BATCH, 100_000);

        let timestamps: Vec<i64> = batch.iter().map(|s| s.timestamp).collect();
        assert_eq!(
            timestamps,
            vec![92_000, 93_000, 94_000, 95_000, 96_000, 97_000, 98_000, 99_000]
        );
    }

    #[test]
    fn test_same_seed_same_samples() {
        let a = DemoSampler::with_seed(99).generate_batch(3, 0);
        let b = DemoSampler::with_seed(99).generate_batch(3, 0);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let (tx, _rx) = mpsc::channel(8);
        let mut demo = DemoGenerator::new(Duration::from_secs(60), tx);

        let initial = demo.start().unwrap();
        assert_eq!(initial.len(), INITIAL_BATCH);
        assert!(demo.start().is_none());
        assert!(demo.is_running());

        assert!(demo.stop());
        assert!(!demo.is_running());
    }

    #[tokio::test]
    async fn test_forced_stop_is_noop() {
        let (tx, _rx) = mpsc::channel(8);
        let mut demo = DemoGenerator::new(Duration::from_secs(60), tx);
        demo.set_forced(true);
        demo.start();

        assert!(!demo.stop());
        assert!(demo.is_running());

        assert!(demo.shutdown());
        assert!(!demo.is_running());
    }

    #[tokio::test]
    async fn test_tick_sends_growing_buffer() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut demo = DemoGenerator::new(Duration::from_millis(10), tx);
        demo.start();

        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();

        match (first, second) {
            (Some(DashboardEvent::DemoTail(a)), Some(DashboardEvent::DemoTail(b))) => {
                assert_eq!(a.len(), INITIAL_BATCH + 1);
                assert_eq!(b.len(), INITIAL_BATCH + 2);
                assert_eq!(&b[..a.len()], &a[..]);
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }
}
