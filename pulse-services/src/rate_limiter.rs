//! Rate limiting for text-generation calls
//!
//! Spaces requests out by a minimum interval and wraps any
//! [`TextGenerator`] so every generation call waits for its slot.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use pulse_core::PulseResult;
use pulse_research::TextGenerator;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Default spacing between LLM calls
pub const DEFAULT_GENERATION_INTERVAL_MS: u64 = 1000;

/// Rate limiter that enforces a minimum delay between requests
///
/// ## Reservation-Based Scheduling
///
/// Each caller reserves a future time slot while holding the lock and
/// then sleeps outside it, so concurrent callers never share a slot.
#[derive(Debug)]
pub struct RateLimiter {
    /// Next free slot, in milliseconds since `epoch`
    next_available_ms: Mutex<u64>,
    epoch: Instant,
    min_interval: Duration,
    /// Name for logging purposes
    name: String,
    total_requests: AtomicU64,
    waited_requests: AtomicU64,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64, name: &str) -> Self {
        Self {
            next_available_ms: Mutex::new(0),
            epoch: Instant::now(),
            min_interval: Duration::from_millis(min_interval_ms),
            name: name.to_string(),
            total_requests: AtomicU64::new(0),
            waited_requests: AtomicU64::new(0),
        }
    }

    /// Limiter for the text-generation provider
    pub fn for_generation(min_interval_ms: u64) -> Arc<Self> {
        Arc::new(Self::new(min_interval_ms, "generation"))
    }

    fn instant_to_ms(&self, instant: Instant) -> u64 {
        instant.duration_since(self.epoch).as_millis() as u64
    }

    fn ms_to_instant(&self, ms: u64) -> Instant {
        self.epoch + Duration::from_millis(ms)
    }

    /// Wait until this caller's reserved slot comes up
    pub async fn acquire(&self) {
        let request_num = self.total_requests.fetch_add(1, Ordering::Relaxed) + 1;
        let now_ms = self.instant_to_ms(Instant::now());
        let interval_ms = self.min_interval.as_millis() as u64;

        let wait_until = {
            let mut next_available = self.next_available_ms.lock().await;

            if now_ms >= *next_available {
                *next_available = now_ms + interval_ms;
                None
            } else {
                let our_slot = *next_available;
                *next_available = our_slot + interval_ms;
                self.waited_requests.fetch_add(1, Ordering::Relaxed);

                debug!(
                    "[RATE_LIMITER:{}] #{} queued for {}ms",
                    self.name,
                    request_num,
                    our_slot - now_ms
                );
                Some(self.ms_to_instant(our_slot))
            }
        };

        if let Some(target) = wait_until {
            let wait = target.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }
    }

    /// True when a request would not have to wait
    pub async fn can_acquire_immediately(&self) -> bool {
        let now_ms = self.instant_to_ms(Instant::now());
        let next_available = self.next_available_ms.lock().await;
        now_ms >= *next_available
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            waited_requests: self.waited_requests.load(Ordering::Relaxed),
            min_interval_ms: self.min_interval.as_millis() as u64,
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    pub total_requests: u64,
    pub waited_requests: u64,
    pub min_interval_ms: u64,
    pub name: String,
}

/// [`TextGenerator`] that waits on a shared [`RateLimiter`] before each call
pub struct ThrottledGenerator {
    inner: Arc<dyn TextGenerator>,
    limiter: Arc<RateLimiter>,
}

impl ThrottledGenerator {
    pub fn new(inner: Arc<dyn TextGenerator>, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

#[async_trait]
impl TextGenerator for ThrottledGenerator {
    async fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> PulseResult<String> {
        self.limiter.acquire().await;
        self.inner.generate(prompt, max_tokens, temperature).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        async fn generate(&self, prompt: &str, _max_tokens: u32, _temperature: f32) -> PulseResult<String> {
            Ok(prompt.to_string())
        }
    }

    #[tokio::test]
    async fn test_first_request_immediate() {
        let limiter = RateLimiter::new(100, "test");

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed().as_millis() < 20, "First request took {:?}", start.elapsed());
    }

    #[tokio::test]
    async fn test_second_request_waits() {
        let limiter = RateLimiter::new(100, "test");
        limiter.acquire().await;

        let start = Instant::now();
        limiter.acquire().await;
        let elapsed = start.elapsed();

        assert!(elapsed.as_millis() >= 90, "Only waited {:?}", elapsed);
        assert!(elapsed.as_millis() < 150, "Waited too long: {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_can_acquire_immediately() {
        let limiter = RateLimiter::new(100, "test");
        assert!(limiter.can_acquire_immediately().await);

        limiter.acquire().await;
        assert!(!limiter.can_acquire_immediately().await);

        tokio::time::sleep(Duration::from_millis(110)).await;
        assert!(limiter.can_acquire_immediately().await);
    }

    #[tokio::test]
    async fn test_concurrent_requests_serialized() {
        let limiter = Arc::new(RateLimiter::new(50, "concurrent_test"));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                start.elapsed()
            }));
        }

        let mut times: Vec<Duration> = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();

        for i in 1..times.len() {
            let gap = times[i] - times[i - 1];
            assert!(gap.as_millis() >= 40, "Gap {} was only {:?}", i, gap);
        }

        let stats = limiter.stats();
        assert_eq!(stats.total_requests, 5);
        assert!(stats.waited_requests >= 4);
    }

    #[tokio::test]
    async fn test_throttled_generator_spaces_calls() {
        let generator = ThrottledGenerator::new(Arc::new(Echo), RateLimiter::for_generation(80));

        let start = Instant::now();
        assert_eq!(generator.generate("one", 10, 0.0).await.unwrap(), "one");
        assert_eq!(generator.generate("two", 10, 0.0).await.unwrap(), "two");

        assert!(start.elapsed().as_millis() >= 70);
        assert_eq!(generator.limiter().stats().total_requests, 2);
    }
}
