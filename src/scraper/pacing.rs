use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

use crate::config::{secs, DelayRange};

/// Timing between browser actions and between counties.
///
/// Randomized pauses only make the traffic look less automated; nothing
/// depends on their length, so tests swap in a pacer that never sleeps.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Pause for a duration drawn from `range`
    async fn pause(&self, range: &DelayRange);

    /// Fixed wait for client-side rendering to settle
    async fn settle(&self, duration: Duration);
}

/// Sleeps for uniformly drawn durations
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPacer;

impl RandomPacer {
    pub fn new() -> Self {
        Self
    }

    /// Draw a delay from the inclusive range
    pub fn sample(range: &DelayRange) -> Duration {
        if range.max_secs <= range.min_secs {
            return secs(range.min_secs);
        }
        let mut rng = rand::thread_rng();
        secs(rng.gen_range(range.min_secs..=range.max_secs))
    }
}

#[async_trait]
impl Pacer for RandomPacer {
    async fn pause(&self, range: &DelayRange) {
        let delay = Self::sample(range);
        debug!("Pacing: waiting {}ms", delay.as_millis());
        tokio::time::sleep(delay).await;
    }

    async fn settle(&self, duration: Duration) {
        debug!("Settling: waiting {}ms", duration.as_millis());
        tokio::time::sleep(duration).await;
    }
}
