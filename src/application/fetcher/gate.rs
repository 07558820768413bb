use crate::domain::errors::FetchError;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;

/// Admission control shared by every provider call a fetcher makes.
///
/// All base resolutions of a cycle go through the same gate, so the in-flight
/// bound and the pause between paced requests hold across them, not just
/// within one resolution.
pub struct RequestGate {
    permits: Semaphore,
    capacity: usize,
    pause: Duration,
    // earliest instant the next paced request may start
    next_slot: Mutex<Option<Instant>>,
}

impl RequestGate {
    pub fn new(capacity: usize, pause: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Semaphore::new(capacity),
            capacity,
            pause,
            next_slot: Mutex::new(None),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Waits for a free slot. Paced requests additionally start at least
    /// `pause` after the previous paced request started.
    pub async fn admit(&self, paced: bool) -> Result<SemaphorePermit<'_>, FetchError> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FetchError::Transport {
                reason: format!("request gate closed: {}", e),
            })?;
        if paced {
            self.wait_turn().await;
        }
        Ok(permit)
    }

    async fn wait_turn(&self) {
        if self.pause.is_zero() {
            return;
        }
        let start_at = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let when = next.filter(|at| *at > now).unwrap_or(now);
            *next = Some(when + self.pause);
            when
        };
        tokio::time::sleep_until(start_at).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_capacity_bounds_permits() {
        let gate = RequestGate::new(2, Duration::ZERO);
        let a = gate.admit(false).await.unwrap();
        let _b = gate.admit(false).await.unwrap();
        assert_eq!(gate.permits.available_permits(), 0);
        drop(a);
        assert_eq!(gate.permits.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised_to_one() {
        assert_eq!(RequestGate::new(0, Duration::ZERO).capacity(), 1);
    }

    #[tokio::test]
    async fn test_paced_requests_are_spaced() {
        let gate = Arc::new(RequestGate::new(4, Duration::from_millis(40)));
        let started = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                let _permit = gate.admit(true).await.unwrap();
                Instant::now()
            }));
        }
        let mut starts = Vec::new();
        for h in handles {
            starts.push(h.await.unwrap() - started);
        }
        starts.sort();

        assert!(starts[0] < Duration::from_millis(40));
        assert!(starts[1] >= Duration::from_millis(40));
        assert!(starts[2] >= Duration::from_millis(80));
    }
}
