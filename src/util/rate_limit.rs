//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Inbound frame limiter for one WebSocket session
#[derive(Clone)]
pub struct SessionRateLimiter {
    frame_limiter: Arc<Limiter>,
}

impl SessionRateLimiter {
    pub fn new(frames_per_second: u32) -> Self {
        Self {
            frame_limiter: create_limiter(frames_per_second),
        }
    }

    /// Check if an inbound frame is allowed (returns true if allowed)
    pub fn check_frame(&self) -> bool {
        self.frame_limiter.check().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_burst_up_to_quota_then_rejects() {
        let limiter = SessionRateLimiter::new(3);
        assert!(limiter.check_frame());
        assert!(limiter.check_frame());
        assert!(limiter.check_frame());
        assert!(!limiter.check_frame());
    }

    #[test]
    fn zero_quota_still_admits_one_frame() {
        let limiter = SessionRateLimiter::new(0);
        assert!(limiter.check_frame());
    }
}
