//! Per-connection input rate limiting

use std::num::NonZeroU32;

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};

/// Max control messages per second per connection. A client sending
/// input every render frame stays under this.
pub const INPUT_MESSAGES_PER_SECOND: u32 = 60;

/// Short bursts are tolerated so a hiccuping client does not lose input.
const INPUT_BURST: u32 = 10;

/// Throttles one connection's control messages. Owned by the reader
/// loop, one per socket.
pub struct InputLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl InputLimiter {
    pub fn new() -> Self {
        let per_second =
            NonZeroU32::new(INPUT_MESSAGES_PER_SECOND).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(INPUT_BURST).unwrap_or(NonZeroU32::MIN);

        Self {
            limiter: RateLimiter::direct(Quota::per_second(per_second).allow_burst(burst)),
        }
    }

    /// Whether one more input message may pass.
    pub fn allow(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for InputLimiter {
    fn default() -> Self {
        Self::new()
    }
}
