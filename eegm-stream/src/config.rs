use tokio::time::Duration;

use crate::DEFAULT_RECONNECT_DELAY;

/// Delay applied after a disconnect before the next connect attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Same delay after every failure, retrying forever. Suits a local
    /// bridge that comes back quickly
    Fixed(Duration),
    /// Doubling delay per consecutive failure, capped at `max`. The count
    /// resets once a connection is established
    Exponential { initial: Duration, max: Duration },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Fixed(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy {
    /// `failures` is the number of consecutive failed connections,
    /// including the one just observed
    pub fn delay(&self, failures: u32) -> Duration {
        match *self {
            ReconnectPolicy::Fixed(delay) => delay,
            ReconnectPolicy::Exponential { initial, max } => {
                let factor = 1u32
                    .checked_shl(failures.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                initial.saturating_mul(factor).min(max)
            }
        }
    }
}

/// Runtime settings for a [`StreamManager`](crate::StreamManager). The
/// endpoint lives with the [`Connector`](crate::Connector)
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    pub reconnect: ReconnectPolicy,
    /// Treat a connection that goes quiet for this long as failed.
    /// `None` relies on the transport to report errors
    pub read_timeout: Option<Duration>,
}

impl StreamConfig {
    pub fn with_reconnect_policy(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_reconnect_delay(self, delay: Duration) -> Self {
        self.with_reconnect_policy(ReconnectPolicy::Fixed(delay))
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_fixed_five_seconds() {
        let config = StreamConfig::default();
        assert_eq!(
            config.reconnect,
            ReconnectPolicy::Fixed(Duration::from_secs(5))
        );
        assert_eq!(config.reconnect.delay(1), Duration::from_secs(5));
        assert_eq!(config.reconnect.delay(500), Duration::from_secs(5));
        assert!(config.read_timeout.is_none());
    }

    #[test]
    fn exponential_doubles_then_caps() {
        let policy = ReconnectPolicy::Exponential {
            initial: Duration::from_millis(250),
            max: Duration::from_secs(4),
        };
        assert_eq!(policy.delay(0), Duration::from_millis(250));
        assert_eq!(policy.delay(1), Duration::from_millis(250));
        assert_eq!(policy.delay(2), Duration::from_millis(500));
        assert_eq!(policy.delay(4), Duration::from_secs(2));
        assert_eq!(policy.delay(5), Duration::from_secs(4));
        assert_eq!(policy.delay(40), Duration::from_secs(4));
    }

    #[test]
    fn builder_setters() {
        let config = StreamConfig::default()
            .with_reconnect_delay(Duration::from_millis(10))
            .with_read_timeout(Duration::from_secs(3));
        assert_eq!(
            config.reconnect,
            ReconnectPolicy::Fixed(Duration::from_millis(10))
        );
        assert_eq!(config.read_timeout, Some(Duration::from_secs(3)));
    }
}
