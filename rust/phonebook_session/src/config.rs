use std::time::Duration;

/// Idle time after which a session is terminated.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Period of the background expiry sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Shortest sweep period; a zero interval would spin the sweeper.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Session lifetime settings. Fixed at startup.
///
/// Expiry is cooperative: a session idle for longer than `timeout` survives
/// until the next sweep, so the effective upper bound on idle lifetime is
/// `timeout + sweep_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SESSION_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl SessionConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Intervals below [`MIN_SWEEP_INTERVAL`] are raised to it.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval.max(MIN_SWEEP_INTERVAL);
        self
    }

    /// Period the sweeper actually runs at, also for configs built by
    /// setting the field directly.
    pub fn effective_sweep_interval(&self) -> Duration {
        self.sweep_interval.max(MIN_SWEEP_INTERVAL)
    }

    /// Worst-case idle lifetime of a session.
    pub fn max_idle(&self) -> Duration {
        self.timeout + self.sweep_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.timeout, Duration::from_secs(600));
        assert_eq!(cfg.sweep_interval, Duration::from_secs(300));
        assert_eq!(cfg.max_idle(), Duration::from_secs(900));
    }

    #[test]
    fn test_builders() {
        let cfg = SessionConfig::default()
            .with_timeout(Duration::from_secs(30))
            .with_sweep_interval(Duration::from_secs(5));
        assert_eq!(cfg.max_idle(), Duration::from_secs(35));
    }

    #[test]
    fn test_zero_sweep_interval_is_raised() {
        let cfg = SessionConfig::default().with_sweep_interval(Duration::ZERO);
        assert_eq!(cfg.sweep_interval, MIN_SWEEP_INTERVAL);

        let raw = SessionConfig {
            timeout: Duration::from_secs(30),
            sweep_interval: Duration::ZERO,
        };
        assert_eq!(raw.effective_sweep_interval(), MIN_SWEEP_INTERVAL);
    }
}
