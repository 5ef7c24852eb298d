//! Runtime knobs for a switch instance

use std::time::Duration;

use l2switch_protocols::stp::constants::DEFAULT_HELLO_INTERVAL_MS;

/// Shortest hello period the scheduler will run at
pub const MIN_HELLO_INTERVAL: Duration = Duration::from_millis(1);

/// Engine configuration
///
/// Everything here is optional at the command line; the defaults reproduce a
/// plain learning switch that sends a hello every second and never forgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Period between BPDU originations
    pub hello_interval: Duration,
    /// Forget learned stations after this long
    pub mac_aging: Option<Duration>,
    /// Reclaim root after this many silent hello intervals
    pub max_age: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hello_interval: Duration::from_millis(DEFAULT_HELLO_INTERVAL_MS),
            mac_aging: None,
            max_age: None,
        }
    }
}

impl EngineConfig {
    /// Raised to [`MIN_HELLO_INTERVAL`] if shorter
    pub fn with_hello_interval(mut self, interval: Duration) -> Self {
        self.hello_interval = interval.max(MIN_HELLO_INTERVAL);
        self
    }

    /// A zero aging time leaves aging off
    pub fn with_mac_aging(mut self, aging: Duration) -> Self {
        self.mac_aging = (!aging.is_zero()).then_some(aging);
        self
    }

    pub fn with_max_age(mut self, hellos: u32) -> Self {
        self.max_age = Some(hellos);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.hello_interval, Duration::from_secs(1));
        assert_eq!(config.mac_aging, None);
        assert_eq!(config.max_age, None);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_hello_interval(Duration::from_millis(250))
            .with_mac_aging(Duration::from_secs(300))
            .with_max_age(3);

        assert_eq!(config.hello_interval, Duration::from_millis(250));
        assert_eq!(config.mac_aging, Some(Duration::from_secs(300)));
        assert_eq!(config.max_age, Some(3));
    }

    #[test]
    fn test_zero_hello_interval_clamped() {
        let config = EngineConfig::default().with_hello_interval(Duration::ZERO);
        assert_eq!(config.hello_interval, MIN_HELLO_INTERVAL);
    }

    #[test]
    fn test_zero_mac_aging_disables_aging() {
        let config = EngineConfig::default()
            .with_mac_aging(Duration::from_secs(30))
            .with_mac_aging(Duration::ZERO);
        assert_eq!(config.mac_aging, None);
    }
}
