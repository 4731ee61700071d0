use crate::time::Duration;

/// Behavioral variant of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Publishes telemetry periodically and acknowledges commands
    Sensor,
    /// Watches telemetry and commands the sensor when a limit is exceeded
    Monitor,
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Role::Sensor => f.write_str("sensor"),
            Role::Monitor => f.write_str("monitor"),
        }
    }
}

/// Node configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct Config {
    pub role: Role,
    /// Period of Rpm/Temperature/Heartbeat publication (sensor role)
    pub telemetry_period: Duration,
    /// Period of the Status keepalive (both roles)
    pub status_period: Duration,
    /// Window for a command acknowledgment (monitor role)
    pub ack_timeout: Duration,
    /// A reading strictly above the limit is a violation
    pub rpm_limit: u16,
    /// A reading strictly above the limit is a violation
    pub temperature_limit: i16,
}

impl Config {
    pub const fn new(role: Role) -> Self {
        Self {
            role,
            telemetry_period: Duration::from_millis(100),
            status_period: Duration::from_millis(2000),
            ack_timeout: Duration::from_millis(200),
            rpm_limit: 5000,
            temperature_limit: 80,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Role::Sensor)
    }
}
