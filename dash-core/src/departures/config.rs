//! Departure query configuration.

/// Configuration parameters for departure queries.
#[derive(Debug, Clone)]
pub struct DepartureConfig {
    /// Number of departures returned per dashboard (and requested per leg).
    pub count: usize,
}

impl DepartureConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

impl Default for DepartureConfig {
    fn default() -> Self {
        Self { count: 10 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_count() {
        assert_eq!(DepartureConfig::default().count, 10);
        assert_eq!(DepartureConfig::new(3).count, 3);
    }
}
