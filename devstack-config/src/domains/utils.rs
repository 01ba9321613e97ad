//! Small helpers shared by the configuration domains

use std::time::Duration;

/// Serde default for flags that are on unless switched off
pub fn default_true() -> bool {
    true
}

/// Parse a whole number of seconds from an environment value
pub(crate) fn parse_seconds(value: &str) -> Result<Duration, std::num::ParseIntError> {
    value.trim().parse::<u64>().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds(" 45 ").unwrap(), Duration::from_secs(45));
        assert!(parse_seconds("45s").is_err());
        assert!(parse_seconds("-1").is_err());
    }
}
