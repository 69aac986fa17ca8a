//! Setup for the application tracing.
//!
//! It redirects the tracing info to the standard output with the requested
//! maximum level:
//!
//! - `off` (i.e. don't load any subscriber...)
//! - `error`
//! - `warn`
//! - `info`
//! - `debug`
//! - `trace`
use std::sync::Once;

use tracing::info;

static INIT: Once = Once::new();

/// It redirects the tracing info to the standard output with the given
/// maximum level.
pub fn setup(threshold: &str) {
    let level = level_or_default(threshold);

    if level.is_none() {
        return;
    }

    INIT.call_once(|| {
        stdout_config(level);
    });
}

fn level_or_default(threshold: &str) -> Option<tracing::Level> {
    if threshold == "off" {
        return None;
    };

    if let Ok(level) = threshold.parse() {
        return Some(level);
    }

    // Otherwise We Use Default
    level_or_default("info")
}

fn stdout_config(level: Option<tracing::Level>) {
    let () = tracing_subscriber::fmt().pretty().with_max_level(level).init();

    info!("tracing initialized.");
}

#[cfg(test)]
mod tests {
    use super::level_or_default;

    #[test]
    fn it_should_disable_tracing_when_the_threshold_is_off() {
        assert_eq!(level_or_default("off"), None);
    }

    #[test]
    fn it_should_fall_back_to_info_for_an_unknown_threshold() {
        assert_eq!(level_or_default("noisy"), Some(tracing::Level::INFO));
    }

    #[test]
    fn it_should_parse_a_valid_threshold() {
        assert_eq!(level_or_default("debug"), Some(tracing::Level::DEBUG));
    }
}
