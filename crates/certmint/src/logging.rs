//! Logging setup.

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber at `level`.
///
/// `RUST_LOG` directives, when set, refine the level. Returns `false` if a
/// global subscriber was already installed; calling this twice is harmless.
pub fn init(level: Level) -> bool {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init(Level::DEBUG);
        assert!(!init(Level::INFO));
    }
}
