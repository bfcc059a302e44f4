//! Process-wide `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Install a fmt subscriber filtered by `RUST_LOG` (falling back to
/// [`DEFAULT_DIRECTIVE`]).
///
/// Safe to call more than once: returns `false` if a global subscriber was
/// already installed, by this function or anyone else.
pub fn init() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        let _ = init();
        assert!(!init());
    }
}
