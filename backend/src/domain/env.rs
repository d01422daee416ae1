//! Environment access for configuration structs.

/// Environment abstraction for configuration lookups.
///
/// Lets tests supply values without mutating the process environment.
pub trait ConfigEnv {
    /// Fetch a string value by name.
    fn string(&self, name: &str) -> Option<String>;
}

/// Environment access backed by the real process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultConfigEnv;

impl DefaultConfigEnv {
    /// Create a new environment reader.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ConfigEnv for DefaultConfigEnv {
    fn string(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Parse a trimmed integer variable, falling back to `default` when unset
/// or malformed.
pub(crate) fn parse_or<T: std::str::FromStr>(env: &impl ConfigEnv, name: &str, default: T) -> T {
    env.string(name)
        .and_then(|raw| raw.trim().parse::<T>().ok())
        .unwrap_or(default)
}
