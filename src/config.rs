//! # Runner configuration.
//!
//! [`Config`] holds the settings of a [`Runner`](crate::Runner). Per-test settings
//! (timeout, concurrency, flags) live on [`TestOptions`](crate::TestOptions).
//!
//! # Example
//! ```
//! use tom_runner::Config;
//!
//! let mut cfg = Config::default();
//! cfg.debug = true;
//!
//! assert!(cfg.debug);
//! ```

/// Configuration of a run.
///
/// All fields are public; [`Config::default`] documents the defaults.
#[derive(Clone, Debug)]
pub struct Config {
    /// Log failing tests at `error` level as they fail (otherwise `debug`).
    pub debug: bool,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `debug = false`
    fn default() -> Self {
        Self { debug: false }
    }
}
