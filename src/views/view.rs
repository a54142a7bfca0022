//! # Core view trait
//!
//! `View` is the extension point for reporting a run. The [`Runner`](crate::Runner)
//! calls `init` once before the run starts, then one hook per runner event.
//!
//! ## Contract
//! - `init` may fail; the run then does not start ([`RunnerError::View`](crate::RunnerError)).
//! - Every other hook is called synchronously from the event path, in event order,
//!   and defaults to a no-op. Hooks should be quick (buffer, print, count).
//!
//! ## Example (skeleton)
//! ```rust
//! use tom_runner::{Stats, TestError, TestNode, View};
//!
//! struct Dots;
//!
//! #[async_trait::async_trait]
//! impl View for Dots {
//!     fn test_pass(&self, _node: &TestNode) {
//!         print!(".");
//!     }
//!     fn test_fail(&self, _node: &TestNode, _error: &TestError) {
//!         print!("F");
//!     }
//!     fn end(&self, stats: &Stats) {
//!         println!("\n{} passed", stats.pass);
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::core::Stats;
use crate::error::{TestError, ViewError};
use crate::node::TestNode;

/// Contract for run reporters.
#[async_trait]
pub trait View: Send + Sync + 'static {
    /// Prepares the view (open files, detect terminal, ...).
    async fn init(&self) -> Result<(), ViewError> {
        Ok(())
    }

    /// The run started with `count` tests loaded.
    fn start(&self, _count: usize) {}

    fn test_start(&self, _node: &TestNode) {}

    fn test_pass(&self, _node: &TestNode) {}

    fn test_fail(&self, _node: &TestNode, _error: &TestError) {}

    fn test_skip(&self, _node: &TestNode) {}

    fn test_ignore(&self, _node: &TestNode) {}

    fn test_todo(&self, _node: &TestNode) {}

    /// The run finished.
    fn end(&self, _stats: &Stats) {}

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
