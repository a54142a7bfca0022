//! # Example: custom_view
//!
//! Demonstrates how to build a custom [`View`] and listen to runner events.
//!
//! Shows how to:
//! - Implement the [`View`] trait (dot reporter).
//! - Listen to [`RunnerEventKind`] events alongside the view.
//! - Listen to node events on a group; events of its tests bubble up to it.
//!
//! ## Run
//! ```bash
//! cargo run --example custom_view
//! ```

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tom_runner::{
    Config, NodeEventKind, Runner, RunnerEventKind, Stats, TestError, TestFn, TestNode, View,
};

/// Prints one character per settled test.
#[derive(Default)]
struct Dots {
    failures: AtomicUsize,
}

impl Dots {
    fn dot(&self, c: char) {
        print!("{c}");
        let _ = std::io::stdout().flush();
    }
}

#[async_trait::async_trait]
impl View for Dots {
    fn test_pass(&self, _node: &TestNode) {
        self.dot('.');
    }

    fn test_fail(&self, _node: &TestNode, _error: &TestError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.dot('F');
    }

    fn test_skip(&self, _node: &TestNode) {
        self.dot('s');
    }

    fn test_todo(&self, _node: &TestNode) {
        self.dot('t');
    }

    fn end(&self, stats: &Stats) {
        println!(
            "\n{} tests, {} failures ({:?})",
            stats.total,
            self.failures.load(Ordering::Relaxed),
            stats.time_elapsed()
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let suite = TestNode::new("numbers");
    let evens = suite.group("evens")?;
    for n in 0..10u64 {
        evens.test(
            format!("{n} is even"),
            TestFn::future(move |_| async move {
                tokio::time::sleep(Duration::from_millis(n * 3)).await;
                if n % 2 == 0 {
                    Ok(n)
                } else {
                    Err(TestError::failed(format!("{n} is odd")))
                }
            }),
        )?;
    }
    suite.todo("primes")?;

    evens.on(NodeEventKind::Fail, |ev| {
        if let Some(err) = &ev.error {
            println!("\n[evens] {} failed: {err}", ev.target.name());
        }
    });

    let runner = Runner::new(suite, Config::default())?.with_view(Arc::new(Dots::default()));
    runner.on(RunnerEventKind::Fail, |_| println!("[first failure]"));

    let state = runner.start().await?;
    println!("final state: {state}");
    Ok(())
}
