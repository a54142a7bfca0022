//! # Example: suite
//!
//! Builds a small suite and runs it with the built-in console view.
//!
//! Shows how to:
//! - Build groups, hooks, skipped and todo tests with the builder API.
//! - Attach diagnostic data through [`TestContext`].
//! - Turn the final [`RunnerState`] into the process exit code.
//!
//! ## Run
//! ```bash
//! cargo run --example suite
//! RUST_LOG=tom_runner=debug cargo run --example suite
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tom_runner::{
    Composite, Config, ConsoleView, ConsoleViewConfig, Runner, RunnerState, TestContext,
    TestError, TestFn, TestNode, TestOptions,
};
use tracing_subscriber::EnvFilter;

fn build() -> anyhow::Result<Arc<TestNode>> {
    let suite = TestNode::new("suite");

    suite.before(
        "connect",
        TestFn::future(|_| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, TestError>("connected")
        }),
    )?;

    let math = suite.group_with("math", TestOptions::default().with_max_concurrency(2))?;
    math.test("adds", TestFn::sync(|_| Ok(1 + 1)))?;
    math.test(
        "divides",
        TestFn::sync(|_| -> Result<i32, TestError> {
            let divisor = 0;
            10i32
                .checked_div(divisor)
                .ok_or_else(|| TestError::from("division by zero"))
        }),
    )?;
    math.skip("rounds", TestFn::sync(|_| Ok(())))?;
    math.todo("averages")?;

    let http = suite.group("http")?;
    http.test(
        "fetches",
        TestFn::future(|ctx: TestContext| async move {
            tokio::time::sleep(Duration::from_millis(15)).await;
            ctx.set_data(json!({ "status": 200, "bytes": 512 }));
            Ok::<_, TestError>(())
        }),
    )?;
    http.test_with(
        "hangs",
        Some(TestFn::future(|_| {
            futures::future::pending::<Result<(), TestError>>()
        })),
        TestOptions::default().with_timeout(Duration::from_millis(100)),
    )?;

    suite.after("disconnect", TestFn::sync(|_| Ok(())))?;
    Ok(suite)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let suite = build()?;
    print!("{}", suite.tree());

    let runner = Runner::new(suite, Config { debug: true })?
        .with_view(Arc::new(ConsoleView::new(ConsoleViewConfig::default())));
    let state: RunnerState = runner.start().await?;
    Ok(state.into())
}
