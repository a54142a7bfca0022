//! # Plain-text console view.
//!
//! [`ConsoleView`] writes one line per settled test to stdout (or any [`Write`]).
//!
//! ## Output format
//! ```text
//! Start: 3 tests loaded
//!
//! ✓ tom | math adds [2] 0.1ms
//! ⨯ tom | math divides
//!
//!    division by zero
//!
//! - tom | math rounds
//!
//! Completed in 12ms. Pass: 1, fail: 1, skip: 1.
//! ```
//!
//! Parents are listed root first, joined with `" | "`. A `null` result is omitted.
//! Context data attached by a test is printed below it as indented JSON.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::core::Stats;
use crate::error::{TestError, ViewError};
use crate::node::TestNode;
use crate::tree::Composite;
use crate::views::View;

const INDENT: &str = "   ";

/// Options of the console view.
#[derive(Clone, Debug, Default)]
pub struct ConsoleViewConfig {
    /// Do not print skipped and todo tests.
    pub hide_skips: bool,
    /// Under a failed test, print the error message only (no label).
    pub hide_error_detail: bool,
    /// Print a line when each test starts.
    pub show_starts: bool,
}

/// Console reporter.
pub struct ConsoleView<W: Write + Send + 'static = io::Stdout> {
    config: ConsoleViewConfig,
    out: Mutex<W>,
}

impl ConsoleView<io::Stdout> {
    /// Writes to stdout.
    pub fn new(config: ConsoleViewConfig) -> Self {
        Self::with_writer(io::stdout(), config)
    }
}

impl<W: Write + Send + 'static> ConsoleView<W> {
    pub fn with_writer(out: W, config: ConsoleViewConfig) -> Self {
        Self {
            config,
            out: Mutex::new(out),
        }
    }

    fn log(&self, line: &str) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{line}") {
            debug!(error = %e, "console view write failed");
        }
    }

    fn context_data(&self, node: &TestNode) {
        let Some(data) = node.context().and_then(|ctx| ctx.data()) else {
            return;
        };
        let rendered = serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string());
        self.log(&format!("\n{}\n", indent(&rendered)));
    }

    fn error_message(&self, error: &TestError) -> String {
        if self.config.hide_error_detail {
            error.to_string()
        } else {
            format!("{} ({})", error.as_message(), error.as_label())
        }
    }
}

#[async_trait]
impl<W: Write + Send + 'static> View for ConsoleView<W> {
    async fn init(&self) -> Result<(), ViewError> {
        Ok(())
    }

    fn start(&self, count: usize) {
        self.log(&format!("\nStart: {count} tests loaded\n"));
    }

    fn test_start(&self, node: &TestNode) {
        if self.config.show_starts {
            self.log(&format!("∙ {}{}", parents(node), node.name()));
        }
    }

    fn test_pass(&self, node: &TestNode) {
        let result = match node.result() {
            Some(Ok(Value::Null)) | None | Some(Err(_)) => String::new(),
            Some(Ok(Value::String(s))) => format!(" [{s}]"),
            Some(Ok(value)) => format!(" [{value}]"),
        };
        let duration = node.stats().duration.as_secs_f64() * 1000.0;
        self.log(&format!(
            "✓ {}{}{result} {duration:.1}ms",
            parents(node),
            node.name()
        ));
        self.context_data(node);
    }

    fn test_fail(&self, node: &TestNode, error: &TestError) {
        self.log(&format!("⨯ {}{}", parents(node), node.name()));
        self.log(&format!("\n{}\n", indent(&self.error_message(error))));
        self.context_data(node);
    }

    fn test_skip(&self, node: &TestNode) {
        if !self.config.hide_skips {
            self.log(&format!("- {}{}", parents(node), node.name()));
        }
    }

    fn test_todo(&self, node: &TestNode) {
        if !self.config.hide_skips {
            self.log(&format!("- {}{}", parents(node), node.name()));
        }
    }

    fn end(&self, stats: &Stats) {
        self.log(&format!(
            "\nCompleted in {}ms. Pass: {}, fail: {}, skip: {}.\n",
            stats.time_elapsed().as_millis(),
            stats.pass,
            stats.fail,
            stats.skip
        ));
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// `"root | group "` for attached nodes, `""` for a root.
fn parents(node: &TestNode) -> String {
    let names: Vec<String> = node
        .parents()
        .iter()
        .rev()
        .map(|p| p.name().to_string())
        .collect();
    if names.is_empty() {
        String::new()
    } else {
        format!("{} ", names.join(" | "))
    }
}

fn indent(text: &str) -> String {
    text.trim_end()
        .lines()
        .map(|line| format!("{INDENT}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{TestFn, TestOptions};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Buf(Arc<Mutex<Vec<u8>>>);

    impl Write for Buf {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn parents_are_listed_root_first() {
        let root = TestNode::new("tom");
        let group = root.group("math").unwrap();
        let leaf = group.test("adds", TestFn::sync(|_| Ok(2))).unwrap();
        assert_eq!(parents(&leaf), "tom | math ");
        assert_eq!(parents(&root), "");
    }

    #[tokio::test]
    async fn pass_fail_and_skip_lines() {
        let buf = Buf::default();
        let view = ConsoleView::with_writer(buf.clone(), ConsoleViewConfig::default());

        let root = TestNode::new("tom");
        let adds = root.test("adds", TestFn::sync(|_| Ok(2))).unwrap();
        let divides = root
            .test("divides", TestFn::sync(|_| Err::<(), _>(TestError::from("division by zero"))))
            .unwrap();
        let rounds = root.skip("rounds", TestFn::sync(|_| Ok(()))).unwrap();
        adds.run().await.unwrap();
        let err = divides.run().await.unwrap_err();
        rounds.run().await.unwrap();

        view.start(3);
        view.test_pass(&adds);
        view.test_fail(&divides, &err);
        view.test_skip(&rounds);

        let text = buf.text();
        assert!(text.contains("Start: 3 tests loaded"));
        assert!(text.contains("✓ tom adds [2] "));
        assert!(text.contains("⨯ tom divides\n"));
        assert!(text.contains("   error: division by zero (test_failed)"));
        assert!(text.contains("- tom rounds\n"));
    }

    #[tokio::test]
    async fn hidden_skips_and_plain_errors() {
        let buf = Buf::default();
        let config = ConsoleViewConfig {
            hide_skips: true,
            hide_error_detail: true,
            show_starts: false,
        };
        let view = ConsoleView::with_writer(buf.clone(), config);

        let root = TestNode::new("tom");
        let todo = root.todo("later").unwrap();
        let broken = root
            .test_with(
                "broken",
                Some(TestFn::sync(|_| Err::<(), _>(TestError::from("nope")))),
                TestOptions::default(),
            )
            .unwrap();
        let err = broken.run().await.unwrap_err();
        view.test_start(&broken);
        view.test_todo(&todo);
        view.test_fail(&broken, &err);

        let text = buf.text();
        assert!(!text.contains("later"));
        assert!(!text.contains("∙"));
        assert!(text.contains("\n   nope\n"));
    }

    #[tokio::test]
    async fn context_data_is_indented_json() {
        let buf = Buf::default();
        let view = ConsoleView::with_writer(buf.clone(), ConsoleViewConfig::default());
        let node = TestNode::detached(
            "fetch",
            Some(TestFn::sync(|ctx| {
                ctx.set_data(serde_json::json!({ "status": 200 }));
                Ok(())
            })),
            TestOptions::default(),
        );
        node.run().await.unwrap();
        view.test_pass(&node);

        let text = buf.text();
        assert!(text.starts_with("✓ fetch "));
        assert!(text.contains("\n   {\n     \"status\": 200\n   }\n"));
    }

    #[test]
    fn end_summary() {
        let buf = Buf::default();
        let view = ConsoleView::with_writer(buf.clone(), ConsoleViewConfig::default());
        let t0 = std::time::SystemTime::UNIX_EPOCH;
        let stats = Stats {
            pass: 2,
            fail: 1,
            skip: 3,
            start: Some(t0),
            end: Some(t0 + std::time::Duration::from_millis(12)),
            ..Stats::default()
        };
        view.end(&stats);
        assert_eq!(buf.text(), "\nCompleted in 12ms. Pass: 2, fail: 1, skip: 3.\n\n");
    }
}
