#![cfg(feature = "console")]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tom_runner::{
    Config, ConsoleView, ConsoleViewConfig, Runner, TestError, TestFn, TestNode, TestOptions,
};

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

#[tokio::test]
async fn console_report_of_a_run() {
    let root = TestNode::new("tom");
    let math = root
        .group_with("math", TestOptions::default().with_max_concurrency(1))
        .unwrap();
    math.test("adds", TestFn::sync(|_| Ok(2))).unwrap();
    math.test(
        "divides",
        TestFn::future(|_| async { Err::<(), _>(TestError::from("division by zero")) }),
    )
    .unwrap();
    math.skip("rounds", TestFn::sync(|_| Ok(()))).unwrap();

    let buf = Buf::default();
    let view = ConsoleView::with_writer(
        buf.clone(),
        ConsoleViewConfig {
            show_starts: true,
            ..ConsoleViewConfig::default()
        },
    );
    let runner = Runner::new(root, Config::default())
        .unwrap()
        .with_view(Arc::new(view));
    runner.start().await.unwrap();

    let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();

    assert_eq!(lines[0], "Start: 3 tests loaded");
    assert_eq!(lines[1], "∙ tom | math adds");
    assert!(lines[2].starts_with("✓ tom | math adds [2] "));
    assert!(lines[2].ends_with("ms"));
    assert_eq!(lines[3], "∙ tom | math divides");
    assert_eq!(lines[4], "⨯ tom | math divides");
    assert_eq!(lines[5], "   error: division by zero (test_failed)");
    assert_eq!(lines[6], "- tom | math rounds");
    assert!(lines[7].starts_with("Completed in "));
    assert!(lines[7].ends_with("Pass: 1, fail: 1, skip: 1."));
}
