#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;
use std::path::Path;
use std::thread;

use tally_core::{metric_set, Counter, Product, RunningAverage};
use tally_logger::config::LoggerSection;
use tally_logger::{Logger, Registry};

metric_set! {
    enum Metrics {
        Requests(Counter),
        Scale(Product),
        Latency(RunningAverage),
    }
}

metric_set! {
    enum OnlyCounter {
        Requests(Counter),
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Drop the timestamp prefix, keeping the `"name" value` pairs.
fn body(line: &str) -> &str {
    let (ts, rest) = line.split_once(" UTC ").expect("timestamp prefix");
    assert_eq!(ts.len(), "2024-01-01 00:00:00.000000".len(), "line={line}");
    rest
}

fn counter_total(lines: &[String]) -> i64 {
    lines
        .iter()
        .filter_map(|l| body(l).strip_prefix("\"counter\" "))
        .map(|v| v.split(' ').next().unwrap().parse::<i64>().unwrap())
        .sum()
}

#[test]
fn concurrent_counter_updates_drain_to_total() {
    let registry = Registry::<OnlyCounter>::new().unwrap();
    thread::scope(|s| {
        for _ in 0..3 {
            s.spawn(|| registry.log(Counter::new(3)));
        }
    });

    let batch = registry.drain();
    assert_eq!(batch.entries(), vec![("counter", "9".to_string())]);
    assert!(registry.drain().is_empty());
}

#[test]
fn concurrent_counter_updates_reach_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.log");

    let logger = Logger::<OnlyCounter>::open(&path).unwrap();
    thread::scope(|s| {
        for _ in 0..3 {
            s.spawn(|| assert!(logger.log(Counter::new(3))));
        }
    });
    drop(logger);

    assert_eq!(counter_total(&read_lines(&path)), 9);
}

#[test]
fn shutdown_without_updates_appends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.log");
    fs::write(&path, "previous run\n").unwrap();

    let report = Logger::<Metrics>::open(&path).unwrap().close().unwrap();

    assert_eq!(report.batches_written, 0);
    assert_eq!(read_lines(&path), vec!["previous run".to_string()]);
}

#[test]
fn immediate_shutdown_flushes_in_slot_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.log");

    // Linger keeps the writer from draining before shutdown is raised.
    let mut section = LoggerSection::new(path.to_string_lossy());
    section.linger_ms = 60_000;
    let logger = Logger::<Metrics>::with_config(&section).unwrap();
    logger.log(Counter::new(5));
    logger.log(Product::new(2.0));
    let report = logger.close().unwrap();

    assert_eq!(report.batches_written, 1);
    let lines = read_lines(&path);
    assert_eq!(lines.len(), 1);
    assert_eq!(body(&lines[0]), "\"counter\" 5 \"product\" 2.000000");
}

#[test]
fn sequential_cycles_do_not_carry_over() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.log");

    let logger = Logger::<Metrics>::open(&path).unwrap();
    logger.log(Counter::new(4));
    wait_for_lines(&path, 1);
    logger.log(RunningAverage::new(9, 3));
    wait_for_lines(&path, 2);
    logger.close().unwrap();

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);
    assert_eq!(body(&lines[0]), "\"counter\" 4");
    assert_eq!(body(&lines[1]), "\"average\" 3.000000");
}

#[test]
fn reopening_appends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.log");

    for n in [1, 2] {
        let logger = Logger::<Metrics>::open(&path).unwrap();
        logger.log(Counter::new(n));
    }

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);
    assert_eq!(counter_total(&lines), 3);
}

#[test]
fn open_failure_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("metrics.log");

    let err = Logger::<Metrics>::open(&path).err().expect("must fail");
    assert_eq!(err.kind().as_str(), "IO");
}

#[test]
fn many_producers_all_kinds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.log");

    let logger = Logger::<Metrics>::open(&path).unwrap();
    thread::scope(|s| {
        for i in 0..20 {
            let logger = &logger;
            s.spawn(move || logger.log(Counter::new(3)));
            s.spawn(move || logger.log(Product::new(1.0)));
            s.spawn(move || logger.log(RunningAverage::new(i, i + 3)));
        }
    });
    logger.close().unwrap();

    let lines = read_lines(&path);
    assert!(!lines.is_empty());
    assert_eq!(counter_total(&lines), 60);
    for line in &lines {
        let b = body(line);
        let positions: Vec<usize> = ["\"counter\"", "\"product\"", "\"average\""]
            .iter()
            .filter_map(|n| b.find(n))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "line={line}");
    }
}

fn wait_for_lines(path: &Path, n: usize) {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while read_lines(path).len() < n {
        assert!(std::time::Instant::now() < deadline, "timed out waiting for {n} lines");
        thread::sleep(std::time::Duration::from_millis(2));
    }
}
