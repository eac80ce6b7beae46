//! tally demo driver.
//!
//! Spawns rounds of producer threads against one logger and lets it go out
//! of scope, which flushes the last batch.
//! - Reads `tally.yaml` when present, otherwise appends to `tally.log`

use std::path::Path;
use std::thread;

use tally_core::{metric_set, Counter, Product, RunningAverage};
use tracing_subscriber::{fmt, EnvFilter};

use tally_logger::{config, Logger};

const CONFIG_PATH: &str = "tally.yaml";
const ROUNDS: i64 = 20;

metric_set! {
    enum DemoMetrics {
        Requests(Counter),
        Scale(Product),
        ResponseTime(RunningAverage),
    }
}

fn main() -> tally_core::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let section = if Path::new(CONFIG_PATH).exists() {
        config::load_from_file(CONFIG_PATH)?.logger
    } else {
        config::LoggerSection::new("tally.log")
    };

    tracing::info!(path = %section.path, "tally demo starting");
    let logger = Logger::<DemoMetrics>::with_config(&section)?;

    thread::scope(|s| {
        for i in 0..ROUNDS {
            let logger = &logger;
            s.spawn(move || logger.log(Counter::new(3)));
            s.spawn(move || logger.log(Product::new(2.0)));
            s.spawn(move || logger.log(RunningAverage::new(i, i + 3)));
        }
    });

    let report = logger.close()?;
    tracing::info!(batches = report.batches_written, "tally demo finished");
    Ok(())
}
