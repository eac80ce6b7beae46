//! Logger config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use tally_core::error::{Result, TallyError};

pub use schema::{LoggerSection, TallyConfig};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<TallyConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| TallyError::io(format!("read config {} failed", path.display()), e))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<TallyConfig> {
    let cfg: TallyConfig = serde_yaml::from_str(s)
        .map_err(|e| TallyError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
