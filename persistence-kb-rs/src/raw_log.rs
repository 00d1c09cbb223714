use std::fs;
use std::path::{Path, PathBuf};

use error_handling::Result;
use shared_types::FailureLogRecord;
use tracing::info;

/// Write `log` as pretty JSON to `{dir}/{run_id}_raw.json`, creating `dir`
/// if needed.
pub fn write_raw_log(dir: &Path, log: &FailureLogRecord) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}_raw.json", log.run_id));
    let contents = serde_json::to_string_pretty(log)?;
    fs::write(&path, contents)?;
    info!(path = %path.display(), "Raw failure log saved");
    Ok(path)
}
