use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};

pub const STATE_EXTENSION: &str = "state";

/// Resume policy: the most recently modified `*.state` file in `dir`.
/// `Ok(None)` means "no prior state" — the caller falls back to a fresh
/// start; only an unreadable directory entry is an error.
pub fn latest_state(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read states dir: {}", dir.display()))?;

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(STATE_EXTENSION) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// Named milestone snapshot path, e.g. "Oak's Parcel" -> `oak_s_parcel.state`.
pub fn milestone_path(dir: &Path, label: &str) -> PathBuf {
    let slug: String = label
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    dir.join(format!("{slug}.{STATE_EXTENSION}"))
}
