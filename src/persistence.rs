use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::sync::engine::EngineState;

/// Writes the wallet state as JSON, replacing `path` atomically.
///
/// The unconfirmed view is not part of the snapshot; it is rebuilt from the
/// next transaction pool update.
pub fn save_snapshot(path: &Path, state: &EngineState) -> Result<()> {
    let tmp = temp_path(path);
    let raw = serde_json::to_vec_pretty(state)?;

    fs::write(&tmp, raw).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;

    log::info!(
        "[WALLET] Snapshot saved at height {} ({} transactions)",
        state.height,
        state.confirmed.len()
    );
    Ok(())
}

/// Reads a snapshot written by [`save_snapshot`]. Returns `None` if there is
/// no file yet.
pub fn load_snapshot(path: &Path) -> Result<Option<EngineState>> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::info!("[WALLET] No snapshot at {}, starting empty", path.display());
            return Ok(None);
        }
        Err(err) => return Err(err).with_context(|| format!("reading {}", path.display())),
    };

    let state: EngineState = serde_json::from_slice(&raw)
        .with_context(|| format!("decoding snapshot {}", path.display()))?;
    log::info!("[WALLET] Loaded snapshot at height {}", state.height);
    Ok(Some(state))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
