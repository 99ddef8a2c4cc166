use dirs::data_dir;
use once_cell::sync::Lazy;
use std::{fs, path::PathBuf};
use tracing::warn;

static DATA_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    let base = data_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    base.join("event-clipper")
});

pub fn data_root() -> PathBuf {
    DATA_ROOT.clone()
}

pub fn settings_path() -> PathBuf {
    data_root().join("settings.json")
}

pub fn ensure_parent(path: &PathBuf) {
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            warn!(?parent, %err, "failed to create parent directory");
        }
    }
}
