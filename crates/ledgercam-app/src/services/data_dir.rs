// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Where the desktop front end keeps its configuration and local uploads.

use std::path::PathBuf;

use tracing::warn;

/// The application data directory, created if missing.
///
/// `$XDG_DATA_HOME/ledgercam`, else `~/.local/share/ledgercam`.
pub fn data_dir() -> PathBuf {
    let dir = base_dir().join("ledgercam");
    if let Err(err) = std::fs::create_dir_all(&dir) {
        warn!(path = %dir.display(), error = %err, "Could not create data directory");
    }
    dir
}

/// A subdirectory of the data directory (e.g. "uploads"), created if missing.
pub fn data_subdir(name: &str) -> PathBuf {
    let dir = data_dir().join(name);
    if let Err(err) = std::fs::create_dir_all(&dir) {
        warn!(path = %dir.display(), error = %err, "Could not create data subdirectory");
    }
    dir
}

/// Default location of the capture configuration file.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

fn base_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}
