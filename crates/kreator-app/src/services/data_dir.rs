// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory resolution.

use std::path::PathBuf;

/// Return the application data directory. Not created here; callers that
/// write into it create it first.
pub fn data_dir() -> PathBuf {
    dirs_fallback().join("kreator")
}

/// Location of the settings file used when `--config` is not given.
pub fn default_config_path() -> PathBuf {
    data_dir().join("config.json")
}

fn dirs_fallback() -> PathBuf {
    // Try XDG data dir, then fallback to home
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort
    PathBuf::from("/tmp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_lives_in_the_data_dir() {
        let path = default_config_path();
        assert!(path.starts_with(data_dir()));
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("config.json"));
    }
}
