//! Startup loading of preset response rules from a directory.

use super::core::Emulator;
use super::types::{EmulatorError, ResponseRule};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

impl Emulator {
    /// Register every `*.json` rule document found under `dir`.
    ///
    /// Files are visited recursively in path order. The first unreadable or
    /// invalid document aborts loading; rules registered before it stay in
    /// place. Returns the number of documents registered.
    pub fn load_presets(&self, dir: impl AsRef<Path>) -> Result<usize, EmulatorError> {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        collect_json_files(dir, &mut files)?;
        files.sort();

        info!(
            "Loading {} preset response files from {}",
            files.len(),
            dir.display()
        );

        for path in &files {
            debug!("Loading preset response file {}", path.display());
            let rule = read_rule(path)?;
            self.register(rule).map_err(|e| EmulatorError::Preset {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(files.len())
    }
}

fn read_rule(path: &Path) -> Result<ResponseRule, EmulatorError> {
    let contents = fs::read_to_string(path).map_err(|e| preset_error(path, e))?;
    serde_json::from_str(&contents).map_err(|e| preset_error(path, e))
}

fn collect_json_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), EmulatorError> {
    let entries = fs::read_dir(dir).map_err(|e| preset_error(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| preset_error(dir, e))?;
        let path = entry.path();
        // Symlinked directories are not followed so a link cycle cannot recurse forever.
        let file_type = entry.file_type().map_err(|e| preset_error(&path, e))?;
        if file_type.is_dir() {
            collect_json_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    Ok(())
}

fn preset_error(path: &Path, err: impl std::fmt::Display) -> EmulatorError {
    EmulatorError::Preset {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
