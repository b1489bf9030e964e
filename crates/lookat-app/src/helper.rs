// ABOUTME: Finds and reads the optional lookat_helper.lk user extension file.
// ABOUTME: Each `name = command` line becomes a shell alias; `{0}`, `{1}` take arguments.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use lookat_core::config::HelperSettings;

use crate::command::{self, is_identifier};

#[derive(Debug, thiserror::Error)]
pub enum HelperError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: {message}")]
    Syntax {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// Directories searched for the helper file, in priority order:
/// `LOOKAT_PATH` entries, the configured search path, then `cwd`.
pub fn search_dirs(
    settings: &HelperSettings,
    lookat_path: Option<OsString>,
    cwd: Option<PathBuf>,
) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = lookat_path
        .map(|value| std::env::split_paths(&value).collect())
        .unwrap_or_default();
    dirs.extend(settings.search_path.iter().cloned());
    dirs.extend(cwd);
    dirs.retain(|d| !d.as_os_str().is_empty());
    dirs
}

/// First existing helper file along `dirs`
pub fn discover(file_name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(file_name))
        .find(|candidate| candidate.is_file())
}

/// Read the aliases defined in `path`
pub fn import(path: &Path) -> Result<BTreeMap<String, String>, HelperError> {
    let text = std::fs::read_to_string(path).map_err(|source| HelperError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text).map_err(|(line, message)| HelperError::Syntax {
        path: path.to_path_buf(),
        line,
        message,
    })
}

/// Parse helper text. Errors carry the 1-based line number.
pub fn parse(text: &str) -> Result<BTreeMap<String, String>, (usize, String)> {
    let mut aliases = BTreeMap::new();
    for (number, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_no = number + 1;
        let (name, body) = line
            .split_once('=')
            .ok_or_else(|| (line_no, "expected 'name = command'".to_string()))?;
        let (name, body) = (name.trim(), body.trim());
        if !is_identifier(name) {
            return Err((line_no, format!("'{name}' is not a valid name")));
        }
        if body.is_empty() {
            return Err((line_no, format!("'{name}' has no command")));
        }
        // Placeholders are filled in later; check the rest parses
        let stripped = body.replace("{", "").replace("}", "");
        if let Err(err) = command::parse_line(&stripped) {
            return Err((line_no, err.to_string()));
        }
        aliases.insert(name.to_string(), body.to_string());
    }
    Ok(aliases)
}
