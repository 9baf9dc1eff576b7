// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout of the `~/.gai` state directory.
//!
//! `GAI_DIR` overrides the root so tests and sandboxed runs can relocate
//! the whole tree.

use std::path::{Path, PathBuf};

/// Environment variable overriding the state root.
pub const GAI_DIR_ENV: &str = "GAI_DIR";

/// Handle on the state root and its well-known subdirectories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaiDir {
    root: PathBuf,
}

impl GaiDir {
    /// Resolve from `GAI_DIR` or fall back to `~/.gai`.
    pub fn resolve() -> Self {
        if let Ok(dir) = std::env::var(GAI_DIR_ENV) {
            if !dir.is_empty() {
                return Self { root: PathBuf::from(dir) };
            }
        }
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self { root: home.join(".gai") }
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.root.join("projects")
    }

    /// `<root>/projects/<project>/<project>.gp`
    pub fn project_file(&self, project: &str) -> PathBuf {
        self.projects_dir().join(project).join(format!("{project}.gp"))
    }

    /// All `<project>.gp` files under the projects dir, sorted by project.
    pub fn find_all_project_files(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let Ok(entries) = std::fs::read_dir(self.projects_dir()) else {
            return found;
        };
        let mut dirs: Vec<PathBuf> =
            entries.flatten().filter(|e| e.path().is_dir()).map(|e| e.path()).collect();
        dirs.sort();
        for dir in dirs {
            if let Some(project) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) {
                let gp = dir.join(format!("{project}.gp"));
                if gp.is_file() {
                    found.push(gp);
                }
            }
        }
        found
    }

    pub fn hooks_dir(&self) -> PathBuf {
        self.root.join("hooks")
    }

    pub fn workflows_dir(&self) -> PathBuf {
        self.root.join("workflows")
    }

    pub fn checks_dir(&self) -> PathBuf {
        self.root.join("checks")
    }

    pub fn reverted_dir(&self) -> PathBuf {
        self.root.join("reverted")
    }

    pub fn archived_dir(&self) -> PathBuf {
        self.root.join("archived")
    }

    pub fn mentors_config(&self) -> PathBuf {
        self.root.join("mentors.toml")
    }

    /// Numbered workspace checkout: `<root>/workspaces/<project>/ws<num>`.
    pub fn workspace_dir(&self, project: &str, num: u32) -> PathBuf {
        self.root.join("workspaces").join(project).join(format!("ws{num}"))
    }

    /// Create a well-known subdirectory if needed and return it.
    pub fn ensure_dir(&self, dir: PathBuf) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// Make a CL name safe for use in a filename.
pub fn safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

/// Strip a lifecycle rename suffix (`__<N>`) from a CL name.
pub fn strip_lifecycle_suffix(name: &str) -> &str {
    if let Some(pos) = name.rfind("__") {
        let (base, suffix) = name.split_at(pos);
        if !base.is_empty() && suffix[2..].chars().all(|c| c.is_ascii_digit()) && suffix.len() > 2 {
            return base;
        }
    }
    name
}

/// Whether a CL name carries a lifecycle rename suffix.
pub fn has_lifecycle_suffix(name: &str) -> bool {
    strip_lifecycle_suffix(name) != name
}

/// Smallest `__<N>` suffix making `base__N` unique among `existing`.
pub fn next_lifecycle_suffix(base: &str, existing: &[String]) -> u32 {
    let mut n = 1;
    while existing.iter().any(|name| name == &format!("{base}__{n}")) {
        n += 1;
    }
    n
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
