// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handle on one `.gp` file.
//!
//! All reads take a shared lock; all mutations take the exclusive lock,
//! re-read the file, rewrite the target region, replace atomically, and
//! mirror to git. There is no in-memory cache: state is re-read from
//! disk under the lock on every operation.

use crate::atomic::write_atomic;
use crate::error::StorageError;
use crate::git_mirror;
use crate::lock::ProjectLock;
use crate::parse::parse_project;
use crate::paths::GaiDir;
use gai_core::changespec::ChangeSpec;
use gai_core::project::ProjectSpec;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ProjectFile {
    path: PathBuf,
    gai: GaiDir,
}

impl ProjectFile {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), gai: GaiDir::resolve() }
    }

    pub fn with_gai(path: impl Into<PathBuf>, gai: GaiDir) -> Self {
        Self { path: path.into(), gai }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn gai(&self) -> &GaiDir {
        &self.gai
    }

    /// Read and parse under a shared lock. A missing file parses as an
    /// empty project.
    pub fn read(&self) -> Result<ProjectSpec, StorageError> {
        let _lock = ProjectLock::shared(&self.path)?;
        let content = read_or_empty(&self.path)?;
        Ok(parse_project(&self.path, &content))
    }

    /// Read one CL by name.
    pub fn read_changespec(&self, name: &str) -> Result<ChangeSpec, StorageError> {
        self.read()?
            .changespecs
            .into_iter()
            .find(|cs| cs.name == name)
            .ok_or_else(|| StorageError::ChangeSpecNotFound { name: name.to_string() })
    }

    /// The read-modify-write pattern every mutation goes through.
    ///
    /// `f` receives the file as raw lines so partial updates can rewrite
    /// exactly one region and leave the rest of the document untouched.
    pub fn mutate_lines<T>(
        &self,
        message: &str,
        f: impl FnOnce(&mut Vec<String>) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let _lock = ProjectLock::exclusive(&self.path)?;
        let content = read_or_empty(&self.path)?;
        let mut lines: Vec<String> = content.lines().map(str::to_string).collect();

        let result = f(&mut lines)?;

        let mut new_content = lines.join("\n");
        if !new_content.is_empty() {
            new_content.push('\n');
        }
        write_atomic(&self.path, &new_content)?;
        git_mirror::commit_file(&self.gai, &self.path, message);
        Ok(result)
    }

    /// Like [`mutate_lines`], but hands `f` the parsed model alongside
    /// the raw lines for mutations that need fresh structured state.
    pub fn mutate_with_model<T>(
        &self,
        message: &str,
        f: impl FnOnce(&ProjectSpec, &mut Vec<String>) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        self.mutate_lines(message, |lines| {
            let content = lines.join("\n");
            let model = parse_project(&self.path, &content);
            f(&model, lines)
        })
    }
}

fn read_or_empty(path: &Path) -> Result<String, StorageError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(err.into()),
    }
}
