// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic file replacement.
//!
//! Write a `.tmp_*` file in the same directory, fsync, rename over the
//! target. Must be called while holding the project lock. On any error
//! the temp file is unlinked and the error propagated.

use std::io::Write;
use std::path::Path;

pub fn write_atomic(target: &Path, content: &str) -> std::io::Result<()> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut temp = tempfile::Builder::new().prefix(".tmp_").suffix(".gp").tempfile_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    // Rename over the target; tempfile unlinks automatically on failure.
    temp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_target_content() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("web.gp");
        std::fs::write(&target, "old").unwrap();

        write_atomic(&target, "new content\n").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new content\n");
    }

    #[test]
    fn leaves_no_temp_files_behind() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("web.gp");
        write_atomic(&target, "content\n").unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp_"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
