// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use std::path::{Path, PathBuf};

use log::*;
use tokio::{fs, io::ErrorKind};

use crate::error::StoreError;

const LOG_TARGET: &str = "gateway::stores::content_store";

const ID_LEN: usize = 43;

fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Content-addressed cache of raw JSON bytes, keyed by a 43-character base64url id.
///
/// Keys fan out two levels deep (`id[0:2]/id[2:4]/id`) to keep any one directory's entry
/// count bounded. Not authoritative: safe to delete at any time.
#[derive(Debug, Clone)]
pub struct ContentStore {
    base_dir: PathBuf,
}

impl ContentStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_id(id) {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.base_dir.join(&id[0..2]).join(&id[2..4]).join(id))
    }

    pub async fn has(&self, id: &str) -> Result<bool, StoreError> {
        let path = self.path_for(id)?;
        Ok(fs::metadata(&path).await.is_ok())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    pub async fn put(&self, id: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        let dir = path.parent().expect("path_for always nests under base_dir");
        fs::create_dir_all(dir).await.map_err(|source| StoreError::Io { path: dir.to_path_buf(), source })?;

        let tmp_path = tmp_sibling(&path);
        fs::write(&tmp_path, bytes).await.map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;
        fs::rename(&tmp_path, &path).await.map_err(|source| StoreError::Io { path: path.clone(), source })?;
        debug!(target: LOG_TARGET, "cached {} bytes under {}", bytes.len(), path.display());
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("tmp");
    path.with_file_name(format!(".{file_name}.tmp-{}", std::process::id()))
}
