// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handshakes dropped as JSON files into a directory

use async_trait::async_trait;
use dlm_core::{ClientHandshake, HandshakeError, HandshakeSource};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Reads one handshake per `*.json` file, in file name order.
///
/// A missing directory means no client reported anything.
#[derive(Clone, Debug)]
pub struct DirHandshakeSource {
    dir: PathBuf,
}

impl DirHandshakeSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn json_files(&self) -> Result<Vec<PathBuf>, HandshakeError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") && entry.file_type().await?.is_file()
            {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

#[async_trait]
impl HandshakeSource for DirHandshakeSource {
    async fn handshakes(&self) -> Result<Vec<ClientHandshake>, HandshakeError> {
        let mut handshakes = Vec::new();
        for path in self.json_files().await? {
            let json = tokio::fs::read_to_string(&path).await?;
            handshakes.push(ClientHandshake::from_json(&path.display().to_string(), &json)?);
        }
        Ok(handshakes)
    }
}

#[cfg(test)]
#[path = "dir_tests.rs"]
mod tests;
