// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helpers for staging handshake files in tests
#![cfg_attr(coverage_nightly, coverage(off))]

use dlm_core::ClientHandshake;
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};

/// Write `handshake` into `dir` as `<node>.json`
pub fn write_handshake(dir: &Path, handshake: &ClientHandshake) -> std::io::Result<PathBuf> {
    let json = serde_json::to_string_pretty(handshake)
        .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
    let path = dir.join(format!("{}.json", handshake.node));
    std::fs::write(&path, json)?;
    Ok(path)
}
