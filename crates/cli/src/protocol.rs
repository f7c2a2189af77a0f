// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between the dispatcher and a worker.
//!
//! Frames are a little-endian `u32` payload length followed by a postcard
//! payload. The dispatcher writes [`Directive`]s to the worker's stdin; the
//! worker writes [`WorkerEvent`]s to its stdout.

use std::io::{self, Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::processor::FactoryRecipe;

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;

/// Upper bound on one frame's payload.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

pub type BatchId = u64;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("i/o error on worker channel: {0}")]
    Io(#[from] io::Error),

    #[error("malformed frame: {0}")]
    Codec(#[from] postcard::Error),

    #[error("frame of {0} bytes exceeds the {max} byte limit", max = MAX_FRAME_LEN)]
    TooLarge(usize),

    #[error("stream ended inside a frame")]
    UnexpectedEof,
}

/// Final status of one test class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassStatus {
    Passed,
    Failed,
    Skipped,
    Crashed,
}

impl ClassStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassStatus::Passed => "passed",
            ClassStatus::Failed => "failed",
            ClassStatus::Skipped => "skipped",
            ClassStatus::Crashed => "crashed",
        }
    }

    /// Whether this status fails the run.
    pub fn is_failure(self) -> bool {
        matches!(self, ClassStatus::Failed | ClassStatus::Crashed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Dispatcher to worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Directive {
    /// Sent exactly once, first, per worker lifetime.
    Init(FactoryRecipe),
    BatchStart { batch_id: BatchId, classes: Vec<String> },
    Stop,
}

/// Worker to dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerEvent {
    /// The factory was decoded and the processor created.
    Ready,
    ClassStart {
        class: String,
    },
    Output {
        class: String,
        stream: OutputStream,
        line: String,
    },
    ClassResult {
        class: String,
        status: ClassStatus,
        duration_ms: u64,
        failures: Vec<String>,
    },
    BatchEnd {
        batch_id: BatchId,
    },
    WorkerError {
        message: String,
    },
}

/// Encode `message` as one frame and flush.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<(), ProtocolError> {
    let payload = postcard::to_allocvec(message)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::TooLarge(payload.len()));
    }
    let len = payload.len() as u32;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Decode the next frame. Returns `Ok(None)` on a clean end of stream.
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<Option<T>, ProtocolError> {
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(ProtocolError::UnexpectedEof),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::TooLarge(len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => ProtocolError::UnexpectedEof,
        _ => ProtocolError::Io(e),
    })?;
    Ok(Some(postcard::from_bytes(&payload)?))
}
