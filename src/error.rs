// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error types for song state operations.

use thiserror::Error;

use crate::ids::{ClipId, OutputId};
use crate::music::scale::ScaleError;

/// Errors raised by song mutations.
///
/// `Consistency` marks a broken structural invariant. Callers must treat it
/// as fatal: the song is no longer trustworthy.
#[derive(Debug, Error)]
pub enum SongError {
    /// A configured capacity limit would be exceeded
    #[error("capacity exceeded: {what} (limit {limit})")]
    CapacityExceeded { what: &'static str, limit: usize },
    /// The referenced clip does not exist in either registry
    #[error("clip not found: {0}")]
    ClipNotFound(ClipId),
    /// The referenced output is neither active nor hibernating
    #[error("output not found: {0}")]
    OutputNotFound(OutputId),
    /// The operation is not valid for the current state
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// A structural invariant no longer holds
    #[error("song consistency violated: {0}")]
    Consistency(String),
    /// Scale edit rejected
    #[error(transparent)]
    Scale(#[from] ScaleError),
    /// Reading or writing a song document failed
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for SongError {
    fn from(value: anyhow::Error) -> Self {
        Self::Storage(format!("{value:#}"))
    }
}

pub type SongResult<T> = Result<T, SongError>;
