// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Music theory for the song engine.
//!
//! This module provides the preset scale table, pitch-class naming and the
//! per-song mode-note engine that maps absolute pitches onto in-key rows.

pub mod scale;

pub use scale::{Note, ScaleError, ScaleState, ScaleType, PRESET_SCALES};
