// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Outputs and clips owned by a song.
//!
//! This module provides:
//! - Outputs (synth, kit, MIDI, CV, audio) and the hibernation pool
//! - Clips and their note rows
//! - The clip registry split into session and arrangement-only arrays

pub mod clip;
pub mod output;
pub mod registry;
pub mod roster;

pub use clip::{
    AudioClipData, Clip, ClipContent, InstrumentClipData, LaunchStyle, NoteRow, OverdubNature,
    SequencedNote,
};
pub use output::{Drum, Output, OutputKind, PresetKey};
pub use registry::{ClipArray, ClipRegistry, DEFAULT_MAX_CLIPS};
pub use roster::{
    AddPosition, OutputLocation, OutputRoster, SearchScope, DEFAULT_HIBERNATION_CAPACITY,
};
