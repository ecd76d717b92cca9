// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! seqcore - song state engine for a hardware-style sequencer.
//!
//! A [`Song`] owns clips, outputs, parameter backups, scale and tempo, and
//! exposes the render entry point plus load/save. [`SongSlot`] holds the
//! one song that is current and shares it with the audio thread.

pub mod arrangement;
pub mod audio;
pub mod config;
pub mod error;
pub mod ids;
pub mod midi;
pub mod music;
pub mod params;
pub mod sequencer;
pub mod song;
pub mod timing;

pub use config::{EngineConfig, SongFile};
pub use error::{SongError, SongResult};
pub use ids::{ClipId, ModControllableId, OutputId};
pub use song::{Song, SongHandle, SongSlot, SongSlotState};
