// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration and song documents.
//!
//! This module provides the YAML song document (what a saved song looks
//! like on disk) and the TOML engine configuration. Converting a document
//! into a live song, with clamping, happens in `song::persist`.

pub mod engine;

pub use engine::EngineConfig;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::arrangement::Section;
use crate::midi::LearnedMidi;
use crate::params::ParamManager;
use crate::sequencer::{LaunchStyle, OutputKind, OverdubNature, SequencedNote};

/// Root of a saved song
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SongFile {
    /// Song-level settings
    pub song: SongConfig,
    /// Active outputs in list order
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
    /// Session clips in grid order
    #[serde(default)]
    pub session_clips: Vec<ClipConfig>,
    /// Clips that only exist on the arrangement timeline
    #[serde(default)]
    pub arrangement_only_clips: Vec<ClipConfig>,
}

impl SongFile {
    /// Load a song document from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read song file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Parse a song document from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse song YAML")
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize song to YAML")
    }

    /// Save the document to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write song file: {:?}", path.as_ref()))
    }
}

/// Song-level settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SongConfig {
    /// Song name
    #[serde(default = "default_name")]
    pub name: String,
    /// Exact tick duration (32.32 fixed-point samples); preferred when present
    #[serde(default)]
    pub time_per_timer_tick: Option<u64>,
    /// Tempo in BPM, used when no exact tick duration is stored
    #[serde(default)]
    pub bpm: Option<f64>,
    /// Tempo as a stored parameter pair, oldest form
    #[serde(default)]
    pub tempo_params: Option<TempoParams>,
    #[serde(default = "default_tick_magnitude")]
    pub inside_world_tick_magnitude: i32,
    #[serde(default)]
    pub inside_world_tick_magnitude_offset_from_bpm: i32,
    /// Session clip index of the sync-scaling clip
    #[serde(default)]
    pub input_tick_scale_clip: Option<usize>,
    /// Swing amount (-49 to 49)
    #[serde(default)]
    pub swing_amount: i32,
    /// Swing interval in file sync-level units
    #[serde(default = "default_swing_interval")]
    pub swing_interval: u8,
    /// Root note (MIDI note number)
    #[serde(default)]
    pub root_note: i32,
    /// Scale as semitone offsets from the root
    #[serde(default = "default_mode_notes")]
    pub mode_notes: Vec<u8>,
    /// Session grid scroll position
    #[serde(default)]
    pub song_view_y_scroll: i32,
    #[serde(default)]
    pub sections: Vec<Section>,
}

fn default_name() -> String {
    "Untitled".to_string()
}
fn default_tick_magnitude() -> i32 {
    crate::timing::tempo::DEFAULT_TICK_MAGNITUDE
}
fn default_swing_interval() -> u8 {
    // Sixteenth notes
    5
}
fn default_mode_notes() -> Vec<u8> {
    crate::music::ScaleType::Major.intervals().to_vec()
}

impl Default for SongConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            time_per_timer_tick: None,
            bpm: None,
            tempo_params: None,
            inside_world_tick_magnitude: default_tick_magnitude(),
            inside_world_tick_magnitude_offset_from_bpm: 0,
            input_tick_scale_clip: None,
            swing_amount: 0,
            swing_interval: default_swing_interval(),
            root_note: 0,
            mode_notes: default_mode_notes(),
            song_view_y_scroll: 0,
            sections: Vec::new(),
        }
    }
}

/// Tempo stored as `(magnitude, table index)`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TempoParams {
    pub magnitude: i32,
    pub value: u32,
}

/// Reference to a clip by its position in the saved arrays
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClipRef {
    Session(usize),
    ArrangementOnly(usize),
}

/// Output definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    pub kind: OutputKind,
    #[serde(default)]
    pub name: String,
    /// Channel for MIDI/CV, preset number otherwise
    #[serde(default)]
    pub slot: i32,
    #[serde(default = "default_sub_slot")]
    pub sub_slot: i32,
    #[serde(default)]
    pub dir_path: String,
    /// Drum names, for kits
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drums: Vec<String>,
    #[serde(default = "default_velocity")]
    pub default_velocity: u8,
    #[serde(default = "default_bend_ranges")]
    pub bend_ranges: [u8; 2],
    #[serde(default)]
    pub soloing_in_arrangement: bool,
    #[serde(default)]
    pub muted_in_arrangement: bool,
    /// Arrangement timeline
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<InstanceConfig>,
    /// Parameters kept for the output while no clip holds them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<ParamManager>,
}

fn default_sub_slot() -> i32 {
    -1
}
fn default_velocity() -> u8 {
    64
}
fn default_bend_ranges() -> [u8; 2] {
    crate::midi::DEFAULT_BEND_RANGES
}

/// One arrangement placement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceConfig {
    pub pos: u32,
    pub length: u32,
    #[serde(default)]
    pub clip: Option<ClipRef>,
}

/// Clip definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipConfig {
    /// Index into `outputs`
    pub output: usize,
    pub loop_length: u32,
    #[serde(default)]
    pub section: u8,
    /// Plays in session view when nothing is soloing
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub soloing: bool,
    #[serde(default)]
    pub overdub_nature: OverdubNature,
    #[serde(default)]
    pub launch_style: LaunchStyle,
    /// Rows follow the song scale
    #[serde(default)]
    pub in_scale_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midi_program: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midi_bank: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midi_sub_bank: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note_rows: Vec<NoteRowConfig>,
    /// Sample file, for audio clips
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_path: Option<String>,
    #[serde(default)]
    pub params: ParamManager,
}

/// Note row definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteRowConfig {
    pub y_note: i32,
    /// Drum name, for kit clips
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drum: Option<String>,
    #[serde(default)]
    pub notes: Vec<SequencedNote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learned_midi: Option<LearnedMidi>,
    #[serde(default)]
    pub muted: bool,
}
