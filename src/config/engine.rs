// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Engine configuration loaded from TOML.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::sequencer::{DEFAULT_HIBERNATION_CAPACITY, DEFAULT_MAX_CLIPS};
use crate::timing::tempo::{DEFAULT_TICK_MAGNITUDE, MAX_TICK_MAGNITUDE, MIN_TICK_MAGNITUDE};
use crate::timing::{SyncLevel, DEFAULT_BPM};

/// Limits and defaults for new songs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Tempo for new songs
    pub default_bpm: f64,
    /// Internal tick magnitude for new songs
    pub default_tick_magnitude: i32,
    /// Retired synths and kits kept for reuse
    pub hibernation_capacity: usize,
    /// Clips per song, both arrays together
    pub max_clips: usize,
    /// Active outputs per song
    pub max_outputs: usize,
    /// Undo actions kept
    pub undo_depth: usize,
    pub default_swing_interval: SyncLevel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_bpm: DEFAULT_BPM,
            default_tick_magnitude: DEFAULT_TICK_MAGNITUDE,
            hibernation_capacity: DEFAULT_HIBERNATION_CAPACITY,
            max_clips: DEFAULT_MAX_CLIPS,
            max_outputs: 256,
            undo_depth: 64,
            default_swing_interval: SyncLevel::Sixteenth,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read engine config: {:?}", path.as_ref()))?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string, clamping out-of-range values
    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(contents).context("Failed to parse engine config")?;
        config.sanitize();
        Ok(config)
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize engine config")
    }

    fn sanitize(&mut self) {
        if !(self.default_bpm.is_finite() && self.default_bpm > 0.0) {
            warn!(bpm = self.default_bpm, "invalid default tempo, using {DEFAULT_BPM}");
            self.default_bpm = DEFAULT_BPM;
        }
        let magnitude = self
            .default_tick_magnitude
            .clamp(MIN_TICK_MAGNITUDE, MAX_TICK_MAGNITUDE);
        if magnitude != self.default_tick_magnitude {
            warn!(
                magnitude = self.default_tick_magnitude,
                "tick magnitude out of range, clamped to {magnitude}"
            );
            self.default_tick_magnitude = magnitude;
        }
        self.max_clips = self.max_clips.max(1);
        self.max_outputs = self.max_outputs.max(1);
        self.undo_depth = self.undo_depth.max(1);
    }
}
