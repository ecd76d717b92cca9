// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Outputs: the addressable sound sources clips play through.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arrangement::ClipInstanceList;
use crate::ids::{ClipId, ModControllableId, OutputId};
use crate::midi::DEFAULT_BEND_RANGES;

/// Kind of sound source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Internal synth preset
    Synth,
    /// Internal drum kit
    Kit,
    /// External MIDI channel
    MidiOut,
    /// Control-voltage channel
    Cv,
    /// Audio track
    Audio,
}

impl OutputKind {
    /// Whether this kind plays note data
    pub fn is_instrument(self) -> bool {
        self != OutputKind::Audio
    }

    /// Whether retired outputs of this kind go to the hibernation pool
    pub fn can_hibernate(self) -> bool {
        matches!(self, OutputKind::Synth | OutputKind::Kit)
    }

    /// Whether this kind is identified by preset name rather than channel
    pub fn is_preset_backed(self) -> bool {
        matches!(self, OutputKind::Synth | OutputKind::Kit)
    }

    /// Whether this kind is an external channel
    pub fn is_channel_backed(self) -> bool {
        matches!(self, OutputKind::MidiOut | OutputKind::Cv)
    }

    /// Get a human-readable name
    pub fn name(self) -> &'static str {
        match self {
            OutputKind::Synth => "synth",
            OutputKind::Kit => "kit",
            OutputKind::MidiOut => "MIDI",
            OutputKind::Cv => "CV",
            OutputKind::Audio => "audio",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Identity used to match an output back to a preset slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetKey<'a> {
    pub kind: OutputKind,
    /// Channel for MIDI/CV, preset number otherwise
    pub slot: i32,
    /// Channel suffix for MIDI, -1 for none
    pub sub_slot: i32,
    pub name: &'a str,
    pub dir_path: &'a str,
}

/// One drum in a kit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drum {
    pub name: String,
    pub mod_controllable: ModControllableId,
}

/// An addressable sound source
#[derive(Debug, Clone)]
pub struct Output {
    pub id: OutputId,
    pub kind: OutputKind,
    /// Preset or track name
    pub name: String,
    /// Channel for MIDI/CV, preset number otherwise
    pub slot: i32,
    /// Channel suffix for MIDI, -1 for none
    pub sub_slot: i32,
    /// Folder the preset was loaded from
    pub dir_path: String,
    /// False while hibernating; the voice engine must be reinitialised before use
    pub in_valid_state: bool,
    /// Entity owning the output-level parameters
    pub mod_controllable: ModControllableId,
    /// Drums, for kits
    pub drums: Vec<Drum>,
    /// Arrangement timeline
    pub clip_instances: ClipInstanceList,
    /// Clip currently bound as the sounding clip
    pub active_clip: Option<ClipId>,
    pub soloing_in_arrangement: bool,
    pub muted_in_arrangement: bool,
    /// Unsaved preset edits exist
    pub edited: bool,
    pub default_velocity: u8,
    /// Pitch-bend ranges `[main, finger level]` for MIDI outputs
    pub bend_ranges: [u8; 2],
}

impl Output {
    /// Create a new output
    pub fn new(
        id: OutputId,
        kind: OutputKind,
        mod_controllable: ModControllableId,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            slot: 0,
            sub_slot: -1,
            dir_path: String::new(),
            in_valid_state: true,
            mod_controllable,
            drums: Vec::new(),
            clip_instances: ClipInstanceList::new(),
            active_clip: None,
            soloing_in_arrangement: false,
            muted_in_arrangement: false,
            edited: false,
            default_velocity: 64,
            bend_ranges: DEFAULT_BEND_RANGES,
        }
    }

    /// Builder: set the preset slot
    pub fn with_slot(mut self, slot: i32, sub_slot: i32) -> Self {
        self.slot = slot;
        self.sub_slot = sub_slot;
        self
    }

    /// Builder: set the preset folder
    pub fn with_dir_path(mut self, dir_path: impl Into<String>) -> Self {
        self.dir_path = dir_path.into();
        self
    }

    /// Add a drum to a kit
    pub fn add_drum(&mut self, name: impl Into<String>, mod_controllable: ModControllableId) {
        self.drums.push(Drum {
            name: name.into(),
            mod_controllable,
        });
    }

    /// Find a drum by name (case-insensitive)
    pub fn drum_by_name(&self, name: &str) -> Option<&Drum> {
        self.drums
            .iter()
            .find(|drum| drum.name.eq_ignore_ascii_case(name))
    }

    pub fn has_drum(&self, drum: ModControllableId) -> bool {
        self.drums.iter().any(|d| d.mod_controllable == drum)
    }

    /// The output's own entity followed by its drums'
    pub fn mod_controllables(&self) -> impl Iterator<Item = ModControllableId> + '_ {
        std::iter::once(self.mod_controllable).chain(self.drums.iter().map(|d| d.mod_controllable))
    }

    pub fn preset_key(&self) -> PresetKey<'_> {
        PresetKey {
            kind: self.kind,
            slot: self.slot,
            sub_slot: self.sub_slot,
            name: &self.name,
            dir_path: &self.dir_path,
        }
    }

    /// Whether this output is the one a preset reference names.
    ///
    /// Synths and kits match by name (and folder, when given); MIDI and CV
    /// match by channel and suffix. Audio outputs never match.
    pub fn matches_preset(&self, key: &PresetKey<'_>) -> bool {
        if self.kind != key.kind {
            return false;
        }
        match self.kind {
            OutputKind::Synth | OutputKind::Kit => {
                self.name.eq_ignore_ascii_case(key.name)
                    && (key.dir_path.is_empty() || self.dir_path == key.dir_path)
            }
            OutputKind::MidiOut => self.slot == key.slot && self.sub_slot == key.sub_slot,
            OutputKind::Cv => self.slot == key.slot,
            OutputKind::Audio => false,
        }
    }

    /// Prepare for the hibernation pool
    pub fn enter_hibernation(&mut self) {
        self.in_valid_state = false;
        self.active_clip = None;
        self.soloing_in_arrangement = false;
        self.muted_in_arrangement = false;
        self.clip_instances.clear();
    }

    /// Display label
    pub fn label(&self) -> String {
        match self.kind {
            OutputKind::MidiOut if self.sub_slot >= 0 => {
                format!("MIDI {}.{}", self.slot + 1, self.sub_slot + 1)
            }
            OutputKind::MidiOut => format!("MIDI {}", self.slot + 1),
            OutputKind::Cv => format!("CV {}", self.slot + 1),
            _ => self.name.clone(),
        }
    }
}
