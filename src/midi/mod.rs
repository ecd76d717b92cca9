// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI collaborator interface.
//!
//! The song decides *what* must go out (program selections, bend ranges);
//! a [`MidiTransport`] implementation owns the bytes and the device.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Number of MIDI channels per device
pub const NUM_MIDI_CHANNELS: u8 = 16;

/// Pitch-bend range index: whole-channel bend
pub const BEND_RANGE_MAIN: usize = 0;
/// Pitch-bend range index: per-note (MPE) bend
pub const BEND_RANGE_FINGER_LEVEL: usize = 1;

/// Default bend ranges in semitones, `[main, finger level]`
pub const DEFAULT_BEND_RANGES: [u8; 2] = [2, 48];

/// A MIDI message learned to trigger something (section launch, note row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LearnedMidi {
    /// Channel (0-15)
    pub channel: u8,
    /// Note or CC number
    pub note_or_cc: u8,
}

impl LearnedMidi {
    /// Create a learned command, clamping out-of-range input
    pub fn new(channel: u8, note_or_cc: u8) -> Self {
        Self {
            channel: channel.min(NUM_MIDI_CHANNELS - 1),
            note_or_cc: note_or_cc.min(127),
        }
    }

    /// Whether an incoming message matches this command
    pub fn matches(&self, channel: u8, note_or_cc: u8) -> bool {
        self.channel == channel && self.note_or_cc == note_or_cc
    }
}

/// A program selection for one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramSelection {
    pub channel: u8,
    pub bank: Option<u8>,
    pub sub_bank: Option<u8>,
    pub program: u8,
}

/// Trait for MIDI transport implementations.
///
/// The song engine calls this from the foreground only.
pub trait MidiTransport {
    /// Send bank select (if any) followed by a program change
    fn send_program_change(&mut self, selection: ProgramSelection) -> Result<()>;

    /// Send a pitch-bend range (RPN 0) for one channel
    fn send_bend_range(&mut self, channel: u8, semitones: u8) -> Result<()>;
}
