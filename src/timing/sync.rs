// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sync levels (note divisions used for swing, LFO sync and launch quantize).
//!
//! Song files store sync levels on a fixed scale that predates the runtime's
//! tick-magnitude space. Conversion goes through a lookup table so that old
//! files keep loading to exactly the same division; the song's BPM magnitude
//! then shifts the result.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A note division, from a whole bar down to a 256th note
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncLevel {
    Off,
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
    OneTwentyEighth,
    TwoFiftySixth,
}

/// File value -> sync level, as stored at the reference BPM magnitude
const FILE_SYNC_LEVELS: [SyncLevel; 10] = [
    SyncLevel::Off,
    SyncLevel::Whole,
    SyncLevel::Half,
    SyncLevel::Quarter,
    SyncLevel::Eighth,
    SyncLevel::Sixteenth,
    SyncLevel::ThirtySecond,
    SyncLevel::SixtyFourth,
    SyncLevel::OneTwentyEighth,
    SyncLevel::TwoFiftySixth,
];

/// BPM magnitude at which file values were written without a shift
pub const FILE_REFERENCE_MAGNITUDE: i32 = 2;

impl SyncLevel {
    /// Finest division that still exists
    pub const FINEST: SyncLevel = SyncLevel::TwoFiftySixth;

    /// Internal numeric value (0 = off, 1 = whole, ...)
    pub fn value(self) -> i32 {
        self as i32
    }

    /// Sync level from its internal value, clamped into range
    pub fn from_value(value: i32) -> Self {
        if value <= 0 {
            return SyncLevel::Off;
        }
        let index = value.min(Self::FINEST.value()) as usize;
        FILE_SYNC_LEVELS[index]
    }

    /// Length of one division in ticks, given the current bar length
    pub fn ticks(self, bar_length: u32) -> u32 {
        match self {
            SyncLevel::Off => 0,
            level => bar_length >> (level.value() - 1),
        }
    }

    /// Decode a value read from a song file.
    ///
    /// Unknown file values clamp to the nearest table entry.
    pub fn from_file_value(file_value: i32, bpm_magnitude: i32) -> Self {
        let index = file_value.clamp(0, FILE_SYNC_LEVELS.len() as i32 - 1) as usize;
        let stored = FILE_SYNC_LEVELS[index];
        if stored == SyncLevel::Off {
            return SyncLevel::Off;
        }
        let shifted = stored.value() + FILE_REFERENCE_MAGNITUDE - bpm_magnitude;
        Self::from_value(shifted.max(1))
    }

    /// Encode for writing to a song file
    pub fn to_file_value(self, bpm_magnitude: i32) -> i32 {
        if self == SyncLevel::Off {
            return 0;
        }
        let shifted = self.value() - FILE_REFERENCE_MAGNITUDE + bpm_magnitude;
        let index = shifted.clamp(1, FILE_SYNC_LEVELS.len() as i32 - 1) as usize;
        FILE_SYNC_LEVELS[index].value()
    }

    /// Human-readable note length
    pub fn name(self) -> &'static str {
        match self {
            SyncLevel::Off => "off",
            SyncLevel::Whole => "1-bar",
            SyncLevel::Half => "2nd-notes",
            SyncLevel::Quarter => "4th-notes",
            SyncLevel::Eighth => "8th-notes",
            SyncLevel::Sixteenth => "16th-notes",
            SyncLevel::ThirtySecond => "32nd-notes",
            SyncLevel::SixtyFourth => "64th-notes",
            SyncLevel::OneTwentyEighth => "128th-notes",
            SyncLevel::TwoFiftySixth => "256th-notes",
        }
    }
}

impl Default for SyncLevel {
    fn default() -> Self {
        SyncLevel::Sixteenth
    }
}

impl fmt::Display for SyncLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_level_ticks() {
        assert_eq!(SyncLevel::Whole.ticks(384), 384);
        assert_eq!(SyncLevel::Quarter.ticks(384), 96);
        assert_eq!(SyncLevel::Sixteenth.ticks(384), 24);
        assert_eq!(SyncLevel::Off.ticks(384), 0);
    }

    #[test]
    fn test_file_value_at_reference_magnitude() {
        for value in 0..10 {
            let level = SyncLevel::from_file_value(value, FILE_REFERENCE_MAGNITUDE);
            assert_eq!(level.value(), value);
            assert_eq!(level.to_file_value(FILE_REFERENCE_MAGNITUDE), value);
        }
    }

    #[test]
    fn test_file_value_shifted_by_magnitude() {
        // One magnitude finer at runtime means the same file division is one level coarser
        let level = SyncLevel::from_file_value(5, FILE_REFERENCE_MAGNITUDE + 1);
        assert_eq!(level, SyncLevel::Eighth);
        assert_eq!(level.to_file_value(FILE_REFERENCE_MAGNITUDE + 1), 5);
    }

    #[test]
    fn test_file_value_clamping() {
        assert_eq!(SyncLevel::from_file_value(-3, 1), SyncLevel::Off);
        assert_eq!(SyncLevel::from_file_value(99, 1), SyncLevel::TwoFiftySixth);
        assert_eq!(SyncLevel::from_file_value(1, 8), SyncLevel::Whole);
        assert_eq!(SyncLevel::Whole.to_file_value(-5), 1);
    }
}
