// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Session sections: groups of clips launched together.

use serde::{Deserialize, Serialize};

use crate::midi::LearnedMidi;

/// Number of sections a song has
pub const MAX_NUM_SECTIONS: usize = 12;

/// Repeat count meaning "play until told otherwise"
pub const REPEAT_INFINITELY: i16 = 0;

/// Highest repeat count accepted from a file
pub const MAX_REPETITIONS: i16 = 9999;

/// A session-view grouping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// MIDI command that launches the section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_midi_command: Option<LearnedMidi>,
    /// Times to repeat before moving on, or [`REPEAT_INFINITELY`]
    #[serde(default)]
    pub num_repetitions: i16,
}

impl Section {
    /// Clamp a loaded repeat count into range
    pub fn sanitize(&mut self) -> bool {
        let clamped = self.num_repetitions.clamp(REPEAT_INFINITELY, MAX_REPETITIONS);
        let changed = clamped != self.num_repetitions;
        self.num_repetitions = clamped;
        changed
    }
}
