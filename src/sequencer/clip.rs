// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Clips: note or audio content bound to one output.

use serde::{Deserialize, Serialize};

use crate::ids::{ClipId, ModControllableId, OutputId};
use crate::midi::LearnedMidi;
use crate::params::ParamManager;

/// A note within a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedNote {
    /// Start position in ticks from clip start
    pub pos: u32,
    /// Duration in ticks
    pub length: u32,
    pub velocity: u8,
}

/// One row of notes: a pitch for melodic clips, a drum for kit clips
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRow {
    /// Pitch (melodic rows); kept for kit rows as their display order
    pub y_note: i32,
    /// Drum played by this row, for kit clips
    pub drum: Option<ModControllableId>,
    /// Name of the drum, used to re-bind the row when the kit changes
    pub drum_name: Option<String>,
    /// Notes sorted by position
    pub notes: Vec<SequencedNote>,
    /// MIDI input learned to this row
    pub learned_midi: Option<LearnedMidi>,
    pub muted: bool,
}

impl NoteRow {
    /// Create an empty melodic row
    pub fn new(y_note: i32) -> Self {
        Self {
            y_note,
            drum: None,
            drum_name: None,
            notes: Vec::new(),
            learned_midi: None,
            muted: false,
        }
    }

    /// Create an empty row bound to a drum
    pub fn for_drum(y_note: i32, drum: ModControllableId, drum_name: impl Into<String>) -> Self {
        Self {
            drum: Some(drum),
            drum_name: Some(drum_name.into()),
            ..Self::new(y_note)
        }
    }

    /// Add a note, keeping the row sorted; a note at the same position is replaced
    pub fn add_note(&mut self, note: SequencedNote) {
        match self.notes.binary_search_by_key(&note.pos, |n| n.pos) {
            Ok(index) => self.notes[index] = note,
            Err(index) => self.notes.insert(index, note),
        }
    }
}

/// Content specific to instrument clips
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentClipData {
    pub note_rows: Vec<NoteRow>,
    /// Rows follow the song scale rather than chromatic pitch
    pub in_scale_mode: bool,
    pub midi_program: Option<u8>,
    pub midi_bank: Option<u8>,
    pub midi_sub_bank: Option<u8>,
}

/// Content specific to audio clips
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioClipData {
    pub sample_path: String,
}

/// Clip content by kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipContent {
    Instrument(InstrumentClipData),
    Audio(AudioClipData),
}

/// How a session clip responds to fill mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchStyle {
    #[default]
    Default,
    /// Plays only while fill mode is on
    Fill,
}

/// How a pending overdub records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverdubNature {
    /// Records one pass, then becomes a normal clip
    #[default]
    Normal,
    /// Keeps layering each loop
    ContinuousLayering,
}

/// A playable container bound to one output
#[derive(Debug, Clone)]
pub struct Clip {
    pub id: ClipId,
    pub output: OutputId,
    pub content: ClipContent,
    /// Loop length in ticks
    pub loop_length: u32,
    /// Session section (0..MAX_NUM_SECTIONS)
    pub section: u8,
    /// Plays when nothing is soloing
    pub active_if_no_solo: bool,
    pub soloing: bool,
    /// Queued to change state at the next launch boundary
    pub armed: bool,
    /// Created for a linear recording that has not completed
    pub is_pending_overdub: bool,
    pub overdub_nature: OverdubNature,
    pub launch_style: LaunchStyle,
    pub is_recording: bool,
    /// Session state saved when arrangement playback began
    pub was_active_before: bool,
    /// Parameter values and automation
    pub param_manager: ParamManager,
}

impl Clip {
    fn with_content(id: ClipId, output: OutputId, loop_length: u32, content: ClipContent) -> Self {
        Self {
            id,
            output,
            content,
            loop_length: loop_length.max(1),
            section: 0,
            active_if_no_solo: false,
            soloing: false,
            armed: false,
            is_pending_overdub: false,
            overdub_nature: OverdubNature::Normal,
            launch_style: LaunchStyle::Default,
            is_recording: false,
            was_active_before: false,
            param_manager: ParamManager::new(),
        }
    }

    /// Create an empty instrument clip
    pub fn new_instrument(id: ClipId, output: OutputId, loop_length: u32) -> Self {
        Self::with_content(
            id,
            output,
            loop_length,
            ClipContent::Instrument(InstrumentClipData::default()),
        )
    }

    /// Create an audio clip
    pub fn new_audio(id: ClipId, output: OutputId, loop_length: u32, sample_path: impl Into<String>) -> Self {
        Self::with_content(
            id,
            output,
            loop_length,
            ClipContent::Audio(AudioClipData {
                sample_path: sample_path.into(),
            }),
        )
    }

    /// A fresh, empty clip of the same kind on the same output
    pub fn empty_like(&self, id: ClipId) -> Self {
        let content = match &self.content {
            ClipContent::Instrument(data) => ClipContent::Instrument(InstrumentClipData {
                in_scale_mode: data.in_scale_mode,
                ..InstrumentClipData::default()
            }),
            ClipContent::Audio(_) => ClipContent::Audio(AudioClipData::default()),
        };
        let mut clip = Self::with_content(id, self.output, self.loop_length, content);
        clip.section = self.section;
        clip.launch_style = self.launch_style;
        clip
    }

    pub fn is_instrument(&self) -> bool {
        matches!(self.content, ClipContent::Instrument(_))
    }

    pub fn instrument(&self) -> Option<&InstrumentClipData> {
        match &self.content {
            ClipContent::Instrument(data) => Some(data),
            ClipContent::Audio(_) => None,
        }
    }

    pub fn instrument_mut(&mut self) -> Option<&mut InstrumentClipData> {
        match &mut self.content {
            ClipContent::Instrument(data) => Some(data),
            ClipContent::Audio(_) => None,
        }
    }

    /// Whether this is an instrument clip displaying rows in key
    pub fn is_in_scale_mode(&self) -> bool {
        self.instrument().is_some_and(|data| data.in_scale_mode)
    }

    /// Whether the clip holds no notes or sample
    pub fn is_empty(&self) -> bool {
        match &self.content {
            ClipContent::Instrument(data) => data.note_rows.iter().all(|row| row.notes.is_empty()),
            ClipContent::Audio(data) => data.sample_path.is_empty(),
        }
    }

    /// Add a melodic row, keeping rows sorted by pitch. Returns its index.
    pub fn add_note_row(&mut self, row: NoteRow) -> Option<usize> {
        let data = self.instrument_mut()?;
        let index = data.note_rows.partition_point(|existing| existing.y_note < row.y_note);
        data.note_rows.insert(index, row);
        Some(index)
    }

    /// Shift every row's pitch
    pub fn transpose(&mut self, semitones: i32) {
        if let Some(data) = self.instrument_mut() {
            for row in &mut data.note_rows {
                row.y_note += semitones;
            }
        }
    }

    /// Change the loop length, dropping notes and automation beyond it
    pub fn set_length(&mut self, new_length: u32) {
        let new_length = new_length.max(1);
        if new_length < self.loop_length {
            if let Some(data) = self.instrument_mut() {
                for row in &mut data.note_rows {
                    row.notes.retain(|note| note.pos < new_length);
                    for note in &mut row.notes {
                        note.length = note.length.min(new_length - note.pos);
                    }
                }
            }
            self.param_manager.trim_automation_to_length(new_length);
        }
        self.loop_length = new_length;
    }

    /// Double the loop, repeating its notes and automation
    pub fn double_length(&mut self) {
        let old_length = self.loop_length;
        let Some(new_length) = old_length.checked_mul(2) else {
            return;
        };
        if let Some(data) = self.instrument_mut() {
            for row in &mut data.note_rows {
                let copies: Vec<SequencedNote> = row
                    .notes
                    .iter()
                    .map(|note| SequencedNote {
                        pos: note.pos + old_length,
                        ..*note
                    })
                    .collect();
                row.notes.extend(copies);
            }
        }
        self.param_manager.duplicate_automation(old_length);
        self.loop_length = new_length;
    }

    /// Ticks from `pos` to the clip's next loop boundary, assuming it started at 0
    pub fn ticks_until_loop_end(&self, pos: u32) -> u32 {
        self.loop_length - pos % self.loop_length
    }
}
