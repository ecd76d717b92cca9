// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Scale and mode-note engine.
//!
//! A song's scale is a sorted, duplicate-free set of semitone offsets
//! (0-11) above a root note. Clips in key mode display one row per mode
//! note, so conversions between absolute pitch ("y note") and row index
//! ("y visual") go through here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Note names (pitch classes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Note {
    C,
    Cs, // C# / Db
    D,
    Ds, // D# / Eb
    E,
    F,
    Fs, // F# / Gb
    G,
    Gs, // G# / Ab
    A,
    As, // A# / Bb
    B,
}

impl Note {
    /// All notes in chromatic order
    pub const ALL: [Note; 12] = [
        Note::C,
        Note::Cs,
        Note::D,
        Note::Ds,
        Note::E,
        Note::F,
        Note::Fs,
        Note::G,
        Note::Gs,
        Note::A,
        Note::As,
        Note::B,
    ];

    /// Pitch class of any (possibly negative) MIDI-style note number
    pub fn from_y_note(y_note: i32) -> Self {
        Note::ALL[y_note.rem_euclid(12) as usize]
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Note::C => "C",
            Note::Cs => "C#",
            Note::D => "D",
            Note::Ds => "D#",
            Note::E => "E",
            Note::F => "F",
            Note::Fs => "F#",
            Note::G => "G",
            Note::Gs => "G#",
            Note::A => "A",
            Note::As => "A#",
            Note::B => "B",
        };
        write!(f, "{name}")
    }
}

/// Preset scale types the user can cycle through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleType {
    // Major scale and modes
    Major,        // Ionian
    NaturalMinor, // Aeolian
    Dorian,       // Minor with raised 6th
    Phrygian,     // Minor with lowered 2nd
    Lydian,       // Major with raised 4th
    Mixolydian,   // Major with lowered 7th
    Locrian,      // Diminished

    // Other minor scales
    HarmonicMinor,
    MelodicMinor, // Ascending form

    // Pentatonic scales
    MajorPentatonic,
    MinorPentatonic,

    Blues,
    WholeTone,
}

/// Order used by [`ScaleState::cycle_through_scales`]
pub const PRESET_SCALES: [ScaleType; 13] = [
    ScaleType::Major,
    ScaleType::NaturalMinor,
    ScaleType::Dorian,
    ScaleType::Phrygian,
    ScaleType::Lydian,
    ScaleType::Mixolydian,
    ScaleType::Locrian,
    ScaleType::HarmonicMinor,
    ScaleType::MelodicMinor,
    ScaleType::MajorPentatonic,
    ScaleType::MinorPentatonic,
    ScaleType::Blues,
    ScaleType::WholeTone,
];

impl ScaleType {
    /// Get the intervals (semitones from root) for this scale type
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ScaleType::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleType::NaturalMinor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleType::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleType::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            ScaleType::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            ScaleType::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScaleType::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            ScaleType::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            ScaleType::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11],
            ScaleType::MajorPentatonic => &[0, 2, 4, 7, 9],
            ScaleType::MinorPentatonic => &[0, 3, 5, 7, 10],
            ScaleType::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleType::WholeTone => &[0, 2, 4, 6, 8, 10],
        }
    }

    /// Get a human-readable name for this scale type
    pub fn name(self) -> &'static str {
        match self {
            ScaleType::Major => "Major",
            ScaleType::NaturalMinor => "Minor",
            ScaleType::Dorian => "Dorian",
            ScaleType::Phrygian => "Phrygian",
            ScaleType::Lydian => "Lydian",
            ScaleType::Mixolydian => "Mixolydian",
            ScaleType::Locrian => "Locrian",
            ScaleType::HarmonicMinor => "Harmonic Minor",
            ScaleType::MelodicMinor => "Melodic Minor",
            ScaleType::MajorPentatonic => "Major Pentatonic",
            ScaleType::MinorPentatonic => "Minor Pentatonic",
            ScaleType::Blues => "Blues",
            ScaleType::WholeTone => "Whole Tone",
        }
    }
}

impl fmt::Display for ScaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Rejected scale edits and unknown scale names
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScaleError {
    #[error("the root note cannot be removed from or moved within the mode")]
    RootIsFixed,
    #[error("semitone {0} is not in the mode")]
    NoteNotInMode(u8),
    #[error("semitone {0} is outside the octave")]
    OutOfRange(u8),
    #[error("scale degree {0} does not exist")]
    InvalidDegree(usize),
    #[error("moving degree {degree} by {offset} would collide with or cross a neighbour")]
    WouldCollide { degree: usize, offset: i8 },
    #[error("unknown scale \"{0}\"")]
    UnknownScale(String),
}

impl FromStr for ScaleType {
    type Err = ScaleError;

    /// Accepts names like "major", "Harmonic Minor" or "whole-tone"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace([' ', '-', '_'], "");
        match key.as_str() {
            "major" | "ionian" => Ok(ScaleType::Major),
            "minor" | "naturalminor" | "aeolian" => Ok(ScaleType::NaturalMinor),
            "dorian" => Ok(ScaleType::Dorian),
            "phrygian" => Ok(ScaleType::Phrygian),
            "lydian" => Ok(ScaleType::Lydian),
            "mixolydian" => Ok(ScaleType::Mixolydian),
            "locrian" => Ok(ScaleType::Locrian),
            "harmonicminor" => Ok(ScaleType::HarmonicMinor),
            "melodicminor" => Ok(ScaleType::MelodicMinor),
            "majorpentatonic" | "pentatonicmajor" => Ok(ScaleType::MajorPentatonic),
            "minorpentatonic" | "pentatonicminor" | "pentatonic" => Ok(ScaleType::MinorPentatonic),
            "blues" => Ok(ScaleType::Blues),
            "wholetone" => Ok(ScaleType::WholeTone),
            _ => Err(ScaleError::UnknownScale(s.trim().to_string())),
        }
    }
}

/// The song's active scale: mode notes plus root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleState {
    mode_notes: [u8; 12],
    num_mode_notes: u8,
    root_note: i32,
}

impl ScaleState {
    /// Create a scale from a preset
    pub fn new(root_note: i32, scale_type: ScaleType) -> Self {
        let mut state = Self {
            mode_notes: [0; 12],
            num_mode_notes: 0,
            root_note,
        };
        state.load_intervals(scale_type.intervals());
        state
    }

    /// Build a scale from untrusted mode notes, repairing them.
    ///
    /// Values outside the octave are dropped, the rest are sorted and
    /// deduplicated, and the root (0) is always present. Returns the scale
    /// and whether anything had to be repaired.
    pub fn from_untrusted(root_note: i32, notes: &[u8]) -> (Self, bool) {
        let mut present = [false; 12];
        let mut repaired = false;
        for &note in notes {
            if note < 12 {
                repaired |= present[note as usize];
                present[note as usize] = true;
            } else {
                repaired = true;
            }
        }
        if !present[0] {
            present[0] = true;
            repaired = true;
        }
        repaired |= notes.windows(2).any(|pair| pair[0] >= pair[1]);

        let mut state = Self {
            mode_notes: [0; 12],
            num_mode_notes: 0,
            root_note,
        };
        for semitone in (0..12u8).filter(|&semitone| present[semitone as usize]) {
            state.mode_notes[state.num_mode_notes as usize] = semitone;
            state.num_mode_notes += 1;
        }
        (state, repaired)
    }

    fn load_intervals(&mut self, intervals: &[u8]) {
        self.num_mode_notes = intervals.len() as u8;
        self.mode_notes = [0; 12];
        self.mode_notes[..intervals.len()].copy_from_slice(intervals);
    }

    /// Semitone offsets of the mode, ascending
    pub fn mode_notes(&self) -> &[u8] {
        &self.mode_notes[..self.num_mode_notes as usize]
    }

    pub fn num_mode_notes(&self) -> usize {
        self.num_mode_notes as usize
    }

    pub fn root_note(&self) -> i32 {
        self.root_note
    }

    pub fn set_root_note(&mut self, root_note: i32) {
        self.root_note = root_note;
    }

    /// Add a semitone to the mode, keeping it sorted. Adding a present note is a no-op.
    pub fn add_mode_note(&mut self, mode_note: u8) -> Result<(), ScaleError> {
        if mode_note >= 12 {
            return Err(ScaleError::OutOfRange(mode_note));
        }
        self.insert_mode_note(mode_note);
        Ok(())
    }

    /// Insert a semitone already known to be below 12
    fn insert_mode_note(&mut self, mode_note: u8) {
        let count = self.num_mode_notes();
        if let Err(index) = self.mode_notes[..count].binary_search(&mode_note) {
            self.mode_notes.copy_within(index..count, index + 1);
            self.mode_notes[index] = mode_note;
            self.num_mode_notes += 1;
        }
    }

    /// Remove a semitone from the mode. The root can never be removed.
    pub fn remove_y_note_from_mode(&mut self, y_note_within_octave: u8) -> Result<(), ScaleError> {
        if y_note_within_octave == 0 {
            return Err(ScaleError::RootIsFixed);
        }
        let count = self.num_mode_notes();
        let index = self.mode_notes[..count]
            .binary_search(&y_note_within_octave)
            .map_err(|_| ScaleError::NoteNotInMode(y_note_within_octave))?;
        self.mode_notes.copy_within(index + 1..count, index);
        self.num_mode_notes -= 1;
        self.mode_notes[self.num_mode_notes as usize] = 0;
        Ok(())
    }

    /// Whether a scale degree may move by `offset` semitones without
    /// colliding with or crossing a neighbouring degree
    pub fn may_move_mode_note(&self, degree: usize, offset: i8) -> bool {
        if degree == 0 || degree >= self.num_mode_notes() || offset == 0 {
            return false;
        }
        let target = self.mode_notes[degree] as i32 + offset as i32;
        let lower = self.mode_notes[degree - 1] as i32;
        let upper = if degree + 1 < self.num_mode_notes() {
            self.mode_notes[degree + 1] as i32
        } else {
            12
        };
        target > lower && target < upper
    }

    /// Shift one scale degree by a signed number of semitones
    pub fn change_musical_mode(&mut self, degree: usize, change: i8) -> Result<(), ScaleError> {
        if degree == 0 {
            return Err(ScaleError::RootIsFixed);
        }
        if degree >= self.num_mode_notes() {
            return Err(ScaleError::InvalidDegree(degree));
        }
        if !self.may_move_mode_note(degree, change) {
            return Err(ScaleError::WouldCollide {
                degree,
                offset: change,
            });
        }
        self.mode_notes[degree] = (self.mode_notes[degree] as i32 + change as i32) as u8;
        Ok(())
    }

    /// Add whichever of semitones `i` / `i + 1` the present notes call for.
    ///
    /// If the lower one is used it goes in, plus the upper one if that is
    /// used too. Otherwise the upper one goes in when preferred or used.
    pub fn add_major_dependent_mode_notes(&mut self, i: u8, prefer_higher: bool, present: &[bool; 12]) {
        let lower = i as usize;
        let upper = lower + 1;
        if upper >= 12 {
            return;
        }
        if present[lower] {
            self.insert_mode_note(i);
            if present[upper] {
                self.insert_mode_note(i + 1);
            }
        } else if prefer_higher || present[upper] {
            self.insert_mode_note(i + 1);
        } else {
            self.insert_mode_note(i);
        }
    }

    /// Rebuild the mode from the pitch classes (relative to the root) that
    /// clips actually use. Major-ness is judged from the thirds; the second,
    /// sixth and seventh follow from it.
    pub fn derive_mode_from_present_notes(&mut self, present: &[bool; 12]) {
        self.num_mode_notes = 0;
        self.mode_notes = [0; 12];
        self.insert_mode_note(0);

        let major_third = present[4];
        let minor_third = present[3];

        self.add_major_dependent_mode_notes(1, true, present);

        match (minor_third, major_third) {
            (true, true) => {
                self.insert_mode_note(3);
                self.insert_mode_note(4);
            }
            (true, false) => self.insert_mode_note(3),
            _ => self.insert_mode_note(4),
        }

        // Fourth: perfect unless only the augmented one is used
        if present[5] {
            self.insert_mode_note(5);
            if present[6] {
                self.insert_mode_note(6);
            }
        } else if present[6] {
            self.insert_mode_note(6);
        } else {
            self.insert_mode_note(5);
        }

        self.insert_mode_note(7);

        let prefer_major = major_third || !minor_third;
        self.add_major_dependent_mode_notes(8, prefer_major, present);
        self.add_major_dependent_mode_notes(10, prefer_major, present);
    }

    /// Semitone of a note relative to the root, within one octave
    pub fn y_note_within_octave(&self, y_note: i32) -> u8 {
        (y_note - self.root_note).rem_euclid(12) as u8
    }

    pub fn mode_contains_y_note_within_octave(&self, y_note_within_octave: u8) -> bool {
        self.mode_notes().binary_search(&y_note_within_octave).is_ok()
    }

    /// Whether a pitch is in the scale
    pub fn mode_contains_y_note(&self, y_note: i32) -> bool {
        self.mode_contains_y_note_within_octave(self.y_note_within_octave(y_note))
    }

    /// Chromatic mode allows everything; key mode only in-scale notes
    pub fn is_y_note_allowed(&self, y_note: i32, in_key_mode: bool) -> bool {
        !in_key_mode || self.mode_contains_y_note(y_note)
    }

    /// Whether a pitch sits on the given in-key row within its octave
    pub fn y_note_is_y_visual_within_octave(&self, y_note: i32, y_visual_within_octave: usize) -> bool {
        self.mode_notes()
            .get(y_visual_within_octave)
            .is_some_and(|&semitone| semitone == self.y_note_within_octave(y_note))
    }

    /// Row index for a pitch. Out-of-scale notes land on the degree below.
    pub fn get_y_visual_from_y_note(&self, y_note: i32, in_key_mode: bool) -> i32 {
        if !in_key_mode {
            return y_note;
        }
        let relative = y_note - self.root_note;
        let within_octave = relative.rem_euclid(12) as u8;
        let octave = relative.div_euclid(12);
        let degree = self
            .mode_notes()
            .iter()
            .rposition(|&semitone| semitone <= within_octave)
            .unwrap_or(0);
        degree as i32 + octave * self.num_mode_notes() as i32
    }

    /// Pitch for a row index
    pub fn get_y_note_from_y_visual(&self, y_visual: i32, in_key_mode: bool) -> i32 {
        if !in_key_mode {
            return y_visual;
        }
        let count = self.num_mode_notes() as i32;
        let octave = y_visual.div_euclid(count);
        let degree = y_visual.rem_euclid(count) as usize;
        self.mode_notes[degree] as i32 + self.root_note + octave * 12
    }

    /// Which preset the mode currently matches, if any
    pub fn current_preset_scale(&self) -> Option<ScaleType> {
        PRESET_SCALES
            .iter()
            .copied()
            .find(|preset| preset.intervals() == self.mode_notes())
    }

    /// Move to the next preset whose notes differ from the current mode.
    /// From a non-preset mode this starts at the first preset.
    pub fn cycle_through_scales(&mut self) -> ScaleType {
        let start = self
            .current_preset_scale()
            .and_then(|current| PRESET_SCALES.iter().position(|&preset| preset == current))
            .unwrap_or(PRESET_SCALES.len() - 1);

        let next = (1..=PRESET_SCALES.len())
            .map(|step| PRESET_SCALES[(start + step) % PRESET_SCALES.len()])
            .find(|preset| preset.intervals() != self.mode_notes())
            .unwrap_or(PRESET_SCALES[0]);
        self.load_intervals(next.intervals());
        next
    }

    /// Load a preset directly
    pub fn set_preset(&mut self, scale_type: ScaleType) {
        self.load_intervals(scale_type.intervals());
    }

    /// Transpose the root by semitones
    pub fn transpose_root(&mut self, offset: i32) {
        self.root_note += offset;
    }
}

impl Default for ScaleState {
    fn default() -> Self {
        ScaleState::new(0, ScaleType::Major)
    }
}

impl fmt::Display for ScaleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = Note::from_y_note(self.root_note);
        match self.current_preset_scale() {
            Some(preset) => write!(f, "{root} {preset}"),
            None => write!(f, "{root} custom {:?}", self.mode_notes()),
        }
    }
}
