// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Scale operations that reach into in-key clips.
//!
//! Clips in key mode store absolute pitches; when the scale itself moves
//! their rows move with it. Chromatic clips are never touched.

use tracing::debug;

use super::Song;
use crate::error::SongResult;
use crate::music::ScaleType;

impl Song {
    /// Whether any instrument clip displays its rows in key
    pub fn any_scale_mode_clips(&self) -> bool {
        self.clips.iter().any(|clip| clip.is_in_scale_mode())
    }

    /// Add a semitone to the mode
    pub fn add_mode_note(&mut self, mode_note: u8) -> SongResult<()> {
        self.scale.add_mode_note(mode_note)?;
        Ok(())
    }

    /// Remove a semitone from the mode
    pub fn remove_y_note_from_mode(&mut self, y_note_within_octave: u8) -> SongResult<()> {
        self.scale.remove_y_note_from_mode(y_note_within_octave)?;
        Ok(())
    }

    /// Move one scale degree, taking in-key rows on that degree along
    pub fn change_musical_mode(&mut self, degree: usize, change: i8) -> SongResult<()> {
        let old_semitone = self
            .scale
            .mode_notes()
            .get(degree)
            .copied()
            .unwrap_or_default();
        self.scale.change_musical_mode(degree, change)?;
        let scale = &self.scale;
        for clip in self.clips.iter_mut().filter(|clip| clip.is_in_scale_mode()) {
            if let Some(data) = clip.instrument_mut() {
                for row in data.note_rows.iter_mut().filter(|row| row.drum.is_none()) {
                    if scale.y_note_within_octave(row.y_note) == old_semitone {
                        row.y_note += change as i32;
                    }
                }
            }
        }
        debug!(degree, change, mode = ?self.scale.mode_notes(), "musical mode changed");
        Ok(())
    }

    /// Move the root and every in-key clip by the same interval
    pub fn transpose_all_scale_mode_clips(&mut self, offset: i32) {
        self.scale.transpose_root(offset);
        for clip in self.clips.iter_mut().filter(|clip| clip.is_in_scale_mode()) {
            clip.transpose(offset);
        }
        debug!(offset, root = self.scale.root_note(), "transposed in-key clips");
    }

    /// Pick a new root and derive the mode from the notes in-key clips use.
    ///
    /// If no in-key clip has any notes the current mode is kept.
    pub fn set_root_note(&mut self, new_root: i32) {
        self.scale.set_root_note(new_root);
        let mut present = [false; 12];
        let mut any_notes = false;
        for data in self
            .clips
            .iter()
            .filter(|clip| clip.is_in_scale_mode())
            .filter_map(|clip| clip.instrument())
        {
            for row in data.note_rows.iter().filter(|row| !row.notes.is_empty()) {
                present[self.scale.y_note_within_octave(row.y_note) as usize] = true;
                any_notes = true;
            }
        }
        if any_notes {
            self.scale.derive_mode_from_present_notes(&present);
        }
        debug!(root = new_root, mode = ?self.scale.mode_notes(), "root note set");
    }

    /// Advance to the next preset scale
    pub fn cycle_through_scales(&mut self) -> ScaleType {
        let preset = self.scale.cycle_through_scales();
        debug!(scale = %preset, "cycled scale");
        preset
    }

    /// Load a preset scale directly
    pub fn set_preset_scale(&mut self, preset: ScaleType) {
        self.scale.set_preset(preset);
    }
}
