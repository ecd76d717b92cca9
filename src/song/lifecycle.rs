// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Output lifecycle: adding, replacing, retiring and destroying outputs.
//!
//! Retiring an output either parks it for reuse or destroys it. Destroying
//! always purges its backed-up parameters before returning.

use tracing::{debug, info, warn};

use super::{Action, Song};
use crate::error::{SongError, SongResult};
use crate::ids::OutputId;
use crate::params::ParamManager;
use crate::sequencer::{
    AddPosition, Clip, Output, OutputKind, OutputLocation, PresetKey, SearchScope,
};

/// Options for [`Song::replace_instrument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOptions {
    /// Keep kit rows with learned MIDI input even when the new kit has no matching drum
    pub keep_note_rows_with_midi_input: bool,
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            keep_note_rows_with_midi_input: true,
        }
    }
}

/// Which outputs an output search may return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Availability {
    #[default]
    Any,
    /// No session clip plays through it
    AvailableInSession,
    /// No clip or timeline instance uses it
    Unused,
}

/// Point a clip at a replacement output, re-binding kit rows by drum name
fn rebind_clip(clip: &mut Clip, new_output: &Output, options: ReplaceOptions) {
    clip.output = new_output.id;
    let new_is_kit = new_output.kind == OutputKind::Kit;
    let Some(data) = clip.instrument_mut() else {
        return;
    };
    data.note_rows.retain_mut(|row| {
        let Some(drum_name) = row.drum_name.clone() else {
            return true;
        };
        if !new_is_kit {
            row.drum = None;
            row.drum_name = None;
            return true;
        }
        match new_output.drum_by_name(&drum_name) {
            Some(drum) => {
                row.drum = Some(drum.mod_controllable);
                true
            }
            None => {
                row.drum = None;
                options.keep_note_rows_with_midi_input && row.learned_midi.is_some()
            }
        }
    });
}

impl Song {
    /// Add an output to the active list
    pub fn add_output(&mut self, output: Output, position: AddPosition) -> SongResult<()> {
        if self.outputs.len() >= self.max_outputs {
            return Err(SongError::CapacityExceeded {
                what: "outputs",
                limit: self.max_outputs,
            });
        }
        debug!(output = %output.id, kind = %output.kind, "output added");
        self.outputs.add_output(output, position)
    }

    /// Unlink an output from the active list without destroying it
    pub fn remove_output_from_main_list(&mut self, id: OutputId) -> Option<(usize, Output)> {
        self.outputs.remove_output_from_main_list(id)
    }

    pub fn get_output_index(&self, id: OutputId) -> Option<usize> {
        self.outputs.index_of(id)
    }

    pub fn get_output_from_index(&self, index: usize) -> Option<&Output> {
        self.outputs.get_from_index(index)
    }

    /// Drop an output for good, releasing its backed-up parameters
    fn destroy_output(&mut self, output: Output) {
        for entity in output.mod_controllables() {
            self.backups.delete_for_mod_controllable(entity);
        }
        debug!(output = %output.id, kind = %output.kind, "output destroyed");
    }

    /// Retire an output that is no longer in the active list.
    ///
    /// Synths and kits go to the hibernation pool, MIDI outputs to the
    /// hibernating-MIDI slot; CV and audio outputs are destroyed. An output
    /// still referenced by a clip goes back to the end of the active list.
    /// Undo history that would restore clips onto it is discarded.
    pub fn delete_or_hibernate_output(&mut self, output: Output) -> SongResult<()> {
        self.retire_output(output, None)
    }

    fn retire_output(&mut self, output: Output, list_index: Option<usize>) -> SongResult<()> {
        if self.clips.clips_for_output(output.id).next().is_some() {
            let id = output.id;
            let index = list_index.unwrap_or(self.outputs.len());
            self.outputs.insert_output(index, output)?;
            return Err(SongError::InvalidOperation(format!(
                "{id} still has clips and cannot be retired"
            )));
        }
        self.discard_actions_referencing_output(output.id);
        match output.kind {
            kind if kind.can_hibernate() => {
                info!(output = %output.id, name = %output.name, "output hibernated");
                for retired in self.outputs.hibernate(output) {
                    self.destroy_output(retired);
                }
            }
            OutputKind::MidiOut => {
                info!(output = %output.id, "MIDI output hibernated");
                if let Some(previous) = self.outputs.set_hibernating_midi(output) {
                    self.destroy_output(previous);
                }
            }
            _ => self.destroy_output(output),
        }
        Ok(())
    }

    /// Remove an active output and retire it
    pub fn delete_output_that_is_in_main_list(&mut self, id: OutputId) -> SongResult<()> {
        let (index, output) = self
            .outputs
            .remove_output_from_main_list(id)
            .ok_or(SongError::OutputNotFound(id))?;
        self.retire_output(output, Some(index))
    }

    /// Retire an active output if nothing plays through it
    pub fn delete_or_hibernate_output_if_no_clips(&mut self, id: OutputId) -> SongResult<bool> {
        let unused = self.outputs.get(id).is_some_and(|output| output.clip_instances.is_empty())
            && !self.does_output_have_any_clips(id);
        if unused {
            self.delete_output_that_is_in_main_list(id)?;
        }
        Ok(unused)
    }

    /// Retire every output with no clips and no arrangement instances
    pub fn delete_sounds_which_wont_sound(&mut self) -> SongResult<usize> {
        let unused: Vec<OutputId> = self
            .outputs
            .outputs()
            .iter()
            .filter(|output| output.clip_instances.is_empty())
            .map(|output| output.id)
            .filter(|id| !self.does_output_have_any_clips(*id))
            .collect();
        for id in &unused {
            self.delete_output_that_is_in_main_list(*id)?;
        }
        Ok(unused.len())
    }

    /// Find an output matching a preset reference in the chosen lists
    pub fn get_instrument_from_preset_slot(
        &self,
        key: &PresetKey<'_>,
        scope: SearchScope,
    ) -> Option<(OutputLocation, OutputId)> {
        let location = self.outputs.find_preset(key, scope)?;
        let id = match location {
            OutputLocation::Active(index) => self.outputs.outputs()[index].id,
            OutputLocation::Hibernating(index) => self.outputs.hibernating()[index].id,
        };
        Some((location, id))
    }

    /// Bring a hibernating output back into the active list
    pub fn revive_hibernating_output(&mut self, id: OutputId, position: AddPosition) -> SongResult<()> {
        let mut output = self
            .outputs
            .take_hibernating_by_id(id)
            .ok_or(SongError::OutputNotFound(id))?;
        output.in_valid_state = true;
        self.add_output(output, position)
    }

    /// Drop a hibernating preset by kind and name
    pub fn delete_hibernating_instrument_with_slot(&mut self, kind: OutputKind, name: &str) -> bool {
        let key = PresetKey {
            kind,
            slot: 0,
            sub_slot: -1,
            name,
            dir_path: "",
        };
        let found = self
            .outputs
            .find_preset(&key, SearchScope::HibernatingOnly)
            .and_then(|location| match location {
                OutputLocation::Hibernating(index) => self.outputs.take_hibernating(index),
                OutputLocation::Active(_) => None,
            });
        match found {
            Some(output) => {
                self.destroy_output(output);
                true
            }
            None => false,
        }
    }

    /// Take the parked MIDI output, re-pointed at a channel
    pub fn grab_hibernating_midi_instrument(&mut self, slot: i32, sub_slot: i32) -> Option<Output> {
        let mut output = self.outputs.grab_hibernating_midi()?;
        output.slot = slot;
        output.sub_slot = sub_slot;
        output.in_valid_state = true;
        Some(output)
    }

    /// Park a MIDI output, destroying whatever was parked before
    pub fn set_hibernating_midi_instrument(&mut self, output: Output) -> SongResult<()> {
        if output.kind != OutputKind::MidiOut {
            return Err(SongError::InvalidOperation(format!(
                "{} is not a MIDI output",
                output.id
            )));
        }
        if let Some(previous) = self.outputs.set_hibernating_midi(output) {
            self.destroy_output(previous);
        }
        Ok(())
    }

    /// An instrument of the given kind to switch an output to: reused from
    /// the pool when possible, otherwise newly made
    pub fn get_non_audio_instrument_to_switch_to(&mut self, kind: OutputKind) -> SongResult<Output> {
        let reused = match kind {
            OutputKind::Audio => {
                return Err(SongError::InvalidOperation(
                    "audio outputs are not instruments".into(),
                ))
            }
            OutputKind::MidiOut => self.grab_hibernating_midi_instrument(0, -1),
            OutputKind::Synth | OutputKind::Kit => self
                .outputs
                .hibernating()
                .iter()
                .rposition(|output| output.kind == kind)
                .and_then(|index| self.outputs.take_hibernating(index)),
            OutputKind::Cv => None,
        };
        if let Some(mut output) = reused {
            output.in_valid_state = true;
            debug!(output = %output.id, %kind, "reusing hibernated instrument");
            return Ok(output);
        }
        let id = self.ids.output();
        let mod_controllable = self.ids.mod_controllable();
        let name = match kind {
            OutputKind::Synth => "SYNTH",
            OutputKind::Kit => "KIT",
            _ => "",
        };
        Ok(Output::new(id, kind, mod_controllable, name))
    }

    /// Create an audio output named after the first free number
    pub fn create_new_audio_output(&mut self) -> SongResult<OutputId> {
        let number = (1..)
            .find(|n| {
                let candidate = format!("AUDIO{n}");
                !self
                    .outputs
                    .outputs()
                    .iter()
                    .any(|output| output.kind == OutputKind::Audio && output.name == candidate)
            })
            .unwrap_or(1);
        let id = self.ids.output();
        let mod_controllable = self.ids.mod_controllable();
        let output = Output::new(id, OutputKind::Audio, mod_controllable, format!("AUDIO{number}"));
        self.add_output(output, AddPosition::Start)?;
        Ok(id)
    }

    fn output_meets(&self, output: &Output, availability: Availability) -> bool {
        match availability {
            Availability::Any => true,
            Availability::AvailableInSession => {
                !self.clips.session().iter().any(|clip| clip.output == output.id)
            }
            Availability::Unused => {
                output.clip_instances.is_empty() && !self.does_output_have_any_clips(output.id)
            }
        }
    }

    /// Find an active audio output by name, ignoring case
    pub fn get_audio_output_from_name(&self, name: &str) -> Option<OutputId> {
        self.outputs
            .outputs()
            .iter()
            .find(|output| output.kind == OutputKind::Audio && output.name.eq_ignore_ascii_case(name))
            .map(|output| output.id)
    }

    pub fn get_first_audio_output(&self) -> Option<OutputId> {
        self.outputs
            .outputs()
            .iter()
            .find(|output| output.kind == OutputKind::Audio)
            .map(|output| output.id)
    }

    /// Step through the active list from `old` toward the next audio output
    /// meeting `availability`, wrapping at either end. A negative `offset`
    /// walks backwards. Returns `None` when no other output qualifies.
    pub fn get_next_audio_output(
        &self,
        offset: i32,
        old: OutputId,
        availability: Availability,
    ) -> Option<OutputId> {
        let outputs = self.outputs.outputs();
        let len = outputs.len();
        let start = self.outputs.index_of(old)?;
        let step = if offset < 0 { len - 1 } else { 1 };
        (1..len)
            .map(|n| &outputs[(start + n * step) % len])
            .find(|output| output.kind == OutputKind::Audio && self.output_meets(output, availability))
            .map(|output| output.id)
    }

    /// Substitute `new_output` for `old_id` across every clip and the timeline.
    ///
    /// Kit rows are re-bound to the new kit's drums by name. Afterwards no
    /// clip, instance or list entry may still refer to the old output; if
    /// one does the song is inconsistent and the error is fatal.
    pub fn replace_instrument(
        &mut self,
        old_id: OutputId,
        mut new_output: Output,
        options: ReplaceOptions,
    ) -> SongResult<()> {
        let new_id = new_output.id;
        if self.outputs.contains(new_id) {
            return Err(SongError::InvalidOperation(format!(
                "{new_id} is already owned by the song"
            )));
        }
        let (index, mut old_output) = self
            .outputs
            .remove_output_from_main_list(old_id)
            .ok_or(SongError::OutputNotFound(old_id))?;

        new_output.clip_instances = std::mem::take(&mut old_output.clip_instances);
        new_output.active_clip = old_output.active_clip.take();
        new_output.soloing_in_arrangement = old_output.soloing_in_arrangement;
        new_output.muted_in_arrangement = old_output.muted_in_arrangement;
        new_output.in_valid_state = true;

        for clip in self.clips.iter_mut().filter(|clip| clip.output == old_id) {
            rebind_clip(clip, &new_output, options);
        }
        for action in self.actions.iter_mut() {
            if let Action::ArrangementCleared {
                truncations,
                orphaned_clips,
                ..
            } = action
            {
                for (output, _) in truncations.iter_mut().filter(|(output, _)| *output == old_id) {
                    *output = new_id;
                }
                for clip in orphaned_clips.iter_mut().filter(|clip| clip.output == old_id) {
                    rebind_clip(clip, &new_output, options);
                }
            }
        }

        self.outputs.insert_output(index, new_output)?;
        self.delete_or_hibernate_output(old_output)?;

        let dangling = self.clips.iter().any(|clip| clip.output == old_id)
            || self.outputs.index_of(old_id).is_some()
            || self.actions.iter().any(|action| action.references_output(old_id));
        if dangling {
            return Err(SongError::Consistency(format!(
                "{old_id} still referenced after replacement by {new_id}"
            )));
        }
        info!(old = %old_id, new = %new_id, "instrument replaced");
        Ok(())
    }

    /// Switch an output to another instrument kind, keeping its clips
    pub fn change_instrument_type(&mut self, old_id: OutputId, new_kind: OutputKind) -> SongResult<OutputId> {
        let old_kind = self
            .outputs
            .get(old_id)
            .map(|output| output.kind)
            .ok_or(SongError::OutputNotFound(old_id))?;
        if old_kind == new_kind {
            return Ok(old_id);
        }
        let new_output = self.get_non_audio_instrument_to_switch_to(new_kind)?;
        let new_id = new_output.id;
        self.replace_instrument(old_id, new_output, ReplaceOptions::default())?;
        Ok(new_id)
    }

    /// Highest MIDI channel suffix in use on a channel, or -1
    pub fn get_max_midi_channel_suffix(&self, channel: i32) -> i32 {
        self.outputs
            .outputs()
            .iter()
            .filter(|output| output.kind == OutputKind::MidiOut && output.slot == channel)
            .map(|output| output.sub_slot)
            .max()
            .unwrap_or(-1)
    }

    pub fn mark_all_instruments_as_edited(&mut self) {
        for output in self
            .outputs
            .outputs_mut()
            .iter_mut()
            .filter(|output| output.kind.is_instrument())
        {
            output.edited = true;
        }
    }

    pub fn set_default_velocity_for_all_instruments(&mut self, velocity: u8) {
        let velocity = velocity.clamp(1, 127);
        for output in self
            .outputs
            .outputs_mut()
            .iter_mut()
            .filter(|output| output.kind.is_instrument())
        {
            output.default_velocity = velocity;
        }
    }

    /// Give every clip-less instrument a backed-up parameter set.
    ///
    /// An instrument with neither has lost its parameters; it gets an empty
    /// set so it stays usable. Returns how many were repaired.
    pub fn ensure_all_instruments_have_a_clip_or_backed_up_param_manager(&mut self) -> usize {
        let needing: Vec<_> = self
            .outputs
            .outputs()
            .iter()
            .chain(self.outputs.hibernating().iter())
            .filter(|output| output.kind.is_instrument())
            .filter(|output| !self.clips.iter().any(|clip| clip.output == output.id))
            .filter(|output| !self.backups.contains_entity(output.mod_controllable))
            .map(|output| (output.id, output.mod_controllable))
            .collect();
        for (id, entity) in &needing {
            warn!(output = %id, "instrument had no clip or parameters, created empty set");
            self.backups.insert(*entity, None, ParamManager::new());
        }
        needing.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrangement::ClipInstance;
    use crate::ids::ClipId;
    use crate::midi::LearnedMidi;
    use crate::song::LogAction;
    use crate::sequencer::{Clip, NoteRow};

    fn add_output(song: &mut Song, kind: OutputKind, name: &str) -> OutputId {
        let id = song.ids().output();
        let mc = song.ids().mod_controllable();
        song.add_output(Output::new(id, kind, mc, name), AddPosition::End).unwrap();
        id
    }

    fn add_clip(song: &mut Song, output: OutputId) -> ClipId {
        let id = song.ids().clip();
        song.clips.push_session(Clip::new_instrument(id, output, 384)).unwrap();
        id
    }

    #[test]
    fn test_hibernation_policy_by_kind() {
        let mut song = Song::default();
        let synth = add_output(&mut song, OutputKind::Synth, "Pad");
        let cv = add_output(&mut song, OutputKind::Cv, "");
        let midi = add_output(&mut song, OutputKind::MidiOut, "");

        song.delete_output_that_is_in_main_list(synth).unwrap();
        song.delete_output_that_is_in_main_list(cv).unwrap();
        song.delete_output_that_is_in_main_list(midi).unwrap();

        assert_eq!(song.outputs().hibernating().len(), 1);
        assert!(song.outputs().hibernating_midi().is_some());
        assert!(!song.outputs().contains(cv));
        assert!(song.outputs().is_empty());
    }

    #[test]
    fn test_cannot_retire_output_with_clips() {
        let mut song = Song::default();
        let synth = add_output(&mut song, OutputKind::Synth, "Lead");
        add_output(&mut song, OutputKind::Kit, "Drums");
        add_clip(&mut song, synth);
        let result = song.delete_output_that_is_in_main_list(synth);
        assert!(matches!(result, Err(SongError::InvalidOperation(_))));
        assert_eq!(song.get_output_index(synth), Some(0));
    }

    fn cleared_arrangement_clip(song: &mut Song, output: OutputId) -> ClipId {
        let id = song.ids().clip();
        song.add_arrangement_only_clip(Clip::new_instrument(id, output, 384)).unwrap();
        song.place_clip_instance(output, ClipInstance::new(384, 384, Some(id))).unwrap();
        let entity = song.output(output).unwrap().mod_controllable;
        song.backups_mut().insert(entity, Some(id), ParamManager::new());
        song.clear_arrangement_beyond_pos(0, LogAction::Record);
        assert!(song.clip(id).is_none());
        id
    }

    #[test]
    fn test_retiring_output_drops_undo_of_its_clips() {
        let mut song = Song::default();
        let synth = add_output(&mut song, OutputKind::Synth, "Lead");
        let orphan = cleared_arrangement_clip(&mut song, synth);

        assert!(song.delete_or_hibernate_output_if_no_clips(synth).unwrap());
        assert_eq!(song.undo_depth(), 0);
        assert!(!song.backups().references_clip(orphan));
        assert!(!song.undo().unwrap());
        assert!(song.clip(orphan).is_none());
        assert!(song.check_consistency().is_ok());
    }

    #[test]
    fn test_replace_repoints_undo_history() {
        let mut song = Song::default();
        let synth = add_output(&mut song, OutputKind::Synth, "Lead");
        let orphan = cleared_arrangement_clip(&mut song, synth);

        let new_id = song.ids().output();
        let new_mc = song.ids().mod_controllable();
        let replacement = Output::new(new_id, OutputKind::Synth, new_mc, "Bass");
        song.replace_instrument(synth, replacement, ReplaceOptions::default()).unwrap();

        assert!(song.undo().unwrap());
        assert_eq!(song.clip(orphan).unwrap().output, new_id);
        assert!(song.output(new_id).unwrap().clip_instances.references_clip(orphan));
        assert!(song.check_consistency().is_ok());
    }

    #[test]
    fn test_undo_onto_unlinked_output_changes_nothing() {
        let mut song = Song::default();
        let synth = add_output(&mut song, OutputKind::Synth, "Lead");
        let orphan = cleared_arrangement_clip(&mut song, synth);
        let (_, unlinked) = song.remove_output_from_main_list(synth).unwrap();

        assert!(matches!(song.undo(), Err(SongError::OutputNotFound(id)) if id == synth));
        assert!(song.clip(orphan).is_none());
        assert_eq!(song.undo_depth(), 0);
        song.add_output(unlinked, AddPosition::End).unwrap();
        assert!(song.check_consistency().is_ok());
    }

    #[test]
    fn test_destroy_purges_backups() {
        let mut song = Song::default();
        let cv = add_output(&mut song, OutputKind::Cv, "");
        let entity = song.output(cv).unwrap().mod_controllable;
        song.backups_mut().insert(entity, None, ParamManager::new());
        song.delete_output_that_is_in_main_list(cv).unwrap();
        assert!(!song.backups().contains_entity(entity));
    }

    #[test]
    fn test_preset_lookup_and_revive() {
        let mut song = Song::default();
        let pad = add_output(&mut song, OutputKind::Synth, "Pad");
        song.delete_output_that_is_in_main_list(pad).unwrap();
        let key = PresetKey {
            kind: OutputKind::Synth,
            slot: 0,
            sub_slot: -1,
            name: "PAD",
            dir_path: "",
        };
        let (location, id) = song
            .get_instrument_from_preset_slot(&key, SearchScope::ActiveAndHibernating)
            .unwrap();
        assert_eq!(location, OutputLocation::Hibernating(0));
        assert_eq!(id, pad);
        song.revive_hibernating_output(id, AddPosition::End).unwrap();
        assert!(song.output(pad).unwrap().in_valid_state);
        assert!(song.outputs().hibernating().is_empty());
    }

    #[test]
    fn test_replace_kit_rebinds_drums() {
        let mut song = Song::default();
        let old_kit = add_output(&mut song, OutputKind::Kit, "Old");
        let old_kick = song.ids().mod_controllable();
        let old_snare = song.ids().mod_controllable();
        song.output_mut(old_kit).unwrap().add_drum("Kick", old_kick);
        song.output_mut(old_kit).unwrap().add_drum("Snare", old_snare);

        let clip = add_clip(&mut song, old_kit);
        {
            let clip = song.clip_mut(clip).unwrap();
            clip.add_note_row(NoteRow::for_drum(0, old_kick, "Kick"));
            let mut snare_row = NoteRow::for_drum(1, old_snare, "Snare");
            snare_row.learned_midi = Some(LearnedMidi::new(9, 38));
            clip.add_note_row(snare_row);
            clip.add_note_row(NoteRow::for_drum(2, old_snare, "Snare"));
        }

        let new_id = song.ids().output();
        let new_mc = song.ids().mod_controllable();
        let new_kick = song.ids().mod_controllable();
        let mut new_kit = Output::new(new_id, OutputKind::Kit, new_mc, "New");
        new_kit.add_drum("kick", new_kick);

        song.replace_instrument(old_kit, new_kit, ReplaceOptions::default()).unwrap();

        let rows = &song.clip(clip).unwrap().instrument().unwrap().note_rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].drum, Some(new_kick));
        assert_eq!(rows[1].drum, None);
        assert!(rows[1].learned_midi.is_some());
        assert_eq!(song.clip(clip).unwrap().output, new_id);
        assert_eq!(song.get_output_index(new_id), Some(0));
        assert_eq!(song.outputs().hibernating().len(), 1);
        assert!(song.check_consistency().is_ok());
    }

    #[test]
    fn test_change_instrument_type() {
        let mut song = Song::default();
        let synth = add_output(&mut song, OutputKind::Synth, "Lead");
        let clip = add_clip(&mut song, synth);
        let midi = song.change_instrument_type(synth, OutputKind::MidiOut).unwrap();
        assert_eq!(song.clip(clip).unwrap().output, midi);
        assert_eq!(song.output(midi).unwrap().kind, OutputKind::MidiOut);
        assert!(song.output(synth).is_none());
        assert!(song.outputs().contains(synth));
    }

    #[test]
    fn test_audio_output_naming_and_capacity() {
        let config = crate::config::EngineConfig {
            max_outputs: 2,
            ..Default::default()
        };
        let mut song = Song::new(&config);
        let first = song.create_new_audio_output().unwrap();
        song.create_new_audio_output().unwrap();
        assert_eq!(song.output(first).unwrap().name, "AUDIO1");
        assert_eq!(song.get_output_from_index(0).unwrap().name, "AUDIO2");
        assert!(matches!(
            song.create_new_audio_output(),
            Err(SongError::CapacityExceeded { limit: 2, .. })
        ));
    }

    #[test]
    fn test_midi_channel_suffix() {
        let mut song = Song::default();
        assert_eq!(song.get_max_midi_channel_suffix(0), -1);
        for suffix in [0, 2] {
            let id = song.ids().output();
            let mc = song.ids().mod_controllable();
            let output = Output::new(id, OutputKind::MidiOut, mc, "").with_slot(0, suffix);
            song.add_output(output, AddPosition::End).unwrap();
        }
        assert_eq!(song.get_max_midi_channel_suffix(0), 2);
    }

    #[test]
    fn test_ensure_instruments_have_params() {
        let mut song = Song::default();
        let synth = add_output(&mut song, OutputKind::Synth, "Lead");
        let with_clip = add_output(&mut song, OutputKind::Synth, "Bass");
        add_clip(&mut song, with_clip);
        assert_eq!(song.ensure_all_instruments_have_a_clip_or_backed_up_param_manager(), 1);
        let entity = song.output(synth).unwrap().mod_controllable;
        assert!(song.backups().get_exact(entity, None).is_some());
        assert_eq!(song.ensure_all_instruments_have_a_clip_or_backed_up_param_manager(), 0);
    }

    #[test]
    fn test_audio_output_lookups() {
        let mut song = Song::default();
        add_output(&mut song, OutputKind::Synth, "Pad");
        let vocals = add_output(&mut song, OutputKind::Audio, "Vocals");
        add_output(&mut song, OutputKind::Kit, "Drums");
        let guitar = add_output(&mut song, OutputKind::Audio, "Guitar");

        assert_eq!(song.get_first_audio_output(), Some(vocals));
        assert_eq!(song.get_audio_output_from_name("GUITAR"), Some(guitar));
        assert_eq!(song.get_audio_output_from_name("Pad"), None);

        assert_eq!(song.get_next_audio_output(1, vocals, Availability::Any), Some(guitar));
        assert_eq!(song.get_next_audio_output(1, guitar, Availability::Any), Some(vocals));
        assert_eq!(song.get_next_audio_output(-1, vocals, Availability::Any), Some(guitar));

        let clip = song.ids().clip();
        song.clips.push_session(Clip::new_audio(clip, guitar, 384, "take.wav")).unwrap();
        assert_eq!(song.get_next_audio_output(1, vocals, Availability::AvailableInSession), None);
        assert_eq!(song.get_next_audio_output(1, vocals, Availability::Unused), None);
        assert_eq!(song.get_next_audio_output(1, guitar, Availability::Unused), Some(vocals));
    }
}
