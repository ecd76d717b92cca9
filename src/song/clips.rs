// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Session clip management: launching, solo, overdubs and removal.

use tracing::{debug, info, warn};

use super::playback::clip_is_active;
use super::Song;
use crate::arrangement::MAX_NUM_SECTIONS;
use crate::error::{SongError, SongResult};
use crate::ids::{ClipId, OutputId};
use crate::sequencer::{AddPosition, Clip, ClipArray, LaunchStyle, OutputKind, OverdubNature};

/// Which clips a lookup considers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipFilter {
    Any,
    ActiveOnly,
}

/// How the session grid closes the gap left by a removed clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalShift {
    /// Clips below stay put, clips above slide down into the gap
    #[default]
    ClipsBelowMoveUp,
    /// Scroll follows the clips above so the view does not jump
    ClipsAboveMoveDown,
}

/// What happens to an output left without clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstrumentRemoval {
    Keep,
    /// Retire the output unless timeline instances still use it
    #[default]
    DeleteOrHibernateIfUnused,
    /// Retire the output even if it still has timeline instances
    Delete,
}

/// Options for [`Song::remove_session_clip`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoveSessionClipOptions {
    pub shift: VerticalShift,
    pub instrument_removal: InstrumentRemoval,
}

/// Consequences of cancelling pending overdubs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverdubCancel {
    /// Only discard the pending clips
    Quiet,
    /// Also stop clips on the same outputs that are recording into them
    StopSiblingRecording,
}

impl Song {
    /// Register a session clip on an active output at a grid index (or on top)
    pub fn add_session_clip(&mut self, clip: Clip, index: Option<usize>) -> SongResult<ClipId> {
        if self.outputs.get(clip.output).is_none() {
            return Err(SongError::OutputNotFound(clip.output));
        }
        let id = clip.id;
        match index {
            Some(index) => self.clips.insert_session(index, clip)?,
            None => self.clips.push_session(clip)?,
        };
        debug!(clip = %id, "session clip added");
        Ok(id)
    }

    /// Register a clip that exists only on the arrangement timeline
    pub fn add_arrangement_only_clip(&mut self, clip: Clip) -> SongResult<ClipId> {
        if self.outputs.get(clip.output).is_none() {
            return Err(SongError::OutputNotFound(clip.output));
        }
        let id = clip.id;
        self.clips.push_arrangement_only(clip)?;
        Ok(id)
    }

    /// Make a session clip the one playing on its output
    pub fn launch_session_clip(&mut self, id: ClipId) -> SongResult<()> {
        let output = self.clips.require(id)?.output;
        if self.clips.session_index_of(id).is_none() {
            return Err(SongError::InvalidOperation(format!("{id} is not a session clip")));
        }
        for clip in self.clips.session_mut() {
            if clip.output == output {
                clip.active_if_no_solo = clip.id == id;
                clip.armed = false;
            }
        }
        if let Some(output) = self.outputs.get_mut(output) {
            output.active_clip = Some(id);
        }
        debug!(clip = %id, "launched");
        Ok(())
    }

    /// Stop a session clip. Its output keeps it bound for editing.
    pub fn stop_session_clip(&mut self, id: ClipId) -> SongResult<()> {
        let clip = self.clips.require_mut(id)?;
        clip.active_if_no_solo = false;
        clip.armed = false;
        if clip.soloing {
            clip.soloing = false;
            self.reassess_whether_any_clips_soloing();
        }
        Ok(())
    }

    /// Toggle a clip's solo. Soloing one clip unsolos its output's others.
    pub fn toggle_clip_solo(&mut self, id: ClipId) -> SongResult<bool> {
        let clip = self.clips.require_mut(id)?;
        clip.soloing = !clip.soloing;
        let (output, soloing) = (clip.output, clip.soloing);
        if soloing {
            for other in self.clips.session_mut() {
                if other.output == output && other.id != id {
                    other.soloing = false;
                }
            }
            if let Some(output) = self.outputs.get_mut(output) {
                output.active_clip = Some(id);
            }
        }
        self.reassess_whether_any_clips_soloing();
        Ok(soloing)
    }

    /// Whatever is soloing becomes what plays, and solo is cleared
    pub fn turn_soloing_into_just_playing(&mut self) {
        if !self.any_clips_soloing {
            return;
        }
        for clip in self.clips.session_mut() {
            clip.active_if_no_solo = clip.soloing;
            clip.soloing = false;
        }
        self.any_clips_soloing = false;
    }

    /// Recompute the solo flag from every session clip
    pub fn reassess_whether_any_clips_soloing(&mut self) -> bool {
        self.any_clips_soloing = self.clips.session().iter().any(|clip| clip.soloing);
        self.any_clips_soloing
    }

    pub fn any_clips_soloing(&self) -> bool {
        self.any_clips_soloing
    }

    /// Create the empty clip a linear recording will layer into.
    ///
    /// It sits directly below `source` in the session grid and starts from
    /// a copy of the source's parameters.
    pub fn create_pending_next_overdub_below_clip(
        &mut self,
        source: ClipId,
        nature: OverdubNature,
    ) -> SongResult<ClipId> {
        let index = self
            .clips
            .session_index_of(source)
            .ok_or_else(|| SongError::InvalidOperation(format!("{source} is not a session clip")))?;
        let id = self.ids.clip();
        let source = &self.clips.session()[index];
        let mut overdub = source.empty_like(id);
        overdub.param_manager = source.param_manager.clone();
        overdub.is_pending_overdub = true;
        overdub.overdub_nature = nature;
        self.clips.insert_session(index, overdub)?;
        if (index as i32) < self.song_view_y_scroll {
            self.song_view_y_scroll += 1;
        }
        debug!(clip = %id, "pending overdub created");
        Ok(id)
    }

    pub fn get_pending_overdub_with_output(&self, output: OutputId) -> Option<ClipId> {
        self.clips
            .session()
            .iter()
            .find(|clip| clip.is_pending_overdub && clip.output == output)
            .map(|clip| clip.id)
    }

    pub fn has_any_pending_next_overdubs(&self) -> bool {
        self.clips.session().iter().any(|clip| clip.is_pending_overdub)
    }

    /// The grid scroll as it would be with no pending overdubs present
    pub fn get_y_scroll_song_view_without_pending_overdubs(&self) -> i32 {
        let below = self
            .clips
            .session()
            .iter()
            .take(self.song_view_y_scroll.max(0) as usize)
            .filter(|clip| clip.is_pending_overdub)
            .count() as i32;
        (self.song_view_y_scroll - below).max(0)
    }

    /// Discard pending overdubs, optionally only those on one output.
    /// Returns how many were deleted.
    pub fn delete_pending_overdubs(
        &mut self,
        only_with_output: Option<OutputId>,
        cancel: OverdubCancel,
    ) -> SongResult<usize> {
        let pending: Vec<(ClipId, OutputId)> = self
            .clips
            .session()
            .iter()
            .filter(|clip| clip.is_pending_overdub)
            .filter(|clip| only_with_output.map_or(true, |output| clip.output == output))
            .map(|clip| (clip.id, clip.output))
            .collect();
        let options = RemoveSessionClipOptions {
            shift: VerticalShift::ClipsBelowMoveUp,
            instrument_removal: InstrumentRemoval::Keep,
        };
        for (id, output) in &pending {
            self.remove_session_clip(*id, options)?;
            if cancel == OverdubCancel::StopSiblingRecording {
                for clip in self.clips.iter_mut().filter(|clip| clip.output == *output) {
                    clip.is_recording = false;
                }
            }
        }
        if !pending.is_empty() {
            info!(count = pending.len(), "pending overdubs discarded");
        }
        Ok(pending.len())
    }

    /// Start recording into a clip
    pub fn begin_linear_recording(&mut self, id: ClipId) -> SongResult<()> {
        self.clips.require_mut(id)?.is_recording = true;
        Ok(())
    }

    /// Commit a completed recording. The clip becomes a normal playing clip;
    /// continuous layering immediately queues the next overdub below it.
    pub fn finish_linear_recording(&mut self, id: ClipId) -> SongResult<Option<ClipId>> {
        let clip = self.clips.require_mut(id)?;
        let was_pending = clip.is_pending_overdub;
        clip.is_pending_overdub = false;
        clip.is_recording = false;
        let nature = clip.overdub_nature;
        if was_pending && self.clips.session_index_of(id).is_some() {
            self.launch_session_clip(id)?;
        }
        info!(clip = %id, "linear recording finished");
        match nature {
            OverdubNature::ContinuousLayering if self.clips.session_index_of(id).is_some() => {
                self.create_pending_next_overdub_below_clip(id, nature).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Unlink the session clip at an index, keeping derived state in step
    pub fn remove_session_clip_low_level(&mut self, index: usize) -> SongResult<Clip> {
        let clip = self.clips.remove_session_at(index).ok_or_else(|| {
            SongError::InvalidOperation(format!("no session clip at index {index}"))
        })?;
        if clip.soloing {
            self.reassess_whether_any_clips_soloing();
        }
        Ok(clip)
    }

    /// Remove a session clip and delete it
    pub fn remove_session_clip(&mut self, id: ClipId, options: RemoveSessionClipOptions) -> SongResult<()> {
        let index = self
            .clips
            .session_index_of(id)
            .ok_or(SongError::ClipNotFound(id))?;
        if self.current_clip == Some(id) {
            self.current_clip = None;
        }
        let mut clip = self.remove_session_clip_low_level(index)?;
        clip.active_if_no_solo = false;
        clip.soloing = false;
        if (index as i32) < self.song_view_y_scroll
            || options.shift == VerticalShift::ClipsAboveMoveDown
        {
            self.song_view_y_scroll = (self.song_view_y_scroll - 1).max(0);
        }
        self.delete_clip_object(clip, options.instrument_removal)
    }

    /// Destroy a clip already unlinked from the registry.
    ///
    /// Every handle to it is cleared before returning: timeline instances,
    /// the output binding, the sync-scaling reference and its backups.
    pub fn delete_clip_object(&mut self, clip: Clip, removal: InstrumentRemoval) -> SongResult<()> {
        let id = clip.id;
        let output_id = clip.output;
        let replacement = self.get_clip_with_output(output_id, ClipFilter::Any, Some(id));

        let output = self
            .outputs
            .get_mut(output_id)
            .ok_or(SongError::OutputNotFound(output_id))?;
        if output.active_clip == Some(id) {
            output.active_clip = replacement;
        }
        output.clip_instances.remove_for_clip(id);
        let entity = output.mod_controllable;
        let timeline_empty = output.clip_instances.is_empty();

        if self.input_tick_scale_clip == Some(id) {
            self.input_tick_scale_clip = None;
            self.input_tick_scale_potentially_changed();
        }
        if self.current_clip == Some(id) {
            self.current_clip = None;
        }
        self.backups.delete_for_clip(id);

        let orphaned_output = replacement.is_none();
        if orphaned_output {
            // The output outlives its last clip, so keep its parameters
            self.backups.insert(entity, None, clip.param_manager);
        }
        debug!(clip = %id, "clip deleted");

        if !orphaned_output {
            return Ok(());
        }
        match removal {
            InstrumentRemoval::Keep => Ok(()),
            InstrumentRemoval::DeleteOrHibernateIfUnused if !timeline_empty => Ok(()),
            InstrumentRemoval::DeleteOrHibernateIfUnused | InstrumentRemoval::Delete => {
                self.delete_output_that_is_in_main_list(output_id)
            }
        }
    }

    /// Guarantee the session grid is not empty, creating a clip if needed
    pub fn ensure_at_least_one_session_clip(&mut self) -> SongResult<Option<ClipId>> {
        if !self.clips.session().is_empty() {
            return Ok(None);
        }
        let output_id = match self
            .outputs
            .outputs()
            .iter()
            .find(|output| output.kind != OutputKind::Audio)
        {
            Some(output) => output.id,
            None => {
                let output = self.get_non_audio_instrument_to_switch_to(OutputKind::Synth)?;
                let id = output.id;
                self.add_output(output, AddPosition::Start)?;
                id
            }
        };
        let id = self.ids.clip();
        let length = self.tempo.bar_length();
        self.clips.push_session(Clip::new_instrument(id, output_id, length))?;
        if let Some(output) = self.outputs.get_mut(output_id) {
            output.active_clip.get_or_insert(id);
        }
        info!(clip = %id, "created session clip for empty song");
        Ok(Some(id))
    }

    /// Put `new_clip` into the registry slot held by `old`, then delete `old`.
    ///
    /// A clip moving to another output must not be on the old output's
    /// timeline. Sync, current-clip and binding references follow the swap.
    pub fn swap_clips(&mut self, new_clip: Clip, old: ClipId, removal: InstrumentRemoval) -> SongResult<ClipId> {
        let old_output = self.clips.require(old)?.output;
        let new_output = new_clip.output;
        if self.outputs.get(new_output).is_none() {
            return Err(SongError::OutputNotFound(new_output));
        }
        let same_output = old_output == new_output;
        let on_timeline = self
            .outputs
            .get(old_output)
            .is_some_and(|output| output.clip_instances.references_clip(old));
        if !same_output && on_timeline {
            return Err(SongError::InvalidOperation(format!(
                "{old} has timeline instances on {old_output}"
            )));
        }

        let new_id = new_clip.id;
        let old_clip = self.clips.replace(old, new_clip)?;
        if same_output {
            if let Some(output) = self.outputs.get_mut(new_output) {
                output.clip_instances.replace_clip(old, Some(new_id));
                if output.active_clip == Some(old) {
                    output.active_clip = Some(new_id);
                }
            }
        }
        if self.current_clip == Some(old) {
            self.current_clip = Some(new_id);
        }
        if self.input_tick_scale_clip == Some(old) {
            self.input_tick_scale_clip = Some(new_id);
            self.input_tick_scale_potentially_changed();
        }
        let active = self.clips.get(new_id).is_some_and(|clip| self.is_clip_active(clip));
        if let Some(output) = self.outputs.get_mut(new_output) {
            if active || output.active_clip.is_none() {
                output.active_clip = Some(new_id);
            }
        }
        self.reassess_whether_any_clips_soloing();
        debug!(old = %old, new = %new_id, "clips swapped");
        self.delete_clip_object(old_clip, removal)?;
        Ok(new_id)
    }

    /// Turn an empty session instrument clip into an audio clip on a new audio output
    pub fn replace_instrument_clip_with_audio_clip(&mut self, old: ClipId) -> SongResult<ClipId> {
        let clip = self.clips.require(old)?;
        if !clip.is_instrument() || !clip.is_empty() {
            return Err(SongError::InvalidOperation(format!(
                "{old} is not an empty instrument clip"
            )));
        }
        if self.clips.session_index_of(old).is_none() {
            return Err(SongError::InvalidOperation(format!("{old} is not a session clip")));
        }
        let (loop_length, section, active, soloing) =
            (clip.loop_length, clip.section, clip.active_if_no_solo, clip.soloing);

        let audio_output = self.create_new_audio_output()?;
        let id = self.ids.clip();
        let mut audio = Clip::new_audio(id, audio_output, loop_length, "");
        audio.section = section;
        audio.active_if_no_solo = active;
        audio.soloing = soloing;

        match self.swap_clips(audio, old, InstrumentRemoval::DeleteOrHibernateIfUnused) {
            Ok(id) => {
                info!(old = %old, clip = %id, output = %audio_output, "instrument clip replaced with audio clip");
                Ok(id)
            }
            Err(err) => {
                if !self.does_output_have_any_clips(audio_output) {
                    if let Err(cleanup) = self.delete_output_that_is_in_main_list(audio_output) {
                        warn!(output = %audio_output, error = %cleanup, "could not remove unused audio output");
                    }
                }
                Err(err)
            }
        }
    }

    /// Whether fill clips are currently standing in for regular clips
    pub fn is_fill_mode_active(&self) -> bool {
        self.fill_mode_active
    }

    /// Switch fill mode. Session fill clips are armed to follow the new state
    /// unless the arrangement is driving playback. Returns whether it changed.
    pub fn change_fill_mode(&mut self, on: bool) -> bool {
        if self.fill_mode_active == on {
            return false;
        }
        self.fill_mode_active = on;
        if !self.arrangement_engaged {
            let soloing = self.any_clips_soloing;
            for clip in self.clips.session_mut() {
                if clip.launch_style == LaunchStyle::Fill && clip_is_active(clip, false, soloing) != on {
                    clip.armed = true;
                }
            }
        }
        info!(on, "fill mode changed");
        true
    }

    /// Stop every arrangement-only clip, rebinding outputs to session clips
    pub fn deactivate_any_arrangement_only_clips(&mut self) {
        let mut released = Vec::new();
        for clip in self.clips.arrangement_only_mut() {
            clip.active_if_no_solo = false;
            released.push((clip.id, clip.output));
        }
        for (id, output_id) in released {
            let bound = self.outputs.get(output_id).and_then(|output| output.active_clip);
            if bound == Some(id) {
                let replacement = self.get_session_clip_with_output(output_id, ClipFilter::Any, None);
                if let Some(output) = self.outputs.get_mut(output_id) {
                    output.active_clip = replacement;
                }
            }
        }
    }

    /// Move a session clip off the grid so only the timeline refers to it
    pub fn demote_session_clip_to_arrangement_only(&mut self, id: ClipId) -> SongResult<()> {
        let index = self
            .clips
            .session_index_of(id)
            .ok_or(SongError::ClipNotFound(id))?;
        self.clips.demote_to_arrangement_only(id)?;
        if (index as i32) < self.song_view_y_scroll {
            self.song_view_y_scroll -= 1;
        }
        if let Some(clip) = self.clips.get_mut(id) {
            clip.soloing = false;
            clip.armed = false;
            if !self.arrangement_engaged {
                clip.active_if_no_solo = false;
            }
        }
        self.reassess_whether_any_clips_soloing();
        Ok(())
    }

    /// Put an arrangement-only clip onto the session grid
    pub fn promote_arrangement_only_clip_to_session(&mut self, id: ClipId, index: usize) -> SongResult<usize> {
        let index = self.clips.promote_to_session(id, index)?;
        if (index as i32) < self.song_view_y_scroll {
            self.song_view_y_scroll += 1;
        }
        Ok(index)
    }

    /// Change a clip's loop length
    pub fn set_clip_length(&mut self, id: ClipId, new_length: u32) -> SongResult<()> {
        self.clips.require_mut(id)?.set_length(new_length);
        if self.input_tick_scale_clip == Some(id) {
            self.input_tick_scale_potentially_changed();
        }
        Ok(())
    }

    /// Double a clip's loop, repeating its content
    pub fn double_clip_length(&mut self, id: ClipId) -> SongResult<()> {
        self.clips.require_mut(id)?.double_length();
        if self.input_tick_scale_clip == Some(id) {
            self.input_tick_scale_potentially_changed();
        }
        Ok(())
    }

    fn clip_passes(&self, clip: &Clip, filter: ClipFilter) -> bool {
        match filter {
            ClipFilter::Any => true,
            ClipFilter::ActiveOnly => self.is_clip_active(clip),
        }
    }

    /// First clip on an output, session clips before arrangement-only ones
    pub fn get_clip_with_output(
        &self,
        output: OutputId,
        filter: ClipFilter,
        excluding: Option<ClipId>,
    ) -> Option<ClipId> {
        self.clips
            .iter()
            .filter(|clip| clip.output == output && Some(clip.id) != excluding)
            .find(|clip| self.clip_passes(clip, filter))
            .map(|clip| clip.id)
    }

    pub fn get_session_clip_with_output(
        &self,
        output: OutputId,
        filter: ClipFilter,
        excluding: Option<ClipId>,
    ) -> Option<ClipId> {
        self.clips
            .session()
            .iter()
            .filter(|clip| clip.output == output && Some(clip.id) != excluding)
            .find(|clip| self.clip_passes(clip, filter))
            .map(|clip| clip.id)
    }

    /// The next session clip on an output above `after`, or the lowest one
    pub fn get_next_session_clip_with_output(&self, output: OutputId, after: Option<ClipId>) -> Option<ClipId> {
        let start = after
            .and_then(|id| self.clips.session_index_of(id))
            .map_or(0, |index| index + 1);
        self.clips.session()[start.min(self.clips.session().len())..]
            .iter()
            .find(|clip| clip.output == output)
            .map(|clip| clip.id)
    }

    /// The clip with the longest loop
    pub fn get_longest_clip(&self, filter: ClipFilter) -> Option<ClipId> {
        self.clips
            .iter()
            .filter(|clip| self.clip_passes(clip, filter))
            .max_by_key(|clip| clip.loop_length)
            .map(|clip| clip.id)
    }

    /// The longest active clip whose length divides, or is divided by, `length`
    pub fn get_longest_active_clip_with_multiple_or_factor_length(
        &self,
        length: u32,
        excluding: Option<ClipId>,
    ) -> Option<ClipId> {
        if length == 0 {
            return None;
        }
        self.clips
            .iter()
            .filter(|clip| Some(clip.id) != excluding && self.is_clip_active(clip))
            .filter(|clip| clip.loop_length % length == 0 || length % clip.loop_length == 0)
            .max_by_key(|clip| clip.loop_length)
            .map(|clip| clip.id)
    }

    /// A session clip on `output` that recording is about to start in:
    /// a pending overdub, or an armed empty clip
    pub fn get_clip_with_output_about_to_begin_linear_recording(&self, output: OutputId) -> Option<ClipId> {
        self.clips
            .session()
            .iter()
            .filter(|clip| clip.output == output && !clip.is_recording)
            .find(|clip| clip.is_pending_overdub || (clip.armed && clip.is_empty()))
            .map(|clip| clip.id)
    }

    pub fn does_output_have_any_clips(&self, output: OutputId) -> bool {
        self.clips.clips_for_output(output).next().is_some()
    }

    pub fn does_output_have_active_clip_in_session(&self, output: OutputId) -> bool {
        self.clips
            .session()
            .iter()
            .any(|clip| clip.output == output && self.is_clip_active(clip))
    }

    /// Whether any MIDI/CV/instrument output on a slot has an active session clip
    pub fn does_non_audio_slot_have_active_clip_in_session(
        &self,
        kind: OutputKind,
        slot: i32,
        sub_slot: i32,
    ) -> bool {
        kind != OutputKind::Audio
            && self
                .outputs
                .outputs()
                .iter()
                .filter(|output| output.kind == kind && output.slot == slot && output.sub_slot == sub_slot)
                .any(|output| self.does_output_have_active_clip_in_session(output.id))
    }

    /// Whether every session clip in a section is active
    pub fn are_all_clips_in_section_playing(&self, section: u8) -> bool {
        self.clips
            .session()
            .iter()
            .filter(|clip| clip.section == section)
            .all(|clip| self.is_clip_active(clip))
    }

    /// The lowest section holding no session clip for an output
    pub fn get_lowest_section_with_no_session_clip_for_output(&self, output: OutputId) -> Option<u8> {
        (0..MAX_NUM_SECTIONS as u8).find(|section| {
            !self
                .clips
                .session()
                .iter()
                .any(|clip| clip.output == output && clip.section == *section)
        })
    }

    /// Where a clip currently lives
    pub fn clip_array_of(&self, id: ClipId) -> Option<ClipArray> {
        self.clips.locate(id).map(|(array, _)| array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrangement::ClipInstance;
    use crate::params::ParamManager;
    use crate::sequencer::{NoteRow, Output, SequencedNote};

    fn song_with_output(kind: OutputKind) -> (Song, OutputId) {
        let mut song = Song::default();
        let id = song.ids().output();
        let mc = song.ids().mod_controllable();
        song.add_output(Output::new(id, kind, mc, "Lead"), AddPosition::End).unwrap();
        (song, id)
    }

    fn add_clip(song: &mut Song, output: OutputId, length: u32) -> ClipId {
        let id = song.ids().clip();
        song.add_session_clip(Clip::new_instrument(id, output, length), None).unwrap()
    }

    #[test]
    fn test_launch_keeps_one_clip_per_output() {
        let (mut song, output) = song_with_output(OutputKind::Synth);
        let a = add_clip(&mut song, output, 96);
        let b = add_clip(&mut song, output, 96);
        song.launch_session_clip(a).unwrap();
        song.launch_session_clip(b).unwrap();
        assert!(!song.is_clip_active(song.clip(a).unwrap()));
        assert!(song.is_clip_active(song.clip(b).unwrap()));
        assert_eq!(song.output(output).unwrap().active_clip, Some(b));
    }

    #[test]
    fn test_solo_overrides_playing_clips() {
        let (mut song, output) = song_with_output(OutputKind::Synth);
        let other_output = song.ids().output();
        let mc = song.ids().mod_controllable();
        song.add_output(Output::new(other_output, OutputKind::Kit, mc, "Drums"), AddPosition::End)
            .unwrap();
        let a = add_clip(&mut song, output, 96);
        let b = add_clip(&mut song, other_output, 96);
        song.launch_session_clip(a).unwrap();
        assert!(song.toggle_clip_solo(b).unwrap());
        assert!(song.any_clips_soloing());
        assert!(!song.is_clip_active(song.clip(a).unwrap()));
        assert!(song.is_clip_active(song.clip(b).unwrap()));

        song.turn_soloing_into_just_playing();
        assert!(!song.any_clips_soloing());
        assert!(!song.is_clip_active(song.clip(a).unwrap()));
        assert!(song.is_clip_active(song.clip(b).unwrap()));
    }

    #[test]
    fn test_solo_flag_is_recomputed_on_removal() {
        let (mut song, output) = song_with_output(OutputKind::Synth);
        let a = add_clip(&mut song, output, 96);
        add_clip(&mut song, output, 96);
        song.toggle_clip_solo(a).unwrap();
        song.remove_session_clip(a, RemoveSessionClipOptions::default()).unwrap();
        assert!(!song.any_clips_soloing());
    }

    #[test]
    fn test_pending_overdub_lifecycle() {
        let (mut song, output) = song_with_output(OutputKind::Synth);
        let source = add_clip(&mut song, output, 192);
        song.clip_mut(source).unwrap().param_manager.set_value(3, 77);
        song.set_song_view_y_scroll(1);

        let overdub = song
            .create_pending_next_overdub_below_clip(source, OverdubNature::Normal)
            .unwrap();
        assert_eq!(song.clips().session_index_of(overdub), Some(0));
        assert_eq!(song.clips().session_index_of(source), Some(1));
        assert_eq!(song.clip(overdub).unwrap().param_manager.value(3), Some(77));
        assert_eq!(song.get_pending_overdub_with_output(output), Some(overdub));
        assert_eq!(song.song_view_y_scroll(), 2);
        assert_eq!(song.get_y_scroll_song_view_without_pending_overdubs(), 1);

        assert_eq!(song.delete_pending_overdubs(None, OverdubCancel::Quiet).unwrap(), 1);
        assert!(!song.has_any_pending_next_overdubs());
        assert_eq!(song.song_view_y_scroll(), 1);
        assert!(song.output(output).is_some());
        assert!(song.check_consistency().is_ok());
    }

    #[test]
    fn test_continuous_layering_queues_next_overdub() {
        let (mut song, output) = song_with_output(OutputKind::Synth);
        let source = add_clip(&mut song, output, 192);
        let overdub = song
            .create_pending_next_overdub_below_clip(source, OverdubNature::ContinuousLayering)
            .unwrap();
        song.begin_linear_recording(overdub).unwrap();
        let next = song.finish_linear_recording(overdub).unwrap().unwrap();

        let committed = song.clip(overdub).unwrap();
        assert!(!committed.is_pending_overdub);
        assert!(!committed.is_recording);
        assert!(song.is_clip_active(committed));
        assert!(song.clip(next).unwrap().is_pending_overdub);
        assert_eq!(song.clips().session_index_of(next), Some(0));
    }

    #[test]
    fn test_delete_clip_backs_up_last_params() {
        let (mut song, output) = song_with_output(OutputKind::Synth);
        let clip = add_clip(&mut song, output, 96);
        song.clip_mut(clip).unwrap().param_manager.set_value(1, 42);
        let entity = song.output(output).unwrap().mod_controllable;
        song.backups_mut().insert(entity, Some(clip), ParamManager::new());
        song.set_current_clip(Some(clip)).unwrap();

        let options = RemoveSessionClipOptions {
            instrument_removal: InstrumentRemoval::Keep,
            ..Default::default()
        };
        song.remove_session_clip(clip, options).unwrap();

        assert!(song.backups().get_exact(entity, Some(clip)).is_none());
        assert_eq!(song.backups().get_exact(entity, None).unwrap().value(1), Some(42));
        assert_eq!(song.current_clip(), None);
        assert_eq!(song.output(output).unwrap().active_clip, None);
        assert!(song.check_consistency().is_ok());
    }

    #[test]
    fn test_removing_last_clip_hibernates_output() {
        let (mut song, output) = song_with_output(OutputKind::Synth);
        let clip = add_clip(&mut song, output, 96);
        song.remove_session_clip(clip, RemoveSessionClipOptions::default()).unwrap();
        assert!(song.output(output).is_none());
        assert_eq!(song.outputs().hibernating().len(), 1);
    }

    #[test]
    fn test_removal_rebinds_active_clip() {
        let (mut song, output) = song_with_output(OutputKind::Synth);
        let a = add_clip(&mut song, output, 96);
        let b = add_clip(&mut song, output, 96);
        song.launch_session_clip(a).unwrap();
        song.remove_session_clip(a, RemoveSessionClipOptions::default()).unwrap();
        assert_eq!(song.output(output).unwrap().active_clip, Some(b));
    }

    #[test]
    fn test_ensure_at_least_one_session_clip() {
        let mut song = Song::default();
        let created = song.ensure_at_least_one_session_clip().unwrap().unwrap();
        let clip = song.clip(created).unwrap();
        assert_eq!(clip.loop_length, song.tempo().bar_length());
        assert_eq!(song.outputs().len(), 1);
        assert!(song.ensure_at_least_one_session_clip().unwrap().is_none());
    }

    #[test]
    fn test_lookups() {
        let (mut song, output) = song_with_output(OutputKind::Synth);
        let a = add_clip(&mut song, output, 96);
        let b = add_clip(&mut song, output, 384);
        song.clip_mut(b).unwrap().section = 0;
        song.clip_mut(a).unwrap().section = 1;
        song.launch_session_clip(b).unwrap();

        assert_eq!(song.get_next_session_clip_with_output(output, Some(a)), Some(b));
        assert_eq!(song.get_next_session_clip_with_output(output, Some(b)), None);
        assert_eq!(song.get_longest_clip(ClipFilter::Any), Some(b));
        assert_eq!(song.get_session_clip_with_output(output, ClipFilter::ActiveOnly, None), Some(b));
        assert_eq!(song.get_longest_active_clip_with_multiple_or_factor_length(192, None), Some(b));
        assert_eq!(song.get_longest_active_clip_with_multiple_or_factor_length(100, None), None);
        assert!(song.are_all_clips_in_section_playing(0));
        assert!(!song.are_all_clips_in_section_playing(1));
        assert_eq!(song.get_lowest_section_with_no_session_clip_for_output(output), Some(2));
        assert!(song.does_non_audio_slot_have_active_clip_in_session(OutputKind::Synth, 0, -1));
    }

    #[test]
    fn test_promote_and_demote_move_ownership() {
        let (mut song, output) = song_with_output(OutputKind::Synth);
        add_clip(&mut song, output, 96);
        let clip = add_clip(&mut song, output, 96);
        song.toggle_clip_solo(clip).unwrap();
        song.set_song_view_y_scroll(2);

        song.demote_session_clip_to_arrangement_only(clip).unwrap();
        assert_eq!(song.clip_array_of(clip), Some(ClipArray::ArrangementOnly));
        assert_eq!(song.song_view_y_scroll(), 1);
        assert!(!song.any_clips_soloing());

        assert_eq!(song.promote_arrangement_only_clip_to_session(clip, 0).unwrap(), 0);
        assert_eq!(song.clip_array_of(clip), Some(ClipArray::Session));
        assert_eq!(song.song_view_y_scroll(), 2);
        assert!(song.clips().is_well_formed());
    }

    #[test]
    fn test_set_clip_length_rescales_sync() {
        let (mut song, output) = song_with_output(OutputKind::Synth);
        let clip = add_clip(&mut song, output, 96);
        song.set_input_tick_scale_clip(Some(clip)).unwrap();
        assert_eq!(song.input_tick_scale(), 1);
        song.set_clip_length(clip, 384).unwrap();
        assert_eq!(song.input_tick_scale(), 4);
        song.double_clip_length(clip).unwrap();
        assert_eq!(song.input_tick_scale(), 8);
    }

    #[test]
    fn test_swap_clips_moves_references() {
        let (mut song, output) = song_with_output(OutputKind::Synth);
        let a = add_clip(&mut song, output, 96);
        song.place_clip_instance(output, ClipInstance::new(0, 96, Some(a))).unwrap();
        song.set_current_clip(Some(a)).unwrap();
        song.set_input_tick_scale_clip(Some(a)).unwrap();

        let b = song.ids().clip();
        let replacement = song.clip(a).unwrap().empty_like(b);
        assert_eq!(song.swap_clips(replacement, a, InstrumentRemoval::Keep).unwrap(), b);

        assert!(song.clip(a).is_none());
        assert_eq!(song.clips.session_index_of(b), Some(0));
        assert_eq!(song.current_clip(), Some(b));
        assert_eq!(song.input_tick_scale_clip(), Some(b));
        let bound = song.output(output).unwrap();
        assert_eq!(bound.active_clip, Some(b));
        assert_eq!(bound.clip_instances.get(0).unwrap().clip, Some(b));
    }

    #[test]
    fn test_swap_to_other_output_rejects_timeline_clip() {
        let (mut song, output) = song_with_output(OutputKind::Synth);
        let other = song.ids().output();
        let mc = song.ids().mod_controllable();
        song.add_output(Output::new(other, OutputKind::Synth, mc, "Bass"), AddPosition::End)
            .unwrap();
        let a = add_clip(&mut song, output, 96);
        song.place_clip_instance(output, ClipInstance::new(0, 96, Some(a))).unwrap();

        let b = song.ids().clip();
        let moved = Clip::new_instrument(b, other, 96);
        assert!(song.swap_clips(moved, a, InstrumentRemoval::Keep).is_err());
        assert!(song.clip(a).is_some());
        assert!(song.clip(b).is_none());
    }

    #[test]
    fn test_replace_instrument_clip_with_audio_clip() {
        let (mut song, synth) = song_with_output(OutputKind::Synth);
        let a = add_clip(&mut song, synth, 192);
        song.launch_session_clip(a).unwrap();

        let audio = song.replace_instrument_clip_with_audio_clip(a).unwrap();
        let clip = song.clip(audio).unwrap();
        assert!(!clip.is_instrument());
        assert_eq!(clip.loop_length, 192);
        assert!(song.is_clip_active(clip));
        let output = song.output(clip.output).unwrap();
        assert_eq!(output.kind, OutputKind::Audio);
        assert_eq!(output.name, "AUDIO1");
        assert_eq!(output.active_clip, Some(audio));
        assert_eq!(song.clips.session_index_of(audio), Some(0));
        // The synth lost its only clip
        assert!(song.output(synth).is_none());
        assert!(song.outputs.hibernating().iter().any(|output| output.id == synth));
    }

    #[test]
    fn test_audio_replacement_needs_empty_clip() {
        let (mut song, synth) = song_with_output(OutputKind::Synth);
        let id = song.ids().clip();
        let mut clip = Clip::new_instrument(id, synth, 96);
        let mut row = NoteRow::new(60);
        row.add_note(SequencedNote { pos: 0, length: 24, velocity: 100 });
        clip.add_note_row(row);
        song.add_session_clip(clip, None).unwrap();

        assert!(song.replace_instrument_clip_with_audio_clip(id).is_err());
        assert!(song.get_first_audio_output().is_none());
        assert!(song.clip(id).is_some());
    }

    #[test]
    fn test_clip_about_to_begin_linear_recording() {
        let (mut song, output) = song_with_output(OutputKind::Synth);
        let a = add_clip(&mut song, output, 96);
        assert_eq!(song.get_clip_with_output_about_to_begin_linear_recording(output), None);

        song.clips.get_mut(a).unwrap().armed = true;
        assert_eq!(song.get_clip_with_output_about_to_begin_linear_recording(output), Some(a));

        song.begin_linear_recording(a).unwrap();
        assert_eq!(song.get_clip_with_output_about_to_begin_linear_recording(output), None);

        let b = add_clip(&mut song, output, 96);
        song.clips.get_mut(b).unwrap().is_pending_overdub = true;
        assert_eq!(song.get_clip_with_output_about_to_begin_linear_recording(output), Some(b));
    }

    #[test]
    fn test_fill_mode_arms_fill_clips() {
        let (mut song, output) = song_with_output(OutputKind::Synth);
        let fill = add_clip(&mut song, output, 96);
        let regular = add_clip(&mut song, output, 96);
        song.clips.get_mut(fill).unwrap().launch_style = LaunchStyle::Fill;

        assert!(song.change_fill_mode(true));
        assert!(song.is_fill_mode_active());
        assert!(song.clip(fill).unwrap().armed);
        assert!(!song.clip(regular).unwrap().armed);
        assert!(!song.change_fill_mode(true));

        song.clips.get_mut(fill).unwrap().armed = false;
        song.begin_arrangement_playback(0);
        assert!(song.change_fill_mode(false));
        assert!(!song.clip(fill).unwrap().armed);
    }
}
