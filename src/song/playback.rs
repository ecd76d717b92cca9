// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Clip activeness and the arrangement timeline.
//!
//! In session mode a clip plays when it is soloing, or when it is launched
//! and nothing is soloing. Once arrangement playback is engaged the
//! timeline drives each clip's launched flag directly and solo is ignored;
//! the session flags are saved on engage and put back on restore.
//!
//! `assert_activeness` and `get_pos_at_which_playback_will_cut` run on the
//! tick path and never allocate.

use tracing::{debug, info, warn};

use super::{Action, LogAction, Song};
use crate::arrangement::ClipInstance;
use crate::error::{SongError, SongResult};
use crate::ids::{ClipId, OutputId};
use crate::sequencer::{Clip, ClipArray};
use crate::timing::MAX_SEQUENCE_LENGTH;

/// Whether ending instances also unbinds their clips from outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachClips {
    Keep,
    Detach,
}

pub(super) fn clip_is_active(clip: &Clip, arrangement_engaged: bool, any_clips_soloing: bool) -> bool {
    if arrangement_engaged {
        clip.active_if_no_solo
    } else {
        clip.soloing || (clip.active_if_no_solo && !any_clips_soloing)
    }
}

impl Song {
    /// Whether a clip is currently sounding
    pub fn is_clip_active(&self, clip: &Clip) -> bool {
        clip_is_active(clip, self.arrangement_engaged, self.any_clips_soloing)
    }

    pub fn is_clip_id_active(&self, id: ClipId) -> bool {
        self.clips.get(id).is_some_and(|clip| self.is_clip_active(clip))
    }

    /// Bind each output to the clip that should sound on it, without
    /// changing any clip's activeness.
    ///
    /// With an arrangement position the instance under it wins; otherwise
    /// the output's active session clip does. An output with neither keeps
    /// its binding if still valid, or falls back to its first clip.
    pub fn sort_out_which_clips_are_active_without_sending_pgms(&mut self, arrangement_pos: Option<u32>) {
        let engaged = self.arrangement_engaged;
        let soloing = self.any_clips_soloing;
        let clips = &self.clips;
        for output in self.outputs.outputs_mut() {
            let output_id = output.id;
            let from_timeline = arrangement_pos.and_then(|pos| {
                output
                    .clip_instances
                    .covering(pos)
                    .and_then(|index| output.clip_instances.get(index))
                    .and_then(|instance| instance.clip)
            });
            let from_session = || {
                clips
                    .session()
                    .iter()
                    .find(|clip| clip.output == output_id && clip_is_active(clip, engaged, soloing))
                    .map(|clip| clip.id)
            };
            let kept = output
                .active_clip
                .filter(|id| clips.get(*id).is_some_and(|clip| clip.output == output_id));
            let first = || clips.clips_for_output(output_id).next().map(|clip| clip.id);
            output.active_clip = match arrangement_pos {
                Some(_) => from_timeline.or(kept).or_else(first),
                None => from_session().or(kept).or_else(first),
            };
        }
    }

    fn engage_arrangement(&mut self) {
        if self.arrangement_engaged {
            return;
        }
        for clip in self.clips.iter_mut() {
            clip.was_active_before = clip.active_if_no_solo;
            clip.active_if_no_solo = false;
        }
        self.arrangement_engaged = true;
    }

    /// Hand clip activeness to the timeline, starting at `pos`
    pub fn begin_arrangement_playback(&mut self, pos: u32) {
        self.engage_arrangement();
        self.assert_activeness(pos, None);
        info!(pos, "arrangement playback started");
    }

    /// Give clip activeness back to the session
    pub fn restore_clip_states_before_arrangement_play(&mut self) {
        if !self.arrangement_engaged {
            return;
        }
        for clip in self.clips.session_mut() {
            clip.active_if_no_solo = clip.was_active_before;
            clip.was_active_before = false;
        }
        for clip in self.clips.arrangement_only_mut() {
            clip.active_if_no_solo = false;
            clip.was_active_before = false;
        }
        self.arrangement_engaged = false;
        self.sort_out_which_clips_are_active_without_sending_pgms(None);
        info!("session clip states restored");
    }

    /// Reconcile every output with the timeline at `pos`.
    ///
    /// The clip of the instance covering `pos` becomes active and bound;
    /// every other clip on that output goes inactive. With
    /// `end_instance_at_time`, a clip that stops has its instance covering
    /// that time cut there. Re-running at the same position changes nothing.
    pub fn assert_activeness(&mut self, pos: u32, end_instance_at_time: Option<u32>) {
        self.engage_arrangement();
        let clips = &mut self.clips;
        for output in self.outputs.outputs_mut() {
            let desired = output
                .clip_instances
                .covering(pos)
                .and_then(|index| output.clip_instances.get(index))
                .and_then(|instance| instance.clip);
            let output_id = output.id;
            for clip in clips.iter_mut().filter(|clip| clip.output == output_id) {
                let should_play = desired == Some(clip.id);
                if clip.active_if_no_solo && !should_play {
                    if let Some(time) = end_instance_at_time {
                        let ending = output.clip_instances.covering(time).filter(|&index| {
                            output.clip_instances.get(index).and_then(|i| i.clip) == Some(clip.id)
                        });
                        if let Some(index) = ending {
                            let start = output.clip_instances.get(index).map_or(time, |i| i.pos);
                            if start == time {
                                output.clip_instances.remove(index);
                            } else {
                                output.clip_instances.set_length(index, time - start);
                            }
                        }
                    }
                }
                clip.active_if_no_solo = should_play;
            }
            if desired.is_some() {
                output.active_clip = desired;
            }
        }
    }

    /// Open a timeline instance at `pos` for every clip playing now
    pub fn place_first_instances_of_active_clips(&mut self, pos: u32) {
        if pos >= MAX_SEQUENCE_LENGTH {
            debug!(pos, "past the end of the timeline, nothing placed");
            return;
        }
        let engaged = self.arrangement_engaged;
        let soloing = self.any_clips_soloing;
        let clips = &self.clips;
        let mut displaced = Vec::new();
        for output in self.outputs.outputs_mut() {
            let playing = clips
                .iter()
                .find(|clip| clip.output == output.id && clip_is_active(clip, engaged, soloing));
            if let Some(clip) = playing {
                let (_, replaced) = output.clip_instances.insert(ClipInstance::new(
                    pos,
                    MAX_SEQUENCE_LENGTH - pos,
                    Some(clip.id),
                ));
                if let Some(old) = replaced.and_then(|instance| instance.clip) {
                    displaced.push((output.id, old));
                }
                output.active_clip = Some(clip.id);
            }
        }
        for (output, clip) in displaced {
            if let Err(error) = self.deleting_clip_instance_for_clip(output, clip) {
                warn!(%output, %clip, %error, "cleanup after displaced instance failed");
            }
        }
        debug!(pos, "instances placed for active clips");
    }

    /// Close the instances of playing clips at `pos`
    pub fn end_instances_of_active_clips(&mut self, pos: u32, detach: DetachClips) {
        let engaged = self.arrangement_engaged;
        let soloing = self.any_clips_soloing;
        let clips = &mut self.clips;
        for output in self.outputs.outputs_mut() {
            let output_id = output.id;
            for clip in clips.iter_mut().filter(|clip| clip.output == output_id) {
                if !clip_is_active(clip, engaged, soloing) {
                    continue;
                }
                let covering = output.clip_instances.covering(pos).filter(|&index| {
                    output.clip_instances.get(index).and_then(|i| i.clip) == Some(clip.id)
                });
                if let Some(index) = covering {
                    let start = output.clip_instances.get(index).map_or(pos, |i| i.pos);
                    if start == pos {
                        output.clip_instances.remove(index);
                    } else {
                        output.clip_instances.set_length(index, pos - start);
                    }
                }
                if detach == DetachClips::Detach {
                    clip.active_if_no_solo = false;
                    if output.active_clip == Some(clip.id) {
                        output.active_clip = None;
                    }
                }
            }
        }
    }

    /// Remove every instance starting at or after `pos` and shorten any
    /// instance running over it.
    ///
    /// Arrangement-only clips left without instances are removed from the
    /// song. With [`LogAction::Record`] they move into the undo action so
    /// undo can put them back; otherwise they are destroyed.
    pub fn clear_arrangement_beyond_pos(&mut self, pos: u32, log: LogAction) {
        let mut truncations = Vec::new();
        let mut candidates: Vec<ClipId> = Vec::new();
        for output in self.outputs.outputs_mut() {
            let truncation = output.clip_instances.truncate_beyond(pos);
            if truncation.is_empty() {
                continue;
            }
            candidates.extend(truncation.removed.iter().filter_map(|instance| instance.clip));
            truncations.push((output.id, truncation));
        }
        candidates.sort();
        candidates.dedup();

        let mut orphaned_clips = Vec::new();
        for id in candidates {
            let Some((ClipArray::ArrangementOnly, _)) = self.clips.locate(id) else {
                continue;
            };
            let still_placed = self
                .clips
                .get(id)
                .and_then(|clip| self.outputs.get(clip.output))
                .is_some_and(|output| output.clip_instances.references_clip(id));
            if still_placed {
                continue;
            }
            if let Some(clip) = self.clips.remove_arrangement_only(id) {
                self.release_clip_handles(&clip);
                orphaned_clips.push(clip);
            }
        }

        if truncations.is_empty() && orphaned_clips.is_empty() {
            return;
        }
        info!(pos, outputs = truncations.len(), orphaned = orphaned_clips.len(), "arrangement cleared");
        match log {
            LogAction::Record => self.record_action(Action::ArrangementCleared {
                pos,
                truncations,
                orphaned_clips,
            }),
            LogAction::Skip => {
                for clip in orphaned_clips {
                    self.backups.delete_for_clip(clip.id);
                }
            }
        }
    }

    /// Clear song-level handles to a clip leaving the registry
    fn release_clip_handles(&mut self, clip: &Clip) {
        let replacement = self
            .clips
            .clips_for_output(clip.output)
            .find(|other| other.id != clip.id)
            .map(|other| other.id);
        if let Some(output) = self.outputs.get_mut(clip.output) {
            if output.active_clip == Some(clip.id) {
                output.active_clip = replacement;
            }
        }
        if self.current_clip == Some(clip.id) {
            self.current_clip = None;
        }
        if self.input_tick_scale_clip == Some(clip.id) {
            self.input_tick_scale_clip = None;
            self.input_tick_scale_potentially_changed();
        }
    }

    /// The earliest position after `pos` at which the sounding clip set changes
    pub fn get_pos_at_which_playback_will_cut(&self, pos: u32) -> u32 {
        if self.arrangement_engaged {
            self.outputs
                .outputs()
                .iter()
                .filter_map(|output| {
                    let list = &output.clip_instances;
                    let current_end = list
                        .covering(pos)
                        .and_then(|index| list.get(index))
                        .map(|instance| instance.end());
                    let next_start = list
                        .first_starting_at_or_after(pos.saturating_add(1))
                        .and_then(|index| list.get(index))
                        .map(|instance| instance.pos);
                    match (current_end, next_start) {
                        (Some(end), Some(start)) => Some(end.min(start)),
                        (end, start) => end.or(start),
                    }
                })
                .min()
                .unwrap_or(MAX_SEQUENCE_LENGTH)
        } else {
            self.clips
                .session()
                .iter()
                .filter(|clip| clip.armed)
                .map(|clip| pos.saturating_add(clip.ticks_until_loop_end(pos)))
                .min()
                .unwrap_or(MAX_SEQUENCE_LENGTH)
        }
    }

    pub fn arrangement_has_any_clip_instances(&self) -> bool {
        self.outputs
            .outputs()
            .iter()
            .any(|output| !output.clip_instances.is_empty())
    }

    /// Whether an output sounds in arrangement playback given mute and solo
    pub fn is_output_active_in_arrangement(&self, id: OutputId) -> bool {
        self.outputs.get(id).is_some_and(|output| {
            !output.muted_in_arrangement
                && (!self.any_outputs_soloing_in_arrangement || output.soloing_in_arrangement)
        })
    }

    /// Recompute the arrangement solo flag from every output
    pub fn reassess_whether_any_outputs_soloing_in_arrangement(&mut self) -> bool {
        self.any_outputs_soloing_in_arrangement = self
            .outputs
            .outputs()
            .iter()
            .any(|output| output.soloing_in_arrangement);
        self.any_outputs_soloing_in_arrangement
    }

    pub fn any_outputs_soloing_in_arrangement(&self) -> bool {
        self.any_outputs_soloing_in_arrangement
    }

    pub fn set_output_soloing_in_arrangement(&mut self, id: OutputId, soloing: bool) -> SongResult<()> {
        self.outputs
            .get_mut(id)
            .ok_or(SongError::OutputNotFound(id))?
            .soloing_in_arrangement = soloing;
        self.reassess_whether_any_outputs_soloing_in_arrangement();
        Ok(())
    }

    pub fn set_output_muted_in_arrangement(&mut self, id: OutputId, muted: bool) -> SongResult<()> {
        self.outputs
            .get_mut(id)
            .ok_or(SongError::OutputNotFound(id))?
            .muted_in_arrangement = muted;
        Ok(())
    }

    /// Place one clip instance on an output's timeline
    pub fn place_clip_instance(&mut self, output: OutputId, instance: ClipInstance) -> SongResult<usize> {
        if let Some(id) = instance.clip {
            if self.clips.require(id)?.output != output {
                return Err(SongError::InvalidOperation(format!(
                    "{id} does not belong to {output}"
                )));
            }
        }
        let (index, replaced) = self
            .outputs
            .get_mut(output)
            .ok_or(SongError::OutputNotFound(output))?
            .clip_instances
            .insert(instance);
        if let Some(old) = replaced.and_then(|instance| instance.clip) {
            self.deleting_clip_instance_for_clip(output, old)?;
        }
        Ok(index)
    }

    /// Remove one instance and clean up after its clip
    pub fn remove_clip_instance(&mut self, output: OutputId, index: usize) -> SongResult<bool> {
        let removed = self
            .outputs
            .get_mut(output)
            .ok_or(SongError::OutputNotFound(output))?
            .clip_instances
            .remove(index);
        match removed.and_then(|instance| instance.clip) {
            Some(clip) => self.deleting_clip_instance_for_clip(output, clip),
            None => Ok(false),
        }
    }

    /// Follow-up after an instance of `clip` left `output`'s timeline.
    ///
    /// An arrangement-only clip with no instances left is deleted. Returns
    /// whether that happened.
    pub fn deleting_clip_instance_for_clip(&mut self, output: OutputId, clip: ClipId) -> SongResult<bool> {
        let still_placed = self
            .outputs
            .get(output)
            .ok_or(SongError::OutputNotFound(output))?
            .clip_instances
            .references_clip(clip);
        if still_placed {
            return Ok(false);
        }
        match self.clips.remove_arrangement_only(clip) {
            Some(removed) => {
                self.delete_clip_object(removed, super::InstrumentRemoval::Keep)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
