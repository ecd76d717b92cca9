// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! The song aggregate.
//!
//! A [`Song`] owns every clip, output, backed-up parameter set, section,
//! the scale and the tempo. All mutation goes through `&mut Song`, so the
//! audio side sees either the state before an edit or the state after it
//! (see [`current`] for how the two contexts share a song).
//!
//! Operations are grouped by concern:
//! - `tempo`: tempo, swing and sync-scaling
//! - `scale`: scale edits that also touch in-key clips
//! - `lifecycle`: adding, replacing, hibernating and destroying outputs
//! - `clips`: session clip management, solo and overdubs
//! - `playback`: clip activeness and the arrangement timeline
//! - `render`: the audio entry point and MIDI program sends
//! - `persist`: reading and writing song documents

pub mod action;
pub mod clips;
pub mod current;
pub mod lifecycle;
pub mod persist;
pub mod playback;
pub mod render;
pub mod scale;
pub mod tempo;

pub use action::{Action, ActionLog, LogAction};
pub use clips::{
    ClipFilter, InstrumentRemoval, OverdubCancel, RemoveSessionClipOptions, VerticalShift,
};
pub use current::{SongHandle, SongSlot, SongSlotState};
pub use lifecycle::{Availability, ReplaceOptions};
pub use playback::DetachClips;

use tracing::{debug, info, warn};

use crate::arrangement::{Section, MAX_NUM_SECTIONS};
use crate::config::EngineConfig;
use crate::error::{SongError, SongResult};
use crate::ids::{ClipId, IdAllocator, OutputId};
use crate::music::ScaleState;
use crate::params::BackupCache;
use crate::sequencer::{Clip, ClipRegistry, Output, OutputRoster};
use crate::timing::TempoState;

/// One loaded song
#[derive(Debug)]
pub struct Song {
    pub name: String,
    ids: IdAllocator,
    clips: ClipRegistry,
    outputs: OutputRoster,
    backups: BackupCache,
    sections: [Section; MAX_NUM_SECTIONS],
    scale: ScaleState,
    tempo: TempoState,
    /// Clip whose length defines the external clock scale
    input_tick_scale_clip: Option<ClipId>,
    any_clips_soloing: bool,
    any_outputs_soloing_in_arrangement: bool,
    /// Arrangement playback drives clip activeness
    arrangement_engaged: bool,
    /// Fill clips are playing in place of their output's regular clips
    fill_mode_active: bool,
    /// Clip open in the editor
    current_clip: Option<ClipId>,
    song_view_y_scroll: i32,
    max_outputs: usize,
    actions: ActionLog,
}

impl Song {
    /// Create an empty song using engine defaults
    pub fn new(config: &EngineConfig) -> Self {
        let mut tempo = TempoState::new(config.default_bpm, config.default_tick_magnitude);
        tempo.change_swing_interval(config.default_swing_interval);
        Self {
            name: String::from("Untitled"),
            ids: IdAllocator::new(),
            clips: ClipRegistry::new(config.max_clips),
            outputs: OutputRoster::new(config.hibernation_capacity),
            backups: BackupCache::new(),
            sections: [Section::default(); MAX_NUM_SECTIONS],
            scale: ScaleState::default(),
            tempo,
            input_tick_scale_clip: None,
            any_clips_soloing: false,
            any_outputs_soloing_in_arrangement: false,
            arrangement_engaged: false,
            fill_mode_active: false,
            current_clip: None,
            song_view_y_scroll: 0,
            max_outputs: config.max_outputs,
            actions: ActionLog::new(config.undo_depth),
        }
    }

    /// Id source for new clips and outputs
    pub fn ids(&mut self) -> &mut IdAllocator {
        &mut self.ids
    }

    pub fn clips(&self) -> &ClipRegistry {
        &self.clips
    }

    pub fn outputs(&self) -> &OutputRoster {
        &self.outputs
    }

    pub fn backups(&self) -> &BackupCache {
        &self.backups
    }

    /// Direct cache access, for callers parking or reclaiming parameters
    pub fn backups_mut(&mut self) -> &mut BackupCache {
        &mut self.backups
    }

    pub fn sections(&self) -> &[Section; MAX_NUM_SECTIONS] {
        &self.sections
    }

    pub fn section_mut(&mut self, section: usize) -> Option<&mut Section> {
        self.sections.get_mut(section)
    }

    pub fn scale(&self) -> &ScaleState {
        &self.scale
    }

    pub fn tempo(&self) -> &TempoState {
        &self.tempo
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.get(id)
    }

    /// Mutable access to a clip's content. Ownership and array membership
    /// can only change through song operations.
    pub fn clip_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.clips.get_mut(id)
    }

    pub fn output(&self, id: OutputId) -> Option<&Output> {
        self.outputs.get(id)
    }

    pub fn output_mut(&mut self, id: OutputId) -> Option<&mut Output> {
        self.outputs.get_mut(id)
    }

    pub fn current_clip(&self) -> Option<ClipId> {
        self.current_clip
    }

    pub fn set_current_clip(&mut self, clip: Option<ClipId>) -> SongResult<()> {
        if let Some(id) = clip {
            self.clips.require(id)?;
        }
        self.current_clip = clip;
        Ok(())
    }

    pub fn song_view_y_scroll(&self) -> i32 {
        self.song_view_y_scroll
    }

    pub fn set_song_view_y_scroll(&mut self, scroll: i32) {
        self.song_view_y_scroll = scroll;
    }

    pub fn is_arrangement_engaged(&self) -> bool {
        self.arrangement_engaged
    }

    pub fn undo_depth(&self) -> usize {
        self.actions.len()
    }

    /// Record an undo action, releasing whatever the evicted one owned
    pub(crate) fn record_action(&mut self, action: Action) {
        debug!(action = action.describe(), "recorded");
        if let Some(evicted) = self.actions.record(action) {
            self.discard_action(evicted);
        }
    }

    /// Destroy what an action owns, for actions that can no longer be undone
    fn discard_action(&mut self, action: Action) {
        if let Action::ArrangementCleared { orphaned_clips, .. } = action {
            for clip in orphaned_clips {
                self.backups.delete_for_clip(clip.id);
            }
        }
    }

    /// Drop undo actions that would restore clips or instances onto an
    /// output leaving the active list
    pub(crate) fn discard_actions_referencing_output(&mut self, id: OutputId) {
        let stale = self.actions.take_where(|action| action.references_output(id));
        if !stale.is_empty() {
            warn!(output = %id, count = stale.len(), "undo history for retired output discarded");
        }
        for action in stale {
            self.discard_action(action);
        }
    }

    /// Revert the newest recorded action.
    ///
    /// Nothing changes if the action can no longer apply.
    pub fn undo(&mut self) -> SongResult<bool> {
        let Some(action) = self.actions.pop() else {
            return Ok(false);
        };
        if let Some(missing) = action.find_output(|id| self.outputs.get(id).is_some()) {
            warn!(action = action.describe(), output = %missing, "undo refers to inactive output, discarded");
            self.discard_action(action);
            return Err(SongError::OutputNotFound(missing));
        }
        if let Action::ArrangementCleared { orphaned_clips, .. } = &action {
            let limit = self.clips.max_clips();
            if self.clips.len() + orphaned_clips.len() > limit {
                self.actions.record(action);
                return Err(SongError::CapacityExceeded { what: "clips", limit });
            }
        }
        info!(action = action.describe(), "undo");
        match action {
            Action::TempoChange { before, .. } => {
                self.tempo.install(before);
            }
            Action::SwingChange { before, .. } => {
                self.tempo.set_swing_amount(before);
            }
            Action::ArrangementCleared {
                truncations,
                orphaned_clips,
                ..
            } => {
                for clip in orphaned_clips {
                    self.clips.push_arrangement_only(clip)?;
                }
                let mut displaced = Vec::new();
                for (output_id, truncation) in &truncations {
                    let output = self
                        .outputs
                        .get_mut(*output_id)
                        .ok_or(SongError::OutputNotFound(*output_id))?;
                    displaced.extend(
                        output
                            .clip_instances
                            .undo_truncation(truncation)
                            .into_iter()
                            .filter_map(|instance| instance.clip)
                            .map(|clip| (*output_id, clip)),
                    );
                }
                for (output_id, clip) in displaced {
                    self.deleting_clip_instance_for_clip(output_id, clip)?;
                }
            }
        }
        Ok(true)
    }

    /// Check every structural invariant.
    ///
    /// A failure means the song can no longer be trusted.
    pub fn check_consistency(&self) -> SongResult<()> {
        if !self.clips.is_well_formed() {
            return Err(SongError::Consistency("clip registered twice".into()));
        }
        if !self.outputs.is_well_formed() {
            return Err(SongError::Consistency("output owned twice".into()));
        }
        for clip in self.clips.iter() {
            if self.outputs.get(clip.output).is_none() {
                return Err(SongError::Consistency(format!(
                    "{} references inactive {}",
                    clip.id, clip.output
                )));
            }
        }
        for output in self.outputs.outputs() {
            if !output.clip_instances.is_well_formed() {
                return Err(SongError::Consistency(format!(
                    "{} has overlapping clip instances",
                    output.id
                )));
            }
            let dangling = output
                .clip_instances
                .iter()
                .filter_map(|instance| instance.clip)
                .find(|id| self.clips.get(*id).map(|clip| clip.output) != Some(output.id));
            if let Some(id) = dangling {
                return Err(SongError::Consistency(format!(
                    "{} has an instance of {id} which is not its clip",
                    output.id
                )));
            }
            if let Some(active) = output.active_clip {
                if self.clips.get(active).map(|clip| clip.output) != Some(output.id) {
                    return Err(SongError::Consistency(format!(
                        "{} bound to foreign {active}",
                        output.id
                    )));
                }
            }
        }
        for (_, clip, _) in self.backups.iter() {
            if let Some(id) = clip {
                if self.clips.get(id).is_none() && !self.action_owns_clip(id) {
                    return Err(SongError::Consistency(format!("backup references deleted {id}")));
                }
            }
        }
        if let Some(id) = self.input_tick_scale_clip {
            self.clips.require(id).map_err(|_| {
                SongError::Consistency(format!("sync-scaling {id} no longer exists"))
            })?;
        }
        Ok(())
    }

    fn action_owns_clip(&self, id: ClipId) -> bool {
        self.actions.iter().any(|action| match action {
            Action::ArrangementCleared { orphaned_clips, .. } => {
                orphaned_clips.iter().any(|clip| clip.id == id)
            }
            _ => false,
        })
    }

    /// Release every owned registry
    pub fn tear_down(&mut self) {
        let clips = self.clips.drain_all();
        let outputs = self.outputs.drain_all();
        self.actions.drain();
        self.backups.clear();
        self.input_tick_scale_clip = None;
        self.current_clip = None;
        self.any_clips_soloing = false;
        self.any_outputs_soloing_in_arrangement = false;
        self.arrangement_engaged = false;
        self.fill_mode_active = false;
        info!(clips = clips.len(), outputs = outputs.len(), song = %self.name, "song torn down");
    }
}

impl Default for Song {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_song_defaults() {
        let song = Song::default();
        assert!(song.clips().is_empty());
        assert!(song.outputs().is_empty());
        assert!((song.tempo().bpm() - 120.0).abs() < 1e-6);
        assert_eq!(song.scale().num_mode_notes(), 7);
        assert!(song.check_consistency().is_ok());
    }

    #[test]
    fn test_undo_with_empty_log() {
        let mut song = Song::default();
        assert!(!song.undo().unwrap());
    }
}
