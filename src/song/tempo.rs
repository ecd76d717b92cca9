// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Tempo, swing and sync-scaling operations on a song.

use tracing::{debug, info};

use super::{Action, LogAction, Song};
use crate::error::SongResult;
use crate::ids::ClipId;
use crate::timing::{increase_magnitude, SyncLevel, BASE_TICKS_PER_QUARTER};

/// MIDI clock ticks in one 4/4 bar
const INPUT_TICKS_PER_BAR: u32 = BASE_TICKS_PER_QUARTER * 4;

/// floor(log2(numerator / denominator)) for non-zero values
fn floor_log2_ratio(numerator: u32, denominator: u32) -> i32 {
    if numerator >= denominator {
        (numerator / denominator).ilog2() as i32
    } else {
        let ceil_ratio = denominator.div_ceil(numerator);
        -(ceil_ratio.next_power_of_two().trailing_zeros() as i32)
    }
}

impl Song {
    fn finish_tempo_change(&mut self, before: u64, log: LogAction) {
        let after = self.tempo.time_per_timer_tick_big();
        if before == after {
            return;
        }
        debug!(bpm = self.tempo.bpm(), "tempo changed");
        if log == LogAction::Record {
            self.record_action(Action::TempoChange { before, after });
        }
    }

    /// Set tempo from BPM. Unusable values fall back to the default tempo.
    pub fn set_bpm(&mut self, bpm: f64, log: LogAction) {
        let before = self.tempo.time_per_timer_tick_big();
        self.tempo.set_bpm(bpm);
        self.finish_tempo_change(before, log);
    }

    /// Set tempo from a number of samples per tick
    pub fn set_tempo_from_num_samples(&mut self, samples: f64, log: LogAction) {
        let before = self.tempo.time_per_timer_tick_big();
        self.tempo.set_from_num_samples(samples);
        self.finish_tempo_change(before, log);
    }

    /// Set tempo from a stored (magnitude, table value) pair
    pub fn set_tempo_from_params(&mut self, magnitude: i32, which_value: i32, log: LogAction) {
        let before = self.tempo.time_per_timer_tick_big();
        self.tempo.set_from_params(magnitude, which_value);
        self.finish_tempo_change(before, log);
    }

    /// Install a raw 32.32 tick duration
    pub fn set_time_per_timer_tick(&mut self, time_per_timer_tick_big: u64, log: LogAction) {
        let before = self.tempo.time_per_timer_tick_big();
        self.tempo.install(time_per_timer_tick_big);
        self.finish_tempo_change(before, log);
    }

    /// Double the tempo if the tick duration allows it
    pub fn double_tempo(&mut self, log: LogAction) -> bool {
        if !self.tempo.may_double_tempo() {
            return false;
        }
        let halved = self.tempo.time_per_timer_tick_big() >> 1;
        self.set_time_per_timer_tick(halved, log);
        true
    }

    pub fn set_swing_amount(&mut self, amount: i8, log: LogAction) {
        let before = self.tempo.swing_amount();
        self.tempo.set_swing_amount(amount);
        let after = self.tempo.swing_amount();
        if before != after && log == LogAction::Record {
            self.record_action(Action::SwingChange { before, after });
        }
    }

    pub fn change_swing_interval(&mut self, interval: SyncLevel) {
        self.tempo.change_swing_interval(interval);
    }

    pub fn input_tick_scale_clip(&self) -> Option<ClipId> {
        self.input_tick_scale_clip
    }

    /// Internal ticks per incoming MIDI clock tick
    pub fn input_tick_scale(&self) -> u32 {
        match self.input_tick_scale_clip.and_then(|id| self.clips.get(id)) {
            Some(clip) => (clip.loop_length / INPUT_TICKS_PER_BAR).max(1),
            None => increase_magnitude(1, self.tempo.inside_world_tick_magnitude()).max(1),
        }
    }

    /// Choose the clip whose length an incoming clock bar maps onto.
    ///
    /// The internal tick magnitude follows the clip; the displayed BPM does not move.
    pub fn set_input_tick_scale_clip(&mut self, clip: Option<ClipId>) -> SongResult<()> {
        if let Some(id) = clip {
            self.clips.require(id)?;
        }
        self.input_tick_scale_clip = clip;
        self.input_tick_scale_potentially_changed();
        info!(clip = ?clip.map(|id| id.raw()), magnitude = self.tempo.inside_world_tick_magnitude(), "sync-scaling clip set");
        Ok(())
    }

    /// Re-derive the tick magnitude after the sync-scaling clip or its length changed
    pub(crate) fn input_tick_scale_potentially_changed(&mut self) {
        let bpm_magnitude = self.tempo.bpm_magnitude();
        match self.input_tick_scale_clip.and_then(|id| self.clips.get(id)) {
            Some(clip) => {
                let magnitude = floor_log2_ratio(clip.loop_length.max(1), INPUT_TICKS_PER_BAR);
                self.tempo.set_tick_magnitude(magnitude);
            }
            None => self.tempo.set_tick_magnitude(bpm_magnitude),
        }
    }
}
