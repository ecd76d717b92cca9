// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Tempo state and tick/sample conversion.
//!
//! The tick duration is held as a 32.32 fixed-point sample count
//! (`time_per_timer_tick_big`) together with a precomputed reciprocal so the
//! audio path can turn elapsed samples into ticks with one multiply and
//! shift. The two values are only ever written together by
//! [`TempoState::install`].

use tracing::{debug, warn};

use super::{increase_magnitude, SyncLevel, BASE_TICKS_PER_QUARTER};

/// Audio sample rate the engine runs at
pub const SAMPLE_RATE: u32 = 44_100;

/// Tempo used for new songs and as the fallback for bad persisted values
pub const DEFAULT_BPM: f64 = 120.0;

/// Default tick magnitude: 96 ticks per quarter note
pub const DEFAULT_TICK_MAGNITUDE: i32 = 2;

/// Samples in one minute divided by the base ticks per quarter note
const SAMPLES_PER_MINUTE_PER_BASE_TICK: f64 =
    SAMPLE_RATE as f64 * 60.0 / BASE_TICKS_PER_QUARTER as f64;

/// 1.0 in 32.32 fixed point
const FIXED_POINT_ONE: f64 = 4_294_967_296.0;

/// Shortest allowed tick, in samples
pub const MIN_TIME_PER_TIMER_TICK: f64 = 1.0;

/// Longest allowed tick, in samples
pub const MAX_TIME_PER_TIMER_TICK: f64 = 100_000.0;

/// Tick magnitudes outside this range are clamped
pub const MIN_TICK_MAGNITUDE: i32 = -4;
pub const MAX_TICK_MAGNITUDE: i32 = 8;

/// Tempo table for (magnitude, value) pairs: one octave of BPM in 16 steps.
/// The magnitude doubles or halves the looked-up value.
pub const TEMPO_PARAM_BPMS: [f64; 16] = [
    60.0, 62.656, 65.431, 68.328, 71.352, 74.512, 77.811, 81.256, 84.853, 88.610, 92.533,
    96.630, 100.908, 105.375, 110.041, 114.912,
];

/// Largest magnitude accepted by [`TempoState::set_from_params`]
pub const MAX_TEMPO_PARAM_MAGNITUDE: i32 = 6;

/// Swing amount bounds (percent away from straight)
pub const MAX_SWING_AMOUNT: i8 = 49;

fn big_from_samples(samples: f64) -> u64 {
    let clamped = samples.clamp(MIN_TIME_PER_TIMER_TICK, MAX_TIME_PER_TIMER_TICK);
    (clamped * FIXED_POINT_ONE) as u64
}

/// Tick-rate and musical-time state of a song
#[derive(Debug, Clone, PartialEq)]
pub struct TempoState {
    /// Samples per tick, 32.32 fixed point
    time_per_timer_tick_big: u64,
    /// 2^63 / `time_per_timer_tick_big`, i.e. ticks per sample in 1.31 fixed point
    divide_by_time_per_timer_tick: u32,
    /// How many powers of two the internal tick rate runs above the MIDI clock
    inside_world_tick_magnitude: i32,
    /// Compensation so the displayed BPM stays put while sync-scaling
    inside_world_tick_magnitude_offset_from_bpm: i32,
    swing_amount: i8,
    swing_interval: SyncLevel,
}

impl TempoState {
    /// Create tempo state at the given BPM and tick magnitude
    pub fn new(bpm: f64, tick_magnitude: i32) -> Self {
        let mut state = Self {
            time_per_timer_tick_big: 0,
            divide_by_time_per_timer_tick: 0,
            inside_world_tick_magnitude: tick_magnitude
                .clamp(MIN_TICK_MAGNITUDE, MAX_TICK_MAGNITUDE),
            inside_world_tick_magnitude_offset_from_bpm: 0,
            swing_amount: 0,
            swing_interval: SyncLevel::Sixteenth,
        };
        state.set_bpm(bpm);
        state
    }

    /// Install a new tick duration together with its reciprocal.
    ///
    /// Returns the value actually installed after clamping.
    pub fn install(&mut self, time_per_timer_tick_big: u64) -> u64 {
        let samples = time_per_timer_tick_big as f64 / FIXED_POINT_ONE;
        let big = if samples.is_finite()
            && (MIN_TIME_PER_TIMER_TICK..=MAX_TIME_PER_TIMER_TICK).contains(&samples)
        {
            time_per_timer_tick_big
        } else {
            big_from_samples(samples)
        };
        self.time_per_timer_tick_big = big;
        self.divide_by_time_per_timer_tick = ((1u64 << 63) / big) as u32;
        big
    }

    /// Samples per tick that corresponds to `bpm`, or None for an unusable tempo
    pub fn samples_for_bpm(&self, bpm: f64) -> Option<f64> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return None;
        }
        let samples = SAMPLES_PER_MINUTE_PER_BASE_TICK / bpm / 2f64.powi(self.bpm_magnitude());
        samples.is_finite().then_some(samples)
    }

    /// Set tempo from a BPM value. Unusable values fall back to the default tempo.
    pub fn set_bpm(&mut self, bpm: f64) -> u64 {
        let samples = match self.samples_for_bpm(bpm) {
            Some(samples) => samples,
            None => {
                warn!(bpm, "unusable tempo, falling back to default");
                self.samples_for_bpm(DEFAULT_BPM)
                    .unwrap_or(MAX_TIME_PER_TIMER_TICK)
            }
        };
        self.set_from_num_samples(samples)
    }

    /// Set tempo from a (possibly fractional) number of samples per tick
    pub fn set_from_num_samples(&mut self, samples: f64) -> u64 {
        if !samples.is_finite() || samples <= 0.0 {
            warn!(samples, "unusable tick duration, falling back to default tempo");
            let fallback = SAMPLES_PER_MINUTE_PER_BASE_TICK
                / DEFAULT_BPM
                / 2f64.powi(self.bpm_magnitude());
            return self.install(big_from_samples(fallback));
        }
        self.install(big_from_samples(samples))
    }

    /// Set tempo from a stored (magnitude, table value) pair
    pub fn set_from_params(&mut self, magnitude: i32, which_value: i32) -> u64 {
        let Some(&table_bpm) = usize::try_from(which_value)
            .ok()
            .and_then(|index| TEMPO_PARAM_BPMS.get(index))
        else {
            warn!(which_value, "tempo table index out of range, using default tempo");
            return self.set_bpm(DEFAULT_BPM);
        };
        let magnitude = magnitude.clamp(-MAX_TEMPO_PARAM_MAGNITUDE, MAX_TEMPO_PARAM_MAGNITUDE);
        let bpm = table_bpm * 2f64.powi(magnitude);
        debug!(magnitude, which_value, bpm, "tempo from params");
        self.set_bpm(bpm)
    }

    /// Raw tick duration
    pub fn time_per_timer_tick_big(&self) -> u64 {
        self.time_per_timer_tick_big
    }

    /// Precomputed reciprocal of the tick duration
    pub fn divide_by_time_per_timer_tick(&self) -> u32 {
        self.divide_by_time_per_timer_tick
    }

    /// Tick duration in samples
    pub fn time_per_timer_tick_float(&self) -> f64 {
        self.time_per_timer_tick_big as f64 / FIXED_POINT_ONE
    }

    /// Tick duration rounded to whole samples
    pub fn time_per_timer_tick_rounded(&self) -> u32 {
        ((self.time_per_timer_tick_big + (1 << 31)) >> 32) as u32
    }

    /// Displayed tempo
    pub fn bpm(&self) -> f64 {
        SAMPLES_PER_MINUTE_PER_BASE_TICK
            / (self.time_per_timer_tick_float() * 2f64.powi(self.bpm_magnitude()))
    }

    pub fn inside_world_tick_magnitude(&self) -> i32 {
        self.inside_world_tick_magnitude
    }

    pub fn magnitude_offset_from_bpm(&self) -> i32 {
        self.inside_world_tick_magnitude_offset_from_bpm
    }

    /// Magnitude the displayed BPM is computed at; constant under sync-scaling
    pub fn bpm_magnitude(&self) -> i32 {
        self.inside_world_tick_magnitude + self.inside_world_tick_magnitude_offset_from_bpm
    }

    /// Move the internal tick magnitude while keeping the displayed BPM magnitude.
    ///
    /// Passing the BPM magnitude itself clears the offset.
    pub fn set_tick_magnitude(&mut self, magnitude: i32) {
        let bpm_magnitude = self.bpm_magnitude();
        let magnitude = magnitude.clamp(MIN_TICK_MAGNITUDE, MAX_TICK_MAGNITUDE);
        self.inside_world_tick_magnitude = magnitude;
        self.inside_world_tick_magnitude_offset_from_bpm = bpm_magnitude - magnitude;
    }

    /// Restore persisted magnitude values, clamping the pair into range
    pub fn restore_magnitudes(&mut self, magnitude: i32, offset_from_bpm: i32) {
        self.inside_world_tick_magnitude = magnitude.clamp(MIN_TICK_MAGNITUDE, MAX_TICK_MAGNITUDE);
        let bpm_magnitude = (self.inside_world_tick_magnitude + offset_from_bpm)
            .clamp(MIN_TICK_MAGNITUDE, MAX_TICK_MAGNITUDE);
        self.inside_world_tick_magnitude_offset_from_bpm =
            bpm_magnitude - self.inside_world_tick_magnitude;
    }

    /// Length of a quarter note in ticks
    pub fn quarter_note_length(&self) -> u32 {
        increase_magnitude(BASE_TICKS_PER_QUARTER, self.inside_world_tick_magnitude)
    }

    /// Length of a 4/4 bar in ticks
    pub fn bar_length(&self) -> u32 {
        self.quarter_note_length() * 4
    }

    /// Ticks elapsed over a number of samples
    pub fn samples_to_ticks(&self, samples: u32) -> u32 {
        ((samples as u64 * self.divide_by_time_per_timer_tick as u64) >> 31) as u32
    }

    /// Samples spanned by a number of ticks
    pub fn ticks_to_samples(&self, ticks: u32) -> u64 {
        ((ticks as u128 * self.time_per_timer_tick_big as u128) >> 32) as u64
    }

    /// Current playback position given the last actioned tick and the
    /// samples rendered since
    pub fn live_pos(&self, last_tick_pos: u32, samples_since_last_tick: u32) -> u32 {
        last_tick_pos.saturating_add(self.samples_to_ticks(samples_since_last_tick))
    }

    /// Whether doubling the tempo keeps the tick duration in range
    pub fn may_double_tempo(&self) -> bool {
        (self.time_per_timer_tick_big >> 1) as f64 / FIXED_POINT_ONE >= MIN_TIME_PER_TIMER_TICK
    }

    pub fn swing_amount(&self) -> i8 {
        self.swing_amount
    }

    pub fn set_swing_amount(&mut self, amount: i8) {
        self.swing_amount = amount.clamp(-MAX_SWING_AMOUNT, MAX_SWING_AMOUNT);
    }

    pub fn swing_interval(&self) -> SyncLevel {
        self.swing_interval
    }

    /// Change the division swing applies to. Off is not a valid interval.
    pub fn change_swing_interval(&mut self, interval: SyncLevel) {
        self.swing_interval = if interval == SyncLevel::Off {
            SyncLevel::Whole
        } else {
            interval
        };
    }

    pub fn has_any_swing(&self) -> bool {
        self.swing_amount != 0
    }

    /// Decode a sync level read from a song file
    pub fn sync_level_from_file_value(&self, file_value: i32) -> SyncLevel {
        SyncLevel::from_file_value(file_value, self.bpm_magnitude())
    }

    /// Encode a sync level for a song file
    pub fn sync_level_to_file_value(&self, level: SyncLevel) -> i32 {
        level.to_file_value(self.bpm_magnitude())
    }
}

impl Default for TempoState {
    fn default() -> Self {
        Self::new(DEFAULT_BPM, DEFAULT_TICK_MAGNITUDE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tempo() {
        let tempo = TempoState::default();
        assert!((tempo.bpm() - 120.0).abs() < 1e-6);
        assert_eq!(tempo.quarter_note_length(), 96);
        assert_eq!(tempo.bar_length(), 384);
        // 120 BPM, 96 ticks per quarter: 22050 samples per quarter
        assert!((tempo.time_per_timer_tick_float() - 229.6875).abs() < 1e-6);
        assert_eq!(tempo.time_per_timer_tick_rounded(), 230);
    }

    #[test]
    fn test_pair_installed_together() {
        let mut tempo = TempoState::default();
        tempo.set_bpm(140.0);
        let expected = ((1u64 << 63) / tempo.time_per_timer_tick_big()) as u32;
        assert_eq!(tempo.divide_by_time_per_timer_tick(), expected);
    }

    #[test]
    fn test_bpm_round_trip_idempotent() {
        let mut tempo = TempoState::default();
        for bpm in [33.3, 90.0, 120.0, 127.77, 174.0, 999.0] {
            let first = tempo.set_bpm(bpm);
            let read_back = tempo.bpm();
            let second = tempo.set_bpm(read_back);
            assert!(first.abs_diff(second) <= 1, "bpm {bpm}: {first} vs {second}");
        }
    }

    #[test]
    fn test_invalid_bpm_falls_back_to_default() {
        let mut tempo = TempoState::default();
        tempo.set_bpm(90.0);
        tempo.set_bpm(f64::NAN);
        assert!((tempo.bpm() - DEFAULT_BPM).abs() < 1e-6);
        tempo.set_bpm(-3.0);
        assert!((tempo.bpm() - DEFAULT_BPM).abs() < 1e-6);
        tempo.set_from_num_samples(0.0);
        assert!((tempo.bpm() - DEFAULT_BPM).abs() < 1e-6);
    }

    #[test]
    fn test_extreme_tick_duration_is_clamped() {
        let mut tempo = TempoState::default();
        tempo.set_from_num_samples(1e12);
        assert!((tempo.time_per_timer_tick_float() - MAX_TIME_PER_TIMER_TICK).abs() < 1e-6);
        tempo.install(1);
        assert!((tempo.time_per_timer_tick_float() - MIN_TIME_PER_TIMER_TICK).abs() < 1e-6);
    }

    #[test]
    fn test_set_from_params() {
        let mut tempo = TempoState::default();
        tempo.set_from_params(1, 0);
        assert!((tempo.bpm() - 120.0).abs() < 1e-6);
        tempo.set_from_params(0, 8);
        assert!((tempo.bpm() - 84.853).abs() < 1e-3);
        tempo.set_from_params(0, 42);
        assert!((tempo.bpm() - DEFAULT_BPM).abs() < 1e-6);
    }

    #[test]
    fn test_samples_to_ticks() {
        let tempo = TempoState::default();
        // One quarter note is 22050 samples at 120 BPM
        let ticks = tempo.samples_to_ticks(22_050);
        assert!((95..=96).contains(&ticks));
        assert_eq!(tempo.ticks_to_samples(96), 22_050);
        assert_eq!(tempo.live_pos(1_000, 0), 1_000);
        assert!(tempo.live_pos(1_000, 22_050) >= 1_095);
    }

    #[test]
    fn test_tick_magnitude_keeps_bpm() {
        let mut tempo = TempoState::default();
        tempo.set_bpm(100.0);
        tempo.set_tick_magnitude(4);
        assert_eq!(tempo.inside_world_tick_magnitude(), 4);
        assert_eq!(tempo.magnitude_offset_from_bpm(), -2);
        assert!((tempo.bpm() - 100.0).abs() < 1e-6);
        tempo.set_tick_magnitude(tempo.bpm_magnitude());
        assert_eq!(tempo.magnitude_offset_from_bpm(), 0);
    }

    #[test]
    fn test_swing() {
        let mut tempo = TempoState::default();
        assert!(!tempo.has_any_swing());
        tempo.set_swing_amount(80);
        assert_eq!(tempo.swing_amount(), MAX_SWING_AMOUNT);
        assert!(tempo.has_any_swing());
        tempo.change_swing_interval(SyncLevel::Off);
        assert_eq!(tempo.swing_interval(), SyncLevel::Whole);
    }

    #[test]
    fn test_may_double_tempo() {
        let mut tempo = TempoState::default();
        assert!(tempo.may_double_tempo());
        tempo.install(1u64 << 32);
        assert!(!tempo.may_double_tempo());
    }
}
