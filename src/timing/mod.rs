// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Tick timing for the song engine.
//!
//! This module converts between the internal high-resolution tick count,
//! audio samples and musical time (BPM, quarter notes, bars), and maps the
//! coarse sync levels stored in song files onto the runtime tick space.

pub mod sync;
pub mod tempo;

pub use sync::SyncLevel;
pub use tempo::{TempoState, DEFAULT_BPM, SAMPLE_RATE};

/// Ticks per quarter note at tick magnitude 0 (the MIDI clock rate)
pub const BASE_TICKS_PER_QUARTER: u32 = 24;

/// Longest position the timeline can address, in ticks
pub const MAX_SEQUENCE_LENGTH: u32 = 0x7FFF_FFFF;

/// Scale a tick count up (positive magnitude) or down (negative) by powers of two
pub fn increase_magnitude(number: u32, magnitude: i32) -> u32 {
    if magnitude >= 0 {
        number.checked_shl(magnitude as u32).unwrap_or(u32::MAX)
    } else {
        number.checked_shr((-magnitude) as u32).unwrap_or(0)
    }
}
