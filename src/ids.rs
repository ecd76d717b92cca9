// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Handles used for every back-reference inside a song.
//!
//! Clips point at outputs and cache entries point at clips through these
//! ids rather than through owning references; the owning registry resolves
//! them and purges them when the owner goes away.

use std::fmt;

macro_rules! song_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Raw id value
            pub fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

song_id!(
    /// Identifies a clip in either the session or the arrangement-only array
    ClipId,
    "clip#"
);
song_id!(
    /// Identifies an output, active or hibernating
    OutputId,
    "output#"
);
song_id!(
    /// Identifies a modulatable entity (an output's sound, or one kit drum)
    ModControllableId,
    "mc#"
);

/// Monotonic id source owned by a song.
///
/// Ids are never reused within a song, so a stale handle can never alias a
/// newer object.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self) -> u32 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        id
    }

    pub fn clip(&mut self) -> ClipId {
        ClipId(self.bump())
    }

    pub fn output(&mut self) -> OutputId {
        OutputId(self.bump())
    }

    pub fn mod_controllable(&mut self) -> ModControllableId {
        ModControllableId(self.bump())
    }
}
