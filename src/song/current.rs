// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! The process-wide current song.
//!
//! The foreground locks the song for every edit. The audio thread only
//! ever `try_lock`s: if the foreground holds the song it renders silence
//! for that block instead of waiting. Swapping in a new song tears the old
//! one down first, so at most one song is live.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::info;

use super::Song;
use crate::audio::{StereoSample, VoiceRenderer};
use crate::config::EngineConfig;
use crate::error::{SongError, SongResult};

/// Shared handle to a live song
pub type SongHandle = Arc<Mutex<Song>>;

/// Where the slot is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongSlotState {
    Empty,
    /// A replacement is being built; any current song keeps playing
    Loading,
    Current,
}

/// Holder of the current song
#[derive(Default)]
pub struct SongSlot {
    current: ArcSwapOption<Mutex<Song>>,
    loading: AtomicBool,
}

impl SongSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SongSlotState {
        if self.loading.load(Ordering::Acquire) {
            SongSlotState::Loading
        } else if self.current.load().is_some() {
            SongSlotState::Current
        } else {
            SongSlotState::Empty
        }
    }

    /// The current song, if any
    pub fn current(&self) -> Option<SongHandle> {
        self.current.load_full()
    }

    /// Mark a load as started. Only one load may run at a time.
    pub fn begin_loading(&self) -> SongResult<()> {
        if self.loading.swap(true, Ordering::AcqRel) {
            return Err(SongError::InvalidOperation("a song is already loading".into()));
        }
        Ok(())
    }

    /// Abandon a load, keeping whatever song was current
    pub fn cancel_loading(&self) {
        self.loading.store(false, Ordering::Release);
    }

    /// Make `song` current, tearing down the previous song first
    pub fn install(&self, song: Song) -> SongHandle {
        self.tear_down_current();
        let handle = Arc::new(Mutex::new(song));
        self.current.store(Some(Arc::clone(&handle)));
        self.loading.store(false, Ordering::Release);
        info!(song = %handle.lock().name, "song is now current");
        handle
    }

    /// Load a song file and make it current. On failure the previous song stays.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P, config: &EngineConfig) -> Result<SongHandle> {
        self.begin_loading()?;
        match Song::read_from_file(path, config) {
            Ok(song) => Ok(self.install(song)),
            Err(err) => {
                self.cancel_loading();
                Err(err)
            }
        }
    }

    /// Tear down and drop the current song
    pub fn clear(&self) {
        self.tear_down_current();
        self.current.store(None);
    }

    fn tear_down_current(&self) {
        if let Some(old) = self.current.load_full() {
            old.lock().tear_down();
        }
    }

    /// Run a foreground edit against the current song
    pub fn with_song<R>(&self, edit: impl FnOnce(&mut Song) -> R) -> Option<R> {
        let handle = self.current.load_full()?;
        let mut song = handle.lock();
        Some(edit(&mut song))
    }

    /// Audio-thread render. Never blocks; renders silence when there is
    /// no song or the foreground holds it.
    pub fn render(
        &self,
        buffer: &mut [StereoSample],
        num_samples: usize,
        sidechain_buffer: &mut [i32],
        sidechain_hit_pending: i32,
        renderer: &mut impl VoiceRenderer,
    ) -> bool {
        let guard = self.current.load();
        if let Some(song) = (*guard).as_ref().and_then(|song| song.try_lock()) {
            song.render_audio(buffer, num_samples, sidechain_buffer, sidechain_hit_pending, renderer);
            return true;
        }
        let frames = num_samples.min(buffer.len());
        buffer[..frames].fill(StereoSample::SILENCE);
        let sidechain_frames = frames.min(sidechain_buffer.len());
        sidechain_buffer[..sidechain_frames].fill(0);
        false
    }
}
