// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Clip ownership: session clips and arrangement-only clips.
//!
//! Each clip value lives in exactly one of the two arrays. Moving a clip
//! between them moves the value.

use crate::error::{SongError, SongResult};
use crate::ids::{ClipId, OutputId};

use super::clip::Clip;

/// Default total clip capacity
pub const DEFAULT_MAX_CLIPS: usize = 1024;

/// Which array a clip lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipArray {
    Session,
    ArrangementOnly,
}

/// Owner of every clip in a song
#[derive(Debug)]
pub struct ClipRegistry {
    session: Vec<Clip>,
    arrangement_only: Vec<Clip>,
    max_clips: usize,
}

impl ClipRegistry {
    /// Create an empty registry
    pub fn new(max_clips: usize) -> Self {
        Self {
            session: Vec::new(),
            arrangement_only: Vec::new(),
            max_clips,
        }
    }

    /// Session clips in launch-grid order
    pub fn session(&self) -> &[Clip] {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut [Clip] {
        &mut self.session
    }

    pub fn arrangement_only(&self) -> &[Clip] {
        &self.arrangement_only
    }

    pub fn arrangement_only_mut(&mut self) -> &mut [Clip] {
        &mut self.arrangement_only
    }

    /// Total clips in both arrays
    pub fn len(&self) -> usize {
        self.session.len() + self.arrangement_only.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_clips(&self) -> usize {
        self.max_clips
    }

    /// All clips: session first, then arrangement-only
    pub fn iter(&self) -> impl Iterator<Item = &Clip> {
        self.session.iter().chain(self.arrangement_only.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Clip> {
        self.session.iter_mut().chain(self.arrangement_only.iter_mut())
    }

    /// Which array holds a clip, and at what index
    pub fn locate(&self, id: ClipId) -> Option<(ClipArray, usize)> {
        if let Some(index) = self.session.iter().position(|clip| clip.id == id) {
            return Some((ClipArray::Session, index));
        }
        self.arrangement_only
            .iter()
            .position(|clip| clip.id == id)
            .map(|index| (ClipArray::ArrangementOnly, index))
    }

    pub fn session_index_of(&self, id: ClipId) -> Option<usize> {
        self.session.iter().position(|clip| clip.id == id)
    }

    pub fn get(&self, id: ClipId) -> Option<&Clip> {
        self.iter().find(|clip| clip.id == id)
    }

    pub fn get_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.iter_mut().find(|clip| clip.id == id)
    }

    /// Look up a clip or report it missing
    pub fn require(&self, id: ClipId) -> SongResult<&Clip> {
        self.get(id).ok_or(SongError::ClipNotFound(id))
    }

    pub fn require_mut(&mut self, id: ClipId) -> SongResult<&mut Clip> {
        self.get_mut(id).ok_or(SongError::ClipNotFound(id))
    }

    fn check_capacity(&self, clip: &Clip) -> SongResult<()> {
        if self.locate(clip.id).is_some() {
            return Err(SongError::Consistency(format!("{} registered twice", clip.id)));
        }
        if self.len() >= self.max_clips {
            return Err(SongError::CapacityExceeded {
                what: "clips",
                limit: self.max_clips,
            });
        }
        Ok(())
    }

    /// Insert a session clip at a grid index (clamped to the end)
    pub fn insert_session(&mut self, index: usize, clip: Clip) -> SongResult<usize> {
        self.check_capacity(&clip)?;
        let index = index.min(self.session.len());
        self.session.insert(index, clip);
        Ok(index)
    }

    /// Append a session clip
    pub fn push_session(&mut self, clip: Clip) -> SongResult<usize> {
        self.insert_session(self.session.len(), clip)
    }

    /// Append an arrangement-only clip
    pub fn push_arrangement_only(&mut self, clip: Clip) -> SongResult<()> {
        self.check_capacity(&clip)?;
        self.arrangement_only.push(clip);
        Ok(())
    }

    /// Remove a session clip by index; clips below move up
    pub fn remove_session_at(&mut self, index: usize) -> Option<Clip> {
        (index < self.session.len()).then(|| self.session.remove(index))
    }

    /// Remove an arrangement-only clip by id
    pub fn remove_arrangement_only(&mut self, id: ClipId) -> Option<Clip> {
        let index = self.arrangement_only.iter().position(|clip| clip.id == id)?;
        Some(self.arrangement_only.remove(index))
    }

    /// Remove a clip from whichever array holds it
    pub fn remove(&mut self, id: ClipId) -> Option<(ClipArray, usize, Clip)> {
        match self.locate(id)? {
            (ClipArray::Session, index) => {
                Some((ClipArray::Session, index, self.session.remove(index)))
            }
            (ClipArray::ArrangementOnly, index) => Some((
                ClipArray::ArrangementOnly,
                index,
                self.arrangement_only.remove(index),
            )),
        }
    }

    /// Put a clip in the slot another clip holds, returning the displaced one
    pub fn replace(&mut self, old: ClipId, clip: Clip) -> SongResult<Clip> {
        if self.locate(clip.id).is_some() {
            return Err(SongError::Consistency(format!("{} registered twice", clip.id)));
        }
        let slot = match self.locate(old).ok_or(SongError::ClipNotFound(old))? {
            (ClipArray::Session, index) => &mut self.session[index],
            (ClipArray::ArrangementOnly, index) => &mut self.arrangement_only[index],
        };
        Ok(std::mem::replace(slot, clip))
    }

    /// Move a session clip into the arrangement-only array
    pub fn demote_to_arrangement_only(&mut self, id: ClipId) -> SongResult<()> {
        let index = self.session_index_of(id).ok_or(SongError::ClipNotFound(id))?;
        let clip = self.session.remove(index);
        self.arrangement_only.push(clip);
        Ok(())
    }

    /// Move an arrangement-only clip into the session grid
    pub fn promote_to_session(&mut self, id: ClipId, index: usize) -> SongResult<usize> {
        let clip = self.remove_arrangement_only(id).ok_or(SongError::ClipNotFound(id))?;
        let index = index.min(self.session.len());
        self.session.insert(index, clip);
        Ok(index)
    }

    /// Clips bound to an output
    pub fn clips_for_output(&self, output: OutputId) -> impl Iterator<Item = &Clip> {
        self.iter().filter(move |clip| clip.output == output)
    }

    /// Whether a clip id appears in both arrays or twice in one
    pub fn is_well_formed(&self) -> bool {
        let mut ids: Vec<ClipId> = self.iter().map(|clip| clip.id).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        ids.len() == total
    }

    /// Remove everything
    pub fn drain_all(&mut self) -> Vec<Clip> {
        let mut drained: Vec<Clip> = self.session.drain(..).collect();
        drained.append(&mut self.arrangement_only);
        drained
    }
}

impl Default for ClipRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CLIPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdAllocator;

    #[test]
    fn test_promote_and_demote_move_values() {
        let mut ids = IdAllocator::new();
        let output = ids.output();
        let mut registry = ClipRegistry::default();
        let clip = Clip::new_instrument(ids.clip(), output, 96);
        let id = clip.id;
        registry.push_session(clip).unwrap();

        registry.demote_to_arrangement_only(id).unwrap();
        assert_eq!(registry.locate(id), Some((ClipArray::ArrangementOnly, 0)));
        assert!(registry.session().is_empty());

        registry.promote_to_session(id, 5).unwrap();
        assert_eq!(registry.locate(id), Some((ClipArray::Session, 0)));
        assert!(registry.is_well_formed());
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut ids = IdAllocator::new();
        let output = ids.output();
        let mut registry = ClipRegistry::new(1);
        registry.push_session(Clip::new_instrument(ids.clip(), output, 96)).unwrap();
        let result = registry.push_arrangement_only(Clip::new_instrument(ids.clip(), output, 96));
        assert!(matches!(result, Err(SongError::CapacityExceeded { limit: 1, .. })));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut ids = IdAllocator::new();
        let clip = Clip::new_instrument(ids.clip(), ids.output(), 96);
        let mut registry = ClipRegistry::default();
        registry.push_session(clip.clone()).unwrap();
        assert!(matches!(
            registry.push_arrangement_only(clip),
            Err(SongError::Consistency(_))
        ));
    }

    #[test]
    fn test_remove_session_compacts() {
        let mut ids = IdAllocator::new();
        let output = ids.output();
        let mut registry = ClipRegistry::default();
        let ids_in_order: Vec<ClipId> = (0..3)
            .map(|_| {
                let clip = Clip::new_instrument(ids.clip(), output, 96);
                let id = clip.id;
                registry.push_session(clip).unwrap();
                id
            })
            .collect();
        let removed = registry.remove_session_at(0).unwrap();
        assert_eq!(removed.id, ids_in_order[0]);
        assert_eq!(registry.session_index_of(ids_in_order[2]), Some(1));
    }

    #[test]
    fn test_replace_keeps_slot() {
        let mut ids = IdAllocator::new();
        let output = ids.output();
        let mut registry = ClipRegistry::default();
        let first = ids.clip();
        let second = ids.clip();
        registry.push_session(Clip::new_instrument(first, output, 96)).unwrap();
        registry.push_session(Clip::new_instrument(second, output, 96)).unwrap();

        let audio = ids.clip();
        let old = registry.replace(first, Clip::new_audio(audio, output, 96, "")).unwrap();
        assert_eq!(old.id, first);
        assert_eq!(registry.locate(audio), Some((ClipArray::Session, 0)));
        assert!(registry.get(first).is_none());
        assert!(matches!(
            registry.replace(audio, Clip::new_instrument(second, output, 96)),
            Err(SongError::Consistency(_))
        ));
    }
}
