// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Backup cache for detached parameter managers.
//!
//! Entries are keyed by `(entity, clip)`, where a `None` clip means "the
//! entity's own manager, not tied to any clip". The map is ordered so all
//! entries for one entity are contiguous.

use std::collections::BTreeMap;
use std::mem;

use crate::ids::{ClipId, ModControllableId};

use super::ParamManager;

type BackupKey = (ModControllableId, Option<ClipId>);

/// What to do with expression params when backing up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionBackup {
    /// Expression params go into the backup with everything else
    StealToo,
    /// Expression params stay with the source manager
    LeaveWithSource,
}

/// Ordered store of backed-up parameter managers
#[derive(Debug, Default)]
pub struct BackupCache {
    entries: BTreeMap<BackupKey, ParamManager>,
}

impl BackupCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move a manager's contents into the cache, replacing any entry with the same key.
    ///
    /// The source is left empty, except for expression params when they are
    /// left with the source.
    pub fn back_up(
        &mut self,
        entity: ModControllableId,
        clip: Option<ClipId>,
        source: &mut ParamManager,
        expression: ExpressionBackup,
    ) {
        let kept = match expression {
            ExpressionBackup::StealToo => None,
            ExpressionBackup::LeaveWithSource => source.take_expression_params(),
        };
        let stolen = mem::take(source);
        source.restore_expression_params(kept);
        self.entries.insert((entity, clip), stolen);
    }

    /// Store an already-detached manager under a key
    pub fn insert(&mut self, entity: ModControllableId, clip: Option<ClipId>, param_manager: ParamManager) {
        self.entries.insert((entity, clip), param_manager);
    }

    /// Entry for exactly this key
    pub fn get_exact(&self, entity: ModControllableId, clip: Option<ClipId>) -> Option<&ParamManager> {
        self.entries.get(&(entity, clip))
    }

    /// Entry for this key, else the entity's clip-less entry, else any entry for the entity.
    ///
    /// Returns the clip half of the key that matched.
    pub fn get_preferably_with_clip(
        &self,
        entity: ModControllableId,
        clip: Option<ClipId>,
    ) -> Option<(Option<ClipId>, &ParamManager)> {
        self.find_preferred_key(entity, clip)
            .and_then(|key| self.entries.get(&key).map(|pm| (key.1, pm)))
    }

    fn find_preferred_key(&self, entity: ModControllableId, clip: Option<ClipId>) -> Option<BackupKey> {
        [(entity, clip), (entity, None)]
            .into_iter()
            .find(|key| self.entries.contains_key(key))
            .or_else(|| self.entries_for(entity).next().map(|(key, _)| *key))
    }

    fn entries_for(&self, entity: ModControllableId) -> impl Iterator<Item = (&BackupKey, &ParamManager)> {
        self.entries
            .range((entity, None)..)
            .take_while(move |((owner, _), _)| *owner == entity)
    }

    /// Whether any entry exists for the entity
    pub fn contains_entity(&self, entity: ModControllableId) -> bool {
        self.entries_for(entity).next().is_some()
    }

    /// Move the exact entry's contents into `target` and remove it
    pub fn steal_exact_into(
        &mut self,
        entity: ModControllableId,
        clip: Option<ClipId>,
        target: &mut ParamManager,
    ) -> bool {
        match self.entries.remove(&(entity, clip)) {
            Some(pm) => {
                *target = pm;
                true
            }
            None => false,
        }
    }

    /// Like [`Self::steal_exact_into`] but with the preferably-with-clip fallback
    pub fn steal_preferably_with_clip_into(
        &mut self,
        entity: ModControllableId,
        clip: Option<ClipId>,
        target: &mut ParamManager,
    ) -> bool {
        match self.find_preferred_key(entity, clip) {
            Some((owner, found)) => self.steal_exact_into(owner, found, target),
            None => false,
        }
    }

    /// Remove every entry belonging to a clip
    pub fn delete_for_clip(&mut self, clip: ClipId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, owner), _| *owner != Some(clip));
        before - self.entries.len()
    }

    /// Remove every entry belonging to an entity
    pub fn delete_for_mod_controllable(&mut self, entity: ModControllableId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(owner, _), _| *owner != entity);
        before - self.entries.len()
    }

    /// Remove every entry tied to a clip, keeping clip-less ones
    pub fn delete_all_with_clips(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, clip), _| clip.is_none());
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Whether any entry references the clip
    pub fn references_clip(&self, clip: ClipId) -> bool {
        self.entries.keys().any(|(_, owner)| *owner == Some(clip))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModControllableId, Option<ClipId>, &ParamManager)> {
        self.entries
            .iter()
            .map(|((entity, clip), pm)| (*entity, *clip, pm))
    }
}
