// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Clip instances on an output's arrangement timeline.
//!
//! Each output keeps its instances sorted by position with no overlaps;
//! every edit here preserves that.

use crate::ids::ClipId;
use crate::timing::MAX_SEQUENCE_LENGTH;

/// One placement of a clip in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipInstance {
    /// Start position in ticks
    pub pos: u32,
    /// Length in ticks
    pub length: u32,
    /// Clip played by this instance; `None` is an empty placeholder
    pub clip: Option<ClipId>,
}

impl ClipInstance {
    pub fn new(pos: u32, length: u32, clip: Option<ClipId>) -> Self {
        Self { pos, length, clip }
    }

    /// Exclusive end position
    pub fn end(&self) -> u32 {
        self.pos.saturating_add(self.length).min(MAX_SEQUENCE_LENGTH)
    }

    /// Whether the instance covers a position
    pub fn covers(&self, pos: u32) -> bool {
        self.pos <= pos && pos < self.end()
    }
}

/// What [`ClipInstanceList::truncate_beyond`] changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Truncation {
    /// Instances starting at or after the cut, in order
    pub removed: Vec<ClipInstance>,
    /// Instance that straddled the cut, with its length before the cut
    pub shortened: Option<(u32, u32)>,
}

impl Truncation {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.shortened.is_none()
    }
}

/// Sorted, non-overlapping instances for one output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipInstanceList {
    instances: Vec<ClipInstance>,
}

impl ClipInstanceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn as_slice(&self) -> &[ClipInstance] {
        &self.instances
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClipInstance> {
        self.instances.iter()
    }

    pub fn get(&self, index: usize) -> Option<&ClipInstance> {
        self.instances.get(index)
    }

    /// Index of the last instance starting at or before `pos`
    pub fn last_starting_at_or_before(&self, pos: u32) -> Option<usize> {
        self.instances
            .partition_point(|instance| instance.pos <= pos)
            .checked_sub(1)
    }

    /// Index of the first instance starting at or after `pos`
    pub fn first_starting_at_or_after(&self, pos: u32) -> Option<usize> {
        let index = self.instances.partition_point(|instance| instance.pos < pos);
        (index < self.instances.len()).then_some(index)
    }

    /// Index of the instance covering `pos`
    pub fn covering(&self, pos: u32) -> Option<usize> {
        self.last_starting_at_or_before(pos)
            .filter(|&index| self.instances[index].covers(pos))
    }

    /// Insert an instance, keeping order and removing overlap.
    ///
    /// An instance already at the same position is replaced and handed
    /// back, so the caller can clean up after its clip. A predecessor
    /// running past the new start is cut short, and the new instance is cut
    /// short if it would run into its successor.
    pub fn insert(&mut self, mut instance: ClipInstance) -> (usize, Option<ClipInstance>) {
        let index = self.instances.partition_point(|existing| existing.pos < instance.pos);
        let replaced = if self.instances.get(index).is_some_and(|existing| existing.pos == instance.pos) {
            Some(self.instances.remove(index))
        } else {
            None
        };
        if let Some(previous) = index.checked_sub(1).and_then(|i| self.instances.get_mut(i)) {
            if previous.end() > instance.pos {
                previous.length = instance.pos - previous.pos;
            }
        }
        if let Some(next) = self.instances.get(index) {
            if instance.end() > next.pos {
                instance.length = next.pos - instance.pos;
            }
        }
        self.instances.insert(index, instance);
        (index, replaced)
    }

    /// Set an instance's length, limited so it cannot reach its successor
    pub fn set_length(&mut self, index: usize, length: u32) {
        let limit = self
            .instances
            .get(index + 1)
            .map(|next| next.pos)
            .unwrap_or(MAX_SEQUENCE_LENGTH);
        if let Some(instance) = self.instances.get_mut(index) {
            instance.length = length.min(limit.saturating_sub(instance.pos));
        }
    }

    /// Remove everything at or after `pos` and cut short anything straddling it
    pub fn truncate_beyond(&mut self, pos: u32) -> Truncation {
        let first_removed = self.instances.partition_point(|instance| instance.pos < pos);
        let removed = self.instances.split_off(first_removed);
        let shortened = first_removed
            .checked_sub(1)
            .and_then(|index| self.instances.get_mut(index))
            .filter(|instance| instance.end() > pos)
            .map(|instance| {
                let old_length = instance.length;
                instance.length = pos - instance.pos;
                (instance.pos, old_length)
            });
        Truncation { removed, shortened }
    }

    /// Put back what a truncation took away.
    ///
    /// Returns instances placed since the truncation that the restored ones
    /// displaced.
    pub fn undo_truncation(&mut self, truncation: &Truncation) -> Vec<ClipInstance> {
        if let Some((pos, old_length)) = truncation.shortened {
            if let Some(index) = self.covering(pos) {
                self.instances[index].length = old_length;
            }
        }
        truncation
            .removed
            .iter()
            .filter_map(|instance| self.insert(*instance).1)
            .collect()
    }

    /// Remove every instance of a clip
    pub fn remove_for_clip(&mut self, clip: ClipId) -> usize {
        let before = self.instances.len();
        self.instances.retain(|instance| instance.clip != Some(clip));
        before - self.instances.len()
    }

    /// Remove one instance
    pub fn remove(&mut self, index: usize) -> Option<ClipInstance> {
        (index < self.instances.len()).then(|| self.instances.remove(index))
    }

    /// Whether any instance plays the clip
    pub fn references_clip(&self, clip: ClipId) -> bool {
        self.instances.iter().any(|instance| instance.clip == Some(clip))
    }

    /// Replace references to one clip with another
    pub fn replace_clip(&mut self, old: ClipId, new: Option<ClipId>) {
        for instance in self.instances.iter_mut().filter(|i| i.clip == Some(old)) {
            instance.clip = new;
        }
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }

    /// Whether ordering and non-overlap hold
    pub fn is_well_formed(&self) -> bool {
        self.instances
            .windows(2)
            .all(|pair| pair[0].pos < pair[1].pos && pair[0].end() <= pair[1].pos)
    }
}
