// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Active output list and hibernation pool.
//!
//! Active outputs are kept in display order. Retired synths and kits wait
//! in a bounded pool (oldest evicted first) so reloading the same preset
//! skips reinitialisation; one retired MIDI output is kept in its own slot.

use crate::error::{SongError, SongResult};
use crate::ids::OutputId;

use super::output::{Output, PresetKey};

/// Default hibernation pool size
pub const DEFAULT_HIBERNATION_CAPACITY: usize = 8;

/// Where [`OutputRoster::add_output`] puts the new output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddPosition {
    Start,
    End,
}

/// Which lists a preset search covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    ActiveOnly,
    HibernatingOnly,
    ActiveAndHibernating,
}

impl SearchScope {
    fn includes_active(self) -> bool {
        !matches!(self, SearchScope::HibernatingOnly)
    }

    fn includes_hibernating(self) -> bool {
        !matches!(self, SearchScope::ActiveOnly)
    }
}

/// Where a preset search found its match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLocation {
    Active(usize),
    Hibernating(usize),
}

/// Owner of every live output
#[derive(Debug)]
pub struct OutputRoster {
    active: Vec<Output>,
    /// Oldest first
    hibernating: Vec<Output>,
    hibernating_midi: Option<Output>,
    hibernation_capacity: usize,
}

impl OutputRoster {
    /// Create an empty roster
    pub fn new(hibernation_capacity: usize) -> Self {
        Self {
            active: Vec::new(),
            hibernating: Vec::new(),
            hibernating_midi: None,
            hibernation_capacity,
        }
    }

    /// Active outputs in display order
    pub fn outputs(&self) -> &[Output] {
        &self.active
    }

    pub fn outputs_mut(&mut self) -> &mut [Output] {
        &mut self.active
    }

    /// Hibernating outputs, oldest first
    pub fn hibernating(&self) -> &[Output] {
        &self.hibernating
    }

    pub fn hibernating_midi(&self) -> Option<&Output> {
        self.hibernating_midi.as_ref()
    }

    pub fn hibernation_capacity(&self) -> usize {
        self.hibernation_capacity
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn first_output(&self) -> Option<&Output> {
        self.active.first()
    }

    pub fn index_of(&self, id: OutputId) -> Option<usize> {
        self.active.iter().position(|output| output.id == id)
    }

    pub fn get(&self, id: OutputId) -> Option<&Output> {
        self.active.iter().find(|output| output.id == id)
    }

    pub fn get_mut(&mut self, id: OutputId) -> Option<&mut Output> {
        self.active.iter_mut().find(|output| output.id == id)
    }

    pub fn get_from_index(&self, index: usize) -> Option<&Output> {
        self.active.get(index)
    }

    /// Whether the id is active or hibernating anywhere
    pub fn contains(&self, id: OutputId) -> bool {
        self.index_of(id).is_some()
            || self.hibernating.iter().any(|output| output.id == id)
            || self.hibernating_midi.as_ref().is_some_and(|output| output.id == id)
    }

    /// Add an output to the active list
    pub fn add_output(&mut self, output: Output, position: AddPosition) -> SongResult<()> {
        let index = match position {
            AddPosition::Start => 0,
            AddPosition::End => self.active.len(),
        };
        self.insert_output(index, output)
    }

    /// Add an output at a list index (clamped to the end)
    pub fn insert_output(&mut self, index: usize, output: Output) -> SongResult<()> {
        if self.contains(output.id) {
            return Err(SongError::Consistency(format!(
                "{} added while already owned by the roster",
                output.id
            )));
        }
        let index = index.min(self.active.len());
        self.active.insert(index, output);
        Ok(())
    }

    /// Unlink an output from the active list, returning where it was
    pub fn remove_output_from_main_list(&mut self, id: OutputId) -> Option<(usize, Output)> {
        let index = self.index_of(id)?;
        Some((index, self.active.remove(index)))
    }

    /// Put an output in the hibernation pool.
    ///
    /// An equivalent entry already in the pool is retired first, then the
    /// oldest entries are evicted to respect capacity. Everything pushed
    /// out is returned so the caller can release what it owns.
    pub fn hibernate(&mut self, mut output: Output) -> Vec<Output> {
        let mut retired = Vec::new();
        if let Some(stale) = self
            .hibernating
            .iter()
            .position(|pooled| pooled.matches_preset(&output.preset_key()))
        {
            retired.push(self.hibernating.remove(stale));
        }
        if self.hibernation_capacity == 0 {
            retired.push(output);
            return retired;
        }
        while self.hibernating.len() >= self.hibernation_capacity {
            retired.push(self.hibernating.remove(0));
        }
        output.enter_hibernation();
        self.hibernating.push(output);
        retired
    }

    /// Take an output out of the pool
    pub fn take_hibernating(&mut self, index: usize) -> Option<Output> {
        (index < self.hibernating.len()).then(|| self.hibernating.remove(index))
    }

    /// Take an output out of the pool by id
    pub fn take_hibernating_by_id(&mut self, id: OutputId) -> Option<Output> {
        let index = self.hibernating.iter().position(|output| output.id == id)?;
        self.take_hibernating(index)
    }

    /// Park a MIDI output, returning whatever was parked before
    pub fn set_hibernating_midi(&mut self, mut output: Output) -> Option<Output> {
        output.enter_hibernation();
        self.hibernating_midi.replace(output)
    }

    pub fn grab_hibernating_midi(&mut self) -> Option<Output> {
        self.hibernating_midi.take()
    }

    /// Search for an output matching a preset reference
    pub fn find_preset(&self, key: &PresetKey<'_>, scope: SearchScope) -> Option<OutputLocation> {
        let active = scope
            .includes_active()
            .then(|| self.active.iter().position(|output| output.matches_preset(key)))
            .flatten()
            .map(OutputLocation::Active);
        active.or_else(|| {
            scope
                .includes_hibernating()
                .then(|| self.hibernating.iter().position(|output| output.matches_preset(key)))
                .flatten()
                .map(OutputLocation::Hibernating)
        })
    }

    /// Drop every hibernating output, returning them for cleanup
    pub fn drain_hibernating(&mut self) -> Vec<Output> {
        let mut drained: Vec<Output> = self.hibernating.drain(..).collect();
        drained.extend(self.hibernating_midi.take());
        drained
    }

    /// Remove everything, returning all outputs for cleanup
    pub fn drain_all(&mut self) -> Vec<Output> {
        let mut drained: Vec<Output> = self.active.drain(..).collect();
        drained.extend(self.drain_hibernating());
        drained
    }

    /// Whether no id appears twice across the active list and the pools
    pub fn is_well_formed(&self) -> bool {
        let mut ids: Vec<OutputId> = self
            .active
            .iter()
            .chain(self.hibernating.iter())
            .chain(self.hibernating_midi.iter())
            .map(|output| output.id)
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        ids.len() == total
    }
}

impl Default for OutputRoster {
    fn default() -> Self {
        Self::new(DEFAULT_HIBERNATION_CAPACITY)
    }
}
