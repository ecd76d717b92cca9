// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Undo actions.
//!
//! Actions own whatever they need to restore state. Clips orphaned by an
//! arrangement clear are moved into the action rather than destroyed, so
//! undoing puts the same clip values back.

use std::collections::VecDeque;

use crate::arrangement::Truncation;
use crate::ids::OutputId;
use crate::sequencer::Clip;

/// Whether a mutation records an undo action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogAction {
    Record,
    Skip,
}

/// A reversible change
#[derive(Debug)]
pub enum Action {
    /// Tick duration changed
    TempoChange { before: u64, after: u64 },
    /// Swing amount changed
    SwingChange { before: i8, after: i8 },
    /// Arrangement cleared from a position onward
    ArrangementCleared {
        pos: u32,
        truncations: Vec<(OutputId, Truncation)>,
        orphaned_clips: Vec<Clip>,
    },
}

impl Action {
    /// Short description for logs
    pub fn describe(&self) -> &'static str {
        match self {
            Action::TempoChange { .. } => "tempo change",
            Action::SwingChange { .. } => "swing change",
            Action::ArrangementCleared { .. } => "arrangement clear",
        }
    }

    /// First output the action would write to that fails `exists`
    pub fn find_output(&self, mut exists: impl FnMut(OutputId) -> bool) -> Option<OutputId> {
        match self {
            Action::ArrangementCleared {
                truncations,
                orphaned_clips,
                ..
            } => truncations
                .iter()
                .map(|(output, _)| *output)
                .chain(orphaned_clips.iter().map(|clip| clip.output))
                .find(|output| !exists(*output)),
            _ => None,
        }
    }

    /// Whether undoing would touch the output or restore clips onto it
    pub fn references_output(&self, id: OutputId) -> bool {
        self.find_output(|output| output != id).is_some()
    }
}

/// Bounded undo history, newest last
#[derive(Debug)]
pub struct ActionLog {
    actions: VecDeque<Action>,
    depth: usize,
}

impl ActionLog {
    pub fn new(depth: usize) -> Self {
        Self {
            actions: VecDeque::new(),
            depth: depth.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Add an action; returns the oldest one if it fell off the end
    pub fn record(&mut self, action: Action) -> Option<Action> {
        let evicted = if self.actions.len() >= self.depth {
            self.actions.pop_front()
        } else {
            None
        };
        self.actions.push_back(action);
        evicted
    }

    /// Take the newest action
    pub fn pop(&mut self) -> Option<Action> {
        self.actions.pop_back()
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Action> {
        self.actions.iter_mut()
    }

    /// Remove every action matching `pred`, keeping the order of the rest
    pub fn take_where(&mut self, pred: impl Fn(&Action) -> bool) -> Vec<Action> {
        let (taken, kept): (Vec<Action>, Vec<Action>) =
            self.actions.drain(..).partition(|action| pred(action));
        self.actions = kept.into();
        taken
    }

    pub fn last(&self) -> Option<&Action> {
        self.actions.back()
    }

    /// Remove everything, returning it for cleanup
    pub fn drain(&mut self) -> Vec<Action> {
        self.actions.drain(..).collect()
    }
}
