// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Parameter and automation state.
//!
//! A [`ParamManager`] holds the current value and automation lane of every
//! parameter a clip (or a clip-less output) has touched. When a clip goes
//! away its manager is parked in the [`BackupCache`] so a later clip on the
//! same sound can pick it back up.

pub mod backup;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use backup::{BackupCache, ExpressionBackup};

/// Parameter identifier within one sound
pub type ParamId = u16;

/// One automation point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationNode {
    /// Position in ticks from clip start
    pub pos: u32,
    /// Value from this position onward
    pub value: i32,
}

/// A parameter's unautomated value plus its automation lane
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoParam {
    pub value: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<AutomationNode>,
}

impl AutoParam {
    /// Whether this parameter has any automation
    pub fn is_automated(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Value in effect at a position: the last node at or before it,
    /// else the unautomated value
    pub fn value_at(&self, pos: u32) -> i32 {
        match self.nodes.partition_point(|node| node.pos <= pos) {
            0 => self.value,
            n => self.nodes[n - 1].value,
        }
    }
}

/// Parameter values and automation for one sound in one context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamManager {
    #[serde(default)]
    params: BTreeMap<ParamId, AutoParam>,
    /// Per-note expression (pitch bend, pressure, timbre) lanes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expression: Option<BTreeMap<ParamId, AutoParam>>,
}

impl ParamManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.expression.is_none()
    }

    /// Get a parameter's unautomated value
    pub fn value(&self, param: ParamId) -> Option<i32> {
        self.params.get(&param).map(|p| p.value)
    }

    /// Set a parameter's unautomated value
    pub fn set_value(&mut self, param: ParamId, value: i32) {
        self.params.entry(param).or_default().value = value;
    }

    /// Insert or replace an automation node, keeping the lane sorted
    pub fn set_node(&mut self, param: ParamId, pos: u32, value: i32) {
        let lane = &mut self.params.entry(param).or_default().nodes;
        match lane.binary_search_by_key(&pos, |node| node.pos) {
            Ok(index) => lane[index].value = value,
            Err(index) => lane.insert(index, AutomationNode { pos, value }),
        }
    }

    pub fn param(&self, param: ParamId) -> Option<&AutoParam> {
        self.params.get(&param)
    }

    /// Whether any parameter carries automation
    pub fn contains_any_automation(&self) -> bool {
        self.params.values().any(AutoParam::is_automated)
    }

    /// Drop automation nodes at or beyond a clip length
    pub fn trim_automation_to_length(&mut self, length: u32) {
        for lane in self.params.values_mut() {
            lane.nodes.retain(|node| node.pos < length);
        }
    }

    /// Repeat every automation lane once, for clip-length doubling
    pub fn duplicate_automation(&mut self, old_length: u32) {
        for lane in self.params.values_mut() {
            let copies: Vec<AutomationNode> = lane
                .nodes
                .iter()
                .map(|node| AutomationNode {
                    pos: node.pos.saturating_add(old_length),
                    value: node.value,
                })
                .collect();
            lane.nodes.extend(copies);
        }
    }

    pub fn has_expression_params(&self) -> bool {
        self.expression.is_some()
    }

    /// Set an expression parameter value, creating the expression set if needed
    pub fn set_expression_value(&mut self, param: ParamId, value: i32) {
        self.expression
            .get_or_insert_with(BTreeMap::new)
            .entry(param)
            .or_default()
            .value = value;
    }

    pub fn expression_value(&self, param: ParamId) -> Option<i32> {
        self.expression.as_ref()?.get(&param).map(|p| p.value)
    }

    /// Move the expression params out, leaving none
    pub fn take_expression_params(&mut self) -> Option<BTreeMap<ParamId, AutoParam>> {
        self.expression.take()
    }

    /// Reinstall expression params previously taken out
    pub fn restore_expression_params(&mut self, expression: Option<BTreeMap<ParamId, AutoParam>>) {
        if expression.is_some() {
            self.expression = expression;
        }
    }
}
