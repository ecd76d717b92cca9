// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Arrangement timeline and session sections.
//!
//! This module provides:
//! - Clip instances: placements of a clip on one output's timeline
//! - Sections: session-view groupings with a launch command and repeat count

pub mod instance;
pub mod section;

pub use instance::{ClipInstance, ClipInstanceList, Truncation};
pub use section::{Section, MAX_NUM_SECTIONS};
