// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Voice-rendering collaborator interface.
//!
//! The song picks which outputs sound and with which clip; the renderer
//! turns that into samples. Implementations run on the audio thread and
//! must not block or allocate.

use crate::sequencer::{Clip, Output};

/// One interleaved stereo frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StereoSample {
    pub l: i32,
    pub r: i32,
}

impl StereoSample {
    pub const SILENCE: StereoSample = StereoSample { l: 0, r: 0 };
}

/// What one output should render for this block
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub output: &'a Output,
    /// The clip currently sounding on the output, if any
    pub active_clip: Option<&'a Clip>,
    /// Sidechain trigger level still to be applied this block (0 = none)
    pub sidechain_hit_pending: i32,
}

/// Trait for voice renderers.
pub trait VoiceRenderer {
    /// Mix one output's voices into `buffer`, adding sidechain contributions
    /// to `sidechain_buffer`. Both slices cover the block being rendered.
    fn render_output(
        &mut self,
        context: RenderContext<'_>,
        buffer: &mut [StereoSample],
        sidechain_buffer: &mut [i32],
    );
}

/// Renderer that leaves the buffer untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentRenderer;

impl VoiceRenderer for SilentRenderer {
    fn render_output(&mut self, _: RenderContext<'_>, _: &mut [StereoSample], _: &mut [i32]) {}
}
