// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio render entry point and MIDI program sends.

use anyhow::{Context, Result};
use tracing::debug;

use super::Song;
use crate::audio::{RenderContext, StereoSample, VoiceRenderer};
use crate::midi::{MidiTransport, ProgramSelection, BEND_RANGE_MAIN, NUM_MIDI_CHANNELS};
use crate::sequencer::OutputKind;

impl Song {
    /// Render one block.
    ///
    /// The first `num_samples` frames of `buffer` and `sidechain_buffer`
    /// are cleared, then every output that may sound is handed to the
    /// renderer with its sounding clip. Runs on the audio thread: no
    /// allocation, no logging.
    pub fn render_audio(
        &self,
        buffer: &mut [StereoSample],
        num_samples: usize,
        sidechain_buffer: &mut [i32],
        sidechain_hit_pending: i32,
        renderer: &mut impl VoiceRenderer,
    ) {
        let frames = num_samples.min(buffer.len());
        let buffer = &mut buffer[..frames];
        buffer.fill(StereoSample::SILENCE);
        let sidechain_frames = frames.min(sidechain_buffer.len());
        let sidechain_buffer = &mut sidechain_buffer[..sidechain_frames];
        sidechain_buffer.fill(0);

        for output in self.outputs.outputs() {
            if self.arrangement_engaged && !self.is_output_active_in_arrangement(output.id) {
                continue;
            }
            let active_clip = output
                .active_clip
                .and_then(|id| self.clips.get(id))
                .filter(|clip| self.is_clip_active(clip));
            let context = RenderContext {
                output,
                active_clip,
                sidechain_hit_pending,
            };
            renderer.render_output(context, buffer, sidechain_buffer);
        }
    }

    /// Send the program of every MIDI output's bound clip. Returns how many
    /// were sent.
    pub fn send_all_midi_pgms(&self, transport: &mut impl MidiTransport) -> Result<usize> {
        let mut sent = 0;
        for output in self
            .outputs
            .outputs()
            .iter()
            .filter(|output| output.kind == OutputKind::MidiOut)
        {
            let Some(data) = output
                .active_clip
                .and_then(|id| self.clips.get(id))
                .and_then(|clip| clip.instrument())
            else {
                continue;
            };
            let Some(program) = data.midi_program else {
                continue;
            };
            let selection = ProgramSelection {
                channel: output.slot.clamp(0, NUM_MIDI_CHANNELS as i32 - 1) as u8,
                bank: data.midi_bank,
                sub_bank: data.midi_sub_bank,
                program,
            };
            transport
                .send_program_change(selection)
                .with_context(|| format!("Failed to send program change for {}", output.label()))?;
            sent += 1;
        }
        debug!(sent, "MIDI programs sent");
        Ok(sent)
    }

    /// A device reported a new bend range on a channel. MIDI outputs on
    /// that channel adopt it; a main-range change is echoed to the device.
    /// Returns how many outputs changed.
    pub fn midi_device_bend_range_updated_via_message(
        &mut self,
        channel: u8,
        which_bend_range: usize,
        semitones: u8,
        transport: &mut impl MidiTransport,
    ) -> Result<usize> {
        if which_bend_range > 1 {
            return Ok(0);
        }
        let semitones = semitones.min(96);
        let mut updated = 0;
        for output in self
            .outputs
            .outputs_mut()
            .iter_mut()
            .filter(|output| output.kind == OutputKind::MidiOut && output.slot == i32::from(channel))
        {
            if output.bend_ranges[which_bend_range] == semitones {
                continue;
            }
            output.bend_ranges[which_bend_range] = semitones;
            if which_bend_range == BEND_RANGE_MAIN {
                transport
                    .send_bend_range(channel, semitones)
                    .with_context(|| format!("Failed to send bend range on channel {}", channel + 1))?;
            }
            updated += 1;
        }
        if updated > 0 {
            debug!(channel, which_bend_range, semitones, updated, "bend range updated");
        }
        Ok(updated)
    }
}
