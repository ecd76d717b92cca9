// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Reading and writing song documents.
//!
//! Loading never rejects a document for out-of-range values: each is
//! clamped to the nearest valid one with a warning, and references that
//! cannot be resolved are dropped. Clips get fresh ids in file order. The
//! loaded song passes `check_consistency` before it is returned.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::Song;
use crate::arrangement::{ClipInstance, MAX_NUM_SECTIONS};
use crate::config::{
    ClipConfig, ClipRef, EngineConfig, InstanceConfig, NoteRowConfig, OutputConfig, SongConfig,
    SongFile,
};
use crate::error::SongResult;
use crate::ids::{ClipId, OutputId};
use crate::midi::NUM_MIDI_CHANNELS;
use crate::music::ScaleState;
use crate::sequencer::{
    AddPosition, Clip, ClipArray, NoteRow, Output, OutputKind, SequencedNote,
};
use crate::timing::tempo::MAX_SWING_AMOUNT;
use crate::timing::MAX_SEQUENCE_LENGTH;

/// Largest pitch-bend range a device accepts, in semitones
const MAX_BEND_RANGE: u8 = 96;

impl Song {
    /// Load a song from a YAML file
    pub fn read_from_file<P: AsRef<Path>>(path: P, config: &EngineConfig) -> Result<Song> {
        let file = SongFile::load(path.as_ref())?;
        let song = Song::from_song_file(&file, config)
            .with_context(|| format!("Failed to build song from {:?}", path.as_ref()))?;
        info!(
            song = %song.name,
            clips = song.clips.len(),
            outputs = song.outputs.len(),
            "song loaded"
        );
        Ok(song)
    }

    /// Save the song to a YAML file
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_song_file().save(path.as_ref())?;
        info!(song = %self.name, path = ?path.as_ref(), "song saved");
        Ok(())
    }

    /// Build a live song from a document
    pub fn from_song_file(file: &SongFile, config: &EngineConfig) -> SongResult<Song> {
        let mut song = Song::new(config);
        song.name = file.song.name.clone();
        song.load_tempo(&file.song);
        song.load_scale(&file.song);
        song.load_sections(&file.song);

        let output_ids = file
            .outputs
            .iter()
            .map(|output| song.load_output(output))
            .collect::<SongResult<Vec<_>>>()?;

        let mut session_ids = Vec::with_capacity(file.session_clips.len());
        for clip in &file.session_clips {
            session_ids.push(song.load_clip(clip, &output_ids, ClipArray::Session)?);
        }
        let mut arrangement_ids = Vec::with_capacity(file.arrangement_only_clips.len());
        for clip in &file.arrangement_only_clips {
            arrangement_ids.push(song.load_clip(clip, &output_ids, ClipArray::ArrangementOnly)?);
        }

        let resolve = |clip_ref: ClipRef| match clip_ref {
            ClipRef::Session(index) => session_ids.get(index).copied().flatten(),
            ClipRef::ArrangementOnly(index) => arrangement_ids.get(index).copied().flatten(),
        };
        for (output_config, output_id) in file.outputs.iter().zip(&output_ids) {
            for instance in &output_config.instances {
                song.load_instance(*output_id, instance, resolve);
            }
        }

        song.input_tick_scale_clip = file
            .song
            .input_tick_scale_clip
            .and_then(|index| resolve(ClipRef::Session(index)));
        if file.song.input_tick_scale_clip.is_some() && song.input_tick_scale_clip.is_none() {
            warn!("sync-scaling clip reference did not resolve, cleared");
        }
        song.input_tick_scale_potentially_changed();

        let max_scroll = song.clips.session().len() as i32;
        song.song_view_y_scroll = file.song.song_view_y_scroll.clamp(0, max_scroll);

        song.reassess_whether_any_clips_soloing();
        song.reassess_whether_any_outputs_soloing_in_arrangement();
        song.sort_out_which_clips_are_active_without_sending_pgms(None);
        song.ensure_all_instruments_have_a_clip_or_backed_up_param_manager();
        song.check_consistency()?;
        Ok(song)
    }

    fn load_tempo(&mut self, config: &SongConfig) {
        self.tempo.restore_magnitudes(
            config.inside_world_tick_magnitude,
            config.inside_world_tick_magnitude_offset_from_bpm,
        );
        if let Some(big) = config.time_per_timer_tick {
            if self.tempo.install(big) != big {
                warn!(time_per_timer_tick = big, "tick duration out of range, clamped");
            }
        } else if let Some(bpm) = config.bpm {
            self.tempo.set_bpm(bpm);
        } else if let Some(params) = config.tempo_params {
            let value = i32::try_from(params.value).unwrap_or(i32::MAX);
            self.tempo.set_from_params(params.magnitude, value);
        }

        let max_swing = i32::from(MAX_SWING_AMOUNT);
        let swing = config.swing_amount.clamp(-max_swing, max_swing);
        if swing != config.swing_amount {
            warn!(swing = config.swing_amount, "swing amount out of range, clamped");
        }
        self.tempo.set_swing_amount(swing as i8);
        let interval = self.tempo.sync_level_from_file_value(i32::from(config.swing_interval));
        self.tempo.change_swing_interval(interval);
    }

    fn load_scale(&mut self, config: &SongConfig) {
        let root_note = config.root_note.clamp(0, 127);
        if root_note != config.root_note {
            warn!(root_note = config.root_note, "root note out of range, clamped");
        }
        let (scale, repaired) = ScaleState::from_untrusted(root_note, &config.mode_notes);
        if repaired {
            warn!(mode_notes = ?config.mode_notes, "malformed scale repaired");
        }
        self.scale = scale;
    }

    fn load_sections(&mut self, config: &SongConfig) {
        if config.sections.len() > MAX_NUM_SECTIONS {
            warn!(count = config.sections.len(), "extra sections ignored");
        }
        for (index, section) in config.sections.iter().take(MAX_NUM_SECTIONS).enumerate() {
            let mut section = *section;
            if section.sanitize() {
                warn!(section = index, "section repeat count clamped");
            }
            self.sections[index] = section;
        }
    }

    fn load_output(&mut self, config: &OutputConfig) -> SongResult<OutputId> {
        let id = self.ids.output();
        let mod_controllable = self.ids.mod_controllable();
        let (slot, sub_slot) = match config.kind {
            OutputKind::MidiOut | OutputKind::Cv => (
                config.slot.clamp(0, i32::from(NUM_MIDI_CHANNELS) - 1),
                config.sub_slot.max(-1),
            ),
            _ => (config.slot.max(0), config.sub_slot.max(-1)),
        };
        if slot != config.slot {
            warn!(output = %id, slot = config.slot, "output slot out of range, clamped");
        }
        let mut output = Output::new(id, config.kind, mod_controllable, config.name.clone())
            .with_slot(slot, sub_slot)
            .with_dir_path(config.dir_path.clone());
        if config.kind == OutputKind::Kit {
            for name in &config.drums {
                let drum = self.ids.mod_controllable();
                output.add_drum(name.clone(), drum);
            }
        }
        output.default_velocity = config.default_velocity.clamp(1, 127);
        output.bend_ranges = config.bend_ranges.map(|range| range.min(MAX_BEND_RANGE));
        output.soloing_in_arrangement = config.soloing_in_arrangement;
        output.muted_in_arrangement = config.muted_in_arrangement;
        if let Some(params) = &config.params {
            self.backups.insert(mod_controllable, None, params.clone());
        }
        self.add_output(output, AddPosition::End)?;
        Ok(id)
    }

    fn load_clip(
        &mut self,
        config: &ClipConfig,
        output_ids: &[OutputId],
        array: ClipArray,
    ) -> SongResult<Option<ClipId>> {
        let Some(&output_id) = output_ids.get(config.output) else {
            warn!(output = config.output, "clip references missing output, dropped");
            return Ok(None);
        };
        let id = self.ids.clip();
        let loop_length = config.loop_length.clamp(1, MAX_SEQUENCE_LENGTH);
        let mut clip = match &config.sample_path {
            Some(path) => Clip::new_audio(id, output_id, loop_length, path.clone()),
            None => Clip::new_instrument(id, output_id, loop_length),
        };
        clip.section = if usize::from(config.section) < MAX_NUM_SECTIONS {
            config.section
        } else {
            warn!(clip = %id, section = config.section, "section out of range, clamped");
            (MAX_NUM_SECTIONS - 1) as u8
        };
        clip.overdub_nature = config.overdub_nature;
        clip.launch_style = config.launch_style;
        clip.param_manager = config.params.clone();
        if array == ClipArray::Session {
            clip.active_if_no_solo = config.active;
            clip.soloing = config.soloing;
        }

        let output = self.outputs.get(output_id);
        if let Some(data) = clip.instrument_mut() {
            data.in_scale_mode = config.in_scale_mode;
            data.midi_program = config.midi_program.map(|p| p.min(127));
            data.midi_bank = config.midi_bank.map(|b| b.min(127));
            data.midi_sub_bank = config.midi_sub_bank.map(|b| b.min(127));
            for row_config in &config.note_rows {
                let drum = row_config
                    .drum
                    .as_deref()
                    .and_then(|name| output.and_then(|output| output.drum_by_name(name)))
                    .map(|drum| drum.mod_controllable);
                data.note_rows.push(load_note_row(row_config, drum, loop_length));
            }
            data.note_rows.sort_by_key(|row| row.y_note);
        }

        match array {
            ClipArray::Session => self.clips.push_session(clip).map(|_| ())?,
            ClipArray::ArrangementOnly => self.clips.push_arrangement_only(clip)?,
        }
        Ok(Some(id))
    }

    fn load_instance(
        &mut self,
        output_id: OutputId,
        config: &InstanceConfig,
        resolve: impl Fn(ClipRef) -> Option<ClipId>,
    ) {
        let clip = match config.clip {
            Some(clip_ref) => match resolve(clip_ref) {
                Some(id) if self.clips.get(id).map(|clip| clip.output) == Some(output_id) => Some(id),
                _ => {
                    warn!(output = %output_id, pos = config.pos, "instance references foreign or missing clip, dropped");
                    return;
                }
            },
            None => None,
        };
        let pos = config.pos.min(MAX_SEQUENCE_LENGTH - 1);
        let length = config.length.clamp(1, MAX_SEQUENCE_LENGTH - pos);
        if let Err(error) = self.place_clip_instance(output_id, ClipInstance::new(pos, length, clip)) {
            warn!(output = %output_id, pos, %error, "instance could not be placed, dropped");
        }
    }

    /// Snapshot the song as a document
    pub fn to_song_file(&self) -> SongFile {
        let output_index: HashMap<OutputId, usize> = self
            .outputs
            .outputs()
            .iter()
            .enumerate()
            .map(|(index, output)| (output.id, index))
            .collect();
        let clip_ref = |id: ClipId| match self.clips.locate(id) {
            Some((ClipArray::Session, index)) => Some(ClipRef::Session(index)),
            Some((ClipArray::ArrangementOnly, index)) => Some(ClipRef::ArrangementOnly(index)),
            None => None,
        };

        let outputs = self
            .outputs
            .outputs()
            .iter()
            .map(|output| OutputConfig {
                kind: output.kind,
                name: output.name.clone(),
                slot: output.slot,
                sub_slot: output.sub_slot,
                dir_path: output.dir_path.clone(),
                drums: output.drums.iter().map(|drum| drum.name.clone()).collect(),
                default_velocity: output.default_velocity,
                bend_ranges: output.bend_ranges,
                soloing_in_arrangement: output.soloing_in_arrangement,
                muted_in_arrangement: output.muted_in_arrangement,
                instances: output
                    .clip_instances
                    .iter()
                    .map(|instance| InstanceConfig {
                        pos: instance.pos,
                        length: instance.length,
                        clip: instance.clip.and_then(clip_ref),
                    })
                    .collect(),
                params: self.backups.get_exact(output.mod_controllable, None).cloned(),
            })
            .collect();

        let save_clip = |clip: &Clip| {
            let active = if self.arrangement_engaged {
                clip.was_active_before
            } else {
                clip.active_if_no_solo
            };
            let data = clip.instrument();
            ClipConfig {
                output: output_index.get(&clip.output).copied().unwrap_or_default(),
                loop_length: clip.loop_length,
                section: clip.section,
                active,
                soloing: clip.soloing,
                overdub_nature: clip.overdub_nature,
                launch_style: clip.launch_style,
                in_scale_mode: clip.is_in_scale_mode(),
                midi_program: data.and_then(|data| data.midi_program),
                midi_bank: data.and_then(|data| data.midi_bank),
                midi_sub_bank: data.and_then(|data| data.midi_sub_bank),
                note_rows: data
                    .map(|data| data.note_rows.iter().map(save_note_row).collect())
                    .unwrap_or_default(),
                sample_path: match &clip.content {
                    crate::sequencer::ClipContent::Audio(audio) => Some(audio.sample_path.clone()),
                    crate::sequencer::ClipContent::Instrument(_) => None,
                },
                params: clip.param_manager.clone(),
            }
        };

        SongFile {
            song: SongConfig {
                name: self.name.clone(),
                time_per_timer_tick: Some(self.tempo.time_per_timer_tick_big()),
                bpm: Some(self.tempo.bpm()),
                tempo_params: None,
                inside_world_tick_magnitude: self.tempo.inside_world_tick_magnitude(),
                inside_world_tick_magnitude_offset_from_bpm: self.tempo.magnitude_offset_from_bpm(),
                input_tick_scale_clip: self
                    .input_tick_scale_clip
                    .and_then(|id| self.clips.session_index_of(id)),
                swing_amount: i32::from(self.tempo.swing_amount()),
                swing_interval: self
                    .tempo
                    .sync_level_to_file_value(self.tempo.swing_interval())
                    .clamp(0, i32::from(u8::MAX)) as u8,
                root_note: self.scale.root_note(),
                mode_notes: self.scale.mode_notes().to_vec(),
                song_view_y_scroll: self.song_view_y_scroll,
                sections: self.sections.to_vec(),
            },
            outputs,
            session_clips: self.clips.session().iter().map(save_clip).collect(),
            arrangement_only_clips: self.clips.arrangement_only().iter().map(save_clip).collect(),
        }
    }
}

fn load_note_row(config: &NoteRowConfig, drum: Option<crate::ids::ModControllableId>, loop_length: u32) -> NoteRow {
    let mut row = NoteRow::new(config.y_note.clamp(0, 127));
    row.drum = drum;
    row.drum_name = config.drum.clone();
    row.learned_midi = config.learned_midi;
    row.muted = config.muted;
    for note in config.notes.iter().filter(|note| note.pos < loop_length) {
        row.add_note(SequencedNote {
            pos: note.pos,
            length: note.length.clamp(1, loop_length - note.pos),
            velocity: note.velocity.clamp(1, 127),
        });
    }
    row
}

fn save_note_row(row: &NoteRow) -> NoteRowConfig {
    NoteRowConfig {
        y_note: row.y_note,
        drum: row.drum_name.clone(),
        notes: row.notes.clone(),
        learned_midi: row.learned_midi,
        muted: row.muted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::ScaleType;
    use crate::song::LogAction;

    fn sample_song() -> Song {
        let mut song = Song::default();
        song.name = "Demo".into();
        song.set_bpm(137.0, LogAction::Skip);
        song.set_preset_scale(ScaleType::Dorian);

        let kit = song.ids().output();
        let kit_mc = song.ids().mod_controllable();
        let kick = song.ids().mod_controllable();
        let mut output = Output::new(kit, OutputKind::Kit, kit_mc, "808");
        output.add_drum("Kick", kick);
        song.add_output(output, AddPosition::End).unwrap();

        let clip = song.ids().clip();
        let mut beat = Clip::new_instrument(clip, kit, 384);
        let mut row = NoteRow::for_drum(0, kick, "Kick");
        row.add_note(SequencedNote { pos: 0, length: 24, velocity: 110 });
        beat.add_note_row(row);
        song.add_session_clip(beat, None).unwrap();
        song.launch_session_clip(clip).unwrap();

        let fill = song.ids().clip();
        song.add_arrangement_only_clip(Clip::new_instrument(fill, kit, 192)).unwrap();
        song.place_clip_instance(kit, ClipInstance::new(0, 384, Some(clip))).unwrap();
        song.place_clip_instance(kit, ClipInstance::new(384, 192, Some(fill))).unwrap();
        song
    }

    #[test]
    fn test_document_round_trip() {
        let song = sample_song();
        let file = song.to_song_file();
        let loaded = Song::from_song_file(&file, &EngineConfig::default()).unwrap();

        assert_eq!(loaded.name, "Demo");
        assert_eq!(loaded.tempo().time_per_timer_tick_big(), song.tempo().time_per_timer_tick_big());
        assert_eq!(loaded.scale().mode_notes(), song.scale().mode_notes());
        assert_eq!(loaded.clips().session().len(), 1);
        assert_eq!(loaded.clips().arrangement_only().len(), 1);

        let beat = &loaded.clips().session()[0];
        assert!(loaded.is_clip_active(beat));
        let rows = &beat.instrument().unwrap().note_rows;
        let kit = loaded.outputs().first_output().unwrap();
        assert_eq!(rows[0].drum, Some(kit.drums[0].mod_controllable));
        assert_eq!(kit.active_clip, Some(beat.id));
        assert_eq!(kit.clip_instances.len(), 2);
        assert_eq!(loaded.to_song_file(), file);
    }

    #[test]
    fn test_write_then_read_file() {
        let song = sample_song();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.yaml");
        song.write_to_file(&path).unwrap();
        let loaded = Song::read_from_file(&path, &EngineConfig::default()).unwrap();
        assert_eq!(loaded.to_song_file(), song.to_song_file());
    }

    #[test]
    fn test_invalid_values_are_clamped() {
        let yaml = r#"
song:
  swing_amount: 80
  root_note: 300
  mode_notes: [4, 2, 2, 19]
  inside_world_tick_magnitude: 40
  song_view_y_scroll: 9
  input_tick_scale_clip: 5
  sections:
    - num_repetitions: -3
outputs:
  - kind: midi_out
    slot: 40
    default_velocity: 0
    instances:
      - { pos: 0, length: 0, clip: { session: 7 } }
      - { pos: 96, length: 0 }
session_clips:
  - output: 0
    loop_length: 0
    section: 99
    note_rows:
      - y_note: 60
        notes:
          - { pos: 0, length: 500, velocity: 0 }
          - { pos: 5, length: 1, velocity: 100 }
  - output: 3
    loop_length: 96
"#;
        let file = SongFile::from_yaml(yaml).unwrap();
        let song = Song::from_song_file(&file, &EngineConfig::default()).unwrap();

        assert_eq!(song.tempo().swing_amount(), 49);
        assert_eq!(song.scale().root_note(), 127);
        assert_eq!(song.scale().mode_notes(), &[0, 2, 4]);
        assert_eq!(song.tempo().inside_world_tick_magnitude(), crate::timing::tempo::MAX_TICK_MAGNITUDE);
        assert_eq!(song.sections()[0].num_repetitions, 0);
        assert_eq!(song.input_tick_scale_clip(), None);

        let output = song.outputs().first_output().unwrap();
        assert_eq!(output.slot, 15);
        assert_eq!(output.default_velocity, 1);
        assert_eq!(output.clip_instances.len(), 1);
        assert_eq!(output.clip_instances.get(0).unwrap().length, 1);

        assert_eq!(song.clips().len(), 1);
        assert_eq!(song.song_view_y_scroll(), 1);
        let clip = &song.clips().session()[0];
        assert_eq!(clip.loop_length, 1);
        assert_eq!(clip.section as usize, MAX_NUM_SECTIONS - 1);
        let notes = &clip.instrument().unwrap().note_rows[0].notes;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].length, 1);
        assert_eq!(notes[0].velocity, 1);
    }

    #[test]
    fn test_tick_magnitude_follows_loaded_sync_clip() {
        let unresolved = r#"
song:
  inside_world_tick_magnitude: 3
  inside_world_tick_magnitude_offset_from_bpm: -1
  input_tick_scale_clip: 4
"#;
        let file = SongFile::from_yaml(unresolved).unwrap();
        let song = Song::from_song_file(&file, &EngineConfig::default()).unwrap();
        assert_eq!(song.input_tick_scale_clip(), None);
        assert_eq!(song.tempo().inside_world_tick_magnitude(), 2);
        assert_eq!(song.tempo().magnitude_offset_from_bpm(), 0);

        let stale = r#"
song:
  inside_world_tick_magnitude: 2
  inside_world_tick_magnitude_offset_from_bpm: 0
  input_tick_scale_clip: 0
outputs:
  - kind: synth
session_clips:
  - output: 0
    loop_length: 768
"#;
        let file = SongFile::from_yaml(stale).unwrap();
        let song = Song::from_song_file(&file, &EngineConfig::default()).unwrap();
        assert!(song.input_tick_scale_clip().is_some());
        assert_eq!(song.tempo().inside_world_tick_magnitude(), 3);
        assert_eq!(song.tempo().magnitude_offset_from_bpm(), -1);
        assert_eq!(song.input_tick_scale(), 8);
    }

    #[test]
    fn test_missing_file_reports_context() {
        let err = Song::read_from_file("/nonexistent/song.yaml", &EngineConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read song file"));
    }
}
