// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Integration tests for seqcore
//!
//! These tests drive a whole song through its public API.

use proptest::prelude::*;

use seqcore::arrangement::ClipInstance;
use seqcore::ids::IdAllocator;
use seqcore::params::{BackupCache, ExpressionBackup, ParamManager};
use seqcore::sequencer::{
    AddPosition, Clip, ClipArray, ClipRegistry, LaunchStyle, Output, OutputKind,
};
use seqcore::song::{InstrumentRemoval, LogAction, RemoveSessionClipOptions};
use seqcore::{ClipId, EngineConfig, OutputId, Song, SongSlot, SongSlotState};

fn add_output(song: &mut Song, kind: OutputKind, name: &str) -> OutputId {
    let id = song.ids().output();
    let mc = song.ids().mod_controllable();
    song.add_output(Output::new(id, kind, mc, name), AddPosition::End)
        .unwrap();
    id
}

fn add_session_clip(song: &mut Song, output: OutputId, length: u32) -> ClipId {
    let id = song.ids().clip();
    song.add_session_clip(Clip::new_instrument(id, output, length), None)
        .unwrap()
}

/// Test the scale scenario: major third lookup, then cycling from a reduced mode
#[test]
fn test_scale_scenario() {
    let mut song = Song::default();
    song.set_root_note(60);
    assert_eq!(song.scale().mode_notes(), &[0, 2, 4, 5, 7, 9, 11]);
    assert_eq!(song.scale().get_y_note_from_y_visual(2, true), 64);

    song.remove_y_note_from_mode(11).unwrap();
    let reduced = song.scale().mode_notes().to_vec();
    let preset = song.cycle_through_scales();
    assert_ne!(preset.intervals(), reduced.as_slice());
    assert_eq!(song.scale().mode_notes(), preset.intervals());
}

/// Test that arrangement playback takes over from the session and is idempotent
#[test]
fn test_arrangement_takes_over_output() {
    let mut song = Song::default();
    let output = add_output(&mut song, OutputKind::Synth, "Lead");
    let c1 = add_session_clip(&mut song, output, 384);
    let c2 = song.ids().clip();
    song.add_arrangement_only_clip(Clip::new_instrument(c2, output, 384))
        .unwrap();
    song.launch_session_clip(c1).unwrap();
    song.place_clip_instance(output, ClipInstance::new(0, 384, Some(c2)))
        .unwrap();
    assert!(song.is_clip_id_active(c1));

    song.begin_arrangement_playback(0);
    song.assert_activeness(0, None);
    assert!(!song.is_clip_id_active(c1));
    assert!(song.is_clip_id_active(c2));

    let before = song.to_song_file();
    song.assert_activeness(0, None);
    assert_eq!(song.to_song_file(), before);
    assert!(song.is_clip_id_active(c2));
    assert_eq!(song.output(output).unwrap().active_clip, Some(c2));
}

/// Test that deleting a clip drops its backups but keeps the entity's clip-less entry
#[test]
fn test_clip_deletion_purges_backups() {
    let mut song = Song::default();
    let output = add_output(&mut song, OutputKind::Synth, "Lead");
    let doomed = add_session_clip(&mut song, output, 96);
    let other = add_session_clip(&mut song, output, 96);
    let entity = song.output(output).unwrap().mod_controllable;

    let mut with_clip = ParamManager::new();
    with_clip.set_value(1, 10);
    let mut without_clip = ParamManager::new();
    without_clip.set_value(1, 20);
    song.backups_mut()
        .back_up(entity, Some(doomed), &mut with_clip, ExpressionBackup::StealToo);
    song.backups_mut()
        .back_up(entity, None, &mut without_clip, ExpressionBackup::StealToo);

    song.remove_session_clip(doomed, RemoveSessionClipOptions::default())
        .unwrap();

    assert!(song.backups().get_exact(entity, Some(doomed)).is_none());
    let (key, params) = song
        .backups()
        .get_preferably_with_clip(entity, Some(other))
        .unwrap();
    assert_eq!(key, None);
    assert_eq!(params.value(1), Some(20));
    assert!(song.check_consistency().is_ok());
}

/// Test that re-setting the read-back BPM keeps the tick duration
#[test]
fn test_tempo_idempotence() {
    for bpm in [40.0, 99.9, 120.0, 133.3, 174.0, 300.0] {
        let mut song = Song::default();
        song.set_bpm(bpm, LogAction::Skip);
        let installed = song.tempo().time_per_timer_tick_big();
        let read_back = song.tempo().bpm();
        song.set_bpm(read_back, LogAction::Skip);
        let reinstalled = song.tempo().time_per_timer_tick_big();
        assert!(
            installed.abs_diff(reinstalled) <= 1,
            "{bpm} BPM drifted from {installed} to {reinstalled}"
        );
    }
}

/// Test a file round trip on a fresh song
#[test]
fn test_file_round_trip() {
    let mut song = Song::default();
    song.name = "Round Trip".into();
    song.set_bpm(128.0, LogAction::Skip);
    song.set_root_note(62);
    let synth = add_output(&mut song, OutputKind::Synth, "Pad");
    let midi = add_output(&mut song, OutputKind::MidiOut, "");
    let pad = add_session_clip(&mut song, synth, 384);
    add_session_clip(&mut song, midi, 192);
    song.launch_session_clip(pad).unwrap();
    song.place_clip_instance(synth, ClipInstance::new(0, 768, Some(pad)))
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("round_trip.yaml");
    song.write_to_file(&path).unwrap();
    let loaded = Song::read_from_file(&path, &EngineConfig::default()).unwrap();

    assert_eq!(loaded.name, "Round Trip");
    assert_eq!(
        loaded.tempo().time_per_timer_tick_big(),
        song.tempo().time_per_timer_tick_big()
    );
    assert_eq!(loaded.scale().mode_notes(), song.scale().mode_notes());
    assert_eq!(loaded.scale().root_note(), 62);
    assert_eq!(loaded.outputs().len(), 2);
    assert_eq!(loaded.clips().session().len(), 2);
    let active: Vec<bool> = loaded
        .clips()
        .session()
        .iter()
        .map(|clip| loaded.is_clip_active(clip))
        .collect();
    assert_eq!(active, vec![true, false]);
    assert_eq!(loaded.to_song_file(), song.to_song_file());
}

/// Test that an empty instrument clip turns into audio and a saved fill clip
/// still answers fill mode after reloading
#[test]
fn test_audio_swap_and_fill_clip_survive_reload() {
    let mut song = Song::default();
    let synth = add_output(&mut song, OutputKind::Synth, "Pad");
    let kit = add_output(&mut song, OutputKind::Kit, "Drums");
    let empty = add_session_clip(&mut song, synth, 384);
    let fill_id = song.ids().clip();
    let mut fill = Clip::new_instrument(fill_id, kit, 96);
    fill.launch_style = LaunchStyle::Fill;
    song.add_session_clip(fill, None).unwrap();

    let audio = song.replace_instrument_clip_with_audio_clip(empty).unwrap();
    let audio_output = song.clip(audio).unwrap().output;
    assert_eq!(song.get_audio_output_from_name("audio1"), Some(audio_output));
    assert_eq!(song.get_first_audio_output(), Some(audio_output));
    assert!(song.output(synth).is_none());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fill.yaml");
    song.write_to_file(&path).unwrap();
    let mut loaded = Song::read_from_file(&path, &EngineConfig::default()).unwrap();

    let fill = loaded
        .clips()
        .session()
        .iter()
        .find(|clip| clip.launch_style == LaunchStyle::Fill)
        .map(|clip| clip.id)
        .unwrap();
    assert!(loaded.change_fill_mode(true));
    assert!(loaded.clip(fill).unwrap().armed);
    assert!(loaded.get_first_audio_output().is_some());
}

/// Test the current-song slot through a load from disk
#[test]
fn test_song_slot_loads_file() {
    let mut song = Song::default();
    song.name = "Slot".into();
    let synth = add_output(&mut song, OutputKind::Synth, "Pad");
    add_session_clip(&mut song, synth, 96);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slot.yaml");
    song.write_to_file(&path).unwrap();

    let slot = SongSlot::new();
    let handle = slot.load_from_file(&path, &EngineConfig::default()).unwrap();
    assert_eq!(slot.state(), SongSlotState::Current);
    assert_eq!(handle.lock().name, "Slot");
}

/// Test hibernated instruments are found again by preset identity
#[test]
fn test_hibernated_instrument_is_reused() {
    let mut song = Song::default();
    let keep = add_output(&mut song, OutputKind::Synth, "Keep");
    add_session_clip(&mut song, keep, 96);
    let pad = add_output(&mut song, OutputKind::Synth, "Pad");
    let clip = add_session_clip(&mut song, pad, 96);
    let options = RemoveSessionClipOptions {
        instrument_removal: InstrumentRemoval::DeleteOrHibernateIfUnused,
        ..Default::default()
    };
    song.remove_session_clip(clip, options).unwrap();
    assert!(song.output(pad).is_none());

    let reused = song
        .get_non_audio_instrument_to_switch_to(OutputKind::Synth)
        .unwrap();
    assert_eq!(reused.id, pad);
    assert!(reused.in_valid_state);
}

#[derive(Debug, Clone)]
enum RosterOp {
    Add { at_start: bool },
    Remove(usize),
    Readd(usize),
}

fn roster_op() -> impl Strategy<Value = RosterOp> {
    prop_oneof![
        any::<bool>().prop_map(|at_start| RosterOp::Add { at_start }),
        (0usize..16).prop_map(RosterOp::Remove),
        (0usize..16).prop_map(RosterOp::Readd),
    ]
}

#[derive(Debug, Clone)]
enum ClipOp {
    AddSession,
    AddArrangementOnly,
    Demote(usize),
    Promote(usize, usize),
    Remove(usize),
}

fn clip_op() -> impl Strategy<Value = ClipOp> {
    prop_oneof![
        Just(ClipOp::AddSession),
        Just(ClipOp::AddArrangementOnly),
        (0usize..32).prop_map(ClipOp::Demote),
        (0usize..32, 0usize..32).prop_map(|(clip, index)| ClipOp::Promote(clip, index)),
        (0usize..32).prop_map(ClipOp::Remove),
    ]
}

proptest! {
    /// The active output list never holds an output twice
    #[test]
    fn prop_output_list_has_no_duplicates(ops in prop::collection::vec(roster_op(), 1..64)) {
        let mut song = Song::default();
        let mut removed: Vec<Output> = Vec::new();
        let mut known: Vec<OutputId> = Vec::new();
        for op in ops {
            match op {
                RosterOp::Add { at_start } => {
                    let id = song.ids().output();
                    let mc = song.ids().mod_controllable();
                    let position = if at_start { AddPosition::Start } else { AddPosition::End };
                    song.add_output(Output::new(id, OutputKind::Cv, mc, ""), position).unwrap();
                    known.push(id);
                }
                RosterOp::Remove(n) => {
                    if let Some(&id) = known.get(n) {
                        if let Some((_, output)) = song.remove_output_from_main_list(id) {
                            removed.push(output);
                        }
                    }
                }
                RosterOp::Readd(n) => {
                    if n < removed.len() {
                        let output = removed.remove(n);
                        song.add_output(output, AddPosition::End).unwrap();
                    }
                }
            }
            let mut ids: Vec<OutputId> = song.outputs().outputs().iter().map(|o| o.id).collect();
            let total = ids.len();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), total);
            for output in song.outputs().outputs() {
                prop_assert_eq!(song.output(output.id).map(|o| o.id), Some(output.id));
            }
            prop_assert!(song.outputs().is_well_formed());
        }
    }

    /// A clip is never in both arrays
    #[test]
    fn prop_clip_arrays_are_exclusive(ops in prop::collection::vec(clip_op(), 1..64)) {
        let mut ids = IdAllocator::new();
        let output = ids.output();
        let mut registry = ClipRegistry::new(1024);
        let mut known: Vec<ClipId> = Vec::new();
        for op in ops {
            match op {
                ClipOp::AddSession => {
                    let id = ids.clip();
                    registry.push_session(Clip::new_instrument(id, output, 96)).unwrap();
                    known.push(id);
                }
                ClipOp::AddArrangementOnly => {
                    let id = ids.clip();
                    registry.push_arrangement_only(Clip::new_instrument(id, output, 96)).unwrap();
                    known.push(id);
                }
                ClipOp::Demote(n) => {
                    if let Some(&id) = known.get(n) {
                        let _ = registry.demote_to_arrangement_only(id);
                    }
                }
                ClipOp::Promote(n, index) => {
                    if let Some(&id) = known.get(n) {
                        let _ = registry.promote_to_session(id, index);
                    }
                }
                ClipOp::Remove(n) => {
                    if let Some(&id) = known.get(n) {
                        registry.remove(id);
                    }
                }
            }
            prop_assert!(registry.is_well_formed());
            for clip in registry.session() {
                prop_assert!(!registry.arrangement_only().iter().any(|other| other.id == clip.id));
                prop_assert_eq!(registry.locate(clip.id).map(|(array, _)| array), Some(ClipArray::Session));
            }
        }
    }

    /// One entry per key; back-up then get returns it; steal then get finds nothing
    #[test]
    fn prop_backup_cache_keys(
        entries in prop::collection::vec((0u32..4, prop::option::of(0u32..4), any::<i32>()), 1..32)
    ) {
        let mut ids = IdAllocator::new();
        let entities: Vec<_> = (0..4).map(|_| ids.mod_controllable()).collect();
        let clips: Vec<_> = (0..4).map(|_| ids.clip()).collect();
        let mut cache = BackupCache::new();
        let mut expected = std::collections::BTreeMap::new();

        for (entity, clip, value) in entries {
            let entity = entities[entity as usize];
            let clip = clip.map(|c| clips[c as usize]);
            let mut source = ParamManager::new();
            source.set_value(0, value);
            cache.back_up(entity, clip, &mut source, ExpressionBackup::StealToo);
            prop_assert!(source.is_empty());
            prop_assert_eq!(cache.get_exact(entity, clip).and_then(|pm| pm.value(0)), Some(value));
            expected.insert((entity, clip), value);
            prop_assert_eq!(cache.len(), expected.len());
        }

        for ((entity, clip), value) in expected {
            let mut target = ParamManager::new();
            prop_assert!(cache.steal_exact_into(entity, clip, &mut target));
            prop_assert_eq!(target.value(0), Some(value));
            prop_assert!(cache.get_exact(entity, clip).is_none());
        }
        prop_assert!(cache.is_empty());
    }
}
