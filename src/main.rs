// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use anyhow::{Context, Result};
use seqcore::music::{Note, ScaleType};
use seqcore::sequencer::{AddPosition, Clip, OutputKind};
use seqcore::song::LogAction;
use seqcore::{EngineConfig, Song};
use std::env;
use std::path::Path;
use tracing::Level;

fn print_usage() {
    println!("seqcore - song state engine");
    println!();
    println!("Usage: seqcore [--verbose] [--config <engine.toml>] <OPTION>");
    println!();
    println!("Options:");
    println!("  --new <PATH>          Write a new song with one synth clip");
    println!("  --inspect <PATH>      Load a song and print a summary");
    println!("  --cycle-scale <PATH>  Advance the song's scale to the next preset and save");
    println!("  --set-scale <PATH> <NAME>");
    println!("                        Switch the song to a named preset scale and save");
    println!("  --verbose             Show debug logging");
    println!("  --help                Show this help message");
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn new_song(path: &Path, config: &EngineConfig) -> Result<()> {
    let mut song = Song::new(config);
    song.name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled".to_string());
    let output = song.get_non_audio_instrument_to_switch_to(OutputKind::Synth)?;
    let output_id = output.id;
    song.add_output(output, AddPosition::End)?;
    let clip_id = song.ids().clip();
    let length = song.tempo().bar_length();
    song.add_session_clip(Clip::new_instrument(clip_id, output_id, length), None)?;
    song.launch_session_clip(clip_id)?;
    song.set_bpm(config.default_bpm, LogAction::Skip);
    song.write_to_file(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn inspect(path: &Path, config: &EngineConfig) -> Result<()> {
    let song = Song::read_from_file(path, config)?;
    println!("Song: {}", song.name);
    println!("  Tempo: {:.2} BPM (swing {})", song.tempo().bpm(), song.tempo().swing_amount());
    println!(
        "  Scale: {} root {}",
        song.scale()
            .current_preset_scale()
            .map_or_else(|| "custom".to_string(), |scale| scale.to_string()),
        Note::from_y_note(song.scale().root_note())
    );
    println!("  Outputs:");
    for output in song.outputs().outputs() {
        let clips = song.clips().clips_for_output(output.id).count();
        println!(
            "    {:<12} {:<6} clips: {:<3} instances: {}",
            output.label(),
            output.kind,
            clips,
            output.clip_instances.len()
        );
    }
    let active = song
        .clips()
        .session()
        .iter()
        .filter(|clip| song.is_clip_active(clip))
        .count();
    println!(
        "  Session clips: {} ({} active), arrangement-only clips: {}",
        song.clips().session().len(),
        active,
        song.clips().arrangement_only().len()
    );
    Ok(())
}

fn cycle_scale(path: &Path, config: &EngineConfig) -> Result<()> {
    let mut song = Song::read_from_file(path, config)?;
    let scale = song.cycle_through_scales();
    song.write_to_file(path)?;
    println!("Scale is now {}", scale);
    Ok(())
}

fn set_scale(path: &Path, name: &str, config: &EngineConfig) -> Result<()> {
    let preset: ScaleType = name.parse()?;
    let mut song = Song::read_from_file(path, config)?;
    song.set_preset_scale(preset);
    song.write_to_file(path)?;
    println!("Scale is now {}", preset);
    Ok(())
}

/// The song path following an option, or exit with an error
fn path_arg(args: &[String]) -> &Path {
    match args.get(1) {
        Some(path) => Path::new(path),
        None => {
            eprintln!("Error: {} requires a song path", args[0]);
            std::process::exit(1);
        }
    }
}

fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();

    let verbose = args.iter().any(|arg| arg == "--verbose" || arg == "-v");
    args.retain(|arg| arg != "--verbose" && arg != "-v");
    init_logging(verbose);

    let config = match args.iter().position(|arg| arg == "--config") {
        Some(index) => {
            let path = args
                .get(index + 1)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
            args.drain(index..=index + 1);
            EngineConfig::load(&path).with_context(|| format!("Failed to load engine config {path}"))?
        }
        None => EngineConfig::default(),
    };

    if args.is_empty() {
        println!("seqcore - song state engine");
        println!("Run with --help for usage information");
        return Ok(());
    }

    match args[0].as_str() {
        "--new" => new_song(path_arg(&args), &config)?,
        "--inspect" => inspect(path_arg(&args), &config)?,
        "--cycle-scale" => cycle_scale(path_arg(&args), &config)?,
        "--set-scale" => {
            let name = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("--set-scale requires a scale name"))?;
            set_scale(path_arg(&args), name, &config)?
        }
        "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown option: {}", other);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
