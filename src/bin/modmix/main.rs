//! modmix - offline demo of the engine
//!
//! Run with: cargo run -- [preset.json]
//!
//! Plays an acid line on the TB-303 channel with an LFO sweeping the filter,
//! drives the control loop against the offline backend, and prints engine
//! stats plus the final mixer state as JSON. Set `RUST_LOG=debug` to watch
//! voices start and get torn down.

use color_eyre::eyre::{eyre, WrapErr};
use modmix::{Engine, EngineConfig, LfoPatch, OfflineBackend, Preset};

const INSTRUMENT: &str = "tb303";

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = EngineConfig::default();
    let period = config.control_period();
    let engine = Engine::new(config, OfflineBackend::new())?;

    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path).wrap_err_with(|| format!("reading {path}"))?;
            let report = engine.load_preset_json(INSTRUMENT, &json)?;
            if !report.is_clean() {
                log::warn!("{} preset entries skipped", report.skipped.len());
            }
        }
        None => {
            let preset = Preset::new("Wobble")
                .with_param("filter1Resonance", 14.0f32)
                .with_param("filter1Cutoff", 600.0f32)
                .with_routing("lfo1", "filterCutoff", 0.6)
                .with_routing("env1", "filterCutoff", 0.4)
                .with_lfo(
                    "lfo1",
                    LfoPatch {
                        rate_hz: Some(2.0),
                        ..Default::default()
                    },
                );
            engine.load_preset(INSTRUMENT, &preset)?;
        }
    }

    // 16 sixteenth notes at 120 BPM.
    let phrase = ["A1", "A2", "A1", "C2", "A1", "E2", "G1", "A1"];
    let step = 0.125;
    let mut next_note = 0.0;
    let mut played = 0;
    let total = phrase.len() * 2;

    while played < total || engine.voice_count() > 0 {
        if played < total && engine.now() >= next_note {
            let note = phrase[played % phrase.len()];
            let velocity = if played % 4 == 0 { 1.0 } else { 0.7 };
            engine.play_note(INSTRUMENT, note, velocity, Some(step * 0.8))?;
            if played % 4 == 0 {
                engine.play_note("kick", "C2", 1.0, Some(0.1))?;
            }
            played += 1;
            next_note += step;
        }
        engine.tick();
        engine.backend().advance(period);

        if engine.now() > 30.0 {
            return Err(eyre!("voices never finished"));
        }
    }

    let stats = engine.engine_stats();
    println!(
        "{:.2}s simulated over {} ticks, {} routings active",
        stats.time, stats.ticks, stats.matrix.active_routings
    );
    let backend = engine.backend();
    println!(
        "backend: {} nodes created, {} released, {} live",
        backend.created_count(),
        backend.released_count(),
        backend.live_nodes()
    );
    drop(backend);

    println!("{}", engine.mixer_state().to_json()?);
    engine.shutdown();
    Ok(())
}
