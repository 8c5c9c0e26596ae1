use modmix::{Engine, EngineConfig, EngineError, MixerState, OfflineBackend};

fn engine() -> Engine<OfflineBackend> {
    Engine::new(EngineConfig::default(), OfflineBackend::new()).unwrap()
}

#[test]
fn default_topology_routes_every_channel_to_its_bus() {
    let state = engine().mixer_state();
    assert_eq!(state.channel("kick").unwrap().bus_id, "drums");
    assert_eq!(state.channel("tb303").unwrap().bus_id, "synths");
    assert_eq!(state.channel("cello").unwrap().bus_id, "strings");
    assert_eq!(state.bus("drums").unwrap().channels.len(), 5);
    for channel in &state.channels {
        let bus = state.bus(&channel.bus_id).unwrap();
        assert!(bus.channels.contains(&channel.id));
    }
}

#[test]
fn rerouting_moves_membership_without_leaking_connections() {
    let engine = engine();
    let connections = engine.backend().connection_count();

    engine.route_channel_to_bus("violin", "melody").unwrap();
    let state = engine.mixer_state();
    assert_eq!(state.channel("violin").unwrap().bus_id, "melody");
    assert!(state.bus("melody").unwrap().channels.contains(&"violin".to_string()));
    assert!(!state.bus("strings").unwrap().channels.contains(&"violin".to_string()));
    assert_eq!(engine.backend().connection_count(), connections);

    // Same bus again is a no-op.
    engine.route_channel_to_bus("violin", "melody").unwrap();
    assert_eq!(engine.mixer_state(), state);

    assert!(matches!(
        engine.route_channel_to_bus("violin", "brass"),
        Err(EngineError::UnknownBus(_))
    ));
    assert!(matches!(
        engine.route_channel_to_bus("theremin", "melody"),
        Err(EngineError::UnknownChannel(_))
    ));
}

#[test]
fn setters_clamp_and_reject_non_finite() {
    let engine = engine();
    engine.set_channel_gain("piano", 1.7).unwrap();
    engine.set_channel_pan("piano", -3.0).unwrap();
    engine.set_channel_send("piano", "reverb", 0.4).unwrap();
    engine.set_send_wet_dry("delay", 2.0).unwrap();

    let state = engine.mixer_state();
    let piano = state.channel("piano").unwrap();
    assert_eq!(piano.gain, 1.0);
    assert_eq!(piano.pan, -1.0);
    assert_eq!(piano.sends["reverb"], 0.4);
    assert_eq!(state.send("delay").unwrap().wet_dry, 1.0);

    assert!(matches!(
        engine.set_master_gain(f32::NAN),
        Err(EngineError::NonFinite(_))
    ));
    assert!(matches!(
        engine.set_channel_send("piano", "flanger", 0.5),
        Err(EngineError::UnknownSend(_))
    ));
}

#[test]
fn bus_mute_is_bus_state_not_channel_audibility() {
    let engine = engine();
    engine.set_bus_mute("drums", true).unwrap();

    assert!(engine.mixer_state().bus("drums").unwrap().mute);
    assert!(engine.is_audible("snare").unwrap());
    assert!(engine.play_note("snare", "D2", 1.0, None).unwrap().is_some());
}

#[cfg(feature = "serde")]
#[test]
fn mixer_state_survives_json_and_restores_elsewhere() {
    let source = engine();
    source.set_channel_gain("organ", 0.4).unwrap();
    source.set_channel_solo("tb303", true).unwrap();
    source.set_bus_pan("synths", 0.3).unwrap();
    source.set_master_mute(true).unwrap();
    source.route_channel_to_bus("guitar", "strings").unwrap();

    let json = source.mixer_state().to_json().unwrap();
    let state = MixerState::from_json(&json).unwrap();
    assert_eq!(state, source.mixer_state());

    let target = engine();
    target.apply_mixer_state(&state).unwrap();
    assert_eq!(target.mixer_state(), state);
    assert!(!target.is_audible("organ").unwrap());
    assert!(target.is_audible("tb303").unwrap());
}

#[test]
fn invalid_state_is_rejected_before_anything_changes() {
    let engine = engine();
    let before = engine.mixer_state();

    let mut state = before.clone();
    state.channels[0].gain = 0.1;
    state.channels[1].bus_id = "nowhere".into();
    assert!(engine.apply_mixer_state(&state).is_err());
    assert_eq!(engine.mixer_state(), before);
}
