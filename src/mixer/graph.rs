/*
Mixer Routing Graph
===================

Every strip owns backend gain nodes. Voices connect into a channel's input;
everything downstream is fixed except the channel → bus edge, which
`route_channel_to_bus` rewires.

    voice ─▶ channel.input ─▶ channel.fader ─▶ bus ─▶ master ─▶ destination
                  │                │
                  └─ pre ─┐  post ─┘
                          ▼
                     send tap (per channel, per send) ─▶ send.input ─▶ send.ret ─▶ master

Gains written to the backend are *effective* gains:

    channel.fader = audible(channel) ? gain : 0
    send tap      = audible(channel) ? amount : 0
    bus           = audible(bus) ? gain : 0
    send.ret      = gain · wet_dry
    master        = mute ? 0 : gain

Audibility is the mute/solo rule, recomputed on demand:

    audible(c) = !c.mute && (no channel soloed || c.solo)

Buses follow the same rule among buses. Because soloing one strip changes the
audibility of every other, all effective gains are re-derived after any mute
or solo change. Pan is kept as state only; the backend has no panner node.
*/

use std::collections::{BTreeMap, HashMap};

use crate::backend::{AudioBackend, BackendError, NodeId, ParamKind};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

use super::state::MixerState;
use super::strip::{self, Bus, Channel, FxSend, Master};

struct ChannelStrip {
    state: Channel,
    input: NodeId,
    fader: NodeId,
    /// Send id to tap node.
    taps: BTreeMap<String, NodeId>,
}

struct BusStrip {
    state: Bus,
    node: NodeId,
}

struct SendStrip {
    state: FxSend,
    input: NodeId,
    ret: NodeId,
}

pub struct MixerGraph {
    channels: Vec<ChannelStrip>,
    channel_index: HashMap<String, usize>,
    buses: Vec<BusStrip>,
    bus_index: HashMap<String, usize>,
    sends: Vec<SendStrip>,
    send_index: HashMap<String, usize>,
    master: Master,
    master_node: NodeId,
}

fn finite(value: f32, what: &'static str) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::NonFinite(what))
    }
}

impl MixerGraph {
    /// Create every strip's nodes and wire the default topology.
    pub fn build(config: &EngineConfig, backend: &mut dyn AudioBackend) -> Result<Self> {
        let master = Master {
            gain: strip::unit(config.master_gain),
            ..Master::default()
        };
        let master_node = backend.create_gain(master.gain)?;
        let destination = backend.destination();
        backend.connect(master_node, destination)?;

        let mut buses = Vec::with_capacity(config.buses.len());
        let mut bus_index = HashMap::new();
        for cfg in &config.buses {
            let gain = strip::unit(cfg.gain);
            let node = backend.create_gain(gain)?;
            backend.connect(node, master_node)?;
            bus_index.insert(cfg.id.clone(), buses.len());
            buses.push(BusStrip {
                state: Bus {
                    id: cfg.id.clone(),
                    name: cfg.name.clone(),
                    gain,
                    pan: 0.0,
                    mute: false,
                    solo: false,
                    channels: Vec::new(),
                },
                node,
            });
        }

        let mut sends = Vec::with_capacity(config.sends.len());
        let mut send_index = HashMap::new();
        for cfg in &config.sends {
            let state = FxSend {
                id: cfg.id.clone(),
                name: cfg.name.clone(),
                gain: strip::unit(cfg.gain),
                wet_dry: strip::unit(cfg.wet_dry),
                pre_fader: cfg.pre_fader,
            };
            let input = backend.create_gain(1.0)?;
            let ret = backend.create_gain(state.gain * state.wet_dry)?;
            backend.connect(input, ret)?;
            backend.connect(ret, master_node)?;
            send_index.insert(cfg.id.clone(), sends.len());
            sends.push(SendStrip { state, input, ret });
        }

        let mut channels = Vec::with_capacity(config.channels.len());
        let mut channel_index = HashMap::new();
        for cfg in &config.channels {
            let &bus_pos = bus_index
                .get(&cfg.bus)
                .ok_or_else(|| EngineError::UnknownBus(cfg.bus.clone()))?;
            let gain = strip::unit(cfg.gain);
            let input = backend.create_gain(1.0)?;
            let fader = backend.create_gain(gain)?;
            backend.connect(input, fader)?;
            backend.connect(fader, buses[bus_pos].node)?;

            let mut taps = BTreeMap::new();
            let mut amounts = BTreeMap::new();
            for send in &sends {
                let tap = backend.create_gain(0.0)?;
                let from = if send.state.pre_fader { input } else { fader };
                backend.connect(from, tap)?;
                backend.connect(tap, send.input)?;
                taps.insert(send.state.id.clone(), tap);
                amounts.insert(send.state.id.clone(), 0.0);
            }

            buses[bus_pos].state.channels.push(cfg.id.clone());
            channel_index.insert(cfg.id.clone(), channels.len());
            channels.push(ChannelStrip {
                state: Channel {
                    id: cfg.id.clone(),
                    name: cfg.name.clone(),
                    bus_id: cfg.bus.clone(),
                    gain,
                    pan: 0.0,
                    mute: false,
                    solo: false,
                    sends: amounts,
                },
                input,
                fader,
                taps,
            });
        }

        log::info!(
            "mixer built: {} channels, {} buses, {} sends",
            channels.len(),
            buses.len(),
            sends.len()
        );

        Ok(Self {
            channels,
            channel_index,
            buses,
            bus_index,
            sends,
            send_index,
            master,
            master_node,
        })
    }

    fn channel_pos(&self, id: &str) -> Result<usize> {
        self.channel_index
            .get(id)
            .copied()
            .ok_or_else(|| EngineError::UnknownChannel(id.to_string()))
    }

    fn bus_pos(&self, id: &str) -> Result<usize> {
        self.bus_index
            .get(id)
            .copied()
            .ok_or_else(|| EngineError::UnknownBus(id.to_string()))
    }

    fn send_pos(&self, id: &str) -> Result<usize> {
        self.send_index
            .get(id)
            .copied()
            .ok_or_else(|| EngineError::UnknownSend(id.to_string()))
    }

    pub fn channel(&self, id: &str) -> Option<&Channel> {
        self.channel_index.get(id).map(|&i| &self.channels[i].state)
    }

    pub fn bus(&self, id: &str) -> Option<&Bus> {
        self.bus_index.get(id).map(|&i| &self.buses[i].state)
    }

    pub fn send(&self, id: &str) -> Option<&FxSend> {
        self.send_index.get(id).map(|&i| &self.sends[i].state)
    }

    pub fn master(&self) -> &Master {
        &self.master
    }

    pub fn channel_ids(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.state.id.as_str())
    }

    /// Node voices for `channel` connect into.
    pub fn channel_input(&self, id: &str) -> Result<NodeId> {
        Ok(self.channels[self.channel_pos(id)?].input)
    }

    pub fn master_node(&self) -> NodeId {
        self.master_node
    }

    pub fn bus_node(&self, id: &str) -> Result<NodeId> {
        Ok(self.buses[self.bus_pos(id)?].node)
    }

    pub fn channel_fader(&self, id: &str) -> Result<NodeId> {
        Ok(self.channels[self.channel_pos(id)?].fader)
    }

    pub fn is_audible(&self, channel: &str) -> Result<bool> {
        let pos = self.channel_pos(channel)?;
        Ok(self.channel_audible(pos))
    }

    fn channel_audible(&self, pos: usize) -> bool {
        let state = &self.channels[pos].state;
        let any_solo = self.channels.iter().any(|c| c.state.solo);
        !state.mute && (!any_solo || state.solo)
    }

    fn bus_audible(&self, pos: usize) -> bool {
        let state = &self.buses[pos].state;
        let any_solo = self.buses.iter().any(|b| b.state.solo);
        !state.mute && (!any_solo || state.solo)
    }

    /// Move a channel to another bus. Routing to the current bus is a no-op.
    pub fn route_channel_to_bus(
        &mut self,
        backend: &mut dyn AudioBackend,
        channel: &str,
        bus: &str,
    ) -> Result<()> {
        let c = self.channel_pos(channel)?;
        let new_bus = self.bus_pos(bus)?;
        let old_bus = self.bus_pos(&self.channels[c].state.bus_id)?;
        if old_bus == new_bus {
            return Ok(());
        }

        let fader = self.channels[c].fader;
        backend.connect(fader, self.buses[new_bus].node)?;
        backend.disconnect(fader, self.buses[old_bus].node);

        self.buses[old_bus].state.channels.retain(|id| id != channel);
        self.buses[new_bus].state.channels.push(channel.to_string());
        self.channels[c].state.bus_id = bus.to_string();
        log::debug!(
            "channel {channel} moved from {} to {bus}",
            self.buses[old_bus].state.id
        );
        Ok(())
    }

    pub fn set_channel_gain(&mut self, backend: &mut dyn AudioBackend, id: &str, gain: f32) -> Result<()> {
        let gain = strip::unit(finite(gain, "channel gain")?);
        let pos = self.channel_pos(id)?;
        self.channels[pos].state.gain = gain;
        self.apply_channel(backend, pos)
    }

    pub fn set_channel_pan(&mut self, id: &str, pan: f32) -> Result<()> {
        let pan = strip::pan(finite(pan, "channel pan")?);
        let pos = self.channel_pos(id)?;
        self.channels[pos].state.pan = pan;
        Ok(())
    }

    pub fn set_channel_mute(&mut self, backend: &mut dyn AudioBackend, id: &str, mute: bool) -> Result<()> {
        let pos = self.channel_pos(id)?;
        self.channels[pos].state.mute = mute;
        self.apply_all(backend)
    }

    pub fn set_channel_solo(&mut self, backend: &mut dyn AudioBackend, id: &str, solo: bool) -> Result<()> {
        let pos = self.channel_pos(id)?;
        self.channels[pos].state.solo = solo;
        self.apply_all(backend)
    }

    pub fn set_channel_send(
        &mut self,
        backend: &mut dyn AudioBackend,
        channel: &str,
        send: &str,
        amount: f32,
    ) -> Result<()> {
        let amount = strip::unit(finite(amount, "send amount")?);
        let pos = self.channel_pos(channel)?;
        self.send_pos(send)?;
        self.channels[pos].state.sends.insert(send.to_string(), amount);
        self.apply_channel(backend, pos)
    }

    pub fn set_bus_gain(&mut self, backend: &mut dyn AudioBackend, id: &str, gain: f32) -> Result<()> {
        let gain = strip::unit(finite(gain, "bus gain")?);
        let pos = self.bus_pos(id)?;
        self.buses[pos].state.gain = gain;
        self.apply_bus(backend, pos)
    }

    pub fn set_bus_pan(&mut self, id: &str, pan: f32) -> Result<()> {
        let pan = strip::pan(finite(pan, "bus pan")?);
        let pos = self.bus_pos(id)?;
        self.buses[pos].state.pan = pan;
        Ok(())
    }

    pub fn set_bus_mute(&mut self, backend: &mut dyn AudioBackend, id: &str, mute: bool) -> Result<()> {
        let pos = self.bus_pos(id)?;
        self.buses[pos].state.mute = mute;
        self.apply_all(backend)
    }

    pub fn set_bus_solo(&mut self, backend: &mut dyn AudioBackend, id: &str, solo: bool) -> Result<()> {
        let pos = self.bus_pos(id)?;
        self.buses[pos].state.solo = solo;
        self.apply_all(backend)
    }

    pub fn set_send_gain(&mut self, backend: &mut dyn AudioBackend, id: &str, gain: f32) -> Result<()> {
        let gain = strip::unit(finite(gain, "send gain")?);
        let pos = self.send_pos(id)?;
        self.sends[pos].state.gain = gain;
        self.apply_send(backend, pos)
    }

    pub fn set_send_wet_dry(&mut self, backend: &mut dyn AudioBackend, id: &str, wet_dry: f32) -> Result<()> {
        let wet_dry = strip::unit(finite(wet_dry, "send wet/dry")?);
        let pos = self.send_pos(id)?;
        self.sends[pos].state.wet_dry = wet_dry;
        self.apply_send(backend, pos)
    }

    pub fn set_master_gain(&mut self, backend: &mut dyn AudioBackend, gain: f32) -> Result<()> {
        self.master.gain = strip::unit(finite(gain, "master gain")?);
        self.apply_master(backend)
    }

    pub fn set_master_pan(&mut self, pan: f32) -> Result<()> {
        self.master.pan = strip::pan(finite(pan, "master pan")?);
        Ok(())
    }

    pub fn set_master_mute(&mut self, backend: &mut dyn AudioBackend, mute: bool) -> Result<()> {
        self.master.mute = mute;
        self.apply_master(backend)
    }

    pub fn state(&self) -> MixerState {
        MixerState {
            master: self.master.clone(),
            buses: self.buses.iter().map(|b| b.state.clone()).collect(),
            sends: self.sends.iter().map(|s| s.state.clone()).collect(),
            channels: self.channels.iter().map(|c| c.state.clone()).collect(),
        }
    }

    /// Restore a snapshot through the setters.
    ///
    /// Every id and value is checked before anything changes, so an invalid
    /// snapshot leaves the mixer untouched.
    pub fn apply_state(&mut self, backend: &mut dyn AudioBackend, state: &MixerState) -> Result<()> {
        self.check_state(state)?;

        for c in &state.channels {
            self.route_channel_to_bus(backend, &c.id, &c.bus_id)?;
            self.set_channel_gain(backend, &c.id, c.gain)?;
            self.set_channel_pan(&c.id, c.pan)?;
            self.set_channel_mute(backend, &c.id, c.mute)?;
            self.set_channel_solo(backend, &c.id, c.solo)?;
            for (send, amount) in &c.sends {
                self.set_channel_send(backend, &c.id, send, *amount)?;
            }
        }
        for b in &state.buses {
            self.set_bus_gain(backend, &b.id, b.gain)?;
            self.set_bus_pan(&b.id, b.pan)?;
            self.set_bus_mute(backend, &b.id, b.mute)?;
            self.set_bus_solo(backend, &b.id, b.solo)?;
            self.restore_member_order(&b.id, &b.channels)?;
        }
        for s in &state.sends {
            self.set_send_gain(backend, &s.id, s.gain)?;
            self.set_send_wet_dry(backend, &s.id, s.wet_dry)?;
        }
        self.set_master_gain(backend, state.master.gain)?;
        self.set_master_pan(state.master.pan)?;
        self.set_master_mute(backend, state.master.mute)
    }

    /// Adopt a snapshot's member order when it lists the same channels.
    fn restore_member_order(&mut self, bus: &str, order: &[String]) -> Result<()> {
        let pos = self.bus_pos(bus)?;
        let entry = &mut self.buses[pos].state;
        let mut ours = entry.channels.clone();
        let mut theirs = order.to_vec();
        ours.sort();
        theirs.sort();
        if ours == theirs {
            entry.channels = order.to_vec();
        }
        Ok(())
    }

    fn check_state(&self, state: &MixerState) -> Result<()> {
        for c in &state.channels {
            self.channel_pos(&c.id)?;
            self.bus_pos(&c.bus_id)?;
            finite(c.gain, "channel gain")?;
            finite(c.pan, "channel pan")?;
            for (send, amount) in &c.sends {
                self.send_pos(send)?;
                finite(*amount, "send amount")?;
            }
        }
        for b in &state.buses {
            self.bus_pos(&b.id)?;
            finite(b.gain, "bus gain")?;
            finite(b.pan, "bus pan")?;
        }
        for s in &state.sends {
            self.send_pos(&s.id)?;
            finite(s.gain, "send gain")?;
            finite(s.wet_dry, "send wet/dry")?;
        }
        finite(state.master.gain, "master gain")?;
        finite(state.master.pan, "master pan")?;
        Ok(())
    }

    /// Re-derive every effective gain after a mute or solo change.
    fn apply_all(&self, backend: &mut dyn AudioBackend) -> Result<()> {
        for pos in 0..self.channels.len() {
            self.apply_channel(backend, pos)?;
        }
        for pos in 0..self.buses.len() {
            self.apply_bus(backend, pos)?;
        }
        Ok(())
    }

    fn apply_channel(&self, backend: &mut dyn AudioBackend, pos: usize) -> Result<()> {
        let now = backend.current_time();
        let audible = self.channel_audible(pos);
        let ch = &self.channels[pos];
        let gain = if audible { ch.state.gain } else { 0.0 };
        backend.set_param(ch.fader, ParamKind::Gain, gain, now)?;
        for (send, &tap) in &ch.taps {
            let amount = ch.state.sends.get(send).copied().unwrap_or(0.0);
            let amount = if audible { amount } else { 0.0 };
            backend.set_param(tap, ParamKind::Gain, amount, now)?;
        }
        Ok(())
    }

    fn apply_bus(&self, backend: &mut dyn AudioBackend, pos: usize) -> Result<()> {
        let bus = &self.buses[pos];
        let gain = if self.bus_audible(pos) { bus.state.gain } else { 0.0 };
        set_gain(backend, bus.node, gain)?;
        Ok(())
    }

    fn apply_send(&self, backend: &mut dyn AudioBackend, pos: usize) -> Result<()> {
        let send = &self.sends[pos];
        set_gain(backend, send.ret, send.state.gain * send.state.wet_dry)?;
        Ok(())
    }

    fn apply_master(&self, backend: &mut dyn AudioBackend) -> Result<()> {
        let gain = if self.master.mute { 0.0 } else { self.master.gain };
        set_gain(backend, self.master_node, gain)?;
        Ok(())
    }

    /// Release every node the mixer owns.
    pub fn teardown(&mut self, backend: &mut dyn AudioBackend) {
        for c in &self.channels {
            for &tap in c.taps.values() {
                backend.release(tap);
            }
            backend.release(c.input);
            backend.release(c.fader);
        }
        for s in &self.sends {
            backend.release(s.input);
            backend.release(s.ret);
        }
        for b in &self.buses {
            backend.release(b.node);
        }
        backend.release(self.master_node);
    }
}

fn set_gain(backend: &mut dyn AudioBackend, node: NodeId, gain: f32) -> std::result::Result<(), BackendError> {
    let now = backend.current_time();
    backend.set_param(node, ParamKind::Gain, gain, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::OfflineBackend;

    fn build() -> (OfflineBackend, MixerGraph) {
        let mut backend = OfflineBackend::new();
        let mixer = MixerGraph::build(&EngineConfig::default(), &mut backend).unwrap();
        (backend, mixer)
    }

    #[test]
    fn default_topology_is_wired() {
        let (backend, mixer) = build();
        let fader = mixer.channel_fader("kick").unwrap();
        let drums = mixer.bus_node("drums").unwrap();
        assert!(backend.is_connected(fader, drums));
        assert!(backend.is_connected(drums, mixer.master_node()));
        assert!(backend.is_connected(mixer.master_node(), backend.destination()));
        assert_eq!(mixer.bus("drums").unwrap().channels.len(), 5);
    }

    #[test]
    fn solo_silences_everything_else() {
        let (mut backend, mut mixer) = build();
        mixer.set_channel_mute(&mut backend, "snare", true).unwrap();
        mixer.set_channel_solo(&mut backend, "kick", true).unwrap();

        assert!(mixer.is_audible("kick").unwrap());
        assert!(!mixer.is_audible("hihat").unwrap());
        assert!(!mixer.is_audible("snare").unwrap());

        let hihat = mixer.channel_fader("hihat").unwrap();
        assert_eq!(backend.param(hihat, ParamKind::Gain), Some(0.0));

        mixer.set_channel_solo(&mut backend, "kick", false).unwrap();
        assert!(mixer.is_audible("hihat").unwrap());
        assert!(!mixer.is_audible("snare").unwrap());
        assert_eq!(backend.param(hihat, ParamKind::Gain), Some(0.75));
    }

    #[test]
    fn muted_and_soloed_channel_is_silent() {
        let (mut backend, mut mixer) = build();
        mixer.set_channel_solo(&mut backend, "kick", true).unwrap();
        mixer.set_channel_mute(&mut backend, "kick", true).unwrap();
        assert!(!mixer.is_audible("kick").unwrap());
    }

    #[test]
    fn rerouting_moves_edge_and_membership() {
        let (mut backend, mut mixer) = build();
        let fader = mixer.channel_fader("piano").unwrap();
        let melody = mixer.bus_node("melody").unwrap();
        let strings = mixer.bus_node("strings").unwrap();

        mixer.route_channel_to_bus(&mut backend, "piano", "strings").unwrap();
        assert!(!backend.is_connected(fader, melody));
        assert!(backend.is_connected(fader, strings));
        assert_eq!(mixer.channel("piano").unwrap().bus_id, "strings");
        assert!(!mixer.bus("melody").unwrap().channels.contains(&"piano".to_string()));
        assert_eq!(mixer.bus("strings").unwrap().channels.last().unwrap(), "piano");
        assert_eq!(backend.outputs(fader).iter().filter(|n| **n == strings || **n == melody).count(), 1);
    }

    #[test]
    fn unknown_ids_and_bad_values_are_rejected() {
        let (mut backend, mut mixer) = build();
        assert!(matches!(
            mixer.route_channel_to_bus(&mut backend, "kazoo", "drums"),
            Err(EngineError::UnknownChannel(_))
        ));
        assert!(matches!(
            mixer.route_channel_to_bus(&mut backend, "kick", "brass"),
            Err(EngineError::UnknownBus(_))
        ));
        assert!(matches!(
            mixer.set_channel_send(&mut backend, "kick", "flanger", 0.5),
            Err(EngineError::UnknownSend(_))
        ));
        assert!(matches!(
            mixer.set_channel_gain(&mut backend, "kick", f32::NAN),
            Err(EngineError::NonFinite(_))
        ));
    }

    #[test]
    fn values_are_clamped() {
        let (mut backend, mut mixer) = build();
        mixer.set_channel_gain(&mut backend, "kick", 3.0).unwrap();
        mixer.set_channel_pan("kick", -9.0).unwrap();
        mixer.set_channel_send(&mut backend, "kick", "reverb", 1.5).unwrap();
        let kick = mixer.channel("kick").unwrap();
        assert_eq!(kick.gain, 1.0);
        assert_eq!(kick.pan, -1.0);
        assert_eq!(kick.sends["reverb"], 1.0);
    }

    #[test]
    fn bus_solo_mirrors_channel_rule() {
        let (mut backend, mut mixer) = build();
        mixer.set_bus_solo(&mut backend, "synths", true).unwrap();
        let drums = mixer.bus_node("drums").unwrap();
        let synths = mixer.bus_node("synths").unwrap();
        assert_eq!(backend.param(drums, ParamKind::Gain), Some(0.0));
        assert_eq!(backend.param(synths, ParamKind::Gain), Some(0.8));
    }

    #[test]
    fn applied_state_is_clamped_and_written_to_the_backend() {
        let (mut backend, mut mixer) = build();
        let mut state = mixer.state();
        for c in &mut state.channels {
            if c.id == "organ" {
                c.gain = 4.0;
                c.pan = -7.0;
                c.sends.insert("delay".into(), 2.0);
            }
            if c.id == "kick" {
                c.solo = true;
            }
        }
        state.master.gain = 0.5;

        mixer.apply_state(&mut backend, &state).unwrap();

        let organ = mixer.channel("organ").unwrap();
        assert_eq!(organ.gain, 1.0);
        assert_eq!(organ.pan, -1.0);
        assert_eq!(organ.sends["delay"], 1.0);
        // Solo on kick: organ's fader is written as silent, kick's as its gain.
        let organ_fader = mixer.channel_fader("organ").unwrap();
        let kick_fader = mixer.channel_fader("kick").unwrap();
        assert_eq!(backend.param(organ_fader, ParamKind::Gain), Some(0.0));
        assert_eq!(backend.param(kick_fader, ParamKind::Gain), Some(0.75));
        assert_eq!(backend.param(mixer.master_node(), ParamKind::Gain), Some(0.5));
    }
}
