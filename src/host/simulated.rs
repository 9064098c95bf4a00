//! Simulated audio host
//!
//! A deterministic, in-process stand-in for a real-time audio context.
//! It keeps the node arena, the connection set and every parameter's
//! automation timeline, and runs a manual clock that only moves when
//! [`SimulatedHost::advance`] is called. No samples are rendered.
//!
//! Suspend/resume complete immediately by default. With
//! [`SimulatedHost::set_deferred`] they stay pending until
//! [`SimulatedHost::complete_pending`], which models a host whose
//! completion callbacks arrive later.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use tracing::debug;

use super::{AudioHost, AudioParam, HostBackend, HostEvent, NodeId, NodeKind};
use crate::engine::AudioBuffer;
use crate::error::{RackError, Result};

/// Tolerance when comparing clock positions
const CLOCK_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
enum AutomationEvent {
    SetValue { value: f32, time: f64 },
    LinearRamp { value: f32, end_time: f64 },
}

impl AutomationEvent {
    fn time(&self) -> f64 {
        match *self {
            AutomationEvent::SetValue { time, .. } => time,
            AutomationEvent::LinearRamp { end_time, .. } => end_time,
        }
    }
}

/// Time-ordered automation of a single parameter
#[derive(Debug, Clone)]
struct Automation {
    initial: f32,
    events: Vec<AutomationEvent>,
}

impl Automation {
    fn new(initial: f32) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    fn insert(&mut self, event: AutomationEvent) {
        let at = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(at, event);
    }

    fn cancel_from(&mut self, from_time: f64) {
        self.events.retain(|e| e.time() < from_time);
    }

    /// Evaluate the timeline at `t`
    ///
    /// A ramp starts at the time and value of the event before it.
    fn value_at(&self, t: f64) -> f32 {
        let mut value = self.initial;
        let mut anchor = 0.0_f64;

        for event in &self.events {
            match *event {
                AutomationEvent::SetValue { value: v, time } => {
                    if time > t + CLOCK_EPSILON {
                        break;
                    }
                    value = v;
                    anchor = time;
                }
                AutomationEvent::LinearRamp { value: v, end_time } => {
                    if end_time <= t + CLOCK_EPSILON {
                        value = v;
                        anchor = end_time;
                        continue;
                    }
                    if t > anchor && end_time > anchor {
                        let progress = ((t - anchor) / (end_time - anchor)) as f32;
                        value += (v - value) * progress;
                    }
                    break;
                }
            }
        }

        value
    }
}

#[derive(Debug, Clone)]
struct SourcePlayback {
    duration_secs: f64,
    started_at: Option<f64>,
    stopped: bool,
    ended: bool,
}

#[derive(Debug, Clone)]
struct SimNode {
    kind: NodeKind,
    params: HashMap<AudioParam, Automation>,
    released: bool,
    playback: Option<SourcePlayback>,
}

impl SimNode {
    fn new(kind: NodeKind) -> Self {
        let params = kind
            .params()
            .iter()
            .map(|p| (*p, Automation::new(p.default_value())))
            .collect();
        Self {
            kind,
            params,
            released: false,
            playback: None,
        }
    }
}

/// Deterministic audio host for tests and headless embedding
#[derive(Debug, Clone)]
pub struct SimulatedHost {
    nodes: Vec<SimNode>,
    edges: BTreeSet<(NodeId, NodeId)>,
    destination: NodeId,
    clock: f64,
    suspended: bool,
    closed: bool,
    deferred: bool,
    pending: VecDeque<HostEvent>,
    events: VecDeque<HostEvent>,
    starts: usize,
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedHost {
    /// Create a running context with only the destination node
    pub fn new() -> Self {
        Self {
            nodes: vec![SimNode::new(NodeKind::Destination)],
            edges: BTreeSet::new(),
            destination: 0,
            clock: 0.0,
            suspended: false,
            closed: false,
            deferred: false,
            pending: VecDeque::new(),
            events: VecDeque::new(),
            starts: 0,
        }
    }

    // ========================================================================
    // Simulation Controls
    // ========================================================================

    /// Hold suspend/resume completions until [`complete_pending`](Self::complete_pending)
    pub fn set_deferred(&mut self, deferred: bool) {
        self.deferred = deferred;
    }

    /// Deliver every held suspend/resume completion
    pub fn complete_pending(&mut self) {
        while let Some(event) = self.pending.pop_front() {
            self.apply_completion(event);
        }
    }

    /// Number of suspend/resume requests awaiting completion
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Move the clock forward, ending sources whose buffer is exhausted
    ///
    /// The clock does not move while suspended or closed.
    pub fn advance(&mut self, secs: f64) {
        if self.suspended || self.closed || secs <= 0.0 {
            return;
        }
        self.clock += secs;

        let clock = self.clock;
        let mut finished = Vec::new();
        for (id, node) in self.nodes.iter_mut().enumerate() {
            if let Some(playback) = node.playback.as_mut() {
                let Some(started_at) = playback.started_at else {
                    continue;
                };
                if !playback.stopped
                    && !playback.ended
                    && started_at + playback.duration_secs <= clock + CLOCK_EPSILON
                {
                    playback.ended = true;
                    finished.push(id as NodeId);
                }
            }
        }

        for id in finished {
            debug!("[HOST] Source {} reached end of buffer at {:.3}s", id, clock);
            self.events.push_back(HostEvent::SourceEnded(id));
        }
    }

    /// Fire a source's natural-end notification now, regardless of the clock
    ///
    /// Returns false if the node is not a started, still-running source.
    pub fn finish_source(&mut self, source: NodeId) -> bool {
        let Some(playback) = self
            .nodes
            .get_mut(source as usize)
            .and_then(|n| n.playback.as_mut())
        else {
            return false;
        };
        if playback.started_at.is_none() || playback.ended || playback.stopped {
            return false;
        }
        playback.ended = true;
        self.events.push_back(HostEvent::SourceEnded(source));
        true
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Every live connection as `(from, to)`
    pub fn edges(&self) -> &BTreeSet<(NodeId, NodeId)> {
        &self.edges
    }

    /// Check whether `from -> to` is connected
    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.contains(&(from, to))
    }

    /// Nodes fed by `from`
    pub fn outgoing(&self, from: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|(f, _)| *f == from)
            .map(|(_, t)| *t)
            .collect()
    }

    /// Kind of a node, if it exists
    pub fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(node as usize).map(|n| n.kind)
    }

    /// Number of nodes ever created, destination included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Sources that have been created and not yet released
    pub fn live_sources(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.kind == NodeKind::Source && !n.released)
            .map(|(id, _)| id as NodeId)
            .collect()
    }

    /// Check whether a node has been released
    pub fn is_released(&self, node: NodeId) -> bool {
        self.nodes
            .get(node as usize)
            .map(|n| n.released)
            .unwrap_or(true)
    }

    /// Total number of `start_source` calls
    pub fn start_count(&self) -> usize {
        self.starts
    }

    /// Check whether the clock is frozen
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Check whether the context has been closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Value `param` will have at `time`
    pub fn param_value_at(&self, node: NodeId, param: AudioParam, time: f64) -> Result<f32> {
        Ok(self.automation(node, param)?.value_at(time))
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn apply_completion(&mut self, event: HostEvent) {
        match event {
            HostEvent::Suspended => self.suspended = true,
            HostEvent::Resumed => self.suspended = false,
            HostEvent::SourceEnded(_) => {}
        }
        self.events.push_back(event);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(RackError::Host {
                reason: "context is closed".to_string(),
            });
        }
        Ok(())
    }

    fn live_node(&self, node: NodeId) -> Result<&SimNode> {
        match self.nodes.get(node as usize) {
            Some(n) if !n.released => Ok(n),
            Some(_) => Err(RackError::Host {
                reason: format!("node {} has been released", node),
            }),
            None => Err(RackError::Host {
                reason: format!("node {} does not exist", node),
            }),
        }
    }

    fn live_node_mut(&mut self, node: NodeId) -> Result<&mut SimNode> {
        match self.nodes.get_mut(node as usize) {
            Some(n) if !n.released => Ok(n),
            Some(_) => Err(RackError::Host {
                reason: format!("node {} has been released", node),
            }),
            None => Err(RackError::Host {
                reason: format!("node {} does not exist", node),
            }),
        }
    }

    fn automation(&self, node: NodeId, param: AudioParam) -> Result<&Automation> {
        let n = self.live_node(node)?;
        n.params.get(&param).ok_or_else(|| RackError::Host {
            reason: format!("{:?} node {} has no {} parameter", n.kind, node, param),
        })
    }

    fn automation_mut(&mut self, node: NodeId, param: AudioParam) -> Result<&mut Automation> {
        self.ensure_open()?;
        let n = self.live_node_mut(node)?;
        let kind = n.kind;
        n.params.get_mut(&param).ok_or_else(|| RackError::Host {
            reason: format!("{:?} node {} has no {} parameter", kind, node, param),
        })
    }

    fn playback_mut(&mut self, source: NodeId) -> Result<&mut SourcePlayback> {
        self.ensure_open()?;
        self.live_node_mut(source)?
            .playback
            .as_mut()
            .ok_or_else(|| RackError::Host {
                reason: format!("node {} is not a source", source),
            })
    }
}

impl AudioHost for SimulatedHost {
    fn create_node(&mut self, kind: NodeKind) -> Result<NodeId> {
        self.ensure_open()?;
        if matches!(kind, NodeKind::Source | NodeKind::Destination) {
            return Err(RackError::Host {
                reason: format!("{:?} nodes cannot be created directly", kind),
            });
        }
        self.nodes.push(SimNode::new(kind));
        Ok((self.nodes.len() - 1) as NodeId)
    }

    fn create_source(&mut self, buffer: Arc<AudioBuffer>) -> Result<NodeId> {
        self.ensure_open()?;
        let mut node = SimNode::new(NodeKind::Source);
        node.playback = Some(SourcePlayback {
            duration_secs: buffer.duration_secs(),
            started_at: None,
            stopped: false,
            ended: false,
        });
        self.nodes.push(node);
        Ok((self.nodes.len() - 1) as NodeId)
    }

    fn destination(&self) -> NodeId {
        self.destination
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.ensure_open()?;
        self.live_node(from)?;
        let target = self.live_node(to)?;
        if target.kind == NodeKind::Source {
            return Err(RackError::Host {
                reason: format!("source node {} has no input", to),
            });
        }
        self.edges.insert((from, to));
        Ok(())
    }

    fn disconnect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.ensure_open()?;
        if !self.edges.remove(&(from, to)) {
            return Err(RackError::Host {
                reason: format!("node {} is not connected to node {}", from, to),
            });
        }
        Ok(())
    }

    fn release(&mut self, node: NodeId) -> Result<()> {
        self.live_node(node)?;
        self.edges.retain(|(f, t)| *f != node && *t != node);
        if let Some(n) = self.nodes.get_mut(node as usize) {
            n.released = true;
        }
        Ok(())
    }

    fn set_value_at_time(
        &mut self,
        node: NodeId,
        param: AudioParam,
        value: f32,
        time: f64,
    ) -> Result<()> {
        self.automation_mut(node, param)?
            .insert(AutomationEvent::SetValue { value, time });
        Ok(())
    }

    fn linear_ramp_to_value_at_time(
        &mut self,
        node: NodeId,
        param: AudioParam,
        value: f32,
        end_time: f64,
    ) -> Result<()> {
        self.automation_mut(node, param)?
            .insert(AutomationEvent::LinearRamp { value, end_time });
        Ok(())
    }

    fn cancel_scheduled_values(
        &mut self,
        node: NodeId,
        param: AudioParam,
        from_time: f64,
    ) -> Result<()> {
        self.automation_mut(node, param)?.cancel_from(from_time);
        Ok(())
    }

    fn param_value(&self, node: NodeId, param: AudioParam) -> Result<f32> {
        self.param_value_at(node, param, self.clock)
    }

    fn start_source(&mut self, source: NodeId, when: f64) -> Result<()> {
        let clock = self.clock;
        let playback = self.playback_mut(source)?;
        if playback.started_at.is_some() {
            return Err(RackError::Host {
                reason: format!("source {} can only be started once", source),
            });
        }
        playback.started_at = Some(when.max(clock));
        self.starts += 1;
        Ok(())
    }

    fn stop_source(&mut self, source: NodeId) -> Result<()> {
        let playback = self.playback_mut(source)?;
        if playback.started_at.is_none() {
            return Err(RackError::Host {
                reason: format!("source {} was never started", source),
            });
        }
        let notify = !playback.stopped && !playback.ended;
        playback.stopped = true;
        if notify {
            self.events.push_back(HostEvent::SourceEnded(source));
        }
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.clock
    }

    fn suspend(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.deferred {
            self.pending.push_back(HostEvent::Suspended);
        } else {
            self.apply_completion(HostEvent::Suspended);
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.deferred {
            self.pending.push_back(HostEvent::Resumed);
        } else {
            self.apply_completion(HostEvent::Resumed);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.closed = true;
        self.edges.clear();
        self.pending.clear();
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<HostEvent> {
        self.events.drain(..).collect()
    }
}

/// Opens [`SimulatedHost`] contexts
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    available: bool,
    deferred: bool,
    opened: usize,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    /// Backend whose contexts complete suspend/resume immediately
    pub fn new() -> Self {
        Self {
            available: true,
            deferred: false,
            opened: 0,
        }
    }

    /// Backend whose contexts hold suspend/resume completions
    pub fn deferred() -> Self {
        Self {
            deferred: true,
            ..Self::new()
        }
    }

    /// Backend on a platform without real-time audio
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Number of contexts opened so far
    pub fn opened(&self) -> usize {
        self.opened
    }
}

impl HostBackend for SimulatedBackend {
    type Host = SimulatedHost;

    fn open(&mut self) -> Result<SimulatedHost> {
        if !self.available {
            return Err(RackError::HostUnavailable {
                reason: "no real-time audio output on this platform".to_string(),
            });
        }
        self.opened += 1;
        let mut host = SimulatedHost::new();
        host.set_deferred(self.deferred);
        Ok(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AudioBuffer, ChannelLayout};
    use approx::assert_abs_diff_eq;

    fn one_second_buffer() -> Arc<AudioBuffer> {
        Arc::new(AudioBuffer::new(48000, ChannelLayout::Stereo))
    }

    #[test]
    fn test_connect_and_disconnect() {
        let mut host = SimulatedHost::new();
        let gain = host.create_node(NodeKind::Gain).unwrap();
        let dest = host.destination();

        host.connect(gain, dest).unwrap();
        assert!(host.is_connected(gain, dest));

        host.disconnect(gain, dest).unwrap();
        assert!(!host.is_connected(gain, dest));
    }

    #[test]
    fn test_disconnect_absent_edge_errors() {
        let mut host = SimulatedHost::new();
        let gain = host.create_node(NodeKind::Gain).unwrap();
        assert!(host.disconnect(gain, host.destination()).is_err());
    }

    #[test]
    fn test_release_drops_edges() {
        let mut host = SimulatedHost::new();
        let gain = host.create_node(NodeKind::Gain).unwrap();
        let source = host.create_source(one_second_buffer()).unwrap();
        host.connect(source, gain).unwrap();

        host.release(source).unwrap();
        assert!(host.edges().is_empty());
        assert!(host.is_released(source));
        assert!(host.connect(source, gain).is_err());
    }

    #[test]
    fn test_linear_ramp_evaluation() {
        let mut host = SimulatedHost::new();
        let gain = host.create_node(NodeKind::Gain).unwrap();

        host.set_value_at_time(gain, AudioParam::Gain, 1.0, 0.0).unwrap();
        host.linear_ramp_to_value_at_time(gain, AudioParam::Gain, 0.0, 0.01)
            .unwrap();

        assert_abs_diff_eq!(
            host.param_value_at(gain, AudioParam::Gain, 0.005).unwrap(),
            0.5,
            epsilon = 1e-4
        );
        assert_abs_diff_eq!(
            host.param_value_at(gain, AudioParam::Gain, 0.02).unwrap(),
            0.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_cancel_scheduled_values() {
        let mut host = SimulatedHost::new();
        let gain = host.create_node(NodeKind::Gain).unwrap();
        host.set_value_at_time(gain, AudioParam::Gain, 0.2, 1.0).unwrap();

        host.cancel_scheduled_values(gain, AudioParam::Gain, 0.5).unwrap();
        assert_abs_diff_eq!(
            host.param_value_at(gain, AudioParam::Gain, 2.0).unwrap(),
            1.0
        );
    }

    #[test]
    fn test_missing_param_errors() {
        let mut host = SimulatedHost::new();
        let gain = host.create_node(NodeKind::Gain).unwrap();
        assert!(host
            .set_value_at_time(gain, AudioParam::DelayTime, 0.1, 0.0)
            .is_err());
    }

    #[test]
    fn test_source_ends_when_clock_passes_duration() {
        let mut host = SimulatedHost::new();
        let source = host.create_source(one_second_buffer()).unwrap();
        host.start_source(source, 0.0).unwrap();
        assert_eq!(host.start_count(), 1);

        host.advance(0.5);
        assert!(host.poll_events().is_empty());

        host.advance(0.6);
        assert_eq!(host.poll_events(), vec![HostEvent::SourceEnded(source)]);
    }

    #[test]
    fn test_source_starts_once() {
        let mut host = SimulatedHost::new();
        let source = host.create_source(one_second_buffer()).unwrap();
        host.start_source(source, 0.0).unwrap();
        assert!(host.start_source(source, 0.0).is_err());
    }

    #[test]
    fn test_clock_frozen_while_suspended() {
        let mut host = SimulatedHost::new();
        host.suspend().unwrap();
        assert_eq!(host.poll_events(), vec![HostEvent::Suspended]);

        host.advance(1.0);
        assert_eq!(host.current_time(), 0.0);

        host.resume().unwrap();
        host.advance(1.0);
        assert_abs_diff_eq!(host.current_time(), 1.0);
    }

    #[test]
    fn test_deferred_completion() {
        let mut host = SimulatedHost::new();
        host.set_deferred(true);

        host.suspend().unwrap();
        assert!(host.poll_events().is_empty());
        assert!(!host.is_suspended());
        assert_eq!(host.pending_requests(), 1);

        host.complete_pending();
        assert!(host.is_suspended());
        assert_eq!(host.poll_events(), vec![HostEvent::Suspended]);
    }

    #[test]
    fn test_stop_notifies_once() {
        let mut host = SimulatedHost::new();
        let source = host.create_source(one_second_buffer()).unwrap();
        host.start_source(source, 0.0).unwrap();

        host.stop_source(source).unwrap();
        host.stop_source(source).unwrap();
        assert_eq!(host.poll_events(), vec![HostEvent::SourceEnded(source)]);
    }

    #[test]
    fn test_closed_context_rejects_calls() {
        let mut host = SimulatedHost::new();
        host.close().unwrap();
        assert!(host.create_node(NodeKind::Gain).is_err());
        assert!(host.suspend().is_err());
    }

    #[test]
    fn test_unavailable_backend() {
        let mut backend = SimulatedBackend::unavailable();
        let err = backend.open().unwrap_err();
        assert!(matches!(err, RackError::HostUnavailable { .. }));
        assert_eq!(backend.opened(), 0);
    }
}
