//! Playback Controller
//!
//! [`Engine`] owns the processing context, the Node Set, the decoded
//! buffer and the transport state. It creates one transient source per
//! `play()`, routes it through the Node Set and starts it on the host clock.
//!
//! Pause and resume suspend the shared clock rather than the source, so
//! the delay line keeps its state across a pause. Both are asynchronous on
//! the host: the state only changes when the completion event is drained
//! by [`Engine::poll`]. Operations that send host requests drain whatever is
//! already available before returning.
//!
//! Transport operations called in a state where they do not apply are
//! silent no-ops returning `Ok(())`.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::buffer::AudioBuffer;
use super::decode::{decode_audio, decode_file};
use super::nodes::{Edge, NodeSet};
use super::router::{self, RouteChanges};
use super::transport::{TransportManager, TransportState};
use crate::config::EngineConfig;
use crate::dsp::ParameterModel;
use crate::error::{RackError, Result};
use crate::host::{AudioHost, HostBackend, HostEvent, NodeId};

/// A live context and the persistent nodes built in it
pub(super) struct Context<H> {
    pub(super) host: H,
    pub(super) nodes: NodeSet,
}

/// The transient source of the current `play()`
#[derive(Debug, Clone, Copy)]
struct ActiveSource {
    node: NodeId,
    /// Host clock time the source was started at
    started_at: f64,
    /// Set by the natural-end notification, also while suspended
    ended: bool,
    /// A stop was already sent to the host
    stopped: bool,
}

/// Real-time effects engine
pub struct Engine<B: HostBackend> {
    backend: B,
    pub(super) config: EngineConfig,
    pub(super) params: Arc<ParameterModel>,
    pub(super) context: Option<Context<B::Host>>,
    transport: TransportManager,
    buffer: Option<Arc<AudioBuffer>>,
    file_name: Option<String>,
    source: Option<ActiveSource>,
}

impl<B: HostBackend> Engine<B> {
    /// Create an engine with default settings
    ///
    /// No context is opened until [`activate`](Self::activate).
    ///
    /// # Example
    /// ```
    /// use rackplay::{Engine, SimulatedBackend, TransportState};
    /// let engine = Engine::new(SimulatedBackend::new());
    /// assert_eq!(engine.transport_state(), TransportState::Uninitialized);
    /// assert!(!engine.is_activated());
    /// ```
    pub fn new(backend: B) -> Self {
        let config = EngineConfig::default();
        Self {
            backend,
            params: Arc::new(config.initial_parameters.clone()),
            config,
            context: None,
            transport: TransportManager::new(),
            buffer: None,
            file_name: None,
            source: None,
        }
    }

    /// Create an engine from a validated configuration
    pub fn with_config(backend: B, config: EngineConfig) -> Result<Self> {
        let config = config.validate()?;
        let mut engine = Self::new(backend);
        engine.params = Arc::new(config.initial_parameters.clone());
        engine.config = config;
        Ok(engine)
    }

    // ========================================================================
    // Context lifecycle
    // ========================================================================

    /// Open the processing context and build the Node Set
    ///
    /// Idempotent. Platforms usually require the first call to happen
    /// inside a user gesture handler. On failure the engine stays
    /// `Uninitialized` and the call can be retried.
    pub fn activate(&mut self) -> Result<()> {
        if self.context.is_some() {
            debug!("[HOST] Already active");
            return Ok(());
        }

        let mut host = self.backend.open()?;
        let nodes = match NodeSet::build(&mut host, &self.params) {
            Ok(nodes) => nodes,
            Err(e) => {
                if let Err(close_err) = host.close() {
                    warn!("[HOST] Failed to close half-built context: {}", close_err);
                }
                return Err(e);
            }
        };

        self.context = Some(Context { host, nodes });
        self.transport.activated(self.buffer.is_some());
        self.reconcile()?;
        info!("[HOST] Context active ({})", self.transport.state());
        Ok(())
    }

    /// Stop playback, close the context and return to `Uninitialized`
    ///
    /// The decoded buffer and parameters are kept; a later
    /// [`activate`](Self::activate) builds a fresh context.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.context.is_none() {
            return Ok(());
        }
        if let Err(e) = self.discard_source() {
            warn!("[TRANSPORT] Failed to discard source on shutdown: {}", e);
        }
        let closed = match self.context.take() {
            Some(mut ctx) => ctx.host.close(),
            None => Ok(()),
        };
        self.transport.deactivated();
        info!("[HOST] Context closed");
        closed
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Decode `bytes` and make them the current buffer
    ///
    /// On failure the previous buffer and transport state are kept, only
    /// the file name is cleared. On success any existing source is stopped
    /// and discarded and the transport becomes `Loaded`.
    ///
    /// # Arguments
    /// * `file_name` - Name shown for the loaded file
    /// * `bytes` - Raw file contents
    pub fn load(&mut self, file_name: impl Into<String>, bytes: &[u8]) -> Result<()> {
        let decoded = decode_audio(bytes);
        self.install(file_name.into(), decoded)
    }

    /// Read a file from disk and [`load`](Self::load) it
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let decoded = decode_file(path);
        self.install(name, decoded)
    }

    fn install(&mut self, file_name: String, decoded: Result<AudioBuffer>) -> Result<()> {
        let buffer = match decoded {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!("[TRANSPORT] Failed to load '{}': {}", file_name, e);
                self.file_name = None;
                return Err(e);
            }
        };

        self.discard_source()?;
        info!(
            "[TRANSPORT] Loaded '{}' ({:.3}s, {} ch)",
            file_name,
            buffer.duration_secs(),
            buffer.channels()
        );
        self.buffer = Some(Arc::new(buffer));
        self.file_name = Some(file_name);
        self.transport.loaded();
        self.restart_clock_if_idle()?;
        self.poll()
    }

    // ========================================================================
    // Transport Controls
    // ========================================================================

    /// Start playback of the current buffer from the beginning
    ///
    /// Valid from `Loaded` (or `Idle` with a buffer). Activates the context
    /// first if needed. A no-op while already playing.
    pub fn play(&mut self) -> Result<()> {
        if self.transport.is_playing() {
            debug!("[TRANSPORT] Already playing");
            return Ok(());
        }
        let Some(buffer) = self.buffer.clone() else {
            debug!("[TRANSPORT] Play ignored: nothing loaded");
            return Ok(());
        };

        self.activate()?;
        if !self.transport.can_play(true) {
            debug!("[TRANSPORT] Play ignored in {}", self.transport.state());
            return Ok(());
        }
        self.discard_source()?;

        let ctx = self.context_mut()?;
        let node = ctx.host.create_source(buffer)?;
        let started_at = ctx.host.current_time();
        self.source = Some(ActiveSource {
            node,
            started_at,
            ended: false,
            stopped: false,
        });

        let started = self.reconcile().and_then(|_| {
            let ctx = self.context_mut()?;
            ctx.host.start_source(node, started_at)
        });
        if let Err(e) = started {
            if let Err(discard_err) = self.discard_source() {
                warn!("[TRANSPORT] Failed to discard source: {}", discard_err);
            }
            return Err(e);
        }

        self.transport.started();
        info!("[TRANSPORT] Play from {:.3}s (source {})", started_at, node);
        self.poll()
    }

    /// Suspend the clock; the state becomes `Paused` once the host confirms
    pub fn pause(&mut self) -> Result<()> {
        if !self.transport.request_suspend() {
            return Ok(());
        }
        let requested = self.context_mut().and_then(|ctx| ctx.host.suspend());
        if let Err(e) = requested {
            self.transport.clear_pending();
            return Err(e);
        }
        debug!("[TRANSPORT] Suspend requested");
        self.poll()
    }

    /// Resume the clock; the state becomes `Playing` (or `Loaded` if the
    /// source ended while paused) once the host confirms
    pub fn resume(&mut self) -> Result<()> {
        if !self.transport.request_resume() {
            return Ok(());
        }
        let requested = self.context_mut().and_then(|ctx| ctx.host.resume());
        if let Err(e) = requested {
            self.transport.clear_pending();
            return Err(e);
        }
        debug!("[TRANSPORT] Resume requested");
        self.poll()
    }

    /// Halt and discard the current source
    ///
    /// Valid from `Playing` or `Paused`. A suspended clock is restarted so
    /// the next `play()` runs on a live context.
    pub fn stop(&mut self) -> Result<()> {
        if !self.transport.stopped() {
            return Ok(());
        }
        self.discard_source()?;
        self.restart_clock_if_idle()?;
        info!("[TRANSPORT] Stopped");
        self.poll()
    }

    /// Drain host notifications and apply them to the transport
    ///
    /// Call this from the control loop on every tick.
    pub fn poll(&mut self) -> Result<()> {
        loop {
            let events = match self.context.as_mut() {
                Some(ctx) => ctx.host.poll_events(),
                None => return Ok(()),
            };
            if events.is_empty() {
                return Ok(());
            }
            for event in events {
                self.handle_event(event)?;
            }
        }
    }

    fn handle_event(&mut self, event: HostEvent) -> Result<()> {
        match event {
            HostEvent::SourceEnded(node) => {
                let Some(source) = self.source.as_mut().filter(|s| s.node == node) else {
                    debug!("[TRANSPORT] Ignoring end of stale source {}", node);
                    return Ok(());
                };
                source.ended = true;
                debug!("[TRANSPORT] Source {} reached its end", node);
                if self.transport.source_ended() {
                    self.discard_source()?;
                }
            }
            HostEvent::Suspended => {
                self.transport.on_suspended();
                self.restart_clock_if_idle()?;
            }
            HostEvent::Resumed => {
                let ended = self.source.as_ref().is_some_and(|s| s.ended);
                if self.transport.on_resumed(ended) {
                    self.discard_source()?;
                }
            }
        }
        Ok(())
    }

    /// Resume a clock left suspended with nothing paused on it
    fn restart_clock_if_idle(&mut self) -> Result<()> {
        if !self.transport.restart_clock() {
            return Ok(());
        }
        let requested = self.context_mut().and_then(|ctx| ctx.host.resume());
        if let Err(e) = requested {
            self.transport.clear_pending();
            return Err(e);
        }
        Ok(())
    }

    /// Stop (unless already ended), unroute and release the current source
    ///
    /// On a host error the source stays tracked so a later call can retry.
    fn discard_source(&mut self) -> Result<()> {
        let Some(mut source) = self.source.take() else {
            return Ok(());
        };
        let Some(ctx) = self.context.as_mut() else {
            return Ok(());
        };
        if let Err(e) = Self::teardown(ctx, &mut source) {
            warn!("[TRANSPORT] Failed to discard source {}: {}", source.node, e);
            self.source = Some(source);
            return Err(e);
        }
        debug!("[TRANSPORT] Discarded source {}", source.node);
        Ok(())
    }

    fn teardown(ctx: &mut Context<B::Host>, source: &mut ActiveSource) -> Result<()> {
        if !source.ended && !source.stopped {
            ctx.host.stop_source(source.node)?;
            source.stopped = true;
        }
        ctx.nodes.detach(&mut ctx.host, source.node)?;
        ctx.host.release(source.node)
    }

    // ========================================================================
    // Routing
    // ========================================================================

    /// Make the live connections match the enabled flags
    ///
    /// A no-op before activation.
    pub fn reconcile(&mut self) -> Result<RouteChanges> {
        let source = self.source.map(|s| s.node);
        match self.context.as_mut() {
            Some(ctx) => router::reconcile(&mut ctx.host, &mut ctx.nodes, &self.params, source),
            None => Ok(RouteChanges::default()),
        }
    }

    /// Connections the router currently maintains
    pub fn routed_edges(&self) -> BTreeSet<Edge> {
        self.context
            .as_ref()
            .map(|ctx| ctx.nodes.routed_edges())
            .unwrap_or_default()
    }

    fn context_mut(&mut self) -> Result<&mut Context<B::Host>> {
        self.context.as_mut().ok_or_else(|| RackError::Host {
            reason: "engine is not activated".to_string(),
        })
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    /// Snapshot of the Parameter Model
    pub fn current_parameters(&self) -> Arc<ParameterModel> {
        Arc::clone(&self.params)
    }

    pub fn is_activated(&self) -> bool {
        self.context.is_some()
    }

    /// Name of the loaded file; cleared when a load fails
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn buffer(&self) -> Option<&Arc<AudioBuffer>> {
        self.buffer.as_ref()
    }

    /// Seconds of the buffer played by the current source
    pub fn position_secs(&self) -> f64 {
        match (&self.context, &self.source, &self.buffer) {
            (Some(ctx), Some(source), Some(buffer)) => {
                let elapsed = ctx.host.current_time() - source.started_at;
                elapsed.clamp(0.0, buffer.duration_secs())
            }
            _ => 0.0,
        }
    }

    /// Length of the loaded buffer in seconds
    pub fn duration_secs(&self) -> f64 {
        self.buffer
            .as_ref()
            .map(|b| b.duration_secs())
            .unwrap_or(0.0)
    }

    pub fn source_node(&self) -> Option<NodeId> {
        self.source.map(|s| s.node)
    }

    pub fn nodes(&self) -> Option<&NodeSet> {
        self.context.as_ref().map(|ctx| &ctx.nodes)
    }

    pub fn host(&self) -> Option<&B::Host> {
        self.context.as_ref().map(|ctx| &ctx.host)
    }

    /// Mutable access to the host, e.g. to drive a simulated clock
    pub fn host_mut(&mut self) -> Option<&mut B::Host> {
        self.context.as_mut().map(|ctx| &mut ctx.host)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
