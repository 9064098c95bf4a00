//! Transport State Machine
//!
//! Tracks the playback lifecycle:
//!
//! ```text
//! Uninitialized -> Idle -> Loaded -> Playing <-> Paused
//!                            ^          |          |
//!                            +---stop / natural end+
//! ```
//!
//! The host clock is suspended and resumed asynchronously, so pause and
//! resume only move the state once the host confirms. A request that is
//! still in flight blocks further pause/resume requests. Leaving `Playing`
//! while a suspend is in flight cancels the pause it was sent for, and a
//! clock restart in flight never blocks `play`: the host handles requests
//! in order, so a source started now runs as soon as the clock does.
//!
//! Every transition is guarded: calling it from a state where it does not
//! apply is a silent no-op that returns false.

use std::fmt;

use tracing::debug;

/// Transport states representing the current playback mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// No processing context yet (default state)
    #[default]
    Uninitialized,
    /// Context is live, no buffer loaded
    Idle,
    /// A buffer is loaded and nothing is playing
    Loaded,
    /// A source is playing
    Playing,
    /// The clock is suspended mid-playback
    Paused,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportState::Uninitialized => write!(f, "Uninitialized"),
            TransportState::Idle => write!(f, "Idle"),
            TransportState::Loaded => write!(f, "Loaded"),
            TransportState::Playing => write!(f, "Playing"),
            TransportState::Paused => write!(f, "Paused"),
        }
    }
}

/// Clock request awaiting host completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingRequest {
    Suspend,
    Resume,
}

/// Manages transport state and in-flight clock requests
#[derive(Debug, Clone, Default)]
pub struct TransportManager {
    /// Current transport state
    state: TransportState,

    /// Suspend or resume sent to the host and not yet confirmed
    pending: Option<PendingRequest>,

    /// Whether the host clock is currently frozen
    clock_suspended: bool,

    /// The in-flight suspend no longer pauses anything
    suspend_cancelled: bool,
}

impl TransportManager {
    /// Create a transport in `Uninitialized`
    ///
    /// # Example
    /// ```
    /// use rackplay::engine::{TransportManager, TransportState};
    /// let transport = TransportManager::new();
    /// assert_eq!(transport.state(), TransportState::Uninitialized);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Context lifecycle
    // ========================================================================

    /// The processing context came up
    ///
    /// State transition: Uninitialized -> Idle (or Loaded if a buffer is already set)
    pub fn activated(&mut self, has_buffer: bool) -> bool {
        if self.state != TransportState::Uninitialized {
            return false;
        }
        self.state = if has_buffer {
            TransportState::Loaded
        } else {
            TransportState::Idle
        };
        debug!("[TRANSPORT] Activated -> {}", self.state);
        true
    }

    /// The processing context was closed
    ///
    /// State transition: Any -> Uninitialized
    pub fn deactivated(&mut self) {
        self.state = TransportState::Uninitialized;
        self.pending = None;
        self.clock_suspended = false;
        self.suspend_cancelled = false;
        debug!("[TRANSPORT] Deactivated");
    }

    /// A new buffer was decoded
    ///
    /// State transition: Idle/Loaded/Playing/Paused -> Loaded. Without a
    /// context the buffer is kept and `activated` picks it up.
    pub fn loaded(&mut self) -> bool {
        if self.state == TransportState::Uninitialized {
            return false;
        }
        self.leave_playback();
        self.state = TransportState::Loaded;
        debug!("[TRANSPORT] Buffer loaded");
        true
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Check whether `play` applies
    ///
    /// A clock restart or a cancelled suspend in flight does not block it.
    pub fn can_play(&self, has_buffer: bool) -> bool {
        if self.pending == Some(PendingRequest::Suspend) && !self.suspend_cancelled {
            return false;
        }
        match self.state {
            TransportState::Loaded => true,
            TransportState::Idle => has_buffer,
            _ => false,
        }
    }

    /// A source was started
    ///
    /// State transition: Loaded -> Playing
    pub fn started(&mut self) {
        self.state = TransportState::Playing;
        debug!("[TRANSPORT] Playing");
    }

    /// Ask for the clock to be suspended
    ///
    /// Only from Playing, with no suspend already in flight. A clock
    /// restart still in flight is superseded; the host completes it first.
    /// The state stays Playing until [`on_suspended`](Self::on_suspended).
    pub fn request_suspend(&mut self) -> bool {
        if self.state != TransportState::Playing
            || self.pending == Some(PendingRequest::Suspend)
        {
            debug!("[TRANSPORT] Pause ignored in {}", self.state);
            return false;
        }
        self.pending = Some(PendingRequest::Suspend);
        self.suspend_cancelled = false;
        true
    }

    /// Ask for the clock to be resumed
    ///
    /// Only from Paused with nothing in flight.
    pub fn request_resume(&mut self) -> bool {
        if self.state != TransportState::Paused || self.pending.is_some() {
            debug!("[TRANSPORT] Resume ignored in {}", self.state);
            return false;
        }
        self.pending = Some(PendingRequest::Resume);
        true
    }

    /// Forget an in-flight request the host refused
    pub fn clear_pending(&mut self) {
        self.pending = None;
        self.suspend_cancelled = false;
    }

    /// Host confirmed the clock is frozen
    ///
    /// State transition: Playing -> Paused, unless the suspend was
    /// cancelled by leaving Playing after it was sent.
    pub fn on_suspended(&mut self) {
        self.clock_suspended = true;
        let cancelled = self.suspend_cancelled;
        if self.pending == Some(PendingRequest::Suspend) {
            self.pending = None;
            self.suspend_cancelled = false;
        }
        if cancelled {
            debug!("[TRANSPORT] Suspended for a cancelled pause");
            return;
        }
        if self.state == TransportState::Playing {
            self.state = TransportState::Paused;
            debug!("[TRANSPORT] Paused");
        }
    }

    /// Whether the clock must be restarted because nothing is paused on it
    ///
    /// Marks a resume as in flight when it returns true.
    pub fn restart_clock(&mut self) -> bool {
        if !self.clock_suspended
            || self.pending.is_some()
            || self.state == TransportState::Paused
        {
            return false;
        }
        self.pending = Some(PendingRequest::Resume);
        debug!("[TRANSPORT] Restarting clock for {}", self.state);
        true
    }

    /// Host confirmed the clock runs again
    ///
    /// State transition: Paused -> Playing, or Paused -> Loaded if the
    /// source reached its end while suspended. Returns true in the latter
    /// case so the caller can discard the finished source.
    pub fn on_resumed(&mut self, source_ended: bool) -> bool {
        self.clock_suspended = false;
        if self.pending == Some(PendingRequest::Resume) {
            self.pending = None;
        }
        if self.state != TransportState::Paused {
            return false;
        }
        if source_ended {
            self.state = TransportState::Loaded;
            debug!("[TRANSPORT] Resumed after natural end -> Loaded");
            true
        } else {
            self.state = TransportState::Playing;
            debug!("[TRANSPORT] Resumed");
            false
        }
    }

    /// The playing source consumed its whole buffer
    ///
    /// State transition: Playing -> Loaded. While Paused the end is only
    /// recorded by the caller and handled on resume.
    pub fn source_ended(&mut self) -> bool {
        if self.state != TransportState::Playing {
            return false;
        }
        self.leave_playback();
        self.state = TransportState::Loaded;
        debug!("[TRANSPORT] Natural end -> Loaded");
        true
    }

    /// Stop playback
    ///
    /// State transition: Playing/Paused -> Loaded
    pub fn stopped(&mut self) -> bool {
        match self.state {
            TransportState::Playing | TransportState::Paused => {
                self.leave_playback();
                self.state = TransportState::Loaded;
                debug!("[TRANSPORT] Stopped");
                true
            }
            _ => {
                debug!("[TRANSPORT] Stop ignored in {}", self.state);
                false
            }
        }
    }

    /// A suspend sent for a pause must not pause whatever plays next
    fn leave_playback(&mut self) {
        if self.pending == Some(PendingRequest::Suspend) {
            self.suspend_cancelled = true;
        }
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    /// Get the current transport state
    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Request in flight, if any
    pub fn pending(&self) -> Option<PendingRequest> {
        self.pending
    }

    /// Check whether the host clock is frozen
    pub fn is_clock_suspended(&self) -> bool {
        self.clock_suspended
    }

    /// Check if transport is currently playing
    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Check if transport is currently paused
    pub fn is_paused(&self) -> bool {
        self.state == TransportState::Paused
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn playing() -> TransportManager {
        let mut transport = TransportManager::new();
        transport.activated(false);
        transport.loaded();
        transport.started();
        transport
    }

    // ------------------------------------------------------------------------
    // Basic State Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_default_state_is_uninitialized() {
        let transport = TransportManager::new();
        assert_eq!(transport.state(), TransportState::Uninitialized);
        assert!(!transport.is_playing());
        assert!(transport.pending().is_none());
    }

    #[test]
    fn test_activation() {
        let mut transport = TransportManager::new();
        assert!(transport.activated(false));
        assert_eq!(transport.state(), TransportState::Idle);

        // Second activation is a no-op
        assert!(!transport.activated(true));
        assert_eq!(transport.state(), TransportState::Idle);
    }

    #[test]
    fn test_activation_with_buffer_goes_to_loaded() {
        let mut transport = TransportManager::new();
        assert!(!transport.loaded());
        transport.activated(true);
        assert_eq!(transport.state(), TransportState::Loaded);
    }

    // ------------------------------------------------------------------------
    // State Transition Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_can_play() {
        let mut transport = TransportManager::new();
        assert!(!transport.can_play(true));

        transport.activated(false);
        assert!(!transport.can_play(false));
        assert!(transport.can_play(true));

        transport.loaded();
        assert!(transport.can_play(true));
    }

    #[test]
    fn test_pause_waits_for_host() {
        let mut transport = playing();

        assert!(transport.request_suspend());
        assert!(transport.is_playing());
        assert!(!transport.request_suspend());

        transport.on_suspended();
        assert!(transport.is_paused());
        assert!(transport.pending().is_none());
        assert!(transport.is_clock_suspended());
    }

    #[test]
    fn test_resume_waits_for_host() {
        let mut transport = playing();
        transport.request_suspend();
        transport.on_suspended();

        assert!(transport.request_resume());
        assert!(transport.is_paused());

        assert!(!transport.on_resumed(false));
        assert!(transport.is_playing());
        assert!(!transport.is_clock_suspended());
    }

    #[test]
    fn test_resume_after_natural_end_lands_in_loaded() {
        let mut transport = playing();
        transport.request_suspend();
        transport.on_suspended();

        // End reported while suspended does not move the state
        assert!(!transport.source_ended());
        assert!(transport.is_paused());

        transport.request_resume();
        assert!(transport.on_resumed(true));
        assert_eq!(transport.state(), TransportState::Loaded);
    }

    #[test]
    fn test_natural_end_while_playing() {
        let mut transport = playing();
        assert!(transport.source_ended());
        assert_eq!(transport.state(), TransportState::Loaded);
        assert!(transport.can_play(true));
    }

    #[test]
    fn test_stop_from_paused_restarts_clock() {
        let mut transport = playing();
        transport.request_suspend();
        transport.on_suspended();

        assert!(transport.stopped());
        assert_eq!(transport.state(), TransportState::Loaded);
        assert!(transport.restart_clock());
        assert_eq!(transport.pending(), Some(PendingRequest::Resume));

        transport.on_resumed(false);
        assert_eq!(transport.state(), TransportState::Loaded);
        assert!(transport.can_play(true));
    }

    #[test]
    fn test_play_during_clock_restart() {
        let mut transport = playing();
        transport.request_suspend();
        transport.on_suspended();
        transport.stopped();
        transport.restart_clock();

        assert!(transport.can_play(true));
        transport.started();

        // Restart completes after the new source started
        assert!(!transport.on_resumed(false));
        assert!(transport.is_playing());
        assert!(transport.pending().is_none());
        assert!(!transport.is_clock_suspended());
    }

    #[test]
    fn test_pause_supersedes_clock_restart() {
        let mut transport = playing();
        transport.request_suspend();
        transport.on_suspended();
        transport.stopped();
        transport.restart_clock();
        transport.started();

        assert!(transport.request_suspend());
        transport.on_resumed(false);
        assert!(transport.is_playing());
        assert_eq!(transport.pending(), Some(PendingRequest::Suspend));

        transport.on_suspended();
        assert!(transport.is_paused());
    }

    #[test]
    fn test_play_after_stop_cancels_pause_in_flight() {
        let mut transport = playing();
        transport.request_suspend();
        transport.stopped();

        assert!(transport.can_play(true));
        transport.started();

        // The stale suspend lands but the new playback is not paused
        transport.on_suspended();
        assert!(transport.is_playing());
        assert!(transport.restart_clock());
    }

    #[test]
    fn test_stop_while_suspend_in_flight() {
        let mut transport = playing();
        transport.request_suspend();

        transport.stopped();
        assert!(!transport.restart_clock());

        // Late completion must not pause a stopped transport
        transport.on_suspended();
        assert_eq!(transport.state(), TransportState::Loaded);
        assert!(transport.restart_clock());
    }

    // ------------------------------------------------------------------------
    // Edge Cases
    // ------------------------------------------------------------------------

    #[test]
    fn test_guarded_transitions_are_no_ops() {
        let mut transport = TransportManager::new();
        transport.activated(false);

        assert!(!transport.request_suspend());
        assert!(!transport.request_resume());
        assert!(!transport.stopped());
        assert!(!transport.source_ended());
        assert_eq!(transport.state(), TransportState::Idle);
    }

    #[test]
    fn test_clear_pending() {
        let mut transport = playing();
        transport.request_suspend();
        transport.clear_pending();
        assert!(transport.request_suspend());
    }

    #[test]
    fn test_deactivated_resets() {
        let mut transport = playing();
        transport.request_suspend();
        transport.on_suspended();

        transport.deactivated();
        assert_eq!(transport.state(), TransportState::Uninitialized);
        assert!(!transport.is_clock_suspended());
        assert!(transport.pending().is_none());
    }

    #[test]
    fn test_transport_state_display() {
        assert_eq!(format!("{}", TransportState::Idle), "Idle");
        assert_eq!(format!("{}", TransportState::Loaded), "Loaded");
        assert_eq!(format!("{}", TransportState::Paused), "Paused");
    }
}
