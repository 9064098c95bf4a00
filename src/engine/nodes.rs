//! Node Set
//!
//! The persistent processing nodes, created once per context by
//! [`NodeSet::build`] and addressed by [`NodeRole`]:
//!
//! ```text
//! source ─> EQ[0] ─> EQ[1] ─> EQ[2] ─> compressor ─┬─> dry ───────────┬─> master ─> analyser ─> destination
//!                                                  └─> delay ─> wet ──┘
//!                                                       ^   │
//!                                                       └ feedback
//! ```
//!
//! The Node Set also tracks every connection it has made, so that
//! disconnecting is idempotent: [`NodeSet::disconnect_if_present`] never
//! asks the host to remove an edge that is not there.

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::dsp::{ParameterModel, BAND_KINDS, EQ_BAND_COUNT, MAX_DELAY_SECS};
use crate::error::{RackError, Result};
use crate::host::{AudioHost, NodeId, NodeKind};

/// A directed connection between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

impl Edge {
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Name of a persistent node in the set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    /// Master volume gain
    Master,
    /// EQ band filter by position
    EqBand(usize),
    Compressor,
    /// The delay line itself
    DelayLine,
    /// Gain looping the delay output back into its input
    Feedback,
    /// Unprocessed path around the delay
    Dry,
    /// Delayed path
    Wet,
    /// Analysis tap before the destination
    Analyser,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Master => write!(f, "master"),
            NodeRole::EqBand(i) => write!(f, "eq[{}]", i),
            NodeRole::Compressor => write!(f, "compressor"),
            NodeRole::DelayLine => write!(f, "delay"),
            NodeRole::Feedback => write!(f, "feedback"),
            NodeRole::Dry => write!(f, "dry"),
            NodeRole::Wet => write!(f, "wet"),
            NodeRole::Analyser => write!(f, "analyser"),
        }
    }
}

/// Arena of the persistent node handles plus the edges made between them
#[derive(Debug, Clone)]
pub struct NodeSet {
    master: NodeId,
    eq: [NodeId; EQ_BAND_COUNT],
    compressor: NodeId,
    delay: NodeId,
    feedback: NodeId,
    dry: NodeId,
    wet: NodeId,
    analyser: NodeId,
    destination: NodeId,
    edges: BTreeSet<Edge>,
}

impl NodeSet {
    /// Create every persistent node, wire the fixed connections and
    /// initialise live values from `params`
    ///
    /// # Arguments
    /// * `host` - Freshly opened context
    /// * `params` - Model the node values are taken from
    pub fn build<H: AudioHost + ?Sized>(host: &mut H, params: &ParameterModel) -> Result<Self> {
        let master = host.create_node(NodeKind::Gain)?;
        let mut eq = [0; EQ_BAND_COUNT];
        for (slot, kind) in eq.iter_mut().zip(BAND_KINDS) {
            *slot = host.create_node(NodeKind::Filter(kind))?;
        }
        let compressor = host.create_node(NodeKind::Compressor)?;
        let delay = host.create_node(NodeKind::Delay {
            max_delay_secs: MAX_DELAY_SECS,
        })?;
        let feedback = host.create_node(NodeKind::Gain)?;
        let dry = host.create_node(NodeKind::Gain)?;
        let wet = host.create_node(NodeKind::Gain)?;
        let analyser = host.create_node(NodeKind::Analyser)?;

        let mut nodes = Self {
            master,
            eq,
            compressor,
            delay,
            feedback,
            dry,
            wet,
            analyser,
            destination: host.destination(),
            edges: BTreeSet::new(),
        };

        for edge in nodes.fixed_edges() {
            nodes.connect(host, edge)?;
        }

        let now = host.current_time();
        for (role, param, value) in params.node_values() {
            host.set_value_at_time(nodes.node(role)?, param, value, now)?;
        }

        debug!(
            "[NODES] Built {} nodes, {} fixed connections",
            EQ_BAND_COUNT + 7,
            nodes.edges.len()
        );
        Ok(nodes)
    }

    /// Handle of the node playing `role`
    pub fn node(&self, role: NodeRole) -> Result<NodeId> {
        let id = match role {
            NodeRole::Master => self.master,
            NodeRole::EqBand(i) => *self.eq.get(i).ok_or(RackError::InvalidBand {
                index: i,
                count: EQ_BAND_COUNT,
            })?,
            NodeRole::Compressor => self.compressor,
            NodeRole::DelayLine => self.delay,
            NodeRole::Feedback => self.feedback,
            NodeRole::Dry => self.dry,
            NodeRole::Wet => self.wet,
            NodeRole::Analyser => self.analyser,
        };
        Ok(id)
    }

    pub fn master(&self) -> NodeId {
        self.master
    }

    pub fn eq_band(&self, index: usize) -> Option<NodeId> {
        self.eq.get(index).copied()
    }

    pub fn compressor(&self) -> NodeId {
        self.compressor
    }

    pub fn delay(&self) -> NodeId {
        self.delay
    }

    pub fn feedback(&self) -> NodeId {
        self.feedback
    }

    pub fn dry(&self) -> NodeId {
        self.dry
    }

    pub fn wet(&self) -> NodeId {
        self.wet
    }

    pub fn analyser(&self) -> NodeId {
        self.analyser
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// Connections that never depend on the enabled flags: the feedback
    /// loop, the delay's wet tap, and the master -> analyser -> destination tail
    pub fn fixed_edges(&self) -> [Edge; 5] {
        [
            Edge::new(self.delay, self.feedback),
            Edge::new(self.feedback, self.delay),
            Edge::new(self.delay, self.wet),
            Edge::new(self.master, self.analyser),
            Edge::new(self.analyser, self.destination),
        ]
    }

    pub fn is_fixed(&self, edge: &Edge) -> bool {
        self.fixed_edges().contains(edge)
    }

    /// Every connection currently made through this set
    pub fn edges(&self) -> &BTreeSet<Edge> {
        &self.edges
    }

    /// Connections the router owns (everything except the fixed ones)
    pub fn routed_edges(&self) -> BTreeSet<Edge> {
        self.edges
            .iter()
            .filter(|e| !self.is_fixed(e))
            .copied()
            .collect()
    }

    /// Connect `edge` unless it already exists
    ///
    /// Returns true if a new connection was made.
    pub fn connect<H: AudioHost + ?Sized>(&mut self, host: &mut H, edge: Edge) -> Result<bool> {
        if self.edges.contains(&edge) {
            return Ok(false);
        }
        host.connect(edge.from, edge.to)?;
        self.edges.insert(edge);
        Ok(true)
    }

    /// Disconnect `edge` if it exists; a no-op otherwise
    ///
    /// Returns true if a connection was removed.
    pub fn disconnect_if_present<H: AudioHost + ?Sized>(
        &mut self,
        host: &mut H,
        edge: Edge,
    ) -> Result<bool> {
        if !self.edges.contains(&edge) {
            return Ok(false);
        }
        host.disconnect(edge.from, edge.to)?;
        self.edges.remove(&edge);
        Ok(true)
    }

    /// Remove every connection into or out of `node`
    pub fn detach<H: AudioHost + ?Sized>(&mut self, host: &mut H, node: NodeId) -> Result<()> {
        let touching: Vec<Edge> = self
            .edges
            .iter()
            .filter(|e| e.from == node || e.to == node)
            .copied()
            .collect();
        for edge in touching {
            self.disconnect_if_present(host, edge)?;
        }
        Ok(())
    }
}
