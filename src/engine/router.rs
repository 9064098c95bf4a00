//! Graph Router
//!
//! Makes the live connections match the enabled flags. The stage order is
//! fixed: EQ[0], EQ[1], EQ[2], compressor, delay. [`plan`] walks those
//! stages with a cursor starting at the source and yields the edges the
//! topology should have; [`reconcile`] diffs that against what the Node Set
//! has connected, removes stale edges first, then adds missing ones.
//!
//! Calling [`reconcile`] again with unchanged inputs changes nothing.

use std::collections::BTreeSet;

use tracing::{debug, info};

use super::nodes::{Edge, NodeSet};
use crate::dsp::ParameterModel;
use crate::error::Result;
use crate::host::{AudioHost, NodeId};

/// Connections touched by one [`reconcile`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteChanges {
    pub connected: Vec<Edge>,
    pub disconnected: Vec<Edge>,
}

impl RouteChanges {
    /// Check whether the call left the topology as it was
    pub fn is_empty(&self) -> bool {
        self.connected.is_empty() && self.disconnected.is_empty()
    }
}

/// Routed edges the enabled flags call for
///
/// Without a source, the chain is still wired from its first enabled
/// stage so the next source only needs a single connection.
///
/// # Arguments
/// * `params` - Model whose enabled flags decide the stages in the path
/// * `nodes` - Node Set to route through
/// * `source` - Current transient source, if any
pub fn plan(params: &ParameterModel, nodes: &NodeSet, source: Option<NodeId>) -> BTreeSet<Edge> {
    let mut edges = BTreeSet::new();
    let mut cursor = source;

    let mut advance = |cursor: &mut Option<NodeId>, stage: NodeId| {
        if let Some(from) = *cursor {
            edges.insert(Edge::new(from, stage));
        }
        *cursor = Some(stage);
    };

    for (i, band) in params.eq.iter().enumerate() {
        if band.enabled {
            if let Some(node) = nodes.eq_band(i) {
                advance(&mut cursor, node);
            }
        }
    }
    if params.compressor.enabled {
        advance(&mut cursor, nodes.compressor());
    }

    let master = nodes.master();
    if params.delay.enabled {
        if let Some(from) = cursor {
            edges.insert(Edge::new(from, nodes.dry()));
            edges.insert(Edge::new(from, nodes.delay()));
        }
        edges.insert(Edge::new(nodes.dry(), master));
        edges.insert(Edge::new(nodes.wet(), master));
    } else if let Some(from) = cursor {
        edges.insert(Edge::new(from, master));
    }

    edges
}

/// Bring the live topology in line with `params`
///
/// Stale routed edges are disconnected before missing ones are connected.
/// The fixed feedback loop, wet tap and output tail are re-ensured last.
///
/// # Arguments
/// * `host` - Context owning the nodes
/// * `nodes` - Node Set to rewire
/// * `params` - Model whose enabled flags decide the topology
/// * `source` - Current transient source, if any
pub fn reconcile<H: AudioHost + ?Sized>(
    host: &mut H,
    nodes: &mut NodeSet,
    params: &ParameterModel,
    source: Option<NodeId>,
) -> Result<RouteChanges> {
    let desired = plan(params, nodes, source);
    let current = nodes.routed_edges();
    let mut changes = RouteChanges::default();

    for edge in current.difference(&desired) {
        if nodes.disconnect_if_present(host, *edge)? {
            changes.disconnected.push(*edge);
        }
    }
    for edge in desired.difference(&current) {
        if nodes.connect(host, *edge)? {
            changes.connected.push(*edge);
        }
    }
    for edge in nodes.fixed_edges() {
        if nodes.connect(host, edge)? {
            changes.connected.push(edge);
        }
    }

    if changes.is_empty() {
        debug!("[ROUTER] Topology unchanged ({} routed edges)", desired.len());
    } else {
        info!(
            "[ROUTER] Reconciled: +{} -{} ({} routed edges)",
            changes.connected.len(),
            changes.disconnected.len(),
            desired.len()
        );
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{AudioHost, SimulatedHost};

    fn setup() -> (SimulatedHost, NodeSet, ParameterModel) {
        let mut host = SimulatedHost::new();
        let params = ParameterModel::default();
        let nodes = NodeSet::build(&mut host, &params).unwrap();
        (host, nodes, params)
    }

    fn source(host: &mut SimulatedHost) -> NodeId {
        use crate::engine::{AudioBuffer, ChannelLayout};
        use std::sync::Arc;
        host.create_source(Arc::new(AudioBuffer::new(480, ChannelLayout::Stereo)))
            .unwrap()
    }

    #[test]
    fn test_default_chain() {
        let (mut host, mut nodes, params) = setup();
        let src = source(&mut host);

        reconcile(&mut host, &mut nodes, &params, Some(src)).unwrap();

        let eq = |i| nodes.eq_band(i).unwrap();
        assert!(host.is_connected(src, eq(0)));
        assert!(host.is_connected(eq(0), eq(1)));
        assert!(host.is_connected(eq(1), eq(2)));
        assert!(host.is_connected(eq(2), nodes.compressor()));
        assert!(host.is_connected(nodes.compressor(), nodes.master()));
        assert!(!host.is_connected(nodes.wet(), nodes.master()));
        assert_eq!(host.outgoing(src).len(), 1);
    }

    #[test]
    fn test_everything_bypassed_connects_source_to_master() {
        let (mut host, mut nodes, mut params) = setup();
        for band in params.eq.iter_mut() {
            band.enabled = false;
        }
        params.compressor.enabled = false;
        let src = source(&mut host);

        reconcile(&mut host, &mut nodes, &params, Some(src)).unwrap();

        assert_eq!(host.outgoing(src), vec![nodes.master()]);
    }

    #[test]
    fn test_delay_splits_into_dry_and_delay_line() {
        let (mut host, mut nodes, mut params) = setup();
        params.delay.enabled = true;
        let src = source(&mut host);

        reconcile(&mut host, &mut nodes, &params, Some(src)).unwrap();

        let comp = nodes.compressor();
        assert!(host.is_connected(comp, nodes.dry()));
        assert!(host.is_connected(comp, nodes.delay()));
        assert!(!host.is_connected(comp, nodes.master()));
        assert!(host.is_connected(nodes.dry(), nodes.master()));
        assert!(host.is_connected(nodes.wet(), nodes.master()));
    }

    #[test]
    fn test_toggle_removes_stale_edges() {
        let (mut host, mut nodes, mut params) = setup();
        let src = source(&mut host);
        params.delay.enabled = true;
        reconcile(&mut host, &mut nodes, &params, Some(src)).unwrap();

        params.delay.enabled = false;
        params.eq[1].enabled = false;
        let changes = reconcile(&mut host, &mut nodes, &params, Some(src)).unwrap();

        assert!(!host.is_connected(nodes.dry(), nodes.master()));
        assert!(!host.is_connected(nodes.wet(), nodes.master()));
        assert!(host.is_connected(nodes.eq_band(0).unwrap(), nodes.eq_band(2).unwrap()));
        assert!(host.outgoing(nodes.eq_band(1).unwrap()).is_empty());
        assert!(!changes.disconnected.is_empty());
        // Feedback loop survives the bypass
        assert!(host.is_connected(nodes.delay(), nodes.feedback()));
        assert!(host.is_connected(nodes.feedback(), nodes.delay()));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let (mut host, mut nodes, params) = setup();
        let src = source(&mut host);

        reconcile(&mut host, &mut nodes, &params, Some(src)).unwrap();
        let before = host.edges().clone();
        let changes = reconcile(&mut host, &mut nodes, &params, Some(src)).unwrap();

        assert!(changes.is_empty());
        assert_eq!(host.edges(), &before);
    }

    #[test]
    fn test_plan_without_source() {
        let (_, nodes, params) = setup();
        let edges = plan(&params, &nodes, None);

        // eq0 -> eq1 -> eq2 -> compressor -> master
        assert_eq!(edges.len(), 4);
        assert!(edges.iter().all(|e| e.to != nodes.eq_band(0).unwrap()));
    }
}
