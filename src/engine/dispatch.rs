//! Parameter Update Dispatcher
//!
//! Runs an edit through the reducer, executes the side effects against the
//! live graph (ramps for numeric fields, a reconcile for enabled flags), and
//! only then swaps in the new model. A host error leaves the published model
//! untouched. Before activation only the model changes; `activate()`
//! initialises the nodes from it.

use std::sync::Arc;

use tracing::{debug, info};

use super::player::Engine;
use super::router;
use crate::dsp::{reduce, ParamCommand, ParamField, ParamTarget, ParamValue, SideEffect};
use crate::error::Result;
use crate::host::{AudioHost, AudioParam, HostBackend, NodeId};

impl<B: HostBackend> Engine<B> {
    /// Set one field of one effect
    ///
    /// Out-of-range numbers are clamped; `delay.feedback` always stays
    /// below 1.0.
    ///
    /// # Arguments
    /// * `target` - EQ band, compressor, delay or master
    /// * `field` - Field of the target to change
    /// * `value` - `bool` for `Enabled`, `f32` for everything else
    ///
    /// # Example
    /// ```
    /// use rackplay::{Engine, ParamField, ParamTarget, SimulatedBackend};
    /// let mut engine = Engine::new(SimulatedBackend::new());
    /// engine.set_parameter(ParamTarget::Delay, ParamField::Feedback, 2.0_f32).unwrap();
    /// assert!(engine.current_parameters().delay.feedback < 1.0);
    /// ```
    pub fn set_parameter(
        &mut self,
        target: ParamTarget,
        field: ParamField,
        value: impl Into<ParamValue>,
    ) -> Result<()> {
        self.apply(ParamCommand::new(target, field, value))
    }

    /// Apply a prepared command
    pub fn apply(&mut self, command: ParamCommand) -> Result<()> {
        let update = reduce(&self.params, &command)?;

        let ramp_secs = self.config.ramp_secs;
        let source = self.source_node();
        match self.context.as_mut() {
            Some(ctx) => {
                // One anchor for every ramp of this edit so paired ramps stay in step
                let now = ctx.host.current_time();
                let mut needs_reconcile = false;
                for effect in &update.effects {
                    match *effect {
                        SideEffect::Ramp { role, param, value } => {
                            let node = ctx.nodes.node(role)?;
                            schedule_ramp(&mut ctx.host, node, param, value, now, ramp_secs)?;
                        }
                        SideEffect::Reconcile => needs_reconcile = true,
                    }
                }
                if needs_reconcile {
                    router::reconcile(&mut ctx.host, &mut ctx.nodes, &update.model, source)?;
                }
            }
            None => debug!("[PARAMS] Not active, model updated only"),
        }

        self.params = Arc::new(update.model);
        info!(
            "[PARAMS] {}.{} = {}",
            command.target, command.field, command.value
        );
        Ok(())
    }
}

/// Ramp `param` from its current value to `value` over `ramp_secs`, starting at `now`
fn schedule_ramp<H: AudioHost + ?Sized>(
    host: &mut H,
    node: NodeId,
    param: AudioParam,
    value: f32,
    now: f64,
    ramp_secs: f64,
) -> Result<()> {
    let current = host.param_value(node, param)?;
    host.cancel_scheduled_values(node, param, now)?;
    host.set_value_at_time(node, param, current, now)?;
    host.linear_ramp_to_value_at_time(node, param, value, now + ramp_secs)?;
    debug!(
        "[PARAMS] Ramp node {} {} {:.4} -> {:.4} over {:.0}ms",
        node,
        param,
        current,
        value,
        ramp_secs * 1000.0
    );
    Ok(())
}
