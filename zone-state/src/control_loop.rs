//! Serialized control loop
//!
//! Hardware events, hardware errors and display intents arrive from
//! different threads. They are merged into one queue and applied here one at
//! a time, so controller state and the store are never mutated concurrently
//! and updates to the same key land in arrival order.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::{mpsc, Arc};

use parking_lot::RwLock;
use serde::Serialize;
use vehicle_api::{HardwareErrorEvent, HardwareEvent, PropertyValue, VehicleTransport};

use crate::controller::PropertyController;
use crate::model::ControlId;
use crate::router::{DispatchOutcome, EventRouter};

/// One unit of work for the control loop
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Change event from the hardware
    Event(HardwareEvent),
    /// Error notification from the hardware
    Error(HardwareErrorEvent),
    /// Change requested by the display
    Intent { control: ControlId, value: PropertyValue },
    /// Stop the loop
    Shutdown,
}

/// Snapshot of a control as published to the display side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlStatus {
    /// Whether the control accepts commands
    pub enabled: bool,
    /// Value of a command not yet confirmed by the hardware
    pub pending: Option<PropertyValue>,
    /// Last hardware error code reported for the control's zone
    pub last_error: Option<i32>,
}

impl ControlStatus {
    fn of(controller: &PropertyController) -> Self {
        Self {
            enabled: controller.is_enabled(),
            pending: controller.state().pending(),
            last_error: controller.last_error(),
        }
    }
}

/// Status of every control, readable from any thread
pub type SharedStatus = Arc<RwLock<HashMap<ControlId, ControlStatus>>>;

/// Single execution context owning all controllers
pub struct ControlLoop {
    router: EventRouter,
    transport: Arc<dyn VehicleTransport>,
    status: SharedStatus,
}

impl ControlLoop {
    pub fn new(router: EventRouter, transport: Arc<dyn VehicleTransport>) -> Self {
        let control_loop = Self {
            router,
            transport,
            status: Arc::new(RwLock::new(HashMap::new())),
        };
        control_loop.publish_status();
        control_loop
    }

    /// Shared handle to the published control status
    pub fn status(&self) -> SharedStatus {
        Arc::clone(&self.status)
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Apply one input
    ///
    /// Breaks only on [`Input::Shutdown`]; every failure is logged and the
    /// loop carries on.
    pub fn handle(&mut self, input: Input) -> ControlFlow<()> {
        match input {
            Input::Event(event) => {
                tracing::debug!("Event {} zones {} = {}", event.property, event.zones, event.value);
                let outcome = self.router.dispatch(event.property, event.zones, event.value);
                if matches!(outcome, DispatchOutcome::Routed(_)) {
                    self.publish_status();
                }
            }
            Input::Error(error) => {
                if !self.router.dispatch_error(&error).is_empty() {
                    self.publish_status();
                }
            }
            Input::Intent { control, value } => {
                let Some(controller) = self.router.get_mut(&control) else {
                    tracing::warn!("Change requested for unknown control {}", control);
                    return ControlFlow::Continue(());
                };
                match controller.request_change(self.transport.as_ref(), value) {
                    Ok(written) => tracing::debug!("{}: sent {}", control, written),
                    Err(e) => tracing::warn!("{}: change to {} refused: {}", control, value, e),
                }
                self.publish_status();
            }
            Input::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Drain `inputs` until shutdown or until every sender is gone
    pub fn run(mut self, inputs: mpsc::Receiver<Input>) {
        tracing::info!("Control loop started with {} controls", self.router.len());

        for input in inputs {
            if self.handle(input).is_break() {
                break;
            }
        }

        tracing::info!("Control loop stopped");
    }

    fn publish_status(&self) {
        let mut status = self.status.write();
        for controller in self.router.controllers() {
            status.insert(controller.id().clone(), ControlStatus::of(controller));
        }
    }
}
