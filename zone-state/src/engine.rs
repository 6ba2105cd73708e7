//! ControlEngine - the display-facing entry point
//!
//! The engine wires everything together once, at start:
//!
//! ```text
//! list descriptors ─► resolve bindings ─► register controllers ─► watch keys
//!        ─► subscribe listener ─► initial read sweep ─► spawn control loop
//! ```
//!
//! Afterwards the display reads projected values and status directly, while
//! change requests and hardware notifications are queued to the control loop
//! thread:
//!
//! ```text
//! VehicleTransport ──(events, errors)──► ChannelListener ─┐
//!                                                         ├─► mpsc ─► ControlLoop ─► PropertyStore
//! request_change() ──────(intents)────────────────────────┘                              │
//!                                                                                        ▼
//!                                                               changes() ◄── ChangeIterator
//! ```

use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use vehicle_api::{
    HardwareErrorEvent, HardwareEvent, HardwareListener, ListenerId, PropertyDescriptor, PropertyValue,
    VehicleTransport, Zone,
};

use crate::config::EngineConfig;
use crate::control_loop::{ControlLoop, ControlStatus, Input, SharedStatus};
use crate::controller::PropertyController;
use crate::error::{ControlError, Result};
use crate::iter::ControlChanges;
use crate::model::{ControlId, PropertyKey, PropertyStore};
use crate::resolver::{self, ZoneBinding};
use crate::router::EventRouter;

/// Setup-time facts about a registered control
#[derive(Debug, Clone)]
struct ControlInfo {
    key: PropertyKey,
    descriptor: PropertyDescriptor,
    binding: ZoneBinding,
}

/// Forwards hardware notifications into the control loop queue
struct ChannelListener {
    tx: mpsc::Sender<Input>,
}

impl HardwareListener for ChannelListener {
    fn on_change_event(&self, event: HardwareEvent) {
        if self.tx.send(Input::Event(event)).is_err() {
            tracing::trace!("Control loop gone, dropping hardware event");
        }
    }

    fn on_error_event(&self, error: HardwareErrorEvent) {
        if self.tx.send(Input::Error(error)).is_err() {
            tracing::trace!("Control loop gone, dropping hardware error");
        }
    }
}

/// Zoned property synchronization engine
///
/// # Example
///
/// ```rust,ignore
/// let engine = ControlEngine::start(Arc::new(vehicle), EngineConfig::hvac())?;
/// let driver = ControlId::from("driver_temperature");
///
/// engine.request_change(&driver, 24.0_f32)?;
/// for change in engine.changes() {
///     println!("{} = {}", change.control, change.value);
/// }
/// ```
pub struct ControlEngine {
    transport: Arc<dyn VehicleTransport>,
    store: PropertyStore,
    controls: HashMap<ControlId, ControlInfo>,
    order: Vec<ControlId>,
    by_key: Arc<HashMap<PropertyKey, ControlId>>,
    status: SharedStatus,
    input_tx: mpsc::Sender<Input>,
    listener: Option<ListenerId>,
    worker: Option<JoinHandle<()>>,
}

impl ControlEngine {
    /// Bind the configured controls to `transport` and start the control loop
    ///
    /// Only an invalid configuration or a failure to list the supported
    /// properties is an error. Controls that cannot be bound are skipped and
    /// controls whose initial read fails start disabled.
    pub fn start(transport: Arc<dyn VehicleTransport>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let descriptors = transport.list_supported_properties()?;
        tracing::info!(
            "Starting control engine: {} controls configured, {} properties supported",
            config.controls.len(),
            descriptors.len()
        );

        let store = PropertyStore::new();
        let mut router = EventRouter::new();
        let mut controls = HashMap::new();
        let mut order = Vec::new();

        for spec in &config.controls {
            let Some(descriptor) = descriptors.iter().find(|d| d.id == spec.property) else {
                tracing::warn!(
                    "Property {} not supported by this vehicle, skipping control {}",
                    spec.property,
                    spec.primary.id
                );
                continue;
            };

            let binding = resolver::resolve(descriptor, &spec.preferences());
            let Some(primary) = binding.primary else {
                tracing::warn!(
                    "No zone of property {} ({}) fits control {}, skipping",
                    spec.property,
                    descriptor.zones,
                    spec.primary.id
                );
                continue;
            };

            let mut roles = vec![(&spec.primary.id, primary)];
            match (&spec.secondary, binding.secondary) {
                (Some(role), Some(zone)) => roles.push((&role.id, zone)),
                (Some(role), None) => tracing::info!(
                    "Property {} has no second zone, control {} not available",
                    spec.property,
                    role.id
                ),
                (None, _) => {}
            }

            for (id, zone) in roles {
                let controller = PropertyController::new(id.clone(), descriptor.clone(), zone, store.clone());
                let key = controller.key();
                match router.register(controller) {
                    Ok(()) => {
                        controls.insert(
                            id.clone(),
                            ControlInfo {
                                key,
                                descriptor: descriptor.clone(),
                                binding,
                            },
                        );
                        order.push(id.clone());
                    }
                    Err(e) => tracing::warn!("Skipping control {}: {}", id, e),
                }
            }
        }

        let by_key: HashMap<PropertyKey, ControlId> = controls
            .iter()
            .map(|(id, info)| (info.key, id.clone()))
            .collect();
        for key in by_key.keys() {
            store.watch(*key);
        }

        // subscribe before reading so nothing reported meanwhile is lost;
        // those events wait in the queue until the loop starts
        let (input_tx, input_rx) = mpsc::channel();
        let listener = transport.subscribe(Arc::new(ChannelListener {
            tx: input_tx.clone(),
        }));

        let policy = config.read_policy();
        for controller in router.controllers_mut() {
            if let Err(e) = controller.initialize(transport.as_ref(), &policy) {
                tracing::warn!("{}: initial read failed, control disabled: {}", controller.id(), e);
            }
        }

        let control_loop = ControlLoop::new(router, Arc::clone(&transport));
        let status = control_loop.status();
        let worker = thread::spawn(move || control_loop.run(input_rx));

        tracing::info!("Control engine started with {} controls", order.len());

        Ok(Self {
            transport,
            store,
            controls,
            order,
            by_key: Arc::new(by_key),
            status,
            input_tx,
            listener: Some(listener),
            worker: Some(worker),
        })
    }

    fn info(&self, control: &ControlId) -> Result<&ControlInfo> {
        self.controls
            .get(control)
            .ok_or_else(|| ControlError::UnknownControl(control.clone()))
    }

    /// Last projected value of a control; `Ok(None)` while unknown
    pub fn current_value(&self, control: &ControlId) -> Result<Option<PropertyValue>> {
        let info = self.info(control)?;
        Ok(self.store.get(&info.key))
    }

    /// Ask for a new value
    ///
    /// The request is clamped to the property domain and queued to the
    /// control loop; the clamped value is returned. Confirmation arrives
    /// later through [`changes`](Self::changes).
    ///
    /// `Ok` means the intent was queued, not that it was written. The checks
    /// here use the last published status; if the control is disabled by the
    /// time the loop applies the intent, the loop drops it with a warning and
    /// no write is issued. Watch [`status`](Self::status) or
    /// [`changes`](Self::changes) for the outcome.
    pub fn request_change(&self, control: &ControlId, value: impl Into<PropertyValue>) -> Result<PropertyValue> {
        let info = self.info(control)?;
        let value = value.into();

        if !self.is_enabled(control) {
            return Err(ControlError::Disabled(control.clone()));
        }
        if !info.descriptor.access.writable() {
            return Err(ControlError::ReadOnly(control.clone()));
        }
        let clamped = info
            .descriptor
            .domain
            .clamp(value)
            .map_err(|source| ControlError::Domain {
                control: control.clone(),
                source,
            })?;

        self.input_tx
            .send(Input::Intent {
                control: control.clone(),
                value,
            })
            .map_err(|_| ControlError::LoopStopped)?;
        Ok(clamped)
    }

    /// Latest published status of a control
    pub fn status(&self, control: &ControlId) -> Result<ControlStatus> {
        self.info(control)?;
        self.status
            .read()
            .get(control)
            .cloned()
            .ok_or_else(|| ControlError::UnknownControl(control.clone()))
    }

    /// Whether a control accepts commands
    pub fn is_enabled(&self, control: &ControlId) -> bool {
        self.status
            .read()
            .get(control)
            .map(|s| s.enabled)
            .unwrap_or(false)
    }

    /// Zones resolved for the logical control `control` belongs to
    pub fn binding(&self, control: &ControlId) -> Option<ZoneBinding> {
        self.controls.get(control).map(|info| info.binding)
    }

    /// The zone this control reads and writes
    pub fn zone(&self, control: &ControlId) -> Option<Zone> {
        self.controls.get(control).map(|info| info.key.zone)
    }

    /// Registered controls in configuration order
    pub fn control_ids(&self) -> &[ControlId] {
        &self.order
    }

    /// Read access to the projection
    pub fn store(&self) -> &PropertyStore {
        &self.store
    }

    /// Subscribe to value changes of every control
    ///
    /// The subscription starts with the current value of each control that
    /// has one, then yields every later change. Each call is an independent
    /// subscription; nothing is queued for a display that never subscribes.
    /// Iteration ends after [`shutdown`](Self::shutdown).
    pub fn changes(&self) -> ControlChanges {
        ControlChanges::new(self.store.iter_with_snapshot(), Arc::clone(&self.by_key))
    }

    /// Unsubscribe from the transport and stop the control loop
    ///
    /// Inputs already queued are processed first, then every
    /// [`ControlChanges`] ends. Calling this twice is a no-op.
    pub fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            self.transport.unsubscribe(listener);
        }

        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.input_tx.send(Input::Shutdown);
        if worker.join().is_err() {
            tracing::warn!("Control loop thread panicked");
        }
        self.store.close();
        tracing::info!("Control engine stopped");
    }
}

impl Drop for ControlEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ControlEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlEngine")
            .field("controls", &self.order)
            .field("running", &self.worker.is_some())
            .finish()
    }
}
