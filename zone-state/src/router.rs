//! Hardware event demultiplexing
//!
//! The router owns every registered controller and fans incoming events out
//! by property id and zone overlap. One event whose mask covers several
//! bound zones (both windshields, say) reaches each of their controllers
//! exactly once.

use std::collections::HashMap;

use vehicle_api::{HardwareErrorEvent, PropertyId, PropertyValue, ValueKind, Zone, ZoneMask};

use crate::controller::PropertyController;
use crate::error::{ControlError, Result};
use crate::model::ControlId;

/// What happened to a dispatched event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Delivered to this many controllers
    Routed(usize),
    /// The property is known but none of its bound zones is in the event mask
    NoOverlap,
    /// No controller drives this property
    UnknownProperty,
    /// The value kind does not match the property
    KindMismatch { expected: ValueKind, actual: ValueKind },
}

/// Registry of controllers keyed by property id
#[derive(Debug, Default)]
pub struct EventRouter {
    controllers: Vec<PropertyController>,
    by_property: HashMap<PropertyId, Vec<usize>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a controller
    ///
    /// Fails when the control id is taken or another controller already
    /// drives the same property in the same zone.
    pub fn register(&mut self, controller: PropertyController) -> Result<()> {
        if self.get(controller.id()).is_some() {
            return Err(ControlError::DuplicateControl(controller.id().clone()));
        }
        if let Some(existing) = self.bound_to(controller.property(), controller.zone()) {
            return Err(ControlError::ZoneAlreadyBound {
                property: controller.property(),
                zone: controller.zone(),
                existing: existing.id().clone(),
            });
        }

        tracing::debug!(
            "Registered control {} for property {} zone {}",
            controller.id(),
            controller.property(),
            controller.zone()
        );
        let index = self.controllers.len();
        self.by_property
            .entry(controller.property())
            .or_default()
            .push(index);
        self.controllers.push(controller);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn get(&self, id: &ControlId) -> Option<&PropertyController> {
        self.controllers.iter().find(|c| c.id() == id)
    }

    pub fn get_mut(&mut self, id: &ControlId) -> Option<&mut PropertyController> {
        self.controllers.iter_mut().find(|c| c.id() == id)
    }

    /// Controller driving `property` in `zone`
    pub fn bound_to(&self, property: PropertyId, zone: Zone) -> Option<&PropertyController> {
        self.by_property
            .get(&property)?
            .iter()
            .map(|&i| &self.controllers[i])
            .find(|c| c.zone() == zone)
    }

    pub fn controllers(&self) -> impl Iterator<Item = &PropertyController> {
        self.controllers.iter()
    }

    pub fn controllers_mut(&mut self) -> impl Iterator<Item = &mut PropertyController> {
        self.controllers.iter_mut()
    }

    /// Route a hardware value to every controller whose zone is in `zones`
    pub fn dispatch(&mut self, property: PropertyId, zones: ZoneMask, value: PropertyValue) -> DispatchOutcome {
        let Some(indices) = self.by_property.get(&property) else {
            tracing::debug!("Dropping event for unhandled property {}", property);
            return DispatchOutcome::UnknownProperty;
        };

        // every controller of one property shares its descriptor
        let expected = self.controllers[indices[0]].descriptor().kind();
        if value.kind() != expected {
            tracing::warn!(
                "Contract violation: property {} reported a {} value, expected {}; event dropped",
                property,
                value.kind(),
                expected
            );
            return DispatchOutcome::KindMismatch {
                expected,
                actual: value.kind(),
            };
        }

        let mut routed = 0;
        for &index in indices {
            let controller = &mut self.controllers[index];
            if zones.contains(controller.zone()) {
                controller.on_hardware_event(value);
                routed += 1;
            }
        }

        if routed == 0 {
            tracing::debug!("Event for property {} zones {} matches no bound zone", property, zones);
            DispatchOutcome::NoOverlap
        } else {
            DispatchOutcome::Routed(routed)
        }
    }

    /// Record a hardware error on every controller it concerns
    ///
    /// Returns the ids of the affected controls.
    pub fn dispatch_error(&mut self, error: &HardwareErrorEvent) -> Vec<ControlId> {
        let Some(indices) = self.by_property.get(&error.property) else {
            tracing::debug!("Dropping error {} for unhandled property {}", error.code, error.property);
            return Vec::new();
        };

        let mut affected = Vec::new();
        for &index in indices {
            let controller = &mut self.controllers[index];
            if error.applies_to(controller.zone()) {
                controller.on_hardware_error(error.code);
                affected.push(controller.id().clone());
            }
        }

        if !affected.is_empty() {
            tracing::warn!(
                "Hardware error {} for property {} zones {} on controls {:?}",
                error.code,
                error.property,
                error.zones,
                affected
            );
        }
        affected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyStore;
    use vehicle_api::hvac::{self, windows, zones};
    use vehicle_api::{PropertyDescriptor, ValueDomain};

    fn descriptor(id: PropertyId) -> PropertyDescriptor {
        hvac::cabin_descriptors()
            .into_iter()
            .find(|d| d.id == id)
            .unwrap()
    }

    fn controller(store: &PropertyStore, id: &str, property: PropertyId, zone: Zone) -> PropertyController {
        PropertyController::new(ControlId::from(id), descriptor(property), zone, store.clone())
    }

    fn cabin_router(store: &PropertyStore) -> EventRouter {
        let mut router = EventRouter::new();
        router
            .register(controller(store, "driver_temperature", hvac::TEMPERATURE_SETPOINT, zones::ROW_1_LEFT))
            .unwrap();
        router
            .register(controller(store, "passenger_temperature", hvac::TEMPERATURE_SETPOINT, zones::ROW_1_RIGHT))
            .unwrap();
        router
            .register(controller(store, "front_defrost", hvac::DEFROSTER, windows::FRONT_WINDSHIELD))
            .unwrap();
        router
            .register(controller(store, "rear_defrost", hvac::DEFROSTER, windows::REAR_WINDSHIELD))
            .unwrap();
        router
    }

    #[test]
    fn test_dispatch_to_single_zone() {
        let store = PropertyStore::new();
        let mut router = cabin_router(&store);

        let outcome = router.dispatch(hvac::TEMPERATURE_SETPOINT, zones::ROW_1_LEFT.into(), PropertyValue::Float(23.5));

        assert_eq!(outcome, DispatchOutcome::Routed(1));
        let driver = router.get(&ControlId::from("driver_temperature")).unwrap();
        let passenger = router.get(&ControlId::from("passenger_temperature")).unwrap();
        assert_eq!(driver.current_value(), Some(PropertyValue::Float(23.5)));
        assert_eq!(passenger.current_value(), None);
    }

    #[test]
    fn test_dispatch_fans_out_to_overlapping_zones() {
        let store = PropertyStore::new();
        let mut router = cabin_router(&store);

        let outcome = router.dispatch(
            hvac::DEFROSTER,
            windows::FRONT_WINDSHIELD | windows::REAR_WINDSHIELD,
            PropertyValue::Bool(true),
        );

        assert_eq!(outcome, DispatchOutcome::Routed(2));
        for id in ["front_defrost", "rear_defrost"] {
            let control = router.get(&ControlId::from(id)).unwrap();
            assert_eq!(control.current_value(), Some(PropertyValue::Bool(true)));
        }
    }

    #[test]
    fn test_dispatch_unknown_property() {
        let store = PropertyStore::new();
        let mut router = cabin_router(&store);

        let outcome = router.dispatch(hvac::FAN_SPEED, zones::ROW_1_ALL.into(), PropertyValue::Int(3));

        assert_eq!(outcome, DispatchOutcome::UnknownProperty);
        assert!(store.is_empty());
    }

    #[test]
    fn test_dispatch_kind_mismatch_is_dropped() {
        let store = PropertyStore::new();
        let mut router = cabin_router(&store);

        let outcome = router.dispatch(hvac::DEFROSTER, windows::FRONT_WINDSHIELD.into(), PropertyValue::Int(1));

        assert_eq!(
            outcome,
            DispatchOutcome::KindMismatch {
                expected: ValueKind::Boolean,
                actual: ValueKind::Int,
            }
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_dispatch_without_overlap() {
        let store = PropertyStore::new();
        let mut router = cabin_router(&store);

        let outcome = router.dispatch(hvac::DEFROSTER, windows::ROOF_TOP.into(), PropertyValue::Bool(true));

        assert_eq!(outcome, DispatchOutcome::NoOverlap);
        assert!(store.is_empty());
    }

    #[test]
    fn test_register_rejects_duplicate_id() {
        let store = PropertyStore::new();
        let mut router = cabin_router(&store);

        let err = router
            .register(controller(&store, "driver_temperature", hvac::FAN_SPEED, zones::ROW_1_ALL))
            .unwrap_err();

        assert!(matches!(err, ControlError::DuplicateControl(_)));
        assert_eq!(router.len(), 4);
    }

    #[test]
    fn test_register_rejects_bound_zone() {
        let store = PropertyStore::new();
        let mut router = cabin_router(&store);

        let err = router
            .register(controller(&store, "left_again", hvac::TEMPERATURE_SETPOINT, zones::ROW_1_LEFT))
            .unwrap_err();

        match err {
            ControlError::ZoneAlreadyBound { existing, zone, .. } => {
                assert_eq!(existing.as_str(), "driver_temperature");
                assert_eq!(zone, zones::ROW_1_LEFT);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_same_zone_bit_on_different_properties() {
        let store = PropertyStore::new();
        let mut router = EventRouter::new();
        let ac = PropertyController::new(
            ControlId::from("ac"),
            PropertyDescriptor::new(hvac::AC_ON, zones::ROW_1_ALL.into(), ValueDomain::Boolean),
            zones::ROW_1_ALL,
            store.clone(),
        );
        router.register(ac).unwrap();
        router
            .register(controller(&store, "fan_speed", hvac::FAN_SPEED, zones::ROW_1_ALL))
            .unwrap();

        assert_eq!(
            router.dispatch(hvac::AC_ON, zones::ROW_1_ALL.into(), PropertyValue::Bool(true)),
            DispatchOutcome::Routed(1)
        );
    }

    #[test]
    fn test_dispatch_error_scoped_to_zone() {
        let store = PropertyStore::new();
        let mut router = cabin_router(&store);

        let affected = router.dispatch_error(&HardwareErrorEvent::new(hvac::DEFROSTER, windows::REAR_WINDSHIELD, 3));

        assert_eq!(affected, vec![ControlId::from("rear_defrost")]);
        assert_eq!(router.get(&ControlId::from("rear_defrost")).unwrap().last_error(), Some(3));
        assert_eq!(router.get(&ControlId::from("front_defrost")).unwrap().last_error(), None);
    }

    #[test]
    fn test_dispatch_error_empty_mask_hits_all_zones() {
        let store = PropertyStore::new();
        let mut router = cabin_router(&store);

        let affected = router.dispatch_error(&HardwareErrorEvent::new(hvac::TEMPERATURE_SETPOINT, ZoneMask::EMPTY, 9));

        assert_eq!(affected.len(), 2);
    }

    #[test]
    fn test_dispatch_error_unknown_property() {
        let store = PropertyStore::new();
        let mut router = cabin_router(&store);

        assert!(router
            .dispatch_error(&HardwareErrorEvent::new(hvac::FAN_SPEED, ZoneMask::EMPTY, 1))
            .is_empty());
    }
}
