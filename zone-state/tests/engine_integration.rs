//! Threaded integration tests of the control engine against the vehicle emulator

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rstest::rstest;
use vehicle_api::hvac::{self, windows, zones};
use vehicle_api::mock::{ConfirmMode, MockVehicle};
use vehicle_api::{
    HardwareErrorEvent, HardwareEvent, PropertyAccess, PropertyDescriptor, PropertyValue, TransportError,
    ValueDomain, ZoneMask,
};
use zone_state::{ControlEngine, ControlError, ControlId, EngineConfig};

// ============================================================================
// Test Helpers
// ============================================================================

const WAIT: Duration = Duration::from_secs(2);

fn config() -> EngineConfig {
    EngineConfig::hvac()
        .with_read_timeout(Duration::from_millis(300))
        .with_read_retries(3, Duration::from_millis(5))
}

fn start(vehicle: &MockVehicle) -> ControlEngine {
    ControlEngine::start(Arc::new(vehicle.clone()), config()).expect("engine should start")
}

fn id(name: &str) -> ControlId {
    ControlId::from(name)
}

/// Poll `condition` until it holds or `WAIT` passes
fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn wait_for_value(engine: &ControlEngine, control: &str, expected: PropertyValue) {
    let control = id(control);
    assert!(
        wait_until(|| engine.current_value(&control).ok().flatten() == Some(expected)),
        "{} never became {}, last {:?}",
        control,
        expected,
        engine.current_value(&control)
    );
}

fn descriptor(property: vehicle_api::PropertyId) -> PropertyDescriptor {
    hvac::cabin_descriptors()
        .into_iter()
        .find(|d| d.id == property)
        .unwrap()
}

// ============================================================================
// Setup
// ============================================================================

#[test]
fn test_initial_values_are_projected() {
    let vehicle = MockVehicle::hvac();
    vehicle.set_value(hvac::TEMPERATURE_SETPOINT, zones::ROW_1_RIGHT, PropertyValue::Float(19.5));
    vehicle.set_value(hvac::FAN_SPEED, zones::ROW_1_ALL, PropertyValue::Int(4));

    let engine = start(&vehicle);

    assert_eq!(engine.current_value(&id("driver_temperature")).unwrap(), Some(PropertyValue::Float(23.0)));
    assert_eq!(engine.current_value(&id("passenger_temperature")).unwrap(), Some(PropertyValue::Float(19.5)));
    assert_eq!(engine.current_value(&id("fan_speed")).unwrap(), Some(PropertyValue::Int(4)));
    assert_eq!(engine.current_value(&id("rear_defrost")).unwrap(), Some(PropertyValue::Bool(false)));
    for control in engine.control_ids() {
        assert!(engine.is_enabled(control), "{} should be enabled", control);
    }
}

#[test]
fn test_failed_initial_read_disables_only_that_control() {
    let vehicle = MockVehicle::hvac();
    // fan speed is read first
    vehicle.fail_next_reads(1, TransportError::Disconnected);

    let engine = start(&vehicle);

    assert!(!engine.is_enabled(&id("fan_speed")));
    assert_eq!(engine.current_value(&id("fan_speed")).unwrap(), None);
    assert!(matches!(
        engine.request_change(&id("fan_speed"), 3),
        Err(ControlError::Disabled(_))
    ));

    assert!(engine.is_enabled(&id("fan_direction")));
    assert!(engine.request_change(&id("driver_temperature"), 21.0f32).is_ok());
}

#[test]
fn test_not_ready_reads_are_retried() {
    let vehicle = MockVehicle::hvac();
    vehicle.fail_next_reads(3, TransportError::NotReady);

    let engine = start(&vehicle);

    assert!(engine.is_enabled(&id("fan_speed")));
    assert_eq!(engine.current_value(&id("fan_speed")).unwrap(), Some(PropertyValue::Int(1)));
}

#[test]
fn test_slow_hardware_times_out_into_disabled() {
    let vehicle = MockVehicle::hvac();
    vehicle.set_read_latency(Duration::from_millis(500));
    let config = config().with_read_timeout(Duration::from_millis(20));

    let started = Instant::now();
    let engine = ControlEngine::start(Arc::new(vehicle), config).unwrap();

    // bounded by the read timeout per control, never by the hardware latency
    assert!(started.elapsed() < Duration::from_millis(400));
    assert!(!engine.is_enabled(&id("driver_temperature")));
}

#[test]
fn test_disabled_control_recovers_on_hardware_event() {
    let vehicle = MockVehicle::hvac();
    vehicle.fail_next_reads(1, TransportError::Disconnected);
    let engine = start(&vehicle);
    assert!(!engine.is_enabled(&id("fan_speed")));

    vehicle.inject_event(HardwareEvent::new(hvac::FAN_SPEED, zones::ROW_1_ALL, 2));

    assert!(wait_until(|| engine.is_enabled(&id("fan_speed"))));
    assert_eq!(engine.current_value(&id("fan_speed")).unwrap(), Some(PropertyValue::Int(2)));
}

#[test]
fn test_events_during_setup_are_kept() {
    let vehicle = MockVehicle::hvac();
    vehicle.set_read_latency(Duration::from_millis(10));

    let injector = {
        let vehicle = vehicle.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(15));
            vehicle.inject_event(HardwareEvent::new(hvac::AC_ON, zones::ROW_1_ALL, true));
        })
    };
    let engine = start(&vehicle);
    injector.join().unwrap();

    wait_for_value(&engine, "ac", PropertyValue::Bool(true));
}

#[test]
fn test_unsupported_property_controls_are_absent() {
    let descriptors = hvac::cabin_descriptors()
        .into_iter()
        .filter(|d| d.id != hvac::DEFROSTER)
        .collect();
    let vehicle = MockVehicle::new(descriptors);

    let engine = start(&vehicle);

    assert!(matches!(
        engine.current_value(&id("front_defrost")),
        Err(ControlError::UnknownControl(_))
    ));
    assert_eq!(engine.control_ids().len(), 5);
}

#[test]
fn test_single_zone_temperature_has_no_passenger_control() {
    let mut descriptors = hvac::cabin_descriptors();
    for d in descriptors.iter_mut() {
        if d.id == hvac::TEMPERATURE_SETPOINT {
            d.zones = ZoneMask::from(zones::ROW_1_LEFT);
        }
    }
    let vehicle = MockVehicle::new(descriptors);

    let engine = start(&vehicle);

    let binding = engine.binding(&id("driver_temperature")).unwrap();
    assert_eq!(binding.primary, Some(zones::ROW_1_LEFT));
    assert_eq!(binding.secondary, None);
    assert!(engine.current_value(&id("passenger_temperature")).is_err());
}

#[rstest]
#[case::front_only(ZoneMask::from(windows::FRONT_WINDSHIELD), true, false)]
#[case::rear_only(ZoneMask::from(windows::REAR_WINDSHIELD), false, true)]
#[case::both(windows::FRONT_WINDSHIELD | windows::REAR_WINDSHIELD, true, true)]
fn test_defrost_controls_follow_windows(#[case] mask: ZoneMask, #[case] front: bool, #[case] rear: bool) {
    let mut descriptors = hvac::cabin_descriptors();
    for d in descriptors.iter_mut() {
        if d.id == hvac::DEFROSTER {
            d.zones = mask;
        }
    }
    let vehicle = MockVehicle::new(descriptors);

    let engine = start(&vehicle);

    assert_eq!(engine.binding(&id("front_defrost")).is_some(), front);
    assert_eq!(engine.binding(&id("rear_defrost")).is_some(), rear);
}

#[test]
fn test_start_from_json_config() {
    let json = r#"{
        "read_timeout_ms": 200,
        "controls": [
            { "property": 1280, "primary": { "id": "fan", "prefer": [8] } }
        ]
    }"#;
    let config = EngineConfig::from_json_str(json).unwrap();
    let vehicle = MockVehicle::hvac();

    let engine = ControlEngine::start(Arc::new(vehicle), config).unwrap();

    assert_eq!(engine.control_ids(), &[id("fan")]);
    assert_eq!(engine.zone(&id("fan")), Some(zones::ROW_1_ALL));
}

// ============================================================================
// Command and event paths
// ============================================================================

#[test]
fn test_temperature_scenario() {
    let vehicle = MockVehicle::hvac();
    vehicle.set_confirm_mode(ConfirmMode::Silent);
    let engine = start(&vehicle);
    let driver = id("driver_temperature");

    let binding = engine.binding(&driver).unwrap();
    assert_eq!(binding.primary, Some(zones::ROW_1_LEFT));
    assert_eq!(binding.secondary, Some(zones::ROW_1_RIGHT));

    assert_eq!(engine.request_change(&driver, 24.0f32).unwrap(), PropertyValue::Float(24.0));
    wait_for_value(&engine, "driver_temperature", PropertyValue::Float(24.0));

    let writes = vehicle.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].property, hvac::TEMPERATURE_SETPOINT);
    assert_eq!(writes[0].zone, zones::ROW_1_LEFT);
    assert_eq!(writes[0].value, PropertyValue::Float(24.0));
    assert!(wait_until(|| engine.status(&driver).unwrap().pending == Some(PropertyValue::Float(24.0))));

    vehicle.inject_event(HardwareEvent::new(hvac::TEMPERATURE_SETPOINT, zones::ROW_1_LEFT, 23.5f32));

    wait_for_value(&engine, "driver_temperature", PropertyValue::Float(23.5));
    assert!(wait_until(|| engine.status(&driver).unwrap().pending.is_none()));
    assert_eq!(
        engine.current_value(&id("passenger_temperature")).unwrap(),
        Some(PropertyValue::Float(23.0))
    );
}

#[test]
fn test_out_of_domain_request_is_clamped_and_confirmed() {
    let vehicle = MockVehicle::hvac();
    let engine = start(&vehicle);
    let passenger = id("passenger_temperature");

    assert_eq!(engine.request_change(&passenger, 35.0f32).unwrap(), PropertyValue::Float(30.0));

    wait_for_value(&engine, "passenger_temperature", PropertyValue::Float(30.0));
    assert!(wait_until(|| engine.status(&passenger).unwrap().pending.is_none()));
    assert_eq!(
        vehicle.value(hvac::TEMPERATURE_SETPOINT, zones::ROW_1_RIGHT),
        Some(PropertyValue::Float(30.0))
    );
}

#[test]
fn test_lost_write_leaves_optimistic_value() {
    let vehicle = MockVehicle::hvac();
    vehicle.set_confirm_mode(ConfirmMode::Silent);
    let engine = start(&vehicle);

    engine.request_change(&id("ac"), true).unwrap();
    wait_for_value(&engine, "ac", PropertyValue::Bool(true));

    thread::sleep(Duration::from_millis(50));
    assert_eq!(engine.current_value(&id("ac")).unwrap(), Some(PropertyValue::Bool(true)));
    assert_eq!(engine.status(&id("ac")).unwrap().pending, Some(PropertyValue::Bool(true)));
    assert_eq!(vehicle.value(hvac::AC_ON, zones::ROW_1_ALL), Some(PropertyValue::Bool(false)));
}

#[test]
fn test_external_change_is_projected() {
    let vehicle = MockVehicle::hvac();
    let engine = start(&vehicle);

    vehicle.inject_event(HardwareEvent::new(hvac::FAN_DIRECTION, zones::ROW_1_ALL, hvac::FanDirection::Defrost));

    wait_for_value(&engine, "fan_direction", hvac::FanDirection::Defrost.into());
}

#[test]
fn test_windshield_event_fans_out() {
    let vehicle = MockVehicle::hvac();
    let engine = start(&vehicle);

    vehicle.inject_event(HardwareEvent::new(
        hvac::DEFROSTER,
        windows::FRONT_WINDSHIELD | windows::REAR_WINDSHIELD,
        true,
    ));

    wait_for_value(&engine, "front_defrost", PropertyValue::Bool(true));
    wait_for_value(&engine, "rear_defrost", PropertyValue::Bool(true));
}

#[test]
fn test_kind_mismatch_event_is_dropped() {
    let vehicle = MockVehicle::hvac();
    let engine = start(&vehicle);

    vehicle.inject_event(HardwareEvent::new(hvac::AC_ON, zones::ROW_1_ALL, 1));
    vehicle.inject_event(HardwareEvent::new(hvac::FAN_SPEED, zones::ROW_1_ALL, 6));

    // events are applied in order, so once the fan moved the A/C event is done
    wait_for_value(&engine, "fan_speed", PropertyValue::Int(6));
    assert_eq!(engine.current_value(&id("ac")).unwrap(), Some(PropertyValue::Bool(false)));
}

#[test]
fn test_hardware_error_is_reported_per_zone() {
    let vehicle = MockVehicle::hvac();
    let engine = start(&vehicle);

    vehicle.inject_error(HardwareErrorEvent::new(hvac::DEFROSTER, windows::REAR_WINDSHIELD, 4));

    assert!(wait_until(|| engine.status(&id("rear_defrost")).unwrap().last_error == Some(4)));
    assert_eq!(engine.status(&id("front_defrost")).unwrap().last_error, None);
    assert!(engine.is_enabled(&id("rear_defrost")));
}

#[test]
fn test_wrong_kind_request_is_refused() {
    let vehicle = MockVehicle::hvac();
    let engine = start(&vehicle);

    assert!(matches!(
        engine.request_change(&id("ac"), 2.5f32),
        Err(ControlError::Domain { .. })
    ));
    thread::sleep(Duration::from_millis(20));
    assert!(vehicle.writes().is_empty());
}

#[test]
fn test_read_only_property_refuses_requests() {
    let descriptors = vec![descriptor(hvac::FAN_SPEED).with_access(PropertyAccess::Read)];
    let vehicle = MockVehicle::new(descriptors);

    let engine = start(&vehicle);

    assert!(engine.is_enabled(&id("fan_speed")));
    assert!(matches!(
        engine.request_change(&id("fan_speed"), 3),
        Err(ControlError::ReadOnly(_))
    ));
}

#[test]
fn test_write_only_property_starts_unknown() {
    let descriptors = vec![PropertyDescriptor::new(
        hvac::AC_ON,
        ZoneMask::from(zones::ROW_1_ALL),
        ValueDomain::Boolean,
    )
    .with_access(PropertyAccess::Write)];
    let vehicle = MockVehicle::new(descriptors);

    let engine = start(&vehicle);

    assert_eq!(vehicle.read_count(), 0);
    assert_eq!(engine.current_value(&id("ac")).unwrap(), None);
    assert!(engine.is_enabled(&id("ac")));
}

// ============================================================================
// Notifications and concurrency
// ============================================================================

#[test]
fn test_changes_push_updates() {
    let vehicle = MockVehicle::hvac();
    let engine = start(&vehicle);
    let changes = engine.changes();

    // current value of every control first
    let initial = changes.try_iter().count();
    assert_eq!(initial, engine.control_ids().len());

    engine.request_change(&id("driver_temperature"), 22.0f32).unwrap();

    let change = changes.recv_timeout(WAIT).expect("change notification");
    assert_eq!(change.control, id("driver_temperature"));
    assert_eq!(change.value, PropertyValue::Float(22.0));

    // the echo carries the same value, so nothing more is pushed
    assert!(changes.recv_timeout(Duration::from_millis(50)).is_none());
}

#[test]
fn test_changes_start_from_current_values() {
    let vehicle = MockVehicle::hvac();
    let engine = start(&vehicle);
    engine.request_change(&id("fan_speed"), 4).unwrap();
    wait_for_value(&engine, "fan_speed", PropertyValue::Int(4));

    let changes = engine.changes();
    let snapshot: Vec<_> = changes.try_iter().collect();

    assert_eq!(snapshot.len(), engine.control_ids().len());
    assert!(snapshot
        .iter()
        .any(|c| c.control == id("fan_speed") && c.value == PropertyValue::Int(4)));
}

#[test]
fn test_unconsumed_changes_are_not_kept() {
    let vehicle = MockVehicle::hvac();
    let engine = start(&vehicle);
    drop(engine.changes());

    for n in 0..2000 {
        vehicle.inject_event(HardwareEvent::new(hvac::FAN_SPEED, zones::ROW_1_ALL, n % 7 + 1));
    }
    vehicle.inject_event(HardwareEvent::new(hvac::FAN_SPEED, zones::ROW_1_ALL, 6));
    wait_for_value(&engine, "fan_speed", PropertyValue::Int(6));

    assert!(wait_until(|| engine.store().subscriber_count() == 0));

    // a late subscriber sees the current state, not the history
    let changes = engine.changes();
    assert_eq!(changes.try_iter().count(), engine.control_ids().len());
}

#[test]
fn test_changes_end_after_shutdown() {
    let vehicle = MockVehicle::hvac();
    let mut engine = start(&vehicle);
    let changes = engine.changes();
    changes.try_iter().for_each(drop);

    let (done_tx, done_rx) = std::sync::mpsc::channel();
    thread::spawn(move || {
        let _ = done_tx.send(changes.recv());
    });
    engine.shutdown();

    assert_eq!(done_rx.recv_timeout(WAIT), Ok(None));
    assert!(engine.changes().recv().is_none());
}

#[test]
fn test_concurrent_requests_settle_on_hardware_state() {
    let vehicle = MockVehicle::hvac();
    let engine = Arc::new(start(&vehicle));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for step in 0..10 {
                    let speed = (t * 10 + step) % 9;
                    let _ = engine.request_change(&id("fan_speed"), speed);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let fan = id("fan_speed");
    assert!(wait_until(|| vehicle.writes().len() == 40));
    assert!(wait_until(|| {
        engine.status(&fan).unwrap().pending.is_none()
            && engine.current_value(&fan).unwrap() == vehicle.value(hvac::FAN_SPEED, zones::ROW_1_ALL)
    }));
    assert!(vehicle.writes().iter().all(|w| matches!(w.value, PropertyValue::Int(1..=7))));
}

#[test]
fn test_shutdown_stops_processing() {
    let vehicle = MockVehicle::hvac();
    let mut engine = start(&vehicle);

    engine.shutdown();
    vehicle.inject_event(HardwareEvent::new(hvac::FAN_SPEED, zones::ROW_1_ALL, 5));

    assert_eq!(vehicle.listener_count(), 0);
    assert_eq!(engine.current_value(&id("fan_speed")).unwrap(), Some(PropertyValue::Int(1)));
}
