//! HVAC Panel - control engine against the vehicle emulator
//!
//! Starts the climate panel preset on an emulated cabin, then plays a short
//! script of user requests and "someone else" changes while printing every
//! push notification the display would receive.
//!
//! Run with: `HVAC_LOG_MODE=development cargo run -p hvac-sync-zone-state --example hvac_panel`

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use vehicle_api::hvac::{self, windows, zones, FanDirection};
use vehicle_api::mock::MockVehicle;
use vehicle_api::HardwareEvent;
use zone_state::logging;
use zone_state::prelude::*;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    logging::init_logging_from_env()?;

    println!("HVAC panel demo");
    println!("===============\n");

    let vehicle = MockVehicle::hvac();
    let engine = Arc::new(ControlEngine::start(Arc::new(vehicle.clone()), EngineConfig::hvac())?);

    println!("Bound controls:");
    for control in engine.control_ids() {
        let binding = engine.binding(control).unwrap_or_default();
        println!(
            "  {:<22} zone {:<5} value {}",
            control.as_str(),
            engine.zone(control).map(|z| z.to_string()).unwrap_or_default(),
            engine
                .current_value(control)?
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        );
        if let Some(secondary) = binding.secondary {
            println!("  {:<22} paired with zone {}", "", secondary);
        }
    }
    println!();

    let changes = engine.changes();
    // drop the current values, the table above already shows them
    changes.try_iter().for_each(drop);

    let display = thread::spawn(move || {
        for change in changes.timeout_iter(Duration::from_millis(300)) {
            println!("  display <- {:<22} {}", change.control.as_str(), change.value);
        }
    });

    println!("User sets driver temperature to 31.2 (clamped)");
    let written = engine.request_change(&ControlId::from("driver_temperature"), 31.2_f32)?;
    println!("  request -> {}", written);
    thread::sleep(Duration::from_millis(50));

    println!("User turns the fan to 5 and points it at the floor");
    engine.request_change(&ControlId::from("fan_speed"), 5)?;
    engine.request_change(&ControlId::from("fan_direction"), FanDirection::Floor)?;
    thread::sleep(Duration::from_millis(50));

    println!("Passenger side changed from the rear seat controls");
    vehicle.inject_event(HardwareEvent::new(hvac::TEMPERATURE_SETPOINT, zones::ROW_1_RIGHT, 20.5_f32));
    thread::sleep(Duration::from_millis(50));

    println!("Both windshields start defrosting");
    vehicle.inject_event(HardwareEvent::new(
        hvac::DEFROSTER,
        windows::FRONT_WINDSHIELD | windows::REAR_WINDSHIELD,
        true,
    ));

    display.join().map_err(|_| "display thread panicked")?;

    println!("\nFinal state:");
    for control in engine.control_ids() {
        let status = engine.status(control)?;
        println!(
            "  {:<22} {:<8} enabled={} pending={:?}",
            control.as_str(),
            engine
                .current_value(control)?
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            status.enabled,
            status.pending,
        );
    }

    Ok(())
}
