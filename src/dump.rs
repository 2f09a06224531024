//! Stream and print events from one device until Ctrl+C or a read error.
//! Run: evstream dump event3  (or a full node path).

use std::path::Path;

use crossbeam::channel::bounded;
use evdevil::event::{Abs, EventType, InputEvent};

use evstream::codes::{EV_ABS, EV_SYN};
use evstream::{CalibrationTable, Device, Error, Event};

use crate::config::Config;

fn describe(ev: &Event, calibration: Option<&CalibrationTable>, dead_zone: bool) -> String {
    if ev.event_type == EV_SYN {
        return ev.to_string();
    }
    let named = InputEvent::new(EventType::from_raw(ev.event_type), ev.code, ev.value);
    let line = format!("{}.{:06}  {:?}", ev.time_sec, ev.time_usec, named);
    match calibration {
        Some(table) if ev.event_type == EV_ABS && table.get(ev.code).is_some() => {
            format!("{}  calibrated={}", line, table.correct_event(ev, dead_zone))
        }
        _ => line,
    }
}

fn print_header(device: &Device, calibration: Option<&CalibrationTable>) {
    let info = device.info();
    println!("Device:  {}", device.path().display());
    println!("Name:    {}", info.name.as_deref().unwrap_or("unnamed"));
    if let Some(phys) = &info.phys {
        println!("Phys:    {}", phys);
    }
    println!(
        "Id:      bus {:#06x} vendor {:#06x} product {:#06x} version {:#06x}",
        info.id.bus, info.id.vendor, info.id.product, info.id.version
    );
    println!("Driver:  {}", info.driver_version_string());
    for (&code, abs) in device.abs_infos() {
        let (min, max) = calibration
            .map(|table| table.range(code))
            .unwrap_or((abs.minimum, abs.maximum));
        println!(
            "  {:?}: {}..{} (flat {}, fuzz {}, resolution {})",
            Abs::from_raw(code),
            min,
            max,
            abs.flat,
            abs.fuzz,
            abs.resolution
        );
    }
}

pub fn run(config: &Config, device: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let path = config.resolve_device(device);

    let (stop_tx, stop_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })?;

    let mut device = Device::open_with(&path, config.acquisition)?;
    if config.grab {
        device.grab(true)?;
        log::info!("Grabbed {} (other readers see no events)", path.display());
    }

    let calibration = if config.calibrate {
        match device.axis_calibration(config.dead_zone, config.flat) {
            Ok(table) => Some(table),
            Err(Error::NoAxes) => None,
            Err(e) => return Err(e.into()),
        }
    } else {
        None
    };

    print_header(&device, calibration.as_ref());
    eprintln!("\nDumping events from {} (Ctrl+C to stop):\n", path.display());
    device.start()?;

    let mut count: u64 = 0;
    let failure = loop {
        crossbeam::select! {
            recv(device.events()) -> batch => match batch {
                Ok(batch) => {
                    for ev in &batch {
                        count += 1;
                        println!("{}", describe(ev, calibration.as_ref(), config.dead_zone));
                    }
                    device.release(batch);
                }
                // The worker has exited; a read error may still be queued.
                Err(_) => break device.errors().try_recv().ok(),
            },
            recv(device.errors()) -> err => break err.ok(),
            recv(stop_rx) -> _ => {
                eprintln!("Stopped");
                break None;
            }
        }
    };

    log::debug!("Printed {} events", count);
    device.close();
    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
