//! Acquire and normalize Linux evdev input.
//!
//! A [`Device`] wraps one `/dev/input/event*` node. Opening it reads the
//! driver identity and capability bitmasks; [`Device::start`] spawns a
//! thread that decodes `input_event` records into pooled [`Event`] batches
//! and delivers them on a bounded channel. A [`CalibrationTable`] maps raw
//! absolute-axis values onto `[-32767, 32767]`.
//!
//! ```no_run
//! use evstream::{codes, Device};
//!
//! # fn main() -> evstream::Result<()> {
//! let mut device = Device::open("/dev/input/event3")?;
//! let calibration = device.axis_calibration(true, None)?;
//! device.start()?;
//! for batch in device.events().iter().take(10) {
//!     for ev in &batch {
//!         if ev.event_type == codes::EV_ABS {
//!             println!("{} -> {}", ev.code, calibration.correct(ev.code, ev.value, true));
//!         }
//!     }
//!     device.release(batch);
//! }
//! # Ok(())
//! # }
//! ```

pub mod abs_info;
pub mod calibration;
pub mod capabilities;
pub mod codes;
pub mod device;
pub mod error;
pub mod event;
pub mod pool;
pub mod sys;

#[cfg(test)]
mod testing;

pub use abs_info::AbsInfo;
pub use calibration::{AxisCorrection, CalibrationTable, AXIS_LIMIT};
pub use capabilities::{AbsInfoMap, CapabilitySet};
pub use device::{AcquisitionSettings, Device, DeviceInfo, StopReason};
pub use error::{Error, Result};
pub use event::{decode, release, Event, EventBatch};
pub use sys::InputId;
