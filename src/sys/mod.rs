//! Boundary with the kernel's device-control layer.
//!
//! The core never issues ioctls itself. It talks to a node through
//! [`DeviceControl`] (capability and state queries) and [`EventSource`]
//! (readiness wait + raw reads). [`linux::EvdevNode`] is the real backend.

use std::io;
use std::time::Duration;

use crate::abs_info::ABS_INFO_SIZE;

pub mod linux;

pub use linux::EvdevNode;

/// `struct input_id` as reported by `EVIOCGID`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputId {
    pub bus: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

/// Capability and state queries against an open evdev node.
pub trait DeviceControl {
    fn query_version(&self) -> io::Result<u32>;

    fn query_identity(&self) -> io::Result<InputId>;

    /// Best effort; callers treat failure as "no name".
    fn query_name(&self) -> io::Result<String>;

    /// Best effort; callers treat failure as "no phys".
    fn query_phys(&self) -> io::Result<String>;

    /// Bitmask of supported codes `0..=max_code` for `class`. Class `0`
    /// returns the supported event classes themselves.
    fn query_bitmask(&self, class: u16, max_code: u16) -> io::Result<Vec<u8>>;

    /// Raw `input_absinfo` record for one axis.
    fn query_abs_info(&self, code: u16) -> io::Result<[u8; ABS_INFO_SIZE]>;

    /// Bitmask of keys currently held down.
    fn query_key_state(&self) -> io::Result<Vec<u8>>;

    fn set_grab(&self, exclusive: bool) -> io::Result<()>;
}

/// Raw byte stream of `input_event` records.
pub trait EventSource {
    /// Wait until a read would not block. `Ok(false)` means the timeout
    /// elapsed or the wait was interrupted through [`EventSource::interrupt`].
    fn wait_readable(&self, timeout: Duration) -> io::Result<bool>;

    /// One non-blocking read. Returns `WouldBlock` when nothing is pending.
    fn read_events(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Wake a thread blocked in [`EventSource::wait_readable`].
    fn interrupt(&self);
}
