use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while opening, querying or reading an input device.
///
/// Open-time variants are returned synchronously from [`Device::open`].
/// [`Error::Read`] is the only variant published on a device's error
/// channel by the acquisition thread.
///
/// [`Device::open`]: crate::Device::open
#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to get driver version: {0}")]
    DriverVersion(#[source] io::Error),

    #[error("unable to get device information: {0}")]
    DeviceInformation(#[source] io::Error),

    #[error("unable to get evbits: {0}")]
    EvBits(#[source] io::Error),

    #[error("unable to get key state: {0}")]
    KeyState(#[source] io::Error),

    #[error("unable to get absinfo for axis {code:#04x}: {source}")]
    AbsInfo {
        code: u16,
        #[source]
        source: io::Error,
    },

    #[error("unable to change grab: {0}")]
    Grab(#[source] io::Error),

    #[error("the device has no axis")]
    NoAxes,

    #[error("acquisition already started")]
    AlreadyStarted,

    #[error("unable to spawn acquisition thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("read failed: {0}")]
    Read(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
