//! Open evdev device: identity, capabilities, and the acquisition thread.

pub mod acquire;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver, Sender};

pub use acquire::{AcquisitionSettings, StopReason};

use crate::abs_info::AbsInfo;
use crate::calibration::CalibrationTable;
use crate::capabilities::{AbsInfoMap, CapabilitySet};
use crate::codes::EV_ABS;
use crate::error::{Error, Result};
use crate::event::{self, EventBatch};
use crate::sys::{DeviceControl, EvdevNode, EventSource, InputId};
use acquire::Worker;

/// Identity reported by the driver at open time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub driver_version: u32,
    pub id: InputId,
    pub name: Option<String>,
    pub phys: Option<String>,
}

impl DeviceInfo {
    /// Driver version as `major.minor.patch`.
    pub fn driver_version_string(&self) -> String {
        let v = self.driver_version;
        format!("{}.{}.{}", v >> 16, (v >> 8) & 0xff, v & 0xff)
    }
}

/// An open input device.
///
/// Dropping the handle stops the acquisition thread, waits for it, and
/// closes the node.
#[derive(Debug)]
pub struct Device<N: EventSource = EvdevNode> {
    path: PathBuf,
    info: DeviceInfo,
    capabilities: CapabilitySet,
    abs_infos: AbsInfoMap,
    settings: AcquisitionSettings,
    node: Arc<N>,
    events: Receiver<EventBatch>,
    errors: Receiver<Error>,
    // Handed to the worker by `start`.
    senders: Option<(Sender<EventBatch>, Sender<Error>)>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<StopReason>>,
}

impl Device<EvdevNode> {
    /// Open `/dev/input/event*` read-only and non-blocking with default
    /// acquisition settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, AcquisitionSettings::default())
    }

    pub fn open_with(path: impl AsRef<Path>, settings: AcquisitionSettings) -> Result<Self> {
        let path = path.as_ref();
        let node = EvdevNode::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_node(path, node, settings)
    }
}

impl<N: DeviceControl + EventSource> Device<N> {
    /// Query identity and capabilities of an already opened node.
    ///
    /// Version, identity and the class bitmask are required. Name and phys
    /// are optional.
    pub fn from_node(path: impl AsRef<Path>, node: N, settings: AcquisitionSettings) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let driver_version = node.query_version().map_err(Error::DriverVersion)?;
        let id = node.query_identity().map_err(Error::DeviceInformation)?;
        let name = node
            .query_name()
            .map_err(|e| log::debug!("No name for {}: {}", path.display(), e))
            .ok();
        let phys = node
            .query_phys()
            .map_err(|e| log::debug!("No phys for {}: {}", path.display(), e))
            .ok();
        let (capabilities, abs_infos) = CapabilitySet::scan(&node)?;

        let info = DeviceInfo {
            driver_version,
            id,
            name,
            phys,
        };
        log::debug!(
            "Opened {} ({}), driver {}, bus {:#06x} vendor {:#06x} product {:#06x}, {} axes",
            path.display(),
            info.name.as_deref().unwrap_or("unnamed"),
            info.driver_version_string(),
            id.bus,
            id.vendor,
            id.product,
            abs_infos.len()
        );

        let (events_tx, events) = bounded(settings.queue_capacity);
        let (errors_tx, errors) = bounded(1);

        Ok(Self {
            path,
            info,
            capabilities,
            abs_infos,
            settings,
            node: Arc::new(node),
            events,
            errors,
            senders: Some((events_tx, errors_tx)),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        })
    }

    /// Exclusive access: while grabbed, no other reader sees the events.
    pub fn grab(&self, exclusive: bool) -> Result<()> {
        self.node.set_grab(exclusive).map_err(Error::Grab)
    }

    /// Bitmask of keys currently held down, indexed by key code.
    pub fn keys_state(&self) -> Result<Vec<u8>> {
        self.node.query_key_state().map_err(Error::KeyState)
    }

    /// Current value and range of one axis, fetched from the driver.
    pub fn abs_state(&self, code: u16) -> Result<AbsInfo> {
        self.node
            .query_abs_info(code)
            .map(|raw| AbsInfo::unpack(&raw))
            .map_err(|source| Error::AbsInfo { code, source })
    }

    /// Calibration for every ranged axis discovered at open time.
    pub fn axis_calibration(
        &self,
        use_dead_zone: bool,
        override_flat: Option<i32>,
    ) -> Result<CalibrationTable> {
        if !self.capabilities.has_class(EV_ABS) {
            return Err(Error::NoAxes);
        }
        Ok(CalibrationTable::build(&self.abs_infos, use_dead_zone, override_flat))
    }
}

impl<N: EventSource> Device<N> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn abs_infos(&self) -> &AbsInfoMap {
        &self.abs_infos
    }

    pub fn settings(&self) -> &AcquisitionSettings {
        &self.settings
    }

    /// Decoded batches, in read order.
    pub fn events(&self) -> &Receiver<EventBatch> {
        &self.events
    }

    /// At most one fatal [`Error::Read`]; the thread has stopped once it arrives.
    pub fn errors(&self) -> &Receiver<Error> {
        &self.errors
    }

    /// Hand a consumed batch back for reuse.
    pub fn release(&self, batch: EventBatch) {
        event::release(batch);
    }

    pub fn is_started(&self) -> bool {
        self.worker.is_some()
    }

    fn label(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Spawn the acquisition thread. Can be called once per handle.
    pub fn start(&mut self) -> Result<()>
    where
        N: Send + Sync + 'static,
    {
        let name = format!("evstream-{}", self.label());
        self.launch(|worker| thread::Builder::new().name(name).spawn(move || worker.run()))
    }

    /// The senders stay with the device until `spawn` succeeds, so a failed
    /// spawn can be retried.
    fn launch<F>(&mut self, spawn: F) -> Result<()>
    where
        F: FnOnce(Worker<N>) -> io::Result<JoinHandle<StopReason>>,
    {
        let (events, errors) = self.senders.as_ref().ok_or(Error::AlreadyStarted)?;
        let worker = Worker {
            label: self.label(),
            events: events.clone(),
            errors: errors.clone(),
            stop: Arc::clone(&self.stop),
            settings: self.settings,
            source: Arc::clone(&self.node),
        };
        let handle = spawn(worker).map_err(Error::Spawn)?;
        self.senders = None;
        self.worker = Some(handle);
        Ok(())
    }

    /// Stop acquisition and close the node.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.node.interrupt();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("[{}] acquisition thread panicked", self.label());
            }
        }
        // Anything still queued goes back to the pool.
        for batch in self.events.try_iter() {
            event::release(batch);
        }
    }
}

impl<N: EventSource> Drop for Device<N> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
