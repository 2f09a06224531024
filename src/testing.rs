//! In-memory device node for unit tests.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::abs_info::{AbsInfo, ABS_INFO_SIZE};
use crate::codes::{
    bitmask_len, ABS_HAT0X, ABS_HAT0Y, ABS_MAX, ABS_X, ABS_Y, ABS_Z, BTN_EAST, BTN_SOUTH, EV_ABS,
    EV_KEY, EV_MAX, EV_SYN, KEY_MAX,
};
use crate::event::Event;
use crate::sys::{DeviceControl, EventSource, InputId};

/// One scripted outcome of `read_events`.
#[derive(Debug)]
pub enum Step {
    Data(Vec<u8>),
    WouldBlock,
    Fail(io::ErrorKind),
}

#[derive(Debug, Default)]
pub struct FakeNode {
    pub version: Option<u32>,
    pub identity: Option<InputId>,
    pub name: Option<String>,
    pub phys: Option<String>,
    /// Missing classes make `query_bitmask` fail.
    pub bitmasks: HashMap<u16, Vec<u8>>,
    /// Missing axes make `query_abs_info` fail.
    pub abs_infos: HashMap<u16, AbsInfo>,
    pub key_state: Option<Vec<u8>>,
    pub grab: Mutex<Option<bool>>,
    steps: Mutex<VecDeque<Step>>,
    abs_queries: Mutex<Vec<u16>>,
    interrupts: AtomicUsize,
}

pub fn mask(max_code: u16, codes: &[u16]) -> Vec<u8> {
    let mut bits = vec![0u8; bitmask_len(max_code)];
    for &code in codes {
        bits[code as usize / 8] |= 1 << (code % 8);
    }
    bits
}

pub fn encode_all(events: &[Event]) -> Vec<u8> {
    let mut raw = Vec::new();
    for ev in events {
        ev.encode(&mut raw);
    }
    raw
}

impl FakeNode {
    /// Two buttons, X/Y with ranges, a hat, and a Z axis whose absinfo query fails.
    pub fn joystick() -> Self {
        let mut bitmasks = HashMap::new();
        bitmasks.insert(0, mask(EV_MAX, &[EV_SYN, EV_KEY, EV_ABS]));
        bitmasks.insert(EV_KEY, mask(KEY_MAX, &[BTN_SOUTH, BTN_EAST]));
        bitmasks.insert(
            EV_ABS,
            mask(ABS_MAX, &[ABS_X, ABS_Y, ABS_Z, ABS_HAT0X, ABS_HAT0Y]),
        );

        let mut abs_infos = HashMap::new();
        abs_infos.insert(ABS_X, AbsInfo::new(0, 255).with_flat(15));
        abs_infos.insert(ABS_Y, AbsInfo::new(0, 255));
        abs_infos.insert(ABS_HAT0X, AbsInfo::new(-1, 1));
        abs_infos.insert(ABS_HAT0Y, AbsInfo::new(-1, 1));

        Self {
            version: Some(0x0001_0001),
            identity: Some(InputId {
                bus: 0x03,
                vendor: 0x045e,
                product: 0x028e,
                version: 0x0114,
            }),
            name: Some("Fake Pad".into()),
            phys: Some("usb-0000:00:14.0-1/input0".into()),
            bitmasks,
            abs_infos,
            key_state: Some(mask(KEY_MAX, &[BTN_SOUTH])),
            ..Self::default()
        }
    }

    /// Keys only, no absolute axes.
    pub fn keyboard() -> Self {
        let mut node = Self::joystick();
        node.bitmasks.insert(0, mask(EV_MAX, &[EV_SYN, EV_KEY]));
        node.bitmasks.remove(&EV_ABS);
        node.abs_infos.clear();
        node
    }

    pub fn push(&self, step: Step) {
        self.steps.lock().unwrap().push_back(step);
    }

    pub fn abs_queries(&self) -> Vec<u16> {
        self.abs_queries.lock().unwrap().clone()
    }

    pub fn interrupts(&self) -> usize {
        self.interrupts.load(Ordering::SeqCst)
    }
}

fn unsupported() -> io::Error {
    io::Error::from_raw_os_error(libc::ENOTTY)
}

impl DeviceControl for FakeNode {
    fn query_version(&self) -> io::Result<u32> {
        self.version.ok_or_else(unsupported)
    }

    fn query_identity(&self) -> io::Result<InputId> {
        self.identity.ok_or_else(unsupported)
    }

    fn query_name(&self) -> io::Result<String> {
        self.name.clone().ok_or_else(unsupported)
    }

    fn query_phys(&self) -> io::Result<String> {
        self.phys.clone().ok_or_else(unsupported)
    }

    fn query_bitmask(&self, class: u16, _max_code: u16) -> io::Result<Vec<u8>> {
        self.bitmasks.get(&class).cloned().ok_or_else(unsupported)
    }

    fn query_abs_info(&self, code: u16) -> io::Result<[u8; ABS_INFO_SIZE]> {
        self.abs_queries.lock().unwrap().push(code);
        self.abs_infos
            .get(&code)
            .map(AbsInfo::pack)
            .ok_or_else(unsupported)
    }

    fn query_key_state(&self) -> io::Result<Vec<u8>> {
        self.key_state.clone().ok_or_else(unsupported)
    }

    fn set_grab(&self, exclusive: bool) -> io::Result<()> {
        let mut grab = self.grab.lock().unwrap();
        if exclusive && *grab == Some(true) {
            return Err(io::Error::from_raw_os_error(libc::EBUSY));
        }
        *grab = Some(exclusive);
        Ok(())
    }
}

impl EventSource for FakeNode {
    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        if !self.steps.lock().unwrap().is_empty() {
            return Ok(true);
        }
        std::thread::sleep(timeout.min(Duration::from_millis(2)));
        Ok(false)
    }

    fn read_events(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut steps = self.steps.lock().unwrap();
        match steps.pop_front() {
            Some(Step::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    steps.push_front(Step::Data(data.split_off(n)));
                }
                Ok(n)
            }
            Some(Step::Fail(kind)) => Err(io::Error::from(kind)),
            Some(Step::WouldBlock) | None => Err(io::Error::from(io::ErrorKind::WouldBlock)),
        }
    }

    fn interrupt(&self) {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
    }
}
