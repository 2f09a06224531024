//! evdev node backed by `/dev/input/event*`, queried through `EVIOC*` ioctls.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::Duration;

use super::{DeviceControl, EventSource, InputId};
use crate::abs_info::ABS_INFO_SIZE;
use crate::codes::{bitmask_len, KEY_MAX};

const INPUT_NAME_LEN: usize = 256;
const INPUT_PHYS_LEN: usize = 256;

const EVDEV_IOCTL_TYPE: u8 = b'E';

const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;
const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;
const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

const fn ioctl_code(direction: u32, nr: u8, size: usize) -> libc::c_ulong {
    ((direction << IOC_DIRSHIFT)
        | ((EVDEV_IOCTL_TYPE as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
        | ((size as u32) << IOC_SIZESHIFT)) as libc::c_ulong
}

const EVIOCGVERSION: libc::c_ulong =
    ioctl_code(IOC_READ, 0x01, std::mem::size_of::<libc::c_int>());
const EVIOCGID: libc::c_ulong = ioctl_code(IOC_READ, 0x02, std::mem::size_of::<[u16; 4]>());
const EVIOCGRAB: libc::c_ulong =
    ioctl_code(IOC_WRITE, 0x90, std::mem::size_of::<libc::c_int>());

const fn eviocgname(len: usize) -> libc::c_ulong {
    ioctl_code(IOC_READ, 0x06, len)
}

const fn eviocgphys(len: usize) -> libc::c_ulong {
    ioctl_code(IOC_READ, 0x07, len)
}

const fn eviocgkey(len: usize) -> libc::c_ulong {
    ioctl_code(IOC_READ, 0x18, len)
}

const fn eviocgbit(class: u16, len: usize) -> libc::c_ulong {
    ioctl_code(IOC_READ, 0x20 + class as u8, len)
}

const fn eviocgabs(code: u16) -> libc::c_ulong {
    ioctl_code(IOC_READ, 0x40 + code as u8, ABS_INFO_SIZE)
}

fn check(rc: libc::c_int) -> io::Result<libc::c_int> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}

fn parse_c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}

/// An open evdev character device plus a self-pipe used to wake a pending
/// readiness wait from another thread.
#[derive(Debug)]
pub struct EvdevNode {
    file: File,
    wake_rx: File,
    wake_tx: File,
}

impl EvdevNode {
    /// Open `path` read-only and non-blocking.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_CLOEXEC)
            .open(path)?;
        let (wake_rx, wake_tx) = wake_pipe()?;
        Ok(Self {
            file,
            wake_rx,
            wake_tx,
        })
    }

    fn fd(&self) -> libc::c_int {
        self.file.as_raw_fd()
    }

    fn drain_wake(&self) {
        let mut scratch = [0u8; 16];
        while matches!((&self.wake_rx).read(&mut scratch), Ok(n) if n > 0) {}
    }
}

fn wake_pipe() -> io::Result<(File, File)> {
    let mut fds = [0 as libc::c_int; 2];
    // SAFETY: `fds` has room for the two descriptors pipe2 writes.
    check(unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_NONBLOCK | libc::O_CLOEXEC) })?;
    // SAFETY: pipe2 succeeded, so both descriptors are open and owned by us alone.
    let (rx, tx) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    Ok((File::from(rx), File::from(tx)))
}

impl DeviceControl for EvdevNode {
    fn query_version(&self) -> io::Result<u32> {
        let mut version: libc::c_int = 0;
        // SAFETY: EVIOCGVERSION writes one c_int into `version`.
        check(unsafe { libc::ioctl(self.fd(), EVIOCGVERSION as _, &mut version) })?;
        Ok(version as u32)
    }

    fn query_identity(&self) -> io::Result<InputId> {
        let mut ids = [0u16; 4];
        // SAFETY: EVIOCGID writes a `struct input_id` (four u16) into `ids`.
        check(unsafe { libc::ioctl(self.fd(), EVIOCGID as _, ids.as_mut_ptr()) })?;
        Ok(InputId {
            bus: ids[0],
            vendor: ids[1],
            product: ids[2],
            version: ids[3],
        })
    }

    fn query_name(&self) -> io::Result<String> {
        let mut buf = [0u8; INPUT_NAME_LEN];
        // SAFETY: the request encodes `buf.len()`, so the kernel writes at most that many bytes.
        check(unsafe { libc::ioctl(self.fd(), eviocgname(buf.len()) as _, buf.as_mut_ptr()) })?;
        Ok(parse_c_string(&buf))
    }

    fn query_phys(&self) -> io::Result<String> {
        let mut buf = [0u8; INPUT_PHYS_LEN];
        // SAFETY: the request encodes `buf.len()`, so the kernel writes at most that many bytes.
        check(unsafe { libc::ioctl(self.fd(), eviocgphys(buf.len()) as _, buf.as_mut_ptr()) })?;
        Ok(parse_c_string(&buf))
    }

    fn query_bitmask(&self, class: u16, max_code: u16) -> io::Result<Vec<u8>> {
        let mut bits = vec![0u8; bitmask_len(max_code)];
        // SAFETY: the request encodes `bits.len()`, so the kernel writes at most that many bytes.
        check(unsafe {
            libc::ioctl(self.fd(), eviocgbit(class, bits.len()) as _, bits.as_mut_ptr())
        })?;
        Ok(bits)
    }

    fn query_abs_info(&self, code: u16) -> io::Result<[u8; ABS_INFO_SIZE]> {
        let mut raw = [0u8; ABS_INFO_SIZE];
        // SAFETY: EVIOCGABS writes one `struct input_absinfo` (24 bytes) into `raw`.
        check(unsafe { libc::ioctl(self.fd(), eviocgabs(code) as _, raw.as_mut_ptr()) })?;
        Ok(raw)
    }

    fn query_key_state(&self) -> io::Result<Vec<u8>> {
        let mut bits = vec![0u8; bitmask_len(KEY_MAX)];
        // SAFETY: the request encodes `bits.len()`, so the kernel writes at most that many bytes.
        check(unsafe { libc::ioctl(self.fd(), eviocgkey(bits.len()) as _, bits.as_mut_ptr()) })?;
        Ok(bits)
    }

    fn set_grab(&self, exclusive: bool) -> io::Result<()> {
        let flag = libc::c_int::from(exclusive);
        // SAFETY: EVIOCGRAB takes its argument by value; no memory is touched.
        check(unsafe { libc::ioctl(self.fd(), EVIOCGRAB as _, flag) })?;
        Ok(())
    }
}

impl EventSource for EvdevNode {
    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let mut fds = [
            libc::pollfd {
                fd: self.fd(),
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: self.wake_rx.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
        ];
        let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
        // SAFETY: `fds` is a valid array of two pollfd entries for the duration of the call.
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }

        if fds[1].revents & libc::POLLIN != 0 {
            self.drain_wake();
        }

        // Error and hang-up conditions are surfaced by the next read.
        let ready = libc::POLLIN | libc::POLLERR | libc::POLLHUP | libc::POLLNVAL;
        Ok(fds[0].revents & ready != 0)
    }

    fn read_events(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.file).read(buf)
    }

    fn interrupt(&self) {
        // A full pipe already holds a pending wake-up.
        if let Err(e) = (&self.wake_tx).write(&[1]) {
            if e.kind() != io::ErrorKind::WouldBlock {
                log::debug!("Failed to signal acquisition wake pipe: {}", e);
            }
        }
    }
}
