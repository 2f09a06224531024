//! Decode Linux `input_event` records from raw bytes.
//!
//! A record is `struct timeval` (two native-width words) followed by
//! type (u16), code (u16) and value (i32), all little-endian. The time word
//! width follows the target's pointer width, fixed at compile time.

use std::fmt;

use crate::codes::{EV_SYN, SYN_DROPPED, SYN_REPORT};
use crate::pool::{self, EventPool};

/// Width of one `timeval` word on this target.
#[cfg(target_pointer_width = "64")]
pub const TIME_FIELD_WIDTH: usize = 8;
#[cfg(not(target_pointer_width = "64"))]
pub const TIME_FIELD_WIDTH: usize = 4;

/// Size of struct input_event on 32-bit targets (timeval 8 + type 2 + code 2 + value 4).
pub const INPUT_EVENT_SIZE_32: usize = record_size(4);
/// Size of struct input_event on 64-bit targets (timeval 16 + type 2 + code 2 + value 4).
pub const INPUT_EVENT_SIZE_64: usize = record_size(8);
/// Size of struct input_event on this target.
pub const INPUT_EVENT_SIZE: usize = record_size(TIME_FIELD_WIDTH);

pub const fn record_size(time_width: usize) -> usize {
    2 * time_width + 8
}

/// One decoded input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Event {
    pub time_sec: i64,
    pub time_usec: i64,
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

/// A decoded read. Hand it back with [`release`] once its fields are consumed.
pub type EventBatch = Vec<Box<Event>>;

impl Event {
    pub fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            event_type,
            code,
            value,
            ..Self::default()
        }
    }

    pub fn with_time(mut self, time_sec: i64, time_usec: i64) -> Self {
        self.time_sec = time_sec;
        self.time_usec = time_usec;
        self
    }

    pub fn is_syn_report(&self) -> bool {
        self.event_type == EV_SYN && self.code == SYN_REPORT
    }

    /// Append this event as one native-width kernel record.
    pub fn encode(&self, out: &mut Vec<u8>) {
        self.encode_with::<TIME_FIELD_WIDTH>(out);
    }

    /// Append this event as one record with `TIME_WIDTH`-byte time words.
    ///
    /// Only 4 and 8 are accepted; any other width fails to build.
    ///
    /// ```compile_fail
    /// let mut out = Vec::new();
    /// evstream::Event::new(1, 0x130, 1).encode_with::<6>(&mut out);
    /// ```
    pub fn encode_with<const TIME_WIDTH: usize>(&self, out: &mut Vec<u8>) {
        const { assert_time_width(TIME_WIDTH) };
        for word in [self.time_sec, self.time_usec] {
            if TIME_WIDTH == 8 {
                out.extend_from_slice(&word.to_le_bytes());
            } else {
                out.extend_from_slice(&(word as i32).to_le_bytes());
            }
        }
        out.extend_from_slice(&self.event_type.to_le_bytes());
        out.extend_from_slice(&self.code.to_le_bytes());
        out.extend_from_slice(&self.value.to_le_bytes());
    }

    fn fill<const TIME_WIDTH: usize>(&mut self, record: &[u8]) {
        const { assert_time_width(TIME_WIDTH) };
        let (sec, rest) = record.split_at(TIME_WIDTH);
        let (usec, rest) = rest.split_at(TIME_WIDTH);
        self.time_sec = read_time(sec);
        self.time_usec = read_time(usec);
        self.event_type = u16::from_le_bytes([rest[0], rest[1]]);
        self.code = u16::from_le_bytes([rest[2], rest[3]]);
        self.value = i32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]);
    }
}

const fn assert_time_width(width: usize) {
    assert!(width == 4 || width == 8, "timeval words are 4 or 8 bytes");
}

fn read_time(word: &[u8]) -> i64 {
    match *word {
        [a, b, c, d] => i64::from(i32::from_le_bytes([a, b, c, d])),
        [a, b, c, d, e, f, g, h] => i64::from_le_bytes([a, b, c, d, e, f, g, h]),
        _ => 0,
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.event_type, self.code) {
            (EV_SYN, SYN_REPORT) => write!(
                f,
                "{{ time {}.{:06} ---------- SYN_REPORT ---------- }}",
                self.time_sec, self.time_usec
            ),
            (EV_SYN, SYN_DROPPED) => write!(
                f,
                "{{ time {}.{:06} ++++++++++ SYN_DROPPED ++++++++++ }}",
                self.time_sec, self.time_usec
            ),
            _ => write!(
                f,
                "{{ time {}.{:06}, type {}, code {}, value {} }}",
                self.time_sec, self.time_usec, self.event_type, self.code, self.value
            ),
        }
    }
}

/// Split `raw` into native-width records using the process-wide pool.
/// A trailing remainder shorter than one record is dropped.
pub fn decode(raw: &[u8]) -> EventBatch {
    decode_from::<TIME_FIELD_WIDTH>(pool::global(), raw)
}

/// Return every event of a consumed batch to the process-wide pool.
pub fn release(batch: EventBatch) {
    pool::global().release_batch(batch);
}

/// Decode records with `TIME_WIDTH`-byte time words (4 or 8) from `pool`.
///
/// ```compile_fail
/// let pool = evstream::pool::EventPool::with_capacity(1);
/// evstream::event::decode_from::<2>(&pool, &[0; 12]);
/// ```
pub fn decode_from<const TIME_WIDTH: usize>(pool: &EventPool, raw: &[u8]) -> EventBatch {
    const { assert_time_width(TIME_WIDTH) };
    let width = record_size(TIME_WIDTH);
    let mut batch = Vec::with_capacity(raw.len() / width);
    for record in raw.chunks_exact(width) {
        let mut event = pool.acquire();
        event.fill::<TIME_WIDTH>(record);
        batch.push(event);
    }
    batch
}
