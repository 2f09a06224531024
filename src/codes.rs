//! Event class and code ids from linux/input-event-codes.h that the core
//! needs to reason about. Human-readable names are not kept here.

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_ABS: u16 = 0x03;
pub const EV_MAX: u16 = 0x1f;

pub const SYN_REPORT: u16 = 0;
pub const SYN_DROPPED: u16 = 3;

pub const BTN_SOUTH: u16 = 0x130;
pub const BTN_EAST: u16 = 0x131;
pub const KEY_MAX: u16 = 0x2ff;

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_Z: u16 = 0x02;
pub const ABS_RZ: u16 = 0x05;
pub const ABS_HAT0X: u16 = 0x10;
pub const ABS_HAT0Y: u16 = 0x11;
pub const ABS_HAT3Y: u16 = 0x17;
pub const ABS_MAX: u16 = 0x3f;

/// Hat switches report discrete directions; the kernel gives them no
/// meaningful range, so they are never calibrated.
pub fn is_hat_switch(code: u16) -> bool {
    (ABS_HAT0X..=ABS_HAT3Y).contains(&code)
}

/// Number of bytes needed for a bitmask covering codes `0..=max_code`.
pub const fn bitmask_len(max_code: u16) -> usize {
    max_code as usize / 8 + 1
}

/// Test bit `index` of a kernel bitmask. Bits past the end read as unset.
pub fn test_bit(mask: &[u8], index: u16) -> bool {
    let index = index as usize;
    mask.get(index / 8)
        .map(|byte| byte & (1 << (index % 8)) != 0)
        .unwrap_or(false)
}
