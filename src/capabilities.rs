//! Supported event classes and codes of an open device, discovered once at
//! open time from the kernel's capability bitmasks.

use std::collections::{BTreeMap, BTreeSet};

use crate::abs_info::AbsInfo;
use crate::codes::{is_hat_switch, test_bit, ABS_MAX, EV_ABS, EV_KEY, EV_MAX, KEY_MAX};
use crate::error::{Error, Result};
use crate::sys::DeviceControl;

/// Declared range of every ranged absolute axis, keyed by axis code.
pub type AbsInfoMap = BTreeMap<u16, AbsInfo>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    classes: BTreeMap<u16, BTreeSet<u16>>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_class(&mut self, class: u16) {
        self.classes.entry(class).or_default();
    }

    pub fn insert(&mut self, class: u16, code: u16) {
        self.classes.entry(class).or_default().insert(code);
    }

    pub fn has_class(&self, class: u16) -> bool {
        self.classes.contains_key(&class)
    }

    pub fn supports(&self, class: u16, code: u16) -> bool {
        self.classes
            .get(&class)
            .map(|codes| codes.contains(&code))
            .unwrap_or(false)
    }

    pub fn classes(&self) -> impl Iterator<Item = u16> + '_ {
        self.classes.keys().copied()
    }

    pub fn codes(&self, class: u16) -> impl Iterator<Item = u16> + '_ {
        self.classes.get(&class).into_iter().flatten().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Build the capability set and abs-info map of a device.
    ///
    /// Only the top-level class query is fatal. A failed per-class code
    /// query leaves that class without codes, and a failed per-axis
    /// abs-info query leaves that axis without a range. Hat switches are
    /// recorded as supported but never get an [`AbsInfo`].
    pub fn scan<C: DeviceControl + ?Sized>(control: &C) -> Result<(Self, AbsInfoMap)> {
        let ev_bits = control.query_bitmask(0, EV_MAX).map_err(Error::EvBits)?;

        let mut caps = Self::new();
        let mut abs_infos = AbsInfoMap::new();

        for class in (0..=EV_MAX).filter(|&class| test_bit(&ev_bits, class)) {
            caps.insert_class(class);
            match class {
                EV_KEY => caps.scan_codes(control, class, KEY_MAX),
                EV_ABS => {
                    caps.scan_codes(control, class, ABS_MAX);
                    for code in caps.codes(EV_ABS).filter(|&code| !is_hat_switch(code)) {
                        match control.query_abs_info(code) {
                            Ok(raw) => {
                                abs_infos.insert(code, AbsInfo::unpack(&raw));
                            }
                            Err(e) => log::debug!("No absinfo for axis {:#04x}: {}", code, e),
                        }
                    }
                }
                _ => {}
            }
        }

        Ok((caps, abs_infos))
    }

    fn scan_codes<C: DeviceControl + ?Sized>(&mut self, control: &C, class: u16, max_code: u16) {
        let bits = match control.query_bitmask(class, max_code) {
            Ok(bits) => bits,
            Err(e) => {
                log::debug!("Unable to get code bits for class {:#04x}: {}", class, e);
                return;
            }
        };
        for code in (0..=max_code).filter(|&code| test_bit(&bits, code)) {
            self.insert(class, code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{ABS_HAT0X, ABS_HAT0Y, ABS_X, ABS_Y, ABS_Z, BTN_EAST, BTN_SOUTH, EV_SYN};
    use crate::testing::FakeNode;

    #[test]
    fn test_scan_joystick() {
        let node = FakeNode::joystick();
        let (caps, abs_infos) = CapabilitySet::scan(&node).unwrap();

        assert_eq!(caps.classes().collect::<Vec<_>>(), vec![EV_SYN, EV_KEY, EV_ABS]);
        assert_eq!(caps.codes(EV_KEY).collect::<Vec<_>>(), vec![BTN_SOUTH, BTN_EAST]);
        assert!(caps.supports(EV_ABS, ABS_HAT0X));
        assert!(caps.supports(EV_ABS, ABS_HAT0Y));
        assert!(!caps.supports(EV_KEY, ABS_X));

        assert_eq!(abs_infos.get(&ABS_X), Some(&AbsInfo::new(0, 255).with_flat(15)));
        assert_eq!(abs_infos.get(&ABS_Y), Some(&AbsInfo::new(0, 255)));
    }

    #[test]
    fn test_hat_switches_have_no_abs_info() {
        let node = FakeNode::joystick();
        let (_, abs_infos) = CapabilitySet::scan(&node).unwrap();
        assert!(!abs_infos.contains_key(&ABS_HAT0X));
        assert!(!abs_infos.contains_key(&ABS_HAT0Y));
        assert!(!node.abs_queries().contains(&ABS_HAT0X));
    }

    #[test]
    fn test_failed_abs_query_is_soft() {
        let node = FakeNode::joystick();
        let (caps, abs_infos) = CapabilitySet::scan(&node).unwrap();
        // ABS_Z is declared but its absinfo query fails.
        assert!(caps.supports(EV_ABS, ABS_Z));
        assert!(!abs_infos.contains_key(&ABS_Z));
    }

    #[test]
    fn test_failed_code_query_is_soft() {
        let mut node = FakeNode::joystick();
        node.bitmasks.remove(&EV_KEY);
        let (caps, _) = CapabilitySet::scan(&node).unwrap();
        assert!(caps.has_class(EV_KEY));
        assert_eq!(caps.codes(EV_KEY).count(), 0);
    }

    #[test]
    fn test_failed_class_query_is_fatal() {
        let mut node = FakeNode::joystick();
        node.bitmasks.remove(&0);
        let err = CapabilitySet::scan(&node).unwrap_err();
        assert!(matches!(err, Error::EvBits(_)));
    }

    #[test]
    fn test_short_mask_reads_as_unset() {
        let mut node = FakeNode::joystick();
        node.bitmasks.insert(EV_KEY, vec![0xff]);
        let (caps, _) = CapabilitySet::scan(&node).unwrap();
        assert_eq!(caps.codes(EV_KEY).collect::<Vec<_>>(), (0..8).collect::<Vec<_>>());
    }
}
