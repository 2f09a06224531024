//! Axis calibration: map raw absolute-axis samples onto `[-32767, 32767]`.
//!
//! Coefficients are derived once per axis from the declared [`AbsInfo`] and
//! reused for every sample. Two mappings exist:
//!
//! - deadzone: integer math that snaps a band around the rest position to
//!   exactly `0` and rescales the remaining travel (joysticks);
//! - linear: a straight min/median/scale remap of the full range (touch
//!   surfaces and other axes without a rest position).
//!
//! Whatever the raw range, a calibrated value never leaves
//! `[-AXIS_LIMIT, AXIS_LIMIT]`.

use std::collections::BTreeMap;

use crate::abs_info::AbsInfo;
use crate::capabilities::AbsInfoMap;
use crate::codes::EV_ABS;
use crate::event::Event;

/// Magnitude bound of every calibrated value.
pub const AXIS_LIMIT: i32 = 32767;

const OUTPUT_SPAN: f64 = (2 * AXIS_LIMIT) as f64;
const DEADZONE_SCALE_BITS: u32 = 28;
const DEADZONE_SHIFT: u32 = 13;

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Precomputed correction for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCorrection {
    pub minimum: i32,
    pub maximum: i32,
    /// Deadzone coefficients; all zero unless built in deadzone mode.
    pub coef: [i32; 3],
    pub median: i32,
    pub scale: f64,
}

impl AxisCorrection {
    /// Derive the correction for one axis.
    ///
    /// A declared `0..0` range means the driver did not set one and is
    /// replaced by `-32767..32767`. A non-negative `override_flat` replaces
    /// the declared flat for the deadzone coefficients only; a negative one
    /// is ignored.
    pub fn new(info: &AbsInfo, use_dead_zone: bool, override_flat: Option<i32>) -> Self {
        let (minimum, maximum) = match (info.minimum, info.maximum) {
            (0, 0) => (-AXIS_LIMIT, AXIS_LIMIT),
            range => range,
        };
        let (min, max) = (i64::from(minimum), i64::from(maximum));

        let coef = if use_dead_zone {
            let flat = i64::from(override_flat.filter(|f| *f >= 0).unwrap_or(info.flat));
            let width = (max - min) - 4 * flat;
            [
                saturate((max + min) - 2 * flat),
                saturate((max + min) + 2 * flat),
                if width != 0 {
                    saturate((1i64 << DEADZONE_SCALE_BITS) / width)
                } else {
                    0
                },
            ]
        } else {
            [0; 3]
        };

        let span = max - min - 1;
        let scale = if span > 0 { OUTPUT_SPAN / span as f64 } else { 0.0 };

        Self {
            minimum,
            maximum,
            coef,
            median: saturate(span / 2),
            scale,
        }
    }

    /// Calibrate one raw sample.
    pub fn apply(&self, raw: i32, dead_zone: bool) -> i32 {
        let value = if dead_zone {
            let [low, high, factor] = self.coef.map(i64::from);
            let mut v = i64::from(raw) * 2;
            if v > low {
                if v < high {
                    return 0;
                }
                v -= high;
            } else {
                v -= low;
            }
            (v * factor) >> DEADZONE_SHIFT
        } else {
            let offset = i64::from(raw) - i64::from(self.minimum) - i64::from(self.median);
            (offset as f64 * self.scale).floor() as i64
        };
        value.clamp(-i64::from(AXIS_LIMIT), i64::from(AXIS_LIMIT)) as i32
    }
}

/// Per-device calibration, keyed by axis code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationTable {
    axes: BTreeMap<u16, AxisCorrection>,
    use_dead_zone: bool,
}

impl CalibrationTable {
    /// Build corrections for every axis in `abs_infos`.
    pub fn build(abs_infos: &AbsInfoMap, use_dead_zone: bool, override_flat: Option<i32>) -> Self {
        Self::from_axes(
            abs_infos.iter().map(|(&code, &info)| (code, info)),
            use_dead_zone,
            override_flat,
        )
    }

    pub fn from_axes<I>(axes: I, use_dead_zone: bool, override_flat: Option<i32>) -> Self
    where
        I: IntoIterator<Item = (u16, AbsInfo)>,
    {
        let axes = axes
            .into_iter()
            .map(|(code, info)| (code, AxisCorrection::new(&info, use_dead_zone, override_flat)))
            .collect();
        Self {
            axes,
            use_dead_zone,
        }
    }

    /// Calibrate `raw` for axis `code`.
    ///
    /// Unknown axes pass through unchanged and unclamped. The deadzone
    /// mapping is used only when the table was built for it and
    /// `dead_zone` is set; otherwise the linear mapping applies.
    pub fn correct(&self, code: u16, raw: i32, dead_zone: bool) -> i32 {
        match self.axes.get(&code) {
            Some(axis) => axis.apply(raw, self.use_dead_zone && dead_zone),
            None => raw,
        }
    }

    /// Calibrated value of `event`: absolute-axis events go through
    /// [`CalibrationTable::correct`], everything else keeps its raw value.
    pub fn correct_event(&self, event: &Event, dead_zone: bool) -> i32 {
        if event.event_type == EV_ABS {
            self.correct(event.code, event.value, dead_zone)
        } else {
            event.value
        }
    }

    /// Stored `(minimum, maximum)` of axis `code`, or `(0, 0)` when unknown.
    pub fn range(&self, code: u16) -> (i32, i32) {
        self.axes
            .get(&code)
            .map(|axis| (axis.minimum, axis.maximum))
            .unwrap_or((0, 0))
    }

    pub fn get(&self, code: u16) -> Option<&AxisCorrection> {
        self.axes.get(&code)
    }

    pub fn codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.axes.keys().copied()
    }

    pub fn use_dead_zone(&self) -> bool {
        self.use_dead_zone
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }
}
