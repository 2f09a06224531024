//! The kernel's `struct input_absinfo`: six little-endian `i32` fields.

/// Size of `struct input_absinfo` as returned by `EVIOCGABS`.
pub const ABS_INFO_SIZE: usize = 24;

/// Snapshot of one absolute axis' declared range at query time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbsInfo {
    pub value: i32,
    pub minimum: i32,
    pub maximum: i32,
    pub fuzz: i32,
    pub flat: i32,
    pub resolution: i32,
}

impl AbsInfo {
    pub fn new(minimum: i32, maximum: i32) -> Self {
        Self {
            minimum,
            maximum,
            ..Self::default()
        }
    }

    pub fn with_flat(mut self, flat: i32) -> Self {
        self.flat = flat;
        self
    }

    /// Decode a raw `input_absinfo` record (value, minimum, maximum, fuzz,
    /// flat, resolution at offsets 0, 4, 8, 12, 16, 20).
    pub fn unpack(raw: &[u8; ABS_INFO_SIZE]) -> Self {
        let field = |offset: usize| {
            i32::from_le_bytes([
                raw[offset],
                raw[offset + 1],
                raw[offset + 2],
                raw[offset + 3],
            ])
        };
        Self {
            value: field(0),
            minimum: field(4),
            maximum: field(8),
            fuzz: field(12),
            flat: field(16),
            resolution: field(20),
        }
    }

    /// Encode back into the kernel layout.
    pub fn pack(&self) -> [u8; ABS_INFO_SIZE] {
        let mut raw = [0u8; ABS_INFO_SIZE];
        let fields = [
            self.value,
            self.minimum,
            self.maximum,
            self.fuzz,
            self.flat,
            self.resolution,
        ];
        for (chunk, field) in raw.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        raw
    }
}
