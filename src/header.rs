//! The fixed 512-byte header block.

use crate::format::{BLOCK_SIZE, EVENT_LABEL_SENTINEL, PARAM_SECTION_KEY};

// Byte offsets of the header fields. Multi-byte fields are little-endian.
const OFF_FIRST_PARAM_BLOCK: usize = 0;
const OFF_KEY: usize = 1;
const OFF_POINT_COUNT: usize = 2;
const OFF_ANALOG_CHANNELS: usize = 4;
const OFF_FIRST_SAMPLE: usize = 6;
const OFF_LAST_SAMPLE: usize = 8;
const OFF_MAX_GAP: usize = 10;
const OFF_SCALE: usize = 12;
const OFF_DATA_START: usize = 16;
const OFF_ANALOG_PER_FRAME: usize = 18;
const OFF_FRAME_RATE: usize = 20;
const OFF_EVENT_LABEL_FLAG: usize = 298;

/// The header block: always the first 512 bytes of the file.
///
/// Stored as raw bytes so unparsed regions survive a read-modify-write
/// cycle untouched. Typed accessors decode the fields in place.
#[derive(Clone)]
pub struct Header {
    bytes: [u8; BLOCK_SIZE],
}

impl Header {
    /// Create a fresh header: parameter directory at block 2, section key
    /// set, first sample 1, 4-character event labels flagged.
    pub fn new() -> Self {
        let mut h = Self {
            bytes: [0; BLOCK_SIZE],
        };
        h.set_first_param_block(2);
        h.bytes[OFF_KEY] = PARAM_SECTION_KEY;
        h.set_first_sample(1);
        h.set_event_labels(true);
        h
    }

    /// Wrap a header block read off disk.
    pub fn from_bytes(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self { bytes }
    }

    /// Raw block bytes, as they appear on disk.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.bytes
    }

    /// Check the parameter section key byte that identifies a C3D file.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.bytes[OFF_KEY] == PARAM_SECTION_KEY
    }

    fn word(&self, off: usize) -> u16 {
        u16::from_le_bytes([self.bytes[off], self.bytes[off + 1]])
    }

    fn set_word(&mut self, off: usize, value: u16) {
        self.bytes[off..off + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn float(&self, off: usize) -> f32 {
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.bytes[off..off + 4]);
        f32::from_le_bytes(b)
    }

    fn set_float(&mut self, off: usize, value: f32) {
        self.bytes[off..off + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// 1-based block index of the first parameter directory block.
    #[inline]
    pub fn first_param_block(&self) -> u8 {
        self.bytes[OFF_FIRST_PARAM_BLOCK]
    }

    pub fn set_first_param_block(&mut self, block: u8) {
        self.bytes[OFF_FIRST_PARAM_BLOCK] = block;
    }

    /// Number of 3D points per frame.
    #[inline]
    pub fn point_count(&self) -> u16 {
        self.word(OFF_POINT_COUNT)
    }

    pub fn set_point_count(&mut self, count: u16) {
        self.set_word(OFF_POINT_COUNT, count);
    }

    /// Number of analog channels. Always written as 0 by this library.
    #[inline]
    pub fn analog_channels(&self) -> u16 {
        self.word(OFF_ANALOG_CHANNELS)
    }

    pub fn set_analog_channels(&mut self, count: u16) {
        self.set_word(OFF_ANALOG_CHANNELS, count);
    }

    /// 1-based number of the first sample (frame).
    #[inline]
    pub fn first_sample(&self) -> u16 {
        self.word(OFF_FIRST_SAMPLE)
    }

    pub fn set_first_sample(&mut self, n: u16) {
        self.set_word(OFF_FIRST_SAMPLE, n);
    }

    /// 1-based number of the last sample (frame).
    #[inline]
    pub fn last_sample(&self) -> u16 {
        self.word(OFF_LAST_SAMPLE)
    }

    pub fn set_last_sample(&mut self, n: u16) {
        self.set_word(OFF_LAST_SAMPLE, n);
    }

    /// Maximum interpolation gap, in frames.
    #[inline]
    pub fn max_interpolation_gap(&self) -> u16 {
        self.word(OFF_MAX_GAP)
    }

    pub fn set_max_interpolation_gap(&mut self, gap: u16) {
        self.set_word(OFF_MAX_GAP, gap);
    }

    /// Point scale factor. Negative means frames are stored as floats.
    #[inline]
    pub fn scale(&self) -> f32 {
        self.float(OFF_SCALE)
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.set_float(OFF_SCALE, scale);
    }

    /// 1-based block index where point data starts.
    #[inline]
    pub fn data_start(&self) -> u16 {
        self.word(OFF_DATA_START)
    }

    pub fn set_data_start(&mut self, block: u16) {
        self.set_word(OFF_DATA_START, block);
    }

    /// Analog samples per point frame. Always written as 0 by this library.
    #[inline]
    pub fn analog_per_frame(&self) -> u16 {
        self.word(OFF_ANALOG_PER_FRAME)
    }

    pub fn set_analog_per_frame(&mut self, n: u16) {
        self.set_word(OFF_ANALOG_PER_FRAME, n);
    }

    /// Point frame rate in Hz.
    #[inline]
    pub fn frame_rate(&self) -> f32 {
        self.float(OFF_FRAME_RATE)
    }

    pub fn set_frame_rate(&mut self, rate: f32) {
        self.set_float(OFF_FRAME_RATE, rate);
    }

    /// Whether the file flags support for 4-character event labels.
    #[inline]
    pub fn event_labels(&self) -> bool {
        self.word(OFF_EVENT_LABEL_FLAG) == EVENT_LABEL_SENTINEL
    }

    pub fn set_event_labels(&mut self, on: bool) {
        let v = if on { EVENT_LABEL_SENTINEL } else { 0 };
        self.set_word(OFF_EVENT_LABEL_FLAG, v);
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Header")
            .field("first_param_block", &self.first_param_block())
            .field("point_count", &self.point_count())
            .field("first_sample", &self.first_sample())
            .field("last_sample", &self.last_sample())
            .field("scale", &self.scale())
            .field("data_start", &self.data_start())
            .field("frame_rate", &self.frame_rate())
            .field("event_labels", &self.event_labels())
            .finish()
    }
}
