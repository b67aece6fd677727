//! Point frames and their two wire encodings.
//!
//! A frame is one record per point, four stored values each: x, y, z and a
//! residual word this library writes as zero and never decodes. Raw
//! all-zero coordinates are the sentinel for an unobserved marker.

use glam::Vec3;

use crate::util::{Error, Result};

/// How point samples are stored on the wire, derived from the sign of
/// `POINT:SCALE`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointEncoding {
    /// Signed 16-bit coordinates; real position = raw * scale
    Integer { scale: f32 },
    /// 32-bit float coordinates
    Float,
}

impl PointEncoding {
    /// Derive the encoding from `POINT:SCALE`. Negative means float, the
    /// magnitude is not used in that mode.
    pub fn from_scale(scale: f32) -> Self {
        if scale < 0.0 {
            Self::Float
        } else {
            Self::Integer { scale }
        }
    }

    /// Bytes one point record occupies.
    pub const fn bytes_per_point(self) -> usize {
        match self {
            Self::Integer { .. } => 8,
            Self::Float => 16,
        }
    }

    /// Short name for error messages and logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Integer { .. } => "int16",
            Self::Float => "float32",
        }
    }
}

#[inline]
fn i16_at(rec: &[u8], off: usize) -> i16 {
    i16::from_le_bytes([rec[off], rec[off + 1]])
}

#[inline]
fn f32_at(rec: &[u8], off: usize) -> f32 {
    f32::from_le_bytes([rec[off], rec[off + 1], rec[off + 2], rec[off + 3]])
}

/// One decoded frame: a slot per point, `None` for unobserved markers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    points: Vec<Option<Vec3>>,
}

impl Frame {
    /// Create an empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of point slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the frame has no point slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All point slots in declaration order.
    #[inline]
    pub fn points(&self) -> &[Option<Vec3>] {
        &self.points
    }

    /// One point slot by index.
    pub fn point(&self, index: usize) -> Result<Option<Vec3>> {
        self.points
            .get(index)
            .copied()
            .ok_or(Error::IndexOutOfRange {
                index,
                count: self.points.len(),
            })
    }

    /// Decode a frame from raw record bytes.
    pub fn decode(buf: &[u8], encoding: PointEncoding) -> Result<Self> {
        let mut frame = Self::new();
        frame.decode_into(buf, encoding)?;
        Ok(frame)
    }

    /// Decode into this frame, reusing its storage. The buffer must hold
    /// whole records; a partial trailing record is a truncation fault.
    pub fn decode_into(&mut self, buf: &[u8], encoding: PointEncoding) -> Result<()> {
        let bpp = encoding.bytes_per_point();
        let n = buf.len() / bpp;
        if n * bpp != buf.len() {
            return Err(Error::UnexpectedEof((n * bpp) as u64));
        }

        self.points.clear();
        self.points.reserve(n);
        match encoding {
            PointEncoding::Integer { scale } => {
                for rec in buf.chunks_exact(8) {
                    let x = i16_at(rec, 0);
                    let y = i16_at(rec, 2);
                    let z = i16_at(rec, 4);
                    if x == 0 && y == 0 && z == 0 {
                        self.points.push(None);
                    } else {
                        self.points.push(Some(Vec3::new(
                            x as f32 * scale,
                            y as f32 * scale,
                            z as f32 * scale,
                        )));
                    }
                }
            }
            PointEncoding::Float => {
                for rec in buf.chunks_exact(16) {
                    let x = f32_at(rec, 0);
                    let y = f32_at(rec, 4);
                    let z = f32_at(rec, 8);
                    if x == 0.0 && y == 0.0 && z == 0.0 {
                        self.points.push(None);
                    } else {
                        self.points.push(Some(Vec3::new(x, y, z)));
                    }
                }
            }
        }
        Ok(())
    }

    /// Append the encoded records for `points` to `out`. Unobserved
    /// markers become all-zero records; integer coordinates truncate
    /// toward zero.
    pub fn encode_points(points: &[Option<Vec3>], encoding: PointEncoding, out: &mut Vec<u8>) {
        match encoding {
            PointEncoding::Integer { scale } => {
                for p in points {
                    match p {
                        Some(v) => {
                            out.extend_from_slice(&((v.x / scale) as i16).to_le_bytes());
                            out.extend_from_slice(&((v.y / scale) as i16).to_le_bytes());
                            out.extend_from_slice(&((v.z / scale) as i16).to_le_bytes());
                            out.extend_from_slice(&0i16.to_le_bytes());
                        }
                        None => out.extend_from_slice(&[0u8; 8]),
                    }
                }
            }
            PointEncoding::Float => {
                for p in points {
                    match p {
                        Some(v) => {
                            out.extend_from_slice(&v.x.to_le_bytes());
                            out.extend_from_slice(&v.y.to_le_bytes());
                            out.extend_from_slice(&v.z.to_le_bytes());
                            out.extend_from_slice(&0f32.to_le_bytes());
                        }
                        None => out.extend_from_slice(&[0u8; 16]),
                    }
                }
            }
        }
    }

    /// Append this frame's encoded records to `out`.
    pub fn encode_into(&self, encoding: PointEncoding, out: &mut Vec<u8>) {
        Self::encode_points(&self.points, encoding, out)
    }
}
