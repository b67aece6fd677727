//! Writing C3D files.

use std::collections::HashMap;
use std::path::Path;

use glam::Vec3;
use tracing::{debug, trace, warn};

use crate::format::BLOCK_SIZE;
use crate::frame::{Frame, PointEncoding};
use crate::header::Header;
use crate::param::{ParamDirectory, ParamGroup, ParamValue, Parameter, PayloadSpan};
use crate::stream::OStream;
use crate::util::{Error, Result};

/// Sequential C3D writer.
///
/// A fresh writer carries the required `POINT` and `ANALOG` defaults.
/// Parameters are declared freely until [`C3dWriter::open`] puts the
/// header and directory on disk; after that only same-shape values can be
/// patched in place. Frames are appended one call at a time and
/// [`C3dWriter::close`] finalizes the frame count in both the directory
/// and the header.
pub struct C3dWriter {
    header: Header,
    directory: ParamDirectory,
    stream: Option<OStream>,
    /// `GROUP:PARAM` (uppercase) to absolute payload position on disk
    param_spans: HashMap<String, PayloadSpan>,
    data_start_block: u16,
    point_count: usize,
    encoding: PointEncoding,
    frames_written: usize,
    frame_buf: Vec<u8>,
}

fn seeded(name: &str, group_id: i8, value: ParamValue, description: &str) -> Parameter {
    let mut p = Parameter::new(name, group_id, value);
    p.description = description.into();
    p
}

impl C3dWriter {
    /// Create a writer with the required parameter defaults: an empty
    /// float-mode point setup and a zeroed analog declaration.
    pub fn new() -> Self {
        let mut point = ParamGroup::new("POINT", -1);
        point.description = "3-D point parameters".into();
        point.params = vec![
            seeded("USED", 1, ParamValue::Int16(0), "Number of points per frame"),
            seeded("FRAMES", 1, ParamValue::Int16(0), "Number of frames"),
            seeded(
                "SCALE",
                1,
                ParamValue::Float32(-1.0),
                "Point scale factor, negative for float data",
            ),
            seeded("RATE", 1, ParamValue::Float32(0.0), "Point frame rate in Hz"),
            seeded("DATA_START", 1, ParamValue::Int16(0), "First block of point data"),
            seeded("UNITS", 1, ParamValue::Str("mm".into()), "Point coordinate units"),
            seeded(
                "LABELS",
                1,
                ParamValue::StrArray {
                    width: 0,
                    values: vec![],
                },
                "Point labels",
            ),
        ];

        let mut analog = ParamGroup::new("ANALOG", -2);
        analog.description = "Analog channel parameters".into();
        analog.params = vec![
            seeded("USED", 2, ParamValue::Int16(0), "Number of analog channels"),
            seeded("RATE", 2, ParamValue::Float32(0.0), "Analog sample rate in Hz"),
        ];

        let mut directory = ParamDirectory::new();
        directory.add_group(point);
        directory.add_group(analog);

        Self {
            header: Header::new(),
            directory,
            stream: None,
            param_spans: HashMap::new(),
            data_start_block: 0,
            point_count: 0,
            encoding: PointEncoding::Float,
            frames_written: 0,
            frame_buf: Vec::new(),
        }
    }

    /// Set a parameter by `GROUP:PARAMETER` path. Names are stored
    /// uppercase.
    ///
    /// Before [`C3dWriter::open`] this declares freely, creating groups
    /// and parameters as needed. Afterwards the value is patched into the
    /// on-disk directory, which only works while type and dimensions stay
    /// the same; anything else is a state fault, as is naming a parameter
    /// the directory never declared.
    pub fn set_parameter(&mut self, path: &str, value: impl Into<ParamValue>) -> Result<()> {
        let value = value.into();
        let (group, param) = ParamDirectory::split_path(path)?;
        let group = group.to_ascii_uppercase();
        let param = param.to_ascii_uppercase();
        let key = format!("{}:{}", group, param);
        value.validate(&key)?;

        if self.stream.is_none() {
            return self.directory.set_value(&group, &param, value);
        }

        let Ok(existing) = self.directory.get(&key) else {
            return Err(Error::ParameterAfterOpen(key));
        };
        let same_shape = existing.value.param_type() == value.param_type()
            && existing.value.dimensions() == value.dimensions();
        if !same_shape {
            let expected = existing.value.payload_len();
            let actual = value.payload_len();
            if expected != actual {
                return Err(Error::PatchSizeMismatch {
                    name: key,
                    expected,
                    actual,
                });
            }
            return Err(Error::PatchShapeMismatch { name: key });
        }
        let Some(span) = self.param_spans.get(&key).copied() else {
            return Err(Error::ParameterAfterOpen(key));
        };

        let mut payload = Vec::with_capacity(span.len);
        value.encode_payload(&mut payload);
        let stream = self.stream.as_mut().ok_or(Error::NotOpen)?;
        stream.seek(span.offset as u64)?;
        stream.write_bytes(&payload)?;
        stream.seek_end()?;
        self.directory.get_mut(&key)?.value = value;
        trace!(param = %key, "patched parameter in place");
        Ok(())
    }

    /// Set `POINT:LABELS` and `POINT:USED` together, keeping the
    /// label-per-point invariant.
    pub fn set_labels<S: AsRef<str>>(&mut self, labels: &[S]) -> Result<()> {
        let values: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        let count = values.len();
        self.set_parameter("POINT:LABELS", ParamValue::from(values))?;
        self.set_parameter("POINT:USED", count as i16)
    }

    /// Set `POINT:SCALE`. Non-negative selects integer frames with that
    /// scale factor, negative selects float frames.
    pub fn set_scale(&mut self, scale: f32) -> Result<()> {
        self.set_parameter("POINT:SCALE", scale)
    }

    /// Set `POINT:RATE`, the frame rate in Hz.
    pub fn set_frame_rate(&mut self, rate: f32) -> Result<()> {
        self.set_parameter("POINT:RATE", rate)
    }

    /// Set a group's description, creating the group if needed. Only
    /// possible before the directory is on disk.
    pub fn set_group_description(&mut self, group: &str, description: &str) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::AlreadyOpen);
        }
        self.directory
            .describe_group(&group.to_ascii_uppercase(), description)
    }

    /// Set a parameter's description. The parameter must exist, and the
    /// directory must not be on disk yet.
    pub fn set_parameter_description(&mut self, path: &str, description: &str) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::AlreadyOpen);
        }
        let (group, param) = ParamDirectory::split_path(path)?;
        let key = format!(
            "{}:{}",
            group.to_ascii_uppercase(),
            param.to_ascii_uppercase()
        );
        self.directory.describe_param(&key, description)
    }

    /// Validate the declared structure and write the header and parameter
    /// directory. Frames can be appended afterwards.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::AlreadyOpen);
        }
        let path = path.as_ref();

        let point_count = read_count(&self.directory, "POINT:USED")?;
        let labels = self.directory.get("POINT:LABELS")?.value.strings()?;
        if labels.len() != point_count {
            return Err(Error::parameter(
                "POINT:LABELS",
                format!("{} labels for {} points", labels.len(), point_count),
            ));
        }
        let scale = self.directory.get("POINT:SCALE")?.value.as_f32()?;
        let rate = self.directory.get("POINT:RATE")?.value.as_f32()?;
        // The counters patched later must be 16-bit slots on disk.
        self.directory.get("POINT:FRAMES")?.value.as_i16()?;
        self.directory.get("POINT:DATA_START")?.value.as_i16()?;

        let encoding = PointEncoding::from_scale(scale);
        if let PointEncoding::Integer { scale } = encoding {
            if scale == 0.0 {
                warn!("POINT:SCALE is 0, integer frames will decode to the origin");
            }
        }

        let mut enc = self.directory.encode()?;

        self.header.set_point_count(point_count as u16);
        self.header.set_first_sample(1);
        self.header.set_last_sample(0);
        self.header.set_scale(scale);
        self.header.set_frame_rate(rate);
        self.header.set_data_start(enc.data_start_block);
        self.header.set_analog_channels(0);
        self.header.set_analog_per_frame(0);

        let mut stream = OStream::create(path)?;
        stream.write_bytes(self.header.as_bytes())?;
        stream.write_bytes(&enc.bytes)?;

        // Payload spans become absolute: the section sits one header
        // block into the file.
        self.param_spans = enc
            .param_spans
            .drain()
            .map(|(k, mut s)| {
                s.offset += BLOCK_SIZE;
                (k, s)
            })
            .collect();
        self.data_start_block = enc.data_start_block;
        self.point_count = point_count;
        self.encoding = encoding;
        self.frames_written = 0;
        self.frame_buf = Vec::with_capacity(point_count * encoding.bytes_per_point());
        self.stream = Some(stream);

        debug!(
            path = %path.display(),
            points = point_count,
            encoding = encoding.name(),
            data_start_block = self.data_start_block,
            "opened for writing"
        );
        Ok(())
    }

    /// Append one integer-mode frame. The file must be open in integer
    /// mode and `points` must match `POINT:USED`.
    pub fn write_int_frame(&mut self, points: &[Option<Vec3>]) -> Result<()> {
        self.check_open()?;
        if !matches!(self.encoding, PointEncoding::Integer { .. }) {
            return Err(Error::EncodingMismatch {
                file: self.encoding.name(),
                requested: "int16",
            });
        }
        self.append_frame(points)
    }

    /// Append one float-mode frame. The file must be open in float mode
    /// and `points` must match `POINT:USED`.
    pub fn write_float_frame(&mut self, points: &[Option<Vec3>]) -> Result<()> {
        self.check_open()?;
        if !matches!(self.encoding, PointEncoding::Float) {
            return Err(Error::EncodingMismatch {
                file: self.encoding.name(),
                requested: "float32",
            });
        }
        self.append_frame(points)
    }

    fn check_open(&self) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::NotOpen);
        }
        Ok(())
    }

    fn append_frame(&mut self, points: &[Option<Vec3>]) -> Result<()> {
        if points.len() != self.point_count {
            return Err(Error::PointCountMismatch {
                expected: self.point_count,
                actual: points.len(),
            });
        }
        self.frame_buf.clear();
        Frame::encode_points(points, self.encoding, &mut self.frame_buf);
        let stream = self.stream.as_mut().ok_or(Error::NotOpen)?;
        stream.write_bytes(&self.frame_buf)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Finalize and release the file: patch `POINT:FRAMES` in the on-disk
    /// directory, rewrite the header with the final frame range, flush.
    /// The handle is released even when finalizing fails.
    pub fn close(mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Err(Error::NotOpen);
        };
        let frames = self.frames_written;
        if frames > i16::MAX as usize {
            return Err(Error::FrameCountOverflow(frames));
        }

        if let Some(span) = self.param_spans.get("POINT:FRAMES") {
            stream.seek(span.offset as u64)?;
            stream.write_i16(frames as i16)?;
        }

        self.header.set_last_sample(frames as u16);
        stream.seek(0)?;
        stream.write_bytes(self.header.as_bytes())?;
        stream.flush()?;
        debug!(frames, "closed");
        Ok(())
    }

    /// Whether the header and directory are on disk.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Frames appended so far.
    #[inline]
    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// The declared parameter directory.
    pub fn directory(&self) -> &ParamDirectory {
        &self.directory
    }
}

impl Default for C3dWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for C3dWriter {
    fn drop(&mut self) {
        if self.stream.is_some() {
            warn!("writer dropped without close, file not finalized");
        }
    }
}

fn read_count(directory: &ParamDirectory, path: &str) -> Result<usize> {
    let v = directory.get(path)?.value.as_i16()?;
    if v < 0 {
        return Err(Error::parameter(path, format!("negative count {}", v)));
    }
    Ok(v as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_new_writer_defaults() {
        let w = C3dWriter::new();
        assert!(!w.is_open());
        assert_eq!(
            w.directory().get("POINT:USED").unwrap().value,
            ParamValue::Int16(0)
        );
        assert_eq!(
            w.directory().get("POINT:SCALE").unwrap().value,
            ParamValue::Float32(-1.0)
        );
        assert_eq!(
            w.directory().get("ANALOG:USED").unwrap().value,
            ParamValue::Int16(0)
        );
        assert_eq!(w.directory().group("POINT").unwrap().id, -1);
        assert_eq!(w.directory().group("ANALOG").unwrap().id, -2);
    }

    #[test]
    fn test_declarations_are_uppercased() {
        let mut w = C3dWriter::new();
        w.set_parameter("subject:name", "A01").unwrap();
        let p = w.directory().get("SUBJECT:NAME").unwrap();
        assert_eq!(p.name, "NAME");
        assert_eq!(p.value, ParamValue::Str("A01".into()));
        assert_eq!(w.directory().group("SUBJECT").unwrap().id, -3);
    }

    #[test]
    fn test_lifecycle_faults() {
        let w = C3dWriter::new();
        assert!(matches!(w.close().unwrap_err(), Error::NotOpen));

        let mut w = C3dWriter::new();
        assert!(matches!(
            w.write_float_frame(&[]).unwrap_err(),
            Error::NotOpen
        ));

        let tmp = NamedTempFile::new().unwrap();
        w.open(tmp.path()).unwrap();
        let tmp2 = NamedTempFile::new().unwrap();
        assert!(matches!(w.open(tmp2.path()).unwrap_err(), Error::AlreadyOpen));
        w.close().unwrap();
    }

    #[test]
    fn test_label_count_must_match_used() {
        let mut w = C3dWriter::new();
        w.set_parameter("POINT:USED", 2i16).unwrap();
        let tmp = NamedTempFile::new().unwrap();
        let err = w.open(tmp.path()).unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("LABELS"));
    }

    #[test]
    fn test_frame_shape_faults() {
        let tmp = NamedTempFile::new().unwrap();
        let mut w = C3dWriter::new();
        w.set_labels(&["A", "B"]).unwrap();
        w.open(tmp.path()).unwrap();

        let err = w.write_float_frame(&[Some(Vec3::ZERO)]).unwrap_err();
        assert!(matches!(
            err,
            Error::PointCountMismatch {
                expected: 2,
                actual: 1
            }
        ));

        let err = w.write_int_frame(&[None, None]).unwrap_err();
        assert!(matches!(err, Error::EncodingMismatch { .. }));
        assert!(err.is_state());

        w.write_float_frame(&[None, None]).unwrap();
        assert_eq!(w.frames_written(), 1);
        w.close().unwrap();
    }

    #[test]
    fn test_set_labels_keeps_used_in_sync() {
        let mut w = C3dWriter::new();
        w.set_labels(&["Hip", "Knee", "Ankle"]).unwrap();
        assert_eq!(
            w.directory().get("POINT:USED").unwrap().value,
            ParamValue::Int16(3)
        );
        assert_eq!(
            w.directory()
                .get("POINT:LABELS")
                .unwrap()
                .value
                .strings()
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn test_descriptions_only_before_open() {
        let mut w = C3dWriter::new();
        w.set_group_description("SUBJECT", "Session subject").unwrap();
        w.set_parameter("SUBJECT:NAME", "A01").unwrap();
        w.set_parameter_description("SUBJECT:NAME", "Subject code")
            .unwrap();

        let tmp = NamedTempFile::new().unwrap();
        w.open(tmp.path()).unwrap();
        assert!(matches!(
            w.set_group_description("SUBJECT", "x").unwrap_err(),
            Error::AlreadyOpen
        ));
        assert!(matches!(
            w.set_parameter_description("SUBJECT:NAME", "x").unwrap_err(),
            Error::AlreadyOpen
        ));
        w.close().unwrap();
    }
}
