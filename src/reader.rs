//! Reading C3D files.

use std::collections::HashMap;
use std::path::Path;

use glam::Vec3;
use tracing::{debug, warn};

use crate::format::{block_to_offset, BLOCK_SIZE, PROLOGUE_SIZE};
use crate::frame::{Frame, PointEncoding};
use crate::header::Header;
use crate::param::{ParamDirectory, Parameter};
use crate::stream::IStream;
use crate::util::{Error, Result};

/// Sequential C3D reader.
///
/// Opening a file decodes the header and the whole parameter directory and
/// positions the stream at the first frame. Frames are then decoded one
/// [`C3dReader::read_frame`] call at a time; the most recent frame backs
/// the point accessors. Dropping (or [`C3dReader::close`]) releases the
/// file handle.
#[derive(Debug)]
pub struct C3dReader {
    stream: IStream,
    header: Header,
    directory: ParamDirectory,
    labels: Vec<String>,
    /// Uppercased label to point slot, first occurrence wins
    label_lookup: HashMap<String, usize>,
    point_count: usize,
    frame_count: usize,
    encoding: PointEncoding,
    frame_rate: f32,
    frames_read: usize,
    frame: Frame,
    frame_buf: Vec<u8>,
}

impl C3dReader {
    /// Open a file and decode everything up to the first frame.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut stream = IStream::open(path)?;
        if stream.size() < BLOCK_SIZE as u64 {
            return Err(Error::UnexpectedEof(stream.size()));
        }

        let mut block = [0u8; BLOCK_SIZE];
        stream.read_exact(&mut block)?;
        let header = Header::from_bytes(block);
        if !header.is_valid() {
            return Err(Error::NotAC3dFile);
        }

        let first_param_block = header.first_param_block();
        if first_param_block == 0 {
            return Err(Error::directory("header points at parameter block 0"));
        }
        stream.seek(block_to_offset(first_param_block as u16))?;

        // The prologue names the section's block count; read the rest of
        // the section in one piece and parse it from memory.
        let mut prologue = [0u8; PROLOGUE_SIZE];
        stream.read_exact(&mut prologue)?;
        let blocks = prologue[2] as usize;
        if blocks == 0 {
            return Err(Error::directory("prologue declares 0 parameter blocks"));
        }
        let mut section = vec![0u8; blocks * BLOCK_SIZE];
        section[..PROLOGUE_SIZE].copy_from_slice(&prologue);
        stream.read_exact(&mut section[PROLOGUE_SIZE..])?;
        let directory = ParamDirectory::parse(&section)?;

        let point_count = read_count(&directory, "POINT:USED")?;
        let frame_count = read_count(&directory, "POINT:FRAMES")?;
        let scale = directory.get("POINT:SCALE")?.value.as_f32()?;
        let frame_rate = directory.get("POINT:RATE")?.value.as_f32()?;
        let data_start = directory.get("POINT:DATA_START")?.value.as_i16()?;
        if data_start < 1 {
            return Err(Error::parameter(
                "POINT:DATA_START",
                format!("block {} does not exist", data_start),
            ));
        }
        let encoding = PointEncoding::from_scale(scale);

        if header.point_count() as usize != point_count {
            warn!(
                header = header.point_count(),
                parameter = point_count,
                "point counts disagree, trusting the directory"
            );
        }
        if header.data_start() != data_start as u16 {
            warn!(
                header = header.data_start(),
                parameter = data_start,
                "data start blocks disagree, trusting the directory"
            );
        }

        let mut labels = directory.get("POINT:LABELS")?.value.strings()?.to_vec();
        if labels.len() < point_count {
            return Err(Error::parameter(
                "POINT:LABELS",
                format!("{} labels for {} points", labels.len(), point_count),
            ));
        }
        if labels.len() > point_count {
            warn!(
                labels = labels.len(),
                points = point_count,
                "surplus labels ignored"
            );
            labels.truncate(point_count);
        }
        let mut label_lookup = HashMap::with_capacity(labels.len());
        for (slot, label) in labels.iter().enumerate() {
            label_lookup
                .entry(label.to_ascii_uppercase())
                .or_insert(slot);
        }

        stream.seek(block_to_offset(data_start as u16))?;
        debug!(
            path = %path.display(),
            points = point_count,
            frames = frame_count,
            encoding = encoding.name(),
            "opened"
        );

        let frame_buf = vec![0u8; point_count * encoding.bytes_per_point()];
        Ok(Self {
            stream,
            header,
            directory,
            labels,
            label_lookup,
            point_count,
            frame_count,
            encoding,
            frame_rate,
            frames_read: 0,
            frame: Frame::new(),
            frame_buf,
        })
    }

    /// Decode the next frame and return a view of it, or `None` once the
    /// stream is exhausted. Reading on past the declared frame count while
    /// bytes remain is a state fault; a frame cut short mid-record is a
    /// corrupt file.
    pub fn read_frame(&mut self) -> Result<Option<&Frame>> {
        if self.stream.pos() >= self.stream.size() {
            return Ok(None);
        }
        if self.frames_read >= self.frame_count {
            return Err(Error::PastLastFrame {
                count: self.frame_count,
            });
        }
        if !self.stream.try_fill(&mut self.frame_buf)? {
            return Ok(None);
        }
        self.frame.decode_into(&self.frame_buf, self.encoding)?;
        self.frames_read += 1;
        Ok(Some(&self.frame))
    }

    /// Point from the most recently read frame, by slot index.
    pub fn point(&self, index: usize) -> Result<Option<Vec3>> {
        if self.frames_read == 0 {
            return Err(Error::NoFrameRead);
        }
        self.frame.point(index)
    }

    /// Point from the most recently read frame, by label. Same lookup
    /// rules as [`C3dReader::label_index`].
    pub fn point_by_label(&self, label: &str) -> Result<Option<Vec3>> {
        self.point(self.label_index(label)?)
    }

    /// Slot index of a label. Lookup ignores ASCII case; duplicate
    /// labels resolve to the first slot.
    pub fn label_index(&self, label: &str) -> Result<usize> {
        self.label_lookup
            .get(&label.to_ascii_uppercase())
            .copied()
            .ok_or_else(|| Error::LabelNotFound(label.to_string()))
    }

    /// Point labels, one per slot, in slot order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Resolve any parameter by `GROUP:PARAMETER` path.
    pub fn parameter(&self, path: &str) -> Result<&Parameter> {
        self.directory.get(path)
    }

    /// The parsed parameter directory.
    pub fn directory(&self) -> &ParamDirectory {
        &self.directory
    }

    /// The decoded header block.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Points per frame.
    #[inline]
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// Frames the file declares.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Frames decoded so far.
    #[inline]
    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    /// Frame encoding the file uses.
    #[inline]
    pub fn encoding(&self) -> PointEncoding {
        self.encoding
    }

    /// Point frame rate in Hz.
    #[inline]
    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    /// How far into the file the stream is, as a whole percentage.
    pub fn progress_percent(&self) -> u8 {
        ((self.stream.pos() * 100) / self.stream.size()) as u8
    }

    /// Release the file handle. Dropping the reader does the same.
    pub fn close(self) {}
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
    use crate::writer::C3dWriter;
    use tempfile::NamedTempFile;

    #[test]
    fn test_open_rejects_non_c3d() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), vec![0u8; BLOCK_SIZE]).unwrap();
        let err = C3dReader::open(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::NotAC3dFile));
        assert!(err.is_format());
    }

    #[test]
    fn test_open_rejects_short_file() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), vec![0u8; 100]).unwrap();
        let err = C3dReader::open(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof(100)));
    }

    #[test]
    fn test_open_missing_file() {
        let err = C3dReader::open("/nonexistent/capture.c3d").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_accessors_before_first_frame() {
        let tmp = NamedTempFile::new().unwrap();
        let mut writer = C3dWriter::new();
        writer.set_labels(&["Hip"]).unwrap();
        writer.open(tmp.path()).unwrap();
        writer.write_float_frame(&[Some(Vec3::ONE)]).unwrap();
        writer.close().unwrap();

        let mut reader = C3dReader::open(tmp.path()).unwrap();
        // Label resolution needs no frame, the point accessors do.
        assert_eq!(reader.label_index("hip").unwrap(), 0);
        assert!(matches!(reader.point(0).unwrap_err(), Error::NoFrameRead));
        assert!(matches!(
            reader.point_by_label("Hip").unwrap_err(),
            Error::NoFrameRead
        ));

        reader.read_frame().unwrap().unwrap();
        assert_eq!(reader.point(0).unwrap(), Some(Vec3::ONE));
        assert_eq!(reader.point_by_label("HIP").unwrap(), Some(Vec3::ONE));
        assert!(matches!(
            reader.point_by_label("Knee").unwrap_err(),
            Error::LabelNotFound(_)
        ));
    }
}
