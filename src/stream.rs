//! Buffered file streams with position tracking.
//!
//! All multi-byte reads and writes are little-endian, the only byte order
//! this library supports.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::util::{Error, Result};

const BUF_CAPACITY: usize = 64 * 1024;

/// Input stream for reading C3D data.
#[derive(Debug)]
pub struct IStream {
    reader: BufReader<File>,
    pos: u64,
    size: u64,
}

impl IStream {
    /// Open a file for buffered reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let size = file.metadata()?.len();

        Ok(Self {
            reader: BufReader::with_capacity(BUF_CAPACITY, file),
            pos: 0,
            size,
        })
    }

    /// Current read position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Total file size in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Fill the buffer completely, or fail with the truncation position.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                Error::UnexpectedEof(self.pos)
            } else {
                Error::Io(e)
            }
        })?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    /// Fill the buffer completely, unless the stream is already at end of
    /// file, in which case nothing is read and `Ok(false)` is returned.
    /// Running out mid-buffer is still a truncation error.
    pub fn try_fill(&mut self, buf: &mut [u8]) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => {
                    if filled == 0 {
                        return Ok(false);
                    }
                    return Err(Error::UnexpectedEof(self.pos));
                }
                Ok(n) => {
                    filled += n;
                    self.pos += n as u64;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(true)
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let v = self.reader.read_u8().map_err(|e| self.map_eof(e))?;
        self.pos += 1;
        Ok(v)
    }

    /// Read a little-endian i16.
    pub fn read_i16(&mut self) -> Result<i16> {
        let v = self
            .reader
            .read_i16::<LittleEndian>()
            .map_err(|e| self.map_eof(e))?;
        self.pos += 2;
        Ok(v)
    }

    /// Read a little-endian u16.
    pub fn read_u16(&mut self) -> Result<u16> {
        let v = self
            .reader
            .read_u16::<LittleEndian>()
            .map_err(|e| self.map_eof(e))?;
        self.pos += 2;
        Ok(v)
    }

    /// Read a little-endian f32.
    pub fn read_f32(&mut self) -> Result<f32> {
        let v = self
            .reader
            .read_f32::<LittleEndian>()
            .map_err(|e| self.map_eof(e))?;
        self.pos += 4;
        Ok(v)
    }

    /// Jump to an absolute read position.
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        let new_pos = self.reader.seek(SeekFrom::Start(pos))?;
        self.pos = new_pos;
        Ok(new_pos)
    }

    fn map_eof(&self, e: std::io::Error) -> Error {
        if e.kind() == ErrorKind::UnexpectedEof {
            Error::UnexpectedEof(self.pos)
        } else {
            Error::Io(e)
        }
    }
}

/// Output stream for writing C3D data.
pub struct OStream {
    writer: BufWriter<File>,
    pos: u64,
}

impl OStream {
    /// Create or truncate the file at `path` for writing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::with_capacity(BUF_CAPACITY, file),
            pos: 0,
        })
    }

    /// Current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Write a byte slice.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    /// Write one byte.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        self.pos += 1;
        Ok(())
    }

    /// Write a little-endian i16.
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.writer.write_i16::<LittleEndian>(value)?;
        self.pos += 2;
        Ok(())
    }

    /// Write a little-endian u16.
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.writer.write_u16::<LittleEndian>(value)?;
        self.pos += 2;
        Ok(())
    }

    /// Write a little-endian f32.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.writer.write_f32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    /// Jump to an absolute position, flushing buffered bytes first.
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        self.writer.flush()?;
        let new_pos = self.writer.seek(SeekFrom::Start(pos))?;
        self.pos = new_pos;
        Ok(new_pos)
    }

    /// Jump to the end of the file.
    pub fn seek_end(&mut self) -> Result<u64> {
        self.writer.flush()?;
        let new_pos = self.writer.seek(SeekFrom::End(0))?;
        self.pos = new_pos;
        Ok(new_pos)
    }

    /// Push buffered bytes out to the OS.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
