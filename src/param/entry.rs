//! Directory entries and their chained wire framing.
//!
//! Groups and parameters share one entry layout: a signed name length
//! (negative marks the entry locked), a signed group id (negative for
//! groups, positive for parameters, zero for the terminator), the name, a
//! signed 16-bit offset from the offset field to the next entry, the
//! content (parameters only: type tag, dimension list, payload), then a
//! description length and the description.

use tracing::trace;

use crate::util::{Dimensions, Error, ParamType, Result};

use super::value::{latin1, ParamValue};

/// Longest name an entry can carry. The length byte is a signed 8-bit
/// value whose sign is the lock flag.
pub const MAX_NAME_LEN: usize = 127;

/// One leaf parameter.
#[derive(Clone, Debug)]
pub struct Parameter {
    /// Parameter name, conventionally uppercase
    pub name: String,
    /// Positive id matching the magnitude of the owning group's id
    pub id: i8,
    /// Free-form description, may be empty
    pub description: String,
    /// Lock flag carried in the sign of the name length
    pub locked: bool,
    /// Decoded value
    pub value: ParamValue,
}

impl Parameter {
    /// Create an unlocked parameter owned by the group with id `-group_id`.
    pub fn new(name: impl Into<String>, group_id: i8, value: ParamValue) -> Self {
        Self {
            name: name.into(),
            id: group_id.saturating_abs(),
            description: String::new(),
            locked: false,
            value,
        }
    }
}

/// A parameter group: a named container for parameters.
#[derive(Clone, Debug)]
pub struct ParamGroup {
    /// Group name, conventionally uppercase
    pub name: String,
    /// Negative id; parameters reference its magnitude
    pub id: i8,
    /// Free-form description, may be empty
    pub description: String,
    /// Lock flag carried in the sign of the name length
    pub locked: bool,
    /// Parameters in declaration order
    pub params: Vec<Parameter>,
}

impl ParamGroup {
    /// Create an empty unlocked group. `id` must be negative.
    pub fn new(name: impl Into<String>, id: i8) -> Self {
        Self {
            name: name.into(),
            id,
            description: String::new(),
            locked: false,
            params: Vec::new(),
        }
    }

    /// Look up a parameter by name, ignoring ASCII case.
    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Mutable parameter lookup, ignoring ASCII case.
    pub fn param_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Insert a parameter, replacing any existing one with the same name.
    pub fn insert_param(&mut self, param: Parameter) {
        match self.param_mut(&param.name) {
            Some(slot) => *slot = param,
            None => self.params.push(param),
        }
    }
}

/// Byte cursor over the parameter section buffer.
pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    fn need(&self, n: usize) -> Result<()> {
        if self.pos + n > self.buf.len() {
            Err(Error::directory(format!(
                "section truncated at byte {}",
                self.buf.len()
            )))
        } else {
            Ok(())
        }
    }

    pub fn take_u8(&mut self) -> Result<u8> {
        self.need(1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn take_i8(&mut self) -> Result<i8> {
        Ok(self.take_u8()? as i8)
    }

    pub fn take_i16(&mut self) -> Result<i16> {
        self.need(2)?;
        let v = i16::from_le_bytes([self.buf[self.pos], self.buf[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    pub fn take_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.need(n)?;
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    /// Jump to an absolute position. The end of the buffer is a valid
    /// position to land on.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return Err(Error::directory(format!(
                "chain points past the section end ({} > {})",
                pos,
                self.buf.len()
            )));
        }
        self.pos = pos;
        Ok(())
    }
}

/// What one decoded entry turned out to be.
#[derive(Debug)]
pub(crate) enum EntryKind {
    Group(ParamGroup),
    Param(Parameter),
    /// Id 0: the chain terminator, or a hollow entry to step over
    Empty,
}

#[derive(Debug)]
pub(crate) struct DecodedEntry {
    pub kind: EntryKind,
    /// Absolute position of the next entry, None when this was the last.
    pub next: Option<usize>,
}

/// Decode one entry at the cursor. Leaves the cursor after the entry's
/// description; chain stepping is the caller's job.
pub(crate) fn decode_entry(cur: &mut Cursor<'_>) -> Result<DecodedEntry> {
    let start = cur.pos();
    let name_len_raw = cur.take_i8()?;
    let id = cur.take_i8()?;
    let locked = name_len_raw < 0;
    let name_len = name_len_raw.unsigned_abs() as usize;
    let name = latin1(cur.take_bytes(name_len)?);

    let offset_pos = cur.pos();
    let next = cur.take_i16()?;

    let value = if id > 0 {
        let tag = cur.take_i8()?;
        let ty = ParamType::from_tag(tag).ok_or_else(|| {
            Error::directory(format!("unknown type tag {} in parameter {}", tag, name))
        })?;
        let n_dims = cur.take_u8()? as usize;
        if n_dims > Dimensions::MAX_RANK {
            return Err(Error::directory(format!(
                "parameter {} declares {} dimensions",
                name, n_dims
            )));
        }
        let dims = Dimensions::from_slice(cur.take_bytes(n_dims)?);
        let payload = cur.take_bytes(ty.elem_bytes() * dims.num_elements())?;
        Some(ParamValue::decode_payload(ty, &dims, payload)?)
    } else {
        None
    };

    let desc_len = cur.take_u8()? as usize;
    let description = latin1(cur.take_bytes(desc_len)?);

    let next = if next == 0 {
        None
    } else {
        if next < 0 {
            return Err(Error::directory(format!(
                "negative next-entry offset in {}",
                name
            )));
        }
        let target = offset_pos + next as usize;
        let consumed = cur.pos();
        if target < consumed {
            return Err(Error::directory(format!(
                "entry {} overruns its declared length",
                name
            )));
        }
        if target > consumed {
            // Vendor extension bytes between entries: step over them.
            trace!(
                entry = %name,
                skipped = target - consumed,
                "skipping trailing entry bytes"
            );
        }
        Some(target)
    };

    trace!(start, id, entry = %name, "decoded directory entry");

    let kind = if let Some(value) = value {
        EntryKind::Param(Parameter {
            name,
            id,
            description,
            locked,
            value,
        })
    } else if id < 0 {
        EntryKind::Group(ParamGroup {
            name,
            id,
            description,
            locked,
            params: Vec::new(),
        })
    } else {
        EntryKind::Empty
    };

    Ok(DecodedEntry { kind, next })
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(Error::parameter(
            name,
            format!("name length {} outside 1..={}", name.len(), MAX_NAME_LEN),
        ));
    }
    if !name.is_ascii() {
        return Err(Error::parameter(name, "name is not ASCII"));
    }
    Ok(())
}

fn check_description(name: &str, description: &str) -> Result<()> {
    if description.len() > 255 {
        return Err(Error::parameter(
            name,
            format!("description length {} exceeds 255", description.len()),
        ));
    }
    if !description.is_ascii() {
        return Err(Error::parameter(name, "description is not ASCII"));
    }
    Ok(())
}

fn push_framing(out: &mut Vec<u8>, name: &str, id: i8, locked: bool, next: usize) -> Result<()> {
    if next > i16::MAX as usize {
        return Err(Error::parameter(
            name,
            format!("encoded entry of {} bytes does not fit the chain", next),
        ));
    }
    let mut name_len = name.len() as i8;
    if locked {
        name_len = -name_len;
    }
    out.push(name_len as u8);
    out.push(id as u8);
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(&(next as i16).to_le_bytes());
    Ok(())
}

/// Encode a group entry. The offset always points at the following entry;
/// the writer emits the terminator right after the last one.
pub(crate) fn encode_group(group: &ParamGroup, out: &mut Vec<u8>) -> Result<()> {
    check_name(&group.name)?;
    check_description(&group.name, &group.description)?;

    let next = 3 + group.description.len();
    push_framing(out, &group.name, group.id, group.locked, next)?;
    out.push(group.description.len() as u8);
    out.extend_from_slice(group.description.as_bytes());
    Ok(())
}

/// Encode a parameter entry, returning the offset of its payload within
/// `out` so the caller can patch it in place later.
pub(crate) fn encode_param(param: &Parameter, out: &mut Vec<u8>) -> Result<usize> {
    check_name(&param.name)?;
    check_description(&param.name, &param.description)?;
    param.value.validate(&param.name)?;

    let dims = param.value.dimensions();
    let content_len = 2 + dims.rank() + param.value.payload_len();
    let next = 3 + param.description.len() + content_len;
    push_framing(out, &param.name, param.id, param.locked, next)?;

    out.push(param.value.param_type().tag() as u8);
    out.push(dims.rank() as u8);
    out.extend_from_slice(dims.sizes());
    let payload_offset = out.len();
    param.value.encode_payload(out);
    out.push(param.description.len() as u8);
    out.extend_from_slice(param.description.as_bytes());
    Ok(payload_offset)
}

/// Append the all-zero terminator entry.
pub(crate) fn encode_terminator(out: &mut Vec<u8>) {
    out.extend_from_slice(&[0; crate::format::TERMINATOR_SIZE]);
}
