//! The parameter directory: a parsed section of groups and parameters.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::format::{
    blocks_spanned, BLOCK_SIZE, PARAM_SECTION_KEY, PROCESSOR_INTEL, PROLOGUE_RESERVED,
    PROLOGUE_SIZE, TERMINATOR_SIZE,
};
use crate::util::{Error, Result};

use super::entry::{self, Cursor, DecodedEntry, EntryKind, ParamGroup, Parameter};
use super::value::ParamValue;

/// All parameter groups of a file, in declaration order, with a
/// case-insensitive name index.
#[derive(Clone, Debug, Default)]
pub struct ParamDirectory {
    groups: Vec<ParamGroup>,
    /// Uppercased group name to index in `groups`
    index: HashMap<String, usize>,
}

/// Byte range of one parameter's payload inside the encoded section.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PayloadSpan {
    pub offset: usize,
    pub len: usize,
}

/// Result of encoding a directory: the padded section bytes plus the
/// layout facts the writer needs.
pub(crate) struct EncodedDirectory {
    /// Full section, zero-padded to a block boundary
    pub bytes: Vec<u8>,
    /// Number of 512-byte blocks the section spans
    pub blocks: usize,
    /// 1-based block index where point data will start
    pub data_start_block: u16,
    /// `GROUP:PARAM` (uppercase) to payload position within `bytes`
    pub param_spans: HashMap<String, PayloadSpan>,
}

impl ParamDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups in declaration order.
    pub fn groups(&self) -> &[ParamGroup] {
        &self.groups
    }

    /// Look up a group by name, ignoring ASCII case.
    pub fn group(&self, name: &str) -> Option<&ParamGroup> {
        self.index
            .get(&name.to_ascii_uppercase())
            .map(|&i| &self.groups[i])
    }

    /// Look up a group by its negative id.
    pub fn group_by_id(&self, id: i8) -> Option<&ParamGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    fn group_by_id_mut(&mut self, id: i8) -> Option<&mut ParamGroup> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    /// Split a `GROUP:PARAMETER` path into its two components.
    pub fn split_path(path: &str) -> Result<(&str, &str)> {
        match path.split_once(':') {
            Some((g, p)) if !g.is_empty() && !p.is_empty() && !p.contains(':') => Ok((g, p)),
            _ => Err(Error::InvalidPath(path.to_string())),
        }
    }

    /// Resolve a parameter by `GROUP:PARAMETER` path, ignoring ASCII case.
    pub fn get(&self, path: &str) -> Result<&Parameter> {
        let (g, p) = Self::split_path(path)?;
        let group = self
            .group(g)
            .ok_or_else(|| Error::GroupNotFound(g.to_ascii_uppercase()))?;
        group.param(p).ok_or_else(|| {
            Error::ParameterNotFound(format!(
                "{}:{}",
                g.to_ascii_uppercase(),
                p.to_ascii_uppercase()
            ))
        })
    }

    pub(crate) fn get_mut(&mut self, path: &str) -> Result<&mut Parameter> {
        let (g, p) = Self::split_path(path)?;
        let gi = *self
            .index
            .get(&g.to_ascii_uppercase())
            .ok_or_else(|| Error::GroupNotFound(g.to_ascii_uppercase()))?;
        let key = format!("{}:{}", g.to_ascii_uppercase(), p.to_ascii_uppercase());
        self.groups[gi]
            .param_mut(p)
            .ok_or(Error::ParameterNotFound(key))
    }

    /// Set a parameter value, creating the group and parameter if needed.
    /// New groups take the lowest free negative id.
    pub(crate) fn set_value(
        &mut self,
        group: &str,
        param: &str,
        value: ParamValue,
    ) -> Result<()> {
        let gi = match self.index.get(&group.to_ascii_uppercase()) {
            Some(&i) => i,
            None => self.create_group(group)?,
        };
        let g = &mut self.groups[gi];
        match g.param_mut(param) {
            Some(p) => p.value = value,
            None => {
                let id = g.id;
                g.params.push(Parameter::new(param, -id, value));
            }
        }
        Ok(())
    }

    /// Set a group's description, creating the group if needed.
    pub(crate) fn describe_group(&mut self, group: &str, description: &str) -> Result<()> {
        let gi = match self.index.get(&group.to_ascii_uppercase()) {
            Some(&i) => i,
            None => self.create_group(group)?,
        };
        self.groups[gi].description = description.to_string();
        Ok(())
    }

    /// Set a parameter's description. The parameter must already exist.
    pub(crate) fn describe_param(&mut self, path: &str, description: &str) -> Result<()> {
        self.get_mut(path)?.description = description.to_string();
        Ok(())
    }

    fn create_group(&mut self, name: &str) -> Result<usize> {
        let id = self.next_free_id()?;
        self.index
            .insert(name.to_ascii_uppercase(), self.groups.len());
        self.groups.push(ParamGroup::new(name, id));
        Ok(self.groups.len() - 1)
    }

    fn next_free_id(&self) -> Result<i8> {
        for mag in 1..=127i8 {
            if self.group_by_id(-mag).is_none() {
                return Ok(-mag);
            }
        }
        Err(Error::directory("no free group ids left"))
    }

    /// Parse a full parameter section, prologue included.
    ///
    /// The chain is walked entry by entry until one declares no follower.
    /// Declared offsets larger than an entry's actual size are tolerated;
    /// the surplus bytes are skipped. Parameters referencing a group the
    /// section never defines are a format fault.
    pub fn parse(section: &[u8]) -> Result<Self> {
        if section.len() < PROLOGUE_SIZE + TERMINATOR_SIZE {
            return Err(Error::directory(format!(
                "section of {} bytes is too small",
                section.len()
            )));
        }
        if section[1] != PARAM_SECTION_KEY {
            return Err(Error::directory("prologue key byte missing"));
        }
        if section[3] != PROCESSOR_INTEL {
            return Err(Error::directory(format!(
                "unsupported processor type {}",
                section[3]
            )));
        }

        let mut dir = Self::default();
        let mut pending: Vec<Parameter> = Vec::new();
        let mut cur = Cursor::new(section, PROLOGUE_SIZE);
        loop {
            let DecodedEntry { kind, next } = entry::decode_entry(&mut cur)?;
            match kind {
                EntryKind::Group(g) => dir.add_group(g),
                EntryKind::Param(p) => pending.push(p),
                EntryKind::Empty => {}
            }
            match next {
                Some(pos) => cur.seek(pos)?,
                None => break,
            }
        }

        for p in pending {
            let Some(g) = dir.group_by_id_mut(-p.id) else {
                return Err(Error::directory(format!(
                    "parameter {} references undefined group {}",
                    p.name, p.id
                )));
            };
            if g.param(&p.name).is_some() {
                warn!(group = %g.name, param = %p.name, "duplicate parameter, keeping the later one");
            }
            g.insert_param(p);
        }

        debug!(groups = dir.groups.len(), "parsed parameter directory");
        Ok(dir)
    }

    /// Insert a pre-built group. An existing group with the same name is
    /// replaced; clashing ids are tolerated with a warning.
    pub(crate) fn add_group(&mut self, g: ParamGroup) {
        let key = g.name.to_ascii_uppercase();
        if let Some(&i) = self.index.get(&key) {
            warn!(group = %g.name, "duplicate group name, keeping the later definition");
            self.groups[i] = g;
            return;
        }
        if self.group_by_id(g.id).is_some() {
            warn!(group = %g.name, id = g.id, "duplicate group id");
        }
        self.index.insert(key, self.groups.len());
        self.groups.push(g);
    }

    /// Encode the directory into a zero-padded section.
    ///
    /// The block count lands in the prologue and, because the section sits
    /// right after the header block, point data starts at block
    /// `blocks + 2`. That value is patched into the `POINT:DATA_START`
    /// payload (on the wire and in memory) so the declared layout always
    /// matches the produced one.
    pub(crate) fn encode(&mut self) -> Result<EncodedDirectory> {
        let mut bytes = vec![PROLOGUE_RESERVED, PARAM_SECTION_KEY, 0, PROCESSOR_INTEL];
        let mut param_spans = HashMap::new();

        for g in &self.groups {
            entry::encode_group(g, &mut bytes)?;
            for p in &g.params {
                let offset = entry::encode_param(p, &mut bytes)?;
                let key = format!(
                    "{}:{}",
                    g.name.to_ascii_uppercase(),
                    p.name.to_ascii_uppercase()
                );
                param_spans.insert(
                    key,
                    PayloadSpan {
                        offset,
                        len: p.value.payload_len(),
                    },
                );
            }
        }
        entry::encode_terminator(&mut bytes);

        let blocks = blocks_spanned(bytes.len());
        if blocks > 255 {
            return Err(Error::directory(format!(
                "directory spans {} blocks, the prologue counter holds at most 255",
                blocks
            )));
        }
        bytes[2] = blocks as u8;
        let data_start_block = (blocks + 2) as u16;

        if let Some(span) = param_spans.get("POINT:DATA_START") {
            if span.len == 2 {
                bytes[span.offset..span.offset + 2]
                    .copy_from_slice(&(data_start_block as i16).to_le_bytes());
            }
        }
        if let Ok(p) = self.get_mut("POINT:DATA_START") {
            if let ParamValue::Int16(v) = &mut p.value {
                *v = data_start_block as i16;
            }
        }

        bytes.resize(blocks * BLOCK_SIZE, 0);
        debug!(blocks, data_start_block, "encoded parameter directory");

        Ok(EncodedDirectory {
            bytes,
            blocks,
            data_start_block,
            param_spans,
        })
    }
}
