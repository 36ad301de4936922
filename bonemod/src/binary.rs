//! Compressed binary block holding a list of bone modifiers.
//!
//! The codec is IO-free: it operates on in-memory byte slices. The uncompressed layout is
//! big-endian; the compressed block carries a little-endian `u32` uncompressed length in
//! front of the LZ4 payload.

use crate::{BoneLocation, BoneModifier, BoneModifierData, Error};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use glam::Vec3;

const FLOATS_PER_SLOT: usize = 9;
// Refuse to allocate absurd buffers for corrupted length prefixes.
const MAX_UNCOMPRESSED_LEN: usize = 64 * 1024 * 1024;

#[derive(Clone, Debug)]
struct BinaryInput<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> BinaryInput<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.cursor)
    }

    fn eof() -> Error {
        Error::Decode {
            message: "unexpected EOF".to_string(),
        }
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        let b = *self.bytes.get(self.cursor).ok_or_else(Self::eof)?;
        self.cursor += 1;
        Ok(b)
    }

    fn read_i32_be(&mut self) -> Result<i32, Error> {
        if self.remaining() < 4 {
            return Err(Self::eof());
        }
        let v = BigEndian::read_i32(&self.bytes[self.cursor..self.cursor + 4]);
        self.cursor += 4;
        Ok(v)
    }

    fn read_u32_be(&mut self) -> Result<u32, Error> {
        Ok(self.read_i32_be()? as u32)
    }

    fn read_f32_be(&mut self) -> Result<f32, Error> {
        if self.remaining() < 4 {
            return Err(Self::eof());
        }
        let v = BigEndian::read_f32(&self.bytes[self.cursor..self.cursor + 4]);
        self.cursor += 4;
        Ok(v)
    }

    fn read_varint(&mut self) -> Result<u32, Error> {
        let mut value: u32 = 0;
        for shift in [0u32, 7, 14, 21, 28] {
            let b = self.read_u8()?;
            value |= ((b & 0x7F) as u32) << shift;
            if (b & 0x80) == 0 {
                return Ok(value);
            }
        }
        Ok(value)
    }

    /// Length-prefixed UTF-8; a stored length of 0 means "no string", 1 means "".
    fn read_string(&mut self) -> Result<Option<String>, Error> {
        let length = self.read_varint()? as usize;
        if length == 0 {
            return Ok(None);
        }
        let byte_len = length - 1;
        if self.remaining() < byte_len {
            return Err(Error::Decode {
                message: format!(
                    "unexpected EOF while reading string (len={byte_len}) at offset {}",
                    self.cursor
                ),
            });
        }
        let raw = &self.bytes[self.cursor..self.cursor + byte_len];
        self.cursor += byte_len;
        String::from_utf8(raw.to_vec())
            .map(Some)
            .map_err(|e| Error::Decode {
                message: format!("invalid UTF-8 in string: {e}"),
            })
    }

    fn read_bone_name(&mut self) -> Result<String, Error> {
        match self.read_string()? {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(Error::Decode {
                message: format!("missing bone name at offset {}", self.cursor),
            }),
        }
    }

    fn read_vec3(&mut self) -> Result<Vec3, Error> {
        Ok(Vec3::new(
            self.read_f32_be()?,
            self.read_f32_be()?,
            self.read_f32_be()?,
        ))
    }

    fn read_slot(&mut self) -> Result<BoneModifierData, Error> {
        let scale = self.read_vec3()?;
        let position = self.read_vec3()?;
        let rotation = self.read_vec3()?;
        Ok(BoneModifierData::new(scale, position, rotation))
    }

    fn read_count(&mut self, min_item_len: usize) -> Result<usize, Error> {
        let count = self.read_u32_be()? as usize;
        if count.saturating_mul(min_item_len) > self.remaining() {
            return Err(Error::Decode {
                message: format!("count {count} exceeds remaining {} bytes", self.remaining()),
            });
        }
        Ok(count)
    }

    fn finish(&self) -> Result<(), Error> {
        if self.remaining() != 0 {
            return Err(Error::Decode {
                message: format!("{} trailing bytes", self.remaining()),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct BinaryOutput {
    bytes: Vec<u8>,
}

impl BinaryOutput {
    fn write_u32_be(&mut self, v: u32) {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, v);
        self.bytes.extend_from_slice(&buf);
    }

    fn write_i32_be(&mut self, v: i32) {
        let mut buf = [0u8; 4];
        BigEndian::write_i32(&mut buf, v);
        self.bytes.extend_from_slice(&buf);
    }

    fn write_f32_be(&mut self, v: f32) {
        let mut buf = [0u8; 4];
        BigEndian::write_f32(&mut buf, v);
        self.bytes.extend_from_slice(&buf);
    }

    fn write_varint(&mut self, mut v: u32) {
        while v >= 0x80 {
            self.bytes.push((v as u8 & 0x7F) | 0x80);
            v >>= 7;
        }
        self.bytes.push(v as u8);
    }

    fn write_string(&mut self, s: &str) {
        self.write_varint(s.len() as u32 + 1);
        self.bytes.extend_from_slice(s.as_bytes());
    }

    fn write_vec3(&mut self, v: Vec3) {
        self.write_f32_be(v.x);
        self.write_f32_be(v.y);
        self.write_f32_be(v.z);
    }

    fn write_slot(&mut self, data: &BoneModifierData) {
        self.write_vec3(data.scale);
        self.write_vec3(data.position);
        self.write_vec3(data.rotation);
    }
}

fn compress(raw: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; 4];
    LittleEndian::write_u32(&mut out, raw.len() as u32);
    out.extend_from_slice(&lz4_flex::block::compress(raw));
    out
}

fn decompress(block: &[u8]) -> Result<Vec<u8>, Error> {
    if block.len() < 4 {
        return Err(Error::Decompress {
            message: format!("block too short ({} bytes)", block.len()),
        });
    }
    let len = LittleEndian::read_u32(&block[..4]) as usize;
    if len > MAX_UNCOMPRESSED_LEN {
        return Err(Error::Decompress {
            message: format!("declared length {len} is too large"),
        });
    }
    lz4_flex::block::decompress(&block[4..], len).map_err(|e| Error::Decompress {
        message: e.to_string(),
    })
}

/// Encodes modifiers (name, location and every coordinate slot) into a compressed block.
pub fn encode_modifier_list(modifiers: &[BoneModifier]) -> Vec<u8> {
    let mut out = BinaryOutput::default();
    out.write_u32_be(modifiers.len() as u32);
    for modifier in modifiers {
        out.write_string(modifier.bone_name());
        out.write_i32_be(modifier.location().ordinal());
        let slots = modifier.coordinate_data();
        out.write_varint(slots.len() as u32);
        for slot in slots {
            out.write_slot(slot);
        }
    }
    compress(&out.bytes)
}

pub fn decode_modifier_list(block: &[u8]) -> Result<Vec<BoneModifier>, Error> {
    let raw = decompress(block)?;
    let mut input = BinaryInput::new(&raw);
    // name (>= 2 bytes) + location + slot count
    let count = input.read_count(7)?;
    let mut modifiers = Vec::with_capacity(count);
    for _ in 0..count {
        let name = input.read_bone_name()?;
        let location = BoneLocation::from_ordinal(input.read_i32_be()?);
        let slot_count = input.read_varint()? as usize;
        if slot_count.saturating_mul(FLOATS_PER_SLOT * 4) > input.remaining() {
            return Err(Error::Decode {
                message: format!("slot count {slot_count} for bone '{name}' exceeds data"),
            });
        }
        let mut slots = Vec::with_capacity(slot_count);
        for _ in 0..slot_count {
            slots.push(input.read_slot()?);
        }
        modifiers.push(BoneModifier::with_data(name, location, slots));
    }
    input.finish()?;
    Ok(modifiers)
}

/// Encodes the oldest schema: one delta per bone name, no location.
pub fn encode_bone_dictionary(entries: &[(String, BoneModifierData)]) -> Vec<u8> {
    let mut out = BinaryOutput::default();
    out.write_u32_be(entries.len() as u32);
    for (name, data) in entries {
        out.write_string(name);
        out.write_slot(data);
    }
    compress(&out.bytes)
}

/// Decodes the oldest schema into modifiers with `Unknown` location.
pub fn decode_bone_dictionary(block: &[u8]) -> Result<Vec<BoneModifier>, Error> {
    let raw = decompress(block)?;
    let mut input = BinaryInput::new(&raw);
    let count = input.read_count(2 + FLOATS_PER_SLOT * 4)?;
    let mut modifiers = Vec::with_capacity(count);
    for _ in 0..count {
        let name = input.read_bone_name()?;
        let data = input.read_slot()?;
        modifiers.push(BoneModifier::with_data(name, BoneLocation::Unknown, vec![data]));
    }
    input.finish()?;
    Ok(modifiers)
}
