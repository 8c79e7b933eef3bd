//! Bit-granular cursor over packet bytes.
//!
//! Wraps an immutable byte slice with a byte offset and a bit position
//! relative to it. Reads of up to 64 bits advance the position; byte-aligned
//! fast paths exist for single bytes and byte arrays, and `slice()` creates a
//! zero-copy view starting at the current (byte-aligned) position.
//!
//! Big-endian reads consume bits most-significant-first. Little-endian reads
//! use x86 struct-packing bit numbering: a field of `n` bits is read from the
//! `n` bits ending at `position + n`, last byte most significant. This is the
//! convention needed to unpack C bitfield structures dumped to a packet in
//! memory order.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::ExtractionError;

/// Byte order for multi-byte and sub-byte reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Big,
    Little,
}

/// Read cursor over a byte slice, addressable at bit granularity.
#[derive(Debug, Clone)]
pub struct BitBuffer<'a> {
    data: &'a [u8],
    /// Byte offset inside `data` where this buffer starts.
    offset: usize,
    /// Bit position relative to `offset`.
    position: usize,
    order: Endianness,
    mark: usize,
}

impl<'a> BitBuffer<'a> {
    /// Wraps `data` starting at byte offset 0.
    pub fn new(data: &'a [u8]) -> Self {
        BitBuffer::wrap(data, 0)
    }

    /// Wraps `data` starting at the given byte offset.
    pub fn wrap(data: &'a [u8], offset: usize) -> Self {
        BitBuffer {
            data,
            offset,
            position: 0,
            order: Endianness::Big,
            mark: 0,
        }
    }

    /// Size of the buffer in bits, from the offset to the end of the slice.
    pub fn size_in_bits(&self) -> usize {
        (self.data.len() - self.offset) * 8
    }

    /// Current bit position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Sets the bit position. Positions past the end are allowed; subsequent
    /// reads fail with `BufferUnderrun`.
    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Moves the position by `num_bits`.
    pub fn skip(&mut self, num_bits: usize) {
        self.position += num_bits;
    }

    /// Remembers the current position for a later [`BitBuffer::reset`].
    pub fn mark(&mut self) {
        self.mark = self.position;
    }

    /// Returns to the last marked position (0 if never marked).
    pub fn reset(&mut self) {
        self.position = self.mark;
    }

    pub fn byte_order(&self) -> Endianness {
        self.order
    }

    pub fn set_byte_order(&mut self, order: Endianness) {
        self.order = order;
    }

    /// Byte offset inside the backing slice where this buffer starts.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The full backing slice (not limited to this buffer's offset).
    pub fn array(&self) -> &'a [u8] {
        self.data
    }

    /// Remaining whole bytes from the current position to the end.
    /// Position must be byte-aligned.
    pub fn remaining_bytes(&self) -> Result<usize, ExtractionError> {
        self.ensure_byte_boundary()?;
        Ok(self.data.len() - self.offset - (self.position >> 3))
    }

    /// A new buffer over the same bytes, starting at the current byte-aligned
    /// position of this one. Positions are independent afterwards.
    pub fn slice(&self) -> Result<BitBuffer<'a>, ExtractionError> {
        self.ensure_byte_boundary()?;
        Ok(BitBuffer::wrap(self.data, self.offset + (self.position >> 3)))
    }

    /// Reads `num_bits` (1..=64) into the low bits of a u64, advancing the
    /// position.
    pub fn get_bits(&mut self, num_bits: usize) -> Result<u64, ExtractionError> {
        debug_assert!(num_bits >= 1 && num_bits <= 64, "num_bits {num_bits}");
        self.check_remaining(num_bits)?;
        // Aligned whole-byte reads go through byteorder.
        if self.position & 7 == 0 && num_bits & 7 == 0 {
            let start = self.offset + (self.position >> 3);
            let buf = &self.data[start..start + (num_bits >> 3)];
            self.position += num_bits;
            return Ok(read_aligned(buf, self.order));
        }
        Ok(match self.order {
            Endianness::Big => self.get_bits_be(num_bits),
            Endianness::Little => self.get_bits_le(num_bits),
        })
    }

    /// Like [`BitBuffer::get_bits`] but sign-extends the result.
    pub fn get_signed_bits(&mut self, num_bits: usize) -> Result<i64, ExtractionError> {
        let v = self.get_bits(num_bits)?;
        let n = 64 - num_bits as u32;
        Ok(((v << n) as i64) >> n)
    }

    /// Reads one byte. Position must be byte-aligned.
    pub fn get_byte(&mut self) -> Result<u8, ExtractionError> {
        self.ensure_byte_boundary()?;
        self.check_remaining(8)?;
        let b = self.data[self.offset + (self.position >> 3)];
        self.position += 8;
        Ok(b)
    }

    /// Reads `len` bytes. Byte-aligned positions copy the slice directly;
    /// unaligned positions fall back to a bit-shifted copy.
    pub fn get_byte_array(&mut self, len: usize) -> Result<Vec<u8>, ExtractionError> {
        self.check_remaining(len * 8)?;
        if self.position & 7 == 0 {
            let start = self.offset + (self.position >> 3);
            self.position += len * 8;
            Ok(self.data[start..start + len].to_vec())
        } else {
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                out.push(self.get_bits(8)? as u8);
            }
            Ok(out)
        }
    }

    fn check_remaining(&self, num_bits: usize) -> Result<(), ExtractionError> {
        let size = self.size_in_bits();
        if self.position + num_bits > size {
            return Err(ExtractionError::BufferUnderrun {
                position: self.position,
                need: num_bits,
                available: size.saturating_sub(self.position),
            });
        }
        Ok(())
    }

    fn ensure_byte_boundary(&self) -> Result<(), ExtractionError> {
        if self.position & 7 != 0 {
            return Err(ExtractionError::Unaligned {
                position: self.position,
            });
        }
        Ok(())
    }

    fn byte(&self, bytepos: usize) -> u64 {
        self.data[self.offset + bytepos] as u64
    }

    fn get_bits_be(&mut self, num_bits: usize) -> u64 {
        let mut r: u64 = 0;
        let mut bytepos = self.position >> 3;
        let mut n = num_bits;
        // bits from the position until the end of the first byte
        let fbb = (8 - (self.position & 7)) & 7;
        if fbb > 0 {
            if n <= fbb {
                self.position += num_bits;
                return (self.byte(bytepos) >> (fbb - n)) & ((1 << n) - 1);
            }
            r = self.byte(bytepos) & ((1 << fbb) - 1);
            n -= fbb;
            bytepos += 1;
        }
        while n > 8 {
            r = (r << 8) | self.byte(bytepos);
            n -= 8;
            bytepos += 1;
        }
        r = (r << n) | (self.byte(bytepos) >> (8 - n));
        self.position += num_bits;
        r
    }

    fn get_bits_le(&mut self, num_bits: usize) -> u64 {
        let mut r: u64 = 0;
        let mut bytepos = (self.position + num_bits - 1) >> 3;
        let mut n = num_bits;
        // bits to be read from the last byte, which is the most significant
        let lbb = (self.position + num_bits) & 7;
        if lbb > 0 {
            if lbb >= n {
                self.position += num_bits;
                return (self.byte(bytepos) >> (lbb - n)) & ((1 << n) - 1);
            }
            r = self.byte(bytepos) & ((1 << lbb) - 1);
            n -= lbb;
            bytepos -= 1;
        }
        while n > 8 {
            r = (r << 8) | self.byte(bytepos);
            n -= 8;
            bytepos -= 1;
        }
        r = (r << n) | (self.byte(bytepos) >> (8 - n));
        self.position += num_bits;
        r
    }
}

fn read_aligned(buf: &[u8], order: Endianness) -> u64 {
    match order {
        Endianness::Big => match buf.len() {
            1 => buf[0] as u64,
            2 => BigEndian::read_u16(buf) as u64,
            4 => BigEndian::read_u32(buf) as u64,
            8 => BigEndian::read_u64(buf),
            n => BigEndian::read_uint(buf, n),
        },
        Endianness::Little => match buf.len() {
            1 => buf[0] as u64,
            2 => LittleEndian::read_u16(buf) as u64,
            4 => LittleEndian::read_u32(buf) as u64,
            8 => LittleEndian::read_u64(buf),
            n => LittleEndian::read_uint(buf, n),
        },
    }
}
