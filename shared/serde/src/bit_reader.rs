use crate::error::SerdeErr;

/// Reads bits in the order a [`BitWriter`](crate::BitWriter) wrote them
pub struct BitReader<'b> {
    buffer: &'b [u8],
    bit_index: usize,
}

impl<'b> BitReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            bit_index: 0,
        }
    }

    pub fn read_bit(&mut self) -> Result<bool, SerdeErr> {
        let byte_index = self.bit_index / 8;
        let Some(byte) = self.buffer.get(byte_index) else {
            return Err(SerdeErr::UnexpectedEnd {
                bit_index: self.bit_index,
            });
        };
        let bit = (byte >> (self.bit_index % 8)) & 1 != 0;
        self.bit_index += 1;
        Ok(bit)
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        let mut output: u8 = 0;
        for offset in 0..8 {
            if self.read_bit()? {
                output |= 1 << offset;
            }
        }
        Ok(output)
    }

    /// Whole bytes left to read, counting a partially consumed byte as gone
    pub fn bytes_remaining(&self) -> usize {
        let total_bits = self.buffer.len() * 8;
        total_bits.saturating_sub(self.bit_index) / 8
    }

    /// Fails unless at least `length` whole bytes remain. Used before
    /// allocating for a length-prefixed field.
    pub fn ensure_remaining(&self, length: u64) -> Result<(), SerdeErr> {
        let remaining = self.bytes_remaining();
        if length > remaining as u64 {
            return Err(SerdeErr::LengthOverflow { length, remaining });
        }
        Ok(())
    }
}
