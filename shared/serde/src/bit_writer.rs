/// Sink for bit-level serialization
pub trait BitWrite {
    fn write_bit(&mut self, bit: bool);
    fn write_byte(&mut self, byte: u8);
    fn bits_written(&self) -> u32;
}

/// A growable BitWrite implementation.
/// Bits are packed LSB first; a partially filled trailing byte is padded
/// with zeros when the writer is turned into bytes.
pub struct BitWriter {
    scratch: u8,
    scratch_index: u8,
    buffer: Vec<u8>,
    bits_written: u32,
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            scratch: 0,
            scratch_index: 0,
            buffer: Vec::with_capacity(512),
            bits_written: 0,
        }
    }

    fn flush_scratch(&mut self) {
        if self.scratch_index > 0 {
            let byte = (self.scratch << (8 - self.scratch_index)).reverse_bits();
            self.buffer.push(byte);
            self.scratch = 0;
            self.scratch_index = 0;
        }
    }

    pub fn to_bytes(mut self) -> Vec<u8> {
        self.flush_scratch();
        self.buffer
    }

    /// Replays everything written so far onto `writer`, bit for bit, with
    /// no padding
    pub fn write_into(self, writer: &mut dyn BitWrite) {
        for byte in &self.buffer {
            writer.write_byte(*byte);
        }
        // oldest pending bit sits highest in scratch
        for index in (0..self.scratch_index).rev() {
            writer.write_bit((self.scratch >> index) & 1 != 0);
        }
    }
}

impl BitWrite for BitWriter {
    fn write_bit(&mut self, bit: bool) {
        self.scratch <<= 1;

        if bit {
            self.scratch |= 1;
        }

        self.scratch_index += 1;
        self.bits_written += 1;

        if self.scratch_index >= 8 {
            self.buffer.push(self.scratch.reverse_bits());
            self.scratch_index = 0;
            self.scratch = 0;
        }
    }

    fn write_byte(&mut self, byte: u8) {
        let mut temp = byte;
        for _ in 0..8 {
            self.write_bit(temp & 1 != 0);
            temp >>= 1;
        }
    }

    fn bits_written(&self) -> u32 {
        self.bits_written
    }
}
