use crate::{bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr, serde::Serde};

/// An unsigned integer written in groups of `BITS` bits, each group preceded
/// by a continuation bit. Small values stay small on the wire.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct UnsignedVariableInteger<const BITS: u8> {
    value: u64,
}

impl<const BITS: u8> UnsignedVariableInteger<BITS> {
    pub fn new<T: Into<u64>>(value: T) -> Self {
        if BITS == 0 || BITS >= 64 {
            panic!("UnsignedVariableInteger group size must be between 1 and 63 bits");
        }
        Self {
            value: value.into(),
        }
    }

    pub fn get(&self) -> u64 {
        self.value
    }
}

impl<const BITS: u8> Serde for UnsignedVariableInteger<BITS> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let mut value = self.value;
        loop {
            let proceed = value >= 1_u64 << BITS;
            writer.write_bit(proceed);
            for _ in 0..BITS {
                writer.write_bit(value & 1 != 0);
                value >>= 1;
            }
            if !proceed {
                return;
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let mut output: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let proceed = reader.read_bit()?;
            for _ in 0..BITS {
                let bit = reader.read_bit()?;
                if bit {
                    if shift >= 64 {
                        return Err(SerdeErr::IntegerOverflow);
                    }
                    output |= 1 << shift;
                }
                shift += 1;
            }
            if !proceed {
                return Ok(Self { value: output });
            }
            if shift >= 64 {
                return Err(SerdeErr::IntegerOverflow);
            }
        }
    }
}
