use crate::{bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr};

/// A value that can be written to and read back from the wire
pub trait Serde: Sized {
    /// Writes the value into the bit stream
    fn ser(&self, writer: &mut dyn BitWrite);

    /// Parses a value from the bit stream
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr>;
}
