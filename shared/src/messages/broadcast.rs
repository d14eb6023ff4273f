use roster_serde::{BitReader, BitWrite, BitWriter, Serde, SerdeErr, UnsignedVariableInteger};

use crate::{
    facet::{error::FacetError, facet_kinds::FacetKinds},
    record::record::Record,
};

type RecordCount = UnsignedVariableInteger<7>;

/// Structural change a client asks the server to make
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryOperation {
    Add,
    Remove,
}

/// Why the server replaced a client's view
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncReason {
    /// Unconditional refresh
    Refresh,
    /// A record was added or removed
    RosterChanged,
    /// The recipient attempted a write it is not allowed to make
    PermissionDenied,
}

/// Every message exchanged between a registry server and its clients
#[derive(Clone, Debug, PartialEq)]
pub enum Broadcast {
    /// Client -> server while joining: every locally owned record
    Join { records: Vec<Record> },
    /// Client -> server once in use
    Operation {
        record: Record,
        operation: RegistryOperation,
    },
    /// Server -> client: full replacement of the client's view
    Sync {
        records: Vec<Record>,
        reason: SyncReason,
    },
    /// Either direction: one facet of one record changed. When the record no
    /// longer carries the named facet, the facet was cleared.
    Update {
        record: Record,
        facet_type_name: String,
    },
}

impl Broadcast {
    pub fn name(&self) -> &'static str {
        match self {
            Broadcast::Join { .. } => "Join",
            Broadcast::Operation { .. } => "Operation",
            Broadcast::Sync { .. } => "Sync",
            Broadcast::Update { .. } => "Update",
        }
    }

    pub fn ser(&self, writer: &mut dyn BitWrite) -> Result<(), FacetError> {
        // encode every record up front so a failing facet writes nothing
        let mut body = BitWriter::new();
        match self {
            Broadcast::Join { records } => {
                0_u8.ser(&mut body);
                write_records(records, &mut body)?;
            }
            Broadcast::Operation { record, operation } => {
                1_u8.ser(&mut body);
                let operation: u8 = match operation {
                    RegistryOperation::Add => 0,
                    RegistryOperation::Remove => 1,
                };
                operation.ser(&mut body);
                record.ser(&mut body)?;
            }
            Broadcast::Sync { records, reason } => {
                2_u8.ser(&mut body);
                let reason: u8 = match reason {
                    SyncReason::Refresh => 0,
                    SyncReason::RosterChanged => 1,
                    SyncReason::PermissionDenied => 2,
                };
                reason.ser(&mut body);
                write_records(records, &mut body)?;
            }
            Broadcast::Update {
                record,
                facet_type_name,
            } => {
                3_u8.ser(&mut body);
                facet_type_name.ser(&mut body);
                record.ser(&mut body)?;
            }
        }
        body.write_into(writer);
        Ok(())
    }

    pub fn de(reader: &mut BitReader, facet_kinds: &FacetKinds) -> Result<Self, SerdeErr> {
        let tag = u8::de(reader)?;
        match tag {
            0 => Ok(Broadcast::Join {
                records: read_records(reader, facet_kinds)?,
            }),
            1 => {
                let operation = match u8::de(reader)? {
                    0 => RegistryOperation::Add,
                    1 => RegistryOperation::Remove,
                    tag => {
                        return Err(SerdeErr::UnknownTag {
                            type_name: "RegistryOperation",
                            tag,
                        })
                    }
                };
                let record = Record::de(reader, facet_kinds)?;
                Ok(Broadcast::Operation { record, operation })
            }
            2 => {
                let reason = match u8::de(reader)? {
                    0 => SyncReason::Refresh,
                    1 => SyncReason::RosterChanged,
                    2 => SyncReason::PermissionDenied,
                    tag => {
                        return Err(SerdeErr::UnknownTag {
                            type_name: "SyncReason",
                            tag,
                        })
                    }
                };
                let records = read_records(reader, facet_kinds)?;
                Ok(Broadcast::Sync { records, reason })
            }
            3 => {
                let facet_type_name = String::de(reader)?;
                let record = Record::de(reader, facet_kinds)?;
                Ok(Broadcast::Update {
                    record,
                    facet_type_name,
                })
            }
            tag => Err(SerdeErr::UnknownTag {
                type_name: "Broadcast",
                tag,
            }),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, FacetError> {
        let mut writer = BitWriter::new();
        self.ser(&mut writer)?;
        Ok(writer.to_bytes())
    }

    pub fn from_bytes(bytes: &[u8], facet_kinds: &FacetKinds) -> Result<Self, SerdeErr> {
        let mut reader = BitReader::new(bytes);
        let broadcast = Self::de(&mut reader, facet_kinds)?;
        // only the zero padding of the final byte may stay unread
        let remaining = reader.bytes_remaining();
        if remaining > 0 {
            return Err(SerdeErr::TrailingBytes { remaining });
        }
        Ok(broadcast)
    }
}

fn write_records(records: &[Record], writer: &mut dyn BitWrite) -> Result<(), FacetError> {
    RecordCount::new(records.len() as u64).ser(writer);
    for record in records {
        record.ser(writer)?;
    }
    Ok(())
}

fn read_records(reader: &mut BitReader, facet_kinds: &FacetKinds) -> Result<Vec<Record>, SerdeErr> {
    let count = RecordCount::de(reader)?.get();
    // each record costs at least one byte
    reader.ensure_remaining(count)?;
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        records.push(Record::de(reader, facet_kinds)?);
    }
    Ok(records)
}
