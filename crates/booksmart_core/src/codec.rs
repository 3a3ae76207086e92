//! Identifier codec between `Uuid` and the BSON wire representation.
//!
//! # Responsibility
//! - Encode stable identifiers as 16-byte binary values tagged with a subtype.
//! - Decode binary, null and undefined wire values back to `Uuid`.
//!
//! # Invariants
//! - One codec instance is built per store and shared by every mapper.
//! - `Null`/`Undefined` (and absent fields) decode to `Uuid::nil()`.
//! - Binary values carrying another subtype are rejected, never reinterpreted.

use bson::spec::{BinarySubtype, ElementType};
use bson::{Binary, Bson, Document};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Subtype marker for RFC 4122 UUIDs in BSON binary values.
pub const UUID_SUBTYPE: u8 = 0x04;

const UUID_LEN: usize = 16;

/// Decode failures for identifier wire values.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Binary value tagged with a subtype other than the codec marker.
    UnsupportedSubtype { expected: u8, actual: u8 },
    /// Wire value is neither binary, null nor undefined.
    UnsupportedWireType(ElementType),
    /// Binary payload does not hold exactly 16 bytes.
    InvalidLength(usize),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedSubtype { expected, actual } => write!(
                f,
                "unsupported binary subtype {actual:#04x} for UUID, expected {expected:#04x}"
            ),
            Self::UnsupportedWireType(kind) => write!(f, "cannot decode {kind:?} into a UUID"),
            Self::InvalidLength(len) => {
                write!(f, "UUID binary must hold {UUID_LEN} bytes, got {len}")
            }
        }
    }
}

impl Error for CodecError {}

/// Explicit UUID codec injected into the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdCodec {
    subtype: u8,
}

impl Default for IdCodec {
    fn default() -> Self {
        Self {
            subtype: UUID_SUBTYPE,
        }
    }
}

impl IdCodec {
    /// Creates a codec that tags binaries with a custom subtype marker.
    ///
    /// Used for stores written with the legacy `0x03` UUID representation.
    pub fn with_subtype(subtype: u8) -> Self {
        Self { subtype }
    }

    /// Returns the subtype marker written by `encode`.
    pub fn subtype(&self) -> u8 {
        self.subtype
    }

    pub fn encode(&self, id: Uuid) -> Bson {
        Bson::Binary(Binary {
            subtype: BinarySubtype::from(self.subtype),
            bytes: id.as_bytes().to_vec(),
        })
    }

    /// Decodes one wire value into a `Uuid`.
    ///
    /// # Errors
    /// - `UnsupportedSubtype` for binaries tagged with another marker.
    /// - `UnsupportedWireType` for any non-binary, non-null value.
    /// - `InvalidLength` for binaries that are not 16 bytes long.
    pub fn decode(&self, value: &Bson) -> Result<Uuid, CodecError> {
        match value {
            Bson::Binary(binary) => {
                let actual = u8::from(binary.subtype);
                if actual != self.subtype {
                    return Err(CodecError::UnsupportedSubtype {
                        expected: self.subtype,
                        actual,
                    });
                }
                let bytes: [u8; UUID_LEN] = binary
                    .bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| CodecError::InvalidLength(binary.bytes.len()))?;
                Ok(Uuid::from_bytes(bytes))
            }
            Bson::Null | Bson::Undefined => Ok(Uuid::nil()),
            other => Err(CodecError::UnsupportedWireType(other.element_type())),
        }
    }

    /// Decodes `field` from `doc`; an absent field behaves like `Null`.
    pub fn decode_field(&self, doc: &Document, field: &str) -> Result<Uuid, CodecError> {
        match doc.get(field) {
            Some(value) => self.decode(value),
            None => Ok(Uuid::nil()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CodecError, IdCodec, UUID_SUBTYPE};
    use bson::spec::{BinarySubtype, ElementType};
    use bson::{doc, Binary, Bson};
    use uuid::Uuid;

    #[test]
    fn encode_then_decode_returns_same_id() {
        let codec = IdCodec::default();
        let id = Uuid::new_v4();

        let encoded = codec.encode(id);
        match &encoded {
            Bson::Binary(binary) => {
                assert_eq!(u8::from(binary.subtype), UUID_SUBTYPE);
                assert_eq!(binary.bytes.len(), 16);
            }
            other => panic!("unexpected wire value: {other:?}"),
        }
        assert_eq!(codec.decode(&encoded).unwrap(), id);
    }

    #[test]
    fn null_and_undefined_decode_to_nil() {
        let codec = IdCodec::default();
        assert_eq!(codec.decode(&Bson::Null).unwrap(), Uuid::nil());
        assert_eq!(codec.decode(&Bson::Undefined).unwrap(), Uuid::nil());
    }

    #[test]
    fn absent_field_decodes_to_nil() {
        let codec = IdCodec::default();
        let doc = doc! { "title": "Dune" };
        assert_eq!(codec.decode_field(&doc, "reader_id").unwrap(), Uuid::nil());
    }

    #[test]
    fn foreign_subtype_is_rejected() {
        let codec = IdCodec::default();
        let value = Bson::Binary(Binary {
            subtype: BinarySubtype::UuidOld,
            bytes: Uuid::new_v4().as_bytes().to_vec(),
        });

        let err = codec.decode(&value).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnsupportedSubtype {
                expected: 0x04,
                actual: 0x03
            }
        );
    }

    #[test]
    fn legacy_codec_rejects_standard_subtype() {
        let legacy = IdCodec::with_subtype(0x03);
        let id = Uuid::new_v4();

        assert_eq!(legacy.decode(&legacy.encode(id)).unwrap(), id);
        let err = legacy.decode(&IdCodec::default().encode(id)).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedSubtype { actual: 0x04, .. }));
    }

    #[test]
    fn other_wire_types_are_rejected() {
        let codec = IdCodec::default();
        let err = codec
            .decode(&Bson::String(Uuid::new_v4().to_string()))
            .unwrap_err();
        assert_eq!(err, CodecError::UnsupportedWireType(ElementType::String));
    }

    #[test]
    fn short_binary_is_rejected() {
        let codec = IdCodec::default();
        let value = Bson::Binary(Binary {
            subtype: BinarySubtype::Uuid,
            bytes: vec![1, 2, 3],
        });
        assert_eq!(codec.decode(&value).unwrap_err(), CodecError::InvalidLength(3));
    }
}
