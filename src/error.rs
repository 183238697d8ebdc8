#![allow(missing_docs)]

use std::io::{Error, ErrorKind};

#[inline(always)]
pub(crate) fn io_err(msg: &str) -> Error {
    Error::new(ErrorKind::Other, msg)
}

pub type AnsonResult<T> = Result<T, AnsonErr>;

/// Errors returned from anson
#[derive(thiserror::Error, Debug)]
pub enum AnsonErr {
    // Encode errors
    #[error("Write failed")]
    EncodeFailed(#[source] std::io::Error),
    #[error("Encoding failed. Value does not match schema")]
    ValueSchemaMismatch,
    #[error("Mismatch in fixed value length: found {found}, expected {expected}")]
    FixedValueLenMismatch { found: usize, expected: usize },
    #[error("Enum value symbol not present in schema `symbols` field")]
    EnumSymbolNotPresent,
    #[error("Not a valid RFC 4122 uuid string: {0}")]
    InvalidUuid(String),
    #[error("Decimal unscaled value of {unscaled} bytes does not fit fixed size {size}")]
    DecimalTooLarge { unscaled: usize, size: usize },
    #[error("Unions must not contain immediate union values")]
    NoImmediateUnion,
    #[error("Value schema not found in union")]
    NotFoundInUnion,
    #[error("Union tag {index} out of range for {members} member union")]
    UnionTagOutOfRange { index: usize, members: usize },
    #[error("Record value is missing field `{0}` required by schema")]
    RecordFieldMissing(String),
    #[error("Named schema was not found for given value")]
    NamedSchemaNotFound,
    #[error("Failed building the Writer")]
    WriterBuildFailed,
    #[error("Json must be an object for record")]
    ExpectedJsonObject,

    // Decode errors
    #[error("Read failed")]
    DecodeFailed(#[source] std::io::Error),
    #[error("Stream ended before the current item was fully read")]
    UnexpectedEof,
    #[error("Invalid boolean byte: {0:#04x}, expected 0x00 or 0x01")]
    InvalidBoolean(u8),
    #[error("Varint exceeds the maximum of {limit} bytes")]
    VarintTooLong { limit: usize },
    #[error("Decoded integer out of range for {0}")]
    IntegerOverflow(&'static str),
    #[error("Negative length prefix: {0}")]
    NegativeLength(i64),
    #[error("Payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("Union index {index} out of range for {members} member union")]
    UnionIndexOutOfBounds { index: i64, members: usize },
    #[error("Index read for enum is out of range as per schema. got: {0} symbols: {1}")]
    InvalidEnumSymbolIdx(usize, String),

    // Container file errors
    #[error("Expected magic header: `Obj\\x01`")]
    InvalidDataFile,
    #[error("failed reading `avro.schema` metadata from header")]
    HeaderDecodeFailed,
    #[error("Sync marker does not match as expected")]
    SyncMarkerMismatch,
    #[error("Unsupported codec {0}, did you enable the feature?")]
    UnsupportedCodec(String),

    // Single-object encoding errors
    #[error("Expected single-object marker 0xC3 0x01, found {0:#04x} {1:#04x}")]
    InvalidSingleObjectMarker(u8, u8),
    #[error("No schema registered for fingerprint {0:#018x}")]
    UnknownFingerprint(u64),

    // Schema resolution errors
    #[error("Schema resolution failed. reader's schema {0} != writer's schema {1}")]
    SchemaResolutionFailed(String, String),
    #[error("Reader's record name does not match writer's record name")]
    RecordNameMismatch,
    #[error("Reader's enum name does not match writer's enum name")]
    EnumNameMismatch,
    #[error("Fixed schema names or sizes do not match")]
    FixedSchemaMismatch,
    #[error("Reader field `{0}` has no writer counterpart and no default")]
    FieldMissingDefault(String),
    #[error("Writer symbol `{0}` not in reader's symbols and reader declares no default")]
    EnumSymbolUnmapped(String),
    #[error("Writer schema not found in reader's union")]
    WriterNotInReader,
    #[error("Writer union branch {0} does not resolve against the reader schema")]
    UnresolvedUnionBranch(usize),

    // Schema parse errors
    #[error("Failed to parse avro schema")]
    SchemaParseErr(#[source] std::io::Error),
    #[error("Unknown schema, expecting a required `type` field in schema")]
    SchemaParseFailed,
    #[error("Expected the avro schema to be one of json string, object or an array")]
    UnknownSchema,
    #[error("Could not parse name from json value")]
    NameParseFailed,
    #[error("Names must be [A-Za-z_] and subsequently contain only [A-Za-z0-9_]")]
    InvalidName,
    #[error("namespaces must either be empty or follow the grammar <name>[(<dot><name>)*]")]
    InvalidNamespace,
    #[error("Duplicate definition of named schema")]
    DuplicateSchema,
    #[error("Duplicate field name in record schema")]
    DuplicateField,
    #[error("Duplicate symbol in enum schema")]
    DuplicateSymbol,
    #[error("Unions cannot have multiple schemas of same kind or immediate unions")]
    DuplicateSchemaInUnion,
    #[error("Record schema does not have a required field named `name`")]
    RecordNameNotFound,
    #[error("Record schema does not have a required field named `type`")]
    RecordTypeNotFound,
    #[error("Expected record fields to be a json array")]
    ExpectedFieldsJsonArray,
    #[error("Record's field json schema must be an object")]
    InvalidRecordFieldType,
    #[error("Unknown field ordering value")]
    UnknownFieldOrdering,
    #[error("Field ordering value must be a string")]
    InvalidFieldOrdering,
    #[error("Failed to parse symbol from enum's symbols field")]
    EnumSymbolParseErr,
    #[error("Enum schema must contain required `symbols` field")]
    EnumSymbolsMissing,
    #[error("Fixed schema `size` field must be a number")]
    FixedSizeNotNumber,
    #[error("Fixed schema `size` field missing")]
    FixedSizeNotFound,
    #[error("Invalid default value for given schema")]
    DefaultValueParse,
    #[error("Invalid default value for union. Must match the first entry from union definition")]
    FailedDefaultUnion,
    #[error("Primitive schema must be a string")]
    InvalidPrimitiveSchema,
    #[error("Parsing canonical form failed")]
    ParsingCanonicalForm,

    // Value errors
    #[error("Expected value not found in variant instance")]
    ExpectedVariantNotFound,
}
