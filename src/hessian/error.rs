use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, HessianError>;

/// Errors produced while encoding or parsing Hessian 1.0.2 data.
#[derive(Debug, Error)]
pub enum HessianError {
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// Not enough bytes remained for a requested read.
	#[error("unexpected end of stream at offset {at}, need {need} bytes, remaining {rem}")]
	UnexpectedEndOfStream {
		/// Byte offset where the read was attempted.
		at: usize,
		/// Requested bytes.
		need: usize,
		/// Bytes still available.
		rem: usize,
	},
	/// Leading byte is neither a call nor a reply marker.
	#[error("message does not begin with a call or reply marker (got {marker:?})")]
	MissingEnvelope {
		/// Offending first byte.
		marker: u8,
	},
	/// Call/reply version bytes are not major 1, minor 0.
	#[error("unrecognized protocol version {major}.{minor} (expected 1.0)")]
	UnrecognizedVersion {
		/// Parsed major version byte.
		major: u8,
		/// Parsed minor version byte.
		minor: u8,
	},
	/// A second call or reply marker after the envelope was established.
	#[error("duplicate envelope marker {marker:?}")]
	DuplicateEnvelopeHeader {
		/// Offending second marker byte.
		marker: u8,
	},
	/// Method name, reply value, or fault set more than once.
	#[error("duplicate {field} in envelope")]
	DuplicateField {
		/// Logical field that was set twice.
		field: &'static str,
	},
	/// Method-name marker inside a reply, or fault marker inside a call.
	#[error("marker {marker:?} is illegal in the current envelope")]
	IllegalContext {
		/// Offending marker byte.
		marker: u8,
	},
	/// A non-final string/binary chunk not closed by the matching final marker.
	#[error("expected terminal chunk marker {expected:?}, got {got:?}")]
	MismatchedChunkTerminator {
		/// Final marker that would have closed the chunk sequence.
		expected: u8,
		/// Actual byte read.
		got: u8,
	},
	/// A byte that is not a recognized type marker where a value is expected.
	#[error("unknown type marker {marker:?} at offset {at}")]
	UnknownMarker {
		/// Offending marker byte.
		marker: u8,
		/// Byte offset of the marker.
		at: usize,
	},
	/// Back-reference index has no corresponding reference-table entry.
	#[error("back-reference index {index} out of range (table has {len} entries)")]
	BackReferenceOutOfRange {
		/// Requested table index.
		index: u32,
		/// Current table length.
		len: usize,
	},
	/// A decoded envelope header key is not a string.
	#[error("header key must be a string, got {got}")]
	InvalidHeaderKey {
		/// Logical kind of the decoded key value.
		got: &'static str,
	},
	/// A typed-map field key is not a string.
	#[error("object field key must be a string, got {got}")]
	InvalidObjectFieldKey {
		/// Logical kind of the decoded key value.
		got: &'static str,
	},
	/// String chunk contains a byte that is not a valid UTF-8 leading byte.
	#[error("invalid utf-8 leading byte 0x{byte:02x} at offset {at}")]
	InvalidUtf8Lead {
		/// Offending byte.
		byte: u8,
		/// Byte offset of the lead byte.
		at: usize,
	},
	/// Accumulated string bytes did not decode as UTF-8.
	#[error("invalid utf-8 sequence in string ending at offset {at}")]
	InvalidUtf8 {
		/// Byte offset just past the offending string.
		at: usize,
	},
	/// Fault map is missing a required field.
	#[error("fault is missing required field {field:?}")]
	FaultMissingField {
		/// Missing field name.
		field: &'static str,
	},
	/// Remote reference was not followed by a string URL.
	#[error("expected string url in remote reference, got marker {marker:?}")]
	RemoteUrlExpected {
		/// Offending marker byte.
		marker: u8,
	},
	/// A name was too long for its 2-byte wire length prefix.
	#[error("{what} length {len} exceeds 65535")]
	NameTooLong {
		/// Which name field overflowed.
		what: &'static str,
		/// Offending byte length.
		len: usize,
	},
	/// Encoder recursion depth exceeded the cycle guard.
	#[error("encode depth exceeded (max={max_depth}); value graph is cyclic or too deep")]
	EncodeDepthExceeded {
		/// Configured depth ceiling.
		max_depth: u32,
	},
}
