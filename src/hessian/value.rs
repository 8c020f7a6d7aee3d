use std::cell::RefCell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Protocol value — the closed set of values the codec produces or consumes.
///
/// Composite variants (`List`, `Map`, `Object`) are shared handles: a decoded
/// back-reference resolves to the same instance it points at, and
/// self-referential structures stay representable.
#[derive(Debug, Clone)]
pub enum Value {
	/// Explicit null marker.
	Null,
	/// Boolean scalar.
	Bool(bool),
	/// 32-bit signed integer.
	Int(i32),
	/// 64-bit signed integer (distinct wire tag from `Int`).
	Long(i64),
	/// 64-bit IEEE-754 float.
	Double(f64),
	/// Instant as milliseconds since the Unix epoch.
	Date(i64),
	/// Unicode string (wire length counts codepoints, not bytes).
	String(String),
	/// Opaque byte payload.
	Binary(Vec<u8>),
	/// Ordered sequence, fixed-count or open-ended.
	List(Rc<RefCell<ListValue>>),
	/// Ordered key/value mapping with arbitrary keys.
	Map(Rc<RefCell<MapValue>>),
	/// Typed map: a class name plus named fields.
	Object(Rc<RefCell<ObjectValue>>),
	/// Reference to a remote object by type name and URL.
	Remote(Remote),
}

/// List payload with its wire-count mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ListValue {
	/// Whether the wire declaration carries a fixed element count.
	pub fixed: bool,
	/// Elements in order.
	pub elements: Vec<Value>,
}

/// Untyped map payload. Entry order is preserved for round-trip fidelity.
#[derive(Debug, Clone, PartialEq)]
pub struct MapValue {
	/// Key/value pairs in insertion order.
	pub entries: Vec<(Value, Value)>,
}

/// Typed-map payload: dot-qualified class name plus named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectValue {
	/// Full dot-qualified type name as written on the wire.
	pub type_name: String,
	/// Named fields in insertion order.
	pub fields: Vec<(String, Value)>,
}

/// Reference to a remote object.
#[derive(Debug, Clone, PartialEq)]
pub struct Remote {
	/// Optional remote interface type name.
	pub type_name: Option<String>,
	/// Endpoint URL.
	pub url: String,
}

impl Value {
	/// Build an open-ended (length-unknown) list value.
	pub fn list(elements: Vec<Value>) -> Self {
		Value::List(Rc::new(RefCell::new(ListValue { fixed: false, elements })))
	}

	/// Build a fixed-count list value.
	pub fn fixed_list(elements: Vec<Value>) -> Self {
		Value::List(Rc::new(RefCell::new(ListValue { fixed: true, elements })))
	}

	/// Build an untyped map value from ordered entries.
	pub fn map(entries: Vec<(Value, Value)>) -> Self {
		Value::Map(Rc::new(RefCell::new(MapValue { entries })))
	}

	/// Build a typed-map (object) value.
	pub fn object(type_name: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
		Value::Object(Rc::new(RefCell::new(ObjectValue {
			type_name: type_name.into(),
			fields,
		})))
	}

	/// Build a `Date` from a system time, truncated to whole seconds.
	pub fn date_from_system_time(time: SystemTime) -> Self {
		let millis = match time.duration_since(UNIX_EPOCH) {
			Ok(elapsed) => (elapsed.as_secs() as i64) * 1000,
			Err(before) => -((before.duration().as_secs() as i64) * 1000),
		};
		Value::Date(millis)
	}

	/// Short label for the value's variant, used in diagnostics.
	pub fn kind_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::Int(_) => "int",
			Value::Long(_) => "long",
			Value::Double(_) => "double",
			Value::Date(_) => "date",
			Value::String(_) => "string",
			Value::Binary(_) => "binary",
			Value::List(_) => "list",
			Value::Map(_) => "map",
			Value::Object(_) => "object",
			Value::Remote(_) => "remote",
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Int(a), Value::Int(b)) => a == b,
			(Value::Long(a), Value::Long(b)) => a == b,
			(Value::Double(a), Value::Double(b)) => a == b,
			(Value::Date(a), Value::Date(b)) => a == b,
			(Value::String(a), Value::String(b)) => a == b,
			(Value::Binary(a), Value::Binary(b)) => a == b,
			(Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
			(Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
			(Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
			(Value::Remote(a), Value::Remote(b)) => a == b,
			_ => false,
		}
	}
}

/// RPC request envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
	/// Method name (without overload suffixes).
	pub method: String,
	/// Header name/value pairs in insertion order.
	pub headers: Vec<(String, Value)>,
	/// Arguments in call order.
	pub args: Vec<Value>,
	/// Append argument wire-type tags to the method name on encode.
	pub overload: bool,
}

impl Call {
	/// Create a call with no headers or arguments.
	pub fn new(method: impl Into<String>) -> Self {
		Self {
			method: method.into(),
			headers: Vec::new(),
			args: Vec::new(),
			overload: false,
		}
	}
}

/// RPC response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
	/// Header name/value pairs in insertion order.
	pub headers: Vec<(String, Value)>,
	/// The single result value or fault.
	pub body: ReplyBody,
}

/// The one payload a reply carries.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
	/// Successful result value.
	Value(Value),
	/// Service fault.
	Fault(Fault),
}

impl Reply {
	/// Create a successful reply around a result value.
	pub fn value(value: Value) -> Self {
		Self {
			headers: Vec::new(),
			body: ReplyBody::Value(value),
		}
	}

	/// Create a fault reply.
	pub fn fault(fault: Fault) -> Self {
		Self {
			headers: Vec::new(),
			body: ReplyBody::Fault(fault),
		}
	}
}

/// Error payload carried by a reply in place of a normal result.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
	/// Fault code, for example `ServiceException`.
	pub code: String,
	/// Human-readable fault message.
	pub message: String,
	/// Optional arbitrary detail value.
	pub detail: Option<Value>,
}

/// A fully parsed Hessian message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
	/// Request envelope.
	Call(Call),
	/// Response envelope.
	Reply(Reply),
}

impl Message {
	/// Return the call envelope, if this message is one.
	pub fn into_call(self) -> Option<Call> {
		match self {
			Message::Call(call) => Some(call),
			Message::Reply(_) => None,
		}
	}

	/// Return the reply envelope, if this message is one.
	pub fn into_reply(self) -> Option<Reply> {
		match self {
			Message::Reply(reply) => Some(reply),
			Message::Call(_) => None,
		}
	}
}
