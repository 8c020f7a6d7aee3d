use std::cell::RefCell;
use std::io::Read;
use std::rc::Rc;

use crate::hessian::bytes::Cursor;
use crate::hessian::value::{Call, Fault, ListValue, MapValue, Message, ObjectValue, Remote, Reply, ReplyBody, Value};
use crate::hessian::{HessianError, Result};

/// Parse a single call or reply envelope from a byte slice.
///
/// The reference table and partially-built envelope live only for the
/// duration of this invocation. Bytes after the envelope terminator are
/// ignored.
pub fn parse(bytes: &[u8]) -> Result<Message> {
	Parser::new(bytes).run()
}

/// Read a byte source to its end, then parse one envelope from it.
pub fn parse_stream(reader: &mut impl Read) -> Result<Message> {
	let mut bytes = Vec::new();
	reader.read_to_end(&mut bytes)?;
	parse(&bytes)
}

/// Single-pass forward-only envelope reader.
struct Parser<'a> {
	cursor: Cursor<'a>,
	/// Composite values in decode order, registered before their contents
	/// are filled so self-referential structures resolve.
	refs: Vec<Value>,
}

/// Envelope under construction.
enum Envelope {
	Call {
		method: Option<String>,
		headers: Vec<(String, Value)>,
		args: Vec<Value>,
	},
	Reply {
		headers: Vec<(String, Value)>,
		body: Option<ReplyBody>,
	},
}

/// A decoded `M` value before conversion to `Value`.
enum MapLike {
	Untyped(Rc<RefCell<MapValue>>),
	Typed(Rc<RefCell<ObjectValue>>),
}

impl<'a> Parser<'a> {
	fn new(bytes: &'a [u8]) -> Self {
		Self {
			cursor: Cursor::new(bytes),
			refs: Vec::new(),
		}
	}

	fn run(mut self) -> Result<Message> {
		let first = self.cursor.read_u8()?;
		let mut envelope = match first {
			b'c' => {
				self.read_version()?;
				Envelope::Call {
					method: None,
					headers: Vec::new(),
					args: Vec::new(),
				}
			}
			b'r' => {
				self.read_version()?;
				Envelope::Reply {
					headers: Vec::new(),
					body: None,
				}
			}
			marker => return Err(HessianError::MissingEnvelope { marker }),
		};

		loop {
			let marker = self.cursor.read_u8()?;
			match marker {
				b'c' | b'r' => return Err(HessianError::DuplicateEnvelopeHeader { marker }),
				b'z' => break,
				b'H' => {
					let key = self.read_any_value()?;
					let Value::String(key) = key else {
						return Err(HessianError::InvalidHeaderKey { got: key.kind_name() });
					};
					let value = self.read_any_value()?;
					match &mut envelope {
						Envelope::Call { headers, .. } | Envelope::Reply { headers, .. } => headers.push((key, value)),
					}
				}
				b'm' => match &mut envelope {
					Envelope::Call { method, .. } => {
						if method.is_some() {
							return Err(HessianError::DuplicateField { field: "method name" });
						}
						*method = Some(self.read_name()?);
					}
					Envelope::Reply { .. } => return Err(HessianError::IllegalContext { marker }),
				},
				b'f' => match &mut envelope {
					Envelope::Reply { body, .. } => {
						if body.is_some() {
							return Err(HessianError::DuplicateField { field: "reply value" });
						}
						*body = Some(ReplyBody::Fault(self.read_fault()?));
					}
					Envelope::Call { .. } => return Err(HessianError::IllegalContext { marker }),
				},
				marker => {
					let value = self.read_value(marker)?;
					match &mut envelope {
						Envelope::Call { args, .. } => args.push(value),
						Envelope::Reply { body, .. } => {
							if body.is_some() {
								return Err(HessianError::DuplicateField { field: "reply value" });
							}
							*body = Some(ReplyBody::Value(value));
						}
					}
				}
			}
		}

		Ok(match envelope {
			Envelope::Call { method, headers, args } => Message::Call(Call {
				method: method.unwrap_or_default(),
				headers,
				args,
				overload: false,
			}),
			Envelope::Reply { headers, body } => Message::Reply(Reply {
				headers,
				body: body.unwrap_or(ReplyBody::Value(Value::Null)),
			}),
		})
	}

	fn read_version(&mut self) -> Result<()> {
		let raw = self.cursor.read_exact(2)?;
		if raw != [1, 0] {
			return Err(HessianError::UnrecognizedVersion {
				major: raw[0],
				minor: raw[1],
			});
		}
		Ok(())
	}

	/// Read a marker byte, then the value it introduces.
	fn read_any_value(&mut self) -> Result<Value> {
		let marker = self.cursor.read_u8()?;
		self.read_value(marker)
	}

	/// Generic value reader, dispatching on an already-consumed marker.
	fn read_value(&mut self, marker: u8) -> Result<Value> {
		match marker {
			b'N' => Ok(Value::Null),
			b'T' => Ok(Value::Bool(true)),
			b'F' => Ok(Value::Bool(false)),
			b'I' => Ok(Value::Int(self.cursor.read_i32()?)),
			b'L' => Ok(Value::Long(self.cursor.read_i64()?)),
			b'D' => Ok(Value::Double(self.cursor.read_f64()?)),
			b'd' => Ok(Value::Date(self.cursor.read_i64()?)),
			b'S' | b'X' => Ok(Value::String(self.read_string_fragment()?)),
			b's' | b'x' => Ok(Value::String(self.read_chunked_text(marker)?)),
			b'B' => Ok(Value::Binary(self.read_binary_fragment()?)),
			b'b' => Ok(Value::Binary(self.read_chunked_binary()?)),
			b'V' => self.read_list(),
			b'M' => Ok(match self.read_map()? {
				MapLike::Untyped(map) => Value::Map(map),
				MapLike::Typed(object) => Value::Object(object),
			}),
			b'r' => self.read_remote(),
			b'R' => self.read_back_reference(),
			marker => Err(HessianError::UnknownMarker {
				marker,
				at: self.cursor.pos().saturating_sub(1),
			}),
		}
	}

	/// Read a u16-length-prefixed UTF-8 name (method names, type names).
	fn read_name(&mut self) -> Result<String> {
		let len = usize::from(self.cursor.read_u16()?);
		let raw = self.cursor.read_exact(len)?;
		let name = std::str::from_utf8(raw).map_err(|_| HessianError::InvalidUtf8 { at: self.cursor.pos() })?;
		Ok(name.to_owned())
	}

	/// Read one string fragment: a 2-byte codepoint count followed by that
	/// many UTF-8 encoded codepoints. Byte length is derived from each
	/// codepoint's leading byte, never from the count field.
	fn read_string_fragment(&mut self) -> Result<String> {
		let count = usize::from(self.cursor.read_u16()?);
		let mut bytes = Vec::with_capacity(count);

		for _ in 0..count {
			let at = self.cursor.pos();
			let lead = self.cursor.read_u8()?;
			let extra = match lead {
				0x00..=0x7F => 0,
				0xC2..=0xDF => 1,
				0xE0..=0xEF => 2,
				0xF0..=0xF4 => 3,
				byte => return Err(HessianError::InvalidUtf8Lead { byte, at }),
			};
			bytes.push(lead);
			bytes.extend_from_slice(self.cursor.read_exact(extra)?);
		}

		String::from_utf8(bytes).map_err(|_| HessianError::InvalidUtf8 { at: self.cursor.pos() })
	}

	/// Read a chunked string starting from a non-final marker (`s` or `x`).
	/// Further non-final chunks of the same case may follow; the sequence
	/// must close with the matching final marker (`S` or `X`).
	fn read_chunked_text(&mut self, marker: u8) -> Result<String> {
		let terminal = marker.to_ascii_uppercase();
		let mut text = self.read_string_fragment()?;

		loop {
			let next = self.cursor.read_u8()?;
			let done = next == terminal;
			if !done && next != marker {
				return Err(HessianError::MismatchedChunkTerminator {
					expected: terminal,
					got: next,
				});
			}

			text.push_str(&self.read_string_fragment()?);
			if done {
				return Ok(text);
			}
		}
	}

	/// Read one binary fragment: a 2-byte byte count plus that many bytes.
	fn read_binary_fragment(&mut self) -> Result<Vec<u8>> {
		let len = usize::from(self.cursor.read_u16()?);
		Ok(self.cursor.read_exact(len)?.to_vec())
	}

	/// Read a chunked binary starting from a non-final `b` marker.
	fn read_chunked_binary(&mut self) -> Result<Vec<u8>> {
		let mut bytes = self.read_binary_fragment()?;

		loop {
			let next = self.cursor.read_u8()?;
			let done = next == b'B';
			if !done && next != b'b' {
				return Err(HessianError::MismatchedChunkTerminator {
					expected: b'B',
					got: next,
				});
			}

			bytes.extend_from_slice(&self.read_binary_fragment()?);
			if done {
				return Ok(bytes);
			}
		}
	}

	fn read_list(&mut self) -> Result<Value> {
		let mut marker = self.cursor.read_u8()?;
		if marker == b't' {
			// List type name; read and discarded.
			let _ = self.read_name()?;
			marker = self.cursor.read_u8()?;
		}

		let mut fixed = false;
		if marker == b'l' {
			// The declared count is advisory; elements run to the
			// terminator. A non-negative declaration marks a fixed list.
			fixed = self.cursor.read_i32()? >= 0;
			marker = self.cursor.read_u8()?;
		}

		let handle = Rc::new(RefCell::new(ListValue {
			fixed,
			elements: Vec::new(),
		}));
		self.refs.push(Value::List(Rc::clone(&handle)));

		while marker != b'z' {
			let element = self.read_value(marker)?;
			handle.borrow_mut().elements.push(element);
			marker = self.cursor.read_u8()?;
		}

		Ok(Value::List(handle))
	}

	fn read_map(&mut self) -> Result<MapLike> {
		let mut marker = self.cursor.read_u8()?;
		let mut type_name = None;
		if marker == b't' {
			let name = self.read_name()?;
			if !name.is_empty() {
				type_name = Some(name);
			}
			marker = self.cursor.read_u8()?;
		}

		match type_name {
			Some(type_name) => {
				let handle = Rc::new(RefCell::new(ObjectValue {
					type_name,
					fields: Vec::new(),
				}));
				self.refs.push(Value::Object(Rc::clone(&handle)));

				while marker != b'z' {
					let key = self.read_value(marker)?;
					let name = stringify_field_key(&key)?;
					let value = self.read_any_value()?;
					handle.borrow_mut().fields.push((name, value));
					marker = self.cursor.read_u8()?;
				}

				Ok(MapLike::Typed(handle))
			}
			None => {
				let handle = Rc::new(RefCell::new(MapValue { entries: Vec::new() }));
				self.refs.push(Value::Map(Rc::clone(&handle)));

				while marker != b'z' {
					let key = self.read_value(marker)?;
					let value = self.read_any_value()?;
					handle.borrow_mut().entries.push((key, value));
					marker = self.cursor.read_u8()?;
				}

				Ok(MapLike::Untyped(handle))
			}
		}
	}

	fn read_remote(&mut self) -> Result<Value> {
		let mut marker = self.cursor.read_u8()?;
		let mut type_name = None;
		if marker == b't' {
			let name = self.read_name()?;
			if !name.is_empty() {
				type_name = Some(name);
			}
			marker = self.cursor.read_u8()?;
		}

		let url = match marker {
			b'S' => self.read_string_fragment()?,
			b's' => self.read_chunked_text(b's')?,
			marker => return Err(HessianError::RemoteUrlExpected { marker }),
		};

		Ok(Value::Remote(Remote { type_name, url }))
	}

	fn read_back_reference(&mut self) -> Result<Value> {
		let index = self.cursor.read_u32()?;
		self.refs
			.get(index as usize)
			.cloned()
			.ok_or(HessianError::BackReferenceOutOfRange {
				index,
				len: self.refs.len(),
			})
	}

	/// Read a fault body: map key/value pairs (no leading `M` marker) with
	/// required `code` and `message` fields and optional `detail`.
	fn read_fault(&mut self) -> Result<Fault> {
		let pairs: Vec<(Value, Value)> = match self.read_map()? {
			MapLike::Untyped(map) => map.borrow().entries.clone(),
			MapLike::Typed(object) => object
				.borrow()
				.fields
				.iter()
				.map(|(name, value)| (Value::String(name.clone()), value.clone()))
				.collect(),
		};

		let mut code = None;
		let mut message = None;
		let mut detail = None;
		for (key, value) in pairs {
			let Value::String(key) = key else { continue };
			match (key.as_str(), value) {
				("code", Value::String(text)) => code = Some(text),
				("message", Value::String(text)) => message = Some(text),
				("detail", value) => detail = Some(value),
				_ => {}
			}
		}

		Ok(Fault {
			code: code.ok_or(HessianError::FaultMissingField { field: "code" })?,
			message: message.ok_or(HessianError::FaultMissingField { field: "message" })?,
			detail,
		})
	}
}

/// Coerce a typed-map field key to a field name. String keys pass through;
/// scalar keys render to their text form; composite keys are rejected.
fn stringify_field_key(key: &Value) -> Result<String> {
	match key {
		Value::String(text) => Ok(text.clone()),
		Value::Null => Ok("null".to_owned()),
		Value::Bool(flag) => Ok(flag.to_string()),
		Value::Int(v) => Ok(v.to_string()),
		Value::Long(v) => Ok(v.to_string()),
		Value::Double(v) => Ok(v.to_string()),
		Value::Date(millis) => Ok(millis.to_string()),
		other => Err(HessianError::InvalidObjectFieldKey { got: other.kind_name() }),
	}
}
