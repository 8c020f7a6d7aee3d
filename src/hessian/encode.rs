use crate::hessian::value::{Call, Fault, Reply, ReplyBody, Value};
use crate::hessian::{HessianError, Result};

/// Maximum codepoints (strings) or bytes (binary) per wire chunk.
const CHUNK: usize = 65535;

/// Recursion ceiling guarding against cyclic value graphs. The encoder emits
/// no back-references, so a cycle would otherwise recurse forever.
const MAX_ENCODE_DEPTH: u32 = 128;

/// Encode a call envelope to Hessian 1.0.2 bytes.
pub fn encode_call(call: &Call) -> Result<Vec<u8>> {
	let mut out = Vec::new();
	out.extend_from_slice(b"c\x01\x00");

	for (key, value) in &call.headers {
		out.push(b'H');
		write_name(&mut out, "header key", key)?;
		write_value(&mut out, value, 0)?;
	}

	let mut method = call.method.clone();
	if call.overload {
		for arg in &call.args {
			method.push('_');
			method.push_str(&type_suffix(arg));
		}
	}
	out.push(b'm');
	write_name(&mut out, "method name", &method)?;

	for arg in &call.args {
		write_value(&mut out, arg, 0)?;
	}

	out.push(b'z');
	Ok(out)
}

/// Encode a reply envelope to Hessian 1.0.2 bytes.
pub fn encode_reply(reply: &Reply) -> Result<Vec<u8>> {
	let mut out = Vec::new();
	out.extend_from_slice(b"r\x01\x00");

	for (key, value) in &reply.headers {
		out.push(b'H');
		write_name(&mut out, "header key", key)?;
		write_value(&mut out, value, 0)?;
	}

	match &reply.body {
		ReplyBody::Value(value) => write_value(&mut out, value, 0)?,
		ReplyBody::Fault(fault) => write_fault(&mut out, fault)?,
	}

	out.push(b'z');
	Ok(out)
}

/// Encode a single protocol value to Hessian 1.0.2 bytes.
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
	let mut out = Vec::new();
	write_value(&mut out, value, 0)?;
	Ok(out)
}

fn write_value(out: &mut Vec<u8>, value: &Value, depth: u32) -> Result<()> {
	if depth > MAX_ENCODE_DEPTH {
		return Err(HessianError::EncodeDepthExceeded { max_depth: MAX_ENCODE_DEPTH });
	}

	match value {
		Value::Null => out.push(b'N'),
		Value::Bool(true) => out.push(b'T'),
		Value::Bool(false) => out.push(b'F'),
		Value::Int(v) => {
			out.push(b'I');
			out.extend_from_slice(&v.to_be_bytes());
		}
		Value::Long(v) => {
			out.push(b'L');
			out.extend_from_slice(&v.to_be_bytes());
		}
		Value::Double(v) => {
			out.push(b'D');
			out.extend_from_slice(&v.to_be_bytes());
		}
		Value::Date(millis) => {
			out.push(b'd');
			out.extend_from_slice(&millis.to_be_bytes());
		}
		Value::String(text) => write_string(out, text),
		Value::Binary(bytes) => write_binary(out, bytes),
		Value::List(list) => {
			let list = list.borrow();
			let declared = if list.fixed { list.elements.len() as i32 } else { -1 };
			out.push(b'V');
			out.push(b'l');
			out.extend_from_slice(&declared.to_be_bytes());
			for element in &list.elements {
				write_value(out, element, depth + 1)?;
			}
			out.push(b'z');
		}
		Value::Map(map) => {
			out.push(b'M');
			for (key, entry) in &map.borrow().entries {
				write_value(out, key, depth + 1)?;
				write_value(out, entry, depth + 1)?;
			}
			out.push(b'z');
		}
		Value::Object(object) => {
			let object = object.borrow();
			out.push(b'M');
			out.push(b't');
			write_name(out, "type name", &object.type_name)?;
			for (name, field) in &object.fields {
				write_string(out, name);
				write_value(out, field, depth + 1)?;
			}
			out.push(b'z');
		}
		Value::Remote(remote) => {
			out.push(b'r');
			out.push(b't');
			write_name(out, "type name", remote.type_name.as_deref().unwrap_or(""))?;
			write_string(out, &remote.url);
		}
	}

	Ok(())
}

fn write_fault(out: &mut Vec<u8>, fault: &Fault) -> Result<()> {
	out.push(b'f');
	write_string(out, "code");
	write_string(out, &fault.code);
	write_string(out, "message");
	write_string(out, &fault.message);
	if let Some(detail) = &fault.detail {
		write_string(out, "detail");
		write_value(out, detail, 0)?;
	}
	out.push(b'z');
	Ok(())
}

/// Write a string as chunked UTF-8. The 2-byte length field counts
/// codepoints, never encoded bytes; chunks split at 65535 codepoints.
fn write_string(out: &mut Vec<u8>, text: &str) {
	let mut rest = text;
	let mut count = rest.chars().count();

	while count > CHUNK {
		let split = rest.char_indices().nth(CHUNK).map(|(at, _)| at).unwrap_or(rest.len());
		let (head, tail) = rest.split_at(split);
		out.push(b's');
		out.extend_from_slice(&(CHUNK as u16).to_be_bytes());
		out.extend_from_slice(head.as_bytes());
		rest = tail;
		count -= CHUNK;
	}

	out.push(b'S');
	out.extend_from_slice(&(count as u16).to_be_bytes());
	out.extend_from_slice(rest.as_bytes());
}

/// Write a byte payload with the same chunking scheme as strings, except the
/// length counts raw bytes.
fn write_binary(out: &mut Vec<u8>, bytes: &[u8]) {
	let mut rest = bytes;

	while rest.len() > CHUNK {
		let (head, tail) = rest.split_at(CHUNK);
		out.push(b'b');
		out.extend_from_slice(&(CHUNK as u16).to_be_bytes());
		out.extend_from_slice(head);
		rest = tail;
	}

	out.push(b'B');
	out.extend_from_slice(&(rest.len() as u16).to_be_bytes());
	out.extend_from_slice(rest);
}

/// Write a u16-length-prefixed name in raw UTF-8 bytes.
fn write_name(out: &mut Vec<u8>, what: &'static str, name: &str) -> Result<()> {
	let bytes = name.as_bytes();
	if bytes.len() > CHUNK {
		return Err(HessianError::NameTooLong {
			what,
			len: bytes.len(),
		});
	}

	out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
	out.extend_from_slice(bytes);
	Ok(())
}

/// Wire-type tag appended to overloaded method names, one per argument.
/// Objects contribute the bare class name after the last `.` qualifier.
fn type_suffix(value: &Value) -> String {
	match value {
		Value::Object(object) => {
			let object = object.borrow();
			match object.type_name.rfind('.') {
				Some(at) => object.type_name[at + 1..].to_owned(),
				None => object.type_name.clone(),
			}
		}
		other => other.kind_name().to_owned(),
	}
}

#[cfg(test)]
mod tests {
	use super::{encode_call, encode_reply, encode_value};
	use crate::hessian::value::{Call, Fault, Reply, Value};

	#[test]
	fn scalar_markers_and_widths() {
		assert_eq!(encode_value(&Value::Null).expect("null encodes"), b"N");
		assert_eq!(encode_value(&Value::Bool(true)).expect("true encodes"), b"T");
		assert_eq!(encode_value(&Value::Bool(false)).expect("false encodes"), b"F");

		let int = encode_value(&Value::Int(0x7fff_ffff)).expect("int encodes");
		assert_eq!(int, [b'I', 0x7f, 0xff, 0xff, 0xff]);
		assert_eq!(int.len(), 5);

		let long = encode_value(&Value::Long(-0x8000_0001)).expect("long encodes");
		assert_eq!(long.len(), 9);
		assert_eq!(long[0], b'L');
		assert_eq!(&long[1..], (-0x8000_0001_i64).to_be_bytes());
	}

	#[test]
	fn double_is_big_endian_ieee754() {
		let encoded = encode_value(&Value::Double(65.536)).expect("double encodes");
		assert_eq!(encoded[0], b'D');
		assert_eq!(&encoded[1..], 65.536_f64.to_be_bytes());
	}

	#[test]
	fn date_is_millis_since_epoch() {
		let encoded = encode_value(&Value::Date(1_318_192_200_000)).expect("date encodes");
		assert_eq!(encoded[0], b'd');
		assert_eq!(&encoded[1..], 1_318_192_200_000_i64.to_be_bytes());
	}

	#[test]
	fn short_string_is_a_single_final_chunk() {
		let encoded = encode_value(&Value::String("hello".to_owned())).expect("string encodes");
		assert_eq!(encoded, b"S\x00\x05hello");
	}

	#[test]
	fn string_length_counts_codepoints_not_bytes() {
		let encoded = encode_value(&Value::String("\u{10348}".to_owned())).expect("string encodes");
		assert_eq!(encoded[0], b'S');
		assert_eq!(&encoded[1..3], [0x00, 0x01]);
		assert_eq!(encoded.len(), 3 + 4);
	}

	#[test]
	fn string_at_chunk_boundary_is_not_split() {
		let encoded = encode_value(&Value::String("x".repeat(65535))).expect("string encodes");
		assert_eq!(encoded[0], b'S');
		assert_eq!(&encoded[1..3], [0xff, 0xff]);
		assert_eq!(encoded.len(), 3 + 65535);
	}

	#[test]
	fn string_over_chunk_boundary_splits_once() {
		let encoded = encode_value(&Value::String("x".repeat(65536))).expect("string encodes");
		assert_eq!(encoded[0], b's');
		assert_eq!(&encoded[1..3], [0xff, 0xff]);
		let tail = &encoded[3 + 65535..];
		assert_eq!(tail, *b"S\x00\x01x");
	}

	#[test]
	fn binary_chunks_count_raw_bytes() {
		let encoded = encode_value(&Value::Binary(vec![0xAB; 70000])).expect("binary encodes");
		assert_eq!(encoded[0], b'b');
		assert_eq!(&encoded[1..3], [0xff, 0xff]);
		let tail = &encoded[3 + 65535..];
		assert_eq!(tail[0], b'B');
		assert_eq!(&tail[1..3], 4465_u16.to_be_bytes());
		assert_eq!(tail.len(), 3 + (70000 - 65535));
	}

	#[test]
	fn empty_variable_list_is_byte_exact() {
		let encoded = encode_value(&Value::list(Vec::new())).expect("list encodes");
		assert_eq!(encoded, b"Vl\xff\xff\xff\xffz");
	}

	#[test]
	fn fixed_list_declares_its_count() {
		let encoded = encode_value(&Value::fixed_list(vec![Value::Int(1), Value::Int(2)])).expect("list encodes");
		assert_eq!(&encoded[..6], *b"Vl\x00\x00\x00\x02");
		assert_eq!(*encoded.last().expect("terminator present"), b'z');
	}

	#[test]
	fn map_has_no_length_prefix() {
		let encoded = encode_value(&Value::map(vec![(Value::Int(1), Value::Bool(true))])).expect("map encodes");
		assert_eq!(encoded[0], b'M');
		assert_eq!(&encoded[1..6], [b'I', 0, 0, 0, 1]);
		assert_eq!(encoded[6], b'T');
		assert_eq!(encoded[7], b'z');
	}

	#[test]
	fn object_writes_full_type_name() {
		let value = Value::object("com.example.Widget", vec![("size".to_owned(), Value::Int(3))]);
		let encoded = encode_value(&value).expect("object encodes");
		assert_eq!(&encoded[..2], *b"Mt");
		assert_eq!(&encoded[2..4], 18_u16.to_be_bytes());
		assert_eq!(&encoded[4..22], *b"com.example.Widget");
		assert_eq!(&encoded[22..29], *b"S\x00\x04size");
	}

	#[test]
	fn call_envelope_frames_method_and_args() {
		let mut call = Call::new("add");
		call.args = vec![Value::Int(2), Value::Int(3)];
		let encoded = encode_call(&call).expect("call encodes");
		assert_eq!(&encoded[..3], *b"c\x01\x00");
		assert_eq!(&encoded[3..9], *b"m\x00\x03add");
		assert_eq!(*encoded.last().expect("terminator present"), b'z');
	}

	#[test]
	fn overload_appends_one_suffix_per_argument() {
		let mut call = Call::new("add");
		call.overload = true;
		call.args = vec![Value::Int(2), Value::Int(3)];
		let encoded = encode_call(&call).expect("call encodes");
		assert_eq!(&encoded[3..17], *b"m\x00\x0badd_int_int");
	}

	#[test]
	fn overload_object_suffix_uses_bare_class_name() {
		let mut call = Call::new("probe");
		call.overload = true;
		call.args = vec![Value::object("com.example.Widget", Vec::new())];
		let encoded = encode_call(&call).expect("call encodes");
		assert_eq!(&encoded[3..18], *b"m\x00\x0cprobe_Widget");
	}

	#[test]
	fn call_headers_are_length_prefixed() {
		let mut call = Call::new("ping");
		call.headers.push(("token".to_owned(), Value::Int(7)));
		let encoded = encode_call(&call).expect("call encodes");
		assert_eq!(&encoded[3..11], *b"H\x00\x05token");
		assert_eq!(&encoded[11..16], [b'I', 0, 0, 0, 7]);
	}

	#[test]
	fn fault_reply_frames_code_and_message() {
		let reply = Reply::fault(Fault {
			code: "ServiceException".to_owned(),
			message: "boom".to_owned(),
			detail: None,
		});
		let encoded = encode_reply(&reply).expect("reply encodes");
		assert_eq!(&encoded[..4], *b"r\x01\x00f");
		assert_eq!(&encoded[4..11], *b"S\x00\x04code");
		assert_eq!(&encoded[encoded.len() - 2..], *b"zz");
	}

	#[test]
	fn cyclic_list_fails_instead_of_overflowing() {
		let list = Value::list(Vec::new());
		if let Value::List(inner) = &list {
			inner.borrow_mut().elements.push(list.clone());
		}
		encode_value(&list).expect_err("cycle must be rejected");
	}
}
