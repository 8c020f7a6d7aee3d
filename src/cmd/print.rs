use std::path::PathBuf;

use hesswire::hessian::{Fault, Message, ReplyBody, Result, Value, parse};

/// Maximum nesting depth rendered before truncation. Decoded graphs may be
/// self-referential, so rendering must not follow them indefinitely.
const MAX_PRINT_DEPTH: u32 = 32;

/// Parse a message file and print the whole envelope as JSON.
pub fn run(path: PathBuf) -> Result<()> {
	let bytes = std::fs::read(&path)?;
	let message = parse(&bytes)?;

	let payload = match &message {
		Message::Call(call) => serde_json::json!({
			"envelope": "call",
			"method": call.method,
			"headers": headers_to_json(&call.headers),
			"args": call.args.iter().map(|arg| value_to_json(arg, 0)).collect::<Vec<_>>(),
		}),
		Message::Reply(reply) => match &reply.body {
			ReplyBody::Value(value) => serde_json::json!({
				"envelope": "reply",
				"headers": headers_to_json(&reply.headers),
				"result": value_to_json(value, 0),
			}),
			ReplyBody::Fault(fault) => serde_json::json!({
				"envelope": "reply",
				"headers": headers_to_json(&reply.headers),
				"fault": fault_to_json(fault),
			}),
		},
	};

	emit_json(&payload);
	Ok(())
}

fn headers_to_json(headers: &[(String, Value)]) -> serde_json::Value {
	let entries: Vec<serde_json::Value> = headers
		.iter()
		.map(|(name, value)| {
			serde_json::json!({
				"name": name,
				"value": value_to_json(value, 0),
			})
		})
		.collect();
	serde_json::Value::Array(entries)
}

fn fault_to_json(fault: &Fault) -> serde_json::Value {
	serde_json::json!({
		"code": fault.code,
		"message": fault.message,
		"detail": fault.detail.as_ref().map(|detail| value_to_json(detail, 0)),
	})
}

fn value_to_json(value: &Value, depth: u32) -> serde_json::Value {
	use serde_json::{Map, Value as JsonValue};

	if depth > MAX_PRINT_DEPTH {
		return JsonValue::String("<max depth>".to_owned());
	}

	match value {
		Value::Null => JsonValue::Null,
		Value::Bool(v) => serde_json::json!(v),
		Value::Int(v) => serde_json::json!(v),
		Value::Long(v) => serde_json::json!(v),
		Value::Double(v) => serde_json::json!(v),
		Value::Date(millis) => serde_json::json!({ "date_ms": millis }),
		Value::String(v) => serde_json::json!(v),
		Value::Binary(v) => {
			let bytes: Vec<JsonValue> = v.iter().map(|item| serde_json::json!(item)).collect();
			JsonValue::Array(bytes)
		}
		Value::List(list) => {
			let items: Vec<JsonValue> = list
				.borrow()
				.elements
				.iter()
				.map(|item| value_to_json(item, depth + 1))
				.collect();
			JsonValue::Array(items)
		}
		Value::Map(map) => {
			let entries: Vec<JsonValue> = map
				.borrow()
				.entries
				.iter()
				.map(|(key, entry)| {
					JsonValue::Array(vec![value_to_json(key, depth + 1), value_to_json(entry, depth + 1)])
				})
				.collect();
			JsonValue::Array(entries)
		}
		Value::Object(object) => {
			let object = object.borrow();
			let fields: Map<String, JsonValue> = object
				.fields
				.iter()
				.map(|(name, field)| (name.clone(), value_to_json(field, depth + 1)))
				.collect();

			let mut out = Map::new();
			out.insert("type".to_owned(), serde_json::json!(object.type_name));
			out.insert("fields".to_owned(), JsonValue::Object(fields));
			JsonValue::Object(out)
		}
		Value::Remote(remote) => serde_json::json!({
			"remote": remote.type_name,
			"url": remote.url,
		}),
	}
}

fn emit_json(payload: &impl serde::Serialize) {
	match serde_json::to_string_pretty(payload) {
		Ok(text) => println!("{text}"),
		Err(err) => eprintln!("error: failed to render json: {err}"),
	}
}
