use std::path::PathBuf;

use hesswire::hessian::{Message, ReplyBody, Result, parse};

/// Print a high-level envelope summary.
pub fn run(path: PathBuf) -> Result<()> {
	let bytes = std::fs::read(&path)?;
	let message = parse(&bytes)?;

	println!("path: {}", path.display());
	println!("bytes: {}", bytes.len());

	match message {
		Message::Call(call) => {
			println!("envelope: call");
			println!("method: {}", call.method);
			println!("headers: {}", call.headers.len());
			println!("args: {}", call.args.len());
			for arg in &call.args {
				println!("  {}", arg.kind_name());
			}
		}
		Message::Reply(reply) => {
			println!("envelope: reply");
			println!("headers: {}", reply.headers.len());
			match &reply.body {
				ReplyBody::Value(value) => println!("result: {}", value.kind_name()),
				ReplyBody::Fault(fault) => {
					println!("fault_code: {}", fault.code);
					println!("fault_message: {}", fault.message);
					println!("fault_has_detail: {}", fault.detail.is_some());
				}
			}
		}
	}

	Ok(())
}
