mod bytes;
mod encode;
mod error;
mod parse;
mod value;

/// Wire encoding entry points.
pub use encode::{encode_call, encode_reply, encode_value};
/// Error and result aliases.
pub use error::{HessianError, Result};
/// Stream parsing entry points.
pub use parse::{parse, parse_stream};
/// Protocol value model and envelope types.
pub use value::{Call, Fault, ListValue, MapValue, Message, ObjectValue, Remote, Reply, ReplyBody, Value};
