/// Envelope summary command.
pub mod info;
/// Full JSON rendering command.
pub mod print;
