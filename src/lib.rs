//! Public library API for encoding and parsing Hessian 1.0.2 messages.

/// Value model, wire encoder, and stream parser for Hessian 1.0.2.
pub mod hessian;
