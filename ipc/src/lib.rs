// This crate centralizes the JSON messages exchanged at the assistant boundary.

pub mod assistant_messages; // Client <-> assistant turn request/response
pub use assistant_messages::*;
