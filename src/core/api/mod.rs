//! Shared HTTP plumbing for the resource endpoints
//!
//! - `error`: the `{ok:false, mensaje}` envelope and status mapping
//! - `payload`: lenient JSON body and query-string readers

pub mod error;
pub mod payload;

pub use error::{ApiError, OkResponse, OrInternal, ack};
pub use payload::{Params, Payload};

#[cfg(test)]
pub(crate) mod test_support;
