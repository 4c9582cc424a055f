//! # todosync protocol
//!
//! Wire protocol types and JSON codecs for the todosync backend.
//!
//! This crate provides:
//! - [`ItemModel`], the backend's representation of an item
//! - Request and response envelopes ([`ListResponse`], [`ElementRequest`],
//!   [`ElementResponse`])
//! - [`Endpoint`] routing and header names
//! - Mapping of HTTP status codes to [`StatusClass`]
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod endpoint;
mod error;
mod messages;
mod model;

pub use endpoint::{
    Endpoint, Method, StatusClass, AUTHORIZATION_HEADER, CONTENT_TYPE_JSON, REVISION_HEADER,
};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{decode, encode, ElementRequest, ElementResponse, ListResponse, STATUS_OK};
pub use model::{Importance, ItemModel};
