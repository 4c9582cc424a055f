//! Endpoint routing, headers and status codes.

use crate::error::{ProtocolError, ProtocolResult};
use std::fmt;
use todosync_core::ItemId;

/// Header carrying the client's last-known revision.
pub const REVISION_HEADER: &str = "X-Last-Known-Revision";

/// Header carrying the bearer token.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Content type of every request and response body.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Returns the method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backend resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `/list`, the whole collection.
    List,
    /// `/list/<id>`, a single item.
    Item(ItemId),
}

impl Endpoint {
    /// Returns the path relative to the backend base URL.
    pub fn path(&self) -> String {
        match self {
            Endpoint::List => "/list".into(),
            Endpoint::Item(id) => format!("/list/{id}"),
        }
    }

    /// Parses a path produced by [`Endpoint::path`].
    ///
    /// Anything before `/list` (a base URL or prefix) is ignored.
    pub fn parse(path: &str) -> ProtocolResult<Self> {
        let unknown = || ProtocolError::UnknownEndpoint(path.into());
        let start = path.find("/list").ok_or_else(unknown)?;
        let rest = path[start + "/list".len()..].trim_end_matches('/');

        match rest.strip_prefix('/') {
            None if rest.is_empty() => Ok(Endpoint::List),
            Some(id) if !id.contains('/') => {
                id.parse().map(Endpoint::Item).map_err(|_| unknown())
            }
            _ => Err(unknown()),
        }
    }
}

/// What an HTTP status means to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx.
    Success,
    /// 400: the last-known revision does not match the backend.
    UnsynchronizedRevision,
    /// 401.
    Unauthorized,
    /// 404.
    NotFound,
    /// Anything else.
    Other(u16),
}

impl StatusClass {
    /// Classifies a status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => StatusClass::Success,
            400 => StatusClass::UnsynchronizedRevision,
            401 => StatusClass::Unauthorized,
            404 => StatusClass::NotFound,
            other => StatusClass::Other(other),
        }
    }

    /// Returns the canonical status code for the class.
    pub fn status(self) -> u16 {
        match self {
            StatusClass::Success => 200,
            StatusClass::UnsynchronizedRevision => 400,
            StatusClass::Unauthorized => 401,
            StatusClass::NotFound => 404,
            StatusClass::Other(code) => code,
        }
    }
}
