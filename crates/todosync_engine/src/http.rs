//! HTTP remote store.
//!
//! [`HttpRemote`] speaks the backend's JSON protocol over any
//! [`HttpClient`]. The client itself is abstracted so the engine does not
//! pick an HTTP library; [`LoopbackClient`] routes requests in-process to a
//! [`LoopbackServer`] such as [`MemoryRemote`].

use crate::error::{RemoteError, RemoteResult};
use crate::remote::{MemoryRemote, RemoteStore, Versioned};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use todosync_core::{Item, ItemId, Revision, Snapshot};
use todosync_protocol::{
    decode, encode, ElementRequest, ElementResponse, Endpoint, ItemModel, ListResponse, Method,
    StatusClass, AUTHORIZATION_HEADER, CONTENT_TYPE_JSON, REVISION_HEADER,
};
use tracing::{debug, trace};

/// Device name stamped on items the loopback backend sends back.
const LOOPBACK_DEVICE: &str = "loopback";

/// An outgoing HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Returns the first value of a header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Creates a bodiless response.
    pub fn empty(status: u16) -> Self {
        Self::new(status, Vec::new())
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to plug in an actual HTTP library. `send` may
/// block; [`HttpRemote`] calls it on the blocking pool.
pub trait HttpClient: Send + Sync + 'static {
    /// Sends a request. `Err` means no response was received.
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String>;

    /// Checks if the client is connected/healthy.
    fn is_healthy(&self) -> bool;
}

/// Remote store backed by the backend's HTTP API.
pub struct HttpRemote<C: HttpClient> {
    base_url: String,
    client: Arc<C>,
    token: RwLock<Option<String>>,
    device_id: String,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpRemote<C> {
    /// Creates an HTTP remote without a token.
    ///
    /// Every request fails with [`RemoteError::MissingCredential`] until a
    /// token is set.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Arc::new(client),
            token: RwLock::new(None),
            device_id: uuid::Uuid::new_v4().to_string(),
            last_error: RwLock::new(None),
        }
    }

    /// Sets the bearer token.
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_token(Some(token.into()));
        self
    }

    /// Sets the device id stamped on outgoing items.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = device_id.into();
        self
    }

    /// Replaces or clears the bearer token.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the device id.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the last transport error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn build(
        &self,
        method: Method,
        endpoint: Endpoint,
        base: Option<Revision>,
        body: Option<Vec<u8>>,
    ) -> RemoteResult<HttpRequest> {
        let token = self
            .token
            .read()
            .clone()
            .ok_or_else(|| RemoteError::MissingCredential("authorization token".into()))?;

        let mut headers = vec![
            (AUTHORIZATION_HEADER.to_string(), format!("Bearer {token}")),
            ("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string()),
        ];
        if let Some(base) = base {
            headers.push((REVISION_HEADER.to_string(), base.as_u64().to_string()));
        }

        Ok(HttpRequest {
            method,
            url: format!("{}{}", self.base_url, endpoint.path()),
            headers,
            body,
        })
    }

    async fn call(&self, request: HttpRequest, sent: Option<Revision>) -> RemoteResult<Vec<u8>> {
        if !self.client.is_healthy() {
            return Err(RemoteError::transport_retryable("client unhealthy"));
        }

        trace!(method = %request.method, url = %request.url, "sending request");
        let client = Arc::clone(&self.client);
        let response = tokio::task::spawn_blocking(move || client.send(request))
            .await
            .map_err(|e| RemoteError::transport_fatal(e.to_string()))?
            .map_err(|e| {
                *self.last_error.write() = Some(e.clone());
                RemoteError::transport_retryable(e)
            })?;
        *self.last_error.write() = None;

        match StatusClass::from_status(response.status) {
            StatusClass::Success => Ok(response.body),
            StatusClass::UnsynchronizedRevision => Err(RemoteError::UnsynchronizedRevision {
                sent: sent.unwrap_or_default(),
            }),
            StatusClass::Unauthorized => Err(RemoteError::Unauthorized),
            StatusClass::NotFound => Err(RemoteError::NotFound),
            StatusClass::Other(code) => Err(RemoteError::Status(code)),
        }
    }

    async fn element(
        &self,
        method: Method,
        endpoint: Endpoint,
        base: Revision,
        item: Option<&Item>,
    ) -> RemoteResult<Versioned<Item>> {
        let body = item
            .map(|item| encode(&ElementRequest::new(ItemModel::from_item(item, &self.device_id))))
            .transpose()?;
        let request = self.build(method, endpoint, Some(base), body)?;
        let bytes = self.call(request, Some(base)).await?;

        let response: ElementResponse = decode(&bytes)?;
        let revision = response.revision();
        let item = response.element.into_item()?;
        debug!(%method, item_id = %item.id, revision = revision.as_u64(), "remote call ok");
        Ok(Versioned::new(item, revision))
    }
}

impl<C: HttpClient> RemoteStore for HttpRemote<C> {
    async fn fetch_all(&self) -> RemoteResult<Snapshot> {
        let request = self.build(Method::Get, Endpoint::List, None, None)?;
        let bytes = self.call(request, None).await?;
        let response: ListResponse = decode(&bytes)?;
        Ok(response.into_snapshot()?)
    }

    async fn create(&self, item: Item, base: Revision) -> RemoteResult<Versioned<Item>> {
        self.element(Method::Post, Endpoint::List, base, Some(&item))
            .await
    }

    async fn replace(
        &self,
        id: ItemId,
        item: Item,
        base: Revision,
    ) -> RemoteResult<Versioned<Item>> {
        self.element(Method::Put, Endpoint::Item(id), base, Some(&item))
            .await
    }

    async fn delete(&self, id: ItemId, base: Revision) -> RemoteResult<Versioned<Item>> {
        self.element(Method::Delete, Endpoint::Item(id), base, None)
            .await
    }

    async fn fetch_one(&self, id: ItemId, base: Revision) -> RemoteResult<Versioned<Item>> {
        self.element(Method::Get, Endpoint::Item(id), base, None)
            .await
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer: Send + Sync + 'static {
    /// Handles a request. `Err` simulates a transport failure.
    fn handle(&self, request: &HttpRequest) -> Result<HttpResponse, String>;
}

impl<S: LoopbackServer> LoopbackServer for Arc<S> {
    fn handle(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        (**self).handle(request)
    }
}

/// A loopback HTTP client that routes requests directly to a server.
///
/// Useful for testing the full wire path without a network.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
    healthy: AtomicBool,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self {
            server,
            healthy: AtomicBool::new(true),
        }
    }

    /// Returns the server.
    pub fn server(&self) -> &S {
        &self.server
    }

    /// Marks the client healthy or not.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

impl<S: LoopbackServer> HttpClient for LoopbackClient<S> {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        self.server.handle(&request)
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

fn error_status(err: &RemoteError) -> u16 {
    match err {
        // The backend answers 400 for any refused mutation, duplicate ids
        // included.
        RemoteError::UnsynchronizedRevision { .. }
        | RemoteError::Rejected(_)
        | RemoteError::Decode(_) => StatusClass::UnsynchronizedRevision.status(),
        RemoteError::Unauthorized | RemoteError::MissingCredential(_) => {
            StatusClass::Unauthorized.status()
        }
        RemoteError::NotFound => StatusClass::NotFound.status(),
        RemoteError::Status(code) => *code,
        RemoteError::Timeout => 504,
        RemoteError::Transport { .. } => 502,
    }
}

impl MemoryRemote {
    fn route(&self, request: &HttpRequest) -> RemoteResult<Vec<u8>> {
        if let Some(expected) = self.token() {
            let presented = request
                .header(AUTHORIZATION_HEADER)
                .and_then(|value| value.strip_prefix("Bearer "));
            if presented != Some(expected) {
                return Err(RemoteError::Unauthorized);
            }
        }

        let endpoint = Endpoint::parse(&request.url).map_err(|_| RemoteError::Status(404))?;
        let base = || -> RemoteResult<Revision> {
            request
                .header(REVISION_HEADER)
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Revision::new)
                .ok_or_else(|| RemoteError::Decode("missing revision header".into()))
        };
        let element = || -> RemoteResult<Item> {
            let body = request.body.as_deref().unwrap_or_default();
            let envelope: ElementRequest = decode(body)?;
            Ok(envelope.element.into_item()?)
        };
        let respond = |versioned: Versioned<Item>| -> RemoteResult<Vec<u8>> {
            let model = ItemModel::from_item(&versioned.value, LOOPBACK_DEVICE);
            Ok(encode(&ElementResponse::ok(model, versioned.revision))?)
        };

        match (request.method, endpoint) {
            (Method::Get, Endpoint::List) => {
                let snapshot = self.list_now()?;
                let list = snapshot
                    .items
                    .iter()
                    .map(|item| ItemModel::from_item(item, LOOPBACK_DEVICE))
                    .collect();
                Ok(encode(&ListResponse::ok(list, snapshot.revision))?)
            }
            (Method::Post, Endpoint::List) => respond(self.create_now(element()?, base()?)?),
            (Method::Get, Endpoint::Item(id)) => respond(self.fetch_one_now(id)?),
            (Method::Put, Endpoint::Item(id)) => {
                respond(self.replace_now(id, element()?, base()?)?)
            }
            (Method::Delete, Endpoint::Item(id)) => respond(self.delete_now(id, base()?)?),
            _ => Err(RemoteError::Status(405)),
        }
    }
}

impl LoopbackServer for MemoryRemote {
    fn handle(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        match self.route(request) {
            Ok(body) => Ok(HttpResponse::new(StatusClass::Success.status(), body)),
            Err(RemoteError::Transport { message, .. }) => Err(message),
            Err(err) => {
                debug!(method = %request.method, url = %request.url, error = %err, "request refused");
                Ok(HttpResponse::empty(error_status(&err)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todosync_core::{Color, Priority, Timestamp};

    type Loopback = HttpRemote<LoopbackClient<Arc<MemoryRemote>>>;

    fn remote_with(backend: &Arc<MemoryRemote>) -> Loopback {
        HttpRemote::new(
            "https://example.com/todobackend",
            LoopbackClient::new(Arc::clone(backend)),
        )
        .with_token("secret")
        .with_device_id("test-device")
    }

    fn sample() -> Item {
        Item::new("buy milk")
            .with_priority(Priority::Important)
            .with_color(Color::rgb(1, 2, 3))
            .with_deadline(Timestamp(99))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn wire_round_trip() {
        let backend = Arc::new(MemoryRemote::new().with_token("secret"));
        let remote = remote_with(&backend);
        let item = sample();

        let created = remote.create(item.clone(), Revision::ZERO).await.unwrap();
        assert_eq!(created.value, item);
        assert_eq!(created.revision, Revision::new(1));

        let fetched = remote.fetch_one(item.id, Revision::new(1)).await.unwrap();
        assert_eq!(fetched.value, item);

        let snapshot = remote.fetch_all().await.unwrap();
        assert_eq!(snapshot.items, vec![item.clone()]);
        assert_eq!(snapshot.revision, Revision::new(1));

        let deleted = remote.delete(item.id, Revision::new(1)).await.unwrap();
        assert_eq!(deleted.revision, Revision::new(2));
        assert!(backend.snapshot().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_token_never_reaches_backend() {
        let backend = Arc::new(MemoryRemote::new());
        let remote = HttpRemote::new("http://localhost", LoopbackClient::new(Arc::clone(&backend)));

        let err = remote.fetch_all().await.unwrap_err();
        assert!(matches!(err, RemoteError::MissingCredential(_)));
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn status_codes_map_to_errors() {
        let backend = Arc::new(MemoryRemote::new().with_token("secret"));
        let remote = remote_with(&backend);

        let err = remote
            .replace(ItemId::new(), sample(), Revision::ZERO)
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::NotFound);

        backend.apply_external(sample());
        let err = remote.create(sample(), Revision::ZERO).await.unwrap_err();
        assert_eq!(
            err,
            RemoteError::UnsynchronizedRevision {
                sent: Revision::ZERO
            }
        );

        remote.set_token(Some("wrong".into()));
        assert_eq!(remote.fetch_all().await.unwrap_err(), RemoteError::Unauthorized);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_backend_is_transport_error() {
        let backend = Arc::new(MemoryRemote::new().with_token("secret"));
        let remote = remote_with(&backend);
        backend.set_online(false);

        let err = remote.fetch_all().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(remote.last_error().as_deref(), Some("backend offline"));

        backend.set_online(true);
        remote.fetch_all().await.unwrap();
        assert!(remote.last_error().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unhealthy_client_short_circuits() {
        let backend = Arc::new(MemoryRemote::new().with_token("secret"));
        let remote = remote_with(&backend);
        remote.client().set_healthy(false);

        assert!(remote.fetch_all().await.unwrap_err().is_retryable());
        assert_eq!(backend.request_count(), 0);
    }

    #[test]
    fn request_headers() {
        let backend = Arc::new(MemoryRemote::new());
        let remote = remote_with(&backend);
        let request = remote
            .build(Method::Delete, Endpoint::List, Some(Revision::new(3)), None)
            .unwrap();

        assert_eq!(request.url, "https://example.com/todobackend/list");
        assert_eq!(request.header("authorization"), Some("Bearer secret"));
        assert_eq!(request.header(REVISION_HEADER), Some("3"));
    }
}
