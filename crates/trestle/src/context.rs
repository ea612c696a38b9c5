//! Request-scoped state shared between the dispatcher and handlers.

use crate::body::OptionReqBody;
use crate::error::HandleError;
use crate::injector::{Inject, InjectError, Injector};
use crate::response::ResponseWriter;
use http::request::Parts;
use http::{HeaderMap, Method, Uri, Version};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type VarMap<V> = RwLock<HashMap<String, V>>;

/// Per-request context.
///
/// Owns the request head, the consume-once body handle, the raw and
/// converted path variables extracted by the dispatcher, and a free-form
/// per-request variable bag. Created when a request arrives, registered in
/// the request injector, and discarded when the response has been written.
pub struct Context {
    head: Parts,
    body: OptionReqBody,
    response: Arc<ResponseWriter>,
    request_vars: VarMap<String>,
    converted_vars: VarMap<Arc<dyn Any + Send + Sync>>,
    vars: VarMap<String>,
}

impl Context {
    pub(crate) fn new(head: Parts, body: OptionReqBody, response: Arc<ResponseWriter>) -> Self {
        Self {
            head,
            body,
            response,
            request_vars: RwLock::new(HashMap::new()),
            converted_vars: RwLock::new(HashMap::new()),
            vars: RwLock::new(HashMap::new()),
        }
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    pub fn version(&self) -> Version {
        self.head.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// The response writer for this request.
    pub fn response(&self) -> &ResponseWriter {
        &self.response
    }

    /// The consume-once request body handle.
    pub fn body(&self) -> OptionReqBody {
        self.body.clone()
    }

    /// The raw string value a path variable matched, if any.
    pub fn request_var(&self, name: &str) -> Option<String> {
        read(&self.request_vars).get(name).cloned()
    }

    /// Snapshot of all raw path variables extracted so far.
    pub fn request_vars(&self) -> HashMap<String, String> {
        read(&self.request_vars).clone()
    }

    pub(crate) fn set_request_var(&self, name: &str, value: &str) {
        write(&self.request_vars).insert(name.to_string(), value.to_string());
    }

    /// The converted value a registered converter produced for a path
    /// variable. Returns `None` when the variable has no converter, did not
    /// match, or was converted to a different type.
    pub fn converted_var<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        let value = read(&self.converted_vars).get(name).cloned()?;
        value.downcast::<T>().ok()
    }

    pub(crate) fn set_converted_var(&self, name: &str, value: Arc<dyn Any + Send + Sync>) {
        write(&self.converted_vars).insert(name.to_string(), value);
    }

    /// Stores a free-form per-request variable.
    pub fn set_var(&self, name: impl Into<String>, value: impl Into<String>) {
        write(&self.vars).insert(name.into(), value.into());
    }

    /// Reads a free-form per-request variable.
    pub fn var(&self, name: &str) -> Option<String> {
        read(&self.vars).get(name).cloned()
    }

    /// Appends text to the response body.
    pub fn write_str(&self, content: &str) {
        self.response.write_str(content);
    }

    /// Writes `value` as a JSON response.
    pub fn write_json<T: Serialize>(&self, value: &T) -> Result<(), HandleError> {
        self.response.write_json(value)
    }

    /// Buffers and decodes the request body as JSON.
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, HandleError> {
        let bytes = self.body.read_bytes().await?;
        serde_json::from_slice(&bytes).map_err(HandleError::decode)
    }

    /// Buffers and decodes the request body as a url-encoded form.
    pub async fn read_form<T: DeserializeOwned>(&self) -> Result<T, HandleError> {
        let bytes = self.body.read_bytes().await?;
        serde_urlencoded::from_bytes(&bytes).map_err(HandleError::decode)
    }
}

fn read<V>(map: &VarMap<V>) -> RwLockReadGuard<'_, HashMap<String, V>> {
    map.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<V>(map: &VarMap<V>) -> RwLockWriteGuard<'_, HashMap<String, V>> {
    map.write().unwrap_or_else(PoisonError::into_inner)
}

/// The raw string value of the path variable a converter runs for.
///
/// The dispatcher seeds every converter invocation with a `RawVar`, so a
/// converter's signature reads naturally:
///
/// ```ignore
/// async fn find_user(raw: RawVar, repo: Arc<UserRepository>) -> Option<User> {
///     repo.find(raw.as_str())
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVar(pub String);

impl RawVar {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Inject for RawVar {
    fn inject(injector: &Injector) -> Result<Self, InjectError> {
        Ok(injector.resolve::<RawVar>()?.as_ref().clone())
    }
}
