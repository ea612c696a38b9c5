use crate::body::ResponseBody;
use crate::error::HandleError;
use bytes::{BufMut, BytesMut};
use http::header::{CONTENT_TYPE, HeaderName};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The framework's view of the outbound response.
///
/// Handlers write status, headers and body through this wrapper; the
/// dispatcher observes the status code and the number of body bytes written
/// to decide whether an error handler must be substituted. The buffered
/// state is turned into an [`http::Response`] once the request is done.
pub struct ResponseWriter {
    state: Mutex<ResponseState>,
}

struct ResponseState {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseWriter {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(ResponseState { status: StatusCode::OK, headers: HeaderMap::new(), body: BytesMut::new() }),
        }
    }

    /// The current response status, `200 OK` until a handler changes it.
    pub fn status(&self) -> StatusCode {
        self.lock().status
    }

    pub fn set_status(&self, status: StatusCode) {
        self.lock().status = status;
    }

    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.lock().headers.insert(name, value);
    }

    pub fn contains_header(&self, name: &HeaderName) -> bool {
        self.lock().headers.contains_key(name)
    }

    /// Number of body bytes written so far.
    pub fn bytes_written(&self) -> usize {
        self.lock().body.len()
    }

    /// Appends raw bytes to the response body.
    pub fn write(&self, bytes: &[u8]) {
        self.lock().body.put_slice(bytes);
    }

    /// Appends text to the response body, defaulting the content type to
    /// `text/plain` when none was set.
    pub fn write_str(&self, content: &str) {
        let mut state = self.lock();
        if !state.headers.contains_key(CONTENT_TYPE) {
            state.headers.insert(CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.as_ref().parse().unwrap());
        }
        state.body.put_slice(content.as_bytes());
    }

    /// Serializes `value` as JSON into the response body and sets the
    /// content type to `application/json`.
    pub fn write_json<T: Serialize>(&self, value: &T) -> Result<(), HandleError> {
        let encoded = serde_json::to_vec(value)?;
        let mut state = self.lock();
        state.headers.insert(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref().parse().unwrap());
        state.body.put_slice(&encoded);
        Ok(())
    }

    pub(crate) fn finish(&self) -> Response<ResponseBody> {
        let mut state = self.lock();
        let mut response = Response::new(ResponseBody::once(state.body.split().freeze()));
        *response.status_mut() = state.status;
        *response.headers_mut() = std::mem::take(&mut state.headers);
        response
    }

    fn lock(&self) -> MutexGuard<'_, ResponseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
