use crate::error::{BoxError, HandleError};
use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body::{Frame, SizeHint};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::Mutex;

/// The request body as handed over by the transport layer.
pub type ReqBody = UnsyncBoxBody<Bytes, BoxError>;

/// Erases a transport body into a [`ReqBody`].
pub fn boxed_body<B>(body: B) -> ReqBody
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    body.map_err(Into::into).boxed_unsync()
}

/// An empty request body, useful when driving an application without a transport.
pub fn empty_body() -> ReqBody {
    boxed_body(Empty::new())
}

/// A request body carrying the given bytes.
pub fn full_body(content: impl Into<Bytes>) -> ReqBody {
    boxed_body(Full::new(content.into()))
}

/// A consume-once handle on the request body.
///
/// Cloning shares the same underlying body, so whichever consumer reads it
/// first wins and later reads observe [`HandleError::BodyConsumed`].
#[derive(Clone)]
pub struct OptionReqBody {
    inner: Arc<Mutex<Option<ReqBody>>>,
}

impl From<ReqBody> for OptionReqBody {
    fn from(body: ReqBody) -> Self {
        OptionReqBody { inner: Arc::new(Mutex::new(Some(body))) }
    }
}

impl OptionReqBody {
    /// Returns true while the body has not been consumed yet.
    pub async fn can_consume(&self) -> bool {
        let guard = self.inner.lock().await;
        guard.is_some()
    }

    /// Consumes the body and buffers it fully.
    pub async fn read_bytes(&self) -> Result<Bytes, HandleError> {
        let mut guard = self.inner.lock().await;
        let body = guard.take().ok_or(HandleError::BodyConsumed)?;
        let collected = body.collect().await.map_err(HandleError::body)?;
        Ok(collected.to_bytes())
    }
}

/// A buffered, single-chunk response body.
pub struct ResponseBody {
    inner: Option<Bytes>,
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { inner: None }
    }

    pub fn once(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self::empty() } else { Self { inner: Some(bytes) } }
    }

    /// Returns the buffered content, consuming the body.
    pub fn into_bytes(self) -> Bytes {
        self.inner.unwrap_or_else(Bytes::new)
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        Self::once(Bytes::from(value.as_bytes()))
    }
}

impl From<Bytes> for ResponseBody {
    fn from(value: Bytes) -> Self {
        Self::once(value)
    }
}

impl From<()> for ResponseBody {
    fn from(_: ()) -> Self {
        Self::empty()
    }
}

impl HttpBody for ResponseBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let inner = &mut self.get_mut().inner;
        match inner.take() {
            Some(bytes) => Poll::Ready(Some(Ok(Frame::data(bytes)))),
            None => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            Some(bytes) => SizeHint::with_exact(bytes.len() as u64),
            None => SizeHint::with_exact(0),
        }
    }
}
