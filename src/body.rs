use std::fmt::{self, Debug, Formatter};
use std::io;

use bytes::{Bytes, BytesMut};
use futures::stream::{BoxStream, StreamExt};
use tracing::trace;

/// Request or response payload exchanged with an
/// [`HttpExecutor`](trait.HttpExecutor.html).
///
/// `Full` bodies can be replayed for free. A `Stream` body can be read only
/// once, so the transport buffers it in memory before the first attempt.
pub enum Body {
    Empty,
    Full(Bytes),
    Stream(BoxStream<'static, io::Result<Bytes>>),
}

impl Body {
    pub fn empty() -> Self {
        Body::Empty
    }

    /// Wrap a one-shot chunk stream
    pub fn wrap_stream<S>(stream: S) -> Self
    where
        S: futures::Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Body::Stream(stream.boxed())
    }

    /// True if the body can be handed out again without buffering
    pub fn is_rewindable(&self) -> bool {
        !matches!(self, Body::Stream(_))
    }

    /// Collect the whole body into memory
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Full(bytes) => Ok(bytes),
            Body::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Read and discard the rest of the body so the underlying connection
    /// can be reused. Read errors end the drain early.
    pub async fn drain(self) {
        if let Body::Stream(mut stream) = self {
            while let Some(chunk) = stream.next().await {
                if let Err(e) = chunk {
                    trace!(error = %e, "body drain stopped early");
                    break;
                }
            }
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Empty
    }
}

impl Debug for Body {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Full(bytes) => f.debug_tuple("Body::Full").field(&bytes.len()).finish(),
            Body::Stream(_) => f.write_str("Body::Stream(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            Body::Empty
        } else {
            Body::Full(bytes)
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Bytes::from(s).into()
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Bytes::from_static(s.as_bytes()).into()
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Bytes::from_static(bytes).into()
    }
}

#[cfg(test)]
mod tests {
    use super::Body;
    use bytes::Bytes;
    use futures::stream::{self, StreamExt};
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_into_bytes() {
        assert_eq!(Body::empty().into_bytes().await.unwrap(), Bytes::new());
        assert_eq!(Body::from("The Body").into_bytes().await.unwrap(), "The Body");

        let body = Body::wrap_stream(stream::iter(vec![
            Ok(Bytes::from_static(b"The ")),
            Ok(Bytes::from_static(b"Body")),
        ]));
        assert!(!body.is_rewindable());
        assert_eq!(body.into_bytes().await.unwrap(), "The Body");
    }

    #[tokio::test]
    async fn test_stream_error() {
        let body = Body::wrap_stream(stream::iter(vec![
            Ok(Bytes::from_static(b"The ")),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reset")),
        ]));
        let err = body.into_bytes().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_drain_stops_on_error() {
        let polled = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&polled);
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"Unauth")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"orized")),
        ])
        .inspect(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        Body::wrap_stream(chunks).drain().await;
        assert_eq!(polled.load(Ordering::SeqCst), 2);

        // nothing to read for buffered bodies
        Body::from("Hello World").drain().await;
    }
}
