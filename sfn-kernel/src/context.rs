//! Per-message contexts handed to stream handlers.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use sfn_primitives::Tag;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::transport::{Transport, TransportResult};

/// Tag reported by [`Context::tag`].
pub const CONTEXT_TAG: Tag = Tag::new(0x29);

/// Tag reported by [`TypedContext::tag`].
pub const TYPED_CONTEXT_TAG: Tag = Tag::new(0x31);

/// Payload could not be decoded into the requested model.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// JSON decoding failed.
    #[error("failed to decode payload into `{model}`: {source}")]
    Payload {
        /// Type name of the requested model.
        model: &'static str,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result alias for payload decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// One inbound message plus a handle for writing replies.
#[derive(Clone)]
pub struct Context {
    request_id: Uuid,
    received_at: Instant,
    payload: Bytes,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("tag", &CONTEXT_TAG)
            .field("bytes", &self.payload.len())
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Wraps `payload`; writes go through `transport`.
    #[must_use]
    pub fn new(payload: impl Into<Bytes>, transport: Arc<dyn Transport>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            received_at: Instant::now(),
            payload: payload.into(),
            transport,
        }
    }

    /// Identifier correlating log records for this message.
    #[must_use]
    pub const fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Time the context was created.
    #[must_use]
    pub const fn received_at(&self) -> Instant {
        self.received_at
    }

    /// Raw payload bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.payload
    }

    /// Always [`CONTEXT_TAG`].
    #[must_use]
    pub const fn tag(&self) -> Tag {
        CONTEXT_TAG
    }

    /// Sends `data` under `tag` through the runtime's transport.
    ///
    /// # Errors
    ///
    /// Propagates the transport's send failure.
    pub async fn write(&self, tag: Tag, data: impl Into<Bytes>) -> TransportResult<()> {
        let data = data.into();
        debug!(request_id = %self.request_id, %tag, bytes = data.len(), "context write");
        self.transport.send(tag, data).await
    }

    /// Decodes the JSON payload into `M`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Payload`] when the payload is not valid JSON for
    /// `M`.
    pub fn parse_model<M: DeserializeOwned>(&self) -> DecodeResult<M> {
        serde_json::from_slice(&self.payload).map_err(|source| DecodeError::Payload {
            model: type_name::<M>(),
            source,
        })
    }

    /// Decodes the payload into `target`, leaving it untouched on failure.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Payload`] when the payload is not valid JSON for
    /// `M`.
    pub fn parse_into<M: DeserializeOwned>(&self, target: &mut M) -> DecodeResult<()> {
        *target = self.parse_model()?;
        Ok(())
    }

    /// Converts into a context bound to model `M`.
    #[must_use]
    pub fn typed<M>(self) -> TypedContext<M> {
        TypedContext {
            inner: self,
            _model: PhantomData,
        }
    }
}

/// Context whose payload is read as model `M`.
pub struct TypedContext<M> {
    inner: Context,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for TypedContext<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _model: PhantomData,
        }
    }
}

impl<M> fmt::Debug for TypedContext<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedContext")
            .field("model", &type_name::<M>())
            .field("request_id", &self.inner.request_id)
            .field("tag", &TYPED_CONTEXT_TAG)
            .finish_non_exhaustive()
    }
}

impl<M> TypedContext<M> {
    /// Identifier correlating log records for this message.
    #[must_use]
    pub const fn request_id(&self) -> Uuid {
        self.inner.request_id
    }

    /// Raw payload bytes.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        self.inner.data()
    }

    /// Always [`TYPED_CONTEXT_TAG`].
    #[must_use]
    pub const fn tag(&self) -> Tag {
        TYPED_CONTEXT_TAG
    }

    /// Sends `data` under `tag` through the runtime's transport.
    ///
    /// # Errors
    ///
    /// Propagates the transport's send failure.
    pub async fn write(&self, tag: Tag, data: impl Into<Bytes>) -> TransportResult<()> {
        self.inner.write(tag, data).await
    }

    /// Returns the untyped context.
    #[must_use]
    pub fn into_inner(self) -> Context {
        self.inner
    }
}

impl<M: DeserializeOwned> TypedContext<M> {
    /// Decodes the payload, or `None` if it does not fit `M`.
    #[must_use]
    pub fn data(&self) -> Option<M> {
        match self.decode() {
            Ok(model) => Some(model),
            Err(err) => {
                warn!(request_id = %self.inner.request_id, error = %err, "typed context decode failed");
                None
            }
        }
    }

    /// Decodes the payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Payload`] when the payload does not fit `M`.
    pub fn decode(&self) -> DecodeResult<M> {
        self.inner.parse_model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde::Deserialize;

    use crate::transport::{Frame, LocalTransport};

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Person {
        name: String,
        age: i64,
    }

    const PAYLOAD: &str = r#"{"name":"test","age":18,"type":"test"}"#;

    fn context(payload: &'static str) -> (Context, Arc<LocalTransport>) {
        let transport = Arc::new(LocalTransport::new("localhost:9000"));
        (Context::new(payload, transport.clone()), transport)
    }

    #[test]
    fn decodes_matching_payload() {
        let (ctx, _) = context(PAYLOAD);

        assert_eq!(ctx.tag(), Tag::new(0x29));
        assert_eq!(ctx.data(), PAYLOAD.as_bytes());
        assert_eq!(
            ctx.parse_model::<Person>().unwrap(),
            Person {
                name: "test".to_owned(),
                age: 18
            }
        );

        let mut target = Person::default();
        ctx.parse_into(&mut target).unwrap();
        assert_eq!(target.age, 18);
    }

    #[test]
    fn incompatible_payload_is_a_decode_error() {
        let (ctx, _) = context(r#"{"name":"test","age":"eighteen"}"#);

        let err = ctx.parse_model::<Person>().expect_err("age is not a number");
        assert!(matches!(err, DecodeError::Payload { model, .. } if model.ends_with("Person")));

        let mut target = Person::default();
        assert!(ctx.parse_into(&mut target).is_err());
        assert_eq!(target, Person::default());
    }

    #[test]
    fn typed_context_reads_model() {
        let (ctx, _) = context(PAYLOAD);
        let request_id = ctx.request_id();
        let typed = ctx.typed::<Person>();

        assert_eq!(typed.tag(), Tag::new(0x31));
        assert_eq!(typed.request_id(), request_id);
        assert_eq!(typed.data().map(|p| p.name), Some("test".to_owned()));
        assert_eq!(typed.raw(), PAYLOAD.as_bytes());

        let (bad, _) = context("not json");
        assert!(bad.typed::<Person>().data().is_none());
    }

    #[tokio::test]
    async fn write_delegates_to_transport() {
        let (ctx, transport) = context(PAYLOAD);
        transport.connect().await.unwrap();

        ctx.write(Tag::new(0x30), "reply").await.unwrap();
        ctx.typed::<Person>().write(Tag::new(0x31), "typed").await.unwrap();

        assert_eq!(
            transport.sent(),
            vec![
                Frame::new(Tag::new(0x30), "reply"),
                Frame::new(Tag::new(0x31), "typed"),
            ]
        );
    }

    #[test]
    fn request_ids_are_unique() {
        let (a, _) = context(PAYLOAD);
        let (b, _) = context(PAYLOAD);
        assert_ne!(a.request_id(), b.request_id());
    }
}
