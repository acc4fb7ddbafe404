//! Handler trait and dispatch for inbound stream messages.

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::context::{Context, DecodeError, TypedContext};
use crate::transport::TransportError;

/// Errors a handler can report for a single message.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The payload did not fit the expected model.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Writing a reply failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Custom handler error with human-readable context.
    #[error("handler error: {0}")]
    Custom(String),
}

impl HandlerError {
    /// Creates a custom error variant from a string-like value.
    #[must_use]
    pub fn custom(reason: impl Into<String>) -> Self {
        Self::Custom(reason.into())
    }
}

/// Result alias for handler operations.
pub type HandlerResult<T = ()> = Result<T, HandlerError>;

/// Processes one inbound message.
///
/// Implemented for any `Fn(Context) -> impl Future<Output = HandlerResult>`,
/// so async closures can be passed directly.
#[async_trait]
pub trait StreamHandler: Send + Sync {
    /// Handles the message carried by `ctx`.
    async fn handle(&self, ctx: Context) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> StreamHandler for F
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, ctx: Context) -> HandlerResult {
        self(ctx).await
    }
}

/// Handler written against [`TypedContext<M>`]. Built with [`typed`].
pub struct TypedHandler<M, F> {
    handler: F,
    _model: PhantomData<fn() -> M>,
}

impl<M, F> std::fmt::Debug for TypedHandler<M, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedHandler")
            .field("model", &std::any::type_name::<M>())
            .finish_non_exhaustive()
    }
}

/// Adapts a handler taking [`TypedContext<M>`] into a [`StreamHandler`].
pub fn typed<M, F, Fut>(handler: F) -> TypedHandler<M, F>
where
    M: DeserializeOwned + 'static,
    F: Fn(TypedContext<M>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    TypedHandler {
        handler,
        _model: PhantomData,
    }
}

#[async_trait]
impl<M, F, Fut> StreamHandler for TypedHandler<M, F>
where
    M: DeserializeOwned + 'static,
    F: Fn(TypedContext<M>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, ctx: Context) -> HandlerResult {
        (self.handler)(ctx.typed()).await
    }
}

/// Invokes `handler` for `ctx` and waits for it to finish.
///
/// # Errors
///
/// Propagates errors returned by the handler.
pub async fn dispatch<H>(handler: &H, ctx: Context) -> HandlerResult
where
    H: StreamHandler + ?Sized,
{
    let request_id = ctx.request_id();
    debug!(%request_id, bytes = ctx.data().len(), "dispatching message");
    let result = handler.handle(ctx).await;
    debug!(%request_id, ok = result.is_ok(), "handler finished");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::Deserialize;

    use crate::transport::LocalTransport;

    #[derive(Debug, Deserialize)]
    struct Person {
        name: String,
        age: i64,
    }

    fn context(payload: &'static str) -> Context {
        Context::new(payload, Arc::new(LocalTransport::new("localhost:9000")))
    }

    #[tokio::test]
    async fn closure_handlers_are_dispatched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = move |ctx: Context| {
            let counter = Arc::clone(&counter);
            async move {
                let person: Person = ctx.parse_model()?;
                assert_eq!(person.name, "test");
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), HandlerError>(())
            }
        };

        dispatch(&handler, context(r#"{"name":"test","age":18}"#))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn decode_errors_surface_to_caller() {
        let handler = |ctx: Context| async move {
            ctx.parse_model::<Person>()?;
            Ok::<(), HandlerError>(())
        };

        let err = dispatch(&handler, context(r#"{"name":"test","age":"x"}"#))
            .await
            .expect_err("age must be numeric");
        assert!(matches!(err, HandlerError::Decode(_)));
    }

    #[tokio::test]
    async fn typed_handlers_receive_models() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let handler = typed(move |ctx: TypedContext<Person>| {
            let counter = Arc::clone(&counter);
            async move {
                let person = ctx
                    .data()
                    .ok_or_else(|| HandlerError::custom("payload did not match"))?;
                counter.store(usize::try_from(person.age).unwrap_or_default(), Ordering::SeqCst);
                Ok::<(), HandlerError>(())
            }
        });

        let boxed: Box<dyn StreamHandler> = Box::new(handler);
        dispatch(boxed.as_ref(), context(r#"{"name":"test","age":18}"#))
            .await
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 18);

        let err = dispatch(boxed.as_ref(), context("[]")).await.expect_err("not a person");
        assert!(matches!(err, HandlerError::Custom(_)));
    }
}
