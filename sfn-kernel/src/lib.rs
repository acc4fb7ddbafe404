//! Stream function runtime: lifecycle, transport, contexts and handler dispatch.
//!
//! A [`StreamFunction`] stores one handler, connects through a [`Transport`],
//! and invokes the handler for each inbound frame, one at a time. It also
//! implements [`FunctionCaller`] so it can be registered as an LLM tool.

#![warn(missing_docs, clippy::pedantic)]

mod context;
mod handlers;
mod lifecycle;
mod source;
mod transport;

use std::future::Future;
use std::sync::Arc;

use sfn_config::StreamFunctionConfig;
use sfn_primitives::AppId;
use sfn_tools::{FunctionCaller, ModelDescriptor, RegistryError, ToolRegistry};
use thiserror::Error;
use tracing::{info, warn};

pub use context::{
    CONTEXT_TAG, Context, DecodeError, DecodeResult, TYPED_CONTEXT_TAG, TypedContext,
};
pub use handlers::{HandlerError, HandlerResult, StreamHandler, TypedHandler, dispatch, typed};
pub use lifecycle::{Lifecycle, LifecycleError, LifecycleEvent, LifecycleResult, StreamState};
pub use source::Source;
pub use transport::{Frame, LocalTransport, Transport, TransportError, TransportResult};

/// Errors surfaced by [`StreamFunction`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The operation is not allowed in the current state.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// Connecting to the broker failed.
    #[error("stream function `{name}` failed to connect: {source}")]
    Connection {
        /// Stream function name.
        name: String,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// Tool registration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Registration was attempted after connecting.
    #[error("stream function `{name}` is connected; register it before connecting")]
    RegistrationClosed {
        /// Stream function name.
        name: String,
    },
    /// The receive loop started without a handler.
    #[error("stream function `{name}` has no handler")]
    MissingHandler {
        /// Stream function name.
        name: String,
    },
}

/// Result alias for runtime operations.
pub type RuntimeResult<T = ()> = Result<T, RuntimeError>;

/// A named function that consumes tagged messages from the broker.
pub struct StreamFunction {
    name: String,
    app_id: AppId,
    description: String,
    model: Option<ModelDescriptor>,
    handler: Option<Arc<dyn StreamHandler>>,
    transport: Arc<dyn Transport>,
    local: Option<Arc<LocalTransport>>,
    lifecycle: Lifecycle,
}

impl std::fmt::Debug for StreamFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamFunction")
            .field("name", &self.name)
            .field("app_id", &self.app_id)
            .field("zipper_addr", &self.transport.addr())
            .field("state", &self.lifecycle.state())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl StreamFunction {
    /// Creates a function for `zipper_addr` using the in-process transport.
    #[must_use]
    pub fn new(name: impl Into<String>, zipper_addr: impl Into<String>) -> Self {
        let local = Arc::new(LocalTransport::new(zipper_addr));
        let mut sfn = Self::with_transport(name, local.clone());
        sfn.local = Some(local);
        sfn
    }

    /// Creates a function over an existing transport.
    #[must_use]
    pub fn with_transport(name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        let name = name.into();
        Self {
            lifecycle: Lifecycle::new(name.clone()),
            name,
            app_id: AppId::default(),
            description: String::new(),
            model: None,
            handler: None,
            transport,
            local: None,
        }
    }

    /// Creates a function from configuration, using the in-process transport.
    #[must_use]
    pub fn from_config(config: &StreamFunctionConfig) -> Self {
        let local = Arc::new(LocalTransport::new(config.zipper_addr.clone()));
        let mut sfn = Self::from_config_with_transport(config, local.clone());
        sfn.local = Some(local);
        sfn
    }

    /// Creates a function from configuration over an existing transport.
    #[must_use]
    pub fn from_config_with_transport(
        config: &StreamFunctionConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let mut sfn = Self::with_transport(config.name.clone(), transport).with_app_id(config.app_id.clone());
        sfn.description.clone_from(&config.description);
        sfn
    }

    /// Sets the application the function's tool is registered under.
    #[must_use]
    pub fn with_app_id(mut self, app_id: AppId) -> Self {
        self.app_id = app_id;
        self
    }

    /// Returns the in-process transport created by [`Self::new`] or
    /// [`Self::from_config`], used to feed inbound frames and close the stream.
    ///
    /// `None` when the function was built over a caller-supplied transport.
    #[must_use]
    pub fn local_transport(&self) -> Option<Arc<LocalTransport>> {
        self.local.clone()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> StreamState {
        self.lifecycle.state()
    }

    /// Returns the broker address.
    #[must_use]
    pub fn zipper_addr(&self) -> &str {
        self.transport.addr()
    }

    /// Stores `handler`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Lifecycle`] once the function has connected.
    pub fn set_handler<H>(&mut self, handler: H) -> RuntimeResult
    where
        H: StreamHandler + 'static,
    {
        self.lifecycle.transition(LifecycleEvent::AttachHandler)?;
        if self.handler.replace(Arc::new(handler)).is_some() {
            info!(name = %self.name, "stream function handler replaced");
        }
        Ok(())
    }

    /// Connects to the broker.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Lifecycle`] when no handler is set or the
    /// function already connected, and [`RuntimeError::Connection`] when the
    /// transport fails. The state is unchanged on error.
    pub async fn connect(&mut self) -> RuntimeResult {
        let mut next = self.lifecycle.clone();
        next.transition(LifecycleEvent::Connect)?;

        info!(name = %self.name, zipper_addr = %self.transport.addr(), "stream function connect");
        self.transport
            .connect()
            .await
            .map_err(|source| RuntimeError::Connection {
                name: self.name.clone(),
                source,
            })?;

        self.lifecycle = next;
        Ok(())
    }

    /// Processes inbound frames until the stream ends or Ctrl-C is received.
    ///
    /// # Errors
    ///
    /// See [`StreamFunction::wait_until`].
    pub async fn wait(&mut self) -> RuntimeResult {
        self.wait_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Processes inbound frames until the stream ends or `shutdown` resolves.
    ///
    /// Each handler call completes before the next frame is read. Handler
    /// errors are logged and do not stop the loop.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Lifecycle`] unless the function is connected.
    pub async fn wait_until<S>(&mut self, shutdown: S) -> RuntimeResult
    where
        S: Future<Output = ()>,
    {
        let Some(handler) = self.handler.clone() else {
            return Err(RuntimeError::MissingHandler {
                name: self.name.clone(),
            });
        };
        self.lifecycle.transition(LifecycleEvent::Run)?;
        info!(name = %self.name, app_id = %self.app_id, "stream function running");

        tokio::pin!(shutdown);
        let mut processed = 0_u64;
        loop {
            let frame = tokio::select! {
                () = &mut shutdown => {
                    info!(name = %self.name, "shutdown requested");
                    break;
                }
                frame = self.transport.recv() => frame,
            };
            let Some(frame) = frame else {
                break;
            };

            let ctx = Context::new(frame.payload, Arc::clone(&self.transport));
            let request_id = ctx.request_id();
            processed += 1;
            if let Err(err) = dispatch(handler.as_ref(), ctx).await {
                warn!(
                    name = %self.name,
                    %request_id,
                    tag = %frame.tag,
                    error = %err,
                    "stream handler failed"
                );
            }
        }

        self.lifecycle.terminate();
        info!(name = %self.name, processed, "stream function terminated");
        Ok(())
    }

    /// Stops the function. Allowed from any state.
    pub fn terminate(&mut self) {
        self.lifecycle.terminate();
    }

    /// Registers this function as a tool.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::RegistrationClosed`] after connecting and
    /// [`RuntimeError::Registry`] when the model cannot be reflected.
    pub fn register(&self, registry: &ToolRegistry) -> RuntimeResult {
        if self.lifecycle.state().is_connected() {
            return Err(RuntimeError::RegistrationClosed {
                name: self.name.clone(),
            });
        }
        registry.register(self)?;
        Ok(())
    }

    fn registration_open(&self, field: &str) -> bool {
        let open = !self.lifecycle.state().is_connected();
        if !open {
            warn!(name = %self.name, field, "ignoring change after connect");
        }
        open
    }
}

impl FunctionCaller for StreamFunction {
    fn app_id(&self) -> &AppId {
        &self.app_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_description(&mut self, description: String) {
        if self.registration_open("description") {
            self.description = description;
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn set_model(&mut self, model: ModelDescriptor) {
        if self.registration_open("model") {
            self.model = Some(model);
        }
    }

    fn model(&self) -> Option<ModelDescriptor> {
        self.model
    }
}
