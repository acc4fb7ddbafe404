//! Per-application registry of LLM tools.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use sfn_primitives::AppId;
use thiserror::Error;
use tracing::{info, warn};

use crate::schema::{ModelDescriptor, SchemaError};
use crate::types::{Function, ToolCall};

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors produced by tool registration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The model attached to the function could not be reflected.
    #[error("failed to derive schema for tool `{name}`: {source}")]
    Schema {
        /// Name of the tool being registered.
        name: String,
        /// Underlying derivation failure.
        #[source]
        source: SchemaError,
    },
}

/// Capability implemented by anything that can be exposed to an LLM as a
/// function.
///
/// Description and model must be set before the implementor is registered.
pub trait FunctionCaller: Send + Sync {
    /// Application the function belongs to.
    fn app_id(&self) -> &AppId;

    /// Function name advertised to the model.
    fn name(&self) -> &str;

    /// Sets the description advertised to the model.
    fn set_description(&mut self, description: String);

    /// Returns the description advertised to the model.
    fn description(&self) -> &str;

    /// Sets the model whose shape becomes the function parameters.
    fn set_model(&mut self, model: ModelDescriptor);

    /// Returns the model whose shape becomes the function parameters.
    fn model(&self) -> Option<ModelDescriptor>;
}

/// Registry of tools keyed by application.
///
/// A single lock guards the whole map for the duration of each registration.
/// Tool lists are append-only and keep registration order; names are not
/// deduplicated.
#[derive(Default)]
pub struct ToolRegistry {
    inner: Mutex<HashMap<AppId, Vec<ToolCall>>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        let counts: HashMap<_, _> = inner
            .iter()
            .map(|(app_id, tools)| (app_id.as_str(), tools.len()))
            .collect();
        f.debug_struct("ToolRegistry")
            .field("registered", &counts)
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry, creating it on first use.
    #[must_use]
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<ToolRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// Registers the supplied function under its application id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Schema`] when the function's model cannot be
    /// reflected. The registry is left unchanged in that case.
    pub fn register(&self, caller: &dyn FunctionCaller) -> RegistryResult<()> {
        self.register_tool(
            caller.app_id(),
            caller.name(),
            caller.description(),
            caller.model(),
        )
    }

    /// Derives the schema for `model` and appends a function tool for
    /// `app_id`.
    ///
    /// A missing model, or one without fields, registers a tool without
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Schema`] when the model cannot be reflected.
    /// The registry is left unchanged in that case.
    pub fn register_tool(
        &self,
        app_id: &AppId,
        name: &str,
        description: &str,
        model: Option<ModelDescriptor>,
    ) -> RegistryResult<()> {
        let mut inner = self.lock();

        let parameters = match model {
            Some(model) => model.derive().map_err(|source| RegistryError::Schema {
                name: name.to_owned(),
                source,
            })?,
            None => {
                warn!(app_id = %app_id, name, "no model set for LLM function");
                None
            }
        };

        let rendered = serde_json::to_string(&parameters).unwrap_or_default();
        info!(
            app_id = %app_id,
            name,
            description,
            parameters = %rendered,
            "register LLM function"
        );

        let function = Function::new(name, description).with_parameters(parameters);
        inner
            .entry(app_id.clone())
            .or_default()
            .push(ToolCall::function(function));

        Ok(())
    }

    /// Returns the tools registered for `app_id`, in registration order.
    #[must_use]
    pub fn tools_for(&self, app_id: &AppId) -> Vec<ToolCall> {
        self.lock().get(app_id).cloned().unwrap_or_default()
    }

    /// Returns the applications that have at least one tool.
    #[must_use]
    pub fn app_ids(&self) -> Vec<AppId> {
        let mut ids: Vec<_> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns the number of tools registered across all applications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    /// Returns `true` when no tool has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Registration never mutates before it can fail, so a poisoned map is
    // still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<AppId, Vec<ToolCall>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    use schemars::JsonSchema;
    use schemars::r#gen::SchemaGenerator;
    use schemars::schema::Schema;

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    #[serde(rename_all = "PascalCase")]
    struct Person {
        #[serde(default)]
        name: String,
        age: i64,
    }

    struct Opaque;

    impl JsonSchema for Opaque {
        fn schema_name() -> String {
            "Opaque".to_owned()
        }

        fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
            Schema::Bool(false)
        }
    }

    struct Caller {
        app_id: AppId,
        name: String,
        description: String,
        model: Option<ModelDescriptor>,
    }

    impl FunctionCaller for Caller {
        fn app_id(&self) -> &AppId {
            &self.app_id
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn set_description(&mut self, description: String) {
            self.description = description;
        }

        fn description(&self) -> &str {
            &self.description
        }

        fn set_model(&mut self, model: ModelDescriptor) {
            self.model = Some(model);
        }

        fn model(&self) -> Option<ModelDescriptor> {
            self.model
        }
    }

    fn app(id: &str) -> AppId {
        AppId::new(id).unwrap()
    }

    #[test]
    fn register_through_capability() {
        let registry = ToolRegistry::new();
        let mut caller = Caller {
            app_id: app("a1"),
            name: "person".to_owned(),
            description: String::new(),
            model: None,
        };
        caller.set_description("look up a person".to_owned());
        caller.set_model(ModelDescriptor::of::<Person>());

        registry.register(&caller).unwrap();

        let tools = registry.tools_for(&app("a1"));
        assert_eq!(tools.len(), 1);
        assert!(tools[0].is_function());
        assert_eq!(tools[0].function.name, "person");
        assert_eq!(tools[0].function.description, "look up a person");

        let params = tools[0].function.parameters.as_ref().expect("schema");
        assert_eq!(params.properties["Name"].kind, "string");
        assert_eq!(params.properties["Age"].kind, "integer");
        assert_eq!(params.required, vec!["Age".to_owned()]);
    }

    #[test]
    fn keeps_registration_order_and_duplicates() {
        let registry = ToolRegistry::new();
        let model = Some(ModelDescriptor::of::<Person>());

        registry.register_tool(&app("a1"), "first", "", model).unwrap();
        registry.register_tool(&app("a1"), "second", "", model).unwrap();
        registry.register_tool(&app("a1"), "first", "", model).unwrap();

        let names: Vec<_> = registry
            .tools_for(&app("a1"))
            .into_iter()
            .map(|tool| tool.function.name)
            .collect();
        assert_eq!(names, vec!["first", "second", "first"]);
    }

    #[test]
    fn failed_registration_leaves_registry_unchanged() {
        let registry = ToolRegistry::new();
        registry
            .register_tool(&app("a1"), "person", "", Some(ModelDescriptor::of::<Person>()))
            .unwrap();
        let before = registry.tools_for(&app("a1"));

        let err = registry
            .register_tool(&app("a1"), "opaque", "", Some(ModelDescriptor::of::<Opaque>()))
            .expect_err("boolean schema cannot be reflected");

        assert!(matches!(err, RegistryError::Schema { ref name, .. } if name == "opaque"));
        assert_eq!(registry.tools_for(&app("a1")), before);
        assert!(registry.tools_for(&app("other")).is_empty());
    }

    #[test]
    fn missing_or_empty_models_register_without_parameters() {
        let registry = ToolRegistry::new();
        registry.register_tool(&app("a1"), "bare", "", None).unwrap();
        registry
            .register_tool(&app("a1"), "text", "", Some(ModelDescriptor::of::<String>()))
            .unwrap();

        let tools = registry.tools_for(&app("a1"));
        assert_eq!(tools.len(), 2);
        assert!(tools.iter().all(|tool| tool.function.parameters.is_none()));
    }

    #[test]
    fn partitions_by_app_id() {
        let registry = ToolRegistry::new();
        registry.register_tool(&app("a1"), "one", "", None).unwrap();
        registry.register_tool(&app("a2"), "two", "", None).unwrap();

        assert_eq!(registry.app_ids(), vec![app("a1"), app("a2")]);
        assert_eq!(registry.tools_for(&app("a2"))[0].function.name, "two");
        assert_eq!(registry.len(), 2);
        assert!(registry.tools_for(&app("missing")).is_empty());
    }

    #[test]
    fn concurrent_registrations_are_not_lost() {
        let registry = Arc::new(ToolRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let app_id = app(if i % 2 == 0 { "even" } else { "odd" });
                    let model = Some(ModelDescriptor::of::<Person>());
                    registry
                        .register_tool(&app_id, &format!("tool-{i}"), "", model)
                        .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.tools_for(&app("even")).len(), 4);
        assert_eq!(registry.tools_for(&app("odd")).len(), 4);
    }

    #[test]
    fn global_registry_is_shared() {
        assert!(Arc::ptr_eq(&ToolRegistry::global(), &ToolRegistry::global()));
    }
}
