use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use sfn_llm::adapters::bridge::LlmBridge;
use sfn_llm::adapters::request::RequestBuilder;
use sfn_llm::adapters::traits::{
    AdapterMetadata, AdapterResult, CompletionClient, CompletionRequest, CompletionResponse,
};
use sfn_llm::config::Config;
use sfn_llm::kernel::{
    CONTEXT_TAG, Context, DecodeError, Frame, HandlerError, LocalTransport, RuntimeError, Source,
    StreamFunction, StreamState, TypedContext, typed,
};
use sfn_llm::primitives::Tag;
use sfn_llm::tools::{Function, FunctionCaller, ModelDescriptor, ToolCall, ToolRegistry};

#[derive(Debug, Deserialize, JsonSchema)]
struct Model {
    name: String,
    /// Age in years.
    age: i64,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
struct AgeAsText {
    name: String,
    age: String,
}

const SYNTHETIC: &str = r#"{"name":"test","age":18,"type":"test"}"#;

struct ChoosingClient {
    metadata: AdapterMetadata,
    requests: Mutex<Vec<CompletionRequest>>,
}

#[async_trait]
impl CompletionClient for ChoosingClient {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn complete(&self, request: &CompletionRequest) -> AdapterResult<CompletionResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let calls = request
            .tools()
            .iter()
            .map(|tool| {
                let mut function = Function::new(tool.function.name.clone(), "");
                function.arguments = Some(r#"{"name":"test","age":18}"#.to_owned());
                let mut call = ToolCall::function(function);
                call.id = Some("call_1".to_owned());
                call
            })
            .collect();
        Ok(CompletionResponse::new(None, calls))
    }
}

#[test]
fn context_decode_scenario() {
    let ctx = Context::new(r#"{"name":"test","age":18}"#, Arc::new(LocalTransport::new("localhost:9000")));

    let model: Model = ctx.parse_model().unwrap();
    assert_eq!(model.name, "test");
    assert_eq!(model.age, 18);

    let err = ctx.parse_model::<AgeAsText>().expect_err("age is numeric");
    assert!(matches!(err, DecodeError::Payload { .. }));
    assert_eq!(ctx.tag(), CONTEXT_TAG);
    assert_eq!(ctx.tag().value(), 0x29);
}

#[tokio::test]
async fn configured_function_registers_runs_and_is_invoked() {
    let config = Config::from_json_str(
        r#"{ "sfn": { "name": "people", "app_id": "aid_people", "zipper_addr": "localhost:9000" } }"#,
    )
    .unwrap();
    let registry = Arc::new(ToolRegistry::new());
    let transport = Arc::new(LocalTransport::new(config.sfn.zipper_addr.clone()));

    let mut sfn = StreamFunction::from_config_with_transport(&config.sfn, transport.clone());
    sfn.set_description("look up a person".to_owned());
    sfn.set_model(ModelDescriptor::of::<Model>());
    sfn.register(&registry).unwrap();

    let ages = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&ages);
    sfn.set_handler(typed(move |ctx: TypedContext<Model>| {
        let seen = Arc::clone(&seen);
        async move {
            let model = ctx.decode()?;
            seen.lock().unwrap().push(model.age);
            ctx.write(Tag::new(0x30), format!("hello {}", model.name)).await?;
            Ok::<(), HandlerError>(())
        }
    }))
    .unwrap();

    sfn.connect().await.unwrap();
    assert!(matches!(
        sfn.register(&registry),
        Err(RuntimeError::RegistrationClosed { .. })
    ));

    transport.push(Tag::new(0x33), SYNTHETIC).unwrap();
    transport.push(Tag::new(0x33), "not json").unwrap();
    transport.close_inbound();
    sfn.wait_until(std::future::pending()).await.unwrap();

    assert_eq!(sfn.state(), StreamState::Terminated);
    assert_eq!(*ages.lock().unwrap(), vec![18]);
    assert_eq!(transport.sent(), vec![Frame::new(Tag::new(0x30), "hello test")]);

    let client = Arc::new(ChoosingClient {
        metadata: AdapterMetadata::new("test", "test-model"),
        requests: Mutex::new(Vec::new()),
    });
    let bridge = LlmBridge::new(RequestBuilder::new(Arc::clone(&registry)), client.clone());
    let calls = bridge.invoke(sfn.app_id(), "hello").await.unwrap();

    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].function.name, "people");
    let args: Model = calls[0].function.parse_arguments().unwrap();
    assert_eq!(args.age, 18);

    let requests = client.requests.lock().unwrap();
    assert_eq!(requests[0].messages()[1].content(), "hello");
    let params = requests[0].tools()[0].function.parameters.as_ref().unwrap();
    assert_eq!(params.properties["age"].description, "Age in years.");
}

#[tokio::test]
async fn source_feeds_a_shared_transport() {
    let transport = Arc::new(LocalTransport::new("localhost:9000"));
    let source = Source::with_transport("people-source", transport.clone());
    source.connect().await.unwrap();
    source.write(Tag::new(0x33), SYNTHETIC).await.unwrap();

    assert_eq!(transport.sent(), vec![Frame::new(Tag::new(0x33), SYNTHETIC)]);
}
