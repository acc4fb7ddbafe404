//! Stream function that greets people, registered as an LLM tool.
//!
//! Runs one synthetic frame through the runtime, prints the completion
//! payload for the configured app id, and with `--invoke` asks an
//! OpenAI-compatible endpoint which function to call.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use schemars::JsonSchema;
use serde::Deserialize;
use sfn_adapters::bridge::LlmBridge;
use sfn_adapters::openai::{OpenAiClient, OpenAiConfig};
use sfn_adapters::request::RequestBuilder;
use sfn_config::{Config, LlmConfig};
use sfn_kernel::{HandlerError, LocalTransport, StreamFunction, TypedContext, typed};
use sfn_primitives::Tag;
use sfn_telemetry::{TracingOptions, init_tracing};
use sfn_tools::{FunctionCaller, ModelDescriptor, ToolRegistry};
use tracing::info;

const INBOUND_TAG: Tag = Tag::new(0x33);
const GREETING_TAG: Tag = Tag::new(0x34);
const SYNTHETIC_FRAME: &str = r#"{"name":"test","age":18,"type":"test"}"#;

/// People stream function demo
#[derive(Parser, Debug)]
#[command(name = "people-sfn", version, about = "Stream function exposed as an LLM tool")]
struct Cli {
    /// JSON configuration file; `SFN_*` variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// User message sent to the model
    #[arg(short, long, default_value = "Say hello to test, who is 18")]
    message: String,

    /// Call the configured completions endpoint
    #[arg(long)]
    invoke: bool,
}

/// A person to greet.
#[derive(Debug, Deserialize, JsonSchema)]
struct Person {
    /// Name of the person.
    #[serde(default)]
    name: String,
    /// Age in years.
    age: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(TracingOptions::default())?;

    let config = load_config(&cli)?;
    let registry = ToolRegistry::global();
    let transport = Arc::new(LocalTransport::new(config.sfn.zipper_addr.clone()));

    let mut sfn = StreamFunction::from_config_with_transport(&config.sfn, transport.clone());
    if sfn.description().is_empty() {
        sfn.set_description("Greet a person by name".to_owned());
    }
    sfn.set_model(ModelDescriptor::of::<Person>());
    sfn.register(&registry)?;

    sfn.set_handler(typed(|ctx: TypedContext<Person>| async move {
        let person = ctx.decode()?;
        info!(request_id = %ctx.request_id(), name = %person.name, age = person.age, "greeting");
        let reply = serde_json::json!({ "greeting": format!("hello {}", person.name) });
        ctx.write(GREETING_TAG, reply.to_string()).await?;
        Ok::<(), HandlerError>(())
    }))?;

    sfn.connect().await?;
    transport.push(INBOUND_TAG, SYNTHETIC_FRAME)?;
    transport.close_inbound();
    sfn.wait().await?;

    let builder = RequestBuilder::new(Arc::clone(&registry));
    let payload = builder.build_invocation_payload(sfn.app_id(), cli.message.as_str())?;
    println!("{payload}");

    if cli.invoke {
        let client = openai_client(&config.llm)?;
        let bridge = LlmBridge::new(builder, Arc::new(client));
        for call in bridge.invoke(sfn.app_id(), cli.message).await? {
            let person: Person = call
                .function
                .parse_arguments()
                .with_context(|| format!("model sent bad arguments for `{}`", call.function.name))?;
            println!("{} -> {person:?}", call.function.name);
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let Some(path) = &cli.config else {
        return Config::from_env();
    };
    let mut config = Config::from_file(path)?;
    config.apply_lookup(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

fn openai_client(llm: &LlmConfig) -> Result<OpenAiClient> {
    let mut config = OpenAiConfig::new(llm.model.clone())
        .with_base_url(&llm.base_url)?
        .with_timeout(Duration::from_secs(llm.timeout_secs));
    if let Ok(key) = std::env::var(&llm.api_key_env) {
        config = config.with_api_key(key);
    }
    if let Some(temperature) = llm.temperature {
        config = config.with_default_temperature(temperature);
    }
    Ok(OpenAiClient::new(config)?)
}
