//! Completion request building and LLM client adapters.
//!
//! [`request::RequestBuilder`] turns the tools registered for an application
//! into a completion request. Clients implementing [`traits::CompletionClient`]
//! send that request to a model; [`bridge::LlmBridge`] ties both together.

#![warn(missing_docs, clippy::pedantic)]

pub mod bridge;
pub mod openai;
pub mod request;
pub mod traits;

mod http_client;
