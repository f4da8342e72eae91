//! Completion-provider access: the trait seam, credential routing, the HTTP
//! client, and helpers for prompts and JSON answers.

pub mod client;
pub mod json;
pub mod prompt;
pub mod provider;
pub mod retry;

pub use client::CompletionClient;
pub use json::{extract_json, parse_json_response};
pub use prompt::{sanitize_for_prompt, truncate_chars};
pub use provider::{
    ApiCredential, CompletionProvider, CompletionRequest, ModelSet, ProviderConfig,
    ResponseFormat, Vendor,
};
