//! OpenRouter-backed debate runner.
//!
//! Wires the engine in `coordination::debate` to a real model provider:
//!
//! - [`client`]: chat-completions [`ModelBackend`](coordination::debate::ModelBackend)
//! - [`prompts`]: the bundled Proponent / Opposition / Judge personas
//! - [`config`]: defaults, TOML file, `.env` / environment, CLI overrides
//! - [`report`]: console blocks plus Markdown and JSON transcripts
//! - [`runner`]: streamed runs with per-turn callbacks

pub mod client;
pub mod config;
pub mod prompts;
pub mod report;
pub mod runner;

pub use client::{ClientError, OpenRouterBackend};
pub use config::{AppConfig, CliOverrides, ConfigError, ProviderConfig};
pub use prompts::TemplateRenderer;
pub use report::{export, to_json, to_markdown, ExportFormat, ReportError};
