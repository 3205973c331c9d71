//! # gateway-core
//!
//! The dispatch core of a multi-provider LLM gateway: one `BridgeConfig`
//! document resolves into a flat map of itself plus every reachable
//! connected agent, a turn runs through guardrails, prompt rendering,
//! provider dispatch, a bounded tool-call loop, optional agent transfer, and
//! fallback retry, then the result is priced, persisted, and delivered.
//!
//! ## Main modules
//!
//! - [`config`]: [`config::types::BridgeConfig`], [`config::resolver::ConfigurationResolver`] —
//!   bridge resolution, API-key decryption, tool-list materialization.
//! - [`normalizer`]: [`normalizer::normalize`], [`normalizer::resolve_sentinel`],
//!   [`normalizer::render`] — canonical-to-provider parameter mapping and prompt templating.
//! - [`provider`]: [`provider::ProviderAdapter`], [`provider::ProviderRegistry`] — the one seam
//!   on provider identity; `openai`, `anthropic`, `gemini`, `ai_ml`, and the
//!   `openai_completion`/`openai_compatible` variants.
//! - [`engine`]: [`engine::GatewayEngine`] — runs one turn end to end
//!   (guardrails, dispatch, tool loop, transfer, fallback, response shaping).
//! - [`transfer`]: [`transfer::TransferHistory`], [`transfer::persist_chain`] — agent handoff.
//! - [`batch`]: [`batch::BatchReconciler`] — provider-agnostic async batch polling.
//! - [`queue`]: [`queue::BaseQueue`], [`queue::PrimaryQueueHandler`],
//!   [`queue::SecondaryQueueHandler`] — durable RabbitMQ consumers.
//! - [`cache`]: [`cache::DistributedCache`] — Redis-backed caches, ledgers, locks.
//! - [`limits`]: [`limits::check_bridge_api_folder_limits`], [`limits::compute_total_cost`],
//!   [`limits::rate_limit`] — quota checks, cost ledger, fixed-window backpressure.
//! - [`context`]: [`context::ConversationTurn`], [`context::ConversationStore`],
//!   [`context::alert`] — persisted history and webhook-alert dispatch.
//! - [`tools`]: [`tools::ToolInvoker`] — parallel tool execution, built-in web search/crawl.
//! - [`testcase`]: [`testcase::run_test_cases`] — replays `{input, expected_substring}`
//!   cases through a bridge for regression checking.
//! - [`error`]: [`error::GatewayError`] — the crate-wide typed error.
//!
//! `testing` holds in-memory doubles for every port trait, used by every
//! module's own `#[cfg(test)]` suite.

pub mod batch;
pub mod cache;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod limits;
pub mod normalizer;
pub mod provider;
pub mod queue;
pub mod testcase;
pub mod tools;
pub mod transfer;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use engine::GatewayEngine;
pub use error::GatewayError;
