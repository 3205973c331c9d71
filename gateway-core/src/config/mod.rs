//! Configuration resolution: fetching bridge documents,
//! decrypting API keys, expanding connected-agent graphs, and materializing
//! tool lists.

pub mod crypto;
pub mod document_store;
pub mod resolver;
pub mod types;

pub use document_store::DocumentStore;
pub use resolver::{ConfigurationResolver, ResolveOverrides, ResolvedConfig};
pub use types::{BridgeConfig, ModelConfig, Service, ToolSpec, ToolTarget};
