//! Parameter Normalizer: canonical-to-provider parameter
//! mapping, sentinel resolution, and prompt template substitution.

pub mod params;
pub mod sentinel;
pub mod template;

pub use params::{normalize, CallType};
pub use sentinel::resolve_sentinel;
pub use template::{flatten_variables, render, TemplateResult};
