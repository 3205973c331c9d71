//! Wire protocol for the AI gateway: the external envelope and
//! response shapes a client sends/receives, independent of how the engine
//! resolves or executes a turn.
//!
//! This crate deliberately has no dependency on `gateway-core` — it is the
//! stable contract both the engine and any transport (HTTP, queue consumer)
//! compile against, the way `stream-event` is a dependency-free protocol
//! crate that `loom` bridges into.

pub mod finish_reason;
pub mod request;
pub mod response;

pub use finish_reason::FinishReason;
pub use request::{BatchRequest, ChatRequest, ResponseFormat, UserUrl, UserUrlType};
pub use response::{
    BatchAckResponse, BatchItem, ChatData, ChatResponse, EmbeddingData, EmbeddingResponse, ImageData,
    ImageResponse, Usage, VideoData, VideoResponse,
};
