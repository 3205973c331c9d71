//! Queue Workers: two durable RabbitMQ queues
//! (`AI-MIDDLEWARE-*` per environment) with `-Failed` dead-letter queues,
//! built on `lapin`.

pub mod base_queue;
pub mod log;
pub mod primary;
pub mod secondary;

pub use base_queue::{BaseQueue, MessageHandler, MAX_DELIVERY_ATTEMPTS};
pub use primary::{EngineEntrypoint, PrimaryQueueHandler};
pub use secondary::{PostProcessJob, SecondaryQueueHandler, ThreadNamer};

pub const PRIMARY_QUEUE_NAME: &str = "AI-MIDDLEWARE-primary";
pub const SECONDARY_QUEUE_NAME: &str = "AI-MIDDLEWARE-secondary";
