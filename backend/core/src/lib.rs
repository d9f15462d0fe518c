pub mod error;
pub mod message;
pub mod traits;

pub use error::BridgeError;
pub use message::{Author, BotIdentity, ChannelKind, ChannelRef, InboundMessage, SenderKind};
pub use traits::{
    ChatTransport, CompletionLimits, CompletionRequest, CompletionResponse, CompletionService,
};
