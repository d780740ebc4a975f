pub mod remote;

pub use remote::{ChatError, ChatModel, RemoteChatModel, RemoteModelConfig};
