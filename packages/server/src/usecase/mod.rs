//! UseCase layer
//!
//! エンドポイントごとのビジネスロジック。ドメイン層の trait
//! （リポジトリ・MessagePusher）にだけ依存し、具体的な実装は注入されます。

pub mod access;
pub mod connect_client;
pub mod conversation_rooms;
pub mod disconnect_client;
pub mod dispatcher;
pub mod endpoints;
pub mod error;
pub mod live_edit;
pub mod notify_typing;
pub mod presence;
pub mod read_messages;
pub mod send_message;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use connect_client::ConnectClientUseCase;
pub use conversation_rooms::ConversationRoomsUseCase;
pub use disconnect_client::DisconnectClientUseCase;
pub use dispatcher::{EndpointDispatcher, EndpointHandler};
pub use error::ConnectError;
pub use live_edit::LiveEditUseCase;
pub use notify_typing::NotifyTypingUseCase;
pub use read_messages::ReadMessagesUseCase;
pub use send_message::SendMessageUseCase;
pub use session::SessionUseCase;
