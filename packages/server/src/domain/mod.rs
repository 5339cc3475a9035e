//! Domain layer
//!
//! 値オブジェクト、メッセージの型、エラー分類、そして外部協調者
//! （リポジトリ・ストア・プッシャー）へのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します。

pub mod command;
pub mod context;
pub mod error;
pub mod frame;
pub mod message;
pub mod message_pusher;
pub mod patch;
pub mod repository;
pub mod store;
pub mod value_object;

pub use command::{Command, Method};
pub use context::RequestContext;
pub use error::{ApiError, ErrorBody, LimitInfo};
pub use frame::Frame;
pub use message::{
    CodeMessage, MediaMessage, MediaObject, Message, MessageBase, MessageHeader, MessageType,
    TextMessage,
};
pub use message_pusher::MessagePusher;
pub use repository::{
    Conversation, ConversationRepository, MessageRepository, RepositoryError, User,
    UserRepository,
};
pub use store::{QuotaStore, StoreError, TokenListStore, TokenRecord};
pub use value_object::{ConversationId, CorrelationId, MessageId, UserId};
