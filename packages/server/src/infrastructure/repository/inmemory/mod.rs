//! InMemory 実装
//!
//! プロセス内の HashMap / DashMap をストアとして使う実装群。単一プロセスで
//! 動かす構成とテストで使用します。

pub mod conversation;
pub mod message;
pub mod quota;
pub mod token_list;
pub mod user;

pub use conversation::InMemoryConversationRepository;
pub use message::InMemoryMessageRepository;
pub use quota::MemoryQuotaStore;
pub use token_list::InMemoryTokenListStore;
pub use user::InMemoryUserRepository;
