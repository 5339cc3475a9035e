//! Value objects
//!
//! 識別子はすべて i64 の newtype です。ワイヤ上では素の数値として
//! シリアライズされます。

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn value(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// ユーザー ID
    UserId
);
id_type!(
    /// 会話（ルーム）ID
    ConversationId
);
id_type!(
    /// メッセージ ID
    MessageId
);
id_type!(
    /// フレームの `id` フィールド。リクエストと、それに起因するブロードキャストや
    /// エラーフレームを対応付ける。
    CorrelationId
);

/// Largest integer a JavaScript client can represent exactly.
const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

impl CorrelationId {
    /// Random id for server-initiated pushes that answer no request.
    pub fn random() -> Self {
        Self(rand::thread_rng().gen_range(1..=MAX_SAFE_INTEGER))
    }
}
