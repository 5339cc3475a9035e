//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//!
//! ### どのような状況を想定しているか
//! - 正常系：テキスト／コードはルームへブロードキャスト、メディアは送信者にだけ返す
//! - 異常系：非メンバー、未知のメッセージ種別、リポジトリの失敗

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{
    ApiError, ConversationRepository, Message, MessagePusher, MessageRepository, RepositoryError,
    RequestContext, UserId, UserRepository,
};

use super::access::ensure_member;

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    messages: Arc<dyn MessageRepository>,
    conversations: Arc<dyn ConversationRepository>,
    users: Arc<dyn UserRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl SendMessageUseCase {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        conversations: Arc<dyn ConversationRepository>,
        users: Arc<dyn UserRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            messages,
            conversations,
            users,
            message_pusher,
        }
    }

    /// メッセージ送信を実行
    ///
    /// 宛先の会話はフレームの `source`。保存後に採番された ID を付けて配信し、
    /// 配信したメッセージを返す。
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        user: UserId,
        payload: Value,
    ) -> Result<Message, ApiError> {
        let conversation = ctx.source;

        // 1. 会話のメンバーであることを確認
        ensure_member(self.conversations.as_ref(), user, conversation).await?;

        // 2. type を見てからメッセージ本体をデコード
        let mut message = Message::from_json(payload)?;
        let author = self.users.find_by_id(user).await.map_err(|e| match e {
            RepositoryError::NotFound => ApiError::UserDoesNotExist,
            other => other.into(),
        })?;
        message.base_mut().author = author.name;
        // 新しいコードメッセージは常にロックなしで作られる
        if let Message::Code(code) = &mut message {
            code.locked_by = None;
        }

        // 3. 保存して ID を採番
        let id = match &message {
            Message::Text(m) => self.messages.store_text_message(conversation, user, m).await,
            Message::Code(m) => self.messages.store_code_message(conversation, user, m).await,
            Message::Media(m) => {
                self.messages
                    .store_media_message(conversation, user, m)
                    .await
            }
        }?;
        message.base_mut().id = id;

        // 4. 配信（メディアはアップロード完了前なので送信者にだけ返す）
        let outgoing = serde_json::to_value(&message)?;
        match message {
            Message::Media(_) => {
                self.message_pusher.unicast(user, ctx, outgoing).await;
            }
            _ => {
                self.message_pusher
                    .broadcast_to_room(conversation, ctx, outgoing)
                    .await;
            }
        }

        tracing::debug!(
            "User {} posted message {} to conversation {}",
            user,
            id,
            conversation
        );
        Ok(message)
    }
}
