//! UseCase: ライブ編集（Live Edit Engine）
//!
//! コードメッセージは同時に 1 人だけが編集できる。ロックの状態遷移:
//!
//! ```text
//! Unlocked ──start(u)──▶ LockedBy(u)
//! LockedBy(u) ──start(u)──▶ LockedBy(u)      （変化なし・成功）
//! LockedBy(v) ──start(u)──▶ AccessDenied
//! LockedBy(*) ──stop──▶ Unlocked             （会話のメンバーなら誰でも）
//! ```
//!
//! パッチは Unlocked か、要求者自身がロックしている間だけ受け付ける。
//! 状態の読み出しから書き込みまでは 1 つのミューテックスで直列化する。

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    domain::{
        ApiError, CodeMessage, ConversationId, ConversationRepository, MessageId, MessagePusher,
        MessageRepository, MessageType, RequestContext, UserId, patch::apply_text_patch,
    },
    infrastructure::dto::websocket::{
        CodePatchRequest, LiveSessionRequest, LockChangeNotification, MessageEditedNotification,
    },
};

use super::access::ensure_member;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTransition {
    Start,
    Stop,
}

pub struct LiveEditUseCase {
    messages: Arc<dyn MessageRepository>,
    conversations: Arc<dyn ConversationRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    edits: Mutex<()>,
}

impl LiveEditUseCase {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        conversations: Arc<dyn ConversationRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            messages,
            conversations,
            message_pusher,
            edits: Mutex::new(()),
        }
    }

    /// 編集ロックの取得・解放。変更後の所有者を返す。
    ///
    /// 状態が変わったときだけ `{messageId, newOwner}` をブロードキャストする。
    pub async fn toggle_live_session(
        &self,
        ctx: &RequestContext,
        user: UserId,
        payload: Value,
        transition: LockTransition,
    ) -> Result<Option<UserId>, ApiError> {
        let request: LiveSessionRequest = serde_json::from_value(payload)?;
        let conversation = ctx.source;

        let _guard = self.edits.lock().await;
        let code = self
            .load_code_message(
                conversation,
                user,
                request.message_id,
                ApiError::InvalidMessageType,
            )
            .await?;

        let new_owner = match (transition, code.locked_by) {
            (LockTransition::Start, None) => Some(user),
            (LockTransition::Start, Some(owner)) if owner == user => return Ok(Some(owner)),
            (LockTransition::Start, Some(owner)) => {
                tracing::debug!(
                    "User {} denied edit lock on message {} held by {}",
                    user,
                    request.message_id,
                    owner
                );
                return Err(ApiError::AccessDenied);
            }
            (LockTransition::Stop, None) => return Ok(None),
            (LockTransition::Stop, Some(_)) => None,
        };

        self.messages
            .set_lock_owner(request.message_id, new_owner)
            .await?;

        let payload = serde_json::to_value(LockChangeNotification {
            message_id: request.message_id,
            new_owner,
        })?;
        self.message_pusher
            .broadcast_to_room(conversation, ctx, payload)
            .await;

        tracing::debug!(
            "Edit lock of message {} now held by {:?}",
            request.message_id,
            new_owner
        );
        Ok(new_owner)
    }

    /// 保存を伴う編集（`message` PATCH）。`{messageId}` をブロードキャストする。
    pub async fn edit_message(
        &self,
        ctx: &RequestContext,
        user: UserId,
        payload: Value,
    ) -> Result<MessageId, ApiError> {
        let request: CodePatchRequest = serde_json::from_value(payload)?;
        self.apply_patch(ctx.source, user, &request).await?;

        let notification = serde_json::to_value(MessageEditedNotification {
            message_id: request.message_id,
        })?;
        self.message_pusher
            .broadcast_to_room(ctx.source, ctx, notification)
            .await;
        Ok(request.message_id)
    }

    /// 入力ごとのライブパッチ（`livecoding` PATCH）。受け取ったパッチを
    /// そのままブロードキャストする。
    pub async fn live_edit_message(
        &self,
        ctx: &RequestContext,
        user: UserId,
        payload: Value,
    ) -> Result<MessageId, ApiError> {
        let request: CodePatchRequest = serde_json::from_value(payload.clone())?;
        self.apply_patch(ctx.source, user, &request).await?;

        self.message_pusher
            .broadcast_to_room(ctx.source, ctx, payload)
            .await;
        Ok(request.message_id)
    }

    async fn apply_patch(
        &self,
        conversation: ConversationId,
        user: UserId,
        request: &CodePatchRequest,
    ) -> Result<(), ApiError> {
        let _guard = self.edits.lock().await;
        let code = self
            .load_code_message(
                conversation,
                user,
                request.message_id,
                ApiError::MessageTypeNotImplemented,
            )
            .await?;

        if let Some(owner) = code.locked_by
            && owner != user
        {
            return Err(ApiError::AccessDenied);
        }

        let text = if request.patch.is_empty() {
            code.code.clone()
        } else {
            let outcome = apply_text_patch(&code.code, &request.patch)?;
            if !outcome.fully_applied() {
                tracing::warn!(
                    "{} hunk(s) of a patch to message {} did not apply; kept the prior text",
                    outcome.failed_hunks,
                    request.message_id
                );
            }
            outcome.text
        };

        let title = non_empty_or(&request.title, &code.title);
        let language = non_empty_or(&request.language, &code.language);
        self.messages
            .update_code(request.message_id, &text, title, language)
            .await?;
        Ok(())
    }

    /// 会話のメンバーであること、対象がコードメッセージであることを確認して読み出す。
    /// コード以外なら `wrong_kind` を返す（ロック操作は 1024、編集は 1003）。
    async fn load_code_message(
        &self,
        conversation: ConversationId,
        user: UserId,
        message: MessageId,
        wrong_kind: ApiError,
    ) -> Result<CodeMessage, ApiError> {
        ensure_member(self.conversations.as_ref(), user, conversation).await?;

        let header = self
            .messages
            .find_message_header(conversation, message)
            .await?;
        if header.kind != MessageType::Code {
            return Err(wrong_kind);
        }

        Ok(self.messages.find_code_message(conversation, message).await?)
    }
}

fn non_empty_or<'a>(candidate: &'a str, fallback: &'a str) -> &'a str {
    if candidate.is_empty() { fallback } else { candidate }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            Message, MessageBase, Method, RepositoryError, TextMessage,
            repository::MockMessageRepository,
        },
        usecase::test_support::{ALICE, BOB, CAROL, CONVERSATION, Fixture, Target, request},
    };
    use diff_match_patch_rs::{Compat, DiffMatchPatch, PatchInput};
    use serde_json::json;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - ロックの状態遷移（取得・再取得・他人による取得・解放）
    // - ロック中は所有者だけがパッチを適用できること
    // - 同時に取得しようとしても所有者は 1 人になること
    // - パッチ適用結果の保存と、各エンドポイントのブロードキャスト内容
    // ========================================

    const ORIGINAL: &str = "fn main() {\n    println!(\"hi\");\n}\n";

    fn base(kind: MessageType) -> MessageBase {
        MessageBase {
            id: MessageId::default(),
            kind,
            sentdate: chrono::Utc::now(),
            provisionary_id: None,
            author: "alice".into(),
        }
    }

    async fn store_code(fixture: &Fixture) -> MessageId {
        let code = CodeMessage {
            base: base(MessageType::Code),
            code: ORIGINAL.into(),
            language: "rust".into(),
            title: "main.rs".into(),
            locked_by: None,
        };
        fixture
            .messages
            .store_code_message(CONVERSATION, ALICE, &code)
            .await
            .unwrap()
    }

    fn create_usecase(fixture: &Fixture) -> LiveEditUseCase {
        LiveEditUseCase::new(
            fixture.messages.clone(),
            fixture.conversations.clone(),
            fixture.pusher.clone(),
        )
    }

    fn patch_to(target: &str) -> String {
        let dmp = DiffMatchPatch::new();
        let diffs = dmp.diff_main::<Compat>(ORIGINAL, target).unwrap();
        let patches = dmp.patch_make(PatchInput::new_diffs(&diffs)).unwrap();
        dmp.patch_to_text(&patches)
    }

    async fn stored_code(fixture: &Fixture, id: MessageId) -> CodeMessage {
        fixture
            .messages
            .find_code_message(CONVERSATION, id)
            .await
            .unwrap()
    }

    fn start() -> RequestContext {
        request("livesession/code/start", Method::Notify, 10, 7)
    }

    fn stop() -> RequestContext {
        request("livesession/code/stop", Method::Notify, 11, 7)
    }

    #[tokio::test]
    async fn test_lock_transitions() {
        // テスト項目: 取得・同一ユーザーの再取得・他ユーザーの取得拒否・解放
        // given (前提条件):
        let fixture = Fixture::new().await;
        let id = store_code(&fixture).await;
        let usecase = create_usecase(&fixture);
        let payload = json!({"messageId": id});

        // when (操作):
        let taken = usecase
            .toggle_live_session(&start(), ALICE, payload.clone(), LockTransition::Start)
            .await;
        let retaken = usecase
            .toggle_live_session(&start(), ALICE, payload.clone(), LockTransition::Start)
            .await;
        let contested = usecase
            .toggle_live_session(&start(), BOB, payload.clone(), LockTransition::Start)
            .await;
        let released = usecase
            .toggle_live_session(&stop(), BOB, payload.clone(), LockTransition::Stop)
            .await;

        // then (期待する結果):
        assert_eq!(taken.unwrap(), Some(ALICE));
        assert_eq!(retaken.unwrap(), Some(ALICE));
        assert!(matches!(contested, Err(ApiError::AccessDenied)));
        assert_eq!(released.unwrap(), None);
        assert_eq!(stored_code(&fixture, id).await.locked_by, None);

        let pushed = fixture.pusher.pushed();
        assert_eq!(pushed.len(), 2);
        assert_eq!(pushed[0].payload, json!({"messageId": id, "newOwner": 42}));
        assert_eq!(pushed[1].payload, json!({"messageId": id, "newOwner": 0}));
        assert!(pushed.iter().all(|p| p.target == Target::Room(CONVERSATION)));
    }

    #[tokio::test]
    async fn test_concurrent_start_yields_single_owner() {
        // テスト項目: 2 人が同時にロックを取ろうとしても成功するのは 1 人だけ
        // given (前提条件):
        let fixture = Fixture::new().await;
        let id = store_code(&fixture).await;
        let usecase = Arc::new(create_usecase(&fixture));

        // when (操作):
        let a = {
            let usecase = usecase.clone();
            tokio::spawn(async move {
                usecase
                    .toggle_live_session(&start(), ALICE, json!({"messageId": id}), LockTransition::Start)
                    .await
            })
        };
        let b = {
            let usecase = usecase.clone();
            tokio::spawn(async move {
                usecase
                    .toggle_live_session(&start(), BOB, json!({"messageId": id}), LockTransition::Start)
                    .await
            })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];

        // then (期待する結果):
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(ApiError::AccessDenied)))
                .count(),
            1
        );
        let owner = stored_code(&fixture, id).await.locked_by;
        assert!(owner == Some(ALICE) || owner == Some(BOB));
    }

    #[tokio::test]
    async fn test_patch_only_from_lock_owner_while_locked() {
        // テスト項目: ロック中は所有者のパッチだけが適用される
        // given (前提条件):
        let fixture = Fixture::new().await;
        let id = store_code(&fixture).await;
        let usecase = create_usecase(&fixture);
        usecase
            .toggle_live_session(&start(), ALICE, json!({"messageId": id}), LockTransition::Start)
            .await
            .unwrap();
        let edited = "fn main() {\n    println!(\"hello\");\n}\n";
        let payload = json!({"messageId": id, "patch": patch_to(edited)});
        let ctx = request("livecoding", Method::Patch, 20, 7);

        // when (操作):
        let from_bob = usecase.live_edit_message(&ctx, BOB, payload.clone()).await;
        let from_alice = usecase.live_edit_message(&ctx, ALICE, payload.clone()).await;

        // then (期待する結果):
        assert!(matches!(from_bob, Err(ApiError::AccessDenied)));
        assert_eq!(from_alice.unwrap(), id);
        let code = stored_code(&fixture, id).await;
        assert_eq!(code.code, edited);
        assert_eq!(code.title, "main.rs");
        let last = fixture.pusher.pushed().pop().unwrap();
        assert_eq!(last.payload, payload);
        assert_eq!(last.ctx.correlation_id.map(|c| c.value()), Some(20));
    }

    #[tokio::test]
    async fn test_other_member_can_patch_after_owner_releases_lock() {
        // テスト項目: 所有者がロックを解放した後は、拒否されていた別メンバーのパッチが適用される
        // given (前提条件):
        let fixture = Fixture::new().await;
        let id = store_code(&fixture).await;
        let usecase = create_usecase(&fixture);
        usecase
            .toggle_live_session(&start(), ALICE, json!({"messageId": id}), LockTransition::Start)
            .await
            .unwrap();
        let edited = "fn main() {\n    println!(\"bob\");\n}\n";
        let payload = json!({"messageId": id, "patch": patch_to(edited)});
        let ctx = request("livecoding", Method::Patch, 21, 7);
        let while_locked = usecase.live_edit_message(&ctx, BOB, payload.clone()).await;
        assert!(matches!(while_locked, Err(ApiError::AccessDenied)));

        // when (操作):
        usecase
            .toggle_live_session(&stop(), ALICE, json!({"messageId": id}), LockTransition::Stop)
            .await
            .unwrap();
        let after_release = usecase.live_edit_message(&ctx, BOB, payload).await;

        // then (期待する結果):
        assert_eq!(after_release.unwrap(), id);
        let code = stored_code(&fixture, id).await;
        assert_eq!(code.code, edited);
        assert_eq!(code.locked_by, None);
    }

    #[tokio::test]
    async fn test_title_only_edit_keeps_code() {
        // テスト項目: patch を省略した編集はタイトルだけを更新し、コードは変わらない
        // given (前提条件):
        let fixture = Fixture::new().await;
        let id = store_code(&fixture).await;
        let usecase = create_usecase(&fixture);

        // when (操作):
        let result = usecase
            .edit_message(
                &request("message", Method::Patch, 31, 7),
                ALICE,
                json!({"messageId": id, "title": "renamed.rs"}),
            )
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap(), id);
        let code = stored_code(&fixture, id).await;
        assert_eq!(code.code, ORIGINAL);
        assert_eq!(code.title, "renamed.rs");
        assert_eq!(code.language, "rust");
        assert_eq!(fixture.pusher.pushed()[0].payload, json!({"messageId": id}));
    }

    #[tokio::test]
    async fn test_lock_on_non_code_message_is_invalid_type() {
        // テスト項目: コード以外のメッセージのロック取得は InvalidMessageType になる
        // given (前提条件):
        let fixture = Fixture::new().await;
        let text = TextMessage {
            base: base(MessageType::Text),
            text: "plain".into(),
        };
        let text_id = fixture
            .messages
            .store_text_message(CONVERSATION, ALICE, &text)
            .await
            .unwrap();
        let usecase = create_usecase(&fixture);

        // when (操作):
        let result = usecase
            .toggle_live_session(&start(), ALICE, json!({"messageId": text_id}), LockTransition::Start)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(ApiError::InvalidMessageType)));
        assert!(fixture.pusher.pushed().is_empty());
    }

    #[tokio::test]
    async fn test_edit_message_updates_metadata_and_broadcasts_id() {
        // テスト項目: 保存を伴う編集はタイトル・言語も更新し、messageId を配信する
        // given (前提条件):
        let fixture = Fixture::new().await;
        let id = store_code(&fixture).await;
        let usecase = create_usecase(&fixture);
        let edited = "fn main() {}\n";
        let payload = json!({
            "messageId": id,
            "patch": patch_to(edited),
            "title": "empty.rs",
            "language": ""
        });

        // when (操作):
        let result = usecase
            .edit_message(&request("message", Method::Patch, 30, 7), BOB, payload)
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap(), id);
        let code = stored_code(&fixture, id).await;
        assert_eq!(code.code, edited);
        assert_eq!(code.title, "empty.rs");
        assert_eq!(code.language, "rust");
        let pushed = fixture.pusher.pushed();
        assert_eq!(pushed[0].payload, json!({"messageId": id}));
    }

    #[tokio::test]
    async fn test_live_edit_rejects_non_members_non_code_and_bad_patches() {
        // テスト項目: 非メンバー・コード以外のメッセージ・不正なパッチはそれぞれのエラーになる
        // given (前提条件):
        let fixture = Fixture::new().await;
        let code_id = store_code(&fixture).await;
        let text = TextMessage {
            base: base(MessageType::Text),
            text: "plain".into(),
        };
        let text_id = fixture
            .messages
            .store_text_message(CONVERSATION, ALICE, &text)
            .await
            .unwrap();
        let usecase = create_usecase(&fixture);
        let ctx = request("livecoding", Method::Patch, 40, 7);

        // when (操作):
        let non_member = usecase
            .live_edit_message(&ctx, CAROL, json!({"messageId": code_id, "patch": ""}))
            .await;
        let not_code = usecase
            .live_edit_message(&ctx, ALICE, json!({"messageId": text_id, "patch": ""}))
            .await;
        let bad_patch = usecase
            .live_edit_message(&ctx, ALICE, json!({"messageId": code_id, "patch": "garbage"}))
            .await;
        let missing = usecase
            .live_edit_message(&ctx, ALICE, json!({"messageId": 999, "patch": ""}))
            .await;

        // then (期待する結果):
        assert!(matches!(non_member, Err(ApiError::AccessDenied)));
        assert!(matches!(not_code, Err(ApiError::MessageTypeNotImplemented)));
        assert!(matches!(bad_patch, Err(ApiError::JsonFormat(_))));
        assert!(matches!(missing, Err(ApiError::ResourceDoesNotExist)));
        assert!(fixture.pusher.pushed().is_empty());
        let stored = fixture.messages.conversation_messages(CONVERSATION).await;
        assert!(matches!(&stored[0], Message::Code(c) if c.code == ORIGINAL));
    }

    #[tokio::test]
    async fn test_lock_store_failure_is_database_error() {
        // テスト項目: ロック所有者の保存に失敗すると Database エラーになり、配信されない
        // given (前提条件):
        let fixture = Fixture::new().await;
        let mut messages = MockMessageRepository::new();
        messages.expect_find_message_header().returning(|_, id| {
            Ok(crate::domain::MessageHeader {
                id,
                kind: MessageType::Code,
                sentdate: chrono::Utc::now(),
                author: ALICE,
            })
        });
        messages.expect_find_code_message().returning(|_, _| {
            Ok(CodeMessage {
                base: base(MessageType::Code),
                code: ORIGINAL.into(),
                language: "rust".into(),
                title: "main.rs".into(),
                locked_by: None,
            })
        });
        messages
            .expect_set_lock_owner()
            .returning(|_, _| Err(RepositoryError::Backend("connection reset".into())));
        let usecase = LiveEditUseCase::new(
            Arc::new(messages),
            fixture.conversations.clone(),
            fixture.pusher.clone(),
        );

        // when (操作):
        let result = usecase
            .toggle_live_session(&start(), ALICE, json!({"messageId": 1}), LockTransition::Start)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(ApiError::Database(_))));
        assert!(fixture.pusher.pushed().is_empty());
    }
}
