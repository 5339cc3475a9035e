//! Online-state notifications sent when a user's first connection opens or
//! its last one closes.

use crate::{
    domain::{Command, ConversationId, MessagePusher, Method, RequestContext, UserId},
    infrastructure::dto::websocket::OnlineStateNotification,
};

pub const ONLINE_STATE_RESOURCE: &str = "member/onlinestate";

pub async fn notify_online_state(
    pusher: &dyn MessagePusher,
    conversations: &[ConversationId],
    user: UserId,
    online: bool,
) {
    let payload = match serde_json::to_value(OnlineStateNotification {
        user_id: user,
        new_state: online,
    }) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!("Failed to encode online state of user {}: {}", user, e);
            return;
        }
    };

    for conversation in conversations {
        let ctx = RequestContext::server_push(
            Command::new(ONLINE_STATE_RESOURCE, Method::Patch),
            *conversation,
        );
        pusher
            .broadcast_to_room(*conversation, &ctx, payload.clone())
            .await;
    }
}
