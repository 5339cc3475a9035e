//! Access checks shared by the conversation-scoped endpoints.

use crate::domain::{ApiError, ConversationId, ConversationRepository, UserId};

/// Fails with `AccessDenied` unless `user` belongs to `conversation`.
pub async fn ensure_member(
    conversations: &dyn ConversationRepository,
    user: UserId,
    conversation: ConversationId,
) -> Result<(), ApiError> {
    if conversations.is_member(user, conversation).await? {
        Ok(())
    } else {
        tracing::debug!("User {} is not a member of conversation {}", user, conversation);
        Err(ApiError::AccessDenied)
    }
}
