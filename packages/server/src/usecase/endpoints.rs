//! The websocket endpoint table.
//!
//! | resource                 | method | rate limited |
//! |--------------------------|--------|--------------|
//! | `message`                | POST   | yes          |
//! | `message`                | PATCH  | yes          |
//! | `message/read`           | NOTIFY | yes          |
//! | `livesession/code/start` | NOTIFY | yes          |
//! | `livesession/code/stop`  | NOTIFY | yes          |
//! | `livecoding`             | PATCH  | no           |
//! | `typing`                 | NOTIFY | yes          |

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    domain::{ApiError, Command, Method, RequestContext, UserId},
    infrastructure::rate_limit::RateLimiter,
};

use super::{
    EndpointDispatcher, EndpointHandler, LiveEditUseCase, NotifyTypingUseCase,
    ReadMessagesUseCase, SendMessageUseCase, live_edit::LockTransition,
};

pub const MESSAGE: &str = "message";
pub const MESSAGE_READ: &str = "message/read";
pub const LIVE_SESSION_START: &str = "livesession/code/start";
pub const LIVE_SESSION_STOP: &str = "livesession/code/stop";
pub const LIVE_CODING: &str = "livecoding";
pub const TYPING: &str = "typing";

struct SendMessageEndpoint(Arc<SendMessageUseCase>);

#[async_trait]
impl EndpointHandler for SendMessageEndpoint {
    async fn handle(
        &self,
        ctx: &RequestContext,
        user: UserId,
        payload: Value,
    ) -> Result<(), ApiError> {
        self.0.execute(ctx, user, payload).await.map(|_| ())
    }
}

struct EditMessageEndpoint(Arc<LiveEditUseCase>);

#[async_trait]
impl EndpointHandler for EditMessageEndpoint {
    async fn handle(
        &self,
        ctx: &RequestContext,
        user: UserId,
        payload: Value,
    ) -> Result<(), ApiError> {
        self.0.edit_message(ctx, user, payload).await.map(|_| ())
    }
}

struct LiveCodingEndpoint(Arc<LiveEditUseCase>);

#[async_trait]
impl EndpointHandler for LiveCodingEndpoint {
    async fn handle(
        &self,
        ctx: &RequestContext,
        user: UserId,
        payload: Value,
    ) -> Result<(), ApiError> {
        self.0.live_edit_message(ctx, user, payload).await.map(|_| ())
    }
}

struct LiveSessionEndpoint {
    usecase: Arc<LiveEditUseCase>,
    transition: LockTransition,
}

#[async_trait]
impl EndpointHandler for LiveSessionEndpoint {
    async fn handle(
        &self,
        ctx: &RequestContext,
        user: UserId,
        payload: Value,
    ) -> Result<(), ApiError> {
        self.usecase
            .toggle_live_session(ctx, user, payload, self.transition)
            .await
            .map(|_| ())
    }
}

struct ReadMessagesEndpoint(Arc<ReadMessagesUseCase>);

#[async_trait]
impl EndpointHandler for ReadMessagesEndpoint {
    async fn handle(
        &self,
        _ctx: &RequestContext,
        user: UserId,
        payload: Value,
    ) -> Result<(), ApiError> {
        self.0.execute(user, payload).await
    }
}

struct TypingEndpoint(Arc<NotifyTypingUseCase>);

#[async_trait]
impl EndpointHandler for TypingEndpoint {
    async fn handle(
        &self,
        ctx: &RequestContext,
        user: UserId,
        _payload: Value,
    ) -> Result<(), ApiError> {
        self.0.execute(ctx, user).await
    }
}

/// Use cases behind the websocket endpoints.
pub struct SocketUseCases {
    pub send_message: Arc<SendMessageUseCase>,
    pub live_edit: Arc<LiveEditUseCase>,
    pub read_messages: Arc<ReadMessagesUseCase>,
    pub notify_typing: Arc<NotifyTypingUseCase>,
}

pub fn build_dispatcher(limiter: Arc<RateLimiter>, usecases: SocketUseCases) -> EndpointDispatcher {
    let SocketUseCases {
        send_message,
        live_edit,
        read_messages,
        notify_typing,
    } = usecases;

    let mut dispatcher = EndpointDispatcher::new(limiter);
    dispatcher
        .register(
            Command::new(MESSAGE, Method::Post),
            Arc::new(SendMessageEndpoint(send_message)),
            true,
        )
        .register(
            Command::new(MESSAGE, Method::Patch),
            Arc::new(EditMessageEndpoint(live_edit.clone())),
            true,
        )
        .register(
            Command::new(MESSAGE_READ, Method::Notify),
            Arc::new(ReadMessagesEndpoint(read_messages)),
            true,
        )
        .register(
            Command::new(LIVE_SESSION_START, Method::Notify),
            Arc::new(LiveSessionEndpoint {
                usecase: live_edit.clone(),
                transition: LockTransition::Start,
            }),
            true,
        )
        .register(
            Command::new(LIVE_SESSION_STOP, Method::Notify),
            Arc::new(LiveSessionEndpoint {
                usecase: live_edit.clone(),
                transition: LockTransition::Stop,
            }),
            true,
        )
        .register(
            Command::new(LIVE_CODING, Method::Patch),
            Arc::new(LiveCodingEndpoint(live_edit)),
            false,
        )
        .register(
            Command::new(TYPING, Method::Notify),
            Arc::new(TypingEndpoint(notify_typing)),
            true,
        );
    dispatcher
}
