//! Endpoint Dispatcher
//!
//! Routes each inbound frame to the handler registered for its exact
//! `(resource, method)` pair. Rate-limited endpoints consult the limiter
//! first. Failures become an error frame carrying the request's correlation
//! id, which the caller writes back to the requesting connection only.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    domain::{ApiError, Command, Frame, RequestContext, UserId},
    infrastructure::rate_limit::RateLimiter,
};

#[async_trait]
pub trait EndpointHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &RequestContext,
        user: UserId,
        payload: Value,
    ) -> Result<(), ApiError>;
}

struct Endpoint {
    handler: Arc<dyn EndpointHandler>,
    rate_limited: bool,
}

pub struct EndpointDispatcher {
    endpoints: HashMap<Command, Endpoint>,
    limiter: Arc<RateLimiter>,
}

impl EndpointDispatcher {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self {
            endpoints: HashMap::new(),
            limiter,
        }
    }

    pub fn register(
        &mut self,
        command: Command,
        handler: Arc<dyn EndpointHandler>,
        rate_limited: bool,
    ) -> &mut Self {
        self.endpoints.insert(
            command,
            Endpoint {
                handler,
                rate_limited,
            },
        );
        self
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.endpoints.keys()
    }

    /// Handles one frame. Returns the error frame to send back, if any.
    pub async fn dispatch(&self, user: UserId, remote_addr: &str, frame: Frame) -> Option<Frame> {
        if frame.command.is_heartbeat() {
            return None;
        }

        let correlation_id = frame.correlation_id();
        let Some(endpoint) = self.endpoints.get(&frame.command) else {
            tracing::debug!(
                "No endpoint for '{}' method {}",
                frame.command.resource,
                u8::from(frame.command.method)
            );
            return Some(Frame::error(&ApiError::UnsupportedMethod, correlation_id));
        };

        if endpoint.rate_limited {
            let method = u8::from(frame.command.method).to_string();
            match self
                .limiter
                .check(&method, &frame.command.resource, remote_addr)
            {
                Ok(Some(info)) => {
                    tracing::info!(
                        "User {} rate limited on '{}'",
                        user,
                        frame.command.resource
                    );
                    return Some(Frame::error(
                        &ApiError::RequestLimitExceeded(info),
                        correlation_id,
                    ));
                }
                Ok(None) => {}
                Err(e) => tracing::error!("Rate limiter unavailable, admitting request: {}", e),
            }
        }

        let ctx = RequestContext::new(frame.command.clone(), correlation_id, frame.source());
        match endpoint.handler.handle(&ctx, user, frame.payload).await {
            Ok(()) => None,
            Err(err) => {
                match &err {
                    ApiError::Database(detail) => tracing::error!(
                        "'{}' from user {} failed: {}",
                        ctx.command.resource,
                        user,
                        detail
                    ),
                    other => tracing::debug!(
                        "'{}' from user {} rejected: {}",
                        ctx.command.resource,
                        user,
                        other
                    ),
                }
                Some(Frame::error(&err, correlation_id))
            }
        }
    }
}
