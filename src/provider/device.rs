//! Device Flow Strategy
//!
//! RFC 8628 login for hosts without a browser. Works for public clients;
//! a configured secret is sent the usual way.

use async_trait::async_trait;
use std::time::Duration;

use super::capability::DevicePrompt;
use super::context::ClientContext;
use super::lifecycle::{ManagedTokenProvider, TokenStrategy};
use crate::error::CredentialResult;
use crate::flows::{into_token_result, request_device_authorization, DevicePoller, EndpointPoll};
use crate::types::{AuthType, AuthorizationConfig, TokenResult};

pub struct DeviceFlowStrategy {
    context: ClientContext,
    poller: DevicePoller,
    prompt: Option<DevicePrompt>,
}

pub type DeviceFlowProvider = ManagedTokenProvider<DeviceFlowStrategy>;

impl DeviceFlowStrategy {
    pub fn new(context: ClientContext) -> CredentialResult<Self> {
        context.config.validate(&[])?;
        Ok(Self {
            context,
            poller: DevicePoller::new(),
            prompt: None,
        })
    }

    /// Show the user code somewhere other than the log.
    pub fn with_prompt(mut self, prompt: DevicePrompt) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn with_poller(mut self, poller: DevicePoller) -> Self {
        self.poller = poller;
        self
    }
}

#[async_trait]
impl TokenStrategy for DeviceFlowStrategy {
    fn auth_type(&self) -> AuthType {
        AuthType::DeviceCode
    }

    fn config(&self) -> &AuthorizationConfig {
        &self.context.config
    }

    async fn perform_login(&self) -> CredentialResult<TokenResult> {
        let transport = self.context.transport();
        let device_url = self
            .context
            .endpoints
            .device_authorization_endpoint(transport)
            .await?;
        let endpoint = self.context.token_endpoint().await?;

        let session =
            request_device_authorization(transport, &device_url, &endpoint, self.context.scope())
                .await?;
        if let Some(prompt) = &self.prompt {
            prompt(&session);
        }

        let poll = EndpointPoll {
            transport,
            endpoint: &endpoint,
        };
        let response = self
            .poller
            .poll_for_tokens(
                &poll,
                &session.device_code,
                Duration::from_secs(session.polling_interval()),
            )
            .await?;
        into_token_result(response, AuthType::DeviceCode)
    }

    async fn perform_refresh(&self, refresh_token: &str) -> CredentialResult<TokenResult> {
        self.context.refresh(refresh_token, AuthType::DeviceCode).await
    }
}
