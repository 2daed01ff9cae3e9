//! Provider Factory
//!
//! Maps a declarative `{protocol, flow, config}` descriptor onto a concrete
//! provider. Everything that cannot be expressed as data (transport,
//! caller hooks) comes in through [`ProviderDependencies`].

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::authorization_code::{AuthorizationCodeProvider, AuthorizationCodeStrategy};
use super::capability::{
    AuthorizationCodeSource, DevicePrompt, PasscodeProvider, SamlAssertionProvider,
    SessionCookieProvider,
};
use super::client_credentials::{ClientCredentialsProvider, ClientCredentialsStrategy};
use super::context::ClientContext;
use super::device::{DeviceFlowProvider, DeviceFlowStrategy};
use super::oidc::{OidcBrowserProvider, OidcOptions, OidcStrategy};
use super::password::{PasswordProvider, PasswordSource, PasswordStrategy};
use super::saml::{
    BrowserSamlAssertionProvider, Saml2BearerProvider, Saml2BearerStrategy, Saml2PureProvider,
    Saml2PureStrategy,
};
use super::token_exchange::{TokenExchangeProvider, TokenExchangeStrategy};
use super::TokenProvider;
use crate::callback::{BrowserLauncher, BrowserMode, CallbackOptions};
use crate::core::{DiscoveryCache, HttpTransport, ReqwestHttpTransport};
use crate::error::{ConfigurationError, CredentialError, CredentialResult, ValidationError};
use crate::flows::{DevicePoller, TokenExchangeRequest};
use crate::types::{AuthorizationConfig, ClientAuthMethod, ProviderEndpoints};

/// Identity protocol family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Oauth2,
    Oidc,
    Saml2,
    /// Cloud Foundry UAA; OAuth2 with UAA default endpoints.
    Uaa,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Oauth2 => "oauth2",
            Self::Oidc => "oidc",
            Self::Saml2 => "saml2",
            Self::Uaa => "uaa",
        }
    }
}

/// Flow within a protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    #[serde(alias = "browser")]
    AuthorizationCode,
    #[serde(alias = "device")]
    DeviceCode,
    ClientCredentials,
    Password,
    Passcode,
    TokenExchange,
    Bearer,
    Pure,
}

impl Flow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::DeviceCode => "device_code",
            Self::ClientCredentials => "client_credentials",
            Self::Password => "password",
            Self::Passcode => "passcode",
            Self::TokenExchange => "token_exchange",
            Self::Bearer => "bearer",
            Self::Pure => "pure",
        }
    }
}

/// Flow-specific settings that are plain data.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderOptions {
    pub scope: Option<String>,
    pub endpoints: ProviderEndpoints,
    /// Use OIDC discovery for unset endpoints; defaults to on for `oidc`.
    pub discovery: Option<bool>,
    pub auth_method: Option<ClientAuthMethod>,
    pub timeout_ms: Option<u64>,

    /// `default`, `chrome`, `edge`, `firefox`, `headless` or `none`.
    pub browser: Option<String>,
    pub callback_port: Option<u16>,
    pub callback_timeout_secs: Option<u64>,
    pub redirect_uri: Option<String>,

    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub passcode: Option<SecretString>,

    pub token_exchange: Option<TokenExchangeRequest>,

    pub idp_sso_url: Option<String>,
    pub sp_entity_id: Option<String>,
    pub relay_state: Option<String>,
    pub saml_login_url: Option<String>,
}

/// Declarative provider description, typically read from JSON.
#[derive(Clone, Debug, Deserialize)]
pub struct ProviderDescriptor {
    pub protocol: Protocol,
    pub flow: Flow,
    pub config: AuthorizationConfig,
    #[serde(default)]
    pub options: ProviderOptions,
}

impl ProviderDescriptor {
    pub fn new(protocol: Protocol, flow: Flow, config: AuthorizationConfig) -> Self {
        Self {
            protocol,
            flow,
            config,
            options: ProviderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ProviderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn from_json(json: &str) -> CredentialResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            ConfigurationError::InvalidConfig {
                message: format!("invalid provider descriptor: {e}"),
            }
            .into()
        })
    }
}

/// Runtime collaborators that descriptors cannot carry.
#[derive(Clone, Default)]
pub struct ProviderDependencies {
    /// Defaults to a reqwest transport.
    pub transport: Option<Arc<dyn HttpTransport>>,
    /// Defaults to the process-wide cache.
    pub discovery: Option<Arc<DiscoveryCache>>,
    pub launcher: Option<Arc<dyn BrowserLauncher>>,
    pub code_source: Option<Arc<dyn AuthorizationCodeSource>>,
    pub passcode_provider: Option<Arc<dyn PasscodeProvider>>,
    pub saml_assertion_provider: Option<Arc<dyn SamlAssertionProvider>>,
    pub session_cookie_provider: Option<Arc<dyn SessionCookieProvider>>,
    pub device_prompt: Option<DevicePrompt>,
    pub device_poller: Option<DevicePoller>,
}

impl ProviderDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_discovery(mut self, cache: Arc<DiscoveryCache>) -> Self {
        self.discovery = Some(cache);
        self
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn BrowserLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn with_code_source(mut self, source: Arc<dyn AuthorizationCodeSource>) -> Self {
        self.code_source = Some(source);
        self
    }

    pub fn with_passcode_provider(mut self, provider: Arc<dyn PasscodeProvider>) -> Self {
        self.passcode_provider = Some(provider);
        self
    }

    pub fn with_saml_assertion_provider(mut self, provider: Arc<dyn SamlAssertionProvider>) -> Self {
        self.saml_assertion_provider = Some(provider);
        self
    }

    pub fn with_session_cookie_provider(
        mut self,
        provider: Arc<dyn SessionCookieProvider>,
    ) -> Self {
        self.session_cookie_provider = Some(provider);
        self
    }

    pub fn with_device_prompt(mut self, prompt: DevicePrompt) -> Self {
        self.device_prompt = Some(prompt);
        self
    }

    pub fn with_device_poller(mut self, poller: DevicePoller) -> Self {
        self.device_poller = Some(poller);
        self
    }
}

fn unsupported(protocol: Protocol, flow: Flow) -> CredentialError {
    ConfigurationError::UnsupportedProvider {
        protocol: protocol.as_str().to_string(),
        flow: flow.as_str().to_string(),
    }
    .into()
}

fn client_context(
    descriptor: &ProviderDescriptor,
    deps: &ProviderDependencies,
) -> CredentialResult<ClientContext> {
    let transport: Arc<dyn HttpTransport> = match &deps.transport {
        Some(transport) => transport.clone(),
        None => Arc::new(ReqwestHttpTransport::new()?),
    };
    let options = &descriptor.options;

    let mut context = ClientContext::new(descriptor.config.clone(), transport)
        .with_endpoints(options.endpoints.clone());
    if options
        .discovery
        .unwrap_or(descriptor.protocol == Protocol::Oidc)
    {
        let cache = deps.discovery.clone().unwrap_or_else(DiscoveryCache::shared);
        context = context.with_discovery(cache);
    }
    if let Some(scope) = &options.scope {
        context = context.with_scope(scope.clone());
    }
    if let Some(method) = options.auth_method {
        context = context.with_auth_method(method);
    }
    if let Some(ms) = options.timeout_ms {
        context = context.with_timeout(Duration::from_millis(ms));
    }
    Ok(context)
}

fn callback_options(
    options: &ProviderOptions,
    deps: &ProviderDependencies,
) -> CredentialResult<CallbackOptions> {
    let mode = match &options.browser {
        Some(browser) => browser.parse::<BrowserMode>()?,
        None => BrowserMode::default(),
    };
    let mut callback = CallbackOptions::new(mode);
    if let Some(port) = options.callback_port {
        callback = callback.with_base_port(port);
    }
    if let Some(secs) = options.callback_timeout_secs {
        callback = callback.with_timeout(Duration::from_secs(secs));
    }
    if let Some(launcher) = &deps.launcher {
        callback = callback.with_launcher(launcher.clone());
    }
    Ok(callback)
}

fn saml_assertions(
    descriptor: &ProviderDescriptor,
    deps: &ProviderDependencies,
) -> CredentialResult<Arc<dyn SamlAssertionProvider>> {
    if let Some(provider) = &deps.saml_assertion_provider {
        return Ok(provider.clone());
    }

    let options = &descriptor.options;
    let callback = callback_options(options, deps)?;
    let provider = match (&options.saml_login_url, &options.idp_sso_url) {
        (Some(login_url), _) => BrowserSamlAssertionProvider::new(
            options.idp_sso_url.clone().unwrap_or_default(),
            options.sp_entity_id.clone().unwrap_or_default(),
        )
        .with_authorization_url(login_url.clone()),
        (None, Some(idp_sso_url)) => {
            ValidationError::check(&[("spEntityId", options.sp_entity_id.as_deref())])?;
            BrowserSamlAssertionProvider::new(
                idp_sso_url.clone(),
                options.sp_entity_id.clone().unwrap_or_default(),
            )
        }
        (None, None) => return Err(ValidationError::field("samlAssertionProvider").into()),
    };

    let provider = match &options.relay_state {
        Some(relay_state) => provider.with_relay_state(relay_state.clone()),
        None => provider,
    };
    Ok(Arc::new(provider.with_callback(callback)))
}

/// Build the provider a descriptor describes.
///
/// Returns `ConfigurationError::UnsupportedProvider` for protocol/flow pairs
/// that do not exist and `ValidationError` for missing required fields.
pub fn create_provider(
    descriptor: ProviderDescriptor,
    deps: ProviderDependencies,
) -> CredentialResult<Box<dyn TokenProvider>> {
    let protocol = descriptor.protocol;
    let flow = descriptor.flow;
    debug!(protocol = protocol.as_str(), flow = flow.as_str(), "creating token provider");

    let oauth = matches!(protocol, Protocol::Oauth2 | Protocol::Oidc | Protocol::Uaa);
    let options = &descriptor.options;

    let provider: Box<dyn TokenProvider> = match flow {
        Flow::AuthorizationCode if protocol == Protocol::Oidc => {
            let mut oidc = OidcOptions::new(callback_options(options, &deps)?);
            if let Some(redirect_uri) = &options.redirect_uri {
                oidc = oidc.with_redirect_uri(redirect_uri.clone());
            }
            if let Some(source) = &deps.code_source {
                oidc = oidc.with_code_source(source.clone());
            }
            let strategy = OidcStrategy::new(client_context(&descriptor, &deps)?, oidc)?;
            Box::new(OidcBrowserProvider::new(strategy))
        }
        Flow::AuthorizationCode if oauth => {
            let strategy = AuthorizationCodeStrategy::new(
                client_context(&descriptor, &deps)?,
                callback_options(options, &deps)?,
            )?;
            Box::new(AuthorizationCodeProvider::new(strategy))
        }
        Flow::DeviceCode if oauth => {
            let mut strategy = DeviceFlowStrategy::new(client_context(&descriptor, &deps)?)?;
            if let Some(prompt) = &deps.device_prompt {
                strategy = strategy.with_prompt(prompt.clone());
            }
            if let Some(poller) = &deps.device_poller {
                strategy = strategy.with_poller(poller.clone());
            }
            Box::new(DeviceFlowProvider::new(strategy))
        }
        Flow::ClientCredentials if oauth => {
            let strategy = ClientCredentialsStrategy::new(client_context(&descriptor, &deps)?)?;
            Box::new(ClientCredentialsProvider::new(strategy))
        }
        Flow::Password if oauth => {
            let source = PasswordSource::password(
                options.username.clone().unwrap_or_default(),
                options
                    .password
                    .as_ref()
                    .map(|p| p.expose_secret().clone())
                    .unwrap_or_default(),
            );
            let strategy = PasswordStrategy::new(client_context(&descriptor, &deps)?, source)?;
            Box::new(PasswordProvider::new(strategy))
        }
        Flow::Passcode if oauth => {
            let source = PasswordSource::passcode(
                options.passcode.as_ref().map(|p| p.expose_secret().clone()),
                deps.passcode_provider.clone(),
            );
            let strategy = PasswordStrategy::new(client_context(&descriptor, &deps)?, source)?;
            Box::new(PasswordProvider::new(strategy))
        }
        Flow::TokenExchange if oauth => {
            let request = options
                .token_exchange
                .clone()
                .ok_or_else(|| ValidationError::field("subjectToken"))?;
            let strategy =
                TokenExchangeStrategy::new(client_context(&descriptor, &deps)?, request)?;
            Box::new(TokenExchangeProvider::new(strategy))
        }
        Flow::Bearer if protocol == Protocol::Saml2 => {
            let strategy = Saml2BearerStrategy::new(
                client_context(&descriptor, &deps)?,
                saml_assertions(&descriptor, &deps)?,
            )?;
            Box::new(Saml2BearerProvider::new(strategy))
        }
        Flow::Pure if protocol == Protocol::Saml2 => {
            let cookies = deps
                .session_cookie_provider
                .clone()
                .ok_or_else(|| ValidationError::field("sessionCookieProvider"))?;
            let strategy = Saml2PureStrategy::new(
                client_context(&descriptor, &deps)?,
                saml_assertions(&descriptor, &deps)?,
                cookies,
            )?;
            Box::new(Saml2PureProvider::new(strategy))
        }
        _ => return Err(unsupported(protocol, flow)),
    };

    Ok(provider)
}
