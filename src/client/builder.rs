use std::sync::Arc;

use crate::client::core::AiConfigClient;
use crate::config::{ConfigResolver, ConfigStore};
use crate::error::ErrorContext;
use crate::settings::Settings;
use crate::transport::{HttpProviderClient, ProviderClient};
use crate::{Error, Result};

/// Builder for [`AiConfigClient`].
///
/// Without an explicit resolver the builder loads a [`ConfigStore`] from
/// `settings.config_path`; without a provider client it builds an
/// [`HttpProviderClient`] from `settings.http`.
#[derive(Default)]
pub struct AiConfigClientBuilder {
    settings: Settings,
    resolver: Option<Arc<dyn ConfigResolver>>,
    provider: Option<Arc<dyn ProviderClient>>,
}

impl AiConfigClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from [`Settings::from_env`].
    pub fn from_env() -> Result<Self> {
        Ok(Self::new().with_settings(Settings::from_env()?))
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ConfigResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Inject a provider client (an agent framework bridge, or a mock in tests).
    pub fn with_provider_client(mut self, provider: Arc<dyn ProviderClient>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn build(self) -> Result<AiConfigClient> {
        let resolver = match self.resolver {
            Some(r) => r,
            None => {
                let path = self.settings.config_path.as_ref().ok_or_else(|| {
                    Error::configuration_with_context(
                        "no config resolver and no config path",
                        ErrorContext::new()
                            .with_field_path("config_path")
                            .with_details("set AI_CONFIG_PATH or call with_resolver")
                            .with_source("client_builder"),
                    )
                })?;
                Arc::new(ConfigStore::from_file(path)?) as Arc<dyn ConfigResolver>
            }
        };
        let provider = match self.provider {
            Some(p) => p,
            None => Arc::new(HttpProviderClient::from_settings(&self.settings)?)
                as Arc<dyn ProviderClient>,
        };
        Ok(AiConfigClient::new(resolver, provider).with_settings(self.settings))
    }
}
