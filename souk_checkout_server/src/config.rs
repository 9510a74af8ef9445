use std::env;

use log::*;
use payment_gateways::{
    config::{MerchantUrls, TabbyConfig, TamaraConfig, ZiinaConfig},
    Gateway,
    GatewayRegistry,
    TabbyClient,
    TamaraClient,
    ZiinaClient,
};

use crate::errors::ServerError;

const DEFAULT_SOUK_HOST: &str = "127.0.0.1";
const DEFAULT_SOUK_PORT: u16 = 8400;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub tabby: TabbyConfig,
    pub tamara: TamaraConfig,
    pub ziina: ZiinaConfig,
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let host = env::var("SOUK_HOST").ok().unwrap_or_else(|| DEFAULT_SOUK_HOST.into());
        let port = env::var("SOUK_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for SOUK_PORT. {e} Using the default, {DEFAULT_SOUK_PORT}, instead.");
                    DEFAULT_SOUK_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SOUK_PORT);
        let database_url = env::var("SOUK_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SOUK_DATABASE_URL is not set. Please set it to the URL for the storefront database.");
            String::default()
        });
        let urls = MerchantUrls::from_env_or_default();
        let tabby = TabbyConfig::from_env_or_default(urls.clone());
        let tamara = TamaraConfig::from_env_or_default(urls.clone());
        let ziina = ZiinaConfig::from_env_or_default(urls);
        Self { host, port, database_url, tabby, tamara, ziina }
    }

    /// Builds the process-wide gateway registry from this configuration. The registry is
    /// immutable after startup; every client is constructed here with explicit credentials so
    /// tests can build a registry of fakes instead.
    pub fn build_gateway_registry(&self) -> Result<GatewayRegistry, ServerError> {
        let tabby = TabbyClient::new(self.tabby.clone())
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        let tamara = TamaraClient::new(self.tamara.clone())
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        let ziina = ZiinaClient::new(self.ziina.clone())
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        let registry = GatewayRegistry::new()
            .with(Gateway::Tabby(tabby))
            .with(Gateway::Tamara(tamara))
            .with(Gateway::Ziina(ziina));
        info!("🪛️ Gateway registry initialised with TABBY, TAMARA and ZIINA");
        Ok(registry)
    }
}
