use std::env;

use log::*;
use souk_common::{helpers::parse_boolean_flag, Secret};

const DEFAULT_TABBY_BASE_URL: &str = "https://api-sandbox.tabby.ai";
const DEFAULT_TAMARA_BASE_URL: &str = "https://api-sandbox.tamara.co";
const DEFAULT_ZIINA_BASE_URL: &str = "https://api-v2.ziina.com";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_BACKEND_URL: &str = "http://localhost:8400";

/// The storefront and server URLs the providers redirect to / call back on. Shared by all three
/// gateway configurations.
#[derive(Debug, Clone)]
pub struct MerchantUrls {
    /// Base URL of the customer-facing storefront (success/cancel/failure redirects).
    pub frontend_url: String,
    /// Base URL of this server (webhook notification endpoints).
    pub backend_url: String,
}

impl MerchantUrls {
    pub fn from_env_or_default() -> Self {
        let frontend_url = env::var("SOUK_FRONTEND_URL").unwrap_or_else(|_| {
            warn!("🪛️ SOUK_FRONTEND_URL is not set. Using {DEFAULT_FRONTEND_URL}.");
            DEFAULT_FRONTEND_URL.to_string()
        });
        let backend_url = env::var("SOUK_BACKEND_URL").unwrap_or_else(|_| {
            warn!("🪛️ SOUK_BACKEND_URL is not set. Using {DEFAULT_BACKEND_URL}.");
            DEFAULT_BACKEND_URL.to_string()
        });
        Self { frontend_url, backend_url }
    }

    pub fn success_url(&self) -> String {
        format!("{}/payment/success", self.frontend_url)
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/payment/cancel", self.frontend_url)
    }

    pub fn failure_url(&self) -> String {
        format!("{}/payment/failure", self.frontend_url)
    }

    pub fn notification_url(&self, gateway: &str) -> String {
        format!("{}/webhooks/{}", self.backend_url, gateway.to_ascii_lowercase())
    }
}

#[derive(Debug, Clone)]
pub struct TabbyConfig {
    pub base_url: String,
    pub api_key: Secret<String>,
    pub merchant_code: String,
    /// Tabby has not published a webhook signature scheme; when a secret is provisioned here the
    /// client enforces payload signatures, otherwise webhooks are accepted with a warning.
    pub webhook_secret: Option<Secret<String>>,
    pub urls: MerchantUrls,
}

impl TabbyConfig {
    pub fn from_env_or_default(urls: MerchantUrls) -> Self {
        let base_url = env::var("TABBY_BASE_URL").unwrap_or_else(|_| DEFAULT_TABBY_BASE_URL.to_string());
        let api_key = Secret::new(env::var("TABBY_API_KEY").unwrap_or_else(|_| {
            error!("🪛️ TABBY_API_KEY is not set. Tabby session creation will be rejected upstream.");
            String::default()
        }));
        let merchant_code = env::var("TABBY_MERCHANT_CODE").unwrap_or_else(|_| {
            warn!("🪛️ TABBY_MERCHANT_CODE is not set.");
            String::default()
        });
        let webhook_secret = env::var("TABBY_WEBHOOK_SECRET").ok().map(Secret::new);
        Self { base_url, api_key, merchant_code, webhook_secret, urls }
    }
}

#[derive(Debug, Clone)]
pub struct TamaraConfig {
    pub base_url: String,
    pub api_key: Secret<String>,
    pub merchant_id: String,
    /// Same policy as Tabby: enforced when provisioned.
    pub webhook_secret: Option<Secret<String>>,
    pub urls: MerchantUrls,
}

impl TamaraConfig {
    pub fn from_env_or_default(urls: MerchantUrls) -> Self {
        let base_url = env::var("TAMARA_BASE_URL").unwrap_or_else(|_| DEFAULT_TAMARA_BASE_URL.to_string());
        let api_key = Secret::new(env::var("TAMARA_API_KEY").unwrap_or_else(|_| {
            error!("🪛️ TAMARA_API_KEY is not set. Tamara session creation will be rejected upstream.");
            String::default()
        }));
        let merchant_id = env::var("TAMARA_MERCHANT_ID").unwrap_or_else(|_| {
            warn!("🪛️ TAMARA_MERCHANT_ID is not set.");
            String::default()
        });
        let webhook_secret = env::var("TAMARA_WEBHOOK_SECRET").ok().map(Secret::new);
        Self { base_url, api_key, merchant_id, webhook_secret, urls }
    }
}

#[derive(Debug, Clone)]
pub struct ZiinaConfig {
    pub base_url: String,
    pub api_key: Secret<String>,
    pub merchant_id: String,
    /// Ziina signs every webhook; verification is mandatory for this provider.
    pub webhook_secret: Secret<String>,
    pub test_mode: bool,
    pub urls: MerchantUrls,
}

impl ZiinaConfig {
    pub fn from_env_or_default(urls: MerchantUrls) -> Self {
        let base_url = env::var("ZIINA_BASE_URL").unwrap_or_else(|_| DEFAULT_ZIINA_BASE_URL.to_string());
        let api_key = Secret::new(env::var("ZIINA_API_KEY").unwrap_or_else(|_| {
            error!("🪛️ ZIINA_API_KEY is not set. Ziina session creation will be rejected upstream.");
            String::default()
        }));
        let merchant_id = env::var("ZIINA_MERCHANT_ID").unwrap_or_else(|_| {
            warn!("🪛️ ZIINA_MERCHANT_ID is not set.");
            String::default()
        });
        let webhook_secret = Secret::new(env::var("ZIINA_WEBHOOK_SECRET").unwrap_or_else(|_| {
            error!("🪛️ ZIINA_WEBHOOK_SECRET is not set. All Ziina webhooks will fail signature checks.");
            String::default()
        }));
        let test_mode = parse_boolean_flag(env::var("ZIINA_TEST_MODE").ok(), true);
        Self { base_url, api_key, merchant_id, webhook_secret, test_mode, urls }
    }
}
