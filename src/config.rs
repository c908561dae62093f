use std::env;
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::SecretString;

/// Cash-on-Delivery orders above this total are refused.
pub const DEFAULT_COD_LIMIT: i64 = 5000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub checkout: CheckoutSettings,
    pub email: Option<EmailSettings>,
}

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub cod_limit: Decimal,
    pub payment_gateway_url: String,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            cod_limit: Decimal::from(DEFAULT_COD_LIMIT),
            payment_gateway_url: "http://localhost:3000/payments".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub api_url: String,
    pub sender: String,
    pub api_token: SecretString,
    pub timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let environment = app_environment();

        let mut checkout = CheckoutSettings::default();
        if let Ok(limit) = env::var("COD_LIMIT") {
            checkout.cod_limit = Decimal::from_str(&limit)
                .map_err(|e| anyhow::anyhow!("invalid COD_LIMIT {limit}: {e}"))?;
        }
        if let Ok(url) = env::var("PAYMENT_GATEWAY_URL") {
            checkout.payment_gateway_url = url.trim_end_matches('/').to_string();
        }

        // Invoice email stays off until an API endpoint is configured.
        let email = match env::var("EMAIL_API_URL") {
            Ok(api_url) => Some(EmailSettings {
                api_url,
                sender: env::var("EMAIL_SENDER")
                    .unwrap_or_else(|_| "orders@artisan-shop.local".to_string()),
                api_token: SecretString::from(env::var("EMAIL_API_TOKEN").unwrap_or_default()),
                timeout_secs: env::var("EMAIL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse::<u64>().ok())
                    .unwrap_or(10),
            }),
            Err(_) => None,
        };

        Ok(Self {
            port,
            database_url,
            host,
            environment,
            checkout,
            email,
        })
    }

    pub fn is_production(&self) -> bool {
        is_production_environment(&self.environment)
    }
}

/// `APP_ENV`, defaulting to `development`.
pub fn app_environment() -> String {
    env::var("APP_ENV").unwrap_or_else(|_| "development".to_string())
}

pub fn is_production_environment(environment: &str) -> bool {
    environment.eq_ignore_ascii_case("production")
}
