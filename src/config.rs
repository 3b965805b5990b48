use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub showtime_service_url: String,
    pub gateway_url: String,
    pub payment_key_id: String,
    pub payment_key_secret: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            showtime_service_url: env::var("SHOWTIME_SERVICE_URL")
                .unwrap_or_else(|_| "http://showtime-service".to_string()),
            gateway_url: env::var("GATEWAY_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            payment_key_id: env::var("PAYMENT_KEY_ID")?,
            payment_key_secret: env::var("PAYMENT_KEY_SECRET")?,
        })
    }
}
