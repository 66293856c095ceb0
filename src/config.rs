use anyhow::{Context, Result};
use rand::{distributions::Alphanumeric, Rng};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Directory holding data.json, auth.json and service-orders.json
    pub data_dir: PathBuf,

    /// Directory of the built single-page frontend
    pub static_dir: PathBuf,

    /// HMAC secret for bearer tokens
    pub jwt_secret: String,

    /// How many hours an issued token remains valid
    pub session_duration_hours: u64,

    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// `None` disables report generation.
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3001".into())
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let session_duration_hours = std::env::var("SESSION_DURATION_HOURS")
            .unwrap_or_else(|_| "24".into())
            .parse::<u64>()
            .unwrap_or(24);

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => {
                tracing::warn!(
                    "JWT_SECRET not set; using a random per-process secret. \
                     Tokens will not survive a restart."
                );
                random_secret()
            }
        };

        let api_key = std::env::var("OPENAI_API_KEY")
            .or_else(|_| std::env::var("VITE_OPENAI_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());

        let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse::<u64>()
            .context("OPENAI_TIMEOUT_SECS must be a whole number of seconds")?;

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| ".".into()).into(),
            static_dir: std::env::var("STATIC_DIR")
                .unwrap_or_else(|_| "dist".into())
                .into(),
            jwt_secret,
            session_duration_hours,
            openai: OpenAiConfig {
                api_key,
                api_url: std::env::var("OPENAI_API_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".into()),
                model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
                timeout_secs,
            },
        })
    }
}

fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_secrets_differ() {
        let a = random_secret();
        assert_eq!(a.len(), 64);
        assert_ne!(a, random_secret());
    }
}
