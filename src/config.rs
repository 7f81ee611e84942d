use anyhow::Context;
use serde::Deserialize;

/// SameSite policy applied to the session and CSRF cookies.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Lax,
    Strict,
    None,
}

impl SameSitePolicy {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lax" => Ok(Self::Lax),
            "strict" => Ok(Self::Strict),
            "none" => Ok(Self::None),
            other => anyhow::bail!("unknown SameSite policy {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSitePolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    /// Extra admin identity besides user #1, stored lower-cased.
    pub admin_email: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let secret = std::env::var("SECRET_KEY")
            .or_else(|_| std::env::var("FLASK_KEY"))
            .context("set SECRET_KEY (a long random string)")?;

        let session = SessionConfig {
            secret,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "inkwell".into()),
            audience: std::env::var("SESSION_AUDIENCE").unwrap_or_else(|_| "inkwell-web".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
            cookie_secure: std::env::var("SESSION_COOKIE_SECURE")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            cookie_same_site: match std::env::var("SESSION_COOKIE_SAMESITE") {
                Ok(raw) => SameSitePolicy::parse(&raw)?,
                Err(_) => SameSitePolicy::Lax,
            },
        };

        let admin_email = std::env::var("ADMIN_EMAIL")
            .ok()
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty());

        Ok(Self {
            database_url,
            session,
            admin_email,
        })
    }
}
