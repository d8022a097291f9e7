use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use storefront_types::domain::cart::PriceSource;
use storefront_types::domain::order::UserId;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: String,
    pub database_url: Option<String>,
    pub price_source: PriceSource,
    /// Pre-issued bearer tokens, `AUTH_TOKENS=token:user_id,...`.
    pub auth_tokens: Vec<(String, UserId)>,
    /// JSON file with the products to load into the catalog at startup.
    pub catalog_seed: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_port = lookup("SERVER_PORT").unwrap_or_else(|| "3000".into());
        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());
        let price_source = match lookup("PRICE_SOURCE") {
            Some(s) => s.parse()?,
            None => PriceSource::default(),
        };
        let auth_tokens = match lookup("AUTH_TOKENS") {
            Some(s) => parse_tokens(&s)?,
            None => Vec::new(),
        };
        let catalog_seed = lookup("CATALOG_SEED").map(PathBuf::from);
        Ok(Self {
            server_port,
            database_url,
            price_source,
            auth_tokens,
            catalog_seed,
        })
    }
}

fn parse_tokens(raw: &str) -> anyhow::Result<Vec<(String, UserId)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (token, user) = pair
                .rsplit_once(':')
                .ok_or_else(|| anyhow::anyhow!("AUTH_TOKENS entry `{pair}` is not token:user_id"))?;
            if token.is_empty() {
                anyhow::bail!("AUTH_TOKENS entry `{pair}` has an empty token");
            }
            let user: UserId = user
                .parse()
                .map_err(|e| anyhow::anyhow!("AUTH_TOKENS entry `{pair}`: {e}"))?;
            Ok((token.to_string(), user))
        })
        .collect()
}
