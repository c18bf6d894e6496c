use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default number of words packed into a single chunk.
pub const DEFAULT_WORDS_PER_CHUNK: usize = 500;
/// Default number of chunks embedded and stored per request.
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Default pause between successive batch writes.
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(1000);
/// Default total attempts made against the embedding service per batch.
pub const DEFAULT_EMBED_MAX_ATTEMPTS: usize = 3;
/// Default fixed delay between failed embedding attempts.
pub const DEFAULT_EMBED_RETRY_DELAY: Duration = Duration::from_millis(5000);

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for an ingestion run.
///
/// Built once at process start and handed by reference to the clients that need it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Service account used to read the source folder.
    pub google_service_account_email: String,
    /// PEM-encoded private key of the service account.
    pub google_private_key: String,
    /// OAuth token endpoint used for the JWT bearer exchange.
    pub google_token_uri: String,
    /// Base URL of the Google APIs host.
    pub google_drive_api_url: String,
    /// Identifier of the Drive folder holding source documents.
    pub google_drive_folder_id: String,
    /// Base URL of the Supabase project.
    pub supabase_url: String,
    /// Service role key granting insert access to the chunk table.
    pub supabase_service_role_key: String,
    /// Table storing chunk rows.
    pub supabase_chunks_table: String,
    /// Bearer token for the embedding service.
    pub voyage_api_key: String,
    /// Embedding model identifier.
    pub voyage_model: String,
    /// Base URL of the embedding service.
    pub voyage_base_url: String,
    /// Words per chunk.
    pub words_per_chunk: usize,
    /// Chunks per embedding/insert batch.
    pub batch_size: usize,
    /// Pause between successive batch writes.
    pub batch_pause: Duration,
    /// Total embedding attempts per batch.
    pub embed_max_attempts: usize,
    /// Delay between failed embedding attempts.
    pub embed_retry_delay: Duration,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            google_service_account_email: load_env("GOOGLE_SERVICE_ACCOUNT_EMAIL")?,
            google_private_key: unescape_private_key(&load_env("GOOGLE_PRIVATE_KEY")?),
            google_token_uri: load_env_or(
                "GOOGLE_TOKEN_URI",
                "https://oauth2.googleapis.com/token",
            ),
            google_drive_api_url: load_env_or(
                "GOOGLE_DRIVE_API_URL",
                "https://www.googleapis.com",
            ),
            google_drive_folder_id: load_env("GOOGLE_DRIVE_FOLDER_ID")?,
            supabase_url: load_env("SUPABASE_URL")?,
            supabase_service_role_key: load_env("SUPABASE_SERVICE_ROLE_KEY")?,
            supabase_chunks_table: load_env_or("SUPABASE_CHUNKS_TABLE", "transcript_chunks"),
            voyage_api_key: load_env("VOYAGE_API_KEY")?,
            voyage_model: load_env_or("VOYAGE_MODEL", "voyage-3"),
            voyage_base_url: load_env_or("VOYAGE_BASE_URL", "https://api.voyageai.com/v1"),
            words_per_chunk: load_positive("INGEST_WORDS_PER_CHUNK", DEFAULT_WORDS_PER_CHUNK)?,
            batch_size: load_positive("INGEST_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            batch_pause: load_millis("INGEST_BATCH_PAUSE_MS", DEFAULT_BATCH_PAUSE)?,
            embed_max_attempts: load_positive("EMBED_MAX_ATTEMPTS", DEFAULT_EMBED_MAX_ATTEMPTS)?,
            embed_retry_delay: load_millis("EMBED_RETRY_DELAY_MS", DEFAULT_EMBED_RETRY_DELAY)?,
        })
    }

    /// Load `.env.local` and `.env` (when present) and then read the environment.
    pub fn load() -> Result<Self, ConfigError> {
        load_dotenv();
        let config = Self::from_env()?;
        tracing::debug!(
            folder = %config.google_drive_folder_id,
            supabase = %config.supabase_url,
            table = %config.supabase_chunks_table,
            model = %config.voyage_model,
            words_per_chunk = config.words_per_chunk,
            batch_size = config.batch_size,
            "Loaded configuration"
        );
        Ok(config)
    }
}

/// Merge `.env.local` and then `.env` into the process environment without overriding it.
pub fn load_dotenv() {
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn load_positive(key: &str, default: usize) -> Result<usize, ConfigError> {
    let Some(raw) = load_env_optional(key) else {
        return Ok(default);
    };
    parse_positive(key, &raw)
}

fn load_millis(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

fn parse_positive(key: &str, raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

/// Private keys pasted into `.env` files usually carry literal `\n` escapes.
pub(crate) fn unescape_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_positive_rejects_zero_and_garbage() {
        assert_eq!(parse_positive("N", " 42 ").unwrap(), 42);
        assert!(matches!(
            parse_positive("N", "0"),
            Err(ConfigError::InvalidValue(key)) if key == "N"
        ));
        assert!(parse_positive("N", "many").is_err());
    }

    #[test]
    fn private_key_escapes_become_newlines() {
        let key = unescape_private_key("-----BEGIN KEY-----\\nabc\\n-----END KEY-----");
        assert_eq!(key, "-----BEGIN KEY-----\nabc\n-----END KEY-----");
    }
}
