use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use time::{macros::format_description, UtcOffset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    HuggingFace,
    Chat,
    Mock,
    Random,
}

impl FromStr for ClassifierKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "chat" => Ok(Self::Chat),
            "mock" => Ok(Self::Mock),
            "random" => Ok(Self::Random),
            other => anyhow::bail!("unknown classifier {:?}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    File,
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown store {:?}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub api_url: String,
    pub model: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    /// Chat models give no score, so every answer gets this confidence.
    pub label_confidence: f64,
}

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub label: String,
    pub confidence: f64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            label: "pizza".into(),
            confidence: 0.95,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub kind: ClassifierKind,
    pub timeout: Duration,
    pub huggingface: Option<HuggingFaceConfig>,
    pub chat: Option<ChatConfig>,
    pub mock: MockConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub classifier: ClassifierConfig,
    pub store: StoreKind,
    pub data_dir: PathBuf,
    pub database_url: Option<String>,
    /// Offset of the user's local time; entries are bucketed into days with it.
    pub utc_offset: UtcOffset,
    /// 0 keeps entries forever.
    pub retention_days: u32,
    pub prune_interval: Duration,
    pub reference_table_path: Option<PathBuf>,
    pub max_image_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let huggingface = get("HUGGING_FACE_ACCESS_TOKEN").map(|token| HuggingFaceConfig {
            api_url: or("HF_API_URL", "https://api-inference.huggingface.co"),
            model: or("HF_MODEL", "nateraw/food"),
            token,
        });

        let chat = match get("CHAT_API_KEY") {
            Some(api_key) => Some(ChatConfig {
                api_url: or("CHAT_API_URL", "https://api.openai.com"),
                api_key,
                model: or("CHAT_MODEL", "gpt-4o-mini"),
                label_confidence: parse_unit(get("CHAT_LABEL_CONFIDENCE"), 0.85)
                    .context("CHAT_LABEL_CONFIDENCE")?,
            }),
            None => None,
        };

        let mock = MockConfig {
            label: or("MOCK_LABEL", "pizza"),
            confidence: parse_unit(get("MOCK_CONFIDENCE"), 0.95).context("MOCK_CONFIDENCE")?,
        };

        let timeout_secs: u64 = parse_or(get("CLASSIFY_TIMEOUT_SECS"), 30)
            .context("CLASSIFY_TIMEOUT_SECS")?;
        anyhow::ensure!(timeout_secs > 0, "CLASSIFY_TIMEOUT_SECS must be positive");

        let classifier = ClassifierConfig {
            kind: or("CLASSIFIER", "mock").parse().context("CLASSIFIER")?,
            timeout: Duration::from_secs(timeout_secs),
            huggingface,
            chat,
            mock,
        };

        let store: StoreKind = or("STORE", "file").parse().context("STORE")?;
        let database_url = get("DATABASE_URL");
        if store == StoreKind::Postgres {
            anyhow::ensure!(database_url.is_some(), "DATABASE_URL is required for STORE=postgres");
        }

        let prune_secs: u64 =
            parse_or(get("PRUNE_INTERVAL_SECS"), 3600).context("PRUNE_INTERVAL_SECS")?;
        anyhow::ensure!(prune_secs > 0, "PRUNE_INTERVAL_SECS must be positive");

        Ok(Self {
            host: or("APP_HOST", "0.0.0.0"),
            port: parse_or(get("APP_PORT"), 8080).context("APP_PORT")?,
            classifier,
            store,
            data_dir: PathBuf::from(or("DATA_DIR", "./data")),
            database_url,
            utc_offset: parse_offset(&or("UTC_OFFSET", "+00:00")).context("UTC_OFFSET")?,
            retention_days: parse_or(get("RETENTION_DAYS"), 30).context("RETENTION_DAYS")?,
            prune_interval: Duration::from_secs(prune_secs),
            reference_table_path: get("REFERENCE_TABLE_PATH").map(PathBuf::from),
            max_image_bytes: parse_or(get("MAX_IMAGE_BYTES"), 20 * 1024 * 1024)
                .context("MAX_IMAGE_BYTES")?,
        })
    }
}

fn parse_or<T>(value: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => Ok(v.trim().parse::<T>()?),
        None => Ok(default),
    }
}

fn parse_unit(value: Option<String>, default: f64) -> anyhow::Result<f64> {
    let v = parse_or(value, default)?;
    anyhow::ensure!((0.0..=1.0).contains(&v), "must be within [0, 1], got {}", v);
    Ok(v)
}

/// Accepts `Z`, `UTC` or `±HH:MM`.
pub fn parse_offset(raw: &str) -> anyhow::Result<UtcOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }
    let format = format_description!("[offset_hour sign:mandatory]:[offset_minute]");
    UtcOffset::parse(raw, &format).with_context(|| format!("invalid UTC offset {:?}", raw))
}
