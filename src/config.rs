use shuttle_runtime::SecretStore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} must be a valid {1}")]
    Invalid(&'static str, &'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub port: u16,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub serper_api_key: String,
    pub assemblyai_api_key: String,
    pub tts_api_key: String,
    /// Directory the synthesized interview audio is written to.
    pub audio_dir: String,
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_secrets(secrets: &SecretStore) -> Result<Self, ConfigError> {
        // Secrets win, the process environment fills the gaps for local runs.
        Self::from_lookup(|key| secrets.get(key).or_else(|| std::env::var(key).ok()))
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT", "u16"))?,
            None => 8000,
        };
        let cookie_secure = match get("COOKIE_SECURE").as_deref() {
            None => true,
            Some("1") | Some("true") => true,
            Some("0") | Some("false") => false,
            Some(_) => return Err(ConfigError::Invalid("COOKIE_SECURE", "boolean")),
        };

        Ok(Config {
            mongodb_uri: required("MONGODB_URI")?,
            database_name: get("DB_NAME").unwrap_or_else(|| "MentorMatch".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            port,
            gemini_api_key: required("GEMINI_API_KEY")?,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.5-flash".to_string()),
            serper_api_key: required("SERPER_API_KEY")?,
            assemblyai_api_key: required("ASSEMBLYAI_API_KEY")?,
            tts_api_key: required("TTS_API_KEY")?,
            audio_dir: get("AUDIO_DIR").unwrap_or_else(|| ".".to_string()),
            cookie_secure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 6] = [
        ("MONGODB_URI", "mongodb://localhost:27017"),
        ("JWT_SECRET", "secret"),
        ("GEMINI_API_KEY", "g"),
        ("SERPER_API_KEY", "s"),
        ("ASSEMBLYAI_API_KEY", "a"),
        ("TTS_API_KEY", "t"),
    ];

    #[test]
    fn defaults_apply_when_optional_keys_are_absent() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.database_name, "MentorMatch");
        assert_eq!(config.gemini_model, "gemini-2.5-flash");
        assert!(config.cookie_secure);
    }

    #[test]
    fn missing_key_is_named() {
        let err = Config::from_lookup(lookup(&REQUIRED[1..])).unwrap_err();
        assert_eq!(err.to_string(), "MONGODB_URI must be set");
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid("PORT", _))
        ));
    }
}
