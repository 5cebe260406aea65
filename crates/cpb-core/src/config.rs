use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, messaging::throttled::ThrottleConfig, Result};

/// Typed configuration, read from the environment (plus an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    pub db_path: PathBuf,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,

    // Outbound flood control
    pub throttle: ThrottleConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (the process env in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bot_token = lookup("BOT_TOKEN")
            .and_then(non_empty)
            .or_else(|| lookup("TELEGRAM_BOT_TOKEN").and_then(non_empty))
            .ok_or_else(|| {
                Error::Config("BOT_TOKEN environment variable is required".to_string())
            })?;

        let db_path = PathBuf::from(
            lookup("DB_PATH")
                .and_then(non_empty)
                .unwrap_or_else(|| "bot.db".to_string()),
        );

        let audit_log_path = PathBuf::from(
            lookup("AUDIT_LOG_PATH")
                .and_then(non_empty)
                .unwrap_or_else(|| "/tmp/channel-post-bot-audit.log".to_string()),
        );
        let audit_log_json = lookup("AUDIT_LOG_JSON")
            .map(|s| parse_bool(&s))
            .unwrap_or(false);

        let defaults = ThrottleConfig::default();
        let throttle = ThrottleConfig {
            global_min_interval: lookup("THROTTLE_GLOBAL_MS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.global_min_interval),
            per_chat_min_interval: lookup("THROTTLE_PER_CHAT_MS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.per_chat_min_interval),
        };

        Ok(Self {
            bot_token,
            db_path,
            audit_log_path,
            audit_log_json,
            throttle,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn token_is_required() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn falls_back_to_telegram_bot_token() {
        let cfg = Config::from_lookup(lookup_from(&[("TELEGRAM_BOT_TOKEN", "abc")])).unwrap();
        assert_eq!(cfg.bot_token, "abc");
    }

    #[test]
    fn applies_defaults() {
        let cfg = Config::from_lookup(lookup_from(&[("BOT_TOKEN", "t")])).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("bot.db"));
        assert!(!cfg.audit_log_json);
        assert_eq!(
            cfg.throttle.per_chat_min_interval,
            ThrottleConfig::default().per_chat_min_interval
        );
    }

    #[test]
    fn reads_overrides() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("BOT_TOKEN", "t"),
            ("DB_PATH", "/var/lib/cpb/posts.db"),
            ("AUDIT_LOG_JSON", "yes"),
            ("THROTTLE_GLOBAL_MS", "10"),
        ]))
        .unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("/var/lib/cpb/posts.db"));
        assert!(cfg.audit_log_json);
        assert_eq!(cfg.throttle.global_min_interval, Duration::from_millis(10));
    }

    #[test]
    fn dotenv_parsing_strips_quotes_and_comments() {
        let parsed = parse_dotenv("# comment\nBOT_TOKEN=\"123:abc\"\nexport DB_PATH='x.db'\nbroken\n");
        assert_eq!(
            parsed,
            vec![
                ("BOT_TOKEN".to_string(), "123:abc".to_string()),
                ("DB_PATH".to_string(), "x.db".to_string()),
            ]
        );
    }
}
