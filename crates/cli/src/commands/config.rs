use std::env;
use std::fs;
use std::path::Path;

use shelfbot_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = config_file_path.as_deref().and_then(load_config_file_doc);
    render(&config, config_file_doc.as_ref(), config_file_path.as_deref())
}

pub fn render(config: &AppConfig, config_file_doc: Option<&Value>, config_file_path: Option<&Path>) -> String {
    let api_key = if config.llm.has_api_key() { "<redacted>" } else { "<unset>" };
    let fields: [(&str, String, &[&str]); 12] = [
        ("database.url", config.database.url.clone(), &["SHELFBOT_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["SHELFBOT_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["SHELFBOT_DATABASE_TIMEOUT_SECS"],
        ),
        ("llm.provider", format!("{:?}", config.llm.provider), &["SHELFBOT_LLM_PROVIDER"]),
        ("llm.model", config.llm.model.clone(), &["SHELFBOT_LLM_MODEL"]),
        ("llm.base_url", config.llm.base_url.clone(), &["SHELFBOT_LLM_BASE_URL"]),
        ("llm.api_key", api_key.to_string(), &["SHELFBOT_LLM_API_KEY"]),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string(), &["SHELFBOT_LLM_TIMEOUT_SECS"]),
        ("server.bind_address", config.server.bind_address.clone(), &["SHELFBOT_SERVER_BIND_ADDRESS"]),
        ("server.port", config.server.port.to_string(), &["SHELFBOT_SERVER_PORT"]),
        (
            "logging.level",
            config.logging.level.clone(),
            &["SHELFBOT_LOGGING_LEVEL", "SHELFBOT_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["SHELFBOT_LOGGING_FORMAT", "SHELFBOT_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in fields {
        let source = field_source(key, env_keys, config_file_doc, config_file_path);
        lines.push(format!("- {key} = {value} (source: {source})"));
    }
    lines.join("\n")
}

fn load_config_file_doc(path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if config_file_doc.is_some_and(|doc| contains_path(doc, key_path)) {
        let file_path = config_file_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file_path})");
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use secrecy::SecretString;
    use shelfbot_core::config::{AppConfig, LlmProvider};
    use toml::Value;

    use super::{contains_path, render};

    #[test]
    fn file_keys_are_attributed_to_the_file() {
        let doc: Value = "[llm]\nmodel = \"gemini-1.5-pro\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.provider"));
        assert!(!contains_path(&doc, "server.port"));

        let text = render(&AppConfig::default(), Some(&doc), Some(Path::new("shelfbot.toml")));
        assert!(text.contains("- llm.model = gemini-1.5-flash (source: file (shelfbot.toml))"));
        assert!(text.contains("- server.port = 8080 (source: "));
    }

    #[test]
    fn api_key_is_never_printed() {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::Gemini;
        config.llm.api_key = Some(SecretString::from("gm-very-secret".to_string()));

        let text = render(&config, None, None);
        assert!(text.contains("- llm.api_key = <redacted>"));
        assert!(!text.contains("gm-very-secret"));
    }
}
