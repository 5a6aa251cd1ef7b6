use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use shelfbot_agent::ChatMode;
use shelfbot_cli::commands::{chat, config, doctor, migrate, seed};
use tempfile::TempDir;

#[test]
fn migrate_returns_success_with_in_memory_database() {
    with_env(&[("SHELFBOT_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(
            payload["message"],
            "applied pending migrations (7 catalog tables present)"
        );
    });
}

#[test]
fn migrate_reports_config_failure_for_gemini_without_key() {
    with_env(&[("SHELFBOT_LLM_PROVIDER", "gemini")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("llm.api_key"));
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = TempDir::new().expect("tempdir");
    let url = database_url(&dir);

    with_env(&[("SHELFBOT_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["status"], "ok");
        assert!(first_payload["message"]
            .as_str()
            .unwrap_or_default()
            .starts_with("demo catalog loaded"));

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        assert_eq!(first_payload["message"], parse_payload(&second.output)["message"]);
    });
}

#[test]
fn chat_answers_from_the_seeded_catalog() {
    let dir = TempDir::new().expect("tempdir");
    let url = database_url(&dir);

    with_env(&[("SHELFBOT_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0);

        let stock = chat::run("Check stock for Cool T-Shirt", ChatMode::Structured, false);
        assert_eq!(stock.exit_code, 0);
        assert!(stock.output.contains("27"), "{}", stock.output);

        let listed = chat::run("show all products", ChatMode::Structured, true);
        assert_eq!(listed.exit_code, 0);
        let payload = parse_payload(&listed.output);
        assert_eq!(payload["mode"], "structured");
        assert!(payload["response"].as_str().unwrap_or_default().contains("Coffee Mug"));
    });
}

#[test]
fn chat_in_ai_mode_without_backend_reports_apology() {
    with_env(&[("SHELFBOT_DATABASE_URL", "sqlite::memory:")], || {
        let result = chat::run("what sells best?", ChatMode::Ai, false);
        assert_eq!(result.exit_code, 0);
        assert!(result
            .output
            .starts_with("Sorry, I couldn't process your request at the moment."));
    });
}

#[test]
fn config_attributes_env_sources_and_redacts_key() {
    with_env(
        &[
            ("SHELFBOT_SERVER_PORT", "9191"),
            ("SHELFBOT_LLM_PROVIDER", "gemini"),
            ("SHELFBOT_LLM_API_KEY", "gm-top-secret"),
        ],
        || {
            let output = config::run();
            assert!(output.contains("- server.port = 9191 (source: env (SHELFBOT_SERVER_PORT))"));
            assert!(output.contains("- llm.api_key = <redacted> (source: env (SHELFBOT_LLM_API_KEY))"));
            assert!(!output.contains("gm-top-secret"));
        },
    );
}

#[test]
fn doctor_json_passes_with_reachable_database() {
    with_env(&[("SHELFBOT_DATABASE_URL", "sqlite::memory:")], || {
        let payload = parse_payload(&doctor::run(true));
        assert_eq!(payload["overall_status"], "pass");

        let names: Vec<&str> = payload["checks"]
            .as_array()
            .expect("checks")
            .iter()
            .filter_map(|check| check["name"].as_str())
            .collect();
        assert_eq!(names, ["config_validation", "llm_readiness", "database_connectivity"]);
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_fails() {
    with_env(&[("SHELFBOT_SERVER_PORT", "not-a-port")], || {
        let payload = parse_payload(&doctor::run(true));
        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][0]["status"], "fail");
        assert_eq!(payload["checks"][1]["status"], "skipped");
        assert_eq!(payload["checks"][2]["status"], "skipped");
    });
}

fn database_url(dir: &TempDir) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join("shelfbot.db").display())
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SHELFBOT_DATABASE_URL",
        "SHELFBOT_DATABASE_MAX_CONNECTIONS",
        "SHELFBOT_DATABASE_TIMEOUT_SECS",
        "SHELFBOT_LLM_PROVIDER",
        "SHELFBOT_LLM_API_KEY",
        "SHELFBOT_LLM_BASE_URL",
        "SHELFBOT_LLM_MODEL",
        "SHELFBOT_LLM_TIMEOUT_SECS",
        "SHELFBOT_SERVER_BIND_ADDRESS",
        "SHELFBOT_SERVER_PORT",
        "SHELFBOT_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "SHELFBOT_LOGGING_LEVEL",
        "SHELFBOT_LOGGING_FORMAT",
        "SHELFBOT_LOG_LEVEL",
        "SHELFBOT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
