//! Secret resolution and webhook routing.
//!
//! Config YAML stores only **env var NAMES** (e.g. `"ALPACA_API_KEY_PAPER"`),
//! never values — [`crate::load_layered_yaml`] rejects anything that looks
//! like a literal secret before it reaches this module. Callers invoke
//! [`resolve_secrets_for_mode`] once at startup and pass the result to
//! constructors rather than scattering `std::env::var` calls. `Debug` on
//! every secret-bearing struct here redacts values; error messages name the
//! env var, never its value.
//!
//! | Mode     | Required                                              |
//! |----------|--------------------------------------------------------|
//! | live     | broker api_key, broker api_secret, TwelveData api_key  |
//! | paper    | broker api_key, broker api_secret                      |
//! | backtest | nothing                                                |
//!
//! Discord webhooks are optional in every mode.

use anyhow::{bail, Result};
use serde_json::Value;

/// Discord webhook URLs resolved from the environment, one per logical
/// notification channel. A missing channel silently produces `None`.
#[derive(Clone)]
pub struct ResolvedDiscordWebhooks {
    pub paper: Option<String>,
    pub live: Option<String>,
    pub backtest: Option<String>,
    /// Risk alerts: cooling-off engagement, exposure breaches, rejects.
    pub alerts: Option<String>,
    pub heartbeat: Option<String>,
    /// Manual operator notifications (e.g. a human pausing or resuming a session).
    pub operator: Option<String>,
}

impl std::fmt::Debug for ResolvedDiscordWebhooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedDiscordWebhooks")
            .field("paper", &self.paper.as_ref().map(|_| "<REDACTED>"))
            .field("live", &self.live.as_ref().map(|_| "<REDACTED>"))
            .field("backtest", &self.backtest.as_ref().map(|_| "<REDACTED>"))
            .field("alerts", &self.alerts.as_ref().map(|_| "<REDACTED>"))
            .field("heartbeat", &self.heartbeat.as_ref().map(|_| "<REDACTED>"))
            .field("operator", &self.operator.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// All runtime-resolved secrets for one engine instantiation. Built once
/// at startup via [`resolve_secrets_for_mode`].
#[derive(Clone)]
pub struct ResolvedSecrets {
    pub broker_api_key: Option<String>,
    pub broker_api_secret: Option<String>,
    pub twelvedata_api_key: Option<String>,
    pub discord: ResolvedDiscordWebhooks,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("broker_api_key", &self.broker_api_key.as_ref().map(|_| "<REDACTED>"))
            .field("broker_api_secret", &self.broker_api_secret.as_ref().map(|_| "<REDACTED>"))
            .field("twelvedata_api_key", &self.twelvedata_api_key.as_ref().map(|_| "<REDACTED>"))
            .field("discord", &self.discord)
            .finish()
    }
}

struct SecretEnvNames {
    broker_api_key_var: String,
    broker_api_secret_var: String,
    twelvedata_api_key_var: String,
    discord_paper_var: Option<String>,
    discord_live_var: Option<String>,
    discord_backtest_var: Option<String>,
    discord_alerts_var: Option<String>,
    discord_heartbeat_var: Option<String>,
    discord_operator_var: Option<String>,
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Resolve a named environment variable; `None` if unset or blank.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn parse_env_names(config_json: &Value) -> SecretEnvNames {
    SecretEnvNames {
        broker_api_key_var: read_str_at(config_json, "/broker/keys_env/api_key")
            .unwrap_or_else(|| "TC_BROKER_API_KEY".to_string()),
        broker_api_secret_var: read_str_at(config_json, "/broker/keys_env/api_secret")
            .unwrap_or_else(|| "TC_BROKER_API_SECRET".to_string()),
        twelvedata_api_key_var: read_str_at(config_json, "/data/providers/twelvedata/api_key_env")
            .unwrap_or_else(|| "TWELVEDATA_API_KEY".to_string()),
        discord_paper_var: read_str_at(config_json, "/discord/channels/paper"),
        discord_live_var: read_str_at(config_json, "/discord/channels/live"),
        discord_backtest_var: read_str_at(config_json, "/discord/channels/backtest"),
        discord_alerts_var: read_str_at(config_json, "/discord/channels/alerts"),
        discord_heartbeat_var: read_str_at(config_json, "/discord/channels/heartbeat"),
        discord_operator_var: read_str_at(config_json, "/discord/channels/operator"),
    }
}

/// Resolve all secrets from the environment for the given `mode` string
/// (`"LIVE"`, `"PAPER"`, or `"BACKTEST"`, case-insensitive).
///
/// Returns `Err` naming the env var of the first missing required
/// variable; the value itself never appears in the error.
pub fn resolve_secrets_for_mode(config_json: &Value, mode: &str) -> Result<ResolvedSecrets> {
    let names = parse_env_names(config_json);
    let mode_upper = mode.trim().to_ascii_uppercase();

    let broker_api_key = resolve_env(&names.broker_api_key_var);
    let broker_api_secret = resolve_env(&names.broker_api_secret_var);
    let twelvedata_api_key = resolve_env(&names.twelvedata_api_key_var);

    match mode_upper.as_str() {
        "LIVE" => {
            if broker_api_key.is_none() {
                bail!(
                    "SECRETS_MISSING mode=LIVE: required env var '{}' (broker api_key) is not set or empty",
                    names.broker_api_key_var,
                );
            }
            if broker_api_secret.is_none() {
                bail!(
                    "SECRETS_MISSING mode=LIVE: required env var '{}' (broker api_secret) is not set or empty",
                    names.broker_api_secret_var,
                );
            }
            if twelvedata_api_key.is_none() {
                bail!(
                    "SECRETS_MISSING mode=LIVE: required env var '{}' (TwelveData api_key) is not set or empty",
                    names.twelvedata_api_key_var,
                );
            }
        }
        "PAPER" => {
            if broker_api_key.is_none() {
                bail!(
                    "SECRETS_MISSING mode=PAPER: required env var '{}' (broker api_key) is not set or empty",
                    names.broker_api_key_var,
                );
            }
            if broker_api_secret.is_none() {
                bail!(
                    "SECRETS_MISSING mode=PAPER: required env var '{}' (broker api_secret) is not set or empty",
                    names.broker_api_secret_var,
                );
            }
        }
        "BACKTEST" => {}
        other => {
            bail!("SECRETS_UNKNOWN_MODE: unrecognised mode '{}'; expected one of: LIVE | PAPER | BACKTEST", other);
        }
    }

    let discord = ResolvedDiscordWebhooks {
        paper: names.discord_paper_var.as_deref().and_then(resolve_env),
        live: names.discord_live_var.as_deref().and_then(resolve_env),
        backtest: names.discord_backtest_var.as_deref().and_then(resolve_env),
        alerts: names.discord_alerts_var.as_deref().and_then(resolve_env),
        heartbeat: names.discord_heartbeat_var.as_deref().and_then(resolve_env),
        operator: names.discord_operator_var.as_deref().and_then(resolve_env),
    };

    Ok(ResolvedSecrets { broker_api_key, broker_api_secret, twelvedata_api_key, discord })
}
