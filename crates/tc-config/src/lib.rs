//! Layered YAML configuration: load, deep-merge, canonicalize, hash.
//!
//! Files (or in-memory strings, for tests) are parsed as YAML, deep-merged
//! in argument order — later layers override earlier ones — then
//! canonicalized to JSON with recursively sorted object keys and hashed
//! with SHA-256. The hash lets two runs detect whether their effective
//! configuration actually differs, independent of key order or which
//! layer a value came from.
//!
//! Literal secret-shaped values (API key prefixes, PEM blocks) are
//! rejected at load time — see [`consumption`] and [`secrets`] for how the
//! rest of the workspace is meant to carry secrets instead: by env var
//! name, resolved once at startup.

mod consumption;
pub mod secrets;
mod unused;

pub use consumption::{consumed_pointers, ConfigMode};
pub use secrets::{resolve_secrets_for_mode, ResolvedDiscordWebhooks, ResolvedSecrets};
pub use unused::{report_unused_keys, UnusedKeyPolicy, UnusedKeysReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

/// Load and merge YAML files from disk, in order.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut contents = Vec::with_capacity(paths.len());
    for p in paths {
        contents.push(fs::read_to_string(p).with_context(|| format!("read config: {p}"))?);
    }
    let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

/// Load and merge YAML already held in memory, in order. Used by
/// `load_layered_yaml` and directly by tests that don't want a filesystem
/// round trip.
pub fn load_layered_yaml_from_strings(yamls: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());

    for (i, s) in yamls.iter().enumerate() {
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(s).with_context(|| format!("parse yaml layer {i}"))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    if let Some(pointer) = find_secret_like_value(&merged) {
        bail!(
            "CONFIG_SECRET_DETECTED: literal secret value found at {pointer}; \
             store the env var NAME instead and resolve it at startup"
        );
    }

    let canonical = canonicalize_json(&merged);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let config_hash = hex::encode(hasher.finalize());

    Ok(LoadedConfig {
        config_json: serde_json::from_str(&canonical).context("canonical json parse failed")?,
        canonical_json: canonical,
        config_hash,
    })
}

/// Objects merge recursively; arrays and scalars are replaced wholesale.
fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

fn canonicalize_json(v: &Value) -> String {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).expect("json serialization must not fail")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Depth-first search for a string value that looks like a credential
/// rather than an env var name: a provider key prefix or a PEM block.
fn find_secret_like_value(v: &Value) -> Option<String> {
    fn walk(v: &Value, path: &mut String, found: &mut Option<String>) {
        if found.is_some() {
            return;
        }
        match v {
            Value::Object(map) => {
                for (k, val) in map {
                    let mark = path.len();
                    path.push('/');
                    path.push_str(k);
                    walk(val, path, found);
                    path.truncate(mark);
                }
            }
            Value::Array(arr) => {
                for (i, val) in arr.iter().enumerate() {
                    let mark = path.len();
                    path.push('/');
                    path.push_str(&i.to_string());
                    walk(val, path, found);
                    path.truncate(mark);
                }
            }
            Value::String(s) if looks_like_secret(s) => {
                *found = Some(path.clone());
            }
            _ => {}
        }
    }

    let mut path = String::new();
    let mut found = None;
    walk(v, &mut path, &mut found);
    found
}

fn looks_like_secret(s: &str) -> bool {
    s.starts_with("sk-") || s.starts_with("AKIA") || s.contains("PRIVATE KEY-----")
}
