//! Flags config keys present in a loaded file but never read in a given mode.

use crate::consumption::{consumed_pointers, ConfigMode};
use anyhow::{bail, Result};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone)]
pub struct UnusedKeysReport {
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeysReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

fn leaf_pointers(v: &Value, path: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) if !map.is_empty() => {
            for (k, val) in map {
                leaf_pointers(val, &format!("{path}/{k}"), out);
            }
        }
        Value::Array(arr) if !arr.is_empty() => {
            for (i, val) in arr.iter().enumerate() {
                leaf_pointers(val, &format!("{path}/{i}"), out);
            }
        }
        _ => out.push(path.to_string()),
    }
}

fn is_consumed(pointer: &str, consumed: &[&str]) -> bool {
    consumed.iter().any(|c| pointer == *c || pointer.starts_with(&format!("{c}/")))
}

/// Report which leaf pointers in `config_json` are never read in `mode`.
/// Under [`UnusedKeyPolicy::Fail`], a non-empty report is returned as an
/// error instead.
pub fn report_unused_keys(
    mode: ConfigMode,
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeysReport> {
    let consumed = consumed_pointers(mode);
    let mut all = Vec::new();
    leaf_pointers(config_json, "", &mut all);

    let mut unused: Vec<String> = all.into_iter().filter(|p| !is_consumed(p, consumed)).collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeysReport { unused_leaf_pointers: unused };
    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} key(s) present in config but not read in this mode: {}",
            report.unused_leaf_pointers.len(),
            report.unused_leaf_pointers.join(", "),
        );
    }
    Ok(report)
}
