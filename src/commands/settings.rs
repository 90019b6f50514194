use crate::analysis::weights::WeightTable;
use crate::models::likability::MetricKey;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_SCHEMA_VERSION: i64 = 1;
const SETTINGS_FILE_NAME: &str = "settings.json";

const DEFAULT_SCHEDULE_INTERVAL_SECS: u64 = 3600;
const DEFAULT_TIME_BUDGET_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    pub weights: WeightTable,
    pub schedule_interval: Duration,
    pub time_budget: Duration,
}

impl Default for EffectiveSettings {
    fn default() -> Self {
        EffectiveSettings {
            weights: WeightTable::default(),
            schedule_interval: Duration::from_secs(DEFAULT_SCHEDULE_INTERVAL_SECS),
            time_budget: Duration::from_secs(DEFAULT_TIME_BUDGET_SECS),
        }
    }
}

pub fn load_effective_settings(data_dir: &Path) -> Result<EffectiveSettings, String> {
    let settings = load_settings_from_disk(data_dir)?;
    Ok(effective_from_value(&settings))
}

fn effective_from_value(settings: &Value) -> EffectiveSettings {
    let weights = settings
        .get("weights")
        .map(WeightTable::from_json)
        .unwrap_or_default();

    let schedule_interval = settings
        .get("scheduleIntervalSecs")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_SCHEDULE_INTERVAL_SECS);
    let time_budget = settings
        .get("timeBudgetSecs")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_TIME_BUDGET_SECS);

    EffectiveSettings {
        weights,
        schedule_interval: Duration::from_secs(schedule_interval),
        time_budget: Duration::from_secs(time_budget),
    }
}

pub fn load_settings_from_disk(data_dir: &Path) -> Result<Value, String> {
    let path = settings_path(data_dir);
    ensure_data_dir(data_dir)?;

    let original = if path.exists() {
        let raw = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read settings.json: {e}"))?;
        serde_json::from_str::<Value>(&raw).unwrap_or_else(|_| json!({}))
    } else {
        json!({})
    };

    let migrated = migrate_settings(original.clone());
    if migrated != original || !path.exists() {
        write_settings_file(&path, &migrated)?;
    }

    Ok(migrated)
}

pub fn save_settings_to_disk(data_dir: &Path, settings: Value) -> Result<Value, String> {
    let path = settings_path(data_dir);
    ensure_data_dir(data_dir)?;

    let mut merged = load_settings_from_disk(data_dir).unwrap_or_else(|_| default_settings());
    merge_settings(&mut merged, &settings);

    let migrated = migrate_settings(merged);
    write_settings_file(&path, &migrated)?;
    Ok(migrated)
}

fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SETTINGS_FILE_NAME)
}

fn ensure_data_dir(data_dir: &Path) -> Result<(), String> {
    fs::create_dir_all(data_dir)
        .map_err(|e| format!("Failed to create data directory {}: {e}", data_dir.display()))
}

fn write_settings_file(path: &Path, settings: &Value) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {e}"))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write settings.json: {e}"))
}

fn migrate_settings(input: Value) -> Value {
    let defaults = default_settings();
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    deep_merge_defaults(&mut out, &defaults);
    sanitize_settings(&mut out);

    if let Some(obj) = out.as_object_mut() {
        obj.insert("schema_version".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }

    out
}

fn default_settings() -> Value {
    json!({
        "schema_version": SETTINGS_SCHEMA_VERSION,
        "weights": WeightTable::default().to_json(),
        "scheduleIntervalSecs": DEFAULT_SCHEDULE_INTERVAL_SECS,
        "timeBudgetSecs": DEFAULT_TIME_BUDGET_SECS
    })
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn merge_settings(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_obj), Value::Object(incoming_obj)) => {
            for (key, value) in incoming_obj {
                if let Some(existing) = target_obj.get_mut(key) {
                    merge_settings(existing, value);
                } else {
                    target_obj.insert(key.clone(), value.clone());
                }
            }
        }
        (target_slot, incoming_value) => {
            *target_slot = incoming_value.clone();
        }
    }
}

fn sanitize_settings(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    clamp_u64(obj, "scheduleIntervalSecs", 60, 86_400, DEFAULT_SCHEDULE_INTERVAL_SECS);
    clamp_u64(obj, "timeBudgetSecs", 1, 600, DEFAULT_TIME_BUDGET_SECS);

    // Weights keep their sign; only malformed entries are dropped.
    let weights = obj
        .entry("weights".to_string())
        .or_insert_with(|| json!({}));
    if !weights.is_object() {
        *weights = WeightTable::default().to_json();
    }
    if let Some(tables) = weights.as_object_mut() {
        tables.retain(|name, entries| {
            entries.is_object() && (name == "global" || name.parse::<crate::models::rollup::Genre>().is_ok())
        });
        for entries in tables.values_mut().filter_map(Value::as_object_mut) {
            entries.retain(|key, value| {
                key.parse::<MetricKey>().is_ok() && value.as_f64().is_some_and(f64::is_finite)
            });
        }

        let global = tables
            .entry("global".to_string())
            .or_insert_with(|| json!({}));
        let defaults = WeightTable::default();
        if let Some(global_obj) = global.as_object_mut() {
            for key in MetricKey::ALL {
                global_obj
                    .entry(key.as_str().to_string())
                    .or_insert_with(|| json!(defaults.global().get(key)));
            }
        }
    }
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map.get(key).and_then(Value::as_u64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}
