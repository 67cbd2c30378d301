use crate::db;
use crate::error::StoreError;
use crate::normalize::NormalizeOptions;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;

pub const KEY_PASS_MARK: &str = "results.passMark";
pub const KEY_LOOKUP_COLUMN: &str = "lookup.keyColumn";
pub const KEY_UNIFY_GRADE_PUNCTUATION: &str = "normalize.unifyGradePunctuation";
pub const KEY_DASHBOARD_BINS: &str = "dashboard.bins";

pub const DEFAULT_PASS_MARK: f64 = 60.0;
pub const DEFAULT_KEY_COLUMN: &str = "roll_no_";
pub const DEFAULT_BINS: usize = 20;
const MAX_BINS: usize = 200;

/// Workspace settings. Stored per workspace in the settings table; anything
/// not stored falls back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub pass_mark: f64,
    pub key_column: String,
    pub unify_grade_punctuation: bool,
    pub dashboard_bins: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pass_mark: DEFAULT_PASS_MARK,
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            unify_grade_punctuation: false,
            dashboard_bins: DEFAULT_BINS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsError {
    pub key: String,
    pub message: String,
}

impl Settings {
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            unify_grade_punctuation: self.unify_grade_punctuation,
        }
    }

    pub fn load(conn: &Connection) -> Result<Self, StoreError> {
        let mut s = Settings::default();
        if let Some(v) = db::settings_get_json(conn, KEY_PASS_MARK)?.and_then(|v| v.as_f64()) {
            s.pass_mark = v;
        }
        if let Some(v) = db::settings_get_json(conn, KEY_LOOKUP_COLUMN)? {
            if let Some(col) = v.as_str().filter(|c| !c.trim().is_empty()) {
                s.key_column = col.to_string();
            }
        }
        if let Some(v) =
            db::settings_get_json(conn, KEY_UNIFY_GRADE_PUNCTUATION)?.and_then(|v| v.as_bool())
        {
            s.unify_grade_punctuation = v;
        }
        if let Some(v) = db::settings_get_json(conn, KEY_DASHBOARD_BINS)?.and_then(|v| v.as_u64())
        {
            s.dashboard_bins = (v as usize).clamp(1, MAX_BINS);
        }
        Ok(s)
    }

    /// Validates every key in `patch` before anything is written.
    pub fn parse_patch(
        patch: &serde_json::Value,
    ) -> Result<Vec<(&'static str, serde_json::Value)>, SettingsError> {
        let Some(obj) = patch.as_object() else {
            return Err(SettingsError {
                key: "patch".to_string(),
                message: "patch must be an object".to_string(),
            });
        };
        let mut out = Vec::new();
        for (k, v) in obj {
            let bad = |m: &str| SettingsError {
                key: k.clone(),
                message: m.to_string(),
            };
            match k.as_str() {
                "passMark" => {
                    let n = v
                        .as_f64()
                        .filter(|n| n.is_finite() && *n >= 0.0)
                        .ok_or_else(|| bad("passMark must be a non-negative number"))?;
                    out.push((KEY_PASS_MARK, json!(n)));
                }
                "keyColumn" => {
                    let c = v
                        .as_str()
                        .map(|c| c.trim())
                        .filter(|c| !c.is_empty())
                        .ok_or_else(|| bad("keyColumn must be a non-empty string"))?;
                    out.push((KEY_LOOKUP_COLUMN, json!(c)));
                }
                "unifyGradePunctuation" => {
                    let b = v
                        .as_bool()
                        .ok_or_else(|| bad("unifyGradePunctuation must be a boolean"))?;
                    out.push((KEY_UNIFY_GRADE_PUNCTUATION, json!(b)));
                }
                "dashboardBins" => {
                    let n = v
                        .as_u64()
                        .filter(|n| (1..=MAX_BINS as u64).contains(n))
                        .ok_or_else(|| bad("dashboardBins must be an integer in 1..=200"))?;
                    out.push((KEY_DASHBOARD_BINS, json!(n)));
                }
                _ => return Err(bad("unknown setting")),
            }
        }
        Ok(out)
    }

    pub fn apply_patch(
        conn: &Connection,
        entries: &[(&'static str, serde_json::Value)],
    ) -> Result<Self, StoreError> {
        for (key, value) in entries {
            db::settings_set_json(conn, key, value)?;
        }
        Settings::load(conn)
    }
}
