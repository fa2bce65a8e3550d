//! Export column selection.
//!
//! The column set is a fixed, versioned configuration value sent with every
//! export request; it is never negotiated per call.

use std::collections::BTreeMap;

use serde_json::{json, Value};

/// Known export columns and whether the default set enables them.
pub const DEFAULT_COLUMNS: [(&str, bool); 21] = [
    ("id", true),
    ("cve", true),
    ("cvss", true),
    ("risk", true),
    ("hostname", true),
    ("protocol", true),
    ("port", true),
    ("plugin_name", true),
    ("synopsis", true),
    ("description", true),
    ("solution", true),
    ("see_also", true),
    ("plugin_output", true),
    ("stig_severity", false),
    ("cvss3_base_score", false),
    ("cvss_temporal_score", false),
    ("cvss3_temporal_score", false),
    ("risk_factor", false),
    ("references", false),
    ("plugin_information", false),
    ("exploitable_with", false),
];

/// The column selection for an export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpec {
    columns: BTreeMap<String, bool>,
}

impl Default for ExportSpec {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS
                .iter()
                .map(|(name, enabled)| (name.to_string(), *enabled))
                .collect(),
        }
    }
}

impl ExportSpec {
    /// Enable exactly `enabled`; every other known column is sent as disabled.
    pub fn with_enabled<S: AsRef<str>>(enabled: &[S]) -> Self {
        let mut columns: BTreeMap<String, bool> = DEFAULT_COLUMNS
            .iter()
            .map(|(name, _)| (name.to_string(), false))
            .collect();
        for name in enabled {
            columns.insert(name.as_ref().to_string(), true);
        }
        Self { columns }
    }

    /// Build from the optional `scanner.columns` config value.
    pub fn from_config(columns: Option<&[String]>) -> Self {
        match columns {
            Some(columns) => Self::with_enabled(columns),
            None => Self::default(),
        }
    }

    pub fn enabled(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.as_str())
    }

    /// JSON body for the CSV export endpoint.
    pub fn to_request_body(&self) -> Value {
        json!({
            "format": "csv",
            "template_id": "",
            "reportContents": { "csvColumns": self.columns },
            "extraFilters": { "host_ids": [], "plugin_ids": [] },
        })
    }
}
