//! Block version records as returned by the version-list endpoint.

use serde::{Deserialize, Serialize};

/// One persisted version of a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    /// 1-based version number.
    pub version: u32,
    /// Creation time (Unix milliseconds), when the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
    /// First line of the version's content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl VersionInfo {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            created_at: None,
            preview: None,
        }
    }
}

/// Response of the version-list endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionList {
    #[serde(default)]
    pub versions: Vec<VersionInfo>,
}

impl VersionList {
    /// Version numbers, sorted ascending and de-duplicated.
    pub fn numbers(&self) -> Vec<u32> {
        let mut numbers: Vec<u32> = self.versions.iter().map(|v| v.version).collect();
        numbers.sort_unstable();
        numbers.dedup();
        numbers
    }
}
