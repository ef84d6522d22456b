//! Manifest document types.
//!
//! These mirror the on-disk JSON shape. Unknown fields inside version entries
//! and assets are carried through `extra` so a document read back from disk
//! serializes to the same value it was parsed from.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Client platform variant a version entry applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum Architecture {
    #[serde(rename = "web.browser")]
    WebBrowser,
    #[serde(rename = "web.browser.legacy")]
    WebBrowserLegacy,
    #[serde(rename = "web.cordova")]
    WebCordova,
}

impl Architecture {
    /// The complete allow-list. Keys outside this set reject a document.
    pub const ALL: [Architecture; 3] = [
        Architecture::WebBrowser,
        Architecture::WebBrowserLegacy,
        Architecture::WebCordova,
    ];

    /// The literal key used under `versions`.
    pub fn key(self) -> &'static str {
        match self {
            Architecture::WebBrowser => "web.browser",
            Architecture::WebBrowserLegacy => "web.browser.legacy",
            Architecture::WebCordova => "web.cordova",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|arch| arch.key() == key)
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A single asset reference inside a version entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Asset {
    pub url: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Build identifiers for one architecture.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub version: String,
    pub version_refreshable: String,
    pub version_non_refreshable: String,
    pub version_replaceable: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<Vec<Asset>>,

    /// Fields outside the static schema (e.g. development-only markers).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `appId`/`versions` subset of a manifest file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ManifestDocument {
    #[serde(rename = "appId")]
    pub app_id: String,

    pub versions: BTreeMap<Architecture, VersionEntry>,
}

impl ManifestDocument {
    /// The entry used for log summaries: `web.browser` when present, otherwise
    /// the first architecture in allow-list order.
    pub fn primary(&self) -> Option<(Architecture, &VersionEntry)> {
        self.versions.iter().next().map(|(arch, entry)| (*arch, entry))
    }

    pub fn to_value(&self) -> Value {
        // Only string keys and plain data; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A manifest that passed schema validation.
///
/// Only [`crate::manifest::validate`] constructs this type, which is what lets
/// the manifest store guarantee it never holds an invalid document.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedManifest(ManifestDocument);

impl ValidatedManifest {
    pub(crate) fn new(document: ManifestDocument) -> Self {
        Self(document)
    }

    pub fn app_id(&self) -> &str {
        &self.0.app_id
    }
}

impl Deref for ValidatedManifest {
    type Target = ManifestDocument;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
