use serde::{Deserialize, Serialize};

/// `catalog.yaml`: the hand-authored chapter table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub chapters: Vec<CatalogChapter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogChapter {
    pub alias: String,
    pub title: String,
    #[serde(default)]
    pub track: bool,
    pub subchapters: Vec<CatalogSubchapter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSubchapter {
    pub alias: String,
    pub title: String,
    /// Markdown file, relative to the catalog file.
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeExchangeRequest {
    pub code: String,
}

/// Body returned by the auth endpoint. Every field is optional on the wire;
/// presence of `errorMessage` marks a failed exchange.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeExchangeResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
