use serde::{Deserialize, Serialize};

/// Body of every non-2xx response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub message: String,
}

/// Body returned in upload-only mode
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveResponse {
    pub request_id: String,
    pub archived: bool,
    pub bucket: String,
    pub key: String,
}
