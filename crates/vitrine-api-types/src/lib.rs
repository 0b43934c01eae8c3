//! Wire types shared by the Vitrine HTTP surface and its callers.

use serde::{Deserialize, Serialize};

/// Scope of an on-demand revalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevalidateKind {
    /// Only the exact path.
    #[default]
    Page,
    /// The path and everything nested beneath it.
    Layout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevalidateRequest {
    pub path: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RevalidateKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
