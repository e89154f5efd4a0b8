use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Answer to one response component; nested for groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseItem {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ResponseItem>>,
}

impl ResponseItem {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            dtype: None,
            items: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_items(mut self, items: Vec<ResponseItem>) -> Self {
        self.items = Some(items);
        self
    }

    /// Follows a response path such as `rg.scg.1`; the first segment must match `self`.
    pub fn find(&self, path: &str) -> Option<&ResponseItem> {
        let mut segments = path.split('.');
        if segments.next() != Some(self.key.as_str()) {
            return None;
        }
        segments.try_fold(self, |current, segment| {
            current
                .items
                .as_deref()?
                .iter()
                .find(|item| item.key == segment)
        })
    }
}

/// Response of one survey item as reported by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SurveyItemResponse {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseItem>,
}
