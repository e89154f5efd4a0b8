use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::expr::Expression;

/// Tag carried by dynamic text parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DynamicTag {
    Exp,
}

/// One piece of a localized text: a literal string or an expression whose
/// value is interpolated when the survey is displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum LocalizedPart {
    Dynamic { dtype: DynamicTag, exp: Expression },
    Text { str: String },
}

impl LocalizedPart {
    pub fn text(value: impl Into<String>) -> Self {
        LocalizedPart::Text { str: value.into() }
    }

    pub fn expression(exp: Expression) -> Self {
        LocalizedPart::Dynamic {
            dtype: DynamicTag::Exp,
            exp,
        }
    }
}

/// Content for one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LocalizedObject {
    pub code: String,
    pub parts: Vec<LocalizedPart>,
}
