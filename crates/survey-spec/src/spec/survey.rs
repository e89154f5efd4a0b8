use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::item::SurveyItem;
use crate::spec::localized::LocalizedObject;

/// Survey-level display metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurveyProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Vec<LocalizedObject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Vec<LocalizedObject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typical_duration: Option<Vec<LocalizedObject>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurveyVersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    /// Always a group item; its key is the survey key.
    pub survey_definition: SurveyItem,
}

/// Top-level survey document as consumed by the survey engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub props: SurveyProps,
    pub current: SurveyVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

impl Survey {
    pub fn root_key(&self) -> &str {
        self.current.survey_definition.key()
    }
}
