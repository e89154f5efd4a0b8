use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::expr::Expression;
use crate::spec::component::ItemComponent;

/// Severity of a validation rule: hard rules block submission, soft ones warn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ValidationType {
    Soft,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Validation {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: ValidationType,
    pub rule: Expression,
}

/// Item group holding ordered child items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurveyGroupItem {
    pub key: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub items: Vec<SurveyItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_method: Option<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

/// Question, page break or survey end marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurveySingleItem {
    pub key: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<ItemComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validations: Option<Vec<Validation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

fn default_version() -> u32 {
    1
}

/// Node of the survey tree.
///
/// On input, an object with an `items` field is a group; anything else is a
/// single item. Errors inside a group's children surface instead of demoting
/// the group.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum SurveyItem {
    Group(SurveyGroupItem),
    Single(SurveySingleItem),
}

impl<'de> Deserialize<'de> for SurveyItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.get("items").is_some() {
            serde_json::from_value(value)
                .map(SurveyItem::Group)
                .map_err(D::Error::custom)
        } else {
            serde_json::from_value(value)
                .map(SurveyItem::Single)
                .map_err(D::Error::custom)
        }
    }
}

impl SurveyItem {
    pub fn key(&self) -> &str {
        match self {
            SurveyItem::Group(group) => &group.key,
            SurveyItem::Single(single) => &single.key,
        }
    }

    pub fn set_key(&mut self, key: String) {
        match self {
            SurveyItem::Group(group) => group.key = key,
            SurveyItem::Single(single) => single.key = key,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, SurveyItem::Group(_))
    }

    pub fn condition(&self) -> Option<&Expression> {
        match self {
            SurveyItem::Group(group) => group.condition.as_ref(),
            SurveyItem::Single(single) => single.condition.as_ref(),
        }
    }

    pub fn set_condition(&mut self, condition: Option<Expression>) {
        match self {
            SurveyItem::Group(group) => group.condition = condition,
            SurveyItem::Single(single) => single.condition = condition,
        }
    }

    pub fn version(&self) -> u32 {
        match self {
            SurveyItem::Group(group) => group.version,
            SurveyItem::Single(single) => single.version,
        }
    }

    pub fn set_version(&mut self, version: u32) {
        match self {
            SurveyItem::Group(group) => group.version = version,
            SurveyItem::Single(single) => single.version = version,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut BTreeMap<String, String> {
        match self {
            SurveyItem::Group(group) => group.metadata.get_or_insert_with(BTreeMap::new),
            SurveyItem::Single(single) => single.metadata.get_or_insert_with(BTreeMap::new),
        }
    }

    pub fn children(&self) -> &[SurveyItem] {
        match self {
            SurveyItem::Group(group) => &group.items,
            SurveyItem::Single(_) => &[],
        }
    }

    /// Depth-first pre-order walk including `self`.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a SurveyItem)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Rewrites the key of this item and every descendant from `old` to `new` prefix.
    pub fn rekey(&mut self, old: &str, new: &str) {
        if let Some(renamed) = crate::path::rewrite_key_prefix(self.key(), old, new) {
            self.set_key(renamed);
        }
        if let SurveyItem::Group(group) = self {
            for child in &mut group.items {
                child.rekey(old, new);
            }
        }
    }

    /// Expressions attached to this item only, not to its child items.
    pub fn visit_own_expressions(&self, visit: &mut dyn FnMut(&Expression)) {
        match self {
            SurveyItem::Group(group) => {
                for expr in [&group.condition, &group.selection_method]
                    .into_iter()
                    .flatten()
                {
                    visit(expr);
                }
            }
            SurveyItem::Single(single) => {
                if let Some(condition) = &single.condition {
                    visit(condition);
                }
                for validation in single.validations.iter().flatten() {
                    visit(&validation.rule);
                }
                if let Some(components) = &single.components {
                    components.visit_expressions(visit);
                }
            }
        }
    }

    /// Mutable visit over the expressions of this item and all descendants.
    pub fn visit_expressions_mut(&mut self, visit: &mut dyn FnMut(&mut Expression)) {
        match self {
            SurveyItem::Group(group) => {
                for expr in [&mut group.condition, &mut group.selection_method]
                    .into_iter()
                    .flatten()
                {
                    visit(expr);
                }
                for child in &mut group.items {
                    child.visit_expressions_mut(visit);
                }
            }
            SurveyItem::Single(single) => {
                if let Some(condition) = &mut single.condition {
                    visit(condition);
                }
                for validation in single.validations.iter_mut().flatten() {
                    visit(&mut validation.rule);
                }
                if let Some(components) = &mut single.components {
                    components.visit_expressions_mut(visit);
                }
            }
        }
    }
}
