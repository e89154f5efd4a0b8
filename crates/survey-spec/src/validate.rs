use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::editor::item::RESPONSE_GROUP_KEY;
use crate::path::is_valid_segment;
use crate::spec::item::SurveyItem;
use crate::spec::survey::Survey;
use crate::templates::RESPONSE_TYPE_ROLES;

/// Single finding of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_key: Option<String>,
    pub message: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// Structural lint of a survey definition.
///
/// Errors break the key-path invariant or reference items that do not
/// exist. Warnings flag questions whose response group looks incomplete.
pub fn validate(survey: &Survey) -> ValidationResult {
    let root = &survey.current.survey_definition;
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let mut keys = BTreeSet::new();
    check_keys(root, None, &mut keys, &mut errors);

    let mut items = Vec::new();
    root.walk(&mut |item| items.push(item));
    for item in items {
        let mut referenced = Vec::new();
        item.visit_own_expressions(&mut |expr| {
            referenced.extend(expr.referenced_item_keys().into_iter().map(String::from));
        });
        for key in referenced {
            if !keys.contains(key.as_str()) {
                errors.push(issue(
                    item.key(),
                    format!("expression references unknown item '{}'", key),
                    "dangling_item_reference",
                ));
            }
        }
        if let Some(warning) = check_response_group(item) {
            warnings.push(warning);
        }
    }

    ValidationResult {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn check_keys<'a>(
    item: &'a SurveyItem,
    parent: Option<&str>,
    keys: &mut BTreeSet<&'a str>,
    errors: &mut Vec<ValidationIssue>,
) {
    let key = item.key();
    if let Some(segment) = key.split('.').find(|segment| !is_valid_segment(segment)) {
        errors.push(issue(
            key,
            format!("invalid key segment '{}'", segment),
            "invalid_key_segment",
        ));
    }
    if let Some(parent) = parent {
        let direct_child = key
            .strip_prefix(parent)
            .and_then(|rest| rest.strip_prefix('.'))
            .is_some_and(|segment| !segment.is_empty() && !segment.contains('.'));
        if !direct_child {
            errors.push(issue(
                key,
                format!("key is not directly below parent '{}'", parent),
                "key_prefix_mismatch",
            ));
        }
    }
    if !keys.insert(key) {
        errors.push(issue(key, "duplicate item key".into(), "duplicate_key"));
    }
    for child in item.children() {
        check_keys(child, Some(key), keys, errors);
    }
}

fn check_response_group(item: &SurveyItem) -> Option<ValidationIssue> {
    let SurveyItem::Single(single) = item else {
        return None;
    };
    let response_group = single
        .components
        .as_ref()?
        .find_component(RESPONSE_GROUP_KEY)?;
    let response_types = response_group
        .children()
        .iter()
        .filter(|child| RESPONSE_TYPE_ROLES.contains(&child.role.as_str()))
        .count();
    match response_types {
        0 => Some(issue(
            &single.key,
            "response group has no response type".into(),
            "missing_response_group_type",
        )),
        1 => None,
        count => Some(issue(
            &single.key,
            format!("response group holds {} response types", count),
            "multiple_response_types",
        )),
    }
}

fn issue(item_key: &str, message: String, code: &str) -> ValidationIssue {
    ValidationIssue {
        item_key: Some(item_key.to_string()),
        message,
        code: code.into(),
    }
}
