use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::expr::{Expression, ExpressionArg};
use crate::spec::localized::{LocalizedObject, LocalizedPart};

/// Data type hint for response components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    String,
    Number,
    Date,
}

/// Styling hint passed through to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ComponentStyle {
    pub key: String,
    pub value: String,
}

impl ComponentStyle {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Numeric bound given either literally or as an expression argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Arg(ExpressionArg),
}

/// Response-type specific configuration (date bounds, slider steps, input patterns).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<PropertyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<PropertyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_size: Option<PropertyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_input_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Node of the component tree inside a survey item.
///
/// A component is a group when `items` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemComponent {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<LocalizedObject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Vec<LocalizedObject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_condition: Option<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Vec<ComponentStyle>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ComponentProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<DType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ItemComponent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Expression>,
}

impl ItemComponent {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            key: None,
            content: None,
            description: None,
            display_condition: None,
            disabled: None,
            style: None,
            properties: None,
            dtype: None,
            items: None,
            order: None,
        }
    }

    pub fn group(role: impl Into<String>) -> Self {
        Self {
            items: Some(Vec::new()),
            ..Self::new(role)
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn is_group(&self) -> bool {
        self.items.is_some()
    }

    pub fn children(&self) -> &[ItemComponent] {
        self.items.as_deref().unwrap_or_default()
    }

    /// Resolves a dot-separated component key path (e.g. `rg.scg`) below this component.
    pub fn find_component(&self, key_path: &str) -> Option<&ItemComponent> {
        key_path.split('.').try_fold(self, |current, segment| {
            current
                .children()
                .iter()
                .find(|child| child.key.as_deref() == Some(segment))
        })
    }

    pub fn find_component_mut(&mut self, key_path: &str) -> Option<&mut ItemComponent> {
        match key_path.split_once('.') {
            Some((head, rest)) => self.child_mut(head)?.find_component_mut(rest),
            None => self.child_mut(key_path),
        }
    }

    fn child_mut(&mut self, key: &str) -> Option<&mut ItemComponent> {
        self.items
            .as_mut()?
            .iter_mut()
            .find(|child| child.key.as_deref() == Some(key))
    }

    /// Visits every expression held by this component and its descendants.
    pub fn visit_expressions(&self, visit: &mut dyn FnMut(&Expression)) {
        for expr in [&self.display_condition, &self.disabled, &self.order]
            .into_iter()
            .flatten()
        {
            visit(expr);
        }
        for objects in [&self.content, &self.description].into_iter().flatten() {
            for part in objects.iter().flat_map(|object| &object.parts) {
                if let LocalizedPart::Dynamic { exp, .. } = part {
                    visit(exp);
                }
            }
        }
        for child in self.children() {
            child.visit_expressions(visit);
        }
    }

    pub fn visit_expressions_mut(&mut self, visit: &mut dyn FnMut(&mut Expression)) {
        for expr in [
            &mut self.display_condition,
            &mut self.disabled,
            &mut self.order,
        ]
        .into_iter()
        .flatten()
        {
            visit(expr);
        }
        for objects in [&mut self.content, &mut self.description]
            .into_iter()
            .flatten()
        {
            for part in objects.iter_mut().flat_map(|object| &mut object.parts) {
                if let LocalizedPart::Dynamic { exp, .. } = part {
                    visit(exp);
                }
            }
        }
        if let Some(items) = &mut self.items {
            for child in items {
                child.visit_expressions_mut(visit);
            }
        }
    }
}
