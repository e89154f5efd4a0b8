//! Factories for the standard response-type component shapes.
//!
//! Each factory is pure: identical descriptors always yield identical trees.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::editor::component::{ComponentEditor, NewComponent};
use crate::editor::item::RESPONSE_GROUP_KEY;
use crate::expr::{Expression, has_response};
use crate::i18n::loc_strings;
use crate::spec::component::{ComponentProperties, ComponentStyle, DType, ItemComponent};
use crate::spec::item::{Validation, ValidationType};
use crate::spec::localized::LocalizedObject;

/// Language code to text, kept in the order the author wrote them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleText(Vec<(String, String)>);

impl LocaleText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the text for `code`; a known code keeps its position.
    pub fn insert(&mut self, code: impl Into<String>, text: impl Into<String>) {
        let (code, text) = (code.into(), text.into());
        match self.0.iter_mut().find(|(existing, _)| *existing == code) {
            Some((_, slot)) => *slot = text,
            None => self.0.push((code, text)),
        }
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == code)
            .map(|(_, text)| text.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(code, text)| (code.as_str(), text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LocaleText {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut text = LocaleText::new();
        for (code, value) in iter {
            text.insert(code, value);
        }
        text
    }
}

impl Serialize for LocaleText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (code, text) in &self.0 {
            map.serialize_entry(code, text)?;
        }
        map.end()
    }
}

struct LocaleTextVisitor;

impl<'de> Visitor<'de> for LocaleTextVisitor {
    type Value = LocaleText;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of language codes to text")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut text = LocaleText::new();
        while let Some((code, value)) = access.next_entry::<String, String>()? {
            text.insert(code, value);
        }
        Ok(text)
    }
}

impl<'de> Deserialize<'de> for LocaleText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(LocaleTextVisitor)
    }
}

pub const ROLE_SINGLE_CHOICE: &str = "singleChoiceGroup";
pub const ROLE_MULTIPLE_CHOICE: &str = "multipleChoiceGroup";
pub const ROLE_DROPDOWN: &str = "dropDownGroup";
pub const ROLE_SLIDER_CATEGORICAL: &str = "sliderCategorical";
pub const ROLE_LIKERT: &str = "likert";
pub const ROLE_MATRIX: &str = "matrix";

/// Roles that make up the response type held by a response group.
pub const RESPONSE_TYPE_ROLES: &[&str] = &[
    ROLE_SINGLE_CHOICE,
    ROLE_MULTIPLE_CHOICE,
    ROLE_DROPDOWN,
    ROLE_SLIDER_CATEGORICAL,
    ROLE_LIKERT,
    ROLE_MATRIX,
    "input",
    "multilineTextInput",
    "numberInput",
    "dateInput",
];

pub fn locale_text(pairs: &[(&str, &str)]) -> LocaleText {
    pairs.iter().copied().collect()
}

pub fn localize(text: &LocaleText) -> Vec<LocalizedObject> {
    loc_strings(text.iter())
}

fn default_option_role() -> String {
    "option".into()
}

/// Descriptor of one option (or option-like control) of a response type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDef {
    pub key: String,
    #[serde(default = "default_option_role")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<LocaleText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocaleText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_condition: Option<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<Expression>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub style: Vec<ComponentStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_props: Option<ComponentProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<DType>,
}

impl OptionDef {
    pub fn new(key: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            role: role.into(),
            content: None,
            description: None,
            display_condition: None,
            disabled: None,
            style: Vec::new(),
            option_props: None,
            dtype: None,
        }
    }

    pub fn option(key: impl Into<String>, content: &[(&str, &str)]) -> Self {
        Self::new(key, "option").with_content(content)
    }

    /// Option with a free-text field ("other, namely ...").
    pub fn input(key: impl Into<String>, content: &[(&str, &str)]) -> Self {
        Self::new(key, "input").with_content(content)
    }

    pub fn date_input(key: impl Into<String>, content: &[(&str, &str)]) -> Self {
        Self::new(key, "dateInput").with_content(content)
    }

    pub fn with_content(mut self, content: &[(&str, &str)]) -> Self {
        self.content = Some(locale_text(content));
        self
    }

    pub fn with_description(mut self, description: &[(&str, &str)]) -> Self {
        self.description = Some(locale_text(description));
        self
    }

    pub fn with_display_condition(mut self, condition: Expression) -> Self {
        self.display_condition = Some(condition);
        self
    }

    pub fn with_disabled(mut self, disabled: Expression) -> Self {
        self.disabled = Some(disabled);
        self
    }

    pub fn with_props(mut self, props: ComponentProperties) -> Self {
        self.option_props = Some(props);
        self
    }

    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatrixRowRole {
    HeaderRow,
    ResponseRow,
    RadioRow,
}

impl MatrixRowRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatrixRowRole::HeaderRow => "headerRow",
            MatrixRowRole::ResponseRow => "responseRow",
            MatrixRowRole::RadioRow => "radioRow",
        }
    }
}

/// Cell of a matrix row; cells with `items` become groups (e.g. dropdowns).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixCell {
    pub key: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<LocaleText>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<OptionDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRow {
    pub key: String,
    pub role: MatrixRowRole,
    #[serde(default)]
    pub cells: Vec<MatrixCell>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_condition: Option<Expression>,
}

/// Leaf component for one option descriptor.
pub fn option_component(def: &OptionDef) -> ItemComponent {
    let mut editor = ComponentEditor::new(NewComponent::new(def.role.as_str()).with_key(def.key.as_str()));
    if let Some(content) = &def.content {
        editor.set_content(localize(content));
    }
    if let Some(description) = &def.description {
        editor.set_description(localize(description));
    }
    if !def.style.is_empty() {
        editor.set_styles(def.style.clone());
    }
    if let Some(props) = &def.option_props {
        editor.set_properties(props.clone());
    }
    if let Some(dtype) = def.dtype {
        editor.set_dtype(dtype);
    }
    editor
        .set_display_condition(def.display_condition.clone())
        .set_disabled(def.disabled.clone());
    editor.into_component()
}

fn options_group(
    role: &str,
    key: &str,
    options: &[OptionDef],
    order: Option<Expression>,
) -> ItemComponent {
    ItemComponent {
        items: Some(options.iter().map(option_component).collect()),
        order,
        ..ItemComponent::group(role).with_key(key)
    }
}

pub fn init_single_choice_group(
    key: &str,
    options: &[OptionDef],
    order: Option<Expression>,
) -> ItemComponent {
    options_group(ROLE_SINGLE_CHOICE, key, options, order)
}

pub fn init_multiple_choice_group(
    key: &str,
    options: &[OptionDef],
    order: Option<Expression>,
) -> ItemComponent {
    options_group(ROLE_MULTIPLE_CHOICE, key, options, order)
}

pub fn init_dropdown_group(
    key: &str,
    options: &[OptionDef],
    order: Option<Expression>,
) -> ItemComponent {
    options_group(ROLE_DROPDOWN, key, options, order)
}

pub fn init_slider_categorical_group(key: &str, options: &[OptionDef]) -> ItemComponent {
    options_group(ROLE_SLIDER_CATEGORICAL, key, options, None)
}

pub fn init_likert_scale(key: &str, options: &[OptionDef]) -> ItemComponent {
    options_group(ROLE_LIKERT, key, options, None)
}

pub fn init_matrix_question(key: &str, rows: &[MatrixRow]) -> ItemComponent {
    let rows = rows
        .iter()
        .map(|row| ItemComponent {
            items: Some(row.cells.iter().map(matrix_cell).collect()),
            display_condition: row.display_condition.clone(),
            ..ItemComponent::group(row.role.as_str()).with_key(row.key.as_str())
        })
        .collect();
    ItemComponent {
        items: Some(rows),
        ..ItemComponent::group(ROLE_MATRIX).with_key(key)
    }
}

fn matrix_cell(cell: &MatrixCell) -> ItemComponent {
    let mut component = if cell.items.is_empty() {
        ItemComponent::new(cell.role.as_str())
    } else {
        ItemComponent {
            items: Some(cell.items.iter().map(option_component).collect()),
            ..ItemComponent::group(cell.role.as_str())
        }
    };
    component.key = Some(cell.key.clone());
    component.content = cell.content.as_ref().map(localize);
    component
}

/// Static text component.
pub fn text_component(key: Option<&str>, content: &LocaleText) -> ItemComponent {
    ItemComponent {
        key: key.map(String::from),
        content: Some(localize(content)),
        ..ItemComponent::new("text")
    }
}

/// Title component for [`ItemEditor::set_title_component`](crate::editor::ItemEditor::set_title_component).
pub fn title_component(content: &LocaleText) -> ItemComponent {
    ItemComponent {
        content: Some(localize(content)),
        ..ItemComponent::new(crate::editor::item::ROLE_TITLE)
    }
}

/// Help popup made of consecutive text blocks.
pub fn help_group_component(entries: &[LocaleText]) -> ItemComponent {
    ItemComponent {
        items: Some(
            entries
                .iter()
                .map(|entry| text_component(None, entry))
                .collect(),
        ),
        order: Some(Expression::sequential()),
        ..ItemComponent::group(crate::editor::item::ROLE_HELP_GROUP)
    }
}

/// Free-text or number input used as the whole response of a question.
pub fn input_component(key: &str, role: &str, dtype: Option<DType>) -> ItemComponent {
    ItemComponent {
        dtype,
        ..ItemComponent::new(role).with_key(key)
    }
}

pub fn date_input_component(key: &str, props: Option<ComponentProperties>) -> ItemComponent {
    ItemComponent {
        properties: props,
        dtype: Some(DType::Date),
        ..ItemComponent::new("dateInput").with_key(key)
    }
}

/// Hard validation requiring any answer in the response group.
pub fn require_response(item_key: &str) -> Validation {
    Validation {
        key: "r1".into(),
        kind: ValidationType::Hard,
        rule: has_response(item_key, RESPONSE_GROUP_KEY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::response_has_keys_any;

    fn symptom_options() -> Vec<OptionDef> {
        vec![
            OptionDef::option("0", &[("en", "No symptoms")]),
            OptionDef::option("1", &[("en", "Fever")])
                .with_disabled(response_has_keys_any("s.Q1", "rg.mcg", &["0"])),
            OptionDef::input("2", &[("en", "Other")]),
        ]
    }

    #[test]
    fn single_choice_group_has_one_option_per_descriptor() {
        let options = vec![
            OptionDef::option("0", &[("en", "Yes")]),
            OptionDef::option("1", &[("en", "No")]),
            OptionDef::option("2", &[("en", "Don't know")]),
        ];
        let group = init_single_choice_group("scg", &options, None);
        assert_eq!(group.role, ROLE_SINGLE_CHOICE);
        assert_eq!(group.key.as_deref(), Some("scg"));
        assert_eq!(group.children().len(), 3);
        assert!(group.children().iter().all(|child| child.role == "option"));
    }

    #[test]
    fn templates_are_deterministic() {
        let first = init_multiple_choice_group("mcg", &symptom_options(), None);
        let second = init_multiple_choice_group("mcg", &symptom_options(), None);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn option_expressions_and_roles_carry_over() {
        let group = init_multiple_choice_group("mcg", &symptom_options(), None);
        let children = group.children();
        assert!(children[1].disabled.is_some());
        assert_eq!(children[2].role, "input");
        assert_eq!(children[0].disabled, None);
    }

    #[test]
    fn matrix_rows_and_dropdown_cells() {
        let rows = vec![
            MatrixRow {
                key: "header".into(),
                role: MatrixRowRole::HeaderRow,
                cells: vec![MatrixCell {
                    key: "c1".into(),
                    role: "text".into(),
                    content: Some(locale_text(&[("en", "Count")])),
                    items: Vec::new(),
                }],
                display_condition: None,
            },
            MatrixRow {
                key: "r1".into(),
                role: MatrixRowRole::ResponseRow,
                cells: vec![
                    MatrixCell {
                        key: "label".into(),
                        role: "label".into(),
                        content: Some(locale_text(&[("en", "0-4 years")])),
                        items: Vec::new(),
                    },
                    MatrixCell {
                        key: "count".into(),
                        role: ROLE_DROPDOWN.into(),
                        content: None,
                        items: vec![
                            OptionDef::option("0", &[("en", "0")]),
                            OptionDef::option("1", &[("en", "1")]),
                        ],
                    },
                ],
                display_condition: None,
            },
        ];
        let matrix = init_matrix_question("mat", &rows);
        assert_eq!(matrix.role, ROLE_MATRIX);
        let roles: Vec<_> = matrix.children().iter().map(|row| row.role.as_str()).collect();
        assert_eq!(roles, vec!["headerRow", "responseRow"]);
        let dropdown = &matrix.children()[1].children()[1];
        assert!(dropdown.is_group());
        assert_eq!(dropdown.children().len(), 2);
        assert_eq!(
            matrix.find_component("r1.count.1").map(|c| c.role.as_str()),
            Some("option")
        );
    }

    #[test]
    fn option_defs_deserialize_with_default_role() {
        let def: OptionDef = serde_json::from_value(serde_json::json!({
            "key": "3",
            "content": { "en": "Cough" }
        }))
        .unwrap();
        assert_eq!(def.role, "option");
        assert_eq!(option_component(&def).content.unwrap()[0].code, "en");
    }

    #[test]
    fn locale_text_keeps_authored_language_order() {
        let text: LocaleText =
            serde_json::from_str(r#"{"nl": "Koorts", "en": "Fever", "de": "Fieber"}"#).unwrap();
        let codes: Vec<_> = localize(&text).into_iter().map(|obj| obj.code).collect();
        assert_eq!(codes, vec!["nl", "en", "de"]);
        assert_eq!(
            serde_json::to_string(&text).unwrap(),
            r#"{"nl":"Koorts","en":"Fever","de":"Fieber"}"#
        );
    }

    #[test]
    fn locale_text_insert_replaces_in_place() {
        let mut text = locale_text(&[("fr", "Toux"), ("en", "Cough")]);
        text.insert("fr", "Toux sèche");
        assert_eq!(text.len(), 2);
        assert_eq!(text.get("fr"), Some("Toux sèche"));
        assert_eq!(text.iter().next(), Some(("fr", "Toux sèche")));
    }
}
