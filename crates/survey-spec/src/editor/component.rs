use tracing::{debug, warn};

use crate::editor::{EditorError, to_json};
use crate::expr::Expression;
use crate::spec::component::{ComponentProperties, ComponentStyle, DType, ItemComponent};
use crate::spec::localized::LocalizedObject;

/// Properties of a freshly created component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComponent {
    pub role: String,
    pub key: Option<String>,
    pub is_group: bool,
}

impl NewComponent {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            key: None,
            is_group: false,
        }
    }

    pub fn group(role: impl Into<String>) -> Self {
        Self {
            is_group: true,
            ..Self::new(role)
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Addresses a child component by position or by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentSelector {
    Index(usize),
    Key(String),
}

impl From<usize> for ComponentSelector {
    fn from(index: usize) -> Self {
        ComponentSelector::Index(index)
    }
}

impl From<&str> for ComponentSelector {
    fn from(key: &str) -> Self {
        ComponentSelector::Key(key.to_string())
    }
}

/// Mutable builder around a single [`ItemComponent`].
#[derive(Debug, Clone)]
pub struct ComponentEditor {
    component: ItemComponent,
}

impl ComponentEditor {
    pub fn new(props: NewComponent) -> Self {
        let mut component = if props.is_group {
            ItemComponent::group(props.role)
        } else {
            ItemComponent::new(props.role)
        };
        component.key = props.key;
        Self { component }
    }

    pub fn from_component(component: ItemComponent) -> Self {
        Self { component }
    }

    pub fn set_key(&mut self, key: Option<String>) -> &mut Self {
        self.component.key = key;
        self
    }

    pub fn set_role(&mut self, role: impl Into<String>) -> &mut Self {
        self.component.role = role.into();
        self
    }

    pub fn set_display_condition(&mut self, condition: Option<Expression>) -> &mut Self {
        self.component.display_condition = condition;
        self
    }

    pub fn set_disabled(&mut self, disabled: Option<Expression>) -> &mut Self {
        self.component.disabled = disabled;
        self
    }

    pub fn set_content(&mut self, content: Vec<LocalizedObject>) -> &mut Self {
        self.component.content = Some(content);
        self
    }

    pub fn set_description(&mut self, description: Vec<LocalizedObject>) -> &mut Self {
        self.component.description = Some(description);
        self
    }

    pub fn set_styles(&mut self, styles: Vec<ComponentStyle>) -> &mut Self {
        self.component.style = Some(styles);
        self
    }

    pub fn set_properties(&mut self, properties: ComponentProperties) -> &mut Self {
        self.component.properties = Some(properties);
        self
    }

    pub fn set_dtype(&mut self, dtype: DType) -> &mut Self {
        self.component.dtype = Some(dtype);
        self
    }

    pub fn set_order(&mut self, order: Option<Expression>) -> Result<&mut Self, EditorError> {
        self.ensure_group()?;
        self.component.order = order;
        Ok(self)
    }

    /// Inserts a child; appends when `at_position` is `None` or past the end.
    pub fn add_item_component(
        &mut self,
        item: ItemComponent,
        at_position: Option<usize>,
    ) -> Result<&mut Self, EditorError> {
        let items = self.items_mut()?;
        match at_position {
            Some(position) if position < items.len() => items.insert(position, item),
            _ => items.push(item),
        }
        Ok(self)
    }

    /// Replaces the child at `selector`.
    pub fn update_item_component(
        &mut self,
        selector: impl Into<ComponentSelector>,
        item: ItemComponent,
    ) -> Result<&mut Self, EditorError> {
        let selector = selector.into();
        let items = self.items_mut()?;
        let index = match &selector {
            ComponentSelector::Index(index) => Some(*index).filter(|index| *index < items.len()),
            ComponentSelector::Key(key) => items
                .iter()
                .position(|child| child.key.as_deref() == Some(key.as_str())),
        };
        match index {
            Some(index) => {
                items[index] = item;
                Ok(self)
            }
            None => {
                warn!(?selector, "component to update not found");
                Err(EditorError::ComponentNotFound(describe_selector(&selector)))
            }
        }
    }

    /// Removes and returns the child at `index`.
    pub fn remove_item(&mut self, index: usize) -> Result<ItemComponent, EditorError> {
        let items = self.items_mut()?;
        if index >= items.len() {
            return Err(EditorError::ComponentNotFound(index.to_string()));
        }
        let removed = items.remove(index);
        debug!(role = %removed.role, index, "component removed");
        Ok(removed)
    }

    /// Snapshot of the component; later edits do not affect it.
    pub fn get_component(&self) -> ItemComponent {
        self.component.clone()
    }

    pub fn into_component(self) -> ItemComponent {
        self.component
    }

    pub fn get_component_json(&self, pretty: bool) -> Result<String, EditorError> {
        to_json(&self.component, pretty)
    }

    fn ensure_group(&self) -> Result<(), EditorError> {
        if self.component.is_group() {
            Ok(())
        } else {
            Err(EditorError::ComponentNotAGroup(self.label()))
        }
    }

    fn items_mut(&mut self) -> Result<&mut Vec<ItemComponent>, EditorError> {
        let label = self.label();
        self.component
            .items
            .as_mut()
            .ok_or(EditorError::ComponentNotAGroup(label))
    }

    fn label(&self) -> String {
        self.component
            .key
            .clone()
            .unwrap_or_else(|| self.component.role.clone())
    }
}

fn describe_selector(selector: &ComponentSelector) -> String {
    match selector {
        ComponentSelector::Index(index) => index.to_string(),
        ComponentSelector::Key(key) => key.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::loc_strings;

    fn option(key: &str) -> ItemComponent {
        ItemComponent::new("option").with_key(key)
    }

    #[test]
    fn fresh_group_starts_empty() {
        let editor = ComponentEditor::new(NewComponent::group("singleChoiceGroup").with_key("scg"));
        let component = editor.get_component();
        assert_eq!(component.key.as_deref(), Some("scg"));
        assert_eq!(component.items, Some(vec![]));
    }

    #[test]
    fn add_inserts_at_position_or_appends() {
        let mut editor = ComponentEditor::new(NewComponent::group("multipleChoiceGroup"));
        editor.add_item_component(option("a"), None).unwrap();
        editor.add_item_component(option("c"), Some(99)).unwrap();
        editor.add_item_component(option("b"), Some(1)).unwrap();
        let keys: Vec<_> = editor
            .get_component()
            .children()
            .iter()
            .filter_map(|child| child.key.clone())
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn update_by_index_and_key() {
        let mut editor = ComponentEditor::new(NewComponent::group("dropDownGroup"));
        editor.add_item_component(option("0"), None).unwrap();
        editor.add_item_component(option("1"), None).unwrap();

        editor
            .update_item_component("1", ItemComponent::new("input").with_key("1"))
            .unwrap();
        editor
            .update_item_component(0usize, ItemComponent::new("text").with_key("0"))
            .unwrap();
        let roles: Vec<_> = editor
            .get_component()
            .children()
            .iter()
            .map(|child| child.role.clone())
            .collect();
        assert_eq!(roles, vec!["text", "input"]);

        assert_eq!(
            editor.update_item_component("missing", option("x")).unwrap_err(),
            EditorError::ComponentNotFound("missing".into())
        );
    }

    #[test]
    fn group_mutators_reject_leaf_components() {
        let mut editor = ComponentEditor::new(NewComponent::new("text").with_key("t"));
        assert_eq!(
            editor.add_item_component(option("0"), None).unwrap_err(),
            EditorError::ComponentNotAGroup("t".into())
        );
        assert!(editor.set_order(Some(Expression::sequential())).is_err());
    }

    #[test]
    fn remove_returns_the_child() {
        let mut editor = ComponentEditor::new(NewComponent::group("g"));
        editor.add_item_component(option("0"), None).unwrap();
        assert_eq!(editor.remove_item(0).unwrap().key.as_deref(), Some("0"));
        assert!(editor.remove_item(0).is_err());
    }

    #[test]
    fn snapshots_are_detached_and_stable() {
        let mut editor = ComponentEditor::new(NewComponent::new("text"));
        editor.set_content(loc_strings([("en", "Hello")]));
        let first = editor.get_component();
        assert_eq!(first, editor.get_component());

        editor.set_role("title");
        assert_eq!(first.role, "text");
    }

    #[test]
    fn json_round_trips_to_the_component() {
        let mut editor = ComponentEditor::new(NewComponent::new("input").with_key("1"));
        editor
            .set_content(loc_strings([("en", "Other")]))
            .set_dtype(DType::Number)
            .set_styles(vec![ComponentStyle::new("className", "w-100")]);
        let json = editor.get_component_json(true).unwrap();
        let parsed: ItemComponent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, editor.get_component());
    }
}
