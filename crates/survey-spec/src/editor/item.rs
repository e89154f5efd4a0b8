use tracing::debug;

use crate::editor::component::NewComponent;
use crate::editor::{EditorError, next_free_key, to_json};
use crate::expr::Expression;
use crate::path::ItemPath;
use crate::spec::component::ItemComponent;
use crate::spec::item::{SurveyGroupItem, SurveyItem, SurveySingleItem, Validation};

/// Key of the component group holding the answer controls of a question.
pub const RESPONSE_GROUP_KEY: &str = "rg";

pub const ROLE_ROOT: &str = "root";
pub const ROLE_TITLE: &str = "title";
pub const ROLE_HELP_GROUP: &str = "helpGroup";
pub const ROLE_RESPONSE_GROUP: &str = "responseGroup";

/// Properties of a freshly created survey item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewItem {
    /// Full key for [`ItemEditor::new`], last segment for
    /// [`SurveyEditor::add_new_survey_item`](crate::editor::SurveyEditor::add_new_survey_item).
    pub item_key: Option<String>,
    pub is_group: bool,
    pub item_type: Option<String>,
}

impl NewItem {
    pub fn question(key: impl Into<String>) -> Self {
        Self {
            item_key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn group(key: impl Into<String>) -> Self {
        Self {
            item_key: Some(key.into()),
            is_group: true,
            item_type: None,
        }
    }

    /// Page break or survey end marker.
    pub fn typed(key: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            item_key: Some(key.into()),
            is_group: false,
            item_type: Some(item_type.into()),
        }
    }
}

/// Mutable builder around a single [`SurveyItem`].
#[derive(Debug, Clone)]
pub struct ItemEditor {
    item: SurveyItem,
}

impl ItemEditor {
    /// Fresh item; `props.item_key` must hold the full key path.
    pub fn new(props: NewItem) -> Result<Self, EditorError> {
        let key = ItemPath::parse(props.item_key.as_deref().unwrap_or_default())?.to_string();
        let item = if props.is_group {
            SurveyItem::Group(SurveyGroupItem {
                key,
                version: 1,
                items: Vec::new(),
                selection_method: None,
                condition: None,
                metadata: None,
            })
        } else {
            SurveyItem::Single(SurveySingleItem {
                key,
                version: 1,
                item_type: props.item_type,
                components: Some(root_component()),
                condition: None,
                validations: None,
                metadata: None,
            })
        };
        Ok(Self { item })
    }

    pub fn from_item(item: SurveyItem) -> Self {
        Self { item }
    }

    pub fn key(&self) -> &str {
        self.item.key()
    }

    /// Installs the title, replacing any previous one.
    pub fn set_title_component(&mut self, mut component: ItemComponent) -> Result<(), EditorError> {
        component.role = ROLE_TITLE.into();
        let root = self.root_mut()?;
        replace_by_role(root, component, 0);
        Ok(())
    }

    /// Installs the help group right after the title, replacing any previous one.
    pub fn set_help_group_component(
        &mut self,
        mut component: ItemComponent,
    ) -> Result<(), EditorError> {
        component.role = ROLE_HELP_GROUP.into();
        let root = self.root_mut()?;
        let position = root
            .children()
            .iter()
            .position(|child| child.role == ROLE_TITLE)
            .map_or(0, |index| index + 1);
        replace_by_role(root, component, position);
        Ok(())
    }

    /// `None` means the item is always shown.
    pub fn set_condition(&mut self, condition: Option<Expression>) {
        self.item.set_condition(condition);
    }

    pub fn add_validation(&mut self, validation: Validation) -> Result<(), EditorError> {
        let single = self.single_mut()?;
        single
            .validations
            .get_or_insert_with(Vec::new)
            .push(validation);
        Ok(())
    }

    pub fn remove_validation(&mut self, key: &str) -> Result<Validation, EditorError> {
        let single = self.single_mut()?;
        let validations = single.validations.get_or_insert_with(Vec::new);
        let index = validations
            .iter()
            .position(|validation| validation.key == key)
            .ok_or_else(|| EditorError::ValidationNotFound(key.to_string()))?;
        Ok(validations.remove(index))
    }

    /// Creates a component below the response group (or below `parent_key`,
    /// a component path such as `rg.mcg`) and returns a snapshot of it.
    pub fn add_new_response_component(
        &mut self,
        props: NewComponent,
        parent_key: Option<&str>,
    ) -> Result<ItemComponent, EditorError> {
        let mut component = if props.is_group {
            ItemComponent::group(props.role)
        } else {
            ItemComponent::new(props.role)
        };
        component.key = props.key;
        self.insert_response_component(component, parent_key, None)
    }

    pub fn add_existing_response_component(
        &mut self,
        component: ItemComponent,
        parent_key: Option<&str>,
        at_position: Option<usize>,
    ) -> Result<ItemComponent, EditorError> {
        self.insert_response_component(component, parent_key, at_position)
    }

    /// Adds static content (text, markdown, warnings) next to the response group.
    pub fn add_display_component(
        &mut self,
        component: ItemComponent,
        at_position: Option<usize>,
    ) -> Result<(), EditorError> {
        let root = self.root_mut()?;
        let items = root.items.get_or_insert_with(Vec::new);
        match at_position {
            Some(position) if position < items.len() => items.insert(position, component),
            _ => items.push(component),
        }
        Ok(())
    }

    /// Removes the component at a key path relative to the root component.
    pub fn remove_component(&mut self, key_path: &str) -> Result<ItemComponent, EditorError> {
        let (parent_path, key) = match key_path.rsplit_once('.') {
            Some((parent, key)) => (Some(parent), key),
            None => (None, key_path),
        };
        let root = self.root_mut()?;
        let parent = match parent_path {
            Some(path) => root
                .find_component_mut(path)
                .ok_or_else(|| EditorError::ComponentNotFound(path.to_string()))?,
            None => root,
        };
        let items = parent
            .items
            .as_mut()
            .ok_or_else(|| EditorError::ComponentNotAGroup(key_path.to_string()))?;
        let index = items
            .iter()
            .position(|child| child.key.as_deref() == Some(key))
            .ok_or_else(|| EditorError::ComponentNotFound(key_path.to_string()))?;
        Ok(items.remove(index))
    }

    pub fn response_group(&self) -> Option<&ItemComponent> {
        match &self.item {
            SurveyItem::Single(single) => single
                .components
                .as_ref()?
                .find_component(RESPONSE_GROUP_KEY),
            SurveyItem::Group(_) => None,
        }
    }

    /// Records how child items are picked for presentation.
    pub fn set_selection_method(&mut self, method: Option<Expression>) -> Result<(), EditorError> {
        match &mut self.item {
            SurveyItem::Group(group) => {
                group.selection_method = method;
                Ok(())
            }
            SurveyItem::Single(single) => Err(EditorError::NotAGroup(single.key.clone())),
        }
    }

    pub fn set_version(&mut self, version: u32) {
        self.item.set_version(version);
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.item.metadata_mut().insert(key.into(), value.into());
    }

    /// Snapshot of the item; later edits do not affect it.
    pub fn get_item(&self) -> SurveyItem {
        self.item.clone()
    }

    pub fn into_item(self) -> SurveyItem {
        self.item
    }

    pub fn get_item_json(&self, pretty: bool) -> Result<String, EditorError> {
        to_json(&self.item, pretty)
    }

    fn insert_response_component(
        &mut self,
        mut component: ItemComponent,
        parent_key: Option<&str>,
        at_position: Option<usize>,
    ) -> Result<ItemComponent, EditorError> {
        let item_key = self.item.key().to_string();
        let root = self.root_mut()?;
        let parent = match parent_key {
            Some(path) => root
                .find_component_mut(path)
                .ok_or_else(|| EditorError::ComponentNotFound(path.to_string()))?,
            None => response_group_mut(root),
        };
        let parent_label = parent.key.clone().unwrap_or_else(|| parent.role.clone());
        let items = parent
            .items
            .as_mut()
            .ok_or(EditorError::ComponentNotAGroup(parent_label))?;

        if component.key.is_none() {
            component.key = Some(next_free_key(
                items.iter().filter_map(|child| child.key.as_deref()),
            ));
        }
        debug!(
            item = %item_key,
            role = %component.role,
            key = component.key.as_deref().unwrap_or_default(),
            "response component added"
        );
        let snapshot = component.clone();
        match at_position {
            Some(position) if position < items.len() => items.insert(position, component),
            _ => items.push(component),
        }
        Ok(snapshot)
    }

    fn single_mut(&mut self) -> Result<&mut SurveySingleItem, EditorError> {
        match &mut self.item {
            SurveyItem::Single(single) => Ok(single),
            SurveyItem::Group(group) => Err(EditorError::NotAQuestionItem(group.key.clone())),
        }
    }

    fn root_mut(&mut self) -> Result<&mut ItemComponent, EditorError> {
        let single = self.single_mut()?;
        Ok(single.components.get_or_insert_with(root_component))
    }
}

fn root_component() -> ItemComponent {
    ItemComponent {
        order: Some(Expression::sequential()),
        ..ItemComponent::group(ROLE_ROOT)
    }
}

fn response_group_mut(root: &mut ItemComponent) -> &mut ItemComponent {
    let items = root.items.get_or_insert_with(Vec::new);
    let index = match items
        .iter()
        .position(|child| child.key.as_deref() == Some(RESPONSE_GROUP_KEY))
    {
        Some(index) => index,
        None => {
            items.push(ItemComponent::group(ROLE_RESPONSE_GROUP).with_key(RESPONSE_GROUP_KEY));
            items.len() - 1
        }
    };
    &mut items[index]
}

fn replace_by_role(root: &mut ItemComponent, component: ItemComponent, default_position: usize) {
    let items = root.items.get_or_insert_with(Vec::new);
    match items.iter().position(|child| child.role == component.role) {
        Some(index) => items[index] = component,
        None => items.insert(default_position.min(items.len()), component),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{has_response, response_has_keys_any};
    use crate::i18n::loc_strings;
    use crate::spec::item::ValidationType;

    fn question(key: &str) -> ItemEditor {
        ItemEditor::new(NewItem::question(key)).expect("valid key")
    }

    fn title(text: &str) -> ItemComponent {
        let mut component = ItemComponent::new("text");
        component.content = Some(loc_strings([("en", text)]));
        component
    }

    fn root_roles(editor: &ItemEditor) -> Vec<String> {
        match editor.get_item() {
            SurveyItem::Single(single) => single
                .components
                .unwrap()
                .children()
                .iter()
                .map(|child| child.role.clone())
                .collect(),
            SurveyItem::Group(_) => Vec::new(),
        }
    }

    #[test]
    fn fresh_items_have_expected_skeleton() {
        let single = question("s.q1").get_item();
        let SurveyItem::Single(single) = single else {
            panic!("expected single item");
        };
        let root = single.components.expect("root component");
        assert_eq!(root.role, ROLE_ROOT);
        assert_eq!(root.order, Some(Expression::sequential()));
        assert!(root.children().is_empty());

        let group = ItemEditor::new(NewItem::group("s.g1")).unwrap().get_item();
        assert!(matches!(group, SurveyItem::Group(ref g) if g.items.is_empty()));
    }

    #[test]
    fn invalid_keys_are_rejected() {
        assert!(ItemEditor::new(NewItem::default()).is_err());
        assert!(ItemEditor::new(NewItem::question("s..q")).is_err());
    }

    #[test]
    fn title_and_help_are_replaced_by_role() {
        let mut editor = question("s.q1");
        editor.set_help_group_component(ItemComponent::group("x")).unwrap();
        editor.set_title_component(title("First")).unwrap();
        editor.set_title_component(title("Second")).unwrap();
        editor.set_help_group_component(ItemComponent::group("y")).unwrap();
        assert_eq!(root_roles(&editor), vec![ROLE_TITLE, ROLE_HELP_GROUP]);
    }

    #[test]
    fn response_group_is_created_on_first_use() {
        let mut editor = question("s.q1");
        editor.set_title_component(title("Q")).unwrap();
        let scg = editor
            .add_new_response_component(NewComponent::group("singleChoiceGroup").with_key("scg"), None)
            .unwrap();
        assert_eq!(scg.key.as_deref(), Some("scg"));

        let option = editor
            .add_new_response_component(NewComponent::new("option"), Some("rg.scg"))
            .unwrap();
        assert_eq!(option.key.as_deref(), Some("0"));
        let second = editor
            .add_new_response_component(NewComponent::new("option"), Some("rg.scg"))
            .unwrap();
        assert_eq!(second.key.as_deref(), Some("1"));

        let rg = editor.response_group().expect("response group");
        assert_eq!(rg.role, ROLE_RESPONSE_GROUP);
        assert_eq!(rg.children().len(), 1);
        assert_eq!(rg.children()[0].children().len(), 2);
        assert_eq!(root_roles(&editor), vec![ROLE_TITLE, ROLE_RESPONSE_GROUP]);
    }

    #[test]
    fn unknown_parent_component_is_an_error() {
        let mut editor = question("s.q1");
        assert_eq!(
            editor
                .add_new_response_component(NewComponent::new("input"), Some("rg.nope"))
                .unwrap_err(),
            EditorError::ComponentNotFound("rg.nope".into())
        );
    }

    #[test]
    fn condition_round_trips_through_get_item() {
        let mut editor = question("s.q2");
        let expr = response_has_keys_any("s.q1", "rg.scg", &["1"]);
        editor.set_condition(Some(expr.clone()));
        assert_eq!(editor.get_item().condition(), Some(&expr));
        editor.set_condition(None);
        assert_eq!(editor.get_item().condition(), None);
    }

    #[test]
    fn validations_are_recorded_in_order() {
        let mut editor = question("s.q1");
        for key in ["v1", "v2"] {
            editor
                .add_validation(Validation {
                    key: key.into(),
                    kind: ValidationType::Hard,
                    rule: has_response("s.q1", "rg"),
                })
                .unwrap();
        }
        assert_eq!(editor.remove_validation("v1").unwrap().key, "v1");
        assert_eq!(
            editor.remove_validation("v1").unwrap_err(),
            EditorError::ValidationNotFound("v1".into())
        );
        let SurveyItem::Single(single) = editor.get_item() else {
            panic!("expected single item");
        };
        let keys: Vec<_> = single
            .validations
            .unwrap()
            .into_iter()
            .map(|validation| validation.key)
            .collect();
        assert_eq!(keys, vec!["v2"]);
    }

    #[test]
    fn group_only_and_question_only_mutators_check_kind() {
        let mut group = ItemEditor::new(NewItem::group("s.g")).unwrap();
        assert_eq!(
            group.set_title_component(title("x")).unwrap_err(),
            EditorError::NotAQuestionItem("s.g".into())
        );
        group
            .set_selection_method(Some(Expression::sequential()))
            .unwrap();

        let mut single = question("s.q");
        assert!(single.set_selection_method(None).is_err());
    }

    #[test]
    fn remove_component_by_path() {
        let mut editor = question("s.q1");
        editor
            .add_new_response_component(NewComponent::group("multipleChoiceGroup").with_key("mcg"), None)
            .unwrap();
        editor
            .add_new_response_component(NewComponent::new("option").with_key("a"), Some("rg.mcg"))
            .unwrap();
        assert_eq!(editor.remove_component("rg.mcg.a").unwrap().role, "option");
        assert!(editor.remove_component("rg.mcg.a").is_err());
    }

    #[test]
    fn get_item_is_idempotent() {
        let mut editor = question("s.q1");
        editor.set_version(3);
        editor.set_metadata("position", "top");
        assert_eq!(editor.get_item(), editor.get_item());
        assert_eq!(editor.get_item().version(), 3);
    }
}
