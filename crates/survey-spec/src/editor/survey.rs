use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::editor::item::{ItemEditor, NewItem};
use crate::editor::{EditorError, next_free_key, to_json};
use crate::path::ItemPath;
use crate::spec::item::{SurveyGroupItem, SurveyItem};
use crate::spec::localized::LocalizedObject;
use crate::spec::survey::{Survey, SurveyProps, SurveyVersion};

/// Child positions leading from the root item to a node.
type Route = Vec<usize>;

/// Owns a survey tree and keeps a key-path index next to it.
///
/// Every item key is `<parent key>.<segment>`. Structural edits keep the
/// index in sync, and renames cascade to descendants and to item-key
/// references inside expressions.
#[derive(Debug, Clone)]
pub struct SurveyEditor {
    survey: Survey,
    index: BTreeMap<ItemPath, Route>,
}

impl SurveyEditor {
    /// Empty survey whose root group is keyed `root_key`.
    pub fn new(root_key: &str) -> Result<Self, EditorError> {
        let root = ItemPath::parse(root_key)?;
        let survey = Survey {
            id: None,
            props: SurveyProps::default(),
            current: SurveyVersion {
                version_id: None,
                survey_definition: SurveyItem::Group(SurveyGroupItem {
                    key: root.to_string(),
                    version: 1,
                    items: Vec::new(),
                    selection_method: None,
                    condition: None,
                    metadata: None,
                }),
            },
            metadata: None,
        };
        let mut index = BTreeMap::new();
        index.insert(root, Vec::new());
        Ok(Self { survey, index })
    }

    /// Wraps an existing survey after checking the key-path invariant.
    pub fn from_survey(survey: Survey) -> Result<Self, EditorError> {
        let root = &survey.current.survey_definition;
        if !root.is_group() {
            return Err(EditorError::NotAGroup(root.key().to_string()));
        }
        check_subtree(root)?;
        let mut editor = Self {
            survey,
            index: BTreeMap::new(),
        };
        editor.index_subtree(&[])?;
        Ok(editor)
    }

    pub fn root_key(&self) -> &str {
        self.survey.root_key()
    }

    pub fn set_survey_id(&mut self, id: impl Into<String>) {
        self.survey.id = Some(id.into());
    }

    pub fn set_version_id(&mut self, version_id: impl Into<String>) {
        self.survey.current.version_id = Some(version_id.into());
    }

    pub fn set_survey_name(&mut self, name: Vec<LocalizedObject>) {
        self.survey.props.name = Some(name);
    }

    pub fn set_survey_description(&mut self, description: Vec<LocalizedObject>) {
        self.survey.props.description = Some(description);
    }

    pub fn set_survey_duration(&mut self, duration: Vec<LocalizedObject>) {
        self.survey.props.typical_duration = Some(duration);
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.survey
            .metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
    }

    /// Creates an item below `parent_key` and returns a snapshot of it.
    ///
    /// Without `at_position` the item is appended, so call order is
    /// presentation order. A missing `item_key` gets the smallest unused
    /// integer segment. The tree is left untouched on error.
    pub fn add_new_survey_item(
        &mut self,
        props: NewItem,
        parent_key: &str,
        at_position: Option<usize>,
    ) -> Result<SurveyItem, EditorError> {
        let (parent_path, parent_route) = self.resolve_parent(parent_key)?;
        let segment = match &props.item_key {
            Some(segment) => segment.clone(),
            None => {
                let siblings = self.child_segments(&parent_route);
                next_free_key(siblings.iter().map(String::as_str))
            }
        };
        let path = parent_path.child(&segment)?;
        if self.index.contains_key(&path) {
            return Err(EditorError::DuplicateKey(path.to_string()));
        }

        let item = ItemEditor::new(NewItem {
            item_key: Some(path.to_string()),
            ..props
        })?
        .into_item();
        let snapshot = item.clone();
        self.insert_child(&parent_route, item, at_position)?;
        debug!(key = %path, "survey item added");
        Ok(snapshot)
    }

    /// Attaches a prebuilt item (and its subtree), re-keyed below `parent_key`.
    pub fn add_existing_survey_item(
        &mut self,
        mut item: SurveyItem,
        parent_key: &str,
        at_position: Option<usize>,
    ) -> Result<SurveyItem, EditorError> {
        let (parent_path, parent_route) = self.resolve_parent(parent_key)?;
        let old_key = item.key().to_string();
        let segment = ItemPath::parse(&old_key)?
            .last()
            .unwrap_or_default()
            .to_string();
        let path = parent_path.child(&segment)?;
        if self.index.contains_key(&path) {
            return Err(EditorError::DuplicateKey(path.to_string()));
        }

        let new_key = path.to_string();
        item.rekey(&old_key, &new_key);
        let mut references = 0;
        item.visit_expressions_mut(&mut |expr| {
            references += expr.rename_item_key_refs(&old_key, &new_key)
        });
        check_subtree(&item)?;
        let snapshot = item.clone();
        self.insert_child(&parent_route, item, at_position)?;
        debug!(key = %path, from = %old_key, references, "existing survey item attached");
        Ok(snapshot)
    }

    /// Replaces the item stored under `item.key()`, subtree included.
    pub fn update_survey_item(&mut self, item: SurveyItem) -> Result<(), EditorError> {
        let path = ItemPath::parse(item.key())?;
        let Some(route) = self.index.get(&path).cloned() else {
            warn!(key = %path, "update of unknown survey item");
            return Err(EditorError::ItemNotFound(path.to_string()));
        };
        if route.is_empty() && !item.is_group() {
            return Err(EditorError::NotAGroup(path.to_string()));
        }
        check_subtree(&item)?;

        let slot = self
            .item_mut(&route)
            .ok_or_else(|| EditorError::ItemNotFound(path.to_string()))?;
        *slot = item;
        self.drop_index_prefix(&path);
        self.index_subtree(&route)?;
        debug!(key = %path, "survey item updated");
        Ok(())
    }

    /// Read-only lookup; mutate through [`update_survey_item`](Self::update_survey_item).
    pub fn find_survey_item(&self, key: &str) -> Result<&SurveyItem, EditorError> {
        let path = ItemPath::parse(key)?;
        self.index
            .get(&path)
            .and_then(|route| item_at(&self.survey.current.survey_definition, route))
            .ok_or_else(|| EditorError::ItemNotFound(key.to_string()))
    }

    /// Keys of all items in depth-first order, root first.
    pub fn item_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        self.survey
            .current
            .survey_definition
            .walk(&mut |item| keys.push(item.key().to_string()));
        keys
    }

    /// Renames an item within its parent.
    ///
    /// Descendant keys and every item-key reference inside the survey's
    /// expressions are rewritten from the old prefix to the new one.
    pub fn change_item_key(&mut self, old_key: &str, new_key: &str) -> Result<(), EditorError> {
        let old = ItemPath::parse(old_key)?;
        let new = ItemPath::parse(new_key)?;
        if old.parent() != new.parent() {
            return Err(EditorError::ParentMismatch {
                old: old_key.to_string(),
                new: new_key.to_string(),
            });
        }
        if old == new {
            return Ok(());
        }
        let route = self
            .index
            .get(&old)
            .cloned()
            .ok_or_else(|| EditorError::ItemNotFound(old_key.to_string()))?;
        if self.index.contains_key(&new) {
            return Err(EditorError::DuplicateKey(new_key.to_string()));
        }

        let (old_text, new_text) = (old.to_string(), new.to_string());
        self.item_mut(&route)
            .ok_or_else(|| EditorError::ItemNotFound(old_key.to_string()))?
            .rekey(&old_text, &new_text);
        let references = self.rewrite_references(&old_text, &new_text);
        self.drop_index_prefix(&old);
        self.index_subtree(&route)?;
        debug!(old = %old, new = %new, references, "survey item renamed");
        Ok(())
    }

    /// Moves an item (and its subtree) below another group.
    pub fn move_item(
        &mut self,
        key: &str,
        new_parent_key: &str,
        at_position: Option<usize>,
    ) -> Result<(), EditorError> {
        let path = ItemPath::parse(key)?;
        let target = ItemPath::parse(new_parent_key)?;
        if target.starts_with(&path) {
            return Err(EditorError::MoveIntoSelf {
                key: key.to_string(),
                target: new_parent_key.to_string(),
            });
        }
        let (target, _) = self.resolve_parent(new_parent_key)?;
        let segment = path.last().unwrap_or_default();
        let new_path = target.child(segment)?;
        if new_path != path && self.index.contains_key(&new_path) {
            return Err(EditorError::DuplicateKey(new_path.to_string()));
        }

        let mut item = self.remove_item(key)?;
        let (old_text, new_text) = (path.to_string(), new_path.to_string());
        item.rekey(&old_text, &new_text);
        let (_, target_route) = self.resolve_parent(new_parent_key)?;
        self.insert_child(&target_route, item, at_position)?;
        let references = self.rewrite_references(&old_text, &new_text);
        debug!(old = %path, new = %new_path, references, "survey item moved");
        Ok(())
    }

    /// Detaches an item and its subtree.
    pub fn remove_item(&mut self, key: &str) -> Result<SurveyItem, EditorError> {
        let path = ItemPath::parse(key)?;
        let route = self
            .index
            .get(&path)
            .cloned()
            .ok_or_else(|| EditorError::ItemNotFound(key.to_string()))?;
        let Some((&position, parent_route)) = route.split_last() else {
            return Err(EditorError::RootImmutable("removed"));
        };
        let parent_route = parent_route.to_vec();
        let siblings = self
            .children_mut(&parent_route)
            .ok_or_else(|| EditorError::ItemNotFound(key.to_string()))?;
        let removed = siblings.remove(position);
        self.drop_index_prefix(&path);
        self.reindex_children(&parent_route, position)?;
        debug!(key = %path, "survey item removed");
        Ok(removed)
    }

    /// Snapshot of the whole survey.
    pub fn get_survey(&self) -> Survey {
        self.survey.clone()
    }

    pub fn into_survey(self) -> Survey {
        self.survey
    }

    pub fn get_survey_json(&self, pretty: bool) -> Result<String, EditorError> {
        to_json(&self.survey, pretty)
    }

    fn resolve_parent(&self, parent_key: &str) -> Result<(ItemPath, Route), EditorError> {
        let parent_path = ItemPath::parse(parent_key)
            .map_err(|_| EditorError::ParentNotFound(parent_key.to_string()))?;
        let Some(route) = self.index.get(&parent_path) else {
            warn!(parent = %parent_key, "parent item not found");
            return Err(EditorError::ParentNotFound(parent_key.to_string()));
        };
        match item_at(&self.survey.current.survey_definition, route) {
            Some(item) if item.is_group() => Ok((parent_path, route.clone())),
            Some(_) => Err(EditorError::NotAGroup(parent_key.to_string())),
            None => Err(EditorError::ParentNotFound(parent_key.to_string())),
        }
    }

    fn child_segments(&self, parent_route: &[usize]) -> Vec<String> {
        item_at(&self.survey.current.survey_definition, parent_route)
            .map(|parent| {
                parent
                    .children()
                    .iter()
                    .filter_map(|child| child.key().rsplit('.').next().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn insert_child(
        &mut self,
        parent_route: &[usize],
        item: SurveyItem,
        at_position: Option<usize>,
    ) -> Result<(), EditorError> {
        let siblings = self
            .children_mut(parent_route)
            .ok_or_else(|| EditorError::ParentNotFound(format!("{:?}", parent_route)))?;
        let position = match at_position {
            Some(position) if position < siblings.len() => position,
            _ => siblings.len(),
        };
        siblings.insert(position, item);
        self.reindex_children(parent_route, position)
    }

    fn rewrite_references(&mut self, old: &str, new: &str) -> usize {
        let mut count = 0;
        self.survey
            .current
            .survey_definition
            .visit_expressions_mut(&mut |expr| count += expr.rename_item_key_refs(old, new));
        count
    }

    fn item_mut(&mut self, route: &[usize]) -> Option<&mut SurveyItem> {
        item_at_mut(&mut self.survey.current.survey_definition, route)
    }

    fn children_mut(&mut self, route: &[usize]) -> Option<&mut Vec<SurveyItem>> {
        match self.item_mut(route)? {
            SurveyItem::Group(group) => Some(&mut group.items),
            SurveyItem::Single(_) => None,
        }
    }

    /// Removes every index entry at or below `prefix`.
    fn drop_index_prefix(&mut self, prefix: &ItemPath) {
        let doomed = self
            .index
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, _)| path.clone())
            .collect::<Vec<_>>();
        for path in doomed {
            self.index.remove(&path);
        }
    }

    /// Re-indexes the subtree rooted at `route`.
    fn index_subtree(&mut self, route: &[usize]) -> Result<(), EditorError> {
        let mut entries = Vec::new();
        if let Some(item) = item_at(&self.survey.current.survey_definition, route) {
            collect_routes(item, &mut route.to_vec(), &mut entries);
        }
        self.store_entries(entries)
    }

    /// Re-indexes children of `parent_route` starting at position `from`.
    fn reindex_children(&mut self, parent_route: &[usize], from: usize) -> Result<(), EditorError> {
        let mut entries = Vec::new();
        if let Some(parent) = item_at(&self.survey.current.survey_definition, parent_route) {
            let mut route = parent_route.to_vec();
            for (position, child) in parent.children().iter().enumerate().skip(from) {
                route.push(position);
                collect_routes(child, &mut route, &mut entries);
                route.pop();
            }
        }
        self.store_entries(entries)
    }

    fn store_entries(&mut self, entries: Vec<(String, Route)>) -> Result<(), EditorError> {
        for (key, route) in entries {
            self.index.insert(ItemPath::parse(&key)?, route);
        }
        Ok(())
    }
}

fn item_at<'a>(item: &'a SurveyItem, route: &[usize]) -> Option<&'a SurveyItem> {
    route
        .iter()
        .try_fold(item, |current, &position| current.children().get(position))
}

fn item_at_mut<'a>(item: &'a mut SurveyItem, route: &[usize]) -> Option<&'a mut SurveyItem> {
    match route.split_first() {
        None => Some(item),
        Some((&position, rest)) => match item {
            SurveyItem::Group(group) => item_at_mut(group.items.get_mut(position)?, rest),
            SurveyItem::Single(_) => None,
        },
    }
}

fn collect_routes(item: &SurveyItem, route: &mut Route, out: &mut Vec<(String, Route)>) {
    out.push((item.key().to_string(), route.clone()));
    for (position, child) in item.children().iter().enumerate() {
        route.push(position);
        collect_routes(child, route, out);
        route.pop();
    }
}

/// Checks that every descendant key is its parent's key plus one unique segment.
fn check_subtree(item: &SurveyItem) -> Result<(), EditorError> {
    let path = ItemPath::parse(item.key())?;
    let mut seen = BTreeSet::new();
    for child in item.children() {
        let child_path = ItemPath::parse(child.key())?;
        if child_path.parent().as_ref() != Some(&path) {
            return Err(EditorError::KeyPrefixMismatch {
                key: child_path.to_string(),
                parent: path.to_string(),
            });
        }
        if !seen.insert(child_path) {
            return Err(EditorError::DuplicateKey(child.key().to_string()));
        }
        check_subtree(child)?;
    }
    Ok(())
}
