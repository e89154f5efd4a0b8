pub mod component;
pub mod item;
pub mod survey;

use thiserror::Error;

use crate::path::PathError;

pub use component::{ComponentEditor, ComponentSelector, NewComponent};
pub use item::{ItemEditor, NewItem, RESPONSE_GROUP_KEY};
pub use survey::SurveyEditor;

/// Failures reported by the survey, item and component editors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("parent item '{0}' not found")]
    ParentNotFound(String),
    #[error("survey item '{0}' not found")]
    ItemNotFound(String),
    #[error("item '{0}' is not a group")]
    NotAGroup(String),
    #[error("item '{0}' is not a question item")]
    NotAQuestionItem(String),
    #[error("survey item '{0}' already exists")]
    DuplicateKey(String),
    #[error("component '{0}' not found")]
    ComponentNotFound(String),
    #[error("validation '{0}' not found")]
    ValidationNotFound(String),
    #[error("component '{0}' is not a group")]
    ComponentNotAGroup(String),
    #[error("key '{key}' is not directly below '{parent}'")]
    KeyPrefixMismatch { key: String, parent: String },
    #[error("cannot rename '{old}' to '{new}': parent differs, use move_item")]
    ParentMismatch { old: String, new: String },
    #[error("cannot move '{key}' below itself ('{target}')")]
    MoveIntoSelf { key: String, target: String },
    #[error("the survey root cannot be {0}")]
    RootImmutable(&'static str),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("json encode error: {0}")]
    Json(String),
}

/// Smallest non-negative integer not yet used as a key among `existing`.
pub(crate) fn next_free_key<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let taken = existing.into_iter().collect::<std::collections::BTreeSet<_>>();
    (0..)
        .map(|candidate: usize| candidate.to_string())
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_default()
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, EditorError> {
    let result = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    result.map_err(|err| EditorError::Json(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_free_key_fills_gaps() {
        assert_eq!(next_free_key(Vec::<&str>::new()), "0");
        assert_eq!(next_free_key(["0", "1", "3"]), "2");
        assert_eq!(next_free_key(["a", "b"]), "0");
    }
}
