//! Ready-made questionnaires built with the editors and templates.
//!
//! Wording is placeholder text; the structure (keys, response types,
//! conditions) is what matters.

pub mod intake;
pub mod weekly;

use crate::editor::{EditorError, ItemEditor, NewItem, SurveyEditor};
use crate::spec::component::ItemComponent;
use crate::spec::survey::Survey;
use crate::templates::{locale_text, title_component};

/// Names accepted by [`by_name`].
pub const SAMPLE_NAMES: &[&str] = &["intake", "weekly"];

/// Builds the sample questionnaire registered under `name`.
pub fn by_name(name: &str) -> Option<Result<Survey, EditorError>> {
    match name {
        "intake" => Some(intake::generate()),
        "weekly" => Some(weekly::generate()),
        _ => None,
    }
}

/// Adds a question with a title and one response type; the returned editor
/// still has to be stored with [`SurveyEditor::update_survey_item`].
pub(crate) fn question(
    survey: &mut SurveyEditor,
    parent_key: &str,
    key: &str,
    title: &[(&str, &str)],
    response: ItemComponent,
) -> Result<ItemEditor, EditorError> {
    let item = survey.add_new_survey_item(NewItem::question(key), parent_key, None)?;
    let mut editor = ItemEditor::from_item(item);
    editor.set_title_component(title_component(&locale_text(title)))?;
    editor.add_existing_response_component(response, None, None)?;
    Ok(editor)
}

pub(crate) fn page_break(survey: &mut SurveyEditor, parent_key: &str) -> Result<(), EditorError> {
    let props = NewItem {
        item_type: Some("pageBreak".into()),
        ..NewItem::default()
    };
    survey.add_new_survey_item(props, parent_key, None)?;
    Ok(())
}

pub(crate) fn survey_end(
    survey: &mut SurveyEditor,
    parent_key: &str,
    text: &[(&str, &str)],
) -> Result<(), EditorError> {
    let item = survey.add_new_survey_item(NewItem::typed("end", "surveyEnd"), parent_key, None)?;
    let mut editor = ItemEditor::from_item(item);
    editor.set_title_component(title_component(&locale_text(text)))?;
    survey.update_survey_item(editor.into_item())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        for name in SAMPLE_NAMES {
            assert!(by_name(name).is_some_and(|survey| survey.is_ok()));
        }
        assert!(by_name("unknown").is_none());
    }
}
