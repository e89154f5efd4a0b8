use serde_json::{Map, Value, json};

use crate::editor::item::{RESPONSE_GROUP_KEY, ROLE_TITLE};
use crate::i18n::resolve_text;
use crate::spec::component::ItemComponent;
use crate::spec::item::SurveyItem;
use crate::spec::localized::LocalizedObject;
use crate::spec::survey::Survey;

/// Language used when the requested one has no translation.
pub const FALLBACK_LANG: &str = "en";

/// Kind labels used by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderItemKind {
    Group,
    Question,
    PageBreak,
    SurveyEnd,
}

impl RenderItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderItemKind::Group => "group",
            RenderItemKind::Question => "question",
            RenderItemKind::PageBreak => "pageBreak",
            RenderItemKind::SurveyEnd => "surveyEnd",
        }
    }

    fn of(item: &SurveyItem) -> Self {
        match item {
            SurveyItem::Group(_) => RenderItemKind::Group,
            SurveyItem::Single(single) => match single.item_type.as_deref() {
                Some("pageBreak") => RenderItemKind::PageBreak,
                Some("surveyEnd") => RenderItemKind::SurveyEnd,
                _ => RenderItemKind::Question,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOption {
    pub key: String,
    pub role: String,
    pub label: Option<String>,
}

/// Response type inside a question's response group.
#[derive(Debug, Clone)]
pub struct RenderResponse {
    pub key: Option<String>,
    pub role: String,
    pub options: Vec<RenderOption>,
}

#[derive(Debug, Clone)]
pub struct RenderItem {
    pub key: String,
    pub depth: usize,
    pub kind: RenderItemKind,
    pub title: Option<String>,
    pub responses: Vec<RenderResponse>,
    pub conditional: bool,
    pub validations: usize,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub survey_key: String,
    pub survey_name: Option<String>,
    pub description: Option<String>,
    pub lang: String,
    pub items: Vec<RenderItem>,
}

/// Flattens the survey tree into a preview payload for `lang`.
pub fn build_render_payload(survey: &Survey, lang: &str) -> RenderPayload {
    let mut items = Vec::new();
    collect_items(&survey.current.survey_definition, 0, lang, &mut items);

    RenderPayload {
        survey_key: survey.root_key().to_string(),
        survey_name: localized(survey.props.name.as_deref(), lang),
        description: localized(survey.props.description.as_deref(), lang),
        lang: lang.to_string(),
        items,
    }
}

fn collect_items(item: &SurveyItem, depth: usize, lang: &str, out: &mut Vec<RenderItem>) {
    let (title, responses, validations) = match item {
        SurveyItem::Single(single) => {
            let root = single.components.as_ref();
            let title = root
                .and_then(|root| root.children().iter().find(|child| child.role == ROLE_TITLE))
                .and_then(|title| localized(title.content.as_deref(), lang));
            let responses = root
                .and_then(|root| root.find_component(RESPONSE_GROUP_KEY))
                .map(|group| {
                    group
                        .children()
                        .iter()
                        .map(|component| render_response(component, lang))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            (title, responses, single.validations.as_ref().map_or(0, Vec::len))
        }
        SurveyItem::Group(_) => (None, Vec::new(), 0),
    };

    out.push(RenderItem {
        key: item.key().to_string(),
        depth,
        kind: RenderItemKind::of(item),
        title,
        responses,
        conditional: item.condition().is_some(),
        validations,
    });
    for child in item.children() {
        collect_items(child, depth + 1, lang, out);
    }
}

fn render_response(component: &ItemComponent, lang: &str) -> RenderResponse {
    RenderResponse {
        key: component.key.clone(),
        role: component.role.clone(),
        options: component
            .children()
            .iter()
            .map(|option| RenderOption {
                key: option.key.clone().unwrap_or_default(),
                role: option.role.clone(),
                label: localized(option.content.as_deref(), lang),
            })
            .collect(),
    }
}

fn localized(objects: Option<&[LocalizedObject]>, lang: &str) -> Option<String> {
    objects.and_then(|objects| resolve_text(objects, lang, FALLBACK_LANG))
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let items = payload
        .items
        .iter()
        .map(|item| {
            let mut map = Map::new();
            map.insert("key".into(), Value::String(item.key.clone()));
            map.insert("kind".into(), Value::String(item.kind.as_str().into()));
            map.insert("depth".into(), json!(item.depth));
            map.insert(
                "title".into(),
                item.title.clone().map(Value::String).unwrap_or(Value::Null),
            );
            if !item.responses.is_empty() {
                let responses = item
                    .responses
                    .iter()
                    .map(|response| {
                        let options = response
                            .options
                            .iter()
                            .map(|option| {
                                json!({
                                    "key": option.key,
                                    "role": option.role,
                                    "label": option.label,
                                })
                            })
                            .collect::<Vec<_>>();
                        json!({
                            "key": response.key,
                            "role": response.role,
                            "options": options,
                        })
                    })
                    .collect();
                map.insert("responses".into(), Value::Array(responses));
            }
            map.insert("conditional".into(), Value::Bool(item.conditional));
            map.insert("validations".into(), json!(item.validations));
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "survey_key": payload.survey_key,
        "survey_name": payload.survey_name,
        "description": payload.description,
        "lang": payload.lang,
        "items": items,
    })
}

/// Render the payload as an indented outline.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Survey: {} ({})",
        payload.survey_name.as_deref().unwrap_or("<untitled>"),
        payload.survey_key
    ));
    if let Some(description) = &payload.description {
        lines.push(format!("Description: {}", description));
    }
    lines.push(format!("Items: {}", payload.items.len()));

    for item in &payload.items {
        let indent = "  ".repeat(item.depth);
        let mut entry = format!("{}- {} [{}]", indent, item.key, item.kind.as_str());
        if let Some(title) = &item.title {
            entry.push_str(&format!(" {}", title));
        }
        if item.conditional {
            entry.push_str(" (conditional)");
        }
        if item.validations > 0 {
            entry.push_str(&format!(" [{} validation(s)]", item.validations));
        }
        lines.push(entry);

        for response in &item.responses {
            let options = response
                .options
                .iter()
                .map(|option| match &option.label {
                    Some(label) => format!("{}={}", option.key, label),
                    None => option.key.clone(),
                })
                .collect::<Vec<_>>();
            if options.is_empty() {
                lines.push(format!("{}    {}", indent, response.role));
            } else {
                lines.push(format!(
                    "{}    {}: {}",
                    indent,
                    response.role,
                    options.join(", ")
                ));
            }
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{ItemEditor, NewItem, SurveyEditor};
    use crate::expr::has_response;
    use crate::i18n::loc_strings;
    use crate::templates::{OptionDef, init_single_choice_group, locale_text, title_component};

    fn sample() -> Survey {
        let mut editor = SurveyEditor::new("s").unwrap();
        editor.set_survey_name(loc_strings([("en", "Demo"), ("nl", "Demo NL")]));
        let item = editor
            .add_new_survey_item(NewItem::question("q1"), "s", None)
            .unwrap();
        let mut item = ItemEditor::from_item(item);
        item.set_title_component(title_component(&locale_text(&[
            ("en", "Do you smoke?"),
            ("nl", "Rookt u?"),
        ])))
        .unwrap();
        item.add_existing_response_component(
            init_single_choice_group(
                "scg",
                &[
                    OptionDef::option("0", &[("en", "Yes")]),
                    OptionDef::option("1", &[("en", "No")]),
                ],
                None,
            ),
            None,
            None,
        )
        .unwrap();
        editor.update_survey_item(item.into_item()).unwrap();
        let end = editor
            .add_new_survey_item(NewItem::typed("end", "surveyEnd"), "s", None)
            .unwrap();
        let mut end = ItemEditor::from_item(end);
        end.set_condition(Some(has_response("s.q1", "rg")));
        editor.update_survey_item(end.into_item()).unwrap();
        editor.into_survey()
    }

    #[test]
    fn payload_flattens_items_with_depth() {
        let payload = build_render_payload(&sample(), "nl");
        assert_eq!(payload.survey_name.as_deref(), Some("Demo NL"));
        let keys: Vec<_> = payload.items.iter().map(|item| item.key.as_str()).collect();
        assert_eq!(keys, vec!["s", "s.q1", "s.end"]);
        assert_eq!(payload.items[1].depth, 1);
        assert_eq!(payload.items[1].title.as_deref(), Some("Rookt u?"));
        assert_eq!(payload.items[2].kind, RenderItemKind::SurveyEnd);
        assert!(payload.items[2].conditional);
    }

    #[test]
    fn text_lists_options_with_fallback_labels() {
        let text = render_text(&build_render_payload(&sample(), "nl"));
        assert!(text.contains("Survey: Demo NL (s)"));
        assert!(text.contains("  - s.q1 [question] Rookt u?"));
        assert!(text.contains("singleChoiceGroup: 0=Yes, 1=No"));
        assert!(text.contains("s.end [surveyEnd] (conditional)"));
    }

    #[test]
    fn json_ui_exposes_responses() {
        let value = render_json_ui(&build_render_payload(&sample(), "en"));
        assert_eq!(value["survey_key"], "s");
        assert_eq!(value["items"][1]["responses"][0]["role"], "singleChoiceGroup");
        assert_eq!(value["items"][1]["responses"][0]["options"][1]["label"], "No");
        assert!(value["items"][0].get("responses").is_none());
    }
}
