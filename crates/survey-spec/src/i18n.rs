use crate::spec::localized::{LocalizedObject, LocalizedPart};

/// Builds one literal [`LocalizedObject`] per `(language code, text)` pair,
/// keeping the input order.
pub fn loc_strings<I, K, V>(pairs: I) -> Vec<LocalizedObject>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(code, text)| LocalizedObject {
            code: code.into(),
            parts: vec![LocalizedPart::text(text)],
        })
        .collect()
}

/// Localized object made of literal and dynamic parts.
pub fn loc_parts(code: impl Into<String>, parts: Vec<LocalizedPart>) -> LocalizedObject {
    LocalizedObject {
        code: code.into(),
        parts,
    }
}

/// Picks the text for `lang`, then `fallback`, then the first entry.
///
/// Dynamic parts cannot be evaluated here and render as `{name}`.
pub fn resolve_text(objects: &[LocalizedObject], lang: &str, fallback: &str) -> Option<String> {
    let object = objects
        .iter()
        .find(|object| object.code == lang)
        .or_else(|| objects.iter().find(|object| object.code == fallback))
        .or_else(|| objects.first())?;

    Some(
        object
            .parts
            .iter()
            .map(|part| match part {
                LocalizedPart::Text { str } => str.clone(),
                LocalizedPart::Dynamic { exp, .. } => format!("{{{}}}", exp.name),
            })
            .collect(),
    )
}
