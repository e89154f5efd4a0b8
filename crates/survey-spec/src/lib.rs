#![allow(missing_docs)]

pub mod catalog;
pub mod editor;
pub mod expr;
pub mod i18n;
pub mod path;
pub mod render;
pub mod spec;
pub mod templates;
pub mod validate;

pub use editor::{
    ComponentEditor, ComponentSelector, EditorError, ItemEditor, NewComponent, NewItem,
    RESPONSE_GROUP_KEY, SurveyEditor,
};
pub use expr::{Expression, ExpressionArg};
pub use i18n::{loc_parts, loc_strings, resolve_text};
pub use path::{ItemPath, PathError};
pub use render::{
    RenderItem, RenderItemKind, RenderPayload, build_render_payload, render_json_ui, render_text,
};
pub use spec::{
    ItemComponent, LocalizedObject, LocalizedPart, Survey, SurveyGroupItem, SurveyItem,
    SurveySingleItem, Validation, ValidationType,
};
pub use templates::{MatrixRow, OptionDef};
pub use validate::{ValidationIssue, ValidationResult, validate};
