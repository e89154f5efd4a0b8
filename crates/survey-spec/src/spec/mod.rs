pub mod component;
pub mod item;
pub mod localized;
pub mod response;
pub mod survey;

pub use component::{ComponentProperties, ComponentStyle, DType, ItemComponent, PropertyValue};
pub use item::{SurveyGroupItem, SurveyItem, SurveySingleItem, Validation, ValidationType};
pub use localized::{LocalizedObject, LocalizedPart};
pub use response::{ResponseItem, SurveyItemResponse};
pub use survey::{Survey, SurveyProps, SurveyVersion};
