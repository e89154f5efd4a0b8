use schemars::JsonSchema;
use serde::{Deserialize, Serialize, Serializer};

use crate::path::rewrite_key_prefix;

/// Operators whose first argument is the key of a survey item.
const ITEM_REFERENCE_OPS: &[&str] = &[
    "responseHasKeysAny",
    "responseHasKeysAll",
    "responseHasOnlyKeysOtherThan",
    "hasResponse",
    "checkResponseValueWithRegex",
    "getResponseItem",
    "dateResponseDiffFromNow",
    "getSurveyItemValidation",
];

/// Marker used by `getSurveyItemValidation` to address the current item.
const SELF_REFERENCE: &str = "this";

/// Named call node of the condition language.
///
/// The tree is only constructed here; evaluation happens in the survey
/// engine at survey-taking time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Expression {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<ExpressionArg>,
}

/// Typed argument of an [`Expression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "dtype", rename_all = "lowercase")]
pub enum ExpressionArg {
    Str {
        #[serde(rename = "str")]
        value: String,
    },
    Num {
        #[serde(rename = "num", serialize_with = "serialize_num")]
        value: f64,
    },
    Exp {
        #[serde(rename = "exp")]
        value: Box<Expression>,
    },
}

/// Largest magnitude below which every whole `f64` is an exact `i64`.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Whole numbers go out as JSON integers (`14`, not `14.0`).
fn serialize_num<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

impl ExpressionArg {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ExpressionArg::Str { value } => Some(value),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            ExpressionArg::Num { value } => Some(*value),
            _ => None,
        }
    }

    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            ExpressionArg::Exp { value } => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for ExpressionArg {
    fn from(value: &str) -> Self {
        ExpressionArg::Str {
            value: value.to_string(),
        }
    }
}

impl From<String> for ExpressionArg {
    fn from(value: String) -> Self {
        ExpressionArg::Str { value }
    }
}

impl From<&String> for ExpressionArg {
    fn from(value: &String) -> Self {
        ExpressionArg::Str {
            value: value.clone(),
        }
    }
}

impl From<f64> for ExpressionArg {
    fn from(value: f64) -> Self {
        ExpressionArg::Num { value }
    }
}

impl From<i32> for ExpressionArg {
    fn from(value: i32) -> Self {
        ExpressionArg::Num {
            value: f64::from(value),
        }
    }
}

impl From<i64> for ExpressionArg {
    fn from(value: i64) -> Self {
        ExpressionArg::Num {
            value: value as f64,
        }
    }
}

impl From<u32> for ExpressionArg {
    fn from(value: u32) -> Self {
        ExpressionArg::Num {
            value: f64::from(value),
        }
    }
}

impl From<Expression> for ExpressionArg {
    fn from(value: Expression) -> Self {
        ExpressionArg::Exp {
            value: Box::new(value),
        }
    }
}

/// Builds an [`Expression`] from a name and a heterogeneous argument list.
///
/// Strings become `str` arguments, numbers `num` arguments and nested
/// expressions `exp` arguments. Arity is never checked.
///
/// ```
/// use survey_spec::exp_with_args;
/// let expr = exp_with_args!("and", exp_with_args!("eq", "a", "b"), "c");
/// assert_eq!(expr.data.len(), 2);
/// ```
#[macro_export]
macro_rules! exp_with_args {
    ($name:expr $(, $arg:expr)* $(,)?) => {
        $crate::expr::Expression::call(
            $name,
            vec![$($crate::expr::ExpressionArg::from($arg)),*],
        )
    };
}

impl Expression {
    /// Expression without arguments, e.g. `sequential`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            return_type: None,
            data: Vec::new(),
        }
    }

    /// Generic constructor; accepts any operator name the engine knows.
    pub fn call(name: impl Into<String>, args: impl IntoIterator<Item = ExpressionArg>) -> Self {
        Self {
            name: name.into(),
            return_type: None,
            data: args.into_iter().collect(),
        }
    }

    /// The default ordering expression for component groups and item groups.
    pub fn sequential() -> Self {
        Self::new("sequential")
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    pub fn args(&self) -> &[ExpressionArg] {
        &self.data
    }

    /// Item keys referenced by response predicates and accessors, depth first.
    pub fn referenced_item_keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        self.collect_item_keys(&mut keys);
        keys
    }

    fn collect_item_keys<'a>(&'a self, keys: &mut Vec<&'a str>) {
        if let Some(key) = self.item_reference() {
            keys.push(key);
        }
        for arg in &self.data {
            if let ExpressionArg::Exp { value } = arg {
                value.collect_item_keys(keys);
            }
        }
    }

    fn item_reference(&self) -> Option<&str> {
        if !ITEM_REFERENCE_OPS.contains(&self.name.as_str()) {
            return None;
        }
        self.data
            .first()
            .and_then(ExpressionArg::as_str)
            .filter(|key| *key != SELF_REFERENCE)
    }

    /// Rewrites item-key references equal to `old` or nested below it.
    ///
    /// Returns the number of rewritten references.
    pub fn rename_item_key_refs(&mut self, old: &str, new: &str) -> usize {
        let mut count = 0;
        if self.item_reference().is_some()
            && let Some(ExpressionArg::Str { value }) = self.data.first_mut()
            && let Some(renamed) = rewrite_key_prefix(value, old, new)
        {
            *value = renamed;
            count += 1;
        }
        for arg in &mut self.data {
            if let ExpressionArg::Exp { value } = arg {
                count += value.rename_item_key_refs(old, new);
            }
        }
        count
    }
}

/// Boolean combinators.
#[derive(Debug, Clone, PartialEq)]
pub enum Logic {
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Not(Box<Expression>),
}

impl From<Logic> for Expression {
    fn from(op: Logic) -> Self {
        match op {
            Logic::And(items) => Expression::call("and", items.into_iter().map(Into::into)),
            Logic::Or(items) => Expression::call("or", items.into_iter().map(Into::into)),
            Logic::Not(item) => Expression::call("not", [ExpressionArg::from(*item)]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
        }
    }
}

/// Binary comparison between two arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub op: CompareOp,
    pub lhs: ExpressionArg,
    pub rhs: ExpressionArg,
}

impl From<Comparison> for Expression {
    fn from(cmp: Comparison) -> Self {
        Expression::call(cmp.op.as_str(), [cmp.lhs, cmp.rhs])
    }
}

/// Predicates over a previous answer, addressed by item key and response path.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePredicate {
    HasKeysAny {
        item_key: String,
        response_path: String,
        keys: Vec<String>,
    },
    HasKeysAll {
        item_key: String,
        response_path: String,
        keys: Vec<String>,
    },
    HasOnlyKeysOtherThan {
        item_key: String,
        response_path: String,
        keys: Vec<String>,
    },
    HasResponse {
        item_key: String,
        response_path: String,
    },
    ValueMatchesRegex {
        item_key: String,
        response_path: String,
        pattern: String,
    },
}

impl From<ResponsePredicate> for Expression {
    fn from(predicate: ResponsePredicate) -> Self {
        fn with_keys(name: &str, item_key: String, path: String, keys: Vec<String>) -> Expression {
            let head = [ExpressionArg::from(item_key), ExpressionArg::from(path)];
            Expression::call(name, head.into_iter().chain(keys.into_iter().map(Into::into)))
        }

        match predicate {
            ResponsePredicate::HasKeysAny {
                item_key,
                response_path,
                keys,
            } => with_keys("responseHasKeysAny", item_key, response_path, keys),
            ResponsePredicate::HasKeysAll {
                item_key,
                response_path,
                keys,
            } => with_keys("responseHasKeysAll", item_key, response_path, keys),
            ResponsePredicate::HasOnlyKeysOtherThan {
                item_key,
                response_path,
                keys,
            } => with_keys("responseHasOnlyKeysOtherThan", item_key, response_path, keys),
            ResponsePredicate::HasResponse {
                item_key,
                response_path,
            } => exp_with_args!("hasResponse", item_key, response_path),
            ResponsePredicate::ValueMatchesRegex {
                item_key,
                response_path,
                pattern,
            } => exp_with_args!(
                "checkResponseValueWithRegex",
                item_key,
                response_path,
                pattern
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    Years,
    Months,
    Weeks,
    Days,
}

impl DateUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateUnit::Years => "years",
            DateUnit::Months => "months",
            DateUnit::Weeks => "weeks",
            DateUnit::Days => "days",
        }
    }
}

/// Date and time helpers.
#[derive(Debug, Clone, PartialEq)]
pub enum DateOp {
    /// Unix timestamp shifted by `delta_seconds`, relative to now or `reference`.
    TimestampWithOffset {
        delta_seconds: i64,
        reference: Option<Box<Expression>>,
    },
    DateResponseDiffFromNow {
        item_key: String,
        response_path: String,
        unit: DateUnit,
        absolute: bool,
    },
}

impl From<DateOp> for Expression {
    fn from(op: DateOp) -> Self {
        match op {
            DateOp::TimestampWithOffset {
                delta_seconds,
                reference,
            } => {
                let mut args = vec![ExpressionArg::from(delta_seconds)];
                if let Some(reference) = reference {
                    args.push(ExpressionArg::from(*reference));
                }
                Expression::call("timestampWithOffset", args)
            }
            DateOp::DateResponseDiffFromNow {
                item_key,
                response_path,
                unit,
                absolute,
            } => exp_with_args!(
                "dateResponseDiffFromNow",
                item_key,
                response_path,
                unit.as_str(),
                if absolute { 1 } else { 0 }
            ),
        }
    }
}

/// Accessors returning values rather than booleans.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueAccessor {
    GetResponseItem {
        item_key: String,
        response_path: String,
    },
    GetAttribute {
        of: Box<Expression>,
        attribute: String,
    },
    IsDefined(Box<Expression>),
    /// `item_key` may be `this` to address the item holding the expression.
    GetSurveyItemValidation {
        item_key: String,
        validation_key: String,
    },
    GetContext,
}

impl From<ValueAccessor> for Expression {
    fn from(accessor: ValueAccessor) -> Self {
        match accessor {
            ValueAccessor::GetResponseItem {
                item_key,
                response_path,
            } => exp_with_args!("getResponseItem", item_key, response_path),
            ValueAccessor::GetAttribute { of, attribute } => {
                exp_with_args!("getAttribute", *of, attribute)
            }
            ValueAccessor::IsDefined(of) => exp_with_args!("isDefined", *of),
            ValueAccessor::GetSurveyItemValidation {
                item_key,
                validation_key,
            } => exp_with_args!("getSurveyItemValidation", item_key, validation_key),
            ValueAccessor::GetContext => Expression::new("getContext"),
        }
    }
}

fn owned_keys<S: AsRef<str>>(keys: &[S]) -> Vec<String> {
    keys.iter().map(|key| key.as_ref().to_string()).collect()
}

pub fn and(items: impl IntoIterator<Item = Expression>) -> Expression {
    Logic::And(items.into_iter().collect()).into()
}

pub fn or(items: impl IntoIterator<Item = Expression>) -> Expression {
    Logic::Or(items.into_iter().collect()).into()
}

pub fn not(item: Expression) -> Expression {
    Logic::Not(Box::new(item)).into()
}

pub fn compare(
    op: CompareOp,
    lhs: impl Into<ExpressionArg>,
    rhs: impl Into<ExpressionArg>,
) -> Expression {
    Comparison {
        op,
        lhs: lhs.into(),
        rhs: rhs.into(),
    }
    .into()
}

pub fn response_has_keys_any<S: AsRef<str>>(
    item_key: &str,
    response_path: &str,
    keys: &[S],
) -> Expression {
    ResponsePredicate::HasKeysAny {
        item_key: item_key.into(),
        response_path: response_path.into(),
        keys: owned_keys(keys),
    }
    .into()
}

pub fn response_has_keys_all<S: AsRef<str>>(
    item_key: &str,
    response_path: &str,
    keys: &[S],
) -> Expression {
    ResponsePredicate::HasKeysAll {
        item_key: item_key.into(),
        response_path: response_path.into(),
        keys: owned_keys(keys),
    }
    .into()
}

pub fn response_has_only_keys_other_than<S: AsRef<str>>(
    item_key: &str,
    response_path: &str,
    keys: &[S],
) -> Expression {
    ResponsePredicate::HasOnlyKeysOtherThan {
        item_key: item_key.into(),
        response_path: response_path.into(),
        keys: owned_keys(keys),
    }
    .into()
}

pub fn has_response(item_key: &str, response_path: &str) -> Expression {
    ResponsePredicate::HasResponse {
        item_key: item_key.into(),
        response_path: response_path.into(),
    }
    .into()
}

pub fn check_response_value_with_regex(
    item_key: &str,
    response_path: &str,
    pattern: &str,
) -> Expression {
    ResponsePredicate::ValueMatchesRegex {
        item_key: item_key.into(),
        response_path: response_path.into(),
        pattern: pattern.into(),
    }
    .into()
}

pub fn timestamp_with_offset(delta_seconds: i64, reference: Option<Expression>) -> Expression {
    DateOp::TimestampWithOffset {
        delta_seconds,
        reference: reference.map(Box::new),
    }
    .into()
}

pub fn date_response_diff_from_now(
    item_key: &str,
    response_path: &str,
    unit: DateUnit,
    absolute: bool,
) -> Expression {
    DateOp::DateResponseDiffFromNow {
        item_key: item_key.into(),
        response_path: response_path.into(),
        unit,
        absolute,
    }
    .into()
}

pub fn get_response_item(item_key: &str, response_path: &str) -> Expression {
    ValueAccessor::GetResponseItem {
        item_key: item_key.into(),
        response_path: response_path.into(),
    }
    .into()
}

pub fn get_attribute(of: Expression, attribute: &str) -> Expression {
    ValueAccessor::GetAttribute {
        of: Box::new(of),
        attribute: attribute.into(),
    }
    .into()
}

pub fn is_defined(of: Expression) -> Expression {
    ValueAccessor::IsDefined(Box::new(of)).into()
}

pub fn get_survey_item_validation(item_key: &str, validation_key: &str) -> Expression {
    ValueAccessor::GetSurveyItemValidation {
        item_key: item_key.into(),
        validation_key: validation_key.into(),
    }
    .into()
}
