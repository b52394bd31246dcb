//! Metafield packets.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{ApiError, ApiResult};

/// Namespace used when the caller has no better one.
pub const DEFAULT_METAFIELD_NAMESPACE: &str = "global";

const MAX_KEY_LEN: usize = 30;
const MAX_NAMESPACE_LEN: usize = 20;

/// Metafield value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MetafieldType {
    Boolean,
    Color,
    Date,
    DateTime,
    Dimension,
    FileReference,
    #[default]
    Json,
    MultiLineTextField,
    NumberDecimal,
    NumberInteger,
    PageReference,
    ProductReference,
    Rating,
    SingleLineTextField,
    Url,
    VariantReference,
    Volume,
    Weight,
    ListNumberInteger,
    ListNumberDecimal,
    ListSingleLineTextField,
    ListProductReference,
}

impl MetafieldType {
    const ALL: [Self; 22] = [
        Self::Boolean,
        Self::Color,
        Self::Date,
        Self::DateTime,
        Self::Dimension,
        Self::FileReference,
        Self::Json,
        Self::MultiLineTextField,
        Self::NumberDecimal,
        Self::NumberInteger,
        Self::PageReference,
        Self::ProductReference,
        Self::Rating,
        Self::SingleLineTextField,
        Self::Url,
        Self::VariantReference,
        Self::Volume,
        Self::Weight,
        Self::ListNumberInteger,
        Self::ListNumberDecimal,
        Self::ListSingleLineTextField,
        Self::ListProductReference,
    ];

    /// Wire name, e.g. `list.number_integer`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Color => "color",
            Self::Date => "date",
            Self::DateTime => "date_time",
            Self::Dimension => "dimension",
            Self::FileReference => "file_reference",
            Self::Json => "json",
            Self::MultiLineTextField => "multi_line_text_field",
            Self::NumberDecimal => "number_decimal",
            Self::NumberInteger => "number_integer",
            Self::PageReference => "page_reference",
            Self::ProductReference => "product_reference",
            Self::Rating => "rating",
            Self::SingleLineTextField => "single_line_text_field",
            Self::Url => "url",
            Self::VariantReference => "variant_reference",
            Self::Volume => "volume",
            Self::Weight => "weight",
            Self::ListNumberInteger => "list.number_integer",
            Self::ListNumberDecimal => "list.number_decimal",
            Self::ListSingleLineTextField => "list.single_line_text_field",
            Self::ListProductReference => "list.product_reference",
        }
    }
}

impl fmt::Display for MetafieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetafieldType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ApiError::config(format!("Invalid metafield type provided: {s}.")))
    }
}

impl TryFrom<String> for MetafieldType {
    type Error = ApiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MetafieldType> for String {
    fn from(kind: MetafieldType) -> Self {
        kind.as_str().to_string()
    }
}

/// Build a metafield packet.
///
/// Numbers, booleans and dates are coerced to the representation `kind`
/// expects. Object and array values are sent as JSON text.
pub fn meta_packet(
    id: Option<u64>,
    key: &str,
    value: Value,
    kind: MetafieldType,
    namespace: &str,
) -> ApiResult<Value> {
    if key.chars().count() > MAX_KEY_LEN {
        return Err(ApiError::config(format!(
            "Metafield {key}'s length exceeds {MAX_KEY_LEN} chars."
        )));
    }
    if namespace.chars().count() > MAX_NAMESPACE_LEN {
        return Err(ApiError::config(format!(
            "Metafield {key}'s namespace length exceeds {MAX_NAMESPACE_LEN} chars."
        )));
    }

    let value = match coerce(value, kind)? {
        structured @ (Value::Object(_) | Value::Array(_)) => {
            Value::String(serde_json::to_string(&structured)?)
        }
        scalar => scalar,
    };

    Ok(json!({
        "id": id,
        "key": key,
        "value": value,
        "type": kind.as_str(),
        "namespace": namespace,
    }))
}

fn coerce(value: Value, kind: MetafieldType) -> ApiResult<Value> {
    match kind {
        MetafieldType::NumberInteger => to_integer(&value).map(Value::from),
        MetafieldType::NumberDecimal => to_decimal(&value).map(Value::from),
        MetafieldType::ListNumberInteger => list(&value, kind)?
            .iter()
            .map(|item| to_integer(item).map(Value::from))
            .collect::<ApiResult<Vec<_>>>()
            .map(Value::Array),
        MetafieldType::ListNumberDecimal => list(&value, kind)?
            .iter()
            .map(|item| to_decimal(item).map(Value::from))
            .collect::<ApiResult<Vec<_>>>()
            .map(Value::Array),
        MetafieldType::Boolean => Ok(Value::Bool(to_bool(&value))),
        MetafieldType::Date => {
            parse_moment(&value).map(|moment| Value::from(moment.format("%Y-%m-%d").to_string()))
        }
        MetafieldType::DateTime => parse_moment(&value)
            .map(|moment| Value::from(moment.format("%Y-%m-%dT%H:%M:%S").to_string())),
        _ => Ok(value),
    }
}

fn list(value: &Value, kind: MetafieldType) -> ApiResult<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| ApiError::config(format!("{kind} metafield value must be a list")))
}

#[allow(clippy::cast_possible_truncation)]
fn to_integer(value: &Value) -> ApiResult<i64> {
    let parsed = match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.trunc() as i64)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().map(|float| float.trunc() as i64))
        }
        Value::Bool(flag) => Some(i64::from(*flag)),
        _ => None,
    };
    parsed.ok_or_else(|| ApiError::config(format!("not an integer metafield value: {value}")))
}

fn to_decimal(value: &Value) -> ApiResult<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ApiError::config(format!("not a decimal metafield value: {value}")))
}

fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => {
            let text = text.trim();
            if text.eq_ignore_ascii_case("true") {
                true
            } else if text.eq_ignore_ascii_case("false") {
                false
            } else {
                !text.is_empty() && text != "0"
            }
        }
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn parse_moment(value: &Value) -> ApiResult<NaiveDateTime> {
    let invalid = || ApiError::config(format!("not a date metafield value: {value}"));
    let text = value.as_str().map(str::trim).ok_or_else(invalid)?;

    if let Ok(moment) = DateTime::parse_from_rfc3339(text) {
        return Ok(moment.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(moment) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(moment);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(invalid)
}
