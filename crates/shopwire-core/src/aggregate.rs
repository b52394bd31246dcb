//! Page aggregation.

use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Concatenate pages, keeping page order and in-page order.
pub fn flatten<T>(pages: Vec<Vec<T>>) -> Vec<T> {
    pages.into_iter().flatten().collect()
}

/// Combine REST page payloads into one value.
///
/// Array pages are concatenated and object pages are merged key-wise with later
/// pages winning. A single scalar page is returned unchanged. No pages at all
/// yields an empty array.
pub fn merge_pages(pages: Vec<Value>) -> ApiResult<Value> {
    let mut pages = pages.into_iter();
    let Some(first) = pages.next() else {
        return Ok(Value::Array(Vec::new()));
    };

    match first {
        Value::Array(mut items) => {
            for (index, page) in pages.enumerate() {
                match page {
                    Value::Array(more) => items.extend(more),
                    other => return Err(mismatch("array", &other, index + 1)),
                }
            }
            Ok(Value::Array(items))
        }
        Value::Object(mut map) => {
            for (index, page) in pages.enumerate() {
                match page {
                    Value::Object(more) => map.extend(more),
                    other => return Err(mismatch("object", &other, index + 1)),
                }
            }
            Ok(Value::Object(map))
        }
        scalar => match pages.next() {
            None => Ok(scalar),
            Some(_) => Err(ApiError::Aggregate {
                message: format!("cannot combine scalar page {scalar} with further pages"),
            }),
        },
    }
}

fn mismatch(expected: &str, page: &Value, index: usize) -> ApiError {
    ApiError::Aggregate {
        message: format!(
            "page {index} is {}, expected {expected} like page 0",
            kind_name(page)
        ),
    }
}

const fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
