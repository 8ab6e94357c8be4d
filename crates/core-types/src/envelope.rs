use serde::{Deserialize, Serialize};

/// The `{ success, data?, error? }` shape every data-access call is reported in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl ActionResult<()> {
    /// A success with nothing to report, e.g. after a delete.
    pub fn done() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for ActionResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => ActionResult::ok(data),
            Err(e) => ActionResult::err(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_omits_error_field() {
        let value = serde_json::to_value(ActionResult::ok(3)).unwrap();
        assert_eq!(value, json!({ "success": true, "data": 3 }));
    }

    #[test]
    fn failure_omits_data_field() {
        let result: ActionResult<u32> = Err::<u32, _>("boom").into();
        let value = serde_json::to_value(result).unwrap();
        assert_eq!(value, json!({ "success": false, "error": "boom" }));
    }
}
