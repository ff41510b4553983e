//! Request and response shapes for the generation endpoints.
//!
//! None of these are persisted; each lives for one HTTP call.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use validator::Validate;

/// Input for `/api/generate-policy`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyRequest {
    #[validate(length(min = 1, message = "companyName is required"))]
    pub company_name: String,

    #[validate(length(min = 1, message = "industry is required"))]
    pub industry: String,

    #[validate(length(min = 1, message = "size is required"))]
    pub size: String,

    pub specific_requirements: Option<String>,
}

/// Input for `/api/analyze-compliance`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ComplianceRequest {
    #[validate(length(min = 1, message = "framework is required"))]
    pub framework: String,

    #[validate(length(min = 1, message = "currentSetup is required"))]
    pub current_setup: String,

    #[validate(length(min = 1, message = "industry is required"))]
    pub industry: String,
}

/// Input for `/api/fill-questionnaire`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionnaireRequest {
    #[validate(length(min = 1, message = "questionnaire is required"))]
    pub questionnaire: String,

    #[validate(length(min = 1, message = "companyInfo is required"))]
    pub company_info: String,
}

/// Successful generation, serialized as `{"success": true, <field>: <payload>}`.
///
/// Failures never take this shape; they go out through `AppError` as
/// `{"success": false, "error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResponse {
    pub field: &'static str,
    pub payload: String,
}

impl Serialize for GenerationResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("success", &true)?;
        map.serialize_entry(self.field, &self.payload)?;
        map.end()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fail_validation_instead_of_becoming_text() {
        let req: PolicyRequest =
            serde_json::from_str(r#"{"companyName": "Acme", "size": "11-50"}"#).unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("industry"));
        assert!(!fields.contains_key("company_name"));
    }

    #[test]
    fn null_requirements_deserialize_as_none() {
        let req: PolicyRequest = serde_json::from_str(
            r#"{"companyName":"Acme","industry":"tech","size":"1-10","specificRequirements":null}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.specific_requirements, None);
    }

    #[test]
    fn generation_response_uses_operation_field() {
        let body = serde_json::to_value(GenerationResponse {
            field: "analysis",
            payload: "gap report".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"success": true, "analysis": "gap report"}));
    }
}
