use crate::error::{AppError, AppResult};
use crate::models::PolicyKind;
use crate::services::content::ContentPipeline;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

/// Upper bound on `content` and `html`, in characters.
pub const MAX_CONTENT_LENGTH: usize = 200_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Render,
    Excerpt,
    Escape,
    Fixups,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContentRequest {
    pub op: Operation,
    /// Raw content; for `fixups` the original the HTML was rendered from
    #[serde(default)]
    #[validate(length(max = 200000))]
    pub content: String,
    pub policy: Option<PolicyKind>,
    /// Excerpt length in characters
    #[validate(range(min = 1))]
    pub max_length: Option<usize>,
    /// Sanitized HTML to apply embed fixups to
    #[validate(length(max = 200000))]
    pub html: Option<String>,
}

pub fn parse_request(input: &str) -> AppResult<ContentRequest> {
    let request: ContentRequest = serde_json::from_str(input)
        .map_err(|e| AppError::Validation(format!("Invalid request: {e}")))?;
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(request)
}

pub fn handle_request(
    pipeline: &ContentPipeline,
    request: &ContentRequest,
    default_policy: PolicyKind,
) -> AppResult<Value> {
    match request.op {
        Operation::Render => {
            let policy = request.policy.unwrap_or(default_policy);
            let outcome = pipeline.render_content(&request.content, policy);
            Ok(json!({
                "policy": policy,
                "outcome": outcome,
            }))
        }
        Operation::Excerpt => Ok(json!({
            "excerpt": pipeline.excerpt(&request.content, request.max_length),
        })),
        Operation::Escape => Ok(json!({
            "escaped": pipeline.escape_for_display(&request.content),
        })),
        Operation::Fixups => {
            let html = request
                .html
                .as_deref()
                .ok_or_else(|| AppError::Validation("fixups requires 'html'".to_string()))?;
            Ok(json!({
                "html": pipeline.apply_embed_fixups(html, &request.content),
            }))
        }
    }
}

pub fn error_response(err: &AppError) -> Value {
    json!({ "error": err.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_request() {
        let req = parse_request(r#"{"op":"escape","content":"<b>"}"#).unwrap();
        assert_eq!(req.op, Operation::Escape);
        assert_eq!(req.policy, None);
        assert_eq!(req.max_length, None);
    }

    #[test]
    fn parse_policy_names() {
        let req = parse_request(r#"{"op":"render","content":"x","policy":"rich-embed"}"#).unwrap();
        assert_eq!(req.policy, Some(PolicyKind::RichEmbed));
    }

    #[test]
    fn unknown_operation_rejected() {
        let err = parse_request(r#"{"op":"delete","content":"x"}"#).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn zero_max_length_rejected() {
        let err = parse_request(r#"{"op":"excerpt","content":"x","max_length":0}"#).unwrap_err();
        assert!(err.to_string().contains("max_length"));
    }

    #[test]
    fn oversized_content_rejected() {
        let body = json!({
            "op": "render",
            "content": "a".repeat(MAX_CONTENT_LENGTH + 1),
        });
        let err = parse_request(&body.to_string()).unwrap_err();
        assert!(err.to_string().contains("content"));
    }

    #[test]
    fn fixups_without_html_rejected() {
        let req = parse_request(r#"{"op":"fixups","content":"x"}"#).unwrap();
        let err = handle_request(&ContentPipeline::new(), &req, PolicyKind::Strict).unwrap_err();
        assert_eq!(
            error_response(&err),
            json!({"error": "Validation error: fixups requires 'html'"})
        );
    }

    #[test]
    fn render_uses_default_policy() {
        let req = parse_request(r#"{"op":"render","content":"hi"}"#).unwrap();
        let value = handle_request(&ContentPipeline::new(), &req, PolicyKind::RichEmbed).unwrap();
        assert_eq!(value["policy"], "rich-embed");
        assert_eq!(value["outcome"]["kind"], "sanitized");
        assert_eq!(value["outcome"]["html"], "<p>hi</p>\n");
    }
}
