//! MCP content builders for tool results
//!
//! Converts dispatcher outcomes into `CallToolResult`s:
//!
//! | Payload | Content |
//! |---------|---------|
//! | monitor / window list | one JSON array text block |
//! | count | one text block holding the bare integer |
//! | capture | `image/png` block (base64), then a JSON metadata text block |
//! | close | one JSON acknowledgement text block |
//! | error | one JSON text block `{kind, message, hint}` with `is_error = true` |
//!
//! Capture errors are tool results, not protocol errors, so a client sees
//! them next to the call that caused them and the session stays usable.
//!
//! # Examples
//!
//! ```
//! use windowcap_core::error::CaptureError;
//! use windowcap_mcp_server::mcp_content::build_error_result;
//!
//! let result = build_error_result(&CaptureError::WindowNotFound { id: 7 });
//! assert_eq!(result.is_error, Some(true));
//! let text = &result.content[0].as_text().unwrap().text;
//! assert!(text.contains("does not exist"));
//! ```

use rmcp::model::{CallToolResult, Content, ErrorData as McpError};
use serde::Serialize;
use windowcap_core::{
    error::{CaptureError, ErrorHint},
    model::CapturedImage,
    registry::{ToolOutcome, ToolPayload},
    util::encode::encode_base64,
};

pub const PNG_MIME_TYPE: &str = "image/png";

/// Base64 `image/png` content from raw PNG bytes.
///
/// ```
/// use windowcap_mcp_server::mcp_content::build_image_content;
///
/// let png_data = vec![137, 80, 78, 71, 13, 10, 26, 10];
/// let content = build_image_content(&png_data);
/// assert_eq!(content.as_image().unwrap().mime_type, "image/png");
/// ```
pub fn build_image_content(png: &[u8]) -> Content {
    Content::image(encode_base64(png), PNG_MIME_TYPE)
}

/// Image content followed by JSON metadata.
pub fn build_capture_result(image: &CapturedImage) -> Result<CallToolResult, McpError> {
    let metadata = to_json(&image.metadata(), "capture metadata")?;
    Ok(CallToolResult::success(vec![
        build_image_content(&image.png),
        Content::text(metadata),
    ]))
}

/// One JSON text block.
pub fn build_json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(to_json(
        value,
        "tool result",
    )?)]))
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind:    &'static str,
    message: String,
    hint:    &'a ErrorHint,
}

/// `{kind, message, hint}` JSON for an error.
pub fn error_body(error: &CaptureError) -> String {
    let hint = error.structured_hint();
    let body = ErrorBody {
        kind:    error.kind().as_str(),
        message: error.to_string(),
        hint:    &hint,
    };
    // ErrorBody holds only strings, enums and JSON values
    serde_json::to_string(&body).unwrap_or_else(|_| error.to_string())
}

/// Tool error result for a capture error.
pub fn build_error_result(error: &CaptureError) -> CallToolResult {
    CallToolResult::error(vec![Content::text(error_body(error))])
}

/// Maps a dispatcher outcome to the tool result sent to the client.
pub fn outcome_to_result(outcome: ToolOutcome) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(ToolPayload::Monitors(monitors)) => build_json_result(&monitors),
        Ok(ToolPayload::Windows(windows)) => build_json_result(&windows),
        Ok(ToolPayload::Count(count)) => {
            Ok(CallToolResult::success(vec![Content::text(count.to_string())]))
        }
        Ok(ToolPayload::Image(image)) => build_capture_result(&image),
        Ok(ToolPayload::Closed(ack)) => build_json_result(&serde_json::json!({
            "closed": true,
            "window_id": ack.window_id,
            "title": ack.title,
            "app_name": ack.app_name,
            "message": ack.message(),
        })),
        Err(error) => Ok(build_error_result(&error)),
    }
}

fn to_json<T: Serialize>(value: &T, what: &str) -> Result<String, McpError> {
    serde_json::to_string(value)
        .map_err(|e| McpError::internal_error(format!("Failed to serialize {what}: {e}"), None))
}
