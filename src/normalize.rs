//! Normalized views over raw protocol results
//!
//! Server responses arrive in wire shapes tuned for transport, not for
//! display: optional error flags with two spellings, content blocks nested
//! inside result objects, resources split across text and blob variants.
//! This module flattens them into views the command layer renders directly.

use serde::Serialize;

use crate::types::{
    CallToolResult, Content, GetPromptResult, ReadResourceResult, ResourceContents,
};

/// A tool result with the wire ambiguities collapsed, annotated with the
/// invocation it answers.
///
/// The optional `isError`/`is_error` flag becomes a plain bool (absent means
/// success, per the MCP spec), and the tool name and argument mapping that
/// produced the result ride along so a rendered result is self-describing.
///
/// # Examples
///
/// ```
/// use mcprobe::normalize::NormalizedToolResult;
/// use mcprobe::types::{CallToolResult, Content};
///
/// let raw = CallToolResult {
///     content: vec![Content::Text { text: "42".to_string() }],
///     is_error: None,
///     structured_content: None,
/// };
/// let normalized = NormalizedToolResult::new("answer", None, raw);
/// assert!(!normalized.is_error);
/// assert_eq!(normalized.tool_name, "answer");
/// assert_eq!(normalized.first_text(), Some("42"));
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedToolResult {
    /// Name of the invoked tool.
    pub tool_name: String,
    /// The argument mapping sent with the call, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
    /// Whether the tool reported a domain-level failure.
    pub is_error: bool,
    /// The content blocks, in server order.
    pub content: Vec<Content>,
    /// Structured output, when the tool declares an output schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured: Option<serde_json::Value>,
}

impl NormalizedToolResult {
    /// Collapse a raw `tools/call` result, recording the invocation.
    pub fn new(
        tool_name: impl Into<String>,
        arguments: Option<serde_json::Value>,
        raw: CallToolResult,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            is_error: raw.is_error.unwrap_or(false),
            content: raw.content,
            structured: raw.structured_content,
        }
    }
    /// The first text block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(Content::as_text)
    }

    /// All text blocks joined with newlines; empty when there is no text.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(Content::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One resource content object flattened for display.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResourceView {
    /// Canonical URI of this content object.
    pub uri: String,
    /// MIME type, if the server provided one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Text body for text resources; `None` for binary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Size of the base64 payload for binary resources; `None` for text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_len: Option<usize>,
}

/// Flatten a `resources/read` result into display views, preserving order.
pub fn flatten_resource(result: &ReadResourceResult) -> Vec<ResourceView> {
    result
        .contents
        .iter()
        .map(|contents| match contents {
            ResourceContents::Text(t) => ResourceView {
                uri: t.uri.clone(),
                mime_type: t.mime_type.clone(),
                text: Some(t.text.clone()),
                blob_len: None,
            },
            ResourceContents::Blob(b) => ResourceView {
                uri: b.uri.clone(),
                mime_type: b.mime_type.clone(),
                text: None,
                blob_len: Some(b.blob.len()),
            },
        })
        .collect()
}

/// One rendered prompt message flattened for display.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PromptMessageView {
    /// `"user"` or `"assistant"`.
    pub role: String,
    /// The message body, non-text blocks summarized via [`describe_content`].
    pub text: String,
}

/// Flatten a `prompts/get` result into display views, preserving order.
pub fn flatten_prompt(result: &GetPromptResult) -> Vec<PromptMessageView> {
    result
        .messages
        .iter()
        .map(|message| PromptMessageView {
            role: message.role.to_string(),
            text: describe_content(&message.content),
        })
        .collect()
}

/// A one-line rendering of any content block.
///
/// Text passes through; binary and embedded blocks become bracketed
/// placeholders so tables stay readable.
pub fn describe_content(content: &Content) -> String {
    match content {
        Content::Text { text } => text.clone(),
        Content::Image { mime_type, data } => {
            format!("[image {} ({} bytes base64)]", mime_type, data.len())
        }
        Content::Audio { mime_type, data } => {
            format!("[audio {} ({} bytes base64)]", mime_type, data.len())
        }
        Content::Resource { resource } => match resource {
            ResourceContents::Text(t) => format!("[resource {}]", t.uri),
            ResourceContents::Blob(b) => format!("[resource {} (binary)]", b.uri),
        },
    }
}
