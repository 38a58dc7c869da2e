/*!
 * Id-tagged prompt protocol.
 *
 * Requests carry a JSON array of `{"id", "text"}` objects. Replies are
 * untrusted: the parser accepts the shapes models actually produce and
 * skips anything it cannot read instead of failing the request.
 */

use log::{debug, warn};
use serde_json::Value;

use crate::providers::{TranslatedItem, TranslationItem};

/// System prompt template for id-tagged subtitle translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for subtitle translation.
    pub const SUBTITLE_TRANSLATOR: &'static str = r#"You are an expert subtitle translator. Translate every item into {target_language} ({target_code}).

## Input
A JSON array of objects, each with an integer "id" and a "text" to translate.

## Output Requirements
- Return ONLY valid JSON: {"translations": [{"id": <id>, "translation": "<text>"}]}
- Return exactly one object per input id and copy each id unchanged
- Do not merge, split, renumber or skip items
- Do not include any text outside the JSON structure

## Quality Standards
- Natural, idiomatic {target_language}
- Keep translations concise (subtitles have limited display time)
- Preserve line breaks, [sound effects] and (parentheticals)
- Never translate character names"#;

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default subtitle translator template.
    pub fn subtitle_translator() -> Self {
        Self::new(Self::SUBTITLE_TRANSLATOR)
    }

    /// Render the template for a target language name and code.
    pub fn render(&self, target_language: &str, target_code: &str) -> String {
        self.template
            .replace("{target_language}", target_language)
            .replace("{target_code}", target_code)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::subtitle_translator()
    }
}

/// Render the user prompt: the items as a compact JSON array
pub fn build_user_prompt(items: &[TranslationItem]) -> String {
    // Serializing plain structs of integers and strings cannot fail
    let payload = serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string());
    format!("Translate these subtitle items:\n{}", payload)
}

/// Items recovered from a reply plus the number of entries that were unreadable
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedResponse {
    pub items: Vec<TranslatedItem>,
    pub skipped: usize,
}

/// Parse a model reply into translated items.
///
/// Accepts a bare array or an object wrapping it under `translations`,
/// `items` or `results`, optionally inside a markdown code fence. Ids may be
/// numbers or numeric strings; the text may be under `translation`,
/// `translated` or `text`. Unknown fields are ignored.
pub fn parse_translation_response(response: &str) -> ParsedResponse {
    let Some(json_str) = extract_json(response) else {
        warn!("Could not find JSON in translator reply ({} chars)", response.len());
        return ParsedResponse::default();
    };

    let value: Value = match serde_json::from_str(json_str) {
        Ok(value) => value,
        Err(e) => {
            warn!("Translator reply is not valid JSON: {}", e);
            return ParsedResponse::default();
        }
    };

    let entries = match &value {
        Value::Array(entries) => entries.as_slice(),
        Value::Object(map) => ["translations", "items", "results"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };

    let mut parsed = ParsedResponse::default();
    for entry in entries {
        match parse_entry(entry) {
            Some(item) => parsed.items.push(item),
            None => {
                debug!("Skipping unreadable reply entry: {}", entry);
                parsed.skipped += 1;
            }
        }
    }

    parsed
}

fn parse_entry(entry: &Value) -> Option<TranslatedItem> {
    let map = entry.as_object()?;

    let id = match map.get("id")? {
        Value::Number(n) => usize::try_from(n.as_u64()?).ok()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };

    let translation = ["translation", "translated", "text"]
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))?;

    Some(TranslatedItem::new(id, translation))
}

/// Extract the JSON payload from a potentially wrapped reply.
fn extract_json(response: &str) -> Option<&str> {
    let trimmed = response.trim();

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }

    // Markdown code fence, with or without a language specifier
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            let inner = body[..end].trim();
            if inner.starts_with('{') || inner.starts_with('[') {
                return Some(inner);
            }
        }
    }

    // First opening bracket to the matching last closing one
    let open = trimmed.find(['{', '['])?;
    let close_char = if trimmed.as_bytes()[open] == b'{' { '}' } else { ']' };
    let close = trimmed.rfind(close_char)?;
    (close > open).then(|| &trimmed[open..=close])
}
