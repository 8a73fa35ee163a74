//! Tool-call extraction from free model text.
//!
//! The completion service returns plain text, so a tool call has to be
//! recovered from it. Three forms are recognized, tried in this order; the
//! first one that yields a call wins:
//!
//! ```text
//! 1. prefix     TOOL: <name> { ...json object... }
//!               name    = [A-Za-z0-9_]+
//!               payload = brace-balanced region starting at the first `{`,
//!                         scanned string-aware (braces inside JSON strings
//!                         and escaped quotes do not count)
//!
//! 2. json fence ```json
//!               {"command": <name>, "args": <payload>}
//!             | {"tool": <name>, "parameters": <payload>}
//!             | {"tool": <name>, ...payload fields}
//!               ```
//!               only the first json fence is considered
//!
//! 3. tool_code  ```tool_code
//!               <name> <json object, optional>
//!               ```
//!               every such fence is tried; the first that parses wins
//! ```
//!
//! No match is the normal result for conversational turns.

use boardroom_core::tool::{Payload, ToolCall};
use serde_json::Value;

const PREFIX_MARKER: &str = "TOOL:";
const FENCE: &str = "```";

/// Recover at most one tool call from `text`.
pub fn extract_tool_call(text: &str) -> Option<ToolCall> {
    extract_prefixed(text)
        .or_else(|| extract_json_fence(text))
        .or_else(|| extract_tool_code(text))
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_tool_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_name_char)
}

// ── Strategy 1: TOOL: name {...} ────────────────────────────────────────────

fn extract_prefixed(text: &str) -> Option<ToolCall> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find(PREFIX_MARKER) {
        let after_marker = search_from + offset + PREFIX_MARKER.len();
        search_from = after_marker;
        if let Some(call) = parse_prefixed_at(&text[after_marker..]) {
            return Some(call);
        }
    }
    None
}

fn parse_prefixed_at(rest: &str) -> Option<ToolCall> {
    let rest = rest.trim_start();
    let name_len = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
    let (name, rest) = rest.split_at(name_len);
    if name.is_empty() {
        return None;
    }
    let rest = rest.trim_start();
    if !rest.starts_with('{') {
        return None;
    }
    let body = balanced_object(rest)?;
    match serde_json::from_str::<Value>(body).ok()? {
        Value::Object(payload) => Some(ToolCall::new(name, payload)),
        _ => None,
    }
}

/// The `{...}` region at the start of `text`, or `None` if it never closes.
pub(crate) fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

// ── Fences ──────────────────────────────────────────────────────────────────

/// Bodies of every fence whose info string equals `tag`.
fn fenced_blocks<'a>(text: &'a str, tag: &str) -> Vec<&'a str> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        let Some(line_end) = after_open.find('\n') else {
            break;
        };
        let info = after_open[..line_end].trim();
        let body_start = &after_open[line_end + 1..];
        let Some(close) = body_start.find(FENCE) else {
            break;
        };
        if info.eq_ignore_ascii_case(tag) {
            blocks.push(&body_start[..close]);
        }
        rest = &body_start[close + FENCE.len()..];
    }
    blocks
}

// ── Strategy 2: ```json ─────────────────────────────────────────────────────

fn extract_json_fence(text: &str) -> Option<ToolCall> {
    let block = fenced_blocks(text, "json").into_iter().next()?;
    let Value::Object(mut obj) = serde_json::from_str::<Value>(block.trim()).ok()? else {
        return None;
    };

    if let (Some(Value::String(name)), Some(args)) = (obj.get("command"), obj.get("args")) {
        return Some(ToolCall::from_value(name.clone(), args.clone()));
    }
    let name = match obj.get("tool") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        _ => return None,
    };
    if let Some(params) = obj.get("parameters") {
        return Some(ToolCall::from_value(name, params.clone()));
    }
    obj.remove("tool");
    Some(ToolCall::new(name, obj))
}

// ── Strategy 3: ```tool_code ────────────────────────────────────────────────

fn extract_tool_code(text: &str) -> Option<ToolCall> {
    fenced_blocks(text, "tool_code").into_iter().find_map(|block| {
        let block = block.trim();
        let (name, remainder) = match block.find(char::is_whitespace) {
            Some(i) => (&block[..i], block[i..].trim()),
            None => (block, ""),
        };
        if !is_tool_name(name) {
            return None;
        }
        if remainder.is_empty() {
            return Some(ToolCall::new(name, Payload::new()));
        }
        match serde_json::from_str::<Value>(remainder).ok()? {
            Value::Object(payload) => Some(ToolCall::new(name, payload)),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(v: Value) -> Payload {
        match v {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn prefix_form_with_nested_payload() {
        let call = extract_tool_call(r#"Sure. TOOL: name {"a":1,"b":{"c":2}}"#).unwrap();
        assert_eq!(call.name, "name");
        assert_eq!(call.payload, payload(json!({"a": 1, "b": {"c": 2}})));
    }

    #[test]
    fn braces_inside_strings_do_not_truncate() {
        let text = r#"TOOL: write_file {"path": "a.md", "content": "fn main() { println!(\"}\"); }"} trailing"#;
        let call = extract_tool_call(text).unwrap();
        assert_eq!(call.name, "write_file");
        assert_eq!(call.str_arg(&["content"]), Some(r#"fn main() { println!("}"); }"#));
    }

    #[test]
    fn prefix_form_tolerates_whitespace_and_newlines() {
        let text = "I'll save it.\nTOOL:   write_file\n{\n  \"path\": \"x.md\",\n  \"content\": \"hi\"\n}\n";
        let call = extract_tool_call(text).unwrap();
        assert_eq!(call.name, "write_file");
        assert_eq!(call.str_arg(&["path"]), Some("x.md"));
    }

    #[test]
    fn first_valid_marker_wins() {
        let text = r#"TOOL: broken {"a": } then TOOL: list_files {} and TOOL: read_file {"path":"x"}"#;
        assert_eq!(extract_tool_call(text).unwrap().name, "list_files");
    }

    #[test]
    fn unbalanced_prefix_falls_through_to_fence() {
        let text = "TOOL: write_file {\"path\": \"x\"\n```json\n{\"tool\": \"list_files\"}\n```";
        let call = extract_tool_call(text).unwrap();
        assert_eq!(call.name, "list_files");
        assert!(call.payload.is_empty());
    }

    #[test]
    fn prefix_beats_json_fence() {
        let text = "```json\n{\"command\": \"read_file\", \"args\": {\"path\": \"b\"}}\n```\nTOOL: write_file {\"path\": \"a\"}";
        assert_eq!(extract_tool_call(text).unwrap().name, "write_file");
    }

    #[test]
    fn json_fence_shapes() {
        let call = extract_tool_call("```json\n{\"command\": \"read_file\", \"args\": {\"path\": \"a\"}}\n```").unwrap();
        assert_eq!((call.name.as_str(), call.str_arg(&["path"])), ("read_file", Some("a")));

        let call = extract_tool_call("```json\n{\"tool\": \"read_file\", \"parameters\": {\"path\": \"b\"}}\n```").unwrap();
        assert_eq!(call.str_arg(&["path"]), Some("b"));

        let call = extract_tool_call("```json\n{\"tool\": \"read_file\", \"path\": \"c\"}\n```").unwrap();
        assert_eq!(call.payload, payload(json!({"path": "c"})));
    }

    #[test]
    fn non_object_args_are_wrapped() {
        let call = extract_tool_call("```json\n{\"command\": \"sum\", \"args\": [1, 2]}\n```").unwrap();
        assert_eq!(call.payload, payload(json!({"value": [1, 2]})));
    }

    #[test]
    fn plain_json_output_is_not_a_call() {
        let text = "Here is the map:\n```json\n{\"screens\": [\"login\", \"home\"]}\n```";
        assert!(extract_tool_call(text).is_none());
    }

    #[test]
    fn only_first_json_fence_is_considered() {
        let text = "```json\n{\"screens\": []}\n```\n```json\n{\"tool\": \"list_files\"}\n```";
        assert!(extract_tool_call(text).is_none());
    }

    #[test]
    fn tool_code_blocks_scanned_in_order() {
        let text = "```tool_code\nnot-a-name {}\n```\n```tool_code\nwrite_file {\"path\": \"bad\"\n```\n```tool_code\nlist_files\n```";
        let call = extract_tool_call(text).unwrap();
        assert_eq!(call.name, "list_files");
        assert!(call.payload.is_empty());

        let call = extract_tool_call("```tool_code\nread_file {\"path\": \"a.md\"}\n```").unwrap();
        assert_eq!(call.str_arg(&["path"]), Some("a.md"));
    }

    #[test]
    fn conversational_text_has_no_call() {
        assert!(extract_tool_call("I agree with the CTO. Let's proceed.").is_none());
        assert!(extract_tool_call("TOOL: but nothing follows").is_none());
        assert!(extract_tool_call("").is_none());
    }

    #[test]
    fn balanced_object_scanner() {
        assert_eq!(balanced_object(r#"{"a":"\\"}rest"#), Some(r#"{"a":"\\"}"#));
        assert_eq!(balanced_object(r#"{"a":{"b":"{"}}x"#), Some(r#"{"a":{"b":"{"}}"#));
        assert_eq!(balanced_object(r#"{"a":1"#), None);
    }
}
