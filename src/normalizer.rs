use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::comment::{placeholder_username, CommentBatch, CommentId, CommentRecord};
use crate::error::{Result, SorteioError};

// Properties that commonly hold a comment list in exported JSON.
const COMMENT_PROPS: [&str; 5] = ["comments", "data", "items", "edges", "nodes"];
const TEXT_FIELDS: [&str; 4] = ["text", "content", "comment", "body"];
const MAX_SEARCH_DEPTH: usize = 64;

pub const PLACEHOLDER_TEXT: &str = "Sem texto";

/// Turns uploaded file content into a comment batch.
///
/// Valid JSON goes through the shape heuristics (top-level array, a
/// `comments` array, then a recursive search); anything that does not parse
/// as JSON is read as one comment per non-blank line.
pub fn normalize(raw: &str) -> Result<CommentBatch> {
    match serde_json::from_str::<Value>(raw) {
        Ok(doc) => from_json(&doc),
        Err(e) => {
            debug!(error = %e, "content is not JSON, reading one comment per line");
            from_lines(raw)
        }
    }
}

fn from_json(doc: &Value) -> Result<CommentBatch> {
    if let Some(items) = direct_array(doc) {
        if items.is_empty() {
            return Err(SorteioError::parse("no comments found in file"));
        }
        debug!(count = items.len(), "using top-level comment array");
        return Ok(normalize_items(items).into());
    }

    let found = find_comments(doc, 0);
    if found.is_empty() {
        return Err(SorteioError::parse("unrecognized comment structure"));
    }
    debug!(count = found.len(), "structural search found comments");
    Ok(found.into())
}

fn direct_array(doc: &Value) -> Option<&Vec<Value>> {
    match doc {
        Value::Array(items) => Some(items),
        Value::Object(obj) => obj.get("comments").and_then(Value::as_array),
        _ => None,
    }
}

// First matching property at a level wins. Otherwise every nested object or
// array is searched and the matches of all children are concatenated.
fn find_comments(value: &Value, depth: usize) -> Vec<CommentRecord> {
    if depth > MAX_SEARCH_DEPTH {
        warn!(depth, "comment search depth limit reached");
        return Vec::new();
    }

    if let Value::Object(obj) = value {
        for prop in COMMENT_PROPS {
            if let Some(Value::Array(items)) = obj.get(prop) {
                if is_comment_array(items) {
                    return normalize_items(items);
                }
            }
        }
    }

    let children: Vec<&Value> = match value {
        Value::Object(obj) => obj.values().collect(),
        Value::Array(items) => items.iter().collect(),
        _ => return Vec::new(),
    };

    let mut results = Vec::new();
    for child in children {
        if child.is_object() || child.is_array() {
            results.extend(find_comments(child, depth + 1));
        }
    }
    results
}

fn is_comment_array(items: &[Value]) -> bool {
    !items.is_empty()
        && items.iter().all(|item| {
            item.as_object()
                .map(|obj| TEXT_FIELDS.iter().any(|k| field(obj, k).is_some()))
                .unwrap_or(false)
        })
}

fn normalize_items(items: &[Value]) -> Vec<CommentRecord> {
    items.iter().enumerate().map(|(i, item)| normalize_item(i, item)).collect()
}

fn normalize_item(index: usize, item: &Value) -> CommentRecord {
    let fallback_id = CommentId::Index(index as i64);
    match item {
        Value::Object(obj) => {
            let id = field(obj, "id").map(to_id).unwrap_or(fallback_id);
            let username = field(obj, "username")
                .or_else(|| field(obj, "user").and_then(Value::as_object).and_then(|u| field(u, "username")))
                .or_else(|| field(obj, "author"))
                .map(scalar_text)
                .unwrap_or_else(|| placeholder_username(index));
            let text = TEXT_FIELDS.iter()
                .find_map(|k| field(obj, k))
                .map(scalar_text)
                .unwrap_or_else(|| PLACEHOLDER_TEXT.to_string());
            CommentRecord::new(id, username, text)
        }
        Value::Null => CommentRecord::new(fallback_id, placeholder_username(index), PLACEHOLDER_TEXT),
        // bare strings and other scalars are kept as opaque comment text
        other => CommentRecord::new(fallback_id, placeholder_username(index), scalar_text(other)),
    }
}

fn from_lines(raw: &str) -> Result<CommentBatch> {
    let records: Vec<CommentRecord> = raw
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| {
            let username = if line.starts_with('@') { line.to_string() } else { placeholder_username(i) };
            CommentRecord::new(CommentId::Index(i as i64), username, line)
        })
        .collect();

    if records.is_empty() {
        return Err(SorteioError::parse("no comments found in file"));
    }
    Ok(records.into())
}

/// Looks up a field, treating `null`, `false`, `0` and `""` as missing.
fn field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| truthy(v))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn to_id(value: &Value) -> CommentId {
    match value {
        Value::Number(n) => n.as_i64().map(CommentId::Index).unwrap_or_else(|| CommentId::Text(n.to_string())),
        other => CommentId::Text(scalar_text(other)),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usernames(batch: &CommentBatch) -> Vec<&str> {
        batch.iter().map(|c| c.username()).collect()
    }

    fn texts(batch: &CommentBatch) -> Vec<&str> {
        batch.iter().map(|c| c.text()).collect()
    }

    fn assert_parse_error(raw: &str, expected: &str) {
        match normalize(raw) {
            Err(SorteioError::Parse(msg)) => assert_eq!(msg, expected),
            other => panic!("expected parse error for {raw:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_top_level_array_keeps_length_and_order() {
        let raw = r#"[
            {"id": "c1", "username": "ana", "text": "primeiro"},
            {"username": "bruno", "content": "segundo"},
            {"user": {"username": "carla"}, "comment": "terceiro"},
            {"author": "davi", "body": "quarto"}
        ]"#;
        let batch = normalize(raw).expect("normalize");
        assert_eq!(batch.len(), 4);
        assert_eq!(usernames(&batch), ["ana", "bruno", "carla", "davi"]);
        assert_eq!(texts(&batch), ["primeiro", "segundo", "terceiro", "quarto"]);
        assert_eq!(batch.get(0).unwrap().id(), &CommentId::Text("c1".into()));
        assert_eq!(batch.get(1).unwrap().id(), &CommentId::Index(1));
    }

    #[test]
    fn test_comments_property() {
        let raw = r#"{"post": "abc", "comments": [{"text": "oi"}, {"text": "olá", "id": 42}]}"#;
        let batch = normalize(raw).expect("normalize");
        assert_eq!(texts(&batch), ["oi", "olá"]);
        assert_eq!(usernames(&batch), ["user_0", "user_1"]);
        assert_eq!(batch.get(1).unwrap().id(), &CommentId::Index(42));
    }

    #[test]
    fn test_missing_fields_use_placeholders() {
        let batch = normalize(r#"[{"id": 0, "likes": 3}, null]"#).expect("normalize");
        assert_eq!(batch.len(), 2);
        assert_eq!(texts(&batch), [PLACEHOLDER_TEXT, PLACEHOLDER_TEXT]);
        assert_eq!(usernames(&batch), ["user_0", "user_1"]);
        // id 0 counts as absent, so the index is used
        assert_eq!(batch.get(0).unwrap().id(), &CommentId::Index(0));
    }

    #[test]
    fn test_array_of_strings_is_opaque_text() {
        let batch = normalize(r#"["@ana: top!", "@bruno: quero"]"#).expect("normalize");
        assert_eq!(texts(&batch), ["@ana: top!", "@bruno: quero"]);
        assert_eq!(usernames(&batch), ["user_0", "user_1"]);
    }

    #[test]
    fn test_nested_search_finds_comments() {
        let raw = r#"{"data": {"post": {"items": [{"body": "oi", "author": "zé"}]}}}"#;
        let batch = normalize(raw).expect("normalize");
        assert_eq!(usernames(&batch), ["zé"]);
        assert_eq!(texts(&batch), ["oi"]);
    }

    #[test]
    fn test_search_walks_into_arrays() {
        let raw = r#"{"data": [{"edges": [{"text": "a"}, {"text": "b"}]}]}"#;
        let batch = normalize(raw).expect("normalize");
        assert_eq!(texts(&batch), ["a", "b"]);
    }

    #[test]
    fn test_search_concatenates_sibling_matches() {
        let raw = r#"{
            "first": {"comments": [{"text": "1"}]},
            "second": {"nodes": [{"text": "2"}, {"text": "3"}]}
        }"#;
        let batch = normalize(raw).expect("normalize");
        assert_eq!(texts(&batch), ["1", "2", "3"]);
        // positions restart per matched array, duplicates are kept
        let ids: Vec<_> = batch.iter().map(|c| c.id().clone()).collect();
        assert_eq!(ids, [CommentId::Index(0), CommentId::Index(0), CommentId::Index(1)]);
    }

    #[test]
    fn test_first_matching_property_wins() {
        let raw = r#"{"wrapper": {"data": [{"text": "from data"}], "items": [{"text": "from items"}]}}"#;
        let batch = normalize(raw).expect("normalize");
        assert_eq!(texts(&batch), ["from data"]);
    }

    #[test]
    fn test_non_comment_arrays_are_skipped() {
        // one element lacks a text-bearing field, so "items" is not a comment array
        let raw = r#"{"items": [{"text": "ok"}, {"likes": 1}], "more": {"edges": [{"content": "here"}]}}"#;
        let batch = normalize(raw).expect("normalize");
        assert_eq!(texts(&batch), ["here"]);
    }

    #[test]
    fn test_unrecognized_structure() {
        assert_parse_error(r#"{"post": {"likes": 10, "tags": ["a", "b"]}}"#, "unrecognized comment structure");
        assert_parse_error(r#"{"comments": "none"}"#, "unrecognized comment structure");
        assert_parse_error("42", "unrecognized comment structure");
    }

    #[test]
    fn test_empty_inputs() {
        assert_parse_error("", "no comments found in file");
        assert_parse_error("  \n\n \r\n", "no comments found in file");
        assert_parse_error("[]", "no comments found in file");
        assert_parse_error(r#"{"comments": []}"#, "no comments found in file");
    }

    #[test]
    fn test_search_depth_is_bounded() {
        let depth = 100;
        let raw = format!(
            "{}{}{}",
            r#"{"x":"#.repeat(depth),
            r#"{"comments":[{"text":"deep"}]}"#,
            "}".repeat(depth)
        );
        assert_parse_error(&raw, "unrecognized comment structure");

        let shallow = format!(
            "{}{}{}",
            r#"{"x":"#.repeat(10),
            r#"{"comments":[{"text":"deep"}]}"#,
            "}".repeat(10)
        );
        assert_eq!(texts(&normalize(&shallow).expect("normalize")), ["deep"]);
    }

    #[test]
    fn test_plain_text_lines() {
        let batch = normalize("@joao\n@maria\n\n@ana").expect("normalize");
        assert_eq!(batch.len(), 3);
        assert_eq!(usernames(&batch), ["@joao", "@maria", "@ana"]);
        assert_eq!(texts(&batch), ["@joao", "@maria", "@ana"]);
    }

    #[test]
    fn test_plain_text_without_handles() {
        let batch = normalize("  quero muito  \r\n\nparticipando!\n@lu: eu").expect("normalize");
        assert_eq!(texts(&batch), ["quero muito", "participando!", "@lu: eu"]);
        assert_eq!(usernames(&batch), ["user_0", "user_1", "@lu: eu"]);
        let ids: Vec<_> = batch.iter().map(|c| c.id().clone()).collect();
        assert_eq!(ids, [CommentId::Index(0), CommentId::Index(1), CommentId::Index(2)]);
    }

    #[test]
    fn test_malformed_json_falls_back_to_lines() {
        let batch = normalize("{\"comments\": [\n{\"text\": \"oi\"").expect("normalize");
        assert_eq!(batch.len(), 2);
        assert_eq!(texts(&batch), ["{\"comments\": [", "{\"text\": \"oi\""]);
    }
}
