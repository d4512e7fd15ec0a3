//! Context formatting for analysis prompts.

use super::RankedResult;
use serde_json::Value;

/// Format ranked results into one context block, best match first.
///
/// Each result becomes `Response N: field: value, field: value` with fields
/// in their stored order; blocks are separated by a blank line. Record size
/// is not capped here, only the number of results.
pub fn assemble(results: &[RankedResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| format!("Response {}: {}", i + 1, format_record(&result.data)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_record(data: &Value) -> String {
    match data {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("{}: {}", key, format_value(value)))
            .collect::<Vec<_>>()
            .join(", "),
        other => format_value(other),
    }
}

/// Strings are inlined without quotes; nested values stay as compact JSON.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::rank;
    use serde_json::json;

    fn result(data: Value, similarity: f32) -> RankedResult {
        RankedResult { data, similarity }
    }

    #[test]
    fn test_assemble_format() {
        let context = assemble(&[
            result(json!({"name": "Ada", "age": 36, "remote": true}), 0.9),
            result(json!({"name": "Linus", "tags": ["kernel", "git"]}), 0.5),
        ]);

        assert_eq!(
            context,
            "Response 1: name: Ada, age: 36, remote: true\n\n\
             Response 2: name: Linus, tags: [\"kernel\",\"git\"]"
        );
    }

    #[test]
    fn test_assemble_empty_and_scalar() {
        assert_eq!(assemble(&[]), "");
        assert_eq!(assemble(&[result(json!("just text"), 1.0)]), "Response 1: just text");
        assert_eq!(assemble(&[result(json!({"note": null}), 1.0)]), "Response 1: note: null");
    }

    #[test]
    fn test_blocks_follow_rank_order() {
        let items = vec![
            (json!({"color": "red"}), vec![1.0f32, 0.0]),
            (json!({"color": "blue"}), vec![0.0f32, 1.0]),
        ];
        let ranked = rank(
            &[0.1, 0.9],
            items.iter().map(|(d, v)| (d, v.as_slice())),
            2,
        )
        .unwrap();

        let context = assemble(&ranked);
        let blocks: Vec<&str> = context.split("\n\n").collect();
        assert_eq!(blocks.len(), ranked.len());
        assert_eq!(blocks[0], "Response 1: color: blue");
        assert_eq!(blocks[1], "Response 2: color: red");
    }
}
