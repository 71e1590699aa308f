//! Chunk framing for streamed tool results
//!
//! Tools still run once; a result carrying a `streaming_content` array is split
//! into one chunk per element, in order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STREAMING_CONTENT_KEY: &str = "streaming_content";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChunk {
    pub index: usize,
    pub total: usize,
    pub is_last: bool,
    pub content: Value,
}

/// Splits `result.streaming_content` into chunks; anything else yields none.
pub fn chunk_result(result: &Value) -> Vec<StreamChunk> {
    let Some(items) = result.get(STREAMING_CONTENT_KEY).and_then(Value::as_array) else {
        return Vec::new();
    };

    let total = items.len();
    items
        .iter()
        .enumerate()
        .map(|(index, content)| StreamChunk {
            index,
            total,
            is_last: index + 1 == total,
            content: content.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn indices_are_contiguous_and_last_is_flagged_once() {
        for n in [1usize, 2, 5] {
            let items: Vec<Value> = (0..n).map(|i| json!({"section": i})).collect();
            let chunks = chunk_result(&json!({ "streaming_content": items }));

            let indices: Vec<usize> = chunks.iter().map(|chunk| chunk.index).collect();
            assert_eq!(indices, (0..n).collect::<Vec<_>>());
            assert_eq!(chunks.iter().filter(|chunk| chunk.is_last).count(), 1);
            assert!(chunks[n - 1].is_last);
            assert!(chunks.iter().all(|chunk| chunk.total == n));
        }
    }

    #[test]
    fn results_without_streaming_content_have_no_chunks() {
        assert!(chunk_result(&json!({"status": "completed"})).is_empty());
        assert!(chunk_result(&json!({"streaming_content": "text"})).is_empty());
        assert!(chunk_result(&json!({"streaming_content": []})).is_empty());
    }

    #[test]
    fn chunk_serializes_is_last_in_camel_case() {
        let chunk = &chunk_result(&json!({"streaming_content": ["only"]}))[0];
        let value = serde_json::to_value(chunk).expect("serialize");

        assert_eq!(value["isLast"], true);
        assert_eq!(value["content"], "only");
    }
}
