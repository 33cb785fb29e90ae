use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{Geometry, RawAnnotationItem};

/// Result list pulled out of a parsed export, plus which shape rule found it.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub rule: Option<&'static str>,
    pub entries: Vec<Value>,
}

impl Extraction {
    pub fn rule_name(&self) -> &'static str {
        self.rule.unwrap_or("none")
    }
}

struct ShapeRule {
    name: &'static str,
    matches: fn(&Value) -> bool,
    extract: fn(&Value) -> Option<&Value>,
}

// Evaluated in order; the first matching rule wins. New export layouts are
// appended here.
const SHAPE_RULES: &[ShapeRule] = &[
    ShapeRule {
        name: "task_list_annotations",
        matches: |doc| {
            first_element(doc).is_some_and(|first| first.get("annotations").is_some())
        },
        extract: |doc| first_element(doc).and_then(first_annotation_result),
    },
    ShapeRule {
        name: "task_list_result",
        matches: |doc| first_element(doc).is_some_and(|first| first.get("result").is_some()),
        extract: |doc| first_element(doc).and_then(|first| first.get("result")),
    },
    ShapeRule {
        name: "result_list",
        matches: Value::is_array,
        extract: |doc| Some(doc),
    },
    ShapeRule {
        name: "task_annotations",
        matches: |doc| doc.is_object() && doc.get("annotations").is_some(),
        extract: first_annotation_result,
    },
    ShapeRule {
        name: "task_result",
        matches: |doc| doc.is_object() && doc.get("result").is_some(),
        extract: |doc| doc.get("result"),
    },
];

fn first_element(doc: &Value) -> Option<&Value> {
    doc.as_array().and_then(|items| items.first())
}

fn first_annotation_result(task: &Value) -> Option<&Value> {
    task.get("annotations")
        .and_then(Value::as_array)
        .and_then(|annotations| annotations.first())
        .and_then(|annotation| annotation.get("result"))
}

pub fn extract_results(document: &Value) -> Extraction {
    let Some(rule) = SHAPE_RULES.iter().find(|rule| (rule.matches)(document)) else {
        warn!("unrecognized export shape; treating result list as empty");
        return Extraction::default();
    };

    let entries = match (rule.extract)(document) {
        Some(Value::Array(entries)) => entries.clone(),
        Some(other) => {
            warn!(
                rule = rule.name,
                found = json_kind(other),
                "result field is not a list; treating as empty"
            );
            Vec::new()
        }
        None => {
            debug!(rule = rule.name, "matched shape has no result list");
            Vec::new()
        }
    };

    debug!(rule = rule.name, entries = entries.len(), "extracted result list");

    Extraction {
        rule: Some(rule.name),
        entries,
    }
}

pub fn decode_item(entry: &Value) -> RawAnnotationItem {
    let value = entry.get("value");
    let number = |key: &str| {
        value
            .and_then(|value| value.get(key))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    };

    let raw_labels = value
        .and_then(|value| value.get("rectanglelabels"))
        .and_then(Value::as_array)
        .map(|labels| {
            labels
                .iter()
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default();

    RawAnnotationItem {
        kind: entry
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        geometry: Geometry {
            x: number("x"),
            y: number("y"),
            width: number("width"),
            height: number("height"),
        },
        raw_labels,
        explicit_score: entry.get("score").and_then(Value::as_f64),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rect(label: &str) -> Value {
        json!({"type": "rectanglelabels", "value": {"rectanglelabels": [label]}})
    }

    #[test]
    fn task_list_with_annotations_uses_first_annotation() {
        let doc = json!([
            {"annotations": [{"result": [rect("a"), rect("b")]}, {"result": [rect("c")]}]},
            {"annotations": [{"result": [rect("d")]}]}
        ]);
        let extraction = extract_results(&doc);
        assert_eq!(extraction.rule, Some("task_list_annotations"));
        assert_eq!(extraction.entries.len(), 2);
    }

    #[test]
    fn task_list_with_direct_result() {
        let doc = json!([{"result": [rect("a")]}]);
        let extraction = extract_results(&doc);
        assert_eq!(extraction.rule, Some("task_list_result"));
        assert_eq!(extraction.entries.len(), 1);
    }

    #[test]
    fn bare_list_is_the_result_list() {
        let doc = json!([rect("a"), rect("b"), rect("c")]);
        let extraction = extract_results(&doc);
        assert_eq!(extraction.rule, Some("result_list"));
        assert_eq!(extraction.entries.len(), 3);
    }

    #[test]
    fn single_task_with_annotations() {
        let doc = json!({"id": 598, "annotations": [{"result": [rect("a")]}]});
        let extraction = extract_results(&doc);
        assert_eq!(extraction.rule, Some("task_annotations"));
        assert_eq!(extraction.entries.len(), 1);
    }

    #[test]
    fn single_task_with_empty_annotations_yields_nothing() {
        let doc = json!({"annotations": []});
        let extraction = extract_results(&doc);
        assert_eq!(extraction.rule, Some("task_annotations"));
        assert!(extraction.entries.is_empty());
    }

    #[test]
    fn single_object_with_result() {
        let doc = json!({"result": [rect("a"), rect("b")]});
        let extraction = extract_results(&doc);
        assert_eq!(extraction.rule, Some("task_result"));
        assert_eq!(extraction.entries.len(), 2);
    }

    #[test]
    fn unrecognized_shape_is_empty_not_error() {
        let extraction = extract_results(&json!({"data": {"image": "x.png"}}));
        assert_eq!(extraction.rule, None);
        assert_eq!(extraction.rule_name(), "none");
        assert!(extraction.entries.is_empty());
    }

    #[test]
    fn non_list_result_is_empty() {
        let extraction = extract_results(&json!({"result": "pending"}));
        assert_eq!(extraction.rule, Some("task_result"));
        assert!(extraction.entries.is_empty());
    }

    #[test]
    fn decode_item_reads_geometry_labels_and_score() {
        let entry = json!({
            "type": "rectanglelabels",
            "score": 0.87,
            "value": {
                "x": 10.5, "y": 20, "width": 3.25, "height": 4.0,
                "rectanglelabels": ["硬化肾小球", "肾小球"]
            }
        });
        let item = decode_item(&entry);
        assert!(item.is_rectangle());
        assert_eq!(
            item.geometry,
            Geometry {
                x: 10.5,
                y: 20.0,
                width: 3.25,
                height: 4.0
            }
        );
        assert_eq!(item.raw_labels, vec!["硬化肾小球", "肾小球"]);
        assert_eq!(item.explicit_score, Some(0.87));
    }

    #[test]
    fn decode_item_defaults_missing_fields() {
        let item = decode_item(&json!({"type": "polygonlabels"}));
        assert!(!item.is_rectangle());
        assert_eq!(item.geometry, Geometry::default());
        assert!(item.raw_labels.is_empty());
        assert_eq!(item.explicit_score, None);

        let item = decode_item(&json!(42));
        assert!(item.kind.is_empty());
    }
}
