//! One-line descriptions of change records, such as
//! "assignment removed from module body".

use dast_diff::{ChangeRecord, ChangeSet};
use dast_types::{Path, PathStep, Value};

use crate::layout::Layout;
use crate::unparse;

/// Describe every record of a change set, in order.
pub fn summarize(changes: &ChangeSet, before: &Value, layout: &dyn Layout) -> Vec<String> {
    changes
        .iter()
        .map(|record| describe(record, before, layout))
        .collect()
}

/// Describe one record. The enclosing element is looked up in the before
/// tree, which every interior path step addresses.
pub fn describe(record: &ChangeRecord, before: &Value, layout: &dyn Layout) -> String {
    let owner = before
        .resolve(&owner_path(record.path()))
        .map_or_else(|| "tree".to_string(), |v| describe_value(v, layout));

    match record {
        ChangeRecord::Added { value, .. } => {
            format!("{} added to {owner}", describe_value(value, layout))
        }
        ChangeRecord::Removed { value, .. } => {
            format!("{} removed from {owner}", describe_value(value, layout))
        }
        ChangeRecord::Changed { old, .. } => {
            format!("{} changed in {owner}", describe_value(old, layout))
        }
        ChangeRecord::Reordered { mapping, .. } => {
            let noun = if mapping.len() == 1 { "element" } else { "elements" };
            format!("{} {noun} reordered in {owner}", mapping.len())
        }
    }
}

/// The path up to, but excluding, the last field step.
fn owner_path(path: &Path) -> Path {
    let steps = path.steps();
    let end = steps
        .iter()
        .rposition(|step| matches!(step, PathStep::Field(_)))
        .unwrap_or(0);
    Path::from_steps(steps[..end].to_vec())
}

/// Short human name of a value.
pub fn describe_value(value: &Value, layout: &dyn Layout) -> String {
    let node = match value {
        Value::Node(node) => node,
        Value::Scalar(s) => return format!("value {}", s.literal()),
        Value::Seq(_) => return "list".to_string(),
    };
    let name = || match node.field("name") {
        Value::Scalar(dast_types::Scalar::Str(s)) => s.clone(),
        other => unparse(other, layout),
    };

    match node.kind.as_str() {
        "Module" => "module body".to_string(),
        "Expr" => describe_value(node.field("value"), layout),
        "ClassDef" => format!("class '{}'", name()),
        "FunctionDef" | "AsyncFunctionDef" => format!("function definition '{}'", name()),
        "If" => "if statement".to_string(),
        "For" | "AsyncFor" => "for loop".to_string(),
        "While" => "while loop".to_string(),
        "Assign" => "assignment".to_string(),
        "AugAssign" => "augmented assignment".to_string(),
        "Return" => "return statement".to_string(),
        "Import" | "ImportFrom" => "import".to_string(),
        "Call" => format!("call to function {}", unparse(node.field("func"), layout)),
        "keyword" => "keyword".to_string(),
        "Name" => "variable".to_string(),
        "Constant" => "constant".to_string(),
        "arguments" => "parameter list".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PythonLayout;
    use dast_diff::{diff, DiffConfig};
    use serde_json::json;

    fn parse(json: serde_json::Value) -> Value {
        Value::from_json(&json).unwrap()
    }

    fn module(body: serde_json::Value) -> Value {
        parse(json!({"_type": "Module", "body": body}))
    }

    fn print_call(arg: &str) -> serde_json::Value {
        json!({"_type": "Expr", "value": {
            "_type": "Call",
            "func": {"_type": "Name", "id": "print"},
            "args": [{"_type": "Name", "id": arg}],
            "keywords": []
        }})
    }

    fn assign(target: &str, value: i64) -> serde_json::Value {
        json!({
            "_type": "Assign",
            "targets": [{"_type": "Name", "id": target}],
            "value": {"_type": "Constant", "value": value}
        })
    }

    fn sentences(before: &Value, after: &Value) -> Vec<String> {
        let changes = diff(before, after, &DiffConfig::default()).unwrap();
        summarize(&changes, before, &PythonLayout::new())
    }

    #[test]
    fn statement_level_changes() {
        let before = module(json!([assign("x", 1), print_call("x")]));
        let after = module(json!([print_call("x"), print_call("y")]));
        assert_eq!(
            sentences(&before, &after),
            vec![
                "assignment removed from module body",
                "call to function print added to module body",
            ]
        );
    }

    #[test]
    fn field_changes_name_their_owner() {
        let before = module(json!([assign("x", 1)]));
        let after = module(json!([assign("x", 2)]));
        assert_eq!(
            sentences(&before, &after),
            vec!["value 1 changed in constant"]
        );
    }

    #[test]
    fn reorders_count_elements() {
        let before = module(json!([assign("x", 1), print_call("x")]));
        let after = module(json!([print_call("x"), assign("x", 1)]));
        assert_eq!(
            sentences(&before, &after),
            vec!["2 elements reordered in module body"]
        );
    }

    #[test]
    fn function_definitions_are_named() {
        let def = parse(json!({"_type": "FunctionDef", "name": "main", "body": []}));
        assert_eq!(
            describe_value(&def, &PythonLayout::new()),
            "function definition 'main'"
        );
    }
}
