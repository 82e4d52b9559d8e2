//! Maps untrusted model JSON onto a typed shape.
//!
//! Models omit fields and mistype others. Rather than scattering
//! `field.unwrap_or(default)` at every call site, each expected shape
//! implements `Default` and `coerce` keeps every incoming field that still
//! deserializes, falling back to the default for the rest.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Deserializes `value` into `T`, replacing missing or mistyped fields with
/// the corresponding field of `T::default()`.
///
/// Nested objects, including objects inside arrays, are merged field by
/// field. Array elements that are not objects and do not fit are dropped.
/// Fields sent under a serde alias are kept.
pub fn coerce<T>(value: Value) -> T
where
    T: DeserializeOwned + Serialize + Default,
{
    if let Ok(typed) = serde_json::from_value::<T>(value.clone()) {
        return typed;
    }

    let defaults = T::default();
    let Value::Object(incoming) = value else {
        tracing::warn!("model returned a non-object where an object was expected, using defaults");
        return defaults;
    };
    let Ok(mut merged) = serde_json::to_value(&defaults) else {
        return defaults;
    };
    if !merged.is_object() {
        return defaults;
    }

    let accepts = |candidate: &Value| serde_json::from_value::<T>(candidate.clone()).is_ok();
    overlay(&mut merged, "", incoming, &accepts);

    serde_json::from_value(merged).unwrap_or(defaults)
}

fn overlay<F>(root: &mut Value, pointer: &str, incoming: Map<String, Value>, accepts: &F)
where
    F: Fn(&Value) -> bool,
{
    drop_unmentioned_keys(root, pointer, &incoming, accepts);

    for (key, candidate) in incoming {
        let child = child_pointer(pointer, &key);
        let previous = root.pointer(&child).cloned();

        match (previous, candidate) {
            (Some(Value::Object(_)), Value::Object(nested)) => {
                overlay(root, &child, nested, accepts);
            }
            (previous, Value::Object(nested)) => {
                let whole = Value::Object(nested.clone());
                if !try_set(root, pointer, &key, whole, previous.as_ref(), accepts)
                    && try_set(root, pointer, &key, Value::Object(Map::new()), previous.as_ref(), accepts)
                {
                    overlay(root, &child, nested, accepts);
                }
            }
            (previous, Value::Array(items)) => {
                if !try_set(root, pointer, &key, Value::Array(items.clone()), previous.as_ref(), accepts) {
                    keep_fitting_items(root, pointer, &key, items, previous, accepts);
                }
            }
            (previous, candidate) => {
                try_set(root, pointer, &key, candidate, previous.as_ref(), accepts);
            }
        }
    }
}

fn child_pointer(parent: &str, key: &str) -> String {
    format!("{parent}/{}", key.replace('~', "~0").replace('/', "~1"))
}

/// Removes defaulted keys the model did not send, as long as the document
/// still deserializes without them. An aliased field then arrives under its
/// alias alone instead of clashing with the canonical default key.
fn drop_unmentioned_keys<F>(root: &mut Value, pointer: &str, incoming: &Map<String, Value>, accepts: &F)
where
    F: Fn(&Value) -> bool,
{
    let Some(Value::Object(map)) = root.pointer(pointer) else {
        return;
    };
    let unmentioned: Vec<String> = map
        .keys()
        .filter(|key| !incoming.contains_key(*key))
        .cloned()
        .collect();

    for key in unmentioned {
        let Some(Value::Object(map)) = root.pointer_mut(pointer) else {
            return;
        };
        let Some(removed) = map.remove(&key) else {
            continue;
        };
        if !accepts(root) {
            if let Some(Value::Object(map)) = root.pointer_mut(pointer) {
                map.insert(key, removed);
            }
        }
    }
}

/// Sets `parent[key] = candidate`, reverting if the whole document no
/// longer deserializes.
fn try_set<F>(
    root: &mut Value,
    parent: &str,
    key: &str,
    candidate: Value,
    previous: Option<&Value>,
    accepts: &F,
) -> bool
where
    F: Fn(&Value) -> bool,
{
    let Some(Value::Object(map)) = root.pointer_mut(parent) else {
        return false;
    };
    map.insert(key.to_string(), candidate);
    if accepts(root) {
        return true;
    }

    if let Some(Value::Object(map)) = root.pointer_mut(parent) {
        match previous {
            Some(previous) => map.insert(key.to_string(), previous.clone()),
            None => map.remove(key),
        };
    }
    false
}

/// Rebuilds `parent[key]` element by element. Objects that do not fit as a
/// whole start from the element's defaults and are merged field by field;
/// other misfits are dropped.
fn keep_fitting_items<F>(
    root: &mut Value,
    parent: &str,
    key: &str,
    items: Vec<Value>,
    previous: Option<Value>,
    accepts: &F,
) where
    F: Fn(&Value) -> bool,
{
    if !try_set(root, parent, key, Value::Array(Vec::new()), previous.as_ref(), accepts) {
        return;
    }
    let pointer = child_pointer(parent, key);

    for item in items {
        let Some(Value::Array(list)) = root.pointer_mut(&pointer) else {
            return;
        };
        list.push(item.clone());
        if accepts(root) {
            continue;
        }

        let Some(Value::Array(list)) = root.pointer_mut(&pointer) else {
            return;
        };
        list.pop();
        let Value::Object(fields) = item else {
            continue;
        };
        list.push(Value::Object(Map::new()));
        let index = list.len() - 1;
        if accepts(root) {
            overlay(root, &format!("{pointer}/{index}"), fields, accepts);
        } else if let Some(Value::Array(list)) = root.pointer_mut(&pointer) {
            list.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Tool {
        name: String,
        price: f64,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Kit {
        title: String,
        servings: u32,
        vegetarian: bool,
        tools: Vec<Tool>,
        owner: Tool,
        spare: Option<Tool>,
    }

    #[test]
    fn well_formed_input_is_kept() {
        let kit: Kit = coerce(json!({
            "title": "Starter",
            "servings": 2,
            "vegetarian": true,
            "tools": [{"name": "whisk", "price": 4.5}],
            "owner": {"name": "sam", "price": 0.0}
        }));
        assert_eq!(kit.title, "Starter");
        assert_eq!(kit.tools.len(), 1);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let kit: Kit = coerce(json!({"title": "Only title"}));
        assert_eq!(
            kit,
            Kit {
                title: "Only title".to_string(),
                ..Kit::default()
            }
        );
    }

    #[test]
    fn mistyped_fields_take_defaults() {
        let kit: Kit = coerce(json!({
            "title": "Mixed",
            "servings": "four",
            "vegetarian": null,
        }));
        assert_eq!(kit.title, "Mixed");
        assert_eq!(kit.servings, 0);
        assert!(!kit.vegetarian);
    }

    #[test]
    fn nested_objects_merge_per_field() {
        let kit: Kit = coerce(json!({
            "servings": -1,
            "owner": {"name": "ana", "price": "free"}
        }));
        assert_eq!(kit.owner.name, "ana");
        assert_eq!(kit.owner.price, 0.0);
        assert_eq!(kit.servings, 0);
    }

    #[test]
    fn arrays_keep_fitting_items() {
        let kit: Kit = coerce(json!({
            "servings": "x",
            "tools": [{"name": "pan"}, 42, {"name": "knife", "price": 12}]
        }));
        let names: Vec<_> = kit.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["pan", "knife"]);
    }

    #[test]
    fn array_objects_default_only_their_bad_fields() {
        let kit: Kit = coerce(json!({
            "servings": "x",
            "tools": [{"name": "grater", "price": "cheap"}, "spoon", {"name": "knife", "price": 12}]
        }));
        assert_eq!(
            kit.tools,
            vec![
                Tool {
                    name: "grater".to_string(),
                    price: 0.0
                },
                Tool {
                    name: "knife".to_string(),
                    price: 12.0
                },
            ]
        );
    }

    #[test]
    fn object_over_an_empty_default_merges_per_field() {
        let kit: Kit = coerce(json!({
            "vegetarian": "yes",
            "spare": {"name": "peeler", "price": [1]}
        }));
        assert_eq!(
            kit.spare,
            Some(Tool {
                name: "peeler".to_string(),
                price: 0.0
            })
        );
        assert!(!kit.vegetarian);
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Titled {
        #[serde(alias = "title")]
        recipe_title: String,
        steps: Vec<String>,
        servings: u32,
    }

    #[test]
    fn aliased_fields_survive_a_mistyped_sibling() {
        let titled: Titled = coerce(json!({
            "title": "Pancakes",
            "steps": "none",
            "servings": 2
        }));
        assert_eq!(titled.recipe_title, "Pancakes");
        assert!(titled.steps.is_empty());
        assert_eq!(titled.servings, 2);
    }

    #[test]
    fn non_objects_become_defaults() {
        let kit: Kit = coerce(json!(["not", "an", "object"]));
        assert_eq!(kit, Kit::default());
    }
}
