//! Dotted-path access into nested JSON values.
//!
//! Paths address object keys separated by `.`: `Request.Headers.Authorization`.
//! A segment first matches a key exactly, then ASCII case-insensitively, so
//! paths written with canonical header casing still find the lowercase names
//! hyper hands us. Arrays are addressed by index segments (`Traces.0.Message`).

use serde_json::{Map, Value};

/// Returns the value at `path`, if any.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = root;
    for segment in split(path) {
        cur = child(cur, segment)?;
    }
    Some(cur)
}

/// Sets `value` at `path`, creating intermediate objects as needed.
///
/// Returns `false` when a non-object value blocks the path.
pub fn set_path(root: &mut Value, path: &str, value: Value) -> bool {
    let segments: Vec<&str> = split(path).collect();
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut cur = root;
    for segment in parents {
        if cur.is_null() {
            *cur = Value::Object(Map::new());
        }
        let Value::Object(map) = cur else {
            return false;
        };
        let key = existing_key(map, segment).unwrap_or_else(|| (*segment).to_owned());
        cur = map.entry(key).or_insert(Value::Object(Map::new()));
    }

    if cur.is_null() {
        *cur = Value::Object(Map::new());
    }
    match cur {
        Value::Object(map) => {
            let key = existing_key(map, last).unwrap_or_else(|| (*last).to_owned());
            map.insert(key, value);
            true
        }
        _ => false,
    }
}

/// Replaces the value at `path` only if it already exists.
pub fn replace_path(root: &mut Value, path: &str, value: Value) -> bool {
    match get_path_mut(root, path) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

/// Removes the value at `path`, returning it.
pub fn remove_path(root: &mut Value, path: &str) -> Option<Value> {
    let segments: Vec<&str> = split(path).collect();
    let (last, parents) = segments.split_last()?;

    let mut cur = root;
    for segment in parents {
        cur = child_mut(cur, segment)?;
    }
    match cur {
        Value::Object(map) => {
            let key = existing_key(map, last)?;
            map.remove(&key)
        }
        Value::Array(items) => {
            let idx: usize = last.parse().ok()?;
            (idx < items.len()).then(|| items.remove(idx))
        }
        _ => None,
    }
}

/// Applies [`replace_path`] with `marker` to every path.
pub fn mask_paths<S: AsRef<str>>(root: &mut Value, paths: &[S], marker: &str) {
    for path in paths {
        replace_path(root, path.as_ref(), Value::String(marker.to_owned()));
    }
}

/// Applies [`remove_path`] to every path.
pub fn omit_paths<S: AsRef<str>>(root: &mut Value, paths: &[S]) {
    for path in paths {
        remove_path(root, path.as_ref());
    }
}

fn get_path_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut cur = root;
    for segment in split(path) {
        cur = child_mut(cur, segment)?;
    }
    Some(cur)
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|s| !s.is_empty())
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(&existing_key(map, segment)?),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => {
            let key = existing_key(map, segment)?;
            map.get_mut(&key)
        }
        Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn existing_key(map: &Map<String, Value>, segment: &str) -> Option<String> {
    if map.contains_key(segment) {
        return Some(segment.to_owned());
    }
    map.keys().find(|k| k.eq_ignore_ascii_case(segment)).cloned()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record() -> Value {
        json!({
            "Name": "logger.application",
            "Request": {
                "Headers": {"authorization": "Bearer abc", "accept": "*/*"},
                "Body": {"password": "hunter2", "user": "alice"}
            },
            "Traces": [{"Message": "hello"}]
        })
    }

    #[test]
    fn get_follows_objects_and_arrays() {
        let v = record();
        assert_eq!(get_path(&v, "Request.Body.user"), Some(&json!("alice")));
        assert_eq!(get_path(&v, "Traces.0.Message"), Some(&json!("hello")));
        assert_eq!(get_path(&v, "Request.Missing"), None);
    }

    #[test]
    fn segments_fall_back_to_case_insensitive_keys() {
        let v = record();
        assert_eq!(get_path(&v, "Request.Headers.Authorization"), Some(&json!("Bearer abc")));
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut v = json!({});
        assert!(set_path(&mut v, "a.b.c", json!(1)));
        assert_eq!(v, json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn set_refuses_to_overwrite_scalars_on_the_way() {
        let mut v = json!({"a": 5});
        assert!(!set_path(&mut v, "a.b", json!(1)));
        assert_eq!(v, json!({"a": 5}));
    }

    #[test]
    fn replace_only_touches_existing_values() {
        let mut v = record();
        assert!(replace_path(&mut v, "Request.Body.password", json!("******")));
        assert!(!replace_path(&mut v, "Request.Body.token", json!("******")));
        assert_eq!(v["Request"]["Body"], json!({"password": "******", "user": "alice"}));
    }

    #[test]
    fn remove_drops_the_subtree() {
        let mut v = record();
        assert_eq!(remove_path(&mut v, "Request.Body").unwrap()["user"], json!("alice"));
        assert!(get_path(&v, "Request.Body").is_none());
        assert!(get_path(&v, "Request.Headers").is_some());
        assert!(remove_path(&mut v, "Request.Body").is_none());
    }

    #[test]
    fn mask_then_omit_leaves_siblings_alone() {
        let mut v = record();
        mask_paths(&mut v, &["Request.Headers.Authorization"], "******");
        omit_paths(&mut v, &["Request.Body"]);
        assert_eq!(
            v["Request"],
            json!({"Headers": {"authorization": "******", "accept": "*/*"}})
        );
    }
}
