use serde_json::{Map, Value};
use tracing::trace;

use crate::error::PathError;

/// Walk `path` through nested JSON objects.
///
/// A non-object value met before the path is exhausted counts as the next key being missing.
pub fn get_path<'a, K>(mapping: &'a Value, path: &[K]) -> Result<&'a Value, PathError>
where
    K: AsRef<str>,
{
    let mut current = mapping;
    for (depth, key) in path.iter().enumerate() {
        let key = key.as_ref();
        current = current
            .as_object()
            .and_then(|obj| obj.get(key))
            .ok_or_else(|| {
                trace!(target: "lapse.util.nested", key, depth, "key missing");
                PathError::KeyMissing(key.to_string())
            })?;
    }
    Ok(current)
}

/// Value under `key`, or `default` if absent.
pub fn safely_get<'a>(map: &'a Map<String, Value>, key: &str, default: &'a Value) -> &'a Value {
    map.get(key).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn resolves_every_depth() {
        let map = json!({"a": {"b": 2}});

        assert_eq!(get_path(&json!({"a": 1}), &["a"]).unwrap(), &json!(1));
        assert_eq!(get_path(&map, &["a"]).unwrap(), &json!({"b": 2}));
        assert_eq!(get_path(&map, &["a", "b"]).unwrap(), &json!(2));
    }

    #[test]
    fn empty_path_returns_the_mapping() {
        let map = json!({"a": 1});
        let empty: [&str; 0] = [];
        assert_eq!(get_path(&map, &empty).unwrap(), &map);
    }

    #[test]
    fn missing_key_carries_the_offending_key() {
        assert_eq!(
            get_path(&json!({}), &["a"]),
            Err(PathError::KeyMissing("a".into()))
        );
        assert_eq!(
            get_path(&json!({"a": 1}), &["a", "b"]),
            Err(PathError::KeyMissing("b".into()))
        );
    }

    #[test]
    fn error_displays_as_bare_key() {
        let err = get_path(&json!({"a": {}}), &["a".to_string(), "z".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "z");
    }

    #[test]
    fn safely_get_falls_back_to_default() {
        let value = json!({"present": true});
        let map = value.as_object().unwrap();
        let fallback = Value::Null;

        assert_eq!(safely_get(map, "present", &fallback), &json!(true));
        assert_eq!(safely_get(map, "absent", &fallback), &Value::Null);
    }
}
