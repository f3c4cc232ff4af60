use serde_json::Value;

/// Field carrying a client-supplied id in import payloads and listings.
pub const ID_FIELD: &str = "@id";

/// Generate an id for a document the client did not name.
pub fn generate() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Render a JSON scalar as an id. Objects, arrays, null and empty strings
/// do not make usable ids.
pub fn scalar_to_id(value: &Value) -> Option<String> {
    let id = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!id.is_empty()).then_some(id)
}

/// Where to find a document's id inside its own content.
///
/// A path starting with `/` is a JSON pointer (`/meta/isbn`). Anything else
/// is a field name looked up depth-first through nested objects and arrays;
/// the first match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPath(String);

impl IdPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn resolve(&self, document: &Value) -> Option<String> {
        let found = if self.0.starts_with('/') {
            document.pointer(&self.0)
        } else {
            find_field(document, &self.0)
        };
        found.and_then(scalar_to_id)
    }
}

impl std::fmt::Display for IdPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn find_field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(name).or_else(|| {
            map.values().find_map(|child| find_field(child, name))
        }),
        Value::Array(items) => {
            items.iter().find_map(|child| find_field(child, name))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = generate();
        let b = generate();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn top_level_field() {
        let path = IdPath::new("isbn");
        assert_eq!(
            path.resolve(&json!({"isbn": "978-0441013593"})),
            Some("978-0441013593".to_string())
        );
    }

    #[test]
    fn nested_field_is_found_depth_first() {
        let path = IdPath::new("isbn");
        let doc = json!({
            "title": "Dune",
            "editions": [{"year": 1965}, {"isbn": "first"}],
            "meta": {"isbn": "second"}
        });
        assert_eq!(path.resolve(&doc), Some("first".to_string()));

        // Direct children win before descending.
        let shallow = json!({"a": {"isbn": 2}, "isbn": 1});
        assert_eq!(path.resolve(&shallow), Some("1".to_string()));
    }

    #[test]
    fn json_pointer() {
        let path = IdPath::new("/meta/key");
        assert_eq!(
            path.resolve(&json!({"meta": {"key": 42}})),
            Some("42".to_string())
        );
        assert_eq!(path.resolve(&json!({"key": 42})), None);
    }

    #[test]
    fn unusable_values_do_not_resolve() {
        let path = IdPath::new("key");
        assert_eq!(path.resolve(&json!({"key": null})), None);
        assert_eq!(path.resolve(&json!({"key": ""})), None);
        assert_eq!(path.resolve(&json!({"key": {"a": 1}})), None);
        assert_eq!(path.resolve(&json!({"key": [1]})), None);
        assert_eq!(path.resolve(&json!({"other": 1})), None);
    }

    #[test]
    fn scalar_ids() {
        assert_eq!(scalar_to_id(&json!("a")), Some("a".into()));
        assert_eq!(scalar_to_id(&json!(7)), Some("7".into()));
        assert_eq!(scalar_to_id(&json!(true)), Some("true".into()));
        assert_eq!(scalar_to_id(&json!(null)), None);
    }
}
