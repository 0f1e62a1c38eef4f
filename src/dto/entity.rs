use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A generic Octane record: a type tag, an optional id, and an ordered bag of
/// named fields.
///
/// Pipeline-metadata endpoints return heterogeneous records whose fields vary
/// per entity type and per requested projection, so they are kept dynamic
/// rather than modeled as one struct per type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: IndexMap<String, Value>,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: None,
            fields: IndexMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// Standard list envelope for entity collection responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityList {
    pub data: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_dynamic_fields() {
        let mut entity = Entity::new("pipeline").with_id("1007");
        entity.set("name", "nightly").set("root_job_ci_id", "job-a");

        assert_eq!(entity.get_str("name"), Some("nightly"));
        assert_eq!(entity.get("missing"), None);

        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["type"], "pipeline");
        assert_eq!(json["id"], "1007");
        assert_eq!(json["name"], "nightly");
    }

    #[test]
    fn test_entity_list_decodes() {
        let json = r#"{
            "total_count": 2,
            "data": [
                {"type": "pipeline", "id": "1", "name": "a"},
                {"type": "pipeline", "id": "2", "name": "b"}
            ]
        }"#;
        let list: EntityList = serde_json::from_str(json).unwrap();
        assert_eq!(list.total_count, Some(2));
        assert_eq!(list.data.len(), 2);
        assert_eq!(list.data[1].get_str("name"), Some("b"));
    }

    #[test]
    fn test_field_order_preserved() {
        let mut entity = Entity::new("ci_build");
        entity.set("z", 1).set("a", 2).set("m", 3);
        let keys: Vec<_> = entity.fields.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
