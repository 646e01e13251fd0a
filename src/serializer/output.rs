use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer as SerdeSerializer};
use serde_json::Value as JsonValue;

/// 序列化输出
///
/// 与 `serde_json::Value` 的区别在于 `Undefined`：对象中的 key 存在但值为 undefined，
/// 与 key 不存在是两种状态。
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Undefined,
    Value(JsonValue),
    Object(OutputObject),
    Array(Vec<Output>),
}

impl Output {
    pub fn null() -> Self {
        Output::Value(JsonValue::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Output::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Output::Value(JsonValue::Null))
    }

    pub fn as_object(&self) -> Option<&OutputObject> {
        match self {
            Output::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Output]> {
        match self {
            Output::Array(items) => Some(items),
            _ => None,
        }
    }

    /// 按路径取对象成员
    pub fn get(&self, key: &str) -> Option<&Output> {
        self.as_object().and_then(|obj| obj.get(key))
    }

    /// 转换为 JSON：对象中的 undefined 成员被丢弃，其余位置的 undefined 变为 null
    pub fn to_json(&self) -> JsonValue {
        match self {
            Output::Undefined => JsonValue::Null,
            Output::Value(value) => value.clone(),
            Output::Object(obj) => JsonValue::Object(
                obj.iter()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Output::Array(items) => JsonValue::Array(items.iter().map(Output::to_json).collect()),
        }
    }
}

impl From<JsonValue> for Output {
    fn from(value: JsonValue) -> Self {
        Output::Value(value)
    }
}

impl From<Option<JsonValue>> for Output {
    fn from(value: Option<JsonValue>) -> Self {
        value.map_or(Output::Undefined, Output::Value)
    }
}

impl From<OutputObject> for Output {
    fn from(obj: OutputObject) -> Self {
        Output::Object(obj)
    }
}

impl From<Vec<Output>> for Output {
    fn from(items: Vec<Output>) -> Self {
        Output::Array(items)
    }
}

impl Serialize for Output {
    fn serialize<S: SerdeSerializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Output::Undefined => serializer.serialize_unit(),
            Output::Value(value) => value.serialize(serializer),
            Output::Object(obj) => obj.serialize(serializer),
            Output::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// 保持插入顺序的输出对象
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputObject {
    entries: IndexMap<String, Output>,
}

impl OutputObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入成员；已存在的 key 保持原位置
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Output>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Output> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Output)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for OutputObject {
    fn serialize<S: SerdeSerializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let defined = self.entries.values().filter(|v| !v.is_undefined()).count();
        let mut map = serializer.serialize_map(Some(defined))?;
        for (key, value) in self.entries.iter().filter(|(_, v)| !v.is_undefined()) {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Output {
        let mut obj = OutputObject::new();
        obj.insert("id", json!(1));
        obj.insert("gone", Output::Undefined);
        obj.insert("tags", Output::Array(vec![Output::Undefined, json!("a").into()]));
        Output::Object(obj)
    }

    #[test]
    fn test_undefined_key_is_kept_in_object() {
        let output = sample();
        let obj = output.as_object().unwrap();

        assert!(obj.contains_key("gone"));
        assert!(obj.get("gone").unwrap().is_undefined());
        assert_eq!(obj.keys().collect::<Vec<_>>(), vec!["id", "gone", "tags"]);
    }

    #[test]
    fn test_to_json_drops_undefined_members() {
        assert_eq!(sample().to_json(), json!({"id": 1, "tags": [null, "a"]}));
        assert_eq!(Output::Undefined.to_json(), JsonValue::Null);
    }

    #[test]
    fn test_serialize_matches_to_json() -> anyhow::Result<()> {
        let output = sample();
        let text = serde_json::to_string(&output)?;
        assert_eq!(serde_json::from_str::<JsonValue>(&text)?, output.to_json());
        Ok(())
    }
}
