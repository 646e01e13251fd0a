use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Number, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;

use crate::schema::{PropertyFormat, TransformFn};

/// 命名值格式化器注册表
///
/// 内置 `date`、`number`、`string`，名称大小写不敏感。
#[derive(Clone)]
pub struct ValueFormatters {
    formatters: HashMap<String, TransformFn>,
}

impl Default for ValueFormatters {
    fn default() -> Self {
        let mut formatters = Self::empty();
        formatters.register("date", format_date);
        formatters.register("number", format_number);
        formatters.register("string", format_string);
        formatters
    }
}

impl ValueFormatters {
    /// 不含内置格式化器的空注册表
    pub fn empty() -> Self {
        Self {
            formatters: HashMap::new(),
        }
    }

    /// 注册命名格式化器，同名覆盖
    pub fn register<F>(&mut self, name: &str, f: F)
    where
        F: Fn(Option<JsonValue>) -> Option<JsonValue> + Send + Sync + 'static,
    {
        self.formatters.insert(name.to_lowercase(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<&TransformFn> {
        self.formatters.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 按类型标签或自定义函数格式化；未注册的标签原样返回
    pub fn format_value(&self, format: &PropertyFormat, value: Option<JsonValue>) -> Option<JsonValue> {
        match format {
            PropertyFormat::Custom(f) => f(value),
            PropertyFormat::Named(name) => match self.get(name) {
                Some(f) => f(value),
                None => value,
            },
        }
    }

    /// 按 key 查找属性格式，没有声明则原样返回
    pub fn apply_property_format(
        &self,
        property_format: &HashMap<String, PropertyFormat>,
        key: &str,
        value: Option<JsonValue>,
    ) -> Option<JsonValue> {
        match property_format.get(key) {
            Some(format) => self.format_value(format, value),
            None => value,
        }
    }
}

/// 转为 ISO 8601 时间字符串；数字按毫秒时间戳解释，无法解析时为 null
pub fn format_date(value: Option<JsonValue>) -> Option<JsonValue> {
    let parsed = match value {
        Some(JsonValue::Number(n)) => n
            .as_f64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single()),
        Some(JsonValue::String(s)) => parse_date_str(s.trim()),
        _ => None,
    };

    Some(match parsed {
        Some(dt) => JsonValue::String(dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()),
        None => JsonValue::Null,
    })
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// 数值转换，null 保持 null，无法转换时为 null
pub fn format_number(value: Option<JsonValue>) -> Option<JsonValue> {
    let n = match value {
        Some(JsonValue::Null) => return Some(JsonValue::Null),
        Some(JsonValue::Number(n)) => return Some(JsonValue::Number(n)),
        Some(JsonValue::Bool(b)) => Some(if b { 1.0 } else { 0.0 }),
        Some(JsonValue::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                Some(0.0)
            } else {
                s.parse::<f64>().ok()
            }
        }
        _ => None,
    };

    Some(n.map_or(JsonValue::Null, number_to_json))
}

fn number_to_json(n: f64) -> JsonValue {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        JsonValue::from(n as i64)
    } else {
        Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
    }
}

/// 转为字符串，null 与缺失值原样返回
pub fn format_string(value: Option<JsonValue>) -> Option<JsonValue> {
    match value {
        None => None,
        Some(JsonValue::Null) => Some(JsonValue::Null),
        Some(JsonValue::String(s)) => Some(JsonValue::String(s)),
        Some(other) => Some(JsonValue::String(stringify(&other))),
    }
}

fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        JsonValue::Object(_) => "[object Object]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let formatters = ValueFormatters::default();
        assert!(formatters.contains("DATE"));
        assert!(formatters.contains("Number"));
        assert!(!formatters.contains("money"));
    }

    #[test]
    fn test_unregistered_tag_passes_through() {
        let formatters = ValueFormatters::default();
        let format = PropertyFormat::from("money");
        assert_eq!(formatters.format_value(&format, Some(json!(3))), Some(json!(3)));
    }

    #[test]
    fn test_custom_function_format() {
        let formatters = ValueFormatters::empty();
        let format = PropertyFormat::custom(|v| v.map(|v| json!(format!("<{}>", v))));
        assert_eq!(formatters.format_value(&format, Some(json!(1))), Some(json!("<1>")));
    }

    #[test]
    fn test_register_custom_named_formatter() {
        let mut formatters = ValueFormatters::default();
        formatters.register("Upper", |v| match v {
            Some(JsonValue::String(s)) => Some(json!(s.to_uppercase())),
            other => other,
        });
        let format = PropertyFormat::from("upper");
        assert_eq!(formatters.format_value(&format, Some(json!("al"))), Some(json!("AL")));
    }

    #[test]
    fn test_apply_property_format() {
        let formatters = ValueFormatters::default();
        let mut map = HashMap::new();
        map.insert("age".to_string(), PropertyFormat::from("number"));

        assert_eq!(formatters.apply_property_format(&map, "age", Some(json!("42"))), Some(json!(42)));
        assert_eq!(formatters.apply_property_format(&map, "name", Some(json!("42"))), Some(json!("42")));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(Some(JsonValue::Null)), Some(JsonValue::Null));
        assert_eq!(format_number(Some(json!(" 12 "))), Some(json!(12)));
        assert_eq!(format_number(Some(json!("1.5"))), Some(json!(1.5)));
        assert_eq!(format_number(Some(json!(""))), Some(json!(0)));
        assert_eq!(format_number(Some(json!(true))), Some(json!(1)));
        assert_eq!(format_number(Some(json!("abc"))), Some(JsonValue::Null));
        assert_eq!(format_number(None), Some(JsonValue::Null));
    }

    #[test]
    fn test_format_string_keeps_nulls() {
        assert_eq!(format_string(Some(JsonValue::Null)), Some(JsonValue::Null));
        assert_eq!(format_string(None), None);
        assert_eq!(format_string(Some(json!(7))), Some(json!("7")));
        assert_eq!(format_string(Some(json!(2.0))), Some(json!("2")));
        assert_eq!(format_string(Some(json!(false))), Some(json!("false")));
        assert_eq!(format_string(Some(json!([1, null, "a"]))), Some(json!("1,,a")));
        assert_eq!(format_string(Some(json!({"a": 1}))), Some(json!("[object Object]")));
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(Some(json!(0))), Some(json!("1970-01-01T00:00:00.000Z")));
        assert_eq!(
            format_date(Some(json!("2024-03-01"))),
            Some(json!("2024-03-01T00:00:00.000Z"))
        );
        assert_eq!(
            format_date(Some(json!("2024-03-01T08:30:00+08:00"))),
            Some(json!("2024-03-01T00:30:00.000Z"))
        );
        assert_eq!(
            format_date(Some(json!("2024-03-01 10:11:12"))),
            Some(json!("2024-03-01T10:11:12.000Z"))
        );
        assert_eq!(format_date(Some(json!("not a date"))), Some(JsonValue::Null));
        assert_eq!(format_date(Some(JsonValue::Null)), Some(JsonValue::Null));
    }
}
