// Schema 注册表：按 (Model, Tag) 存放 schema，并提供字段名反查

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use crate::error::SchemaError;
use crate::format::ValueFormatters;
use crate::serializer::{
    Input, ModelSerializer, Options, OptionsPatch, Output, RawSerializer, SerializeOptions,
    Serializer, SerializerKind,
};

use super::core::{Fields, Model, Schema};

type SchemaKey = (String, String);

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Schema 注册表
///
/// 生命周期：创建一次，启动时注册，之后只读。每个 (Model, Tag) 只能注册一次，
/// 已注册的 schema 以 `Arc` 共享且不再修改。
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<SchemaKey, Arc<Schema>>>,
    models: RwLock<HashMap<String, Model>>,
    options: RwLock<Options>,
    formatters: RwLock<ValueFormatters>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 schema，(model, tag) 已存在时返回 `DuplicateSchema` 且保留原 schema
    pub fn try_define_schema(&self, model: &Model, schema: Schema, tag: &str) -> Result<(), SchemaError> {
        let key = (model.name().to_string(), tag.to_string());
        let mut schemas = write(&self.schemas);
        if schemas.contains_key(&key) {
            return Err(SchemaError::DuplicateSchema {
                model: key.0,
                tag: key.1,
            });
        }
        schemas.insert(key, Arc::new(schema));
        drop(schemas);

        write(&self.models)
            .entry(model.name().to_string())
            .or_insert_with(|| model.clone());

        debug!(model = model.name(), tag, "schema defined");
        Ok(())
    }

    /// 注册 schema，重复注册时记录日志并返回 false
    pub fn define_schema(&self, model: &Model, schema: Schema, tag: &str) -> bool {
        match self.try_define_schema(model, schema, tag) {
            Ok(()) => true,
            Err(e) => {
                warn!(model = model.name(), tag, "failed defining schema: {}", e);
                false
            }
        }
    }

    /// 按顺序尝试每个 tag，返回第一个找到的 schema；不会自动回退到 `default`
    pub fn get_schema<T: AsRef<str>>(&self, model: &str, tags: &[T]) -> Option<Arc<Schema>> {
        let schemas = read(&self.schemas);
        tags.iter().find_map(|tag| {
            schemas
                .get(&(model.to_string(), tag.as_ref().to_string()))
                .cloned()
        })
    }

    /// 已注册过 schema 的模型
    pub fn model(&self, name: &str) -> Option<Model> {
        read(&self.models).get(name).cloned()
    }

    /// 把外部字段名还原为 schema 内部 key；没有对应映射时原样返回
    pub fn resolve_field(&self, model: &str, field: &str, tag: &str) -> String {
        match self.get_schema(model, &[tag]) {
            Some(schema) => resolve_in(&schema.fields, field).to_string(),
            None => field.to_string(),
        }
    }

    /// 批量版本的 `resolve_field`，保持输入顺序
    pub fn resolve_fields<S: AsRef<str>>(&self, model: &str, fields: &[S], tag: &str) -> Vec<String> {
        let schema = self.get_schema(model, &[tag]);
        fields
            .iter()
            .map(|f| match &schema {
                Some(schema) => resolve_in(&schema.fields, f.as_ref()).to_string(),
                None => f.as_ref().to_string(),
            })
            .collect()
    }

    /// 把 payload 中的外部字段名就地改回内部 key，仅处理映射形式的 fields
    pub fn transform_model<'p>(&self, model: &str, payload: &'p mut JsonValue, tag: &str) -> &'p mut JsonValue {
        let Some(schema) = self.get_schema(model, &[tag]) else {
            return payload;
        };
        let (Fields::Map(entries), JsonValue::Object(obj)) = (&schema.fields, &mut *payload) else {
            return payload;
        };

        for (key, spec) in entries {
            let Some(changed) = spec.renamed_to() else {
                continue;
            };
            if changed == key {
                continue;
            }
            if let Some(value) = obj.remove(changed) {
                obj.insert(key.clone(), value);
            }
        }

        payload
    }

    /// 合并进程级默认选项
    pub fn set_options(&self, patch: &OptionsPatch) {
        write(&self.options).merge(patch);
    }

    pub fn options(&self) -> Options {
        read(&self.options).clone()
    }

    /// 注册命名值格式化器
    pub fn register_formatter<F>(&self, name: &str, f: F)
    where
        F: Fn(Option<JsonValue>) -> Option<JsonValue> + Send + Sync + 'static,
    {
        write(&self.formatters).register(name, f);
    }

    pub fn formatters(&self) -> ValueFormatters {
        read(&self.formatters).clone()
    }

    /// 序列化单个实例或实例数组
    ///
    /// 单次调用未指定 serializer 时使用默认选项中的 serializer。
    pub fn serialize<'a>(
        &self,
        input: impl Into<Input<'a>>,
        model: &Model,
        options: &SerializeOptions,
    ) -> Result<Output, SchemaError> {
        let input = input.into();
        let kind = options.serializer.unwrap_or(read(&self.options).serializer);
        match kind {
            SerializerKind::Raw => RawSerializer.serialize(self, &input, model, options),
            SerializerKind::Model => ModelSerializer.serialize(self, &input, model, options),
        }
    }
}

fn resolve_in<'a>(fields: &'a Fields, field: &'a str) -> &'a str {
    match fields {
        Fields::Map(entries) => entries
            .iter()
            .find(|(_, spec)| spec.renamed_to() == Some(field))
            .map(|(key, _)| key.as_str())
            .unwrap_or(field),
        Fields::List(_) | Fields::Compute(_) => field,
    }
}
