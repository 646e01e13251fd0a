use once_cell::sync::Lazy;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::schema::{Model, Schema, SchemaRegistry};
use crate::serializer::{Input, Options, OptionsPatch, Output, SerializeOptions};

/// 全局 SchemaRegistry 单例
///
/// 只通过显式注册写入，不会被清空。
static GLOBAL_SCHEMA_REGISTRY: Lazy<Arc<SchemaRegistry>> =
    Lazy::new(|| Arc::new(SchemaRegistry::new()));

/// 获取全局 SchemaRegistry
pub fn global_registry() -> Arc<SchemaRegistry> {
    Arc::clone(&GLOBAL_SCHEMA_REGISTRY)
}

/// 注册 schema（全局），重复注册返回 false
pub fn define_schema(model: &Model, schema: Schema, tag: &str) -> bool {
    GLOBAL_SCHEMA_REGISTRY.define_schema(model, schema, tag)
}

/// 按 tag 列表查找 schema（全局）
pub fn get_schema<T: AsRef<str>>(model: &str, tags: &[T]) -> Option<Arc<Schema>> {
    GLOBAL_SCHEMA_REGISTRY.get_schema(model, tags)
}

/// 外部字段名还原为内部 key（全局）
pub fn resolve_field(model: &str, field: &str, tag: &str) -> String {
    GLOBAL_SCHEMA_REGISTRY.resolve_field(model, field, tag)
}

pub fn resolve_fields<S: AsRef<str>>(model: &str, fields: &[S], tag: &str) -> Vec<String> {
    GLOBAL_SCHEMA_REGISTRY.resolve_fields(model, fields, tag)
}

/// 序列化（全局）
pub fn serialize<'a>(
    input: impl Into<Input<'a>>,
    model: &Model,
    options: &SerializeOptions,
) -> Result<Output, SchemaError> {
    GLOBAL_SCHEMA_REGISTRY.serialize(input, model, options)
}

/// 就地改写 payload 的字段名（全局）
pub fn transform_model<'p>(model: &str, payload: &'p mut JsonValue, tag: &str) -> &'p mut JsonValue {
    GLOBAL_SCHEMA_REGISTRY.transform_model(model, payload, tag)
}

/// 合并全局默认选项
pub fn set_options(patch: &OptionsPatch) {
    GLOBAL_SCHEMA_REGISTRY.set_options(patch)
}

pub fn options() -> Options {
    GLOBAL_SCHEMA_REGISTRY.options()
}
