//! schema 模块 - schema 定义、注册与字段名解析

pub mod config;
pub mod core;
pub mod include;
pub mod registry;

// 重新导出公共 API
pub use self::core::{
    ComputeFn, FieldFn, FieldSpec, Fields, FormatterFn, Model, PropertyFormat, Schema,
    SchemaOptions, TransformFn, DEFAULT_TAG,
};
pub use config::{FieldsConfig, IncludeConfig, ModelIncludeConfig, SchemaConfig, SchemaDocument};
pub use include::{Cardinality, Include, IncludeDescriptor, ModelInclude};
pub use registry::SchemaRegistry;
