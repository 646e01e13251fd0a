//! schemax - 基于 schema 的对象转换层
//!
//! 按声明式 schema 把数据模型实例转换为适合对外输出（如 API 响应）的普通结构。
//!
//! ## 模块
//!
//! - **schema**: schema 定义、按 (Model, Tag) 注册、字段名反查、配置加载
//! - **format**: 值格式化器（date / number / string / 自定义）
//! - **serializer**: 递归序列化引擎、空值策略与序列化选项
//!
//! ## 快速开始
//!
//! ```rust
//! use schemax::{Fields, Model, ModelInclude, Schema, SchemaRegistry, SerializeOptions};
//! use serde_json::json;
//!
//! let user = Model::new("User");
//! let post = Model::new("Post");
//!
//! let registry = SchemaRegistry::new();
//! registry.define_schema(
//!     &user,
//!     Schema::new(Fields::list(["name"])).with_include("posts", ModelInclude::new(&post).many()),
//!     "default",
//! );
//! registry.define_schema(&post, Schema::new(Fields::list(["title"])), "default");
//!
//! let value = json!({"id": 1, "name": "Al", "posts": [{"id": 10, "title": "Hi"}]});
//! let output = registry
//!     .serialize(&value, &user, &SerializeOptions::from(vec!["posts"]))
//!     .unwrap();
//!
//! assert_eq!(
//!     output.to_json(),
//!     json!({"id": 1, "name": "Al", "posts": [{"id": 10, "title": "Hi"}]})
//! );
//! ```

pub mod error;
pub mod format;
pub mod global;
pub mod schema;
pub mod serializer;

// 重新导出主要的公共 API
pub use error::SchemaError;

pub use format::ValueFormatters;

pub use global::{
    define_schema, get_schema, global_registry, options, resolve_field, resolve_fields, serialize,
    set_options, transform_model,
};

pub use schema::{
    Cardinality, FieldSpec, Fields, Include, IncludeDescriptor, Model, ModelInclude,
    PropertyFormat, Schema, SchemaConfig, SchemaDocument, SchemaOptions, SchemaRegistry,
    DEFAULT_TAG,
};

pub use serializer::{
    IncludeSet, Input, Instance, ModelSerializer, NullPolicy, Options, OptionsPatch, Output,
    OutputObject, RawSerializer, SerializeOptions, Serializer, SerializerKind,
};
