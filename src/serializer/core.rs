use crate::error::SchemaError;
use crate::schema::{Model, SchemaRegistry};

use super::instance::Input;
use super::options::SerializeOptions;
use super::output::Output;

/// 序列化策略
pub trait Serializer: Send + Sync {
    /// 按注册表中 `model` 的 schema 序列化输入
    fn serialize(
        &self,
        registry: &SchemaRegistry,
        input: &Input<'_>,
        model: &Model,
        options: &SerializeOptions,
    ) -> Result<Output, SchemaError>;
}
