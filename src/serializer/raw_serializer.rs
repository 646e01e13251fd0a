use tracing::warn;

use crate::error::SchemaError;
use crate::schema::{Model, SchemaRegistry};

use super::core::Serializer;
use super::instance::Input;
use super::options::SerializeOptions;
use super::output::Output;

/// 原始序列化器，尚未实现，总是返回 undefined
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSerializer;

impl Serializer for RawSerializer {
    fn serialize(
        &self,
        _registry: &SchemaRegistry,
        _input: &Input<'_>,
        model: &Model,
        _options: &SerializeOptions,
    ) -> Result<Output, SchemaError> {
        warn!(model = model.name(), "raw serializer is not implemented");
        Ok(Output::Undefined)
    }
}
