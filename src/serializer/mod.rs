//! serializer 模块 - 递归序列化引擎
//!
//! 按注册表中的 schema 把实例（或实例数组）转换为 [`Output`]，
//! 支持字段选择、重命名、值格式化以及按路径展开的嵌套 include。

pub mod core;
pub mod instance;
pub mod model_serializer;
pub mod options;
pub mod output;
pub mod raw_serializer;

// 重新导出核心类型和 trait
pub use self::core::Serializer;
pub use instance::{Input, Instance};
pub use model_serializer::ModelSerializer;
pub use options::{IncludeSet, NullPolicy, Options, OptionsPatch, SerializeOptions, SerializerKind};
pub use output::{Output, OutputObject};
pub use raw_serializer::RawSerializer;
