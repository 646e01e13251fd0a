use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::serializer::{Input, Output};

use super::core::{ComputeFn, Model};

/// 关联基数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    Single,
    Many,
}

/// 对象形式的 include 声明 `{ model, field?, association? }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInclude {
    pub model: String,
    pub field: Option<String>,
    pub association: Cardinality,
}

impl ModelInclude {
    pub fn new(model: &Model) -> Self {
        Self::named(model.name())
    }

    /// 按模型名声明，用于配置加载
    pub fn named(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            field: None,
            association: Cardinality::Single,
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn many(mut self) -> Self {
        self.association = Cardinality::Many;
        self
    }
}

/// include 声明的三种写法
#[derive(Clone)]
pub enum Include {
    /// 内联函数：直接作用于父实例，不查找 schema
    Inline(ComputeFn),
    /// 字符串：仅覆盖来源字段名，不携带目标模型
    Field(String),
    /// 模型声明（对象形式或直接给出模型）
    Model(ModelInclude),
}

impl Include {
    pub fn inline<F>(f: F) -> Self
    where
        F: Fn(&Input<'_>) -> Output + Send + Sync + 'static,
    {
        Include::Inline(Arc::new(f))
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Include::Inline(_))
    }

    /// 目标模型名；内联函数与字符串声明没有目标模型
    pub fn target_model(&self) -> Option<&str> {
        match self {
            Include::Model(m) => Some(&m.model),
            Include::Inline(_) | Include::Field(_) => None,
        }
    }

    /// 来源字段名，默认与 include key 相同
    pub fn source_field<'a>(&'a self, key: &'a str) -> &'a str {
        match self {
            Include::Field(field) => field,
            Include::Model(m) => m.field.as_deref().unwrap_or(key),
            Include::Inline(_) => key,
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        match self {
            Include::Model(m) => m.association,
            Include::Inline(_) | Include::Field(_) => Cardinality::Single,
        }
    }

    /// 归一化为完整描述；缺少目标模型的声明返回 `MalformedInclude`
    pub fn descriptor(&self, owner: &str, key: &str) -> Result<IncludeDescriptor, SchemaError> {
        if let Include::Inline(_) = self {
            return Err(SchemaError::MalformedInclude {
                model: owner.to_string(),
                key: key.to_string(),
                reason: "inline function include has no target model".to_string(),
            });
        }

        let target_model = self
            .target_model()
            .ok_or_else(|| SchemaError::MalformedInclude {
                model: owner.to_string(),
                key: key.to_string(),
                reason: "string include declares no target model".to_string(),
            })?;

        Ok(IncludeDescriptor {
            target_model: target_model.to_string(),
            source_field: self.source_field(key).to_string(),
            cardinality: self.cardinality(),
        })
    }
}

impl From<&Model> for Include {
    fn from(model: &Model) -> Self {
        Include::Model(ModelInclude::new(model))
    }
}

impl From<ModelInclude> for Include {
    fn from(include: ModelInclude) -> Self {
        Include::Model(include)
    }
}

impl From<&str> for Include {
    fn from(field: &str) -> Self {
        Include::Field(field.to_string())
    }
}

impl fmt::Debug for Include {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Include::Inline(_) => write!(f, "Inline(<fn>)"),
            Include::Field(field) => f.debug_tuple("Field").field(field).finish(),
            Include::Model(m) => f.debug_tuple("Model").field(m).finish(),
        }
    }
}

/// 归一化后的 include 描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDescriptor {
    pub target_model: String,
    pub source_field: String,
    pub cardinality: Cardinality,
}
