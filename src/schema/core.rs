use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::serializer::{Input, Instance, Output};

use super::include::Include;

/// 默认 tag
pub const DEFAULT_TAG: &str = "default";

/// 整体计算函数：接收实例（或实例数组、空值），直接产出输出
pub type ComputeFn = Arc<dyn Fn(&Input<'_>) -> Output + Send + Sync>;

/// 单字段计算函数
pub type FieldFn = Arc<dyn Fn(&dyn Instance) -> Option<JsonValue> + Send + Sync>;

/// 实例级格式化函数：(key, 原始值, 完整实例) -> 值
pub type FormatterFn =
    Arc<dyn Fn(&str, Option<JsonValue>, &dyn Instance) -> Option<JsonValue> + Send + Sync>;

/// 单值转换函数
pub type TransformFn = Arc<dyn Fn(Option<JsonValue>) -> Option<JsonValue> + Send + Sync>;

/// 模型标识
///
/// 数据模型层只需要提供模型名和主键属性名
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Model {
    name: String,
    primary_key: String,
}

impl Model {
    /// 创建模型，主键默认为 `id`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: "id".to_string(),
        }
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }
}

/// 映射形式 fields 中单个条目的声明
#[derive(Clone)]
pub enum FieldSpec {
    /// 空值/空串：按原名输出
    Same,
    /// 重命名：输出 key 为新名称，值取自内部 key
    Rename(String),
    /// 单字段计算函数
    Compute(FieldFn),
}

impl FieldSpec {
    pub fn compute<F>(f: F) -> Self
    where
        F: Fn(&dyn Instance) -> Option<JsonValue> + Send + Sync + 'static,
    {
        FieldSpec::Compute(Arc::new(f))
    }

    /// 重命名目标；空串视为 `Same`
    pub fn renamed_to(&self) -> Option<&str> {
        match self {
            FieldSpec::Rename(name) if !name.is_empty() => Some(name),
            _ => None,
        }
    }
}

impl From<&str> for FieldSpec {
    fn from(name: &str) -> Self {
        if name.is_empty() {
            FieldSpec::Same
        } else {
            FieldSpec::Rename(name.to_string())
        }
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSpec::Same => write!(f, "Same"),
            FieldSpec::Rename(name) => f.debug_tuple("Rename").field(name).finish(),
            FieldSpec::Compute(_) => write!(f, "Compute(<fn>)"),
        }
    }
}

/// Schema 的字段声明
#[derive(Clone)]
pub enum Fields {
    /// 按顺序原样复制的字段名列表
    List(Vec<String>),
    /// 有序映射：内部 key -> 声明
    Map(Vec<(String, FieldSpec)>),
    /// 整体计算函数，绕过逐字段逻辑
    Compute(ComputeFn),
}

impl Fields {
    pub fn list<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Fields::List(names.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldSpec>,
    {
        Fields::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn compute<F>(f: F) -> Self
    where
        F: Fn(&Input<'_>) -> Output + Send + Sync + 'static,
    {
        Fields::Compute(Arc::new(f))
    }

    pub fn as_compute(&self) -> Option<&ComputeFn> {
        match self {
            Fields::Compute(f) => Some(f),
            _ => None,
        }
    }
}

impl fmt::Debug for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fields::List(names) => f.debug_tuple("List").field(names).finish(),
            Fields::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Fields::Compute(_) => write!(f, "Compute(<fn>)"),
        }
    }
}

/// 属性格式声明：类型标签或自定义转换函数
#[derive(Clone)]
pub enum PropertyFormat {
    Named(String),
    Custom(TransformFn),
}

impl PropertyFormat {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Option<JsonValue>) -> Option<JsonValue> + Send + Sync + 'static,
    {
        PropertyFormat::Custom(Arc::new(f))
    }
}

impl From<&str> for PropertyFormat {
    fn from(name: &str) -> Self {
        PropertyFormat::Named(name.to_string())
    }
}

impl fmt::Debug for PropertyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyFormat::Named(name) => f.debug_tuple("Named").field(name).finish(),
            PropertyFormat::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}

/// Schema 选项
#[derive(Clone, Default)]
pub struct SchemaOptions {
    /// 不自动输出主键
    pub exclude_primary_key: bool,
    /// 实例级格式化函数
    pub formatter: Option<FormatterFn>,
    /// 按 key 的属性格式
    pub property_format: HashMap<String, PropertyFormat>,
    /// fields 为计算函数时，数组整体交给该函数
    pub handle_many: bool,
    /// fields 为计算函数时，single 关联为空也交给该函数
    pub handle_null: bool,
}

impl fmt::Debug for SchemaOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaOptions")
            .field("exclude_primary_key", &self.exclude_primary_key)
            .field("formatter", &self.formatter.as_ref().map(|_| "<fn>"))
            .field("property_format", &self.property_format)
            .field("handle_many", &self.handle_many)
            .field("handle_null", &self.handle_null)
            .finish()
    }
}

/// 注册在 (Model, Tag) 下的 schema，注册后不可变
#[derive(Debug, Clone)]
pub struct Schema {
    pub fields: Fields,
    /// 有序映射：输出 key -> include 声明
    pub include: Vec<(String, Include)>,
    pub options: SchemaOptions,
}

impl Schema {
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            include: Vec::new(),
            options: SchemaOptions::default(),
        }
    }

    pub fn with_include(mut self, key: impl Into<String>, include: impl Into<Include>) -> Self {
        self.include.push((key.into(), include.into()));
        self
    }

    pub fn exclude_primary_key(mut self) -> Self {
        self.options.exclude_primary_key = true;
        self
    }

    pub fn with_formatter<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Option<JsonValue>, &dyn Instance) -> Option<JsonValue> + Send + Sync + 'static,
    {
        self.options.formatter = Some(Arc::new(f));
        self
    }

    pub fn with_property_format(
        mut self,
        key: impl Into<String>,
        format: impl Into<PropertyFormat>,
    ) -> Self {
        self.options.property_format.insert(key.into(), format.into());
        self
    }

    pub fn handle_many(mut self) -> Self {
        self.options.handle_many = true;
        self
    }

    pub fn handle_null(mut self) -> Self {
        self.options.handle_null = true;
        self
    }

    /// 按 key 查找 include 声明
    pub fn include_for(&self, key: &str) -> Option<&Include> {
        self.include.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}
