// 声明式 schema 配置：从 JSON5 / YAML / TOML 构建 schema
//
// 计算函数只能在代码中声明，配置里只有字段列表、重命名映射和对象/字符串形式的 include。

use anyhow::{anyhow, Context, Result};
use garde::Validate;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;

use super::core::{FieldSpec, Fields, Model, PropertyFormat, Schema, SchemaOptions};
use super::include::{Cardinality, Include, ModelInclude};
use super::registry::SchemaRegistry;

/// fields 配置：字段列表或 `内部 key -> 重命名（空串/null 表示不改名）`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldsConfig {
    List(Vec<String>),
    Map(IndexMap<String, Option<String>>),
}

/// include 配置：字符串或 `{ model, field?, association? }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IncludeConfig {
    Field(String),
    Model(ModelIncludeConfig),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ModelIncludeConfig {
    #[garde(length(min = 1))]
    pub model: String,
    #[garde(length(min = 1))]
    pub field: Option<String>,
    #[garde(skip)]
    pub association: Option<Cardinality>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaOptionsConfig {
    #[serde(alias = "excludePK")]
    pub exclude_primary_key: bool,
    /// key -> 类型标签
    pub property_format: HashMap<String, String>,
    pub handle_many: bool,
    pub handle_null: bool,
}

/// 单个 schema 的配置
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaConfig {
    /// 所属模型的主键，默认 `id`
    #[serde(default)]
    pub primary_key: Option<String>,
    pub fields: FieldsConfig,
    #[serde(default)]
    pub include: IndexMap<String, IncludeConfig>,
    #[serde(default)]
    pub options: SchemaOptionsConfig,
}

impl SchemaConfig {
    /// 从 JSON 字符串创建（支持 JSON5 格式）
    pub fn from_json(json_str: &str) -> Result<Self> {
        Ok(json5::from_str(json_str)?)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml_str)?)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// 校验并构建 schema
    pub fn to_schema(&self) -> Result<Schema> {
        let fields = match &self.fields {
            FieldsConfig::List(names) => {
                if names.iter().any(|n| n.is_empty()) {
                    return Err(anyhow!("field list contains an empty name"));
                }
                Fields::List(names.clone())
            }
            FieldsConfig::Map(entries) => Fields::Map(
                entries
                    .iter()
                    .map(|(k, v)| {
                        let spec = match v.as_deref() {
                            None | Some("") => FieldSpec::Same,
                            Some(name) => FieldSpec::Rename(name.to_string()),
                        };
                        (k.clone(), spec)
                    })
                    .collect(),
            ),
        };

        let mut include = Vec::with_capacity(self.include.len());
        for (key, config) in &self.include {
            let declaration = match config {
                IncludeConfig::Field(field) => Include::Field(field.clone()),
                IncludeConfig::Model(m) => {
                    m.validate()
                        .map_err(|e| anyhow!("malformed include declaration '{}': {}", key, e))?;
                    let mut model_include = ModelInclude::named(m.model.clone());
                    model_include.field = m.field.clone();
                    model_include.association = m.association.unwrap_or_default();
                    Include::Model(model_include)
                }
            };
            include.push((key.clone(), declaration));
        }

        let options = SchemaOptions {
            exclude_primary_key: self.options.exclude_primary_key,
            formatter: None,
            property_format: self
                .options
                .property_format
                .iter()
                .map(|(k, v)| (k.clone(), PropertyFormat::Named(v.clone())))
                .collect(),
            handle_many: self.options.handle_many,
            handle_null: self.options.handle_null,
        };

        Ok(Schema {
            fields,
            include,
            options,
        })
    }

    pub fn model(&self, name: &str) -> Model {
        match &self.primary_key {
            Some(pk) => Model::new(name).with_primary_key(pk.clone()),
            None => Model::new(name),
        }
    }
}

/// 多个 schema 的配置文档：`{ <Model>: { <tag>: SchemaConfig } }`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct SchemaDocument {
    pub models: IndexMap<String, IndexMap<String, SchemaConfig>>,
}

impl SchemaDocument {
    pub fn from_json(json_str: &str) -> Result<Self> {
        Ok(json5::from_str(json_str)?)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml_str)?)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// 按扩展名读取文件
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read schema file {}", path.display()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_json(&content),
        }
    }
}

impl SchemaRegistry {
    /// 注册文档中的全部 schema，返回成功注册的数量；重复项记录日志后跳过
    pub fn load_schemas(&self, document: &SchemaDocument) -> Result<usize> {
        let mut defined = 0;
        for (model_name, tags) in &document.models {
            for (tag, config) in tags {
                let schema = config
                    .to_schema()
                    .with_context(|| format!("invalid schema for model '{}' tag '{}'", model_name, tag))?;
                if self.define_schema(&config.model(model_name), schema, tag) {
                    defined += 1;
                }
            }
        }
        Ok(defined)
    }
}
