use anyhow::Result;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

use crate::schema::DEFAULT_TAG;

/// 空值策略：被排除或为空的 include 字段如何表示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "NullPolicyRepr")]
pub enum NullPolicy {
    /// 写入 null
    #[default]
    SetNull,
    /// 写入 undefined，key 保留
    SetUndefined,
    /// 不写入 key
    Ignore,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NullPolicyRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<NullPolicyRepr> for NullPolicy {
    type Error = String;

    fn try_from(repr: NullPolicyRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            NullPolicyRepr::Code(0) => Ok(NullPolicy::SetNull),
            NullPolicyRepr::Code(1) => Ok(NullPolicy::SetUndefined),
            NullPolicyRepr::Code(2) => Ok(NullPolicy::Ignore),
            NullPolicyRepr::Code(code) => Err(format!("unknown null policy code: {}", code)),
            NullPolicyRepr::Name(name) => match name.to_uppercase().as_str() {
                "SET_NULL" => Ok(NullPolicy::SetNull),
                "SET_UNDEFINED" => Ok(NullPolicy::SetUndefined),
                "IGNORE" => Ok(NullPolicy::Ignore),
                _ => Err(format!("unknown null policy: {}", name)),
            },
        }
    }
}

/// 序列化策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerKind {
    /// 尚未实现
    Raw,
    #[default]
    Model,
}

/// 需要展开的 include 路径
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "IncludeSetRepr")]
pub enum IncludeSet {
    /// 展开全部 include
    All,
    /// 点分路径列表，如 `posts.comments`
    Paths(Vec<String>),
}

impl Default for IncludeSet {
    fn default() -> Self {
        IncludeSet::Paths(Vec::new())
    }
}

impl IncludeSet {
    pub fn is_all(&self) -> bool {
        matches!(self, IncludeSet::All)
    }

    pub fn contains(&self, path: &str) -> bool {
        match self {
            IncludeSet::All => true,
            IncludeSet::Paths(paths) => paths.iter().any(|p| p == path),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IncludeSetRepr {
    Paths(Vec<String>),
    Flag { all: bool },
}

impl From<IncludeSetRepr> for IncludeSet {
    fn from(repr: IncludeSetRepr) -> Self {
        match repr {
            IncludeSetRepr::Paths(paths) => IncludeSet::Paths(paths),
            IncludeSetRepr::Flag { all: true } => IncludeSet::All,
            IncludeSetRepr::Flag { all: false } => IncludeSet::default(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagsRepr {
    One(String),
    Many(Vec<String>),
}

fn deserialize_tags<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match TagsRepr::deserialize(deserializer)? {
        TagsRepr::One(tag) => vec![tag],
        TagsRepr::Many(tags) => tags,
    })
}

/// 单次调用的序列化选项，未设置的项取全局默认值
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SerializeOptions {
    pub include: IncludeSet,
    pub empty_policy: Option<NullPolicy>,
    /// 按顺序尝试的 tag，为空时使用 `default`
    #[serde(deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    pub serializer: Option<SerializerKind>,
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = IncludeSet::Paths(paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_include_all(mut self) -> Self {
        self.include = IncludeSet::All;
        self
    }

    pub fn with_empty_policy(mut self, policy: NullPolicy) -> Self {
        self.empty_policy = Some(policy);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_serializer(mut self, serializer: SerializerKind) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// 实际用于查找的 tag 列表
    pub fn effective_tags(&self) -> Vec<String> {
        if self.tags.is_empty() {
            vec![DEFAULT_TAG.to_string()]
        } else {
            self.tags.clone()
        }
    }

    pub fn from_json(json_str: &str) -> Result<Self> {
        Ok(json5::from_str(json_str)?)
    }
}

/// 仅给出 include 路径列表的简写
impl From<Vec<&str>> for SerializeOptions {
    fn from(paths: Vec<&str>) -> Self {
        SerializeOptions::new().with_include(paths)
    }
}

/// 进程级默认选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SmartDefault)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    #[default(SerializerKind::Model)]
    pub serializer: SerializerKind,
    #[default(NullPolicy::SetNull)]
    pub empty_policy: NullPolicy,
    #[default = false]
    pub include_all: bool,
}

impl Options {
    /// 合并补丁，只覆盖补丁中出现的项
    pub fn merge(&mut self, patch: &OptionsPatch) {
        if let Some(serializer) = patch.serializer {
            self.serializer = serializer;
        }
        if let Some(policy) = patch.empty_policy {
            self.empty_policy = policy;
        }
        if let Some(include_all) = patch.include_all {
            self.include_all = include_all;
        }
    }
}

/// `set_options` 的输入
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptionsPatch {
    /// 支持字符串简写 `"raw"` / `"model"`
    pub serializer: Option<SerializerKind>,
    pub empty_policy: Option<NullPolicy>,
    pub include_all: Option<bool>,
}

impl OptionsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_serializer(mut self, serializer: SerializerKind) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn with_empty_policy(mut self, policy: NullPolicy) -> Self {
        self.empty_policy = Some(policy);
        self
    }

    pub fn with_include_all(mut self, include_all: bool) -> Self {
        self.include_all = Some(include_all);
        self
    }

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
}
