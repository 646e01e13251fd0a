use thiserror::Error;

/// Schema 注册与序列化相关错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Schema already defined for model '{model}' with tag '{tag}'")]
    DuplicateSchema { model: String, tag: String },
    #[error("Schema not found for model '{model}' (tags: {tags:?})")]
    SchemaNotFound { model: String, tags: Vec<String> },
    #[error("Malformed include '{key}' on model '{model}': {reason}")]
    MalformedInclude {
        model: String,
        key: String,
        reason: String,
    },
    #[error("Association '{field}' on model '{model}' holds a list where a single value is expected")]
    AssociationShape { model: String, field: String },
}
