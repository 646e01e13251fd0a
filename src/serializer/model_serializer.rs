use std::sync::Arc;
use tracing::debug;

use crate::error::SchemaError;
use crate::format::ValueFormatters;
use crate::schema::{
    Cardinality, FieldSpec, Fields, Include, Model, Schema, SchemaOptions, SchemaRegistry,
};

use super::core::Serializer;
use super::instance::{Input, Instance};
use super::options::{IncludeSet, NullPolicy, SerializeOptions};
use super::output::{Output, OutputObject};

/// 基于 schema 的递归序列化器
///
/// include 图必须是有限且无环的，引擎不做环检测。
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelSerializer;

impl Serializer for ModelSerializer {
    fn serialize(
        &self,
        registry: &SchemaRegistry,
        input: &Input<'_>,
        model: &Model,
        options: &SerializeOptions,
    ) -> Result<Output, SchemaError> {
        let defaults = registry.options();
        let ctx = Context {
            registry,
            formatters: registry.formatters(),
            include: &options.include,
            all_included: defaults.include_all || options.include.is_all(),
            policy: options.empty_policy.unwrap_or(defaults.empty_policy),
            tags: options.effective_tags(),
        };

        let schema = ctx.schema_for(model.name())?;
        debug!(model = model.name(), tags = ?ctx.tags, "serializing with resolved schema");

        match input {
            Input::Many(items) => {
                if schema.options.handle_many {
                    if let Some(f) = schema.fields.as_compute() {
                        return Ok(f(input));
                    }
                }
                items
                    .iter()
                    .map(|item| ctx.serialize_instance(*item, &schema, model, None))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Output::Array)
            }
            Input::One(instance) => ctx.serialize_instance(*instance, &schema, model, None),
            Input::Nil => Ok(ctx.serialize_nil(&schema).unwrap_or_else(Output::null)),
        }
    }
}

struct Context<'r> {
    registry: &'r SchemaRegistry,
    formatters: ValueFormatters,
    include: &'r IncludeSet,
    all_included: bool,
    policy: NullPolicy,
    tags: Vec<String>,
}

impl Context<'_> {
    fn schema_for(&self, model: &str) -> Result<Arc<Schema>, SchemaError> {
        self.registry
            .get_schema(model, &self.tags)
            .ok_or_else(|| self.not_found(model))
    }

    fn model_for(&self, model: &str) -> Result<Model, SchemaError> {
        self.registry.model(model).ok_or_else(|| self.not_found(model))
    }

    fn not_found(&self, model: &str) -> SchemaError {
        SchemaError::SchemaNotFound {
            model: model.to_string(),
            tags: self.tags.clone(),
        }
    }

    fn is_included(&self, path: &str) -> bool {
        self.all_included || self.include.contains(path)
    }

    fn apply_null_policy(&self, target: &mut OutputObject, key: &str) {
        match self.policy {
            NullPolicy::SetNull => target.insert(key, Output::null()),
            NullPolicy::SetUndefined => target.insert(key, Output::Undefined),
            NullPolicy::Ignore => {}
        }
    }

    /// 空值交给声明了 handle_null 的计算函数
    fn serialize_nil(&self, schema: &Schema) -> Option<Output> {
        match (&schema.fields, schema.options.handle_null) {
            (Fields::Compute(f), true) => Some(f(&Input::Nil)),
            _ => None,
        }
    }

    /// 先经过实例级 formatter（按内部 key），再经过属性格式（按输出 key）
    fn format_field(
        &self,
        options: &SchemaOptions,
        formatter_key: &str,
        output_key: &str,
        raw: Option<serde_json::Value>,
        instance: &dyn Instance,
    ) -> Output {
        let value = match &options.formatter {
            Some(formatter) => formatter(formatter_key, raw, instance),
            None => raw,
        };
        self.formatters
            .apply_property_format(&options.property_format, output_key, value)
            .into()
    }

    fn serialize_instance(
        &self,
        instance: &dyn Instance,
        schema: &Schema,
        model: &Model,
        path: Option<&str>,
    ) -> Result<Output, SchemaError> {
        let options = &schema.options;
        let mut target = OutputObject::new();

        match &schema.fields {
            Fields::Compute(f) => return Ok(f(&Input::One(instance))),
            Fields::List(names) => {
                let primary_key = (!options.exclude_primary_key).then(|| model.primary_key());
                for key in primary_key.into_iter().chain(names.iter().map(String::as_str)) {
                    let value = self.format_field(options, key, key, instance.property(key), instance);
                    target.insert(key, value);
                }
            }
            Fields::Map(entries) => {
                if !options.exclude_primary_key {
                    let primary_key = model.primary_key();
                    target.insert(primary_key, instance.property(primary_key));
                }
                for (key, spec) in entries {
                    if let FieldSpec::Compute(f) = spec {
                        let value = self
                            .formatters
                            .apply_property_format(&options.property_format, key, f(instance));
                        target.insert(key.as_str(), value);
                        continue;
                    }
                    let output_key = spec.renamed_to().unwrap_or(key);
                    let value =
                        self.format_field(options, key, output_key, instance.data_value(key), instance);
                    target.insert(output_key, value);
                }
            }
        }

        for (key, declaration) in &schema.include {
            let sub_path = match path {
                Some(parent) => format!("{}.{}", parent, key),
                None => key.clone(),
            };

            if !self.is_included(&sub_path) {
                self.apply_null_policy(&mut target, key);
                continue;
            }

            if let Include::Inline(f) = declaration {
                target.insert(key.as_str(), f(&Input::One(instance)));
                continue;
            }

            let descriptor = declaration.descriptor(model.name(), key)?;
            let target_model = self.model_for(&descriptor.target_model)?;
            let target_schema = self.schema_for(&descriptor.target_model)?;
            let related = instance.association(&descriptor.source_field);

            match descriptor.cardinality {
                Cardinality::Many => {
                    if let Some(f) = target_schema.fields.as_compute() {
                        target.insert(key.as_str(), f(&related));
                        continue;
                    }
                    let items = related
                        .items()
                        .into_iter()
                        .map(|item| {
                            self.serialize_instance(item, &target_schema, &target_model, Some(&sub_path))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    target.insert(key.as_str(), Output::Array(items));
                }
                Cardinality::Single => match related {
                    Input::Nil => match self.serialize_nil(&target_schema) {
                        Some(output) => target.insert(key.as_str(), output),
                        None => self.apply_null_policy(&mut target, key),
                    },
                    Input::One(item) => {
                        let output =
                            self.serialize_instance(item, &target_schema, &target_model, Some(&sub_path))?;
                        target.insert(key.as_str(), output);
                    }
                    Input::Many(_) => {
                        return Err(SchemaError::AssociationShape {
                            model: model.name().to_string(),
                            field: descriptor.source_field,
                        })
                    }
                },
            }
        }

        Ok(Output::Object(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ModelInclude;
    use serde_json::{json, Value as JsonValue};

    fn user() -> Model {
        Model::new("User")
    }

    fn post() -> Model {
        Model::new("Post")
    }

    fn registry() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        registry.define_schema(
            &user(),
            Schema::new(Fields::list(["name"]))
                .with_include("posts", ModelInclude::new(&post()).many()),
            "default",
        );
        registry.define_schema(&post(), Schema::new(Fields::list(["title"])), "default");
        registry
    }

    fn al() -> JsonValue {
        json!({"id": 1, "name": "Al", "posts": [{"id": 10, "title": "Hi"}]})
    }

    fn run(registry: &SchemaRegistry, value: &JsonValue, options: SerializeOptions) -> Output {
        ModelSerializer
            .serialize(registry, &Input::from(value), &user(), &options)
            .unwrap()
    }

    #[test]
    fn test_many_include_enabled() {
        let output = run(&registry(), &al(), SerializeOptions::from(vec!["posts"]));
        assert_eq!(
            output.to_json(),
            json!({"id": 1, "name": "Al", "posts": [{"id": 10, "title": "Hi"}]})
        );
    }

    #[test]
    fn test_disabled_include_uses_null_policy() {
        let registry = registry();
        let value = al();

        let output = run(&registry, &value, SerializeOptions::new());
        assert_eq!(output.to_json(), json!({"id": 1, "name": "Al", "posts": null}));

        let output = run(
            &registry,
            &value,
            SerializeOptions::new().with_empty_policy(NullPolicy::SetUndefined),
        );
        let posts = output.get("posts").unwrap();
        assert!(posts.is_undefined());
        assert_eq!(output.to_json(), json!({"id": 1, "name": "Al"}));

        let output = run(&registry, &value, SerializeOptions::new().with_empty_policy(NullPolicy::Ignore));
        assert!(!output.as_object().unwrap().contains_key("posts"));
    }

    #[test]
    fn test_missing_association_is_empty_list() {
        let value = json!({"id": 2, "name": "Bo"});
        let output = run(&registry(), &value, SerializeOptions::new().with_include_all());
        assert_eq!(output.to_json(), json!({"id": 2, "name": "Bo", "posts": []}));
    }

    #[test]
    fn test_schema_not_found() {
        let registry = SchemaRegistry::new();
        let err = ModelSerializer
            .serialize(&registry, &Input::from(&al()), &user(), &SerializeOptions::new())
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::SchemaNotFound {
                model: "User".to_string(),
                tags: vec!["default".to_string()]
            }
        );
    }

    #[test]
    fn test_mapping_fields() {
        let registry = SchemaRegistry::new();
        registry.define_schema(
            &user(),
            Schema::new(Fields::map([
                ("a", FieldSpec::Same),
                ("b", FieldSpec::from("renamed")),
                ("c", FieldSpec::compute(|i| i.property("a").map(|a| json!(a.to_string() + "!")))),
            ]))
            .with_property_format("c", "string"),
            "default",
        );

        let value = json!({"id": 7, "a": 1, "b": 2});
        let output = run(&registry, &value, SerializeOptions::new());
        assert_eq!(output.to_json(), json!({"id": 7, "a": 1, "renamed": 2, "c": "1!"}));
        assert_eq!(
            output.as_object().unwrap().keys().collect::<Vec<_>>(),
            vec!["id", "a", "renamed", "c"]
        );
    }

    #[test]
    fn test_formatter_chain() {
        let registry = SchemaRegistry::new();
        registry.define_schema(
            &user(),
            Schema::new(Fields::map([("age", FieldSpec::from("years"))]))
                .with_formatter(|key, value, _| {
                    assert_eq!(key, "age");
                    value.map(|v| json!(format!("{}", v.as_i64().unwrap_or(0) * 2)))
                })
                .with_property_format("years", "number"),
            "default",
        );

        let value = json!({"id": 1, "age": 21});
        let output = run(&registry, &value, SerializeOptions::new());
        assert_eq!(output.to_json(), json!({"id": 1, "years": 42}));
    }

    #[test]
    fn test_primary_key_excluded() {
        let registry = SchemaRegistry::new();
        registry.define_schema(
            &user(),
            Schema::new(Fields::list(["name"])).exclude_primary_key(),
            "default",
        );
        let output = run(&registry, &al(), SerializeOptions::new());
        assert_eq!(output.to_json(), json!({"name": "Al"}));
    }

    #[test]
    fn test_compute_fields_skip_includes() {
        let registry = SchemaRegistry::new();
        registry.define_schema(
            &user(),
            Schema::new(Fields::compute(|input| match input.as_one() {
                Some(i) => json!({"label": i.property("name")}).into(),
                None => Output::null(),
            }))
            .with_include("posts", ModelInclude::new(&post()).many()),
            "default",
        );

        let output = run(&registry, &al(), SerializeOptions::new().with_include_all());
        assert_eq!(output.to_json(), json!({"label": "Al"}));
    }

    #[test]
    fn test_handle_many_delegates_whole_array() {
        let registry = SchemaRegistry::new();
        registry.define_schema(
            &user(),
            Schema::new(Fields::compute(|input| json!(input.items().len()).into())).handle_many(),
            "default",
        );

        let values = json!([{"id": 1}, {"id": 2}, {"id": 3}]);
        let output = ModelSerializer
            .serialize(&registry, &Input::from(&values), &user(), &SerializeOptions::new())
            .unwrap();
        assert_eq!(output.to_json(), json!(3));
    }

    #[test]
    fn test_array_without_handle_many_is_per_item() {
        let values = json!([{"id": 1, "name": "A"}, {"id": 2, "name": "B"}]);
        let output = ModelSerializer
            .serialize(&registry(), &Input::from(&values), &user(), &SerializeOptions::new())
            .unwrap();
        assert_eq!(
            output.to_json(),
            json!([{"id": 1, "name": "A", "posts": null}, {"id": 2, "name": "B", "posts": null}])
        );
    }

    #[test]
    fn test_nested_paths() {
        let comment = Model::new("Comment");
        let registry = SchemaRegistry::new();
        registry.define_schema(
            &user(),
            Schema::new(Fields::list(["name"]))
                .with_include("posts", ModelInclude::new(&post()).many()),
            "default",
        );
        registry.define_schema(
            &post(),
            Schema::new(Fields::list(["title"])).with_include("top", ModelInclude::new(&comment)),
            "default",
        );
        registry.define_schema(&comment, Schema::new(Fields::list(["body"])), "default");

        let value = json!({
            "id": 1, "name": "Al",
            "posts": [{"id": 10, "title": "Hi", "top": {"id": 100, "body": "nice"}}]
        });

        let output = run(&registry, &value, SerializeOptions::new().with_include(["posts"]));
        assert_eq!(output.to_json()["posts"][0]["top"], JsonValue::Null);

        let output = run(
            &registry,
            &value,
            SerializeOptions::new().with_include(["posts", "posts.top"]),
        );
        assert_eq!(output.to_json()["posts"][0]["top"], json!({"id": 100, "body": "nice"}));

        // 只给子路径时父级不展开
        let output = run(&registry, &value, SerializeOptions::new().with_include(["posts.top"]));
        assert_eq!(output.to_json()["posts"], JsonValue::Null);
    }

    #[test]
    fn test_single_include_null_and_handle_null() {
        let profile = Model::new("Profile");
        let registry = SchemaRegistry::new();
        registry.define_schema(
            &user(),
            Schema::new(Fields::list(["name"])).with_include("profile", &profile),
            "default",
        );
        registry.define_schema(
            &profile,
            Schema::new(Fields::compute(|input| {
                if input.is_nil() {
                    json!({"empty": true}).into()
                } else {
                    json!({"empty": false}).into()
                }
            })),
            "default",
        );
        registry.define_schema(
            &profile,
            Schema::new(Fields::compute(|_| json!("never").into())).handle_null(),
            "nullable",
        );

        let value = json!({"id": 1, "name": "Al", "profile": null});
        let options = SerializeOptions::new().with_include_all();
        assert_eq!(run(&registry, &value, options.clone()).to_json()["profile"], JsonValue::Null);

        // 子 schema 沿用调用方的 tag 列表
        let output = ModelSerializer
            .serialize(
                &registry,
                &Input::from(&value),
                &user(),
                &options.clone().with_tags(["nullable", "default"]),
            )
            .unwrap();
        assert_eq!(output.to_json()["profile"], json!("never"));

        let value = json!({"id": 1, "name": "Al", "profile": {"bio": "x"}});
        assert_eq!(run(&registry, &value, options).to_json()["profile"], json!({"empty": false}));
    }

    #[test]
    fn test_inline_include() {
        let registry = SchemaRegistry::new();
        registry.define_schema(
            &user(),
            Schema::new(Fields::list(["name"])).with_include(
                "initial",
                Include::inline(|input| {
                    let name = input.as_one().and_then(|i| i.property("name"));
                    json!(name.and_then(|n| n.as_str().map(|s| s[..1].to_string()))).into()
                }),
            ),
            "default",
        );

        let output = run(&registry, &al(), SerializeOptions::new().with_include(["initial"]));
        assert_eq!(output.to_json()["initial"], json!("A"));

        let output = run(&registry, &al(), SerializeOptions::new());
        assert_eq!(output.to_json()["initial"], JsonValue::Null);
    }

    #[test]
    fn test_string_include_is_malformed_when_enabled() {
        let registry = SchemaRegistry::new();
        registry.define_schema(
            &user(),
            Schema::new(Fields::list(["name"])).with_include("author", "author_id"),
            "default",
        );

        assert!(ModelSerializer
            .serialize(&registry, &Input::from(&al()), &user(), &SerializeOptions::new())
            .is_ok());

        let err = ModelSerializer
            .serialize(
                &registry,
                &Input::from(&al()),
                &user(),
                &SerializeOptions::new().with_include_all(),
            )
            .unwrap_err();
        assert!(matches!(err, SchemaError::MalformedInclude { .. }));
    }

    #[test]
    fn test_single_include_with_list_value() {
        let registry = SchemaRegistry::new();
        registry.define_schema(
            &user(),
            Schema::new(Fields::list(["name"])).with_include("posts", &post()),
            "default",
        );
        registry.define_schema(&post(), Schema::new(Fields::list(["title"])), "default");

        let err = ModelSerializer
            .serialize(
                &registry,
                &Input::from(&al()),
                &user(),
                &SerializeOptions::new().with_include_all(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::AssociationShape {
                model: "User".to_string(),
                field: "posts".to_string()
            }
        );
    }
}
