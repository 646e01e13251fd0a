use serde_json::Value as JsonValue;

/// 数据模型实例的最小读取能力
///
/// 引擎不关心实例如何存储或加载关联，只通过这里的方法读取值。
pub trait Instance {
    /// 直接读取属性，`None` 表示属性不存在
    fn property(&self, key: &str) -> Option<JsonValue>;

    /// ORM 风格的属性读取器，默认退回直接读取
    fn data_value(&self, key: &str) -> Option<JsonValue> {
        self.property(key)
    }

    /// 读取已加载的关联值
    fn association(&self, key: &str) -> Input<'_>;
}

/// 序列化输入：空值、单个实例或实例数组
pub enum Input<'a> {
    Nil,
    One(&'a dyn Instance),
    Many(Vec<&'a dyn Instance>),
}

impl<'a> Input<'a> {
    pub fn one<T: Instance>(instance: &'a T) -> Self {
        Input::One(instance)
    }

    pub fn many<T: Instance>(instances: &'a [T]) -> Self {
        Input::Many(instances.iter().map(|i| i as &dyn Instance).collect())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Input::Nil)
    }

    pub fn as_one(&self) -> Option<&'a dyn Instance> {
        match self {
            Input::One(instance) => Some(*instance),
            _ => None,
        }
    }

    /// 以列表形式访问：空值为空列表，单个实例为单元素列表
    pub fn items(&self) -> Vec<&'a dyn Instance> {
        match self {
            Input::Nil => Vec::new(),
            Input::One(instance) => vec![*instance],
            Input::Many(instances) => instances.clone(),
        }
    }
}

impl<'a> From<&'a JsonValue> for Input<'a> {
    fn from(value: &'a JsonValue) -> Self {
        match value {
            JsonValue::Null => Input::Nil,
            JsonValue::Array(items) => {
                Input::Many(items.iter().map(|i| i as &dyn Instance).collect())
            }
            other => Input::One(other),
        }
    }
}

/// 普通 JSON 对象作为实例：没有 ORM 读取器，关联即嵌套值
impl Instance for JsonValue {
    fn property(&self, key: &str) -> Option<JsonValue> {
        self.get(key).cloned()
    }

    fn association(&self, key: &str) -> Input<'_> {
        match self.get(key) {
            Some(value) => Input::from(value),
            None => Input::Nil,
        }
    }
}
