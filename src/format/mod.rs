//! 值格式化
//!
//! 按类型标签或自定义函数转换单个属性值。

pub mod value_formatters;

pub use value_formatters::{format_date, format_number, format_string, ValueFormatters};
