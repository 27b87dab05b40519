//! 参数条目
//!
//! 参数要么是普通值，要么是零参生产函数，通过显式标签区分，
//! 读取时不做任何运行期"是否可调用"的探测。

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::trace;

use crate::errors::ContainerError;

/// 类型擦除后的构造产物（独占所有权，缓存时再转入 `Arc`）
pub type Erased = Box<dyn Any + Send + Sync>;

/// 容器参数条目
#[derive(Clone)]
pub enum ParamValue {
    /// 普通值，读取时原样返回
    Value(Arc<dyn Any + Send + Sync>),
    /// 零参生产函数，每次读取都会被调用，结果不缓存
    Producer(Arc<dyn Fn() -> Erased + Send + Sync>),
}

impl ParamValue {
    /// 包装一个普通值
    pub fn of<T: Send + Sync + 'static>(value: T) -> Self {
        ParamValue::Value(Arc::new(value))
    }

    /// 包装一个零参生产函数
    pub fn producer<T, F>(producer: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        ParamValue::Producer(Arc::new(move || Box::new(producer()) as Erased))
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Value(_) => f.write_str("ParamValue::Value(..)"),
            ParamValue::Producer(_) => f.write_str("ParamValue::Producer(..)"),
        }
    }
}

/// 从 JSON 对象构建初始参数表
///
/// 标量按原生类型存储（字符串、布尔、整数、浮点），数组和嵌套对象
/// 原样存为 `serde_json::Value`，`null` 条目视为未设置而跳过。
pub(crate) fn params_from_json(
    config: &serde_json::Value,
) -> Result<HashMap<String, ParamValue>, ContainerError> {
    let object = config.as_object().ok_or_else(|| {
        ContainerError::InvalidConfig("parameter config root must be a JSON object".to_string())
    })?;

    let mut parameters = HashMap::with_capacity(object.len());
    for (name, value) in object {
        if name.trim().is_empty() {
            return Err(ContainerError::InvalidName);
        }
        let entry = match value {
            serde_json::Value::Null => {
                trace!("skipping null parameter '{}'", name);
                continue;
            }
            serde_json::Value::Bool(flag) => ParamValue::of(*flag),
            serde_json::Value::String(text) => ParamValue::of(text.clone()),
            serde_json::Value::Number(number) => {
                if let Some(integer) = number.as_i64() {
                    ParamValue::of(integer)
                } else if let Some(float) = number.as_f64() {
                    ParamValue::of(float)
                } else {
                    // u64 超出 i64 范围等少见情形，保留原始 JSON 值
                    ParamValue::of(value.clone())
                }
            }
            other => ParamValue::of(other.clone()),
        };
        parameters.insert(name.clone(), entry);
    }
    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_entries_keep_their_payload() {
        let entry = ParamValue::of("bar".to_string());
        match entry {
            ParamValue::Value(value) => {
                assert_eq!(value.downcast_ref::<String>().unwrap(), "bar");
            }
            ParamValue::Producer(_) => panic!("expected a plain value entry"),
        }
    }

    #[test]
    fn producer_entries_run_on_each_call() {
        let entry = ParamValue::producer(|| 7_i64);
        let ParamValue::Producer(producer) = entry else {
            panic!("expected a producer entry");
        };
        let first = producer().downcast::<i64>().unwrap();
        let second = producer().downcast::<i64>().unwrap();
        assert_eq!(*first, 7);
        assert_eq!(*second, 7);
    }

    #[test]
    fn json_scalars_map_to_native_types() {
        let config = serde_json::json!({
            "name": "app",
            "workers": 4,
            "ratio": 0.5,
            "debug": true,
            "ignored": null,
            "tags": ["a", "b"],
        });

        let parameters = params_from_json(&config).unwrap();
        assert_eq!(parameters.len(), 5);
        assert!(matches!(parameters.get("name"), Some(ParamValue::Value(_))));
        assert!(!parameters.contains_key("ignored"));
    }

    #[test]
    fn json_root_must_be_an_object() {
        let result = params_from_json(&serde_json::json!(["not", "an", "object"]));
        assert!(matches!(result, Err(ContainerError::InvalidConfig(_))));
    }

    #[test]
    fn empty_json_keys_are_rejected() {
        let result = params_from_json(&serde_json::json!({ "": 1 }));
        assert!(matches!(result, Err(ContainerError::InvalidName)));
    }
}
