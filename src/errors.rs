//! 容器错误类型
//!
//! 错误分为两类：标识符非法（`InvalidName`）与查找缺失（`NotFound`）。
//! 用户提供的构造函数/装饰器自身的失败不在此处包装，panic 原样向上传播。

use thiserror::Error;

/// 依赖注入容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 标识符非法：名称必须是非空字符串
    #[error("invalid name: identifier must be a non-empty string")]
    InvalidName,

    /// 参数或服务未注册
    #[error("nothing registered under name '{0}'")]
    NotFound(String),

    /// 类型转换失败：存储的值无法向下转型为请求的类型
    #[error("type mismatch for '{name}': stored value is not a {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
    },

    /// setter 注入的目标方法不被服务支持
    #[error("service '{service}' does not support method '{method}'")]
    UnknownMethod { service: String, method: String },

    /// 配置映射格式非法（参数引导）
    #[error("invalid parameter config: {0}")]
    InvalidConfig(String),
}
