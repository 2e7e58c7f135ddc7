//! 核心模块
//!
//! - `error` - 错误类型定义
//! - `limits` - 宿主边界上的大小限制
//! - `logging` - tracing 初始化
//! - `macros` - 通用宏

pub mod error;
pub mod limits;
pub mod logging;
#[macro_use]
pub mod macros;

// 重新导出错误类型
pub use error::{
    BrainError, MarshalError, MarshalResult, RuntimeResult, ScriptError, ScriptResult,
    ServiceError, ValidationError,
};
pub use limits::Limit;
