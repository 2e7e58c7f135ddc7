//! 统一错误处理模块
//!
//! 提供 brain 运行时范围内的统一错误类型定义
//!
//! ## 错误类型分层
//!
//! - **校验错误** (`ValidationError`): 参数为空或超出长度上限，在任何引擎工作之前被拒绝
//! - **脚本错误** (`ScriptError`): 编译错误、运行时异常、缺少入口函数
//! - **封送错误** (`MarshalError`): 输入 JSON 无法解析、输出值无法序列化
//! - **协议错误** (`ServiceError`): 宿主服务桥的调用/回报协议被违反
//!
//! `BrainError` 汇总以上所有错误，宿主门面只通过它报告失败。

use thiserror::Error;

use crate::config::ConfigError;
use crate::core::limits::Limit;
use crate::scripting::exception::ScriptDiagnostic;

/// 运行时核心错误类型
#[derive(Error, Debug)]
pub enum BrainError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Script(#[from] ScriptError),

    #[error("{0}")]
    Marshal(#[from] MarshalError),

    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("Unknown brain UID: {0}")]
    UnknownBrain(String),

    #[error("Failed to reset brain with javascript:\n{listing}")]
    ResetFailed {
        listing: String,
        #[source]
        cause: Box<BrainError>,
    },

    #[error("Runtime was already initialized")]
    AlreadyInitialized,

    #[error("Runtime is not initialized")]
    NotInitialized,

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] rquickjs::Error),
}

impl BrainError {
    /// 返回最内层的错误（reset 失败会包裹原始的编译错误）
    pub fn root_cause(&self) -> &BrainError {
        match self {
            BrainError::ResetFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

/// 参数校验错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A required {what} was empty")]
    Empty { what: &'static str },

    #[error("A given {what} exceeded the maximum expected length of {max} bytes (got {actual})")]
    TooLong {
        what: &'static str,
        max: usize,
        actual: usize,
    },
}

impl ValidationError {
    pub fn too_long(limit: Limit, actual: usize) -> Self {
        ValidationError::TooLong {
            what: limit.describe(),
            max: limit.max_bytes(),
            actual,
        }
    }
}

/// 脚本错误
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("{prefix}{diagnostic}")]
    Compilation {
        prefix: &'static str,
        diagnostic: ScriptDiagnostic,
    },

    #[error("{prefix}{diagnostic}")]
    Runtime {
        prefix: &'static str,
        diagnostic: ScriptDiagnostic,
    },

    #[error("Could not find {name} function in brain JS! Brain JS:\n{source_text}")]
    MissingEntryPoint {
        name: &'static str,
        source_text: String,
    },

    #[error("Pending job limit of {0} reached while draining continuations")]
    PendingJobLimit(usize),

    #[error("{0} called on invalid brain")]
    InvalidBrain(&'static str),
}

/// 状态封送错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarshalError {
    #[error("Failed to JSON-parse state:\n{json}")]
    InvalidState { json: String },

    #[error("Could not serialize state returned by script: {reason}. Not reporting to caller.")]
    Unserializable { reason: String },

    #[error("JSON result too large ({actual} bytes, max {max}). Not reporting to caller.")]
    ResultTooLarge { actual: usize, max: usize },

    #[error("Buffer was too big ({actual} bytes, max {max}). Doing nothing.")]
    BufferTooLarge { actual: usize, max: usize },
}

/// 宿主服务协议错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Scripts wanted to use callService, but no call-service function was set by the host.")]
    NoHandler,

    #[error("Service call rejected: {0}")]
    InvalidRequest(ValidationError),

    #[error("Called host service '{0}' while another service call was in flight. Nested service calls are not supported.")]
    Nested(String),

    #[error("Could not serialize arguments when trying to call service '{service}': {reason}. Returning nothing.")]
    UnserializableArgs { service: String, reason: String },

    #[error("WARNING: Called host service '{0}', but it never reported back results.")]
    NotReported(String),

    #[error("ReportServiceResult was called, but no current service user was set? Result json: {0}")]
    NoCurrentUser(String),

    #[error("Service result was rejected: {0}")]
    ResultRejected(ValidationError),

    #[error("Could not parse service result json: {0}")]
    InvalidResult(String),
}

/// 运行时结果类型别名
pub type RuntimeResult<T> = Result<T, BrainError>;
pub type ScriptResult<T> = Result<T, ScriptError>;
pub type MarshalResult<T> = Result<T, MarshalError>;
