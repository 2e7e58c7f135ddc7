/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量和运行时动态调整
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::impl_default;

/// 运行时配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 运行时主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// 脚本引擎配置
    #[serde(default)]
    pub engine: EngineConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RuntimeConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("BRAIN_RUNTIME_MEMORY_LIMIT") {
            if let Ok(limit) = val.parse() {
                self.engine.memory_limit = Some(limit);
            }
        }
        if let Ok(val) = env::var("BRAIN_RUNTIME_MAX_STACK_SIZE") {
            if let Ok(size) = val.parse() {
                self.engine.max_stack_size = Some(size);
            }
        }
        if let Ok(val) = env::var("BRAIN_RUNTIME_MAX_PENDING_JOBS") {
            if let Ok(max) = val.parse() {
                self.engine.max_pending_jobs = Some(max);
            }
        }
        if let Ok(val) = env::var("BRAIN_RUNTIME_LOG_LEVEL") {
            if let Some(level) = LogLevel::parse(&val) {
                self.logging.level = level;
            }
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.engine.validate()
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./brain_runtime.toml
    /// 2. ./brain_runtime.json
    /// 3. ~/.config/brain_runtime/config.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        let mut config = Self::find_config_file().unwrap_or_default();
        config.apply_env_overrides();
        if let Err(e) = config.validate() {
            tracing::warn!(target: "brain", "{}, falling back to defaults", e);
            return Self::default();
        }
        config
    }

    fn find_config_file() -> Option<Self> {
        if let Ok(config) = Self::from_toml_file("brain_runtime.toml") {
            tracing::info!(target: "brain", "Loaded config from brain_runtime.toml");
            return Some(config);
        }

        if let Ok(config) = Self::from_json_file("brain_runtime.json") {
            tracing::info!(target: "brain", "Loaded config from brain_runtime.json");
            return Some(config);
        }

        if let Some(home) = env::var_os("HOME") {
            let config_path = PathBuf::from(home)
                .join(".config")
                .join("brain_runtime")
                .join("config.toml");

            if let Ok(config) = Self::from_toml_file(&config_path) {
                tracing::info!(target: "brain", "Loaded config from {:?}", config_path);
                return Some(config);
            }
        }

        None
    }
}

/// 脚本引擎配置，作用于每个 brain 自己的 QuickJS 运行时
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 单个 brain 的内存上限（字节），None 表示不限制
    #[serde(default)]
    pub memory_limit: Option<usize>,

    /// 单个 brain 的最大栈大小（字节）
    #[serde(default)]
    pub max_stack_size: Option<usize>,

    /// 一次 update 中最多执行的 pending job 数，None 表示一直执行到队列为空
    #[serde(default)]
    pub max_pending_jobs: Option<usize>,
}

impl EngineConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.memory_limit == Some(0) {
            return Err(ConfigError::ValidationError(
                "engine.memory_limit must be greater than zero".to_string(),
            ));
        }
        if self.max_stack_size == Some(0) {
            return Err(ConfigError::ValidationError(
                "engine.max_stack_size must be greater than zero".to_string(),
            ));
        }
        if self.max_pending_jobs == Some(0) {
            return Err(ConfigError::ValidationError(
                "engine.max_pending_jobs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,

    /// 是否输出到控制台
    pub log_to_console: bool,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
    log_to_console: true,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
