//! 脚本执行层
//!
//! - `brain` - 单个 brain 的 context、入口函数与 update 周期
//! - `registry` - brain id 到 brain 的注册表
//! - `modules` - 每个 brain 的模块存储（热重载）
//! - `marshal` - 状态 JSON / 字节缓冲区封送
//! - `capabilities` - 安装到 context 的全局函数表
//! - `exception` - 脚本异常诊断
//! - `scratch` - 诊断用的临时求值

pub mod brain;
pub mod capabilities;
pub mod exception;
pub mod marshal;
pub mod modules;
pub mod registry;
pub mod scratch;

pub use brain::{Brain, BrainEnv};
pub use registry::BrainRegistry;
pub use scratch::ScratchContext;
