//! 宿主服务层
//!
//! [`BrainRuntime`] 是 Rust 宿主使用的门面；C ABI（`bindings::ffi`）也建立在它之上。

pub mod runtime;

pub use runtime::BrainRuntime;
