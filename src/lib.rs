//! # Brain Runtime
//!
//! An embedded JavaScript runtime for per-actor "brains" in a simulation host.
//!
//! ## Features
//!
//! - **Isolated brains**: every brain owns its own QuickJS runtime and context
//! - **State marshaling**: JSON state in, JSON state out, plus an optional byte buffer
//! - **Module hot reload**: named modules replaced in place without rebuilding the brain
//! - **Host services**: synchronous `callService` backed by a host callback
//! - **Actor fields**: typed get/set accessors dispatched to host hooks
//! - **C ABI**: the whole surface is exported for native hosts
//!
//! ### Example
//!
//! ```no_run
//! use brain_runtime::BrainRuntime;
//!
//! let mut runtime = BrainRuntime::default();
//! runtime.initialize(".").unwrap();
//! runtime
//!     .reset_brain("walker", "function updateAgent(state) { state.steps += 1; }")
//!     .unwrap();
//! runtime
//!     .update_agent("walker", "agent-1", r#"{"steps":0}"#, |json| println!("{json}"))
//!     .unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`core`]: errors, size limits, logging
//! - [`config`]: runtime configuration
//! - [`bindings`]: host hooks, service bridge, actor accessors, C ABI
//! - [`scripting`]: brains, registry, modules, marshaling
//! - [`services`]: the [`BrainRuntime`] facade

/// Errors, size limits and logging
pub mod core;
/// Configuration system
pub mod config;
/// Host hooks and the C ABI
pub mod bindings;
/// Script execution
pub mod scripting;
/// Host-facing facade
pub mod services;

pub use crate::bindings::protocol::{ActorAccessors, HostHooks};
pub use crate::bindings::service::ServiceReporter;
pub use crate::config::RuntimeConfig;
pub use crate::core::error::{BrainError, RuntimeResult};
pub use crate::services::BrainRuntime;
