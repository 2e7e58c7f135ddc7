//! Host Binding Layer
//!
//! Everything that crosses the boundary between the host and the scripts:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Host                             │
//! │   log sinks   call-service fn   actor field accessors    │
//! └──────┬───────────────┬──────────────────┬────────────────┘
//!        │               │                  │
//!        v               v                  v
//! ┌──────────────────────────────────────────────────────────┐
//! │  protocol (HostHooks)    service      actor     ffi (C)  │
//! └───────────────────────────┬──────────────────────────────┘
//!                             │
//!                             v
//! ┌──────────────────────────────────────────────────────────┐
//! │           Script capabilities (sysLog, callService, ...) │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod actor;
pub mod ffi;
pub mod protocol;
pub mod service;

pub use protocol::*;
pub use service::{InFlight, ServiceBridge, ServiceReporter};
