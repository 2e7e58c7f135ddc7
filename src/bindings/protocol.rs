//! Host Hook Protocol
//!
//! Everything the host plugs into the runtime: log sinks, the call-service
//! function and the typed actor field accessors. Every hook is optional; an
//! unset hook disables the feature instead of crashing.

use glam::{Quat, Vec3};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::bindings::service::ServiceReporter;

/// Actor ids are only guaranteed to be valid within a single update call.
pub type ActorId = u16;
pub type FieldId = u16;

pub type LogFn = Rc<dyn Fn(&str)>;

/// Called with `(service_name, args_json, reporter)`. The host must call
/// `reporter.report(result_json)` before returning.
pub type CallServiceFn = Rc<dyn Fn(&str, &str, &ServiceReporter)>;

pub type BooleanGetter = Rc<dyn Fn(ActorId, FieldId) -> bool>;
pub type BooleanSetter = Rc<dyn Fn(ActorId, FieldId, bool)>;
pub type FloatGetter = Rc<dyn Fn(ActorId, FieldId) -> f32>;
pub type FloatSetter = Rc<dyn Fn(ActorId, FieldId, f32)>;
pub type Vector3Getter = Rc<dyn Fn(ActorId, FieldId) -> Vec3>;
pub type Vector3Setter = Rc<dyn Fn(ActorId, FieldId, Vec3)>;
pub type QuaternionGetter = Rc<dyn Fn(ActorId, FieldId) -> Quat>;
pub type QuaternionSetter = Rc<dyn Fn(ActorId, FieldId, Quat)>;
pub type StringGetter = Rc<dyn Fn(ActorId, FieldId) -> String>;
/// The setter receives a borrowed string and must copy it out.
pub type StringSetter = Rc<dyn Fn(ActorId, FieldId, &str)>;

/// The ten actor field accessors, one per (type, direction) pair.
#[derive(Default, Clone)]
pub struct ActorAccessors {
    pub boolean_getter: Option<BooleanGetter>,
    pub boolean_setter: Option<BooleanSetter>,
    pub float_getter: Option<FloatGetter>,
    pub float_setter: Option<FloatSetter>,
    pub vector3_getter: Option<Vector3Getter>,
    pub vector3_setter: Option<Vector3Setter>,
    pub quaternion_getter: Option<QuaternionGetter>,
    pub quaternion_setter: Option<QuaternionSetter>,
    pub string_getter: Option<StringGetter>,
    pub string_setter: Option<StringSetter>,
}

/// All host-registered hooks.
#[derive(Default, Clone)]
pub struct HostHooks {
    pub debug_log: Option<LogFn>,
    pub error_log: Option<LogFn>,
    pub call_service: Option<CallServiceFn>,
    pub actors: ActorAccessors,
}

impl fmt::Debug for HostHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostHooks")
            .field("debug_log", &self.debug_log.is_some())
            .field("error_log", &self.error_log.is_some())
            .field("call_service", &self.call_service.is_some())
            .finish_non_exhaustive()
    }
}

/// Hooks shared between the runtime facade and every brain it creates, so a
/// hook registered after a brain was built is still seen by that brain.
pub type SharedHooks = Rc<RefCell<HostHooks>>;

/// Logging through the host sinks, mirrored to `tracing`.
#[derive(Clone, Default)]
pub struct HostLog {
    hooks: SharedHooks,
}

impl HostLog {
    pub fn new(hooks: SharedHooks) -> Self {
        Self { hooks }
    }

    pub fn hooks(&self) -> &SharedHooks {
        &self.hooks
    }

    pub fn debug(&self, msg: &str) {
        tracing::debug!(target: "brain", "{}", msg);
        // Clone the sink out so a sink that touches the hooks cannot hit a
        // RefCell borrow conflict.
        let sink = self.hooks.borrow().debug_log.clone();
        if let Some(sink) = sink {
            sink(msg);
        }
    }

    pub fn error(&self, msg: &str) {
        tracing::error!(target: "brain", "{}", msg);
        let sink = self.hooks.borrow().error_log.clone();
        if let Some(sink) = sink {
            sink(msg);
        }
    }

    pub fn report(&self, err: &dyn fmt::Display) {
        self.error(&err.to_string());
    }
}
