//! C ABI
//!
//! Exposes [`BrainRuntime`] to a native host. The runtime lives in a
//! thread-local, so every entry point must be called from the thread that
//! called `brain_initialize`. Panics are caught at the boundary and turned
//! into failure codes.
//!
//! Strings are NUL-terminated UTF-8. A null pointer is treated as an empty
//! string and rejected by validation.

use std::cell::RefCell;
use std::ffi::{c_char, c_int, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use glam::{Quat, Vec3};

use crate::bindings::protocol::{
    ActorId, BooleanGetter, BooleanSetter, CallServiceFn, FieldId, FloatGetter, FloatSetter, LogFn,
    QuaternionGetter, QuaternionSetter, StringGetter, StringSetter, Vector3Getter, Vector3Setter,
};
use crate::bindings::service::ServiceReporter;
use crate::config::RuntimeConfig;
use crate::core::error::ServiceError;
use crate::core::limits::{MAX_ACTOR_STRING_LENGTH, MAX_BUFFER_SIZE};
use crate::core::logging::init_tracing;
use crate::services::BrainRuntime;

pub type StringFunction = Option<unsafe extern "C" fn(*const c_char)>;
pub type ReportServiceResultFunction = unsafe extern "C" fn(*const c_char);
pub type CallServiceFunction =
    Option<unsafe extern "C" fn(*const c_char, *const c_char, ReportServiceResultFunction)>;

pub type ActorBooleanGetter = Option<unsafe extern "C" fn(ActorId, FieldId, *mut bool)>;
pub type ActorBooleanSetter = Option<unsafe extern "C" fn(ActorId, FieldId, bool)>;
pub type ActorFloatGetter = Option<unsafe extern "C" fn(ActorId, FieldId, *mut f32)>;
pub type ActorFloatSetter = Option<unsafe extern "C" fn(ActorId, FieldId, f32)>;
pub type ActorVector3Getter =
    Option<unsafe extern "C" fn(ActorId, FieldId, *mut f32, *mut f32, *mut f32)>;
pub type ActorVector3Setter = Option<unsafe extern "C" fn(ActorId, FieldId, f32, f32, f32)>;
pub type ActorQuaternionGetter =
    Option<unsafe extern "C" fn(ActorId, FieldId, *mut f32, *mut f32, *mut f32, *mut f32)>;
pub type ActorQuaternionSetter =
    Option<unsafe extern "C" fn(ActorId, FieldId, f32, f32, f32, f32)>;
/// The getter writes at most `max_bytes` bytes, NUL-terminated.
pub type ActorStringGetter = Option<unsafe extern "C" fn(ActorId, FieldId, *mut c_char, c_int)>;
/// The setter must copy the string out; the pointer dies when it returns.
pub type ActorStringSetter = Option<unsafe extern "C" fn(ActorId, FieldId, *const c_char)>;

thread_local! {
    static RUNTIME: RefCell<BrainRuntime> =
        RefCell::new(BrainRuntime::new(RuntimeConfig::load_or_default()));
    static LAST_REPORTER: RefCell<Option<ServiceReporter>> = const { RefCell::new(None) };
    // All zeroes between actor string reads.
    static STRING_SCRATCH: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

// ----------------------------------------------------------------------------
// boundary helpers
// ----------------------------------------------------------------------------

unsafe fn str_arg<'a>(ptr: *const c_char) -> &'a str {
    if ptr.is_null() {
        return "";
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(target: "brain.ffi", error = %e, "string argument is not valid UTF-8");
            ""
        }
    }
}

fn emit(f: unsafe extern "C" fn(*const c_char), msg: &str) {
    match CString::new(msg) {
        Ok(msg) => unsafe { f(msg.as_ptr()) },
        Err(_) => {
            tracing::warn!(target: "brain.ffi", "message contains an interior NUL; not forwarded")
        }
    }
}

fn guarded<R>(op: &'static str, fallback: R, f: impl FnOnce() -> R) -> R {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(r) => r,
        Err(_) => {
            tracing::error!(target: "brain.ffi", op, "panic caught at the C boundary");
            fallback
        }
    }
}

fn with_runtime<R: Copy>(op: &'static str, fallback: R, f: impl FnOnce(&BrainRuntime) -> R) -> R {
    guarded(op, fallback, || {
        RUNTIME.with(|rt| match rt.try_borrow() {
            Ok(rt) => f(&rt),
            Err(_) => {
                tracing::error!(target: "brain.ffi", op, "runtime is busy; re-entrant call refused");
                fallback
            }
        })
    })
}

fn with_runtime_mut<R: Copy>(
    op: &'static str,
    fallback: R,
    f: impl FnOnce(&mut BrainRuntime) -> R,
) -> R {
    guarded(op, fallback, || {
        RUNTIME.with(|rt| match rt.try_borrow_mut() {
            Ok(mut rt) => f(&mut rt),
            Err(_) => {
                tracing::error!(target: "brain.ffi", op, "runtime is busy; re-entrant call refused");
                fallback
            }
        })
    })
}

// ----------------------------------------------------------------------------
// lifecycle
// ----------------------------------------------------------------------------

/// Returns 0 on success, 1 on failure.
#[no_mangle]
pub unsafe extern "C" fn brain_initialize(runtime_path: *const c_char) -> c_int {
    let path = str_arg(runtime_path);
    with_runtime_mut("brain_initialize", 1, |rt| {
        init_tracing(&rt.config().logging);
        match rt.initialize(path) {
            Ok(()) => 0,
            Err(_) => 1,
        }
    })
}

/// Returns 0 on success, 1 when the runtime was not initialized.
#[no_mangle]
pub extern "C" fn brain_deinitialize() -> c_int {
    with_runtime_mut("brain_deinitialize", 1, |rt| match rt.deinitialize() {
        Ok(()) => 0,
        Err(_) => 1,
    })
}

// ----------------------------------------------------------------------------
// brains
// ----------------------------------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn brain_reset(brain_id: *const c_char, source: *const c_char) -> bool {
    let (brain_id, source) = (str_arg(brain_id), str_arg(source));
    with_runtime_mut("brain_reset", false, |rt| rt.reset_brain(brain_id, source).is_ok())
}

#[no_mangle]
pub unsafe extern "C" fn brain_set_module(
    brain_id: *const c_char,
    module_id: *const c_char,
    source: *const c_char,
) -> bool {
    let (brain_id, module_id, source) = (str_arg(brain_id), str_arg(module_id), str_arg(source));
    with_runtime("brain_set_module", false, |rt| {
        rt.set_module(brain_id, module_id, source).is_ok()
    })
}

#[no_mangle]
pub unsafe extern "C" fn brain_update_agent(
    brain_id: *const c_char,
    agent_id: *const c_char,
    state_json: *const c_char,
    report_result: StringFunction,
) -> bool {
    brain_update_agent_bytes(
        brain_id,
        agent_id,
        state_json,
        std::ptr::null_mut(),
        0,
        report_result,
    )
}

/// `bytes` may be null when `length` is 0. The script reads and writes
/// `bytes` in place; it holds no reference to them once this returns.
#[no_mangle]
pub unsafe extern "C" fn brain_update_agent_bytes(
    brain_id: *const c_char,
    agent_id: *const c_char,
    state_json: *const c_char,
    bytes: *mut u8,
    length: c_int,
    report_result: StringFunction,
) -> bool {
    let (brain_id, agent_id, state_json) =
        (str_arg(brain_id), str_arg(agent_id), str_arg(state_json));

    let length = match usize::try_from(length) {
        Ok(n) if n <= MAX_BUFFER_SIZE => n,
        _ => {
            tracing::warn!(
                target: "brain.ffi",
                length,
                max = MAX_BUFFER_SIZE,
                "buffer length out of range. Doing nothing."
            );
            return false;
        }
    };
    let buffer: &mut [u8] = if bytes.is_null() || length == 0 {
        &mut []
    } else {
        std::slice::from_raw_parts_mut(bytes, length)
    };

    with_runtime("brain_update_agent_bytes", false, |rt| {
        rt.update_agent_bytes(brain_id, agent_id, state_json, buffer, |json| {
            if let Some(report) = report_result {
                emit(report, json);
            }
        })
        .is_ok()
    })
}

// ----------------------------------------------------------------------------
// scratch evaluation
// ----------------------------------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn brain_evaluate(source: *const c_char) {
    let source = str_arg(source);
    with_runtime("brain_evaluate", (), |rt| {
        let _ = rt.evaluate(source);
    })
}

#[no_mangle]
pub unsafe extern "C" fn brain_evaluate_to_integer(source: *const c_char) -> c_int {
    let source = str_arg(source);
    with_runtime("brain_evaluate_to_integer", 0, |rt| rt.evaluate_to_integer(source))
}

// ----------------------------------------------------------------------------
// host services
// ----------------------------------------------------------------------------

/// Delivers the result of the service call currently in flight.
#[no_mangle]
pub unsafe extern "C" fn brain_report_service_result(result_json: *const c_char) {
    let result_json = str_arg(result_json);
    let reporter = LAST_REPORTER.with(|r| r.borrow().clone());
    match reporter {
        // Errors are logged by the reporter.
        Some(reporter) => guarded("brain_report_service_result", (), || {
            let _ = reporter.report(result_json);
        }),
        None => with_runtime("brain_report_service_result", (), |rt| {
            rt.host_log()
                .report(&ServiceError::NoCurrentUser(result_json.to_string()))
        }),
    }
}

#[no_mangle]
pub extern "C" fn brain_set_call_service_function(f: CallServiceFunction) {
    let handler = f.map(|f| {
        Rc::new(move |service: &str, args: &str, reporter: &ServiceReporter| {
            let (Ok(service), Ok(args)) = (CString::new(service), CString::new(args)) else {
                tracing::warn!(target: "brain.service", "service call contains an interior NUL");
                return;
            };
            LAST_REPORTER.with(|r| *r.borrow_mut() = Some(reporter.clone()));
            unsafe { f(service.as_ptr(), args.as_ptr(), brain_report_service_result) };
        }) as CallServiceFn
    });
    with_runtime("brain_set_call_service_function", (), |rt| rt.set_call_service(handler))
}

// ----------------------------------------------------------------------------
// log sinks
// ----------------------------------------------------------------------------

fn log_sink(f: StringFunction) -> Option<LogFn> {
    f.map(|f| Rc::new(move |msg: &str| emit(f, msg)) as LogFn)
}

#[no_mangle]
pub extern "C" fn brain_set_debug_log_function(f: StringFunction) {
    let sink = log_sink(f);
    with_runtime("brain_set_debug_log_function", (), |rt| rt.set_debug_log(sink))
}

#[no_mangle]
pub extern "C" fn brain_set_error_log_function(f: StringFunction) {
    let sink = log_sink(f);
    with_runtime("brain_set_error_log_function", (), |rt| rt.set_error_log(sink))
}

// ----------------------------------------------------------------------------
// actor field accessors
// ----------------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn brain_set_actor_boolean_getter(f: ActorBooleanGetter) {
    with_runtime("brain_set_actor_boolean_getter", (), |rt| {
        rt.update_hooks(|h| {
            h.actors.boolean_getter = f.map(|f| {
                Rc::new(move |actor, field| {
                    let mut value = false;
                    unsafe { f(actor, field, &mut value) };
                    value
                }) as BooleanGetter
            })
        })
    })
}

#[no_mangle]
pub extern "C" fn brain_set_actor_boolean_setter(f: ActorBooleanSetter) {
    with_runtime("brain_set_actor_boolean_setter", (), |rt| {
        rt.update_hooks(|h| {
            h.actors.boolean_setter = f.map(|f| {
                Rc::new(move |actor, field, value| unsafe { f(actor, field, value) }) as BooleanSetter
            })
        })
    })
}

#[no_mangle]
pub extern "C" fn brain_set_actor_float_getter(f: ActorFloatGetter) {
    with_runtime("brain_set_actor_float_getter", (), |rt| {
        rt.update_hooks(|h| {
            h.actors.float_getter = f.map(|f| {
                Rc::new(move |actor, field| {
                    let mut value = 0.0f32;
                    unsafe { f(actor, field, &mut value) };
                    value
                }) as FloatGetter
            })
        })
    })
}

#[no_mangle]
pub extern "C" fn brain_set_actor_float_setter(f: ActorFloatSetter) {
    with_runtime("brain_set_actor_float_setter", (), |rt| {
        rt.update_hooks(|h| {
            h.actors.float_setter = f.map(|f| {
                Rc::new(move |actor, field, value| unsafe { f(actor, field, value) }) as FloatSetter
            })
        })
    })
}

#[no_mangle]
pub extern "C" fn brain_set_actor_vector3_getter(f: ActorVector3Getter) {
    with_runtime("brain_set_actor_vector3_getter", (), |rt| {
        rt.update_hooks(|h| {
            h.actors.vector3_getter = f.map(|f| {
                Rc::new(move |actor, field| {
                    let mut v = Vec3::ZERO;
                    unsafe { f(actor, field, &mut v.x, &mut v.y, &mut v.z) };
                    v
                }) as Vector3Getter
            })
        })
    })
}

#[no_mangle]
pub extern "C" fn brain_set_actor_vector3_setter(f: ActorVector3Setter) {
    with_runtime("brain_set_actor_vector3_setter", (), |rt| {
        rt.update_hooks(|h| {
            h.actors.vector3_setter = f.map(|f| {
                Rc::new(move |actor, field, v: Vec3| unsafe { f(actor, field, v.x, v.y, v.z) }) as Vector3Setter
            })
        })
    })
}

#[no_mangle]
pub extern "C" fn brain_set_actor_quaternion_getter(f: ActorQuaternionGetter) {
    with_runtime("brain_set_actor_quaternion_getter", (), |rt| {
        rt.update_hooks(|h| {
            h.actors.quaternion_getter = f.map(|f| {
                Rc::new(move |actor, field| {
                    let (mut x, mut y, mut z, mut w) = (0.0f32, 0.0f32, 0.0f32, 1.0f32);
                    unsafe { f(actor, field, &mut x, &mut y, &mut z, &mut w) };
                    Quat::from_xyzw(x, y, z, w)
                }) as QuaternionGetter
            })
        })
    })
}

#[no_mangle]
pub extern "C" fn brain_set_actor_quaternion_setter(f: ActorQuaternionSetter) {
    with_runtime("brain_set_actor_quaternion_setter", (), |rt| {
        rt.update_hooks(|h| {
            h.actors.quaternion_setter = f.map(|f| {
                Rc::new(move |actor, field, q: Quat| unsafe { f(actor, field, q.x, q.y, q.z, q.w) })
                    as QuaternionSetter
            })
        })
    })
}

#[no_mangle]
pub extern "C" fn brain_set_actor_string_getter(f: ActorStringGetter) {
    with_runtime("brain_set_actor_string_getter", (), |rt| {
        rt.update_hooks(|h| {
            h.actors.string_getter = f.map(|f| {
                Rc::new(move |actor, field| read_actor_string(f, actor, field)) as StringGetter
            })
        })
    })
}

#[no_mangle]
pub extern "C" fn brain_set_actor_string_setter(f: ActorStringSetter) {
    with_runtime("brain_set_actor_string_setter", (), |rt| {
        rt.update_hooks(|h| {
            h.actors.string_setter = f.map(|f| {
                Rc::new(move |actor, field, value: &str| match CString::new(value) {
                    Ok(value) => unsafe { f(actor, field, value.as_ptr()) },
                    Err(_) => tracing::warn!(
                        target: "brain.actor",
                        actor,
                        field,
                        "actor string contains an interior NUL; not forwarded"
                    ),
                }) as StringSetter
            })
        })
    })
}

fn read_actor_string(
    f: unsafe extern "C" fn(ActorId, FieldId, *mut c_char, c_int),
    actor: ActorId,
    field: FieldId,
) -> String {
    STRING_SCRATCH.with(|scratch| match scratch.try_borrow_mut() {
        Ok(mut scratch) => read_into(f, actor, field, &mut scratch),
        // A getter that re-enters the runtime gets a one-off buffer.
        Err(_) => read_into(f, actor, field, &mut Vec::new()),
    })
}

fn read_into(
    f: unsafe extern "C" fn(ActorId, FieldId, *mut c_char, c_int),
    actor: ActorId,
    field: FieldId,
    scratch: &mut Vec<u8>,
) -> String {
    if scratch.len() != MAX_ACTOR_STRING_LENGTH {
        scratch.clear();
        scratch.resize(MAX_ACTOR_STRING_LENGTH, 0);
    }
    let max_bytes = c_int::try_from(scratch.len()).unwrap_or(c_int::MAX);
    unsafe { f(actor, field, scratch.as_mut_ptr().cast::<c_char>(), max_bytes) };
    // Force termination in case the host filled the whole buffer.
    if let Some(last) = scratch.last_mut() {
        *last = 0;
    }
    let end = scratch.iter().position(|&b| b == 0).unwrap_or(scratch.len());
    let value = String::from_utf8_lossy(&scratch[..end]).into_owned();
    // Nothing from this read may show through an unterminated next one.
    scratch.fill(0);
    value
}
