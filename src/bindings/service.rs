//! Synchronous host service bridge.
//!
//! From a script's point of view `callService(name, args)` is an ordinary
//! blocking call. Underneath it is an outbound call into the host plus an
//! inbound report: the host receives a [`ServiceReporter`] scoped to that one
//! call and must report the result JSON before its call-service hook returns.
//!
//! Only one service call may be in flight per runtime. A nested call (a host
//! service that re-enters a brain which calls another service) is refused
//! and logged instead of corrupting the pending result.

use rquickjs::convert::Coerced;
use rquickjs::{Ctx, FromJs, Value};
use serde::de::IgnoredAny;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::bindings::protocol::{HostLog, SharedHooks};
use crate::core::error::ServiceError;
use crate::core::limits::Limit;

/// Runtime-wide "a service call is in flight" flag.
pub type InFlight = Rc<Cell<bool>>;

struct ReportSlot {
    awaiting: Cell<bool>,
    open: Cell<bool>,
    target: Rc<RefCell<Option<String>>>,
}

/// Call-scoped handle the host uses to deliver a service result.
///
/// Reporting after the call has returned is a protocol error: it is logged
/// and ignored.
#[derive(Clone)]
pub struct ServiceReporter {
    slot: Rc<ReportSlot>,
    log: HostLog,
}

impl ServiceReporter {
    pub fn report(&self, result_json: &str) -> Result<(), ServiceError> {
        if let Err(e) = Limit::Json.check(result_json) {
            let err = ServiceError::ResultRejected(e);
            self.log.report(&err);
            return Err(err);
        }

        self.slot.awaiting.set(false);
        if !self.slot.open.get() {
            let err = ServiceError::NoCurrentUser(result_json.to_string());
            self.log.report(&err);
            return Err(err);
        }

        if serde_json::from_str::<IgnoredAny>(result_json).is_err() {
            *self.slot.target.borrow_mut() = None;
            let err = ServiceError::InvalidResult(result_json.to_string());
            self.log.report(&err);
            return Err(err);
        }

        *self.slot.target.borrow_mut() = Some(result_json.to_string());
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.slot.open.get()
    }
}

// Clears the in-flight state even if the host hook panics.
struct CallGuard<'a> {
    in_flight: &'a InFlight,
    slot: &'a ReportSlot,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.slot.open.set(false);
        self.in_flight.set(false);
    }
}

/// Per-brain end of the service bridge: holds the brain's last result.
#[derive(Clone)]
pub struct ServiceBridge {
    log: HostLog,
    in_flight: InFlight,
    last_result: Rc<RefCell<Option<String>>>,
}

impl ServiceBridge {
    pub fn new(log: HostLog, in_flight: InFlight) -> Self {
        Self {
            log,
            in_flight,
            last_result: Rc::default(),
        }
    }

    fn hooks(&self) -> &SharedHooks {
        self.log.hooks()
    }

    pub fn last_result(&self) -> Option<String> {
        self.last_result.borrow().clone()
    }

    /// Calls a host service with already-serialized arguments.
    ///
    /// Returns the brain's stored result after the call. When the host fails
    /// to report, that is whatever the previous call left behind.
    pub fn call_json(&self, service: &str, args_json: &str) -> Result<Option<String>, ServiceError> {
        Limit::ServiceName
            .check(service)
            .map_err(ServiceError::InvalidRequest)?;
        Limit::Json
            .check(args_json)
            .map_err(ServiceError::InvalidRequest)?;

        let handler = self
            .hooks()
            .borrow()
            .call_service
            .clone()
            .ok_or(ServiceError::NoHandler)?;

        if self.in_flight.get() {
            return Err(ServiceError::Nested(service.to_string()));
        }

        let slot = Rc::new(ReportSlot {
            awaiting: Cell::new(true),
            open: Cell::new(true),
            target: Rc::clone(&self.last_result),
        });
        let reporter = ServiceReporter {
            slot: Rc::clone(&slot),
            log: self.log.clone(),
        };

        {
            self.in_flight.set(true);
            let _guard = CallGuard {
                in_flight: &self.in_flight,
                slot: &slot,
            };
            tracing::trace!(target: "brain.service", service, "calling host service");
            handler(service, args_json, &reporter);
        }

        if slot.awaiting.get() {
            self.log
                .report(&ServiceError::NotReported(service.to_string()));
        }

        Ok(self.last_result())
    }

    /// Script-facing `callService(name, args)`.
    ///
    /// Every failure is logged and yields `undefined`; nothing is thrown.
    pub fn call_from_script<'js>(
        &self,
        ctx: &Ctx<'js>,
        name: Value<'js>,
        args: Value<'js>,
    ) -> rquickjs::Result<Value<'js>> {
        let undefined = Value::new_undefined(ctx.clone());

        let service = match Coerced::<String>::from_js(ctx, name) {
            Ok(Coerced(service)) => service,
            Err(_) => {
                let _ = ctx.catch();
                self.log.error("callService: service name must be a string");
                return Ok(undefined);
            }
        };

        let args_json = match ctx.json_stringify(args) {
            Ok(Some(json)) => json.to_string()?,
            Ok(None) => "null".to_string(),
            Err(e) => {
                let reason = crate::scripting::exception::describe_pending(ctx, e);
                self.log.report(&ServiceError::UnserializableArgs {
                    service: service.clone(),
                    reason,
                });
                return Ok(undefined);
            }
        };

        let result = match self.call_json(&service, &args_json) {
            Ok(Some(result)) => result,
            Ok(None) => {
                self.log.error(&format!(
                    "Failed to capture result of service '{}'. See prior errors for details. Input args json: {}",
                    service, args_json
                ));
                return Ok(undefined);
            }
            Err(ServiceError::InvalidRequest(_)) => return Ok(undefined),
            Err(e) => {
                self.log.report(&e);
                return Ok(undefined);
            }
        };

        match ctx.json_parse(result.as_str()) {
            Ok(value) => Ok(value),
            Err(_) => {
                let _ = ctx.catch();
                self.log
                    .report(&ServiceError::InvalidResult(result));
                Ok(undefined)
            }
        }
    }
}
