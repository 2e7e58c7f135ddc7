//! Scratch evaluation for diagnostics.
//!
//! [`ScratchContext`] is a long-lived context with only `sysLog`/`sysError`
//! installed, reused by every [`ScratchContext::evaluate`] call.
//! [`evaluate_to_integer`] builds a throwaway runtime per call.

use rquickjs::convert::Coerced;
use rquickjs::{CatchResultExt, Context, Ctx, FromJs, Runtime, Value};
use std::rc::Rc;

use crate::bindings::actor::ActorFieldBridge;
use crate::bindings::protocol::HostLog;
use crate::bindings::service::ServiceBridge;
use crate::config::EngineConfig;
use crate::core::error::{RuntimeResult, ScriptError};
use crate::core::limits::Limit;
use crate::scripting::brain::eval_script;
use crate::scripting::capabilities::{self, CapabilityEnv, SCRATCH_CAPABILITIES};
use crate::scripting::exception::{self, diagnose};
use crate::scripting::modules::ModuleStore;

pub struct ScratchContext {
    context: Context,
    _runtime: Runtime,
}

impl ScratchContext {
    pub fn new(log: &HostLog, engine: &EngineConfig) -> RuntimeResult<Self> {
        let (runtime, context) = scratch_runtime(log, engine)?;
        Ok(Self {
            context,
            _runtime: runtime,
        })
    }

    /// Runs `source` for its side effects. The completion value is discarded.
    pub fn evaluate(&self, source: &str) -> RuntimeResult<()> {
        Limit::ScriptSource.check(source)?;
        self.context
            .with(|ctx| run(&ctx, source).map(|_| ()))
    }
}

/// Runs `source` in a fresh runtime and converts the completion value with
/// `ToInt32` semantics.
pub fn evaluate_to_integer(source: &str, log: &HostLog, engine: &EngineConfig) -> RuntimeResult<i32> {
    Limit::ScriptSource.check(source)?;
    let (_runtime, context) = scratch_runtime(log, engine)?;
    context.with(|ctx| -> RuntimeResult<i32> {
        let value = run(&ctx, source)?;
        let Coerced(n) = Coerced::<i32>::from_js(&ctx, value)?;
        Ok(n)
    })
}

fn scratch_runtime(log: &HostLog, engine: &EngineConfig) -> RuntimeResult<(Runtime, Context)> {
    let runtime = Runtime::new()?;
    if let Some(limit) = engine.memory_limit {
        runtime.set_memory_limit(limit);
    }
    if let Some(size) = engine.max_stack_size {
        runtime.set_max_stack_size(size);
    }
    let context = Context::full(&runtime)?;

    let env = CapabilityEnv {
        log: log.clone(),
        modules: ModuleStore::default(),
        service: ServiceBridge::new(log.clone(), Rc::default()),
        actors: ActorFieldBridge::new(log.clone()),
    };
    context.with(|ctx| capabilities::install(&ctx, SCRATCH_CAPABILITIES, &env))?;
    Ok((runtime, context))
}

fn run<'js>(ctx: &Ctx<'js>, source: &str) -> RuntimeResult<Value<'js>> {
    let lookup = |_: Option<&str>| Some(source.to_string());
    eval_script(ctx, source).catch(ctx).map_err(|caught| {
        if exception::is_syntax_error(&caught) {
            ScriptError::Compilation {
                prefix: "Could not compile! ",
                diagnostic: diagnose(caught, &lookup),
            }
        } else {
            ScriptError::Runtime {
                prefix: "Exception caught while running: ",
                diagnostic: diagnose(caught, &lookup),
            }
        }
        .into()
    })
}
