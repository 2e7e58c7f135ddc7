// ============================================================================
// Brain：一个 brain 拥有独立的 QuickJS 运行时与 context
// 支持 updateAgent / postMessageFlush 入口、模块热重载、pending job 排空
// ============================================================================

use rquickjs::context::EvalOptions;
use rquickjs::{ArrayBuffer, CatchResultExt, Context, Ctx, Function, Persistent, Runtime, Value};

use crate::bindings::actor::ActorFieldBridge;
use crate::bindings::protocol::HostLog;
use crate::bindings::service::{InFlight, ServiceBridge};
use crate::config::EngineConfig;
use crate::core::error::{BrainError, RuntimeResult, ScriptError};
use crate::core::limits::Limit;
use crate::scripting::capabilities::{self, CapabilityEnv, BRAIN_CAPABILITIES};
use crate::scripting::exception::{self, diagnose, ScriptDiagnostic};
use crate::scripting::marshal;
use crate::scripting::modules::{ModuleStore, NoNestedImports};

pub const UPDATE_AGENT: &str = "updateAgent";
pub const POST_MESSAGE_FLUSH: &str = "postMessageFlush";

/// 以非严格模式的经典脚本求值，允许给未声明的全局变量赋值
pub(crate) fn eval_script<'js>(ctx: &Ctx<'js>, source: &str) -> rquickjs::Result<Value<'js>> {
    let mut options = EvalOptions::default();
    options.strict = false;
    ctx.eval_with_options(source, options)
}

/// 创建 brain 时需要的宿主端环境
#[derive(Clone)]
pub struct BrainEnv {
    pub log: HostLog,
    pub in_flight: InFlight,
    pub engine: EngineConfig,
}

/// 编译后的 brain
///
/// 字段按释放顺序声明：所有 Persistent 句柄先于 context 与 runtime 释放。
pub struct Brain {
    update_agent: Persistent<Function<'static>>,
    post_message_flush: Option<Persistent<Function<'static>>>,
    modules: ModuleStore,
    service: ServiceBridge,
    source: String,
    max_pending_jobs: Option<usize>,
    context: Context,
    runtime: Runtime,
}

impl Brain {
    /// 编译 brain 源码并解析入口函数
    pub fn new(source: &str, env: &BrainEnv) -> RuntimeResult<Self> {
        let runtime = Runtime::new()?;
        if let Some(limit) = env.engine.memory_limit {
            runtime.set_memory_limit(limit);
        }
        if let Some(size) = env.engine.max_stack_size {
            runtime.set_max_stack_size(size);
        }
        runtime.set_loader(NoNestedImports, NoNestedImports);
        let context = Context::full(&runtime)?;

        let modules = ModuleStore::default();
        let service = ServiceBridge::new(env.log.clone(), env.in_flight.clone());
        let capability_env = CapabilityEnv {
            log: env.log.clone(),
            modules: modules.clone(),
            service: service.clone(),
            actors: ActorFieldBridge::new(env.log.clone()),
        };

        let entry_points = context.with(|ctx| -> RuntimeResult<_> {
            capabilities::install(&ctx, BRAIN_CAPABILITIES, &capability_env)?;

            let lookup = |_: Option<&str>| Some(source.to_string());
            if let Err(caught) = eval_script(&ctx, source).catch(&ctx) {
                let err = if exception::is_syntax_error(&caught) {
                    ScriptError::Compilation {
                        prefix: "Error while compiling brain JS: ",
                        diagnostic: diagnose(caught, &lookup),
                    }
                } else {
                    ScriptError::Runtime {
                        prefix: "Exception caught while running brain JS: ",
                        diagnostic: diagnose(caught, &lookup),
                    }
                };
                return Err(err.into());
            }

            let globals = ctx.globals();
            let update_agent = globals
                .get::<_, Value>(UPDATE_AGENT)?
                .into_function()
                .ok_or_else(|| ScriptError::MissingEntryPoint {
                    name: UPDATE_AGENT,
                    source_text: source.to_string(),
                })?;
            let post_message_flush = globals
                .get::<_, Value>(POST_MESSAGE_FLUSH)?
                .into_function()
                .map(|f| Persistent::save(&ctx, f));

            Ok((Persistent::save(&ctx, update_agent), post_message_flush))
        });

        let (update_agent, post_message_flush) = match entry_points {
            Ok(entry_points) => entry_points,
            Err(e) => {
                // Closures installed in the context hold clones of the store.
                modules.clear();
                return Err(e);
            }
        };

        Ok(Self {
            update_agent,
            post_message_flush,
            modules,
            service,
            source: source.to_string(),
            max_pending_jobs: env.engine.max_pending_jobs,
            context,
            runtime,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn has_post_message_flush(&self) -> bool {
        self.post_message_flush.is_some()
    }

    pub fn modules(&self) -> &ModuleStore {
        &self.modules
    }

    pub fn last_service_result(&self) -> Option<String> {
        self.service.last_result()
    }

    /// 编译并（重新）设置一个模块，失败时不改动已有模块
    pub fn set_module(&self, module_id: &str, source: &str) -> RuntimeResult<()> {
        Limit::Identifier.check(module_id)?;
        Limit::ScriptSource.check(source)?;
        self.context
            .with(|ctx| self.modules.set(&ctx, module_id, source))?;
        Ok(())
    }

    /// 按 id 取模块命名空间；未知 id 得到 `undefined`，以 JSON 文本返回供宿主检查
    pub fn module_namespace_json(&self, module_id: &str) -> RuntimeResult<Option<String>> {
        self.context.with(|ctx| -> RuntimeResult<Option<String>> {
            let ns = self.modules.namespace(&ctx, module_id)?;
            if ns.is_undefined() {
                return Ok(None);
            }
            Ok(Some(marshal::encode_state(&ctx, ns)?))
        })
    }

    /// 一次完整的 update：解码 -> updateAgent -> 排空 pending job -> postMessageFlush -> 编码
    ///
    /// 脚本直接读写 `buffer`；返回前（包括出错或 panic 时）视图会被 detach。
    pub fn update(&self, state_json: &str, buffer: &mut [u8]) -> RuntimeResult<String> {
        let view = self.context.with(|ctx| -> RuntimeResult<_> {
            // SAFETY: the guard below detaches the view before `buffer` is released.
            let view = unsafe { marshal::wrap_host_buffer(&ctx, buffer)? };
            Ok(Persistent::save(&ctx, view))
        })?;
        let _detach = DetachOnDrop {
            context: &self.context,
            view: Some(view.clone()),
        };

        let state = self.context.with(|ctx| -> RuntimeResult<_> {
            let state = marshal::decode_state(&ctx, state_json)?;
            let view: ArrayBuffer = view.clone().restore(&ctx)?;
            let update_agent = self.update_agent.clone().restore(&ctx)?;
            if let Err(caught) = update_agent
                .call::<_, Value>((state.clone(), view))
                .catch(&ctx)
            {
                return Err(self.runtime_error("Error while calling updateAgent: ", caught));
            }
            Ok(Persistent::save(&ctx, state))
        })?;

        self.drain_pending_jobs()?;

        self.context.with(|ctx| -> RuntimeResult<String> {
            let state = state.restore(&ctx)?;
            if let Some(flush) = &self.post_message_flush {
                let view: ArrayBuffer = view.restore(&ctx)?;
                let flush = flush.clone().restore(&ctx)?;
                if let Err(caught) = flush.call::<_, Value>((state.clone(), view)).catch(&ctx) {
                    return Err(self.runtime_error("Error while calling postMessageFlush: ", caught));
                }
            }
            Ok(marshal::encode_state(&ctx, state)?)
        })
    }

    fn runtime_error(&self, prefix: &'static str, caught: rquickjs::CaughtError<'_>) -> BrainError {
        let lookup = |file: Option<&str>| {
            file.and_then(|f| self.modules.source(f))
                .or_else(|| Some(self.source.clone()))
        };
        ScriptError::Runtime {
            prefix,
            diagnostic: diagnose(caught, &lookup),
        }
        .into()
    }

    /// 同步执行所有 pending job（promise 回调等）直到队列为空
    pub fn drain_pending_jobs(&self) -> RuntimeResult<usize> {
        let mut executed = 0usize;
        loop {
            if let Some(max) = self.max_pending_jobs {
                if executed >= max && self.runtime.is_job_pending() {
                    return Err(ScriptError::PendingJobLimit(max).into());
                }
            }
            match self.runtime.execute_pending_job() {
                Ok(true) => executed += 1,
                Ok(false) => break,
                Err(job) => {
                    let diagnostic = job.0.with(|ctx| {
                        ScriptDiagnostic::message(exception::describe_pending(
                            &ctx,
                            rquickjs::Error::Exception,
                        ))
                    });
                    return Err(ScriptError::Runtime {
                        prefix: "Exception caught while pumping pending jobs: ",
                        diagnostic,
                    }
                    .into());
                }
            }
        }
        if executed > 0 {
            tracing::trace!(target: "brain", executed, "drained pending jobs");
        }
        Ok(executed)
    }
}

/// Cuts the script's view of host memory when an update ends.
struct DetachOnDrop<'a> {
    context: &'a Context,
    view: Option<Persistent<ArrayBuffer<'static>>>,
}

impl Drop for DetachOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(view) = self.view.take() {
            self.context.with(|ctx| {
                if let Ok(mut view) = view.restore(&ctx) {
                    view.detach();
                }
            });
        }
    }
}

impl Drop for Brain {
    fn drop(&mut self) {
        // Namespaces are also reachable from the getModule closure living in
        // the context, so release them explicitly before the context goes.
        self.modules.clear();
    }
}
