// ============================================================================
// BrainRuntime：宿主门面
// initialize / deinitialize / resetBrain / setModule / updateAgent / evaluate
// 所有失败只在这里通过宿主错误日志报告一次
// ============================================================================

use std::rc::Rc;

use crate::bindings::protocol::{
    ActorAccessors, CallServiceFn, HostHooks, HostLog, LogFn, SharedHooks,
};
use crate::bindings::service::InFlight;
use crate::config::RuntimeConfig;
use crate::core::error::{BrainError, RuntimeResult};
use crate::core::limits::Limit;
use crate::scripting::brain::BrainEnv;
use crate::scripting::registry::BrainRegistry;
use crate::scripting::scratch::{self, ScratchContext};

// 注册表先于 scratch context 释放
struct Initialized {
    registry: BrainRegistry,
    scratch: ScratchContext,
    runtime_path: String,
}

/// 宿主与 brain 运行时之间的唯一入口
pub struct BrainRuntime {
    state: Option<Initialized>,
    hooks: SharedHooks,
    log: HostLog,
    in_flight: InFlight,
    config: RuntimeConfig,
}

impl Default for BrainRuntime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl BrainRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        let hooks: SharedHooks = Rc::default();
        Self {
            state: None,
            log: HostLog::new(Rc::clone(&hooks)),
            hooks,
            in_flight: Rc::default(),
            config,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn runtime_path(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.runtime_path.as_str())
    }

    /// 宿主日志接收器，协议错误经由它上报
    pub fn host_log(&self) -> &HostLog {
        &self.log
    }

    // ------------------------------------------------------------------
    // 宿主钩子注册。None 表示关闭该功能。
    // ------------------------------------------------------------------

    pub fn set_debug_log(&self, sink: Option<LogFn>) {
        self.hooks.borrow_mut().debug_log = sink;
    }

    pub fn set_error_log(&self, sink: Option<LogFn>) {
        self.hooks.borrow_mut().error_log = sink;
    }

    pub fn set_call_service(&self, handler: Option<CallServiceFn>) {
        self.hooks.borrow_mut().call_service = handler;
    }

    pub fn set_actor_accessors(&self, accessors: ActorAccessors) {
        self.hooks.borrow_mut().actors = accessors;
    }

    /// 就地修改钩子，例如只替换某一个 actor 访问器
    pub fn update_hooks(&self, f: impl FnOnce(&mut HostHooks)) {
        f(&mut self.hooks.borrow_mut());
    }

    // ------------------------------------------------------------------
    // 生命周期
    // ------------------------------------------------------------------

    pub fn initialize(&mut self, runtime_path: &str) -> RuntimeResult<()> {
        Limit::FilePath.check(runtime_path)?;
        if self.state.is_some() {
            tracing::warn!(
                target: "brain",
                "initialize called, but the runtime was already initialized! Doing nothing."
            );
            return Err(BrainError::AlreadyInitialized);
        }
        self.logged(self.config.engine.validate().map_err(BrainError::from))?;

        let scratch = self.logged(ScratchContext::new(&self.log, &self.config.engine))?;
        self.state = Some(Initialized {
            registry: BrainRegistry::new(),
            scratch,
            runtime_path: runtime_path.to_string(),
        });
        tracing::info!(target: "brain", runtime_path, "brain runtime initialized");
        Ok(())
    }

    pub fn deinitialize(&mut self) -> RuntimeResult<()> {
        match self.state.take() {
            Some(mut state) => {
                state.registry.clear();
                drop(state);
                tracing::info!(target: "brain", "brain runtime deinitialized");
                Ok(())
            }
            None => {
                tracing::warn!(
                    target: "brain",
                    "deinitialize called before initialize. Doing nothing."
                );
                Err(BrainError::NotInitialized)
            }
        }
    }

    // ------------------------------------------------------------------
    // Brain 操作
    // ------------------------------------------------------------------

    pub fn reset_brain(&mut self, brain_id: &str, source: &str) -> RuntimeResult<()> {
        let env = self.brain_env();
        let result = match self.state.as_mut() {
            Some(state) => state.registry.reset(brain_id, source, &env),
            None => Err(BrainError::NotInitialized),
        };
        self.logged(result)
    }

    pub fn set_module(&self, brain_id: &str, module_id: &str, source: &str) -> RuntimeResult<()> {
        let result = self
            .registry()
            .and_then(|registry| registry.set_module(brain_id, module_id, source));
        self.logged(result)
    }

    /// 执行一次 update。成功时 `on_result` 恰好被调用一次。
    pub fn update_agent(
        &self,
        brain_id: &str,
        agent_id: &str,
        state_json: &str,
        on_result: impl FnOnce(&str),
    ) -> RuntimeResult<()> {
        self.update_agent_bytes(brain_id, agent_id, state_json, &mut [], on_result)
    }

    /// 带字节缓冲区的 update；脚本直接读写 `buffer`，返回后不再持有它
    pub fn update_agent_bytes(
        &self,
        brain_id: &str,
        agent_id: &str,
        state_json: &str,
        buffer: &mut [u8],
        on_result: impl FnOnce(&str),
    ) -> RuntimeResult<()> {
        let result = self.run_update(brain_id, agent_id, state_json, buffer);
        let json = self.logged(result)?;
        on_result(&json);
        Ok(())
    }

    fn run_update(
        &self,
        brain_id: &str,
        agent_id: &str,
        state_json: &str,
        buffer: &mut [u8],
    ) -> RuntimeResult<String> {
        Limit::Identifier.check(brain_id)?;
        Limit::Identifier.check(agent_id)?;
        Limit::Json.check(state_json)?;
        Limit::Buffer.check_len(buffer.len())?;

        let brain = self.registry()?.get(brain_id)?;
        tracing::trace!(target: "brain", brain_id, agent_id, bytes = buffer.len(), "update agent");
        brain.update(state_json, buffer)
    }

    /// 以 JSON 形式返回某个模块的命名空间，未设置的模块返回 None
    pub fn module_namespace_json(&self, brain_id: &str, module_id: &str) -> RuntimeResult<Option<String>> {
        let result = self
            .registry()
            .and_then(|registry| registry.get(brain_id))
            .and_then(|brain| brain.module_namespace_json(module_id));
        self.logged(result)
    }

    pub fn brain_count(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.registry.len())
    }

    // ------------------------------------------------------------------
    // 诊断求值
    // ------------------------------------------------------------------

    pub fn evaluate(&self, source: &str) -> RuntimeResult<()> {
        let result = match &self.state {
            Some(state) => state.scratch.evaluate(source),
            None => Err(BrainError::NotInitialized),
        };
        self.logged(result)
    }

    /// 校验失败返回 -1，其他错误返回 0
    pub fn evaluate_to_integer(&self, source: &str) -> i32 {
        match self.logged(scratch::evaluate_to_integer(source, &self.log, &self.config.engine)) {
            Ok(n) => n,
            Err(BrainError::Validation(_)) => -1,
            Err(_) => 0,
        }
    }

    // ------------------------------------------------------------------

    fn registry(&self) -> RuntimeResult<&BrainRegistry> {
        self.state
            .as_ref()
            .map(|s| &s.registry)
            .ok_or(BrainError::NotInitialized)
    }

    fn brain_env(&self) -> BrainEnv {
        BrainEnv {
            log: self.log.clone(),
            in_flight: Rc::clone(&self.in_flight),
            engine: self.config.engine.clone(),
        }
    }

    /// 把错误通过宿主错误日志报告一次，再原样返回
    fn logged<T>(&self, result: RuntimeResult<T>) -> RuntimeResult<T> {
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    fn report(&self, err: &BrainError) {
        match err {
            // Already traced by the validator; kept off the host sink.
            BrainError::Validation(_) => {}
            BrainError::AlreadyInitialized | BrainError::NotInitialized => {
                tracing::warn!(target: "brain", "{}", err);
            }
            BrainError::ResetFailed { cause, .. } => {
                self.report(cause);
                self.log.report(err);
            }
            _ => self.log.report(err),
        }
    }
}

impl Drop for BrainRuntime {
    fn drop(&mut self) {
        if let Some(state) = self.state.as_mut() {
            state.registry.clear();
        }
    }
}
