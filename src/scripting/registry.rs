//! Brain 注册表
//!
//! brain id -> [`Brain`] 的映射。键按值比较；reset 成功时整体替换旧的 brain
//! （旧 context 先完全释放），失败时旧条目保持不变。

use std::collections::HashMap;

use crate::core::error::{BrainError, RuntimeResult};
use crate::core::limits::Limit;
use crate::scripting::brain::{Brain, BrainEnv};
use crate::scripting::exception::with_line_numbers;

#[derive(Default)]
pub struct BrainRegistry {
    brains: HashMap<String, Brain>,
}

impl BrainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用 `source` 编译一个新 brain 并替换 `brain_id` 下的旧 brain
    pub fn reset(&mut self, brain_id: &str, source: &str, env: &BrainEnv) -> RuntimeResult<()> {
        Limit::Identifier.check(brain_id)?;
        Limit::ScriptSource.check(source)?;

        let brain = Brain::new(source, env).map_err(|cause| BrainError::ResetFailed {
            listing: with_line_numbers(source),
            cause: Box::new(cause),
        })?;

        // Tear the old brain down before the new one takes its slot.
        if let Some(old) = self.brains.remove(brain_id) {
            drop(old);
            tracing::debug!(target: "brain", brain_id, "replacing brain");
        }
        self.brains.insert(brain_id.to_string(), brain);
        tracing::info!(target: "brain", brain_id, "brain reset");
        Ok(())
    }

    pub fn get(&self, brain_id: &str) -> RuntimeResult<&Brain> {
        self.brains
            .get(brain_id)
            .ok_or_else(|| BrainError::UnknownBrain(brain_id.to_string()))
    }

    pub fn set_module(&self, brain_id: &str, module_id: &str, source: &str) -> RuntimeResult<()> {
        Limit::Identifier.check(brain_id)?;
        self.get(brain_id)?.set_module(module_id, source)
    }

    pub fn contains(&self, brain_id: &str) -> bool {
        self.brains.contains_key(brain_id)
    }

    pub fn len(&self) -> usize {
        self.brains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brains.is_empty()
    }

    /// 释放所有 brain
    pub fn clear(&mut self) {
        let count = self.brains.len();
        self.brains.clear();
        tracing::debug!(target: "brain", count, "brain registry cleared");
    }
}
