//! Per-brain module store with hot reload.
//!
//! A module is compiled from `export`-style source, evaluated, and its
//! namespace object kept under the module id. Setting the same id again
//! replaces the namespace in place; the brain and its other modules are not
//! touched. Modules cannot import other modules: the runtime resolver refuses
//! every specifier.

use rquickjs::loader::{Loader, Resolver};
use rquickjs::{CatchResultExt, Ctx, Module, Object, Persistent, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::core::error::{ScriptError, ScriptResult};
use crate::scripting::exception::diagnose;

struct StoredModule {
    namespace: Persistent<Object<'static>>,
    source: String,
}

/// Shared between the brain and its `getModule` capability.
#[derive(Clone, Default)]
pub struct ModuleStore {
    modules: Rc<RefCell<HashMap<String, StoredModule>>>,
}

impl ModuleStore {
    /// Compiles and evaluates `source`, then stores its namespace under
    /// `module_id`. On any failure the store is left unchanged.
    pub fn set<'js>(&self, ctx: &Ctx<'js>, module_id: &str, source: &str) -> ScriptResult<()> {
        let lookup = |_: Option<&str>| Some(source.to_string());

        let declared = Module::declare(ctx.clone(), module_id, source)
            .catch(ctx)
            .map_err(|caught| ScriptError::Compilation {
                prefix: "Error while compiling module JS: ",
                diagnostic: diagnose(caught, &lookup),
            })?;

        let (evaluated, promise) = declared.eval().catch(ctx).map_err(|caught| ScriptError::Runtime {
            prefix: "Exception caught while instantiating module JS: ",
            diagnostic: diagnose(caught, &lookup),
        })?;

        promise
            .finish::<Value>()
            .catch(ctx)
            .map_err(|caught| ScriptError::Runtime {
                prefix: "Exception caught while evaluating module JS: ",
                diagnostic: diagnose(caught, &lookup),
            })?;

        let namespace = evaluated
            .namespace()
            .catch(ctx)
            .map_err(|caught| ScriptError::Runtime {
                prefix: "Could not read module namespace: ",
                diagnostic: diagnose(caught, &lookup),
            })?;

        let stored = StoredModule {
            namespace: Persistent::save(ctx, namespace),
            source: source.to_string(),
        };
        let previous = self
            .modules
            .borrow_mut()
            .insert(module_id.to_string(), stored);
        tracing::debug!(
            target: "brain",
            module_id,
            replaced = previous.is_some(),
            "module namespace stored"
        );
        Ok(())
    }

    /// The stored namespace, or `undefined` for an unknown id.
    pub fn namespace<'js>(&self, ctx: &Ctx<'js>, module_id: &str) -> rquickjs::Result<Value<'js>> {
        let persistent = self
            .modules
            .borrow()
            .get(module_id)
            .map(|m| m.namespace.clone());
        match persistent {
            Some(ns) => Ok(ns.restore(ctx)?.into_value()),
            None => Ok(Value::new_undefined(ctx.clone())),
        }
    }

    pub fn source(&self, module_id: &str) -> Option<String> {
        self.modules
            .borrow()
            .get(module_id)
            .map(|m| m.source.clone())
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.modules.borrow().contains_key(module_id)
    }

    pub fn len(&self) -> usize {
        self.modules.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.borrow().is_empty()
    }

    /// Releases every namespace handle. Must run before the owning context
    /// is dropped.
    pub fn clear(&self) {
        self.modules.borrow_mut().clear();
    }
}

/// Resolver/loader pair that rejects every nested import.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoNestedImports;

impl Resolver for NoNestedImports {
    fn resolve<'js>(&mut self, _ctx: &Ctx<'js>, base: &str, name: &str) -> rquickjs::Result<String> {
        tracing::error!(
            target: "brain",
            base,
            specifier = name,
            "module imports are not supported; modules may not import other modules"
        );
        Err(rquickjs::Error::new_resolving_message(
            base,
            name,
            "module imports are not supported",
        ))
    }
}

impl Loader for NoNestedImports {
    fn load<'js>(&mut self, _ctx: &Ctx<'js>, name: &str) -> rquickjs::Result<Module<'js>> {
        Err(rquickjs::Error::new_loading_message(
            name,
            "module imports are not supported",
        ))
    }
}
