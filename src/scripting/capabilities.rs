// ============================================================================
// 脚本全局能力表
// 每个新 context 都从同一张声明式表安装全局函数
// ============================================================================

use rquickjs::convert::Coerced;
use rquickjs::function::{Opt, Rest};
use rquickjs::{Ctx, FromJs, Function, Value};

use crate::bindings::actor::ActorFieldBridge;
use crate::bindings::protocol::HostLog;
use crate::bindings::service::ServiceBridge;
use crate::core::limits::Limit;
use crate::scripting::modules::ModuleStore;

/// 一个脚本可调用的宿主能力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Log,
    LogError,
    GetModule,
    CallService,
    GetActorBoolean,
    SetActorBoolean,
    GetActorFloat,
    SetActorFloat,
    GetActorVector3,
    SetActorVector3,
    GetActorQuaternion,
    SetActorQuaternion,
    GetActorString,
    SetActorString,
}

/// brain context 的全局函数
pub const BRAIN_CAPABILITIES: &[(&str, Capability)] = &[
    ("sysLog", Capability::Log),
    ("sysError", Capability::LogError),
    ("getModule", Capability::GetModule),
    ("callService", Capability::CallService),
    ("getActorBoolean", Capability::GetActorBoolean),
    ("setActorBoolean", Capability::SetActorBoolean),
    ("getActorFloat", Capability::GetActorFloat),
    ("setActorFloat", Capability::SetActorFloat),
    ("getActorVector3", Capability::GetActorVector3),
    ("setActorVector3", Capability::SetActorVector3),
    ("getActorQuaternion", Capability::GetActorQuaternion),
    ("setActorQuaternion", Capability::SetActorQuaternion),
    ("getActorString", Capability::GetActorString),
    ("setActorString", Capability::SetActorString),
];

/// 调试用 scratch context 只有日志
pub const SCRATCH_CAPABILITIES: &[(&str, Capability)] = &[
    ("sysLog", Capability::Log),
    ("sysError", Capability::LogError),
];

/// 能力函数捕获的宿主端状态
#[derive(Clone)]
pub struct CapabilityEnv {
    pub log: HostLog,
    pub modules: ModuleStore,
    pub service: ServiceBridge,
    pub actors: ActorFieldBridge,
}

/// 把能力表安装到 context 的全局对象上
pub fn install<'js>(
    ctx: &Ctx<'js>,
    table: &[(&str, Capability)],
    env: &CapabilityEnv,
) -> rquickjs::Result<()> {
    let globals = ctx.globals();
    for (name, capability) in table {
        let function = build(ctx, *capability, env)?.with_name(*name)?;
        globals.set(*name, function)?;
    }
    Ok(())
}

fn build<'js>(ctx: &Ctx<'js>, capability: Capability, env: &CapabilityEnv) -> rquickjs::Result<Function<'js>> {
    let ctx = ctx.clone();
    match capability {
        Capability::Log => {
            let log = env.log.clone();
            Function::new(ctx, move |msg: Opt<Value<'js>>| {
                if let Some(msg) = script_message(msg) {
                    log.debug(&msg);
                }
            })
        }
        Capability::LogError => {
            let log = env.log.clone();
            Function::new(ctx, move |msg: Opt<Value<'js>>| {
                if let Some(msg) = script_message(msg) {
                    log.error(&msg);
                }
            })
        }
        Capability::GetModule => {
            let modules = env.modules.clone();
            Function::new(ctx, move |ctx: Ctx<'js>, id: Opt<Value<'js>>| -> rquickjs::Result<Value<'js>> {
                let undefined = Value::new_undefined(ctx.clone());
                let Some(id) = id.0 else {
                    return Ok(undefined);
                };
                let Ok(Coerced(id)) = Coerced::<String>::from_js(&ctx, id) else {
                    let _ = ctx.catch();
                    return Ok(undefined);
                };
                if Limit::Identifier.check_len(id.len()).is_err() {
                    return Ok(undefined);
                }
                modules.namespace(&ctx, &id)
            })
        }
        Capability::CallService => {
            let service = env.service.clone();
            Function::new(
                ctx,
                move |ctx: Ctx<'js>, name: Opt<Value<'js>>, args: Opt<Value<'js>>| {
                    let undefined = Value::new_undefined(ctx.clone());
                    service.call_from_script(
                        &ctx,
                        name.0.unwrap_or_else(|| undefined.clone()),
                        args.0.unwrap_or(undefined),
                    )
                },
            )
        }
        Capability::GetActorBoolean => {
            let actors = env.actors.clone();
            Function::new(ctx, move |args: Rest<Value<'js>>| actors.get_boolean(&args.0))
        }
        Capability::SetActorBoolean => {
            let actors = env.actors.clone();
            Function::new(ctx, move |args: Rest<Value<'js>>| actors.set_boolean(&args.0))
        }
        Capability::GetActorFloat => {
            let actors = env.actors.clone();
            Function::new(ctx, move |args: Rest<Value<'js>>| actors.get_float(&args.0))
        }
        Capability::SetActorFloat => {
            let actors = env.actors.clone();
            Function::new(ctx, move |args: Rest<Value<'js>>| actors.set_float(&args.0))
        }
        Capability::GetActorVector3 => {
            let actors = env.actors.clone();
            Function::new(ctx, move |args: Rest<Value<'js>>| actors.get_vector3(&args.0))
        }
        Capability::SetActorVector3 => {
            let actors = env.actors.clone();
            Function::new(ctx, move |args: Rest<Value<'js>>| actors.set_vector3(&args.0))
        }
        Capability::GetActorQuaternion => {
            let actors = env.actors.clone();
            Function::new(ctx, move |args: Rest<Value<'js>>| actors.get_quaternion(&args.0))
        }
        Capability::SetActorQuaternion => {
            let actors = env.actors.clone();
            Function::new(ctx, move |args: Rest<Value<'js>>| actors.set_quaternion(&args.0))
        }
        Capability::GetActorString => {
            let actors = env.actors.clone();
            Function::new(ctx, move |args: Rest<Value<'js>>| actors.get_string(&args.0))
        }
        Capability::SetActorString => {
            let actors = env.actors.clone();
            Function::new(ctx, move |args: Rest<Value<'js>>| actors.set_string(&args.0))
        }
    }
}

// Oversized messages are dropped before they reach any sink.
fn script_message(msg: Opt<Value<'_>>) -> Option<String> {
    let value = msg.0?;
    let ctx = value.ctx().clone();
    let text = match Coerced::<String>::from_js(&ctx, value) {
        Ok(Coerced(text)) => text,
        Err(_) => {
            let _ = ctx.catch();
            return None;
        }
    };
    Limit::LogMessage.check_len(text.len()).ok()?;
    Some(text)
}
