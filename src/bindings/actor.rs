//! Actor field accessors exposed to scripts.
//!
//! Pure pass-through to the host hooks keyed by (actor id, field id). Bad
//! arguments and missing hooks are logged and turned into no-ops; scripts
//! never see an exception from here.

use glam::{Quat, Vec3};
use rquickjs::convert::Coerced;
use rquickjs::{FromJs, Object, Value};

use crate::bindings::protocol::{ActorAccessors, ActorId, FieldId, HostLog};
use crate::core::limits::Limit;

const ORDINALS: [&str; 6] = ["1st", "2nd", "3rd", "4th", "5th", "6th"];

#[derive(Clone)]
pub struct ActorFieldBridge {
    log: HostLog,
}

impl ActorFieldBridge {
    pub fn new(log: HostLog) -> Self {
        Self { log }
    }

    fn hook<T>(&self, name: &str, pick: impl FnOnce(&ActorAccessors) -> Option<T>) -> Option<T> {
        let hook = pick(&self.log.hooks().borrow().actors);
        if hook.is_none() {
            self.log.error(&format!("No actor {} set", name));
        }
        hook
    }

    fn ids(&self, args: &[Value<'_>]) -> Option<(ActorId, FieldId)> {
        if args.len() < 2 {
            self.log
                .error("Not enough args for actor accessor. Need at least 2.");
            return None;
        }
        let actor_id = self.id_arg(&args[0], "actor")?;
        let field_id = self.id_arg(&args[1], "field")?;
        Some((actor_id, field_id))
    }

    fn id_arg(&self, value: &Value<'_>, what: &str) -> Option<u16> {
        match value.as_number() {
            Some(n) if n.is_finite() && n >= 0.0 && n <= f64::from(u16::MAX) => Some(n as u16),
            _ => {
                self.log.error(&format!(
                    "Invalid {} id argument given for actor accessor. Need a number.",
                    what
                ));
                None
            }
        }
    }

    fn number_arg(&self, args: &[Value<'_>], index: usize) -> Option<f32> {
        let n = args.get(index).and_then(|v| v.as_number());
        if n.is_none() {
            self.log
                .error(&format!("{} argument needs to be a number!", ORDINALS[index]));
        }
        n.map(|n| n as f32)
    }

    fn out_object<'js>(&self, args: &[Value<'js>], caller: &str) -> Option<Object<'js>> {
        let obj = args.get(2).and_then(|v| v.as_object()).cloned();
        if obj.is_none() {
            self.log
                .error(&format!("{}: Third argument must be an object", caller));
        }
        obj
    }

    pub fn get_boolean(&self, args: &[Value<'_>]) -> Option<bool> {
        let getter = self.hook("boolean getter", |a| a.boolean_getter.clone())?;
        let (actor, field) = self.ids(args)?;
        Some(getter(actor, field))
    }

    pub fn set_boolean(&self, args: &[Value<'_>]) {
        let Some(setter) = self.hook("boolean setter", |a| a.boolean_setter.clone()) else {
            return;
        };
        let Some((actor, field)) = self.ids(args) else {
            return;
        };
        // JS truthiness; a missing value is `undefined`, hence false.
        let value = args.get(2).is_some_and(|v| {
            Coerced::<bool>::from_js(v.ctx(), v.clone()).is_ok_and(|Coerced(b)| b)
        });
        setter(actor, field, value);
    }

    pub fn get_float(&self, args: &[Value<'_>]) -> Option<f64> {
        let getter = self.hook("float getter", |a| a.float_getter.clone())?;
        let (actor, field) = self.ids(args)?;
        Some(f64::from(getter(actor, field)))
    }

    pub fn set_float(&self, args: &[Value<'_>]) {
        let Some(setter) = self.hook("float setter", |a| a.float_setter.clone()) else {
            return;
        };
        let Some((actor, field)) = self.ids(args) else {
            return;
        };
        if let Some(value) = self.number_arg(args, 2) {
            setter(actor, field, value);
        }
    }

    pub fn get_vector3<'js>(&self, args: &[Value<'js>]) -> rquickjs::Result<()> {
        let Some(getter) = self.hook("vector3 getter", |a| a.vector3_getter.clone()) else {
            return Ok(());
        };
        let Some((actor, field)) = self.ids(args) else {
            return Ok(());
        };
        let Some(out) = self.out_object(args, "getActorVector3") else {
            return Ok(());
        };

        let v = getter(actor, field);
        out.set("x", f64::from(v.x))?;
        out.set("y", f64::from(v.y))?;
        out.set("z", f64::from(v.z))?;
        Ok(())
    }

    pub fn set_vector3(&self, args: &[Value<'_>]) {
        let Some(setter) = self.hook("vector3 setter", |a| a.vector3_setter.clone()) else {
            return;
        };
        let Some((actor, field)) = self.ids(args) else {
            return;
        };
        let (Some(x), Some(y), Some(z)) = (
            self.number_arg(args, 2),
            self.number_arg(args, 3),
            self.number_arg(args, 4),
        ) else {
            return;
        };
        setter(actor, field, Vec3::new(x, y, z));
    }

    pub fn get_quaternion<'js>(&self, args: &[Value<'js>]) -> rquickjs::Result<()> {
        let Some(getter) = self.hook("quaternion getter", |a| a.quaternion_getter.clone()) else {
            return Ok(());
        };
        let Some((actor, field)) = self.ids(args) else {
            return Ok(());
        };
        let Some(out) = self.out_object(args, "getActorQuaternion") else {
            return Ok(());
        };

        let q = getter(actor, field);
        out.set("x", f64::from(q.x))?;
        out.set("y", f64::from(q.y))?;
        out.set("z", f64::from(q.z))?;
        out.set("w", f64::from(q.w))?;
        Ok(())
    }

    pub fn set_quaternion(&self, args: &[Value<'_>]) {
        let Some(setter) = self.hook("quaternion setter", |a| a.quaternion_setter.clone()) else {
            return;
        };
        let Some((actor, field)) = self.ids(args) else {
            return;
        };
        let (Some(x), Some(y), Some(z), Some(w)) = (
            self.number_arg(args, 2),
            self.number_arg(args, 3),
            self.number_arg(args, 4),
            self.number_arg(args, 5),
        ) else {
            return;
        };
        setter(actor, field, Quat::from_xyzw(x, y, z, w));
    }

    pub fn get_string(&self, args: &[Value<'_>]) -> Option<String> {
        let getter = self.hook("string getter", |a| a.string_getter.clone())?;
        let (actor, field) = self.ids(args)?;
        let value = getter(actor, field);
        if Limit::ActorString.check_len(value.len()).is_err() {
            return Some(String::new());
        }
        Some(value)
    }

    pub fn set_string(&self, args: &[Value<'_>]) -> rquickjs::Result<()> {
        let Some(setter) = self.hook("string setter", |a| a.string_setter.clone()) else {
            return Ok(());
        };
        let Some((actor, field)) = self.ids(args) else {
            return Ok(());
        };
        match args.get(2) {
            None => setter(actor, field, ""),
            Some(v) if v.is_null() || v.is_undefined() => setter(actor, field, ""),
            Some(v) => match v.as_string() {
                Some(s) => {
                    let owned = s.to_string()?;
                    setter(actor, field, &owned);
                }
                None => self
                    .log
                    .error("3rd argument needs to be a string or undefined!"),
            },
        }
        Ok(())
    }
}
