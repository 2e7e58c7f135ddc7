use brain_runtime::bindings::protocol::ActorAccessors;
use brain_runtime::{BrainError, BrainRuntime, RuntimeResult, ServiceReporter};
use glam::{Quat, Vec3};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const AGENT: &str = "pinky";
const BRAIN: &str = "brain";

const EXPECTED_ACTOR: u16 = 12;
const EXPECTED_FIELD: u16 = 34;

struct Harness {
    runtime: BrainRuntime,
    errors: Rc<RefCell<Vec<String>>>,
    debug: Rc<RefCell<Vec<String>>>,
}

impl Harness {
    fn new() -> Self {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let debug = Rc::new(RefCell::new(Vec::new()));
        let mut runtime = BrainRuntime::default();

        let sink = Rc::clone(&errors);
        runtime.set_error_log(Some(Rc::new(move |msg: &str| {
            sink.borrow_mut().push(msg.to_string())
        })));
        let sink = Rc::clone(&debug);
        runtime.set_debug_log(Some(Rc::new(move |msg: &str| {
            sink.borrow_mut().push(msg.to_string())
        })));
        runtime.set_call_service(Some(Rc::new(
            |service: &str, args: &str, reporter: &ServiceReporter| {
                let x: i64 = args.parse().unwrap_or(0);
                match service {
                    "addOne" => reporter.report(&(x + 1).to_string()).unwrap(),
                    "addTwo" => reporter.report(&(x + 2).to_string()).unwrap(),
                    _ => {}
                }
            },
        )));

        runtime.initialize(".").unwrap();
        Self {
            runtime,
            errors,
            debug,
        }
    }

    fn errors(&self) -> String {
        self.errors.borrow().join("\n")
    }

    fn clear_errors(&self) {
        self.errors.borrow_mut().clear();
    }

    fn reset(&mut self, source: &str) -> RuntimeResult<()> {
        self.runtime.reset_brain(BRAIN, source)
    }

    /// Runs one update and returns the delivered JSON, if any.
    fn update(&self, state_json: &str) -> Option<String> {
        let mut reported = None;
        let ok = self
            .runtime
            .update_agent(BRAIN, AGENT, state_json, |json| reported = Some(json.to_string()))
            .is_ok();
        assert_eq!(ok, reported.is_some(), "result delivered iff the call succeeded");
        reported
    }
}

fn ok<T>(result: RuntimeResult<T>) -> anyhow::Result<T> {
    result.map_err(|e| anyhow::anyhow!("{}", e))
}

const FOO_BRAIN: &str = "function updateAgent(state) {\
  state.result = '';\
  for(let i = 0; i < state.count; i++) {\
    state.result += 'foo';\
  }\
}";

#[test]
fn test_update_agent_json() -> anyhow::Result<()> {
    let mut h = Harness::new();
    ok(h.reset(FOO_BRAIN))?;
    assert_eq!(
        h.update(r#"{"count": 3}"#).as_deref(),
        Some(r#"{"count":3,"result":"foofoofoo"}"#)
    );
    Ok(())
}

#[test]
fn test_brains_by_value_not_address() -> anyhow::Result<()> {
    let mut h = Harness::new();
    ok(h.reset(FOO_BRAIN))?;
    assert_eq!(
        h.update(r#"{"count": 3}"#).as_deref(),
        Some(r#"{"count":3,"result":"foofoofoo"}"#)
    );

    let second_id = String::from_utf8(b"brain".to_vec())?;
    ok(h.runtime.reset_brain(
        &second_id,
        "function updateAgent(state) {\
           state.result = '';\
           for(let i = 0; i < state.count; i++) { state.result += 'bar'; }\
         }",
    ))?;
    assert_eq!(h.runtime.brain_count(), 1);
    assert_eq!(
        h.update(r#"{"count": 3}"#).as_deref(),
        Some(r#"{"count":3,"result":"barbarbar"}"#)
    );
    Ok(())
}

#[test]
fn test_update_agent_fail() {
    let mut h = Harness::new();
    h.reset("function updateAgent(state) {  doesNotExist();}")
        .unwrap();

    h.clear_errors();
    assert_eq!(h.update(r#"{"count": 3}"#), None);
    assert!(h.errors().contains("doesNotExist"));
    assert!(h.errors().contains("Error while calling updateAgent"));
}

#[test]
fn test_helpful_compile_errors() {
    let mut h = Harness::new();
    h.reset(FOO_BRAIN).unwrap();
    h.clear_errors();

    let err = h
        .reset(
            "function updateAgent(state) {\n\
             \x20 state.result = '';\n\
             \x20 for(let i = 0; i < state.count; i++) {\n\
             \x20   state.result += 'foo';\n\
             syntaxErrorHere!!\n\
             \x20 }\n\
             }\n",
        )
        .unwrap_err();
    assert!(matches!(err, BrainError::ResetFailed { .. }));

    let errors = h.errors();
    assert!(errors.contains(":5:"), "{}", errors);
    assert!(errors.contains("syntaxErrorHere"), "{}", errors);
    assert!(errors.contains("Failed to reset brain with javascript:"));
    assert!(errors.contains("5:\tsyntaxErrorHere!!"));

    // The previous brain is still in place.
    assert_eq!(
        h.update(r#"{"count": 1}"#).as_deref(),
        Some(r#"{"count":1,"result":"foo"}"#)
    );
}

#[test]
fn test_missing_update_agent() {
    let mut h = Harness::new();
    assert!(h.reset("function somethingElse() {}").is_err());
    assert!(h.errors().contains("Could not find updateAgent function in brain JS!"));
    assert_eq!(h.runtime.brain_count(), 0);
}

#[test]
fn test_log_error() {
    let h = Harness::new();
    h.runtime.evaluate("sysError('this is just a test');").unwrap();
    assert!(h.errors().contains("this is just a test"));
}

#[test]
fn test_sys_log_reaches_debug_sink() {
    let mut h = Harness::new();
    h.reset("function updateAgent(state) { sysLog('tick ' + state.n); }")
        .unwrap();
    h.update(r#"{"n": 7}"#).unwrap();
    assert_eq!(h.debug.borrow().as_slice(), ["tick 7".to_string()]);
}

#[test]
fn test_post_message_flush() {
    let mut h = Harness::new();
    h.reset(
        "function updateAgent(state) {\
           state.result = 'lastTouchedByUpdateAgent';\
           let resolver = null;\
           new Promise( (resolve, reject) => resolver = resolve ).then(() => state.result = 'lastTouchedByUpdatePromise');\
           resolver();\
         }\
         function postMessageFlush(state) {\
           state.result = 'lastTouchedByPostFlush';\
         }",
    )
    .unwrap();
    assert_eq!(
        h.update("{}").as_deref(),
        Some(r#"{"result":"lastTouchedByPostFlush"}"#)
    );
}

#[test]
fn test_promise_continuations_before_result() {
    let mut h = Harness::new();
    h.reset(
        "function updateAgent(state) {\n\
           state.resolved = false;\n\
           const p = Promise.resolve(1).then(() => state.resolved = true);\n\
         }\n",
    )
    .unwrap();
    assert_eq!(h.update("{}").as_deref(), Some(r#"{"resolved":true}"#));
}

#[test]
fn test_throwing_continuation_only_rejects_its_promise() {
    let mut h = Harness::new();
    h.reset(
        "function updateAgent(state) {\n\
           Promise.resolve().then(() => { throw new Error('late failure'); });\n\
         }\n",
    )
    .unwrap();
    // An unhandled rejection is not a job failure; the call still succeeds.
    assert_eq!(h.update("{}").as_deref(), Some("{}"));
}

#[test]
fn test_modules() {
    let mut h = Harness::new();
    h.reset(
        "function updateAgent(state) {\n\
           state.y = getModule('FooMath')['double'](state.x);\n\
           state.z = getModule('FooMath')['triple'](state.x);\n\
         }\n",
    )
    .unwrap();
    h.runtime
        .set_module(
            BRAIN,
            "FooMath",
            "export function double(x) {\n  return 2 * x;\n}\n\
             export function triple(x) {\n  return 3 * x;\n}\n",
        )
        .unwrap();
    assert_eq!(h.update(r#"{"x": 3}"#).as_deref(), Some(r#"{"x":3,"y":6,"z":9}"#));
}

#[test]
fn test_module_hotload() {
    let mut h = Harness::new();
    h.reset("function updateAgent(state) {\n  state.y = getModule('FooMath')['transform'](state.x);\n}\n")
        .unwrap();

    h.runtime
        .set_module(BRAIN, "FooMath", "export function transform(x) {\n  return 2 * x;\n}\n")
        .unwrap();
    assert_eq!(h.update(r#"{"x": 3}"#).as_deref(), Some(r#"{"x":3,"y":6}"#));

    h.runtime
        .set_module(BRAIN, "FooMath", "export function transform(x) {\n  return 3 * x;\n}\n")
        .unwrap();
    assert_eq!(h.update(r#"{"x": 3}"#).as_deref(), Some(r#"{"x":3,"y":9}"#));

    // A broken reload leaves the last good module in place.
    assert!(h
        .runtime
        .set_module(BRAIN, "FooMath", "export function transform(x) {\n  return ;;; x *;\n}\n")
        .is_err());
    assert_eq!(h.update(r#"{"x": 3}"#).as_deref(), Some(r#"{"x":3,"y":9}"#));
}

#[test]
fn test_many_modules() {
    let mut h = Harness::new();
    h.reset(
        "function updateAgent(state) {\n\
           state.y = getModule('FooMath')['transform'](state.x);\n\
           state.z = getModule('BarMath')['transform'](state.x);\n\
         }\n",
    )
    .unwrap();
    h.runtime
        .set_module(BRAIN, "FooMath", "export function transform(x) {\n  return 2 * x;\n}\n")
        .unwrap();
    h.runtime
        .set_module(BRAIN, "BarMath", "export function transform(x) {\n  return 3 * x;\n}\n")
        .unwrap();
    assert_eq!(h.update(r#"{"x": 3}"#).as_deref(), Some(r#"{"x":3,"y":6,"z":9}"#));
}

#[test]
fn test_unknown_module_is_undefined() {
    let mut h = Harness::new();
    h.reset("function updateAgent(state) { state.missing = typeof getModule('Nope'); }")
        .unwrap();
    assert_eq!(h.update("{}").as_deref(), Some(r#"{"missing":"undefined"}"#));
    assert_eq!(h.runtime.module_namespace_json(BRAIN, "Nope").unwrap(), None);
}

#[test]
fn test_module_imports_are_refused() {
    let mut h = Harness::new();
    h.reset("function updateAgent() {}").unwrap();
    assert!(h
        .runtime
        .set_module(BRAIN, "Outer", "import { x } from 'Inner';\nexport const y = x;\n")
        .is_err());
    assert_eq!(h.runtime.module_namespace_json(BRAIN, "Outer").unwrap(), None);
}

#[test]
fn test_set_module_unknown_brain() {
    let h = Harness::new();
    let err = h
        .runtime
        .set_module("ghost", "FooMath", "export const x = 1;")
        .unwrap_err();
    assert!(matches!(err, BrainError::UnknownBrain(_)));
    assert!(h.errors().contains("Unknown brain UID: ghost"));
}

#[test]
fn test_basic_service() {
    let mut h = Harness::new();
    h.reset(
        "function updateAgent(state) {\n\
           state.four = callService('addOne', 3);\n\
           state.five = callService('addTwo', 3);\n\
         }\n",
    )
    .unwrap();
    assert_eq!(h.update("{}").as_deref(), Some(r#"{"four":4,"five":5}"#));
}

#[test]
fn test_unreported_service_returns_stale_result() {
    let mut h = Harness::new();
    h.reset(
        "function updateAgent(state) {\n\
           state.first = callService('addOne', 1);\n\
           state.second = callService('silent', 1);\n\
         }\n",
    )
    .unwrap();
    assert_eq!(h.update("{}").as_deref(), Some(r#"{"first":2,"second":2}"#));
    assert!(h.errors().contains("never reported back results"));
}

#[test]
fn test_oversized_service_result_is_rejected() {
    let mut h = Harness::new();
    h.runtime.set_call_service(Some(Rc::new(
        |_: &str, _: &str, reporter: &ServiceReporter| {
            let huge = format!("\"{}\"", "x".repeat(10 * 1024 * 1024));
            assert!(reporter.report(&huge).is_err());
        },
    )));
    h.reset("function updateAgent(state) { state.r = callService('huge', 1); }")
        .unwrap();
    h.clear_errors();
    assert_eq!(h.update("{}").as_deref(), Some("{}"));
    let errors = h.errors();
    assert!(errors.contains("Service result was rejected"));
    assert!(errors.contains("never reported back results"));
}

#[test]
fn test_service_without_handler() {
    let mut h = Harness::new();
    h.runtime.set_call_service(None);
    h.reset("function updateAgent(state) { state.r = callService('addOne', 1); }")
        .unwrap();
    assert_eq!(h.update("{}").as_deref(), Some("{}"));
    assert!(h.errors().contains("no call-service function was set"));
}

#[test]
fn test_very_long_log_message() {
    let mut h = Harness::new();
    h.reset("function updateAgent(state) {\n  sysError('x'.repeat(10 * 1024 * 1024));\n}\n")
        .unwrap();
    h.clear_errors();
    assert!(h.update("{}").is_some());
    assert_eq!(h.errors().len(), 0);
}

#[test]
fn test_very_long_code() {
    let mut h = Harness::new();
    let code = "x".repeat(10 * 1024 * 1024);
    assert!(matches!(h.reset(&code), Err(BrainError::Validation(_))));
}

#[test]
fn test_update_agent_array_buffer() {
    let mut h = Harness::new();
    h.reset(
        "function updateAgent(foo, buffer) {\
           const view = new DataView(buffer);\
           if(view.getUint8(0) != 42) throw 'ahhh';\
           view.setUint8(0, 123);\
         }",
    )
    .unwrap();

    let mut buf = vec![42u8];
    let mut reported = None;
    h.runtime
        .update_agent_bytes(BRAIN, AGENT, "{}", &mut buf, |json| {
            reported = Some(json.to_string())
        })
        .unwrap();
    assert_eq!(buf[0], 123);
    assert_eq!(reported.as_deref(), Some("{}"));
}

#[test]
fn test_buffer_writes_survive_a_failed_call() {
    let mut h = Harness::new();
    h.reset(
        "function updateAgent(state, buffer) {\
           new Uint8Array(buffer)[1] = 9;\
           throw new Error('after write');\
         }",
    )
    .unwrap();
    let mut buf = vec![0u8, 0, 0];
    assert!(h
        .runtime
        .update_agent_bytes(BRAIN, AGENT, "{}", &mut buf, |_| {})
        .is_err());
    assert_eq!(buf, vec![0, 9, 0]);
}

#[test]
fn test_buffer_does_not_outlive_the_call() {
    let mut h = Harness::new();
    h.reset(
        "var kept;\
         function updateAgent(state, buffer) {\
           if (kept) { state.keptLength = kept.byteLength; }\
           kept = buffer;\
           state.length = buffer.byteLength;\
         }",
    )
    .unwrap();

    let mut buf = vec![1u8, 2, 3, 4];
    let mut reported = None;
    h.runtime
        .update_agent_bytes(BRAIN, AGENT, "{}", &mut buf, |json| reported = Some(json.to_string()))
        .unwrap();
    assert_eq!(reported.as_deref(), Some(r#"{"length":4}"#));

    let mut other = vec![9u8; 2];
    h.runtime
        .update_agent_bytes(BRAIN, AGENT, "{}", &mut other, |json| reported = Some(json.to_string()))
        .unwrap();
    assert_eq!(reported.as_deref(), Some(r#"{"keptLength":0,"length":2}"#));
}

#[test]
fn test_buffer_too_large_is_rejected() {
    let mut h = Harness::new();
    h.reset("function updateAgent(state, buffer) { new Uint8Array(buffer)[0] = 1; }")
        .unwrap();
    h.clear_errors();
    let mut buf = vec![0u8; 10 * 1024 * 1024 + 1];
    let mut called = false;
    let err = h
        .runtime
        .update_agent_bytes(BRAIN, AGENT, "{}", &mut buf, |_| called = true)
        .unwrap_err();
    assert!(matches!(err, BrainError::Validation(_)));
    assert!(!called);
    assert_eq!(buf[0], 0);
    // Bound violations stay off the host sink.
    assert!(h.errors().is_empty());

    let mut at_bound = vec![0u8; 10 * 1024 * 1024];
    assert!(h
        .runtime
        .update_agent_bytes(BRAIN, AGENT, "{}", &mut at_bound, |_| {})
        .is_ok());
    assert_eq!(at_bound[0], 1);
}

#[test]
fn test_implicit_globals_persist_between_updates() {
    let mut h = Harness::new();
    h.reset(
        "function updateAgent(s) {\
           counter = (typeof counter === 'number' ? counter : 0) + 1;\
           s.c = counter;\
         }",
    )
    .unwrap();
    assert_eq!(h.update("{}").as_deref(), Some(r#"{"c":1}"#));
    assert_eq!(h.update("{}").as_deref(), Some(r#"{"c":2}"#));
}

#[test]
fn test_multibyte_error_line_does_not_panic() {
    let mut h = Harness::new();
    for pad in 0..6 {
        h.reset(&format!(
            "function updateAgent(state) {{\n  let x='€€€€€€';{}boom();\n}}\n",
            " ".repeat(pad)
        ))
        .unwrap();
        h.clear_errors();
        assert_eq!(h.update("{}"), None);
        let errors = h.errors();
        assert!(errors.contains("boom"));
        assert!(errors.contains("let x='€€€€€€'"));
    }
}

#[test]
fn test_unjsonable_response_does_not_crash() {
    let mut h = Harness::new();
    h.reset("function updateAgent(obj) {  obj['cycle'] = obj;}")
        .unwrap();
    h.clear_errors();
    assert_eq!(h.update("{}"), None);
    assert!(h.errors().contains("Could not serialize state"));

    // The brain stays usable.
    h.reset("function updateAgent(obj) { obj.fine = true; }").unwrap();
    assert_eq!(h.update("{}").as_deref(), Some(r#"{"fine":true}"#));
}

#[test]
fn test_invalid_state_json() {
    let mut h = Harness::new();
    h.reset("function updateAgent(state) { throw new Error('must not run'); }")
        .unwrap();
    assert_eq!(h.update("{\"count\": "), None);
    let errors = h.errors();
    assert!(errors.contains("Failed to JSON-parse state"));
    assert!(!errors.contains("must not run"));
}

#[test]
fn test_actor_bool_accessors() {
    let mut h = Harness::new();
    let value = Rc::new(Cell::new(true));
    let (get, set) = (Rc::clone(&value), Rc::clone(&value));
    h.runtime.set_actor_accessors(ActorAccessors {
        boolean_getter: Some(Rc::new(move |actor, field| {
            assert_eq!((actor, field), (EXPECTED_ACTOR, EXPECTED_FIELD));
            get.get()
        })),
        boolean_setter: Some(Rc::new(move |actor, field, v| {
            assert_eq!((actor, field), (EXPECTED_ACTOR, EXPECTED_FIELD));
            set.set(v)
        })),
        ..ActorAccessors::default()
    });

    h.reset(
        "function updateAgent(obj) {\
           const prev = getActorBoolean(12, 34);\
           if(prev != true) throw 'ahhh';\
           setActorBoolean(12, 34, false);\
         }",
    )
    .unwrap();
    assert!(h.update("{}").is_some());
    assert!(!value.get());

    h.reset(
        "function updateAgent(state) {\
           setActorBoolean(12, 34, state.v);\
         }",
    )
    .unwrap();
    for (state, expected) in [
        (r#"{"v":"yes"}"#, true),
        (r#"{"v":""}"#, false),
        (r#"{"v":{}}"#, true),
        (r#"{"v":0}"#, false),
        ("{}", false),
    ] {
        h.clear_errors();
        value.set(!expected);
        assert!(h.update(state).is_some());
        assert_eq!(value.get(), expected, "state {}", state);
        assert!(h.errors().is_empty());
    }
}

#[test]
fn test_actor_float_accessors() {
    let mut h = Harness::new();
    let value = Rc::new(Cell::new(2.5f32));
    let (get, set) = (Rc::clone(&value), Rc::clone(&value));
    h.runtime.update_hooks(|hooks| {
        hooks.actors.float_getter = Some(Rc::new(move |_, _| get.get()));
        hooks.actors.float_setter = Some(Rc::new(move |_, _, v| set.set(v)));
    });

    h.reset(
        "function updateAgent(obj) {\
           setActorFloat(12, 34, getActorFloat(12, 34) * 2);\
         }",
    )
    .unwrap();
    assert!(h.update("{}").is_some());
    assert!((value.get() - 5.0).abs() < 1e-4);
}

#[test]
fn test_actor_vec3_accessors() {
    let mut h = Harness::new();
    let value = Rc::new(Cell::new(Vec3::new(12.0, 34.0, 56.0)));
    let (get, set) = (Rc::clone(&value), Rc::clone(&value));
    h.runtime.update_hooks(|hooks| {
        hooks.actors.vector3_getter = Some(Rc::new(move |actor, field| {
            assert_eq!((actor, field), (EXPECTED_ACTOR, EXPECTED_FIELD));
            get.get()
        }));
        hooks.actors.vector3_setter = Some(Rc::new(move |_, _, v| set.set(v)));
    });

    h.reset(
        "function updateAgent(obj) {\
           const vec = {};\
           getActorVector3(12, 34, vec);\
           if(Math.round(vec.x) != 12) throw 'ahhh';\
           if(Math.round(vec.y) != 34) throw 'ahhh';\
           if(Math.round(vec.z) != 56) throw 'ahhh';\
           setActorVector3(12, 34, 1, 2, 3);\
         }",
    )
    .unwrap();
    assert!(h.update("{}").is_some());
    assert!(value.get().abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-4));
}

#[test]
fn test_actor_quat_accessors() {
    let mut h = Harness::new();
    let value = Rc::new(Cell::new(Quat::from_xyzw(12.0, 34.0, 56.0, 78.0)));
    let (get, set) = (Rc::clone(&value), Rc::clone(&value));
    h.runtime.update_hooks(|hooks| {
        hooks.actors.quaternion_getter = Some(Rc::new(move |_, _| get.get()));
        hooks.actors.quaternion_setter = Some(Rc::new(move |_, _, q| set.set(q)));
    });

    h.reset(
        "function updateAgent(obj) {\
           const vec = {};\
           getActorQuaternion(12, 34, vec);\
           if(Math.round(vec.x) != 12) throw 'ahhh';\
           if(Math.round(vec.y) != 34) throw 'ahhh';\
           if(Math.round(vec.z) != 56) throw 'ahhh';\
           if(Math.round(vec.w) != 78) throw 'ahhh';\
           setActorQuaternion(12, 34, 1, 2, 3, 4);\
         }",
    )
    .unwrap();
    assert!(h.update("{}").is_some());
    let q = value.get();
    assert!((q.x - 1.0).abs() < 1e-4);
    assert!((q.y - 2.0).abs() < 1e-4);
    assert!((q.z - 3.0).abs() < 1e-4);
    assert!((q.w - 4.0).abs() < 1e-4);
}

#[test]
fn test_string_accessors() {
    let mut h = Harness::new();
    let value = Rc::new(RefCell::new(String::from("€ unicode TM: ™")));
    let (get, set) = (Rc::clone(&value), Rc::clone(&value));
    h.runtime.update_hooks(|hooks| {
        hooks.actors.string_getter = Some(Rc::new(move |actor, field| {
            assert_eq!((actor, field), (EXPECTED_ACTOR, EXPECTED_FIELD));
            get.borrow().clone()
        }));
        hooks.actors.string_setter = Some(Rc::new(move |_, _, s: &str| {
            *set.borrow_mut() = s.to_string()
        }));
    });

    h.reset(
        "function updateAgent(obj) {\n\
           const s = getActorString(12, 34);\n\
           if(s != '€ unicode TM: ™')  throw 'did not get expected string!';\n\
           const newS = '€ all € about € the € euros €™';\n\
           setActorString(12, 34, newS);\n\
         }",
    )
    .unwrap();
    assert!(h.update("{}").is_some(), "{}", h.errors());
    assert_eq!(value.borrow().as_str(), "€ all € about € the € euros €™");
}

#[test]
fn test_actor_accessor_bad_ids_are_noops() {
    let mut h = Harness::new();
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    h.runtime.update_hooks(|hooks| {
        hooks.actors.boolean_setter = Some(Rc::new(move |_, _, _| counter.set(counter.get() + 1)));
    });

    h.reset(
        "function updateAgent(obj) {\
           setActorBoolean('twelve', 34, true);\
           setActorBoolean(12);\
           setActorBoolean(-1, 34, true);\
           obj.survived = true;\
         }",
    )
    .unwrap();
    assert_eq!(h.update("{}").as_deref(), Some(r#"{"survived":true}"#));
    assert_eq!(calls.get(), 0);
    assert!(h.errors().contains("Invalid actor id argument"));
    assert!(h.errors().contains("Not enough args for actor accessor"));
}

#[test]
fn test_initialize_twice_and_deinitialize() {
    let mut h = Harness::new();
    assert!(matches!(
        h.runtime.initialize("."),
        Err(BrainError::AlreadyInitialized)
    ));
    h.reset(FOO_BRAIN).unwrap();
    h.runtime.deinitialize().unwrap();
    assert_eq!(h.runtime.brain_count(), 0);
    assert!(matches!(
        h.runtime.deinitialize(),
        Err(BrainError::NotInitialized)
    ));
}

#[test]
fn test_evaluate_to_integer() {
    let h = Harness::new();
    assert_eq!(
        h.runtime
            .evaluate_to_integer("var sum = 1; for(let i = 0; i < 5; i++) { sum *= 2; } sum;"),
        32
    );
    assert_eq!(
        h.runtime
            .evaluate_to_integer("sysLog(\"here is a log message from JS!\"); 456;"),
        456
    );
}

#[test]
fn test_evaluate_errors_are_logged() {
    let h = Harness::new();
    assert!(h.runtime.evaluate("if( {}").is_err());
    assert!(h.runtime.evaluate("functionDoesNotExist();").is_err());
    assert!(h.errors().contains("functionDoesNotExist"));
}
