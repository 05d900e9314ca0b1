//! Runtime lock discipline around host callouts

use otter_callback_object::{
    ClassDefinition, LegacyCallbacks, ObjectRef, PropertyAttributes, Runtime, StaticFunction,
    Value, ValueRef,
};
use parking_lot::Mutex;
use serial_test::serial;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

#[test]
#[serial]
fn test_other_thread_can_enter_during_callout() {
    let outcome = Arc::new(Mutex::new(None));
    let record = outcome.clone();
    let class = ClassDefinition::new("Blocking")
        .legacy(LegacyCallbacks::new().get_property(move |ctx, _, _, _| {
            let runtime = ctx.runtime().clone();
            let (tx, rx) = mpsc::channel();
            let worker = thread::spawn(move || {
                let exec = runtime.enter();
                drop(exec);
                let _ = tx.send(());
            });
            let entered = rx.recv_timeout(TIMEOUT).is_ok();
            if entered {
                let _ = worker.join();
            }
            *record.lock() = Some(entered);
            Some(ValueRef::number(1.0))
        }))
        .build()
        .unwrap();

    let runtime = Runtime::new();
    let mut exec = runtime.enter();
    let obj = ObjectRef::create(&mut exec, &class, std::ptr::null_mut());

    assert_eq!(obj.get(&mut exec, "x"), Value::from(1));
    assert_eq!(*outcome.lock(), Some(true));
}

#[test]
#[serial]
fn test_lock_depth_restored_after_callout() {
    let depths = Arc::new(Mutex::new(Vec::new()));
    let record = depths.clone();
    let class = ClassDefinition::new("Depth")
        .legacy(LegacyCallbacks::new().set_property(move |ctx, _, _, _, _| {
            record.lock().push(ctx.runtime().lock().depth());
            true
        }))
        .build()
        .unwrap();

    let runtime = Runtime::new();
    let _outer = runtime.lock().lock();
    let _middle = runtime.lock().lock();
    let mut exec = runtime.enter();
    assert_eq!(runtime.lock().depth(), 3);

    let obj = ObjectRef::create(&mut exec, &class, std::ptr::null_mut());
    assert!(obj.set(&mut exec, "x", Value::from(1)));

    assert_eq!(*depths.lock(), [0]);
    assert_eq!(runtime.lock().depth(), 3);
}

#[test]
#[serial]
fn test_static_function_call_releases_lock() {
    let held = Arc::new(Mutex::new(None));
    let record = held.clone();
    let class = ClassDefinition::new("Fn")
        .static_function(StaticFunction::new(
            "probe",
            PropertyAttributes::NONE,
            move |ctx, _, _, _, _| {
                *record.lock() = Some(ctx.runtime().lock().is_held_by_current_thread());
                ValueRef::undefined()
            },
        ))
        .build()
        .unwrap();

    let runtime = Runtime::new();
    let mut exec = runtime.enter();
    let obj = ObjectRef::create(&mut exec, &class, std::ptr::null_mut());
    let probe = obj.get(&mut exec, "probe");
    probe
        .as_function()
        .unwrap()
        .call(&mut exec, &Value::undefined(), &[]);

    assert_eq!(*held.lock(), Some(false));
    assert!(runtime.lock().is_held_by_current_thread());
}

#[test]
#[serial]
fn test_reentry_from_callback_on_same_thread() {
    let class = ClassDefinition::new("Forwarder")
        .legacy(LegacyCallbacks::new().get_property(|ctx, obj, name, exception| {
            if name != "alias" {
                return None;
            }
            match ctx.get_property(obj, "target") {
                Ok(value) => Some(value),
                Err(err) => {
                    *exception = Some(ctx.exception_value(&err));
                    None
                }
            }
        }))
        .build()
        .unwrap();

    let runtime = Runtime::new();
    let mut exec = runtime.enter();
    let obj = ObjectRef::create(&mut exec, &class, std::ptr::null_mut());
    assert!(obj.set(&mut exec, "target", Value::string("real")));

    assert_eq!(obj.get(&mut exec, "alias"), Value::string("real"));
    assert_eq!(runtime.lock().depth(), 1);
}
