//! Runtime configuration effects on dispatch

use otter_callback_object::{
    CallbackError, ClassDefinition, FunctionRef, HostContext, LegacyCallbacks, ObjectRef,
    PropertyAttributes, Runtime, RuntimeConfig, StaticFunction, ValueRef,
};

fn noop(
    _: &HostContext,
    _: &ValueRef,
    _: &ValueRef,
    _: &[ValueRef],
    _: &mut Option<ValueRef>,
) -> ValueRef {
    ValueRef::undefined()
}

#[test]
fn test_uncached_static_functions_rematerialize() {
    let class = ClassDefinition::new("Fresh")
        .static_function(StaticFunction::new("f", PropertyAttributes::NONE, noop))
        .build()
        .unwrap();

    let runtime = Runtime::with_config(RuntimeConfig::new().cache_static_functions(false));
    let mut exec = runtime.enter();
    let obj = ObjectRef::create(&mut exec, &class, std::ptr::null_mut());

    let first = obj.get(&mut exec, "f");
    let second = obj.get(&mut exec, "f");
    assert!(!FunctionRef::ptr_eq(
        first.as_function().unwrap(),
        second.as_function().unwrap()
    ));
    assert!(obj.base().is_empty());
}

#[test]
fn test_strict_lazy_accessor_raises_reference_error() {
    let class = ClassDefinition::new("Liar")
        .legacy(LegacyCallbacks::new().has_property(|_, _, _| true))
        .build()
        .unwrap();

    let runtime = Runtime::with_config(RuntimeConfig::new().strict_lazy_accessors(true));
    let mut exec = runtime.enter();
    let obj = ObjectRef::create(&mut exec, &class, std::ptr::null_mut());

    assert!(obj.has(&mut exec, "anything"));
    assert!(obj.get(&mut exec, "anything").is_undefined());
    let err = exec.check().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Uncaught exception: ReferenceError: hasProperty callback returned true for a property that doesn't exist."
    );
}

#[test]
fn test_native_depth_limit_stops_runaway_reentry() {
    let class = ClassDefinition::new("Recursive")
        .legacy(LegacyCallbacks::new().get_property(|ctx, obj, name, exception| {
            match ctx.get_property(obj, name.as_str()) {
                Ok(value) => Some(value),
                Err(err) => {
                    *exception = Some(ctx.exception_value(&err));
                    None
                }
            }
        }))
        .build()
        .unwrap();

    let runtime = Runtime::with_config(RuntimeConfig::new().max_native_depth(4));
    let mut exec = runtime.enter();
    let obj = ObjectRef::create(&mut exec, &class, std::ptr::null_mut());

    assert!(obj.get(&mut exec, "deep").is_undefined());
    let err = exec.check().unwrap_err();
    assert!(matches!(err, CallbackError::Exception(_)));
    assert!(err.to_string().contains("RangeError"));
    assert_eq!(runtime.lock().depth(), 1);
}

#[test]
fn test_config_from_json_drives_runtime() {
    let config = RuntimeConfig::from_json(r#"{ "cacheStaticFunctions": false, "maxNativeDepth": 8 }"#)
        .unwrap();
    let runtime = Runtime::with_config(config);

    assert!(!runtime.config().cache_static_functions);
    assert_eq!(runtime.config().max_native_depth, 8);
    assert!(!runtime.config().strict_lazy_accessors);
}
