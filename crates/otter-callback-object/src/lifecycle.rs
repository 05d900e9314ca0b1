//! Initialize and finalize passes over the class chain

use smallvec::SmallVec;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, error};

use crate::callback_object::{CallbackObject, ObjectRef, TypeInfo};
use crate::class::ClassRef;
use crate::runtime::ExecState;

/// Run every `initialize` callback, root first, then capture the type snapshot
pub(crate) fn initialize(exec: &mut ExecState, object: &ObjectRef) {
    let chain: SmallVec<[&ClassRef; 16]> = object.class().chain().collect();
    debug!(
        class = object.class_name(),
        levels = chain.len(),
        "Initializing host object"
    );

    let ctx = exec.host_context();
    for class in chain.iter().rev() {
        if let Some(hook) = class.initialize_hook() {
            let _unlocked = exec.runtime().drop_all_locks();
            hook.call(&ctx, object);
        }
    }

    object.capture_type_info();
}

/// Run every `finalize` callback, leaf first
///
/// The pass holds the runtime lock; each finalizer runs with it released.
/// Finalizers cannot fail the teardown: panics are caught and logged.
pub(crate) fn finalize(object: &CallbackObject) {
    let runtime = object.runtime();
    let _locked = runtime.lock().lock();
    let observed = TypeInfo::of(object.class());
    match object.type_info() {
        Some(captured) if *captured == observed => {}
        Some(captured) => error!(
            captured = ?captured,
            observed = ?observed,
            "Type info changed between initialize and finalize"
        ),
        None => error!(
            class = object.class_name(),
            "Finalizing host object that never finished initializing"
        ),
    }

    let _scope = runtime.begin_finalizing(object.address(), object.type_info().cloned());
    debug!(class = object.class_name(), "Finalizing host object");

    for class in object.class().chain() {
        if let Some(hook) = class.finalize_hook() {
            let _unlocked = runtime.drop_all_locks();
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| hook.call(object))) {
                error!(
                    class = class.name(),
                    "Finalizer panicked: {}",
                    panic_message(panic.as_ref())
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown error"
    }
}
