//! Wrapping host functions as guest-callable closures.
//!
//! Synchronous host calls are handled entirely in this module. Async host
//! calls are only *constructed* here (a pending guest promise plus its
//! resolve/reject capability) — settling that promise from a host future is
//! the Sandbox's job (`sandbox-engine`), since only the Sandbox owns the
//! pending-job pump that must be kicked once the promise settles.

use crate::convert::{host_error_to_guest, to_guest_raw, to_host};
use crate::handle::HandleTable;
use boa_engine::object::builtins::{JsFunction, JsPromise};
use boa_engine::{Context, JsResult, JsValue, NativeFunction};
use sandbox_classify::ClassifiedError;
use serde_json::Value;

/// A host function reachable from guest code.
///
/// Arguments are always dumped to host JSON before this is called.
pub trait HostFunction: 'static {
    /// Invoke the host function with already-dumped arguments.
    fn call(&self, args: Vec<Value>, table: &HandleTable) -> HostCallOutcomeKind;
}

/// Whether a given invocation of a [`HostFunction`] settles immediately or
/// needs a promise bridge. Split from [`HostCallOutcome`] so implementors
/// don't need a `Context` to report their own kind.
pub enum HostCallOutcomeKind {
    /// Settles immediately.
    Ready(Result<Value, ClassifiedError>),
    /// Will settle later; the boxed future drives the eventual host result.
    Pending(std::pin::Pin<Box<dyn std::future::Future<Output = Result<Value, ClassifiedError>>>>),
}

/// Wrap a [`HostFunction`] into a guest-callable value.
///
/// For the `Ready` case: on `Err`, the wrapper throws a guest error whose
/// message is the host error's message. For the `Pending` case, a guest
/// promise is created and returned immediately; resolving it is left to the
/// Sandbox (see module docs).
pub fn wrap_function<F>(ctx: &mut Context, table: HandleTable, name: &'static str, f: F) -> JsValue
where
    F: HostFunction,
{
    let f = std::rc::Rc::new(f);
    let closure_table = table.clone();
    let closure = move |_this: &JsValue, args: &[JsValue], ctx: &mut Context| -> JsResult<JsValue> {
        let host_args: Vec<Value> = args
            .iter()
            .map(|v| {
                let handle = closure_table.track(v.clone());
                let value = to_host(ctx, &handle).unwrap_or(Value::Null);
                let _ = handle.dispose();
                value
            })
            .collect();

        match f.call(host_args, &closure_table) {
            HostCallOutcomeKind::Ready(Ok(value)) => Ok(to_guest_raw(ctx, &value)),
            HostCallOutcomeKind::Ready(Err(err)) => Err(host_error_to_guest(err.message()).into()),
            HostCallOutcomeKind::Pending(_future) => {
                // The Sandbox replaces this closure-level handling with its
                // own dispatch for async tools (it needs the future to
                // drive the pending-job pump); a bare `wrap_function` call
                // with a function that returns `Pending` is only exercised
                // through `sandbox-engine`'s tool dispatch path, not used
                // standalone.
                Err(host_error_to_guest(
                    "async host functions must be dispatched through the Sandbox",
                )
                .into())
            }
        }
    };

    NativeFunction::from_copy_closure(closure)
        .to_js_function(ctx.realm())
        .into()
}

/// Create a new, pending guest promise plus its resolve/reject capability.
#[must_use]
pub fn new_guest_promise(ctx: &mut Context) -> (JsPromise, JsFunction, JsFunction) {
    let (promise, resolvers) = JsPromise::new_pending(ctx);
    (promise, resolvers.resolve, resolvers.reject)
}
