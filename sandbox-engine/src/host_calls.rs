//! Bridging asynchronous host tool calls into the guest promise world.
//!
//! A [`sandbox_marshal::HostFunction`] that reports
//! [`sandbox_marshal::HostCallOutcomeKind::Pending`] cannot be awaited from
//! inside the synchronous closure boa invokes for a native function — boa
//! calls native functions synchronously, and building an async variant
//! would require boa itself to be async-aware. Instead, `Sandbox::bind_tool`
//! creates the guest promise immediately and parks the driving future here;
//! the pending-job pump polls every parked future once per loop iteration
//! and settles the matching promise the moment it resolves.

use boa_engine::object::builtins::JsFunction;
use sandbox_classify::ClassifiedError;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll, Waker};

/// A host call that returned a promise to the guest before it settled.
pub struct PendingHostCall {
    pub future: Pin<Box<dyn Future<Output = Result<Value, ClassifiedError>>>>,
    pub resolve: JsFunction,
    pub reject: JsFunction,
}

/// Poll one parked call without blocking. The pump loop re-polls every
/// parked future on a fixed cadence (once per `run_jobs` batch) rather than
/// waiting for a wakeup, which matches the cooperative, single-threaded
/// scheduling model the sandbox commits to — there is no background
/// executor to hand a real waker off to, so a no-op waker is enough.
pub fn poll_once(call: &mut PendingHostCall) -> Option<Result<Value, ClassifiedError>> {
    let waker = Waker::noop();
    let mut cx = TaskContext::from_waker(waker);
    match call.future.as_mut().poll(&mut cx) {
        Poll::Ready(result) => Some(result),
        Poll::Pending => None,
    }
}
