//! The `Sandbox`: owns one interpreter runtime, enforces the non-reentrant
//! `evaluate` contract, and wires up deadlines, cancellation, and the
//! pending-job pump.

use crate::host_calls::{self, PendingHostCall};
use crate::options::{EvaluateOptions, SandboxOptions};
use boa_engine::object::builtins::JsPromise;
use boa_engine::{Context, JsObject, JsResult, JsString, JsValue, NativeFunction, Source};
use sandbox_classify::ClassifiedError;
use sandbox_marshal::{
    format_guest_error, host_error_to_guest, new_guest_promise, to_guest, to_guest_raw, to_host,
    Handle, HandleTable, HostCallOutcomeKind, HostFunction,
};
use sandbox_types::EvalResult;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// The sandbox's lifecycle. `Disposed` is a terminal absorbing state: once
/// reached, every further call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Running,
    Disposed,
}

/// A single interpreter instance plus its resource caps.
///
/// `evaluate` is exclusive: calling it while already running fails with
/// `"Sandbox is already evaluating code"` rather than queuing. `Context` is
/// `!Send` (its values are `Gc`-managed and not thread-safe), so a `Sandbox`
/// must stay on the task/thread that created it — this mirrors
/// `agent-runtime::Sandbox`'s trait shape, adapted from "wraps tool
/// execution" to "owns the interpreter that runs the tool-calling script".
pub struct Sandbox {
    context: RefCell<Context>,
    handles: HandleTable,
    state: Cell<State>,
    options: SandboxOptions,
    pending_host_calls: Rc<RefCell<Vec<PendingHostCall>>>,
}

impl Sandbox {
    /// Construct and initialise a new sandbox with the given options.
    ///
    /// # Errors
    /// Returns an `internal` error if the underlying interpreter context
    /// fails to build (this should not happen under normal resource caps).
    pub fn initialise(options: SandboxOptions) -> Result<Self, ClassifiedError> {
        let mut context = Context::builder()
            .build()
            .map_err(|e| ClassifiedError::internal(format!("failed to build interpreter: {e}")))?;
        context
            .runtime_limits_mut()
            .set_stack_size_limit(options.max_stack_bytes);
        Ok(Self {
            context: RefCell::new(context),
            handles: HandleTable::new(),
            state: Cell::new(State::Idle),
            options,
            pending_host_calls: Rc::new(RefCell::new(Vec::new())),
        })
    }

    /// The number of currently live guest handles — used by tests asserting
    /// "no handle leak" property.
    #[must_use]
    pub fn live_handle_count(&self) -> u64 {
        self.handles.live_count()
    }

    fn require_idle(&self) -> Result<(), ClassifiedError> {
        match self.state.get() {
            State::Idle => Ok(()),
            State::Running => Err(ClassifiedError::logic("Sandbox is already evaluating code")),
            State::Disposed => Err(ClassifiedError::logic("Sandbox has been disposed")),
        }
    }

    /// Inject bindings into the guest global object. Only legal while idle.
    pub fn set_global(&self, bindings: impl IntoIterator<Item = (String, Value)>) -> Result<(), ClassifiedError> {
        self.require_idle()?;
        let mut ctx = self.context.borrow_mut();
        for (name, value) in bindings {
            let handle = to_guest(&mut ctx, &self.handles, &value);
            let global = ctx.global_object();
            global
                .set(
                    boa_engine::JsString::from(name.as_str()),
                    handle.value().clone(),
                    false,
                    &mut ctx,
                )
                .map_err(|e| ClassifiedError::internal(format!("set_global failed: {e}")))?;
            let _ = handle.dispose();
        }
        Ok(())
    }

    /// Bind a host callable as a guest-global function. Only legal while
    /// idle. Unlike [`Sandbox::set_global`], the bound value is a function:
    /// a synchronous [`HostFunction`] result is marshalled back directly;
    /// an asynchronous one returns a guest promise immediately and is
    /// settled from the pending-job pump once the driving future resolves
    /// (see `host_calls`).
    pub fn bind_tool<F>(&self, name: &'static str, f: F) -> Result<(), ClassifiedError>
    where
        F: HostFunction,
    {
        self.require_idle()?;
        let mut ctx = self.context.borrow_mut();
        let value = self.wrap_host_function(&mut ctx, f);
        ctx.global_object()
            .set(JsString::from(name), value, false, &mut ctx)
            .map_err(|e| ClassifiedError::internal(format!("bind_tool failed: {e}")))?;
        Ok(())
    }

    /// Bind a host callable as a method on a guest-global namespace object,
    /// creating the namespace object on first use. Guest code reaches the
    /// tool as `Namespace.name(...)` rather than a flat global, matching how
    /// tool catalogues are organised by namespace.
    pub fn bind_namespaced_tool<F>(&self, namespace: &str, name: &str, f: F) -> Result<(), ClassifiedError>
    where
        F: HostFunction,
    {
        self.require_idle()?;
        let mut ctx = self.context.borrow_mut();
        let value = self.wrap_host_function(&mut ctx, f);

        let global = ctx.global_object();
        let ns_key = JsString::from(namespace);
        let existing = global
            .get(ns_key.clone(), &mut ctx)
            .map_err(|e| ClassifiedError::internal(format!("reading namespace object: {e}")))?;
        let ns_object = match existing.as_object() {
            Some(obj) => obj.clone(),
            None => {
                let obj = JsObject::with_object_proto(ctx.intrinsics());
                global
                    .set(ns_key, JsValue::from(obj.clone()), false, &mut ctx)
                    .map_err(|e| ClassifiedError::internal(format!("creating namespace object: {e}")))?;
                obj
            }
        };
        ns_object
            .set(JsString::from(name), value, false, &mut ctx)
            .map_err(|e| ClassifiedError::internal(format!("binding namespaced tool: {e}")))?;
        Ok(())
    }

    /// Build the guest-callable value behind both [`Sandbox::bind_tool`] and
    /// [`Sandbox::bind_namespaced_tool`]: a synchronous [`HostFunction`]
    /// result is marshalled back directly; an asynchronous one returns a
    /// guest promise immediately and is settled from the pending-job pump
    /// once the driving future resolves (see `host_calls`).
    fn wrap_host_function<F>(&self, ctx: &mut Context, f: F) -> JsValue
    where
        F: HostFunction,
    {
        let closure_table = self.handles.clone();
        let pending = Rc::clone(&self.pending_host_calls);
        let f = Rc::new(f);

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
                HostCallOutcomeKind::Pending(future) => {
                    let (promise, resolve, reject) = new_guest_promise(ctx);
                    pending
                        .borrow_mut()
                        .push(PendingHostCall { future, resolve, reject });
                    Ok(promise.into())
                }
            }
        };

        NativeFunction::from_copy_closure(closure)
            .to_js_function(ctx.realm())
            .into()
    }

    /// Evaluate guest source code. Single-shot, async, exclusive.
    ///
    /// # Errors
    /// Returns a formatted error message (not a `ClassifiedError` — bare
    /// script failures are not tool-boundary errors) on re-entry, a thrown
    /// guest exception, a deadline expiry, or cancellation.
    pub async fn evaluate(&self, code: &str, opts: EvaluateOptions) -> EvalResult {
        if let Err(e) = self.require_idle() {
            return EvalResult::err(e.message().to_string());
        }
        if let Some(token) = &opts.cancel_token {
            if token.is_cancelled() {
                return EvalResult::err("Aborted");
            }
        }

        self.state.set(State::Running);
        let result = self.evaluate_inner(code, &opts).await;
        self.state.set(State::Idle);
        result
    }

    async fn evaluate_inner(&self, code: &str, opts: &EvaluateOptions) -> EvalResult {
        let wrapped = wrap_as_iife(code);
        let deadline = self.deadline(opts);
        let deadline_ms = opts.timeout_ms.or(self.options.timeout_ms);

        let mut ctx = self.context.borrow_mut();
        if let Some(state) = &opts.state {
            let handle = to_guest(&mut ctx, &self.handles, state);
            let result = ctx.global_object().set(
                JsString::from("state"),
                handle.value().clone(),
                false,
                &mut ctx,
            );
            let _ = handle.dispose();
            if let Err(e) = result {
                return EvalResult::err(format!("failed to inject call state: {e}"));
            }
        }

        ctx.set_instructions_remaining(self.options.instruction_budget(deadline_ms) as usize);

        let source = Source::from_bytes(wrapped.as_bytes());
        let top_level = match ctx.eval(source) {
            Ok(value) => value,
            Err(e) => {
                return if ctx.instructions_remaining() == 0 {
                    EvalResult::err("Execution timed out: instruction budget exhausted")
                } else {
                    EvalResult::err(format!("{e}"))
                };
            }
        };

        let handle = self.handles.track(top_level);
        drop(ctx);

        self.resolve_top_level(handle, deadline, opts.cancel_token.as_ref())
            .await
    }

    fn deadline(&self, opts: &EvaluateOptions) -> Option<Instant> {
        let timeout_ms = opts.timeout_ms.or(self.options.timeout_ms)?;
        Some(Instant::now() + Duration::from_millis(timeout_ms))
    }

    /// Resolve the top-level result: pending / fulfilled / rejected / not a
    /// promise.
    async fn resolve_top_level(
        &self,
        handle: Handle,
        deadline: Option<Instant>,
        cancel_token: Option<&tokio_util::sync::CancellationToken>,
    ) -> EvalResult {
        let is_promise = handle
            .value()
            .as_object()
            .and_then(|o| JsPromise::from_object(o.clone()).ok());

        let Some(promise) = is_promise else {
            let mut ctx = self.context.borrow_mut();
            return match to_host(&mut ctx, &handle) {
                Ok(value) => {
                    let _ = handle.dispose();
                    split_result_and_state(value)
                }
                Err(e) => {
                    let _ = handle.dispose();
                    EvalResult::err(e.message().to_string())
                }
            };
        };

        loop {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    let _ = handle.dispose();
                    return EvalResult::err("Execution timed out");
                }
            }
            if let Some(token) = cancel_token {
                if token.is_cancelled() {
                    let _ = handle.dispose();
                    return EvalResult::err("Aborted");
                }
            }

            {
                let mut ctx = self.context.borrow_mut();
                ctx.run_jobs();
                self.drain_pending_host_calls(&mut ctx);
                let state = promise.state();
                match state {
                    Ok(boa_engine::object::builtins::PromiseState::Fulfilled(value)) => {
                        let fulfilled = self.handles.track(value);
                        let out = to_host(&mut ctx, &fulfilled);
                        let _ = fulfilled.dispose();
                        let _ = handle.dispose();
                        return match out {
                            Ok(value) => split_result_and_state(value),
                            Err(e) => EvalResult::err(e.message().to_string()),
                        };
                    }
                    Ok(boa_engine::object::builtins::PromiseState::Rejected(reason)) => {
                        let message = format_guest_error(&mut ctx, &reason);
                        let _ = handle.dispose();
                        return EvalResult::err(message);
                    }
                    Ok(boa_engine::object::builtins::PromiseState::Pending) => {
                        drop(ctx);
                        tokio::task::yield_now().await;
                    }
                    Err(e) => {
                        let _ = handle.dispose();
                        return EvalResult::err(format!("pending job pump failed: {e}"));
                    }
                }
            }
        }
    }

    /// Poll every parked asynchronous host call once; settle the guest
    /// promise of each one that resolved. Runs once per pending-job-pump
    /// iteration so an async tool call makes progress at the same cadence
    /// as the interpreter's own microtask queue.
    fn drain_pending_host_calls(&self, ctx: &mut Context) {
        let mut settled = Vec::new();
        {
            let mut calls = self.pending_host_calls.borrow_mut();
            let mut i = 0;
            while i < calls.len() {
                if let Some(result) = host_calls::poll_once(&mut calls[i]) {
                    settled.push((calls.remove(i), result));
                } else {
                    i += 1;
                }
            }
        }
        for (call, result) in settled {
            match result {
                Ok(value) => {
                    let guest_value = to_guest_raw(ctx, &value);
                    let _ = call.resolve.call(&JsValue::undefined(), &[guest_value], ctx);
                }
                Err(err) => {
                    let native = host_error_to_guest(err.message());
                    let guest_err = boa_engine::JsError::from(native).to_opaque(ctx);
                    let _ = call.reject.call(&JsValue::undefined(), &[guest_err], ctx);
                }
            }
        }
    }

    /// Release the interpreter. Idempotent; further calls fail.
    pub fn dispose(&self) {
        self.state.set(State::Disposed);
    }
}

/// Wrap guest source as an immediately-invoked async function body so a
/// top-level `await` and a trailing `return` are both legal.
fn wrap_as_iife(code: &str) -> String {
    format!("(async () => {{\n{code}\n}})()")
}

/// A script that returns `{result, state}` is echoing updated call state
/// back to the host; unwrap it into the canonical result plus the state to
/// echo. Any other return value, including a plain object without a
/// `result` key, is the result as-is with no state to echo.
fn split_result_and_state(value: Value) -> EvalResult {
    if let Value::Object(map) = &value {
        if let Some(result) = map.get("result") {
            return EvalResult::ok_with_state(result.clone(), map.get("state").cloned());
        }
    }
    EvalResult::ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SandboxOptionsBuilder;

    fn new_sandbox() -> Sandbox {
        Sandbox::initialise(SandboxOptionsBuilder::new().build()).unwrap()
    }

    #[tokio::test]
    async fn synchronous_arithmetic() {
        let sandbox = new_sandbox();
        let result = sandbox
            .evaluate("const v = 2 + 3; return v;", EvaluateOptions::default())
            .await;
        match result {
            EvalResult::Ok { result, .. } => assert_eq!(result, serde_json::json!(5)),
            EvalResult::Err { error_message } => panic!("unexpected error: {error_message}"),
        }
    }

    #[tokio::test]
    async fn async_guest_code_resolves() {
        let sandbox = new_sandbox();
        let code = "const a = await Promise.resolve(40); const b = await Promise.resolve(2); return a + b;";
        let result = sandbox.evaluate(code, EvaluateOptions::default()).await;
        match result {
            EvalResult::Ok { result, .. } => assert_eq!(result, serde_json::json!(42)),
            EvalResult::Err { error_message } => panic!("unexpected error: {error_message}"),
        }
    }

    #[tokio::test]
    async fn reentrant_evaluate_is_rejected() {
        let sandbox = new_sandbox();
        sandbox.state.set(State::Running);
        let result = sandbox.evaluate("1", EvaluateOptions::default()).await;
        match result {
            EvalResult::Err { error_message } => {
                assert_eq!(error_message, "Sandbox is already evaluating code");
            }
            EvalResult::Ok { .. } => panic!("expected rejection"),
        }
    }

    #[tokio::test]
    async fn disposed_sandbox_rejects_further_calls() {
        let sandbox = new_sandbox();
        sandbox.dispose();
        let result = sandbox.evaluate("1", EvaluateOptions::default()).await;
        match result {
            EvalResult::Err { error_message } => assert_eq!(error_message, "Sandbox has been disposed"),
            EvalResult::Ok { .. } => panic!("expected rejection"),
        }
    }

    #[tokio::test]
    async fn deadline_fires_while_awaiting_a_never_settling_promise() {
        // A pending promise with no pending jobs left to run is the case
        // the deadline check in the resolution loop exists for — the
        // interpreter itself isn't looping, so this is what the
        // wall-clock deadline preempts (as opposed to the instruction
        // budget, which preempts a busy-looping guest; see
        // `cpu_bound_busy_loop_is_preempted_by_the_instruction_budget`).
        let sandbox = new_sandbox();
        let opts = EvaluateOptions {
            timeout_ms: Some(20),
            ..Default::default()
        };
        let result = sandbox
            .evaluate("return await new Promise(() => {});", opts)
            .await;
        match result {
            EvalResult::Err { error_message } => {
                assert!(error_message.to_lowercase().contains("timed out"));
            }
            EvalResult::Ok { .. } => panic!("expected a timeout"),
        }
    }

    #[tokio::test]
    async fn cpu_bound_busy_loop_is_preempted_by_the_instruction_budget() {
        let sandbox = new_sandbox();
        let opts = EvaluateOptions {
            timeout_ms: Some(20),
            ..Default::default()
        };
        let result = sandbox.evaluate("while (true) {}", opts).await;
        match result {
            EvalResult::Err { error_message } => {
                assert!(error_message.to_lowercase().contains("timed out"));
            }
            EvalResult::Ok { .. } => panic!("expected the busy loop to be preempted"),
        }
    }

    #[tokio::test]
    async fn cancellation_token_aborts_a_pending_await() {
        let sandbox = new_sandbox();
        let token = tokio_util::sync::CancellationToken::new();
        let opts = EvaluateOptions {
            cancel_token: Some(token.clone()),
            ..Default::default()
        };
        let cancel_after = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        };
        let (result, ()) = tokio::join!(
            sandbox.evaluate("return await new Promise(() => {});", opts),
            cancel_after
        );
        match result {
            EvalResult::Err { error_message } => assert_eq!(error_message, "Aborted"),
            EvalResult::Ok { .. } => panic!("expected cancellation"),
        }
    }

    #[tokio::test]
    async fn no_handle_leak_across_a_successful_evaluate() {
        let sandbox = new_sandbox();
        let before = sandbox.live_handle_count();
        let _ = sandbox
            .evaluate("return {a: 1, b: [1,2,3]};", EvaluateOptions::default())
            .await;
        assert_eq!(sandbox.live_handle_count(), before);
    }

    struct DoubleLater;

    impl HostFunction for DoubleLater {
        fn call(&self, args: Vec<Value>, _table: &HandleTable) -> HostCallOutcomeKind {
            let n = args.first().and_then(Value::as_f64).unwrap_or(0.0);
            HostCallOutcomeKind::Pending(Box::pin(async move {
                tokio::task::yield_now().await;
                Ok(Value::from(n * 2.0))
            }))
        }
    }

    #[tokio::test]
    async fn bound_async_tool_resolves_through_the_pump_loop() {
        let sandbox = new_sandbox();
        sandbox.bind_tool("doubleLater", DoubleLater).unwrap();
        let result = sandbox
            .evaluate("return await doubleLater(21);", EvaluateOptions::default())
            .await;
        match result {
            EvalResult::Ok { result, .. } => assert_eq!(result, serde_json::json!(42.0)),
            EvalResult::Err { error_message } => panic!("unexpected error: {error_message}"),
        }
    }
}
