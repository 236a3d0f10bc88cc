//! End-to-end `Sandbox::evaluate` scenarios exercised as a library consumer
//! would, rather than via the crate-internal unit tests.

use sandbox_engine::{EvaluateOptions, Sandbox, SandboxOptionsBuilder};
use sandbox_types::EvalResult;
use serde_json::json;

fn new_sandbox() -> Sandbox {
    Sandbox::initialise(SandboxOptionsBuilder::new().build()).unwrap()
}

#[tokio::test]
async fn injected_globals_are_visible_to_guest_code() {
    let sandbox = new_sandbox();
    sandbox
        .set_global([("counter".to_string(), json!(10))])
        .unwrap();
    let result = sandbox
        .evaluate("return counter + 1;", EvaluateOptions::default())
        .await;
    match result {
        EvalResult::Ok { result, .. } => assert_eq!(result, json!(11)),
        EvalResult::Err { error_message } => panic!("unexpected error: {error_message}"),
    }
}

#[tokio::test]
async fn per_call_state_is_injected_and_echoed_back() {
    let sandbox = new_sandbox();
    let opts = EvaluateOptions {
        state: Some(json!({"counter": 10})),
        ..Default::default()
    };
    let result = sandbox
        .evaluate("return {result: state.counter + 1, state: {counter: state.counter + 1}};", opts)
        .await;
    match result {
        EvalResult::Ok { result, state } => {
            assert_eq!(result, json!(11));
            assert_eq!(state, Some(json!({"counter": 11})));
        }
        EvalResult::Err { error_message } => panic!("unexpected error: {error_message}"),
    }
}

#[tokio::test]
async fn sandbox_is_reusable_across_sequential_evaluate_calls() {
    let sandbox = new_sandbox();
    for n in 0..3 {
        let code = format!("return {n} * 2;");
        let result = sandbox.evaluate(&code, EvaluateOptions::default()).await;
        match result {
            EvalResult::Ok { result, .. } => assert_eq!(result, json!(n * 2)),
            EvalResult::Err { error_message } => panic!("unexpected error on iteration {n}: {error_message}"),
        }
    }
}

#[tokio::test]
async fn a_thrown_guest_exception_surfaces_as_an_error_result() {
    let sandbox = new_sandbox();
    let result = sandbox
        .evaluate("throw new Error('boom');", EvaluateOptions::default())
        .await;
    match result {
        EvalResult::Err { error_message } => assert!(error_message.contains("boom")),
        EvalResult::Ok { result, .. } => panic!("expected a thrown error, got {result}"),
    }
}

#[tokio::test]
async fn a_rejected_promise_surfaces_as_an_error_result() {
    let sandbox = new_sandbox();
    let code = "await Promise.reject(new Error('rejected from within')); return 1;";
    let result = sandbox.evaluate(code, EvaluateOptions::default()).await;
    match result {
        EvalResult::Err { error_message } => assert!(error_message.contains("rejected from within")),
        EvalResult::Ok { result, .. } => panic!("expected a rejection, got {result}"),
    }
}
