//! Host <-> guest conversions.
//!
//! The "host value" type throughout this workspace is `serde_json::Value` —
//! every tool's `input`/`output` is already JSON at the boundary (see
//! `sandbox-tool::Tool`), so the Marshaller's job reduces to a JSON <->
//! `boa_engine::JsValue` bridge rather than a bridge over an arbitrary host
//! type. Dates, regexes, and binary buffers are not native
//! `serde_json::Value` shapes; callers that need them encode them as
//! plain strings/arrays before crossing the boundary, consistent with "Dates
//! ... marshalled as their ISO ... string forms".

use crate::handle::{Handle, HandleTable};
use boa_engine::object::builtins::JsArray;
use boa_engine::property::PropertyKey;
use boa_engine::{Context, JsNativeError, JsObject, JsResult, JsString, JsValue};
use sandbox_classify::ClassifiedError;
use serde_json::Value;

/// Convert a host JSON value into a guest handle.
pub fn to_guest(ctx: &mut Context, table: &HandleTable, value: &Value) -> Handle {
    table.track(to_guest_raw(ctx, value))
}

/// The recursive primitive/array/object walk behind [`to_guest`], exposed
/// so callers that already hold a live `Handle`'s value (rather than a
/// fresh one to track) can still reach the conversion — used by the
/// sandbox's async tool-call bridge to marshal a settled host result
/// straight into a promise resolution without an intermediate `Handle`.
pub fn to_guest_raw(ctx: &mut Context, value: &Value) -> JsValue {
    match value {
        Value::Null => JsValue::null(),
        Value::Bool(b) => JsValue::from(*b),
        Value::Number(n) => JsValue::from(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => JsValue::from(JsString::from(s.as_str())),
        Value::Array(items) => {
            let values: Vec<JsValue> = items.iter().map(|v| to_guest_raw(ctx, v)).collect();
            let array = JsArray::from_iter(values, ctx);
            array.into()
        }
        Value::Object(map) => {
            let obj = JsObject::with_object_proto(ctx.intrinsics());
            for (key, val) in map {
                let guest_val = to_guest_raw(ctx, val);
                let _ = obj.set(
                    PropertyKey::from(JsString::from(key.as_str())),
                    guest_val,
                    false,
                    ctx,
                );
            }
            obj.into()
        }
    }
}

/// Convert a guest handle back into a host JSON value.
///
/// Promises are *not* dumped here — the caller (the Sandbox's promise
/// resolution logic) must settle a promise to a concrete value first. A
/// handle over a still-pending promise dumps to `internal`: that would
/// indicate a marshaller invariant was broken upstream.
pub fn to_host(ctx: &mut Context, handle: &Handle) -> Result<Value, ClassifiedError> {
    to_host_raw(ctx, handle.value())
}

fn to_host_raw(ctx: &mut Context, value: &JsValue) -> Result<Value, ClassifiedError> {
    if value.is_undefined() || value.is_null() {
        return Ok(Value::Null);
    }
    if let Some(b) = value.as_boolean() {
        return Ok(Value::Bool(b));
    }
    if let Some(n) = value.as_number() {
        return Ok(match serde_json::Number::from_f64(n) {
            Some(number) => Value::Number(number),
            None if n.is_nan() => Value::String("NaN".to_string()),
            None if n.is_infinite() && n.is_sign_positive() => Value::String("Infinity".to_string()),
            None => Value::String("-Infinity".to_string()),
        });
    }
    if let Some(bigint) = value.as_bigint() {
        return Ok(Value::String(bigint.to_string()));
    }
    if let Some(s) = value.as_string() {
        return Ok(Value::String(
            s.to_std_string()
                .map_err(|_| ClassifiedError::internal("guest string was not valid UTF-16"))?,
        ));
    }
    if let Some(obj) = value.as_object() {
        if let Ok(array) = JsArray::from_object(obj.clone()) {
            let len = array
                .length(ctx)
                .map_err(|e| ClassifiedError::internal(format!("reading array length: {e}")))?;
            let mut out = Vec::with_capacity(len as usize);
            for i in 0..len {
                let item = array
                    .get(i, ctx)
                    .map_err(|e| ClassifiedError::internal(format!("reading array item: {e}")))?;
                out.push(to_host_raw(ctx, &item)?);
            }
            return Ok(Value::Array(out));
        }

        let keys = obj
            .own_property_keys(ctx)
            .map_err(|e| ClassifiedError::internal(format!("reading object keys: {e}")))?;
        let mut map = serde_json::Map::new();
        for key in keys {
            let PropertyKey::String(key_str) = &key else {
                continue; // symbol-keyed properties have no JSON representation
            };
            let prop_value: JsResult<JsValue> = obj.get(key.clone(), ctx);
            let prop_value = prop_value
                .map_err(|e| ClassifiedError::internal(format!("reading object property: {e}")))?;
            let key_name = key_str
                .to_std_string()
                .map_err(|_| ClassifiedError::internal("object key was not valid UTF-16"))?;
            map.insert(key_name, to_host_raw(ctx, &prop_value)?);
        }
        return Ok(Value::Object(map));
    }
    Err(ClassifiedError::internal(
        "unrecognised guest value shape during host conversion",
    ))
}

/// Format a `JsNativeError`/thrown guest value the way the Marshaller's
/// error formatter does for pending-job-pump failures and rejections:
/// `"name: 'message'"` with a stack trailer when available.
#[must_use]
pub fn format_guest_error(ctx: &mut Context, thrown: &JsValue) -> String {
    if let Some(obj) = thrown.as_object() {
        let name = obj
            .get(JsString::from("name"), ctx)
            .ok()
            .and_then(|v| v.as_string().and_then(|s| s.to_std_string().ok()))
            .unwrap_or_else(|| "Error".to_string());
        let message = obj
            .get(JsString::from("message"), ctx)
            .ok()
            .and_then(|v| v.as_string().and_then(|s| s.to_std_string().ok()))
            .unwrap_or_default();
        let stack = obj
            .get(JsString::from("stack"), ctx)
            .ok()
            .and_then(|v| v.as_string().and_then(|s| s.to_std_string().ok()));
        match stack {
            Some(stack) => format!("{name}: '{message}' stack:\n{stack}"),
            None => format!("{name}: '{message}'"),
        }
    } else if let Some(s) = thrown.as_string().and_then(|s| s.to_std_string().ok()) {
        s
    } else {
        format!("{thrown:?}")
    }
}

/// Build a native `JsNativeError` for a host-side throw, used when wrapping
/// a host function call that failed synchronously.
#[must_use]
pub fn host_error_to_guest(message: &str) -> JsNativeError {
    JsNativeError::error().with_message(message.to_string())
}
