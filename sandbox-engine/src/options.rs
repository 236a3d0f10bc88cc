//! Configuration for [`crate::Sandbox`].

use tokio_util::sync::CancellationToken;

/// Default wall-clock deadline for one `evaluate` call, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 300;
/// Default interpreter stack cap, passed to boa's `RuntimeLimits`.
pub const DEFAULT_MAX_STACK_BYTES: usize = 512 * 1024;
/// Conservative estimate of interpreter instructions executed per
/// millisecond, used to size the instruction budget given to
/// `Context::set_instructions_remaining` so a CPU-bound guest loop
/// (`while (true) {}`) is preempted from inside the interpreter itself
/// rather than only between pending-job-pump polls.
pub const INSTRUCTIONS_PER_MS: u64 = 200_000;
/// Instruction budget applied when no `timeout_ms` is configured — still
/// bounds a runaway guest loop, just not tied to a wall-clock deadline.
pub const DEFAULT_INSTRUCTION_LIMIT: u64 = 50_000_000;

/// Options fixed for the lifetime of a [`crate::Sandbox`].
#[derive(Debug, Clone)]
pub struct SandboxOptions {
    /// Default per-`evaluate` deadline; `None` means no default (each call
    /// must supply its own or run unbounded).
    pub timeout_ms: Option<u64>,
    /// Interpreter stack cap.
    pub max_stack_bytes: usize,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            timeout_ms: Some(DEFAULT_TIMEOUT_MS),
            max_stack_bytes: DEFAULT_MAX_STACK_BYTES,
        }
    }
}

impl SandboxOptions {
    /// The instruction budget to hand to
    /// `Context::set_instructions_remaining` for a call bounded by
    /// `deadline_ms` (falling back to [`DEFAULT_INSTRUCTION_LIMIT`] when no
    /// deadline applies).
    #[must_use]
    pub(crate) fn instruction_budget(&self, deadline_ms: Option<u64>) -> u64 {
        match deadline_ms.or(self.timeout_ms) {
            Some(ms) => ms.saturating_mul(INSTRUCTIONS_PER_MS).max(1),
            None => DEFAULT_INSTRUCTION_LIMIT,
        }
    }
}

/// A builder for [`SandboxOptions`], mirroring the workspace's convention
/// of assembling configuration through a typed builder rather than exposing
/// public struct fields for construction.
#[derive(Debug, Clone, Default)]
pub struct SandboxOptionsBuilder {
    options: SandboxOptions,
}

impl SandboxOptionsBuilder {
    /// Start from the documented defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default per-`evaluate` timeout.
    #[must_use]
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.options.timeout_ms = Some(timeout_ms);
        self
    }

    /// Disable the default timeout (individual `evaluate` calls may still
    /// supply one).
    #[must_use]
    pub fn no_default_timeout(mut self) -> Self {
        self.options.timeout_ms = None;
        self
    }

    /// Set the interpreter stack cap.
    #[must_use]
    pub fn max_stack_bytes(mut self, bytes: usize) -> Self {
        self.options.max_stack_bytes = bytes;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> SandboxOptions {
        self.options
    }
}

/// Per-call options for a single [`crate::Sandbox::evaluate`] invocation.
#[derive(Default)]
pub struct EvaluateOptions {
    /// Opaque state injected as the guest `state` global for this call;
    /// echoed back alongside the result when the script's return value is a
    /// `{result, state}` shape.
    pub state: Option<serde_json::Value>,
    /// A filename used in stack traces; purely cosmetic.
    pub filename: Option<String>,
    /// Overrides the sandbox's default timeout for this call only.
    pub timeout_ms: Option<u64>,
    /// A cancellation token the host may trip to abort this call.
    pub cancel_token: Option<CancellationToken>,
}
