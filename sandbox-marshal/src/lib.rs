//! The Value Marshaller: the only component that touches raw interpreter
//! handles. Converts between host JSON values and guest handles, wraps host
//! functions as guest callables, and accounts for handle lifetimes so leaks
//! are directly testable.

pub mod convert;
pub mod func;
pub mod handle;

pub use convert::{format_guest_error, host_error_to_guest, to_guest, to_guest_raw, to_host};
pub use func::{new_guest_promise, wrap_function, HostCallOutcomeKind, HostFunction};
pub use handle::{Handle, HandleTable};
