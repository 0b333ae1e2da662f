use std::any::Any;
use std::backtrace::Backtrace;

use axum::response::Response;

use crate::api::response::internal_error_response;

/// Route `panic!` output through tracing, with a backtrace, instead of stderr.
///
/// Installed once at startup. Panics inside handlers are additionally caught
/// by `CatchPanicLayer`, which answers with [`handle_panic`].
pub fn install_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = Backtrace::force_capture();
        tracing::error!(
            category = "internal_error",
            backtrace = %backtrace,
            "panic: {}",
            info
        );
    }));
}

/// Response for a handler that panicked. The panic was already logged by the
/// hook, so this only writes the generic 500 envelope.
pub fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    internal_error_response()
}
