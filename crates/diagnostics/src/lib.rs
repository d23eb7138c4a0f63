//! Lightweight diagnostics for the tabvu workspace.
//!
//! Provides configurable logging shared by every crate in the project.
//!
//! Usage:
//! - Set TABVU_LOG=off (default) - no logs
//! - Set TABVU_LOG=info - basic operation logs
//! - Set TABVU_LOG=debug - detailed diagnostic logs

use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

static INIT: Once = Once::new();

/// Initialize diagnostics based on the TABVU_LOG environment variable.
///
/// Call once at startup. Safe to call multiple times - subsequent calls
/// are ignored.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let log_level = std::env::var("TABVU_LOG").unwrap_or_else(|_| "off".to_string());

        let rt = match log_level.as_str() {
            "off" => return,
            "debug" => emit::setup()
                .emit_to(emit_term::stderr())
                .emit_when(emit::level::min_filter(emit::Level::Debug))
                .init(),
            "info" => emit::setup()
                .emit_to(emit_term::stderr())
                .emit_when(emit::level::min_filter(emit::Level::Info))
                .init(),
            "warn" => emit::setup()
                .emit_to(emit_term::stderr())
                .emit_when(emit::level::min_filter(emit::Level::Warn))
                .init(),
            "error" => emit::setup()
                .emit_to(emit_term::stderr())
                .emit_when(emit::level::min_filter(emit::Level::Error))
                .init(),
            _ => {
                let rt = emit::setup()
                    .emit_to(emit_term::stderr())
                    .emit_when(emit::level::min_filter(emit::Level::Info))
                    .init();
                eprintln!("Warning: Unknown TABVU_LOG value '{}', using 'info'", log_level);
                rt
            }
        };

        // The emit runtime must outlive the process; there is no shutdown path.
        std::mem::forget(rt);
    });
}

// Re-export emit's logging macros directly. Forwarding through a local
// `macro_rules!` wrapper breaks emit's implicit `{ident}` template capture
// (the captured identifiers inherit the wrapper's macro hygiene instead of
// the call site's), so the macros are re-exported as-is to preserve behavior.

/// Log basic operations (sign-ins, queries, exports, schedule fires, etc.)
pub use emit::info;

/// Log detailed diagnostics (payloads, record counts, fire-time computation, etc.)
pub use emit::debug;

/// Log recoverable conditions (skipped filters, replay failures, retries)
pub use emit::warn;

/// Log failures that prevent an operation from completing
pub use emit::error;

/// Re-export the init function for convenience
pub use init_diagnostics as init;
