use slog::{o, Drain, Logger};
use std::sync::atomic::{AtomicBool, Ordering};

/// Installs the process-wide logger (stderr, `RUST_LOG`-filtered) and the
/// `log` facade bridge. Only the first call has an effect.
pub fn setup() {
    static INSTALLED: AtomicBool = AtomicBool::new(false);
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }
    let drain =
        slog_term::CompactFormat::new(slog_term::TermDecorator::new().stderr().build()).build();
    let drain = slog_envlogger::new(drain);
    let drain = std::sync::Mutex::new(drain);
    let logger = Logger::root(drain.fuse(), o!()).into_erased();
    let guard = slog_scope::set_global_logger(logger);
    slog_stdlog::init().unwrap();
    std::mem::forget(guard);
}
