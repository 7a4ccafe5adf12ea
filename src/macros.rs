/// Log at PANIC severity, then panic with the same message.
///
/// ```rust,should_panic
/// beanlog::log_panic!("invariant broken: {}", 42);
/// ```
#[macro_export]
macro_rules! log_panic {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        $crate::__private::tracing::error!(severity = "panic", $fmt $(, $arg)*);
        ::std::panic!($fmt $(, $arg)*)
    }};
}

/// Log at FATAL severity, drain and close the active file outputs, then exit
/// with status 1.
///
/// Unless `noFatalTrace` is set, the record carries a backtrace.
#[macro_export]
macro_rules! log_fatal {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        $crate::__private::tracing::error!(severity = "fatal", $fmt $(, $arg)*);
        $crate::__private::exit_fatal()
    }};
}
