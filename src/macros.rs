//! Macros for error printing

/// Print a fatal message and exit
#[macro_export]
macro_rules! evwm_fatal {
    ($($err:tt)*) => ({
        use colored::Colorize;
        eprintln!("{}: {}", "[evwm fatal]".yellow().bold(), format!($($err)*));
        std::process::exit(1);
    })
}
