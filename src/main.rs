//! A minimalist X11 window manager: no decorations beyond a border, virtual
//! desktops, and everything done from the keyboard or with a modifier and the
//! mouse

#![deny(
    clippy::all,
    clippy::complexity,
    clippy::correctness,
    clippy::nursery,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    bad_style,
    ellipsis_inclusive_range_patterns,
    exported_private_dependencies,
    ill_formed_attribute_input,
    improper_ctypes,
    keyword_idents,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_abi,
    no_mangle_generic_items,
    non_shorthand_field_patterns,
    noop_method_call,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    pointer_structural_match,
    pub_use_of_private_extern_crate,
    semicolon_in_expressions_from_macros,
    single_use_lifetimes,
    trivial_casts,
    trivial_numeric_casts,
    unconditional_recursion,
    unreachable_pub,
    unsafe_code,
    while_true
)]
#![allow(
    clippy::pattern_type_mismatch,
    clippy::redundant_pub_crate,
    clippy::as_conversions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cognitive_complexity,
    clippy::doc_markdown,
    clippy::else_if_without_else,
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::struct_excessive_bools,
    clippy::too_many_lines,
    clippy::upper_case_acronyms,
    clippy::cast_lossless,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc
)]
#![cfg_attr(
    any(test),
    allow(
        clippy::expect_fun_call,
        clippy::expect_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        clippy::unwrap_used,
        clippy::wildcard_enum_match_arm,
    )
)]

mod actions;
mod bind;
mod cli;
mod client;
mod config;
mod error;
mod events;
mod ewmh;
mod geometry;
mod macros;
mod manager;
mod placement;
mod screen;
mod stack;
mod utils;
mod vdesk;
mod x;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Opts;
use colored::Colorize;
use config::{Config, DEFAULT_CONFIG};
use events::Exit;
use manager::WindowManager;
use std::{
    panic::{self, AssertUnwindSafe},
    sync::{atomic::AtomicBool, Arc},
};
use x::xconnection::XConnection;
use x11rb::rust_connection::RustConnection;

/// Name set on the supporting window
pub(crate) const WM_NAME: &str = "evwm";

/// Ignore `SIGCHLD` so spawned programs are reaped by the kernel
#[allow(unsafe_code)]
fn ignore_children() -> Result<()> {
    use nix::sys::signal::{signal, SigHandler, Signal};
    // SAFETY: installs no handler, only the ignore disposition
    unsafe { signal(Signal::SIGCHLD, SigHandler::SigIgn) }
        .context("failed to ignore SIGCHLD")?;
    Ok(())
}

/// Raise `quit` on `SIGTERM` and `SIGINT`, `reload` on `SIGHUP`
fn register_signals(quit: &Arc<AtomicBool>, reload: &Arc<AtomicBool>) -> Result<()> {
    use signal_hook::{
        consts::{SIGHUP, SIGINT, SIGTERM},
        flag,
    };

    for sig in [SIGTERM, SIGINT] {
        flag::register(sig, Arc::clone(quit)).context("failed to register a quit signal")?;
    }
    flag::register(SIGHUP, Arc::clone(reload)).context("failed to register SIGHUP")?;
    Ok(())
}

fn run(args: &Opts, mut config: Config) -> Result<()> {
    let quit = Arc::new(AtomicBool::new(false));
    let reload = Arc::new(AtomicBool::new(false));
    register_signals(&quit, &reload)?;
    ignore_children()?;

    let (conn, _screen) = RustConnection::connect(config.global.display.as_deref())
        .map_err(error::Error::Connection)?;
    let xconn = XConnection::new(conn, &config.global)?;
    let mut wm = WindowManager::new(xconn, &config)?;
    wm.start()?;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<()> {
        loop {
            match wm.run(&quit, &reload)? {
                Exit::Quit => return Ok(()),
                Exit::Reload => {
                    log::info!("reloading the configuration");
                    match Config::load_with(args) {
                        Ok(fresh) => config = fresh,
                        Err(e) => {
                            log::error!("keeping the old configuration: {:#}", e);
                            continue;
                        },
                    }
                    wm.reload(&config)?;
                },
            }
        }
    }));

    match outcome {
        Ok(res) => {
            let stopped = wm.shutdown();
            res.and(stopped)
        },
        Err(payload) => {
            wm.emergency_cleanup();
            panic::resume_unwind(payload);
        },
    }
}

fn main() -> Result<()> {
    let args = Opts::parse();

    match args.color_when.as_deref() {
        Some("always") => colored::control::set_override(true),
        Some("never") => colored::control::set_override(false),
        _ => {},
    }

    if args.write_defaults {
        print!("{}", DEFAULT_CONFIG);
        return Ok(());
    }

    let config = match Config::load_with(&args) {
        Ok(config) => config,
        Err(e) => evwm_fatal!("{:#}", e),
    };
    let _logger = utils::initialize_logging(&config, &args)?;
    log::debug!("{}: {:#?}", "Configuration options".bright_blue(), config);

    if let Err(e) = run(&args, config) {
        log::error!("{:#}", e);
        evwm_fatal!("{:#}", e);
    }

    Ok(())
}
