//! Various helper-utilities

use crate::{cli::Opts, config::Config};
use anyhow::{Context, Result};
use clap::crate_name;
use flexi_logger::{
    style,
    AdaptiveFormat,
    Age,
    Cleanup,
    Criterion,
    DeferredNow,
    Duplicate,
    FileSpec,
    Level,
    Logger,
    LoggerHandle,
    Naming,
    Record,
    WriteMode,
};
use serde::{de, Deserialize};
use std::{
    env,
    io::{self, Write},
    path::PathBuf,
    process::{Command, Stdio},
};
use which::which;

/// Shorter way of testing if the user wants color for the output of `--help`
pub(crate) fn wants_color() -> bool {
    env::var_os("NO_COLOR").is_none()
}

/// Initializes logging for this crate
pub(crate) fn initialize_logging(config: &Config, args: &Opts) -> Result<LoggerHandle> {
    /// Customize the format of the log (colored)
    fn colored_format(
        w: &mut dyn Write,
        _now: &mut DeferredNow,
        record: &Record,
    ) -> Result<(), io::Error> {
        let level = record.level();
        write!(
            w,
            "{:<5} [{}:{}]: {}",
            style(level, level),
            style(Level::Trace, record.file().unwrap_or("<unnamed>")),
            record.line().unwrap_or(0),
            &record.args()
        )
    }

    /// Customize the format of the log (uncolored)
    fn uncolored_format(
        w: &mut dyn Write,
        now: &mut DeferredNow,
        record: &Record,
    ) -> Result<(), io::Error> {
        // Log messages may carry escapes from `colored`; files get plain text
        write!(
            w,
            "[{:>}] {:<5} [{}:{}]: {}",
            now.now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.file().unwrap_or("<unnamed>"),
            record.line().unwrap_or(0),
            String::from_utf8(strip_ansi_escapes::strip(
                &record.args().to_string().as_bytes()
            )?)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        )
    }

    if cfg!(debug_assertions) {
        better_panic::install();
    }

    let log_dir = config
        .global
        .log_dir
        .clone()
        .unwrap_or_else(|| env::temp_dir().join(crate_name!()));

    let mut logger = Logger::try_with_str(env::var("EVWM_LOG").unwrap_or_else(
        |_| match args.verbose {
            0 => String::from("info"),
            1 => String::from("debug"),
            _ => String::from("trace"),
        },
    ))?
    .write_mode(WriteMode::BufferAndFlush)
    .adaptive_format_for_stderr(AdaptiveFormat::Custom(uncolored_format, colored_format))
    .set_palette(String::from("9;11;14;5;13"));

    if config.global.log_to_file {
        logger = logger
            .duplicate_to_stderr(Duplicate::All)
            .rotate(
                Criterion::AgeOrSize(Age::Day, 50_000_000),
                Naming::Numbers,
                Cleanup::KeepLogFiles(2),
            )
            .log_to_file(
                FileSpec::default()
                    .basename(crate_name!())
                    .directory(&log_dir),
            )
            .format_for_files(uncolored_format);
    }

    logger.start().context("failed to start the logger")
}

/// [`Deserialize`] something that has a shell variable
#[allow(single_use_lifetimes)]
pub(crate) fn deserialize_shellexpand<'de, D>(d: D) -> Result<Option<PathBuf>, D::Error>
where
    D: de::Deserializer<'de>,
{
    let value = PathBuf::deserialize(d)?;

    let value = PathBuf::from(
        shellexpand::full(&value.to_string_lossy())
            .map_err(|e| {
                de::Error::invalid_value(
                    de::Unexpected::Str(value.to_string_lossy().as_ref()),
                    &e.to_string().as_str(),
                )
            })?
            .to_string(),
    );

    Ok(Some(value))
}

/// Start the terminal (or any command) detached from the window manager. The
/// child is never waited on; `SIGCHLD` is ignored so it does not linger.
pub(crate) fn spawn(command: &[String]) -> Result<()> {
    let (program, args) = command.split_first().context("no command to spawn")?;
    let path = which(program).with_context(|| format!("'{}' was not found in $PATH", program))?;

    log::debug!("spawning {} {:?}", path.display(), args);
    Command::new(path)
        .args(args)
        .stdin(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to spawn '{}'", program))?;

    Ok(())
}
