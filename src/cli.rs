//! The command line arguments

use crate::utils::wants_color;
use clap::{crate_description, crate_version, AppSettings, Parser, ValueHint};
use once_cell::sync::Lazy;
use std::{env, fs, path::PathBuf};

/// Options for the `evwm` program
#[derive(Parser, Default, Clone, Debug, PartialEq)]
#[clap(
    version = crate_version!(),
    about = <String as AsRef<str>>::as_ref(&APP_ABOUT),
    after_help =  <String as AsRef<str>>::as_ref(&AFTER_HELP),
    override_usage =  <String as AsRef<str>>::as_ref(&OVERRIDE_HELP),
    max_term_width = 100,
    color = clap::ColorChoice::Auto,
    global_setting = AppSettings::DeriveDisplayOrder,
    disable_help_subcommand = true,
    hide_possible_values = true,
)]
pub(crate) struct Opts {
    /// Display debugging messages on various levels
    #[clap(
        long,
        short,
        parse(from_occurrences),
        long_help = "
        Set the verbosity level of the program. There are 2 extra levels after the default (INFO). \
                     If `-v` is used, DEBUG messages are displayed, and if `-vv` is used TRACE \
                     messages are displayed. The verbosity can also be set with the `EVWM_LOG` \
                     environment variable"
    )]
    pub(crate) verbose: u8,

    /// Location of configuration file
    #[clap(
        long,
        short,
        takes_value = true,
        number_of_values = 1,
        value_name = "file",
        value_hint = ValueHint::FilePath,
        validator = |t| {
            fs::metadata(
                PathBuf::from(t).components()
                    .count()
                    .gt(&1_usize)
                    .then(|| PathBuf::from(t))
                    .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(PathBuf::from(t))),
            )
            .map_err(|_| "must be a valid path")
            .map(|_| ())
            .map_err(|e| e.to_string())
        },
        long_help = "\
        Specify the location of the configuration file. The default location is \
                `$XDG_CONFIG_HOME/evwm/evwm.yml`"
    )]
    pub(crate) config: Option<PathBuf>,

    /// X display to connect to
    #[clap(long, value_name = "display")]
    pub(crate) display: Option<String>,

    /// Command run by the `spawn` function
    #[clap(long, value_name = "program")]
    pub(crate) term: Option<String>,

    /// Window border width
    #[clap(long, value_name = "pixels")]
    pub(crate) bw: Option<i32>,

    /// Snap distance when dragging windows
    #[clap(long, value_name = "pixels")]
    pub(crate) snap: Option<i32>,

    /// Total number of virtual desktops
    #[clap(long, value_name = "n")]
    pub(crate) numvdesks: Option<u32>,

    /// Bind (or unbind) an input to a window manager function
    #[clap(
        long,
        value_name = "ctl[=func]",
        multiple_occurrences = true,
        number_of_values = 1,
        long_help = "\
        Bind a control to a function. CTL is a list of modifiers (mask1, mask2, altmask, shift, \
                     control, mod1..mod5) and one key or button, FUNC a function name with \
                     optional flags. Entries are separated with '+' or ','. Without FUNC the \
                     control is unbound. May be given more than once"
    )]
    pub(crate) bind: Vec<String>,

    /// Don't use the built-in bindings
    #[clap(long)]
    pub(crate) nodefaultbinds: bool,

    /// Print the default configuration and exit
    #[clap(long = "write-defaults", alias = "writedefaults")]
    pub(crate) write_defaults: bool,

    /// When to colorize output
    #[clap(
        name = "color",
        long = "color",
        short = 'C',
        value_name = "when",
        possible_values = &["never", "auto", "always"],
        long_help = "\
        When to colorize output (usually meant for piping). Valid values are: always, \
                auto, never."
    )]
    pub(crate) color_when: Option<String>,
}

// =============== Prettify Help ==================

/// Yellow ansi code
const YELLOW: &str = "\x1b[0;33m";
/// Green ansi code
const GREEN: &str = "\x1b[0;32m";
/// Bold-red ansi code
const BRED: &str = "\x1b[01;38;5;1m";
/// Reset colors
const RES: &str = "\x1b[0m";

/// Colored options used in the output of `--help`
pub(crate) static APP_ABOUT: Lazy<String> = Lazy::new(|| {
    wants_color()
        .then(|| {
            format!(
                "{}DESCRIPTION: {}{}{}",
                YELLOW,
                GREEN,
                crate_description!(),
                RES
            )
        })
        .unwrap_or_else(|| crate_description!().to_owned())
});

/// Colorized message to override the generated help message
pub(crate) static OVERRIDE_HELP: Lazy<String> = Lazy::new(|| {
    wants_color()
        .then(|| format!("{}evwm{} [{}OPTIONS{}]", BRED, RES, GREEN, RES))
        .unwrap_or_else(|| String::from("evwm [OPTIONS]"))
});

/// Colorized message displayed after the help message
pub(crate) static AFTER_HELP: Lazy<String> = Lazy::new(|| {
    wants_color()
        .then(|| {
            format!(
                "See {}evwm{} {}--help{} for longer explanations of some options.",
                BRED, RES, GREEN, RES
            )
        })
        .unwrap_or_else(|| {
            String::from("See evwm --help for longer explanations of some options.")
        })
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_binds_and_verbosity() {
        let opts = Opts::parse_from([
            "evwm", "-vv", "--bw", "2", "--bind", "mask1+q=delete", "--bind", "mask1+w",
        ]);
        assert_eq!(opts.verbose, 2);
        assert_eq!(opts.bw, Some(2));
        assert_eq!(opts.bind, vec!["mask1+q=delete", "mask1+w"]);
        assert!(!opts.write_defaults);
    }
}
