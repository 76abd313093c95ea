//! Configuration options

use crate::{
    bind::DEFAULT_BINDS,
    cli::Opts,
    client::Vdesk,
    stack::RaisePolicy,
    utils::deserialize_shellexpand,
};
use anyhow::{Context, Result};
use colored::Colorize;
use directories::BaseDirs;
use format_serde_error::SerdeError;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    env,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

/// Configuration file name
const CONFIG_FILE: &str = "evwm.yml";

/// The configuration written when none exists, also printed by
/// `--write-defaults`
pub(crate) const DEFAULT_CONFIG: &str = include_str!("../data/evwm.yml");

// =============== GlobalSettings ================= [[[

/// Global configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct GlobalSettings {
    /// The display to connect to, instead of `$DISPLAY`
    pub(crate) display: Option<String>,

    /// Command (and arguments) run by the `spawn` function
    pub(crate) term: Vec<String>,

    /// Core font used for the info banner and outline labels
    #[serde(alias = "fn")]
    pub(crate) font: String,

    /// Border color of the focused client
    pub(crate) fg: String,

    /// Border color of every other client
    pub(crate) bg: String,

    /// Border color of the focused client when it is fixed
    pub(crate) fc: String,

    /// Width of the border drawn around each client
    #[serde(alias = "border-width", alias = "bw")]
    pub(crate) border_width: i32,

    /// Distance within which dragged clients snap to edges; 0 disables
    pub(crate) snap: i32,

    /// Pixels moved or resized by one keyboard step
    pub(crate) kbpx: i32,

    /// Multiplier for keyboard steps repeated quickly
    pub(crate) quickmove: f64,

    /// Window for a keyboard step to count as repeated (milliseconds)
    #[serde(alias = "quickmove-ms")]
    pub(crate) quickmove_ms: u32,

    /// Maximise to the whole screen rather than the client's monitor
    pub(crate) wholescreen: bool,

    /// Number of virtual desktops
    #[serde(alias = "numvdesks")]
    pub(crate) vdesks: u32,

    /// Desktops per row for relative switching; 0 means all in one row
    pub(crate) modvdesks: u32,

    /// Whether docks start out visible
    pub(crate) docks: bool,

    /// Move the real window while dragging instead of an outline
    #[serde(alias = "solid-drag")]
    pub(crate) solid_drag: bool,

    /// Resize the real window while sweeping instead of an outline
    #[serde(alias = "solid-sweep")]
    pub(crate) solid_sweep: bool,

    /// Modifiers for most keyboard controls
    pub(crate) mask1: String,

    /// Modifiers for mouse button controls
    pub(crate) mask2: String,

    /// Modifiers selecting alternate behaviour
    pub(crate) altmask: String,

    /// Start from an empty binding table
    #[serde(alias = "no-default-binds")]
    pub(crate) no_default_binds: bool,

    /// How far `raise` and `lower` move a client
    #[serde(alias = "raise-policy")]
    pub(crate) raise_policy: RaisePolicy,

    /// Whether logs should be written to a file
    #[serde(alias = "log-to-file")]
    pub(crate) log_to_file: bool,

    /// The directory to write the log to
    #[serde(alias = "log-dir", deserialize_with = "deserialize_shellexpand")]
    pub(crate) log_dir: Option<PathBuf>,
} // ]]] === Global Settings ===

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            display:          None,
            term:             vec![String::from("xterm")],
            font:             String::from("variable"),
            fg:               String::from("goldenrod"),
            bg:               String::from("grey50"),
            fc:               String::from("blue"),
            border_width:     1_i32,
            snap:             0_i32,
            kbpx:             16_i32,
            quickmove:        1.0_f64,
            quickmove_ms:     250_u32,
            wholescreen:      false,
            vdesks:           8_u32,
            modvdesks:        0_u32,
            docks:            true,
            solid_drag:       true,
            solid_sweep:      false,
            mask1:            String::from("control+alt"),
            mask2:            String::from("alt"),
            altmask:          String::from("shift"),
            no_default_binds: false,
            raise_policy:     RaisePolicy::Overlap,
            log_to_file:      false,
            log_dir:          None,
        }
    }
}

// ================== AppRule ===================== [[[

/// Matches `WxH+X+Y`, either half optional. Offsets keep their sign so that
/// `-0` can be told apart from `+0`.
static GEOMETRY_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^=?(?:(\d+)x(\d+))?(?:([+-]\d+)([+-]\d+))?$").ok());

/// An X geometry string as used by application rules
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GeometrySpec {
    /// Size in client increments
    pub(crate) size:     Option<(i32, i32)>,
    /// Offsets and whether each was written with a minus sign, which makes
    /// it relative to the right or bottom edge
    pub(crate) position: Option<((i32, bool), (i32, bool))>,
}

impl GeometrySpec {
    /// Parse `WxH`, `+X+Y` or `WxH+X+Y`
    pub(crate) fn parse(s: &str) -> Option<Self> {
        let caps = GEOMETRY_RE.as_ref()?.captures(s.trim())?;
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i32>().ok());
        let offset = |i: usize| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<i32>().ok().map(|v| (v, m.as_str().starts_with('-'))))
        };

        let spec = Self {
            size:     num(1).zip(num(2)),
            position: offset(3).zip(offset(4)),
        };
        (spec.size.is_some() || spec.position.is_some()).then(|| spec)
    }
}

/// Settings applied to matching windows when they are first managed
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppRule {
    /// Instance part of `WM_CLASS`, matched exactly
    pub(crate) name:     Option<String>,
    /// Class part of `WM_CLASS`, matched exactly
    pub(crate) class:    Option<String>,
    /// Matched against any part of the window title
    pub(crate) title:    Option<String>,
    /// X geometry string; the size is counted in client increments
    pub(crate) geometry: Option<String>,
    /// Ignore the client's own configure requests
    pub(crate) manual:   bool,
    /// Treat as a dock
    pub(crate) dock:     bool,
    /// Desktop to place the client on
    pub(crate) vdesk:    Option<u32>,
    /// Show on every desktop
    pub(crate) fixed:    bool,
}

impl AppRule {
    /// Whether the rule applies. A missing matcher matches anything.
    pub(crate) fn matches(&self, instance: Option<&str>, class: Option<&str>, title: Option<&str>) -> bool {
        let exact = |want: &Option<String>, have: Option<&str>| {
            want.as_deref().map_or(true, |w| have == Some(w))
        };
        exact(&self.name, instance)
            && exact(&self.class, class)
            && self
                .title
                .as_deref()
                .map_or(true, |t| title.map_or(false, |have| have.contains(t)))
    }

    /// Desktop the rule assigns, if any. `fixed` wins over a number.
    pub(crate) fn target_vdesk(&self) -> Option<Vdesk> {
        if self.fixed {
            Some(Vdesk::Fixed)
        } else {
            self.vdesk.map(Vdesk::from_cardinal)
        }
    }

    pub(crate) fn parsed_geometry(&self) -> Option<GeometrySpec> {
        let geom = self.geometry.as_deref()?;
        let spec = GeometrySpec::parse(geom);
        if spec.is_none() {
            log::warn!("ignoring invalid geometry '{}' in application rule", geom);
        }
        spec
    }
}

// ]]] === AppRule ===

// =================== Config ===================== [[[

/// Configuration file to parse
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// Global settings
    #[serde(flatten)]
    pub(crate) global: GlobalSettings,

    /// Bindings of `trigger => function`, applied after the built-in ones
    pub(crate) bindings: Option<IndexMap<String, String>>,

    /// Rules matched against newly managed windows, in order
    #[serde(default)]
    pub(crate) applications: Vec<AppRule>,
}

impl Config {
    /// Create the default configuration file
    pub(crate) fn create_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::debug!("Creating configuration path: {}", path.display());
            fs::create_dir_all(path).context("unable to create configuration directory")?;
        }

        let path = path.join(CONFIG_FILE);
        log::debug!("{}: {}", "Configuration path".bright_blue(), path.display());

        if !path.is_file() {
            let mut config_file: fs::File = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .open(&path)
                .with_context(|| format!("could not create evwm config: '{}'", path.display()))?;

            config_file
                .write_all(DEFAULT_CONFIG.as_bytes())
                .with_context(|| format!("could not create evwm config: '{}'", path.display()))?;
            config_file.flush()?;
        }

        Self::load(path)
    }

    /// Load the configuration file from a given path
    pub(crate) fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: '{}'", path.display()))?;

        Self::parse(file)
    }

    /// Parse the text of a configuration file
    pub(crate) fn parse(text: String) -> Result<Self> {
        let res = serde_yaml::from_str(&text).map_err(|e| SerdeError::new(text, e))?;
        Ok(res)
    }

    /// Load the default configuration file
    pub(crate) fn load_default() -> Result<Self> {
        let path = PROJECT_DIRS
            .as_ref()
            .context("could not detect the user's home directory")?
            .config_dir();
        log::debug!("loading default config: {}", path.display());
        Self::create_default(path)
    }

    /// Load the file named on the command line, or the default one, and
    /// apply the command line on top
    pub(crate) fn load_with(args: &Opts) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::load_default()?,
        };
        config.apply_cli(args);
        Ok(config)
    }

    /// Options given on the command line override the file
    pub(crate) fn apply_cli(&mut self, args: &Opts) {
        let g = &mut self.global;

        if let Some(display) = &args.display {
            g.display = Some(display.clone());
        }
        if let Some(term) = &args.term {
            g.term = term.split_whitespace().map(String::from).collect();
        }
        if let Some(bw) = args.bw {
            g.border_width = bw;
        }
        if let Some(snap) = args.snap {
            g.snap = snap;
        }
        if let Some(n) = args.numvdesks {
            g.vdesks = n;
        }
        if args.nodefaultbinds {
            g.no_default_binds = true;
        }

        if !args.bind.is_empty() {
            let bindings = self.bindings.get_or_insert_with(IndexMap::new);
            for bind in &args.bind {
                let (ctl, func) = bind.split_once('=').unwrap_or((bind, ""));
                // Re-inserting moves the entry to the end so it applies last
                bindings.shift_remove(ctl);
                bindings.insert(ctl.to_string(), func.to_string());
            }
        }
    }

    /// Bindings in the order they are applied. Defaults come first unless
    /// disabled.
    pub(crate) fn binding_list(&self) -> Vec<(String, String)> {
        let defaults = (!self.global.no_default_binds)
            .then(|| DEFAULT_BINDS.iter().map(|(c, f)| ((*c).to_string(), (*f).to_string())))
            .into_iter()
            .flatten();

        defaults
            .chain(self.bindings.iter().flatten().map(|(c, f)| (c.clone(), f.clone())))
            .collect()
    }
} // ]]] === Config ===

// ================ Project Dirs ================== [[[

/// Get the base [`EvwmDirs`]
pub(crate) static PROJECT_DIRS: Lazy<Option<EvwmDirs>> = Lazy::new(EvwmDirs::new);

/// Get the project directories relevant to `evwm`
#[derive(Debug, Clone)]
pub(crate) struct EvwmDirs {
    /// User's `$XDG_CONFIG_HOME/evwm` directory
    config_dir: PathBuf,
}

impl EvwmDirs {
    /// Create a new [`EvwmDirs`]
    fn new() -> Option<Self> {
        Some(Self {
            config_dir: Self::get_dir("EVWM_CONFIG_DIR", "XDG_CONFIG_HOME", ".config")?,
        })
    }

    /// Wrapper function that makes it easier to get directories
    fn get_dir(env_var: &str, var: &str, join: &str) -> Option<PathBuf> {
        let fallback = || {
            env::var_os(var)
                .map(PathBuf::from)
                .filter(|p| p.is_absolute())
                .or_else(|| BaseDirs::new().map(|p| p.home_dir().join(join)))
                .map(|p| p.join(env!("CARGO_PKG_NAME")))
        };

        // A custom directory is only honored when absolute
        env::var_os(env_var)
            .map(PathBuf::from)
            .filter(|p| p.is_absolute())
            .or_else(fallback)
    }

    /// Get configuration directory
    #[must_use]
    pub(crate) fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

// ]]] === Project Dirs ===

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn embedded_default_matches_builtin() {
        let config = Config::parse(DEFAULT_CONFIG.to_string()).unwrap();
        assert_eq!(config.global, GlobalSettings::default());
        assert!(config.applications.is_empty());

        // Every default binding is spelled out in the file
        let written = config.bindings.unwrap_or_default();
        for (ctl, func) in DEFAULT_BINDS {
            assert_eq!(written.get(*ctl).map(String::as_str), Some(*func), "{}", ctl);
        }
    }

    #[test]
    fn kebab_case_and_rules() {
        let config = Config::parse(String::from(
            "border-width: 3\nsolid-drag: false\nraise-policy: plain\nnumvdesks: 4\n\
             applications:\n  - class: Firefox\n    geometry: 80x24-0+10\n    fixed: true\n",
        ))
        .unwrap();

        assert_eq!(config.global.border_width, 3);
        assert!(!config.global.solid_drag);
        assert_eq!(config.global.raise_policy, RaisePolicy::Plain);
        assert_eq!(config.global.vdesks, 4);

        let rule = &config.applications[0];
        assert!(rule.matches(Some("Navigator"), Some("Firefox"), None));
        assert!(!rule.matches(Some("Navigator"), Some("firefox"), None));
        assert_eq!(rule.target_vdesk(), Some(Vdesk::Fixed));
        assert_eq!(
            rule.parsed_geometry(),
            Some(GeometrySpec {
                size:     Some((80, 24)),
                position: Some(((0, true), (10, false))),
            })
        );
    }

    #[test]
    fn title_matches_substring() {
        let rule = AppRule {
            title: Some(String::from("Sharing")),
            ..AppRule::default()
        };
        assert!(rule.matches(None, None, Some("Firefox - Sharing Indicator")));
        assert!(!rule.matches(None, None, None));
        assert!(AppRule::default().matches(None, None, None));
    }

    #[test]
    fn geometry_forms() {
        assert_eq!(GeometrySpec::parse("100x160").and_then(|g| g.size), Some((100, 160)));
        assert_eq!(
            GeometrySpec::parse("+5-20").and_then(|g| g.position),
            Some(((5, false), (-20, true)))
        );
        assert!(GeometrySpec::parse("").is_none());
        assert!(GeometrySpec::parse("axb").is_none());
    }

    #[test]
    fn command_line_wins() {
        let mut config = Config::parse(String::from("snap: 5\nbindings:\n  mask1+x: spawn\n")).unwrap();
        let args = Opts::parse_from(["evwm", "--snap", "12", "--bind", "mask1+x", "--bind", "mask1+y=lower"]);
        config.apply_cli(&args);

        assert_eq!(config.global.snap, 12);
        let list = config.binding_list();
        let tail = &list[list.len() - 2..];
        assert_eq!(tail[0], (String::from("mask1+x"), String::new()));
        assert_eq!(tail[1], (String::from("mask1+y"), String::from("lower")));
    }
}
