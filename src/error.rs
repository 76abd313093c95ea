//! Errors found throughout this crate

use crate::x::Window;
use thiserror::Error;
use x11rb::errors::ConnectError;

/// Errors that occur from interacting with the X-Server or from reading the
/// user's configuration
#[derive(Debug, Error)]
pub(crate) enum Error {
    /// Invalid property (`Atom`) queried for
    #[error("the property {0} was not found on this server")]
    InvalidProperty(String),

    /// Failure to connect to the server
    #[error("failed to connect to the X11 server: {0}")]
    Connection(#[from] ConnectError),

    /// Substructure redirection on a root window is already taken
    #[error("another window manager is already running on screen {0}")]
    AnotherWmRunning(usize),

    /// A window vanished or could not be queried while it was being managed
    #[error("unable to manage Window({window:#0x})")]
    ManageFailed { window: Window },

    /// A modifier group was given a name that does not exist
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),

    /// A binding named a function that does not exist
    #[error("unknown function in binding '{0}'")]
    UnknownFunction(String),

    /// A binding named a flag that does not exist
    #[error("unknown flag '{flag}' in binding '{binding}'")]
    UnknownFlag { flag: String, binding: String },

    /// A token of a trigger was neither a modifier, a button nor a key
    #[error("errant token '{token}' in binding '{binding}'")]
    UnknownKey { token: String, binding: String },

    /// A trigger contained only modifiers
    #[error("no key or button in binding '{0}'")]
    NoTrigger(String),

    /// A binding's flags name both a client and a screen as its target
    #[error("binding '{0}' targets both a client and a screen")]
    ConflictingScope(String),
}
