use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for satchel operations
pub type Result<T> = std::result::Result<T, SatchelError>;

/// Exit code for VFS initialization and mount failures
pub const EXIT_MOUNT_FAILURE: i32 = 1;

/// Exit code for uncaught errors, compile errors of the entry point included
/// (Lua's `LUA_ERRRUN`)
pub const EXIT_RUNTIME_ERROR: i32 = 2;

/// Exit code for allocation failures (Lua's `LUA_ERRMEM`)
pub const EXIT_MEMORY_ERROR: i32 = 4;

/// Unified error type for all satchel operations
#[derive(Debug, Error)]
pub enum SatchelError {
    // Startup errors
    #[error("virtual filesystem init failed: {0}")]
    Init(String),

    #[error("failed to mount {path}: {reason}")]
    MountFailed { path: PathBuf, reason: String },

    #[error("no archive found in the executable nor in the first argument")]
    NoArchive,

    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    // File errors
    #[error("couldn't open file: '{0}'")]
    FileNotFound(String),

    #[error("error reading file: {0}")]
    ReadFailed(#[source] io::Error),

    #[error("attempt to use a closed file")]
    ClosedHandle,

    #[error("invalid mode '{0}' (only \"rb\" is supported)")]
    InvalidMode(String),

    #[error("bad argument #{position} to '{function}' ({reason})")]
    InvalidArgument {
        function: &'static str,
        position: usize,
        reason: String,
    },

    // Collaborator errors
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Lua(#[from] mlua::Error),
}

impl SatchelError {
    /// Process exit code for an error that reached the top-level boundary
    pub fn exit_code(&self) -> i32 {
        match self {
            SatchelError::Init(_)
            | SatchelError::MountFailed { .. }
            | SatchelError::NoArchive
            | SatchelError::InvalidArchive(_)
            | SatchelError::Config(_) => EXIT_MOUNT_FAILURE,
            SatchelError::Lua(err) => lua_exit_code(err),
            _ => EXIT_RUNTIME_ERROR,
        }
    }
}

fn lua_exit_code(err: &mlua::Error) -> i32 {
    match err {
        mlua::Error::MemoryError(_) => EXIT_MEMORY_ERROR,
        mlua::Error::CallbackError { cause, .. } => lua_exit_code(cause),
        _ => EXIT_RUNTIME_ERROR,
    }
}

impl From<toml::de::Error> for SatchelError {
    fn from(err: toml::de::Error) -> Self {
        SatchelError::Config(err.to_string())
    }
}

impl From<SatchelError> for mlua::Error {
    fn from(err: SatchelError) -> Self {
        match err {
            SatchelError::Lua(inner) => inner,
            other => mlua::Error::external(other),
        }
    }
}
