//! Satchel: self-contained Lua executables
//!
//! A satchel executable carries its scripts and data in a zip archive
//! appended to its own binary. At startup the archive is mounted as a
//! read-only namespace rooted at `/`, a resolver is inserted into Lua's
//! `package.searchers` so `require` finds modules inside it, and
//! `/init.lua` is run with the command-line arguments.
//!
//! Building an executable is a matter of concatenation:
//!
//! ```text
//! $ (cd app && zip -r ../app.zip .)
//! $ cat satchel app.zip > mygame && chmod +x mygame
//! $ ./mygame --level 3
//! ```
//!
//! During development the archive can be passed as the first argument
//! instead: `satchel app.zip --level 3`.
//!
//! # Example
//!
//! ```no_run
//! use satchel::Bootstrapper;
//!
//! let args: Vec<std::ffi::OsString> = std::env::args_os().collect();
//! let runtime = Bootstrapper::new().boot(&args)?;
//! runtime.execute::<()>()?;
//! # Ok::<(), satchel::SatchelError>(())
//! ```

// Core modules
pub mod api;
pub mod archive;
pub mod bootstrap;
pub mod chunk;
pub mod config;
pub mod context;
pub mod error;
pub mod file;
pub mod preload;
pub mod resolver;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use archive::{
    basename, ArchiveMount, ArchiveSlice, Descriptor, EndRecord, Mounted, VirtualArchive, MOUNT_ROOT,
};
pub use bootstrap::{error_report, Bootstrapper, Runtime};
pub use chunk::{load_chunk, load_file, ChunkReader, DEFAULT_CHUNK_SIZE};
pub use config::{Config, CONFIG_PATH};
pub use context::Context;
pub use error::{Result, SatchelError};
pub use file::{FileHandle, OpenMode, ReadRequest};
pub use preload::{builtin_natives, NativeRegistry};
pub use resolver::{
    module_path, register_archive_resolver, ArchiveResolver, HostResolver, Resolution, Resolver,
    ResolverChain, ARCHIVE_RESOLVER_POSITION,
};
