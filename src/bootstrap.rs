//! Process startup
//!
//! The bootstrapper performs, in order:
//! 1. locate the executable (VFS init)
//! 2. mount the archive, falling back to the first argument
//! 3. read the optional application manifest
//! 4. insert the archive resolver into `package.searchers`
//! 5. install native modules into `package.preload`
//! 6. publish the global `arg` table
//! 7. load and call the entry point with the forwarded arguments
//!
//! Errors from steps 1-3 exit with status 1. Errors from the entry point,
//! compile errors included, are printed with their stack traceback and exit
//! with the status Lua's protected call reports (2, or 4 when out of memory).

use crate::archive::{ArchiveMount, Mounted};
use crate::chunk::load_file;
use crate::config::Config;
use crate::context::Context;
use crate::error::{Result, SatchelError};
use crate::preload::{builtin_natives, NativeRegistry};
use crate::resolver::{register_archive_resolver, ResolverChain};
use mlua::{FromLuaMulti, Function, Lua, Value, Variadic};
use std::ffi::{OsStr, OsString};
use std::path::Path;

/// Orchestrates startup from invocation arguments to a running entry point
pub struct Bootstrapper {
    mount: Option<ArchiveMount>,
    natives: NativeRegistry,
}

impl Default for Bootstrapper {
    fn default() -> Self {
        Self::new()
    }
}

impl Bootstrapper {
    /// Bootstrapper with the built-in native modules
    pub fn new() -> Self {
        Self {
            mount: None,
            natives: builtin_natives(),
        }
    }

    /// Look for the executable in `base_dir` instead of querying the OS
    pub fn with_base_dir<P: AsRef<Path>>(mut self, base_dir: P) -> Self {
        self.mount = Some(ArchiveMount::new(base_dir));
        self
    }

    /// Register an additional statically linked native module
    pub fn register_native<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Lua, &Context) -> mlua::Result<Value> + 'static,
    {
        self.natives.register(name, factory);
        self
    }

    /// Mount the archive and prepare a Lua state, without running anything
    pub fn boot<S: AsRef<OsStr>>(self, args: &[S]) -> Result<Runtime> {
        let mount = match self.mount {
            Some(mount) => mount,
            None => ArchiveMount::detect()?,
        };

        let Mounted { archive, skip_args } = mount.mount(args)?;
        tracing::info!(
            source = %archive.source().display(),
            skip_args,
            "archive mounted"
        );

        let config = Config::load(&archive)?;
        let context = Context::new(archive, config);

        let lua = Lua::new();
        let resolvers = register_archive_resolver(&lua, &context)?;
        self.natives.install(&lua, &context)?;

        let args: Vec<OsString> = args.iter().map(|arg| arg.as_ref().to_os_string()).collect();
        let arg = lua.create_table()?;
        for (index, value) in args.iter().enumerate() {
            let value = lua.create_string(value.as_encoded_bytes())?;
            arg.raw_set(index as i64 - skip_args as i64 + 1, value)?;
        }
        lua.globals().set("arg", arg)?;

        Ok(Runtime {
            lua,
            context,
            resolvers,
            args,
            skip_args,
        })
    }

    /// Run the whole startup sequence and return the process exit code
    pub fn run<S: AsRef<OsStr>>(self, args: &[S]) -> i32 {
        let runtime = match self.boot(args) {
            Ok(runtime) => runtime,
            Err(err) => {
                eprintln!("{}", err);
                return err.exit_code();
            }
        };

        match runtime.execute::<()>() {
            Ok(()) => 0,
            Err(err) => {
                eprintln!("{}", error_report(&err));
                err.exit_code()
            }
        }
    }
}

/// A booted Lua state bound to the mounted archive
pub struct Runtime {
    // Must drop before `context`: open handles close before the unmount
    lua: Lua,
    context: Context,
    resolvers: ResolverChain,
    args: Vec<OsString>,
    skip_args: usize,
}

impl Runtime {
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The resolver chain installed as `package.searchers`
    pub fn resolvers(&self) -> &ResolverChain {
        &self.resolvers
    }

    /// Leading arguments consumed by the bootstrapper (1, or 2 with a fallback archive)
    pub fn skip_args(&self) -> usize {
        self.skip_args
    }

    /// Arguments handed to the entry point
    pub fn forwarded_args(&self) -> &[OsString] {
        &self.args[self.skip_args.min(self.args.len())..]
    }

    /// Compile the entry point
    pub fn load_entry(&self) -> Result<Function> {
        let config = self.context.config();
        load_file(
            &self.lua,
            self.context.archive(),
            &config.entry_point,
            config.chunk_size,
        )
    }

    /// Load the entry point and call it with the forwarded arguments
    pub fn execute<R: FromLuaMulti>(&self) -> Result<R> {
        let entry = self.load_entry()?;
        let args = self
            .forwarded_args()
            .iter()
            .map(|arg| self.lua.create_string(arg.as_encoded_bytes()))
            .collect::<mlua::Result<Variadic<mlua::String>>>()?;

        tracing::debug!(
            entry = %self.context.config().entry_point,
            args = args.len(),
            "running entry point"
        );
        Ok(entry.call(args)?)
    }
}

/// Render an error with every stack traceback it carries
pub fn error_report(err: &SatchelError) -> String {
    match err {
        SatchelError::Lua(lua_err) => lua_error_report(lua_err),
        other => other.to_string(),
    }
}

fn lua_error_report(err: &mlua::Error) -> String {
    match err {
        mlua::Error::CallbackError { traceback, cause } => {
            format!("{}\n{}", lua_error_report(cause), traceback)
        }
        other => other.to_string(),
    }
}
