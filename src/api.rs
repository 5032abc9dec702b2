//! The `satchel` Lua module
//!
//! ```lua
//! local satchel = require "satchel"
//!
//! local f = assert(satchel.open("/data/level1.txt", "rb"))
//! local header = f:read(16)     -- nil at end of file
//! local rest = f:read("*a")     -- "" at end of file, same as f:read()
//! f:close()
//!
//! local chunk = satchel.loadfile("/scripts/extra.lua")
//! ```
//!
//! Handles that are never closed are closed when Lua collects them.

use crate::chunk::load_file;
use crate::context::Context;
use crate::error::SatchelError;
use crate::file::{FileHandle, ReadRequest};
use mlua::{IntoLuaMulti, Lua, MetaMethod, Table, UserData, UserDataMethods, Value};

/// Name the module is preloaded under
pub const MODULE_NAME: &str = "satchel";

/// Lua userdata wrapping a [`FileHandle`]
pub struct LuaFile(FileHandle);

impl LuaFile {
    pub fn new(handle: FileHandle) -> Self {
        Self(handle)
    }
}

impl UserData for LuaFile {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method_mut("read", |lua, this, request: Value| {
            if this.0.is_closed() {
                return Err(SatchelError::ClosedHandle.into());
            }
            let request = parse_read_request(&request)?;
            match this.0.read(request)? {
                Some(bytes) => Ok(Value::String(lua.create_string(&bytes)?)),
                None => Ok(Value::Nil),
            }
        });

        methods.add_method_mut("close", |lua, this, ()| match this.0.close() {
            Ok(()) => true.into_lua_multi(lua),
            Err(SatchelError::ClosedHandle) => Err(SatchelError::ClosedHandle.into()),
            Err(err) => (Value::Nil, err.to_string()).into_lua_multi(lua),
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(match this.0.path() {
                Some(path) => format!("satchel.file ({})", path),
                None => "satchel.file (closed)".to_string(),
            })
        });
    }
}

fn invalid_read_argument(reason: impl Into<String>) -> SatchelError {
    SatchelError::InvalidArgument {
        function: "read",
        position: 1,
        reason: reason.into(),
    }
}

fn byte_count(count: i64) -> Result<ReadRequest, SatchelError> {
    if count < 0 {
        return Err(invalid_read_argument("negative number of bytes"));
    }
    Ok(ReadRequest::Bytes(count as u64))
}

/// Accepts a non-negative integer (or numeric string) or `"*a"`, which is
/// also what a missing argument means
fn parse_read_request(value: &Value) -> Result<ReadRequest, SatchelError> {
    match value {
        Value::Nil => Ok(ReadRequest::All),
        Value::Integer(count) => byte_count(*count),
        Value::Number(count) if count.fract() == 0.0 => byte_count(*count as i64),
        Value::Number(_) => Err(invalid_read_argument("number has no integer representation")),
        Value::String(text) => {
            let text = text.to_string_lossy();
            if text == "*a" {
                return Ok(ReadRequest::All);
            }
            match text.trim().parse::<i64>() {
                Ok(count) => byte_count(count),
                Err(_) => Err(invalid_read_argument(format!("invalid option '{}'", text))),
            }
        }
        _ => Err(invalid_read_argument("number or '*a' expected")),
    }
}

/// Build the module table
pub fn create_module(lua: &Lua, context: &Context) -> mlua::Result<Table> {
    let module = lua.create_table()?;

    let ctx = context.clone();
    module.set(
        "open",
        lua.create_function(move |lua, (path, mode): (String, Option<String>)| {
            let mode = mode.unwrap_or_else(|| "rb".to_string());
            match FileHandle::open(ctx.archive(), &path, &mode) {
                Ok(handle) => {
                    let handle = handle.with_chunk_size(ctx.config().chunk_size);
                    LuaFile::new(handle).into_lua_multi(lua)
                }
                Err(SatchelError::InvalidMode(mode)) => Err(SatchelError::InvalidArgument {
                    function: "open",
                    position: 2,
                    reason: format!("invalid option '{}'", mode),
                }
                .into()),
                // The entry is extracted at open: a failed read raises here
                Err(err @ SatchelError::ReadFailed(_)) => Err(err.into()),
                Err(err) => (Value::Nil, err.to_string()).into_lua_multi(lua),
            }
        })?,
    )?;

    let ctx = context.clone();
    module.set(
        "loadfile",
        lua.create_function(move |lua, path: String| {
            let config = ctx.config();
            Ok(load_file(lua, ctx.archive(), &path, config.chunk_size)?)
        })?,
    )?;

    let ctx = context.clone();
    module.set(
        "exists",
        lua.create_function(move |_, path: String| Ok(ctx.archive().exists(&path)))?,
    )?;

    Ok(module)
}

/// Native-module factory for [`MODULE_NAME`]
pub fn open_module(lua: &Lua, context: &Context) -> mlua::Result<Value> {
    Ok(Value::Table(create_module(lua, context)?))
}

/// Drop every unreachable handle now instead of waiting for the collector
pub fn collect_abandoned(lua: &Lua) -> mlua::Result<()> {
    lua.gc_collect()?;
    lua.gc_collect()
}
