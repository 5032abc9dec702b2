//! Statically linked native modules
//!
//! Native modules cannot be loaded out of the archive, so they are compiled
//! into the executable and registered by name. At startup every entry is
//! installed into `package.preload`, where `require` finds it before any
//! other searcher.
//!
//! To add a module, register its factory in [`builtin_natives`]:
//!
//! ```ignore
//! registry.register("mymodule", mymodule::open);
//! ```

use crate::api;
use crate::context::Context;
use crate::error::Result;
use mlua::{Lua, MultiValue, Table, Value};
use std::rc::Rc;

type Factory = Rc<dyn Fn(&Lua, &Context) -> mlua::Result<Value>>;

/// Name-to-factory table of native modules
#[derive(Default)]
pub struct NativeRegistry {
    entries: Vec<(String, Factory)>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; a later registration under the same name wins
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Lua, &Context) -> mlua::Result<Value> + 'static,
    {
        let name = name.into();
        self.entries.retain(|(existing, _)| *existing != name);
        self.entries.push((name, Rc::new(factory)));
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == name)
    }

    /// Install every factory into `package.preload`
    pub fn install(&self, lua: &Lua, context: &Context) -> Result<()> {
        let package: Table = lua.globals().get("package")?;
        let preload: Table = package.get("preload")?;

        for (name, factory) in &self.entries {
            let factory = Rc::clone(factory);
            let context = context.clone();
            let loader = lua.create_function(move |lua, _: MultiValue| factory(lua, &context))?;
            preload.set(name.as_str(), loader)?;
            tracing::debug!(module = %name, "registered native module");
        }
        Ok(())
    }
}

/// The native modules linked into this executable
pub fn builtin_natives() -> NativeRegistry {
    let mut registry = NativeRegistry::new();
    registry.register(api::MODULE_NAME, api::open_module);
    registry
}
