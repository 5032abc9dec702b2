//! Module resolution through the mounted archive
//!
//! Lua's `require` walks `package.searchers` in order until one of them
//! produces a loader. [`ResolverChain`] is the ordered list of strategies
//! the bootstrapper owns; it starts from the searchers Lua ships with,
//! places the [`ArchiveResolver`] second (right after `package.preload`),
//! and is then installed as `package.searchers`, one entry per resolver.
//! Every entry calls back into its [`Resolver`], so `require` consults
//! exactly the chain the bootstrapper holds.

use crate::chunk::load_file;
use crate::context::Context;
use crate::error::Result;
use mlua::{Function, IntoLuaMulti, Lua, MultiValue, Table, Value};
use std::rc::Rc;

/// Position the archive resolver takes in the chain
pub const ARCHIVE_RESOLVER_POSITION: usize = 1;

/// Convert a dotted module name into its virtual path
///
/// `a.b.c` with extension `lua` becomes `/a/b/c.lua`.
pub fn module_path(module: &str, extension: &str) -> String {
    format!("/{}.{}", module.replace('.', "/"), extension)
}

/// Outcome of asking a single resolver for a module
pub enum Resolution {
    /// A loader to call, plus the extra value Lua passes to it
    Loader { loader: Function, data: Value },
    /// Why this resolver could not help; the chain moves on
    NotFound(String),
}

/// One strategy in the resolver chain
pub trait Resolver {
    /// Name used for diagnostics
    fn name(&self) -> &str;

    /// Look up `module`; a missing module is a [`Resolution::NotFound`],
    /// not an error
    fn resolve(&self, lua: &Lua, module: &str) -> Result<Resolution>;
}

/// Resolver that loads modules from the mounted archive
pub struct ArchiveResolver {
    context: Context,
}

impl ArchiveResolver {
    pub fn new(context: Context) -> Self {
        Self { context }
    }
}

impl Resolver for ArchiveResolver {
    fn name(&self) -> &str {
        "archive"
    }

    fn resolve(&self, lua: &Lua, module: &str) -> Result<Resolution> {
        let config = self.context.config();
        let path = module_path(module, &config.source_extension);

        if !self.context.archive().exists(&path) {
            return Ok(Resolution::NotFound(format!("no archive file '{}'", path)));
        }

        tracing::debug!(module, path = %path, "resolved module from archive");
        let loader = load_file(lua, self.context.archive(), &path, config.chunk_size)?;
        let data = Value::String(lua.create_string(&path)?);
        Ok(Resolution::Loader { loader, data })
    }
}

/// A searcher that was already present in `package.searchers`
pub struct HostResolver {
    name: String,
    searcher: Function,
}

impl HostResolver {
    pub fn new(name: impl Into<String>, searcher: Function) -> Self {
        Self {
            name: name.into(),
            searcher,
        }
    }
}

impl Resolver for HostResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, _lua: &Lua, module: &str) -> Result<Resolution> {
        let results: MultiValue = self.searcher.call(module)?;
        let mut values = results.into_iter();

        match values.next() {
            Some(Value::Function(loader)) => Ok(Resolution::Loader {
                loader,
                data: values.next().unwrap_or(Value::Nil),
            }),
            Some(Value::String(message)) => {
                Ok(Resolution::NotFound(message.to_string_lossy().to_string()))
            }
            _ => Ok(Resolution::NotFound(String::new())),
        }
    }
}

/// Ordered list of resolution strategies
#[derive(Default)]
pub struct ResolverChain {
    resolvers: Vec<Rc<dyn Resolver>>,
}

impl ResolverChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the searchers currently installed in `package.searchers`
    pub fn from_host(lua: &Lua) -> Result<Self> {
        let searchers = host_searchers(lua)?;
        let mut chain = Self::new();
        for (index, searcher) in searchers.sequence_values::<Function>().enumerate() {
            chain.push(HostResolver::new(format!("searcher[{}]", index + 1), searcher?));
        }
        Ok(chain)
    }

    /// Append a resolver
    pub fn push<R: Resolver + 'static>(&mut self, resolver: R) {
        self.resolvers.push(Rc::new(resolver));
    }

    /// Insert a resolver at `index`, shifting later ones back
    ///
    /// An index past the end appends.
    pub fn insert<R: Resolver + 'static>(&mut self, index: usize, resolver: R) {
        let index = index.min(self.resolvers.len());
        self.resolvers.insert(index, Rc::new(resolver));
    }

    /// Resolver names in consultation order
    pub fn names(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Replace `package.searchers` with this chain
    pub fn install(&self, lua: &Lua) -> Result<()> {
        let searchers = lua.create_table()?;
        for (index, resolver) in self.resolvers.iter().enumerate() {
            searchers.raw_set(index + 1, wrap_resolver(lua, Rc::clone(resolver))?)?;
        }

        let package: Table = lua.globals().get("package")?;
        package.set("searchers", searchers)?;

        tracing::debug!(resolvers = ?self.names(), "installed resolver chain");
        Ok(())
    }
}

fn host_searchers(lua: &Lua) -> Result<Table> {
    let package: Table = lua.globals().get("package")?;
    Ok(package.get("searchers")?)
}

fn wrap_resolver(lua: &Lua, resolver: Rc<dyn Resolver>) -> Result<Function> {
    let function = lua.create_function(move |lua, module: String| {
        match resolver.resolve(lua, &module)? {
            Resolution::Loader { loader, data } => (loader, data).into_lua_multi(lua),
            Resolution::NotFound(message) if message.is_empty() => Value::Nil.into_lua_multi(lua),
            Resolution::NotFound(message) => message.into_lua_multi(lua),
        }
    })?;
    Ok(function)
}

/// Insert the archive resolver into Lua's searchers and return the chain
pub fn register_archive_resolver(lua: &Lua, context: &Context) -> Result<ResolverChain> {
    let mut chain = ResolverChain::from_host(lua)?;
    chain.insert(ARCHIVE_RESOLVER_POSITION, ArchiveResolver::new(context.clone()));
    chain.install(lua)?;
    Ok(chain)
}
