use crate::archive::VirtualArchive;
use crate::config::Config;
use std::rc::Rc;

/// Shared state handed to every resolver, native module and Lua callback
///
/// Cloning is cheap; all clones refer to the same mount. The mount lives
/// until the last clone is dropped, which is when the archive is unmounted.
#[derive(Debug, Clone)]
pub struct Context {
    archive: Rc<VirtualArchive>,
    config: Rc<Config>,
}

impl Context {
    pub fn new(archive: VirtualArchive, config: Config) -> Self {
        Self {
            archive: Rc::new(archive),
            config: Rc::new(config),
        }
    }

    /// The mounted archive
    pub fn archive(&self) -> &VirtualArchive {
        &self.archive
    }

    /// Bootstrap settings
    pub fn config(&self) -> &Config {
        &self.config
    }
}
