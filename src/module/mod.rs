//! Handler modules: what the host registers for each handler file, and the loader that
//! turns a resolved route into a cached, ready-to-call module.

mod loader;
mod registry;

pub use loader::ModuleLoader;
pub use registry::{HandlerModule, MethodEntry, ModuleFactory, ModuleRegistry};
