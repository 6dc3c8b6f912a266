pub mod catalog;
pub mod host;
pub mod lookup;
pub mod model;
pub mod process;
pub mod sampler;

pub use catalog::ToolCatalog;
pub use host::{ToolHost, ToolHostFactory};
pub use lookup::{LookupToolHostFactory, MockEntry, MockTable};
pub use model::ToolDescriptor;
pub use process::ProcessToolHostFactory;
pub use sampler::sample_pool;
