pub mod builder;

pub use builder::{build_system_prompt, build_tools_prompt};
