pub mod registry;

pub use registry::{register_with_registry, RegisteredTool, ToolHandler, ToolRegistry};
