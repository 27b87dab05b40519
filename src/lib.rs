pub mod container;
pub mod errors;
pub mod params;

// Re-export commonly used items for convenience
pub use container::{Container, ContainerStats, Invoke, MethodArg, Recipe};
pub use errors::ContainerError;
pub use params::{Erased, ParamValue};
