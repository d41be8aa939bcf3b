pub mod error;
pub mod passthrough;
pub mod registry;
pub mod runner;

pub use error::DispatchError;
pub use passthrough::split_known_args;
pub use registry::{Provider, ProviderRegistry};
pub use runner::{CommonOptions, Invocation};
