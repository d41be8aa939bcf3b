pub mod backend_trait;
pub mod batch;
pub mod cli;
pub mod error;
pub mod inputs;
pub mod run_dir;

#[cfg(feature = "docling-serve")]
pub mod docling_serve_backend;
#[cfg(feature = "docling-serve")]
pub mod docling_serve_config;

#[cfg(feature = "llamaparse")]
pub mod llamaparse_backend;
#[cfg(feature = "llamaparse")]
pub mod llamaparse_config;

pub use backend_trait::{ParseBackend, ParsedDocument};
pub use batch::{parse_files_parallel, BatchReport, FileOutcome, ParsedFile};
pub use cli::{run_provider, ProviderArgs};
pub use error::JobError;
pub use inputs::{InputError, InputSet};
pub use run_dir::RunDirectory;

#[cfg(feature = "docling-serve")]
pub use docling_serve_backend::DoclingServeBackend;
#[cfg(feature = "docling-serve")]
pub use docling_serve_config::DoclingServeConfig;

#[cfg(feature = "llamaparse")]
pub use llamaparse_backend::LlamaParseBackend;
#[cfg(feature = "llamaparse")]
pub use llamaparse_config::{LlamaCloudSettings, LlamaParseConfig};
