// Parsers library - routes parse requests to pluggable document parsing providers

pub mod dispatch;
pub mod logging;

pub use dispatch::{
    CommonOptions, DispatchError, Invocation, Provider, ProviderRegistry, split_known_args,
};

#[cfg(feature = "providers")]
pub mod parse;

#[cfg(feature = "providers")]
pub use parse::{JobError, ParseBackend, ParsedDocument, ProviderArgs};

#[cfg(feature = "llamaparse")]
pub use parse::{LlamaParseBackend, LlamaParseConfig};

#[cfg(feature = "docling-serve")]
pub use parse::{DoclingServeBackend, DoclingServeConfig};
