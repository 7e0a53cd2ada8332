#![deny(missing_docs)]
#![doc = "Core error taxonomy, deterministic RNG policy and variable descriptors for the TEA engine."]

pub mod errors;
pub mod rng;
mod types;

pub use errors::{ErrorInfo, TeaError};
pub use rng::{derive_substream_seed, RngHandle};
pub use types::{
    format_label, OutputDescriptor, RawVariableRow, SampleSet, VariableDescriptor, VariableTarget,
};
