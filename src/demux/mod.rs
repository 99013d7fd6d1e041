//! Classification of read-pair streams.
//!
//! - [`ClassificationEngine`]: applies selected strategies to a stream, routing
//!   successes to a target sink and unclassifiable pairs to a reject sink
//! - [`AutoDetector`]: samples a library and selects the best-yielding strategies
//! - [`Demultiplexer`]: processes every library of a manifest
//!
//! ## Selection
//!
//! 1. Rank strategies by sample yield, ties in discovery order
//! 2. Keep the top `max_methods`
//! 3. Drop those below `min_percent` of the sampled pairs
//!
//! An empty selection skips the library with a warning.
//!
//! [`ClassificationEngine`]: engine::ClassificationEngine
//! [`AutoDetector`]: detect::AutoDetector
//! [`Demultiplexer`]: pipeline::Demultiplexer

pub mod detect;
pub mod engine;
pub mod pipeline;
pub mod sink;
