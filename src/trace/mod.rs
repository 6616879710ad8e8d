//! Measurement instrumentation.
//!
//! Output path layout, collector wiring and the append-only trace files
//! collectors write into.

pub mod collectors;
pub mod output;
pub mod stream;

pub use collectors::{CollectorKind, CollectorSpec, InstrumentationWiring};
pub use output::OutputDescriptor;
pub use stream::TraceStream;
