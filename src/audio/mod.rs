//! Audio graph: shared context, analysers and the per-handle registry

pub mod analyser;
pub mod context;
pub mod output;
pub mod registry;

pub use analyser::{AnalyserNode, FFT_SIZE};
pub use context::{AudioContext, AudioHost, Destination, OfflineHost, SourceNode, UnsupportedHost};
pub use output::{start_output, CpalHost};
pub use registry::{AudioGraphEntry, AudioGraphRegistry};
