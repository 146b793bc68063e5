pub mod align;
pub mod checkpoint;
pub mod config;
pub mod export;
pub mod input;
pub mod lioness;
pub mod message_passing;
pub mod normalize;
pub mod panda;
pub mod run_lioness;
pub mod run_panda;
pub mod similarity;

pub use align::{align_inputs, AlignedData, PandaInput};
pub use checkpoint::{CheckpointSink, DirCheckpoint, MemoryCheckpoint};
pub use config::{AlignmentMode, ComputeDevice, PandaConfig, Precision, UnmatchedLabels};
pub use export::{EdgeList, LabeledMatrix, PandaNetwork};
pub use input::{EdgeTable, ExpressionTable};
pub use lioness::{LionessConfig, LionessNetworks, LionessOutput};
pub use message_passing::{Converged, MessagePassing, NotConverged, StopReason};
pub use panda::Panda;
