pub mod config;
pub mod engine;
pub mod feedback;
pub mod grid;
pub mod interpreter;
pub mod persistence;
pub mod programs;
pub mod registry;
pub mod span;
pub mod workflows;

pub use config::EngineConfig;
pub use engine::{GridEngine, LayoutAction, LayoutNamePrompt};
pub use feedback::{FeedbackBus, FeedbackSink};
pub use grid::GridState;
pub use interpreter::{parse_locations, CommandInterpreter, CommandKind, Interpretation};
pub use persistence::{LayoutPersistence, LayoutStore, MemoryLayoutStore};
pub use programs::{ProgramCatalog, ProgramEntry};
pub use registry::{HeadlessHost, MountHandle, MountTracker, ProgramHost};
pub use span::{Mutation, SpanManager};
pub use workflows::{ReopenSession, ReorderSession};
