//! Operation interpreter for CAD tasks.
//!
//! Replays the ordered operations of a task against a CAD authority,
//! tracking the design context (components, sketches, features, bodies)
//! and isolating each operation's failure from the rest.

pub mod context;
pub mod error;
mod handlers;
pub mod interpreter;
pub mod journal;
pub mod resolve;
pub mod table;

pub use context::{ComponentRecord, DesignContext, ROOT_ALIAS};
pub use error::OperationError;
pub use interpreter::{Handler, Interpreter};
pub use journal::{Journal, LogSink, MemorySink, NullSink};
pub use resolve::ProfileRef;
pub use table::{
    compile_source, BehaviorDefinition, BehaviorError, HandlerTable, OperationKind, Tuning,
    BEHAVIOR_FORMAT, BEHAVIOR_SCHEMA_VERSION,
};
