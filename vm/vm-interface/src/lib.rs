pub mod engine;
pub mod error;
pub mod outcome;

pub use engine::{ExecutionContext, ExecutionEngine, ReadyExecution};
pub use error::PrepareError;
pub use outcome::ExecutionOutcome;
