//! Query executor, statement dispatcher and engine facade (C7, C8, C9).

pub mod dispatcher;
pub mod engine;
pub mod executor;
pub mod result;

pub use engine::Engine;
pub use result::{ExecuteOutput, StatementResult};
