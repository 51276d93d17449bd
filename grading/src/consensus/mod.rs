//! Consensus subsystem — response parsing and the voting algorithm.
//!
//! ```text
//! raw grader results ──▶ parser (×N) ──▶ evaluator ──▶ ConsensusOutcome
//! ```
//!
//! Both halves are pure, synchronous functions: expected data-quality
//! problems (malformed AI output, failed calls) are encoded as `grade: None`
//! and handled uniformly by the vote, never raised as errors.

pub mod evaluator;
pub mod parser;

pub use evaluator::evaluate;
pub use parser::parse_grader_response;
