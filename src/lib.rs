//! Per-key min/max/mean over large `key;value` files.
//!
//! The input is cut into nominal chunks ([`partition`]), each chunk is scanned
//! on its own worker into a private table ([`scan`]), and the tables are
//! merged into one ([`merge`]). [`engine::Engine`] drives the whole run.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod merge;
pub mod parse;
pub mod partition;
pub mod report;
pub mod scan;
pub mod source;

pub use aggregate::{Aggregate, GlobalTable, LocalTable, Table};
pub use config::{Config, LinePolicy, ReadStrategy};
pub use engine::{Engine, RunOutcome};
pub use error::{BrcError, LineError, Result};
pub use parse::{parse_value, ParseError};
pub use partition::{partition, Chunk, MIN_CHUNK_SIZE};
pub use report::{Report, Station};
