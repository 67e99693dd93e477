//! Error kinds for the recoverable fatal categories of §7: a bad path, a
//! malformed record, or an out-of-range configuration value. Out-of-memory
//! is not modeled separately — allocation failure aborts the process,
//! which already satisfies §7's "fatal" requirement. Internal invariant
//! violations are likewise not a `Result` variant here: §7 treats them as
//! programmer bugs, enforced with `debug_assert!`/`unreachable!` at the
//! point of violation (e.g. `sbt/tree.rs`'s inner-node-with-one-child
//! check, `index.rs`'s leaf-cursor-order check) rather than surfaced as a
//! value the caller could recover from.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShrakError {
    #[error("input not found: {0}")]
    InputNotFound(String),

    #[error("malformed input: {0}")]
    InputMalformed(String),

    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),
}
