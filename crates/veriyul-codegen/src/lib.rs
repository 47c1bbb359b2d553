/*! Back end of the compiler: storage layout, Yul generation and ABI output.
 *
 * A [`YulGenerator`] lowers a parsed contract into one Yul object with creation code and a
 * nested `runtime` object. All state derived from the contract (slot table, struct
 * offsets, event and error hashes, the set of helpers in use) lives in a context created
 * per `generate` call, so one generator can be reused for any number of contracts.
 *
 * The [`AbiGenerator`] shares canonical signatures with the dispatcher through
 * `veriyul_core::signature`, so a selector in the ABI is always the one the runtime
 * dispatches on.
 */

pub mod abi;
pub mod builtins;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod expr;
pub mod generator;
pub mod layout;
pub mod stmt;

pub use abi::{selectors, state_mutability, AbiEntry, AbiGenerator, AbiParam, EntryKind};
pub use error::{AbiError, AbiResult};
pub use generator::{YulGenerator, YulOutput};
pub use layout::{StorageLayout, StructLayout};
