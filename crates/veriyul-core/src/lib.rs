/*! AST model for verification-oriented contract sources.
 *
 * A contract is parsed once into these plain value types and then read by every later stage:
 * the storage planner, the Yul generator and the ABI generator. Nothing here has behaviour
 * beyond small lookups, except the signature module, which owns the canonical type spelling
 * and the keccak hashing that selectors and event topics are derived from.
 */

pub mod contract;
pub mod expr;
pub mod signature;
pub mod stmt;
pub mod types;

pub use contract::{
    Contract, CustomError, Event, GhostValue, Library, Method, Modifier, ReturnShape,
    StateMutability, Struct,
};
pub use expr::{BinaryOp, CallKind, Expression, GlobalVar, Literal, UnaryOp};
pub use signature::{Selector, Topic};
pub use stmt::{AssignTarget, RevertKind, Statement};
pub use types::{Type, Variable, Visibility};
