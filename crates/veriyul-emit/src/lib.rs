/*! Text output for the compiler.
 *
 * Generated Yul is read by people as often as by the assembler, so it is written through
 * an indentation-aware buffer instead of ad hoc string concatenation. The same context
 * drives the coloured contract report the CLI prints, and the JSON formatter renders ABI
 * and report output in either pretty or compact form.
 */

pub mod buffer;
pub mod config;
pub mod emitter;
pub mod output;

pub use buffer::CodeBuffer;
pub use config::{EmitterConfig, IndentStyle};
pub use emitter::{EmitContext, EmitResult, ReportWriter};
pub use output::{JsonFormatter, OutputStyle};
