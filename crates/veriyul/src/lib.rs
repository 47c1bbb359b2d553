/*!
# veriyul

Compiles verification-oriented contract sources (Dafny-style classes with EVM types) into
Yul, Solidity ABI JSON and, through `solc`, EVM bytecode.

## Pipeline

1. **Verify**: the source is rewritten into plain Dafny and checked with `dafny verify`.
   A failed verification stops the build unless unverified output is explicitly allowed.
2. **Parse**: [`parser::parse`] recovers a [`core::Contract`] from the token stream.
3. **Generate**: [`codegen::YulGenerator`] lowers the contract into one Yul object and
   [`codegen::AbiGenerator`] renders its ABI.
4. **Assemble**: `solc --strict-assembly` turns the Yul into creation and runtime bytecode.

```no_run
use veriyul::{Compiler, CompilerConfig};

let config = CompilerConfig { verify: false, ..CompilerConfig::default() };
let output = Compiler::new(config).compile("class Counter { var count: uint256 }");
assert!(output.success, "{:?}", output.error);
```

The code-generation stages are also usable on their own:

```
use veriyul::codegen::{selectors, YulGenerator};

let contract = veriyul::parser::parse(
    "class Token { var total: uint256 method supply() returns (uint256) { return total; } }",
)
.unwrap();
assert!(YulGenerator::new().generate(&contract).starts_with("object \"Token\""));
assert_eq!(selectors(&contract)[0].0, "supply()");
```
*/

pub use veriyul_codegen as codegen;
pub use veriyul_core as core;
pub use veriyul_emit as emit;
pub use veriyul_parser as parser;

pub mod assembler;
pub mod compiler;
pub mod config;
pub mod error;
pub mod preprocess;
pub mod process;
pub mod verifier;

pub use assembler::{Assembler, Assembly, SolcAssembler};
pub use compiler::{CompilationOutput, Compiler};
pub use config::{CompileMode, CompilerConfig};
pub use error::{CollaboratorError, CollaboratorResult};
pub use verifier::{DafnyVerifier, VerificationReport, Verifier};
