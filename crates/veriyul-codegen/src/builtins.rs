//! Names that user identifiers must not shadow in the emitted Yul.

use std::borrow::Cow;

pub const RENAME_PREFIX: &str = "usr_";

const YUL_BUILTINS: &[&str] = &[
    "stop", "add", "sub", "mul", "div", "sdiv", "mod", "smod", "exp", "not", "lt", "gt", "slt",
    "sgt", "eq", "iszero", "and", "or", "xor", "byte", "shl", "shr", "sar", "addmod", "mulmod",
    "signextend", "keccak256", "sha3", "pc", "pop", "mload", "mstore", "mstore8", "sload",
    "sstore", "tload", "tstore", "msize", "gas", "address", "balance", "selfbalance", "caller",
    "callvalue", "calldataload", "calldatasize", "calldatacopy", "codesize", "codecopy",
    "extcodesize", "extcodecopy", "returndatasize", "returndatacopy", "mcopy", "extcodehash",
    "create", "create2", "call", "callcode", "delegatecall", "staticcall", "return", "revert",
    "selfdestruct", "invalid", "log0", "log1", "log2", "log3", "log4", "chainid", "basefee",
    "blobbasefee", "blobhash", "origin", "gasprice", "blockhash", "coinbase", "timestamp",
    "number", "difficulty", "prevrandao", "gaslimit", "datasize", "dataoffset", "datacopy",
    "setimmutable", "loadimmutable", "linkersymbol", "memoryguard", "verbatim", "jumpi",
];

const YUL_KEYWORDS: &[&str] = &[
    "let", "if", "switch", "case", "default", "for", "break", "continue", "function", "leave",
    "true", "false", "object", "code", "data",
];

/// Names the generator itself defines in every code block.
pub const GENERATED: &[&str] = &[
    "mapping_slot",
    "array_data_slot",
    "hash_word",
    "receive_fn",
    "fallback_fn",
    "constructor_fn",
    "selector",
    "result",
    "program_size",
];

pub fn is_reserved(name: &str) -> bool {
    YUL_BUILTINS.contains(&name)
        || YUL_KEYWORDS.contains(&name)
        || GENERATED.contains(&name)
        || name.starts_with('_')
        || name.starts_with("fun_")
        || name.starts_with("external_fun_")
}

/// A user identifier as it may appear in Yul.
pub fn safe_name(name: &str) -> Cow<'_, str> {
    if is_reserved(name) {
        Cow::Owned(format!("{}{}", RENAME_PREFIX, name))
    } else {
        Cow::Borrowed(name)
    }
}

/// Yul function implementing a contract method.
pub fn method_fn(name: &str) -> String {
    format!("fun_{}", name)
}

/// Calldata wrapper the dispatcher calls for an exposed method.
pub fn external_fn(name: &str) -> String {
    format!("external_fun_{}", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_renamed() {
        assert_eq!(safe_name("balance"), "usr_balance");
        assert_eq!(safe_name("return"), "usr_return");
        assert_eq!(safe_name("mapping_slot"), "usr_mapping_slot");
        assert_eq!(safe_name("_owner"), "usr__owner");
    }

    #[test]
    fn test_ordinary_names_pass() {
        assert!(matches!(safe_name("amount"), Cow::Borrowed("amount")));
        assert_eq!(safe_name("Balance"), "Balance");
    }

    #[test]
    fn test_function_names() {
        assert_eq!(method_fn("transfer"), "fun_transfer");
        assert_eq!(external_fn("transfer"), "external_fun_transfer");
    }
}
