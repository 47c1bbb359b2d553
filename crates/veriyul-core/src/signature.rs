//! Canonical signatures and the hashes derived from them.

use crate::contract::{CustomError, Event, Method};
use crate::types::{Type, Variable};
use serde::{Deserialize, Serialize};
use std::fmt;
use tiny_keccak::{Hasher, Keccak};

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    let mut output = [0u8; 32];
    keccak.update(data);
    keccak.finalize(&mut output);
    output
}

/// Spelling of a type inside a canonical signature and in an ABI `type` field. Mappings
/// have no ABI encoding and are projected to `bytes32`; structs are spelled `tuple`.
pub fn canonical_type(ty: &Type) -> String {
    match ty {
        Type::Array(elem) => format!("{}[]", canonical_type(elem)),
        Type::Mapping(_, _) => "bytes32".to_string(),
        Type::Struct(_) => "tuple".to_string(),
        _ => ty.to_string(),
    }
}

pub fn signature(name: &str, params: &[Variable]) -> String {
    let types: Vec<String> = params.iter().map(|p| canonical_type(&p.ty)).collect();
    format!("{}({})", name, types.join(","))
}

pub fn method_signature(method: &Method) -> String {
    signature(&method.name, &method.params)
}

pub fn event_signature(event: &Event) -> String {
    signature(&event.name, &event.params)
}

pub fn error_signature(error: &CustomError) -> String {
    signature(&error.name, &error.params)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector(pub [u8; 4]);

impl Selector {
    pub fn from_signature(signature: &str) -> Self {
        let hash = keccak256(signature.as_bytes());
        Selector([hash[0], hash[1], hash[2], hash[3]])
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Full 32-byte hash of an event signature, used as topic 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic(pub [u8; 32]);

impl Topic {
    pub fn from_signature(signature: &str) -> Self {
        Topic(keccak256(signature.as_bytes()))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(types: &[Type]) -> Vec<Variable> {
        types
            .iter()
            .enumerate()
            .map(|(i, ty)| Variable::new(format!("p{}", i), ty.clone()))
            .collect()
    }

    #[test]
    fn test_known_selectors() {
        assert_eq!(
            Selector::from_signature("transfer(address,uint256)").to_string(),
            "0xa9059cbb"
        );
        assert_eq!(
            Selector::from_signature("balanceOf(address)").to_string(),
            "0x70a08231"
        );
        assert_eq!(
            Selector::from_signature("Error(string)"),
            Selector([0x08, 0xc3, 0x79, 0xa0])
        );
    }

    #[test]
    fn test_selector_is_eight_hex_digits() {
        for sig in ["f()", "g(uint8)", "approve(address,uint256)"] {
            let text = Selector::from_signature(sig).to_string();
            assert_eq!(text.len(), 10);
            assert!(text[2..].chars().all(|c| c.is_ascii_hexdigit()));
            assert_eq!(text, Selector::from_signature(sig).to_string());
        }
    }

    #[test]
    fn test_transfer_topic() {
        assert_eq!(
            Topic::from_signature("Transfer(address,address,uint256)").to_string(),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_canonical_mapping_and_array() {
        let ty = Type::Mapping(Box::new(Type::Address), Box::new(Type::Uint(256)));
        assert_eq!(canonical_type(&ty), "bytes32");
        assert_eq!(canonical_type(&Type::Array(Box::new(Type::Uint(8)))), "uint8[]");
        assert_eq!(
            signature("setAll", &params(&[Type::Int(256), Type::Bool])),
            "setAll(int256,bool)"
        );
    }

    #[test]
    fn test_struct_is_spelled_tuple() {
        let ty = Type::Struct("Point".into());
        assert_eq!(canonical_type(&ty), "tuple");
        assert_eq!(canonical_type(&Type::Array(Box::new(ty.clone()))), "tuple[]");
        let sig = signature("move", &params(&[ty, Type::Uint(256)]));
        assert_eq!(sig, "move(tuple,uint256)");
    }
}
