use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Uint(u16),
    Int(u16),
    Bool,
    Address,
    String,
    Bytes,
    Bytes32,
    Array(Box<Type>),
    Mapping(Box<Type>, Box<Type>),
    Struct(String),
}

impl Type {
    /// Resolves a scalar type name. Anything unrecognised is taken to be a struct name and is
    /// resolved later against the contract's struct table.
    pub fn from_name(name: &str) -> Type {
        match name {
            "int" => Type::Int(256),
            "nat" => Type::Uint(256),
            "bool" => Type::Bool,
            "address" => Type::Address,
            "string" => Type::String,
            "bytes" => Type::Bytes,
            "bytes32" => Type::Bytes32,
            _ => {
                if let Some(bits) = name.strip_prefix("uint").and_then(parse_width) {
                    Type::Uint(bits)
                } else if let Some(bits) = name.strip_prefix("int").and_then(parse_width) {
                    Type::Int(bits)
                } else {
                    Type::Struct(name.to_string())
                }
            }
        }
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Type::Mapping(_, _))
    }

    pub fn struct_name(&self) -> Option<&str> {
        match self {
            Type::Struct(name) => Some(name),
            _ => None,
        }
    }

    /// The type reached by one level of indexing: a mapping's value or an array's element.
    pub fn indexed(&self) -> Option<&Type> {
        match self {
            Type::Mapping(_, value) => Some(value),
            Type::Array(elem) => Some(elem),
            _ => None,
        }
    }
}

fn parse_width(digits: &str) -> Option<u16> {
    digits
        .parse::<u16>()
        .ok()
        .filter(|bits| *bits >= 8 && *bits <= 256 && bits % 8 == 0)
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Uint(bits) => write!(f, "uint{}", bits),
            Type::Int(bits) => write!(f, "int{}", bits),
            Type::Bool => write!(f, "bool"),
            Type::Address => write!(f, "address"),
            Type::String => write!(f, "string"),
            Type::Bytes => write!(f, "bytes"),
            Type::Bytes32 => write!(f, "bytes32"),
            Type::Array(elem) => write!(f, "{}[]", elem),
            Type::Mapping(key, value) => write!(f, "mapping<{}, {}>", key, value),
            Type::Struct(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
    #[default]
    Internal,
    External,
}

impl Visibility {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "public" => Some(Visibility::Public),
            "private" => Some(Visibility::Private),
            "internal" => Some(Visibility::Internal),
            "external" => Some(Visibility::External),
            _ => None,
        }
    }

    /// Whether the member is reachable through the dispatcher and listed in the ABI.
    pub fn is_exposed(&self) -> bool {
        matches!(self, Visibility::Public | Visibility::External)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Internal => "internal",
            Visibility::External => "external",
        };
        write!(f, "{}", word)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
    pub visibility: Visibility,
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            visibility: Visibility::default(),
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}
