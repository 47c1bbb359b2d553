use crate::expr::Expression;
use crate::stmt::Statement;
use crate::types::{Type, Variable, Visibility};
use indexmap::IndexMap;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnShape {
    None,
    Single(Type),
    Named(Vec<Variable>),
}

impl ReturnShape {
    pub fn types(&self) -> Vec<Type> {
        match self {
            ReturnShape::None => Vec::new(),
            ReturnShape::Single(ty) => vec![ty.clone()],
            ReturnShape::Named(vars) => vars.iter().map(|v| v.ty.clone()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReturnShape::None => 0,
            ReturnShape::Single(_) => 1,
            ReturnShape::Named(vars) => vars.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateMutability {
    Pure,
    View,
    NonPayable,
    Payable,
}

impl StateMutability {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "pure" => Some(StateMutability::Pure),
            "view" => Some(StateMutability::View),
            "payable" => Some(StateMutability::Payable),
            "nonpayable" => Some(StateMutability::NonPayable),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StateMutability::Pure => "pure",
            StateMutability::View => "view",
            StateMutability::NonPayable => "nonpayable",
            StateMutability::Payable => "payable",
        }
    }
}

impl fmt::Display for StateMutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub params: Vec<Variable>,
    pub returns: ReturnShape,
    pub preconditions: Vec<Expression>,
    /// Carried for the external verifier only; nothing is generated for them.
    pub postconditions: Vec<Expression>,
    pub modifies: Vec<Expression>,
    pub body: Vec<Statement>,
    pub visibility: Visibility,
    pub payable: bool,
    pub state_mutability: Option<StateMutability>,
    pub modifiers: Vec<String>,
}

impl Method {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: ReturnShape::None,
            preconditions: Vec::new(),
            postconditions: Vec::new(),
            modifies: Vec::new(),
            body: Vec::new(),
            visibility: Visibility::Public,
            payable: false,
            state_mutability: None,
            modifiers: Vec::new(),
        }
    }

    pub fn is_exposed(&self) -> bool {
        self.visibility.is_exposed()
    }

    pub fn is_payable(&self) -> bool {
        self.payable || self.state_mutability == Some(StateMutability::Payable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub params: Vec<Variable>,
    /// Parallel to `params`.
    pub indexed: Vec<bool>,
    pub anonymous: bool,
}

impl Event {
    pub fn is_indexed(&self, position: usize) -> bool {
        self.indexed.get(position).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomError {
    pub name: String,
    pub params: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Struct {
    pub name: String,
    pub fields: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    pub name: String,
    pub params: Vec<Variable>,
    /// Only `require` guards are kept from a modifier body.
    pub guards: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GhostValue {
    Int(BigUint),
    Bool(bool),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub name: String,
    /// Recorded only; nothing is inherited from the base.
    pub base: Option<String>,
    pub license: Option<String>,
    pub imports: Vec<String>,
    pub libraries: Vec<Library>,
    pub fields: Vec<Variable>,
    pub methods: Vec<Method>,
    pub constructor: Option<Method>,
    pub events: Vec<Event>,
    pub errors: Vec<CustomError>,
    pub structs: Vec<Struct>,
    pub modifiers: Vec<Modifier>,
    pub receive: Option<Method>,
    pub fallback: Option<Method>,
    pub invariants: Vec<Expression>,
    pub constants: IndexMap<String, GhostValue>,
}

impl Contract {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            license: None,
            imports: Vec::new(),
            libraries: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructor: None,
            events: Vec::new(),
            errors: Vec::new(),
            structs: Vec::new(),
            modifiers: Vec::new(),
            receive: None,
            fallback: None,
            invariants: Vec::new(),
            constants: IndexMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Variable> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn event(&self, name: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.name == name)
    }

    pub fn error(&self, name: &str) -> Option<&CustomError> {
        self.errors.iter().find(|e| e.name == name)
    }

    pub fn modifier(&self, name: &str) -> Option<&Modifier> {
        self.modifiers.iter().find(|m| m.name == name)
    }

    pub fn exposed_methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter().filter(|m| m.is_exposed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_defaults() {
        let method = Method::new("transfer");
        assert_eq!(method.visibility, Visibility::Public);
        assert!(method.is_exposed());
        assert!(!method.is_payable());
        assert!(method.returns.is_empty());
    }

    #[test]
    fn test_payable_through_mutability_tag() {
        let mut method = Method::new("deposit");
        method.state_mutability = Some(StateMutability::Payable);
        assert!(method.is_payable());
    }

    #[test]
    fn test_exposed_methods_filters_private() {
        let mut contract = Contract::new("Vault");
        let mut hidden = Method::new("helper");
        hidden.visibility = Visibility::Private;
        contract.methods.push(Method::new("withdraw"));
        contract.methods.push(hidden);

        let names: Vec<&str> = contract.exposed_methods().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["withdraw"]);
    }

    #[test]
    fn test_event_indexed_out_of_range() {
        let event = Event {
            name: "Ping".into(),
            params: vec![Variable::new("who", Type::Address)],
            indexed: vec![true],
            anonymous: false,
        };
        assert!(event.is_indexed(0));
        assert!(!event.is_indexed(1));
    }
}
