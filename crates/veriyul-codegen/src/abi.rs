//! ABI JSON and selector listing.
//!
//! Entries use the Solidity ABI JSON format: the constructor first, then every exposed
//! method in declaration order, then events, custom errors, and the `receive`/`fallback`
//! entry points.

use crate::error::AbiResult;
use serde::Serialize;
use veriyul_core::signature::{canonical_type, method_signature};
use veriyul_core::{
    Contract, CustomError, Event, Method, ReturnShape, Selector, StateMutability, Struct, Type,
    Variable,
};
use veriyul_emit::{JsonFormatter, OutputStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Constructor,
    Function,
    Event,
    Error,
    Receive,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub internal_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<AbiParam>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<AbiParam>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<AbiParam>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_mutability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anonymous: Option<bool>,
}

impl AbiEntry {
    fn new(kind: EntryKind) -> Self {
        Self {
            kind,
            name: None,
            inputs: None,
            outputs: None,
            state_mutability: None,
            anonymous: None,
        }
    }
}

/// Mutability reported for a method: the explicit tag, else `payable` when flagged, else
/// `view` for a method that returns values and declares no `modifies` frame.
pub fn state_mutability(method: &Method) -> StateMutability {
    if let Some(explicit) = method.state_mutability {
        return explicit;
    }
    if method.payable {
        StateMutability::Payable
    } else if !method.returns.is_empty() && method.modifies.is_empty() {
        StateMutability::View
    } else {
        StateMutability::NonPayable
    }
}

/// Canonical signature and selector of every method the dispatcher routes, in dispatch order.
pub fn selectors(contract: &Contract) -> Vec<(String, Selector)> {
    contract
        .exposed_methods()
        .map(|method| {
            let signature = method_signature(method);
            let selector = Selector::from_signature(&signature);
            (signature, selector)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AbiGenerator {
    style: OutputStyle,
}

impl AbiGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(style: OutputStyle) -> Self {
        Self { style }
    }

    pub fn generate(&self, contract: &Contract) -> AbiResult<String> {
        Ok(JsonFormatter::to_string(&self.entries(contract), self.style)?)
    }

    pub fn entries(&self, contract: &Contract) -> Vec<AbiEntry> {
        let structs = &contract.structs;
        let mut entries = Vec::new();

        let mut constructor = AbiEntry::new(EntryKind::Constructor);
        let params = match &contract.constructor {
            Some(ctor) => ctor.params.as_slice(),
            None => &[],
        };
        constructor.inputs = Some(params_of(params, structs));
        // reported as nonpayable even when the creation code accepts value
        constructor.state_mutability = Some(payability(false));
        entries.push(constructor);

        entries.extend(contract.exposed_methods().map(|m| function_entry(m, structs)));
        entries.extend(contract.events.iter().map(|e| event_entry(e, structs)));
        entries.extend(contract.errors.iter().map(|e| error_entry(e, structs)));

        if contract.receive.is_some() {
            let mut receive = AbiEntry::new(EntryKind::Receive);
            receive.state_mutability = Some(payability(true));
            entries.push(receive);
        }
        if let Some(fallback) = &contract.fallback {
            let mut entry = AbiEntry::new(EntryKind::Fallback);
            entry.state_mutability = Some(payability(fallback.is_payable()));
            entries.push(entry);
        }
        entries
    }
}

fn payability(payable: bool) -> String {
    let mutability = if payable {
        StateMutability::Payable
    } else {
        StateMutability::NonPayable
    };
    mutability.as_str().to_string()
}

fn function_entry(method: &Method, structs: &[Struct]) -> AbiEntry {
    let outputs = match &method.returns {
        ReturnShape::None => Vec::new(),
        ReturnShape::Single(ty) => vec![param(&Variable::new("", ty.clone()), structs)],
        ReturnShape::Named(vars) => params_of(vars, structs),
    };
    let mut entry = AbiEntry::new(EntryKind::Function);
    entry.name = Some(method.name.clone());
    entry.inputs = Some(params_of(&method.params, structs));
    entry.outputs = Some(outputs);
    entry.state_mutability = Some(state_mutability(method).as_str().to_string());
    entry
}

fn event_entry(event: &Event, structs: &[Struct]) -> AbiEntry {
    let inputs = event
        .params
        .iter()
        .enumerate()
        .map(|(i, var)| AbiParam {
            indexed: Some(event.is_indexed(i)),
            ..param(var, structs)
        })
        .collect();
    let mut entry = AbiEntry::new(EntryKind::Event);
    entry.name = Some(event.name.clone());
    entry.inputs = Some(inputs);
    entry.anonymous = Some(event.anonymous);
    entry
}

fn error_entry(error: &CustomError, structs: &[Struct]) -> AbiEntry {
    let mut entry = AbiEntry::new(EntryKind::Error);
    entry.name = Some(error.name.clone());
    entry.inputs = Some(params_of(&error.params, structs));
    entry
}

fn params_of(vars: &[Variable], structs: &[Struct]) -> Vec<AbiParam> {
    vars.iter().map(|var| param(var, structs)).collect()
}

fn param(var: &Variable, structs: &[Struct]) -> AbiParam {
    AbiParam {
        name: var.name.clone(),
        ty: canonical_type(&var.ty),
        internal_type: internal_type(&var.ty),
        components: components(&var.ty, structs),
        indexed: None,
    }
}

fn internal_type(ty: &Type) -> String {
    match ty {
        Type::Struct(name) => format!("struct {}", name),
        Type::Array(elem) => format!("{}[]", internal_type(elem)),
        _ => canonical_type(ty),
    }
}

/// Tuple members of a struct type, looking through array element types.
fn components(ty: &Type, structs: &[Struct]) -> Option<Vec<AbiParam>> {
    match ty {
        Type::Array(elem) => components(elem, structs),
        Type::Struct(name) => structs
            .iter()
            .find(|def| &def.name == name)
            .map(|def| params_of(&def.fields, structs)),
        _ => None,
    }
}
