use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    Int(BigUint),
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    In,
}

impl BinaryOp {
    /// Order in which the expression parser looks for a split point. The first operator in
    /// this list that occurs at nesting depth 0 with operands on both sides wins.
    pub const PRIORITY: [BinaryOp; 14] = [
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::Le,
        BinaryOp::Ge,
        BinaryOp::Lt,
        BinaryOp::Gt,
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Mod,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::In,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::In => "in",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    Call,
    DelegateCall,
    StaticCall,
}

impl CallKind {
    pub fn from_member(member: &str) -> Option<Self> {
        match member {
            "call" => Some(CallKind::Call),
            "delegatecall" => Some(CallKind::DelegateCall),
            "staticcall" => Some(CallKind::StaticCall),
            _ => None,
        }
    }
}

/// Execution-context values reachable through the `msg`, `block` and `tx` namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlobalVar {
    MsgSender,
    MsgValue,
    MsgData,
    MsgSig,
    TxOrigin,
    TxGasPrice,
    BlockTimestamp,
    BlockNumber,
    BlockDifficulty,
    BlockGasLimit,
    BlockCoinbase,
    BlockChainId,
    BlockBaseFee,
    Unknown(String),
}

impl GlobalVar {
    pub const NAMESPACES: [&'static str; 3] = ["msg", "block", "tx"];

    pub fn is_namespace(name: &str) -> bool {
        Self::NAMESPACES.contains(&name)
    }

    pub fn resolve(namespace: &str, member: &str) -> Self {
        match (namespace, member) {
            ("msg", "sender") => GlobalVar::MsgSender,
            ("msg", "value") => GlobalVar::MsgValue,
            ("msg", "data") => GlobalVar::MsgData,
            ("msg", "sig") => GlobalVar::MsgSig,
            ("tx", "origin") => GlobalVar::TxOrigin,
            ("tx", "gasprice") => GlobalVar::TxGasPrice,
            ("block", "timestamp") => GlobalVar::BlockTimestamp,
            ("block", "number") => GlobalVar::BlockNumber,
            ("block", "difficulty") => GlobalVar::BlockDifficulty,
            ("block", "gaslimit") => GlobalVar::BlockGasLimit,
            ("block", "coinbase") => GlobalVar::BlockCoinbase,
            ("block", "chainid") => GlobalVar::BlockChainId,
            ("block", "basefee") => GlobalVar::BlockBaseFee,
            _ => GlobalVar::Unknown(format!("{}.{}", namespace, member)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expression {
    Literal(Literal),
    Variable(String),
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Conditional {
        condition: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
    },
    Call {
        name: String,
        args: Vec<Expression>,
    },
    Index {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    Field {
        base: Box<Expression>,
        field: String,
    },
    /// `name.length` on a storage array.
    Length(String),
    ExternalCall {
        target: Box<Expression>,
        kind: CallKind,
        value: Option<Box<Expression>>,
        data: Option<Box<Expression>>,
    },
    Global(GlobalVar),
    /// `base[key := value]`, a copy of `base` with one entry replaced. Chained updates nest
    /// with the first update innermost.
    KeyUpdate {
        base: Box<Expression>,
        key: Box<Expression>,
        value: Box<Expression>,
    },
}

impl Expression {
    pub fn int(value: u64) -> Self {
        Expression::Literal(Literal::Int(BigUint::from(value)))
    }

    pub fn bool(value: bool) -> Self {
        Expression::Literal(Literal::Bool(value))
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn index(base: Expression, index: Expression) -> Self {
        Expression::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    pub fn field(base: Expression, field: impl Into<String>) -> Self {
        Expression::Field {
            base: Box::new(base),
            field: field.into(),
        }
    }

    /// Name of the variable at the root of an index/field chain, if there is one.
    pub fn root_name(&self) -> Option<&str> {
        match self {
            Expression::Variable(name) => Some(name),
            Expression::Index { base, .. } | Expression::Field { base, .. } => base.root_name(),
            Expression::KeyUpdate { base, .. } => base.root_name(),
            _ => None,
        }
    }
}
