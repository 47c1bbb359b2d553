use crate::expr::Expression;
use crate::types::Variable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignTarget {
    Name(String),
    /// `base[i][j]...`, indices outermost first.
    Indexed {
        base: String,
        indices: Vec<Expression>,
    },
    /// `a.b.c`
    Field {
        path: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevertKind {
    Bare,
    Message(String),
    Error { name: String, args: Vec<Expression> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    VarDecl {
        var: Variable,
        init: Option<Expression>,
    },
    Assign {
        target: AssignTarget,
        value: Expression,
    },
    Return(Vec<Expression>),
    Assert(Expression),
    Require(Expression),
    Emit {
        event: String,
        args: Vec<Expression>,
    },
    Revert(RevertKind),
    SelfDestruct(Expression),
    Push {
        array: String,
        value: Expression,
    },
    Pop {
        array: String,
    },
    If {
        condition: Expression,
        then_body: Vec<Statement>,
        else_body: Option<Vec<Statement>>,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    For {
        init: Option<Box<Statement>>,
        condition: Expression,
        update: Option<Box<Statement>>,
        body: Vec<Statement>,
    },
    /// A call evaluated for its effect, e.g. `transfer(to, amount);`.
    Expr(Expression),
}
