use serde::{Deserialize, Serialize};
use std::fmt;

use crate::query_model::{self, Value};

/// Alias of a graph-pattern node variable.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub struct NodeAlias(pub String);

impl fmt::Display for NodeAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of graph-query expression nodes the generator can render.
///
/// Every node that reaches a `ReadOnlyQuery` is server-representable;
/// expressions that cannot be lowered to one of these variants stay in the
/// caller's expression tree for client-side evaluation.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum CypherExpr {
    Literal(Value),

    /// Named parameter placeholder, rendered as `$name`.
    Parameter(String),

    /// Bound property reference: "this pattern's this property".
    PropertyAccess(PropertyAccess),

    OperatorApplication(OperatorApplication),

    /// Searched CASE expression.
    Case(CaseExpr),

    /// Operand that requires null-coalescing on read. Rendering is
    /// transparent; the marker travels with the expression so the
    /// projection layer defaults the value when the row slot is missing.
    NullGuarded(Box<CypherExpr>),
}

impl CypherExpr {
    pub fn is_literal(&self) -> bool {
        matches!(self, CypherExpr::Literal(_))
    }

    /// The bound property reference inside this node, looking through the
    /// null-guard wrapper.
    pub fn as_property_access(&self) -> Option<&PropertyAccess> {
        match self {
            CypherExpr::PropertyAccess(access) => Some(access),
            CypherExpr::NullGuarded(inner) => inner.as_property_access(),
            _ => None,
        }
    }

    pub fn and(self, other: CypherExpr) -> CypherExpr {
        CypherExpr::OperatorApplication(OperatorApplication {
            operator: Operator::And,
            operands: vec![self, other],
        })
    }

    /// Aliases of every bound property reference in this expression.
    pub fn referenced_aliases(&self) -> Vec<&NodeAlias> {
        let mut aliases = Vec::new();
        self.collect_aliases(&mut aliases);
        aliases
    }

    fn collect_aliases<'a>(&'a self, out: &mut Vec<&'a NodeAlias>) {
        match self {
            CypherExpr::Literal(_) | CypherExpr::Parameter(_) => {}
            CypherExpr::PropertyAccess(access) => out.push(&access.alias),
            CypherExpr::OperatorApplication(op) => {
                for operand in &op.operands {
                    operand.collect_aliases(out);
                }
            }
            CypherExpr::Case(case) => {
                for (when, then) in &case.when_then {
                    when.collect_aliases(out);
                    then.collect_aliases(out);
                }
                if let Some(else_expr) = &case.else_expr {
                    else_expr.collect_aliases(out);
                }
            }
            CypherExpr::NullGuarded(inner) => inner.collect_aliases(out),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PropertyAccess {
    pub alias: NodeAlias,
    pub property: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OperatorApplication {
    pub operator: Operator,
    pub operands: Vec<CypherExpr>,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum Operator {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    ModuloDivision,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    And,
    Or,
    Not,
    Negate,
    StartsWith,
    EndsWith,
    Contains,
    IsNull,
    IsNotNull,
}

impl From<query_model::Operator> for Operator {
    fn from(op: query_model::Operator) -> Self {
        use query_model::Operator as Input;
        match op {
            Input::Addition => Operator::Addition,
            Input::Subtraction => Operator::Subtraction,
            Input::Multiplication => Operator::Multiplication,
            Input::Division => Operator::Division,
            Input::ModuloDivision => Operator::ModuloDivision,
            Input::Equal => Operator::Equal,
            Input::NotEqual => Operator::NotEqual,
            Input::LessThan => Operator::LessThan,
            Input::GreaterThan => Operator::GreaterThan,
            Input::LessThanEqual => Operator::LessThanEqual,
            Input::GreaterThanEqual => Operator::GreaterThanEqual,
            Input::And => Operator::And,
            Input::Or => Operator::Or,
            Input::Not => Operator::Not,
            Input::StartsWith => Operator::StartsWith,
            Input::EndsWith => Operator::EndsWith,
            Input::Contains => Operator::Contains,
            Input::IsNull => Operator::IsNull,
            Input::IsNotNull => Operator::IsNotNull,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct CaseExpr {
    pub when_then: Vec<(CypherExpr, CypherExpr)>,
    pub else_expr: Option<Box<CypherExpr>>,
}
