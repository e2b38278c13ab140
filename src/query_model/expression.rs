use super::{QueryModel, QuerySourceId, Value};

/// Expression tree handed in by the caller's query model.
///
/// This is the front-end contract of the translator: clause predicates and
/// select projections are composed of these nodes. The set is closed so the
/// lowering visitor can match exhaustively instead of falling back to a
/// "throw on unhandled node" path.
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Literal(Value),

    /// Named parameter placeholder; the value is supplied at generation time.
    Parameter(String),

    /// Reference to a whole query source (the `w` in `select w`).
    QuerySourceRef(QuerySourceId),

    /// Member access on a query source (`w.Location`).
    MemberAccess(MemberAccess),

    OperatorApplication(OperatorApplication),

    /// Ternary conditional (`cond ? then : else`).
    Conditional(Conditional),

    /// Free function / method call. Only calls the fragment rewriter knows
    /// how to canonicalize can be pushed server-side.
    FnCall(FnCall),

    /// Scalar-valued nested query model.
    SubQuery(SubQuery),

    /// Anonymous / record object construction in a projection.
    New(ObjectConstruction),

    /// Type conversion wrapper. Structural at a projection root; elsewhere
    /// the converted operand may require null-coalescing on read.
    Convert(Box<Expression>),

    /// Arithmetic negation.
    Negate(Box<Expression>),

    /// Typed read from the flat result row at a fixed position. Never
    /// supplied by callers; produced by the projection visitor when a
    /// sub-expression has been pushed into the RETURN clause.
    ReadRow(RowRead),
}

#[derive(Debug, PartialEq, Clone)]
pub struct MemberAccess {
    pub target: Box<Expression>,
    pub member: String,
}

impl MemberAccess {
    /// The query source this access is rooted on, when the target is a
    /// direct source reference. Chained accesses return `None` and are
    /// left for client-side evaluation.
    pub fn root_source(&self) -> Option<QuerySourceId> {
        match self.target.as_ref() {
            Expression::QuerySourceRef(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct OperatorApplication {
    pub operator: Operator,
    pub operands: Vec<Expression>,
}

#[derive(Debug, PartialEq, Clone, Copy)]
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
    StartsWith,
    EndsWith,
    Contains,
    IsNull,
    IsNotNull,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Conditional {
    pub condition: Box<Expression>,
    pub then_expr: Box<Expression>,
    pub else_expr: Box<Expression>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FnCall {
    pub name: String,
    pub args: Vec<Expression>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct SubQuery {
    pub model: Box<QueryModel>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ObjectConstruction {
    /// Target type name, when the construction is a named record rather
    /// than an anonymous object.
    pub type_name: Option<String>,
    /// Named members in declaration order.
    pub members: Vec<(String, Expression)>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct RowRead {
    /// Position in the flat result row.
    pub index: usize,
    /// Whether a missing value must be defaulted (coalesced) on read,
    /// e.g. for scalar sub-query results.
    pub defaulted: bool,
}

impl Expression {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn member(source: QuerySourceId, member: impl Into<String>) -> Self {
        Expression::MemberAccess(MemberAccess {
            target: Box::new(Expression::QuerySourceRef(source)),
            member: member.into(),
        })
    }

    pub fn binary(operator: Operator, left: Expression, right: Expression) -> Self {
        Expression::OperatorApplication(OperatorApplication {
            operator,
            operands: vec![left, right],
        })
    }

    pub fn unary(operator: Operator, operand: Expression) -> Self {
        Expression::OperatorApplication(OperatorApplication {
            operator,
            operands: vec![operand],
        })
    }
}
