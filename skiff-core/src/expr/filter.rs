use crate::{ColumnRef, Operand, Value};

/// Comparison operators, rendered with their wire keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn wire(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "le",
        }
    }
}

/// Protocol string functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOp {
    Contains,
    StartsWith,
    EndsWith,
}

impl StringOp {
    pub fn wire(&self) -> &'static str {
        match self {
            StringOp::Contains => "contains",
            StringOp::StartsWith => "startswith",
            StringOp::EndsWith => "endswith",
        }
    }
}

/// Connector between sibling clauses. Defaults to `And`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    pub fn wire(&self) -> &'static str {
        match self {
            Connector::And => "and",
            Connector::Or => "or",
        }
    }
}

/// Immutable filter expression tree built by the operator DSL and consumed
/// only by the query writer.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// `column op literal-or-column`
    Compare {
        column: ColumnRef,
        op: CompareOp,
        rhs: Operand,
    },
    /// `func(column, 'value')` protocol string function call.
    Call {
        op: StringOp,
        column: ColumnRef,
        value: String,
    },
    /// Membership test, rendered as a parenthesized disjunction of
    /// per value equality clauses.
    AnyOf {
        column: ColumnRef,
        values: Vec<Value>,
    },
    /// Exclusion test, rendered as a parenthesized conjunction of
    /// per value inequality clauses.
    NoneOf {
        column: ColumnRef,
        values: Vec<Value>,
    },
    /// `column eq null` / `column ne null`
    IsNull {
        column: ColumnRef,
        negated: bool,
    },
    /// Sibling clauses joined by one connector.
    Group {
        connector: Connector,
        children: Vec<FilterExpr>,
    },
    /// Negation of a single child.
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    /// Relative binding strength, used by the writer to decide parenthesis.
    pub fn precedence(&self) -> i32 {
        match self {
            FilterExpr::Group {
                connector: Connector::Or,
                ..
            } => 100,
            FilterExpr::Group {
                connector: Connector::And,
                ..
            } => 200,
            FilterExpr::Not(..) => 300,
            _ => 1_000_000,
        }
    }

    /// Combine with another expression under `and`, flattening when this
    /// already is an `and` group.
    pub fn and(self, other: FilterExpr) -> FilterExpr {
        self.join(Connector::And, other)
    }

    /// Combine with another expression under `or`.
    pub fn or(self, other: FilterExpr) -> FilterExpr {
        self.join(Connector::Or, other)
    }

    fn join(self, connector: Connector, other: FilterExpr) -> FilterExpr {
        match self {
            FilterExpr::Group {
                connector: existing,
                mut children,
            } if existing == connector => {
                children.push(other);
                FilterExpr::Group {
                    connector,
                    children,
                }
            }
            first => FilterExpr::Group {
                connector,
                children: vec![first, other],
            },
        }
    }
}
