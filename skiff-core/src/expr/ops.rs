//! Pure builder functions for filter and ordering expressions. No I/O.

use crate::{ColumnRef, CompareOp, Connector, FilterExpr, IntoOperand, Order, Ordered, StringOp, Value};

fn compare(column: &ColumnRef, op: CompareOp, rhs: impl IntoOperand) -> FilterExpr {
    FilterExpr::Compare {
        column: column.clone(),
        op,
        rhs: rhs.into_operand(),
    }
}

pub fn eq(column: &ColumnRef, rhs: impl IntoOperand) -> FilterExpr {
    compare(column, CompareOp::Eq, rhs)
}

pub fn ne(column: &ColumnRef, rhs: impl IntoOperand) -> FilterExpr {
    compare(column, CompareOp::Ne, rhs)
}

pub fn gt(column: &ColumnRef, rhs: impl IntoOperand) -> FilterExpr {
    compare(column, CompareOp::Gt, rhs)
}

pub fn gte(column: &ColumnRef, rhs: impl IntoOperand) -> FilterExpr {
    compare(column, CompareOp::Gte, rhs)
}

pub fn lt(column: &ColumnRef, rhs: impl IntoOperand) -> FilterExpr {
    compare(column, CompareOp::Lt, rhs)
}

pub fn lte(column: &ColumnRef, rhs: impl IntoOperand) -> FilterExpr {
    compare(column, CompareOp::Lte, rhs)
}

fn call(op: StringOp, column: &ColumnRef, value: impl Into<String>) -> FilterExpr {
    FilterExpr::Call {
        op,
        column: column.clone(),
        value: value.into(),
    }
}

pub fn contains(column: &ColumnRef, value: impl Into<String>) -> FilterExpr {
    call(StringOp::Contains, column, value)
}

pub fn starts_with(column: &ColumnRef, value: impl Into<String>) -> FilterExpr {
    call(StringOp::StartsWith, column, value)
}

pub fn ends_with(column: &ColumnRef, value: impl Into<String>) -> FilterExpr {
    call(StringOp::EndsWith, column, value)
}

pub fn in_list<V: Into<Value>>(
    column: &ColumnRef,
    values: impl IntoIterator<Item = V>,
) -> FilterExpr {
    FilterExpr::AnyOf {
        column: column.clone(),
        values: values.into_iter().map(Into::into).collect(),
    }
}

pub fn not_in_list<V: Into<Value>>(
    column: &ColumnRef,
    values: impl IntoIterator<Item = V>,
) -> FilterExpr {
    FilterExpr::NoneOf {
        column: column.clone(),
        values: values.into_iter().map(Into::into).collect(),
    }
}

pub fn is_null(column: &ColumnRef) -> FilterExpr {
    FilterExpr::IsNull {
        column: column.clone(),
        negated: false,
    }
}

pub fn is_not_null(column: &ColumnRef) -> FilterExpr {
    FilterExpr::IsNull {
        column: column.clone(),
        negated: true,
    }
}

pub fn and(children: impl IntoIterator<Item = FilterExpr>) -> FilterExpr {
    FilterExpr::Group {
        connector: Connector::And,
        children: children.into_iter().collect(),
    }
}

pub fn or(children: impl IntoIterator<Item = FilterExpr>) -> FilterExpr {
    FilterExpr::Group {
        connector: Connector::Or,
        children: children.into_iter().collect(),
    }
}

pub fn not(child: FilterExpr) -> FilterExpr {
    FilterExpr::Not(Box::new(child))
}

pub fn asc(column: &ColumnRef) -> Ordered {
    Ordered {
        column: column.clone(),
        order: Order::Asc,
    }
}

pub fn desc(column: &ColumnRef) -> Ordered {
    Ordered {
        column: column.clone(),
        order: Order::Desc,
    }
}
