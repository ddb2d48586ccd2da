use crate::{ColumnRef, Value};
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

/// Right hand side of a comparison: a literal value or another column
/// (cross column comparison, within or across tables).
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Column(ColumnRef),
}

/// Anything the comparison operators accept as their right hand side.
pub trait IntoOperand {
    fn into_operand(self) -> Operand;
}

impl IntoOperand for Operand {
    fn into_operand(self) -> Operand {
        self
    }
}

impl IntoOperand for Value {
    fn into_operand(self) -> Operand {
        Operand::Literal(self)
    }
}

impl IntoOperand for ColumnRef {
    fn into_operand(self) -> Operand {
        Operand::Column(self)
    }
}

impl IntoOperand for &ColumnRef {
    fn into_operand(self) -> Operand {
        Operand::Column(self.clone())
    }
}

macro_rules! impl_into_operand {
    ($($source:ty),+ $(,)?) => {$(
        impl IntoOperand for $source {
            fn into_operand(self) -> Operand {
                Operand::Literal(self.into())
            }
        }
        impl IntoOperand for Option<$source> {
            fn into_operand(self) -> Operand {
                Operand::Literal(self.into())
            }
        }
    )+};
}

impl_into_operand!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    f32,
    f64,
    Decimal,
    String,
    &str,
    Date,
    Time,
    OffsetDateTime,
    PrimitiveDateTime,
);
