use crate::{
    CompareOp, FilterExpr, Operand, Ordered, QueryState, Selection, Value,
    possibly_parenthesized, separated_by,
    value::{format_date, format_time, format_timestamp, is_strict_datetime},
    writer::{Context, Fragment},
};
use std::fmt::Write;

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}

/// Protocol printer converting builder state into a concrete query string.
///
/// The default methods implement the OData v4 grammar; an adapter may
/// override single methods to accommodate dialect quirks.
pub trait QueryWriter {
    fn as_dyn(&self) -> &dyn QueryWriter;

    /// Render the accumulated builder state into one query string.
    ///
    /// At the top level clauses are joined with `&`; inside an expansion
    /// they are joined with `;` and wrapped by the caller.
    fn write_query(&self, context: &mut Context, out: &mut String, state: &QueryState) {
        let separator = context.clause_separator();
        let start = out.len();
        if !state.select.is_empty() {
            out.push_str("$select=");
            let mut ctx = context.with_fragment(Fragment::Select);
            separated_by(
                out,
                &state.select,
                |out, v| self.write_selection(&mut ctx, out, v),
                ",",
            );
        }
        if let Some(filter) = &state.filter {
            if out.len() > start {
                out.push(separator);
            }
            out.push_str("$filter=");
            let mut ctx = context.with_fragment(Fragment::Filter);
            self.write_filter(&mut ctx, out, filter);
        }
        if !state.order.is_empty() {
            if out.len() > start {
                out.push(separator);
            }
            out.push_str("$orderby=");
            let mut ctx = context.with_fragment(Fragment::OrderBy);
            self.write_order_by(&mut ctx, out, &state.order);
        }
        if let Some(top) = state.top {
            if out.len() > start {
                out.push(separator);
            }
            out.push_str("$top=");
            write_integer!(out, top);
        }
        if let Some(skip) = state.skip {
            if out.len() > start {
                out.push(separator);
            }
            out.push_str("$skip=");
            write_integer!(out, skip);
        }
        if state.count {
            if out.len() > start {
                out.push(separator);
            }
            out.push_str("$count=true");
        }
        if !state.expand.is_empty() {
            if out.len() > start {
                out.push(separator);
            }
            out.push_str("$expand=");
            let ctx = context.with_fragment(Fragment::Expand);
            separated_by(
                out,
                &state.expand,
                |out, v| {
                    out.push_str(&v.relation);
                    if !v.nested.is_empty() {
                        out.push('(');
                        self.write_query(&mut ctx.nested(), out, &v.nested);
                        out.push(')');
                    }
                },
                ",",
            );
        }
    }

    /// Render one `$select` entry (wire names, no quoting).
    fn write_selection(&self, _context: &mut Context, out: &mut String, value: &Selection) {
        match value {
            Selection::Typed { column, .. } => out.push_str(column.wire_name()),
            Selection::Raw(name) => out.push_str(name),
        }
    }

    /// Escape occurrences of `search` with `replace` while copying.
    fn write_escaped(
        &self,
        _context: &mut Context,
        out: &mut String,
        value: &str,
        search: char,
        replace: &str,
    ) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + 1;
            }
        }
        out.push_str(&value[position..]);
    }

    /// Render a field name inside an expression.
    ///
    /// Names containing whitespace or an underscore, and the name `id`
    /// itself, must be double quoted; every other name renders bare.
    fn write_field_name(&self, context: &mut Context, out: &mut String, name: &str) {
        let quoted = name == "id" || name.chars().any(|c| c.is_whitespace() || c == '_');
        if quoted {
            out.push('"');
            self.write_escaped(context, out, name, '"', "\"\"");
            out.push('"');
        } else {
            out.push_str(name);
        }
    }

    /// Render a string literal, doubling embedded single quotes.
    fn write_text_literal(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(context, out, value, '\'', "''");
        out.push('\'');
    }

    /// Render a literal value.
    ///
    /// Null, booleans, numbers and date/time values render unquoted; text
    /// renders single quoted unless it matches the strict date-time pattern,
    /// in which case it passes through verbatim as a date literal.
    fn write_literal(&self, context: &mut Context, out: &mut String, value: &Value) {
        match value {
            v if v.is_null() => out.push_str("null"),
            Value::Bool(Some(v)) => out.push_str(["false", "true"][*v as usize]),
            Value::Int(Some(v)) => write_integer!(out, *v),
            Value::Float(Some(v)) => {
                if v.is_finite() {
                    let mut buffer = ryu::Buffer::new();
                    out.push_str(buffer.format(*v));
                } else {
                    log::error!("Cannot render a non finite number literal, writing null");
                    out.push_str("null");
                }
            }
            Value::Decimal(Some(v)) => drop(write!(out, "{}", v)),
            Value::Text(Some(v)) => {
                if is_strict_datetime(v) {
                    out.push_str(v);
                } else {
                    self.write_text_literal(context, out, v);
                }
            }
            Value::Date(Some(v)) => out.push_str(&format_date(v)),
            Value::Time(Some(v)) => out.push_str(&format_time(v)),
            Value::Timestamp(Some(v)) => out.push_str(&format_timestamp(v)),
            Value::Container(Some(v)) => self.write_text_literal(context, out, v),
            _ => out.push_str("null"),
        }
    }

    /// Render a comparison right hand side.
    fn write_operand(&self, context: &mut Context, out: &mut String, value: &Operand) {
        match value {
            Operand::Literal(v) => self.write_literal(context, out, v),
            Operand::Column(c) => self.write_field_name(context, out, c.wire_name()),
        }
    }

    /// Render a filter expression tree.
    fn write_filter(&self, context: &mut Context, out: &mut String, expr: &FilterExpr) {
        match expr {
            FilterExpr::Compare { column, op, rhs } => {
                self.write_field_name(context, out, column.wire_name());
                out.push(' ');
                out.push_str(op.wire());
                out.push(' ');
                self.write_operand(context, out, rhs);
            }
            FilterExpr::Call { op, column, value } => {
                out.push_str(op.wire());
                out.push('(');
                self.write_field_name(context, out, column.wire_name());
                out.push_str(", ");
                self.write_text_literal(context, out, value);
                out.push(')');
            }
            FilterExpr::AnyOf { column, values } => {
                self.write_membership(context, out, column.wire_name(), CompareOp::Eq, values);
            }
            FilterExpr::NoneOf { column, values } => {
                self.write_membership(context, out, column.wire_name(), CompareOp::Ne, values);
            }
            FilterExpr::IsNull { column, negated } => {
                self.write_field_name(context, out, column.wire_name());
                out.push_str(if *negated { " ne null" } else { " eq null" });
            }
            FilterExpr::Group {
                connector,
                children,
            } => {
                let precedence = expr.precedence();
                let connector = format!(" {} ", connector.wire());
                separated_by(
                    out,
                    children,
                    |out, child| {
                        possibly_parenthesized!(
                            out,
                            child.precedence() < precedence,
                            self.write_filter(context, out, child)
                        );
                    },
                    &connector,
                );
            }
            FilterExpr::Not(child) => {
                out.push_str("not (");
                self.write_filter(context, out, child);
                out.push(')');
            }
        }
    }

    /// Render `in` / `not in` as a parenthesized per value clause chain.
    fn write_membership(
        &self,
        context: &mut Context,
        out: &mut String,
        field: &str,
        op: CompareOp,
        values: &[Value],
    ) {
        let connector = match op {
            CompareOp::Ne => " and ",
            _ => " or ",
        };
        out.push('(');
        separated_by(
            out,
            values,
            |out, value| {
                self.write_field_name(context, out, field);
                out.push(' ');
                out.push_str(op.wire());
                out.push(' ');
                self.write_literal(context, out, value);
            },
            connector,
        );
        out.push(')');
    }

    /// Render the `$orderby` entry list, directions lower case.
    fn write_order_by(&self, context: &mut Context, out: &mut String, items: &[Ordered]) {
        separated_by(
            out,
            items,
            |out, item| {
                self.write_field_name(context, out, item.column.wire_name());
                out.push(' ');
                out.push_str(item.order.wire());
            },
            ",",
        );
    }
}
