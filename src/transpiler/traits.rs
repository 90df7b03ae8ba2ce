//! The base emitter.
//!
//! [`SqlGenerator`] renders every expression and query node. Its default
//! methods produce the dialect-neutral text; `SqlServerGenerator` and
//! `PostgresGenerator` override only the nodes (or small hooks) that differ.
//! Statement-level rewrites live in `dml` and `ddl`.

use uuid::Uuid;

use crate::ast::{
    CaseExpr, ColumnExpr, ColumnReference, CompareModifier, CompareOp, Comparison, Cte, Expr,
    FunctionExpr, JoinKind, LiteralKind, MemberAccess, OrderClause, OrderItem, OverClause,
    QueryExpr, ScalarExpr, SelectExpr, TableExpression, TableJoin, TableReference, TableSource,
    UnaryOp, UnionExpr, VariableReference, visit,
};
use crate::binding::{Binding, ColumnMapper};
use crate::error::{TranspileError, TranspileResult};
use crate::transpiler::EmitContext;
use crate::transpiler::dialect::Dialect;
use crate::transpiler::functions::is_builtin;
use crate::transpiler::literals::{
    escape_string, format_datetime, is_true_literal, parse_entity, parse_uuid, uuid_hex,
};

/// Trait for dialect-specific SQL generation.
pub trait SqlGenerator {
    fn dialect(&self) -> Dialect;

    // ---------------------------------------------------------------
    // Literal and naming primitives
    // ---------------------------------------------------------------

    /// Boolean literal (1-byte binary by default).
    fn bool_literal(&self, value: bool) -> String {
        if value { "0x01".to_string() } else { "0x00".to_string() }
    }

    /// Binary literal from upper-case hex digits.
    fn bytes_literal(&self, hex: &str) -> String {
        format!("0x{}", hex)
    }

    fn uuid_literal(&self, uuid: &Uuid) -> String {
        self.bytes_literal(&uuid_hex(uuid))
    }

    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", escape_string(value))
    }

    /// Timestamp literal from an already shifted `yyyy-MM-ddTHH:mm:ss` value.
    fn datetime_literal(&self, formatted: &str) -> String {
        format!("CAST('{}' AS datetime2)", formatted)
    }

    /// Hex literal as written in the script (`0x...`).
    fn binary_literal(&self, literal: &str) -> String {
        literal.to_string()
    }

    fn table_variable_name(&self, name: &str) -> String {
        name.to_string()
    }

    fn temporary_table_name(&self, name: &str) -> String {
        name.to_string()
    }

    /// Row source for a table-valued parameter of a user-defined type.
    fn user_type_source(&self, _table_name: &str, identifier: &str) -> String {
        identifier.to_string()
    }

    /// Next value of a sequence.
    fn next_value(&self, sequence: &str) -> String {
        format!("NEXT VALUE FOR {}", sequence)
    }

    fn into_keyword(&self) -> &'static str {
        "INTO"
    }

    /// Keyword introducing CROSS/OUTER APPLY and the condition it needs.
    fn apply_join(&self, outer: bool) -> (&'static str, &'static str) {
        if outer {
            ("OUTER APPLY", "")
        } else {
            ("CROSS APPLY", "")
        }
    }

    fn recursive_keyword(&self) -> &'static str {
        ""
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    fn emit_expr(&self, cx: &mut EmitContext<'_>, expr: &Expr, out: &mut String) -> TranspileResult<()> {
        match expr {
            Expr::Column(column) => self.emit_column_ref(cx, column, out),
            Expr::Scalar(scalar) => self.emit_scalar(cx, scalar, out),
            Expr::Variable(variable) => self.emit_variable(cx, variable, out),
            Expr::Member(member) => self.emit_member(cx, member, out),
            Expr::Function(function) => self.emit_function(cx, function, out),
            Expr::Case(case) => self.emit_case(cx, case, out),
            Expr::Unary { op, expr } => {
                out.push_str(match op {
                    UnaryOp::Minus => "-",
                    UnaryOp::Not => "NOT ",
                });
                self.emit_expr(cx, expr, out)
            }
            Expr::Logical { op, left, right } => {
                self.emit_expr(cx, left, out)?;
                out.push_str(&format!(" {} ", op));
                self.emit_expr(cx, right, out)
            }
            Expr::Arithmetic { op, left, right } => {
                self.emit_expr(cx, left, out)?;
                out.push_str(&format!(" {} ", op));
                self.emit_expr(cx, right, out)
            }
            Expr::Comparison(comparison) => self.emit_comparison(cx, comparison, out),
            Expr::Group(inner) => {
                out.push('(');
                self.emit_expr(cx, inner, out)?;
                out.push(')');
                Ok(())
            }
            Expr::Values(values) => {
                out.push('(');
                self.emit_list(cx, values, ", ", out)?;
                out.push(')');
                Ok(())
            }
            Expr::Subquery(query) => {
                out.push('(');
                self.emit_query(cx, query, out)?;
                out.push(')');
                Ok(())
            }
            Expr::Star => {
                out.push('*');
                Ok(())
            }
        }
    }

    fn emit_list(&self, cx: &mut EmitContext<'_>, exprs: &[Expr], separator: &str, out: &mut String) -> TranspileResult<()> {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            self.emit_expr(cx, expr, out)?;
        }
        Ok(())
    }

    fn emit_column_ref(&self, cx: &mut EmitContext<'_>, column: &ColumnReference, out: &mut String) -> TranspileResult<()> {
        if let Some(mapping) = cx.mapping(column.id) {
            return self.emit_mapping(&mapping, out);
        }
        match cx.binding(column.id) {
            Some(Binding::EnumValue(uuid)) => {
                out.push_str(&self.uuid_literal(uuid));
                Ok(())
            }
            _ => Err(TranspileError::binding(
                column.id,
                format!("Column [{}] is not resolved.", column.identifier),
            )),
        }
    }

    fn emit_mapping(&self, mapping: &[ColumnMapper], out: &mut String) -> TranspileResult<()> {
        for (i, column) in mapping.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.emit_mapped_column(column, out);
        }
        Ok(())
    }

    /// One physical column, aliased when the alias differs from its name.
    fn emit_mapped_column(&self, column: &ColumnMapper, out: &mut String) {
        out.push_str(&column.name);
        push_alias(column, out);
    }

    /// Projected column: mapped references carry their aliases in the mapping.
    fn emit_column_expr(&self, cx: &mut EmitContext<'_>, column: &ColumnExpr, out: &mut String) -> TranspileResult<()> {
        if let Expr::Column(reference) = &column.expr {
            if let Some(mapping) = cx.mapping(reference.id) {
                return self.emit_mapping(&mapping, out);
            }
        }
        self.emit_expr(cx, &column.expr, out)?;
        if let Some(alias) = column.alias.as_deref() {
            out.push_str(" AS ");
            out.push_str(alias);
        }
        Ok(())
    }

    fn emit_scalar(&self, cx: &mut EmitContext<'_>, scalar: &ScalarExpr, out: &mut String) -> TranspileResult<()> {
        let literal = scalar.literal.as_str();
        let text = match scalar.kind {
            LiteralKind::Boolean => self.bool_literal(is_true_literal(literal)),
            LiteralKind::DateTime => match format_datetime(literal, cx.year_offset) {
                Some(formatted) => self.datetime_literal(&formatted),
                None => literal.to_string(),
            },
            LiteralKind::String => self.string_literal(literal),
            LiteralKind::Uuid => self.uuid_literal(&parse_uuid(literal)?),
            LiteralKind::Entity => self.uuid_literal(&parse_entity(literal)?.1),
            LiteralKind::Binary => self.binary_literal(literal),
            LiteralKind::Number => literal.to_string(),
            LiteralKind::Null => "NULL".to_string(),
        };
        out.push_str(&text);
        Ok(())
    }

    fn emit_variable(&self, _cx: &mut EmitContext<'_>, variable: &VariableReference, out: &mut String) -> TranspileResult<()> {
        out.push_str(&variable.identifier);
        Ok(())
    }

    fn emit_member(&self, _cx: &mut EmitContext<'_>, member: &MemberAccess, out: &mut String) -> TranspileResult<()> {
        out.push_str(&member.parameter_name());
        Ok(())
    }

    fn emit_function(&self, cx: &mut EmitContext<'_>, function: &FunctionExpr, out: &mut String) -> TranspileResult<()> {
        let registry = cx.functions;
        if let Some(udf) = registry.get(&function.name) {
            if let Some(descriptor) = udf.transpile(self.dialect(), cx, function, out)? {
                cx.push_descriptor(descriptor);
            }
            return Ok(());
        }

        if !is_builtin(&function.name) {
            return Err(TranspileError::statement(
                function.id,
                format!("Invalid function name: {}", function.name),
            ));
        }

        if self.emit_builtin(cx, function, out)? {
            return Ok(());
        }

        self.emit_call(cx, &function.name, function, out)
    }

    /// Dialect translation of a builtin; returns false to use the plain call.
    fn emit_builtin(&self, _cx: &mut EmitContext<'_>, _function: &FunctionExpr, _out: &mut String) -> TranspileResult<bool> {
        Ok(false)
    }

    /// `name(args) [OVER(...)]`; EXISTS takes its parentheses from the subquery.
    fn emit_call(&self, cx: &mut EmitContext<'_>, name: &str, function: &FunctionExpr, out: &mut String) -> TranspileResult<()> {
        let exists = function.is("EXISTS");
        out.push_str(name);
        if !exists {
            out.push('(');
        }
        if function.distinct {
            out.push_str("DISTINCT ");
        }
        for (i, arg) in function.args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.emit_argument(cx, function, i, arg, out)?;
        }
        if !exists {
            out.push(')');
        }
        if let Some(over) = &function.over {
            out.push(' ');
            self.emit_over(cx, over, out)?;
        }
        Ok(())
    }

    fn emit_argument(&self, cx: &mut EmitContext<'_>, _function: &FunctionExpr, _index: usize, arg: &Expr, out: &mut String) -> TranspileResult<()> {
        self.emit_expr(cx, arg, out)
    }

    fn emit_over(&self, cx: &mut EmitContext<'_>, over: &OverClause, out: &mut String) -> TranspileResult<()> {
        let mut parts: Vec<String> = Vec::new();
        if !over.partition.is_empty() {
            let mut partition = String::from("PARTITION BY ");
            self.emit_list(cx, &over.partition, ", ", &mut partition)?;
            parts.push(partition);
        }
        if let Some(order) = over.order.as_ref().filter(|order| !order.is_empty()) {
            let mut clause = String::from("ORDER BY ");
            self.emit_order_items(cx, &order.items, &mut clause)?;
            parts.push(clause);
        }
        if let Some(frame) = &over.frame {
            let extent = match (frame.preceding, frame.following) {
                (Some(preceding), Some(following)) => format!("BETWEEN {} AND {}", preceding, following),
                (Some(bound), None) | (None, Some(bound)) => bound.to_string(),
                (None, None) => String::new(),
            };
            if !extent.is_empty() {
                parts.push(format!("{} {}", frame.kind, extent));
            }
        }
        out.push_str("OVER(");
        out.push_str(&parts.join(" "));
        out.push(')');
        Ok(())
    }

    fn emit_case(&self, cx: &mut EmitContext<'_>, case: &CaseExpr, out: &mut String) -> TranspileResult<()> {
        out.push_str("CASE");
        for branch in &case.branches {
            out.push_str(" WHEN ");
            self.emit_expr(cx, &branch.when, out)?;
            out.push_str(" THEN ");
            self.emit_expr(cx, &branch.then, out)?;
        }
        if let Some(otherwise) = &case.otherwise {
            out.push_str(" ELSE ");
            self.emit_expr(cx, otherwise, out)?;
        }
        out.push_str(" END");
        Ok(())
    }

    fn emit_comparison(&self, cx: &mut EmitContext<'_>, comparison: &Comparison, out: &mut String) -> TranspileResult<()> {
        self.emit_expr(cx, &comparison.left, out)?;
        match (comparison.op, comparison.modifier) {
            (CompareOp::Is, Some(CompareModifier::Not)) => out.push_str(" IS NOT "),
            (op, Some(CompareModifier::Not)) => out.push_str(&format!(" NOT {} ", op)),
            (op, Some(CompareModifier::All)) => out.push_str(&format!(" {} ALL ", op)),
            (op, Some(CompareModifier::Any)) => out.push_str(&format!(" {} ANY ", op)),
            (op, None) => out.push_str(&format!(" {} ", op)),
        }
        self.emit_expr(cx, &comparison.right, out)
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    fn emit_ctes(&self, cx: &mut EmitContext<'_>, ctes: &[Cte], out: &mut String) -> TranspileResult<()> {
        if ctes.is_empty() {
            return Ok(());
        }
        out.push_str("WITH ");
        if ctes.iter().any(|cte| visit::query_references(&cte.query, &cte.name)) {
            out.push_str(self.recursive_keyword());
        }
        for (i, cte) in ctes.iter().enumerate() {
            if i > 0 {
                out.push_str(",\n");
            }
            out.push_str(&cte.name);
            out.push_str(" AS\n(");
            self.emit_query(cx, &cte.query, out)?;
            out.push(')');
        }
        out.push('\n');
        Ok(())
    }

    fn emit_query(&self, cx: &mut EmitContext<'_>, query: &QueryExpr, out: &mut String) -> TranspileResult<()> {
        match query {
            QueryExpr::Select(select) => self.emit_select(cx, select, out),
            QueryExpr::Union(union) => self.emit_union(cx, union, out),
        }
    }

    fn emit_union(&self, cx: &mut EmitContext<'_>, union: &UnionExpr, out: &mut String) -> TranspileResult<()> {
        self.emit_query(cx, &union.left, out)?;
        out.push_str(if union.all { "\nUNION ALL\n" } else { "\nUNION\n" });
        self.emit_query(cx, &union.right, out)?;
        if let Some(order) = &union.order {
            self.emit_order(cx, order, out)?;
        }
        Ok(())
    }

    fn emit_select(&self, cx: &mut EmitContext<'_>, select: &SelectExpr, out: &mut String) -> TranspileResult<()> {
        out.push_str("SELECT");
        if select.distinct {
            out.push_str(" DISTINCT");
        }
        if let Some(top) = &select.top {
            self.emit_top(cx, top, out)?;
        }
        out.push('\n');
        for (i, column) in select.columns.iter().enumerate() {
            if i > 0 {
                out.push_str(",\n");
            }
            self.emit_column_expr(cx, column, out)?;
        }
        if let Some(into) = &select.into {
            out.push('\n');
            out.push_str(self.into_keyword());
            out.push(' ');
            out.push_str(&self.table_name(cx, into)?);
        }
        if let Some(from) = &select.from {
            out.push_str("\nFROM ");
            self.emit_table_source(cx, from, out)?;
        }
        if let Some(predicate) = &select.where_ {
            out.push_str("\nWHERE ");
            self.emit_expr(cx, predicate, out)?;
        }
        if !select.group.is_empty() {
            out.push_str("\nGROUP BY\n");
            self.emit_list(cx, &select.group, ",\n", out)?;
        }
        if let Some(having) = &select.having {
            out.push_str("\nHAVING ");
            self.emit_expr(cx, having, out)?;
        }
        if let Some(order) = &select.order {
            self.emit_order(cx, order, out)?;
        }
        if let Some(top) = &select.top {
            self.emit_limit(cx, top, out)?;
        }
        Ok(())
    }

    /// Row limit placed after the SELECT keyword.
    fn emit_top(&self, cx: &mut EmitContext<'_>, top: &Expr, out: &mut String) -> TranspileResult<()> {
        out.push_str(" TOP (");
        self.emit_expr(cx, top, out)?;
        out.push(')');
        Ok(())
    }

    /// Row limit placed at the end of the query.
    fn emit_limit(&self, _cx: &mut EmitContext<'_>, _top: &Expr, _out: &mut String) -> TranspileResult<()> {
        Ok(())
    }

    fn emit_order(&self, cx: &mut EmitContext<'_>, order: &OrderClause, out: &mut String) -> TranspileResult<()> {
        if order.is_empty() {
            return Ok(());
        }
        out.push_str("\nORDER BY\n");
        self.emit_order_items(cx, &order.items, out)?;
        if let Some(offset) = &order.offset {
            out.push_str("\nOFFSET ");
            self.emit_expr(cx, offset, out)?;
            out.push_str(" ROWS");
            if let Some(fetch) = &order.fetch {
                out.push_str("\nFETCH NEXT ");
                self.emit_expr(cx, fetch, out)?;
                out.push_str(" ROWS ONLY");
            }
        }
        Ok(())
    }

    /// Sort keys; multi-column mappings expand to one key per column.
    fn emit_order_items(&self, cx: &mut EmitContext<'_>, items: &[OrderItem], out: &mut String) -> TranspileResult<()> {
        let direction = |item: &OrderItem| if item.descending { " DESC" } else { " ASC" };
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let mapping = match &item.expr {
                Expr::Column(column) => cx.mapping(column.id),
                _ => None,
            };
            match mapping {
                Some(mapping) => {
                    for (m, column) in mapping.iter().enumerate() {
                        if m > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(&column.name);
                        out.push_str(direction(item));
                    }
                }
                None => {
                    self.emit_expr(cx, &item.expr, out)?;
                    out.push_str(direction(item));
                }
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Row sources
    // ---------------------------------------------------------------

    fn emit_table_source(&self, cx: &mut EmitContext<'_>, source: &TableSource, out: &mut String) -> TranspileResult<()> {
        match source {
            TableSource::Table(table) => self.emit_table_ref(cx, table, out),
            TableSource::Derived(derived) => self.emit_derived(cx, derived, out),
            TableSource::Join(join) => self.emit_join(cx, join, out),
        }
    }

    fn emit_derived(&self, cx: &mut EmitContext<'_>, derived: &TableExpression, out: &mut String) -> TranspileResult<()> {
        out.push('(');
        self.emit_query(cx, &derived.query, out)?;
        out.push(')');
        if !derived.alias.is_empty() {
            out.push_str(" AS ");
            out.push_str(&derived.alias);
        }
        Ok(())
    }

    fn emit_join(&self, cx: &mut EmitContext<'_>, join: &TableJoin, out: &mut String) -> TranspileResult<()> {
        self.emit_table_source(cx, &join.left, out)?;

        let (keyword, condition) = match join.kind {
            // the right operand is left for the stream processor
            JoinKind::Append => return Ok(()),
            JoinKind::CrossApply => self.apply_join(false),
            JoinKind::OuterApply => self.apply_join(true),
            _ => ("", ""),
        };

        out.push('\n');
        if keyword.is_empty() {
            out.push_str(&format!("{} JOIN ", join.kind));
        } else {
            out.push_str(keyword);
            out.push(' ');
        }
        self.emit_table_source(cx, &join.right, out)?;

        if !condition.is_empty() {
            out.push_str(condition);
        } else if let Some(on) = &join.on {
            out.push_str("\nON ");
            self.emit_expr(cx, on, out)?;
        }
        Ok(())
    }

    /// Physical name of a table reference without alias.
    fn table_name(&self, cx: &EmitContext<'_>, table: &TableReference) -> TranspileResult<String> {
        match cx.table_binding(table) {
            Some(Binding::Entity(entity)) => Ok(entity.table_name),
            Some(Binding::TableVariable) => Ok(self.table_variable_name(&table.identifier)),
            Some(Binding::TemporaryTable) => Ok(self.temporary_table_name(&table.identifier)),
            Some(Binding::UserDefinedType { table_name }) => {
                Ok(self.user_type_source(&table_name, &table.identifier))
            }
            Some(Binding::CommonTable) | Some(Binding::DerivedTable) => Ok(table.identifier.clone()),
            _ => Err(TranspileError::binding(
                table.id,
                format!("Table [{}] is not resolved.", table.identifier),
            )),
        }
    }

    fn emit_table_ref(&self, cx: &mut EmitContext<'_>, table: &TableReference, out: &mut String) -> TranspileResult<()> {
        let name = self.table_name(cx, table)?;
        out.push_str(&name);
        match table.alias.as_deref() {
            Some(alias) if !alias.is_empty() => {
                out.push_str(" AS ");
                out.push_str(alias);
            }
            _ if name != table.identifier
                && matches!(
                    cx.table_binding(table),
                    Some(Binding::TableVariable) | Some(Binding::TemporaryTable)
                ) =>
            {
                out.push_str(" AS ");
                out.push_str(&table.identifier);
            }
            _ => {}
        }
        if let Some(hint) = cx.hint(table.id) {
            out.push(' ');
            out.push_str(hint);
        }
        Ok(())
    }
}

/// Append ` AS alias` unless the alias repeats the column name.
pub(crate) fn push_alias(column: &ColumnMapper, out: &mut String) {
    if let Some(alias) = column.alias.as_deref() {
        if !alias.is_empty() && alias != column.column_name() {
            out.push_str(" AS ");
            out.push_str(alias);
        }
    }
}
