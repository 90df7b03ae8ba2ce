use uuid::Uuid;

use crate::ast::{Expr, FunctionExpr, MemberAccess, VariableReference};
use crate::binding::{Binding, ColumnMapper, PrimitiveType};
use crate::error::{TranspileError, TranspileResult};
use crate::transpiler::EmitContext;
use crate::transpiler::dialect::Dialect;
use crate::transpiler::literals::escape_string;
use crate::transpiler::sql::sequence_argument;
use crate::transpiler::traits::{SqlGenerator, push_alias};

/// Functions whose arguments are cast to `text`.
const TEXT_ARGUMENTS: &[&str] = &[
    "STRING_AGG", "REPLACE", "CONCAT", "CONCAT_WS", "LOWER", "UPPER", "LTRIM", "RTRIM",
];

pub struct PostgresGenerator;

impl PostgresGenerator {
    fn shifted_clock(&self, clock: &str, years: i32) -> String {
        if years == 0 {
            clock.to_string()
        } else {
            format!("({} + INTERVAL '{} years')", clock, years)
        }
    }

    fn is_string(&self, cx: &EmitContext<'_>, id: crate::ast::NodeId) -> bool {
        matches!(cx.binding(id), Some(Binding::Primitive(PrimitiveType::String)))
    }
}

impl SqlGenerator for PostgresGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn bool_literal(&self, value: bool) -> String {
        if value { "TRUE".to_string() } else { "FALSE".to_string() }
    }

    fn bytes_literal(&self, hex: &str) -> String {
        format!("CAST(E'\\\\x{}' AS bytea)", hex)
    }

    fn string_literal(&self, value: &str) -> String {
        format!("CAST('{}' AS mvarchar)", escape_string(value))
    }

    fn datetime_literal(&self, formatted: &str) -> String {
        format!("'{}'::timestamp", formatted)
    }

    fn binary_literal(&self, literal: &str) -> String {
        match literal {
            "0x00" => "FALSE".to_string(),
            "0x01" => "TRUE".to_string(),
            _ => {
                let digits = literal
                    .strip_prefix("0x")
                    .or_else(|| literal.strip_prefix("0X"))
                    .unwrap_or(literal);
                self.bytes_literal(digits)
            }
        }
    }

    fn user_type_source(&self, table_name: &str, _identifier: &str) -> String {
        format!("UNNEST({})", table_name)
    }

    fn next_value(&self, sequence: &str) -> String {
        format!("nextval('{}')", sequence.to_lowercase())
    }

    fn into_keyword(&self) -> &'static str {
        "INTO TEMPORARY TABLE"
    }

    fn apply_join(&self, outer: bool) -> (&'static str, &'static str) {
        if outer {
            ("LEFT JOIN LATERAL", " ON TRUE")
        } else {
            ("INNER JOIN LATERAL", " ON TRUE")
        }
    }

    fn recursive_keyword(&self) -> &'static str {
        "RECURSIVE "
    }

    fn emit_variable(&self, cx: &mut EmitContext<'_>, variable: &VariableReference, out: &mut String) -> TranspileResult<()> {
        if self.is_string(cx, variable.id) {
            out.push_str(&format!("CAST({} AS mvarchar)", variable.identifier));
        } else {
            out.push_str(&variable.identifier);
        }
        Ok(())
    }

    fn emit_member(&self, cx: &mut EmitContext<'_>, member: &MemberAccess, out: &mut String) -> TranspileResult<()> {
        let parameter = member.parameter_name();
        if self.is_string(cx, member.id) {
            out.push_str(&format!("CAST({} AS mvarchar)", parameter));
        } else {
            out.push_str(&parameter);
        }
        Ok(())
    }

    fn emit_mapped_column(&self, column: &ColumnMapper, out: &mut String) {
        let character = column
            .type_name
            .as_deref()
            .is_some_and(|type_name| type_name.starts_with("char") || type_name.starts_with("text"));
        if character {
            out.push_str(&format!("CAST({} AS mvarchar)", column.name));
            // a cast column has no name of its own
            if let Some(alias) = column.alias.as_deref().filter(|alias| !alias.is_empty()) {
                out.push_str(" AS ");
                out.push_str(alias);
            }
        } else {
            out.push_str(&column.name);
            push_alias(column, out);
        }
    }

    fn emit_top(&self, _cx: &mut EmitContext<'_>, _top: &Expr, _out: &mut String) -> TranspileResult<()> {
        Ok(())
    }

    fn emit_limit(&self, cx: &mut EmitContext<'_>, top: &Expr, out: &mut String) -> TranspileResult<()> {
        out.push_str("\nLIMIT ");
        self.emit_expr(cx, top, out)
    }

    fn emit_builtin(&self, cx: &mut EmitContext<'_>, function: &FunctionExpr, out: &mut String) -> TranspileResult<bool> {
        match function.upper_name().as_str() {
            "NEWUUID" => out.push_str(&self.uuid_literal(&Uuid::new_v4())),
            "ISNULL" => self.emit_call(cx, "COALESCE", function, out)?,
            "CHARLENGTH" => self.emit_call(cx, "LENGTH", function, out)?,
            "DATALENGTH" => {
                let Some(arg) = function.args.first() else {
                    return Err(TranspileError::statement(
                        function.id,
                        "DATALENGTH: value argument is expected.",
                    ));
                };
                out.push_str("OCTET_LENGTH(CAST(");
                self.emit_expr(cx, arg, out)?;
                out.push_str(" AS text))");
            }
            "NOW" => {
                let clock = self.shifted_clock("NOW()", cx.year_offset);
                out.push_str(&format!("{}::timestamp", clock));
            }
            "UTC" => out.push_str(&self.shifted_clock("NOW() AT TIME ZONE 'UTC'", cx.year_offset)),
            "VECTOR" => out.push_str(&self.next_value(&sequence_argument(function)?)),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn emit_argument(&self, cx: &mut EmitContext<'_>, function: &FunctionExpr, index: usize, arg: &Expr, out: &mut String) -> TranspileResult<()> {
        let name = function.upper_name();
        let cast = if name == "SUBSTRING" && index == 0 {
            Some("varchar")
        } else if TEXT_ARGUMENTS.contains(&name.as_str()) {
            Some("text")
        } else {
            None
        };
        match cast {
            Some(type_name) => {
                out.push_str("CAST(");
                self.emit_expr(cx, arg, out)?;
                out.push_str(&format!(" AS {})", type_name));
                Ok(())
            }
            None => self.emit_expr(cx, arg, out),
        }
    }
}
