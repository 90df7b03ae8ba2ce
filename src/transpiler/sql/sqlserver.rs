use crate::ast::FunctionExpr;
use crate::error::TranspileResult;
use crate::transpiler::EmitContext;
use crate::transpiler::dialect::Dialect;
use crate::transpiler::sql::sequence_argument;
use crate::transpiler::traits::SqlGenerator;

pub struct SqlServerGenerator;

impl SqlServerGenerator {
    fn shifted_clock(&self, clock: &str, years: i32) -> String {
        if years == 0 {
            clock.to_string()
        } else {
            format!("DATEADD(year, {}, {})", years, clock)
        }
    }
}

impl SqlGenerator for SqlServerGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    fn table_variable_name(&self, name: &str) -> String {
        format!("@{}", name.trim_start_matches('@'))
    }

    fn temporary_table_name(&self, name: &str) -> String {
        format!("#{}", name.trim_start_matches('#'))
    }

    fn emit_builtin(&self, cx: &mut EmitContext<'_>, function: &FunctionExpr, out: &mut String) -> TranspileResult<bool> {
        match function.upper_name().as_str() {
            "NOW" => out.push_str(&self.shifted_clock("GETDATE()", cx.year_offset)),
            "UTC" => out.push_str(&self.shifted_clock("GETUTCDATE()", cx.year_offset)),
            "NEWUUID" => out.push_str("NEWID()"),
            "VECTOR" => out.push_str(&self.next_value(&sequence_argument(function)?)),
            "CHARLENGTH" => self.emit_call(cx, "LEN", function, out)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}
