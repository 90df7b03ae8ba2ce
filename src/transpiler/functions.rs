//! Function registry and deferred function descriptors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::{Expr, FunctionExpr};
use crate::binding::Binding;
use crate::error::{TranspileError, TranspileResult};
use crate::transpiler::EmitContext;
use crate::transpiler::dialect::Dialect;
use crate::transpiler::literals::type_code_hex;

/// Builtin functions passed through (or translated) by the generators.
pub const BUILTINS: &[&str] = &[
    // aggregates
    "COUNT", "SUM", "AVG", "MIN", "MAX", "STRING_AGG",
    // window
    "ROW_NUMBER", "RANK", "DENSE_RANK", "NTILE", "LAG", "LEAD", "FIRST_VALUE", "LAST_VALUE",
    // scalar
    "ISNULL", "COALESCE", "NULLIF", "SUBSTRING", "REPLACE", "CONCAT", "CONCAT_WS", "LOWER",
    "UPPER", "LTRIM", "RTRIM", "TRIM", "CHARLENGTH", "DATALENGTH", "OCTET_LENGTH", "ABS",
    "ROUND", "FLOOR", "CEILING", "EXISTS",
    // platform
    "NOW", "UTC", "NEWUUID", "VECTOR",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.iter().any(|builtin| builtin.eq_ignore_ascii_case(name))
}

/// A function call whose value is supplied by the caller as a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// Upper-cased function name
    pub name: String,
    /// Database parameter the caller must fill
    pub target: String,
    pub args: Vec<Expr>,
}

/// Transpiler extension for a named function.
pub trait UserDefinedFunction: Send + Sync {
    /// Write SQL for `function`; return a descriptor when the value is
    /// deferred to a caller-supplied parameter.
    fn transpile(
        &self,
        dialect: Dialect,
        cx: &mut EmitContext<'_>,
        function: &FunctionExpr,
        out: &mut String,
    ) -> TranspileResult<Option<FunctionDescriptor>>;
}

/// Registry of user-defined functions keyed by upper-cased name.
pub struct FunctionRegistry {
    functions: HashMap<String, Box<dyn UserDefinedFunction>>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry").field("functions", &names).finish()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("TYPEOF", TypeOf);
        registry
    }
}

impl FunctionRegistry {
    /// Registry without the standard functions.
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, function: impl UserDefinedFunction + 'static) {
        self.functions.insert(name.to_uppercase(), Box::new(function));
    }

    pub fn get(&self, name: &str) -> Option<&dyn UserDefinedFunction> {
        self.functions.get(&name.to_uppercase()).map(|f| f.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_uppercase())
    }
}

/// `TYPEOF(entity)`: the entity type code as `binary(4)`.
///
/// Codes known from metadata are inlined; anything else becomes a parameter.
pub struct TypeOf;

impl UserDefinedFunction for TypeOf {
    fn transpile(
        &self,
        dialect: Dialect,
        cx: &mut EmitContext<'_>,
        function: &FunctionExpr,
        out: &mut String,
    ) -> TranspileResult<Option<FunctionDescriptor>> {
        let argument = function.args.first().ok_or_else(|| {
            TranspileError::statement(function.id, "TYPEOF: entity argument is missing.")
        })?;

        let (identifier, code) = match argument {
            Expr::Column(column) => {
                let code = match cx.binding(column.id) {
                    Some(Binding::Entity(entity)) => Some(entity.type_code),
                    Some(Binding::EntityType { type_code }) => Some(*type_code),
                    _ => None,
                };
                (column.identifier.clone(), code)
            }
            Expr::Scalar(scalar) => (scalar.literal.clone(), None),
            _ => {
                return Err(TranspileError::statement(
                    function.id,
                    "TYPEOF: argument must be an entity name.",
                ));
            }
        };

        if let Some(code) = code.filter(|code| *code > 0) {
            out.push_str(&dialect.generator().bytes_literal(&type_code_hex(code)));
            return Ok(None);
        }

        let target = format!("@TYPEOF_{}", identifier.replace('.', "_"));
        out.push_str(&target);
        Ok(Some(FunctionDescriptor {
            name: function.upper_name(),
            target,
            args: function.args.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_case_insensitive() {
        let registry = FunctionRegistry::default();
        assert!(registry.contains("typeof"));
        assert!(registry.get("TypeOf").is_some());
        assert!(registry.get("LOOKUP").is_none());
        assert!(FunctionRegistry::empty().get("TYPEOF").is_none());
    }

    #[test]
    fn test_builtins() {
        assert!(is_builtin("count"));
        assert!(is_builtin("DATALENGTH"));
        assert!(!is_builtin("LOOKUP"));
    }
}
