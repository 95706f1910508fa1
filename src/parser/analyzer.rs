use std::*;
use collections::HashMap;

use itertools::Itertools;
use log::debug;
use multimap::MultiMap;

use crate::error::SemanticError;
use crate::symbol::{Symbol, SymbolId, Type};

const NAME_COLUMN_WIDTH: usize = 20;
const TYPE_COLUMN_WIDTH: usize = 30;
const DEF_COLUMN_WIDTH: usize = 4;
const REPORT_RULE: &str =
    "--------------------------------------------------------------------------";

/// A name read in a declaration whose type has not been parsed yet.
#[derive(Debug, Clone)]
struct PendingName {
    name: String,
    is_parameter: bool,
    def_line: usize,
}

type Scope = HashMap<String, SymbolId>;

/// Every name the program declares, reachable through the scope it lives in.
///
/// Symbols are stored once in an arena and never removed, so the
/// cross-reference report still sees procedure locals after their scope
/// has been left.
#[derive(Debug, Default)]
pub(crate) struct ScopeTable {
    symbols: Vec<Symbol>,
    global: Scope,
    local: Scope,
    pending: Vec<PendingName>,
    combined: MultiMap<String, SymbolId>,
    current_procedure: Option<(String, SymbolId)>,
}

impl ScopeTable {
    pub(crate) fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub(crate) fn current_procedure(&self) -> Option<&str> {
        self.current_procedure.as_ref().map(|(name, _)| name.as_str())
    }

    fn destination(&self) -> &Scope {
        match self.current_procedure {
            None => &self.global,
            Some(_) => &self.local,
        }
    }

    /// Records a declared name until its type is known. The name belongs to
    /// the procedure being compiled, or to the program when there is none.
    pub(crate) fn declare_pending(
        &mut self,
        name: &str,
        is_parameter: bool,
        def_line: usize,
    ) -> Result<(), SemanticError> {
        if self.pending.iter().any(|p| p.name == name) || self.destination().contains_key(name) {
            return Err(SemanticError::MultipleDefinition { name: name.to_string() });
        }
        self.pending.push(PendingName {
            name: name.to_string(),
            is_parameter,
            def_line,
        });
        Ok(())
    }

    /// Gives every pending name the type `ty` and moves it into its scope.
    /// Completed formal parameters are appended to the owning procedure's
    /// parameter list in declaration order.
    pub(crate) fn attach_type(&mut self, ty: &Type) -> Vec<SymbolId> {
        let procedure = self.current_procedure.clone();
        let mut completed = vec![];
        for pending in mem::take(&mut self.pending) {
            let id = SymbolId(self.symbols.len());
            debug!(
                "declared {} : {} (line {}, {})",
                pending.name,
                ty,
                pending.def_line,
                procedure.as_ref().map_or("global", |(name, _)| name.as_str())
            );
            self.symbols.push(Symbol {
                name: pending.name.clone(),
                procedure: procedure.as_ref().map(|(name, _)| name.clone()),
                ty: Some(ty.clone()),
                is_parameter: pending.is_parameter,
                def_line: pending.def_line,
                ref_lines: vec![],
            });
            self.combined.insert(pending.name.clone(), id);
            match &procedure {
                None => {
                    self.global.insert(pending.name, id);
                }
                Some((_, owner)) => {
                    self.local.insert(pending.name, id);
                    if pending.is_parameter {
                        if let Some(Type::Procedure { params }) = &mut self.symbols[owner.0].ty {
                            params.push(ty.clone());
                        }
                    }
                }
            }
            completed.push(id);
        }
        completed
    }

    /// Looks `name` up for a use on `line`: the current procedure's locals
    /// first, then the globals. The use is recorded for the report.
    pub(crate) fn resolve(&mut self, name: &str, line: usize) -> Result<SymbolId, SemanticError> {
        let id = match self.local.get(name) {
            Some(id) => *id,
            None => {
                if let Some((procedure, _)) = &self.current_procedure {
                    if procedure == name {
                        return Err(SemanticError::RecursiveCall { name: name.to_string() });
                    }
                }
                match self.global.get(name) {
                    Some(id) => *id,
                    None => return Err(SemanticError::Undeclared { name: name.to_string() }),
                }
            }
        };
        self.symbols[id.0].ref_lines.push(line);
        Ok(id)
    }

    /// Opens the local scope of the already declared procedure `name`.
    pub(crate) fn enter_procedure(&mut self, name: &str) -> Result<(), SemanticError> {
        let id = match self.global.get(name) {
            Some(id) => *id,
            None => return Err(SemanticError::Undeclared { name: name.to_string() }),
        };
        debug!("entering procedure {}", name);
        self.current_procedure = Some((name.to_string(), id));
        Ok(())
    }

    pub(crate) fn leave_procedure(&mut self) {
        if let Some((name, _)) = self.current_procedure.take() {
            debug!("leaving procedure {} ({} local names)", name, self.local.len());
        }
        self.local.clear();
    }

    /// Renders every declared name, sorted by name with the global one first.
    pub(crate) fn cross_reference(&self) -> String {
        let mut report = format!(
            "{}\n{:<name_w$}{:<type_w$}Def. | Ref.\n",
            REPORT_RULE,
            "Name",
            "Type",
            name_w = NAME_COLUMN_WIDTH,
            type_w = TYPE_COLUMN_WIDTH
        );
        let rows = self
            .combined
            .iter_all()
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
            .flat_map(|(_, ids)| {
                ids.iter()
                    .map(|id| self.symbol(*id))
                    .sorted_by(|a, b| a.procedure.cmp(&b.procedure))
            });
        for symbol in rows {
            let ty = symbol.ty.as_ref().map(|t| t.to_string()).unwrap_or_default();
            report.push_str(&format!(
                "{:<name_w$}{:<type_w$}{:>def_w$} | {}\n",
                symbol.qualified_name(),
                ty,
                symbol.def_line,
                symbol.ref_lines.iter().join(","),
                name_w = NAME_COLUMN_WIDTH,
                type_w = TYPE_COLUMN_WIDTH,
                def_w = DEF_COLUMN_WIDTH
            ));
        }
        report.push_str(REPORT_RULE);
        report.push('\n');
        report
    }
}

#[cfg(test)]
mod tests {
    use crate::symbol::StandardType;

    use super::*;

    fn declare(table: &mut ScopeTable, names: &[&str], ty: Type, line: usize) -> Vec<SymbolId> {
        for name in names {
            table.declare_pending(name, false, line).unwrap();
        }
        table.attach_type(&ty)
    }

    #[test]
    fn test_declared_names_are_resolved() {
        let mut table = ScopeTable::default();
        let ids = declare(&mut table, &["a", "b"], Type::Integer, 2);
        assert_eq!(ids.len(), 2);
        assert_eq!(table.symbol(ids[1]).storage_label(), "$b");
        let id = table.resolve("a", 5).unwrap();
        let sym = table.symbol(id);
        assert_eq!(sym.ty, Some(Type::Integer));
        assert_eq!(sym.ref_lines, vec![5]);
        assert_eq!(
            table.resolve("c", 6),
            Err(SemanticError::Undeclared { name: "c".to_string() })
        );
    }

    #[test]
    fn test_multiple_definition() {
        let mut table = ScopeTable::default();
        table.declare_pending("a", false, 1).unwrap();
        assert_eq!(
            table.declare_pending("a", false, 1),
            Err(SemanticError::MultipleDefinition { name: "a".to_string() })
        );
        table.attach_type(&Type::Char);
        assert!(table.declare_pending("a", false, 2).is_err());
    }

    #[test]
    fn test_locals_shadow_globals() {
        let mut table = ScopeTable::default();
        declare(&mut table, &["x"], Type::Integer, 1);
        declare(&mut table, &["q"], Type::procedure(), 2);
        table.enter_procedure("q").unwrap();
        table.declare_pending("x", true, 2).unwrap();
        table.attach_type(&Type::Char);
        let id = table.resolve("x", 3).unwrap();
        let sym = table.symbol(id);
        assert_eq!(sym.ty, Some(Type::Char));
        assert_eq!(sym.storage_label(), "$x%q");
        assert!(sym.is_parameter);
        table.leave_procedure();

        let id = table.resolve("x", 4).unwrap();
        assert_eq!(table.symbol(id).ty, Some(Type::Integer));
        let id = table.resolve("q", 5).unwrap();
        assert_eq!(
            table.symbol(id).ty,
            Some(Type::Procedure { params: vec![Type::Char] })
        );
    }

    #[test]
    fn test_parameters_are_appended_in_order() {
        let mut table = ScopeTable::default();
        let q = declare(&mut table, &["q"], Type::procedure(), 1)[0];
        table.enter_procedure("q").unwrap();
        table.declare_pending("a", true, 1).unwrap();
        table.declare_pending("b", true, 1).unwrap();
        table.attach_type(&Type::Integer);
        table.declare_pending("c", true, 1).unwrap();
        table.attach_type(&Type::Boolean);
        declare(&mut table, &["tmp"], Type::Char, 2);
        assert_eq!(
            table.symbol(q).ty,
            Some(Type::Procedure {
                params: vec![Type::Integer, Type::Integer, Type::Boolean]
            })
        );
    }

    #[test]
    fn test_recursive_call() {
        let mut table = ScopeTable::default();
        declare(&mut table, &["q"], Type::procedure(), 1);
        table.enter_procedure("q").unwrap();
        assert_eq!(
            table.resolve("q", 1),
            Err(SemanticError::RecursiveCall { name: "q".to_string() })
        );
    }

    #[test]
    fn test_cross_reference() {
        let mut table = ScopeTable::default();
        declare(&mut table, &["n"], Type::array(StandardType::Char, 10), 2);
        declare(&mut table, &["a"], Type::Integer, 3);
        declare(&mut table, &["p"], Type::procedure(), 4);
        table.enter_procedure("p").unwrap();
        table.declare_pending("a", true, 4).unwrap();
        table.attach_type(&Type::Boolean);
        table.resolve("a", 5).unwrap();
        table.leave_procedure();
        table.resolve("a", 7).unwrap();
        table.resolve("a", 8).unwrap();
        table.resolve("p", 8).unwrap();

        let expected = [
            REPORT_RULE.to_string(),
            format!("{:<20}{:<30}Def. | Ref.", "Name", "Type"),
            format!("{:<20}{:<30}   3 | 7,8", "a", "integer"),
            format!("{:<20}{:<30}   4 | 5", "a:p", "boolean"),
            format!("{:<20}{:<30}   2 | ", "n", "array[10] of char"),
            format!("{:<20}{:<30}   4 | 8", "p", "procedure(boolean)"),
            REPORT_RULE.to_string(),
        ];
        assert_eq!(table.cross_reference(), expected.join("\n") + "\n");
    }
}
