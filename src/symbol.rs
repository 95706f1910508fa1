use std::fmt;

use itertools::Itertools;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum StandardType {
    Integer,
    Char,
    Boolean,
}

impl fmt::Display for StandardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                StandardType::Integer => "integer",
                StandardType::Char => "char",
                StandardType::Boolean => "boolean",
            }
        )
    }
}

/// Type of a declared name or of an expression.
///
/// Array elements are always standard types and procedure parameters are
/// always standard types too, so nesting never goes deeper than one level.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Type {
    Integer,
    Char,
    Boolean,
    Array { element: StandardType, size: u16 },
    Procedure { params: Vec<Type> },
}

impl Type {
    pub(crate) fn standard(kind: StandardType) -> Self {
        match kind {
            StandardType::Integer => Type::Integer,
            StandardType::Char => Type::Char,
            StandardType::Boolean => Type::Boolean,
        }
    }

    pub(crate) fn array(element: StandardType, size: u16) -> Self {
        Type::Array { element, size }
    }

    pub(crate) fn procedure() -> Self {
        Type::Procedure { params: vec![] }
    }

    pub(crate) fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    /// The standard type of a scalar, or the element type of an array.
    pub(crate) fn element(&self) -> Option<StandardType> {
        match self {
            Type::Integer => Some(StandardType::Integer),
            Type::Char => Some(StandardType::Char),
            Type::Boolean => Some(StandardType::Boolean),
            Type::Array { element, .. } => Some(*element),
            Type::Procedure { .. } => None,
        }
    }

    /// `Some` only for the three scalar types.
    pub(crate) fn as_standard(&self) -> Option<StandardType> {
        if self.is_array() {
            return None;
        }
        self.element()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer | Type::Char | Type::Boolean => {
                write!(f, "{}", self.element().map(|t| t.to_string()).unwrap_or_default())
            }
            Type::Array { element, size } => write!(f, "array[{}] of {}", size, element),
            Type::Procedure { params } => {
                write!(f, "procedure({})", params.iter().join(","))
            }
        }
    }
}

/// Index of a symbol in the combined table; stays valid for the whole compilation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct SymbolId(pub(crate) usize);

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Symbol {
    pub(crate) name: String,
    pub(crate) procedure: Option<String>,
    pub(crate) ty: Option<Type>,
    pub(crate) is_parameter: bool,
    pub(crate) def_line: usize,
    pub(crate) ref_lines: Vec<usize>,
}

impl Symbol {
    /// Label of the storage reserved for this name in the generated code.
    pub(crate) fn storage_label(&self) -> String {
        match &self.procedure {
            None => format!("${}", self.name),
            Some(procedure) => format!("${}%{}", self.name, procedure),
        }
    }

    /// Name as shown in the cross-reference table.
    pub(crate) fn qualified_name(&self) -> String {
        match &self.procedure {
            None => self.name.clone(),
            Some(procedure) => format!("{}:{}", self.name, procedure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(Type::Char.to_string(), "char");
        assert_eq!(Type::array(StandardType::Boolean, 12).to_string(), "array[12] of boolean");
        assert_eq!(
            Type::Procedure { params: vec![Type::Integer, Type::Char] }.to_string(),
            "procedure(integer,char)"
        );
        assert_eq!(Type::procedure().to_string(), "procedure()");
    }

    #[test]
    fn test_element_and_standard() {
        let arr = Type::array(StandardType::Integer, 3);
        assert!(arr.is_array());
        assert_eq!(arr.element(), Some(StandardType::Integer));
        assert_eq!(arr.as_standard(), None);
        assert_eq!(Type::Boolean.as_standard(), Some(StandardType::Boolean));
        assert_eq!(Type::procedure().element(), None);
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(Type::array(StandardType::Char, 4), Type::array(StandardType::Char, 4));
        assert_ne!(Type::array(StandardType::Char, 4), Type::array(StandardType::Char, 5));
        assert_ne!(Type::array(StandardType::Char, 4), Type::Char);
    }

    #[test]
    fn test_labels() {
        let mut sym = Symbol {
            name: "x".to_string(),
            procedure: None,
            ty: Some(Type::Integer),
            is_parameter: false,
            def_line: 1,
            ref_lines: vec![],
        };
        assert_eq!(sym.storage_label(), "$x");
        assert_eq!(sym.qualified_name(), "x");
        sym.procedure = Some("q".to_string());
        assert_eq!(sym.storage_label(), "$x%q");
        assert_eq!(sym.qualified_name(), "x:q");
    }
}
