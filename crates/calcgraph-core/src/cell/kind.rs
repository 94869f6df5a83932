//! Cell kinds

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// How a cell obtains its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum CellKind {
    /// Fixed value, never recomputed
    Constant,
    /// User-supplied value, never recomputed
    Input,
    /// Derived from a formula by the evaluator
    Formula,
}

impl CellKind {
    /// Lowercase name, as used in model files
    pub fn as_str(&self) -> &'static str {
        match self {
            CellKind::Constant => "constant",
            CellKind::Input => "input",
            CellKind::Formula => "formula",
        }
    }

    /// Whether values of this kind may be assigned directly
    pub fn is_writable(&self) -> bool {
        !matches!(self, CellKind::Formula)
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CellKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "constant" => Ok(CellKind::Constant),
            "input" => Ok(CellKind::Input),
            "formula" => Ok(CellKind::Formula),
            _ => Err(Error::UnknownKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_kind() {
        assert_eq!("constant".parse::<CellKind>().unwrap(), CellKind::Constant);
        assert_eq!(" Input ".parse::<CellKind>().unwrap(), CellKind::Input);
        assert_eq!("FORMULA".parse::<CellKind>().unwrap(), CellKind::Formula);
        assert!(matches!(
            "derived".parse::<CellKind>(),
            Err(Error::UnknownKind(_))
        ));
    }

    #[test]
    fn test_writable() {
        assert!(CellKind::Constant.is_writable());
        assert!(CellKind::Input.is_writable());
        assert!(!CellKind::Formula.is_writable());
    }
}
