//! Cell address type

use crate::error::{Error, Result};
use crate::SHEET_SEPARATOR;
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The identity of a cell (e.g., "Sheet1!A1", "A1")
///
/// Addresses are opaque: two addresses are the same cell only if their text is
/// byte-for-byte equal. No case folding or whitespace trimming is applied.
/// Cloning is cheap; the text is shared.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct CellAddress(Arc<str>);

impl CellAddress {
    /// Create an address from its text
    ///
    /// # Examples
    /// ```
    /// use calcgraph_core::CellAddress;
    ///
    /// let addr = CellAddress::new("Refinery!C12").unwrap();
    /// assert_eq!(addr.as_str(), "Refinery!C12");
    ///
    /// assert!(CellAddress::new("").is_err());
    /// ```
    pub fn new<S: AsRef<str>>(text: S) -> Result<Self> {
        let text = text.as_ref();
        if text.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }
        Ok(Self(Arc::from(text)))
    }

    /// Build `"<sheet>!<cell>"`, or just `"<cell>"` when there is no sheet
    pub fn qualify(sheet: Option<&str>, cell: &str) -> Self {
        match sheet {
            Some(sheet) => Self(Arc::from(format!("{sheet}{SHEET_SEPARATOR}{cell}"))),
            None => Self(Arc::from(cell)),
        }
    }

    /// The full address text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The sheet part, if the address is sheet-qualified
    pub fn sheet(&self) -> Option<&str> {
        self.0.rsplit_once(SHEET_SEPARATOR).map(|(sheet, _)| sheet)
    }

    /// The part after the sheet separator (the whole text for bare addresses)
    pub fn cell_name(&self) -> &str {
        self.0
            .rsplit_once(SHEET_SEPARATOR)
            .map_or(&*self.0, |(_, cell)| cell)
    }
}

/// Check whether `text` is a bare cell name: uppercase column letters
/// followed by row digits, with nothing else (e.g. "A1", "AB120").
pub fn is_cell_name(text: &str) -> bool {
    let bytes = text.as_bytes();
    let letters = bytes.iter().take_while(|b| b.is_ascii_uppercase()).count();
    if letters == 0 || letters == bytes.len() {
        return false;
    }
    bytes[letters..].iter().all(|b| b.is_ascii_digit())
}

impl fmt::Debug for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for CellAddress {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for CellAddress {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl From<CellAddress> for String {
    fn from(addr: CellAddress) -> Self {
        addr.0.to_string()
    }
}

impl AsRef<str> for CellAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CellAddress {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for CellAddress {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for CellAddress {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}
