//! Selections saved under a name, to be shown or run again later.
use crate::SelectionState;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSelection {
    pub name: SelectionName,
    pub state: SelectionState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionName(String);

impl From<String> for SelectionName {
    fn from(value: String) -> Self {
        SelectionName(value)
    }
}

impl From<&str> for SelectionName {
    fn from(value: &str) -> Self {
        SelectionName(value.to_string())
    }
}

impl Display for SelectionName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
