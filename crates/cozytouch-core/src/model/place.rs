use serde::Serialize;

/// A room or zone as named by the account owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Place {
    pub id: String,
    pub name: String,
}
