use serde::{Deserialize, Serialize};

/// One row of the `commands` help table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEntry {
    pub prompt: String,
    pub usage: String,
    pub example: String,
}
