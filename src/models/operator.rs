use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type OperatorId = Uuid;

/// The staff member driving a check-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: OperatorId,
    pub email: String,
}

impl Operator {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: OperatorId::new_v4(),
            email: email.into(),
        }
    }
}
