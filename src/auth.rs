use crate::{error::SessionError, models::operator::Operator};

/// Supplies the identity of the operator at the scanner. Admissions are attributed to
/// whoever this returns.
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_operator(&self) -> Result<Operator, SessionError>;
}

/// An already-established identity, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    operator: Option<Operator>,
}

impl StaticAuth {
    pub fn signed_in(operator: Operator) -> Self {
        Self {
            operator: Some(operator),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AuthProvider for StaticAuth {
    async fn current_operator(&self) -> Result<Operator, SessionError> {
        self.operator
            .clone()
            .ok_or_else(|| SessionError::Unauthorized("no operator signed in".to_string()))
    }
}
