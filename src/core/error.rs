use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("invalid plan input `{field}`: {reason}")]
    InvalidPlan { field: &'static str, reason: String },
    #[error("invalid child expense {index}, field `{field}`: {reason}")]
    InvalidChildExpense {
        index: usize,
        field: &'static str,
        reason: String,
    },
    #[error("invalid asset expense {index}, field `{field}`: {reason}")]
    InvalidAssetExpense {
        index: usize,
        field: &'static str,
        reason: String,
    },
    #[error("loan term must be at least one month")]
    InvalidTerm,
    #[error("non-finite {context} at age {age}")]
    NonFinite { context: &'static str, age: u32 },
    #[error("projection cancelled")]
    Cancelled,
}

impl PlanError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PlanError::InvalidPlan { .. }
                | PlanError::InvalidChildExpense { .. }
                | PlanError::InvalidAssetExpense { .. }
                | PlanError::InvalidTerm
        )
    }
}
