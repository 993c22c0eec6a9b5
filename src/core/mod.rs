mod engine;
mod error;
mod money;
mod schedule;
mod stages;
mod types;
mod update;

pub use engine::{
    DETAIL_HORIZON_AGE, RECOVERY_INJECTION, SUMMARY_HORIZON_AGE, apply_stage_override,
    apply_summary_stage_override, fire_number, run_projection,
};
pub use error::PlanError;
pub use money::{future_value, monthly_installment, monthly_rate};
pub use schedule::{ExpenseEvent, ExpenseSchedule, ScheduledLoan, build_expense_schedule};
pub use stages::{
    AllocationStage, STAGE_CATALOG, StageOverrides, default_stage_code, stage_by_code,
    stage_return,
};
pub use types::{
    AssetExpensePlan, AssetKind, CancelToken, ChildExpensePlan, IncreaseModel, InflationRates,
    LoanTerms, MonthlyRow, PlanInput, ProjectionResult, SummaryRow, Withdrawal,
};
pub use update::{
    AssetExpenseUpdate, ChildExpenseUpdate, apply_asset_update, apply_child_update,
};
