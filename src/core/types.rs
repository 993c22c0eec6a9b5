use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::error::PlanError;
use super::money::monthly_installment;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IncreaseModel {
    Yoy,
    Basic,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AssetKind {
    House,
    Car,
}

impl AssetKind {
    pub fn label(self) -> &'static str {
        match self {
            AssetKind::House => "House",
            AssetKind::Car => "Car",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanTerms {
    pub interest_rate: f64,
    pub term_months: u32,
    pub upfront_payment: f64,
}

#[derive(Debug, Clone)]
pub struct PlanInput {
    pub current_age: u32,
    pub retirement_age: u32,
    pub lumpsum_investment: f64,
    pub initial_sip: f64,
    pub annual_increase: f64,
    pub current_salary: f64,
    pub increase_model: IncreaseModel,
    pub average_increments: f64,
    pub current_lifestyle_expense: f64,
    pub inflation_rate: f64,
}

// Expense amounts are stored already future-valued; editing a years-until
// field revalues them (see update.rs).
#[derive(Debug, Clone)]
pub struct ChildExpensePlan {
    pub education_expense: f64,
    pub education_years: u32,
    pub education_loan: Option<LoanTerms>,
    pub wedding_expense: f64,
    pub wedding_years: u32,
    pub wedding_loan: Option<LoanTerms>,
}

impl ChildExpensePlan {
    pub fn education_installment(&self) -> Result<f64, PlanError> {
        installment_for(self.education_expense, self.education_loan)
    }

    pub fn wedding_installment(&self) -> Result<f64, PlanError> {
        installment_for(self.wedding_expense, self.wedding_loan)
    }
}

#[derive(Debug, Clone)]
pub struct AssetExpensePlan {
    pub kind: AssetKind,
    pub total_cost: f64,
    pub years_until_purchase: u32,
    pub loan: Option<LoanTerms>,
}

impl AssetExpensePlan {
    pub fn monthly_emi(&self) -> Result<f64, PlanError> {
        installment_for(self.total_cost, self.loan)
    }

    pub fn cumulative_emi(&self) -> Result<f64, PlanError> {
        match self.loan {
            Some(terms) => Ok(self.monthly_emi()? * terms.term_months as f64),
            None => Ok(0.0),
        }
    }
}

fn installment_for(expense: f64, loan: Option<LoanTerms>) -> Result<f64, PlanError> {
    match loan {
        Some(terms) => monthly_installment(
            expense - terms.upfront_payment,
            terms.interest_rate,
            terms.term_months,
        ),
        None => Ok(0.0),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InflationRates {
    pub home_inflation: f64,
    pub education_inflation: f64,
    pub wedding_inflation: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub age: u32,
    pub portfolio_value: f64,
    pub current_value: f64,
    pub stage: u32,
    pub stage_return: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRow {
    pub age: u32,
    pub month: u32,
    pub portfolio_value: f64,
    pub emi: f64,
    pub lifestyle_expense: f64,
    pub major_expense: f64,
    pub stage: u32,
    pub stage_return: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub age: u32,
    pub amount: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub summary: Vec<SummaryRow>,
    pub detailed: Vec<MonthlyRow>,
    pub fire_number: f64,
    pub final_salary: f64,
    pub final_monthly_contribution: f64,
    pub total_upfront_expenses: f64,
    pub total_monthly_emi: f64,
    pub withdrawals: Vec<Withdrawal>,
}

// Shared flag a caller can flip to abandon an in-flight recomputation;
// the engine polls it once per simulated month.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
