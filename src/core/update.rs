use super::money::future_value;
use super::types::{AssetExpensePlan, AssetKind, ChildExpensePlan, InflationRates, LoanTerms};

// Editing a record is a tagged-union dispatch rather than an open-ended
// property patch: setting a years-until field future-values the stored
// expense over the new horizon with the matching inflation rate, every
// other variant assigns directly. Installments are derived on demand, so
// loan edits need no cached-EMI refresh.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChildExpenseUpdate {
    EducationExpense(f64),
    EducationYears(u32),
    EducationLoan(Option<LoanTerms>),
    WeddingExpense(f64),
    WeddingYears(u32),
    WeddingLoan(Option<LoanTerms>),
}

pub fn apply_child_update(
    child: &mut ChildExpensePlan,
    update: ChildExpenseUpdate,
    rates: &InflationRates,
) {
    match update {
        ChildExpenseUpdate::EducationExpense(value) => child.education_expense = value,
        ChildExpenseUpdate::EducationYears(years) => {
            child.education_expense =
                future_value(child.education_expense, years, rates.education_inflation);
            child.education_years = years;
        }
        ChildExpenseUpdate::EducationLoan(loan) => child.education_loan = loan,
        ChildExpenseUpdate::WeddingExpense(value) => child.wedding_expense = value,
        ChildExpenseUpdate::WeddingYears(years) => {
            child.wedding_expense =
                future_value(child.wedding_expense, years, rates.wedding_inflation);
            child.wedding_years = years;
        }
        ChildExpenseUpdate::WeddingLoan(loan) => child.wedding_loan = loan,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssetExpenseUpdate {
    Kind(AssetKind),
    TotalCost(f64),
    YearsUntilPurchase(u32),
    Loan(Option<LoanTerms>),
}

pub fn apply_asset_update(
    asset: &mut AssetExpensePlan,
    update: AssetExpenseUpdate,
    rates: &InflationRates,
) {
    match update {
        AssetExpenseUpdate::Kind(kind) => asset.kind = kind,
        AssetExpenseUpdate::TotalCost(value) => asset.total_cost = value,
        AssetExpenseUpdate::YearsUntilPurchase(years) => {
            // Home-price inflation covers both asset kinds.
            asset.total_cost = future_value(asset.total_cost, years, rates.home_inflation);
            asset.years_until_purchase = years;
        }
        AssetExpenseUpdate::Loan(loan) => asset.loan = loan,
    }
}
