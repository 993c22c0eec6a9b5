use super::error::PlanError;
use super::money::monthly_installment;
use super::types::{AssetExpensePlan, ChildExpensePlan, LoanTerms, Withdrawal};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledLoan {
    pub installment: f64,
    pub term_months: u32,
}

// One timed expense: fires at (age, month 1). `amount` is the lump actually
// withdrawn at firing — the upfront payment when financed, the full expense
// otherwise.
#[derive(Debug, Clone)]
pub struct ExpenseEvent {
    pub age: u32,
    pub amount: f64,
    pub loan: Option<ScheduledLoan>,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExpenseSchedule {
    pub events: Vec<ExpenseEvent>,
    pub total_upfront_expenses: f64,
    pub total_monthly_emi: f64,
}

impl ExpenseSchedule {
    pub fn events_at(&self, age: u32) -> impl Iterator<Item = &ExpenseEvent> {
        self.events.iter().filter(move |event| event.age == age)
    }

    pub fn withdrawals(&self) -> Vec<Withdrawal> {
        self.events
            .iter()
            .map(|event| Withdrawal {
                age: event.age,
                amount: event.amount,
                reason: event.reason.clone(),
            })
            .collect()
    }
}

pub fn build_expense_schedule(
    current_age: u32,
    children: &[ChildExpensePlan],
    assets: &[AssetExpensePlan],
) -> Result<ExpenseSchedule, PlanError> {
    let mut events = Vec::with_capacity(children.len() * 2 + assets.len());

    for (index, child) in children.iter().enumerate() {
        let label = index + 1;
        events.push(expense_event(
            current_age + child.education_years,
            child.education_expense,
            child.education_loan,
            format!("Child {label} Education Expense"),
            format!("Child {label} Education Upfront Payment"),
        )?);
        events.push(expense_event(
            current_age + child.wedding_years,
            child.wedding_expense,
            child.wedding_loan,
            format!("Child {label} Wedding Expense"),
            format!("Child {label} Wedding Upfront Payment"),
        )?);
    }

    for asset in assets {
        let kind = asset.kind.label();
        events.push(expense_event(
            current_age + asset.years_until_purchase,
            asset.total_cost,
            asset.loan,
            format!("{kind} Purchase"),
            format!("{kind} Upfront Payment"),
        )?);
    }

    // Stable by firing age; ties keep record order (children before assets,
    // education before wedding).
    events.sort_by_key(|event| event.age);

    let total_upfront_expenses = events.iter().map(|event| event.amount).sum();
    let total_monthly_emi = events
        .iter()
        .filter_map(|event| event.loan.map(|loan| loan.installment))
        .sum();

    Ok(ExpenseSchedule {
        events,
        total_upfront_expenses,
        total_monthly_emi,
    })
}

fn expense_event(
    age: u32,
    expense: f64,
    loan: Option<LoanTerms>,
    lump_reason: String,
    upfront_reason: String,
) -> Result<ExpenseEvent, PlanError> {
    match loan {
        Some(terms) => {
            let installment = monthly_installment(
                expense - terms.upfront_payment,
                terms.interest_rate,
                terms.term_months,
            )?;
            Ok(ExpenseEvent {
                age,
                amount: terms.upfront_payment,
                loan: Some(ScheduledLoan {
                    installment,
                    term_months: terms.term_months,
                }),
                reason: upfront_reason,
            })
        }
        None => Ok(ExpenseEvent {
            age,
            amount: expense,
            loan: None,
            reason: lump_reason,
        }),
    }
}
