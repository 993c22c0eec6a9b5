use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    AssetExpensePlan, AssetExpenseUpdate, AssetKind, CancelToken, ChildExpensePlan,
    ChildExpenseUpdate, IncreaseModel, InflationRates, LoanTerms, MonthlyRow, PlanError,
    PlanInput, ProjectionResult, StageOverrides, SummaryRow, Withdrawal, apply_asset_update,
    apply_child_update, run_projection,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliIncreaseModel {
    Yoy,
    Basic,
}

impl From<CliIncreaseModel> for IncreaseModel {
    fn from(value: CliIncreaseModel) -> Self {
        match value {
            CliIncreaseModel::Yoy => IncreaseModel::Yoy,
            CliIncreaseModel::Basic => IncreaseModel::Basic,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiIncreaseModel {
    #[serde(alias = "YOY", alias = "yearOnYear", alias = "year_on_year")]
    Yoy,
    #[serde(alias = "Basic")]
    Basic,
}

impl From<ApiIncreaseModel> for CliIncreaseModel {
    fn from(value: ApiIncreaseModel) -> Self {
        match value {
            ApiIncreaseModel::Yoy => CliIncreaseModel::Yoy,
            ApiIncreaseModel::Basic => CliIncreaseModel::Basic,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiAssetKind {
    #[serde(alias = "House")]
    House,
    #[serde(alias = "Car")]
    Car,
}

impl From<ApiAssetKind> for AssetKind {
    fn from(value: ApiAssetKind) -> Self {
        match value {
            ApiAssetKind::House => AssetKind::House,
            ApiAssetKind::Car => AssetKind::Car,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoanPayload {
    #[serde(default)]
    interest_rate: f64,
    term_months: u32,
    #[serde(default)]
    upfront_payment: f64,
}

impl From<LoanPayload> for LoanTerms {
    fn from(value: LoanPayload) -> Self {
        LoanTerms {
            interest_rate: value.interest_rate,
            term_months: value.term_months,
            upfront_payment: value.upfront_payment,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ChildExpensePayload {
    education_expense: f64,
    education_years: u32,
    education_loan: Option<LoanPayload>,
    wedding_expense: f64,
    wedding_years: u32,
    wedding_loan: Option<LoanPayload>,
}

impl Default for ChildExpensePayload {
    fn default() -> Self {
        Self {
            education_expense: 2_000_000.0,
            education_years: 0,
            education_loan: None,
            wedding_expense: 1_000_000.0,
            wedding_years: 0,
            wedding_loan: None,
        }
    }
}

impl From<ChildExpensePayload> for ChildExpensePlan {
    fn from(value: ChildExpensePayload) -> Self {
        ChildExpensePlan {
            education_expense: value.education_expense,
            education_years: value.education_years,
            education_loan: value.education_loan.map(LoanTerms::from),
            wedding_expense: value.wedding_expense,
            wedding_years: value.wedding_years,
            wedding_loan: value.wedding_loan.map(LoanTerms::from),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AssetExpensePayload {
    kind: ApiAssetKind,
    total_cost: f64,
    years_until_purchase: u32,
    loan: Option<LoanPayload>,
}

impl Default for AssetExpensePayload {
    fn default() -> Self {
        Self {
            kind: ApiAssetKind::House,
            total_cost: 5_000_000.0,
            years_until_purchase: 0,
            loan: None,
        }
    }
}

impl From<AssetExpensePayload> for AssetExpensePlan {
    fn from(value: AssetExpensePayload) -> Self {
        AssetExpensePlan {
            kind: value.kind.into(),
            total_cost: value.total_cost,
            years_until_purchase: value.years_until_purchase,
            loan: value.loan.map(LoanTerms::from),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StageOverridePayload {
    from_age: u32,
    stage_code: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    current_age: Option<u32>,
    retirement_age: Option<u32>,
    lumpsum_investment: Option<f64>,
    initial_sip: Option<f64>,
    annual_increase: Option<f64>,
    current_salary: Option<f64>,
    increase_model: Option<ApiIncreaseModel>,
    average_increments: Option<f64>,
    current_lifestyle_expense: Option<f64>,
    inflation_rate: Option<f64>,
    child_expenses: Option<Vec<ChildExpensePayload>>,
    asset_expenses: Option<Vec<AssetExpensePayload>>,
    stage_overrides: Option<Vec<StageOverridePayload>>,
}

#[derive(Parser, Debug)]
#[command(
    name = "fireplan",
    about = "Retirement projection engine (staged returns, SIP growth, financed major expenses)"
)]
struct Cli {
    #[arg(long, default_value_t = 30)]
    current_age: u32,
    #[arg(long, default_value_t = 58)]
    retirement_age: u32,
    #[arg(long, default_value_t = 4_000_000.0)]
    lumpsum_investment: f64,
    #[arg(long, default_value_t = 10_000.0, help = "Initial monthly contribution")]
    initial_sip: f64,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Annual contribution growth in percent, applied under the YOY model"
    )]
    annual_increase: f64,
    #[arg(long, default_value_t = 30_000.0, help = "Current monthly salary")]
    current_salary: f64,
    #[arg(long, value_enum, default_value_t = CliIncreaseModel::Yoy)]
    increase_model: CliIncreaseModel,
    #[arg(
        long,
        default_value_t = 8.0,
        help = "Average yearly salary increment in percent"
    )]
    average_increments: f64,
    #[arg(
        long,
        default_value_t = 50_000.0,
        help = "Current monthly lifestyle expense"
    )]
    current_lifestyle_expense: f64,
    #[arg(long, default_value_t = 4.0, help = "General inflation in percent")]
    inflation_rate: f64,
    #[arg(long, default_value_t = 9.5, help = "Home price inflation in percent")]
    home_inflation: f64,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Education cost inflation in percent"
    )]
    education_inflation: f64,
    #[arg(long, default_value_t = 10.0, help = "Wedding cost inflation in percent")]
    wedding_inflation: f64,
}

#[derive(Debug)]
struct ApiRequest {
    plan: PlanInput,
    children: Vec<ChildExpensePlan>,
    assets: Vec<AssetExpensePlan>,
    overrides: StageOverrides,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    fire_number: f64,
    final_salary: f64,
    final_monthly_contribution: f64,
    total_upfront_expenses: f64,
    total_monthly_emi: f64,
    summary: Vec<SummaryRow>,
    detailed: Vec<MonthlyRow>,
    withdrawals: Vec<Withdrawal>,
}

impl From<ProjectionResult> for SimulateResponse {
    fn from(result: ProjectionResult) -> Self {
        SimulateResponse {
            fire_number: result.fire_number,
            final_salary: result.final_salary,
            final_monthly_contribution: result.final_monthly_contribution,
            total_upfront_expenses: result.total_upfront_expenses,
            total_monthly_emi: result.total_monthly_emi,
            summary: result.summary,
            detailed: result.detailed,
            withdrawals: result.withdrawals,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_plan(cli: &Cli) -> PlanInput {
    PlanInput {
        current_age: cli.current_age,
        retirement_age: cli.retirement_age,
        lumpsum_investment: cli.lumpsum_investment,
        initial_sip: cli.initial_sip,
        annual_increase: cli.annual_increase,
        current_salary: cli.current_salary,
        increase_model: cli.increase_model.into(),
        average_increments: cli.average_increments,
        current_lifestyle_expense: cli.current_lifestyle_expense,
        inflation_rate: cli.inflation_rate,
    }
}

fn api_request_from_payload(payload: SimulatePayload) -> ApiRequest {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.current_age {
        cli.current_age = v;
    }
    if let Some(v) = payload.retirement_age {
        cli.retirement_age = v;
    }
    if let Some(v) = payload.lumpsum_investment {
        cli.lumpsum_investment = v;
    }
    if let Some(v) = payload.initial_sip {
        cli.initial_sip = v;
    }
    if let Some(v) = payload.annual_increase {
        cli.annual_increase = v;
    }
    if let Some(v) = payload.current_salary {
        cli.current_salary = v;
    }
    if let Some(v) = payload.increase_model {
        cli.increase_model = v.into();
    }
    if let Some(v) = payload.average_increments {
        cli.average_increments = v;
    }
    if let Some(v) = payload.current_lifestyle_expense {
        cli.current_lifestyle_expense = v;
    }
    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }

    let children = payload
        .child_expenses
        .unwrap_or_default()
        .into_iter()
        .map(ChildExpensePlan::from)
        .collect();
    let assets = payload
        .asset_expenses
        .unwrap_or_default()
        .into_iter()
        .map(AssetExpensePlan::from)
        .collect();

    let mut overrides = StageOverrides::new();
    for entry in payload.stage_overrides.unwrap_or_default() {
        overrides.set(entry.from_age, entry.stage_code);
    }

    ApiRequest {
        plan: build_plan(&cli),
        children,
        assets,
        overrides,
    }
}

fn default_cli_for_api() -> Cli {
    Cli {
        current_age: 30,
        retirement_age: 58,
        lumpsum_investment: 4_000_000.0,
        initial_sip: 10_000.0,
        annual_increase: 10.0,
        current_salary: 30_000.0,
        increase_model: CliIncreaseModel::Yoy,
        average_increments: 8.0,
        current_lifestyle_expense: 50_000.0,
        inflation_rate: 4.0,
        home_inflation: 9.5,
        education_inflation: 10.0,
        wedding_inflation: 10.0,
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RatesPayload {
    home_inflation: f64,
    education_inflation: f64,
    wedding_inflation: f64,
}

impl Default for RatesPayload {
    fn default() -> Self {
        let cli = default_cli_for_api();
        Self {
            home_inflation: cli.home_inflation,
            education_inflation: cli.education_inflation,
            wedding_inflation: cli.wedding_inflation,
        }
    }
}

impl From<RatesPayload> for InflationRates {
    fn from(value: RatesPayload) -> Self {
        InflationRates {
            home_inflation: value.home_inflation,
            education_inflation: value.education_inflation,
            wedding_inflation: value.wedding_inflation,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", tag = "field", content = "value")]
enum ChildUpdatePayload {
    EducationExpense(f64),
    EducationYears(u32),
    EducationLoan(Option<LoanPayload>),
    WeddingExpense(f64),
    WeddingYears(u32),
    WeddingLoan(Option<LoanPayload>),
}

impl From<ChildUpdatePayload> for ChildExpenseUpdate {
    fn from(value: ChildUpdatePayload) -> Self {
        match value {
            ChildUpdatePayload::EducationExpense(v) => ChildExpenseUpdate::EducationExpense(v),
            ChildUpdatePayload::EducationYears(v) => ChildExpenseUpdate::EducationYears(v),
            ChildUpdatePayload::EducationLoan(v) => {
                ChildExpenseUpdate::EducationLoan(v.map(LoanTerms::from))
            }
            ChildUpdatePayload::WeddingExpense(v) => ChildExpenseUpdate::WeddingExpense(v),
            ChildUpdatePayload::WeddingYears(v) => ChildExpenseUpdate::WeddingYears(v),
            ChildUpdatePayload::WeddingLoan(v) => {
                ChildExpenseUpdate::WeddingLoan(v.map(LoanTerms::from))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", tag = "field", content = "value")]
enum AssetUpdatePayload {
    Kind(ApiAssetKind),
    TotalCost(f64),
    YearsUntilPurchase(u32),
    Loan(Option<LoanPayload>),
}

impl From<AssetUpdatePayload> for AssetExpenseUpdate {
    fn from(value: AssetUpdatePayload) -> Self {
        match value {
            AssetUpdatePayload::Kind(v) => AssetExpenseUpdate::Kind(v.into()),
            AssetUpdatePayload::TotalCost(v) => AssetExpenseUpdate::TotalCost(v),
            AssetUpdatePayload::YearsUntilPurchase(v) => {
                AssetExpenseUpdate::YearsUntilPurchase(v)
            }
            AssetUpdatePayload::Loan(v) => AssetExpenseUpdate::Loan(v.map(LoanTerms::from)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChildRevaluePayload {
    #[serde(default)]
    rates: RatesPayload,
    #[serde(default)]
    child: ChildExpensePayload,
    update: ChildUpdatePayload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChildRevalueResponse {
    education_expense: f64,
    education_years: u32,
    education_installment: f64,
    wedding_expense: f64,
    wedding_years: u32,
    wedding_installment: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetRevaluePayload {
    #[serde(default)]
    rates: RatesPayload,
    #[serde(default)]
    asset: AssetExpensePayload,
    update: AssetUpdatePayload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssetRevalueResponse {
    kind: &'static str,
    total_cost: f64,
    years_until_purchase: u32,
    emi: f64,
    cumulative_emi: f64,
}

fn child_revalue(payload: ChildRevaluePayload) -> Result<ChildRevalueResponse, PlanError> {
    let mut child = ChildExpensePlan::from(payload.child);
    apply_child_update(&mut child, payload.update.into(), &payload.rates.into());
    Ok(ChildRevalueResponse {
        education_installment: child.education_installment()?,
        wedding_installment: child.wedding_installment()?,
        education_expense: child.education_expense,
        education_years: child.education_years,
        wedding_expense: child.wedding_expense,
        wedding_years: child.wedding_years,
    })
}

fn asset_revalue(payload: AssetRevaluePayload) -> Result<AssetRevalueResponse, PlanError> {
    let mut asset = AssetExpensePlan::from(payload.asset);
    apply_asset_update(&mut asset, payload.update.into(), &payload.rates.into());
    Ok(AssetRevalueResponse {
        kind: asset.kind.label(),
        emi: asset.monthly_emi()?,
        cumulative_emi: asset.cumulative_emi()?,
        total_cost: asset.total_cost,
        years_until_purchase: asset.years_until_purchase,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/child/revalue", post(child_revalue_handler))
        .route("/api/asset/revalue", post(asset_revalue_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    log::info!("projection API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = api_request_from_payload(payload);
    match run_projection(
        &request.plan,
        &request.children,
        &request.assets,
        &request.overrides,
        &CancelToken::new(),
    ) {
        Ok(result) => json_response(StatusCode::OK, SimulateResponse::from(result)),
        Err(err) => plan_error_response(err),
    }
}

async fn child_revalue_handler(Json(payload): Json<ChildRevaluePayload>) -> Response {
    match child_revalue(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => plan_error_response(err),
    }
}

async fn asset_revalue_handler(Json(payload): Json<AssetRevaluePayload>) -> Response {
    match asset_revalue(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => plan_error_response(err),
    }
}

fn plan_error_response(err: PlanError) -> Response {
    let status = if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    log::warn!("request failed: {err}");
    error_response(status, &err.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
