use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{
    ComparisonReport, EngineError, InstallmentGrowthPolicy, RetirementPlan, SavingsRatePoint,
    SimulationParameters, required_monthly_savings, required_savings_grid, run_comparison,
    savings_rate_curve, savings_rate_to_retire,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliInstallmentGrowth {
    AllRemaining,
    CurrentOnly,
}

impl From<CliInstallmentGrowth> for InstallmentGrowthPolicy {
    fn from(value: CliInstallmentGrowth) -> Self {
        match value {
            CliInstallmentGrowth::AllRemaining => InstallmentGrowthPolicy::AllRemaining,
            CliInstallmentGrowth::CurrentOnly => InstallmentGrowthPolicy::CurrentOnly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiInstallmentGrowth {
    #[serde(alias = "allRemaining", alias = "all_remaining", alias = "all")]
    AllRemaining,
    #[serde(alias = "currentOnly", alias = "current_only", alias = "current")]
    CurrentOnly,
}

impl From<ApiInstallmentGrowth> for CliInstallmentGrowth {
    fn from(value: ApiInstallmentGrowth) -> Self {
        match value {
            ApiInstallmentGrowth::AllRemaining => CliInstallmentGrowth::AllRemaining,
            ApiInstallmentGrowth::CurrentOnly => CliInstallmentGrowth::CurrentOnly,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ComparePayload {
    property_value: Option<f64>,
    available_cash: Option<f64>,
    initial_monthly_saving: Option<f64>,
    current_rent: Option<f64>,
    monthly_inflation_rate: Option<f64>,
    monthly_investment_return_rate: Option<f64>,
    monthly_property_appreciation_rate: Option<f64>,
    monthly_property_appreciation_rate_post_purchase: Option<f64>,
    horizon_months: Option<u32>,
    monthly_loan_rate: Option<f64>,
    number_of_installments: Option<u32>,
    months_to_stop_paying_rent: Option<u32>,
    installment_growth: Option<ApiInstallmentGrowth>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RetirementSavingsPayload {
    wanted_buy_power: Option<f64>,
    years_to_retire: Option<u32>,
    current_capital: Option<f64>,
    monthly_inflation_rate: Option<f64>,
    monthly_investment_return_rate: Option<f64>,
    include_grid: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SavingsRatePayload {
    months_to_retire: Option<u32>,
    monthly_inflation_rate: Option<f64>,
    monthly_investment_return_rate: Option<f64>,
    savings_grow_with_inflation: Option<bool>,
}

/// Rates are entered in percent per month, e.g. `--monthly-inflation-rate 0.41`.
#[derive(Parser, Debug)]
#[command(
    name = "property-compare compare",
    about = "Compare buying a property outright from savings against financing it"
)]
struct Cli {
    #[arg(long, default_value_t = 300_000.0, help = "Current property price")]
    property_value: f64,
    #[arg(long, default_value_t = 100_000.0, help = "Cash available today")]
    available_cash: f64,
    #[arg(
        long,
        default_value_t = 1_000.0,
        help = "Amount saved in the first month; grows with inflation"
    )]
    initial_monthly_saving: f64,
    #[arg(
        long,
        default_value_t = 1_000.0,
        help = "Current monthly rent; grows with inflation"
    )]
    current_rent: f64,
    #[arg(long, default_value_t = 0.41, help = "Monthly inflation in percent")]
    monthly_inflation_rate: f64,
    #[arg(
        long,
        default_value_t = 1.0,
        help = "Monthly return on invested savings in percent"
    )]
    monthly_investment_return_rate: f64,
    #[arg(
        long,
        default_value_t = 0.8,
        help = "Monthly property appreciation before purchase in percent"
    )]
    monthly_property_appreciation_rate: f64,
    #[arg(
        long,
        help = "Monthly property appreciation after purchase in percent, defaults to the pre-purchase rate"
    )]
    monthly_property_appreciation_rate_post_purchase: Option<f64>,
    #[arg(long, default_value_t = 120, help = "Months to simulate")]
    horizon_months: u32,
    #[arg(long, default_value_t = 0.91, help = "Monthly loan rate in percent")]
    monthly_loan_rate: f64,
    #[arg(long, default_value_t = 120)]
    number_of_installments: u32,
    #[arg(
        long,
        default_value_t = 12,
        help = "Months until rent stops and is redirected to the loan"
    )]
    months_to_stop_paying_rent: u32,
    #[arg(
        long,
        value_enum,
        default_value_t = CliInstallmentGrowth::AllRemaining,
        help = "Which unpaid installments accrue interest each month"
    )]
    installment_growth: CliInstallmentGrowth,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareResponse {
    installment_growth: InstallmentGrowthPolicy,
    first_installment_value: Option<f64>,
    #[serde(flatten)]
    report: ComparisonReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetirementSavingsResponse {
    plan: RetirementPlan,
    grid: Vec<RetirementPlan>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SavingsRateResponse {
    savings_grow_with_inflation: bool,
    savings_rate: Option<f64>,
    curve: Vec<SavingsRatePoint>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn percent(value: f64) -> f64 {
    value / 100.0
}

fn flag_message(err: EngineError) -> String {
    match err {
        EngineError::InvalidParameter { name, reason } => {
            format!("--{} {reason}", name.replace('_', "-"))
        }
        other => other.to_string(),
    }
}

fn build_parameters(cli: Cli) -> Result<SimulationParameters, String> {
    let appreciation = percent(cli.monthly_property_appreciation_rate);
    let params = SimulationParameters {
        property_value: cli.property_value,
        available_cash: cli.available_cash,
        initial_monthly_saving: cli.initial_monthly_saving,
        current_rent: cli.current_rent,
        monthly_inflation_rate: percent(cli.monthly_inflation_rate),
        monthly_investment_return_rate: percent(cli.monthly_investment_return_rate),
        monthly_property_appreciation_rate: appreciation,
        monthly_property_appreciation_rate_post_purchase: cli
            .monthly_property_appreciation_rate_post_purchase
            .map(percent)
            .unwrap_or(appreciation),
        horizon_months: cli.horizon_months,
        monthly_loan_rate: percent(cli.monthly_loan_rate),
        number_of_installments: cli.number_of_installments,
        months_to_stop_paying_rent: cli.months_to_stop_paying_rent,
        installment_growth: cli.installment_growth.into(),
    };
    params.validate().map_err(flag_message)?;
    Ok(params)
}

/// Parses `compare` flags, runs one comparison and renders it as pretty JSON.
pub fn run_compare_cli<I, T>(args: I) -> Result<String, String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;
    let params = build_parameters(cli)?;
    let response = compare_response(&params)?;
    serde_json::to_string_pretty(&response).map_err(|e| format!("Failed to render report: {e}"))
}

fn compare_response(params: &SimulationParameters) -> Result<CompareResponse, String> {
    let report = run_comparison(params).map_err(flag_message)?;
    Ok(CompareResponse {
        installment_growth: params.installment_growth,
        first_installment_value: report.financed.first_installment_value(),
        report,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/compare",
            get(compare_get_handler).post(compare_post_handler),
        )
        .route(
            "/api/retirement/savings",
            get(retirement_savings_get_handler).post(retirement_savings_post_handler),
        )
        .route(
            "/api/retirement/savings-rate",
            get(savings_rate_get_handler).post(savings_rate_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "property comparison HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/compare");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn compare_get_handler(Query(payload): Query<ComparePayload>) -> Response {
    compare_handler_impl(payload).await
}

async fn compare_post_handler(Json(payload): Json<ComparePayload>) -> Response {
    compare_handler_impl(payload).await
}

async fn compare_handler_impl(payload: ComparePayload) -> Response {
    let result = parameters_from_payload(payload).and_then(|params| compare_response(&params));
    match result {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn retirement_savings_get_handler(
    Query(payload): Query<RetirementSavingsPayload>,
) -> Response {
    respond(retirement_savings_response(payload))
}

async fn retirement_savings_post_handler(Json(payload): Json<RetirementSavingsPayload>) -> Response {
    respond(retirement_savings_response(payload))
}

async fn savings_rate_get_handler(Query(payload): Query<SavingsRatePayload>) -> Response {
    respond(savings_rate_response(payload))
}

async fn savings_rate_post_handler(Json(payload): Json<SavingsRatePayload>) -> Response {
    respond(savings_rate_response(payload))
}

fn respond<T: Serialize>(result: Result<T, String>) -> Response {
    match result {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
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

#[cfg(test)]
fn parameters_from_json(json: &str) -> Result<SimulationParameters, String> {
    let payload = serde_json::from_str::<ComparePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    parameters_from_payload(payload)
}

fn parameters_from_payload(payload: ComparePayload) -> Result<SimulationParameters, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.property_value {
        cli.property_value = v;
    }
    if let Some(v) = payload.available_cash {
        cli.available_cash = v;
    }
    if let Some(v) = payload.initial_monthly_saving {
        cli.initial_monthly_saving = v;
    }
    if let Some(v) = payload.current_rent {
        cli.current_rent = v;
    }
    if let Some(v) = payload.monthly_inflation_rate {
        cli.monthly_inflation_rate = v;
    }
    if let Some(v) = payload.monthly_investment_return_rate {
        cli.monthly_investment_return_rate = v;
    }
    if let Some(v) = payload.monthly_property_appreciation_rate {
        cli.monthly_property_appreciation_rate = v;
    }
    if let Some(v) = payload.monthly_property_appreciation_rate_post_purchase {
        cli.monthly_property_appreciation_rate_post_purchase = Some(v);
    }
    if let Some(v) = payload.horizon_months {
        cli.horizon_months = v;
    }
    if let Some(v) = payload.monthly_loan_rate {
        cli.monthly_loan_rate = v;
    }
    if let Some(v) = payload.number_of_installments {
        cli.number_of_installments = v;
    }
    if let Some(v) = payload.months_to_stop_paying_rent {
        cli.months_to_stop_paying_rent = v;
    }
    if let Some(v) = payload.installment_growth {
        cli.installment_growth = v.into();
    }

    build_parameters(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        property_value: 300_000.0,
        available_cash: 100_000.0,
        initial_monthly_saving: 1_000.0,
        current_rent: 1_000.0,
        monthly_inflation_rate: 0.41,
        monthly_investment_return_rate: 1.0,
        monthly_property_appreciation_rate: 0.8,
        monthly_property_appreciation_rate_post_purchase: None,
        horizon_months: 120,
        monthly_loan_rate: 0.91,
        number_of_installments: 120,
        months_to_stop_paying_rent: 12,
        installment_growth: CliInstallmentGrowth::AllRemaining,
    }
}

fn retirement_savings_response(
    payload: RetirementSavingsPayload,
) -> Result<RetirementSavingsResponse, String> {
    let current_capital = payload.current_capital.unwrap_or(0.0);
    let inflation = percent(payload.monthly_inflation_rate.unwrap_or(0.41));
    let investment_return = percent(payload.monthly_investment_return_rate.unwrap_or(1.0));

    let plan = required_monthly_savings(
        payload.wanted_buy_power.unwrap_or(10_000.0),
        payload.years_to_retire.unwrap_or(20),
        current_capital,
        inflation,
        investment_return,
    )
    .map_err(flag_message)?;
    let grid = if payload.include_grid.unwrap_or(true) {
        required_savings_grid(current_capital, inflation, investment_return)
            .map_err(flag_message)?
    } else {
        Vec::new()
    };
    Ok(RetirementSavingsResponse { plan, grid })
}

fn savings_rate_response(payload: SavingsRatePayload) -> Result<SavingsRateResponse, String> {
    let inflation = percent(payload.monthly_inflation_rate.unwrap_or(0.41));
    let investment_return = percent(payload.monthly_investment_return_rate.unwrap_or(1.0));
    let grow = payload.savings_grow_with_inflation.unwrap_or(false);

    let savings_rate = payload
        .months_to_retire
        .map(|months| savings_rate_to_retire(months, inflation, investment_return, grow))
        .transpose()
        .map_err(flag_message)?;
    let curve = savings_rate_curve(inflation, investment_return, grow).map_err(flag_message)?;
    Ok(SavingsRateResponse {
        savings_grow_with_inflation: grow,
        savings_rate,
        curve,
    })
}
