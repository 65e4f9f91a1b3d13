use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    Assumptions, MAX_PLAN_YEARS, MaritalStatus, PlanInput, PlanReport, Province, RawField,
    RawPlanInput, RiskTier, compute_plan_report_with, normalize,
};

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Retirement readiness estimator (savings projection, income gap and drawdown)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a readiness report as JSON
    Report(ReportArgs),
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

// Form-style flags: values are taken as text and normalized, never rejected.
#[derive(Args, Debug, Default)]
pub struct ReportArgs {
    #[arg(long)]
    current_age: Option<String>,
    #[arg(long)]
    retirement_age: Option<String>,
    #[arg(long, help = "Province or territory code, e.g. ON")]
    province: Option<String>,
    #[arg(long, help = "single, married, common-law or divorced")]
    marital_status: Option<String>,
    #[arg(long)]
    rrsp_balance: Option<String>,
    #[arg(long)]
    tfsa_balance: Option<String>,
    #[arg(long)]
    pension_value: Option<String>,
    #[arg(long)]
    other_savings: Option<String>,
    #[arg(long)]
    non_registered_savings: Option<String>,
    #[arg(long)]
    monthly_contribution: Option<String>,
    #[arg(long, help = "Current pre-retirement annual income")]
    annual_income: Option<String>,
    #[arg(long, help = "essential, comfortable, enhanced or custom")]
    lifestyle: Option<String>,
    #[arg(long, help = "Income replacement target in percent, used with --lifestyle custom")]
    retirement_income_percent: Option<String>,
    #[arg(long, help = "Desired annual retirement income in today's money")]
    desired_income: Option<String>,
    #[arg(long, help = "Annual CPP/QPP benefit")]
    cpp_benefits: Option<String>,
    #[arg(long, help = "Annual OAS benefit")]
    oas_benefits: Option<String>,
    #[arg(long)]
    company_pension: Option<String>,
    #[arg(long)]
    additional_income: Option<String>,
    #[arg(long, help = "conservative, balanced or growth")]
    risk_tolerance: Option<String>,
    #[arg(long, help = "Expected annual return before retirement in percent, e.g. 6.5")]
    expected_return: Option<String>,
    #[arg(long, help = "Expected annual return after retirement in percent")]
    post_retirement_return: Option<String>,
    #[arg(long, help = "Annual inflation in percent")]
    inflation_rate: Option<String>,
    #[arg(long, visible_alias = "horizon-years", help = "Years the savings goal must fund")]
    retirement_horizon_years: Option<String>,
    #[arg(long, help = "Withdrawal rate for the savings goal in percent (default 4)")]
    withdrawal_rate: Option<f64>,
    #[arg(long, help = "Hard cap on simulated retirement years (default 35)")]
    max_decumulation_years: Option<u32>,
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

impl ReportArgs {
    fn raw_input(&self) -> RawPlanInput {
        let text = |value: &Option<String>| value.as_deref().map(RawField::from);
        RawPlanInput {
            current_age: text(&self.current_age),
            retirement_age: text(&self.retirement_age),
            province: self.province.clone(),
            marital_status: self.marital_status.clone(),
            rrsp_balance: text(&self.rrsp_balance),
            tfsa_balance: text(&self.tfsa_balance),
            pension_value: text(&self.pension_value),
            other_savings: text(&self.other_savings),
            non_registered_savings: text(&self.non_registered_savings),
            monthly_contributions: text(&self.monthly_contribution),
            annual_income: text(&self.annual_income),
            lifestyle: self.lifestyle.clone(),
            retirement_income_percent: text(&self.retirement_income_percent),
            desired_income: text(&self.desired_income),
            cpp_benefits: text(&self.cpp_benefits),
            oas_benefits: text(&self.oas_benefits),
            company_pension: text(&self.company_pension),
            additional_income: text(&self.additional_income),
            risk_tolerance: self.risk_tolerance.clone(),
            expected_return: text(&self.expected_return),
            post_retirement_return: text(&self.post_retirement_return),
            inflation_rate: text(&self.inflation_rate),
            retirement_horizon_years: text(&self.retirement_horizon_years),
        }
    }

    fn overrides(&self) -> AssumptionOverrides {
        AssumptionOverrides {
            withdrawal_rate: self.withdrawal_rate.map(RawField::Number),
            max_decumulation_years: self
                .max_decumulation_years
                .map(|years| RawField::Number(years as f64)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AssumptionOverrides {
    withdrawal_rate: Option<RawField>,
    max_decumulation_years: Option<RawField>,
}

impl AssumptionOverrides {
    // Overrides are configuration, not form input: invalid values are rejected.
    fn apply(&self, base: Assumptions) -> Result<Assumptions, String> {
        let mut assumptions = base;
        if let Some(raw) = &self.withdrawal_rate {
            let percent = raw_number(raw).ok_or("withdrawalRate must be a number")?;
            if !(percent > 0.0 && percent < 100.0) {
                return Err("withdrawalRate must be between 0 and 100 percent".to_string());
            }
            assumptions.withdrawal_rate = percent / 100.0;
        }
        if let Some(raw) = &self.max_decumulation_years {
            let years = raw_number(raw).ok_or("maxDecumulationYears must be a number")?;
            if !(1.0..=MAX_PLAN_YEARS as f64).contains(&years) {
                return Err(format!(
                    "maxDecumulationYears must be between 1 and {MAX_PLAN_YEARS}"
                ));
            }
            assumptions.max_decumulation_years = years.trunc() as u32;
        }
        assumptions.validate()?;
        Ok(assumptions)
    }
}

fn raw_number(raw: &RawField) -> Option<f64> {
    match raw {
        RawField::Number(v) => v.is_finite().then_some(*v),
        RawField::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReportPayload {
    #[serde(flatten)]
    input: RawPlanInput,
    #[serde(flatten)]
    overrides: AssumptionOverrides,
}

#[derive(Debug)]
struct ReportRequest {
    inputs: PlanInput,
    assumptions: Assumptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NormalizedInputView {
    current_age: u32,
    retirement_age: u32,
    province: Province,
    marital_status: MaritalStatus,
    risk_tier: RiskTier,
    monthly_contribution: f64,
    annual_income: Option<f64>,
    desired_annual_income: f64,
    guaranteed_annual_income: f64,
    expected_return_rate: f64,
    post_retirement_return_rate: f64,
    inflation_rate: f64,
    retirement_horizon_years: u32,
}

impl From<&PlanInput> for NormalizedInputView {
    fn from(inputs: &PlanInput) -> Self {
        Self {
            current_age: inputs.current_age,
            retirement_age: inputs.retirement_age,
            province: inputs.province,
            marital_status: inputs.marital_status,
            risk_tier: inputs.risk_tier,
            monthly_contribution: inputs.monthly_contribution,
            annual_income: inputs.annual_income,
            desired_annual_income: inputs.desired_annual_income,
            guaranteed_annual_income: inputs.guaranteed_annual_income(),
            expected_return_rate: inputs.expected_return_rate,
            post_retirement_return_rate: inputs.post_retirement_return_rate,
            inflation_rate: inputs.inflation_rate,
            retirement_horizon_years: inputs.retirement_horizon_years,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportResponse {
    input: NormalizedInputView,
    assumptions: Assumptions,
    report: PlanReport,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn report_request_from_payload(payload: ReportPayload) -> Result<ReportRequest, String> {
    let assumptions = payload.overrides.apply(Assumptions::default())?;
    let inputs = normalize(&payload.input, &assumptions);
    Ok(ReportRequest {
        inputs,
        assumptions,
    })
}

#[cfg(test)]
fn report_request_from_json(json: &str) -> Result<ReportRequest, String> {
    let payload = serde_json::from_str::<ReportPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    report_request_from_payload(payload)
}

fn build_report_response(request: &ReportRequest) -> Result<ReportResponse, String> {
    let report =
        compute_plan_report_with(&request.inputs, &request.assumptions).map_err(|e| e.to_string())?;
    Ok(ReportResponse {
        input: NormalizedInputView::from(&request.inputs),
        assumptions: request.assumptions,
        report,
    })
}

/// Builds the JSON report for the `report` subcommand.
pub fn run_report_command(args: &ReportArgs) -> Result<String, String> {
    let assumptions = args.overrides().apply(Assumptions::default())?;
    let request = ReportRequest {
        inputs: normalize(&args.raw_input(), &assumptions),
        assumptions,
    };
    let response = build_report_response(&request)?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    };
    json.map_err(|e| format!("failed to serialize report: {e}"))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router();

    let listener = TcpListener::bind(addr).await?;
    info!("readiness API listening on http://{addr}");
    info!("local access: http://127.0.0.1:{port}/api/report");

    axum::serve(listener, app).await
}

fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/assumptions", get(assumptions_handler))
        .route(
            "/api/report",
            get(report_get_handler).post(report_post_handler),
        )
        .fallback(not_found_handler)
}

async fn health_handler() -> impl IntoResponse {
    with_cache_control("ok")
}

async fn assumptions_handler() -> Response {
    json_response(StatusCode::OK, Assumptions::default())
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn report_get_handler(Query(payload): Query<ReportPayload>) -> Response {
    report_handler_impl(payload).await
}

async fn report_post_handler(Json(payload): Json<ReportPayload>) -> Response {
    report_handler_impl(payload).await
}

async fn report_handler_impl(payload: ReportPayload) -> Response {
    let request = match report_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!("rejected report request: {msg}");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match build_report_response(&request) {
        Ok(response) => {
            info!(
                "report: age {}->{} score={} tier={:?}",
                request.inputs.current_age,
                request.inputs.retirement_age,
                response.report.readiness_score,
                response.report.sustainability_tier
            );
            json_response(StatusCode::OK, response)
        }
        Err(msg) => {
            warn!("report failed: {msg}");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
