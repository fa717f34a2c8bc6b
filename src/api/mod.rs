mod error;

use axum::{
    Router,
    extract::{
        Json, Path, Query,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info};

pub use error::{ApiError, ApiResult};

use crate::core::{
    CalculatorInputs, CalculatorResults, CoverageType, FilingStatus, GoalSolveConfig,
    GoalSolveResult, GoalType, InputsPatch, MAX_HORIZON_YEARS, Preset, ProfileMemory,
    TaxYearRules, calculate, prefill_from_memory, solve_contribution_goal,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCoverage {
    Individual,
    Family,
}

impl From<CliCoverage> for CoverageType {
    fn from(value: CliCoverage) -> Self {
        match value {
            CliCoverage::Individual => CoverageType::Individual,
            CliCoverage::Family => CoverageType::Family,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliFilingStatus {
    Single,
    MarriedJoint,
    MarriedSeparate,
    HeadOfHousehold,
}

impl From<CliFilingStatus> for FilingStatus {
    fn from(value: CliFilingStatus) -> Self {
        match value {
            CliFilingStatus::Single => FilingStatus::Single,
            CliFilingStatus::MarriedJoint => FilingStatus::MarriedJoint,
            CliFilingStatus::MarriedSeparate => FilingStatus::MarriedSeparate,
            CliFilingStatus::HeadOfHousehold => FilingStatus::HeadOfHousehold,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPreset {
    YoungSingle,
    FamilyMidCareer,
    NearRetirement,
}

impl From<CliPreset> for Preset {
    fn from(value: CliPreset) -> Self {
        match value {
            CliPreset::YoungSingle => Preset::YoungSingle,
            CliPreset::FamilyMidCareer => Preset::FamilyMidCareer,
            CliPreset::NearRetirement => Preset::NearRetirement,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "hsa-planner",
    about = "HSA contribution planner (eligibility, tax-free growth, taxable comparison)"
)]
pub struct Cli {
    #[arg(long, default_value = "info", help = "Log level when RUST_LOG is unset")]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run one calculation and print the result as JSON.
    Calculate(InputArgs),
    /// Find the smallest annual contribution that reaches a goal.
    Solve(SolveArgs),
}

/// Calculator inputs on the command line. Unset flags keep the preset or
/// built-in default.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    #[arg(long, help = "Tax year whose limits and brackets apply")]
    plan_year: Option<u16>,
    #[arg(long, value_enum)]
    preset: Option<CliPreset>,

    #[arg(long, help = "Not covered by a high-deductible health plan")]
    no_hdhp: bool,
    #[arg(long, value_enum)]
    coverage: Option<CliCoverage>,
    #[arg(long)]
    age: Option<u32>,
    #[arg(long)]
    medicare: bool,
    #[arg(long, help = "Months of HDHP coverage this year, 1-12")]
    months_of_coverage: Option<u32>,

    #[arg(long)]
    contribution: Option<f64>,
    #[arg(long)]
    employer_contribution: Option<f64>,
    #[arg(long)]
    balance: Option<f64>,

    #[arg(long, help = "Expected annual return in percent, e.g. 7")]
    expected_return: Option<f64>,
    #[arg(long)]
    years_to_retirement: Option<u32>,
    #[arg(long)]
    years_in_retirement: Option<u32>,

    #[arg(long, help = "Federal marginal rate in percent; derived from --income when omitted")]
    marginal_tax_rate: Option<f64>,
    #[arg(long)]
    retirement_tax_rate: Option<f64>,
    #[arg(long, help = "Two-letter state code")]
    state: Option<String>,

    #[arg(long)]
    medical_expenses: Option<f64>,
    #[arg(long)]
    retirement_medical_expenses: Option<f64>,

    #[arg(long, help = "Annual gross income, used to look up the marginal rate")]
    income: Option<f64>,
    #[arg(long, value_enum)]
    filing_status: Option<CliFilingStatus>,
}

#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("goal").required(true).args(["target_balance", "target_medical_years"])))]
pub struct SolveArgs {
    #[command(flatten)]
    inputs: InputArgs,
    #[arg(long, help = "Balance to reach at retirement")]
    target_balance: Option<f64>,
    #[arg(long, help = "Years of retirement medical expenses to cover")]
    target_medical_years: Option<f64>,
    #[arg(long, default_value_t = 10_000.0)]
    search_max: f64,
}

impl InputArgs {
    fn memory(&self) -> ProfileMemory {
        ProfileMemory {
            annual_income: self.income,
            filing_status: self.filing_status.map(Into::into),
            ..ProfileMemory::default()
        }
    }

    fn patch(&self) -> InputsPatch {
        let mut patch = InputsPatch::default();
        if self.no_hdhp {
            patch.eligibility.has_hdhp = Some(false);
        }
        if self.medicare {
            patch.eligibility.enrolled_in_medicare = Some(true);
        }
        patch.eligibility.coverage_type = self.coverage.map(Into::into);
        patch.eligibility.age = self.age;
        patch.eligibility.months_of_coverage = self.months_of_coverage;
        patch.contribution.current_contribution = self.contribution;
        patch.contribution.employer_contribution = self.employer_contribution;
        patch.contribution.current_balance = self.balance;
        patch.investment.expected_return = self.expected_return;
        patch.investment.years_to_retirement = self.years_to_retirement;
        patch.investment.years_in_retirement = self.years_in_retirement;
        patch.tax.marginal_tax_rate = self.marginal_tax_rate;
        patch.tax.retirement_tax_rate = self.retirement_tax_rate;
        patch.tax.state = self.state.clone();
        patch.medical.current_annual_expenses = self.medical_expenses;
        patch.medical.retirement_annual_expenses = self.retirement_medical_expenses;
        patch
    }
}

/// Request body for `/api/calculate`. Every field is optional; nested
/// `inputs` and flat keys are merged over the preset and profile values.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalculatePayload {
    plan_year: Option<u16>,
    preset: Option<Preset>,
    memory: Option<ProfileMemory>,
    inputs: Option<InputsPatch>,

    has_hdhp: Option<bool>,
    coverage_type: Option<CoverageType>,
    age: Option<u32>,
    enrolled_in_medicare: Option<bool>,
    months_of_coverage: Option<u32>,

    current_contribution: Option<f64>,
    employer_contribution: Option<f64>,
    current_balance: Option<f64>,

    expected_return: Option<f64>,
    years_to_retirement: Option<u32>,
    years_in_retirement: Option<u32>,

    marginal_tax_rate: Option<f64>,
    retirement_tax_rate: Option<f64>,
    state: Option<String>,

    current_annual_expenses: Option<f64>,
    retirement_annual_expenses: Option<f64>,
}

impl CalculatePayload {
    fn flat_patch(&self) -> InputsPatch {
        let mut patch = InputsPatch::default();
        patch.eligibility.has_hdhp = self.has_hdhp;
        patch.eligibility.coverage_type = self.coverage_type;
        patch.eligibility.age = self.age;
        patch.eligibility.enrolled_in_medicare = self.enrolled_in_medicare;
        patch.eligibility.months_of_coverage = self.months_of_coverage;
        patch.contribution.current_contribution = self.current_contribution;
        patch.contribution.employer_contribution = self.employer_contribution;
        patch.contribution.current_balance = self.current_balance;
        patch.investment.expected_return = self.expected_return;
        patch.investment.years_to_retirement = self.years_to_retirement;
        patch.investment.years_in_retirement = self.years_in_retirement;
        patch.tax.marginal_tax_rate = self.marginal_tax_rate;
        patch.tax.retirement_tax_rate = self.retirement_tax_rate;
        patch.tax.state = self.state.clone();
        patch.medical.current_annual_expenses = self.current_annual_expenses;
        patch.medical.retirement_annual_expenses = self.retirement_annual_expenses;
        patch
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolvePayload {
    #[serde(flatten)]
    calculate: CalculatePayload,
    goal_type: Option<GoalType>,
    target_value: f64,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Debug)]
struct ApiRequest {
    rules: &'static TaxYearRules,
    inputs: CalculatorInputs,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateResponse {
    pub inputs: CalculatorInputs,
    pub results: CalculatorResults,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResponse {
    pub plan_year: u16,
    pub inputs: CalculatorInputs,
    pub solution: GoalSolveResult,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RuleYearsResponse {
    supported_years: Vec<u16>,
    default_year: u16,
}

fn resolve_rules(plan_year: Option<u16>) -> ApiResult<&'static TaxYearRules> {
    match plan_year {
        Some(year) => TaxYearRules::for_year(year).ok_or(ApiError::UnknownYear(year)),
        None => Ok(TaxYearRules::default_year()),
    }
}

/// Layers, lowest precedence first: defaults, preset, profile memory, then
/// explicit overrides.
fn build_inputs(
    rules: &TaxYearRules,
    preset: Option<Preset>,
    memory: Option<&ProfileMemory>,
    overrides: &[&InputsPatch],
) -> ApiResult<CalculatorInputs> {
    let mut inputs = CalculatorInputs::default();
    if let Some(preset) = preset {
        inputs.apply_patch(&preset.patch());
    }
    if let Some(memory) = memory {
        let applied = prefill_from_memory(memory, rules, &mut inputs)?;
        debug!(?applied, "profile pre-fill applied");
    }
    for patch in overrides {
        inputs.apply_patch(patch);
    }
    validate_inputs(&inputs)?;
    Ok(inputs)
}

/// Rejects values the engine cannot clamp into meaning. Out-of-range but
/// finite values are clamped by the engine instead.
fn validate_inputs(inputs: &CalculatorInputs) -> ApiResult<()> {
    let amounts = [
        ("currentContribution", inputs.contribution.current_contribution),
        ("employerContribution", inputs.contribution.employer_contribution),
        ("currentBalance", inputs.contribution.current_balance),
        ("expectedReturn", inputs.investment.expected_return),
        ("marginalTaxRate", inputs.tax.marginal_tax_rate),
        ("retirementTaxRate", inputs.tax.retirement_tax_rate),
        ("currentAnnualExpenses", inputs.medical.current_annual_expenses),
        ("retirementAnnualExpenses", inputs.medical.retirement_annual_expenses),
    ];
    for (field, value) in amounts {
        if !value.is_finite() {
            return Err(ApiError::validation(field, "must be a finite number"));
        }
    }
    if inputs.eligibility.age > 120 {
        return Err(ApiError::validation("age", "must be <= 120"));
    }
    if inputs.investment.years_to_retirement > MAX_HORIZON_YEARS {
        return Err(ApiError::validation(
            "yearsToRetirement",
            format!("must be <= {MAX_HORIZON_YEARS}"),
        ));
    }
    if inputs.investment.years_in_retirement > MAX_HORIZON_YEARS {
        return Err(ApiError::validation(
            "yearsInRetirement",
            format!("must be <= {MAX_HORIZON_YEARS}"),
        ));
    }
    Ok(())
}

fn api_request_from_payload(payload: &CalculatePayload) -> ApiResult<ApiRequest> {
    let rules = resolve_rules(payload.plan_year)?;
    let flat = payload.flat_patch();
    let mut overrides = Vec::with_capacity(2);
    if let Some(nested) = payload.inputs.as_ref() {
        overrides.push(nested);
    }
    overrides.push(&flat);
    let inputs = build_inputs(rules, payload.preset, payload.memory.as_ref(), &overrides)?;
    Ok(ApiRequest { rules, inputs })
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> ApiResult<ApiRequest> {
    let payload = serde_json::from_str::<CalculatePayload>(json)
        .map_err(|e| ApiError::Malformed(e.to_string()))?;
    api_request_from_payload(&payload)
}

fn api_request_from_args(args: &InputArgs) -> ApiResult<ApiRequest> {
    let rules = resolve_rules(args.plan_year)?;
    let memory = args.memory();
    let inputs = build_inputs(
        rules,
        args.preset.map(Into::into),
        Some(&memory),
        &[&args.patch()],
    )?;
    Ok(ApiRequest { rules, inputs })
}

fn calculate_request(request: ApiRequest) -> CalculateResponse {
    let results = calculate(&request.inputs, request.rules);
    CalculateResponse {
        inputs: request.inputs,
        results,
    }
}

fn solve_request(request: ApiRequest, config: GoalSolveConfig) -> ApiResult<SolveResponse> {
    let solution = solve_contribution_goal(&request.inputs, request.rules, config)?;
    Ok(SolveResponse {
        plan_year: request.rules.year,
        inputs: request.inputs,
        solution,
    })
}

pub fn calculate_from_args(args: &InputArgs) -> ApiResult<CalculateResponse> {
    let request = api_request_from_args(args)?;
    Ok(calculate_request(request))
}

pub fn solve_from_args(args: &SolveArgs) -> ApiResult<SolveResponse> {
    let request = api_request_from_args(&args.inputs)?;
    let mut config = match (args.target_balance, args.target_medical_years) {
        (Some(balance), _) => GoalSolveConfig::new(GoalType::RetirementBalance, balance),
        (None, Some(years)) => GoalSolveConfig::new(GoalType::MedicalYearsCovered, years),
        (None, None) => {
            return Err(ApiError::validation(
                "target",
                "pass --target-balance or --target-medical-years",
            ));
        }
    };
    config.search_max = args.search_max;
    solve_request(request, config)
}

pub fn router() -> Router {
    Router::new()
        .route(
            "/api/calculate",
            get(calculate_get_handler).post(calculate_post_handler),
        )
        .route("/api/solve", post(solve_handler))
        .route("/api/rules", get(rule_years_handler))
        .route("/api/rules/:year", get(rules_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "HSA planner API listening");
    info!("Local access: http://127.0.0.1:{port}/health");

    axum::serve(listener, router()).await
}

async fn not_found_handler() -> ApiError {
    ApiError::NotFound
}

async fn health_handler() -> Response {
    json_response(
        StatusCode::OK,
        HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

async fn calculate_get_handler(
    payload: Result<Query<CalculatePayload>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(payload) = payload?;
    calculate_handler_impl(payload)
}

async fn calculate_post_handler(
    payload: Result<Json<CalculatePayload>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(payload) = payload?;
    calculate_handler_impl(payload)
}

fn calculate_handler_impl(payload: CalculatePayload) -> ApiResult<Response> {
    let request = api_request_from_payload(&payload)?;
    info!(
        plan_year = request.rules.year,
        age = request.inputs.eligibility.age,
        "calculate request"
    );
    Ok(json_response(StatusCode::OK, calculate_request(request)))
}

async fn solve_handler(payload: Result<Json<SolvePayload>, JsonRejection>) -> ApiResult<Response> {
    let Json(payload) = payload?;
    let request = api_request_from_payload(&payload.calculate)?;
    let goal_type = payload.goal_type.unwrap_or(GoalType::RetirementBalance);
    let mut config = GoalSolveConfig::new(goal_type, payload.target_value);
    if let Some(v) = payload.search_min {
        config.search_min = v;
    }
    if let Some(v) = payload.search_max {
        config.search_max = v;
    }
    if let Some(v) = payload.tolerance {
        config.tolerance = v;
    }
    if let Some(v) = payload.max_iterations {
        config.max_iterations = v;
    }
    info!(?goal_type, target = payload.target_value, "solve request");
    let response = solve_request(request, config)?;
    Ok(json_response(StatusCode::OK, response))
}

async fn rule_years_handler() -> Response {
    json_response(
        StatusCode::OK,
        RuleYearsResponse {
            supported_years: TaxYearRules::supported_years().collect(),
            default_year: TaxYearRules::DEFAULT_YEAR,
        },
    )
}

async fn rules_handler(year: Result<Path<u16>, PathRejection>) -> ApiResult<Response> {
    let Path(year) = year?;
    let rules = resolve_rules(Some(year))?;
    Ok(json_response(StatusCode::OK, rules))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}
