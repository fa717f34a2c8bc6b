use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::engine::{evaluate_eligibility, project_decumulation, project_growth};
use super::error::CalcError;
use super::rules::TaxYearRules;
use super::types::CalculatorInputs;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalType {
    #[serde(alias = "retirementBalance", alias = "retirement_balance")]
    RetirementBalance,
    #[serde(alias = "medicalYearsCovered", alias = "medical_years_covered")]
    MedicalYearsCovered,
}

/// Largest `max_iterations` a config may request.
pub const MAX_SOLVER_ITERATIONS: u32 = 200;

#[derive(Debug, Clone, Copy)]
pub struct GoalSolveConfig {
    pub goal_type: GoalType,
    pub target_value: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl GoalSolveConfig {
    pub fn new(goal_type: GoalType, target_value: f64) -> Self {
        Self {
            goal_type,
            target_value,
            search_min: 0.0,
            search_max: 10_000.0,
            tolerance: 1.0,
            max_iterations: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_contribution: f64,
    pub achieved_value: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveResult {
    pub goal_type: GoalType,
    pub target_value: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub solved_contribution: Option<f64>,
    pub achieved_value: Option<f64>,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

/// Finds the smallest annual employee contribution that meets the goal.
///
/// Retirement balance and medical coverage are both non-decreasing in the
/// employee contribution, so bisection over `[search_min, search_max]` is
/// sufficient.
pub fn solve_contribution_goal(
    inputs: &CalculatorInputs,
    rules: &TaxYearRules,
    config: GoalSolveConfig,
) -> Result<GoalSolveResult, CalcError> {
    validate_config(config)?;

    let low_value = evaluate_candidate(inputs, rules, config.goal_type, config.search_min);
    let high_value = evaluate_candidate(inputs, rules, config.goal_type, config.search_max);
    let mut iterations = Vec::new();

    if low_value >= config.target_value {
        return Ok(finish(
            config,
            Some(config.search_min),
            Some(low_value),
            iterations,
            true,
            true,
            "Already meets the goal at the lower contribution bound.".to_string(),
        ));
    }
    if high_value < config.target_value {
        info!(
            target = config.target_value,
            best = high_value,
            "contribution goal infeasible within bounds"
        );
        return Ok(finish(
            config,
            None,
            Some(high_value),
            iterations,
            false,
            false,
            "No contribution within the search bounds reaches the goal; the annual limit may cap it."
                .to_string(),
        ));
    }

    let mut lo = config.search_min;
    let mut hi = config.search_max;
    let mut hi_value = high_value;
    let mut converged = false;
    for iteration in 1..=config.max_iterations {
        let mid = (lo + hi) * 0.5;
        let value = evaluate_candidate(inputs, rules, config.goal_type, mid);
        iterations.push(GoalSolveIteration {
            iteration,
            lower_bound: lo,
            upper_bound: hi,
            candidate_contribution: mid,
            achieved_value: value,
        });
        debug!(iteration, candidate = mid, value, "goal solver step");

        if value >= config.target_value {
            hi = mid;
            hi_value = value;
        } else {
            lo = mid;
        }
        if hi - lo <= config.tolerance {
            converged = true;
            break;
        }
    }

    let message = if converged {
        format!("Converged after {} iterations.", iterations.len())
    } else {
        "Reached the iteration limit before the bracket narrowed to tolerance.".to_string()
    };
    Ok(finish(
        config,
        Some(hi.ceil()),
        Some(hi_value),
        iterations,
        converged,
        true,
        message,
    ))
}

fn finish(
    config: GoalSolveConfig,
    solved_contribution: Option<f64>,
    achieved_value: Option<f64>,
    iterations: Vec<GoalSolveIteration>,
    converged: bool,
    feasible: bool,
    message: String,
) -> GoalSolveResult {
    GoalSolveResult {
        goal_type: config.goal_type,
        target_value: config.target_value,
        search_min: config.search_min,
        search_max: config.search_max,
        solved_contribution,
        achieved_value,
        iterations,
        converged,
        feasible,
        message,
    }
}

fn evaluate_candidate(
    inputs: &CalculatorInputs,
    rules: &TaxYearRules,
    goal_type: GoalType,
    contribution: f64,
) -> f64 {
    let mut candidate = inputs.clone();
    candidate.contribution.current_contribution = contribution;
    let eligibility = evaluate_eligibility(&candidate.eligibility, &candidate.contribution, rules);
    let growth = project_growth(&candidate, &eligibility, rules);
    match goal_type {
        GoalType::RetirementBalance => growth.final_balance,
        GoalType::MedicalYearsCovered => {
            project_decumulation(&candidate, growth.final_balance).years_of_medical_covered
        }
    }
}

fn validate_config(config: GoalSolveConfig) -> Result<(), CalcError> {
    if !config.target_value.is_finite() || config.target_value < 0.0 {
        return Err(CalcError::InvalidSolverConfig(
            "target value must be a finite number >= 0".to_string(),
        ));
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err(CalcError::InvalidSolverConfig(
            "search bounds must be finite".to_string(),
        ));
    }
    if config.search_min < 0.0 {
        return Err(CalcError::InvalidSolverConfig(
            "search minimum must be >= 0".to_string(),
        ));
    }
    if config.search_max <= config.search_min {
        return Err(CalcError::InvalidSolverConfig(
            "search maximum must exceed search minimum".to_string(),
        ));
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(CalcError::InvalidSolverConfig(
            "tolerance must be > 0".to_string(),
        ));
    }
    if config.max_iterations == 0 || config.max_iterations > MAX_SOLVER_ITERATIONS {
        return Err(CalcError::InvalidSolverConfig(format!(
            "max iterations must be in 1..={MAX_SOLVER_ITERATIONS}"
        )));
    }
    Ok(())
}
