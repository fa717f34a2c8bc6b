mod advice;
mod engine;
mod error;
mod prefill;
mod rules;
mod solver;
mod types;

pub use advice::{build_guidance, build_recommendations, build_warnings, format_currency};
pub use engine::{
    DecumulationOutcome, GrowthOutcome, MAX_HORIZON_YEARS, analyze_tax_savings, calculate,
    calculate_for_year, compare_taxable_account, credited_contributions, evaluate_eligibility,
    project_decumulation, project_growth,
};
pub use error::CalcError;
pub use prefill::{
    ContributionPatch, EligibilityPatch, InputField, InputsPatch, InvestmentPatch, MedicalPatch,
    PREFILL_RULES, PrefillRule, Preset, ProfileField, ProfileMemory, TaxPatch,
    prefill_from_memory,
};
pub use rules::{CapitalGainsTier, FederalBracket, FilingSchedule, FilingStatus, TaxYearRules};
pub use solver::{
    GoalSolveConfig, GoalSolveIteration, GoalSolveResult, GoalType, MAX_SOLVER_ITERATIONS,
    solve_contribution_goal,
};
pub use types::{
    CalculatorInputs, CalculatorResults, ComparisonAnalysis, ContributionInputs, CoverageType,
    DecumulationYear, EligibilityInputs, EligibilityResult, GrowthProjectionYear, GuidanceStep,
    InvestmentInputs, MedicalInputs, StrategyOutcome, TaxInputs, TaxSavingsAnalysis,
};
