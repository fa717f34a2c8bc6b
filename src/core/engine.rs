use tracing::debug;

use super::advice::{build_guidance, build_recommendations, build_warnings};
use super::error::CalcError;
use super::rules::{CapitalGainsTier, TaxYearRules};
use super::types::{
    CalculatorInputs, CalculatorResults, ComparisonAnalysis, ContributionInputs, CoverageType,
    DecumulationYear, EligibilityInputs, EligibilityResult, GrowthProjectionYear,
    StrategyOutcome, TaxSavingsAnalysis,
};

/// Longest accumulation or retirement horizon the engine will simulate.
pub const MAX_HORIZON_YEARS: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct GrowthOutcome {
    pub rows: Vec<GrowthProjectionYear>,
    pub starting_balance: f64,
    pub final_balance: f64,
    pub total_contributions: f64,
    pub total_receipts_banked: f64,
}

impl GrowthOutcome {
    fn total_growth(&self) -> f64 {
        self.rows
            .last()
            .map(|row| row.cumulative_growth)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecumulationOutcome {
    pub rows: Vec<DecumulationYear>,
    pub end_of_life_balance: f64,
    pub years_of_medical_covered: f64,
}

pub fn calculate(inputs: &CalculatorInputs, rules: &TaxYearRules) -> CalculatorResults {
    let eligibility = evaluate_eligibility(&inputs.eligibility, &inputs.contribution, rules);
    let growth = project_growth(inputs, &eligibility, rules);
    let decumulation = project_decumulation(inputs, growth.final_balance);
    let tax_savings = analyze_tax_savings(inputs, &eligibility, &growth, rules);
    let comparison = compare_taxable_account(inputs, &growth, &tax_savings, rules);

    debug!(
        plan_year = rules.year,
        eligible = eligibility.is_eligible,
        years = growth.rows.len(),
        retirement_balance = growth.final_balance,
        advantage = comparison.hsa_advantage,
        "hsa calculation complete"
    );

    let recommendations =
        build_recommendations(inputs, &eligibility, &growth, &tax_savings, rules);
    let warnings = build_warnings(inputs, &eligibility, &decumulation, &tax_savings, rules);
    let guidance = build_guidance(&eligibility, &growth, &decumulation, &comparison);

    CalculatorResults {
        plan_year: rules.year,
        retirement_balance: growth.final_balance,
        end_of_life_balance: decumulation.end_of_life_balance,
        total_receipts_banked: growth.total_receipts_banked,
        years_of_medical_covered: decumulation.years_of_medical_covered,
        eligibility,
        projection: growth.rows,
        decumulation: decumulation.rows,
        tax_savings,
        comparison,
        recommendations,
        warnings,
        guidance,
    }
}

pub fn calculate_for_year(
    inputs: &CalculatorInputs,
    plan_year: u16,
) -> Result<CalculatorResults, CalcError> {
    let rules = TaxYearRules::for_year(plan_year).ok_or(CalcError::UnsupportedYear(plan_year))?;
    Ok(calculate(inputs, rules))
}

pub fn evaluate_eligibility(
    eligibility: &EligibilityInputs,
    contribution: &ContributionInputs,
    rules: &TaxYearRules,
) -> EligibilityResult {
    let mut reasons = Vec::new();
    if !eligibility.has_hdhp {
        reasons.push("Not enrolled in a high-deductible health plan (HDHP)".to_string());
    }
    if eligibility.enrolled_in_medicare {
        reasons.push("Medicare enrollment ends eligibility for new HSA contributions".to_string());
    }
    let is_eligible = eligibility.has_hdhp && !eligibility.enrolled_in_medicare;

    let base_limit = rules.base_limit(eligibility.coverage_type);
    let catch_up_amount = rules.catch_up_for_age(eligibility.age);
    let max_contribution = base_limit + catch_up_amount;
    let months = clamp_months(eligibility.months_of_coverage);
    let prorated_max_contribution = (max_contribution * months as f64 / 12.0).round();

    if is_eligible {
        reasons.push(format!(
            "Enrolled in an HSA-eligible HDHP with {} coverage",
            match eligibility.coverage_type {
                CoverageType::Individual => "self-only",
                CoverageType::Family => "family",
            }
        ));
        if catch_up_amount > 0.0 {
            reasons.push(format!(
                "Age {} or older adds a catch-up contribution",
                rules.catch_up_age
            ));
        }
        if months < 12 {
            reasons.push(format!(
                "Limit prorated for {months} of 12 months of coverage"
            ));
        }
    }

    let requested = non_negative(contribution.current_contribution)
        + non_negative(contribution.employer_contribution);
    let remaining_contribution_room = (prorated_max_contribution - requested).max(0.0);

    EligibilityResult {
        is_eligible,
        base_limit,
        catch_up_amount,
        max_contribution,
        prorated_max_contribution,
        remaining_contribution_room,
        reasons,
    }
}

/// Employee and employer amounts credited for a projection year, employer
/// money first, both capped by that year's ceiling.
pub fn credited_contributions(
    inputs: &CalculatorInputs,
    eligibility: &EligibilityResult,
    rules: &TaxYearRules,
    year_index: u32,
) -> (f64, f64) {
    let age = inputs.eligibility.age.saturating_add(year_index);
    if !eligibility.is_eligible || age >= rules.medicare_age {
        return (0.0, 0.0);
    }

    let ceiling = if year_index == 0 {
        eligibility.prorated_max_contribution
    } else {
        rules.annual_limit(inputs.eligibility.coverage_type, age)
    };
    let employer = non_negative(inputs.contribution.employer_contribution)
        .min(ceiling)
        .round();
    let employee = non_negative(inputs.contribution.current_contribution)
        .min((ceiling - employer).max(0.0))
        .round();
    (employee, employer)
}

pub fn project_growth(
    inputs: &CalculatorInputs,
    eligibility: &EligibilityResult,
    rules: &TaxYearRules,
) -> GrowthOutcome {
    let rate = growth_rate(inputs.investment.expected_return);
    let medical_expense = non_negative(inputs.medical.current_annual_expenses).round();
    let starting_balance = non_negative(inputs.contribution.current_balance).round();
    let years = clamp_horizon(inputs.investment.years_to_retirement);

    let mut rows = Vec::with_capacity(years as usize);
    let mut balance = starting_balance;
    let mut total_contributions = 0.0;
    let mut receipts_banked = 0.0;

    for year_index in 0..years {
        let age = inputs.eligibility.age.saturating_add(year_index);
        let (employee, employer) = credited_contributions(inputs, eligibility, rules, year_index);

        receipts_banked += medical_expense;
        total_contributions += employee + employer;
        balance = ((balance + employee + employer) * (1.0 + rate))
            .round()
            .max(0.0);

        rows.push(GrowthProjectionYear {
            year: year_index + 1,
            age,
            contribution: employee,
            employer_contribution: employer,
            medical_expense,
            receipts_banked,
            year_end_balance: balance,
            cumulative_growth: balance - starting_balance - total_contributions,
        });
    }

    GrowthOutcome {
        rows,
        starting_balance,
        final_balance: balance,
        total_contributions,
        total_receipts_banked: receipts_banked,
    }
}

/// Draws the retirement medical expense each year and grows what is left.
pub fn project_decumulation(
    inputs: &CalculatorInputs,
    retirement_balance: f64,
) -> DecumulationOutcome {
    let rate = growth_rate(inputs.investment.expected_return);
    let expense = non_negative(inputs.medical.retirement_annual_expenses).round();
    let start_age = inputs
        .eligibility
        .age
        .saturating_add(clamp_horizon(inputs.investment.years_to_retirement));
    let years = clamp_horizon(inputs.investment.years_in_retirement);

    let mut rows = Vec::with_capacity(years as usize);
    let mut balance = retirement_balance.max(0.0);
    for offset in 0..years {
        let medical_withdrawal = expense.min(balance);
        balance = ((balance - medical_withdrawal) * (1.0 + rate))
            .round()
            .max(0.0);
        rows.push(DecumulationYear {
            age: start_age.saturating_add(offset),
            medical_withdrawal,
            year_end_balance: balance,
        });
    }

    let years_of_medical_covered = if expense > 0.0 {
        round_to_tenth(retirement_balance.max(0.0) / expense)
    } else {
        0.0
    };

    DecumulationOutcome {
        rows,
        end_of_life_balance: balance,
        years_of_medical_covered,
    }
}

pub fn analyze_tax_savings(
    inputs: &CalculatorInputs,
    eligibility: &EligibilityResult,
    growth: &GrowthOutcome,
    rules: &TaxYearRules,
) -> TaxSavingsAnalysis {
    let federal_rate = percent(inputs.tax.marginal_tax_rate);
    let state_honors_deduction = rules.state_honors_deduction(&inputs.tax.state);
    let state_rate = if state_honors_deduction {
        percent(rules.state_rate(&inputs.tax.state))
    } else {
        0.0
    };
    let fica_rate = rules.fica_rate;
    let combined_rate = federal_rate + state_rate + fica_rate;

    let (employee, employer) = credited_contributions(inputs, eligibility, rules, 0);
    let current_year_contribution = employee + employer;
    let federal_savings = (current_year_contribution * federal_rate).round();
    let state_savings = (current_year_contribution * state_rate).round();
    let fica_savings = (current_year_contribution * fica_rate).round();
    let current_year_savings = federal_savings + state_savings + fica_savings;

    let contributing_years = growth
        .rows
        .iter()
        .filter(|row| row.contribution + row.employer_contribution > 0.0)
        .count() as u32;
    let lifetime_contribution_savings = (growth.total_contributions * combined_rate).round();

    let capital_gains_rate = marginal_capital_gains_rate(inputs.tax.marginal_tax_rate);
    let tax_free_growth_value = (growth.total_growth().max(0.0) * capital_gains_rate).round();

    let retirement_medical_total = non_negative(inputs.medical.retirement_annual_expenses)
        * clamp_horizon(inputs.investment.years_in_retirement) as f64;
    let tax_free_withdrawal_value = (growth.final_balance.min(retirement_medical_total)
        * percent(inputs.tax.retirement_tax_rate))
    .round();
    let receipts_reimbursable = growth.total_receipts_banked.min(growth.final_balance);

    TaxSavingsAnalysis {
        federal_rate,
        state_rate,
        fica_rate,
        state_honors_deduction,
        combined_rate,
        current_year_contribution,
        federal_savings,
        state_savings,
        fica_savings,
        current_year_savings,
        contributing_years,
        lifetime_contribution_savings,
        capital_gains_rate,
        tax_free_growth_value,
        tax_free_withdrawal_value,
        receipts_reimbursable,
        lifetime_savings: lifetime_contribution_savings
            + tax_free_growth_value
            + tax_free_withdrawal_value,
    }
}

/// Replays the same contributions through an ordinary brokerage account.
///
/// Each contribution is reduced by the federal marginal and FICA rates before
/// it is invested, and growth is taxed every year at the tiered capital-gains
/// rate as if it were realized annually.
pub fn compare_taxable_account(
    inputs: &CalculatorInputs,
    growth: &GrowthOutcome,
    tax_savings: &TaxSavingsAnalysis,
    rules: &TaxYearRules,
) -> ComparisonAnalysis {
    let rate = growth_rate(inputs.investment.expected_return);
    let federal_rate = percent(inputs.tax.marginal_tax_rate);
    let capital_gains_rate = marginal_capital_gains_rate(inputs.tax.marginal_tax_rate);
    let contribution_drag = (federal_rate + rules.fica_rate).min(1.0);

    let mut balance = growth.starting_balance;
    let mut total_contributed = 0.0;
    let mut taxes_paid = 0.0;
    for row in &growth.rows {
        let after_tax =
            ((row.contribution + row.employer_contribution) * (1.0 - contribution_drag)).round();
        balance += after_tax;
        total_contributed += after_tax;

        let gain = balance * rate;
        let tax = (gain.max(0.0) * capital_gains_rate).round();
        taxes_paid += tax;
        balance = (balance + gain - tax).round().max(0.0);
    }

    let hsa_strategy = StrategyOutcome {
        total_contributed: growth.total_contributions,
        final_balance: growth.final_balance,
        taxes_paid: 0.0,
        taxes_saved: tax_savings.lifetime_contribution_savings,
    };
    let taxable_account_strategy = StrategyOutcome {
        total_contributed,
        final_balance: balance,
        taxes_paid,
        taxes_saved: 0.0,
    };
    let hsa_advantage = hsa_strategy.final_balance - taxable_account_strategy.final_balance
        + hsa_strategy.taxes_saved;
    let advantage_percent = if taxable_account_strategy.final_balance > 0.0 {
        round_to_tenth(hsa_advantage / taxable_account_strategy.final_balance * 100.0)
    } else {
        0.0
    };

    ComparisonAnalysis {
        capital_gains_rate,
        hsa_strategy,
        taxable_account_strategy,
        hsa_advantage,
        advantage_percent,
    }
}

fn clamp_months(months: u32) -> u32 {
    months.clamp(1, 12)
}

pub(super) fn clamp_horizon(years: u32) -> u32 {
    years.min(MAX_HORIZON_YEARS)
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

fn percent_points(value: f64) -> f64 {
    non_negative(value).min(100.0)
}

fn percent(value: f64) -> f64 {
    percent_points(value) / 100.0
}

/// Tier lookup on the same clamped marginal rate the federal savings use.
fn marginal_capital_gains_rate(marginal_tax_rate: f64) -> f64 {
    CapitalGainsTier::for_marginal_rate(percent_points(marginal_tax_rate)).rate()
}

fn growth_rate(expected_return_pct: f64) -> f64 {
    if expected_return_pct.is_finite() {
        (expected_return_pct / 100.0).max(-1.0)
    } else {
        0.0
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn rules() -> &'static TaxYearRules {
        TaxYearRules::for_year(2025).expect("2025 rules")
    }

    fn sample_inputs() -> CalculatorInputs {
        CalculatorInputs::default()
    }

    fn oracle_inputs() -> CalculatorInputs {
        let mut inputs = sample_inputs();
        inputs.eligibility.age = 35;
        inputs.eligibility.coverage_type = CoverageType::Individual;
        inputs.eligibility.months_of_coverage = 12;
        inputs.contribution.current_contribution = 3_000.0;
        inputs.contribution.employer_contribution = 500.0;
        inputs.contribution.current_balance = 1_000.0;
        inputs.investment.expected_return = 10.0;
        inputs.investment.years_to_retirement = 3;
        inputs.investment.years_in_retirement = 2;
        inputs.tax.marginal_tax_rate = 22.0;
        inputs.tax.retirement_tax_rate = 12.0;
        inputs.tax.state = "TX".to_string();
        inputs.medical.current_annual_expenses = 1_000.0;
        inputs.medical.retirement_annual_expenses = 5_000.0;
        inputs
    }

    #[test]
    fn scenario_individual_full_year_limit() {
        let mut inputs = sample_inputs();
        inputs.eligibility.coverage_type = CoverageType::Individual;
        inputs.eligibility.age = 35;
        inputs.eligibility.months_of_coverage = 12;

        let result = evaluate_eligibility(&inputs.eligibility, &inputs.contribution, rules());
        assert!(result.is_eligible);
        assert_approx(result.catch_up_amount, 0.0);
        assert_approx(result.max_contribution, 4_300.0);
        assert_approx(result.prorated_max_contribution, 4_300.0);
    }

    #[test]
    fn scenario_half_year_coverage_prorates_limit() {
        let mut inputs = sample_inputs();
        inputs.eligibility.coverage_type = CoverageType::Individual;
        inputs.eligibility.age = 35;
        inputs.eligibility.months_of_coverage = 6;

        let result = evaluate_eligibility(&inputs.eligibility, &inputs.contribution, rules());
        assert_approx(result.max_contribution, 4_300.0);
        assert_approx(result.prorated_max_contribution, 2_150.0);
        assert!(result.reasons.iter().any(|r| r.contains("6 of 12")));
    }

    #[test]
    fn scenario_family_catch_up_at_55() {
        let mut inputs = sample_inputs();
        inputs.eligibility.coverage_type = CoverageType::Family;
        inputs.eligibility.age = 55;

        let result = evaluate_eligibility(&inputs.eligibility, &inputs.contribution, rules());
        assert_approx(result.base_limit, 8_550.0);
        assert_approx(result.catch_up_amount, 1_000.0);
        assert_approx(result.max_contribution, 9_550.0);
    }

    #[test]
    fn scenario_no_hdhp_zeroes_every_contribution() {
        let mut inputs = sample_inputs();
        inputs.eligibility.has_hdhp = false;
        inputs.contribution.current_contribution = 4_000.0;
        inputs.contribution.employer_contribution = 1_000.0;

        let results = calculate(&inputs, rules());
        assert!(!results.eligibility.is_eligible);
        assert!(!results.eligibility.reasons.is_empty());
        assert_eq!(results.projection.len(), 30);
        for row in &results.projection {
            assert_approx(row.contribution, 0.0);
            assert_approx(row.employer_contribution, 0.0);
        }
        assert_approx(results.tax_savings.current_year_savings, 0.0);
    }

    #[test]
    fn scenario_capital_gains_tier_drives_growth_tax() {
        let mut low = oracle_inputs();
        low.tax.marginal_tax_rate = 10.0;
        let results = calculate(&low, rules());
        assert_approx(results.tax_savings.capital_gains_rate, 0.0);
        assert_approx(results.comparison.capital_gains_rate, 0.0);
        assert_approx(results.comparison.taxable_account_strategy.taxes_paid, 0.0);

        let mut high = oracle_inputs();
        high.tax.marginal_tax_rate = 40.0;
        let results = calculate(&high, rules());
        assert_approx(results.tax_savings.capital_gains_rate, 0.20);
        assert_approx(results.comparison.capital_gains_rate, 0.20);
    }

    #[test]
    fn medicare_enrollment_blocks_contributions() {
        let mut inputs = sample_inputs();
        inputs.eligibility.enrolled_in_medicare = true;

        let results = calculate(&inputs, rules());
        assert!(!results.eligibility.is_eligible);
        assert!(
            results
                .projection
                .iter()
                .all(|row| row.contribution == 0.0 && row.employer_contribution == 0.0)
        );
    }

    #[test]
    fn oracle_projection_matches_hand_calculation() {
        let inputs = oracle_inputs();
        let results = calculate(&inputs, rules());

        // ((1000 + 3500) * 1.1 + 3500) * 1.1 ... rounded each year
        let balances: Vec<f64> = results
            .projection
            .iter()
            .map(|row| row.year_end_balance)
            .collect();
        assert_eq!(balances, vec![4_950.0, 9_295.0, 14_075.0]);
        assert_approx(results.retirement_balance, 14_075.0);

        let last = results.projection.last().expect("three rows");
        assert_eq!(last.year, 3);
        assert_eq!(last.age, 37);
        assert_approx(last.receipts_banked, 3_000.0);
        assert_approx(last.cumulative_growth, 14_075.0 - 1_000.0 - 10_500.0);
        assert_approx(results.total_receipts_banked, 3_000.0);
    }

    #[test]
    fn oracle_taxable_comparison_matches_hand_calculation() {
        let inputs = oracle_inputs();
        let results = calculate(&inputs, rules());
        let taxable = &results.comparison.taxable_account_strategy;

        // after-tax contribution: round(3500 * (1 - 0.22 - 0.0765)) = 2462
        // 3462 -> 3756 (tax 52) -> 6747 (tax 93) -> 9992 (tax 138)
        assert_approx(taxable.total_contributed, 3.0 * 2_462.0);
        assert_approx(taxable.final_balance, 9_992.0);
        assert_approx(taxable.taxes_paid, 283.0);
        assert_approx(results.comparison.capital_gains_rate, 0.15);
    }

    #[test]
    fn oracle_decumulation_draws_medical_then_grows() {
        let inputs = oracle_inputs();
        let results = calculate(&inputs, rules());

        // (14075 - 5000) * 1.1 = 9982.5 -> 9983; (9983 - 5000) * 1.1 = 5481.3 -> 5481
        assert_eq!(results.decumulation.len(), 2);
        assert_eq!(results.decumulation[0].age, 38);
        assert_approx(results.decumulation[0].medical_withdrawal, 5_000.0);
        assert_approx_tol(results.decumulation[0].year_end_balance, 9_983.0, 1.0);
        assert_approx_tol(results.end_of_life_balance, 5_481.0, 1.0);
        assert_approx(results.years_of_medical_covered, 2.8);
    }

    #[test]
    fn decumulation_floors_balance_at_zero() {
        let mut inputs = oracle_inputs();
        inputs.medical.retirement_annual_expenses = 50_000.0;
        inputs.investment.years_in_retirement = 5;

        let results = calculate(&inputs, rules());
        assert_approx(results.decumulation[0].medical_withdrawal, 14_075.0);
        for row in &results.decumulation {
            assert!(row.year_end_balance >= 0.0);
        }
        assert_approx(results.end_of_life_balance, 0.0);
    }

    #[test]
    fn zero_retirement_expense_covers_zero_years() {
        let mut inputs = oracle_inputs();
        inputs.medical.retirement_annual_expenses = 0.0;
        let results = calculate(&inputs, rules());
        assert_approx(results.years_of_medical_covered, 0.0);
        assert_approx(results.tax_savings.tax_free_withdrawal_value, 0.0);
    }

    #[test]
    fn tax_savings_breaks_down_by_jurisdiction() {
        let mut inputs = oracle_inputs();
        inputs.contribution.current_contribution = 3_500.0;
        inputs.contribution.employer_contribution = 500.0;
        inputs.tax.state = "NY".to_string();

        let savings = calculate(&inputs, rules()).tax_savings;
        assert_approx(savings.current_year_contribution, 4_000.0);
        assert_approx(savings.federal_savings, 880.0);
        assert_approx_tol(savings.state_savings, 274.0, 1.0);
        assert_approx(savings.fica_savings, 306.0);
        assert_approx(
            savings.current_year_savings,
            savings.federal_savings + savings.state_savings + savings.fica_savings,
        );
        assert!(savings.state_honors_deduction);
        assert_eq!(savings.contributing_years, 3);
    }

    #[test]
    fn non_deduction_state_gets_no_state_savings() {
        let mut inputs = oracle_inputs();
        inputs.tax.state = "CA".to_string();

        let savings = calculate(&inputs, rules()).tax_savings;
        assert!(!savings.state_honors_deduction);
        assert_approx(savings.state_rate, 0.0);
        assert_approx(savings.state_savings, 0.0);
    }

    #[test]
    fn lifetime_savings_sum_components() {
        let inputs = oracle_inputs();
        let savings = calculate(&inputs, rules()).tax_savings;

        // growth 2575 at 15%; withdrawal min(14075, 10000) at 12%
        assert_approx_tol(savings.tax_free_growth_value, 386.0, 1.0);
        assert_approx(savings.tax_free_withdrawal_value, 1_200.0);
        assert_approx(
            savings.lifetime_savings,
            savings.lifetime_contribution_savings
                + savings.tax_free_growth_value
                + savings.tax_free_withdrawal_value,
        );
        assert_approx(savings.receipts_reimbursable, 3_000.0);
    }

    #[test]
    fn contributions_are_capped_employer_first() {
        let mut inputs = oracle_inputs();
        inputs.contribution.current_contribution = 10_000.0;
        inputs.contribution.employer_contribution = 1_000.0;

        let eligibility = evaluate_eligibility(&inputs.eligibility, &inputs.contribution, rules());
        assert_approx(eligibility.remaining_contribution_room, 0.0);
        let (employee, employer) = credited_contributions(&inputs, &eligibility, rules(), 0);
        assert_approx(employer, 1_000.0);
        assert_approx(employee, 3_300.0);
    }

    #[test]
    fn catch_up_turns_on_mid_projection() {
        let mut inputs = oracle_inputs();
        inputs.eligibility.age = 54;
        inputs.contribution.current_contribution = 10_000.0;
        inputs.contribution.employer_contribution = 0.0;

        let results = calculate(&inputs, rules());
        assert_approx(results.projection[0].contribution, 4_300.0);
        assert_approx(results.projection[1].contribution, 5_300.0);
    }

    #[test]
    fn contributions_stop_at_medicare_age() {
        let mut inputs = oracle_inputs();
        inputs.eligibility.age = 63;
        inputs.investment.years_to_retirement = 4;

        let results = calculate(&inputs, rules());
        assert!(results.projection[0].contribution > 0.0);
        assert!(results.projection[1].contribution > 0.0);
        assert_approx(results.projection[2].contribution, 0.0);
        assert_approx(results.projection[3].employer_contribution, 0.0);
        assert_eq!(results.tax_savings.contributing_years, 2);
    }

    #[test]
    fn zero_year_horizon_keeps_existing_balance() {
        let mut inputs = oracle_inputs();
        inputs.investment.years_to_retirement = 0;

        let results = calculate(&inputs, rules());
        assert!(results.projection.is_empty());
        assert_approx(results.retirement_balance, 1_000.0);
        assert_approx(results.comparison.taxable_account_strategy.final_balance, 1_000.0);
        assert!(results.tax_savings.current_year_savings > 0.0);
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let mut inputs = oracle_inputs();
        inputs.eligibility.months_of_coverage = 0;
        inputs.contribution.current_contribution = -500.0;
        inputs.contribution.current_balance = f64::NAN;
        inputs.investment.expected_return = -250.0;

        let results = calculate(&inputs, rules());
        assert_approx(results.eligibility.prorated_max_contribution, 358.0);
        assert_approx(results.projection[0].contribution, 0.0);
        for row in &results.projection {
            assert!(row.year_end_balance.is_finite());
            assert!(row.year_end_balance >= 0.0);
        }
    }

    #[test]
    fn horizons_are_clamped_to_max_years() {
        let mut inputs = oracle_inputs();
        inputs.eligibility.age = 20;
        inputs.investment.years_to_retirement = u32::MAX;
        inputs.investment.years_in_retirement = u32::MAX;

        let results = calculate(&inputs, rules());
        assert_eq!(results.projection.len(), MAX_HORIZON_YEARS as usize);
        assert_eq!(results.decumulation.len(), MAX_HORIZON_YEARS as usize);
        assert_eq!(
            results.decumulation[0].age,
            20 + MAX_HORIZON_YEARS,
            "retirement starts after the clamped accumulation horizon"
        );
        assert!(results.retirement_balance.is_finite());
        assert!(results.tax_savings.tax_free_withdrawal_value.is_finite());
    }

    #[test]
    fn non_finite_marginal_rate_uses_zero_tier() {
        let mut inputs = oracle_inputs();
        inputs.tax.marginal_tax_rate = f64::NAN;

        let results = calculate(&inputs, rules());
        assert_approx(results.tax_savings.federal_rate, 0.0);
        assert_approx(results.tax_savings.capital_gains_rate, 0.0);
        assert_approx(results.comparison.capital_gains_rate, 0.0);

        inputs.tax.marginal_tax_rate = 250.0;
        let results = calculate(&inputs, rules());
        assert_approx(results.tax_savings.federal_rate, 1.0);
        assert_approx(results.tax_savings.capital_gains_rate, 0.20);
    }

    #[test]
    fn unsupported_plan_year_is_an_error() {
        let err = calculate_for_year(&sample_inputs(), 1990).expect_err("no 1990 tables");
        assert_eq!(err, CalcError::UnsupportedYear(1990));

        let results = calculate_for_year(&sample_inputs(), 2026).expect("2026 tables");
        assert_eq!(results.plan_year, 2026);
        assert_approx(results.eligibility.base_limit, 4_400.0);
    }

    #[test]
    fn guidance_has_five_fixed_steps() {
        let results = calculate(&sample_inputs(), rules());
        assert_eq!(results.guidance.len(), 5);
        let steps: Vec<u32> = results.guidance.iter().map(|g| g.step).collect();
        assert_eq!(steps, vec![1, 2, 3, 4, 5]);
        assert!(results.guidance.iter().all(|g| !g.impact.is_empty()));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_eligibility_ceilings_are_consistent(
            has_hdhp in proptest::bool::ANY,
            medicare in proptest::bool::ANY,
            family in proptest::bool::ANY,
            age in 18u32..90,
            months in 1u32..13,
            employee in 0u32..12_000,
            employer in 0u32..6_000,
        ) {
            let mut inputs = sample_inputs();
            inputs.eligibility.has_hdhp = has_hdhp;
            inputs.eligibility.enrolled_in_medicare = medicare;
            inputs.eligibility.coverage_type =
                if family { CoverageType::Family } else { CoverageType::Individual };
            inputs.eligibility.age = age;
            inputs.eligibility.months_of_coverage = months;
            inputs.contribution.current_contribution = employee as f64;
            inputs.contribution.employer_contribution = employer as f64;

            let result = evaluate_eligibility(&inputs.eligibility, &inputs.contribution, rules());
            prop_assert!(result.prorated_max_contribution <= result.max_contribution);
            prop_assert!(result.prorated_max_contribution >= 0.0);
            if months == 12 {
                prop_assert_eq!(result.prorated_max_contribution, result.max_contribution);
            }
            let expected_room =
                (result.prorated_max_contribution - (employee + employer) as f64).max(0.0);
            prop_assert_eq!(result.remaining_contribution_room, expected_room);
            prop_assert_eq!(result.is_eligible, has_hdhp && !medicare);
        }

        #[test]
        fn prop_projection_shape_and_floor(
            has_hdhp in proptest::bool::ANY,
            medicare in proptest::bool::ANY,
            age in 18u32..80,
            years in 0u32..50,
            return_bp in -2_000i32..2_000,
            balance in 0u32..200_000,
            employee in 0u32..10_000,
        ) {
            let mut inputs = sample_inputs();
            inputs.eligibility.has_hdhp = has_hdhp;
            inputs.eligibility.enrolled_in_medicare = medicare;
            inputs.eligibility.age = age;
            inputs.investment.years_to_retirement = years;
            inputs.investment.expected_return = return_bp as f64 / 100.0;
            inputs.contribution.current_balance = balance as f64;
            inputs.contribution.current_contribution = employee as f64;

            let results = calculate(&inputs, rules());
            prop_assert_eq!(results.projection.len(), years as usize);
            for (idx, row) in results.projection.iter().enumerate() {
                prop_assert_eq!(row.age, age + idx as u32);
                prop_assert!(row.year_end_balance >= 0.0);
                if !has_hdhp || medicare {
                    prop_assert_eq!(row.contribution, 0.0);
                    prop_assert_eq!(row.employer_contribution, 0.0);
                }
            }
            for row in &results.decumulation {
                prop_assert!(row.year_end_balance >= 0.0);
            }
        }

        #[test]
        fn prop_higher_return_never_lowers_retirement_balance(
            age in 20u32..64,
            years in 1u32..45,
            low_bp in 0i32..1_200,
            bump_bp in 0i32..600,
            balance in 0u32..100_000,
            employee in 0u32..5_000,
        ) {
            let mut inputs = sample_inputs();
            inputs.eligibility.age = age;
            inputs.investment.years_to_retirement = years;
            inputs.contribution.current_balance = balance as f64;
            inputs.contribution.current_contribution = employee as f64;

            inputs.investment.expected_return = low_bp as f64 / 100.0;
            let low = calculate(&inputs, rules());
            inputs.investment.expected_return = (low_bp + bump_bp) as f64 / 100.0;
            let high = calculate(&inputs, rules());
            prop_assert!(high.retirement_balance >= low.retirement_balance);
        }

        #[test]
        fn prop_advantage_reconciles_with_strategies(
            age in 20u32..64,
            years in 0u32..40,
            marginal in 0u32..40,
            return_bp in 0i32..1_200,
            employee in 0u32..8_000,
        ) {
            let mut inputs = sample_inputs();
            inputs.eligibility.age = age;
            inputs.investment.years_to_retirement = years;
            inputs.tax.marginal_tax_rate = marginal as f64;
            inputs.investment.expected_return = return_bp as f64 / 100.0;
            inputs.contribution.current_contribution = employee as f64;

            let comparison = calculate(&inputs, rules()).comparison;
            let expected = comparison.hsa_strategy.final_balance
                - comparison.taxable_account_strategy.final_balance
                + comparison.hsa_strategy.taxes_saved;
            prop_assert!((comparison.hsa_advantage - expected).abs() <= 1.0);
            prop_assert!(comparison.taxable_account_strategy.final_balance >= 0.0);
        }
    }
}
