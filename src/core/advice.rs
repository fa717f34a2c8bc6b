use super::engine::{DecumulationOutcome, GrowthOutcome, clamp_horizon};
use super::rules::TaxYearRules;
use super::types::{
    CalculatorInputs, ComparisonAnalysis, EligibilityResult, GuidanceStep, TaxSavingsAnalysis,
};

const LOW_RETURN_THRESHOLD_PCT: f64 = 4.0;
const MEDICARE_LOOKAHEAD_YEARS: u32 = 3;
const EXCESS_CONTRIBUTION_EXCISE_PCT: u32 = 6;

pub fn build_recommendations(
    inputs: &CalculatorInputs,
    eligibility: &EligibilityResult,
    growth: &GrowthOutcome,
    tax_savings: &TaxSavingsAnalysis,
    rules: &TaxYearRules,
) -> Vec<String> {
    let mut out = Vec::new();
    if !eligibility.is_eligible {
        out.push(
            "Enroll in an HSA-eligible high-deductible health plan before contributing."
                .to_string(),
        );
        return out;
    }

    if eligibility.remaining_contribution_room > 0.0 {
        let extra_savings =
            (eligibility.remaining_contribution_room * tax_savings.combined_rate).round();
        out.push(format!(
            "Contribute another {} this year to reach your {} limit and save about {} in taxes.",
            format_currency(eligibility.remaining_contribution_room),
            format_currency(eligibility.prorated_max_contribution),
            format_currency(extra_savings),
        ));
    }

    if eligibility.catch_up_amount > 0.0 {
        out.push(format!(
            "You qualify for the {} catch-up contribution available from age {}.",
            format_currency(eligibility.catch_up_amount),
            rules.catch_up_age,
        ));
    }

    if inputs.investment.expected_return < LOW_RETURN_THRESHOLD_PCT {
        out.push(
            "Invest HSA funds beyond your deductible instead of holding cash to capture long-term growth."
                .to_string(),
        );
    }

    if growth.total_receipts_banked > 0.0 {
        out.push(format!(
            "Pay current medical costs out of pocket and keep receipts: {} can be reimbursed tax-free later.",
            format_currency(growth.total_receipts_banked),
        ));
    }

    if !tax_savings.state_honors_deduction {
        out.push(
            "Prioritize federal savings: your state taxes HSA contributions, but federal and FICA savings still apply."
                .to_string(),
        );
    }

    out
}

pub fn build_warnings(
    inputs: &CalculatorInputs,
    eligibility: &EligibilityResult,
    decumulation: &DecumulationOutcome,
    tax_savings: &TaxSavingsAnalysis,
    rules: &TaxYearRules,
) -> Vec<String> {
    let mut out = Vec::new();
    if !inputs.eligibility.has_hdhp {
        out.push("HSA contributions require coverage under a high-deductible health plan.".to_string());
    }
    if inputs.eligibility.enrolled_in_medicare {
        out.push("Medicare enrollment ends new HSA contributions; existing funds can still be spent.".to_string());
    }

    if !tax_savings.state_honors_deduction {
        out.push(format!(
            "{} does not recognize the HSA deduction; contributions remain subject to state income tax.",
            inputs.tax.state.trim().to_uppercase(),
        ));
    }

    let requested = inputs.contribution.current_contribution.max(0.0)
        + inputs.contribution.employer_contribution.max(0.0);
    if eligibility.is_eligible && requested > eligibility.prorated_max_contribution {
        out.push(format!(
            "Planned contributions exceed your limit by {}; excess contributions face a {}% excise tax.",
            format_currency(requested - eligibility.prorated_max_contribution),
            EXCESS_CONTRIBUTION_EXCISE_PCT,
        ));
    }

    let age = inputs.eligibility.age;
    if eligibility.is_eligible
        && age < rules.medicare_age
        && age.saturating_add(MEDICARE_LOOKAHEAD_YEARS) >= rules.medicare_age
    {
        out.push(format!(
            "Contributions must stop once you enroll in Medicare at {}; stop contributing six months before enrollment.",
            rules.medicare_age,
        ));
    }

    if eligibility.is_eligible && inputs.eligibility.months_of_coverage < 12 {
        out.push(
            "Partial-year coverage prorates your limit unless you use the last-month rule and stay covered through the testing period."
                .to_string(),
        );
    }

    let years_needed = clamp_horizon(inputs.investment.years_in_retirement);
    if inputs.medical.retirement_annual_expenses > 0.0
        && decumulation.years_of_medical_covered < years_needed as f64
    {
        out.push(format!(
            "Projected balance covers about {:.1} of {} retirement years of medical expenses.",
            decumulation.years_of_medical_covered, years_needed,
        ));
    }

    out
}

pub fn build_guidance(
    eligibility: &EligibilityResult,
    growth: &GrowthOutcome,
    decumulation: &DecumulationOutcome,
    comparison: &ComparisonAnalysis,
) -> Vec<GuidanceStep> {
    vec![
        GuidanceStep {
            step: 1,
            title: "Confirm eligibility",
            description: "Make sure you are covered by an HSA-eligible high-deductible plan and not enrolled in Medicare.",
            impact: if eligibility.is_eligible {
                format!(
                    "Annual limit {}",
                    format_currency(eligibility.prorated_max_contribution)
                )
            } else {
                "Not currently eligible to contribute".to_string()
            },
        },
        GuidanceStep {
            step: 2,
            title: "Maximize contributions",
            description: "Contribute through payroll to skip federal, state and FICA taxes on every dollar.",
            impact: format!(
                "{} of contribution room left this year",
                format_currency(eligibility.remaining_contribution_room)
            ),
        },
        GuidanceStep {
            step: 3,
            title: "Invest the balance",
            description: "Keep a small cash cushion and invest the rest for tax-free compounding.",
            impact: format!(
                "Projected {} at retirement",
                format_currency(growth.final_balance)
            ),
        },
        GuidanceStep {
            step: 4,
            title: "Bank your receipts",
            description: "Pay medical bills out of pocket today and save receipts for tax-free reimbursement later.",
            impact: format!(
                "{} in receipts banked",
                format_currency(growth.total_receipts_banked)
            ),
        },
        GuidanceStep {
            step: 5,
            title: "Spend it in retirement",
            description: "Use the account for retirement medical costs, where withdrawals stay tax-free.",
            impact: format!(
                "Covers {:.1} years of medical costs, {} ahead of a taxable account",
                decumulation.years_of_medical_covered,
                format_currency(comparison.hsa_advantage)
            ),
        },
    ]
}

/// Whole-dollar display with thousands separators, e.g. `$12,345` or `-$50`.
pub fn format_currency(amount: f64) -> String {
    if !amount.is_finite() {
        return "$0".to_string();
    }
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}
