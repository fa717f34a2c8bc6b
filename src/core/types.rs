use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageType {
    #[default]
    Individual,
    Family,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityInputs {
    pub has_hdhp: bool,
    pub coverage_type: CoverageType,
    pub age: u32,
    pub enrolled_in_medicare: bool,
    pub months_of_coverage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionInputs {
    pub current_contribution: f64,
    pub employer_contribution: f64,
    pub current_balance: f64,
}

/// Percent-valued return assumption and horizons, all in whole years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentInputs {
    pub expected_return: f64,
    pub years_to_retirement: u32,
    pub years_in_retirement: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxInputs {
    pub marginal_tax_rate: f64,
    pub retirement_tax_rate: f64,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalInputs {
    pub current_annual_expenses: f64,
    pub retirement_annual_expenses: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorInputs {
    pub eligibility: EligibilityInputs,
    pub contribution: ContributionInputs,
    pub investment: InvestmentInputs,
    pub tax: TaxInputs,
    pub medical: MedicalInputs,
}

impl Default for CalculatorInputs {
    fn default() -> Self {
        Self {
            eligibility: EligibilityInputs {
                has_hdhp: true,
                coverage_type: CoverageType::Individual,
                age: 35,
                enrolled_in_medicare: false,
                months_of_coverage: 12,
            },
            contribution: ContributionInputs {
                current_contribution: 3_000.0,
                employer_contribution: 500.0,
                current_balance: 5_000.0,
            },
            investment: InvestmentInputs {
                expected_return: 7.0,
                years_to_retirement: 30,
                years_in_retirement: 25,
            },
            tax: TaxInputs {
                marginal_tax_rate: 22.0,
                retirement_tax_rate: 15.0,
                state: "TX".to_string(),
            },
            medical: MedicalInputs {
                current_annual_expenses: 2_000.0,
                retirement_annual_expenses: 6_000.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResult {
    pub is_eligible: bool,
    pub base_limit: f64,
    pub catch_up_amount: f64,
    pub max_contribution: f64,
    pub prorated_max_contribution: f64,
    pub remaining_contribution_room: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthProjectionYear {
    pub year: u32,
    pub age: u32,
    pub contribution: f64,
    pub employer_contribution: f64,
    pub medical_expense: f64,
    pub receipts_banked: f64,
    pub year_end_balance: f64,
    pub cumulative_growth: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecumulationYear {
    pub age: u32,
    pub medical_withdrawal: f64,
    pub year_end_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxSavingsAnalysis {
    pub federal_rate: f64,
    pub state_rate: f64,
    pub fica_rate: f64,
    pub state_honors_deduction: bool,
    pub combined_rate: f64,
    pub current_year_contribution: f64,
    pub federal_savings: f64,
    pub state_savings: f64,
    pub fica_savings: f64,
    pub current_year_savings: f64,
    pub contributing_years: u32,
    pub lifetime_contribution_savings: f64,
    pub capital_gains_rate: f64,
    pub tax_free_growth_value: f64,
    pub tax_free_withdrawal_value: f64,
    pub receipts_reimbursable: f64,
    pub lifetime_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyOutcome {
    pub total_contributed: f64,
    pub final_balance: f64,
    pub taxes_paid: f64,
    pub taxes_saved: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonAnalysis {
    pub capital_gains_rate: f64,
    pub hsa_strategy: StrategyOutcome,
    pub taxable_account_strategy: StrategyOutcome,
    pub hsa_advantage: f64,
    pub advantage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceStep {
    pub step: u32,
    pub title: &'static str,
    pub description: &'static str,
    pub impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorResults {
    pub plan_year: u16,
    pub eligibility: EligibilityResult,
    pub projection: Vec<GrowthProjectionYear>,
    pub decumulation: Vec<DecumulationYear>,
    pub retirement_balance: f64,
    pub end_of_life_balance: f64,
    pub total_receipts_banked: f64,
    pub years_of_medical_covered: f64,
    pub tax_savings: TaxSavingsAnalysis,
    pub comparison: ComparisonAnalysis,
    pub recommendations: Vec<String>,
    pub warnings: Vec<String>,
    pub guidance: Vec<GuidanceStep>,
}
