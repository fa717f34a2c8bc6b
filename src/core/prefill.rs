//! Seeding calculator inputs from outside sources.
//!
//! Two collaborators feed the calculator before the first run: a stored
//! profile ("memory") of values the user typed into other tools, and named
//! presets. Profile values are mapped through an explicit rule table; presets
//! and request overrides are partial [`InputsPatch`] values merged over the
//! defaults field by field.

use serde::{Deserialize, Serialize};

use super::error::CalcError;
use super::rules::{FilingStatus, TaxYearRules};
use super::types::{CalculatorInputs, CoverageType};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileMemory {
    pub age: Option<u32>,
    pub annual_income: Option<f64>,
    pub filing_status: Option<FilingStatus>,
    pub state: Option<String>,
    pub retirement_savings: Option<f64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProfileField {
    Age,
    AnnualIncome,
    FilingStatus,
    State,
    RetirementSavings,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InputField {
    EligibilityAge,
    CoverageType,
    MarginalTaxRate,
    State,
}

type Transform =
    fn(&ProfileMemory, &TaxYearRules, &mut CalculatorInputs) -> Result<bool, CalcError>;

/// One (source, transform, destination) mapping. A transform returns
/// `Ok(false)` when the profile does not carry the source value.
#[derive(Copy, Clone)]
pub struct PrefillRule {
    pub source: ProfileField,
    pub destination: InputField,
    pub transform: Transform,
}

// `RetirementSavings` is deliberately absent: it describes 401(k)/IRA money,
// not an HSA balance.
pub const PREFILL_RULES: &[PrefillRule] = &[
    PrefillRule {
        source: ProfileField::Age,
        destination: InputField::EligibilityAge,
        transform: apply_age,
    },
    PrefillRule {
        source: ProfileField::FilingStatus,
        destination: InputField::CoverageType,
        transform: apply_coverage_type,
    },
    PrefillRule {
        source: ProfileField::State,
        destination: InputField::State,
        transform: apply_state,
    },
    PrefillRule {
        source: ProfileField::AnnualIncome,
        destination: InputField::MarginalTaxRate,
        transform: apply_marginal_rate,
    },
];

/// Applies every pre-fill rule in order and reports the (source, destination)
/// pairs that fired. `inputs` is left untouched when any rule fails.
pub fn prefill_from_memory(
    memory: &ProfileMemory,
    rules: &TaxYearRules,
    inputs: &mut CalculatorInputs,
) -> Result<Vec<(ProfileField, InputField)>, CalcError> {
    let mut staged = inputs.clone();
    let mut applied = Vec::new();
    for rule in PREFILL_RULES {
        if (rule.transform)(memory, rules, &mut staged)? {
            applied.push((rule.source, rule.destination));
        }
    }
    *inputs = staged;
    Ok(applied)
}

fn apply_age(
    memory: &ProfileMemory,
    _rules: &TaxYearRules,
    inputs: &mut CalculatorInputs,
) -> Result<bool, CalcError> {
    let Some(age) = memory.age else {
        return Ok(false);
    };
    if !(18..=120).contains(&age) {
        return Err(CalcError::InvalidProfile {
            field: "age",
            message: format!("{age} is outside 18..=120"),
        });
    }
    inputs.eligibility.age = age;
    Ok(true)
}

fn apply_coverage_type(
    memory: &ProfileMemory,
    _rules: &TaxYearRules,
    inputs: &mut CalculatorInputs,
) -> Result<bool, CalcError> {
    let Some(status) = memory.filing_status else {
        return Ok(false);
    };
    inputs.eligibility.coverage_type = match status {
        FilingStatus::MarriedJoint => CoverageType::Family,
        FilingStatus::Single | FilingStatus::MarriedSeparate | FilingStatus::HeadOfHousehold => {
            CoverageType::Individual
        }
    };
    Ok(true)
}

fn apply_state(
    memory: &ProfileMemory,
    rules: &TaxYearRules,
    inputs: &mut CalculatorInputs,
) -> Result<bool, CalcError> {
    let Some(state) = memory.state.as_deref() else {
        return Ok(false);
    };
    let code = state.trim().to_ascii_uppercase();
    if !rules.is_known_state(&code) {
        return Err(CalcError::InvalidProfile {
            field: "state",
            message: format!("unknown state code {state:?}"),
        });
    }
    inputs.tax.state = code;
    Ok(true)
}

fn apply_marginal_rate(
    memory: &ProfileMemory,
    rules: &TaxYearRules,
    inputs: &mut CalculatorInputs,
) -> Result<bool, CalcError> {
    let Some(income) = memory.annual_income else {
        return Ok(false);
    };
    if !income.is_finite() || income < 0.0 {
        return Err(CalcError::InvalidProfile {
            field: "annualIncome",
            message: "must be a finite amount >= 0".to_string(),
        });
    }
    let status = memory.filing_status.unwrap_or(FilingStatus::Single);
    inputs.tax.marginal_tax_rate = rules.schedule(status).marginal_rate(income);
    Ok(true)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EligibilityPatch {
    pub has_hdhp: Option<bool>,
    pub coverage_type: Option<CoverageType>,
    pub age: Option<u32>,
    pub enrolled_in_medicare: Option<bool>,
    pub months_of_coverage: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContributionPatch {
    pub current_contribution: Option<f64>,
    pub employer_contribution: Option<f64>,
    pub current_balance: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InvestmentPatch {
    pub expected_return: Option<f64>,
    pub years_to_retirement: Option<u32>,
    pub years_in_retirement: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaxPatch {
    pub marginal_tax_rate: Option<f64>,
    pub retirement_tax_rate: Option<f64>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MedicalPatch {
    pub current_annual_expenses: Option<f64>,
    pub retirement_annual_expenses: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputsPatch {
    pub eligibility: EligibilityPatch,
    pub contribution: ContributionPatch,
    pub investment: InvestmentPatch,
    pub tax: TaxPatch,
    pub medical: MedicalPatch,
}

fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *slot = v.clone();
    }
}

impl CalculatorInputs {
    /// Returns a copy with every `Some` field of `patch` written over.
    pub fn patched(&self, patch: &InputsPatch) -> CalculatorInputs {
        let mut out = self.clone();
        out.apply_patch(patch);
        out
    }

    pub fn apply_patch(&mut self, patch: &InputsPatch) {
        let e = &patch.eligibility;
        set(&mut self.eligibility.has_hdhp, &e.has_hdhp);
        set(&mut self.eligibility.coverage_type, &e.coverage_type);
        set(&mut self.eligibility.age, &e.age);
        set(&mut self.eligibility.enrolled_in_medicare, &e.enrolled_in_medicare);
        set(&mut self.eligibility.months_of_coverage, &e.months_of_coverage);

        let c = &patch.contribution;
        set(&mut self.contribution.current_contribution, &c.current_contribution);
        set(&mut self.contribution.employer_contribution, &c.employer_contribution);
        set(&mut self.contribution.current_balance, &c.current_balance);

        let i = &patch.investment;
        set(&mut self.investment.expected_return, &i.expected_return);
        set(&mut self.investment.years_to_retirement, &i.years_to_retirement);
        set(&mut self.investment.years_in_retirement, &i.years_in_retirement);

        let t = &patch.tax;
        set(&mut self.tax.marginal_tax_rate, &t.marginal_tax_rate);
        set(&mut self.tax.retirement_tax_rate, &t.retirement_tax_rate);
        set(&mut self.tax.state, &t.state);

        let m = &patch.medical;
        set(&mut self.medical.current_annual_expenses, &m.current_annual_expenses);
        set(&mut self.medical.retirement_annual_expenses, &m.retirement_annual_expenses);
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    #[serde(alias = "youngSingle", alias = "young_single")]
    YoungSingle,
    #[serde(alias = "familyMidCareer", alias = "family_mid_career")]
    FamilyMidCareer,
    #[serde(alias = "nearRetirement", alias = "near_retirement")]
    NearRetirement,
}

impl Preset {
    pub fn patch(self) -> InputsPatch {
        match self {
            Preset::YoungSingle => InputsPatch {
                eligibility: EligibilityPatch {
                    coverage_type: Some(CoverageType::Individual),
                    age: Some(27),
                    ..Default::default()
                },
                contribution: ContributionPatch {
                    current_contribution: Some(2_000.0),
                    employer_contribution: Some(500.0),
                    current_balance: Some(1_500.0),
                },
                investment: InvestmentPatch {
                    years_to_retirement: Some(38),
                    ..Default::default()
                },
                tax: TaxPatch {
                    marginal_tax_rate: Some(12.0),
                    ..Default::default()
                },
                medical: MedicalPatch {
                    current_annual_expenses: Some(800.0),
                    ..Default::default()
                },
            },
            Preset::FamilyMidCareer => InputsPatch {
                eligibility: EligibilityPatch {
                    coverage_type: Some(CoverageType::Family),
                    age: Some(42),
                    ..Default::default()
                },
                contribution: ContributionPatch {
                    current_contribution: Some(6_500.0),
                    employer_contribution: Some(1_500.0),
                    current_balance: Some(18_000.0),
                },
                investment: InvestmentPatch {
                    years_to_retirement: Some(23),
                    ..Default::default()
                },
                tax: TaxPatch {
                    marginal_tax_rate: Some(24.0),
                    ..Default::default()
                },
                medical: MedicalPatch {
                    current_annual_expenses: Some(4_500.0),
                    retirement_annual_expenses: Some(9_000.0),
                },
            },
            Preset::NearRetirement => InputsPatch {
                eligibility: EligibilityPatch {
                    age: Some(58),
                    ..Default::default()
                },
                contribution: ContributionPatch {
                    current_contribution: Some(5_300.0),
                    employer_contribution: Some(0.0),
                    current_balance: Some(45_000.0),
                },
                investment: InvestmentPatch {
                    expected_return: Some(5.0),
                    years_to_retirement: Some(7),
                    years_in_retirement: Some(25),
                },
                tax: TaxPatch {
                    marginal_tax_rate: Some(24.0),
                    retirement_tax_rate: Some(22.0),
                    ..Default::default()
                },
                medical: MedicalPatch {
                    retirement_annual_expenses: Some(7_500.0),
                    ..Default::default()
                },
            },
        }
    }
}
