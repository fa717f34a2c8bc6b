//! Calendar-year legal constants used by the calculator.
//!
//! Tables are keyed by plan year. Adding a year means appending one entry to
//! [`RULES`]; nothing else in the crate hardcodes a limit.

use serde::{Deserialize, Serialize};

use super::types::CoverageType;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilingStatus {
    Single,
    #[serde(alias = "marriedJoint", alias = "married_joint", alias = "married")]
    MarriedJoint,
    #[serde(alias = "marriedSeparate", alias = "married_separate")]
    MarriedSeparate,
    #[serde(alias = "headOfHousehold", alias = "head_of_household")]
    HeadOfHousehold,
}

/// Lower edge of a federal ordinary-income bracket. `rate` is in percent.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FederalBracket {
    pub threshold: f64,
    pub rate: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingSchedule {
    pub standard_deduction: f64,
    pub brackets: &'static [FederalBracket],
}

impl FilingSchedule {
    /// Marginal bracket rate (percent) for a gross income after the standard deduction.
    pub fn marginal_rate(&self, gross_income: f64) -> f64 {
        let taxable = (gross_income - self.standard_deduction).max(0.0);
        self.brackets
            .iter()
            .take_while(|b| taxable > b.threshold || b.threshold == 0.0)
            .last()
            .map(|b| b.rate)
            .unwrap_or(0.0)
    }
}

/// Long-term capital-gains rate selected from the ordinary marginal rate.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CapitalGainsTier {
    Zero,
    Fifteen,
    Twenty,
}

impl CapitalGainsTier {
    pub const ZERO_CEILING: f64 = 12.0;
    pub const FIFTEEN_CEILING: f64 = 35.0;

    pub fn for_marginal_rate(marginal_rate_pct: f64) -> Self {
        if marginal_rate_pct <= Self::ZERO_CEILING {
            CapitalGainsTier::Zero
        } else if marginal_rate_pct <= Self::FIFTEEN_CEILING {
            CapitalGainsTier::Fifteen
        } else {
            CapitalGainsTier::Twenty
        }
    }

    pub fn rate(self) -> f64 {
        match self {
            CapitalGainsTier::Zero => 0.0,
            CapitalGainsTier::Fifteen => 0.15,
            CapitalGainsTier::Twenty => 0.20,
        }
    }
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxYearRules {
    pub year: u16,
    pub individual_limit: f64,
    pub family_limit: f64,
    pub catch_up_amount: f64,
    pub catch_up_age: u32,
    pub medicare_age: u32,
    pub fica_rate: f64,
    pub state_rates: &'static [(&'static str, f64)],
    pub non_deduction_states: &'static [&'static str],
    pub single: FilingSchedule,
    pub married_joint: FilingSchedule,
    pub married_separate: FilingSchedule,
    pub head_of_household: FilingSchedule,
}

impl TaxYearRules {
    pub const DEFAULT_YEAR: u16 = 2025;

    pub fn for_year(year: u16) -> Option<&'static TaxYearRules> {
        RULES.iter().find(|r| r.year == year)
    }

    pub fn latest() -> &'static TaxYearRules {
        RULES
            .iter()
            .max_by_key(|r| r.year)
            .unwrap_or(&RULES[0])
    }

    pub fn default_year() -> &'static TaxYearRules {
        Self::for_year(Self::DEFAULT_YEAR).unwrap_or_else(Self::latest)
    }

    pub fn supported_years() -> impl Iterator<Item = u16> {
        RULES.iter().map(|r| r.year)
    }

    pub fn base_limit(&self, coverage: CoverageType) -> f64 {
        match coverage {
            CoverageType::Individual => self.individual_limit,
            CoverageType::Family => self.family_limit,
        }
    }

    pub fn catch_up_for_age(&self, age: u32) -> f64 {
        if age >= self.catch_up_age {
            self.catch_up_amount
        } else {
            0.0
        }
    }

    /// Full-year ceiling for a given coverage type and age.
    pub fn annual_limit(&self, coverage: CoverageType, age: u32) -> f64 {
        self.base_limit(coverage) + self.catch_up_for_age(age)
    }

    /// State income-tax rate in percent. Unknown codes are treated as untaxed.
    pub fn state_rate(&self, state: &str) -> f64 {
        let code = state.trim();
        self.state_rates
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(code))
            .map(|(_, rate)| *rate)
            .unwrap_or(0.0)
    }

    pub fn is_known_state(&self, state: &str) -> bool {
        let code = state.trim();
        self.state_rates
            .iter()
            .any(|(c, _)| c.eq_ignore_ascii_case(code))
    }

    pub fn state_honors_deduction(&self, state: &str) -> bool {
        let code = state.trim();
        !self
            .non_deduction_states
            .iter()
            .any(|c| c.eq_ignore_ascii_case(code))
    }

    pub fn schedule(&self, status: FilingStatus) -> &FilingSchedule {
        match status {
            FilingStatus::Single => &self.single,
            FilingStatus::MarriedJoint => &self.married_joint,
            FilingStatus::MarriedSeparate => &self.married_separate,
            FilingStatus::HeadOfHousehold => &self.head_of_household,
        }
    }
}

const fn bracket(threshold: f64, rate: f64) -> FederalBracket {
    FederalBracket { threshold, rate }
}

// Top marginal personal income-tax rates, percent.
const STATE_RATES: &[(&str, f64)] = &[
    ("AL", 5.0),
    ("AK", 0.0),
    ("AZ", 2.5),
    ("AR", 3.9),
    ("CA", 9.3),
    ("CO", 4.4),
    ("CT", 5.0),
    ("DE", 5.55),
    ("DC", 6.5),
    ("FL", 0.0),
    ("GA", 5.39),
    ("HI", 7.9),
    ("ID", 5.695),
    ("IL", 4.95),
    ("IN", 3.0),
    ("IA", 3.8),
    ("KS", 5.58),
    ("KY", 4.0),
    ("LA", 3.0),
    ("ME", 7.15),
    ("MD", 4.75),
    ("MA", 5.0),
    ("MI", 4.25),
    ("MN", 6.8),
    ("MS", 4.4),
    ("MO", 4.7),
    ("MT", 5.9),
    ("NE", 5.2),
    ("NV", 0.0),
    ("NH", 0.0),
    ("NJ", 6.37),
    ("NM", 4.9),
    ("NY", 6.85),
    ("NC", 4.25),
    ("ND", 1.95),
    ("OH", 3.5),
    ("OK", 4.75),
    ("OR", 8.75),
    ("PA", 3.07),
    ("RI", 4.75),
    ("SC", 6.2),
    ("SD", 0.0),
    ("TN", 0.0),
    ("TX", 0.0),
    ("UT", 4.55),
    ("VT", 6.6),
    ("VA", 5.75),
    ("WA", 0.0),
    ("WV", 4.82),
    ("WI", 5.3),
    ("WY", 0.0),
];

const NON_DEDUCTION_STATES: &[&str] = &["CA", "NJ"];

const SINGLE_2024: &[FederalBracket] = &[
    bracket(0.0, 10.0),
    bracket(11_600.0, 12.0),
    bracket(47_150.0, 22.0),
    bracket(100_525.0, 24.0),
    bracket(191_950.0, 32.0),
    bracket(243_725.0, 35.0),
    bracket(609_350.0, 37.0),
];
const JOINT_2024: &[FederalBracket] = &[
    bracket(0.0, 10.0),
    bracket(23_200.0, 12.0),
    bracket(94_300.0, 22.0),
    bracket(201_050.0, 24.0),
    bracket(383_900.0, 32.0),
    bracket(487_450.0, 35.0),
    bracket(731_200.0, 37.0),
];
const SEPARATE_2024: &[FederalBracket] = &[
    bracket(0.0, 10.0),
    bracket(11_600.0, 12.0),
    bracket(47_150.0, 22.0),
    bracket(100_525.0, 24.0),
    bracket(191_950.0, 32.0),
    bracket(243_725.0, 35.0),
    bracket(365_600.0, 37.0),
];
const HEAD_2024: &[FederalBracket] = &[
    bracket(0.0, 10.0),
    bracket(16_550.0, 12.0),
    bracket(63_100.0, 22.0),
    bracket(100_500.0, 24.0),
    bracket(191_950.0, 32.0),
    bracket(243_700.0, 35.0),
    bracket(609_350.0, 37.0),
];

const SINGLE_2025: &[FederalBracket] = &[
    bracket(0.0, 10.0),
    bracket(11_925.0, 12.0),
    bracket(48_475.0, 22.0),
    bracket(103_350.0, 24.0),
    bracket(197_300.0, 32.0),
    bracket(250_525.0, 35.0),
    bracket(626_350.0, 37.0),
];
const JOINT_2025: &[FederalBracket] = &[
    bracket(0.0, 10.0),
    bracket(23_850.0, 12.0),
    bracket(96_950.0, 22.0),
    bracket(206_700.0, 24.0),
    bracket(394_600.0, 32.0),
    bracket(501_050.0, 35.0),
    bracket(751_600.0, 37.0),
];
const SEPARATE_2025: &[FederalBracket] = &[
    bracket(0.0, 10.0),
    bracket(11_925.0, 12.0),
    bracket(48_475.0, 22.0),
    bracket(103_350.0, 24.0),
    bracket(197_300.0, 32.0),
    bracket(250_525.0, 35.0),
    bracket(375_800.0, 37.0),
];
const HEAD_2025: &[FederalBracket] = &[
    bracket(0.0, 10.0),
    bracket(17_000.0, 12.0),
    bracket(64_850.0, 22.0),
    bracket(103_350.0, 24.0),
    bracket(197_300.0, 32.0),
    bracket(250_500.0, 35.0),
    bracket(626_350.0, 37.0),
];

const SINGLE_2026: &[FederalBracket] = &[
    bracket(0.0, 10.0),
    bracket(12_400.0, 12.0),
    bracket(50_400.0, 22.0),
    bracket(105_700.0, 24.0),
    bracket(201_775.0, 32.0),
    bracket(256_225.0, 35.0),
    bracket(640_600.0, 37.0),
];
const JOINT_2026: &[FederalBracket] = &[
    bracket(0.0, 10.0),
    bracket(24_800.0, 12.0),
    bracket(100_800.0, 22.0),
    bracket(211_400.0, 24.0),
    bracket(403_550.0, 32.0),
    bracket(512_450.0, 35.0),
    bracket(768_700.0, 37.0),
];
const SEPARATE_2026: &[FederalBracket] = &[
    bracket(0.0, 10.0),
    bracket(12_400.0, 12.0),
    bracket(50_400.0, 22.0),
    bracket(105_700.0, 24.0),
    bracket(201_775.0, 32.0),
    bracket(256_225.0, 35.0),
    bracket(384_350.0, 37.0),
];
const HEAD_2026: &[FederalBracket] = &[
    bracket(0.0, 10.0),
    bracket(17_700.0, 12.0),
    bracket(67_450.0, 22.0),
    bracket(105_700.0, 24.0),
    bracket(201_750.0, 32.0),
    bracket(256_200.0, 35.0),
    bracket(640_600.0, 37.0),
];

static RULES: [TaxYearRules; 3] = [
    TaxYearRules {
        year: 2024,
        individual_limit: 4_150.0,
        family_limit: 8_300.0,
        catch_up_amount: 1_000.0,
        catch_up_age: 55,
        medicare_age: 65,
        fica_rate: 0.0765,
        state_rates: STATE_RATES,
        non_deduction_states: NON_DEDUCTION_STATES,
        single: FilingSchedule {
            standard_deduction: 14_600.0,
            brackets: SINGLE_2024,
        },
        married_joint: FilingSchedule {
            standard_deduction: 29_200.0,
            brackets: JOINT_2024,
        },
        married_separate: FilingSchedule {
            standard_deduction: 14_600.0,
            brackets: SEPARATE_2024,
        },
        head_of_household: FilingSchedule {
            standard_deduction: 21_900.0,
            brackets: HEAD_2024,
        },
    },
    TaxYearRules {
        year: 2025,
        individual_limit: 4_300.0,
        family_limit: 8_550.0,
        catch_up_amount: 1_000.0,
        catch_up_age: 55,
        medicare_age: 65,
        fica_rate: 0.0765,
        state_rates: STATE_RATES,
        non_deduction_states: NON_DEDUCTION_STATES,
        single: FilingSchedule {
            standard_deduction: 15_750.0,
            brackets: SINGLE_2025,
        },
        married_joint: FilingSchedule {
            standard_deduction: 31_500.0,
            brackets: JOINT_2025,
        },
        married_separate: FilingSchedule {
            standard_deduction: 15_750.0,
            brackets: SEPARATE_2025,
        },
        head_of_household: FilingSchedule {
            standard_deduction: 23_625.0,
            brackets: HEAD_2025,
        },
    },
    TaxYearRules {
        year: 2026,
        individual_limit: 4_400.0,
        family_limit: 8_750.0,
        catch_up_amount: 1_000.0,
        catch_up_age: 55,
        medicare_age: 65,
        fica_rate: 0.0765,
        state_rates: STATE_RATES,
        non_deduction_states: NON_DEDUCTION_STATES,
        single: FilingSchedule {
            standard_deduction: 16_100.0,
            brackets: SINGLE_2026,
        },
        married_joint: FilingSchedule {
            standard_deduction: 32_200.0,
            brackets: JOINT_2026,
        },
        married_separate: FilingSchedule {
            standard_deduction: 16_100.0,
            brackets: SEPARATE_2026,
        },
        head_of_household: FilingSchedule {
            standard_deduction: 24_150.0,
            brackets: HEAD_2026,
        },
    },
];
