use log::debug;
use serde::Deserialize;

use super::assumptions::Assumptions;
use super::types::{
    GuaranteedIncome, MAX_RETIREMENT_AGE, MIN_CURRENT_AGE, MaritalStatus, PlanInput, Province,
    RiskTier, SavingsBreakdown,
};

pub const DEFAULT_CURRENT_AGE: u32 = 30;
pub const DEFAULT_RETIREMENT_AGE: u32 = 65;
pub const DEFAULT_DESIRED_INCOME: f64 = 60_000.0;
pub const DEFAULT_REPLACEMENT_PERCENT: f64 = 70.0;
const MIN_REPLACEMENT_PERCENT: f64 = 40.0;
const MAX_REPLACEMENT_PERCENT: f64 = 100.0;
const MAX_HORIZON_YEARS: u32 = 60;

/// A form value as typed by the user: either already numeric or free text
/// such as `"$25,000"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawField {
    Number(f64),
    Text(String),
}

impl From<f64> for RawField {
    fn from(value: f64) -> Self {
        RawField::Number(value)
    }
}

impl From<&str> for RawField {
    fn from(value: &str) -> Self {
        RawField::Text(value.to_string())
    }
}

impl RawField {
    fn as_number(&self) -> Option<f64> {
        match self {
            RawField::Number(v) => v.is_finite().then_some(*v),
            RawField::Text(s) => parse_number(s),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Lifestyle {
    Essential,
    Comfortable,
    Enhanced,
    Custom,
}

impl Lifestyle {
    pub fn from_label(label: &str) -> Option<Self> {
        let lifestyle = match label.trim().to_ascii_lowercase().as_str() {
            "essential" => Lifestyle::Essential,
            "comfortable" => Lifestyle::Comfortable,
            "enhanced" => Lifestyle::Enhanced,
            "custom" => Lifestyle::Custom,
            _ => return None,
        };
        Some(lifestyle)
    }

    /// Share of pre-retirement income to replace, in percent. `None` for custom.
    pub fn replacement_percent(self) -> Option<f64> {
        match self {
            Lifestyle::Essential => Some(60.0),
            Lifestyle::Comfortable => Some(70.0),
            Lifestyle::Enhanced => Some(80.0),
            Lifestyle::Custom => None,
        }
    }
}

/// Unvalidated form fields. Rates are on the percent scale (6.5 means 6.5%).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPlanInput {
    pub current_age: Option<RawField>,
    pub retirement_age: Option<RawField>,
    pub province: Option<String>,
    pub marital_status: Option<String>,

    pub rrsp_balance: Option<RawField>,
    pub tfsa_balance: Option<RawField>,
    #[serde(alias = "pensionBalance")]
    pub pension_value: Option<RawField>,
    pub other_savings: Option<RawField>,
    pub non_registered_savings: Option<RawField>,
    #[serde(alias = "monthlyContribution")]
    pub monthly_contributions: Option<RawField>,

    pub annual_income: Option<RawField>,
    pub lifestyle: Option<String>,
    pub retirement_income_percent: Option<RawField>,
    #[serde(alias = "desiredAnnualIncome")]
    pub desired_income: Option<RawField>,

    #[serde(alias = "publicPension")]
    pub cpp_benefits: Option<RawField>,
    #[serde(alias = "oldAgeBenefit")]
    pub oas_benefits: Option<RawField>,
    #[serde(alias = "employerPension")]
    pub company_pension: Option<RawField>,
    pub additional_income: Option<RawField>,

    #[serde(alias = "riskTier")]
    pub risk_tolerance: Option<String>,
    #[serde(alias = "expectedReturnRate")]
    pub expected_return: Option<RawField>,
    #[serde(alias = "postRetirementReturnRate")]
    pub post_retirement_return: Option<RawField>,
    pub inflation_rate: Option<RawField>,
    pub retirement_horizon_years: Option<RawField>,
}

/// Forgiving number parse: ignores `$`, `%`, grouping commas and spaces.
/// Any other character makes the whole value unparseable.
pub fn parse_number(text: &str) -> Option<f64> {
    let mut cleaned = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '0'..='9' | '.' | '-' => cleaned.push(c),
            '$' | '%' | ',' => {}
            c if c.is_whitespace() => {}
            _ => return None,
        }
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Currency entry as the form sees it: unparseable input is zero, negatives clamp to zero.
pub fn parse_currency(text: &str) -> f64 {
    parse_number(text).unwrap_or(0.0).max(0.0)
}

fn amount_or(field: Option<&RawField>, name: &str, default: f64) -> f64 {
    match field.and_then(RawField::as_number) {
        Some(v) if v >= 0.0 => v,
        Some(v) => {
            debug!("{name}: negative value {v} replaced with {default}");
            default
        }
        None => {
            if field.is_some() {
                debug!("{name}: unparseable value replaced with {default}");
            }
            default
        }
    }
}

fn optional_amount(field: Option<&RawField>, name: &str) -> Option<f64> {
    let value = field.and_then(RawField::as_number);
    match value {
        Some(v) if v >= 0.0 => Some(v),
        _ => {
            if field.is_some() {
                debug!("{name}: ignoring invalid value");
            }
            None
        }
    }
}

/// Percent-scale input converted to a fraction; only `0 <= p < 100` is accepted.
fn percent_as_fraction(field: Option<&RawField>, name: &str) -> Option<f64> {
    let value = field.and_then(RawField::as_number);
    match value {
        Some(p) if (0.0..100.0).contains(&p) => Some(p / 100.0),
        _ => {
            if field.is_some() {
                debug!("{name}: rate outside [0, 100) percent ignored");
            }
            None
        }
    }
}

fn whole_years(field: Option<&RawField>) -> Option<u32> {
    field
        .and_then(RawField::as_number)
        .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
        .map(|v| v.trunc() as u32)
}

fn normalize_ages(raw: &RawPlanInput) -> (u32, u32) {
    let current_age = whole_years(raw.current_age.as_ref())
        .unwrap_or(DEFAULT_CURRENT_AGE)
        .clamp(MIN_CURRENT_AGE, MAX_RETIREMENT_AGE - 1);

    let mut retirement_age =
        whole_years(raw.retirement_age.as_ref()).unwrap_or(DEFAULT_RETIREMENT_AGE);
    if retirement_age <= current_age {
        debug!(
            "retirementAge {retirement_age} not after currentAge {current_age}; using {}",
            current_age + 1
        );
        retirement_age = current_age + 1;
    }
    if retirement_age > MAX_RETIREMENT_AGE {
        debug!("retirementAge {retirement_age} above {MAX_RETIREMENT_AGE}; clamping");
        retirement_age = MAX_RETIREMENT_AGE;
    }
    (current_age, retirement_age)
}

fn desired_income(raw: &RawPlanInput, annual_income: Option<f64>) -> f64 {
    if let Some(desired) = optional_amount(raw.desired_income.as_ref(), "desiredIncome") {
        return desired;
    }

    let Some(income) = annual_income.filter(|v| *v > 0.0) else {
        return DEFAULT_DESIRED_INCOME;
    };

    let preset = raw
        .lifestyle
        .as_deref()
        .and_then(Lifestyle::from_label)
        .and_then(Lifestyle::replacement_percent);
    let percent = match preset {
        Some(p) => p,
        None => raw
            .retirement_income_percent
            .as_ref()
            .and_then(RawField::as_number)
            .map(|p| p.clamp(MIN_REPLACEMENT_PERCENT, MAX_REPLACEMENT_PERCENT))
            .unwrap_or(DEFAULT_REPLACEMENT_PERCENT),
    };
    income * percent / 100.0
}

/// Turns raw form input into a `PlanInput`. Never fails: every malformed field
/// degrades to its default.
pub fn normalize(raw: &RawPlanInput, assumptions: &Assumptions) -> PlanInput {
    let (current_age, retirement_age) = normalize_ages(raw);

    let province = raw
        .province
        .as_deref()
        .and_then(Province::from_code)
        .unwrap_or_default();
    let marital_status = raw
        .marital_status
        .as_deref()
        .and_then(MaritalStatus::from_label)
        .unwrap_or_default();

    let savings = SavingsBreakdown {
        rrsp: amount_or(raw.rrsp_balance.as_ref(), "rrspBalance", 0.0),
        tfsa: amount_or(raw.tfsa_balance.as_ref(), "tfsaBalance", 0.0),
        pension: amount_or(raw.pension_value.as_ref(), "pensionValue", 0.0),
        other: amount_or(raw.other_savings.as_ref(), "otherSavings", 0.0),
        non_registered: amount_or(
            raw.non_registered_savings.as_ref(),
            "nonRegisteredSavings",
            0.0,
        ),
    };
    let monthly_contribution = amount_or(
        raw.monthly_contributions.as_ref(),
        "monthlyContributions",
        0.0,
    );

    let annual_income = optional_amount(raw.annual_income.as_ref(), "annualIncome");
    let desired_annual_income = desired_income(raw, annual_income);

    let guaranteed_income = GuaranteedIncome {
        public_pension: amount_or(
            raw.cpp_benefits.as_ref(),
            "cppBenefits",
            assumptions.benefits.public_pension_annual,
        ),
        old_age_benefit: amount_or(
            raw.oas_benefits.as_ref(),
            "oasBenefits",
            assumptions.benefits.old_age_benefit_annual,
        ),
        employer_pension: amount_or(raw.company_pension.as_ref(), "companyPension", 0.0),
        other_income: amount_or(raw.additional_income.as_ref(), "additionalIncome", 0.0),
    };

    let risk_tier = raw
        .risk_tolerance
        .as_deref()
        .and_then(RiskTier::from_label)
        .unwrap_or_default();
    let tier_rates = assumptions.tier_rates(risk_tier);
    let expected_return_rate =
        percent_as_fraction(raw.expected_return.as_ref(), "expectedReturn")
            .unwrap_or(tier_rates.accumulation);
    let post_retirement_return_rate =
        percent_as_fraction(raw.post_retirement_return.as_ref(), "postRetirementReturn")
            .unwrap_or(tier_rates.decumulation);
    let inflation_rate = percent_as_fraction(raw.inflation_rate.as_ref(), "inflationRate")
        .unwrap_or(assumptions.default_inflation_rate);

    let retirement_horizon_years = whole_years(raw.retirement_horizon_years.as_ref())
        .filter(|years| (1..=MAX_HORIZON_YEARS).contains(years))
        .unwrap_or(assumptions.retirement_horizon_years);

    PlanInput {
        current_age,
        retirement_age,
        province,
        marital_status,
        savings,
        monthly_contribution,
        annual_income,
        risk_tier,
        expected_return_rate,
        post_retirement_return_rate,
        desired_annual_income,
        guaranteed_income,
        inflation_rate,
        retirement_horizon_years,
    }
}
