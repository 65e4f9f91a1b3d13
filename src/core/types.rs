use serde::{Deserialize, Serialize};

/// Supported age window: `MIN_CURRENT_AGE <= current < retirement <= MAX_RETIREMENT_AGE`.
pub const MIN_CURRENT_AGE: u32 = 18;
pub const MAX_RETIREMENT_AGE: u32 = 80;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub enum Province {
    #[serde(rename = "AB")]
    Alberta,
    #[serde(rename = "BC")]
    BritishColumbia,
    #[serde(rename = "MB")]
    Manitoba,
    #[serde(rename = "NB")]
    NewBrunswick,
    #[serde(rename = "NL")]
    NewfoundlandAndLabrador,
    #[serde(rename = "NS")]
    NovaScotia,
    #[default]
    #[serde(rename = "ON")]
    Ontario,
    #[serde(rename = "PE")]
    PrinceEdwardIsland,
    #[serde(rename = "QC")]
    Quebec,
    #[serde(rename = "SK")]
    Saskatchewan,
    #[serde(rename = "NT")]
    NorthwestTerritories,
    #[serde(rename = "NU")]
    Nunavut,
    #[serde(rename = "YT")]
    Yukon,
}

impl Province {
    pub fn from_code(code: &str) -> Option<Self> {
        let province = match code.trim().to_ascii_uppercase().as_str() {
            "AB" => Province::Alberta,
            "BC" => Province::BritishColumbia,
            "MB" => Province::Manitoba,
            "NB" => Province::NewBrunswick,
            "NL" => Province::NewfoundlandAndLabrador,
            "NS" => Province::NovaScotia,
            "ON" => Province::Ontario,
            "PE" => Province::PrinceEdwardIsland,
            "QC" => Province::Quebec,
            "SK" => Province::Saskatchewan,
            "NT" => Province::NorthwestTerritories,
            "NU" => Province::Nunavut,
            "YT" => Province::Yukon,
            _ => return None,
        };
        Some(province)
    }

    pub fn code(self) -> &'static str {
        match self {
            Province::Alberta => "AB",
            Province::BritishColumbia => "BC",
            Province::Manitoba => "MB",
            Province::NewBrunswick => "NB",
            Province::NewfoundlandAndLabrador => "NL",
            Province::NovaScotia => "NS",
            Province::Ontario => "ON",
            Province::PrinceEdwardIsland => "PE",
            Province::Quebec => "QC",
            Province::Saskatchewan => "SK",
            Province::NorthwestTerritories => "NT",
            Province::Nunavut => "NU",
            Province::Yukon => "YT",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaritalStatus {
    #[default]
    Single,
    Married,
    CommonLaw,
    Divorced,
}

impl MaritalStatus {
    pub fn from_label(label: &str) -> Option<Self> {
        let status = match label.trim().to_ascii_lowercase().as_str() {
            "single" => MaritalStatus::Single,
            "married" => MaritalStatus::Married,
            "common-law" | "common_law" | "commonlaw" => MaritalStatus::CommonLaw,
            "divorced" => MaritalStatus::Divorced,
            _ => return None,
        };
        Some(status)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskTier {
    Conservative,
    #[default]
    Balanced,
    Growth,
}

impl RiskTier {
    pub fn from_label(label: &str) -> Option<Self> {
        let tier = match label.trim().to_ascii_lowercase().as_str() {
            "conservative" => RiskTier::Conservative,
            "balanced" | "moderate" => RiskTier::Balanced,
            "growth" | "aggressive" => RiskTier::Growth,
            _ => return None,
        };
        Some(tier)
    }
}

/// Registered and unregistered balances that make up current savings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsBreakdown {
    pub rrsp: f64,
    pub tfsa: f64,
    pub pension: f64,
    pub other: f64,
    pub non_registered: f64,
}

impl SavingsBreakdown {
    pub fn total(&self) -> f64 {
        self.rrsp + self.tfsa + self.pension + self.other + self.non_registered
    }
}

/// Annual income streams that recur every retirement year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuaranteedIncome {
    pub public_pension: f64,
    pub old_age_benefit: f64,
    pub employer_pension: f64,
    pub other_income: f64,
}

impl GuaranteedIncome {
    pub fn total(&self) -> f64 {
        self.public_pension + self.old_age_benefit + self.employer_pension + self.other_income
    }
}

/// Canonical engine input. Rates are fractions, amounts are annual unless named monthly.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanInput {
    pub current_age: u32,
    pub retirement_age: u32,
    pub province: Province,
    pub marital_status: MaritalStatus,
    pub savings: SavingsBreakdown,
    pub monthly_contribution: f64,
    pub annual_income: Option<f64>,
    pub risk_tier: RiskTier,
    pub expected_return_rate: f64,
    pub post_retirement_return_rate: f64,
    pub desired_annual_income: f64,
    pub guaranteed_income: GuaranteedIncome,
    pub inflation_rate: f64,
    pub retirement_horizon_years: u32,
}

impl PlanInput {
    pub fn current_savings(&self) -> f64 {
        self.savings.total()
    }

    pub fn guaranteed_annual_income(&self) -> f64 {
        self.guaranteed_income.total()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearBalance {
    pub age: u32,
    pub contribution: f64,
    pub withdrawal: f64,
    pub end_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub years_to_retirement: u32,
    pub projected_savings_at_retirement: f64,
    pub annual_income_gap_at_retirement: f64,
    pub required_savings_at_retirement: f64,
    pub years_funds_will_last: u32,
    pub accumulation: Vec<YearBalance>,
    pub decumulation: Vec<YearBalance>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SustainabilityTier {
    Good,
    NeedsImprovement,
    Insufficient,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadinessBand {
    OnTrack,
    MakingProgress,
    NeedsAttention,
}

impl ReadinessBand {
    pub fn message(self) -> &'static str {
        match self {
            ReadinessBand::OnTrack => "You're on track for a comfortable retirement!",
            ReadinessBand::MakingProgress => {
                "You're making progress, but consider increasing savings."
            }
            ReadinessBand::NeedsAttention => {
                "Additional planning needed to reach your retirement goals."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyIncome {
    pub needed: f64,
    pub guaranteed: f64,
    pub from_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub readiness_score: u32,
    pub readiness_band: ReadinessBand,
    pub readiness_message: &'static str,
    pub shortfall: f64,
    pub additional_monthly_contribution_needed: f64,
    pub sustainability_tier: SustainabilityTier,
    pub recommendations: Vec<String>,
    pub current_savings: f64,
    pub savings_breakdown: SavingsBreakdown,
    pub guaranteed_income: GuaranteedIncome,
    pub monthly_income: MonthlyIncome,
    pub projection: ProjectionResult,
}
