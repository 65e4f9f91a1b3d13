mod assumptions;
mod engine;
mod error;
mod normalize;
mod readiness;
mod types;

pub use assumptions::{Assumptions, BenefitDefaults, MAX_PLAN_YEARS, TierRates};
pub use engine::{
    accumulation_schedule, annual_income_gap, decumulation_schedule, future_value, project,
    required_savings, validate_plan_input, years_funds_last,
};
pub use error::DomainError;
pub use normalize::{Lifestyle, RawField, RawPlanInput, normalize, parse_currency, parse_number};
pub use readiness::{
    additional_monthly_contribution, compute_plan_report, compute_plan_report_with, evaluate,
    format_currency, readiness_band, readiness_score, recommendations, sustainability_tier,
};
pub use types::{
    GuaranteedIncome, MAX_RETIREMENT_AGE, MIN_CURRENT_AGE, MaritalStatus, MonthlyIncome,
    PlanInput, PlanReport, ProjectionResult, Province, ReadinessBand, RiskTier, SavingsBreakdown,
    SustainabilityTier, YearBalance,
};
