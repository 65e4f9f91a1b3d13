use log::debug;

use super::assumptions::Assumptions;
use super::engine::project;
use super::error::DomainError;
use super::types::{
    MonthlyIncome, PlanInput, PlanReport, ProjectionResult, ReadinessBand, RiskTier,
    SustainabilityTier,
};

pub const GOOD_SUSTAINABILITY_YEARS: u32 = 25;
pub const MIN_SUSTAINABILITY_YEARS: u32 = 15;
const ON_TRACK_SCORE: u32 = 80;
const MAKING_PROGRESS_SCORE: u32 = 50;

const MIN_SAVINGS_RATE: f64 = 0.10;
const EARLY_CAREER_AGE: u32 = 45;
const HIGH_REPLACEMENT_RATIO: f64 = 0.80;

/// Runs the full pipeline with the default constant table.
pub fn compute_plan_report(inputs: &PlanInput) -> Result<PlanReport, DomainError> {
    compute_plan_report_with(inputs, &Assumptions::default())
}

pub fn compute_plan_report_with(
    inputs: &PlanInput,
    assumptions: &Assumptions,
) -> Result<PlanReport, DomainError> {
    let projection = project(inputs, assumptions)?;
    Ok(evaluate(inputs, projection))
}

pub fn evaluate(inputs: &PlanInput, projection: ProjectionResult) -> PlanReport {
    let score = readiness_score(
        projection.projected_savings_at_retirement,
        projection.required_savings_at_retirement,
    );
    let shortfall = (projection.required_savings_at_retirement
        - projection.projected_savings_at_retirement)
        .max(0.0);
    let additional = additional_monthly_contribution(
        shortfall,
        inputs.expected_return_rate,
        projection.years_to_retirement,
    );
    let tier = sustainability_tier(projection.years_funds_will_last);
    let band = readiness_band(score);
    let recommendations = recommendations(inputs, &projection, additional, tier);

    debug!(
        "readiness: score={score} shortfall={shortfall:.2} additional_monthly={additional:.2} \
         tier={tier:?} recommendations={}",
        recommendations.len()
    );

    let guaranteed = inputs.guaranteed_annual_income();
    PlanReport {
        readiness_score: score,
        readiness_band: band,
        readiness_message: band.message(),
        shortfall,
        additional_monthly_contribution_needed: additional,
        sustainability_tier: tier,
        recommendations,
        current_savings: inputs.current_savings(),
        savings_breakdown: inputs.savings,
        guaranteed_income: inputs.guaranteed_income,
        monthly_income: MonthlyIncome {
            needed: inputs.desired_annual_income / 12.0,
            guaranteed: guaranteed / 12.0,
            from_savings: projection.annual_income_gap_at_retirement / 12.0,
        },
        projection,
    }
}

pub fn readiness_score(projected_savings: f64, required_savings: f64) -> u32 {
    if required_savings <= 0.0 {
        return 100;
    }
    (projected_savings / required_savings * 100.0)
        .round()
        .clamp(0.0, 100.0) as u32
}

pub fn readiness_band(score: u32) -> ReadinessBand {
    if score >= ON_TRACK_SCORE {
        ReadinessBand::OnTrack
    } else if score >= MAKING_PROGRESS_SCORE {
        ReadinessBand::MakingProgress
    } else {
        ReadinessBand::NeedsAttention
    }
}

pub fn sustainability_tier(years_funds_will_last: u32) -> SustainabilityTier {
    if years_funds_will_last >= GOOD_SUSTAINABILITY_YEARS {
        SustainabilityTier::Good
    } else if years_funds_will_last >= MIN_SUSTAINABILITY_YEARS {
        SustainabilityTier::NeedsImprovement
    } else {
        SustainabilityTier::Insufficient
    }
}

/// Extra level monthly contribution that closes `shortfall` by retirement,
/// using the same end-of-year convention as the projection.
pub fn additional_monthly_contribution(shortfall: f64, annual_rate: f64, years: u32) -> f64 {
    if shortfall <= 0.0 {
        return 0.0;
    }
    if years == 0 {
        return shortfall / 12.0;
    }
    if annual_rate == 0.0 {
        return shortfall / (12.0 * years as f64);
    }
    let growth = (1.0 + annual_rate).powi(years as i32);
    shortfall * annual_rate / (12.0 * (growth - 1.0))
}

/// Independent advisory rules, evaluated in a fixed order.
pub fn recommendations(
    inputs: &PlanInput,
    projection: &ProjectionResult,
    additional_monthly: f64,
    tier: SustainabilityTier,
) -> Vec<String> {
    let mut tips = Vec::new();
    let income = inputs.annual_income.filter(|v| *v > 0.0);

    if additional_monthly > 0.0 {
        tips.push(format!(
            "Consider increasing your monthly savings by {} to reach your retirement goal.",
            format_currency(additional_monthly)
        ));
    }

    if let Some(income) = income {
        let savings_rate = inputs.monthly_contribution * 12.0 / income;
        if savings_rate < MIN_SAVINGS_RATE {
            tips.push(format!(
                "You are saving {:.1}% of your income. Aim for at least 10% ({} per month).",
                savings_rate * 100.0,
                format_currency(income * MIN_SAVINGS_RATE / 12.0)
            ));
        }
    }

    if inputs.risk_tier == RiskTier::Conservative && inputs.current_age < EARLY_CAREER_AGE {
        tips.push(format!(
            "With {} years until retirement, a balanced or growth portfolio could improve your long-term returns.",
            projection.years_to_retirement
        ));
    }

    if let Some(income) = income {
        let replacement = inputs.desired_annual_income / income;
        if replacement > HIGH_REPLACEMENT_RATIO {
            tips.push(format!(
                "Your retirement income target is {:.0}% of your current income. Most plans aim for 70-80%.",
                replacement * 100.0
            ));
        }
        if inputs.current_savings() < income {
            tips.push(
                "Your savings are below one year of income. Building that base early gives compounding the most time to work."
                    .to_string(),
            );
        }
    }

    match tier {
        SustainabilityTier::Insufficient => tips.push(format!(
            "At your target income, savings may run out after {} years. Consider retiring later or lowering your income target.",
            projection.years_funds_will_last
        )),
        SustainabilityTier::NeedsImprovement => tips.push(format!(
            "Your savings are projected to last {} years. Aim for at least {GOOD_SUSTAINABILITY_YEARS} years of retirement income.",
            projection.years_funds_will_last
        )),
        SustainabilityTier::Good => {}
    }

    tips
}

/// Whole-dollar amount with thousands separators, e.g. `$1,234`.
pub fn format_currency(amount: f64) -> String {
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
