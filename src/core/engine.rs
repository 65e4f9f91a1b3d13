use log::debug;

use super::assumptions::{Assumptions, MAX_PLAN_YEARS};
use super::error::DomainError;
use super::types::{
    MAX_RETIREMENT_AGE, MIN_CURRENT_AGE, PlanInput, ProjectionResult, YearBalance,
};

#[derive(Debug, Clone, Copy)]
struct DrawdownParams {
    start_age: u32,
    starting_balance: f64,
    first_withdrawal: f64,
    return_rate: f64,
    inflation_rate: f64,
    max_years: u32,
}

pub fn project(
    inputs: &PlanInput,
    assumptions: &Assumptions,
) -> Result<ProjectionResult, DomainError> {
    validate_plan_input(inputs)?;
    assumptions
        .validate()
        .map_err(|reason| DomainError::InvalidAssumptions { reason })?;

    let years_to_retirement = inputs.retirement_age - inputs.current_age;
    let projected = future_value(
        inputs.current_savings(),
        inputs.monthly_contribution,
        inputs.expected_return_rate,
        years_to_retirement,
    );
    let gap = annual_income_gap(
        inputs.desired_annual_income,
        inputs.guaranteed_annual_income(),
    );
    let required = required_savings(
        gap,
        inputs.retirement_horizon_years,
        assumptions.withdrawal_rate,
    );

    let (years_funds_will_last, decumulation) = simulate_drawdown(DrawdownParams {
        start_age: inputs.retirement_age,
        starting_balance: projected,
        first_withdrawal: gap,
        return_rate: inputs.post_retirement_return_rate,
        inflation_rate: inputs.inflation_rate,
        max_years: assumptions.max_decumulation_years,
    });

    debug!(
        "projection: years_to_retirement={years_to_retirement} projected={projected:.2} \
         gap={gap:.2} required={required:.2} years_funds_will_last={years_funds_will_last}"
    );

    Ok(ProjectionResult {
        years_to_retirement,
        projected_savings_at_retirement: projected,
        annual_income_gap_at_retirement: gap,
        required_savings_at_retirement: required,
        years_funds_will_last,
        accumulation: accumulation_schedule(inputs),
        decumulation,
    })
}

pub fn validate_plan_input(inputs: &PlanInput) -> Result<(), DomainError> {
    if inputs.current_age < MIN_CURRENT_AGE
        || inputs.retirement_age <= inputs.current_age
        || inputs.retirement_age > MAX_RETIREMENT_AGE
    {
        return Err(DomainError::InvalidAgeRange {
            current_age: inputs.current_age,
            retirement_age: inputs.retirement_age,
        });
    }

    let amounts = [
        ("rrsp", inputs.savings.rrsp),
        ("tfsa", inputs.savings.tfsa),
        ("pension", inputs.savings.pension),
        ("other", inputs.savings.other),
        ("non_registered", inputs.savings.non_registered),
        ("monthly_contribution", inputs.monthly_contribution),
        ("desired_annual_income", inputs.desired_annual_income),
        ("public_pension", inputs.guaranteed_income.public_pension),
        ("old_age_benefit", inputs.guaranteed_income.old_age_benefit),
        ("employer_pension", inputs.guaranteed_income.employer_pension),
        ("other_income", inputs.guaranteed_income.other_income),
    ];
    for (field, value) in amounts {
        if !value.is_finite() {
            return Err(DomainError::NonFinite { field });
        }
        if value < 0.0 {
            return Err(DomainError::NegativeAmount { field, value });
        }
    }
    if let Some(income) = inputs.annual_income {
        if !income.is_finite() {
            return Err(DomainError::NonFinite {
                field: "annual_income",
            });
        }
        if income < 0.0 {
            return Err(DomainError::NegativeAmount {
                field: "annual_income",
                value: income,
            });
        }
    }

    let rates = [
        ("expected_return_rate", inputs.expected_return_rate),
        ("post_retirement_return_rate", inputs.post_retirement_return_rate),
        ("inflation_rate", inputs.inflation_rate),
    ];
    for (field, value) in rates {
        if !value.is_finite() {
            return Err(DomainError::NonFinite { field });
        }
        if !(0.0..1.0).contains(&value) {
            return Err(DomainError::RateOutOfRange { field, value });
        }
    }

    if !(1..=MAX_PLAN_YEARS).contains(&inputs.retirement_horizon_years) {
        return Err(DomainError::InvalidHorizon {
            field: "retirement_horizon_years",
        });
    }
    Ok(())
}

/// Balance after `years` of annual compounding with the year's contributions
/// landing as one lump sum at year end.
pub fn future_value(
    principal: f64,
    monthly_contribution: f64,
    annual_rate: f64,
    years: u32,
) -> f64 {
    let annual_contribution = monthly_contribution * 12.0;
    if annual_rate == 0.0 {
        return principal + annual_contribution * years as f64;
    }
    let growth = match i32::try_from(years) {
        Ok(n) => (1.0 + annual_rate).powi(n),
        Err(_) => (1.0 + annual_rate).powf(years as f64),
    };
    principal * growth + annual_contribution * ((growth - 1.0) / annual_rate)
}

/// Year-end balances from the first year after `current_age` up to retirement.
pub fn accumulation_schedule(inputs: &PlanInput) -> Vec<YearBalance> {
    let years = inputs.retirement_age.saturating_sub(inputs.current_age);
    let contribution = inputs.monthly_contribution * 12.0;
    let mut balance = inputs.current_savings();
    let mut schedule = Vec::with_capacity(years as usize);
    for year in 1..=years {
        balance = balance * (1.0 + inputs.expected_return_rate) + contribution;
        schedule.push(YearBalance {
            age: inputs.current_age + year,
            contribution,
            withdrawal: 0.0,
            end_balance: balance,
        });
    }
    schedule
}

pub fn annual_income_gap(desired_annual_income: f64, guaranteed_annual_income: f64) -> f64 {
    (desired_annual_income - guaranteed_annual_income).max(0.0)
}

/// Withdrawal-rate heuristic: `gap × horizon / rate`. Not discounted.
pub fn required_savings(annual_gap: f64, horizon_years: u32, withdrawal_rate: f64) -> f64 {
    if annual_gap <= 0.0 {
        return 0.0;
    }
    annual_gap * horizon_years as f64 / withdrawal_rate
}

pub fn years_funds_last(
    starting_balance: f64,
    first_withdrawal: f64,
    return_rate: f64,
    inflation_rate: f64,
    max_years: u32,
) -> u32 {
    simulate_drawdown(DrawdownParams {
        start_age: 0,
        starting_balance,
        first_withdrawal,
        return_rate,
        inflation_rate,
        max_years,
    })
    .0
}

pub fn decumulation_schedule(inputs: &PlanInput, assumptions: &Assumptions) -> Vec<YearBalance> {
    let years = inputs.retirement_age.saturating_sub(inputs.current_age);
    let projected = future_value(
        inputs.current_savings(),
        inputs.monthly_contribution,
        inputs.expected_return_rate,
        years,
    );
    simulate_drawdown(DrawdownParams {
        start_age: inputs.retirement_age,
        starting_balance: projected,
        first_withdrawal: annual_income_gap(
            inputs.desired_annual_income,
            inputs.guaranteed_annual_income(),
        ),
        return_rate: inputs.post_retirement_return_rate,
        inflation_rate: inputs.inflation_rate,
        max_years: assumptions.max_decumulation_years,
    })
    .1
}

// A year is funded when the balance is still >= 0 after its withdrawal; the
// stop check for an empty balance runs at the start of the following year.
// With nothing to withdraw an empty balance never stops the loop, so the
// simulated span is bounded by `MAX_PLAN_YEARS`.
fn simulate_drawdown(params: DrawdownParams) -> (u32, Vec<YearBalance>) {
    let mut balance = params.starting_balance;
    let mut withdrawal = params.first_withdrawal;
    let mut funded_years = 0;
    let max_years = params.max_years.min(MAX_PLAN_YEARS);
    let mut trace = Vec::with_capacity(max_years as usize);

    for year in 0..max_years {
        if balance <= 0.0 && withdrawal > 0.0 {
            break;
        }
        balance -= withdrawal;
        if balance < 0.0 {
            break;
        }
        funded_years += 1;
        balance *= 1.0 + params.return_rate;
        trace.push(YearBalance {
            age: params.start_age.saturating_add(year),
            contribution: 0.0,
            withdrawal,
            end_balance: balance,
        });
        withdrawal *= 1.0 + params.inflation_rate;
    }

    (funded_years, trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{
        GuaranteedIncome, MaritalStatus, Province, RiskTier, SavingsBreakdown,
    };
    use proptest::prelude::{prop_assert, proptest};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_inputs() -> PlanInput {
        PlanInput {
            current_age: 35,
            retirement_age: 65,
            province: Province::Ontario,
            marital_status: MaritalStatus::Single,
            savings: SavingsBreakdown {
                rrsp: 40_000.0,
                ..SavingsBreakdown::default()
            },
            monthly_contribution: 500.0,
            annual_income: Some(70_000.0),
            risk_tier: RiskTier::Growth,
            expected_return_rate: 0.065,
            post_retirement_return_rate: 0.045,
            desired_annual_income: 52_500.0,
            guaranteed_income: GuaranteedIncome {
                public_pension: 808.0 * 12.0,
                old_age_benefit: 728.0 * 12.0,
                ..GuaranteedIncome::default()
            },
            inflation_rate: 0.02,
            retirement_horizon_years: 25,
        }
    }

    #[test]
    fn future_value_matches_closed_form_for_reference_scenario() {
        let inputs = sample_inputs();
        let result = project(&inputs, &Assumptions::default()).expect("valid inputs");
        assert_eq!(result.years_to_retirement, 30);
        assert_close(result.projected_savings_at_retirement, 782_823.830_802, 1.0);
        assert_close(result.annual_income_gap_at_retirement, 34_068.0, 1e-9);
        assert_close(result.required_savings_at_retirement, 21_292_500.0, 1e-6);
    }

    #[test]
    fn zero_rate_zero_contribution_keeps_principal_exactly() {
        assert_eq!(future_value(10_000.0, 0.0, 0.0, 10), 10_000.0);
    }

    #[test]
    fn zero_rate_contributions_are_summed_exactly() {
        assert_eq!(future_value(10_000.0, 250.0, 0.0, 10), 10_000.0 + 250.0 * 12.0 * 10.0);
    }

    #[test]
    fn accumulation_schedule_ends_at_closed_form_value() {
        let inputs = sample_inputs();
        let schedule = accumulation_schedule(&inputs);
        assert_eq!(schedule.len(), 30);
        assert_eq!(schedule[0].age, 36);
        assert_eq!(schedule.last().map(|y| y.age), Some(65));

        let closed_form = future_value(40_000.0, 500.0, 0.065, 30);
        let last = schedule.last().expect("non-empty schedule").end_balance;
        assert_close(last, closed_form, closed_form * 1e-12);

        for pair in schedule.windows(2) {
            assert!(pair[1].end_balance > pair[0].end_balance);
        }
    }

    #[test]
    fn required_savings_uses_withdrawal_rate_heuristic() {
        assert_close(required_savings(10_000.0, 25, 0.04), 6_250_000.0, 1e-6);
        assert_eq!(required_savings(0.0, 25, 0.04), 0.0);
    }

    #[test]
    fn income_gap_never_negative() {
        assert_eq!(annual_income_gap(20_000.0, 25_000.0), 0.0);
        assert_close(annual_income_gap(52_500.0, 18_432.0), 34_068.0, 1e-9);
    }

    #[test]
    fn drawdown_counts_year_that_ends_exactly_at_zero() {
        assert_eq!(years_funds_last(100.0, 50.0, 0.0, 0.0, 35), 2);
        assert_eq!(years_funds_last(150.0, 50.0, 0.0, 0.0, 35), 3);
    }

    #[test]
    fn drawdown_does_not_count_partially_funded_year() {
        assert_eq!(years_funds_last(120.0, 50.0, 0.0, 0.0, 35), 2);
        assert_eq!(years_funds_last(40.0, 50.0, 0.0, 0.0, 35), 0);
    }

    #[test]
    fn drawdown_applies_growth_and_inflation() {
        // Year 1: 1000 - 500 = 500, grows to 550; withdrawal rises to 550.
        // Year 2: 550 - 550 = 0, still funded. Year 3 stops.
        assert_eq!(years_funds_last(1_000.0, 500.0, 0.10, 0.10, 35), 2);
    }

    #[test]
    fn drawdown_is_capped() {
        assert_eq!(years_funds_last(1_000_000.0, 1.0, 0.05, 0.0, 35), 35);
    }

    #[test]
    fn nothing_to_withdraw_lasts_the_full_cap_even_without_savings() {
        assert_eq!(years_funds_last(0.0, 0.0, 0.0, 0.0, 35), 35);
        assert_eq!(years_funds_last(0.0, 1.0, 0.0, 0.0, 35), 0);
    }

    #[test]
    fn decumulation_schedule_matches_years_funds_last() {
        let mut inputs = sample_inputs();
        inputs.monthly_contribution = 3_000.0;
        let assumptions = Assumptions::default();
        let result = project(&inputs, &assumptions).expect("valid inputs");
        let schedule = decumulation_schedule(&inputs, &assumptions);
        assert_eq!(schedule.len() as u32, result.years_funds_will_last);
        assert_eq!(schedule, result.decumulation);
        if let Some(first) = schedule.first() {
            assert_eq!(first.age, inputs.retirement_age);
            assert_close(first.withdrawal, result.annual_income_gap_at_retirement, 1e-9);
        }
        for row in &schedule {
            assert!(row.end_balance >= 0.0);
        }
    }

    #[test]
    fn project_rejects_invalid_age_range() {
        let mut inputs = sample_inputs();
        inputs.retirement_age = inputs.current_age;
        let err = project(&inputs, &Assumptions::default()).expect_err("must reject");
        assert_eq!(
            err,
            DomainError::InvalidAgeRange {
                current_age: 35,
                retirement_age: 35
            }
        );
    }

    #[test]
    fn project_rejects_ages_outside_supported_window() {
        for (current_age, retirement_age) in [
            (5, 120),
            (MIN_CURRENT_AGE - 1, 65),
            (35, MAX_RETIREMENT_AGE + 1),
            (u32::MAX - 1, u32::MAX),
        ] {
            let mut inputs = sample_inputs();
            inputs.current_age = current_age;
            inputs.retirement_age = retirement_age;
            assert_eq!(
                project(&inputs, &Assumptions::default()),
                Err(DomainError::InvalidAgeRange {
                    current_age,
                    retirement_age
                })
            );
        }

        let mut inputs = sample_inputs();
        inputs.current_age = MIN_CURRENT_AGE;
        inputs.retirement_age = MAX_RETIREMENT_AGE;
        let result = project(&inputs, &Assumptions::default()).expect("widest window is valid");
        assert_eq!(result.years_to_retirement, MAX_RETIREMENT_AGE - MIN_CURRENT_AGE);
    }

    #[test]
    fn project_rejects_horizon_beyond_plan_bound() {
        let mut inputs = sample_inputs();
        inputs.retirement_horizon_years = MAX_PLAN_YEARS + 1;
        assert!(matches!(
            project(&inputs, &Assumptions::default()),
            Err(DomainError::InvalidHorizon {
                field: "retirement_horizon_years"
            })
        ));
    }

    #[test]
    fn future_value_keeps_growing_past_i32_years() {
        let years = i32::MAX as u32 + 1;
        let fv = future_value(1_000.0, 0.0, 1e-7, years);
        assert!(fv.is_finite() && fv > 1e90, "expected growth, got {fv}");
    }

    #[test]
    fn drawdown_span_is_bounded_for_any_cap() {
        assert_eq!(years_funds_last(0.0, 0.0, 0.04, 0.02, u32::MAX), MAX_PLAN_YEARS);
        let trace = simulate_drawdown(DrawdownParams {
            start_age: u32::MAX - 1,
            starting_balance: 1_000.0,
            first_withdrawal: 0.0,
            return_rate: 0.04,
            inflation_rate: 0.02,
            max_years: u32::MAX,
        })
        .1;
        assert_eq!(trace.len(), MAX_PLAN_YEARS as usize);
        assert_eq!(trace.last().map(|y| y.age), Some(u32::MAX));
    }

    #[test]
    fn project_rejects_negative_and_non_finite_values() {
        let mut inputs = sample_inputs();
        inputs.monthly_contribution = -1.0;
        assert!(matches!(
            project(&inputs, &Assumptions::default()),
            Err(DomainError::NegativeAmount {
                field: "monthly_contribution",
                ..
            })
        ));

        let mut inputs = sample_inputs();
        inputs.savings.tfsa = f64::INFINITY;
        assert!(matches!(
            project(&inputs, &Assumptions::default()),
            Err(DomainError::NonFinite { field: "tfsa" })
        ));

        let mut inputs = sample_inputs();
        inputs.expected_return_rate = 1.5;
        assert!(matches!(
            project(&inputs, &Assumptions::default()),
            Err(DomainError::RateOutOfRange {
                field: "expected_return_rate",
                ..
            })
        ));
    }

    #[test]
    fn project_rejects_invalid_assumptions() {
        let assumptions = Assumptions {
            withdrawal_rate: 0.0,
            ..Assumptions::default()
        };
        assert!(matches!(
            project(&sample_inputs(), &assumptions),
            Err(DomainError::InvalidAssumptions { .. })
        ));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_more_contribution_never_lowers_projection(
            principal in 0u32..2_000_000,
            monthly in 0u32..10_000,
            extra in 0u32..5_000,
            rate_bp in 0u32..1500,
            years in 1u32..62
        ) {
            let rate = rate_bp as f64 / 10_000.0;
            let base = future_value(principal as f64, monthly as f64, rate, years);
            let more = future_value(principal as f64, (monthly + extra) as f64, rate, years);
            prop_assert!(more >= base);
            prop_assert!(base.is_finite());
        }

        #[test]
        fn prop_higher_rate_never_lowers_projection(
            principal in 0u32..2_000_000,
            monthly in 0u32..10_000,
            rate_bp in 0u32..1500,
            bump_bp in 0u32..500,
            years in 1u32..62
        ) {
            let low = rate_bp as f64 / 10_000.0;
            let high = (rate_bp + bump_bp) as f64 / 10_000.0;
            let base = future_value(principal as f64, monthly as f64, low, years);
            let more = future_value(principal as f64, monthly as f64, high, years);
            prop_assert!(more >= base - base.abs() * 1e-12);
        }

        #[test]
        fn prop_schedule_agrees_with_closed_form(
            principal in 0u32..1_000_000,
            monthly in 0u32..5_000,
            rate_bp in 0u32..1200,
            current_age in 18u32..60,
            span in 1u32..20
        ) {
            let mut inputs = sample_inputs();
            inputs.savings = SavingsBreakdown { other: principal as f64, ..SavingsBreakdown::default() };
            inputs.monthly_contribution = monthly as f64;
            inputs.expected_return_rate = rate_bp as f64 / 10_000.0;
            inputs.current_age = current_age;
            inputs.retirement_age = current_age + span;

            let schedule = accumulation_schedule(&inputs);
            let last = schedule.last().map(|y| y.end_balance).unwrap_or(principal as f64);
            let closed = future_value(principal as f64, monthly as f64, inputs.expected_return_rate, span);
            prop_assert!((last - closed).abs() <= closed.abs() * 1e-9 + 1e-6);
        }

        #[test]
        fn prop_years_funds_last_is_bounded(
            balance in 0u32..5_000_000,
            withdrawal in 0u32..200_000,
            rate_bp in 0u32..1000,
            inflation_bp in 0u32..600
        ) {
            let years = years_funds_last(
                balance as f64,
                withdrawal as f64,
                rate_bp as f64 / 10_000.0,
                inflation_bp as f64 / 10_000.0,
                35,
            );
            prop_assert!(years <= 35);
        }
    }
}
