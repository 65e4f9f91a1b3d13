use serde::Serialize;

use super::types::RiskTier;

/// Accumulation and decumulation returns for one risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierRates {
    pub accumulation: f64,
    pub decumulation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenefitDefaults {
    pub public_pension_annual: f64,
    pub old_age_benefit_annual: f64,
}

/// Jurisdiction/year constants consumed by the engine. Swapping these never
/// changes engine logic, only the reported numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assumptions {
    pub benefits: BenefitDefaults,
    pub conservative: TierRates,
    pub balanced: TierRates,
    pub growth: TierRates,
    pub withdrawal_rate: f64,
    pub retirement_horizon_years: u32,
    pub max_decumulation_years: u32,
    pub default_inflation_rate: f64,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            benefits: BenefitDefaults {
                public_pension_annual: 12_000.0,
                old_age_benefit_annual: 8_700.0,
            },
            conservative: TierRates {
                accumulation: 0.045,
                decumulation: 0.035,
            },
            balanced: TierRates {
                accumulation: 0.055,
                decumulation: 0.040,
            },
            growth: TierRates {
                accumulation: 0.065,
                decumulation: 0.045,
            },
            withdrawal_rate: 0.04,
            retirement_horizon_years: 25,
            max_decumulation_years: 35,
            default_inflation_rate: 0.02,
        }
    }
}

/// Upper bound for any horizon or decumulation cap, in years.
pub const MAX_PLAN_YEARS: u32 = 100;

impl Assumptions {
    pub fn tier_rates(&self, tier: RiskTier) -> TierRates {
        match tier {
            RiskTier::Conservative => self.conservative,
            RiskTier::Balanced => self.balanced,
            RiskTier::Growth => self.growth,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.withdrawal_rate.is_finite() || self.withdrawal_rate <= 0.0 {
            return Err("withdrawal_rate must be > 0".to_string());
        }
        if self.withdrawal_rate >= 1.0 {
            return Err("withdrawal_rate must be < 1".to_string());
        }
        if !(1..=MAX_PLAN_YEARS).contains(&self.retirement_horizon_years) {
            return Err(format!(
                "retirement_horizon_years must be between 1 and {MAX_PLAN_YEARS}"
            ));
        }
        if !(1..=MAX_PLAN_YEARS).contains(&self.max_decumulation_years) {
            return Err(format!(
                "max_decumulation_years must be between 1 and {MAX_PLAN_YEARS}"
            ));
        }
        for (name, rates) in [
            ("conservative", self.conservative),
            ("balanced", self.balanced),
            ("growth", self.growth),
        ] {
            if !(0.0..1.0).contains(&rates.accumulation) || !(0.0..1.0).contains(&rates.decumulation)
            {
                return Err(format!("{name} tier rates must be between 0 and 1"));
            }
        }
        if !(0.0..1.0).contains(&self.default_inflation_rate) {
            return Err("default_inflation_rate must be between 0 and 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_valid() {
        assert!(Assumptions::default().validate().is_ok());
    }

    #[test]
    fn tier_rates_rise_with_risk() {
        let table = Assumptions::default();
        let conservative = table.tier_rates(RiskTier::Conservative);
        let balanced = table.tier_rates(RiskTier::Balanced);
        let growth = table.tier_rates(RiskTier::Growth);
        assert!(conservative.accumulation < balanced.accumulation);
        assert!(balanced.accumulation < growth.accumulation);
        assert!(conservative.decumulation < growth.decumulation);
    }

    #[test]
    fn validate_rejects_zero_withdrawal_rate() {
        let table = Assumptions {
            withdrawal_rate: 0.0,
            ..Assumptions::default()
        };
        let err = table.validate().expect_err("must reject zero withdrawal rate");
        assert!(err.contains("withdrawal_rate"));
    }

    #[test]
    fn validate_rejects_zero_horizon() {
        let table = Assumptions {
            retirement_horizon_years: 0,
            ..Assumptions::default()
        };
        let err = table.validate().expect_err("must reject zero horizon");
        assert!(err.contains("retirement_horizon_years"));
    }

    #[test]
    fn validate_rejects_unbounded_cap() {
        let table = Assumptions {
            max_decumulation_years: u32::MAX,
            ..Assumptions::default()
        };
        let err = table.validate().expect_err("must reject unbounded cap");
        assert!(err.contains("max_decumulation_years"));

        let table = Assumptions {
            retirement_horizon_years: MAX_PLAN_YEARS + 1,
            ..Assumptions::default()
        };
        let err = table.validate().expect_err("must reject long horizon");
        assert!(err.contains("retirement_horizon_years"));

        let table = Assumptions {
            max_decumulation_years: MAX_PLAN_YEARS,
            retirement_horizon_years: MAX_PLAN_YEARS,
            ..Assumptions::default()
        };
        assert!(table.validate().is_ok());
    }
}
