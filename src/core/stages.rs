use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationStage {
    pub code: u32,
    pub mf: f64,
    pub equity: f64,
    pub bonds: f64,
    pub aif: f64,
    pub unlisted: f64,
    pub roi: f64,
}

// Fixed allocation curve: mix percentages per stage sum to 100, roi is the
// expected annual return in percent. Loaded once, never mutated; per-run
// overrides layer on top via StageOverrides.
pub const STAGE_CATALOG: [AllocationStage; 11] = [
    AllocationStage { code: 1, mf: 90.0, equity: 0.0, bonds: 0.0, aif: 10.0, unlisted: 0.0, roi: 16.80 },
    AllocationStage { code: 2, mf: 85.0, equity: 0.0, bonds: 15.0, aif: 0.0, unlisted: 0.0, roi: 13.95 },
    AllocationStage { code: 3, mf: 65.0, equity: 0.0, bonds: 25.0, aif: 0.0, unlisted: 10.0, roi: 16.75 },
    AllocationStage { code: 4, mf: 65.0, equity: 0.0, bonds: 35.0, aif: 0.0, unlisted: 0.0, roi: 12.55 },
    AllocationStage { code: 5, mf: 70.0, equity: 0.0, bonds: 10.0, aif: 0.0, unlisted: 20.0, roi: 21.30 },
    AllocationStage { code: 6, mf: 45.0, equity: 20.0, bonds: 15.0, aif: 10.0, unlisted: 10.0, roi: 22.25 },
    AllocationStage { code: 7, mf: 55.0, equity: 0.0, bonds: 45.0, aif: 0.0, unlisted: 0.0, roi: 11.85 },
    AllocationStage { code: 8, mf: 55.0, equity: 0.0, bonds: 45.0, aif: 0.0, unlisted: 0.0, roi: 11.85 },
    AllocationStage { code: 9, mf: 55.0, equity: 0.0, bonds: 45.0, aif: 0.0, unlisted: 0.0, roi: 11.85 },
    AllocationStage { code: 10, mf: 55.0, equity: 0.0, bonds: 45.0, aif: 0.0, unlisted: 0.0, roi: 11.85 },
    AllocationStage { code: 11, mf: 0.0, equity: 0.0, bonds: 100.0, aif: 0.0, unlisted: 0.0, roi: 8.00 },
];

pub fn stage_by_code(code: u32) -> Option<&'static AllocationStage> {
    STAGE_CATALOG.iter().find(|stage| stage.code == code)
}

// Unknown codes resolve to a 0% return rather than an error.
pub fn stage_return(code: u32) -> f64 {
    stage_by_code(code).map(|stage| stage.roi).unwrap_or(0.0)
}

pub fn default_stage_code(age: u32) -> u32 {
    if age < 30 {
        2
    } else if age < 45 {
        6
    } else {
        11
    }
}

#[derive(Debug, Clone, Default)]
pub struct StageOverrides {
    overrides: BTreeMap<u32, u32>,
}

impl StageOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    // An override rewrites the effective stage for every age at or after
    // `from_age`; a later call at a higher age layers on top of it.
    pub fn set(&mut self, from_age: u32, stage_code: u32) {
        self.overrides.insert(from_age, stage_code);
    }

    pub fn reset(&mut self) {
        self.overrides.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    pub fn stage_for(&self, age: u32) -> u32 {
        self.overrides
            .range(..=age)
            .next_back()
            .map(|(_, &code)| code)
            .unwrap_or_else(|| default_stage_code(age))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_mixes_sum_to_one_hundred() {
        for stage in &STAGE_CATALOG {
            let total = stage.mf + stage.equity + stage.bonds + stage.aif + stage.unlisted;
            assert!(
                (total - 100.0).abs() <= 1e-9,
                "stage {} mix sums to {total}",
                stage.code
            );
        }
    }

    #[test]
    fn catalog_codes_are_unique() {
        for (i, stage) in STAGE_CATALOG.iter().enumerate() {
            assert!(
                STAGE_CATALOG[i + 1..].iter().all(|s| s.code != stage.code),
                "duplicate stage code {}",
                stage.code
            );
        }
    }

    #[test]
    fn default_curve_boundaries() {
        assert_eq!(default_stage_code(18), 2);
        assert_eq!(default_stage_code(29), 2);
        assert_eq!(default_stage_code(30), 6);
        assert_eq!(default_stage_code(44), 6);
        assert_eq!(default_stage_code(45), 11);
        assert_eq!(default_stage_code(80), 11);
    }

    #[test]
    fn unknown_stage_code_falls_back_to_zero_return() {
        assert_eq!(stage_return(99), 0.0);
        assert_eq!(stage_return(0), 0.0);
    }

    #[test]
    fn override_applies_from_age_onward() {
        let mut overrides = StageOverrides::new();
        overrides.set(50, 5);

        assert_eq!(overrides.stage_for(49), 11);
        assert_eq!(overrides.stage_for(50), 5);
        assert_eq!(overrides.stage_for(70), 5);
    }

    #[test]
    fn later_override_layers_on_top() {
        let mut overrides = StageOverrides::new();
        overrides.set(40, 3);
        overrides.set(60, 11);

        assert_eq!(overrides.stage_for(39), 6);
        assert_eq!(overrides.stage_for(45), 3);
        assert_eq!(overrides.stage_for(60), 11);
    }

    #[test]
    fn reset_restores_default_curve() {
        let mut overrides = StageOverrides::new();
        overrides.set(30, 1);
        overrides.reset();

        assert!(overrides.is_empty());
        assert_eq!(overrides.stage_for(35), 6);
    }
}
