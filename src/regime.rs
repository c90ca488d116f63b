use crate::error::FrontierError;
use crate::universe::Sector;
use serde::Serialize;

/// Caps that a weight vector must satisfy simultaneously.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConstraintRegime {
    pub name: String,
    /// Maximum weight of any single asset.
    pub asset_max: f64,
    /// Maximum aggregate weight of any sector.
    pub sector_max: f64,
    /// Maximum aggregate weight of the Alternatives class.
    pub alt_max: f64,
}

/// Why a candidate weight vector was turned away.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Violation {
    Asset { index: usize, weight: f64 },
    Sector { sector: Sector, weight: f64 },
    Alternatives { weight: f64 },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::Asset { index, weight } => write!(f, "asset #{} at {:.4}", index, weight),
            Violation::Sector { sector, weight } => write!(f, "sector {} at {:.4}", sector, weight),
            Violation::Alternatives { weight } => write!(f, "alternatives at {:.4}", weight),
        }
    }
}

impl ConstraintRegime {
    pub fn new(name: &str, asset_max: f64, sector_max: f64, alt_max: f64) -> Result<Self, FrontierError> {
        for (field, cap) in [("asset_max", asset_max), ("sector_max", sector_max), ("alt_max", alt_max)] {
            if !(cap > 0.0 && cap <= 1.0) {
                return Err(FrontierError::invalid_config(
                    field,
                    format!("cap {} for regime '{}' must be in (0, 1]", cap, name),
                ));
            }
        }
        Ok(Self {
            name: name.to_string(),
            asset_max,
            sector_max,
            alt_max,
        })
    }

    /// The three regimes run by default: unconstrained, conservative, aggressive.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::unchecked("unconstrained", 1.00, 1.00, 1.00),
            Self::unchecked("conservative", 0.15, 0.25, 0.10),
            Self::unchecked("aggressive", 0.25, 0.35, 0.20),
        ]
    }

    fn unchecked(name: &str, asset_max: f64, sector_max: f64, alt_max: f64) -> Self {
        Self {
            name: name.to_string(),
            asset_max,
            sector_max,
            alt_max,
        }
    }

    /// Checks the caps in order: single asset, each sector, Alternatives class.
    /// `sectors[i]` is the sector of asset `i`.
    pub fn check(&self, weights: &[f64], sectors: &[Sector]) -> Result<(), Violation> {
        if let Some((index, &weight)) = weights.iter().enumerate().find(|&(_, &w)| w > self.asset_max) {
            return Err(Violation::Asset { index, weight });
        }

        let mut totals = [0.0f64; Sector::ALL.len()];
        for (&w, sector) in weights.iter().zip(sectors.iter()) {
            totals[sector.index()] += w;
        }

        if let Some((sector, &weight)) = Sector::ALL
            .iter()
            .zip(totals.iter())
            .find(|&(_, &total)| total > self.sector_max)
        {
            return Err(Violation::Sector { sector: *sector, weight });
        }

        let alt = totals[Sector::Alternatives.index()];
        if alt > self.alt_max {
            return Err(Violation::Alternatives { weight: alt });
        }

        Ok(())
    }

    pub fn is_satisfied_by(&self, weights: &[f64], sectors: &[Sector]) -> bool {
        self.check(weights, sectors).is_ok()
    }

    /// Display label, e.g. "Conservative".
    pub fn label(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Parses a comma-separated list of regime names against the defaults.
pub fn select_regimes(names: &str) -> Result<Vec<ConstraintRegime>, FrontierError> {
    let all = ConstraintRegime::defaults();
    names
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|name| {
            all.iter()
                .find(|r| r.name.eq_ignore_ascii_case(name))
                .cloned()
                .ok_or_else(|| FrontierError::UnknownRegime(name.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sectors() -> Vec<Sector> {
        vec![
            Sector::Technology,
            Sector::Technology,
            Sector::Energy,
            Sector::Alternatives,
        ]
    }

    #[test]
    fn test_defaults_match_expected_caps() {
        let regimes = ConstraintRegime::defaults();
        let names: Vec<&str> = regimes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["unconstrained", "conservative", "aggressive"]);
        assert_eq!(regimes[1].asset_max, 0.15);
        assert_eq!(regimes[1].sector_max, 0.25);
        assert_eq!(regimes[1].alt_max, 0.10);
        assert_eq!(regimes[2].alt_max, 0.20);
    }

    #[test]
    fn test_unconstrained_accepts_any_simplex_point() {
        let r = &ConstraintRegime::defaults()[0];
        assert!(r.is_satisfied_by(&[1.0, 0.0, 0.0, 0.0], &sectors()));
        assert!(r.is_satisfied_by(&[0.25, 0.25, 0.25, 0.25], &sectors()));
    }

    #[test]
    fn test_asset_cap_checked_first() {
        let r = ConstraintRegime::new("t", 0.15, 0.25, 0.10).unwrap();
        let err = r.check(&[0.16, 0.0, 0.0, 0.84], &sectors()).unwrap_err();
        assert_eq!(err, Violation::Asset { index: 0, weight: 0.16 });
    }

    #[test]
    fn test_sector_cap() {
        let r = ConstraintRegime::new("t", 0.5, 0.5, 1.0).unwrap();
        match r.check(&[0.3, 0.3, 0.2, 0.2], &sectors()) {
            Err(Violation::Sector { sector, weight }) => {
                assert_eq!(sector, Sector::Technology);
                assert!((weight - 0.6).abs() < 1e-12);
            }
            other => panic!("expected sector violation, got {:?}", other),
        }
    }

    #[test]
    fn test_alternatives_cap() {
        let r = ConstraintRegime::new("t", 0.5, 0.5, 0.1).unwrap();
        let err = r.check(&[0.25, 0.2, 0.35, 0.2], &sectors()).unwrap_err();
        assert_eq!(err, Violation::Alternatives { weight: 0.2 });
        assert_eq!(err.to_string(), "alternatives at 0.2000");
    }

    #[test]
    fn test_caps_are_inclusive() {
        let r = ConstraintRegime::new("t", 0.25, 0.5, 0.25).unwrap();
        assert!(r.is_satisfied_by(&[0.25, 0.25, 0.25, 0.25], &sectors()));
    }

    #[test]
    fn test_new_rejects_out_of_range_caps() {
        assert!(ConstraintRegime::new("bad", 0.0, 0.5, 0.5).is_err());
        assert!(ConstraintRegime::new("bad", 0.5, 1.5, 0.5).is_err());
        assert!(ConstraintRegime::new("bad", 0.5, 0.5, f64::NAN).is_err());
    }

    #[test]
    fn test_select_regimes() {
        let picked = select_regimes("aggressive, Unconstrained").unwrap();
        assert_eq!(picked[0].name, "aggressive");
        assert_eq!(picked[1].name, "unconstrained");
        assert!(matches!(select_regimes("wild"), Err(FrontierError::UnknownRegime(_))));
        assert_eq!(picked[0].label(), "Aggressive");
    }
}
