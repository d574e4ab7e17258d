// Descriptive statistics and geography helpers for the correlation tables.

use serde::{Deserialize, Serialize};

/// Country-code groupings used for regional sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    Africa,
    #[serde(rename = "EU")]
    Eu,
    #[serde(rename = "Middle East")]
    MiddleEast,
    Other,
}

const AFRICA: &[&str] = &[
    "DZ", "AO", "BJ", "BW", "BF", "BI", "CV", "CM", "CF", "TD", "KM", "CG", "CD", "DJ", "EG",
    "GQ", "ER", "SZ", "ET", "GA", "GM", "GH", "GN", "GW", "KE", "LS", "LR", "LY", "MG", "MW",
    "ML", "MR", "MU", "YT", "MA", "MZ", "NA", "NE", "NG", "RE", "RW", "SH", "ST", "SN", "SC",
    "SL", "SO", "ZA", "SS", "SD", "TZ", "TG", "TN", "UG", "EH", "ZM", "ZW",
];

const EU: &[&str] = &[
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT",
    "LV", "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE",
];

const MIDDLE_EAST: &[&str] = &[
    "BH", "EG", "IR", "IQ", "IL", "JO", "KW", "LB", "OM", "PS", "QA", "SA", "SY", "AE", "YE",
];

impl Region {
    /// Region of an ISO country code. Lists are checked in declaration order,
    /// so a code listed twice (EG) resolves to the first region.
    pub fn from_country(code: &str) -> Self {
        let code = code.trim().to_ascii_uppercase();
        let code = code.as_str();
        if AFRICA.contains(&code) {
            Region::Africa
        } else if EU.contains(&code) {
            Region::Eu
        } else if MIDDLE_EAST.contains(&code) {
            Region::MiddleEast
        } else {
            Region::Other
        }
    }

    /// Every region whose list contains `code`. Unlike `from_country`, a
    /// code listed twice belongs to both regions.
    pub fn all_for_country(code: &str) -> Vec<Region> {
        let code = code.trim().to_ascii_uppercase();
        let code = code.as_str();
        [
            (Region::Africa, AFRICA),
            (Region::Eu, EU),
            (Region::MiddleEast, MIDDLE_EAST),
        ]
        .into_iter()
        .filter(|(_, list)| list.contains(&code))
        .map(|(region, _)| region)
        .collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Africa => "Africa",
            Region::Eu => "EU",
            Region::MiddleEast => "Middle East",
            Region::Other => "Other",
        }
    }
}

/// Lowercase, trim and drop a leading "www." so site names and traffic
/// domains compare equal.
pub fn normalize_site(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len().is_multiple_of(2) {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Population variance (divides by n).
pub fn variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Five-number summary of a distribution, as drawn by a box plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spread {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

pub fn spread(values: &[f64]) -> Option<Spread> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(Spread {
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}

/// Linear interpolation between the two closest ranks of a sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_lookup() {
        assert_eq!(Region::from_country("ng"), Region::Africa);
        assert_eq!(Region::from_country("DE"), Region::Eu);
        assert_eq!(Region::from_country("QA"), Region::MiddleEast);
        assert_eq!(Region::from_country("US"), Region::Other);
        assert_eq!(Region::from_country("EG"), Region::Africa);
    }

    #[test]
    fn test_normalize_site() {
        assert_eq!(normalize_site("  WWW.Reuters.com "), "reuters.com");
        assert_eq!(normalize_site("bbc.co.uk"), "bbc.co.uk");
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_population_variance() {
        assert_eq!(variance(&[1.0, -1.0]), Some(1.0));
        assert_eq!(variance(&[0.0]), Some(0.0));
    }

    #[test]
    fn test_egypt_belongs_to_both_lists() {
        assert_eq!(
            Region::all_for_country("eg"),
            vec![Region::Africa, Region::MiddleEast]
        );
        assert!(Region::all_for_country("US").is_empty());
    }

    #[test]
    fn test_spread_interpolates_quartiles() {
        let s = spread(&[4.0, 1.0, 3.0, 2.0, 5.0]).unwrap();
        assert_eq!((s.min, s.q1, s.median, s.q3, s.max), (1.0, 2.0, 3.0, 4.0, 5.0));

        let s = spread(&[10.0, 20.0]).unwrap();
        assert_eq!(s.q1, 12.5);
        assert_eq!(s.median, 15.0);
        assert!(spread(&[]).is_none());
    }
}
