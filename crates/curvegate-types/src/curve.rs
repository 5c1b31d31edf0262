//! In-memory curve model: named time series and collections of them.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A simulation time used as an ordered map key.
///
/// Ordering is `f64::total_cmp`, so every value (including `-0.0` and NaN)
/// has a stable position. Parsed answer files never contain non-finite
/// timesteps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Timestep(pub f64);

impl Timestep {
    pub fn value(self) -> f64 {
        self.0
    }

    /// The timestep as it survives the stats file format (one digit after
    /// the decimal point in scientific notation).
    pub fn stats_key(self) -> Timestep {
        format_sci(self.0, 1)
            .parse::<f64>()
            .map(Timestep)
            .unwrap_or(self)
    }
}

impl PartialEq for Timestep {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestep {}

impl PartialOrd for Timestep {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestep {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for Timestep {
    fn from(value: f64) -> Self {
        Timestep(value)
    }
}

impl fmt::Display for Timestep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_sci(self.0, 1))
    }
}

/// C-style scientific notation: `digits` mantissa digits after the point and
/// a signed exponent of at least two digits (`1.50e-03`).
pub fn format_sci(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let raw = format!("{value:.digits$e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => raw,
    }
}

/// A named time series. Each timestep holds every value contributed for it,
/// in contribution order.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    name: String,
    samples: BTreeMap<Timestep, Vec<f64>>,
}

impl Curve {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            samples: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add `value` to the list at `timestep`, creating the entry if absent.
    pub fn append(&mut self, timestep: f64, value: f64) {
        self.samples
            .entry(Timestep(timestep))
            .or_default()
            .push(value);
    }

    /// Distinct timesteps in ascending order. The iterator is cheap to clone,
    /// so callers can walk it more than once.
    pub fn timesteps(&self) -> impl Iterator<Item = f64> + Clone + '_ {
        self.samples.keys().map(|t| t.0)
    }

    /// Every value contributed at `timestep`; empty when the timestep is absent.
    pub fn values_at(&self, timestep: f64) -> &[f64] {
        self.samples
            .get(&Timestep(timestep))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The first contributed value, which is the one compared against.
    pub fn first_value_at(&self, timestep: f64) -> Option<f64> {
        self.values_at(timestep).first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &[f64])> + '_ {
        self.samples.iter().map(|(t, v)| (t.0, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Fold another recording of the same logical curve into this one.
    pub fn merge(&mut self, other: Curve) {
        for (t, values) in other.samples {
            self.samples.entry(t).or_default().extend(values);
        }
    }
}

/// Curves for one test, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurveSet {
    curves: BTreeMap<String, Curve>,
}

impl CurveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample, creating the curve on first use.
    pub fn append(&mut self, curve: &str, timestep: f64, value: f64) {
        self.curves
            .entry(curve.to_string())
            .or_insert_with(|| Curve::new(curve))
            .append(timestep, value);
    }

    /// Insert a curve, merging with an existing curve of the same name.
    pub fn insert(&mut self, curve: Curve) {
        match self.curves.get_mut(curve.name()) {
            Some(existing) => existing.merge(curve),
            None => {
                self.curves.insert(curve.name().to_string(), curve);
            }
        }
    }

    /// Merge every curve of `other` into this set (append semantics).
    pub fn merge(&mut self, other: CurveSet) {
        for curve in other.curves.into_values() {
            self.insert(curve);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Curve> {
        self.curves.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.curves.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.curves.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Curve> + '_ {
        self.curves.values()
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

impl FromIterator<Curve> for CurveSet {
    fn from_iter<I: IntoIterator<Item = Curve>>(iter: I) -> Self {
        let mut set = CurveSet::new();
        for curve in iter {
            set.insert(curve);
        }
        set
    }
}

/// Per-timestep statistics over the values contributed by historical runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TimestepStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
}

/// Statistics per curve per timestep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsMap {
    curves: BTreeMap<String, BTreeMap<Timestep, TimestepStats>>,
}

impl StatsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, curve: &str, timestep: f64, stats: TimestepStats) {
        self.curves
            .entry(curve.to_string())
            .or_default()
            .insert(Timestep(timestep), stats);
    }

    /// Exact lookup first, then through the stats-file timestep precision.
    pub fn get(&self, curve: &str, timestep: f64) -> Option<&TimestepStats> {
        self.resolve(curve, timestep).map(|(_, stats)| stats)
    }

    /// Like [`StatsMap::get`], but also returns the stored timestep that matched.
    pub fn resolve(&self, curve: &str, timestep: f64) -> Option<(f64, &TimestepStats)> {
        let steps = self.curves.get(curve)?;
        let t = Timestep(timestep);
        let key = t.stats_key();
        steps
            .get_key_value(&t)
            .or_else(|| steps.get_key_value(&key))
            .map(|(k, stats)| (k.0, stats))
    }

    pub fn contains_curve(&self, curve: &str) -> bool {
        self.curves.contains_key(curve)
    }

    pub fn curve_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.curves.keys().map(String::as_str)
    }

    /// Ascending timesteps recorded for `curve` (empty when unknown).
    pub fn timesteps<'a>(&'a self, curve: &str) -> impl Iterator<Item = f64> + use<'a> {
        self.curves
            .get(curve)
            .into_iter()
            .flat_map(|steps| steps.keys().map(|t| t.0))
    }

    /// `(curve, timestep, stats)` in curve-name then timestep order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64, &TimestepStats)> + '_ {
        self.curves.iter().flat_map(|(name, steps)| {
            steps
                .iter()
                .map(move |(t, stats)| (name.as_str(), t.0, stats))
        })
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_creates_and_extends_entries() {
        let mut curve = Curve::new("accx");
        curve.append(1.0, 2.0);
        curve.append(0.0, 1.0);
        curve.append(1.0, 2.5);

        assert_eq!(curve.timesteps().collect::<Vec<_>>(), vec![0.0, 1.0]);
        assert_eq!(curve.values_at(1.0), &[2.0, 2.5]);
        assert_eq!(curve.first_value_at(0.0), Some(1.0));
    }

    #[test]
    fn missing_timestep_yields_empty_values() {
        let curve = Curve::new("accx");
        assert!(curve.values_at(3.0).is_empty());
        assert_eq!(curve.first_value_at(3.0), None);
    }

    #[test]
    fn timesteps_iterator_is_restartable() {
        let mut curve = Curve::new("v");
        curve.append(2.0, 0.0);
        curve.append(-1.0, 0.0);
        let steps = curve.timesteps();
        let first: Vec<f64> = steps.clone().collect();
        let second: Vec<f64> = steps.collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![-1.0, 2.0]);
    }

    #[test]
    fn curve_set_merge_appends_values() {
        let mut a = CurveSet::new();
        a.append("ke", 0.0, 1.0);
        let mut b = CurveSet::new();
        b.append("ke", 0.0, 1.5);
        b.append("ke", 1.0, 2.0);
        b.append("ie", 0.0, 3.0);

        a.merge(b);
        let ke = a.get("ke").unwrap();
        assert_eq!(ke.values_at(0.0), &[1.0, 1.5]);
        assert_eq!(ke.values_at(1.0), &[2.0]);
        assert_eq!(a.names().collect::<Vec<_>>(), vec!["ie", "ke"]);
    }

    #[test]
    fn format_sci_uses_two_digit_signed_exponent() {
        assert_eq!(format_sci(0.001, 1), "1.0e-03");
        assert_eq!(format_sci(12346.0, 3), "1.235e+04");
        assert_eq!(format_sci(0.0, 2), "0.00e+00");
        assert_eq!(format_sci(-2.6, 0), "-3e+00");
    }

    #[test]
    fn stats_lookup_falls_back_to_stats_precision() {
        let mut stats = StatsMap::new();
        let s = TimestepStats {
            min: 1.0,
            max: 2.0,
            mean: 1.5,
            stddev: 0.5,
        };
        stats.insert("vel", 1.2e-3, s);

        assert_eq!(stats.get("vel", 1.2e-3), Some(&s));
        assert_eq!(stats.get("vel", 1.23e-3), Some(&s));
        assert_eq!(stats.resolve("vel", 1.23e-3), Some((1.2e-3, &s)));
        assert_eq!(stats.get("vel", 5.0), None);
        assert_eq!(stats.get("acc", 1.2e-3), None);
    }

    #[test]
    fn stats_iter_is_ordered() {
        let mut stats = StatsMap::new();
        let s = TimestepStats {
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            stddev: 0.0,
        };
        stats.insert("b", 1.0, s);
        stats.insert("a", 2.0, s);
        stats.insert("a", 1.0, s);
        let order: Vec<(&str, f64)> = stats.iter().map(|(c, t, _)| (c, t)).collect();
        assert_eq!(order, vec![("a", 1.0), ("a", 2.0), ("b", 1.0)]);
    }
}
