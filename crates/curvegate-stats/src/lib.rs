//! Envelope statistics over historical baseline runs.
//!
//! Given N historical [`CurveSet`]s for one test, every value contributed at a
//! curve/timestep is pooled and summarized as min / max / mean / sample
//! standard deviation. The result can be persisted in a compact line format
//! and reloaded without the raw samples:
//!
//! ```text
//! <curve>:<timestep>,max=<v>,min=<v>,stddev=<v>,mean=<v>
//! ```

use curvegate_error::{ParseError, ParseErrorKind};
use curvegate_types::{CurveSet, StatsMap, TimestepStats, format_sci};
use statrs::statistics::Statistics;

/// Mantissa digits used for the stats values; enough to round-trip any f64.
const VALUE_DIGITS: usize = 16;

/// Mantissa digits the stats format keeps for timesteps.
const TIMESTEP_DIGITS: usize = 1;

/// Summarize one pooled value list.
///
/// Returns `None` for an empty slice. A single value yields `min == max ==
/// mean` and `stddev == 0.0`.
pub fn summarize(values: &[f64]) -> Option<TimestepStats> {
    if values.is_empty() {
        return None;
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = Statistics::mean(values.iter());
    let stddev = if values.len() < 2 {
        0.0
    } else {
        Statistics::std_dev(values.iter())
    };

    Some(TimestepStats {
        min,
        max,
        mean,
        stddev,
    })
}

/// Pool every historical run and compute stats per curve per timestep.
pub fn compute_stats(runs: &[CurveSet]) -> StatsMap {
    let mut pooled = CurveSet::new();
    for run in runs {
        pooled.merge(run.clone());
    }

    let mut stats = StatsMap::new();
    for curve in pooled.iter() {
        for (timestep, values) in curve.iter() {
            if let Some(s) = summarize(values) {
                stats.insert(curve.name(), timestep, s);
            }
        }
    }
    stats
}

/// Render stats in the line format, curve-name then timestep order.
pub fn render_stats(stats: &StatsMap) -> String {
    let mut out = String::new();
    for (curve, timestep, s) in stats.iter() {
        out.push_str(&format!(
            "{curve}:{},max={},min={},stddev={},mean={}\n",
            format_sci(timestep, TIMESTEP_DIGITS),
            format_sci(s.max, VALUE_DIGITS),
            format_sci(s.min, VALUE_DIGITS),
            format_sci(s.stddev, VALUE_DIGITS),
            format_sci(s.mean, VALUE_DIGITS),
        ));
    }
    out
}

/// Parse the line format back into a [`StatsMap`]. Blank lines are skipped.
pub fn parse_stats(source_name: &str, text: &str) -> Result<StatsMap, ParseError> {
    let mut stats = StatsMap::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let fail = |kind: ParseErrorKind| ParseError::new(source_name, idx + 1, kind);
        let malformed = |reason: String| fail(ParseErrorKind::MalformedStats { reason });

        // Curve names may contain ',' or ':', so split from the right.
        let mut fields = line.rsplitn(5, ',');
        let mean = fields.next();
        let stddev = fields.next();
        let min = fields.next();
        let max = fields.next();
        let head = fields.next();
        let (Some(mean), Some(stddev), Some(min), Some(max), Some(head)) =
            (mean, stddev, min, max, head)
        else {
            return Err(malformed("expected 5 comma-separated fields".into()));
        };

        let (curve, timestep) = head
            .rsplit_once(':')
            .ok_or_else(|| malformed("missing `<curve>:<timestep>` prefix".into()))?;
        if curve.is_empty() {
            return Err(malformed("empty curve name".into()));
        }
        let timestep = number(timestep, "timestep").map_err(fail)?;

        let s = TimestepStats {
            max: field(max, "max").map_err(fail)?,
            min: field(min, "min").map_err(fail)?,
            stddev: field(stddev, "stddev").map_err(fail)?,
            mean: field(mean, "mean").map_err(fail)?,
        };
        stats.insert(curve, timestep, s);
    }

    Ok(stats)
}

fn field(raw: &str, key: &str) -> Result<f64, ParseErrorKind> {
    let malformed = |reason: String| ParseErrorKind::MalformedStats { reason };
    let (k, v) = raw
        .split_once('=')
        .ok_or_else(|| malformed(format!("expected `{key}=<value>`, found `{raw}`")))?;
    if k.trim() != key {
        return Err(malformed(format!("expected `{key}`, found `{}`", k.trim())));
    }
    number(v, key)
}

/// Parse one stats number; NaN and infinities are rejected.
fn number(raw: &str, what: &str) -> Result<f64, ParseErrorKind> {
    let token = raw.trim();
    let value: f64 = token.parse().map_err(|_| ParseErrorKind::MalformedStats {
        reason: format!("bad {what} value `{token}`"),
    })?;
    if !value.is_finite() {
        return Err(ParseErrorKind::NonFinite {
            token: token.to_string(),
        });
    }
    Ok(value)
}
