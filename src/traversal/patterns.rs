//! Keyframe animation patterns.
//!
//! A property's keyframes (sorted by time) are reduced to one numeric track:
//! the value itself, or for vector values the component that moves the
//! most. With deltas `d_i` between successive keys:
//!
//! | pattern | signature | confidence |
//! |---------|-----------|------------|
//! | bounce | every successive pair of deltas changes sign (>= 2 deltas) and most pairs shrink in magnitude | share of shrinking magnitudes |
//! | ease | monotonic, speed never grows and shrinks at least once | share of strictly shrinking speeds |
//! | linear | any other monotonic track | 1 - coefficient of variation of speeds |

use std::str::FromStr;

use serde::Serialize;

use super::{AnimationPatterns, GraphWalker, KeyframeSummary, NodeRef, PatternMatch, QueryResult, invalid, keyframes};
use crate::model::Value;
use crate::schema::NodeType;
use crate::storage::StorageBackend;

const TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationPattern {
    Linear,
    Ease,
    Bounce,
}

/// Which patterns a search returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternQuery {
    Only(AnimationPattern),
    Any,
}

impl PatternQuery {
    fn admits(self, pattern: AnimationPattern) -> bool {
        match self {
            PatternQuery::Only(p) => p == pattern,
            PatternQuery::Any => true,
        }
    }
}

impl FromStr for PatternQuery {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(PatternQuery::Only(AnimationPattern::Linear)),
            "ease" => Ok(PatternQuery::Only(AnimationPattern::Ease)),
            "bounce" => Ok(PatternQuery::Only(AnimationPattern::Bounce)),
            "any" => Ok(PatternQuery::Any),
            other => Err(crate::Error::InvalidArgument(format!(
                "pattern type must be one of linear, ease, bounce, any (got '{other}')"
            ))),
        }
    }
}

/// Classify a `(time, value)` track sorted by time.
///
/// `None` for fewer than two keys or a track that is neither monotonic
/// nor a settling alternation.
pub fn classify_track(track: &[(f64, f64)]) -> Option<(AnimationPattern, f64)> {
    if track.len() < 2 {
        return None;
    }
    let deltas: Vec<f64> = track.windows(2).map(|w| w[1].1 - w[0].1).collect();

    let alternating = deltas.len() >= 2
        && deltas.windows(2).all(|w| w[0] * w[1] < 0.0);
    if alternating {
        // A bounce settles. An oscillation that holds or grows is no pattern.
        let pairs = deltas.len() - 1;
        let shrinking = deltas.windows(2).filter(|w| w[1].abs() < w[0].abs()).count();
        if shrinking * 2 <= pairs {
            return None;
        }
        return Some((AnimationPattern::Bounce, shrinking as f64 / pairs as f64));
    }

    let rising = deltas.iter().all(|d| *d >= 0.0);
    let falling = deltas.iter().all(|d| *d <= 0.0);
    let moving = deltas.iter().any(|d| d.abs() > TOLERANCE);
    if !(rising || falling) || !moving {
        return None;
    }

    let speeds: Vec<f64> = track
        .windows(2)
        .zip(&deltas)
        .map(|(w, d)| d.abs() / (w[1].0 - w[0].0).max(f64::EPSILON))
        .collect();

    if speeds.len() >= 2 {
        let scale = speeds.iter().cloned().fold(0.0, f64::max).max(1.0);
        let tol = TOLERANCE * scale;
        let growing = speeds.windows(2).any(|w| w[1] > w[0] + tol);
        let shrinking = speeds.windows(2).filter(|w| w[1] < w[0] - tol).count();
        if !growing && shrinking > 0 {
            return Some((AnimationPattern::Ease, shrinking as f64 / (speeds.len() - 1) as f64));
        }
    }

    let mean = speeds.iter().sum::<f64>() / speeds.len() as f64;
    let variance = speeds.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / speeds.len() as f64;
    let cv = if mean > 0.0 { variance.sqrt() / mean } else { 0.0 };
    Some((AnimationPattern::Linear, (1.0 - cv).clamp(0.0, 1.0)))
}

/// Numeric track of a keyframe list, `None` when any value is non-numeric.
fn scalar_track(keys: &[KeyframeSummary]) -> Option<Vec<(f64, f64)>> {
    let components: Vec<Vec<f64>> = keys
        .iter()
        .map(|k| k.value.numeric_components())
        .collect::<Option<_>>()?;
    let width = components.first()?.len();
    if components.iter().any(|c| c.len() != width) {
        return None;
    }

    let range = |i: usize| {
        let (lo, hi) = components
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| (lo.min(c[i]), hi.max(c[i])));
        hi - lo
    };
    let axis = (0..width).max_by(|&a, &b| range(a).total_cmp(&range(b)))?;

    Some(keys.iter().zip(&components).map(|(k, c)| (k.time, c[axis])).collect())
}

impl<B: StorageBackend> GraphWalker<'_, B> {
    /// Properties whose keyframes inside `time_range` (inclusive) match
    /// `pattern_type` (`linear`, `ease`, `bounce` or `any`).
    pub async fn find_animation_patterns(
        &self,
        pattern_type: &str,
        time_range: Option<(f64, f64)>,
    ) -> QueryResult<AnimationPatterns> {
        let query: PatternQuery = pattern_type.parse()?;
        if let Some((start, end)) = time_range {
            if !start.is_finite() || !end.is_finite() || start > end {
                return Err(invalid(format!("time range must be finite and ordered (got {start}..{end})")));
            }
        }

        let mut session = self.session().await?;
        session.scan(NodeType::Property).await?;

        let mut matching_patterns = Vec::new();
        for property in session.collect().await? {
            let keys: Vec<KeyframeSummary> = keyframes(&session, property.id)
                .await?
                .into_iter()
                .filter(|k| time_range.is_none_or(|(s, e)| (s..=e).contains(&k.time)))
                .collect();
            if keys.len() < 2 || keys.iter().any(|k| matches!(k.value, Value::Null)) {
                continue;
            }
            let Some(track) = scalar_track(&keys) else { continue };
            let Some((pattern, confidence)) = classify_track(&track) else { continue };
            if query.admits(pattern) {
                matching_patterns.push(PatternMatch {
                    property: NodeRef::from(&property),
                    pattern,
                    confidence,
                    keyframes: keys.len(),
                });
            }
        }
        matching_patterns.sort_by(|a, b| {
            b.confidence.total_cmp(&a.confidence).then_with(|| a.property.id.cmp(&b.property.id))
        });

        Ok(AnimationPatterns {
            pattern_type: pattern_type.trim().to_ascii_lowercase(),
            time_range,
            matching_patterns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(values: &[f64]) -> Vec<(f64, f64)> {
        values.iter().enumerate().map(|(i, v)| (i as f64, *v)).collect()
    }

    #[test]
    fn test_linear_track() {
        let (pattern, confidence) = classify_track(&track(&[0.0, 10.0, 20.0, 30.0])).unwrap();
        assert_eq!(pattern, AnimationPattern::Linear);
        assert!((confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_keys_are_linear() {
        let (pattern, _) = classify_track(&[(0.0, 100.0), (2.0, 40.0)]).unwrap();
        assert_eq!(pattern, AnimationPattern::Linear);
    }

    #[test]
    fn test_ease_track() {
        let (pattern, confidence) = classify_track(&track(&[0.0, 50.0, 80.0, 95.0, 100.0])).unwrap();
        assert_eq!(pattern, AnimationPattern::Ease);
        assert!((confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounce_track() {
        let (pattern, confidence) = classify_track(&track(&[0.0, 100.0, 60.0, 90.0, 80.0])).unwrap();
        assert_eq!(pattern, AnimationPattern::Bounce);
        assert!((confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mostly_damped_bounce() {
        // |d| = 100, 40, 50, 10: two of three pairs shrink.
        let (pattern, confidence) = classify_track(&track(&[0.0, 100.0, 60.0, 110.0, 100.0])).unwrap();
        assert_eq!(pattern, AnimationPattern::Bounce);
        assert!((confidence - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_growing_oscillation_is_not_bounce() {
        // |d| = 10, 20, 40, 70.
        assert_eq!(classify_track(&track(&[0.0, 10.0, -10.0, 30.0, -40.0])), None);
        // Constant amplitude never settles either.
        assert_eq!(classify_track(&track(&[0.0, 10.0, 0.0, 10.0, 0.0])), None);
    }

    #[test]
    fn test_unclassifiable_tracks() {
        assert_eq!(classify_track(&track(&[5.0])), None);
        assert_eq!(classify_track(&track(&[5.0, 5.0, 5.0])), None);
        // Rises, rises, falls: neither monotonic nor alternating.
        assert_eq!(classify_track(&track(&[0.0, 1.0, 2.0, 1.0])), None);
    }

    #[test]
    fn test_vector_track_uses_widest_component() {
        let keys: Vec<KeyframeSummary> = [(0.0, [960.0, 540.0]), (1.0, [1200.0, 545.0]), (2.0, [1440.0, 550.0])]
            .into_iter()
            .enumerate()
            .map(|(i, (time, [x, y]))| KeyframeSummary {
                id: format!("k{i}"),
                time,
                value: Value::from(vec![x, y]),
                interpolation: "linear".into(),
            })
            .collect();
        let track = scalar_track(&keys).unwrap();
        assert_eq!(track, vec![(0.0, 960.0), (1.0, 1200.0), (2.0, 1440.0)]);
    }

    #[test]
    fn test_pattern_query_parsing() {
        assert_eq!("Bounce".parse::<PatternQuery>().unwrap(), PatternQuery::Only(AnimationPattern::Bounce));
        assert_eq!("any".parse::<PatternQuery>().unwrap(), PatternQuery::Any);
        assert!("wobble".parse::<PatternQuery>().is_err());
    }
}
