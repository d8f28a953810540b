//! Cross-dissolve timing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hookreel_common::error::{HookreelError, HookreelResult};
use hookreel_model::Combination;

/// Source of media durations (ffprobe in production).
pub trait DurationProbe: Send + Sync {
    /// Duration of the media file in seconds.
    fn probe_duration(&self, path: &Path) -> HookreelResult<f64>;
}

/// Timing for one blended combination.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan {
    pub transition_secs: f64,

    /// Segment durations, in join order.
    pub durations: Vec<f64>,

    /// One offset per segment. `offsets[0]` is always 0; `offsets[i]` is where
    /// segment `i` starts dissolving into the chained stream.
    pub offsets: Vec<f64>,
}

/// Cumulative dissolve offsets.
///
/// `offset[0] = 0` and `offset[i] = max(0, offset[i-1] + duration[i-1] - transition)`.
/// A segment shorter than the transition floors its successor's offset at 0.
pub fn crossfade_offsets(durations: &[f64], transition_secs: f64) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(durations.len());
    let mut previous = 0.0f64;
    for (idx, _) in durations.iter().enumerate() {
        let offset = if idx == 0 {
            0.0
        } else {
            let raw = previous + durations[idx - 1] - transition_secs;
            if raw < 0.0 {
                tracing::warn!(
                    segment = idx,
                    raw_offset = raw,
                    "Dissolve offset below zero, flooring to 0"
                );
            }
            raw.max(0.0)
        };
        offsets.push(offset);
        previous = offset;
    }
    offsets
}

/// Computes [`TransitionPlan`]s, probing and caching durations per batch.
pub struct TransitionPlanner {
    transition_secs: f64,
    probe: Arc<dyn DurationProbe>,
    cache: HashMap<PathBuf, f64>,
}

impl TransitionPlanner {
    pub fn new(transition_secs: f64, probe: Arc<dyn DurationProbe>) -> Self {
        Self {
            transition_secs,
            probe,
            cache: HashMap::new(),
        }
    }

    pub fn plan(&mut self, combination: &Combination) -> HookreelResult<TransitionPlan> {
        let mut durations = Vec::with_capacity(combination.len());
        for segment in combination.segments() {
            let secs = match segment.duration_secs {
                Some(secs) => secs,
                None => self.duration_of(&segment.path)?,
            };
            durations.push(secs);
        }

        let offsets = crossfade_offsets(&durations, self.transition_secs);
        Ok(TransitionPlan {
            transition_secs: self.transition_secs,
            durations,
            offsets,
        })
    }

    fn duration_of(&mut self, path: &Path) -> HookreelResult<f64> {
        if let Some(secs) = self.cache.get(path) {
            return Ok(*secs);
        }
        let secs = self.probe.probe_duration(path)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(HookreelError::probe(format!(
                "Invalid duration {secs} for {}",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), duration_secs = secs, "Probed segment duration");
        self.cache.insert(path.to_path_buf(), secs);
        Ok(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookreel_model::{Category, Segment};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProbe {
        secs: f64,
        calls: AtomicUsize,
    }

    impl DurationProbe for FixedProbe {
        fn probe_duration(&self, _path: &Path) -> HookreelResult<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.secs)
        }
    }

    fn scenario_combo() -> Combination {
        Combination::new(vec![
            Segment::new(Category::Hook, "A.mp4"),
            Segment::new(Category::Body, "C.mp4"),
            Segment::new(Category::CallToAction, "D.mp4"),
        ])
        .unwrap()
    }

    #[test]
    fn test_scenario_offsets() {
        let offsets = crossfade_offsets(&[2.0, 2.0], 0.5);
        assert_eq!(offsets, vec![0.0, 1.5]);

        let offsets = crossfade_offsets(&[2.0, 2.0, 2.0], 0.5);
        assert_eq!(offsets, vec![0.0, 1.5, 3.0]);
    }

    #[test]
    fn test_short_segment_floors_to_zero() {
        let offsets = crossfade_offsets(&[0.2, 3.0, 1.0], 0.5);
        assert_eq!(offsets[1], 0.0);
        assert!((offsets[2] - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_durations() {
        assert!(crossfade_offsets(&[], 0.5).is_empty());
    }

    #[test]
    fn test_planner_caches_probe_results() {
        let probe = Arc::new(FixedProbe {
            secs: 2.0,
            calls: AtomicUsize::new(0),
        });
        let mut planner = TransitionPlanner::new(0.5, probe.clone());

        let combo = scenario_combo();
        let plan = planner.plan(&combo).unwrap();
        assert_eq!(plan.durations, vec![2.0, 2.0, 2.0]);
        assert_eq!(plan.offsets, vec![0.0, 1.5, 3.0]);

        planner.plan(&combo).unwrap();
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_known_duration_skips_probe() {
        let probe = Arc::new(FixedProbe {
            secs: 9.0,
            calls: AtomicUsize::new(0),
        });
        let mut planner = TransitionPlanner::new(0.5, probe.clone());
        let combo = Combination::new(vec![
            Segment::new(Category::Hook, "A.mp4").with_duration(1.0),
            Segment::new(Category::Body, "C.mp4").with_duration(4.0),
        ])
        .unwrap();

        let plan = planner.plan(&combo).unwrap();
        assert_eq!(plan.offsets, vec![0.0, 0.5]);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_probe_result_is_error() {
        let probe = Arc::new(FixedProbe {
            secs: f64::NAN,
            calls: AtomicUsize::new(0),
        });
        let mut planner = TransitionPlanner::new(0.5, probe);
        assert!(matches!(
            planner.plan(&scenario_combo()),
            Err(HookreelError::Probe { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_offsets_never_negative(
            durations in proptest::collection::vec(0.0f64..30.0, 0..8),
            transition in 0.0f64..5.0,
        ) {
            let offsets = crossfade_offsets(&durations, transition);
            prop_assert_eq!(offsets.len(), durations.len());
            prop_assert!(offsets.iter().all(|o| *o >= 0.0));
            if let Some(first) = offsets.first() {
                prop_assert_eq!(*first, 0.0);
            }
        }

        #[test]
        fn prop_offsets_are_deterministic(
            durations in proptest::collection::vec(0.0f64..30.0, 0..8),
        ) {
            prop_assert_eq!(
                crossfade_offsets(&durations, 0.5),
                crossfade_offsets(&durations, 0.5)
            );
        }
    }
}
