//! The dimension/quality search as an explicit state machine.
//!
//! [`SearchState`] never touches pixels. It proposes the next [`Trial`], the
//! driver encodes it and reports the byte size back through
//! [`SearchState::record`], which decides whether to accept, retry with a
//! smaller trial, or give up. Keeping the decisions free of I/O lets the
//! same state machine back the blocking engine, the awaited engine and the
//! wasm driver.
//!
//! Every trial after the first has a width and quality no greater than the
//! previous one, so the search cannot oscillate. The total number of
//! recorded attempts is at most `max_attempts + 1`.

use super::{Attempt, PhaseOrder, SearchPolicy, TargetSpec};
use crate::decode::{decay_width, height_for_width, target_dimensions};
use crate::format::OutputFormat;

/// Dimensions and quality to encode next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trial {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

/// Where the search is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// First trial, at the initial dimensions and starting quality.
    Initial,
    /// Current trial came from lowering quality.
    Quality,
    /// Current trial came from shrinking dimensions.
    Dimension,
    /// Last-chance trial at the minimum width and floor quality.
    Floor,
    /// An attempt met the budget.
    Succeeded,
    /// Nothing left to try.
    Exhausted,
}

impl SearchPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, SearchPhase::Succeeded | SearchPhase::Exhausted)
    }
}

/// What the driver should do after reporting an attempt's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The attempt fits the budget; stop and use it.
    Accept,
    /// Encode [`SearchState::next_trial`] next.
    Retry,
    /// The budget cannot be met within the search bounds.
    GiveUp,
}

/// Search progress for one compression call.
#[derive(Debug, Clone)]
pub struct SearchState {
    source_width: u32,
    source_height: u32,
    min_width: u32,
    max_file_size: usize,
    policy: SearchPolicy,
    vary_quality: bool,
    quality_floor: u8,
    current: Trial,
    phase: SearchPhase,
    attempts: Vec<Attempt>,
}

impl SearchState {
    /// Start a search for a `source_width` x `source_height` raster.
    ///
    /// `spec` and `policy` are expected to be validated already.
    pub fn new(
        source_width: u32,
        source_height: u32,
        spec: &TargetSpec,
        format: OutputFormat,
        policy: SearchPolicy,
    ) -> Self {
        let (width, height) =
            target_dimensions(source_width, source_height, spec.min_width, spec.max_width);
        let quality = spec.quality.min(policy.quality_cap);

        Self {
            source_width,
            source_height,
            min_width: spec.min_width,
            max_file_size: spec.max_file_size,
            policy,
            vary_quality: format.is_lossy() && policy.quality_step > 0,
            // A starting quality already under the floor is never raised
            quality_floor: policy.quality_floor.min(quality),
            current: Trial {
                width,
                height,
                quality,
            },
            phase: SearchPhase::Initial,
            attempts: Vec::with_capacity(policy.max_attempts as usize + 1),
        }
    }

    /// The trial to encode next, or `None` once the search has finished.
    pub fn next_trial(&self) -> Option<Trial> {
        if self.phase.is_terminal() {
            None
        } else {
            Some(self.current)
        }
    }

    /// Report the encoded size of the current trial.
    pub fn record(&mut self, size: usize) -> Decision {
        match self.phase {
            SearchPhase::Succeeded => return Decision::Accept,
            SearchPhase::Exhausted => return Decision::GiveUp,
            _ => {}
        }

        let trial = self.current;
        self.attempts.push(Attempt {
            width: trial.width,
            height: trial.height,
            quality: trial.quality,
            size,
        });

        if size <= self.max_file_size {
            self.phase = SearchPhase::Succeeded;
            return Decision::Accept;
        }

        if self.phase == SearchPhase::Floor {
            self.phase = SearchPhase::Exhausted;
            return Decision::GiveUp;
        }

        if self.attempts.len() < self.policy.max_attempts as usize {
            if let Some((next, phase)) = self.reduce(trial) {
                self.current = next;
                self.phase = phase;
                return Decision::Retry;
            }
        }

        let floor = self.floor_trial();
        if !self.attempts.iter().any(|a| a.trial() == floor) {
            self.current = floor;
            self.phase = SearchPhase::Floor;
            return Decision::Retry;
        }

        self.phase = SearchPhase::Exhausted;
        Decision::GiveUp
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    /// Attempts recorded so far, in order.
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    /// The smallest trial the search is allowed to make.
    pub fn floor_trial(&self) -> Trial {
        let width = self.min_width.min(self.initial_width());
        let quality = if self.vary_quality {
            self.quality_floor
        } else {
            self.current.quality
        };
        Trial {
            width,
            height: height_for_width(self.source_width, self.source_height, width),
            quality,
        }
    }

    fn initial_width(&self) -> u32 {
        self.attempts
            .first()
            .map(|a| a.width)
            .unwrap_or(self.current.width)
    }

    fn reduce(&self, trial: Trial) -> Option<(Trial, SearchPhase)> {
        let quality = || self.lower_quality(trial).map(|t| (t, SearchPhase::Quality));
        let dimension = || self.shrink_width(trial).map(|t| (t, SearchPhase::Dimension));

        match self.policy.phase_order {
            PhaseOrder::QualityFirst => quality().or_else(dimension),
            PhaseOrder::ScaleFirst => dimension().or_else(quality),
        }
    }

    fn lower_quality(&self, trial: Trial) -> Option<Trial> {
        if !self.vary_quality || trial.quality <= self.quality_floor {
            return None;
        }
        let quality = trial
            .quality
            .saturating_sub(self.policy.quality_step)
            .max(self.quality_floor);
        Some(Trial { quality, ..trial })
    }

    fn shrink_width(&self, trial: Trial) -> Option<Trial> {
        if trial.width <= self.min_width {
            return None;
        }
        let width = decay_width(trial.width, self.policy.dimension_decay, self.min_width);
        Some(Trial {
            width,
            height: height_for_width(self.source_width, self.source_height, width),
            quality: trial.quality,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::Enforcement;

    fn spec(max_width: u32, min_width: u32, max_file_size: usize) -> TargetSpec {
        TargetSpec::new(max_width, min_width, max_file_size)
    }

    /// Drive a search where every attempt is over budget.
    fn run_to_exhaustion(state: &mut SearchState) -> Vec<Trial> {
        let mut trials = Vec::new();
        while let Some(trial) = state.next_trial() {
            trials.push(trial);
            if state.record(usize::MAX) == Decision::GiveUp {
                break;
            }
        }
        trials
    }

    #[test]
    fn test_initial_trial_downscales_and_caps_quality() {
        let state = SearchState::new(
            4000,
            3000,
            &spec(400, 400, 1_048_576),
            OutputFormat::Jpeg,
            SearchPolicy::default(),
        );
        assert_eq!(
            state.next_trial(),
            Some(Trial {
                width: 400,
                height: 300,
                quality: 90
            })
        );
        assert_eq!(state.phase(), SearchPhase::Initial);
    }

    #[test]
    fn test_first_success_wins() {
        let mut state = SearchState::new(
            800,
            600,
            &spec(800, 100, 1000),
            OutputFormat::Jpeg,
            SearchPolicy::default(),
        );
        assert_eq!(state.record(1000), Decision::Accept);
        assert_eq!(state.phase(), SearchPhase::Succeeded);
        assert_eq!(state.next_trial(), None);
        assert_eq!(state.attempts().len(), 1);
    }

    #[test]
    fn test_quality_first_ordering() {
        let mut state = SearchState::new(
            1000,
            500,
            &spec(1000, 500, 10),
            OutputFormat::Jpeg,
            SearchPolicy::default(),
        );
        let trials = run_to_exhaustion(&mut state);

        // 5 main attempts: quality 90 -> 80 -> 70 -> 60 -> 50, then the floor
        let qualities: Vec<u8> = trials.iter().map(|t| t.quality).collect();
        assert_eq!(qualities, vec![90, 80, 70, 60, 50, 50]);
        assert!(trials[..5].iter().all(|t| t.width == 1000));
        assert_eq!(
            trials[5],
            Trial {
                width: 500,
                height: 250,
                quality: 50
            }
        );
        assert_eq!(state.phase(), SearchPhase::Exhausted);
    }

    #[test]
    fn test_dimension_phase_follows_quality_floor() {
        let policy = SearchPolicy {
            max_attempts: 8,
            ..SearchPolicy::default()
        };
        let mut state =
            SearchState::new(1000, 500, &spec(1000, 500, 10), OutputFormat::Jpeg, policy);
        let trials = run_to_exhaustion(&mut state);

        let widths: Vec<u32> = trials.iter().map(|t| t.width).collect();
        // Quality steps to 50 first, then 1000 -> 800 -> 640 -> 512
        assert_eq!(widths, vec![1000, 1000, 1000, 1000, 1000, 800, 640, 512, 500]);
        assert!(trials[5..].iter().all(|t| t.quality == 50));
    }

    #[test]
    fn test_scale_first_ordering() {
        let policy = SearchPolicy::scale_first().with_max_attempts(6);
        let mut state =
            SearchState::new(1000, 500, &spec(1000, 500, 10), OutputFormat::Jpeg, policy);
        let trials = run_to_exhaustion(&mut state);

        assert_eq!(trials[1].width, 800);
        assert_eq!(trials[1].quality, 90);
        assert_eq!(trials[3].width, 512);
        assert_eq!(trials[4].width, 500);
        assert_eq!(trials[5].quality, 80);
    }

    #[test]
    fn test_lossless_format_skips_quality_phase() {
        let mut state = SearchState::new(
            1000,
            500,
            &spec(1000, 500, 10),
            OutputFormat::Png,
            SearchPolicy::default(),
        );
        let trials = run_to_exhaustion(&mut state);

        assert!(trials.iter().all(|t| t.quality == 90));
        assert_eq!(trials[1].width, 800);
        // 1000 -> 800 -> 640 -> 512 -> 500 and no floor retry (already tried)
        assert_eq!(trials.len(), 5);
        assert_eq!(trials.last().map(|t| t.width), Some(500));
    }

    #[test]
    fn test_nothing_to_reduce_stops_after_one_attempt() {
        // Lossless, already at min width: the initial trial is the floor
        let mut state = SearchState::new(
            400,
            300,
            &spec(400, 400, 10),
            OutputFormat::Png,
            SearchPolicy::default(),
        );
        assert_eq!(state.record(100), Decision::GiveUp);
        assert_eq!(state.attempts().len(), 1);
    }

    #[test]
    fn test_low_starting_quality_is_not_raised() {
        let mut state = SearchState::new(
            400,
            300,
            &spec(400, 400, 10).with_quality(30),
            OutputFormat::Jpeg,
            SearchPolicy::default(),
        );
        assert_eq!(state.next_trial().map(|t| t.quality), Some(30));
        assert_eq!(state.record(100), Decision::GiveUp);
        assert_eq!(state.floor_trial().quality, 30);
    }

    #[test]
    fn test_record_after_finish_is_stable() {
        let mut state = SearchState::new(
            400,
            300,
            &spec(400, 400, 1000),
            OutputFormat::Jpeg,
            SearchPolicy::default().with_enforcement(Enforcement::BestEffort),
        );
        assert_eq!(state.record(10), Decision::Accept);
        assert_eq!(state.record(usize::MAX), Decision::Accept);
        assert_eq!(state.attempts().len(), 1);
    }

    #[test]
    fn test_upscaled_source_floor_is_min_width() {
        let state = SearchState::new(
            100,
            100,
            &spec(400, 400, 10),
            OutputFormat::Jpeg,
            SearchPolicy::default(),
        );
        assert_eq!(state.floor_trial().width, 400);
        assert_eq!(state.floor_trial().height, 400);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn format_strategy() -> impl Strategy<Value = OutputFormat> {
        prop_oneof![
            Just(OutputFormat::Jpeg),
            Just(OutputFormat::Png),
            Just(OutputFormat::Webp),
        ]
    }

    fn policy_strategy() -> impl Strategy<Value = SearchPolicy> {
        (
            1u32..=10,
            prop_oneof![
                Just(SearchPolicy::quality_first()),
                Just(SearchPolicy::scale_first()),
                Just(SearchPolicy::fixed_quality()),
            ],
        )
            .prop_map(|(max_attempts, policy)| policy.with_max_attempts(max_attempts))
    }

    proptest! {
        /// Property: the search is bounded, stays in the width window, keeps
        /// the aspect ratio and never grows a trial.
        #[test]
        fn prop_search_invariants(
            src_w in 1u32..=6000,
            src_h in 1u32..=6000,
            min_width in 1u32..=2000,
            extra in 0u32..=2000,
            quality in 1u8..=100,
            format in format_strategy(),
            policy in policy_strategy(),
            sizes in prop::collection::vec(0usize..=2_000_000, 12),
            budget in 1usize..=1_000_000,
        ) {
            let spec = TargetSpec::new(min_width + extra, min_width, budget).with_quality(quality);
            let mut state = SearchState::new(src_w, src_h, &spec, format, policy);

            let mut previous: Option<Trial> = None;
            let mut steps = 0usize;
            while let Some(trial) = state.next_trial() {
                prop_assert!(trial.width >= spec.min_width && trial.width <= spec.max_width);
                let exact = src_h as f64 * trial.width as f64 / src_w as f64;
                prop_assert!((trial.height as f64 - exact).abs() <= 1.0);
                if let Some(prev) = previous {
                    prop_assert!(trial.width <= prev.width);
                    prop_assert!(trial.quality <= prev.quality);
                }
                previous = Some(trial);

                let size = sizes[steps % sizes.len()];
                steps += 1;
                prop_assert!(steps <= policy.max_attempts as usize + 1);

                match state.record(size) {
                    Decision::Accept => prop_assert!(size <= budget),
                    Decision::GiveUp => prop_assert!(size > budget),
                    Decision::Retry => {}
                }
            }
            prop_assert!(state.phase().is_terminal());
            prop_assert_eq!(state.attempts().len(), steps);
        }
    }
}
