//! Flush stepper: advances the live fragment set one tick at a time.
//!
//! Each tick every fragment rotates about the center by the configured
//! increment, contracts by its spiral's scale, then is pulled a fraction of
//! the way toward its spiral's next point. Fragments that reach the drain or
//! leave the rim are absorbed and never come back.

use log::{debug, info};
use rayon::prelude::*;

use super::canvas::{Canvas, Disc, OPAQUE_BLACK};
use super::fragment::{Fragment, decompose};
use super::geometry::{Bowl, converge, rotate_scale};
use super::rng::FlushRng;
use super::spiral::SpiralSet;
use crate::animation::Frame;
use crate::error::{FlushError, Result};
use crate::schema::{FlushConfig, RechargeMode};

/// Where a flush cycle stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPhase {
    /// Fragments remain in the bowl.
    Active,
    /// Every fragment has been absorbed.
    Drained,
}

/// Simulation state and driver for one flush cycle.
pub struct FlushStepper {
    config: FlushConfig,
    bowl: Bowl,
    rim: Disc,
    hole: Disc,
    spirals: SpiralSet,
    fragments: Vec<Fragment>,
    source: Canvas,
    canvas: Canvas,
    tick: u64,
    phase: FlushPhase,
}

impl FlushStepper {
    /// Validate `config`, trace its spirals and break `source` into fragments.
    ///
    /// Spirals are drawn from `config.random_seed`, or from entropy when no
    /// seed is set.
    pub fn new(config: FlushConfig, source: Canvas) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.random_seed {
            Some(seed) => FlushRng::new(seed),
            None => FlushRng::random(),
        };
        let spirals = SpiralSet::build(&config, &mut rng);
        Self::with_spirals(config, source, spirals)
    }

    /// Like [`FlushStepper::new`] but with caller-supplied spirals.
    pub fn with_spirals(config: FlushConfig, source: Canvas, spirals: SpiralSet) -> Result<Self> {
        config.validate()?;
        if source.size() != config.size {
            return Err(FlushError::FrameSize {
                expected: config.frame_len(),
                actual: source.pixels().len(),
            });
        }

        let bowl = Bowl::from_config(&config);
        let fragments = decompose(&source, &config, &spirals);
        let phase = if fragments.is_empty() {
            FlushPhase::Drained
        } else {
            FlushPhase::Active
        };
        info!(
            "Flush ready: {}x{} canvas, {} spirals, {} fragments",
            config.size,
            config.size,
            spirals.len(),
            fragments.len()
        );

        Ok(Self {
            rim: Disc::rim(&bowl),
            hole: Disc::hole(&bowl),
            canvas: source.clone(),
            config,
            bowl,
            spirals,
            fragments,
            source,
            tick: 0,
            phase,
        })
    }

    /// The undisturbed source image, shown before the flush starts.
    pub fn initial_frame(&self) -> Frame {
        Frame::new(self.source.pixels().to_vec(), self.config.flush_millis)
    }

    /// Move every live fragment one tick and render the result.
    ///
    /// Returns `None` once drained. The tick that absorbs the last fragment
    /// still produces its frame.
    pub fn advance_tick(&mut self) -> Option<Frame> {
        if self.phase == FlushPhase::Drained {
            return None;
        }

        let before = self.fragments.len();
        let bowl = self.bowl;
        let spirals = &self.spirals;
        let rotation = self.config.rotation_increment as f64;
        let pull = self.config.spiral_converge;
        self.fragments = std::mem::take(&mut self.fragments)
            .into_par_iter()
            .filter_map(|f| step_fragment(f, &bowl, spirals, rotation, pull))
            .collect();

        self.tick += 1;
        self.canvas = self.composite();
        if self.fragments.is_empty() {
            self.phase = FlushPhase::Drained;
            info!("Drained after {} ticks", self.tick);
        }
        debug!(
            "Tick {}: {} live, {} absorbed",
            self.tick,
            self.fragments.len(),
            before - self.fragments.len()
        );

        Some(Frame::new(
            self.canvas.pixels().to_vec(),
            self.config.flush_millis,
        ))
    }

    /// Final frame of the cycle, held for the recharge delay.
    pub fn recharge_frame(&self) -> Frame {
        let pixels = match self.config.recharge {
            RechargeMode::Blank => self.empty_bowl().into_pixels(),
            RechargeMode::Restore => self.source.pixels().to_vec(),
        };
        Frame::new(pixels, self.config.recharge_millis)
    }

    /// Background, then fragments grouped by spiral, then the drain on top.
    fn composite(&self) -> Canvas {
        let side = self.config.fragment_size;
        let mut canvas = Canvas::bowl(self.config.size, &self.rim);

        let mut order: Vec<&Fragment> = self.fragments.iter().collect();
        order.sort_by_key(|f| f.spiral);
        for fragment in order {
            canvas.draw_round_tile(&fragment.image, side, fragment.corner(side), &self.rim);
        }

        canvas.fill_disc(&self.hole, OPAQUE_BLACK);
        canvas
    }

    fn empty_bowl(&self) -> Canvas {
        let mut canvas = Canvas::bowl(self.config.size, &self.rim);
        canvas.fill_disc(&self.hole, OPAQUE_BLACK);
        canvas
    }

    pub fn phase(&self) -> FlushPhase {
        self.phase
    }

    /// Ticks advanced so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn live_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn spirals(&self) -> &SpiralSet {
        &self.spirals
    }

    pub fn bowl(&self) -> &Bowl {
        &self.bowl
    }

    /// Most recently rendered canvas.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn config(&self) -> &FlushConfig {
        &self.config
    }
}

/// One tick for one fragment; `None` when it is absorbed.
fn step_fragment(
    mut fragment: Fragment,
    bowl: &Bowl,
    spirals: &SpiralSet,
    rotation: f64,
    pull: f64,
) -> Option<Fragment> {
    let spiral = spirals.get(fragment.spiral)?;
    let mut next = rotate_scale(fragment.location, bowl.center, rotation, spiral.scale());
    fragment.path_index += 1;
    if let Some(target) = spiral.point(fragment.path_index) {
        next = converge(next, target, pull);
    }
    if !bowl.in_play(next) {
        return None;
    }
    fragment.location = next;
    Some(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::canvas::OPAQUE_WHITE;
    use crate::compute::geometry::Point;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn scenario_a() -> FlushConfig {
        FlushConfig {
            size: 40,
            hole_size: 4,
            fragment_size: 4,
            num_spiral: 1,
            rotation_increment: 90,
            min_spiral: 0.5,
            max_spiral: 0.5,
            spiral_converge: 0.0,
            random_seed: Some(1),
            ..FlushConfig::for_size(40)
        }
    }

    /// Opaque gradient so fragments are distinguishable.
    fn gradient(size: u32) -> Canvas {
        let pixels = (0..size * size)
            .map(|i| 0xFF00_0000 | (i.wrapping_mul(2654435761) >> 8))
            .collect();
        Canvas::from_pixels(size, pixels).unwrap()
    }

    fn run_to_drain(stepper: &mut FlushStepper, limit: u64) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = stepper.advance_tick() {
            frames.push(frame);
            assert!(stepper.tick() <= limit, "did not drain within {} ticks", limit);
        }
        frames
    }

    #[test]
    fn test_scenario_a_drains_quickly() {
        let config = scenario_a();
        let mut stepper = FlushStepper::new(config, gradient(40)).unwrap();
        assert_eq!(stepper.spirals().len(), 1);
        assert!(stepper.spirals().get(0).unwrap().len() >= 2);
        assert_eq!(stepper.phase(), FlushPhase::Active);

        let frames = run_to_drain(&mut stepper, 20);
        assert!(!frames.is_empty());
        assert_eq!(stepper.phase(), FlushPhase::Drained);
        assert_eq!(stepper.live_count(), 0);
        assert!(stepper.advance_tick().is_none());
        assert_eq!(frames.len() as u64, stepper.tick());
    }

    #[test]
    fn test_fragments_move_inward() {
        let mut stepper = FlushStepper::new(scenario_a(), gradient(40)).unwrap();
        let center = stepper.bowl().center;
        loop {
            let before: Vec<(usize, f64)> = stepper
                .fragments()
                .iter()
                .map(|f| (f.id, f.location.distance(center)))
                .collect();
            if stepper.advance_tick().is_none() {
                break;
            }
            for f in stepper.fragments() {
                let (_, prev) = before.iter().find(|(id, _)| *id == f.id).unwrap();
                assert!(f.location.distance(center) < *prev);
            }
        }
    }

    #[test]
    fn test_initial_frame_is_source() {
        let source = gradient(40);
        let stepper = FlushStepper::new(scenario_a(), source.clone()).unwrap();
        let frame = stepper.initial_frame();
        assert_eq!(frame.pixels, source.pixels());
        assert_eq!(frame.show_millis, 100);
    }

    #[test]
    fn test_recharge_modes() {
        let source = gradient(40);
        let blank = FlushStepper::new(scenario_a(), source.clone()).unwrap();
        let frame = blank.recharge_frame();
        assert_eq!(frame.show_millis, 3000);
        // Center pixel is the drain, a rim-adjacent inside pixel is white.
        assert_eq!(frame.pixels[20 * 40 + 20], OPAQUE_BLACK);
        assert_eq!(frame.pixels[20 * 40 + 1], OPAQUE_WHITE);
        assert_eq!(frame.pixels[0], OPAQUE_BLACK);

        let config = FlushConfig {
            recharge: RechargeMode::Restore,
            ..scenario_a()
        };
        let restore = FlushStepper::new(config, source.clone()).unwrap();
        assert_eq!(restore.recharge_frame().pixels, source.pixels());
    }

    #[test]
    fn test_drained_canvas_is_empty_bowl() {
        let mut stepper = FlushStepper::new(scenario_a(), gradient(40)).unwrap();
        let frames = run_to_drain(&mut stepper, 20);
        let last = frames.last().unwrap();
        assert_eq!(last.pixels, stepper.recharge_frame().pixels);
    }

    #[test]
    fn test_hole_drawn_over_fragments() {
        let mut stepper = FlushStepper::new(scenario_a(), gradient(40)).unwrap();
        let hole = Disc::hole(stepper.bowl());
        let frame = stepper.advance_tick().unwrap();
        for y in 0..40 {
            for x in 0..40 {
                if hole.covers(x, y) {
                    assert_eq!(frame.pixels[(y * 40 + x) as usize], OPAQUE_BLACK);
                }
            }
        }
    }

    #[test]
    fn test_mismatched_source_rejected() {
        let result = FlushStepper::new(scenario_a(), gradient(32));
        assert!(matches!(result, Err(FlushError::FrameSize { .. })));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = FlushConfig {
            fragment_size: 500,
            num_spiral: 5,
            ..FlushConfig::for_size(100)
        };
        let result = FlushStepper::new(config, gradient(100));
        assert!(matches!(result, Err(FlushError::Config(_))));
    }

    #[test]
    fn test_overlong_duration_rejected_before_generation() {
        let config = FlushConfig {
            flush_millis: 3_000_000_000,
            ..FlushConfig::for_size(48)
        };
        let result = FlushStepper::new(config, gradient(48));
        assert!(matches!(result, Err(FlushError::Config(_))));
    }

    #[test]
    fn test_no_spirals_starts_drained() {
        let config = scenario_a();
        let mut stepper =
            FlushStepper::with_spirals(config, gradient(40), SpiralSet::from_paths(vec![]))
                .unwrap();
        assert_eq!(stepper.phase(), FlushPhase::Drained);
        assert_eq!(stepper.live_count(), 0);
        assert!(stepper.advance_tick().is_none());
    }

    #[test]
    fn test_same_seed_same_frames() {
        let config = FlushConfig {
            random_seed: Some(7),
            ..FlushConfig::for_size(64)
        };
        let mut a = FlushStepper::new(config.clone(), gradient(64)).unwrap();
        let mut b = FlushStepper::new(config, gradient(64)).unwrap();
        loop {
            let fa = a.advance_tick();
            let fb = b.advance_tick();
            assert_eq!(fa, fb);
            if fa.is_none() {
                break;
            }
        }
    }

    fn small_config() -> impl Strategy<Value = FlushConfig> {
        (
            24u32..72,
            2u32..6,
            1usize..5,
            0u32..=360,
            10u32..=90,
            0u32..=40,
            0.0f64..=1.0,
            any::<u64>(),
        )
            .prop_map(|(size, fragment, spirals, rotation, max, spread, pull, seed)| {
                let max_spiral = max as f64 / 100.0;
                let min_spiral = max.saturating_sub(spread) as f64 / 100.0;
                FlushConfig {
                    fragment_size: fragment,
                    hole_size: (size / 5).max(4),
                    num_spiral: spirals,
                    rotation_increment: rotation,
                    min_spiral,
                    max_spiral,
                    spiral_converge: pull,
                    random_seed: Some(seed),
                    ..FlushConfig::for_size(size)
                }
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_live_fragments_stay_in_play(config in small_config()) {
            let size = config.size;
            let mut stepper = FlushStepper::new(config, gradient(size)).unwrap();
            let bowl = *stepper.bowl();
            let mut absorbed: HashSet<usize> = HashSet::new();
            let mut previous: HashSet<usize> =
                stepper.fragments().iter().map(|f| f.id).collect();

            while stepper.advance_tick().is_some() {
                let live: HashSet<usize> = stepper.fragments().iter().map(|f| f.id).collect();
                for f in stepper.fragments() {
                    prop_assert!(bowl.in_play(f.location));
                    prop_assert!(!absorbed.contains(&f.id));
                }
                prop_assert!(live.is_subset(&previous));
                absorbed.extend(previous.difference(&live));
                previous = live;
                prop_assert!(stepper.tick() <= (size as u64) * 64);
            }
            prop_assert_eq!(stepper.phase(), FlushPhase::Drained);
        }

        #[test]
        fn prop_seeded_runs_match(config in small_config()) {
            let size = config.size;
            let mut a = FlushStepper::new(config.clone(), gradient(size)).unwrap();
            let mut b = FlushStepper::new(config, gradient(size)).unwrap();
            let locations = |s: &FlushStepper| -> Vec<Point> {
                s.fragments().iter().map(|f| f.location).collect()
            };
            prop_assert_eq!(locations(&a), locations(&b));
            while let Some(frame) = a.advance_tick() {
                prop_assert_eq!(Some(frame), b.advance_tick());
                prop_assert_eq!(locations(&a), locations(&b));
            }
            prop_assert!(b.advance_tick().is_none());
        }
    }
}
