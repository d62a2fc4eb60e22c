//! The timed earthquake drill: Idle -> Running -> Debrief -> Idle.
//!
//! [`ScenarioController`] owns every timer of a run and is advanced once per
//! frame. Shake, flicker and the phase timer are all ticked inside a single
//! [`ScenarioController::advance`] call, so ending the phase cancels the
//! periodic effects before anything is restored.

use std::time::Duration;

use bevy::prelude::*;
use rand::Rng;

use crate::config::{CameraPose, FlickerMode, RunParameters};

#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScenarioPhase {
    #[default]
    Idle,
    Running,
    Debrief,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StartOutcome {
    Started,
    /// A run is in progress; the request was dropped.
    AlreadyRunning,
}

const SURVIVED_MESSAGE: &str = "You Survived! Well Done!";
const FAILED_MESSAGE: &str = "Try Again! Get Under the Table Next Time.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebriefReport {
    pub survived: bool,
    pub message: &'static str,
}

impl DebriefReport {
    pub fn evaluate(under_table: bool) -> Self {
        if under_table {
            Self {
                survived: true,
                message: SURVIVED_MESSAGE,
            }
        } else {
            Self {
                survived: false,
                message: FAILED_MESSAGE,
            }
        }
    }
}

/// Everything the scene needs to put itself back once the shaking stops.
#[derive(Clone, Debug, PartialEq)]
pub struct RunEnd {
    pub baseline: f32,
    pub camera_reset: CameraPose,
    pub report: DebriefReport,
}

/// Output of one [`ScenarioController::advance`] call.
#[derive(Default, Debug)]
pub struct RunStep {
    /// One offset per shake tick that fired, in firing order.
    pub shakes: Vec<Vec3>,
    /// Whether the shake offsets should also move the props.
    pub shake_props: bool,
    /// New light intensity if the flicker ticked and the run is still going.
    pub intensity: Option<f32>,
    pub ended: Option<RunEnd>,
    pub debrief_closed: bool,
}

struct ActiveRun {
    params: RunParameters,
    baseline: f32,
    phase_timer: Timer,
    shake_timer: Timer,
    flicker_timer: Timer,
    dimmed: bool,
}

impl ActiveRun {
    fn new(params: RunParameters, baseline: f32) -> Self {
        Self {
            phase_timer: Timer::new(params.shake_duration, TimerMode::Once),
            shake_timer: Timer::new(params.shake_tick, TimerMode::Repeating),
            flicker_timer: Timer::new(params.flicker_tick, TimerMode::Repeating),
            params,
            baseline,
            dimmed: false,
        }
    }

    fn flicker<R: Rng + ?Sized>(&mut self, ticks: u32, rng: &mut R) -> f32 {
        match self.params.flicker_mode {
            FlickerMode::Scale { min, max } => self.baseline * rng.gen_range(min..=max),
            FlickerMode::Alternate { dim } => {
                if ticks % 2 == 1 {
                    self.dimmed = !self.dimmed;
                }
                if self.dimmed {
                    self.baseline * dim
                } else {
                    self.baseline
                }
            }
        }
    }
}

fn shake_offset<R: Rng + ?Sized>(magnitude: Vec3, rng: &mut R) -> Vec3 {
    let mut axis = |m: f32| if m > 0.0 { rng.gen_range(-m..=m) } else { 0.0 };
    Vec3::new(axis(magnitude.x), axis(magnitude.y), axis(magnitude.z))
}

#[derive(Resource, Default)]
pub struct ScenarioController {
    phase: ScenarioPhase,
    run: Option<ActiveRun>,
    debrief_timer: Option<Timer>,
    report: Option<DebriefReport>,
    runs_completed: u32,
}

impl ScenarioController {
    pub fn phase(&self) -> ScenarioPhase {
        self.phase
    }

    /// Parameters snapshotted by the run in progress.
    pub fn active_parameters(&self) -> Option<&RunParameters> {
        self.run.as_ref().map(|run| &run.params)
    }

    pub fn baseline(&self) -> Option<f32> {
        self.run.as_ref().map(|run| run.baseline)
    }

    /// Only present while the debrief is showing.
    pub fn report(&self) -> Option<&DebriefReport> {
        self.report.as_ref()
    }

    pub fn runs_completed(&self) -> u32 {
        self.runs_completed
    }

    /// Time left in the shaking phase, if running.
    pub fn remaining(&self) -> Option<Duration> {
        self.run.as_ref().map(|run| run.phase_timer.remaining())
    }

    /// Begins a run with a snapshot of `params`. Later edits to the
    /// parameters only affect the next run.
    pub fn start(&mut self, params: &RunParameters, baseline: f32) -> StartOutcome {
        if self.phase == ScenarioPhase::Running {
            return StartOutcome::AlreadyRunning;
        }
        self.run = Some(ActiveRun::new(params.clone(), baseline));
        self.debrief_timer = None;
        self.report = None;
        self.phase = ScenarioPhase::Running;
        StartOutcome::Started
    }

    pub fn advance<R: Rng + ?Sized>(&mut self, dt: Duration, rng: &mut R) -> RunStep {
        match self.phase {
            ScenarioPhase::Idle => RunStep::default(),
            ScenarioPhase::Running => self.advance_running(dt, rng),
            ScenarioPhase::Debrief => {
                let mut step = RunStep::default();
                let closed = match self.debrief_timer.as_mut() {
                    Some(timer) => timer.tick(dt).finished(),
                    None => true,
                };
                if closed {
                    self.debrief_timer = None;
                    self.report = None;
                    self.phase = ScenarioPhase::Idle;
                    step.debrief_closed = true;
                }
                step
            }
        }
    }

    fn advance_running<R: Rng + ?Sized>(&mut self, dt: Duration, rng: &mut R) -> RunStep {
        let Some(run) = self.run.as_mut() else {
            self.phase = ScenarioPhase::Idle;
            return RunStep::default();
        };

        // Nothing may tick past the end of the phase.
        let dt = dt.min(run.phase_timer.remaining());
        let mut step = RunStep {
            shake_props: run.params.shake_props,
            ..default()
        };

        run.shake_timer.tick(dt);
        for _ in 0..run.shake_timer.times_finished_this_tick() {
            step.shakes.push(shake_offset(run.params.shake_magnitude, rng));
        }

        run.flicker_timer.tick(dt);
        let flicker_ticks = run.flicker_timer.times_finished_this_tick();
        if flicker_ticks > 0 {
            step.intensity = Some(run.flicker(flicker_ticks, rng));
        }

        if run.phase_timer.tick(dt).finished() {
            step.intensity = None;
            step.ended = self.finish();
        }
        step
    }

    fn finish(&mut self) -> Option<RunEnd> {
        let run = self.run.take()?;
        // Scoring is not implemented: nothing tracks whether the user made it
        // under the table, so every drill ends in the failure debrief.
        let report = DebriefReport::evaluate(false);
        self.report = Some(report.clone());
        self.debrief_timer = Some(Timer::new(run.params.debrief_hold, TimerMode::Once));
        self.phase = ScenarioPhase::Debrief;
        self.runs_completed += 1;
        Some(RunEnd {
            baseline: run.baseline,
            camera_reset: run.params.camera_reset,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Revision;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FRAME: Duration = Duration::from_millis(10);

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn classic() -> RunParameters {
        RunParameters::from_revision(Revision::Classic)
    }

    /// Advances in fixed frames, collecting shake count and the final step.
    fn run_for(
        controller: &mut ScenarioController,
        total: Duration,
        frame: Duration,
        rng: &mut StdRng,
    ) -> (usize, Option<RunEnd>) {
        let mut shakes = 0;
        let mut ended = None;
        let mut elapsed = Duration::ZERO;
        while elapsed < total {
            let step = controller.advance(frame, rng);
            shakes += step.shakes.len();
            if step.ended.is_some() {
                ended = step.ended;
            }
            elapsed += frame;
        }
        (shakes, ended)
    }

    #[test]
    fn starts_idle() {
        let controller = ScenarioController::default();
        assert_eq!(controller.phase(), ScenarioPhase::Idle);
        assert!(controller.report().is_none());
        assert!(controller.active_parameters().is_none());
    }

    #[test]
    fn idle_advance_does_nothing() {
        let mut controller = ScenarioController::default();
        let step = controller.advance(Duration::from_secs(3), &mut rng());
        assert!(step.shakes.is_empty());
        assert!(step.intensity.is_none());
        assert!(step.ended.is_none());
        assert_eq!(controller.phase(), ScenarioPhase::Idle);
    }

    #[test]
    fn run_reaches_debrief_after_exact_duration() {
        let params = classic();
        let mut controller = ScenarioController::default();
        let mut rng = rng();
        assert_eq!(controller.start(&params, 1.0), StartOutcome::Started);
        assert_eq!(controller.phase(), ScenarioPhase::Running);

        let almost = params.shake_duration - Duration::from_millis(1);
        let step = controller.advance(almost, &mut rng);
        assert!(step.ended.is_none());
        assert_eq!(controller.phase(), ScenarioPhase::Running);

        let step = controller.advance(Duration::from_millis(1), &mut rng);
        assert!(step.ended.is_some());
        assert_eq!(controller.phase(), ScenarioPhase::Debrief);
        assert_eq!(controller.runs_completed(), 1);
    }

    #[test]
    fn eight_seconds_of_fifty_ms_ticks_shakes_160_times() {
        let params = classic();
        assert_eq!(params.shake_duration, Duration::from_millis(8000));
        assert_eq!(params.shake_tick, Duration::from_millis(50));

        let mut controller = ScenarioController::default();
        let mut rng = rng();
        controller.start(&params, 1.0);
        let (shakes, ended) = run_for(&mut controller, Duration::from_secs(12), FRAME, &mut rng);
        assert_eq!(shakes, 160);
        assert!(ended.is_some());
    }

    #[test]
    fn oversized_frame_is_clamped_to_phase_end() {
        let params = classic();
        let mut controller = ScenarioController::default();
        let mut rng = rng();
        controller.start(&params, 1.0);
        let step = controller.advance(Duration::from_secs(30), &mut rng);
        assert_eq!(step.shakes.len(), 160);
        assert!(step.ended.is_some());
    }

    #[test]
    fn start_while_running_is_ignored() {
        let params = classic();
        let window = Duration::from_secs(2);

        let mut single = ScenarioController::default();
        let mut rng_a = rng();
        single.start(&params, 1.0);
        let (expected, _) = run_for(&mut single, window, FRAME, &mut rng_a);

        let mut repeated = ScenarioController::default();
        let mut rng_b = rng();
        repeated.start(&params, 1.0);
        let mut shakes = 0;
        let mut elapsed = Duration::ZERO;
        while elapsed < window {
            assert_eq!(repeated.start(&params, 0.3), StartOutcome::AlreadyRunning);
            shakes += repeated.advance(FRAME, &mut rng_b).shakes.len();
            elapsed += FRAME;
        }

        assert_eq!(shakes, expected);
        assert_eq!(repeated.baseline(), Some(1.0));
        assert_eq!(
            repeated.remaining(),
            Some(params.shake_duration - window)
        );
    }

    #[test]
    fn run_end_restores_exact_baseline() {
        let params = classic();
        let baseline = 0.85;
        let mut controller = ScenarioController::default();
        let mut rng = rng();
        controller.start(&params, baseline);

        let mut light = baseline;
        let mut elapsed = Duration::ZERO;
        let mut flickered = false;
        while controller.phase() == ScenarioPhase::Running {
            let step = controller.advance(Duration::from_millis(16), &mut rng);
            if let Some(intensity) = step.intensity {
                flickered = true;
                light = intensity;
            }
            if let Some(end) = step.ended {
                light = end.baseline;
            }
            elapsed += Duration::from_millis(16);
            assert!(elapsed < Duration::from_secs(20), "run never ended");
        }
        assert!(flickered);
        assert_eq!(light, baseline);
    }

    #[test]
    fn scale_flicker_stays_in_range() {
        let params = classic();
        let baseline = 2.0;
        let FlickerMode::Scale { min, max } = params.flicker_mode else {
            panic!("classic preset scales the light");
        };
        let mut controller = ScenarioController::default();
        let mut rng = rng();
        controller.start(&params, baseline);
        for _ in 0..70 {
            let step = controller.advance(Duration::from_millis(100), &mut rng);
            if let Some(intensity) = step.intensity {
                assert!(intensity >= baseline * min && intensity <= baseline * max);
            }
        }
    }

    #[test]
    fn alternate_flicker_toggles_dim_and_bright() {
        let params = RunParameters::from_revision(Revision::Aftershock);
        let FlickerMode::Alternate { dim } = params.flicker_mode else {
            panic!("aftershock preset alternates the light");
        };
        let mut controller = ScenarioController::default();
        let mut rng = rng();
        controller.start(&params, 1.0);

        let seen: Vec<f32> = (0..4)
            .filter_map(|_| controller.advance(params.flicker_tick, &mut rng).intensity)
            .collect();
        assert_eq!(seen, vec![dim, 1.0, dim, 1.0]);
    }

    #[test]
    fn run_end_carries_the_snapshotted_reset_pose() {
        let mut params = RunParameters::from_revision(Revision::Walkthrough);
        params.camera_reset.position = Vec3::new(1.0, 1.2, -3.5);
        let mut controller = ScenarioController::default();
        let mut rng = rng();
        controller.start(&params, 1.0);
        params.camera_reset.position = Vec3::ZERO;

        let mut drift = Vec3::ZERO;
        let mut end = None;
        while end.is_none() {
            let step = controller.advance(Duration::from_millis(33), &mut rng);
            drift += step.shakes.iter().sum::<Vec3>();
            end = step.ended;
        }
        assert_ne!(drift, Vec3::ZERO);
        let end = end.expect("run ended");
        assert_eq!(end.camera_reset.position, Vec3::new(1.0, 1.2, -3.5));
        assert_eq!(end.camera_reset.look_at, Vec3::new(0.0, 1.6, 0.0));
    }

    #[test]
    fn shake_offsets_respect_per_axis_bounds() {
        let params = RunParameters::from_revision(Revision::Walkthrough);
        let mut controller = ScenarioController::default();
        let mut rng = rng();
        controller.start(&params, 1.0);
        let step = controller.advance(Duration::from_secs(4), &mut rng);
        assert_eq!(step.shakes.len(), 80);
        for offset in step.shakes {
            assert!(offset.x.abs() <= params.shake_magnitude.x);
            assert_eq!(offset.y, 0.0);
            assert_eq!(offset.z, 0.0);
        }
    }

    #[test]
    fn debrief_is_always_the_failure_placeholder() {
        let params = classic();
        let mut controller = ScenarioController::default();
        let mut rng = rng();
        controller.start(&params, 1.0);
        let end = controller
            .advance(params.shake_duration, &mut rng)
            .ended
            .expect("run ended");
        assert!(!end.report.survived);
        assert_eq!(end.report.message, FAILED_MESSAGE);
        assert_eq!(controller.report(), Some(&end.report));
    }

    #[test]
    fn debrief_returns_to_idle_after_hold() {
        let params = classic();
        let mut controller = ScenarioController::default();
        let mut rng = rng();
        controller.start(&params, 1.0);
        controller.advance(params.shake_duration, &mut rng);
        assert_eq!(controller.phase(), ScenarioPhase::Debrief);

        let step = controller.advance(params.debrief_hold / 2, &mut rng);
        assert!(!step.debrief_closed);
        let step = controller.advance(params.debrief_hold / 2, &mut rng);
        assert!(step.debrief_closed);
        assert_eq!(controller.phase(), ScenarioPhase::Idle);
        assert!(controller.report().is_none());
    }

    #[test]
    fn start_from_debrief_begins_a_new_run() {
        let params = classic();
        let mut controller = ScenarioController::default();
        let mut rng = rng();
        controller.start(&params, 1.0);
        controller.advance(params.shake_duration, &mut rng);
        assert_eq!(controller.phase(), ScenarioPhase::Debrief);

        assert_eq!(controller.start(&params, 1.0), StartOutcome::Started);
        assert_eq!(controller.phase(), ScenarioPhase::Running);
        assert!(controller.report().is_none());
    }

    #[test]
    fn parameter_edits_apply_to_next_run_only() {
        let mut params = classic();
        let mut controller = ScenarioController::default();
        let mut rng = rng();
        controller.start(&params, 1.0);

        params.shake_duration = Duration::from_secs(10);
        let step = controller.advance(Duration::from_secs(8), &mut rng);
        assert!(step.ended.is_some());

        controller.start(&params, 1.0);
        assert_eq!(
            controller.active_parameters().map(|p| p.shake_duration),
            Some(Duration::from_secs(10))
        );
    }

    #[test]
    fn survived_report_uses_success_message() {
        let report = DebriefReport::evaluate(true);
        assert!(report.survived);
        assert_eq!(report.message, SURVIVED_MESSAGE);
    }
}
