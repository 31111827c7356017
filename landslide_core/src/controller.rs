//! The landslide controller: turns a wave description into scheduled
//! velocity changes and boundary checks, and executes them when they fire.

use landslide_env::{virtual_time, EntityId, Scheduler};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::boundary::{AtOrAbove, BoundaryOutcome, BoundaryPolicy};
use crate::error::LandslideError;
use crate::planner::MotionPlan;
use crate::registry::EntityRegistry;

/// Parameters of one landslide wave.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandslideParams {
    /// Onset time in seconds of virtual time
    pub start_time_secs: f64,

    /// Length of the motion interval in seconds
    pub duration_secs: f64,

    /// Height every affected entity is driven to
    pub target_y: f64,

    /// Height at or above which an entity is disposed at check time
    pub boundary_y: f64,
}

impl Default for LandslideParams {
    fn default() -> Self {
        Self {
            start_time_secs: 5.0,
            duration_secs: 3.0,
            target_y: 20.0,
            boundary_y: 100.0,
        }
    }
}

impl LandslideParams {
    /// Converts the wave timing to virtual-clock instants.
    ///
    /// Returns `(onset, motion interval)`. The interval is guaranteed to be
    /// non-zero, so the boundary check always fires strictly after onset,
    /// and `onset + interval` is guaranteed to fit on the clock. Non-finite
    /// heights are rejected here as well.
    pub fn window(&self) -> Result<(Duration, Duration), LandslideError> {
        if !(self.duration_secs > 0.0 && self.duration_secs.is_finite()) {
            return Err(LandslideError::InvalidDuration(self.duration_secs));
        }
        if !self.target_y.is_finite() {
            return Err(LandslideError::InvalidTarget(self.target_y));
        }
        if !self.boundary_y.is_finite() {
            return Err(LandslideError::InvalidBoundary(self.boundary_y));
        }
        let start = virtual_time(self.start_time_secs)
            .map_err(|_| LandslideError::InvalidStartTime(self.start_time_secs))?;
        let duration = virtual_time(self.duration_secs)
            .map_err(|_| LandslideError::InvalidDuration(self.duration_secs))?;
        // Shorter than the clock resolution
        if duration.is_zero() {
            return Err(LandslideError::InvalidDuration(self.duration_secs));
        }
        // The boundary check must land on the clock too
        if start.checked_add(duration).is_none() {
            return Err(LandslideError::InvalidDuration(self.duration_secs));
        }
        Ok((start, duration))
    }
}

/// The two actions a landslide installs per entity.
#[derive(Debug, Clone, PartialEq)]
pub enum LandslideAction {
    /// Onset: start moving the entity
    ApplyVelocity {
        entity: EntityId,
        velocity: Vector3<f64>,
    },

    /// End of the motion interval: check the boundary
    EvaluateBoundary { entity: EntityId, boundary_y: f64 },
}

impl LandslideAction {
    /// The single entity this action touches.
    pub fn entity(&self) -> EntityId {
        match self {
            Self::ApplyVelocity { entity, .. } | Self::EvaluateBoundary { entity, .. } => *entity,
        }
    }
}

/// What `trigger` did with each requested entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerReport {
    /// Entities that received an onset and a boundary event, in order
    pub scheduled: Vec<EntityId>,

    /// Entities left out, with the reason
    pub skipped: Vec<(EntityId, LandslideError)>,
}

/// What happened when a landslide action fired.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    VelocityApplied {
        entity: EntityId,
        velocity: Vector3<f64>,
    },
    VelocityIgnored {
        entity: EntityId,
        reason: LandslideError,
    },
    Boundary {
        entity: EntityId,
        outcome: BoundaryOutcome,
    },
    BoundaryFailed {
        entity: EntityId,
        reason: LandslideError,
    },
}

/// Schedules and executes landslide waves.
///
/// The controller is stateless apart from its boundary policy: everything a
/// wave needs travels inside the scheduled [`LandslideAction`]s.
#[derive(Debug, Clone, Default)]
pub struct LandslideController<P = AtOrAbove> {
    policy: P,
}

impl LandslideController<AtOrAbove> {
    /// Creates a controller that disposes entities at or above the boundary.
    pub fn new() -> Self {
        Self { policy: AtOrAbove }
    }
}

impl<P: BoundaryPolicy> LandslideController<P> {
    /// Creates a controller with a custom boundary policy.
    pub fn with_policy(policy: P) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Installs one landslide wave.
    ///
    /// For every entity in `entities`, in the given order, computes the
    /// velocity that brings it from its *current* position to
    /// `params.target_y`, then schedules an `ApplyVelocity` at the onset and
    /// an `EvaluateBoundary` at onset + duration. No entity is mutated here.
    ///
    /// Entities without the kinematic capability (or unknown, or already
    /// disposed) are skipped and listed in the report. Invalid parameters
    /// reject the whole call before anything is scheduled.
    pub fn trigger<R, S>(
        &self,
        registry: &R,
        scheduler: &mut S,
        entities: &[EntityId],
        params: &LandslideParams,
    ) -> Result<TriggerReport, LandslideError>
    where
        R: EntityRegistry + ?Sized,
        S: Scheduler,
        S::Action: From<LandslideAction>,
    {
        let (start_time, duration) = params.window()?;
        let now = scheduler.now();
        if start_time < now {
            return Err(LandslideError::StartInPast { start: start_time, now });
        }

        // Plan everything first so a failure leaves the queue untouched
        let mut report = TriggerReport::default();
        let mut planned = Vec::with_capacity(entities.len());
        for &id in entities {
            let entity = match registry.kinematic(id) {
                Ok(entity) if entity.is_active() => entity,
                Ok(_) => {
                    warn!("{} skipped: already disposed", id);
                    report.skipped.push((id, LandslideError::Disposed(id)));
                    continue;
                }
                Err(err) if err.is_per_entity() => {
                    warn!("{} skipped: {}", id, err);
                    report.skipped.push((id, err));
                    continue;
                }
                Err(err) => return Err(err),
            };

            let plan = MotionPlan {
                entity: id,
                start_time,
                duration,
                target_y: params.target_y,
            };
            let velocity = plan.velocity(&entity.position(now))?;
            let check_time = plan.check_time()?;
            planned.push((plan, velocity, check_time));
        }

        for (plan, velocity, check_time) in planned {
            scheduler.schedule(
                plan.start_time,
                LandslideAction::ApplyVelocity {
                    entity: plan.entity,
                    velocity,
                }
                .into(),
            )?;
            scheduler.schedule(
                check_time,
                LandslideAction::EvaluateBoundary {
                    entity: plan.entity,
                    boundary_y: params.boundary_y,
                }
                .into(),
            )?;
            debug!(
                "{} scheduled: vy={:.3} m/s from {:?}, check at {:?}",
                plan.entity,
                velocity.y,
                plan.start_time,
                check_time
            );
            report.scheduled.push(plan.entity);
        }

        info!(
            "Landslide wave installed: {} scheduled, {} skipped (onset {:?}, duration {:?})",
            report.scheduled.len(),
            report.skipped.len(),
            start_time,
            duration
        );
        Ok(report)
    }

    /// Executes a landslide action that has come due at `now`.
    ///
    /// Never fails: problems are logged and reported in the outcome.
    pub fn fire<R>(&self, registry: &mut R, now: Duration, action: &LandslideAction) -> ActionOutcome
    where
        R: EntityRegistry + ?Sized,
    {
        match *action {
            LandslideAction::ApplyVelocity { entity, velocity } => {
                let applied = registry
                    .kinematic_mut(entity)
                    .and_then(|e| e.set_velocity(now, velocity));
                match applied {
                    Ok(()) => {
                        debug!("{} velocity set to {:?}", entity, velocity);
                        ActionOutcome::VelocityApplied { entity, velocity }
                    }
                    Err(reason) => {
                        warn!("{} onset ignored: {}", entity, reason);
                        ActionOutcome::VelocityIgnored { entity, reason }
                    }
                }
            }
            LandslideAction::EvaluateBoundary { entity, boundary_y } => {
                match self.policy.evaluate(registry, entity, boundary_y, now) {
                    Ok(outcome) => ActionOutcome::Boundary { entity, outcome },
                    Err(reason) => {
                        warn!("{} boundary check failed: {}", entity, reason);
                        ActionOutcome::BoundaryFailed { entity, reason }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_support::MemoryRegistry;
    use approx::assert_relative_eq;
    use landslide_env::{EnvError, ScheduledEvent};
    use proptest::prelude::*;

    /// Sorted-vector scheduler that keeps every event inspectable.
    #[derive(Default)]
    struct RecordingScheduler {
        now: Duration,
        next_seq: u64,
        queue: Vec<ScheduledEvent<LandslideAction>>,
    }

    impl Scheduler for RecordingScheduler {
        type Action = LandslideAction;

        fn now(&self) -> Duration {
            self.now
        }

        fn schedule(&mut self, at: Duration, action: LandslideAction) -> Result<u64, EnvError> {
            if at < self.now {
                return Err(EnvError::past(at, self.now));
            }
            let seq = self.next_seq;
            self.next_seq += 1;
            self.queue.push(ScheduledEvent::new(at, seq, action));
            self.queue.sort_by_key(|e| e.key());
            Ok(seq)
        }

        fn pop_due(&mut self, until: Duration) -> Option<ScheduledEvent<LandslideAction>> {
            if self.queue.first()?.fire_time > until {
                return None;
            }
            let event = self.queue.remove(0);
            self.now = event.fire_time;
            Some(event)
        }

        fn advance_to(&mut self, until: Duration) {
            self.now = self.now.max(until);
        }

        fn pending(&self) -> usize {
            self.queue.len()
        }
    }

    fn ids(n: u32) -> Vec<EntityId> {
        (0..n).map(EntityId).collect()
    }

    fn params(target_y: f64, boundary_y: f64) -> LandslideParams {
        LandslideParams {
            start_time_secs: 5.0,
            duration_secs: 3.0,
            target_y,
            boundary_y,
        }
    }

    fn run_all(
        controller: &LandslideController,
        registry: &mut MemoryRegistry,
        clock: &mut RecordingScheduler,
        until: Duration,
    ) -> Vec<ActionOutcome> {
        let mut outcomes = Vec::new();
        clock.run(until, |_, event| {
            outcomes.push(controller.fire(&mut *registry, event.fire_time, &event.action));
        });
        outcomes
    }

    #[test]
    fn test_stacked_nodes_converge_on_target() {
        let controller = LandslideController::new();
        let mut registry = MemoryRegistry::with_heights(&[10.0, 20.0, 30.0]);
        let mut clock = RecordingScheduler::default();

        controller
            .trigger(&registry, &mut clock, &ids(3), &params(20.0, 100.0))
            .unwrap();
        let outcomes = run_all(&controller, &mut registry, &mut clock, Duration::from_secs(8));

        let vy: Vec<f64> = ids(3)
            .iter()
            .map(|id| registry.kinematic(*id).unwrap().velocity().y)
            .collect();
        assert_relative_eq!(vy[0], 10.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(vy[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(vy[2], -10.0 / 3.0, epsilon = 1e-12);

        for id in ids(3) {
            let y = registry.kinematic(id).unwrap().position(Duration::from_secs(8)).y;
            assert_relative_eq!(y, 20.0, epsilon = 1e-9);
        }

        // Boundary at 100 is never reached
        assert!(registry.released.is_empty());
        let retained = outcomes
            .iter()
            .filter(|o| {
                matches!(o, ActionOutcome::Boundary { outcome: BoundaryOutcome::Retained { .. }, .. })
            })
            .count();
        assert_eq!(retained, 3);
    }

    #[test]
    fn test_trigger_does_not_mutate() {
        let controller = LandslideController::new();
        let registry = MemoryRegistry::with_heights(&[10.0, 30.0]);
        let mut clock = RecordingScheduler::default();

        controller
            .trigger(&registry, &mut clock, &ids(2), &params(20.0, 100.0))
            .unwrap();

        for id in ids(2) {
            assert_eq!(registry.kinematic(id).unwrap().velocity(), Vector3::zeros());
        }
        assert_eq!(clock.pending(), 4);
    }

    #[test]
    fn test_events_per_entity() {
        let controller = LandslideController::new();
        let registry = MemoryRegistry::with_heights(&[10.0, 30.0]);
        let mut clock = RecordingScheduler::default();

        controller
            .trigger(&registry, &mut clock, &ids(2), &params(20.0, 100.0))
            .unwrap();

        for id in ids(2) {
            let mine: Vec<_> = clock.queue.iter().filter(|e| e.action.entity() == id).collect();
            assert_eq!(mine.len(), 2);
            assert!(matches!(mine[0].action, LandslideAction::ApplyVelocity { .. }));
            assert_eq!(mine[0].fire_time, Duration::from_secs(5));
            assert!(matches!(
                mine[1].action,
                LandslideAction::EvaluateBoundary { boundary_y, .. } if boundary_y == 100.0
            ));
            assert_eq!(mine[1].fire_time, Duration::from_secs(8));
        }
    }

    #[test]
    fn test_onsets_follow_caller_order() {
        let controller = LandslideController::new();
        let registry = MemoryRegistry::with_heights(&[10.0, 20.0, 30.0]);
        let mut clock = RecordingScheduler::default();
        let order = vec![EntityId(2), EntityId(0), EntityId(1)];

        controller
            .trigger(&registry, &mut clock, &order, &params(20.0, 100.0))
            .unwrap();

        let onsets: Vec<EntityId> = clock
            .queue
            .iter()
            .filter(|e| e.fire_time == Duration::from_secs(5))
            .map(|e| e.action.entity())
            .collect();
        assert_eq!(onsets, order);
    }

    #[test]
    fn test_missing_capability_is_isolated() {
        let controller = LandslideController::new();
        let mut registry = MemoryRegistry::with_heights(&[10.0, 30.0]);
        registry.add_static(EntityId(5));
        let mut clock = RecordingScheduler::default();
        let requested = vec![EntityId(0), EntityId(5), EntityId(9), EntityId(1)];

        let report = controller
            .trigger(&registry, &mut clock, &requested, &params(20.0, 100.0))
            .unwrap();

        assert_eq!(report.scheduled, vec![EntityId(0), EntityId(1)]);
        assert_eq!(
            report.skipped,
            vec![
                (EntityId(5), LandslideError::MissingCapability(EntityId(5))),
                (EntityId(9), LandslideError::UnknownEntity(EntityId(9))),
            ]
        );
        assert_eq!(clock.pending(), 4);

        run_all(&controller, &mut registry, &mut clock, Duration::from_secs(8));
        for id in ids(2) {
            let y = registry.kinematic(id).unwrap().position(Duration::from_secs(8)).y;
            assert_relative_eq!(y, 20.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_invalid_duration_schedules_nothing() {
        let controller = LandslideController::new();
        let registry = MemoryRegistry::with_heights(&[10.0]);
        let mut clock = RecordingScheduler::default();

        for bad in [0.0, -3.0, f64::NAN, 1e-12] {
            let wave = LandslideParams {
                duration_secs: bad,
                ..params(20.0, 100.0)
            };
            let err = controller.trigger(&registry, &mut clock, &ids(1), &wave).unwrap_err();
            assert!(matches!(err, LandslideError::InvalidDuration(_)));
        }
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_check_time_past_clock_end_schedules_nothing() {
        let controller = LandslideController::new();
        let registry = MemoryRegistry::with_heights(&[10.0, 30.0]);
        let mut clock = RecordingScheduler::default();
        let wave = LandslideParams {
            start_time_secs: 1.8e19,
            duration_secs: 1.0e18,
            ..params(20.0, 100.0)
        };

        assert!(matches!(wave.window(), Err(LandslideError::InvalidDuration(_))));
        let err = controller.trigger(&registry, &mut clock, &ids(2), &wave).unwrap_err();

        assert!(matches!(err, LandslideError::InvalidDuration(_)));
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_non_finite_heights_are_rejected() {
        let controller = LandslideController::new();
        let registry = MemoryRegistry::with_heights(&[10.0]);
        let mut clock = RecordingScheduler::default();

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = controller
                .trigger(&registry, &mut clock, &ids(1), &params(bad, 100.0))
                .unwrap_err();
            assert!(matches!(err, LandslideError::InvalidTarget(_)));

            let err = controller
                .trigger(&registry, &mut clock, &ids(1), &params(20.0, bad))
                .unwrap_err();
            assert!(matches!(err, LandslideError::InvalidBoundary(_)));
        }
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_start_in_past_is_rejected() {
        let controller = LandslideController::new();
        let registry = MemoryRegistry::with_heights(&[10.0]);
        let mut clock = RecordingScheduler::default();
        clock.advance_to(Duration::from_secs(6));

        let err = controller
            .trigger(&registry, &mut clock, &ids(1), &params(20.0, 100.0))
            .unwrap_err();

        assert!(matches!(err, LandslideError::StartInPast { .. }));
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_waves_stack_without_overwriting() {
        let controller = LandslideController::new();
        let mut registry = MemoryRegistry::with_heights(&[10.0]);
        let mut clock = RecordingScheduler::default();

        controller
            .trigger(&registry, &mut clock, &ids(1), &params(20.0, 100.0))
            .unwrap();
        let second = LandslideParams {
            start_time_secs: 9.0,
            duration_secs: 2.0,
            target_y: 120.0,
            boundary_y: 100.0,
        };
        // Planned from the current position (y=10), not from where wave one ends
        controller.trigger(&registry, &mut clock, &ids(1), &second).unwrap();
        assert_eq!(clock.pending(), 4);

        run_all(&controller, &mut registry, &mut clock, Duration::from_secs(12));

        let entity = registry.kinematic(EntityId(0)).unwrap();
        assert!(!entity.is_active());
        // Wave one keeps drifting at 10/3 m/s until t=9 (y = 10 + 40/3), then
        // wave two adds 55 m/s for 2 s; frozen at disposal time t=11
        assert_relative_eq!(entity.position(Duration::from_secs(12)).y, 400.0 / 3.0, epsilon = 1e-9);
        assert_eq!(registry.released, vec![EntityId(0)]);
    }

    #[test]
    fn test_onset_after_disposal_is_ignored() {
        let controller = LandslideController::new();
        let mut registry = MemoryRegistry::with_heights(&[10.0]);
        registry.dispose(EntityId(0), Duration::ZERO).unwrap();

        let outcome = controller.fire(
            &mut registry,
            Duration::from_secs(5),
            &LandslideAction::ApplyVelocity {
                entity: EntityId(0),
                velocity: Vector3::new(0.0, 1.0, 0.0),
            },
        );

        assert_eq!(
            outcome,
            ActionOutcome::VelocityIgnored {
                entity: EntityId(0),
                reason: LandslideError::Disposed(EntityId(0)),
            }
        );
    }

    #[test]
    fn test_disposed_entity_is_skipped_at_trigger() {
        let controller = LandslideController::new();
        let mut registry = MemoryRegistry::with_heights(&[10.0, 20.0]);
        registry.dispose(EntityId(1), Duration::ZERO).unwrap();
        let mut clock = RecordingScheduler::default();

        let report = controller
            .trigger(&registry, &mut clock, &ids(2), &params(20.0, 100.0))
            .unwrap();

        assert_eq!(report.scheduled, vec![EntityId(0)]);
        assert_eq!(report.skipped, vec![(EntityId(1), LandslideError::Disposed(EntityId(1)))]);
    }

    proptest! {
        #[test]
        fn prop_position_projection(
            heights in proptest::collection::vec(-200.0f64..200.0, 1..8),
            target in -200.0f64..200.0,
            duration in 0.01f64..60.0,
        ) {
            let controller = LandslideController::new();
            let mut registry = MemoryRegistry::with_heights(&heights);
            let mut clock = RecordingScheduler::default();
            let wave = LandslideParams {
                start_time_secs: 1.0,
                duration_secs: duration,
                target_y: target,
                boundary_y: f64::MAX,
            };

            let (start, interval) = wave.window().unwrap();
            let check = start + interval;
            controller.trigger(&registry, &mut clock, &ids(heights.len() as u32), &wave).unwrap();
            run_all(&controller, &mut registry, &mut clock, check);

            for id in ids(heights.len() as u32) {
                let y = registry.kinematic(id).unwrap().position(check).y;
                prop_assert!((y - target).abs() < 1e-6);
            }
        }
    }
}
