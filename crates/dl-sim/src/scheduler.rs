//! Bounded worker pool for simulated hours.
//!
//! Hours are submitted in chronological order to a fixed rayon pool and report
//! back over a channel. Each result lands in the slot of its hour, so output
//! order never depends on completion order. Below-horizon hours are filled
//! with zeros without touching the pool.
//!
//! The join timeout applies to each hour from the moment a worker picks it up.
//! Hours still queued behind a slow one keep waiting for a free worker. When
//! every worker is held by a timed-out hour for `STALLED_POOL_TIMEOUTS` further
//! timeouts, the queued hours are abandoned and skip their work if they start.

use crate::time_axis::SimHour;
use crate::timestep::HourOutput;
use crate::{SimError, SimResult};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Join timeouts to wait for a held pool to free a worker.
pub const STALLED_POOL_TIMEOUTS: u32 = 2;

/// Computes one hour. Implementations are shared across worker threads.
pub trait HourSimulator: Send + Sync + 'static {
    fn simulate(&self, hour: &SimHour) -> SimResult<HourOutput>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum HourStatus {
    Computed,
    BelowHorizon,
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourOutcome {
    pub hour: SimHour,
    pub status: HourStatus,
    /// `None` means the hour is zero-filled.
    pub output: Option<HourOutput>,
}

impl HourOutcome {
    fn zero_filled(hour: SimHour, status: HourStatus) -> Self {
        Self {
            hour,
            status,
            output: None,
        }
    }

    fn from_result(hour: SimHour, result: SimResult<HourOutput>) -> Self {
        match result {
            Ok(output) => Self {
                hour,
                status: HourStatus::Computed,
                output: Some(output),
            },
            Err(e) => {
                warn!(
                    hour = hour.index,
                    month = hour.month(),
                    day = hour.day(),
                    hour_ending = hour.hour(),
                    error = %e,
                    "hour failed, zero-filling"
                );
                Self::zero_filled(hour, HourStatus::Failed(e.to_string()))
            }
        }
    }
}

enum Message {
    Started { slot: usize, at: Instant },
    Finished { slot: usize, result: SimResult<HourOutput> },
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs one hour on a worker, turning a panic into an error result.
fn run_hour(simulator: &dyn HourSimulator, hour: &SimHour) -> SimResult<HourOutput> {
    panic::catch_unwind(AssertUnwindSafe(|| simulator.simulate(hour))).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        error!(hour = hour.index, panic = %message, "hour worker panicked");
        Err(SimError::WorkerPanic(message))
    })
}

/// Runs every hour and returns one outcome per hour in input order.
///
/// `progress` receives `(finished, total)` after each hour is collected.
pub fn schedule_hours(
    simulator: Arc<dyn HourSimulator>,
    hours: &[SimHour],
    workers: usize,
    join_timeout: Duration,
    progress: &mut dyn FnMut(usize, usize),
) -> SimResult<Vec<HourOutcome>> {
    let workers = workers.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("dl-hour-{i}"))
        .build()
        .map_err(|e| SimError::Configuration {
            what: format!("cannot start worker pool: {e}"),
        })?;

    let total = hours.len();
    let mut slots: Vec<Option<HourOutcome>> = vec![None; total];
    let mut finished = 0usize;
    let mut outstanding = 0usize;
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel::<Message>();

    for (slot, hour) in hours.iter().enumerate() {
        if !hour.conditions.sun_up() {
            slots[slot] = Some(HourOutcome::zero_filled(hour.clone(), HourStatus::BelowHorizon));
            finished += 1;
            continue;
        }
        let tx = tx.clone();
        let simulator = Arc::clone(&simulator);
        let cancel = Arc::clone(&cancel);
        let hour = hour.clone();
        outstanding += 1;
        pool.spawn(move || {
            if cancel.load(Ordering::SeqCst) {
                return;
            }
            let _ = tx.send(Message::Started {
                slot,
                at: Instant::now(),
            });
            let result = run_hour(simulator.as_ref(), &hour);
            let _ = tx.send(Message::Finished { slot, result });
        });
    }
    drop(tx);
    debug!(submitted = outstanding, skipped = finished, workers, "hours submitted");
    progress(finished, total);

    // Hours on a worker and not yet collected, keyed by slot.
    let mut running: HashMap<usize, Instant> = HashMap::new();
    let mut abandoned = vec![false; total];
    // Workers still busy with a timed-out hour.
    let mut held = 0usize;
    let mut stalled_since: Option<Instant> = None;
    let stall_limit = join_timeout * STALLED_POOL_TIMEOUTS;

    while outstanding > 0 {
        let now = Instant::now();
        let next_deadline = running.values().map(|&at| at + join_timeout).min();
        let stall_deadline = stalled_since.map(|since| since + stall_limit);
        let wait = [next_deadline, stall_deadline]
            .into_iter()
            .flatten()
            .min()
            .map_or(join_timeout, |wake| wake.saturating_duration_since(now));

        match rx.recv_timeout(wait) {
            Ok(Message::Started { slot, at }) => {
                running.insert(slot, at);
            }
            Ok(Message::Finished { slot, result }) => {
                if abandoned[slot] {
                    held = held.saturating_sub(1);
                    debug!(hour = hours[slot].index, "discarding result of a timed-out hour");
                } else {
                    running.remove(&slot);
                    slots[slot] = Some(HourOutcome::from_result(hours[slot].clone(), result));
                    outstanding -= 1;
                    finished += 1;
                    progress(finished, total);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let now = Instant::now();
        let expired: Vec<usize> = running
            .iter()
            .filter(|&(_, &at)| now.duration_since(at) >= join_timeout)
            .map(|(&slot, _)| slot)
            .collect();
        for slot in expired {
            running.remove(&slot);
            abandoned[slot] = true;
            held += 1;
            outstanding -= 1;
            warn!(
                hour = hours[slot].index,
                timeout_s = join_timeout.as_secs_f64(),
                "hour exceeded the join timeout, zero-filling"
            );
            slots[slot] = Some(HourOutcome::zero_filled(
                hours[slot].clone(),
                HourStatus::TimedOut,
            ));
            finished += 1;
            progress(finished, total);
        }

        if outstanding > 0 && held >= workers {
            let since = *stalled_since.get_or_insert(now);
            if now.duration_since(since) >= stall_limit {
                warn!(
                    queued = outstanding,
                    "every worker is held by a timed-out hour, abandoning queued hours"
                );
                break;
            }
        } else {
            stalled_since = None;
        }
    }
    cancel.store(true, Ordering::SeqCst);

    // Final join of anything that finished while the loop was deciding.
    while let Ok(message) = rx.try_recv() {
        if let Message::Finished { slot, result } = message {
            if !abandoned[slot] && slots[slot].is_none() {
                slots[slot] = Some(HourOutcome::from_result(hours[slot].clone(), result));
                finished += 1;
            }
        }
    }

    let outcomes: Vec<HourOutcome> = slots
        .into_iter()
        .zip(hours)
        .map(|(slot, hour)| {
            slot.unwrap_or_else(|| {
                warn!(hour = hour.index, "hour never ran, zero-filling");
                HourOutcome::zero_filled(hour.clone(), HourStatus::TimedOut)
            })
        })
        .collect();
    if finished < total {
        progress(total, total);
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dl_radiance::SkyConditions;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn hour(index: usize, altitude: f64) -> SimHour {
        SimHour {
            index,
            timestamp: NaiveDate::from_ymd_opt(2009, 3, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                + chrono::Duration::hours(index as i64 + 1),
            hour_of_year: 59 * 24 + index,
            conditions: SkyConditions {
                month: 3,
                day: 1,
                hour: index as u32 + 1,
                solar_altitude_deg: altitude,
                solar_azimuth_deg: 180.0,
                direct_normal_lux: 1000.0,
                diffuse_horizontal_lux: 1000.0,
                beam_efficacy: 100.0,
                diffuse_efficacy: 120.0,
            },
        }
    }

    /// Earlier hours sleep longer, so they finish last.
    struct Reversed {
        total: usize,
        calls: AtomicUsize,
    }

    impl HourSimulator for Reversed {
        fn simulate(&self, hour: &SimHour) -> SimResult<HourOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5 * (self.total - hour.index) as u64));
            Ok(HourOutput::SinglePhase(vec![hour.index as f64]))
        }
    }

    #[test]
    fn outcomes_follow_hour_order() {
        let hours: Vec<SimHour> = (0..8).map(|i| hour(i, 30.0)).collect();
        let sim = Arc::new(Reversed {
            total: 8,
            calls: AtomicUsize::new(0),
        });
        let mut seen = Vec::new();
        let outcomes = schedule_hours(
            sim.clone(),
            &hours,
            4,
            Duration::from_secs(10),
            &mut |done, total| seen.push((done, total)),
        )
        .unwrap();

        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.hour.index, i);
            assert_eq!(outcome.status, HourStatus::Computed);
            assert_eq!(outcome.output, Some(HourOutput::SinglePhase(vec![i as f64])));
        }
        assert_eq!(sim.calls.load(Ordering::SeqCst), 8);
        assert_eq!(seen.last(), Some(&(8, 8)));
    }

    struct Never;

    impl HourSimulator for Never {
        fn simulate(&self, _hour: &SimHour) -> SimResult<HourOutput> {
            panic!("below-horizon hours must not reach the pool");
        }
    }

    #[test]
    fn below_horizon_bypasses_pool() {
        let hours = vec![hour(0, -5.0), hour(1, -0.1)];
        let outcomes =
            schedule_hours(Arc::new(Never), &hours, 2, Duration::from_secs(1), &mut |_, _| {})
                .unwrap();
        assert!(outcomes.iter().all(|o| o.status == HourStatus::BelowHorizon));
        assert!(outcomes.iter().all(|o| o.output.is_none()));
    }

    struct FailOdd;

    impl HourSimulator for FailOdd {
        fn simulate(&self, hour: &SimHour) -> SimResult<HourOutput> {
            if hour.index % 2 == 1 {
                return Err(SimError::Configuration {
                    what: "broken".to_string(),
                });
            }
            Ok(HourOutput::SinglePhase(vec![1.0]))
        }
    }

    #[test]
    fn failed_hour_does_not_stop_others() {
        let hours: Vec<SimHour> = (0..4).map(|i| hour(i, 10.0)).collect();
        let outcomes =
            schedule_hours(Arc::new(FailOdd), &hours, 2, Duration::from_secs(5), &mut |_, _| {})
                .unwrap();
        assert_eq!(outcomes[0].status, HourStatus::Computed);
        assert!(matches!(outcomes[1].status, HourStatus::Failed(_)));
        assert!(outcomes[1].output.is_none());
        assert_eq!(outcomes[2].status, HourStatus::Computed);
    }

    /// Blocks until released so the collector times out.
    struct Stuck {
        release: Mutex<()>,
    }

    impl HourSimulator for Stuck {
        fn simulate(&self, _hour: &SimHour) -> SimResult<HourOutput> {
            let _guard = self.release.lock().unwrap();
            Ok(HourOutput::SinglePhase(vec![]))
        }
    }

    #[test]
    fn timeout_zero_fills_missing_hours() {
        let sim = Arc::new(Stuck {
            release: Mutex::new(()),
        });
        let guard = sim.release.lock().unwrap();
        let hours = vec![hour(0, 10.0), hour(1, -10.0)];
        let outcomes = schedule_hours(
            sim.clone(),
            &hours,
            1,
            Duration::from_millis(50),
            &mut |_, _| {},
        )
        .unwrap();
        drop(guard);
        assert_eq!(outcomes[0].status, HourStatus::TimedOut);
        assert!(outcomes[0].output.is_none());
        assert_eq!(outcomes[1].status, HourStatus::BelowHorizon);
    }

    /// Hour 0 runs past the timeout, later hours return at once.
    struct SlowFirst {
        delay: Duration,
    }

    impl HourSimulator for SlowFirst {
        fn simulate(&self, hour: &SimHour) -> SimResult<HourOutput> {
            if hour.index == 0 {
                std::thread::sleep(self.delay);
            }
            Ok(HourOutput::SinglePhase(vec![hour.index as f64]))
        }
    }

    #[test]
    fn only_the_slow_hour_times_out() {
        let hours: Vec<SimHour> = (0..4).map(|i| hour(i, 20.0)).collect();
        let sim = Arc::new(SlowFirst {
            delay: Duration::from_millis(200),
        });
        let mut seen = Vec::new();
        let outcomes = schedule_hours(
            sim,
            &hours,
            1,
            Duration::from_millis(100),
            &mut |done, total| seen.push((done, total)),
        )
        .unwrap();

        let statuses: Vec<HourStatus> = outcomes.iter().map(|o| o.status.clone()).collect();
        assert_eq!(
            statuses,
            vec![
                HourStatus::TimedOut,
                HourStatus::Computed,
                HourStatus::Computed,
                HourStatus::Computed,
            ]
        );
        assert!(outcomes[0].output.is_none());
        assert_eq!(outcomes[3].output, Some(HourOutput::SinglePhase(vec![3.0])));
        assert_eq!(seen.last(), Some(&(4, 4)));
    }

    /// Blocks every call until released and counts how many started.
    struct Gate {
        release: Mutex<()>,
        calls: AtomicUsize,
    }

    impl HourSimulator for Gate {
        fn simulate(&self, _hour: &SimHour) -> SimResult<HourOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _guard = self.release.lock().unwrap();
            Ok(HourOutput::SinglePhase(vec![]))
        }
    }

    #[test]
    fn held_pool_abandons_queued_hours() {
        let sim = Arc::new(Gate {
            release: Mutex::new(()),
            calls: AtomicUsize::new(0),
        });
        let guard = sim.release.lock().unwrap();
        let hours: Vec<SimHour> = (0..3).map(|i| hour(i, 20.0)).collect();
        let outcomes = schedule_hours(
            sim.clone(),
            &hours,
            1,
            Duration::from_millis(50),
            &mut |_, _| {},
        )
        .unwrap();
        assert!(outcomes.iter().all(|o| o.status == HourStatus::TimedOut));

        // Queued hours see the cancel flag once the worker frees up.
        drop(guard);
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(sim.calls.load(Ordering::SeqCst), 1);
    }

    struct PanicOnOne;

    impl HourSimulator for PanicOnOne {
        fn simulate(&self, hour: &SimHour) -> SimResult<HourOutput> {
            if hour.index == 1 {
                panic!("rtrace crashed");
            }
            Ok(HourOutput::SinglePhase(vec![1.0]))
        }
    }

    #[test]
    fn panicking_hour_is_marked_failed() {
        let hours: Vec<SimHour> = (0..3).map(|i| hour(i, 20.0)).collect();
        let outcomes = schedule_hours(
            Arc::new(PanicOnOne),
            &hours,
            2,
            Duration::from_secs(5),
            &mut |_, _| {},
        )
        .unwrap();
        assert_eq!(outcomes[0].status, HourStatus::Computed);
        match &outcomes[1].status {
            HourStatus::Failed(message) => assert!(message.contains("rtrace crashed")),
            other => panic!("expected a failed hour, got {other:?}"),
        }
        assert!(outcomes[1].output.is_none());
        assert_eq!(outcomes[2].status, HourStatus::Computed);
    }
}
