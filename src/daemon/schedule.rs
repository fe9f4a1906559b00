use std::{future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, FixedOffset, NaiveTime, TimeDelta};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::utils::{clock::Clock, time::TimezonePolicy};

/// Runs later than this many minutes after their trigger are reported as late.
pub const LATE_THRESHOLD_MINUTES: i64 = 5;

/// Longest single sleep. Wall time is re-read after each slice so a suspended machine notices the
/// missed trigger soon after it wakes.
pub const MAX_SLEEP_SLICE: Duration = Duration::from_secs(60);

/// First occurrence of `time` in `zone` strictly after `after`.
pub fn next_trigger(
    after: DateTime<FixedOffset>,
    time: NaiveTime,
    zone: &TimezonePolicy,
) -> Option<DateTime<FixedOffset>> {
    let mut date = zone.localize(after.to_utc()).date_naive();
    for _ in 0..3 {
        if let Some(trigger) = zone.resolve(date.and_time(time)) {
            if trigger > after {
                return Some(trigger);
            }
        }
        date = date.succ_opt()?;
    }
    None
}

/// Today's trigger if it has already passed, which means the daily pass is owed right away.
fn missed_today(
    now: DateTime<FixedOffset>,
    time: NaiveTime,
    zone: &TimezonePolicy,
) -> Option<DateTime<FixedOffset>> {
    zone.resolve(now.date_naive().and_time(time))
        .filter(|trigger| *trigger <= now)
}

/// Daily trigger driven by an injected [Clock].
pub struct Scheduler {
    time: NaiveTime,
    zone: TimezonePolicy,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    slice: Duration,
}

impl Scheduler {
    pub fn new(
        time: NaiveTime,
        zone: TimezonePolicy,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            time,
            zone,
            clock,
            shutdown,
            slice: MAX_SLEEP_SLICE,
        }
    }

    fn now(&self) -> DateTime<FixedOffset> {
        self.clock.local_time(&self.zone)
    }

    /// Calls `job` once per day at the configured time until cancelled. Any number of triggers
    /// missed while the machine slept result in a single call.
    pub async fn run<F, Fut>(&self, mut job: F)
    where
        F: FnMut(DateTime<FixedOffset>) -> Fut,
        Fut: Future<Output = ()>,
    {
        let now = self.now();
        if let Some(missed) = missed_today(now, self.time, &self.zone) {
            info!("Today's run at {missed} was missed, running now");
            job(now).await;
        }

        let Some(mut next) = next_trigger(self.now(), self.time, &self.zone) else {
            warn!("Can't compute the next trigger, stopping");
            return;
        };
        info!("Next run at {next}");

        loop {
            let now = self.now();
            if now >= next {
                let lateness = now - next;
                if lateness > TimeDelta::minutes(LATE_THRESHOLD_MINUTES) {
                    warn!(
                        "Running {} minutes late, the trigger was {next}",
                        lateness.num_minutes()
                    );
                }
                job(now).await;
                let Some(following) = next_trigger(self.now(), self.time, &self.zone) else {
                    warn!("Can't compute the next trigger, stopping");
                    return;
                };
                next = following;
                info!("Next run at {next}");
                continue;
            }

            let remaining = (next - now).to_std().unwrap_or_default().min(self.slice);
            debug!(?remaining, "Sleeping");
            select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Scheduler stopped");
                    return;
                }
                _ = self.clock.sleep(remaining) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use async_trait::async_trait;
    use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Utc};
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    use super::{next_trigger, Scheduler};
    use crate::utils::{clock::Clock, time::TimezonePolicy};

    /// Time only moves when someone sleeps. `jump` adds extra time on the given sleep call to
    /// imitate a suspended machine.
    struct SteppingClock {
        time: Mutex<DateTime<Utc>>,
        sleeps: Mutex<u32>,
        jump: Option<(u32, chrono::TimeDelta)>,
    }

    impl SteppingClock {
        fn new(time: DateTime<Utc>, jump: Option<(u32, chrono::TimeDelta)>) -> Self {
            Self {
                time: Mutex::new(time),
                sleeps: Mutex::new(0),
                jump,
            }
        }
    }

    #[async_trait]
    impl Clock for SteppingClock {
        fn time(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap()
        }

        async fn sleep(&self, duration: Duration) {
            let mut sleeps = self.sleeps.lock().unwrap();
            *sleeps += 1;
            let mut time = self.time.lock().unwrap();
            *time += chrono::TimeDelta::from_std(duration).unwrap();
            if let Some((at, extra)) = self.jump {
                if *sleeps == at {
                    *time += extra;
                }
            }
        }
    }

    fn utc() -> TimezonePolicy {
        TimezonePolicy::parse(Some("UTC")).unwrap()
    }

    fn eight() -> NaiveTime {
        NaiveTime::from_hms_opt(8, 0, 0).unwrap()
    }

    fn time(value: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(value).unwrap()
    }

    /// Runs the scheduler until `runs` jobs happened and returns their times.
    async fn collect_runs(clock: Arc<SteppingClock>, runs: usize) -> Vec<DateTime<FixedOffset>> {
        let token = CancellationToken::new();
        let scheduler = Scheduler::new(eight(), utc(), clock, token.clone());
        let mut seen = vec![];
        scheduler
            .run(|now| {
                seen.push(now);
                if seen.len() >= runs {
                    token.cancel();
                }
                async {}
            })
            .await;
        seen
    }

    #[test]
    fn next_trigger_is_strictly_after() {
        assert_eq!(
            next_trigger(time("2025-03-10T07:00:00+00:00"), eight(), &utc()),
            Some(time("2025-03-10T08:00:00+00:00"))
        );
        assert_eq!(
            next_trigger(time("2025-03-10T08:00:00+00:00"), eight(), &utc()),
            Some(time("2025-03-11T08:00:00+00:00"))
        );
    }

    #[test]
    fn next_trigger_respects_zone_and_dst() {
        let kyiv = TimezonePolicy::parse(Some("Europe/Kyiv")).unwrap();
        let trigger = next_trigger(time("2025-03-10T07:00:00+00:00"), eight(), &kyiv).unwrap();
        assert_eq!(trigger, time("2025-03-11T08:00:00+02:00"));

        // 03:00 doesn't exist in Kyiv on 2025-03-30.
        let three = NaiveTime::from_hms_opt(3, 0, 0).unwrap();
        let trigger = next_trigger(time("2025-03-29T23:00:00+00:00"), three, &kyiv).unwrap();
        assert_eq!(trigger, time("2025-03-30T04:00:00+03:00"));
    }

    #[tokio::test]
    async fn runs_daily_at_trigger_time() {
        let clock = Arc::new(SteppingClock::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 7, 0, 0).unwrap(),
            None,
        ));
        let runs = collect_runs(clock, 2).await;
        assert_eq!(
            runs,
            vec![time("2025-03-10T08:00:00+00:00"), time("2025-03-11T08:00:00+00:00")]
        );
    }

    #[tokio::test]
    async fn catches_up_at_startup_when_trigger_passed() {
        let clock = Arc::new(SteppingClock::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap(),
            None,
        ));
        let runs = collect_runs(clock, 2).await;
        assert_eq!(
            runs,
            vec![time("2025-03-10T09:30:00+00:00"), time("2025-03-11T08:00:00+00:00")]
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn missed_days_during_suspend_coalesce_into_one_late_run() {
        // Three days pass during the first sleep.
        let clock = Arc::new(SteppingClock::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 7, 0, 0).unwrap(),
            Some((1, chrono::TimeDelta::days(3))),
        ));
        let runs = collect_runs(clock, 2).await;
        assert_eq!(
            runs,
            vec![time("2025-03-13T07:01:00+00:00"), time("2025-03-13T08:00:00+00:00")]
        );
        assert!(logs_contain("late"));
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop() {
        let clock = Arc::new(SteppingClock::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 7, 0, 0).unwrap(),
            None,
        ));
        let token = CancellationToken::new();
        token.cancel();
        let scheduler = Scheduler::new(eight(), utc(), clock, token);
        let mut calls = 0;
        scheduler
            .run(|_| {
                calls += 1;
                async {}
            })
            .await;
        assert_eq!(calls, 0);
    }
}
