use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    pub generation: u64,
}

/// Repeating tick source feeding a single channel.
///
/// At most one source task is alive at a time. Every `start` bumps the
/// generation, so ticks already queued by a replaced source can be told
/// apart with [`TimerDriver::is_current`].
#[derive(Debug)]
pub struct TimerDriver {
    period: Duration,
    generation: u64,
    handle: Option<JoinHandle<()>>,
    sender: mpsc::UnboundedSender<TimerTick>,
}

impl TimerDriver {
    pub fn new(period: Duration) -> (Self, mpsc::UnboundedReceiver<TimerTick>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let driver = Self {
            period,
            generation: 0,
            handle: None,
            sender,
        };
        (driver, receiver)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    pub fn is_current(&self, tick: &TimerTick) -> bool {
        self.handle.is_some() && tick.generation == self.generation
    }

    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        self.stop();
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let period = self.period;
        let sender = self.sender.clone();
        self.handle = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if sender.send(TimerTick { generation }).is_err() {
                    break;
                }
            }
        }));
        tracing::debug!(generation, "timer driver started");
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!(generation = self.generation, "timer driver stopped");
        }
    }
}

impl Drop for TimerDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::{TimerDriver, TimerTick};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn drain_current(
        driver: &TimerDriver,
        receiver: &mut UnboundedReceiver<TimerTick>,
    ) -> usize {
        let mut count = 0;
        while let Ok(tick) = receiver.try_recv() {
            if driver.is_current(&tick) {
                count += 1;
            }
        }
        count
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let (mut driver, mut receiver) = TimerDriver::new(Duration::from_secs(1));
        driver.start();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(drain_current(&driver, &mut receiver), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_keeps_single_source() {
        let (mut driver, mut receiver) = TimerDriver::new(Duration::from_secs(1));
        driver.start();
        driver.start();
        assert_eq!(driver.generation(), 2);
        tokio::time::sleep(Duration::from_millis(3500)).await;

        let mut total = 0;
        while let Ok(tick) = receiver.try_recv() {
            assert!(driver.is_current(&tick));
            total += 1;
        }
        assert_eq!(total, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_ticks_and_marks_queue_stale() {
        let (mut driver, mut receiver) = TimerDriver::new(Duration::from_secs(1));
        driver.start();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        driver.stop();
        assert!(!driver.is_active());

        tokio::time::sleep(Duration::from_secs(5)).await;
        let tick = receiver.try_recv().expect("tick sent before stop");
        assert!(!driver.is_current(&tick));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_without_start_is_noop() {
        let (mut driver, _receiver) = TimerDriver::new(Duration::from_secs(1));
        driver.stop();
        assert!(!driver.is_active());
        assert_eq!(driver.generation(), 0);
    }
}
