//! Background acquisition loop: wait, read, decode, deliver.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{SendTimeoutError, Sender};

use crate::error::Error;
use crate::event::{self, EventBatch, INPUT_EVENT_SIZE};
use crate::sys::EventSource;

pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_ERROR_TIMEOUT: Duration = Duration::from_millis(100);
pub const DEFAULT_RECORDS_PER_READ: usize = 64;
pub const DEFAULT_QUEUE_CAPACITY: usize = 1;

/// Tunables of the acquisition thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionSettings {
    /// Upper bound of one readiness wait, and of one blocked enqueue before
    /// the stop flag is looked at again.
    pub poll_timeout: Duration,
    /// How long a fatal error may wait for room on the error channel.
    pub error_timeout: Duration,
    /// Records fetched by one read.
    pub records_per_read: usize,
    /// Batches the event channel holds before the reader blocks.
    pub queue_capacity: usize,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            error_timeout: DEFAULT_ERROR_TIMEOUT,
            records_per_read: DEFAULT_RECORDS_PER_READ,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Why the loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The stop flag was set.
    Requested,
    /// The event receiver was dropped.
    Disconnected,
    /// A fatal read error was published on the error channel.
    Failed,
}

/// State moved into the acquisition thread.
pub struct Worker<S: ?Sized> {
    pub label: String,
    pub events: Sender<EventBatch>,
    pub errors: Sender<Error>,
    pub stop: Arc<AtomicBool>,
    pub settings: AcquisitionSettings,
    pub source: Arc<S>,
}

impl<S: EventSource + ?Sized> Worker<S> {
    pub fn run(self) -> StopReason {
        log::info!("[{}] acquisition started", self.label);
        let reason = self.acquire();
        log::info!("[{}] acquisition stopped ({:?})", self.label, reason);
        reason
    }

    fn acquire(&self) -> StopReason {
        let mut buf = vec![0u8; self.settings.records_per_read.max(1) * INPUT_EVENT_SIZE];

        while !self.stop.load(Ordering::Relaxed) {
            match self.source.wait_readable(self.settings.poll_timeout) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => return self.fail(e),
            }

            match self.source.read_events(&mut buf) {
                Ok(0) => {
                    return self.fail(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "device node reached end of file",
                    ))
                }
                Ok(n) => {
                    if let Some(reason) = self.deliver(event::decode(&buf[..n])) {
                        return reason;
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => return self.fail(e),
            }
        }

        StopReason::Requested
    }

    /// Blocking enqueue that still honours the stop flag.
    fn deliver(&self, mut batch: EventBatch) -> Option<StopReason> {
        loop {
            match self.events.send_timeout(batch, self.settings.poll_timeout) {
                Ok(()) => return None,
                Err(SendTimeoutError::Timeout(returned)) => {
                    if self.stop.load(Ordering::Relaxed) {
                        event::release(returned);
                        return Some(StopReason::Requested);
                    }
                    batch = returned;
                }
                Err(SendTimeoutError::Disconnected(returned)) => {
                    event::release(returned);
                    return Some(StopReason::Disconnected);
                }
            }
        }
    }

    fn fail(&self, e: io::Error) -> StopReason {
        log::error!("[{}] {}", self.label, e);
        if self
            .errors
            .send_timeout(Error::Read(e), self.settings.error_timeout)
            .is_err()
        {
            log::warn!("[{}] read error dropped, nobody is listening", self.label);
        }
        StopReason::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{ABS_X, BTN_SOUTH, EV_ABS, EV_KEY, EV_SYN, SYN_REPORT};
    use crate::event::Event;
    use crate::testing::{encode_all, FakeNode, Step};
    use crossbeam::channel::{bounded, Receiver};
    use std::time::Instant;

    fn fast_settings() -> AcquisitionSettings {
        AcquisitionSettings {
            poll_timeout: Duration::from_millis(10),
            error_timeout: Duration::from_millis(10),
            queue_capacity: 16,
            ..AcquisitionSettings::default()
        }
    }

    fn worker(
        node: &Arc<FakeNode>,
        settings: AcquisitionSettings,
    ) -> (Worker<FakeNode>, Receiver<EventBatch>, Receiver<Error>) {
        let (events_tx, events_rx) = bounded(settings.queue_capacity);
        let (errors_tx, errors_rx) = bounded(1);
        let worker = Worker {
            label: "fake".into(),
            events: events_tx,
            errors: errors_tx,
            stop: Arc::new(AtomicBool::new(false)),
            settings,
            source: Arc::clone(node),
        };
        (worker, events_rx, errors_rx)
    }

    fn drain(rx: &Receiver<EventBatch>) -> Vec<Vec<Event>> {
        rx.try_iter()
            .map(|batch| {
                let events = batch.iter().map(|ev| **ev).collect();
                event::release(batch);
                events
            })
            .collect()
    }

    #[test]
    fn test_default_settings() {
        let settings = AcquisitionSettings::default();
        assert_eq!(settings.poll_timeout, Duration::from_secs(1));
        assert_eq!(settings.error_timeout, Duration::from_millis(100));
        assert_eq!(settings.records_per_read, 64);
        assert_eq!(settings.queue_capacity, 1);
    }

    #[test]
    fn test_batches_in_read_order() {
        let node = Arc::new(FakeNode::joystick());
        let first = [Event::new(EV_KEY, BTN_SOUTH, 1), Event::new(EV_SYN, SYN_REPORT, 0)];
        let second = [Event::new(EV_ABS, ABS_X, 200)];
        node.push(Step::Data(encode_all(&first)));
        node.push(Step::Data(encode_all(&second)));
        node.push(Step::Data(Vec::new()));

        let (worker, events, errors) = worker(&node, fast_settings());
        assert_eq!(worker.run(), StopReason::Failed);

        assert_eq!(drain(&events), vec![first.to_vec(), second.to_vec()]);
        assert!(matches!(errors.try_recv(), Ok(Error::Read(e)) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_would_block_and_interrupted_are_skipped() {
        let node = Arc::new(FakeNode::joystick());
        let ev = Event::new(EV_ABS, ABS_X, 7);
        node.push(Step::WouldBlock);
        node.push(Step::Fail(io::ErrorKind::Interrupted));
        node.push(Step::Data(encode_all(&[ev])));
        node.push(Step::Data(Vec::new()));

        let (worker, events, errors) = worker(&node, fast_settings());
        assert_eq!(worker.run(), StopReason::Failed);
        assert_eq!(drain(&events), vec![vec![ev]]);
        assert_eq!(errors.try_iter().count(), 1);
    }

    #[test]
    fn test_read_is_bounded_by_records_per_read() {
        let node = Arc::new(FakeNode::joystick());
        let events: Vec<Event> = (0..5).map(|v| Event::new(EV_ABS, ABS_X, v)).collect();
        node.push(Step::Data(encode_all(&events)));
        node.push(Step::Data(Vec::new()));

        let settings = AcquisitionSettings {
            records_per_read: 2,
            ..fast_settings()
        };
        let (worker, rx, _errors) = worker(&node, settings);
        worker.run();

        let sizes: Vec<usize> = drain(&rx).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_fatal_error_reported_once() {
        let node = Arc::new(FakeNode::joystick());
        node.push(Step::Fail(io::ErrorKind::PermissionDenied));
        node.push(Step::Data(encode_all(&[Event::new(EV_KEY, BTN_SOUTH, 1)])));

        let (worker, events, errors) = worker(&node, fast_settings());
        assert_eq!(worker.run(), StopReason::Failed);

        let reported: Vec<Error> = errors.try_iter().collect();
        assert_eq!(reported.len(), 1);
        assert!(matches!(&reported[0], Error::Read(e) if e.kind() == io::ErrorKind::PermissionDenied));
        // Nothing after the failure is read.
        assert!(drain(&events).is_empty());
    }

    #[test]
    fn test_unheard_error_does_not_block() {
        let node = Arc::new(FakeNode::joystick());
        node.push(Step::Fail(io::ErrorKind::Other));

        let (mut worker, _events, errors) = worker(&node, fast_settings());
        let (errors_tx, _errors_rx) = bounded(0);
        worker.errors = errors_tx;
        drop(errors);

        let started = Instant::now();
        assert_eq!(worker.run(), StopReason::Failed);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_stop_flag_exits() {
        let node = Arc::new(FakeNode::joystick());
        let (worker, _events, errors) = worker(&node, fast_settings());
        let stop = Arc::clone(&worker.stop);

        let handle = std::thread::spawn(move || worker.run());
        std::thread::sleep(Duration::from_millis(30));
        stop.store(true, Ordering::Relaxed);

        assert_eq!(handle.join().unwrap(), StopReason::Requested);
        assert!(errors.try_recv().is_err());
    }

    #[test]
    fn test_stop_while_nobody_drains() {
        let node = Arc::new(FakeNode::joystick());
        for v in 0..4 {
            node.push(Step::Data(encode_all(&[Event::new(EV_ABS, ABS_X, v)])));
        }
        let settings = AcquisitionSettings {
            queue_capacity: 1,
            ..fast_settings()
        };
        let (worker, events, _errors) = worker(&node, settings);
        let stop = Arc::clone(&worker.stop);

        let handle = std::thread::spawn(move || worker.run());
        std::thread::sleep(Duration::from_millis(50));
        stop.store(true, Ordering::Relaxed);

        let started = Instant::now();
        assert_eq!(handle.join().unwrap(), StopReason::Requested);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(events.len(), 1);
        drain(&events);
    }

    #[test]
    fn test_dropped_consumer_stops_loop() {
        let node = Arc::new(FakeNode::joystick());
        node.push(Step::Data(encode_all(&[Event::new(EV_KEY, BTN_SOUTH, 0)])));

        let (worker, events, _errors) = worker(&node, fast_settings());
        drop(events);
        assert_eq!(worker.run(), StopReason::Disconnected);
    }
}
