#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rxcore::{
    subscribe::{Subscriber, Subscription, SubscriptionHandle, UnsubscribeLogic},
    Observable, Observer,
};
use tracing::debug;

/// Emits `0..=end` from an OS thread, one value per millisecond, then
/// completes. Unsubscribing stops the thread; `last_emit_assert` receives the
/// last value the thread emitted.
pub fn generate_u32_observable(
    end: u32,
    last_emit_assert: impl Fn(u32) + Send + Sync + 'static,
) -> Observable<u32> {
    let last_emit_assert = Arc::new(last_emit_assert);

    Observable::new(move |mut o: Subscriber<_>| {
        let done = Arc::new(Mutex::new(false));
        let done_c = Arc::clone(&done);
        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            if let Ok(i) = rx.recv() {
                *done_c.lock().unwrap() = i;
            }
        });

        let last_emit_assert = Arc::clone(&last_emit_assert);
        let jh = std::thread::spawn(move || {
            let mut last_emit = 0;

            for i in 0..=end {
                if *done.lock().unwrap() {
                    break;
                }
                last_emit = i;
                o.next(i);
                std::thread::sleep(Duration::from_millis(1));
            }
            o.complete();
            last_emit_assert(last_emit);
        });

        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || {
                if tx.send(true).is_err() {
                    debug!("stop signal receiver dropped");
                }
            })),
            SubscriptionHandle::JoinThread(jh),
        )
    })
}

/// Emits `0..=end` from a `Tokio` task every `period`, then completes.
/// Unsubscribing aborts the task.
pub fn generate_tokio_observable(end: u32, period: Duration) -> Observable<u32> {
    Observable::new(move |mut o: Subscriber<_>| {
        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            for i in 0..=end {
                timer.tick().await;
                o.next(i);
            }
            o.complete();
        });
        let abort = task.abort_handle();

        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || abort.abort())),
            SubscriptionHandle::JoinTask(task),
        )
    })
}
