use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use super::*;
use crate::subscribe::{SubscriptionHandle, UnsubscribeLogic, Unsubscribeable};

use tokio::time::{sleep, Duration};

type Log = Arc<Mutex<Vec<String>>>;

fn recording_subscriber(log: &Log) -> Subscriber<u32> {
    let (n, e, c) = (Arc::clone(log), Arc::clone(log), Arc::clone(log));
    Subscriber::new(
        move |v| n.lock().unwrap().push(format!("next {}", v)),
        move |err| e.lock().unwrap().push(format!("error {}", err)),
        move || c.lock().unwrap().push(String::from("complete")),
    )
}

fn make_emit_u32_observable(end: u32, last_emit: Arc<Mutex<Option<u32>>>) -> Observable<u32> {
    Observable::new(move |mut o: Subscriber<_>| {
        let done = Arc::new(Mutex::new(false));
        let done_c = Arc::clone(&done);
        let last_emit = Arc::clone(&last_emit);

        let jh = std::thread::spawn(move || {
            for i in 0..=end {
                if *done.lock().unwrap() {
                    break;
                }
                *last_emit.lock().unwrap() = Some(i);
                o.next(i);
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
            o.complete();
        });

        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || {
                *done_c.lock().unwrap() = true;
            })),
            SubscriptionHandle::JoinThread(jh),
        )
    })
}

#[test]
fn producer_runs_once_per_subscription() {
    let runs = Arc::new(AtomicUsize::new(0));
    let runs_c = Arc::clone(&runs);

    let mut observable = Observable::new(move |mut o: Subscriber<u32>| {
        let run = runs_c.fetch_add(1, Ordering::SeqCst) as u32;
        o.next(run);
        o.complete();
        Subscription::default()
    });

    assert_eq!(runs.load(Ordering::SeqCst), 0);

    let first: Log = Arc::new(Mutex::new(vec![]));
    let second: Log = Arc::new(Mutex::new(vec![]));
    observable.subscribe(recording_subscriber(&first));
    observable.subscribe(recording_subscriber(&second));

    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(*first.lock().unwrap(), vec!["next 0", "complete"]);
    assert_eq!(*second.lock().unwrap(), vec!["next 1", "complete"]);
}

#[test]
fn emissions_after_terminal_are_dropped() {
    let log: Log = Arc::new(Mutex::new(vec![]));
    let mut observable = Observable::new(|mut o: Subscriber<u32>| {
        o.next(1);
        o.error(ObservableError::msg("boom"));
        o.next(2);
        o.complete();
        o.error(ObservableError::msg("again"));
        Subscription::default()
    });

    let subscription = observable.subscribe(recording_subscriber(&log));

    assert!(subscription.is_closed());
    assert_eq!(*log.lock().unwrap(), vec!["next 1", "error boom"]);
}

#[test]
fn producer_panic_is_delivered_as_error() {
    let log: Log = Arc::new(Mutex::new(vec![]));
    let mut observable = Observable::new(|mut o: Subscriber<u32>| {
        o.next(7);
        panic!("producer exploded");
    });

    let subscription = observable.subscribe(recording_subscriber(&log));

    assert!(subscription.is_closed());
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "next 7",
            "error observable producer panicked: producer exploded"
        ]
    );
}

#[test]
fn failing_producer_is_delivered_as_error() {
    #[derive(Debug)]
    struct NotReady;

    impl fmt::Display for NotReady {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "resource not ready")
        }
    }

    impl Error for NotReady {}

    let caught: Arc<Mutex<Option<SharedError>>> = Arc::new(Mutex::new(None));
    let caught_c = Arc::clone(&caught);

    let mut observable = Observable::try_new(|_o: Subscriber<u32>| Err(NotReady));
    let mut subscriber = Subscriber::on_next(|_: u32| {});
    subscriber.on_error(move |e| *caught_c.lock().unwrap() = Some(e));
    observable.subscribe(subscriber);

    let caught = caught.lock().unwrap();
    let err = caught.as_ref().expect("error should be delivered");
    assert!(err.downcast_ref::<NotReady>().is_some());
}

#[test]
fn unsubscribe_runs_producer_teardown_once() {
    let teardowns = Arc::new(AtomicUsize::new(0));
    let teardowns_c = Arc::clone(&teardowns);
    let producer: Arc<Mutex<Option<Subscriber<u32>>>> = Arc::new(Mutex::new(None));
    let producer_c = Arc::clone(&producer);

    let mut observable = Observable::new(move |o: Subscriber<u32>| {
        *producer_c.lock().unwrap() = Some(o);
        let teardowns = Arc::clone(&teardowns_c);
        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || {
                teardowns.fetch_add(1, Ordering::SeqCst);
            })),
            SubscriptionHandle::Nil,
        )
    });

    let log: Log = Arc::new(Mutex::new(vec![]));
    let subscription = observable.subscribe(recording_subscriber(&log));

    let mut o = producer.lock().unwrap().take().unwrap();
    o.next(1);
    subscription.unsubscribe();
    subscription.unsubscribe();
    // Producer ignores the teardown and keeps emitting.
    o.next(2);
    o.complete();

    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    assert_eq!(*log.lock().unwrap(), vec!["next 1"]);
}

#[test]
fn completion_runs_producer_teardown() {
    let teardowns = Arc::new(AtomicUsize::new(0));
    let teardowns_c = Arc::clone(&teardowns);

    let mut observable = Observable::new(move |mut o: Subscriber<u32>| {
        o.complete();
        let teardowns = Arc::clone(&teardowns_c);
        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || {
                teardowns.fetch_add(1, Ordering::SeqCst);
            })),
            SubscriptionHandle::Nil,
        )
    });

    let subscription = observable.subscribe(|_: u32| {});
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);

    subscription.unsubscribe();
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
}

#[test]
fn thread_producer_stops_after_unsubscribe() {
    let last_emit = Arc::new(Mutex::new(None));
    let mut observable = make_emit_u32_observable(10_000, Arc::clone(&last_emit));

    let log: Log = Arc::new(Mutex::new(vec![]));
    let subscription = observable.subscribe(recording_subscriber(&log));

    std::thread::sleep(std::time::Duration::from_millis(20));
    subscription.unsubscribe();

    assert!(subscription.join().is_ok());
    let last = last_emit.lock().unwrap().expect("producer emitted");
    assert!(last < 10_000, "producer kept running until {}", last);
    // The producer completes after stopping, the subscriber never sees it.
    assert!(!log.lock().unwrap().contains(&String::from("complete")));
}

#[tokio::test]
async fn timer_producer_emits_asynchronously() {
    let mut observable = Observable::new(|mut o: Subscriber<u32>| {
        let task = tokio::spawn(async move {
            for i in 0..3 {
                sleep(Duration::from_millis(5)).await;
                o.next(i);
            }
            o.complete();
        });
        Subscription::new(UnsubscribeLogic::Nil, SubscriptionHandle::JoinTask(task))
    });

    let log: Log = Arc::new(Mutex::new(vec![]));
    let subscription = observable.subscribe(recording_subscriber(&log));

    // Nothing is emitted synchronously.
    assert!(log.lock().unwrap().is_empty());

    assert!(subscription.join_concurrent().await.is_ok());
    assert_eq!(
        *log.lock().unwrap(),
        vec!["next 0", "next 1", "next 2", "complete"]
    );
}

#[tokio::test]
async fn future_unsubscribe_logic_is_spawned() {
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let tx = Arc::new(Mutex::new(Some(tx)));

    let mut observable = Observable::new(move |_o: Subscriber<u32>| {
        let tx = Arc::clone(&tx);
        Subscription::new(
            UnsubscribeLogic::Future(Box::pin(async move {
                if let Some(tx) = tx.lock().unwrap().take() {
                    let _ = tx.send(());
                }
            })),
            SubscriptionHandle::Nil,
        )
    });

    observable.subscribe(|_: u32| {}).unsubscribe();
    assert!(tokio::time::timeout(Duration::from_secs(1), rx).await.is_ok());
}

#[test]
fn creation_helpers() {
    let log: Log = Arc::new(Mutex::new(vec![]));
    Observable::of(vec![1, 2, 3]).subscribe(recording_subscriber(&log));
    Observable::<u32>::empty().subscribe(recording_subscriber(&log));
    Observable::<u32>::throw_error(ObservableError::msg("unsuitable value"))
        .subscribe(recording_subscriber(&log));

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "next 1",
            "next 2",
            "next 3",
            "complete",
            "complete",
            "error unsuitable value"
        ]
    );
}

#[test]
fn closure_is_next_handler() {
    let sum = Arc::new(AtomicUsize::new(0));
    let sum_c = Arc::clone(&sum);
    Observable::of(1..=4_usize).subscribe(move |v: usize| {
        sum_c.fetch_add(v, Ordering::SeqCst);
    });
    assert_eq!(sum.load(Ordering::SeqCst), 10);
}

#[test]
fn same_subscriber_subscribed_twice_runs_independently() {
    let log: Log = Arc::new(Mutex::new(vec![]));
    let subscriber = recording_subscriber(&log);
    let mut observable = Observable::of(vec![1, 2]);

    let first = observable.subscribe(subscriber.clone());
    let second = observable.subscribe(subscriber);

    assert!(first.is_closed());
    assert!(second.is_closed());
    assert_eq!(
        *log.lock().unwrap(),
        vec!["next 1", "next 2", "complete", "next 1", "next 2", "complete"]
    );
}

#[test]
fn producer_passing_subscriber_on_keeps_outer_guard() {
    let log: Log = Arc::new(Mutex::new(vec![]));
    let mut outer = Observable::new(|o: Subscriber<u32>| Observable::of(vec![5]).subscribe(o));

    let subscription = outer.subscribe(recording_subscriber(&log));

    // The inner completion reaches the outer subscriber and closes it.
    assert!(subscription.is_closed());
    assert_eq!(*log.lock().unwrap(), vec!["next 5", "complete"]);
}

#[test]
fn panicking_next_handler_is_reported_to_error() {
    let errors: Log = Arc::new(Mutex::new(vec![]));
    let errors_c = Arc::clone(&errors);
    let mut subscriber = Subscriber::on_next(|v: u32| {
        if v == 2 {
            panic!("handler rejected {}", v);
        }
    });
    subscriber.on_error(move |e| errors_c.lock().unwrap().push(e.to_string()));

    let subscription = Observable::of(vec![1, 2, 3]).subscribe(subscriber);

    assert!(subscription.is_closed());
    assert_eq!(
        *errors.lock().unwrap(),
        vec!["observable producer panicked: handler rejected 2"]
    );
}
