#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use rxcore::subscribe::Subscriber;

pub type Registers = Arc<Mutex<Vec<i32>>>;

/// Returns subscriber factories sharing three registers: emitted values,
/// completions and errors.
pub fn register_emissions_subscriber() -> (
    Vec<impl FnOnce() -> Subscriber<i32>>,
    Registers,
    Registers,
    Registers,
) {
    let nexts: Registers = Arc::new(Mutex::new(Vec::with_capacity(5)));
    let nexts_c = Arc::clone(&nexts);

    let completes: Registers = Arc::new(Mutex::new(Vec::with_capacity(5)));
    let completes_c = Arc::clone(&completes);

    let errors: Registers = Arc::new(Mutex::new(Vec::with_capacity(5)));
    let errors_c = Arc::clone(&errors);

    let make_subscriber = vec![
        move || {
            Subscriber::new(
                move |n| {
                    // Track next() calls.
                    nexts_c.lock().unwrap().push(n);
                },
                move |_| {
                    // Track error() calls.
                    errors_c.lock().unwrap().push(1);
                },
                move || {
                    // Track complete() calls.
                    completes_c.lock().unwrap().push(1);
                },
            )
        };
        10
    ];
    (make_subscriber, nexts, completes, errors)
}

/// Records notifications of several subscribers into one ordered log, so
/// tests can check delivery order across subscribers.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        EventLog::default()
    }

    pub fn subscriber(&self, name: &'static str) -> Subscriber<i32> {
        let (n, e, c) = (self.clone(), self.clone(), self.clone());
        Subscriber::new(
            move |v| n.push(format!("{} next {}", name, v)),
            move |err| e.push(format!("{} error {}", name, err)),
            move || c.push(format!("{} complete", name)),
        )
    }

    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}
