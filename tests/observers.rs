use ferrous_incant::{
    value, CallArgs, Callable, Exit, IncantError, IncantObserver, Incanter, LoggingObserver,
    MetricsObserver, Param, Resource, Signature, Supply,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl IncantObserver for Recorder {
    fn composed(&self, target: &str, factories: usize, is_async: bool, _elapsed: Duration) {
        self.events
            .lock()
            .unwrap()
            .push(format!("composed {} {} {}", target, factories, is_async));
    }

    fn call_finished(&self, target: &str, _elapsed: Duration, error: Option<&IncantError>) {
        self.events
            .lock()
            .unwrap()
            .push(format!("finished {} ok={}", target, error.is_none()));
    }

    fn entered(&self, resource: &str) {
        self.events.lock().unwrap().push(format!("entered {}", resource));
    }

    fn released(&self, resource: &str, exit: Exit, _error: Option<&IncantError>) {
        self.events
            .lock()
            .unwrap()
            .push(format!("released {} {:?}", resource, exit));
    }
}

fn resource(name: &'static str) -> Callable {
    Callable::scoped(name, Signature::new(), move |_| Ok(Resource::new(name, |_| Ok(()))))
}

#[test]
fn test_observer_sees_full_lifecycle() {
    let recorder = Arc::new(Recorder::default());
    let mut incanter = Incanter::new();
    incanter.add_observer(recorder.clone());
    incanter
        .register_by_name("db", resource("db"))
        .register_by_name("limit", Supply::value(10u32));

    let target = Callable::sync(
        "query",
        Signature::new().param(Param::new("db")).param(Param::new("limit")),
        |_| Ok(value(())),
    );

    incanter.call(&target, CallArgs::new()).unwrap();
    incanter.call(&target, CallArgs::new()).unwrap();

    assert_eq!(
        recorder.events(),
        vec![
            "composed query 2 false",
            "entered db",
            "released db Completed",
            "finished query ok=true",
            "entered db",
            "released db Completed",
            "finished query ok=true",
        ]
    );
}

#[test]
fn test_observer_sees_failures() {
    let recorder = Arc::new(Recorder::default());
    let mut incanter = Incanter::new();
    incanter.add_observer(recorder.clone());
    incanter.register_by_name("db", resource("db"));

    let target = Callable::sync("query", Signature::new().param(Param::new("db")), |_| {
        Err(IncantError::factory("bad query"))
    });

    assert!(incanter.call(&target, CallArgs::new()).is_err());
    assert_eq!(
        recorder.events(),
        vec![
            "composed query 1 false",
            "entered db",
            "released db Failed",
            "finished query ok=false",
        ]
    );
}

#[test]
fn test_observer_added_later_gets_fresh_compositions() {
    let mut incanter = Incanter::new();
    incanter.register_by_name("limit", Supply::value(10u32));
    let target = Callable::from_fn1("query", "limit", |l: u32| l);

    let before = incanter.compose(&target).unwrap();

    let metrics = Arc::new(MetricsObserver::new());
    incanter.add_observer(metrics.clone());
    let after = incanter.compose(&target).unwrap();
    assert!(!before.ptr_eq(&after));

    // The earlier composition does not report to the new observer.
    before.call(CallArgs::new()).unwrap();
    assert_eq!(metrics.call_count(), 0);

    after.call(CallArgs::new()).unwrap();
    assert_eq!(metrics.composition_count(), 1);
    assert_eq!(metrics.call_count(), 1);
}

#[test]
fn test_metrics_observer_tracks_resources() {
    let metrics = Arc::new(MetricsObserver::new());
    let mut incanter = Incanter::new();
    incanter.add_observer(metrics.clone());

    let broken = Callable::scoped("broken", Signature::new(), |_| {
        Ok(Resource::new((), |_| Err(IncantError::factory("close failed"))))
    });
    incanter
        .register_by_name("db", resource("db"))
        .register_by_name("cache", broken);

    let target = Callable::sync(
        "handler",
        Signature::new().param(Param::new("db")).param(Param::new("cache")),
        |_| Ok(value(())),
    );

    assert!(incanter.call(&target, CallArgs::new()).is_err());
    assert_eq!(metrics.entered_count(), 2);
    assert_eq!(metrics.released_count(), 2);
    assert_eq!(metrics.release_failure_count(), 1);
    assert_eq!(metrics.open_resources(), 0);
    assert_eq!(metrics.failure_count(), 1);
    assert!(metrics.average_call_time().is_some());
}

#[test]
fn test_cache_hits_are_not_reported_as_compositions() {
    let metrics = Arc::new(MetricsObserver::new());
    let mut incanter = Incanter::new();
    incanter.add_observer(metrics.clone());
    incanter.register_by_name("limit", Supply::value(1u32));
    let target = Callable::from_fn1("query", "limit", |l: u32| l);

    for _ in 0..5 {
        incanter.compose(&target).unwrap();
    }
    assert_eq!(metrics.composition_count(), 1);
}

#[test]
fn test_logging_observer_does_not_interfere() {
    let mut incanter = Incanter::new();
    incanter.add_observer(Arc::new(LoggingObserver::with_prefix("test")));
    incanter.register_by_name("db", resource("db"));

    let target = Callable::sync("query", Signature::new().param(Param::new("db")), |args| {
        Ok(value(args.get::<&'static str>("db")?))
    });
    assert!(incanter.call(&target, CallArgs::new()).is_ok());
}
