use mocnet::core::channel::Channel;
use mocnet::moc::sdf;
use mocnet::{Network, ProcessStatus, SimError, SimulationConfig};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn record<T>(net: &mut Network, name: &str, input: &Channel<T>) -> Arc<Mutex<Vec<T>>>
where
    T: Clone + Debug + Send + 'static,
{
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    net.add(sdf::sink(name, input, move |v: &T| sink_seen.lock().unwrap().push(v.clone())));
    seen
}

#[test]
fn test_token_counts_follow_repetition_vector() {
    init_logging();
    let mut net = Network::dataflow();
    let a = net.signal::<i32>("a");
    let b = net.signal::<i32>("b");
    net.add(sdf::constant("src", 1, Some(6), &a));
    net.add(sdf::comb("c", &[(&a, 3)], &[(&b, 2)], |inputs: &[Vec<i32>]| {
        let sum: i32 = inputs[0].iter().sum();
        vec![vec![sum, -sum]]
    }));
    let seen = record(&mut net, "sink", &b);

    let report = net.build(SimulationConfig::default()).unwrap().run().unwrap();

    let repetitions = report.repetition_vector.clone().unwrap();
    assert_eq!(repetitions["src"], 3);
    assert_eq!(repetitions["c"], 1);
    assert_eq!(repetitions["sink"], 2);

    assert_eq!(report.firings_of("c"), 2);
    assert_eq!((a.written(), a.consumed()), (6, 6));
    assert_eq!((b.written(), b.consumed()), (4, 4));
    assert_eq!(*seen.lock().unwrap(), vec![3, -3, 3, -3]);
    assert_eq!(report.status["src"], ProcessStatus::Exhausted);
    assert!(report.halted.is_empty());
}

#[test]
fn test_feedback_through_initial_token() {
    init_logging();
    let mut net = Network::dataflow();
    let a = net.signal::<i32>("a");
    let fb = net.signal::<i32>("fb");
    let s = net.signal::<i32>("s");
    let s_out = net.signal::<i32>("s_out");
    let s_back = net.signal::<i32>("s_back");
    net.add(sdf::vsource("src", vec![1, 2, 3], &a));
    net.add(sdf::comb2("add", (&a, 1), (&fb, 1), (&s, 1), |x: &[i32], y: &[i32]| {
        vec![x[0] + y[0]]
    }));
    net.add(sdf::fanout("split", &s, &[&s_out, &s_back]));
    net.add(sdf::delay("state", 0, &s_back, &fb));
    let seen = record(&mut net, "out", &s_out);

    let report = net.build(SimulationConfig::default()).unwrap().run().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![1, 3, 6]);
    assert_eq!(report.firings_of("add"), 3);
    // the initial token plus one per firing; the last one is never consumed
    assert_eq!(fb.size(), 1);
}

#[test]
fn test_delayn_prepends_initial_tokens() {
    init_logging();
    let mut net = Network::dataflow();
    let a = net.signal::<i32>("a");
    let b = net.signal::<i32>("b");
    net.add(sdf::vsource("src", vec![1, 2, 3], &a));
    net.add(sdf::delayn("d", 0, 2, &a, &b));
    let seen = record(&mut net, "out", &b);

    net.build(SimulationConfig::default()).unwrap().run().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![0, 0, 1, 2, 3]);
}

/// Two independent chains; `bad` declares one output token but returns two
fn network_with_faulty_process() -> (Network, Arc<Mutex<Vec<i32>>>) {
    let mut net = Network::dataflow();
    let a = net.signal::<i32>("a");
    let b = net.signal::<i32>("b");
    let c = net.signal::<i32>("c");
    let d = net.signal::<i32>("d");
    net.add(sdf::vsource("src1", vec![1, 2], &a));
    net.add(sdf::comb("bad", &[(&a, 1)], &[(&b, 1)], |inputs: &[Vec<i32>]| {
        vec![vec![inputs[0][0], inputs[0][0]]]
    }));
    net.add(sdf::sink("drop", &b, |_: &i32| {}));
    net.add(sdf::vsource("src2", vec![5, 6, 7], &c));
    net.add(sdf::comb("good", &[(&c, 1)], &[(&d, 1)], |inputs: &[Vec<i32>]| {
        vec![vec![inputs[0][0] * 2]]
    }));
    let seen = record(&mut net, "out", &d);
    (net, seen)
}

#[test]
fn test_halted_process_does_not_stop_the_rest() {
    init_logging();
    let (net, seen) = network_with_faulty_process();
    let report = net.build(SimulationConfig::default()).unwrap().run().unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![10, 12, 14]);
    assert_eq!(report.status["bad"], ProcessStatus::Halted);
    assert_eq!(report.halted.len(), 1);
    assert_eq!(report.halted[0].0, "bad");
    assert!(report.halted[0].1.contains("function produced 2"));
}

#[test]
fn test_halt_on_error_aborts_run() {
    init_logging();
    let (net, _) = network_with_faulty_process();
    let config = SimulationConfig::new().with_halt_on_error(true);
    let err = net.build(config).unwrap().run().unwrap_err();
    assert!(matches!(
        err,
        SimError::RateMismatch { ref process, expected: 1, got: 2, .. } if process == "bad"
    ));
}

#[test]
fn test_round_bound_stops_unbounded_source() {
    init_logging();
    let mut net = Network::dataflow();
    let a = net.signal::<i32>("a");
    net.add(sdf::constant("ones", 1, None, &a));
    net.add(sdf::sink("out", &a, |_: &i32| {}));

    let mut engine = net.build(SimulationConfig::new().with_max_steps(5)).unwrap();
    let report = engine.run().unwrap();
    assert_eq!(report.steps, 5);
    assert_eq!(report.firings_of("ones"), 5);
    assert_eq!(a.written(), 5);
}

#[test]
fn test_file_round_trip() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    std::fs::write(&input, "1\n2\n3\n").unwrap();

    let mut net = Network::dataflow();
    let a = net.signal::<i64>("a");
    let b = net.signal::<i64>("b");
    net.add(sdf::file_source("reader", &input, &a, |line| line.trim().parse::<i64>().unwrap_or(0)));
    net.add(sdf::comb("scale", &[(&a, 1)], &[(&b, 1)], |inputs: &[Vec<i64>]| {
        vec![vec![inputs[0][0] * 10]]
    }));
    net.add(sdf::file_sink("writer", &output, &b, |v| v.to_string()));

    let report = net.build(SimulationConfig::default()).unwrap().run().unwrap();
    assert_eq!(report.firings_of("writer"), 3);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "10\n20\n30\n");
}

#[test]
fn test_missing_file_halts_only_the_reader() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut net = Network::dataflow();
    let a = net.signal::<i32>("a");
    let b = net.signal::<i32>("b");
    net.add(sdf::file_source("reader", dir.path().join("nope.txt"), &a, |_| 0));
    net.add(sdf::sink("drop", &a, |_: &i32| {}));
    net.add(sdf::vsource("src", vec![1], &b));
    let seen = record(&mut net, "out", &b);

    let report = net.build(SimulationConfig::default()).unwrap().run().unwrap();
    assert_eq!(report.status["reader"], ProcessStatus::Halted);
    assert!(report.halted[0].1.contains("cannot open"));
    assert_eq!(*seen.lock().unwrap(), vec![1]);
}

#[test]
fn test_zip_n_groups_by_rate() {
    init_logging();
    let mut net = Network::dataflow();
    let a = net.signal::<i32>("a");
    let b = net.signal::<i32>("b");
    let bundle = net.signal::<Vec<Vec<i32>>>("bundle");
    let a2 = net.signal::<i32>("a2");
    let b2 = net.signal::<i32>("b2");
    net.add(sdf::vsource("sa", vec![1, 2, 3, 4], &a));
    net.add(sdf::vsource("sb", vec![10, 20], &b));
    net.add(sdf::zip_n("zip", &[(&a, 2), (&b, 1)], &bundle));
    net.add(sdf::unzip_n("unzip", &bundle, &[(&a2, 2), (&b2, 1)]));
    let firsts = record(&mut net, "firsts", &a2);
    let seconds = record(&mut net, "seconds", &b2);

    let report = net.build(SimulationConfig::default()).unwrap().run().unwrap();
    assert_eq!(bundle.written(), 2);
    assert_eq!(report.firings_of("zip"), 2);
    assert_eq!(*firsts.lock().unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(*seconds.lock().unwrap(), vec![10, 20]);
}

#[test]
fn test_report_serializes() {
    init_logging();
    let mut net = Network::dataflow();
    let a = net.signal::<i32>("a");
    net.add(sdf::vsource("src", vec![1, 2], &a));
    net.add(sdf::sink("out", &a, |_: &i32| {}));
    let report = net.build(SimulationConfig::default()).unwrap().run().unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["firings"]["out"], 2);
    assert_eq!(json["status"]["src"], "Exhausted");
    assert_eq!(json["run_id"].as_str().unwrap().len(), 36);
}
