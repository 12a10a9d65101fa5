use mocnet::moc::ct;
use mocnet::{Network, ProcessStatus, SimError, SimTime, SimulationConfig};
use std::sync::{Arc, Mutex};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

type Samples = Arc<Mutex<Vec<(SimTime, f64)>>>;

fn sampler(net: &mut Network, name: &str, period: SimTime, input: &ct::CtChannel) -> Samples {
    let samples: Samples = Arc::new(Mutex::new(Vec::new()));
    let sink_samples = Arc::clone(&samples);
    net.add(
        ct::sink(name, period, input, move |t, v| sink_samples.lock().unwrap().push((t, v))).unwrap(),
    );
    samples
}

#[test]
fn test_first_order_step_response() {
    init_logging();
    let mut net = Network::continuous_time();
    let u = net.signal("u");
    let y = net.signal("y");
    net.add(ct::source("step", |_| 1.0, 0.1, 2.0, &u).unwrap());
    net.add(ct::filter("lowpass", &[1.0], &[1.0, 1.0], 0.001, &u, &y).unwrap());
    let samples = sampler(&mut net, "scope", 0.1, &y);

    let report = net.build(SimulationConfig::default()).unwrap().run().unwrap();
    assert_eq!(report.firings_of("step"), 20);
    assert_eq!(report.firings_of("lowpass"), 20);

    let samples = samples.lock().unwrap();
    assert_eq!(samples.len(), 20);
    for &(t, v) in samples.iter() {
        let expected = 1.0 - (-t).exp();
        assert!((v - expected).abs() < 1e-4, "y({t}) = {v}, expected {expected}");
    }
}

#[test]
fn test_delay_shifts_signal() {
    init_logging();
    let mut net = Network::continuous_time();
    let x = net.signal("x");
    let xd = net.signal("xd");
    net.add(ct::source("ramp", |t| t, 0.5, 2.0, &x).unwrap());
    net.add(ct::delay("late", 0.5, &x, &xd).unwrap());
    let samples = sampler(&mut net, "scope", 0.25, &xd);

    net.build(SimulationConfig::default()).unwrap().run().unwrap();
    let samples = samples.lock().unwrap();
    // the leading zero segment plus four shifted ones cover [0, 2.5)
    assert_eq!(samples.len(), 10);
    for &(t, v) in samples.iter() {
        assert!((v - (t - 0.5).max(0.0)).abs() < 1e-9, "x({t}) = {v}");
    }
}

#[test]
fn test_pointwise_scaling_and_fanout() {
    init_logging();
    let mut net = Network::continuous_time();
    let x = net.signal("x");
    let x1 = net.signal("x1");
    let x2 = net.signal("x2");
    let y = net.signal("y");
    net.add(ct::source("ramp", |t| 2.0 * t, 0.5, 1.0, &x).unwrap());
    net.add(ct::fanout("split", &x, &[&x1, &x2]));
    net.add(ct::comb("triple", |v| 3.0 * v, &x1, &y));
    let raw = sampler(&mut net, "raw", 0.25, &x2);
    let scaled = sampler(&mut net, "scaled", 0.25, &y);

    net.build(SimulationConfig::default()).unwrap().run().unwrap();
    let raw = raw.lock().unwrap();
    let scaled = scaled.lock().unwrap();
    assert_eq!(raw.len(), 4);
    for (&(t, r), &(ts, s)) in raw.iter().zip(scaled.iter()) {
        assert_eq!(t, ts);
        assert!((r - 2.0 * t).abs() < 1e-12);
        assert!((s - 6.0 * t).abs() < 1e-12);
    }
}

#[test]
fn test_panicking_comb_halts_only_itself() {
    init_logging();
    let mut net = Network::continuous_time();
    let x = net.signal("x");
    let y = net.signal("y");
    net.add(ct::source("ramp", |t| t, 0.1, 1.0, &x).unwrap());
    net.add(ct::comb("bad", |v| if v > 0.25 { panic!("boom at {}", v) } else { v }, &x, &y));
    let samples = sampler(&mut net, "scope", 0.1, &y);

    let report = net.build(SimulationConfig::default()).unwrap().run().unwrap();
    assert_eq!(report.status["bad"], ProcessStatus::Halted);
    assert_eq!(report.halted.len(), 1);
    assert_eq!(report.halted[0].0, "bad");
    assert!(report.halted[0].1.contains("boom at"), "{}", report.halted[0].1);
    assert_eq!(report.firings_of("ramp"), 10);

    // the segments before the failure still reached the sink
    let samples = samples.lock().unwrap();
    assert_eq!(samples.len(), 2);
    assert!(samples.iter().all(|&(t, v)| (v - t).abs() < 1e-9));
}

#[test]
fn test_panicking_source_is_reported_by_name() {
    init_logging();
    let mut net = Network::continuous_time();
    let x = net.signal("x");
    net.add(ct::source("broken", |_| -> f64 { panic!("no signal") }, 0.5, 1.0, &x).unwrap());
    let samples = sampler(&mut net, "scope", 0.1, &x);

    let report = net.build(SimulationConfig::default()).unwrap().run().unwrap();
    assert_eq!(report.status["broken"], ProcessStatus::Halted);
    assert!(report.halted[0].1.starts_with("[broken] function failed"));
    assert!(samples.lock().unwrap().is_empty());
}

#[test]
fn test_improper_filter_rejected() {
    let mut net = Network::continuous_time();
    let u = net.signal("u");
    let y = net.signal("y");
    let err = ct::filter("bad", &[1.0, 0.0, 0.0], &[1.0, 1.0], 0.01, &u, &y).err().unwrap();
    assert!(matches!(err, SimError::Config(_)));
}

#[test]
fn test_non_positive_periods_rejected() {
    let mut net = Network::continuous_time();
    let u = net.signal("u");
    assert!(ct::source("s", |_| 0.0, 0.0, 1.0, &u).is_err());
    assert!(ct::sink("k", -1.0, &u, |_, _| {}).is_err());
    assert!(ct::delay("d", 0.0, &u, &u).is_err());
}
