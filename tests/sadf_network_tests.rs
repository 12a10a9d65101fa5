use mocnet::moc::{sadf, sdf};
use mocnet::moc::sadf::ScenarioRates;
use mocnet::{Channel, Network, ProcessStatus, SimulationConfig};
use std::sync::{Arc, Mutex};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Mode {
    Single,
    Pair,
    Skip,
}

fn record<T: Clone + std::fmt::Debug + Send + 'static>(net: &mut Network, name: &str, input: &Channel<T>) -> Arc<Mutex<Vec<T>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    net.add(sdf::sink(name, input, move |v: &T| sink_seen.lock().unwrap().push(v.clone())));
    seen
}

fn mode_of(code: i32) -> Mode {
    match code {
        1 => Mode::Single,
        2 => Mode::Pair,
        _ => Mode::Skip,
    }
}

#[test]
fn test_detector_steers_kernel_rates() {
    init_logging();
    let mut net = Network::dataflow();
    let codes = net.signal::<i32>("codes");
    let ctrl = net.signal::<Mode>("ctrl");
    let data = net.signal::<i32>("data");
    let out = net.signal::<i32>("out");

    net.add(sdf::vsource("modes", vec![1, 2, 3], &codes));
    net.add(sdf::vsource("frames", vec![10, 20, 30, 40, 50, 60], &data));
    net.add(
        sadf::detector(
            "det",
            Mode::Skip,
            vec![(Mode::Single, vec![1]), (Mode::Pair, vec![1]), (Mode::Skip, vec![0])],
            &[(&codes, 1)],
            &[&ctrl],
            |_, ins: &[Vec<i32>]| mode_of(ins[0][0]),
            |sc, _| match sc {
                Mode::Skip => vec![vec![]],
                other => vec![vec![*other]],
            },
        )
        .unwrap(),
    );
    net.add(
        sadf::kernel(
            "k",
            vec![
                (Mode::Single, ScenarioRates::new(&[1], &[1])),
                (Mode::Pair, ScenarioRates::new(&[2], &[1])),
            ],
            &ctrl,
            &[&data],
            &[&out],
            |sc, ins: &[Vec<i32>]| match sc {
                Mode::Pair => vec![vec![ins[0][0] + ins[0][1]]],
                _ => vec![vec![ins[0][0]]],
            },
        )
        .unwrap(),
    );
    let seen = record(&mut net, "out", &out);

    let report = net.build(SimulationConfig::default()).unwrap().run().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![10, 50]);
    assert_eq!(report.firings_of("det"), 3);
    assert_eq!(report.firings_of("k"), 2);
    assert!(report.halted.is_empty());
    assert_eq!(data.size(), 3);
}

#[test]
fn test_kernel_output_mismatch_halts_kernel() {
    init_logging();
    let mut net = Network::dataflow();
    let codes = net.signal::<i32>("codes");
    let ctrl = net.signal::<Mode>("ctrl");
    let data = net.signal::<i32>("data");
    let out = net.signal::<i32>("out");

    net.add(sdf::vsource("modes", vec![1, 1], &codes));
    net.add(sdf::vsource("frames", vec![1, 2], &data));
    net.add(
        sadf::detector(
            "det",
            Mode::Single,
            vec![(Mode::Single, vec![1])],
            &[(&codes, 1)],
            &[&ctrl],
            |_, _: &[Vec<i32>]| Mode::Single,
            |sc, _| vec![vec![*sc]],
        )
        .unwrap(),
    );
    net.add(
        sadf::kernel(
            "k",
            vec![(Mode::Single, ScenarioRates::new(&[1], &[1]))],
            &ctrl,
            &[&data],
            &[&out],
            |_, ins: &[Vec<i32>]| vec![vec![ins[0][0], ins[0][0]]],
        )
        .unwrap(),
    );
    let seen = record(&mut net, "out", &out);

    let report = net.build(SimulationConfig::default()).unwrap().run().unwrap();
    assert_eq!(report.status["k"], ProcessStatus::Halted);
    assert!(report.halted[0].1.contains("function produced 2"), "{}", report.halted[0].1);
    assert!(seen.lock().unwrap().is_empty());
}
