use mocnet::cosim::relay::relay_lines;
use mocnet::cosim::{sdf_bridge, sy_bridge, BridgeConfig};
use mocnet::moc::{sdf, sy};
use mocnet::{ExtendedValue, Network, ProcessStatus, SimError, SimulationConfig};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Accept one connection and answer every received line with `reply(line)`.
/// The thread returns the lines it received once the bridge disconnects.
fn spawn_peer<F>(mut reply: F) -> (u16, JoinHandle<Vec<String>>)
where
    F: FnMut(&str) -> String + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut received = Vec::new();
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else { break };
            let answer = reply(&line);
            received.push(line);
            if writeln!(writer, "{}", answer).is_err() {
                break;
            }
        }
        received
    });
    (port, handle)
}

fn increment(line: &str) -> String {
    (line.trim().parse::<i64>().unwrap() + 1).to_string()
}

fn sy_record(net: &mut Network, name: &str, input: &sy::SyChannel<i64>) -> Arc<Mutex<Vec<ExtendedValue<i64>>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    net.add(sy::sink(name, input, move |v: &ExtendedValue<i64>| sink_seen.lock().unwrap().push(*v)));
    seen
}

#[test]
fn test_sdf_bridge_send_ahead() {
    init_logging();
    let (port, peer) = spawn_peer(increment);

    let mut net = Network::dataflow();
    let a = net.signal::<i64>("a");
    let b = net.signal::<i64>("b");
    net.add(sdf::vsource("src", vec![3, 4], &a));
    let config = BridgeConfig::tcp("127.0.0.1", port).with_offset(-1);
    net.add(sdf_bridge("remote", config, &[(&a, 1)], (&b, 1)).unwrap());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    net.add(sdf::sink("out", &b, move |v: &i64| sink_seen.lock().unwrap().push(*v)));

    let report = net.build(SimulationConfig::default()).unwrap().run().unwrap();
    assert_eq!(report.firings_of("remote"), 2);
    assert_eq!(*seen.lock().unwrap(), vec![4]);
    assert_eq!(peer.join().unwrap(), vec!["3", "4"]);
}

#[test]
fn test_sy_bridge_two_inputs() {
    init_logging();
    // multiply-accumulate peer: "a | b" -> running sum of a * b
    let mut acc = 0i64;
    let (port, peer) = spawn_peer(move |line| {
        let product: i64 = line.split('|').map(|g| g.trim().parse::<i64>().unwrap()).product();
        acc += product;
        acc.to_string()
    });

    let mut net = Network::synchronous();
    let a = net.signal::<ExtendedValue<i64>>("a");
    let b = net.signal::<ExtendedValue<i64>>("b");
    let c = net.signal::<ExtendedValue<i64>>("c");
    net.add(sy::vsource("sa", vec![ExtendedValue::Present(1), ExtendedValue::Present(2), ExtendedValue::Present(3)], &a));
    net.add(sy::source("sb", |x: &i64| x + 1, 4, Some(3), &b));
    net.add(sy_bridge("mulacc", BridgeConfig::tcp("127.0.0.1", port), &[&a, &b], &c).unwrap());
    let seen = sy_record(&mut net, "out", &c);

    net.build(SimulationConfig::default()).unwrap().run().unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![ExtendedValue::Present(4), ExtendedValue::Present(14), ExtendedValue::Present(32)]
    );
    assert_eq!(peer.join().unwrap(), vec!["1 | 4", "2 | 5", "3 | 6"]);
}

#[test]
fn test_sy_bridge_send_ahead_outputs_absent_first() {
    init_logging();
    let (port, peer) = spawn_peer(increment);

    let mut net = Network::synchronous();
    let a = net.signal::<ExtendedValue<i64>>("a");
    let c = net.signal::<ExtendedValue<i64>>("c");
    net.add(sy::vsource("src", vec![ExtendedValue::Present(1), ExtendedValue::Present(2), ExtendedValue::Present(3)], &a));
    let config = BridgeConfig::tcp("127.0.0.1", port).with_offset(-1);
    net.add(sy_bridge("remote", config, &[&a], &c).unwrap());
    let seen = sy_record(&mut net, "out", &c);

    net.build(SimulationConfig::default()).unwrap().run().unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![ExtendedValue::Absent, ExtendedValue::Present(2), ExtendedValue::Present(3)]
    );
    assert_eq!(peer.join().unwrap(), vec!["1", "2", "3"]);
}

#[test]
fn test_short_reply_halts_bridge() {
    init_logging();
    let (port, peer) = spawn_peer(|_| String::new());

    let mut net = Network::dataflow();
    let a = net.signal::<i64>("a");
    let b = net.signal::<i64>("b");
    net.add(sdf::vsource("src", vec![7], &a));
    net.add(sdf_bridge("remote", BridgeConfig::tcp("127.0.0.1", port), &[(&a, 1)], (&b, 1)).unwrap());
    net.add(sdf::sink("out", &b, |_: &i64| {}));

    let report = net.build(SimulationConfig::default()).unwrap().run().unwrap();
    assert_eq!(report.status["remote"], ProcessStatus::Halted);
    assert!(report.halted[0].1.contains("expected 1 tokens from peer, got 0"));
    assert_eq!(peer.join().unwrap(), vec!["7"]);
}

#[test]
fn test_unreachable_peer_aborts_synchronous_run() {
    init_logging();
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut net = Network::synchronous();
    let a = net.signal::<ExtendedValue<i64>>("a");
    let c = net.signal::<ExtendedValue<i64>>("c");
    net.add(sy::constant("src", 1, Some(1), &a));
    net.add(sy_bridge("remote", BridgeConfig::tcp("127.0.0.1", port), &[&a], &c).unwrap());
    net.add(sy::sink("out", &c, |_| {}));

    let err = net.build(SimulationConfig::default()).unwrap().run().unwrap_err();
    assert!(matches!(err, SimError::Transport { ref process, .. } if process == "remote"));
}

#[test]
fn test_absent_input_cannot_be_sent() {
    init_logging();
    let (port, peer) = spawn_peer(increment);

    let mut net = Network::synchronous();
    let a = net.signal::<ExtendedValue<i64>>("a");
    let c = net.signal::<ExtendedValue<i64>>("c");
    net.add(sy::vsource("src", vec![ExtendedValue::Absent], &a));
    net.add(sy_bridge("remote", BridgeConfig::tcp("127.0.0.1", port), &[&a], &c).unwrap());
    net.add(sy::sink("out", &c, |_| {}));

    let err = net.build(SimulationConfig::default()).unwrap().run().unwrap_err();
    assert!(matches!(err, SimError::AbsentValue { ref process, .. } if process == "remote"));
    assert!(peer.join().unwrap().is_empty());
}

#[test]
fn test_named_pipe_relay() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let to_relay = dir.path().join("to_relay");
    let from_relay = dir.path().join("from_relay");
    for fifo in [&to_relay, &from_relay] {
        match Command::new("mkfifo").arg(fifo).status() {
            Ok(status) if status.success() => {}
            _ => {
                eprintln!("mkfifo unavailable, skipping");
                return;
            }
        }
    }

    let (input, output) = (to_relay.clone(), from_relay.clone());
    let relay = thread::spawn(move || {
        let reader = BufReader::new(File::open(&input).unwrap());
        let writer = OpenOptions::new().write(true).open(&output).unwrap();
        relay_lines(reader, writer).unwrap()
    });

    let mut net = Network::dataflow();
    let a = net.signal::<i64>("a");
    let b = net.signal::<i64>("b");
    net.add(sdf::vsource("src", vec![1, 2, 3], &a));
    net.add(sdf_bridge("relay", BridgeConfig::pipe(&to_relay, &from_relay), &[(&a, 1)], (&b, 1)).unwrap());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    net.add(sdf::sink("out", &b, move |v: &i64| sink_seen.lock().unwrap().push(*v)));

    net.build(SimulationConfig::default()).unwrap().run().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![1, 3, 6]);
    assert_eq!(relay.join().unwrap().sum, 6);
}
