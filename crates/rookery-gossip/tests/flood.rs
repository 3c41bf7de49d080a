//! Gossip floods over whole networks

use std::time::Duration;

use rookery_core::{NetworkConfig, kinds};
use rookery_gossip::{register, send_gossip};
use rookery_node::Network;

fn network(edges: &[(&'static str, &'static str)], config: NetworkConfig) -> Network {
    rookery_logging::init_testing();
    let network = Network::builder()
        .edges(edges.iter().copied())
        .config(config)
        .build()
        .unwrap();
    register(network.registry());
    network
}

/// Poll until every nest has seen `message`
async fn wait_for_spread(network: &Network, message: &str, deadline: Duration) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        let spread = network
            .nests()
            .all(|nest| nest.with_state(|state| state.gossip.has_seen(message)));
        if spread {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_each_nest_receives_once_on_cycle() {
    // Square with one diagonal: every nest sits on a cycle
    let edges = [("A", "B"), ("B", "C"), ("C", "D"), ("D", "A"), ("A", "C")];
    let network = network(&edges, NetworkConfig::reliable());

    assert_eq!(send_gossip(network.nest("A").unwrap(), "hawk overhead"), 3);
    assert!(wait_for_spread(&network, "hawk overhead", Duration::from_secs(2)).await);

    // Let every echo arrive and be discarded
    tokio::time::sleep(Duration::from_millis(100)).await;

    for name in ["B", "C", "D"] {
        let times = network
            .nest(name)
            .unwrap()
            .with_state(|state| state.gossip.times_received("hawk overhead"));
        assert_eq!(times, 1, "{name} received the message {times} times");
    }
    let origin = network.nest("A").unwrap();
    assert!(origin.with_state(|state| state.gossip.received().is_empty()));

    // Origin sends to all 3 neighbors, each other nest relays to all but its source
    let expected = 3 + (2 - 1) + (3 - 1) + (2 - 1);
    assert_eq!(network.stats().sent_of(kinds::GOSSIP), expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reaches_every_nest_on_chain() {
    let edges = [("A", "B"), ("B", "C"), ("C", "D"), ("D", "E")];
    let network = network(&edges, NetworkConfig::reliable());

    send_gossip(network.nest("C").unwrap(), "rain coming");
    assert!(wait_for_spread(&network, "rain coming", Duration::from_secs(2)).await);

    // Each record names the neighbor the message came from
    let source = |name: &str| {
        network
            .nest(name)
            .unwrap()
            .with_state(|state| state.gossip.received()[0].source.clone())
    };
    assert_eq!(source("A"), "B");
    assert_eq!(source("B"), "C");
    assert_eq!(source("D"), "C");
    assert_eq!(source("E"), "D");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resend_repairs_lost_relay() {
    let network = network(&[("A", "B"), ("B", "C")], NetworkConfig::reliable());
    let b = network.nest("B").unwrap();

    // B heard it from A but its relay to C never went out
    assert!(b.with_state(|state| state.gossip.receive("caw", &"A".into())));

    assert_eq!(send_gossip(b, "caw"), 2);
    assert!(wait_for_spread(&network, "caw", Duration::from_secs(2)).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let c = network.nest("C").unwrap();
    assert_eq!(c.with_state(|state| state.gossip.times_received("caw")), 1);
    assert_eq!(c.with_state(|state| state.gossip.received()[0].source.clone()), "B");
    assert_eq!(b.with_state(|state| state.gossip.times_received("caw")), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_disconnected_component_not_reached() {
    let edges = [("A", "B"), ("C", "D")];
    let network = network(&edges, NetworkConfig::reliable());

    send_gossip(network.nest("A").unwrap(), "only here");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let seen = |name: &str| {
        network
            .nest(name)
            .unwrap()
            .with_state(|state| state.gossip.has_seen("only here"))
    };
    assert!(seen("B"));
    assert!(!seen("C"));
    assert!(!seen("D"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_messages_spread_under_loss() {
    let edges = [
        ("A", "B"),
        ("B", "C"),
        ("C", "D"),
        ("D", "A"),
        ("B", "D"),
        ("D", "E"),
    ];
    let network = network(&edges, NetworkConfig::lossy(0.05));

    for i in 0..5 {
        send_gossip(network.nest("A").unwrap(), format!("message {i}"));
    }
    for i in 0..5 {
        let message = format!("message {i}");
        assert!(wait_for_spread(&network, &message, Duration::from_secs(5)).await);
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    network.everywhere(|nest| {
        nest.with_state(|state| {
            for i in 0..5 {
                assert!(state.gossip.times_received(&format!("message {i}")) <= 1);
            }
        })
    });
}
