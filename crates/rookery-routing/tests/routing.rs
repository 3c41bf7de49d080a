//! Topology convergence and multi-hop routing over whole networks

use std::collections::BTreeSet;
use std::time::Duration;

use rookery_core::{NestName, NetworkConfig, Payload, RequestError, kinds};
use rookery_node::Network;
use rookery_routing::{
    announce, find_route, is_converged, register, route_request, start_topology,
    wait_for_topology,
};

const CONVERGENCE: Duration = Duration::from_secs(5);

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

async fn converged(edges: &[(&'static str, &'static str)]) -> Network {
    let network = network(edges, NetworkConfig::reliable());
    start_topology(&network);
    wait_for_topology(&network, CONVERGENCE).await.unwrap();
    network
}

const RING: [(&str, &str); 6] = [
    ("A", "B"),
    ("B", "C"),
    ("C", "D"),
    ("D", "E"),
    ("E", "F"),
    ("F", "A"),
];

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_table_holds_every_nest() {
    let network = converged(&RING).await;

    network.everywhere(|nest| {
        let table = nest.topology();
        assert_eq!(table.len(), 6);
        for owner in network.nests() {
            assert_eq!(table.neighbors_of(owner.name().as_str()), owner.neighbors());
        }
    });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_components_converge_separately() {
    let network = converged(&[("A", "B"), ("B", "C"), ("X", "Y")]).await;

    let names = |nest: &str| -> BTreeSet<NestName> {
        network.nest(nest).unwrap().topology().network().into_iter().collect()
    };
    assert_eq!(names("A"), BTreeSet::from([NestName::from("A"), "B".into(), "C".into()]));
    assert_eq!(names("Y"), BTreeSet::from([NestName::from("X"), "Y".into()]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_route_through_middle_nest() {
    let network = converged(&[("A", "B"), ("B", "C")]).await;
    let a = network.nest("A").unwrap();

    let outcome = route_request(a, &"C".into(), kinds::NOTE, Payload::text("hi")).await;
    // The final hop comes from B, not from A
    assert_eq!(outcome, Ok(Payload::text("C received note from B: hi")));
    assert_eq!(network.stats().sent_of(kinds::ROUTE), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_route_across_ring() {
    let network = converged(&RING).await;
    let sent_before = network.stats().sent_of(kinds::ROUTE);
    let a = network.nest("A").unwrap();

    let outcome = route_request(a, &"D".into(), kinds::PING, Payload::Empty).await;
    assert_eq!(outcome, Ok(Payload::text("pong")));
    // A -> B -> C -> D: two relays wrap the request
    assert_eq!(network.stats().sent_of(kinds::ROUTE) - sent_before, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_downstream_failure_comes_back_unchanged() {
    let network = converged(&[("A", "B"), ("B", "C"), ("C", "D")]).await;
    network
        .registry()
        .register_fn("fragile", |nest, _payload, _source| {
            Err(RequestError::handler(nest.name(), "branch snapped"))
        });
    let a = network.nest("A").unwrap();

    let outcome = route_request(a, &"D".into(), "fragile", Payload::Empty).await;
    assert_eq!(
        outcome,
        Err(RequestError::Handler {
            nest: "D".into(),
            reason: "branch snapped".into()
        })
    );

    let outcome = route_request(a, &"D".into(), "unheard-of", Payload::Empty).await;
    assert_eq!(outcome, Err(RequestError::UnknownType("unheard-of".into())));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_other_component_is_unreachable() {
    let network = converged(&[("A", "B"), ("X", "Y")]).await;
    let a = network.nest("A").unwrap();
    let sent_before = network.stats().sent();

    let outcome = route_request(a, &"Y".into(), kinds::NOTE, Payload::text("hi")).await;
    assert!(matches!(outcome, Err(RequestError::Unreachable { .. })));
    assert_eq!(network.stats().sent(), sent_before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_disagreeing_tables_do_not_bounce() {
    let network = network(&[("A", "B"), ("B", "X")], NetworkConfig::reliable());
    let a = network.nest("A").unwrap();
    let b = network.nest("B").unwrap();

    // Stale views: each believes the other is next to C
    a.with_state(|state| state.connections.merge(&"B".into(), &["A".into(), "C".into()]));
    b.with_state(|state| state.connections.merge(&"A".into(), &["B".into(), "C".into()]));

    let outcome = route_request(a, &"C".into(), kinds::NOTE, Payload::text("hi")).await;
    assert_eq!(
        outcome,
        Err(RequestError::Unreachable {
            from: "B".into(),
            to: "C".into()
        })
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(network.stats().sent_of(kinds::ROUTE), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_first_hop_does_not_depend_on_announcer() {
    let edges = [
        ("A", "B"),
        ("A", "C"),
        ("B", "D"),
        ("C", "D"),
        ("D", "E"),
        ("C", "E"),
    ];

    // One network where A announces first, one where E does
    let forward = network(&edges, NetworkConfig::reliable());
    let backward = network(&edges, NetworkConfig::reliable());
    for name in ["A", "B", "C", "D", "E"] {
        announce(forward.nest(name).unwrap());
    }
    for name in ["E", "D", "C", "B", "A"] {
        announce(backward.nest(name).unwrap());
    }
    wait_for_topology(&forward, CONVERGENCE).await.unwrap();
    wait_for_topology(&backward, CONVERGENCE).await.unwrap();

    for from in forward.names() {
        for to in forward.names() {
            if from == to {
                continue;
            }
            let hop_forward = find_route(&from, &to, &forward.nest(from.as_str()).unwrap().topology());
            let hop_backward =
                find_route(&from, &to, &backward.nest(from.as_str()).unwrap().topology());
            // Any nest's table routes the same way once converged
            let hop_elsewhere =
                find_route(&from, &to, &forward.nest(to.as_str()).unwrap().topology());
            assert!(hop_forward.is_some());
            assert_eq!(hop_forward, hop_backward);
            assert_eq!(hop_forward, hop_elsewhere);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_update_is_not_rebroadcast() {
    let network = converged(&RING).await;
    // Let the last replies of the discovery flood land
    tokio::time::sleep(Duration::from_millis(100)).await;
    let sent_before = network.stats().sent_of(kinds::CONNECTIONS);

    let c = network.nest("C").unwrap();
    let update = Payload::Connections {
        name: "A".into(),
        neighbors: vec!["B".into(), "F".into()],
    };
    let outcome = c
        .dispatch_local(kinds::CONNECTIONS, update, &"B".into())
        .await;
    assert_eq!(outcome, Ok(Payload::Empty));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(network.stats().sent_of(kinds::CONNECTIONS), sent_before);
    assert!(is_converged(&network));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_converges_and_routes_under_loss() {
    let network = network(&RING, NetworkConfig::default());
    start_topology(&network);
    wait_for_topology(&network, CONVERGENCE).await.unwrap();

    let a = network.nest("A").unwrap();
    let mut answered = 0;
    for _ in 0..10 {
        if route_request(a, &"D".into(), kinds::PING, Payload::Empty)
            .await
            .is_ok()
        {
            answered += 1;
        }
    }
    assert!(answered >= 8, "only {answered} of 10 routed pings answered");
}
