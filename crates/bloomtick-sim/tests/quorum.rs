//! Message-driven quorum across a simulated cluster
//!
//! Voters send votes to a coordinator; the coordinator reports to a client
//! node once enough distinct voters have been heard.

use bloomtick_protocols::{
    addressed_quorum, quorum_protocol, AddressedQuorum, QuorumProtocol, QuorumResult, QuorumVote,
};
use bloomtick_runtime::Program;
use bloomtick_sim::{Cluster, NetworkConfig};

struct Setup {
    cluster: Cluster,
    coordinator: AddressedQuorum,
    client: QuorumProtocol,
    voters: Vec<(String, QuorumProtocol)>,
}

fn setup(size: i64, voters: usize, config: NetworkConfig) -> Setup {
    let mut cluster = Cluster::new(config);

    let mut program = Program::new("coordinator");
    let coordinator = addressed_quorum(&mut program, "", size, "client").unwrap();
    cluster.add_node(program).unwrap();

    let mut program = Program::new("client");
    let client = quorum_protocol(&mut program, "").unwrap();
    cluster.add_node(program).unwrap();

    let voters = (0..voters)
        .map(|i| {
            let addr = format!("voter_{}", i);
            let mut program = Program::new(addr.clone());
            let protocol = quorum_protocol(&mut program, "").unwrap();
            cluster.add_node(program).unwrap();
            (addr, protocol)
        })
        .collect();

    cluster.route::<QuorumVote>("QuorumVote");
    cluster.route::<QuorumResult>("QuorumResult");
    Setup {
        cluster,
        coordinator,
        client,
        voters,
    }
}

fn cast(setup: &mut Setup, voter: usize) {
    let (addr, protocol) = &setup.voters[voter];
    let program = setup.cluster.node_mut(addr).unwrap();
    program.send(
        protocol.vote,
        QuorumVote {
            addr: "coordinator".into(),
            voter: addr.clone(),
        },
    );
}

fn client_notified(cluster: &Cluster, client: &QuorumProtocol) -> bool {
    let program = cluster.node("client").unwrap();
    program.get(client.result).contains(&QuorumResult {
        addr: "client".into(),
    })
}

#[test]
fn test_result_reaches_client_after_quorum() {
    let mut setup = setup(2, 3, NetworkConfig::default());
    cast(&mut setup, 0);
    cast(&mut setup, 1);

    let client = setup.client;
    let steps = setup
        .cluster
        .run_until(10, |c| client_notified(c, &client))
        .unwrap();
    assert!(steps.is_some(), "client never heard the result");

    let coordinator = setup.cluster.node("coordinator").unwrap();
    assert!(setup.coordinator.is_reached(coordinator));
    assert_eq!(setup.coordinator.tally(coordinator), 2);
}

#[test]
fn test_no_result_below_quorum() {
    let mut setup = setup(3, 3, NetworkConfig::default());
    cast(&mut setup, 0);
    cast(&mut setup, 1);
    setup.cluster.run(6).unwrap();

    let coordinator = setup.cluster.node("coordinator").unwrap();
    assert_eq!(setup.coordinator.tally(coordinator), 2);
    assert!(!setup.coordinator.is_reached(coordinator));
    assert!(!client_notified(&setup.cluster, &setup.client));
}

#[test]
fn test_repeated_votes_count_once() {
    let mut setup = setup(2, 2, NetworkConfig::with_dups(0.8).seeded(3));
    for _ in 0..3 {
        cast(&mut setup, 0);
        setup.cluster.step().unwrap();
    }
    setup.cluster.run(3).unwrap();

    let coordinator = setup.cluster.node("coordinator").unwrap();
    assert_eq!(setup.coordinator.tally(coordinator), 1);
    assert!(!client_notified(&setup.cluster, &setup.client));
}
