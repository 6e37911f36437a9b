//! Multi-node scenarios over an in-memory message bus.

use std::collections::BTreeMap;

use delta_chain::blockchain::{Coin, SignedBlock};
use delta_chain::transaction::{Action, SignedTransaction, Transaction, Transfer};
use delta_chain::wallet::KeyPair;
use delta_chain::{ChainConfig, Message, Node, NodeConfig, Outgoing};

const HEAVY: Coin = 1_000_000;

fn config(allocations: &[(&KeyPair, Coin)]) -> ChainConfig {
    ChainConfig {
        chain_id: "test-net".to_string(),
        genesis_allocations: allocations
            .iter()
            .map(|(keys, amount)| (keys.address().to_string(), *amount))
            .collect(),
        block_mine_delay: 10,
        delta_max: HEAVY,
        delta_up: u64::MAX,
        delta_down: 0,
        ..ChainConfig::default()
    }
}

fn settings() -> NodeConfig {
    NodeConfig {
        sync_interval_secs: 0,
        ..NodeConfig::default()
    }
}

fn transfer(from: &KeyPair, to: &str, amount: Coin, fee: Coin, creation: i64) -> SignedTransaction {
    SignedTransaction::sign(
        Transaction {
            action: Action::Transfer(Transfer {
                from: from.address().to_string(),
                to: to.to_string(),
                amount,
                message: String::new(),
            }),
            fee,
            creation,
            expiry: creation + 600,
        },
        from,
    )
}

/// Nodes keyed by name; the name doubles as the peer id others see.
struct Net {
    nodes: BTreeMap<String, Node>,
}

impl Net {
    fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }

    fn add(&mut self, name: &str, config: &ChainConfig, keys: &KeyPair) {
        let node = Node::new(config.clone(), settings(), keys.clone()).unwrap();
        self.nodes.insert(name.to_string(), node);
    }

    fn connect(&mut self, a: &str, b: &str) {
        self.node_mut(a).add_peer(b);
        self.node_mut(b).add_peer(a);
    }

    fn node(&self, name: &str) -> &Node {
        &self.nodes[name]
    }

    fn node_mut(&mut self, name: &str) -> &mut Node {
        self.nodes.get_mut(name).unwrap()
    }

    fn tick(&mut self, name: &str, now: i64) {
        self.node_mut(name).tick(now);
        self.pump(now, |_, _, message| message);
    }

    /// Deliver queued messages until every outbox is empty, letting
    /// `intercept` rewrite each one in flight.
    fn pump(&mut self, now: i64, mut intercept: impl FnMut(&str, &str, Message) -> Message) {
        for _ in 0..1_000 {
            let mut delivered = false;
            let names: Vec<String> = self.nodes.keys().cloned().collect();
            for from in names {
                for effect in self.node_mut(&from).drain_outbox() {
                    delivered = true;
                    match effect {
                        Outgoing::Send { peer, message } => {
                            let message = intercept(&from, &peer, message);
                            if let Some(target) = self.nodes.get_mut(&peer) {
                                target.handle_message(&from, message, now);
                            }
                        }
                        Outgoing::Drop { peer } => {
                            if let Some(target) = self.nodes.get_mut(&peer) {
                                target.remove_peer(&from);
                            }
                        }
                    }
                }
            }
            if !delivered {
                return;
            }
        }
        panic!("message bus did not settle");
    }
}

#[test]
fn heavier_chain_beats_longer_chain() {
    let a = KeyPair::generate();
    let b = KeyPair::generate();
    let c = KeyPair::generate();
    let d = KeyPair::generate();
    let cfg = config(&[(&a, HEAVY), (&b, 1), (&d, 1_000)]);

    let mut net = Net::new();
    net.add("a", &cfg, &a);
    net.add("b", &cfg, &b);
    net.add("c", &cfg, &c);

    // isolated forks: a mines three heavy blocks, b four light ones and
    // seals d's transfer in its first block
    for now in [10, 20, 30] {
        net.node_mut("a").mine_block(now).unwrap().unwrap();
    }
    net.node_mut("b")
        .process_transaction(transfer(&d, "x", 10, 1, 5), 5)
        .unwrap();
    for now in [10, 20, 30, 40] {
        net.node_mut("b").mine_block(now).unwrap().unwrap();
    }
    assert!(net.node("b").stores().pool.is_empty());
    assert!(net.node("b").head().block_number > net.node("a").head().block_number);
    assert!(net.node("b").head().c_sum < net.node("a").head().c_sum);

    // an observer follows the heavier fork
    net.connect("c", "a");
    net.connect("c", "b");
    net.tick("c", 100);
    net.tick("c", 101);
    assert!(!net.node("c").is_syncing());
    assert_eq!(net.node("c").head_hash(), net.node("a").head_hash());
    assert_eq!(net.node("c").balance(d.address()), 1_000);

    // the light miner reorganizes onto it and gets its transfer back in the pool
    net.connect("b", "a");
    net.tick("b", 100);
    net.tick("b", 101);
    assert_eq!(net.node("b").head_hash(), net.node("a").head_hash());
    assert_eq!(net.node("b").stores().pool.len(), 1);
    assert_eq!(net.node("b").balance(d.address()), 1_000 - 11);
    assert_eq!(net.node("b").balance("x"), 10);
    assert_eq!(net.node("b").balance(b.address()), 1);

    // nobody is ahead any more
    net.tick("c", 102);
    assert!(!net.node("c").is_syncing());
    assert_eq!(net.node("c").peer_ids().len(), 2);
}

#[test]
fn long_sync_applies_in_partial_spans() {
    let a = KeyPair::generate();
    let c = KeyPair::generate();
    let cfg = ChainConfig {
        header_tr_length: 3,
        block_tr_length: 2,
        block_insert_length: 2,
        ..config(&[(&a, HEAVY)])
    };

    let mut net = Net::new();
    net.add("a", &cfg, &a);
    net.add("c", &cfg, &c);
    for now in [10, 20, 30, 40, 50] {
        net.node_mut("a").mine_block(now).unwrap().unwrap();
    }

    net.connect("c", "a");
    net.tick("c", 100);
    net.tick("c", 101);
    assert!(!net.node("c").is_syncing());
    assert_eq!(net.node("c").head().block_number, 5);
    assert_eq!(net.node("c").head_hash(), net.node("a").head_hash());
    assert_eq!(
        net.node("c").stores().action_log.length(),
        net.node("a").stores().action_log.length()
    );
}

#[test]
fn bad_block_rolls_back_whole_fork_and_drops_peer() {
    let a = KeyPair::generate();
    let b = KeyPair::generate();
    let d = KeyPair::generate();
    let cfg = config(&[(&a, HEAVY), (&b, 1), (&d, 1_000)]);

    let mut net = Net::new();
    net.add("a", &cfg, &a);
    net.add("b", &cfg, &b);
    for now in [10, 20, 30] {
        net.node_mut("a").mine_block(now).unwrap().unwrap();
    }
    net.node_mut("b").mine_block(10).unwrap().unwrap();
    net.node_mut("b")
        .process_transaction(transfer(&d, "x", 10, 1, 12), 12)
        .unwrap();

    let before = net.node("b");
    let length = before.stores().chain.length();
    let head_hash = before.head_hash().to_string();
    let log_length = before.stores().action_log.length();
    let balances = [
        before.balance(b.address()),
        before.balance(d.address()),
        before.balance("x"),
    ];

    net.connect("b", "a");
    net.tick("b", 100);
    net.node_mut("b").tick(101);
    // inflate the miner reward of the last block and re-sign it, so it
    // still matches its announced header and signature
    net.pump(101, |from, _, message| match message {
        Message::BlockchainResponse { mut signed_blocks } if from == "a" => {
            if let Some(last) = signed_blocks.last_mut() {
                let mut block = last.block.clone();
                block.rewards[0].amount += 1_000;
                *last = SignedBlock::sign(block, &a);
            }
            Message::BlockchainResponse { signed_blocks }
        }
        other => other,
    });

    let after = net.node("b");
    assert!(!after.is_syncing());
    assert!(!after.peer_ids().contains(&"a".to_string()));
    assert!(!net.node("a").peer_ids().contains(&"b".to_string()));
    assert_eq!(after.stores().chain.length(), length);
    assert_eq!(after.head_hash(), head_hash);
    assert_eq!(after.stores().action_log.length(), log_length);
    assert_eq!(after.stores().pool.len(), 1);
    assert_eq!(
        [
            after.balance(b.address()),
            after.balance(d.address()),
            after.balance("x"),
        ],
        balances
    );
}

#[test]
fn broadcast_reaches_every_pool_once() {
    let d = KeyPair::generate();
    let cfg = config(&[(&d, 1_000)]);

    let mut net = Net::new();
    for name in ["a", "b", "c"] {
        net.add(name, &cfg, &KeyPair::generate());
    }
    net.connect("a", "b");
    net.connect("b", "c");
    net.connect("a", "c");

    let hash = net
        .node_mut("a")
        .submit_transaction(transfer(&d, "x", 25, 1, 50), 50)
        .unwrap();
    net.pump(50, |_, _, message| message);

    for name in ["a", "b", "c"] {
        let node = net.node(name);
        assert_eq!(node.stores().pool.get_keys(), vec![hash.clone()]);
        assert_eq!(node.balance("x"), 25);
        assert_eq!(node.balance(d.address()), 1_000 - 26);
    }
}
