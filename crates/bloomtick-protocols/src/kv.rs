//! Key-value replica over a map of lattice values.
//!
//! Puts merge into the stored value, so a key only ever grows. Every put
//! and get is answered on the response channel one tick later.
//!
//! A key keeps the lattice variant it was first written with. Puts that
//! arrive together are taken in `req_id` order, and a put that cannot be
//! merged into the key's value is dropped and acknowledged with
//! `stored: false`.
//!
//! [`replicated_kv`] adds state transfer: a [`KvReplReq`] arriving at a
//! replica makes it ship a snapshot of its map to `target_addr`, and an
//! arriving [`KvReplMap`] is merged whole into the local map.

use bloomtick_lattice::{LMap, LatticeValue, Relation};
use bloomtick_runtime::{Addressed, Channel, Program, Rel, Result};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{BTreeMap, Entry};
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KvPut {
    pub req_id: i64,
    pub addr: String,
    pub client_addr: String,
    pub key: String,
    pub val: LatticeValue,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KvPutResponse {
    pub req_id: i64,
    pub addr: String,
    pub replica_addr: String,
    /// `false` when the put conflicted with the key's lattice variant.
    pub stored: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KvGet {
    pub req_id: i64,
    pub addr: String,
    pub client_addr: String,
    pub key: String,
}

/// `val` is `None` when the replica has never seen the key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KvGetResponse {
    pub req_id: i64,
    pub addr: String,
    pub replica_addr: String,
    pub key: String,
    pub val: Option<LatticeValue>,
}

/// Ask the replica at `addr` to send its map to `target_addr`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KvReplReq {
    pub addr: String,
    pub target_addr: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KvReplMap {
    pub addr: String,
    pub map: LMap<LatticeValue>,
}

macro_rules! addressed {
    ($($ty:ty),* $(,)?) => {
        $(impl Addressed for $ty {
            fn addr(&self) -> &str {
                &self.addr
            }
        })*
    };
}

addressed!(KvPut, KvPutResponse, KvGet, KvGetResponse, KvReplReq, KvReplMap);

/// The four KV channels.
#[derive(Clone, Copy, Debug)]
pub struct KvProtocol {
    pub put: Channel<KvPut>,
    pub put_response: Channel<KvPutResponse>,
    pub get: Channel<KvGet>,
    pub get_response: Channel<KvGetResponse>,
}

/// Declare the KV channels without any replica logic, e.g. for a client.
pub fn kv_protocol(program: &mut Program, prefix: &str) -> Result<KvProtocol> {
    Ok(KvProtocol {
        put: program.declare_channel(format!("{prefix}KVPut"))?,
        put_response: program.declare_channel(format!("{prefix}KVPutResponse"))?,
        get: program.declare_channel(format!("{prefix}KVGet"))?,
        get_response: program.declare_channel(format!("{prefix}KVGetResponse"))?,
    })
}

#[derive(Clone, Copy, Debug)]
pub struct Kv {
    pub protocol: KvProtocol,
    pub map: Rel<LMap<LatticeValue>>,
}

impl Kv {
    pub fn value<'a>(&self, program: &'a Program, key: &str) -> Option<&'a LatticeValue> {
        program.get(self.map).at(key)
    }
}

/// Declare a KV replica under `prefix`.
pub fn kv(program: &mut Program, prefix: &str) -> Result<Kv> {
    let protocol = kv_protocol(program, prefix)?;
    let map = program.declare_map::<LatticeValue>(format!("{prefix}kvMap"))?;
    let map = program.mark_output(map)?;
    let me = program.addr().to_owned();

    let here = me.clone();
    program
        .join(protocol.put)
        .select(move |facts, put: KvPut| {
            (put.addr == here).then(|| KvPutResponse {
                req_id: put.req_id,
                stored: facts
                    .get(map)
                    .at(&put.key)
                    .map_or(true, |stored| stored.check_merge(&put.val).is_ok()),
                addr: put.client_addr,
                replica_addr: here.clone(),
            })
        })
        .into_next(protocol.put_response)?;

    let here = me.clone();
    program
        .join(protocol.get)
        .select(move |facts, get: KvGet| {
            (get.addr == here).then(|| KvGetResponse {
                req_id: get.req_id,
                addr: get.client_addr,
                replica_addr: here.clone(),
                val: facts.get(map).at(&get.key).cloned(),
                key: get.key,
            })
        })
        .into_next(protocol.get_response)?;

    let here = me;
    program
        .join(())
        .select_merge(move |facts, ()| {
            let puts = facts
                .get(protocol.put)
                .iter()
                .filter(|put| put.addr == here)
                .map(|put| (put.key.as_str(), &put.val));
            let merged = merge_compatible(facts.get(map), puts);
            (!merged.is_empty()).then_some(merged)
        })
        .into(map)?;

    Ok(Kv { protocol, map })
}

/// Merge `writes`, in order, on top of the stored values of the keys they
/// touch. A write that conflicts with the stored value or with an earlier
/// write to the same key is skipped. Only touched keys are returned.
fn merge_compatible<'a>(
    stored: &LMap<LatticeValue>,
    writes: impl IntoIterator<Item = (&'a str, &'a LatticeValue)>,
) -> LMap<LatticeValue> {
    let mut merged: BTreeMap<String, LatticeValue> = BTreeMap::new();
    for (key, val) in writes {
        let current = match merged.entry(key.to_owned()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => match stored.at(key) {
                Some(existing) => entry.insert(existing.clone()),
                None => {
                    entry.insert(val.clone());
                    continue;
                }
            },
        };
        if let Err(err) = current.try_merge(val) {
            warn!(key, error = %err, "dropping write of a different lattice kind");
        }
    }
    merged.into_iter().collect()
}

#[derive(Clone, Copy, Debug)]
pub struct ReplicatedKv {
    pub kv: Kv,
    pub repl_req: Channel<KvReplReq>,
    pub repl_map: Channel<KvReplMap>,
}

/// Declare a KV replica that also answers state-transfer requests.
pub fn replicated_kv(program: &mut Program, prefix: &str) -> Result<ReplicatedKv> {
    let kv = kv(program, prefix)?;
    let repl_req = program.declare_channel::<KvReplReq>(format!("{prefix}KVReplReq"))?;
    let repl_map = program.declare_channel::<KvReplMap>(format!("{prefix}KVReplMap"))?;
    let map = kv.map;
    let me = program.addr().to_owned();

    let here = me.clone();
    program
        .join(repl_req)
        .select(move |facts, req: KvReplReq| {
            (req.addr == here).then(|| KvReplMap {
                addr: req.target_addr,
                map: facts.get(map).snapshot(),
            })
        })
        .into_next(repl_map)?;

    let here = me;
    program
        .join(())
        .select_merge(move |facts, ()| {
            let entries = facts
                .get(repl_map)
                .iter()
                .filter(|msg| msg.addr == here)
                .flat_map(|msg| msg.map.iter().map(|(key, val)| (key.as_str(), val)));
            let merged = merge_compatible(facts.get(map), entries);
            (!merged.is_empty()).then_some(merged)
        })
        .into(map)?;

    Ok(ReplicatedKv {
        kv,
        repl_req,
        repl_map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloomtick_lattice::{LBool, LMax, LSet};

    fn put(req_id: i64, addr: &str, key: &str, val: LatticeValue) -> KvPut {
        KvPut {
            req_id,
            addr: addr.into(),
            client_addr: "client".into(),
            key: key.into(),
            val,
        }
    }

    #[test]
    fn test_put_then_get() {
        let mut program = Program::new("replica");
        let kv = kv(&mut program, "").unwrap();

        program.send(kv.protocol.put, put(1, "replica", "k", LMax::from(3).into()));
        program.tick().unwrap();
        assert_eq!(kv.value(&program, "k"), Some(&LatticeValue::from(LMax::from(3))));

        program.send(
            kv.protocol.get,
            KvGet {
                req_id: 2,
                addr: "replica".into(),
                client_addr: "client".into(),
                key: "k".into(),
            },
        );
        program.tick().unwrap();
        program.tick().unwrap();

        let responses = program.get(kv.protocol.get_response);
        assert_eq!(responses.len(), 1);
        let response = responses.iter().next().unwrap();
        assert_eq!(response.addr, "client");
        assert_eq!(response.replica_addr, "replica");
        assert_eq!(response.val, Some(LMax::from(3).into()));
    }

    #[test]
    fn test_put_is_acknowledged_next_tick() {
        let mut program = Program::new("replica");
        let kv = kv(&mut program, "").unwrap();

        program.send(kv.protocol.put, put(7, "replica", "k", LMax::from(1).into()));
        let report = program.tick().unwrap();
        assert_eq!(report.queued, 1);
        assert!(program.get(kv.protocol.put_response).is_empty());

        program.tick().unwrap();
        let acks: Vec<_> = program.get(kv.protocol.put_response).iter().cloned().collect();
        assert_eq!(
            acks,
            vec![KvPutResponse {
                req_id: 7,
                addr: "client".into(),
                replica_addr: "replica".into(),
                stored: true,
            }]
        );
    }

    #[test]
    fn test_puts_merge() {
        let mut program = Program::new("replica");
        let kv = kv(&mut program, "").unwrap();

        program.send(kv.protocol.put, put(1, "replica", "k", LSet::one("x".to_string()).into()));
        program.send(kv.protocol.put, put(2, "replica", "k", LSet::one("y".to_string()).into()));
        program.tick().unwrap();

        let stored = kv.value(&program, "k").and_then(LatticeValue::as_set).unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn test_mismatched_put_is_dropped() {
        let mut program = Program::new("replica");
        let kv = kv(&mut program, "").unwrap();

        program.send(kv.protocol.put, put(1, "replica", "k", LMax::from(5).into()));
        program.tick().unwrap();
        program.send(kv.protocol.put, put(2, "replica", "k", LSet::one("x".to_string()).into()));
        program.tick().unwrap();

        assert_eq!(kv.value(&program, "k").and_then(LatticeValue::as_int), Some(5));
    }

    fn acks(program: &Program, kv: &Kv) -> Vec<(i64, bool)> {
        program
            .get(kv.protocol.put_response)
            .iter()
            .map(|ack| (ack.req_id, ack.stored))
            .collect()
    }

    #[test]
    fn test_conflicting_puts_in_one_tick_keep_lowest_req_id() {
        let mut program = Program::new("replica");
        let kv = kv(&mut program, "").unwrap();

        program.send(kv.protocol.put, put(2, "replica", "k", LSet::one("x".to_string()).into()));
        program.send(kv.protocol.put, put(1, "replica", "k", LMax::from(5).into()));
        program.send(kv.protocol.put, put(3, "replica", "k", LMax::from(9).into()));
        program.tick().unwrap();
        assert_eq!(kv.value(&program, "k").and_then(LatticeValue::as_int), Some(9));

        program.tick().unwrap();
        assert_eq!(acks(&program, &kv), vec![(1, true), (2, false), (3, true)]);
    }

    #[test]
    fn test_dropped_put_is_not_acknowledged_as_stored() {
        let mut program = Program::new("replica");
        let kv = kv(&mut program, "").unwrap();

        program.send(kv.protocol.put, put(1, "replica", "k", LMax::from(5).into()));
        program.tick().unwrap();
        program.send(kv.protocol.put, put(2, "replica", "k", LSet::one("x".to_string()).into()));
        program.tick().unwrap();
        program.tick().unwrap();

        assert_eq!(acks(&program, &kv), vec![(2, false)]);
        assert_eq!(kv.value(&program, "k").and_then(LatticeValue::as_int), Some(5));
    }

    #[test]
    fn test_nested_conflict_is_dropped() {
        let mut program = Program::new("replica");
        let kv = kv(&mut program, "").unwrap();

        let mut first = LMap::new();
        first.insert("x", LatticeValue::from(LMax::from(1)));
        let mut second = LMap::new();
        second.insert("x", LatticeValue::from(LSet::one("1".to_string())));
        program.send(kv.protocol.put, put(1, "replica", "k", first.clone().into()));
        program.send(kv.protocol.put, put(2, "replica", "k", second.into()));
        program.tick().unwrap();

        assert_eq!(kv.value(&program, "k"), Some(&LatticeValue::from(first)));
    }

    #[test]
    fn test_messages_for_other_nodes_are_ignored() {
        let mut program = Program::new("replica");
        let kv = kv(&mut program, "").unwrap();

        program.send(kv.protocol.put, put(1, "elsewhere", "k", LMax::from(3).into()));
        program.tick().unwrap();
        assert_eq!(kv.value(&program, "k"), None);
        assert_eq!(program.pending_len(), 0);
    }

    #[test]
    fn test_repl_request_ships_snapshot() {
        let mut program = Program::new("r1");
        let rkv = replicated_kv(&mut program, "").unwrap();

        program.send(rkv.kv.protocol.put, put(1, "r1", "k", LMax::from(9).into()));
        program.send(
            rkv.repl_req,
            KvReplReq {
                addr: "r1".into(),
                target_addr: "r2".into(),
            },
        );
        program.tick().unwrap();
        program.tick().unwrap();

        let shipped: Vec<_> = program.get(rkv.repl_map).iter().cloned().collect();
        assert_eq!(shipped.len(), 1);
        assert_eq!(shipped[0].addr, "r2");
        assert_eq!(shipped[0].map.at("k"), Some(&LMax::from(9).into()));
    }

    #[test]
    fn test_incoming_map_is_merged() {
        let mut program = Program::new("r2");
        let rkv = replicated_kv(&mut program, "").unwrap();

        let mut map = LMap::new();
        map.insert("k", LatticeValue::from(LMax::from(4)));
        program.send(
            rkv.repl_map,
            KvReplMap {
                addr: "r2".into(),
                map,
            },
        );
        program.tick().unwrap();
        assert_eq!(rkv.kv.value(&program, "k").and_then(LatticeValue::as_int), Some(4));
    }

    #[test]
    fn test_conflicting_replica_maps_are_filtered() {
        let mut program = Program::new("r2");
        let rkv = replicated_kv(&mut program, "").unwrap();
        program.send(rkv.kv.protocol.put, put(1, "r2", "local", LMax::from(1).into()));
        program.tick().unwrap();

        let mut from_r1 = LMap::new();
        from_r1.insert("local", LatticeValue::from(LSet::one("a".to_string())));
        from_r1.insert("shared", LatticeValue::from(LMax::from(4)));
        from_r1.insert("only_r1", LatticeValue::from(LBool::from(true)));
        let mut from_r3 = LMap::new();
        from_r3.insert("shared", LatticeValue::from(LSet::one("b".to_string())));
        for map in [from_r1, from_r3] {
            program.send(
                rkv.repl_map,
                KvReplMap {
                    addr: "r2".into(),
                    map,
                },
            );
        }
        program.tick().unwrap();

        let stored = program.get(rkv.kv.map);
        assert_eq!(stored.at("local").and_then(LatticeValue::as_int), Some(1));
        assert_eq!(stored.at("only_r1").and_then(LatticeValue::as_bool), Some(true));
        // Maps arriving together are taken in order, so r1's counter wins.
        assert_eq!(stored.at("shared").and_then(LatticeValue::as_int), Some(4));
        assert_eq!(stored.len(), 3);
    }

    #[test]
    fn test_messages_serialize() {
        let msg = put(1, "r1", "k", LMax::from(2).into());
        let json = serde_json::to_string(&msg).unwrap();
        let back: KvPut = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
