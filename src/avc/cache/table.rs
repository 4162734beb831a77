/*!
 * Cache Table
 * Fixed-size chained hash table over a pre-allocated node arena
 *
 * Nodes live in a single arena allocated at construction and are addressed by
 * [`NodeHandle`]. Each slot holds the head of an intrusive singly-linked chain;
 * unused nodes sit on a free stack. When the pool is exhausted a clock
 * (second-chance) scan reclaims the first node whose `used` bit is clear.
 */

use crate::avc::types::{AccessVectorDecision, AvcError, AvcResult};
use crate::core::types::{SecurityClass, SeqNo, Sid, SECSID_NULL};

/// Index of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(u32);

impl NodeHandle {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AvcKey {
    pub ssid: Sid,
    pub tsid: Sid,
    pub tclass: SecurityClass,
}

impl AvcKey {
    pub const NULL: AvcKey = AvcKey {
        ssid: SECSID_NULL,
        tsid: SECSID_NULL,
        tclass: 0,
    };

    pub fn new(ssid: Sid, tsid: Sid, tclass: SecurityClass) -> Self {
        Self { ssid, tsid, tclass }
    }
}

/// Cached decision for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvcEntry {
    pub key: AvcKey,
    pub avd: AccessVectorDecision,
    /// Second-chance bit consulted by reclaim
    pub used: bool,
}

impl AvcEntry {
    const EMPTY: AvcEntry = AvcEntry {
        key: AvcKey::NULL,
        avd: AccessVectorDecision {
            allowed: 0,
            decided: 0,
            auditallow: 0,
            auditdeny: 0,
            seqno: 0,
        },
        used: false,
    };
}

#[derive(Debug, Clone)]
struct CacheNode {
    entry: AvcEntry,
    next: Option<NodeHandle>,
    /// Linked into a slot chain
    live: bool,
}

/// Hash-chain occupancy summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HashStats {
    pub entries: u32,
    pub slots_used: usize,
    pub slots_total: usize,
    pub longest_chain: usize,
}

/// Hash table of cache nodes
///
/// Not synchronized; the owner wraps it in the cache lock.
pub struct CacheTable {
    nodes: Vec<CacheNode>,
    slots: Vec<Option<NodeHandle>>,
    free: Vec<NodeHandle>,
    lru_hint: usize,
    active_nodes: u32,
    latest_notif: SeqNo,
}

impl CacheTable {
    /// Create a table with `slot_count` chains (power of two) and `max_nodes` nodes
    pub fn new(slot_count: usize, max_nodes: usize) -> Self {
        assert!(
            slot_count.is_power_of_two(),
            "slot count must be a power of two"
        );

        let nodes = vec![
            CacheNode {
                entry: AvcEntry::EMPTY,
                next: None,
                live: false,
            };
            max_nodes
        ];
        // Reverse so the lowest handles are claimed first
        let free = (0..max_nodes as u32).rev().map(NodeHandle).collect();

        Self {
            nodes,
            slots: vec![None; slot_count],
            free,
            lru_hint: 0,
            active_nodes: 0,
            latest_notif: 0,
        }
    }

    #[inline]
    pub fn hash(&self, key: &AvcKey) -> usize {
        let h = key.ssid ^ (key.tsid << 2) ^ ((key.tclass as u32) << 4);
        (h as usize) & (self.slots.len() - 1)
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn max_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn active_nodes(&self) -> u32 {
        self.active_nodes
    }

    pub fn free_nodes(&self) -> usize {
        self.free.len()
    }

    pub fn lru_hint(&self) -> usize {
        self.lru_hint
    }

    pub fn latest_notif(&self) -> SeqNo {
        self.latest_notif
    }

    /// Raise the latest notification sequence; never lowers it
    pub fn update_latest_notif(&mut self, seqno: SeqNo) {
        if seqno > self.latest_notif {
            self.latest_notif = seqno;
        }
    }

    /// Find the node for `key`, returning it with the number of chain probes
    pub fn search(&mut self, key: &AvcKey) -> (Option<NodeHandle>, u32) {
        let mut probes = 0;
        let mut cur = self.slots[self.hash(key)];

        while let Some(handle) = cur {
            probes += 1;
            let node = &mut self.nodes[handle.index()];
            if node.entry.key == *key {
                node.entry.used = true;
                return (Some(handle), probes);
            }
            cur = node.next;
        }

        (None, probes)
    }

    /// Take a node for `key` and link it at the head of its chain
    pub fn claim(&mut self, key: AvcKey) -> AvcResult<NodeHandle> {
        let handle = match self.free.pop() {
            Some(handle) => handle,
            None => self.reclaim()?,
        };

        let slot = self.hash(&key);
        let head = self.slots[slot];
        let node = &mut self.nodes[handle.index()];
        node.entry = AvcEntry {
            key,
            avd: AccessVectorDecision::default(),
            used: true,
        };
        node.next = head;
        node.live = true;
        self.slots[slot] = Some(handle);
        self.active_nodes += 1;

        Ok(handle)
    }

    /// Unlink the first node without a second chance, starting at `lru_hint`
    ///
    /// Two full passes at most: the first pass clears every `used` bit it
    /// skips, so the second pass finds a victim whenever any node is chained.
    pub fn reclaim(&mut self) -> AvcResult<NodeHandle> {
        let slot_count = self.slots.len();
        let mut slot = self.lru_hint;

        for _pass in 0..2 {
            for _ in 0..slot_count {
                let mut prev: Option<NodeHandle> = None;
                let mut cur = self.slots[slot];

                while let Some(handle) = cur {
                    let node = &mut self.nodes[handle.index()];
                    if !node.entry.used {
                        let next = node.next;
                        node.next = None;
                        node.live = false;
                        match prev {
                            Some(p) => self.nodes[p.index()].next = next,
                            None => self.slots[slot] = next,
                        }
                        self.lru_hint = slot;
                        self.active_nodes -= 1;
                        return Ok(handle);
                    }
                    node.entry.used = false;
                    prev = cur;
                    cur = node.next;
                }

                slot = (slot + 1) & (slot_count - 1);
            }
        }

        Err(AvcError::CapacityExhausted {
            max_nodes: self.nodes.len(),
        })
    }

    /// Store a decision, refusing ones computed against superseded policy
    pub fn insert(&mut self, key: AvcKey, avd: AccessVectorDecision) -> AvcResult<NodeHandle> {
        if avd.seqno < self.latest_notif {
            return Err(AvcError::StaleSequence {
                seqno: avd.seqno,
                latest: self.latest_notif,
            });
        }

        // One node per key; a newer decision already cached is kept
        if let Some(handle) = self.find(&key) {
            let entry = &mut self.nodes[handle.index()].entry;
            if avd.seqno >= entry.avd.seqno {
                entry.avd = avd;
            }
            entry.used = true;
            return Ok(handle);
        }

        let handle = self.claim(key)?;
        self.nodes[handle.index()].entry.avd = avd;
        Ok(handle)
    }

    fn find(&self, key: &AvcKey) -> Option<NodeHandle> {
        let mut cur = self.slots[self.hash(key)];
        while let Some(handle) = cur {
            let node = &self.nodes[handle.index()];
            if node.entry.key == *key {
                return Some(handle);
            }
            cur = node.next;
        }
        None
    }

    /// Entry behind a handle, if the node is still chained
    pub fn entry(&self, handle: NodeHandle) -> Option<&AvcEntry> {
        self.nodes
            .get(handle.index())
            .filter(|node| node.live)
            .map(|node| &node.entry)
    }

    pub fn entry_mut(&mut self, handle: NodeHandle) -> Option<&mut AvcEntry> {
        self.nodes
            .get_mut(handle.index())
            .filter(|node| node.live)
            .map(|node| &mut node.entry)
    }

    /// Apply `f` to every chained entry for which `pred` holds
    pub fn for_each_matching<P, F>(&mut self, mut pred: P, mut f: F) -> usize
    where
        P: FnMut(&AvcKey) -> bool,
        F: FnMut(&mut AvcEntry),
    {
        let mut touched = 0;
        for slot in 0..self.slots.len() {
            let mut cur = self.slots[slot];
            while let Some(handle) = cur {
                let node = &mut self.nodes[handle.index()];
                if pred(&node.entry.key) {
                    f(&mut node.entry);
                    touched += 1;
                }
                cur = node.next;
            }
        }
        touched
    }

    /// Return every node to the free list and clear its contents
    ///
    /// `latest_notif` survives; it only ever moves forward.
    pub fn flush(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.free.clear();
        for (index, node) in self.nodes.iter_mut().enumerate().rev() {
            node.entry = AvcEntry::EMPTY;
            node.next = None;
            node.live = false;
            self.free.push(NodeHandle(index as u32));
        }
        self.lru_hint = 0;
        self.active_nodes = 0;
    }

    /// Chain occupancy summary
    pub fn hash_eval(&self) -> HashStats {
        let mut slots_used = 0;
        let mut longest_chain = 0;

        for head in &self.slots {
            let mut len = 0;
            let mut cur = *head;
            while let Some(handle) = cur {
                len += 1;
                cur = self.nodes[handle.index()].next;
            }
            if len > 0 {
                slots_used += 1;
                longest_chain = longest_chain.max(len);
            }
        }

        HashStats {
            entries: self.active_nodes,
            slots_used,
            slots_total: self.slots.len(),
            longest_chain,
        }
    }

    /// Number of nodes reachable from the slot chains
    #[cfg(test)]
    fn chained_nodes(&self) -> u32 {
        let mut count = 0;
        for head in &self.slots {
            let mut cur = *head;
            while let Some(handle) = cur {
                count += 1;
                cur = self.nodes[handle.index()].next;
            }
        }
        count
    }
}
