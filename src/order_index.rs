//! Buckets of tied clients, ordered by score from highest to lowest.
//!
//! The buckets live in an arena-backed AVL tree keyed by score. Every node
//! also counts the buckets in its subtree, so the tree can jump to the k-th
//! highest score in `O(log n)`. A window of `k` buckets starting anywhere
//! therefore costs `O(log n + k)`.
//!
//! In-order traversal yields the *highest* score first: higher scores hang
//! to the left.
//!
//! Inside a bucket, members are keyed by the [`Seq`] stamp handed out when
//! they entered it. Iteration follows arrival order, and a member whose
//! stamp is known leaves a bucket of `k` ties in `O(log k)`.

use smallvec::SmallVec;
use std::{
    cmp::Ordering,
    collections::{btree_map, BTreeMap},
    iter::{Copied, FusedIterator},
};

use crate::record::{ClientId, Score};

/// Arrival stamp of a member inside its bucket. Earlier arrivals have lower stamps.
pub type Seq = u64;

type NodeId = usize;

const NIL: NodeId = NodeId::MAX;

/// Tied members in the order they entered the bucket.
#[derive(Clone, Debug, Default)]
pub struct Bucket {
    members: BTreeMap<Seq, ClientId>,
}

impl Bucket {
    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member ids, earliest arrival first.
    pub fn ids(&self) -> Copied<btree_map::Values<'_, Seq, ClientId>> {
        self.members.values().copied()
    }

    /// Whether `id` sits here under `seq`.
    #[inline]
    pub fn contains(&self, id: ClientId, seq: Seq) -> bool {
        self.members.get(&seq) == Some(&id)
    }

    pub(crate) fn entries(&self) -> btree_map::Iter<'_, Seq, ClientId> {
        self.members.iter()
    }
}

#[derive(Debug)]
struct Node {
    score: Score,
    bucket: Bucket,
    left: NodeId,
    right: NodeId,
    height: u8,
    /// Buckets in this subtree, this node included.
    size: usize,
}

#[derive(Debug)]
pub struct OrderIndex {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    root: NodeId,
    members: usize,
    next_seq: Seq,
}

impl Default for OrderIndex {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NIL,
            members: 0,
            next_seq: 0,
        }
    }
}

/// Position of `a` relative to `b` in descending traversal order.
#[inline]
fn order(a: Score, b: Score) -> Ordering {
    b.cmp(&a)
}

impl OrderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct scores currently held.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.size(self.root)
    }

    /// Number of members across all buckets.
    #[inline]
    pub fn len(&self) -> usize {
        self.members
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root == NIL
    }

    pub fn bucket(&self, score: Score) -> Option<&Bucket> {
        match self.find(score) {
            NIL => None,
            t => Some(&self.node(t).bucket),
        }
    }

    /// Appends `id` to the bucket for `score`, creating the bucket if needed.
    /// Returns the stamp needed to take it out again.
    pub fn insert(&mut self, id: ClientId, score: Score) -> Seq {
        let seq = self.next_seq;
        self.next_seq += 1;
        match self.find(score) {
            NIL => {
                let node = self.alloc(score);
                self.node_mut(node).bucket.members.insert(seq, id);
                self.root = self.attach(self.root, node);
            }
            t => {
                self.node_mut(t).bucket.members.insert(seq, id);
            }
        }
        self.members += 1;
        seq
    }

    /// Removes `id`, stamped `seq`, from the bucket for `score`, dropping the
    /// bucket once it is empty. Returns `false` if it was not there.
    pub fn remove(&mut self, id: ClientId, score: Score, seq: Seq) -> bool {
        let t = self.find(score);
        if t == NIL {
            return false;
        }
        let bucket = &mut self.node_mut(t).bucket;
        if !bucket.contains(id, seq) {
            return false;
        }
        bucket.members.remove(&seq);
        let emptied = bucket.is_empty();
        self.members -= 1;
        if emptied {
            self.root = self.detach(self.root, score);
        }
        true
    }

    /// Moves `id` from the `old` bucket to the back of the `new` one and
    /// returns its new stamp.
    ///
    /// Nothing changes unless `id` is found under `old` with stamp `seq`, so a
    /// member can never end up in zero or two buckets. Moving to the same
    /// score keeps the member where it is.
    pub fn rebucket(&mut self, id: ClientId, seq: Seq, old: Score, new: Score) -> Option<Seq> {
        if old == new {
            return self
                .bucket(old)
                .filter(|bucket| bucket.contains(id, seq))
                .map(|_| seq);
        }
        if !self.remove(id, old, seq) {
            return None;
        }
        Some(self.insert(id, new))
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = NIL;
        self.members = 0;
        self.next_seq = 0;
    }

    /// All buckets, highest score first. Each call starts a fresh pass.
    pub fn buckets_descending(&self) -> BucketsDescending<'_> {
        self.buckets_range(0, self.bucket_count())
    }

    /// The `n` highest buckets, or all of them if there are fewer.
    pub fn n_largest_buckets(&self, n: usize) -> BucketsDescending<'_> {
        self.buckets_range(0, n)
    }

    /// Up to `len` buckets, skipping the `skip` highest ones.
    pub fn buckets_range(&self, skip: usize, len: usize) -> BucketsDescending<'_> {
        let total = self.bucket_count();
        if skip >= total || len == 0 {
            return BucketsDescending {
                index: self,
                stack: SmallVec::new(),
                remaining: 0,
            };
        }
        // Walk down to the bucket at position `skip`, keeping every ancestor
        // that still has to be visited after it.
        let mut stack = SmallVec::new();
        let mut t = self.root;
        let mut k = skip;
        while t != NIL {
            let left_size = self.size(self.node(t).left);
            match k.cmp(&left_size) {
                Ordering::Less => {
                    stack.push(t);
                    t = self.node(t).left;
                }
                Ordering::Equal => {
                    stack.push(t);
                    break;
                }
                Ordering::Greater => {
                    k -= left_size + 1;
                    t = self.node(t).right;
                }
            }
        }
        BucketsDescending {
            index: self,
            stack,
            remaining: len.min(total - skip),
        }
    }

    #[inline]
    fn node(&self, t: NodeId) -> &Node {
        &self.nodes[t]
    }

    #[inline]
    fn node_mut(&mut self, t: NodeId) -> &mut Node {
        &mut self.nodes[t]
    }

    #[inline]
    fn size(&self, t: NodeId) -> usize {
        if t == NIL {
            0
        } else {
            self.node(t).size
        }
    }

    #[inline]
    fn height(&self, t: NodeId) -> i32 {
        if t == NIL {
            0
        } else {
            i32::from(self.node(t).height)
        }
    }

    fn find(&self, score: Score) -> NodeId {
        let mut t = self.root;
        while t != NIL {
            let node = self.node(t);
            t = match order(score, node.score) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return t,
            };
        }
        NIL
    }

    fn alloc(&mut self, score: Score) -> NodeId {
        let node = Node {
            score,
            bucket: Bucket::default(),
            left: NIL,
            right: NIL,
            height: 1,
            size: 1,
        };
        if let Some(t) = self.free.pop() {
            *self.node_mut(t) = node;
            t
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn release(&mut self, t: NodeId) {
        let node = self.node_mut(t);
        node.bucket = Bucket::default();
        node.left = NIL;
        node.right = NIL;
        self.free.push(t);
    }

    fn attach(&mut self, t: NodeId, new: NodeId) -> NodeId {
        if t == NIL {
            return new;
        }
        match order(self.node(new).score, self.node(t).score) {
            Ordering::Less => {
                let left = self.attach(self.node(t).left, new);
                self.node_mut(t).left = left;
            }
            Ordering::Greater => {
                let right = self.attach(self.node(t).right, new);
                self.node_mut(t).right = right;
            }
            Ordering::Equal => unreachable!("bucket for score already exists"),
        }
        self.rebalance(t)
    }

    fn detach(&mut self, t: NodeId, score: Score) -> NodeId {
        if t == NIL {
            return NIL;
        }
        match order(score, self.node(t).score) {
            Ordering::Less => {
                let left = self.detach(self.node(t).left, score);
                self.node_mut(t).left = left;
            }
            Ordering::Greater => {
                let right = self.detach(self.node(t).right, score);
                self.node_mut(t).right = right;
            }
            Ordering::Equal => {
                let (left, right) = (self.node(t).left, self.node(t).right);
                self.release(t);
                if left == NIL {
                    return right;
                }
                if right == NIL {
                    return left;
                }
                let (rest, successor) = self.take_first(right);
                let node = self.node_mut(successor);
                node.left = left;
                node.right = rest;
                return self.rebalance(successor);
            }
        }
        self.rebalance(t)
    }

    /// Unlinks the first node in traversal order; returns `(remaining subtree, unlinked node)`.
    fn take_first(&mut self, t: NodeId) -> (NodeId, NodeId) {
        let left = self.node(t).left;
        if left == NIL {
            let right = self.node(t).right;
            self.node_mut(t).right = NIL;
            return (right, t);
        }
        let (rest, first) = self.take_first(left);
        self.node_mut(t).left = rest;
        (self.rebalance(t), first)
    }

    fn fix(&mut self, t: NodeId) {
        let (left, right) = (self.node(t).left, self.node(t).right);
        let height = 1 + self.height(left).max(self.height(right));
        let size = 1 + self.size(left) + self.size(right);
        let node = self.node_mut(t);
        node.height = height as u8;
        node.size = size;
    }

    #[inline]
    fn balance(&self, t: NodeId) -> i32 {
        self.height(self.node(t).left) - self.height(self.node(t).right)
    }

    fn rebalance(&mut self, t: NodeId) -> NodeId {
        self.fix(t);
        let balance = self.balance(t);
        if balance > 1 {
            let left = self.node(t).left;
            if self.balance(left) < 0 {
                let rotated = self.rotate_left(left);
                self.node_mut(t).left = rotated;
            }
            return self.rotate_right(t);
        }
        if balance < -1 {
            let right = self.node(t).right;
            if self.balance(right) > 0 {
                let rotated = self.rotate_right(right);
                self.node_mut(t).right = rotated;
            }
            return self.rotate_left(t);
        }
        t
    }

    fn rotate_right(&mut self, t: NodeId) -> NodeId {
        let pivot = self.node(t).left;
        let inner = self.node(pivot).right;
        self.node_mut(t).left = inner;
        self.node_mut(pivot).right = t;
        self.fix(t);
        self.fix(pivot);
        pivot
    }

    fn rotate_left(&mut self, t: NodeId) -> NodeId {
        let pivot = self.node(t).right;
        let inner = self.node(pivot).left;
        self.node_mut(t).right = inner;
        self.node_mut(pivot).left = t;
        self.fix(t);
        self.fix(pivot);
        pivot
    }

    /// Panics if ordering, balance, subtree counts or bucket bookkeeping are off.
    pub(crate) fn assert_invariants(&self) {
        let mut members = 0usize;
        let (_, size) = self.check_subtree(self.root, None, None, &mut members);
        assert_eq!(size, self.bucket_count());
        assert_eq!(members, self.members, "member count drifted");
        assert_eq!(
            self.nodes.len() - self.free.len(),
            size,
            "arena leaked nodes"
        );
    }

    fn check_subtree(
        &self,
        t: NodeId,
        above: Option<Score>,
        below: Option<Score>,
        members: &mut usize,
    ) -> (i32, usize) {
        if t == NIL {
            return (0, 0);
        }
        let node = self.node(t);
        if let Some(upper) = above {
            assert!(node.score < upper, "score {} out of order", node.score);
        }
        if let Some(lower) = below {
            assert!(node.score > lower, "score {} out of order", node.score);
        }
        assert!(!node.bucket.is_empty(), "empty bucket for {}", node.score);
        *members += node.bucket.len();
        let (lh, ls) = self.check_subtree(node.left, above, Some(node.score), members);
        let (rh, rs) = self.check_subtree(node.right, Some(node.score), below, members);
        assert!((lh - rh).abs() <= 1, "unbalanced at {}", node.score);
        assert_eq!(i32::from(node.height), 1 + lh.max(rh));
        assert_eq!(node.size, 1 + ls + rs);
        (1 + lh.max(rh), 1 + ls + rs)
    }
}

/// Lazy walk over buckets, highest score first. Yields `(score, bucket)`.
#[derive(Clone, Debug)]
pub struct BucketsDescending<'a> {
    index: &'a OrderIndex,
    stack: SmallVec<[NodeId; 32]>,
    remaining: usize,
}

impl<'a> Iterator for BucketsDescending<'a> {
    type Item = (Score, &'a Bucket);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let t = self.stack.pop()?;
        self.remaining -= 1;
        let index = self.index;
        let node = index.node(t);
        let mut next = node.right;
        while next != NIL {
            self.stack.push(next);
            next = index.node(next).left;
        }
        Some((node.score, &node.bucket))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for BucketsDescending<'_> {}

impl FusedIterator for BucketsDescending<'_> {}
