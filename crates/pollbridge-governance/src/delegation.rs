//! Single-hop delegation graph for one poll.
//!
//! A member may hand their vote to another member. Chains are not
//! allowed: a delegate must not itself be delegating, and a member who
//! already receives delegations cannot delegate onward. An edge freezes
//! once its delegate has voted.

use std::collections::HashMap;
use pollbridge_types::Address;
use crate::error::GovernanceError;
use crate::voting::VoteBook;

/// Delegation edges of a single poll.
#[derive(Debug, Default, Clone)]
pub struct DelegationGraph {
    /// delegator -> delegate
    delegate_of: HashMap<Address, Address>,
    /// delegate -> delegators (unordered)
    delegators: HashMap<Address, Vec<Address>>,
    /// delegator -> index inside its delegate's list
    positions: HashMap<Address, usize>,
}

impl DelegationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `delegator`'s vote at `delegate`, replacing any previous edge.
    ///
    /// Returns the previous delegate, if any.
    ///
    /// # Errors
    /// - Self-delegation or zero delegate
    /// - Either side has already voted
    /// - The delegate is delegating, or the delegator is being delegated to
    /// - The edge is unchanged, or the current delegate has voted
    pub fn delegate(
        &mut self,
        delegator: Address,
        delegate: Address,
        votes: &VoteBook,
    ) -> Result<Option<Address>, GovernanceError> {
        if delegator == delegate {
            return Err(GovernanceError::SelfDelegation);
        }
        if delegate.is_zero() {
            return Err(GovernanceError::ZeroDelegate);
        }
        if votes.has_voted(&delegator) {
            return Err(GovernanceError::DelegatorVoted);
        }
        if votes.has_voted(&delegate) {
            return Err(GovernanceError::DelegateVoted);
        }
        if self.delegate_of.contains_key(&delegate) {
            return Err(GovernanceError::DelegateHasDelegated);
        }
        if self.incoming_count(&delegator) > 0 {
            return Err(GovernanceError::DelegatorHasDelegators);
        }

        let previous = self.delegate_of.get(&delegator).copied();
        if let Some(current) = previous {
            if current == delegate {
                return Err(GovernanceError::DelegationUnchanged);
            }
            if votes.has_voted(&current) {
                return Err(GovernanceError::DelegationLocked);
            }
            self.unlink(current, delegator);
        }

        self.delegate_of.insert(delegator, delegate);
        let list = self.delegators.entry(delegate).or_default();
        self.positions.insert(delegator, list.len());
        list.push(delegator);

        Ok(previous)
    }

    /// Remove `delegator`'s edge. Returns the delegate it pointed at.
    pub fn revoke(
        &mut self,
        delegator: Address,
        votes: &VoteBook,
    ) -> Result<Address, GovernanceError> {
        let current = self
            .delegate_of
            .get(&delegator)
            .copied()
            .ok_or(GovernanceError::NoDelegation)?;

        if votes.has_voted(&current) {
            return Err(GovernanceError::DelegationLocked);
        }

        self.delegate_of.remove(&delegator);
        self.unlink(current, delegator);
        Ok(current)
    }

    /// Drop `delegator` from `delegate`'s reverse list in O(1).
    fn unlink(&mut self, delegate: Address, delegator: Address) {
        let Some(index) = self.positions.remove(&delegator) else {
            return;
        };
        let Some(list) = self.delegators.get_mut(&delegate) else {
            return;
        };

        list.swap_remove(index);
        // The former last entry now sits at `index` unless we removed the last one.
        if let Some(moved) = list.get(index) {
            self.positions.insert(*moved, index);
        }
        if list.is_empty() {
            self.delegators.remove(&delegate);
        }
    }

    /// Current delegate of `delegator`.
    pub fn delegate_of(&self, delegator: &Address) -> Option<Address> {
        self.delegate_of.get(delegator).copied()
    }

    /// Whether `who` has an outgoing edge.
    pub fn is_delegating(&self, who: &Address) -> bool {
        self.delegate_of.contains_key(who)
    }

    /// Number of members currently delegating to `delegate`.
    pub fn incoming_count(&self, delegate: &Address) -> usize {
        self.delegators.get(delegate).map(Vec::len).unwrap_or(0)
    }

    /// Page through `delegate`'s delegators.
    ///
    /// Empty when `offset` is past the end; otherwise up to `limit`
    /// entries, clipped to the list length.
    pub fn delegators_slice(&self, delegate: &Address, offset: usize, limit: usize) -> Vec<Address> {
        let Some(list) = self.delegators.get(delegate) else {
            return Vec::new();
        };
        if offset >= list.len() {
            return Vec::new();
        }
        let end = offset.saturating_add(limit).min(list.len());
        list[offset..end].to_vec()
    }

    /// All edges as (delegator, delegate).
    pub fn edges(&self) -> impl Iterator<Item = (&Address, &Address)> {
        self.delegate_of.iter()
    }

    /// Number of active edges.
    pub fn len(&self) -> usize {
        self.delegate_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegate_of.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from_bytes(bytes)
    }

    fn votes() -> VoteBook {
        VoteBook::new(2)
    }

    /// Reverse index and forward map agree, and no member is both
    /// delegating and delegated to.
    fn assert_consistent(graph: &DelegationGraph) {
        for (delegator, delegate) in graph.edges() {
            assert!(!graph.is_delegating(delegate), "chain through {:?}", delegate);
            assert_eq!(graph.incoming_count(delegator), 0);
            let index = graph.positions[delegator];
            assert_eq!(graph.delegators[delegate][index], *delegator);
        }
        let reverse_total: usize = graph.delegators.values().map(Vec::len).sum();
        assert_eq!(reverse_total, graph.len());
        assert_eq!(graph.positions.len(), graph.len());
    }

    #[test]
    fn test_delegate_and_count() {
        let mut graph = DelegationGraph::new();
        let book = votes();

        assert_eq!(graph.delegate(addr(1), addr(2), &book).unwrap(), None);
        graph.delegate(addr(3), addr(2), &book).unwrap();

        assert_eq!(graph.incoming_count(&addr(2)), 2);
        assert_eq!(graph.delegate_of(&addr(1)), Some(addr(2)));
        assert!(graph.is_delegating(&addr(3)));
        assert_consistent(&graph);
    }

    #[test]
    fn test_self_and_zero_delegation_fail() {
        let mut graph = DelegationGraph::new();
        let book = votes();

        assert_eq!(graph.delegate(addr(1), addr(1), &book), Err(GovernanceError::SelfDelegation));
        assert_eq!(graph.delegate(addr(1), Address::ZERO, &book), Err(GovernanceError::ZeroDelegate));
    }

    #[test]
    fn test_no_chains() {
        let mut graph = DelegationGraph::new();
        let book = votes();

        // 1 -> 2, then 2 -> 3 would forward merged weight
        graph.delegate(addr(1), addr(2), &book).unwrap();
        assert_eq!(
            graph.delegate(addr(2), addr(3), &book),
            Err(GovernanceError::DelegatorHasDelegators)
        );

        // 4 -> 1 would point at someone who is delegating
        assert_eq!(
            graph.delegate(addr(4), addr(1), &book),
            Err(GovernanceError::DelegateHasDelegated)
        );
        assert_consistent(&graph);
    }

    #[test]
    fn test_voted_members_cannot_delegate_or_receive() {
        let mut graph = DelegationGraph::new();
        let mut book = votes();
        book.record(addr(1), 0, 1).unwrap();

        assert_eq!(graph.delegate(addr(1), addr(2), &book), Err(GovernanceError::DelegatorVoted));
        assert_eq!(graph.delegate(addr(2), addr(1), &book), Err(GovernanceError::DelegateVoted));
    }

    #[test]
    fn test_redelegate_moves_edge() {
        let mut graph = DelegationGraph::new();
        let book = votes();

        graph.delegate(addr(1), addr(2), &book).unwrap();
        assert_eq!(graph.delegate(addr(1), addr(2), &book), Err(GovernanceError::DelegationUnchanged));

        let previous = graph.delegate(addr(1), addr(3), &book).unwrap();
        assert_eq!(previous, Some(addr(2)));
        assert_eq!(graph.incoming_count(&addr(2)), 0);
        assert_eq!(graph.incoming_count(&addr(3)), 1);
        assert_consistent(&graph);
    }

    #[test]
    fn test_edge_locks_once_delegate_votes() {
        let mut graph = DelegationGraph::new();
        let mut book = votes();

        graph.delegate(addr(1), addr(2), &book).unwrap();
        book.record(addr(2), 1, 2).unwrap();

        assert_eq!(graph.revoke(addr(1), &book), Err(GovernanceError::DelegationLocked));
        assert_eq!(graph.delegate(addr(1), addr(3), &book), Err(GovernanceError::DelegationLocked));
        assert_eq!(graph.incoming_count(&addr(2)), 1);
    }

    #[test]
    fn test_revoke() {
        let mut graph = DelegationGraph::new();
        let book = votes();

        assert_eq!(graph.revoke(addr(1), &book), Err(GovernanceError::NoDelegation));

        graph.delegate(addr(1), addr(2), &book).unwrap();
        assert_eq!(graph.revoke(addr(1), &book).unwrap(), addr(2));
        assert!(!graph.is_delegating(&addr(1)));
        assert_eq!(graph.incoming_count(&addr(2)), 0);
        assert!(graph.is_empty());

        // Revoking twice fails
        assert_eq!(graph.revoke(addr(1), &book), Err(GovernanceError::NoDelegation));
    }

    #[test]
    fn test_swap_remove_updates_positions() {
        let mut graph = DelegationGraph::new();
        let book = votes();
        let hub = addr(100);

        for n in 1..=4 {
            graph.delegate(addr(n), hub, &book).unwrap();
        }

        // Remove from the middle, the end, and the front
        graph.revoke(addr(2), &book).unwrap();
        assert_consistent(&graph);
        let last = graph.delegators_slice(&hub, 2, 1)[0];
        graph.revoke(last, &book).unwrap();
        assert_consistent(&graph);
        let first = graph.delegators_slice(&hub, 0, 1)[0];
        graph.revoke(first, &book).unwrap();
        assert_consistent(&graph);

        // Only entry
        assert_eq!(graph.incoming_count(&hub), 1);
        let only = graph.delegators_slice(&hub, 0, 10)[0];
        graph.revoke(only, &book).unwrap();
        assert_eq!(graph.incoming_count(&hub), 0);
        assert_consistent(&graph);
    }

    #[test]
    fn test_delegators_slice() {
        let mut graph = DelegationGraph::new();
        let book = votes();
        let hub = addr(100);
        for n in 1..=5 {
            graph.delegate(addr(n), hub, &book).unwrap();
        }

        assert_eq!(graph.delegators_slice(&hub, 0, 2).len(), 2);
        assert_eq!(graph.delegators_slice(&hub, 4, 2).len(), 1);
        assert_eq!(graph.delegators_slice(&hub, 3, usize::MAX).len(), 2);
        assert!(graph.delegators_slice(&hub, 5, 2).is_empty());
        assert!(graph.delegators_slice(&hub, 0, 0).is_empty());
        assert!(graph.delegators_slice(&addr(42), 0, 10).is_empty());

        let mut all = graph.delegators_slice(&hub, 0, 3);
        all.extend(graph.delegators_slice(&hub, 3, 3));
        all.sort();
        assert_eq!(all, (1..=5).map(addr).collect::<Vec<_>>());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Delegate(u8, u8),
        Revoke(u8),
        Vote(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u8..7, 1u8..7).prop_map(|(a, b)| Op::Delegate(a, b)),
            (1u8..7).prop_map(Op::Revoke),
            (1u8..7).prop_map(Op::Vote),
        ]
    }

    proptest! {
        #[test]
        fn prop_graph_stays_single_hop(ops in prop::collection::vec(op(), 0..60)) {
            let mut graph = DelegationGraph::new();
            let mut book = VoteBook::new(1);

            for op in ops {
                match op {
                    Op::Delegate(a, b) => { let _ = graph.delegate(addr(a), addr(b), &book); }
                    Op::Revoke(a) => { let _ = graph.revoke(addr(a), &book); }
                    Op::Vote(a) => {
                        if !graph.is_delegating(&addr(a)) {
                            let weight = 1 + graph.incoming_count(&addr(a)) as u64;
                            let _ = book.record(addr(a), 0, weight);
                        }
                    }
                }
                assert_consistent(&graph);
            }
        }
    }
}
