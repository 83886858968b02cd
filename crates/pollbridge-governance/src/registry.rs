//! Poll registry: the L2 entry point for the voting core.
//!
//! Every operation is scoped to one poll id. A poll's delegation graph,
//! vote book and result are never visible to another poll.

use std::collections::HashMap;
use pollbridge_types::Address;
use tracing::{debug, info};
use crate::delegation::DelegationGraph;
use crate::error::GovernanceError;
use crate::events::GovernanceEvent;
use crate::finalization::{finalize, PollResult};
use crate::poll::{Membership, Poll, PollParams};
use crate::voting::{vote_weight, Ballot, VoteBook};

#[derive(Debug, Clone)]
struct PollState {
    poll: Poll,
    graph: DelegationGraph,
    votes: VoteBook,
    result: Option<PollResult>,
}

/// All polls on one L2 deployment.
#[derive(Debug)]
pub struct PollRegistry<M: Membership> {
    membership: M,
    polls: HashMap<u64, PollState>,
    next_poll_id: u64,
    events: Vec<GovernanceEvent>,
}

impl<M: Membership> PollRegistry<M> {
    pub fn new(membership: M) -> Self {
        Self {
            membership,
            polls: HashMap::new(),
            next_poll_id: 1,
            events: Vec::new(),
        }
    }

    pub fn membership(&self) -> &M {
        &self.membership
    }

    /// Membership changes after creation never touch existing snapshots.
    pub fn membership_mut(&mut self) -> &mut M {
        &mut self.membership
    }

    /// Create a poll and freeze its eligible-voter count.
    ///
    /// Poll ids start at 1.
    pub fn create_poll(&mut self, creator: Address, params: PollParams) -> Result<u64, GovernanceError> {
        params.validate()?;

        let id = self.next_poll_id;
        let snapshot = self.membership.eligible_count(params.group_id);
        let poll = Poll::new(id, creator, &params, snapshot);

        self.polls.insert(id, PollState {
            votes: VoteBook::new(poll.option_count),
            graph: DelegationGraph::new(),
            result: None,
            poll,
        });
        self.next_poll_id += 1;

        info!(poll_id = id, group_id = params.group_id, snapshot, "poll created");
        self.events.push(GovernanceEvent::PollCreated {
            poll_id: id,
            group_id: params.group_id,
            creator,
            eligible_count_snapshot: snapshot,
        });

        Ok(id)
    }

    /// Delegate `delegator`'s vote in `poll_id` to `delegate`.
    pub fn delegate(
        &mut self,
        poll_id: u64,
        delegator: Address,
        delegate: Address,
        now: u64,
    ) -> Result<(), GovernanceError> {
        let state = self
            .polls
            .get_mut(&poll_id)
            .ok_or(GovernanceError::PollNotFound(poll_id))?;
        state.poll.ensure_open(now)?;

        let group_id = state.poll.group_id;
        if !self.membership.is_member(group_id, &delegator) {
            return Err(GovernanceError::NotMember(delegator));
        }
        // A zero delegate falls through to the graph's `ZeroDelegate`
        if !delegate.is_zero() && !self.membership.is_member(group_id, &delegate) {
            return Err(GovernanceError::NotMember(delegate));
        }

        let previous = state.graph.delegate(delegator, delegate, &state.votes)?;

        debug!(poll_id, ?delegator, ?delegate, ?previous, "delegated");
        self.events.push(GovernanceEvent::Delegated {
            poll_id,
            delegator,
            delegate,
            previous,
        });
        Ok(())
    }

    /// Remove `delegator`'s delegation in `poll_id`.
    pub fn revoke(&mut self, poll_id: u64, delegator: Address, now: u64) -> Result<(), GovernanceError> {
        let state = self
            .polls
            .get_mut(&poll_id)
            .ok_or(GovernanceError::PollNotFound(poll_id))?;
        state.poll.ensure_open(now)?;

        let delegate = state.graph.revoke(delegator, &state.votes)?;

        debug!(poll_id, ?delegator, ?delegate, "delegation revoked");
        self.events.push(GovernanceEvent::DelegationRevoked {
            poll_id,
            delegator,
            delegate,
        });
        Ok(())
    }

    /// Cast `voter`'s vote. Returns the weight applied.
    pub fn vote(
        &mut self,
        poll_id: u64,
        voter: Address,
        option_index: u32,
        now: u64,
    ) -> Result<u64, GovernanceError> {
        let state = self
            .polls
            .get_mut(&poll_id)
            .ok_or(GovernanceError::PollNotFound(poll_id))?;
        state.poll.ensure_open(now)?;

        if option_index >= state.poll.option_count {
            return Err(GovernanceError::InvalidOption {
                index: option_index,
                option_count: state.poll.option_count,
            });
        }
        if !self.membership.is_member(state.poll.group_id, &voter) {
            return Err(GovernanceError::NotMember(voter));
        }
        if state.graph.is_delegating(&voter) {
            return Err(GovernanceError::VoterHasDelegated(voter));
        }

        let weight = vote_weight(state.graph.incoming_count(&voter))?;
        state.votes.record(voter, option_index, weight)?;

        debug!(poll_id, ?voter, option_index, weight, "vote cast");
        self.events.push(GovernanceEvent::VoteCast {
            poll_id,
            voter,
            option_index,
            weight,
        });
        Ok(weight)
    }

    /// Close `poll_id` and store its result. Fails on a second call.
    pub fn finalize(&mut self, poll_id: u64, now: u64) -> Result<PollResult, GovernanceError> {
        let state = self
            .polls
            .get_mut(&poll_id)
            .ok_or(GovernanceError::PollNotFound(poll_id))?;

        if state.result.is_some() {
            return Err(GovernanceError::AlreadyFinalized);
        }

        let result = finalize(&state.poll, &state.votes, now)?;
        state.result = Some(result.clone());

        info!(
            poll_id,
            status = ?result.status,
            winning_option = result.winning_option,
            total_votes = result.total_votes,
            "poll finalized"
        );
        self.events.push(GovernanceEvent::PollFinalized {
            poll_id,
            status: result.status,
            winning_option: result.winning_option,
            total_votes: result.total_votes,
        });

        Ok(result)
    }

    fn state(&self, poll_id: u64) -> Result<&PollState, GovernanceError> {
        self.polls.get(&poll_id).ok_or(GovernanceError::PollNotFound(poll_id))
    }

    pub fn poll(&self, poll_id: u64) -> Result<&Poll, GovernanceError> {
        Ok(&self.state(poll_id)?.poll)
    }

    /// Result of a finalized poll, `None` while open.
    pub fn result(&self, poll_id: u64) -> Result<Option<&PollResult>, GovernanceError> {
        Ok(self.state(poll_id)?.result.as_ref())
    }

    pub fn has_voted(&self, poll_id: u64, voter: &Address) -> Result<bool, GovernanceError> {
        Ok(self.state(poll_id)?.votes.has_voted(voter))
    }

    pub fn ballot(&self, poll_id: u64, voter: &Address) -> Result<Option<Ballot>, GovernanceError> {
        Ok(self.state(poll_id)?.votes.ballot(voter))
    }

    /// Weight `voter` cast, `None` if they have not voted.
    pub fn cast_weight(&self, poll_id: u64, voter: &Address) -> Result<Option<u64>, GovernanceError> {
        Ok(self.ballot(poll_id, voter)?.map(|ballot| ballot.weight))
    }

    pub fn delegate_of(&self, poll_id: u64, delegator: &Address) -> Result<Option<Address>, GovernanceError> {
        Ok(self.state(poll_id)?.graph.delegate_of(delegator))
    }

    pub fn incoming_count(&self, poll_id: u64, delegate: &Address) -> Result<usize, GovernanceError> {
        Ok(self.state(poll_id)?.graph.incoming_count(delegate))
    }

    pub fn delegators_slice(
        &self,
        poll_id: u64,
        delegate: &Address,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Address>, GovernanceError> {
        Ok(self.state(poll_id)?.graph.delegators_slice(delegate, offset, limit))
    }

    pub fn option_tally(&self, poll_id: u64, option_index: u32) -> Result<u64, GovernanceError> {
        Ok(self.state(poll_id)?.votes.tally(option_index))
    }

    pub fn tallies(&self, poll_id: u64) -> Result<Vec<u64>, GovernanceError> {
        Ok(self.state(poll_id)?.votes.tallies().to_vec())
    }

    pub fn poll_count(&self) -> usize {
        self.polls.len()
    }

    pub fn events(&self) -> &[GovernanceEvent] {
        &self.events
    }

    /// Drain emitted events.
    pub fn take_events(&mut self) -> Vec<GovernanceEvent> {
        std::mem::take(&mut self.events)
    }
}
