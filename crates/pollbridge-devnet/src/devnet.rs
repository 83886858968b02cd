//! In-process devnet: one L2, one L1 and a loopback relay between them.

use pollbridge_governance::{PollParams, PollResult, ResultStatus, StaticMembership};
use pollbridge_settlement::{
    AllowlistConfig, EscrowAccount, FeeSchedule, FeeToken, L1Record, LoopbackRelay, RelayFees,
    ResultRegistry, ResultSender, RouteConfig, TokenLedger,
};
use pollbridge_types::{Address, Amount, ChainSelector};
use serde::Serialize;
use tracing::info;
use crate::config::{DevnetConfig, ScenarioConfig};

/// Poll start time. Voting happens one second in.
const GENESIS: u64 = 1;

/// Well-known devnet accounts.
pub struct Accounts;

impl Accounts {
    pub fn owner() -> Address { Address::derive(b"devnet/owner") }
    pub fn treasury() -> Address { Address::derive(b"devnet/treasury") }
    pub fn router() -> Address { Address::derive(b"devnet/router") }
    pub fn relay_vault() -> Address { Address::derive(b"devnet/relay-vault") }
    pub fn fee_token() -> Address { Address::derive(b"devnet/link") }
    pub fn sender() -> Address { Address::derive(b"devnet/l2/result-sender") }
    pub fn registry() -> Address { Address::derive(b"devnet/l1/result-registry") }

    pub fn member(index: u32) -> Address {
        Address::derive(format!("devnet/member/{}", index).as_bytes())
    }
}

/// Outcome of one scenario run.
#[derive(Debug, Serialize)]
pub struct Report {
    pub poll_id: u64,
    pub result: PollResult,
    pub tallies: Vec<u64>,
    pub record: Option<L1Record>,
    pub acknowledged: bool,
    pub escrow: Option<EscrowAccount>,
    pub platform_fee_claimed: Amount,
    pub leftover_withdrawn: Amount,
    pub balances: Balances,
}

#[derive(Debug, Serialize)]
pub struct Balances {
    pub creator: Amount,
    pub treasury: Amount,
    pub relay_vault: Amount,
    pub sender: Amount,
    pub registry: Amount,
}

pub struct Devnet {
    l2: ResultSender<StaticMembership>,
    l1: ResultRegistry,
    token: TokenLedger,
    relay: LoopbackRelay,
}

impl Devnet {
    /// Deploy and configure both contracts from `config`.
    pub fn new(config: &DevnetConfig) -> anyhow::Result<Self> {
        let l2_chain = ChainSelector::new(config.l2.chain_selector);
        let l1_chain = ChainSelector::new(config.l1.chain_selector);
        let owner = Accounts::owner();
        let scenario = &config.scenario;

        let membership = StaticMembership::new()
            .with_group(scenario.group_id, (0..scenario.members).map(Accounts::member));
        let schedule = FeeSchedule {
            treasury: Accounts::treasury(),
            ops_fee: Amount::from(config.l2.ops_fee),
            platform_fee_bps: config.l2.platform_fee_bps,
            relay_margin_bps: config.l2.relay_margin_bps,
        };

        let mut l2 = ResultSender::new(Accounts::sender(), owner, Accounts::router(), schedule, membership)?;
        l2.set_destination(
            owner,
            RouteConfig {
                destination_selector: l1_chain,
                receiver: Accounts::registry(),
                fee_token: Accounts::fee_token(),
                gas_limit: config.l2.gas_limit,
            },
        )?;
        l2.set_ack_allowlist(
            owner,
            AllowlistConfig { source_selector: l1_chain, sender: Accounts::registry() },
        )?;

        let mut l1 = ResultRegistry::new(
            Accounts::registry(),
            owner,
            Accounts::router(),
            AllowlistConfig { source_selector: l2_chain, sender: Accounts::sender() },
        )?;
        l1.set_ack_config(
            owner,
            RouteConfig {
                destination_selector: l2_chain,
                receiver: Accounts::sender(),
                fee_token: Accounts::fee_token(),
                gas_limit: config.l1.ack_gas_limit,
            },
        )?;

        let fees = RelayFees {
            base_fee: Amount::from(config.relay.base_fee),
            per_byte_fee: Amount::from(config.relay.per_byte_fee),
            gas_price: Amount::from(config.relay.gas_price),
        };
        let mut relay = LoopbackRelay::new(
            Accounts::router(),
            Accounts::relay_vault(),
            Accounts::fee_token(),
            fees,
        );
        relay.register_endpoint(l2_chain, Accounts::sender());
        relay.register_endpoint(l1_chain, Accounts::registry());

        let token = TokenLedger::new(
            Accounts::fee_token(),
            [
                (Accounts::member(0), Amount::from(scenario.creator_balance)),
                (Accounts::registry(), Amount::from(config.l1.fee_float)),
            ],
        );

        info!(%l2_chain, %l1_chain, "devnet deployed");
        Ok(Self { l2, l1, token, relay })
    }

    /// Hand every queued message to its receiver until the relay is idle.
    pub fn pump(&mut self) -> anyhow::Result<usize> {
        let router = Accounts::router();
        let mut delivered = 0;
        while let Some(delivery) = self.relay.deliver_next() {
            if delivery.receiver == self.l1.address() {
                self.l1
                    .receive(router, &delivery.message, &mut self.token, &mut self.relay)?;
            } else if delivery.receiver == self.l2.address() {
                self.l2.receive_ack(router, &delivery.message)?;
            } else {
                anyhow::bail!("No contract at {}", delivery.receiver);
            }
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Create, vote, finalize, settle and pay out one poll.
    pub fn run(&mut self, scenario: &ScenarioConfig) -> anyhow::Result<Report> {
        let creator = Accounts::member(0);
        let end_time = GENESIS + scenario.duration;
        let funding = Amount::from(scenario.funding);

        self.token.approve(creator, self.l2.address(), funding);
        let params = PollParams {
            group_id: scenario.group_id,
            start_time: GENESIS,
            end_time,
            option_count: scenario.options,
            quorum_enabled: scenario.quorum_enabled,
            quorum_bps: scenario.quorum_bps,
        };
        let poll_id = self
            .l2
            .create_poll_with_escrow(&mut self.token, &self.relay, creator, params, funding)?;

        let polls = self.l2.polls_mut();
        for d in &scenario.delegations {
            polls.delegate(poll_id, Accounts::member(d.from), Accounts::member(d.to), GENESIS)?;
        }
        for v in &scenario.votes {
            polls.vote(poll_id, Accounts::member(v.member), v.option, GENESIS + 1)?;
        }
        let result = polls.finalize(poll_id, end_time)?;
        let tallies = polls.tallies(poll_id)?;

        self.l2.send(&mut self.token, &mut self.relay, poll_id)?;
        let delivered = self.pump()?;
        info!(poll_id, delivered, "relay drained");

        let platform_fee_claimed = if result.status == ResultStatus::Passed {
            self.l2
                .claim_platform_fee(&mut self.token, poll_id, Accounts::owner())?
        } else {
            0
        };
        let leftover_withdrawn = self.l2.withdraw_leftover(&mut self.token, poll_id, creator)?;

        Ok(Report {
            poll_id,
            result,
            tallies,
            record: self.l1.record(scenario.group_id, poll_id).cloned(),
            acknowledged: self.l2.is_acked(scenario.group_id, poll_id),
            escrow: self.l2.escrow(poll_id).cloned(),
            platform_fee_claimed,
            leftover_withdrawn,
            balances: self.balances(),
        })
    }

    pub fn balances(&self) -> Balances {
        Balances {
            creator: self.token.balance_of(&Accounts::member(0)),
            treasury: self.token.balance_of(&Accounts::treasury()),
            relay_vault: self.token.balance_of(&Accounts::relay_vault()),
            sender: self.token.balance_of(&Accounts::sender()),
            registry: self.token.balance_of(&Accounts::registry()),
        }
    }

    pub fn total_supply(&self) -> Amount {
        self.token.total_supply()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScriptedVote;

    fn run(config: &DevnetConfig) -> (Devnet, Report) {
        let mut devnet = Devnet::new(config).unwrap();
        let report = devnet.run(&config.scenario).unwrap();
        (devnet, report)
    }

    #[test]
    fn test_default_scenario_passes_and_settles() {
        let config = DevnetConfig::default();
        let (devnet, report) = run(&config);

        assert_eq!(report.result.status, ResultStatus::Passed);
        assert_eq!(report.tallies, vec![5, 1, 0]);
        assert!(report.acknowledged);
        assert_eq!(report.record.as_ref().map(|r| r.status), Some(ResultStatus::Passed));

        // 5% of the funding left after the ops fee
        assert_eq!(report.platform_fee_claimed, (100_000 - 500) * 500 / 10_000);
        assert_eq!(report.balances.sender, 0);
        assert_eq!(report.escrow.map(|e| e.deposited), Some(0));
        assert_eq!(devnet.total_supply(), 1_000_000 + 50_000);
    }

    #[test]
    fn test_failed_scenario_refunds_platform_share() {
        let mut config = DevnetConfig::default();
        config.scenario.votes = vec![ScriptedVote { member: 7, option: 2 }];
        let (_, report) = run(&config);

        assert_eq!(report.result.status, ResultStatus::FailedQuorum);
        assert_eq!(report.platform_fee_claimed, 0);
        assert_eq!(report.balances.treasury, 500);
        assert!(report.acknowledged);
    }

    #[test]
    fn test_report_serializes() {
        let (_, report) = run(&DevnetConfig::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["record"]["recorded"], true);
        assert_eq!(json["result"]["status"], "Passed");
    }
}
