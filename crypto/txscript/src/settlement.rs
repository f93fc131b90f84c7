//! Cross-chain settlement opcodes: maker/taker collateral matching, deposit windows, the `x`
//! lookup table and broadcast queries.

use crate::data_stack::{DataStack, deserialize_number};
use crate::environment::EMERGENCY_CATEGORY;
use crate::{TxScriptEngine, TxScriptError};
use collider_consensus_core::BlockHeight;
use log::debug;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Outcome codes pushed by OP_MAKERCOLL
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i64)]
pub enum MakerCollOutcome {
    BothSettled = 2,
    MakerSettled = 3,
    TakerSettled = 4,
    Unsettled = 5,
}

/// Stage codes pushed by OP_DEPSET
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i64)]
pub enum DepositStage {
    NotStarted = 0,
    Settled = 1,
    Deposit = 2,
    Expired = 3,
}

/// A query accepted by OP_Q, recorded for the caller to broadcast
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastQuery {
    pub query: String,
    pub height: BlockHeight,
}

/// Canonical form of an address: hex-looking values (optionally `0x` prefixed) become
/// `0x` prefixed lowercase, anything else is kept verbatim.
pub fn normalize_address(address: &str) -> String {
    let digits = address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")).unwrap_or(address);
    match !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        true => format!("0x{}", digits.to_ascii_lowercase()),
        false => address.to_string(),
    }
}

impl TxScriptEngine<'_> {
    pub(crate) fn op_maker_coll(&mut self) -> Result<MakerCollOutcome, TxScriptError> {
        let [taker_sends_from, taker_wants_to, chain, maker_sends_from, maker_wants_to, sends_unit, receives_unit] =
            self.dstack.pop_raw()?;

        if self.env.marked_txs.is_empty() {
            debug!("OP_MAKERCOLL: no marked transactions");
            return Ok(MakerCollOutcome::Unsettled);
        }
        let (sends_unit, receives_unit) = (deserialize_number(&sends_unit)?, deserialize_number(&receives_unit)?);

        let ratio = BigInt::from(self.env.effective_ratio());
        let [taker_sends_from, taker_wants_to, maker_sends_from, maker_wants_to] =
            [taker_sends_from, taker_wants_to, maker_sends_from, maker_wants_to].map(|address| normalize_address(&address));
        let settled = |from: &str, to: &str, minimum: &BigInt| {
            self.env.marked_txs.iter().any(|tx| {
                tx.chain.eq_ignore_ascii_case(&chain)
                    && normalize_address(&tx.from) == from
                    && normalize_address(&tx.to) == to
                    && BigInt::from(tx.value) >= *minimum
            })
        };

        // The taker leg is evaluated first
        let taker_settled = settled(&taker_sends_from, &maker_wants_to, &(receives_unit / &ratio));
        let maker_settled = settled(&maker_sends_from, &taker_wants_to, &(sends_unit / &ratio));

        Ok(match (maker_settled, taker_settled) {
            (true, true) => MakerCollOutcome::BothSettled,
            (true, false) => MakerCollOutcome::MakerSettled,
            (false, true) => MakerCollOutcome::TakerSettled,
            (false, false) => MakerCollOutcome::Unsettled,
        })
    }

    pub(crate) fn op_dep_set(&mut self) -> Result<DepositStage, TxScriptError> {
        let [shift_maker, shift_taker, deposit, settle]: [BigInt; 4] = self.dstack.pop_items()?;

        let start = match (&self.env.callback_tx_block, &self.env.outpoint_tx_block) {
            (Some(callback_block), _) => BigInt::from(callback_block.height) + shift_taker,
            (None, Some(outpoint_block)) => BigInt::from(outpoint_block.height) + shift_maker,
            (None, None) => {
                debug!("OP_DEPSET: no block to start the window from");
                return Ok(DepositStage::NotStarted);
            }
        };
        let Some(current) = self.env.current_height().map(BigInt::from) else {
            debug!("OP_DEPSET: current height is unknown");
            return Ok(DepositStage::NotStarted);
        };

        Ok(if current >= &start + settle {
            match self.env.settled {
                true => DepositStage::Settled,
                false => DepositStage::Expired,
            }
        } else if current >= &start + deposit {
            DepositStage::Expired
        } else if current >= start {
            DepositStage::Deposit
        } else {
            DepositStage::NotStarted
        })
    }

    pub(crate) fn op_x(&mut self) -> Result<bool, TxScriptError> {
        let [expected, key, category] = self.dstack.pop_raw()?;
        let current_height = self.env.current_height();
        Ok(match self.env.x_entry(&category, &key) {
            Some(entry) if entry.is_live(current_height) => normalize_address(&entry.value) == normalize_address(&expected),
            Some(_) => {
                debug!("OP_X: entry {category}/{key} expired");
                false
            }
            None => false,
        })
    }

    pub(crate) fn op_emergency(&mut self) -> Result<bool, TxScriptError> {
        let [key] = self.dstack.pop_raw()?;
        let Some(entry) = self.env.x_entry(EMERGENCY_CATEGORY, &key).filter(|entry| entry.is_live(self.env.current_height())) else {
            debug!("OP_EMERGENCY: no live entry for {key}");
            return Ok(false);
        };
        Ok(match self.ctx.emergency_service {
            Some(service) => service.dispatch(&key, entry),
            None => true,
        })
    }

    /// Returns `None` while the broadcast query fork is inactive, leaving the stack untouched.
    pub(crate) fn op_q(&mut self) -> Result<Option<bool>, TxScriptError> {
        let current_height = self.env.current_height();
        let params = self.ctx.params;
        if !params.q_enabled(current_height) {
            debug!("OP_Q is not active");
            return Ok(None);
        }

        let [query_height]: [BigInt; 1] = self.dstack.pop_items()?;
        let [query] = self.dstack.pop_raw()?;
        let (Some(current), Some(query_height)) = (current_height, query_height.to_u64()) else {
            return Ok(Some(false));
        };
        if query_height > current || current - query_height > params.q_recency_window {
            debug!("OP_Q: query height {query_height} is outside the recency window at {current}");
            return Ok(Some(false));
        }
        if self.queries.len() >= params.max_q_queries {
            debug!("OP_Q: query limit of {} reached", params.max_q_queries);
            return Ok(Some(false));
        }
        self.queries.push(BroadcastQuery { query, height: query_height });
        Ok(Some(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptVerdict;
    use crate::caches::Cache;
    use crate::engine_context::{EmergencyService, EngineContext};
    use crate::environment::{ScriptEnvironment, XEntry};
    use collider_consensus_core::config::params::{DEVNET_SCRIPT_PARAMS, ForkActivation, MAINNET_SCRIPT_PARAMS};
    use collider_consensus_core::header::Header;
    use collider_consensus_core::marked::MarkedTransaction;

    fn run(env: &ScriptEnvironment, ctx: EngineContext<'_>, script: &str) -> Vec<String> {
        let mut vm = TxScriptEngine::new(env, ctx);
        let verdict = vm.evaluate_asm(script);
        assert!(!matches!(verdict, ScriptVerdict::Faulted(_)), "script {script:?} faulted: {verdict}");
        vm.stack().to_vec()
    }

    fn run_default(env: &ScriptEnvironment, script: &str) -> Vec<String> {
        let sig_cache = Cache::new(0);
        run(env, EngineContext::new(&sig_cache), script)
    }

    #[test]
    fn test_normalize_address() {
        for (address, expected) in [
            ("0xAbC", "0xabc"),
            ("ABC", "0xabc"),
            ("0X12", "0x12"),
            ("bc1qar0srrr", "bc1qar0srrr"),
            ("0x", "0x"),
            ("", ""),
        ] {
            assert_eq!(normalize_address(address), expected, "address {address:?}");
        }
    }

    const MAKERCOLL: &str = "0xtakerfrom 0xtakerto btc 0xmakerfrom 0xmakerto";

    fn makercoll_script(sends_unit: &str, receives_unit: &str) -> String {
        // Taker and maker addresses are not hex here, so they are compared verbatim
        format!("{MAKERCOLL} {sends_unit} {receives_unit} OP_MAKERCOLL")
    }

    #[test]
    fn test_maker_coll() {
        struct TestCase {
            name: &'static str,
            marked_txs: Vec<MarkedTransaction>,
            ratio: Option<u128>,
            units: (&'static str, &'static str),
            expected: &'static str,
        }

        let taker_leg = MarkedTransaction::new("BTC", "0xtakerfrom", "0xmakerto", 0x64);
        let maker_leg = MarkedTransaction::new("btc", "0xmakerfrom", "0xtakerto", 0x32);

        let tests = vec![
            TestCase { name: "no marked txs", marked_txs: vec![], ratio: None, units: ("32", "64"), expected: "5" },
            TestCase { name: "no marked txs ignores units", marked_txs: vec![], ratio: None, units: ("1.5", "zz"), expected: "5" },
            TestCase {
                name: "both legs",
                marked_txs: vec![taker_leg.clone(), maker_leg.clone()],
                ratio: None,
                units: ("32", "64"),
                expected: "2",
            },
            TestCase { name: "maker only", marked_txs: vec![maker_leg.clone()], ratio: None, units: ("32", "64"), expected: "3" },
            TestCase { name: "taker only", marked_txs: vec![taker_leg.clone()], ratio: None, units: ("32", "64"), expected: "4" },
            TestCase {
                name: "wrong chain",
                marked_txs: vec![MarkedTransaction::new("eth", "0xtakerfrom", "0xmakerto", 0x64)],
                ratio: None,
                units: ("32", "64"),
                expected: "5",
            },
            TestCase {
                name: "taker leg too small",
                marked_txs: vec![MarkedTransaction::new("btc", "0xtakerfrom", "0xmakerto", 0x63), maker_leg.clone()],
                ratio: None,
                units: ("32", "64"),
                expected: "3",
            },
            TestCase {
                name: "ratio scales units",
                marked_txs: vec![MarkedTransaction::new("btc", "0xtakerfrom", "0xmakerto", 0x32), maker_leg.clone()],
                ratio: Some(2),
                units: ("32", "64"),
                expected: "2",
            },
            TestCase {
                name: "zero ratio counts as one",
                marked_txs: vec![maker_leg.clone()],
                ratio: Some(0),
                units: ("32", "64"),
                expected: "3",
            },
        ];

        for test in tests {
            let mut env = ScriptEnvironment::new().with_marked_txs(test.marked_txs);
            env.ratio = test.ratio;
            // sends_unit is the maker leg minimum, receives_unit the taker leg minimum
            let (sends_unit, receives_unit) = test.units;
            assert_eq!(run_default(&env, &makercoll_script(sends_unit, receives_unit)), vec![test.expected], "{}", test.name);
        }
    }

    #[test]
    fn test_maker_coll_normalizes_hex_addresses() {
        let env = ScriptEnvironment::new().with_marked_txs(vec![
            MarkedTransaction::new("eth", "0xAAAA", "0xBBBB", 10),
            MarkedTransaction::new("eth", "cccc", "dddd", 10),
        ]);
        let script = "aaaa 0xDDDD ETH 0xCcCc BBBB a a OP_MAKERCOLL";
        assert_eq!(run_default(&env, script), vec!["2"]);

        // Units are only parsed once there is something to settle against
        let sig_cache = Cache::new(0);
        let mut vm = TxScriptEngine::new(&env, EngineContext::new(&sig_cache));
        let verdict = vm.evaluate_asm("aaaa 0xDDDD ETH 0xCcCc BBBB 1.5 a OP_MAKERCOLL");
        assert_eq!(verdict, ScriptVerdict::Faulted(TxScriptError::NotANumber("1.5".to_string())));
    }

    #[test]
    fn test_dep_set_ladder() {
        struct TestCase {
            current: u64,
            settled: bool,
            expected: &'static str,
        }

        // start = 1000 (0x3e8), settle = 100 (0x64), deposit = 50 (0x32)
        let tests = vec![
            TestCase { current: 1040, settled: false, expected: "2" },
            TestCase { current: 1060, settled: false, expected: "3" },
            TestCase { current: 1100, settled: true, expected: "1" },
            TestCase { current: 1100, settled: false, expected: "3" },
            TestCase { current: 900, settled: true, expected: "0" },
            TestCase { current: 1000, settled: false, expected: "2" },
        ];

        for test in tests {
            let env = ScriptEnvironment::new()
                .with_outpoint_tx_block(Header::from_height(990))
                .with_input_tx_block(Header::from_height(test.current))
                .with_settled(test.settled);
            // shift_maker = 10, shift_taker = 0 (unused), deposit = 50, settle = 100
            assert_eq!(run_default(&env, "a 0 32 64 OP_DEPSET"), vec![test.expected], "current {}", test.current);
        }
    }

    #[test]
    fn test_dep_set_start_block() {
        let callback_tx = collider_consensus_core::tx::Transaction::new("cb", 1, vec![], vec![], 0);
        // Callback block takes precedence: start = 2000 + 5
        let env = ScriptEnvironment::new()
            .with_callback(callback_tx, Some(Header::from_height(2000)))
            .with_outpoint_tx_block(Header::from_height(1000))
            .with_latest_block(Header::from_height(2006));
        assert_eq!(run_default(&env, "0 5 a 14 OP_DEPSET"), vec!["2"]);

        let env = ScriptEnvironment::new().with_latest_block(Header::from_height(2004));
        assert_eq!(run_default(&env, "0 0 a 14 OP_DEPSET"), vec!["0"]);

        let env = ScriptEnvironment::new().with_outpoint_tx_block(Header::from_height(10));
        assert_eq!(run_default(&env, "0 0 a 14 OP_DEPSET"), vec!["0"]);

        let sig_cache = Cache::new(0);
        let mut vm = TxScriptEngine::new(&env, EngineContext::new(&sig_cache));
        assert_eq!(vm.evaluate_asm("0 a 14 OP_DEPSET"), ScriptVerdict::Faulted(TxScriptError::InvalidStackOperation(4, 3)));
    }

    #[test]
    fn test_x_lookup() {
        struct TestCase {
            script: &'static str,
            height: Option<u64>,
            expected: &'static str,
        }

        let tests = vec![
            TestCase { script: "0xabcd alice vanity OP_X", height: None, expected: "1" },
            TestCase { script: "ABCD alice vanity OP_X", height: Some(10), expected: "1" },
            TestCase { script: "0xabce alice vanity OP_X", height: None, expected: "0" },
            TestCase { script: "0xabcd bob vanity OP_X", height: None, expected: "0" },
            TestCase { script: "0xabcd alice other OP_X", height: None, expected: "0" },
            TestCase { script: "name carol vanity OP_X", height: Some(99), expected: "1" },
            TestCase { script: "name carol vanity OP_X", height: Some(100), expected: "0" },
            TestCase { script: "name carol vanity OP_X", height: None, expected: "0" },
        ];

        for test in tests {
            let mut env = ScriptEnvironment::new()
                .with_x_entry("vanity", "alice", XEntry::new("0xABCD"))
                .with_x_entry("vanity", "carol", XEntry::new("name").expiring_at(100));
            if let Some(height) = test.height {
                env = env.with_latest_block(Header::from_height(height));
            }
            assert_eq!(run_default(&env, test.script), vec![test.expected], "script {:?} at {:?}", test.script, test.height);
        }
    }

    #[test]
    fn test_emergency() {
        struct AllowList;
        impl EmergencyService for AllowList {
            fn dispatch(&self, key: &str, entry: &XEntry) -> bool {
                key == "allowed" && entry.value == "go"
            }
        }

        let env = ScriptEnvironment::new()
            .with_latest_block(Header::from_height(50))
            .with_x_entry(EMERGENCY_CATEGORY, "halt", XEntry::new("stop"))
            .with_x_entry(EMERGENCY_CATEGORY, "allowed", XEntry::new("go"))
            .with_x_entry(EMERGENCY_CATEGORY, "stale", XEntry::new("go").expiring_at(50));

        assert_eq!(run_default(&env, "halt OP_EMERGENCY"), vec!["1"]);
        assert_eq!(run_default(&env, "stale OP_EMERGENCY"), vec!["0"]);
        assert_eq!(run_default(&env, "missing OP_EMERGENCY"), vec!["0"]);

        let sig_cache = Cache::new(0);
        let service = AllowList;
        let ctx = EngineContext::new(&sig_cache).with_emergency_service(&service);
        assert_eq!(run(&env, ctx, "halt OP_EMERGENCY"), vec!["0"]);
        assert_eq!(run(&env, ctx, "allowed OP_EMERGENCY"), vec!["1"]);
    }

    #[test]
    fn test_q_gating() {
        let sig_cache = Cache::new(0);
        let env = ScriptEnvironment::new().with_latest_block(Header::from_height(0x100));

        // Inactive: inert, arguments stay on the stack
        let ctx = EngineContext::new(&sig_cache).with_params(MAINNET_SCRIPT_PARAMS);
        assert_eq!(run(&env, ctx, "query f0 OP_Q"), vec!["query", "f0"]);

        let ctx = EngineContext::new(&sig_cache).with_params(DEVNET_SCRIPT_PARAMS);
        assert_eq!(run(&env, ctx, "query f0 OP_Q"), vec!["1"]);
        assert_eq!(run(&env, ctx, "query 100 OP_Q"), vec!["1"]);
        assert_eq!(run(&env, ctx, "query 101 OP_Q"), vec!["0"]);
        // 0x100 - 0xbd = 67 blocks, one past the recency window
        assert_eq!(run(&env, ctx, "query bd OP_Q"), vec!["0"]);
        assert_eq!(run(&env, ctx, "query be OP_Q"), vec!["1"]);

        // Activation height in the future
        let ctx = EngineContext::new(&sig_cache).with_params(MAINNET_SCRIPT_PARAMS.with_q_activation(ForkActivation::new(0x101)));
        assert_eq!(run(&env, ctx, "query f0 OP_Q"), vec!["query", "f0"]);

        // Unknown current height keeps the fork inactive
        let ctx = EngineContext::new(&sig_cache).with_params(DEVNET_SCRIPT_PARAMS);
        assert_eq!(run(&ScriptEnvironment::new(), ctx, "query f0 OP_Q"), vec!["query", "f0"]);
    }

    #[test]
    fn test_q_bookkeeping() {
        let sig_cache = Cache::new(0);
        let env = ScriptEnvironment::new().with_latest_block(Header::from_height(0x100));
        let params = DEVNET_SCRIPT_PARAMS;
        let script = (0..params.max_q_queries + 1).map(|i| format!("query{i} ff OP_Q")).collect::<Vec<_>>().join(" ");

        let mut vm = TxScriptEngine::new(&env, EngineContext::new(&sig_cache).with_params(params));
        vm.evaluate_asm(&script);
        let mut expected = vec!["1".to_string(); params.max_q_queries];
        expected.push("0".to_string());
        assert_eq!(vm.stack(), expected);
        assert_eq!(vm.queries().len(), params.max_q_queries);
        assert_eq!(vm.queries()[0], BroadcastQuery { query: "query0".to_string(), height: 0xff });
    }
}
