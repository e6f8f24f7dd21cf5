//! Scenario files and the runner that replays them.
//!
//! A scenario names a path to create and a list of steps to apply to it
//! against an in-memory ledger. The runner records the outcome of every
//! step and produces a [`Report`] with the final path state, balances and
//! all emitted events.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use reveel_core::{amount, Address, CallContext, Currency, MemoryLedger, ReveelError};
use reveel_path::{PathEvent, PathParams, PathSnapshot, RevenuePath};
use reveel_registry::{Registry, RegistryConfig, RegistryEvent};

/// Default registry owner when a scenario names none.
const DEFAULT_OWNER: Address = Address([0x01; 20]);

#[derive(Deserialize, Debug, Clone)]
pub struct Scenario {
    /// Registry settings. When absent the config file and environment are used.
    #[serde(default)]
    pub registry: Option<RegistryConfig>,
    #[serde(default = "default_owner")]
    pub registry_owner: Address,
    /// Account creating the path; becomes its owner.
    #[serde(default = "default_owner")]
    pub creator: Address,
    pub path: PathParams,
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_owner() -> Address {
    DEFAULT_OWNER
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Send funds to the path from outside.
    Deposit {
        currency: Currency,
        #[serde(with = "amount")]
        amount: u128,
    },
    Settle {
        currency: Currency,
    },
    Release {
        currency: Currency,
        wallet: Address,
    },
    AddTiers {
        wallet_lists: Vec<Vec<Address>>,
        share_lists: Vec<Vec<u64>>,
        #[serde(default)]
        caller: Option<Address>,
    },
    UpdateTiers {
        wallet_lists: Vec<Vec<Address>>,
        share_lists: Vec<Vec<u64>>,
        indices: Vec<usize>,
        #[serde(default)]
        caller: Option<Address>,
    },
    UpdateLimits {
        currencies: Vec<Currency>,
        #[serde(with = "amount::vec")]
        limits: Vec<u128>,
        tier: usize,
        #[serde(default)]
        caller: Option<Address>,
    },
    SetPlatformWallet {
        wallet: Address,
        #[serde(default)]
        caller: Option<Address>,
    },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Deposit { .. } => "deposit",
            Step::Settle { .. } => "settle",
            Step::Release { .. } => "release",
            Step::AddTiers { .. } => "add_tiers",
            Step::UpdateTiers { .. } => "update_tiers",
            Step::UpdateLimits { .. } => "update_limits",
            Step::SetPlatformWallet { .. } => "set_platform_wallet",
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub index: usize,
    pub action: &'static str,
    pub ok: bool,
    /// Amount settled or released, for those steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub holder: Address,
    pub currency: Currency,
    #[serde(with = "amount")]
    pub amount: u128,
}

#[derive(Serialize, Debug, Clone)]
pub struct Report {
    pub path: PathSnapshot,
    pub steps: Vec<StepOutcome>,
    pub balances: Vec<Balance>,
    pub path_events: Vec<PathEvent>,
    pub registry_events: Vec<RegistryEvent>,
}

impl Scenario {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse scenario: {}", path.display()))
    }

    /// Registry settings from the scenario, else from `config_path` and the environment.
    pub fn registry_config(&self, config_path: Option<&Path>) -> Result<RegistryConfig> {
        match &self.registry {
            Some(cfg) => {
                cfg.validate().context("Invalid registry settings in scenario")?;
                Ok(cfg.clone())
            }
            None => RegistryConfig::load(config_path).context("Failed to load registry config"),
        }
    }
}

/// Replays a scenario against a fresh registry and ledger.
pub struct Runner {
    registry: Registry,
    path: RevenuePath,
    ledger: MemoryLedger,
    creator: Address,
    registry_owner: Address,
    currencies: BTreeSet<Currency>,
    path_events: Vec<PathEvent>,
}

impl Runner {
    pub fn new(scenario: &Scenario, config: &RegistryConfig) -> Result<Self> {
        let mut registry = Registry::new(scenario.registry_owner, config)
            .context("Failed to create registry")?;
        let path = registry
            .create_revenue_path(&CallContext::direct(scenario.creator), scenario.path.clone())
            .context("Failed to create revenue path")?;
        info!(path = %path.address(), name = path.name(), "scenario path created");

        Ok(Self {
            registry,
            currencies: scenario.path.currencies.iter().copied().collect(),
            path,
            ledger: MemoryLedger::new(),
            creator: scenario.creator,
            registry_owner: scenario.registry_owner,
            path_events: Vec::new(),
        })
    }

    /// Apply every step. With `strict`, stop at the first failing step.
    pub fn run(mut self, steps: &[Step], strict: bool) -> Result<Report> {
        let mut outcomes = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            let result = self.apply(step);
            self.path_events.extend(self.path.take_events());

            let outcome = match result {
                Ok(amount) => StepOutcome {
                    index,
                    action: step.name(),
                    ok: true,
                    amount: amount.map(|a| a.to_string()),
                    error: None,
                },
                Err(e) => {
                    warn!(index, action = step.name(), error = %e, "step failed");
                    if strict {
                        bail!("step {index} ({}) failed: {e}", step.name());
                    }
                    StepOutcome {
                        index,
                        action: step.name(),
                        ok: false,
                        amount: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }
        Ok(self.report(outcomes))
    }

    fn apply(&mut self, step: &Step) -> Result<Option<u128>, ReveelError> {
        let as_caller = |caller: &Option<Address>, default: Address| {
            CallContext::direct(caller.unwrap_or(default))
        };

        match step {
            Step::Deposit { currency, amount } => {
                self.currencies.insert(*currency);
                self.ledger.credit(&self.path.address(), currency, *amount)?;
                Ok(Some(*amount))
            }
            Step::Settle { currency } => {
                self.currencies.insert(*currency);
                self.path.settle(&mut self.ledger, currency).map(Some)
            }
            Step::Release { currency, wallet } => {
                self.currencies.insert(*currency);
                self.path.release(&mut self.ledger, currency, wallet).map(Some)
            }
            Step::AddTiers { wallet_lists, share_lists, caller } => {
                let ctx = as_caller(caller, self.creator);
                self.path
                    .add_tiers(&ctx, wallet_lists.clone(), share_lists.clone())
                    .map(|_| None)
            }
            Step::UpdateTiers { wallet_lists, share_lists, indices, caller } => {
                let ctx = as_caller(caller, self.creator);
                self.path
                    .update_tiers(&ctx, wallet_lists.clone(), share_lists.clone(), indices)
                    .map(|_| None)
            }
            Step::UpdateLimits { currencies, limits, tier, caller } => {
                let ctx = as_caller(caller, self.creator);
                self.path
                    .update_limits(&ctx, currencies, limits, *tier)
                    .map(|_| None)
            }
            Step::SetPlatformWallet { wallet, caller } => {
                let ctx = as_caller(caller, self.registry_owner);
                self.registry.set_platform_wallet(&ctx, *wallet).map(|_| None)
            }
        }
    }

    fn report(mut self, steps: Vec<StepOutcome>) -> Report {
        let snapshot = self.path.snapshot();

        let mut holders: BTreeSet<Address> = snapshot
            .tiers
            .iter()
            .flat_map(|t| t.wallets.iter().copied())
            .collect();
        for view in &snapshot.currencies {
            holders.extend(view.beneficiaries.iter().map(|b| b.wallet));
        }
        holders.insert(self.registry.platform_wallet());
        holders.insert(self.path.address());

        let ledger = &self.ledger;
        let holders = &holders;
        let balances = self
            .currencies
            .iter()
            .flat_map(|currency| {
                holders.iter().map(move |holder| Balance {
                    holder: *holder,
                    currency: *currency,
                    amount: ledger.balance(holder, currency),
                })
            })
            .filter(|b| b.amount > 0)
            .collect();

        Report {
            path: snapshot,
            steps,
            balances,
            path_events: self.path_events,
            registry_events: self.registry.take_events(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(json: &str) -> Scenario {
        serde_json::from_str(json).unwrap()
    }

    const TWO_TIERS: &str = r#"{
        "registry": {
            "implementation": "0x1111111111111111111111111111111111111111",
            "platform_wallet": "0xfefefefefefefefefefefefefefefefefefefefe",
            "platform_fee": 100000
        },
        "path": {
            "name": "two tiers",
            "wallet_lists": [
                ["0x0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a", "0x0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b"],
                ["0x0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c"]
            ],
            "share_lists": [[5000000, 5000000], [10000000]],
            "currencies": ["native"],
            "limit_sequence": [["1000"]]
        },
        "steps": [
            {"action": "deposit", "currency": "native", "amount": "1500"},
            {"action": "release", "currency": "native", "wallet": "0x0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c"},
            {"action": "update_limits", "currencies": ["native"], "limits": ["5"], "tier": 1},
            {"action": "release", "currency": "native", "wallet": "0x0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c"}
        ]
    }"#;

    #[test]
    fn parses_steps() {
        let s = scenario(TWO_TIERS);
        assert_eq!(s.creator, DEFAULT_OWNER);
        assert_eq!(s.steps.len(), 4);
        assert_eq!(
            s.steps[0],
            Step::Deposit { currency: Currency::Native, amount: 1_500 }
        );
        assert!(matches!(s.steps[2], Step::UpdateLimits { tier: 1, .. }));
    }

    #[test]
    fn runs_and_reports_failures() {
        let s = scenario(TWO_TIERS);
        let cfg = s.registry_config(None).unwrap();
        let report = Runner::new(&s, &cfg).unwrap().run(&s.steps, false).unwrap();

        assert!(report.steps[0].ok);
        assert_eq!(report.steps[1].amount.as_deref(), Some("495"));
        assert!(!report.steps[2].ok);
        assert!(report.steps[2].error.as_deref().unwrap().contains("final tier"));
        assert!(!report.steps[3].ok);

        let platform = Address([0xFE; 20]);
        assert!(report
            .balances
            .iter()
            .any(|b| b.holder == platform && b.amount == 15));
        assert_eq!(report.registry_events.len(), 1);
        assert!(report
            .path_events
            .iter()
            .any(|e| matches!(e, PathEvent::PaymentReleased { amount: 495, .. })));
    }

    #[test]
    fn strict_mode_stops_at_first_failure() {
        let s = scenario(TWO_TIERS);
        let cfg = s.registry_config(None).unwrap();
        let err = Runner::new(&s, &cfg).unwrap().run(&s.steps, true).unwrap_err();
        assert!(err.to_string().contains("step 2 (update_limits)"));
    }

    #[test]
    fn demo_scenario_runs_cleanly() {
        let s = scenario(include_str!("../../../demos/three_tier.json"));
        let cfg = s.registry_config(None).unwrap();
        let report = Runner::new(&s, &cfg).unwrap().run(&s.steps, true).unwrap();

        assert!(report.steps.iter().all(|o| o.ok));
        assert_eq!(report.path.tiers.len(), 3);
        assert!(report
            .path_events
            .iter()
            .any(|e| matches!(e, PathEvent::LimitUpdated { tier: 1, .. })));
    }

    #[test]
    fn reads_scenario_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("s.json");
        std::fs::write(&file, TWO_TIERS).unwrap();
        let s = Scenario::from_file(&file).unwrap();
        assert_eq!(s.path.name, "two tiers");
        assert!(Scenario::from_file(&dir.path().join("missing.json")).is_err());
    }
}
