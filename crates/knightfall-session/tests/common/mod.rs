//! Scripted ledger and wallet for session tests.

#![allow(dead_code)]

use async_trait::async_trait;
use knightfall_session::{
    Address, Error, Ledger, Result, SessionView, TokenId, TxHash, WalletProvider,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify};

pub fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

pub fn alice() -> Address {
    addr("0x00000000000000000000000000000000000a11ce")
}

pub fn bob() -> Address {
    addr("0x0000000000000000000000000000000000000b0b")
}

pub fn authority() -> Address {
    addr("0x000000000000000000000000000000000000a0a0")
}

#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub category: u64,
    pub token_id: u64,
}

#[derive(Debug, Clone)]
enum PendingTx {
    Mint { from: Address, name: String, uri: String },
    Whitelist { target: Address },
}

#[derive(Default)]
struct LedgerState {
    supply: u64,
    members: HashMap<Address, Member>,
    whitelisted: HashSet<Address>,
    owners: HashMap<u64, Address>,
    uris: HashMap<u64, String>,
    failing: HashSet<&'static str>,
    pending: HashMap<String, PendingTx>,
    next_tx: u64,
    mint_error: Option<String>,
}

/// In-memory membership contract with failure injection and gates.
#[derive(Default)]
pub struct FakeLedger {
    state: Mutex<LedgerState>,
    member_gates: Mutex<HashMap<Address, Arc<Notify>>>,
    confirm_gate: Mutex<Option<Arc<Notify>>>,
    pub supply_calls: AtomicUsize,
    pub field_calls: AtomicUsize,
}

impl FakeLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_member(&self, address: Address, name: &str, category: u64) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.supply += 1;
        let token_id = state.supply;
        state.members.insert(
            address,
            Member {
                name: name.to_string(),
                category,
                token_id,
            },
        );
        state.owners.insert(token_id, address);
        state.uris.insert(token_id, format!("ipfs://sigil/{token_id}"));
        token_id
    }

    pub fn add_token(&self, owner: Address, uri: Option<&str>) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.supply += 1;
        let token_id = state.supply;
        state.owners.insert(token_id, owner);
        if let Some(uri) = uri {
            state.uris.insert(token_id, uri.to_string());
        }
        token_id
    }

    pub fn whitelist(&self, address: Address) {
        self.state.lock().unwrap().whitelisted.insert(address);
    }

    /// Make one ledger method fail, by method name.
    pub fn fail(&self, method: &'static str) {
        self.state.lock().unwrap().failing.insert(method);
    }

    pub fn fail_mint(&self, reason: &str) {
        self.state.lock().unwrap().mint_error = Some(reason.to_string());
    }

    /// Hold `isMember(address)` until the returned gate is notified.
    pub fn gate_membership(&self, address: Address) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.member_gates
            .lock()
            .unwrap()
            .insert(address, Arc::clone(&gate));
        gate
    }

    /// Hold the next confirmation until the returned gate is notified.
    pub fn gate_confirmation(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.confirm_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    fn check(&self, method: &'static str) -> Result<()> {
        if self.state.lock().unwrap().failing.contains(method) {
            return Err(Error::Ledger(format!("{method} reverted")));
        }
        Ok(())
    }

    fn member(&self, address: &Address) -> Result<Member> {
        self.state
            .lock()
            .unwrap()
            .members
            .get(address)
            .cloned()
            .ok_or_else(|| Error::Ledger("not a member".into()))
    }

    fn queue(&self, tx: PendingTx) -> TxHash {
        let mut state = self.state.lock().unwrap();
        state.next_tx += 1;
        let hash = format!("0x{:064x}", state.next_tx);
        state.pending.insert(hash.clone(), tx);
        TxHash(hash)
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn total_supply(&self) -> Result<u64> {
        self.supply_calls.fetch_add(1, Ordering::SeqCst);
        self.check("totalSupply")?;
        Ok(self.state.lock().unwrap().supply)
    }

    async fn is_member(&self, address: &Address) -> Result<bool> {
        let gate = self.member_gates.lock().unwrap().remove(address);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check("isMember")?;
        Ok(self.state.lock().unwrap().members.contains_key(address))
    }

    async fn member_name(&self, address: &Address) -> Result<String> {
        self.field_calls.fetch_add(1, Ordering::SeqCst);
        self.check("memberName")?;
        Ok(self.member(address)?.name)
    }

    async fn member_category(&self, address: &Address) -> Result<u64> {
        self.field_calls.fetch_add(1, Ordering::SeqCst);
        self.check("memberCategory")?;
        Ok(self.member(address)?.category)
    }

    async fn token_id_for(&self, address: &Address) -> Result<TokenId> {
        self.field_calls.fetch_add(1, Ordering::SeqCst);
        self.check("getTokenIdForAddress")?;
        Ok(TokenId(self.member(address)?.token_id))
    }

    async fn is_whitelisted(&self, address: &Address) -> Result<bool> {
        self.check("isWhitelisted")?;
        Ok(self.state.lock().unwrap().whitelisted.contains(address))
    }

    async fn owner_of(&self, token_id: TokenId) -> Result<Address> {
        self.check("ownerOf")?;
        self.state
            .lock()
            .unwrap()
            .owners
            .get(&token_id.0)
            .copied()
            .ok_or_else(|| Error::Ledger("nonexistent token".into()))
    }

    async fn token_uri(&self, token_id: TokenId) -> Result<String> {
        self.check("tokenURI")?;
        self.state
            .lock()
            .unwrap()
            .uris
            .get(&token_id.0)
            .cloned()
            .ok_or_else(|| Error::Ledger("no URI".into()))
    }

    async fn mint_membership(&self, from: &Address, name: &str, token_uri: &str) -> Result<TxHash> {
        {
            let state = self.state.lock().unwrap();
            if let Some(reason) = &state.mint_error {
                return Err(Error::TransactionFailed(reason.clone()));
            }
            if !state.whitelisted.contains(from) {
                return Err(Error::TransactionFailed("execution reverted: not whitelisted".into()));
            }
        }
        Ok(self.queue(PendingTx::Mint {
            from: *from,
            name: name.to_string(),
            uri: token_uri.to_string(),
        }))
    }

    async fn whitelist_member(&self, _from: &Address, target: &Address) -> Result<TxHash> {
        Ok(self.queue(PendingTx::Whitelist { target: *target }))
    }

    async fn wait_for_confirmation(&self, tx: &TxHash) -> Result<()> {
        let gate = self.confirm_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        let pending = state
            .pending
            .remove(&tx.0)
            .ok_or_else(|| Error::TransactionFailed("unknown transaction".into()))?;
        match pending {
            PendingTx::Mint { from, name, uri } => {
                state.supply += 1;
                let token_id = state.supply;
                state.members.insert(
                    from,
                    Member {
                        name,
                        category: 1,
                        token_id,
                    },
                );
                state.owners.insert(token_id, from);
                state.uris.insert(token_id, uri);
            }
            PendingTx::Whitelist { target } => {
                state.whitelisted.insert(target);
            }
        }
        Ok(())
    }
}

/// Wallet with a fixed authorized list and a scripted prompt answer.
#[derive(Default)]
pub struct FakeWallet {
    authorized: Mutex<Vec<Address>>,
    grant: Mutex<Option<Address>>,
    pub prompts: AtomicUsize,
}

impl FakeWallet {
    /// Wallet that already authorized `address`.
    pub fn authorized(address: Address) -> Arc<Self> {
        let wallet = Self::default();
        wallet.authorized.lock().unwrap().push(address);
        Arc::new(wallet)
    }

    /// Wallet with no authorized account that grants `address` on prompt.
    pub fn granting(address: Address) -> Arc<Self> {
        let wallet = Self::default();
        *wallet.grant.lock().unwrap() = Some(address);
        Arc::new(wallet)
    }

    /// Wallet whose user rejects the prompt.
    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Withdraw every authorization; later prompts are rejected.
    pub fn revoke(&self) {
        self.authorized.lock().unwrap().clear();
        *self.grant.lock().unwrap() = None;
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(self.authorized.lock().unwrap().clone())
    }

    async fn request_accounts(&self) -> Result<Vec<Address>> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let granted = *self.grant.lock().unwrap();
        match granted {
            Some(address) => {
                self.authorized.lock().unwrap().push(address);
                Ok(vec![address])
            }
            None => Err(Error::AuthorizationDenied("User rejected the request.".into())),
        }
    }
}

/// Wait until the published view satisfies `pred`.
pub async fn wait_for_view(
    rx: &mut watch::Receiver<SessionView>,
    pred: impl FnMut(&SessionView) -> bool,
) -> SessionView {
    let view = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("timed out waiting for session view")
        .expect("session dropped");
    SessionView::clone(&view)
}
