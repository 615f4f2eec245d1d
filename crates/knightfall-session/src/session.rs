//! The membership session state machine.
//!
//! ```text
//! Disconnected --connect--> Connecting --fetch ok--> Ready { member }
//!                               |                       |
//!                               +--fetch err--> Error   +--mint/whitelist ok--> refresh
//!
//! any --accounts_changed--> Connecting
//! ```
//!
//! # Single flight
//!
//! Every trigger that starts a fetch (connect, refresh, account switch) bumps
//! the session epoch and captures `(address, epoch)`. A fetch result is
//! applied only if both still match when it completes; anything else is
//! dropped. The state lock is never held across a ledger call.
//!
//! # Restore cache
//!
//! Applied records are written to the restore cache. On construction the
//! last snapshot is loaded as provisional display data; it is only exposed
//! while the session address matches and is replaced by the first live
//! record. Route gating never looks at it.

use crate::annotation::{validate_coordinates, Annotation, AnnotationStore};
use crate::cache::{purge_legacy, CachedSnapshot, RestoreCache};
use crate::category::Category;
use crate::error::{Error, Result};
use crate::intent::{IntentKind, PendingIntent};
use crate::ledger::{Ledger, WalletProvider};
use crate::record::MembershipRecord;
use crate::types::{Address, TokenId};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

/// Status shown when no wallet provider is configured.
pub const WALLET_MISSING_STATUS: &str = "Please install a wallet provider!";

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Disconnected,
    Connecting,
    Ready {
        member: bool,
    },
    Error,
}

/// Read-only picture of a session, published to consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub phase: Phase,
    pub address: Option<Address>,
    pub total_supply: Option<u64>,
    /// Live record, straight from the ledger.
    pub record: Option<MembershipRecord>,
    /// Cached snapshot for `address`, shown until the live record arrives.
    pub provisional: Option<CachedSnapshot>,
    pub status: String,
    pub minting: bool,
    pub whitelisting: bool,
}

impl SessionView {
    /// Membership according to the ledger, if it has answered.
    pub fn live_membership(&self) -> Option<bool> {
        self.record.as_ref().map(MembershipRecord::is_member)
    }
}

/// What became of a fetch once it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The result was applied and the session is now in this phase.
    Applied(Phase),
    /// A newer trigger superseded the fetch; its result was dropped.
    Discarded,
}

/// A token held by the session's address, with its holder's details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultToken {
    pub token_id: TokenId,
    pub name: Option<String>,
    pub category: Option<Category>,
    pub token_uri: String,
}

#[derive(Debug, Default)]
struct Inner {
    phase: Phase,
    address: Option<Address>,
    epoch: u64,
    total_supply: Option<u64>,
    record: Option<MembershipRecord>,
    provisional: Option<CachedSnapshot>,
    status: String,
}

impl Inner {
    fn is_current(&self, address: &Address, epoch: u64) -> bool {
        self.epoch == epoch && self.address.as_ref() == Some(address)
    }

    /// Start a new fetch generation.
    fn bump(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    fn view(&self, minting: bool, whitelisting: bool) -> SessionView {
        let provisional = match (&self.record, &self.provisional, &self.address) {
            (None, Some(snapshot), Some(address)) if snapshot.address == *address => {
                Some(snapshot.clone())
            }
            _ => None,
        };
        SessionView {
            phase: self.phase,
            address: self.address,
            total_supply: self.total_supply,
            record: self.record.clone(),
            provisional,
            status: self.status.clone(),
            minting,
            whitelisting,
        }
    }
}

/// One connected wallet and its derived membership state.
pub struct Session {
    ledger: Arc<dyn Ledger>,
    wallet: Option<Arc<dyn WalletProvider>>,
    cache: Arc<dyn RestoreCache>,
    inner: Mutex<Inner>,
    view_tx: watch::Sender<SessionView>,
    minting: AtomicBool,
    whitelisting: AtomicBool,
}

/// Holds one intent kind's in-flight slot; releasing it on drop covers
/// every way the submitting future can end, cancellation included.
struct InFlight<'a> {
    session: &'a Session,
    kind: IntentKind,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.session.in_flight(self.kind).store(false, Ordering::SeqCst);
        let kind = self.kind;
        self.session.view_tx.send_modify(|view| match kind {
            IntentKind::Mint => view.minting = false,
            IntentKind::Whitelist => view.whitelisting = false,
        });
    }
}

impl Session {
    /// Build a disconnected session, hydrating provisional state from `cache`.
    ///
    /// `wallet` is `None` when no wallet provider is present; connecting
    /// then fails with [`Error::WalletUnavailable`].
    pub fn new(
        ledger: Arc<dyn Ledger>,
        wallet: Option<Arc<dyn WalletProvider>>,
        cache: Arc<dyn RestoreCache>,
    ) -> Self {
        if let Err(e) = purge_legacy(cache.as_ref()) {
            warn!("failed to purge legacy membership flag: {}", e);
        }
        let provisional = CachedSnapshot::load_last(cache.as_ref()).unwrap_or_else(|e| {
            warn!("failed to load cached snapshot: {}", e);
            None
        });

        let inner = Inner {
            provisional,
            ..Inner::default()
        };
        let (view_tx, _) = watch::channel(inner.view(false, false));
        Self {
            ledger,
            wallet,
            cache,
            inner: Mutex::new(inner),
            view_tx,
            minting: AtomicBool::new(false),
            whitelisting: AtomicBool::new(false),
        }
    }

    /// Current state of the session.
    pub fn view(&self) -> SessionView {
        self.view_tx.borrow().clone()
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }

    fn publish(&self, inner: &Inner) {
        // Flags are read inside the channel lock so a concurrent release
        // is never overwritten with a stale `true`.
        self.view_tx.send_modify(|view| {
            *view = inner.view(
                self.minting.load(Ordering::SeqCst),
                self.whitelisting.load(Ordering::SeqCst),
            );
        });
    }

    fn in_flight(&self, kind: IntentKind) -> &AtomicBool {
        match kind {
            IntentKind::Mint => &self.minting,
            IntentKind::Whitelist => &self.whitelisting,
        }
    }

    /// Acquire a wallet address and derive its membership.
    ///
    /// An already authorized account is used when there is one; the wallet
    /// is only prompted when there is none.
    pub async fn connect(&self) -> Result<RefreshOutcome> {
        let epoch = {
            let mut inner = self.inner.lock().await;
            let epoch = inner.bump();
            inner.phase = Phase::Connecting;
            inner.status.clear();
            self.publish(&inner);
            epoch
        };

        let Some(wallet) = self.wallet.clone() else {
            return self.fail(epoch, Error::WalletUnavailable, true).await;
        };
        let address = match acquire_address(wallet.as_ref()).await {
            Ok(address) => address,
            Err(e) => return self.fail(epoch, e, true).await,
        };

        {
            let mut inner = self.inner.lock().await;
            if inner.epoch != epoch {
                debug!(%address, epoch, "{}", Error::StaleResponseDiscarded);
                return Ok(RefreshOutcome::Discarded);
            }
            if inner.address != Some(address) {
                inner.record = None;
                inner.provisional = self.load_provisional(&address);
            }
            inner.address = Some(address);
            self.publish(&inner);
        }
        info!(%address, "wallet connected");

        self.run_refresh(address, epoch).await
    }

    /// Re-derive the record for the current address.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let (address, epoch) = {
            let mut inner = self.inner.lock().await;
            let address = inner.address.ok_or(Error::NotConnected)?;
            let epoch = inner.bump();
            inner.phase = Phase::Connecting;
            self.publish(&inner);
            (address, epoch)
        };
        self.run_refresh(address, epoch).await
    }

    /// Handle a wallet account switch.
    ///
    /// The previous record is cleared before any fetch for the new address
    /// starts. An empty account list disconnects the session.
    pub async fn accounts_changed(&self, accounts: &[Address]) -> Result<RefreshOutcome> {
        let Some(address) = accounts.first().copied() else {
            self.disconnect().await;
            return Ok(RefreshOutcome::Applied(Phase::Disconnected));
        };

        let epoch = {
            let mut inner = self.inner.lock().await;
            let epoch = inner.bump();
            inner.address = Some(address);
            inner.record = None;
            inner.provisional = self.load_provisional(&address);
            inner.phase = Phase::Connecting;
            inner.status.clear();
            self.publish(&inner);
            epoch
        };
        info!(%address, "account changed");

        self.run_refresh(address, epoch).await
    }

    /// Forget the connected address. Any fetch still running is superseded.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        inner.bump();
        inner.phase = Phase::Disconnected;
        inner.address = None;
        inner.total_supply = None;
        inner.record = None;
        inner.provisional = None;
        inner.status.clear();
        self.publish(&inner);
        info!("session disconnected");
    }

    /// Submit `mintMembership(name, token_uri)` from the session address.
    pub async fn mint(&self, name: &str, token_uri: &str) -> Result<RefreshOutcome> {
        self.submit(PendingIntent::Mint {
            name: name.trim().to_string(),
            token_uri: token_uri.trim().to_string(),
        })
        .await
    }

    /// Submit `whitelistMember(target)` from the session address.
    pub async fn whitelist(&self, target: Address) -> Result<RefreshOutcome> {
        self.submit(PendingIntent::Whitelist { target }).await
    }

    /// Whether the session address may mint.
    pub async fn is_whitelisted(&self) -> Result<bool> {
        let address = self.current_address().await?;
        self.ledger.is_whitelisted(&address).await
    }

    /// Tokens owned by the session address.
    ///
    /// Walks token ids `1..=totalSupply`; ids whose lookups fail are skipped.
    /// Each token carries the holder's name and category, blank where those
    /// lookups fail.
    pub async fn vault(&self) -> Result<Vec<VaultToken>> {
        let address = self.current_address().await?;
        let total = self.ledger.total_supply().await?;

        let mut owned = Vec::new();
        for id in 1..=total {
            let token_id = TokenId(id);
            match self.ledger.owner_of(token_id).await {
                Ok(owner) if owner == address => {}
                Ok(_) => continue,
                Err(e) => {
                    debug!(%token_id, "skipping token: {}", e);
                    continue;
                }
            }
            match self.ledger.token_uri(token_id).await {
                Ok(token_uri) => owned.push((token_id, token_uri)),
                Err(e) => debug!(%token_id, "skipping token without URI: {}", e),
            }
        }
        if owned.is_empty() {
            return Ok(Vec::new());
        }

        let (name, category) = tokio::join!(
            self.ledger.member_name(&address),
            self.ledger.member_category(&address),
        );
        let name = degrade("member name", &address, name);
        let category = degrade("member category", &address, category).map(Category::from_index);

        Ok(owned
            .into_iter()
            .map(|(token_id, token_uri)| VaultToken {
                token_id,
                name: name.clone(),
                category,
                token_uri,
            })
            .collect())
    }

    /// Pin the member on the map.
    ///
    /// Refused unless the live record carries a token id, a name and a
    /// category for the current address.
    pub async fn pin_location(
        &self,
        store: &dyn AnnotationStore,
        lon: f64,
        lat: f64,
    ) -> Result<Annotation> {
        let annotation = {
            let inner = self.inner.lock().await;
            let record = inner
                .record
                .as_ref()
                .filter(|r| r.is_member() && Some(r.address()) == inner.address)
                .ok_or(Error::MissingMemberData)?;
            let (Some(token_id), Some(name), Some(category)) =
                (record.token_id(), record.name(), record.category())
            else {
                return Err(Error::MissingMemberData);
            };
            Annotation {
                token_id,
                name: name.to_string(),
                category,
                lon,
                lat,
                created_at: unix_now(),
            }
        };
        validate_coordinates(lon, lat)?;

        store.upsert_annotation(annotation.clone()).await?;
        info!(token_id = %annotation.token_id, lon, lat, "location pinned");
        Ok(annotation)
    }

    async fn current_address(&self) -> Result<Address> {
        self.inner.lock().await.address.ok_or(Error::NotConnected)
    }

    fn load_provisional(&self, address: &Address) -> Option<CachedSnapshot> {
        CachedSnapshot::load(self.cache.as_ref(), address).unwrap_or_else(|e| {
            warn!(%address, "failed to load cached snapshot: {}", e);
            None
        })
    }

    async fn submit(&self, intent: PendingIntent) -> Result<RefreshOutcome> {
        intent.validate()?;
        let kind = intent.kind();

        let (from, slot) = {
            let inner = self.inner.lock().await;
            let from = match (inner.address, inner.phase) {
                (Some(address), Phase::Ready { .. }) => address,
                _ => return Err(Error::NotConnected),
            };
            if self.in_flight(kind).swap(true, Ordering::SeqCst) {
                return Err(Error::IntentInFlight(kind.as_str()));
            }
            let slot = InFlight { session: self, kind };
            self.publish(&inner);
            (from, slot)
        };

        let result = self.execute(&from, &intent).await;

        {
            let mut inner = self.inner.lock().await;
            drop(slot);
            if let Err(e) = result {
                let reason = match e {
                    Error::TransactionFailed(reason) => reason,
                    other => other.to_string(),
                };
                inner.status = intent.failed_status(&reason);
                self.publish(&inner);
                warn!(%from, kind = kind.as_str(), "transaction failed: {}", reason);
                return Err(Error::TransactionFailed(reason));
            }
            inner.status = intent.confirmed_status();
            self.publish(&inner);
        }

        self.refresh_for(from).await
    }

    async fn execute(&self, from: &Address, intent: &PendingIntent) -> Result<()> {
        let tx = match intent {
            PendingIntent::Mint { name, token_uri } => {
                self.ledger.mint_membership(from, name, token_uri).await?
            }
            PendingIntent::Whitelist { target } => self.ledger.whitelist_member(from, target).await?,
        };

        {
            let mut inner = self.inner.lock().await;
            inner.status = intent.submitted_status(&tx);
            self.publish(&inner);
        }

        self.ledger.wait_for_confirmation(&tx).await?;
        info!(%from, %tx, kind = intent.kind().as_str(), "transaction confirmed");
        Ok(())
    }

    /// Refresh after a mutation, unless the session moved to another address.
    async fn refresh_for(&self, address: Address) -> Result<RefreshOutcome> {
        let epoch = {
            let mut inner = self.inner.lock().await;
            if inner.address != Some(address) {
                debug!(%address, "{}", Error::StaleResponseDiscarded);
                return Ok(RefreshOutcome::Discarded);
            }
            let epoch = inner.bump();
            inner.phase = Phase::Connecting;
            self.publish(&inner);
            epoch
        };
        self.run_refresh(address, epoch).await
    }

    async fn run_refresh(&self, address: Address, epoch: u64) -> Result<RefreshOutcome> {
        match fetch_record(self.ledger.as_ref(), &address).await {
            Ok((total_supply, record)) => self.apply(address, epoch, total_supply, record).await,
            Err(e) => self.fail(epoch, e, false).await,
        }
    }

    async fn apply(
        &self,
        address: Address,
        epoch: u64,
        total_supply: u64,
        record: MembershipRecord,
    ) -> Result<RefreshOutcome> {
        let mut inner = self.inner.lock().await;
        if !inner.is_current(&address, epoch) {
            debug!(%address, epoch, "{}", Error::StaleResponseDiscarded);
            return Ok(RefreshOutcome::Discarded);
        }

        if let Err(e) = CachedSnapshot::from_record(&record).store(self.cache.as_ref()) {
            warn!(%address, "failed to persist snapshot: {}", e);
        }

        let member = record.is_member();
        inner.phase = Phase::Ready { member };
        inner.total_supply = Some(total_supply);
        inner.record = Some(record);
        inner.provisional = None;
        self.publish(&inner);
        info!(%address, member, total_supply, "session ready");

        Ok(RefreshOutcome::Applied(inner.phase))
    }

    /// Settle a failed fetch. `forget_address` is set when no address was
    /// acquired, so nothing keeps answering for a previous account.
    async fn fail(&self, epoch: u64, error: Error, forget_address: bool) -> Result<RefreshOutcome> {
        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            debug!(epoch, "{}: {}", Error::StaleResponseDiscarded, error);
            return Ok(RefreshOutcome::Discarded);
        }

        if forget_address {
            inner.address = None;
            inner.total_supply = None;
        }
        inner.phase = Phase::Error;
        inner.record = None;
        inner.provisional = None;
        inner.status = match error {
            Error::WalletUnavailable => WALLET_MISSING_STATUS.to_string(),
            ref other => format!("Error: {other}"),
        };
        self.publish(&inner);
        warn!("session failed: {}", error);

        Err(error)
    }
}

async fn acquire_address(wallet: &dyn WalletProvider) -> Result<Address> {
    if let Some(address) = wallet.accounts().await?.first() {
        return Ok(*address);
    }
    wallet
        .request_accounts()
        .await?
        .first()
        .copied()
        .ok_or_else(|| Error::AuthorizationDenied("no account was authorized".into()))
}

/// Fetch plan: supply, then membership, then the three member fields.
///
/// The member fields are fetched concurrently and each failure only blanks
/// its own field.
async fn fetch_record(ledger: &dyn Ledger, address: &Address) -> Result<(u64, MembershipRecord)> {
    let total_supply = ledger.total_supply().await?;
    if !ledger.is_member(address).await? {
        return Ok((total_supply, MembershipRecord::non_member(*address)));
    }

    let (name, token_id, category) = tokio::join!(
        ledger.member_name(address),
        ledger.token_id_for(address),
        ledger.member_category(address),
    );
    let record = MembershipRecord::member(
        *address,
        degrade("member name", address, name),
        degrade("member category", address, category).map(Category::from_index),
        degrade("token id", address, token_id),
    );
    Ok((total_supply, record))
}

fn degrade<T>(field: &'static str, address: &Address, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            let error = Error::FieldFetchFailed {
                field,
                reason: e.to_string(),
            };
            warn!(%address, "{}", error);
            None
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
