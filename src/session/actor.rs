//! Session actor
//!
//! One task per connection owns the whole game: state machine, world, ledger
//! and timers. Player commands arrive on one queue, timer and collaborator
//! results on another; the tick interval is only polled while a game is
//! running and no wallet or claim request is in flight.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::claim::{ClaimCoordinator, ClaimOutcome};
use super::event::{Command, SessionEvent};
use super::outbound::Outbound;
use super::state::{SessionState, Transition};
use super::timers::{TimerKind, Timers};
use crate::config::{
    RuntimeConfig, FLOAT_TEXT_TTL, LIFE_LOST_TEXT, MAX_LIVES, SESSION_QUEUE_CAPACITY, SPECIAL_DWELL,
    SPECIAL_SPAWN_PERIOD, TICK_DELAY_MS,
};
use crate::game::spawner::ItemSpawner;
use crate::game::{Grid, InventoryLedger, ItemKind, Location, TickOutcome, World};
use crate::identity::Address;
use crate::journal::{EventJournal, JournalEvent};
use crate::protocol::{FloatText, ItemView, ServerMessage, SessionView};
use crate::wallet::{NetworkParams, PaymentReceipt, Wallet, WalletError};

/// Collaborators a session talks to
#[derive(Clone)]
pub struct SessionDeps {
    pub wallet: Arc<dyn Wallet>,
    pub claims: ClaimCoordinator,
    pub journal: Arc<EventJournal>,
    pub runtime: RuntimeConfig,
}

/// Sending side of a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Queue a command. Returns `false` once the session has stopped.
    pub async fn send(&self, command: Command) -> bool {
        self.commands.send(command).await.is_ok()
    }
}

/// Start a session task. It stops when every [`SessionHandle`] is dropped.
pub fn spawn_session(
    id: Uuid,
    deps: SessionDeps,
    outbound: Outbound,
) -> (SessionHandle, JoinHandle<()>) {
    let (commands_tx, commands_rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);
    let (session, events) = Session::new(id, deps, outbound);
    let task = tokio::spawn(session.run(commands_rx, events));

    (SessionHandle { commands: commands_tx }, task)
}

/// Collaborator request in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingOp {
    Connect,
    Payment,
    Claim,
}

impl PendingOp {
    fn describe(&self) -> &'static str {
        match self {
            PendingOp::Connect => "wallet connection",
            PendingOp::Payment => "payment",
            PendingOp::Claim => "claim",
        }
    }
}

struct Session {
    id: Uuid,
    deps: SessionDeps,
    outbound: Outbound,
    /// Handed to background operations so they can post their result
    events: mpsc::Sender<SessionEvent>,
    state: SessionState,
    identity: Option<Address>,
    world: Option<World>,
    /// Grid for the next game
    next_grid: Grid,
    pending: Option<PendingOp>,
    timers: Timers,
    float_texts: Vec<FloatText>,
    next_float_id: u64,
}

impl Session {
    fn new(
        id: Uuid,
        deps: SessionDeps,
        outbound: Outbound,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);

        let session = Self {
            id,
            deps,
            outbound,
            events: events_tx.clone(),
            state: SessionState::Disconnected,
            identity: None,
            world: None,
            next_grid: Grid::default(),
            pending: None,
            timers: Timers::new(events_tx),
            float_texts: Vec::new(),
            next_float_id: 1,
        };
        (session, events_rx)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>, mut events: mpsc::Receiver<SessionEvent>) {
        info!("Session {} started", self.id);

        let mut ticker = interval(Duration::from_millis(TICK_DELAY_MS));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut was_ticking = false;

        self.publish();

        loop {
            let ticking = self.is_ticking();
            if ticking && !was_ticking {
                ticker.reset();
            }
            was_ticking = ticking;

            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = events.recv() => self.handle_event(event),
                _ = ticker.tick(), if ticking => self.on_tick(),
            }
        }

        self.timers.cancel_all();
        info!("Session {} closed", self.id);
    }

    fn is_ticking(&self) -> bool {
        self.state.is_playing() && self.pending.is_none()
    }

    // =========================================================================
    // Commands
    // =========================================================================

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Steer(direction) => {
                if let (true, Some(world)) = (self.state.is_playing(), self.world.as_mut()) {
                    world.steer(direction);
                }
                return;
            }
            Command::Connect => self.connect(),
            Command::Pay => self.pay(),
            Command::Claim => self.claim(),
            Command::Restart => self.restart(),
            Command::Resize { cols, rows } => {
                self.next_grid = Grid::clamped(cols, rows);
                debug!(
                    "Session {} grid set to {}x{}",
                    self.id, self.next_grid.cols, self.next_grid.rows
                );
            }
        }
        self.publish();
    }

    fn connect(&mut self) {
        if self.state != SessionState::Disconnected {
            debug!("Session {} ignoring connect in {:?}", self.id, self.state);
            return;
        }
        if !self.begin(PendingOp::Connect) {
            return;
        }

        let wallet = self.deps.wallet.clone();
        self.spawn_op(async move { SessionEvent::WalletConnected(connect_wallet(wallet).await) });
    }

    fn pay(&mut self) {
        let Some(next) = self.state.next(Transition::PaymentRequested) else {
            debug!("Session {} ignoring pay in {:?}", self.id, self.state);
            return;
        };
        if !self.begin(PendingOp::Payment) {
            return;
        }
        self.state = next;

        let wallet = self.deps.wallet.clone();
        let treasury = self.deps.runtime.treasury.clone();
        let amount = self.deps.runtime.pay_amount;
        info!("Session {} paying {} MON to {}", self.id, amount, treasury);

        self.spawn_op(async move { SessionEvent::PaymentSettled(wallet.send_payment(&treasury, amount).await) });
    }

    fn claim(&mut self) {
        let Some(identity) = self.identity.clone() else {
            self.notify("Connect a wallet before claiming");
            return;
        };
        let snapshot = match self.world.as_ref() {
            Some(world) if !world.ledger().is_empty() => world.ledger().snapshot(),
            _ => {
                self.notify("Nothing to claim");
                return;
            }
        };
        if !self.begin(PendingOp::Claim) {
            return;
        }

        // The board stands still until settlement answers
        if self.state.is_playing() {
            self.timers.suspend();
        }

        let claims = self.deps.claims.clone();
        self.spawn_op(async move { SessionEvent::ClaimSettled(claims.submit(&identity, &snapshot).await) });
    }

    fn restart(&mut self) {
        let Some(next) = self.state.next(Transition::Restart) else {
            debug!("Session {} ignoring restart in {:?}", self.id, self.state);
            return;
        };
        if let Some(op) = self.pending {
            self.notify(format!("Please wait, a {} is still pending", op.describe()));
            return;
        }

        self.timers.cancel_all();
        self.world = None;
        self.identity = None;
        self.float_texts.clear();
        self.state = next;
        info!("Session {} restarted", self.id);
    }

    /// Mark `op` as in flight, refusing when another one already is
    fn begin(&mut self, op: PendingOp) -> bool {
        if let Some(current) = self.pending {
            self.notify(format!("Please wait, a {} is still pending", current.describe()));
            return false;
        }
        self.pending = Some(op);
        true
    }

    fn finish(&mut self, op: PendingOp) {
        if self.pending == Some(op) {
            self.pending = None;
        }
    }

    fn spawn_op<F>(&self, op: F)
    where
        F: Future<Output = SessionEvent> + Send + 'static,
    {
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = op.await;
            let _ = events.send(event).await;
        });
    }

    // =========================================================================
    // Events
    // =========================================================================

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::TimerFired { kind, id } => {
                if !self.timers.take_fired(kind, id) {
                    return;
                }
                self.on_timer(kind);
            }
            SessionEvent::WalletConnected(result) => self.on_wallet_connected(result),
            SessionEvent::PaymentSettled(result) => self.on_payment(result),
            SessionEvent::ClaimSettled(outcome) => self.on_claim(outcome),
        }
        self.publish();
    }

    fn on_wallet_connected(&mut self, result: Result<Address, WalletError>) {
        self.finish(PendingOp::Connect);

        match result {
            Ok(address) => {
                let Some(next) = self.state.next(Transition::WalletConnected) else {
                    return;
                };
                info!("Session {} connected wallet {}", self.id, address);
                self.deps.journal.record(JournalEvent::WalletConnected {
                    session: self.id,
                    address: address.to_string(),
                });
                self.identity = Some(address);
                self.state = next;
            }
            Err(e) => {
                warn!("Session {} wallet connection failed: {}", self.id, e);
                self.notify(format!("Wallet connection failed: {e}"));
            }
        }
    }

    fn on_payment(&mut self, result: Result<PaymentReceipt, WalletError>) {
        self.finish(PendingOp::Payment);

        match result {
            Ok(receipt) => {
                if let Some(next) = self.state.next(Transition::PaymentConfirmed) {
                    self.start_game(next, receipt);
                }
            }
            Err(e) => {
                warn!("Session {} payment failed: {}", self.id, e);
                if let Some(next) = self.state.next(Transition::PaymentFailed) {
                    self.state = next;
                }
                self.notify(format!("Payment failed: {e}"));
            }
        }
    }

    fn start_game(&mut self, next: SessionState, receipt: PaymentReceipt) {
        self.timers.cancel_all();
        self.float_texts.clear();

        let grid = self.next_grid;
        self.world = Some(World::new(grid, MAX_LIVES, ItemSpawner::from_entropy()));
        self.state = next;
        self.timers.arm(TimerKind::SpecialSpawn, SPECIAL_SPAWN_PERIOD);

        info!(
            "Session {} game started on {}x{} (payment {})",
            self.id, grid.cols, grid.rows, receipt.reference
        );
        self.deps.journal.record(JournalEvent::GameStarted {
            session: self.id,
            address: self.identity.as_ref().map(|a| a.to_string()).unwrap_or_default(),
            payment: receipt.reference,
        });
    }

    fn on_claim(&mut self, outcome: ClaimOutcome) {
        self.finish(PendingOp::Claim);

        let reset = match self.world.as_mut() {
            Some(world) => outcome.apply(world.ledger_mut()),
            None => Vec::new(),
        };

        match outcome {
            ClaimOutcome::Nothing => self.notify("Nothing to claim"),
            ClaimOutcome::Settled {
                references, skipped, ..
            } => {
                info!("Session {} claim settled: {:?}", self.id, references);
                if !skipped.is_empty() {
                    debug!("Session {} cleared {:?} without a payout", self.id, skipped);
                }
                self.send(ServerMessage::Claimed {
                    references,
                    reset,
                    unsettled: Vec::new(),
                    skipped,
                });
            }
            ClaimOutcome::Partial {
                references,
                unsettled,
                error,
                ..
            } => {
                warn!("Session {} claim partially settled: {}", self.id, error);
                self.send(ServerMessage::Claimed {
                    references,
                    reset,
                    unsettled,
                    skipped: Vec::new(),
                });
                self.notify(format!("Claim partially settled: {error}"));
            }
            ClaimOutcome::Failed { error } => self.notify(format!("Claim failed: {error}")),
        }

        if self.state.is_playing() {
            self.timers.resume();
        }
    }

    fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::SpecialSpawn => self.spawn_special(),
            TimerKind::SpecialDwell => self.expire_special(),
            TimerKind::FloatText(id) => self.float_texts.retain(|text| text.id != id),
        }
    }

    fn spawn_special(&mut self) {
        if !self.state.is_playing() {
            return;
        }
        let Some(world) = self.world.as_mut() else {
            return;
        };

        if world.spawn_special() {
            debug!("Session {} special item spawned", self.id);
            self.timers.arm(TimerKind::SpecialDwell, SPECIAL_DWELL);
        } else {
            self.timers.arm(TimerKind::SpecialSpawn, SPECIAL_SPAWN_PERIOD);
        }
    }

    fn expire_special(&mut self) {
        if !self.state.is_playing() {
            return;
        }
        let Some(world) = self.world.as_mut() else {
            return;
        };

        let at = world.special().map(|item| item.location);
        let Some(loss) = world.expire_special() else {
            return;
        };

        info!("Session {} lost a life, {} left", self.id, loss.remaining);
        self.deps.journal.record(JournalEvent::LifeLost {
            session: self.id,
            remaining: loss.remaining,
        });
        if let Some(at) = at {
            self.add_float_text(LIFE_LOST_TEXT.to_string(), at);
        }

        if loss.exhausted {
            self.end_game("lives_exhausted");
        } else {
            self.timers.arm(TimerKind::SpecialSpawn, SPECIAL_SPAWN_PERIOD);
        }
    }

    fn on_tick(&mut self) {
        if !self.is_ticking() {
            return;
        }
        let Some(world) = self.world.as_mut() else {
            return;
        };

        match world.tick() {
            TickOutcome::Collided { at } => {
                debug!("Session {} collided at ({}, {})", self.id, at.col, at.row);
                self.end_game("self_collision");
            }
            TickOutcome::Moved {
                head,
                collected: Some(collected),
            } => {
                debug!("Session {} collected {} (total {})", self.id, collected.kind, collected.total);
                self.deps.journal.record(JournalEvent::ItemCollected {
                    session: self.id,
                    kind: collected.kind,
                    total: collected.total,
                });
                self.add_float_text(collected.kind.float_text(), head);

                if collected.kind == ItemKind::Special {
                    self.timers.cancel(TimerKind::SpecialDwell);
                    self.timers.arm(TimerKind::SpecialSpawn, SPECIAL_SPAWN_PERIOD);
                }
            }
            TickOutcome::Moved { collected: None, .. } => {}
        }

        self.publish();
    }

    /// Freeze the board. Only the first call has any effect.
    fn end_game(&mut self, cause: &str) {
        let Some(next) = self.state.next(Transition::Ended) else {
            return;
        };
        self.state = next;
        self.timers.cancel_gameplay();

        let length = self.world.as_ref().map(|w| w.snake().len()).unwrap_or(0);
        info!("Session {} game over ({}), length {}", self.id, cause, length);
        self.deps.journal.record(JournalEvent::GameOver {
            session: self.id,
            cause: cause.to_string(),
            length,
        });
    }

    fn add_float_text(&mut self, text: String, at: Location) {
        let id = self.next_float_id;
        self.next_float_id += 1;

        self.float_texts.push(FloatText {
            id,
            text,
            col: at.col,
            row: at.row,
        });
        self.timers.arm(TimerKind::FloatText(id), FLOAT_TEXT_TTL);
    }

    // =========================================================================
    // Output
    // =========================================================================

    fn view(&self) -> SessionView {
        let world = self.world.as_ref();

        SessionView {
            state: self.state,
            identity: self.identity.as_ref().map(|a| a.to_string()),
            grid: world.map(|w| w.grid()).unwrap_or(self.next_grid),
            snake: world
                .map(|w| w.snake().body().iter().copied().collect())
                .unwrap_or_default(),
            regular: world.and_then(|w| w.regular()).map(|item| ItemView {
                kind: item.kind(),
                col: item.location.col,
                row: item.location.row,
                expires_in_ms: None,
            }),
            special: world.and_then(|w| w.special()).map(|item| ItemView {
                kind: ItemKind::Special,
                col: item.location.col,
                row: item.location.row,
                expires_in_ms: self
                    .timers
                    .remaining(TimerKind::SpecialDwell)
                    .map(|d| d.as_millis() as u64),
            }),
            lives: world.map(|w| w.lives().remaining()).unwrap_or(MAX_LIVES),
            max_lives: world.map(|w| w.lives().max()).unwrap_or(MAX_LIVES),
            ledger: world
                .map(|w| w.ledger().snapshot())
                .unwrap_or_else(|| InventoryLedger::new().snapshot()),
            float_texts: self.float_texts.clone(),
            busy: self.pending.is_some(),
        }
    }

    fn publish(&self) {
        self.outbound.view(self.view());
    }

    fn notify(&self, message: impl Into<String>) {
        let message = message.into();
        debug!("Session {} notice: {}", self.id, message);
        self.send(ServerMessage::notice(message));
    }

    fn send(&self, message: ServerMessage) {
        if !self.outbound.message(message) {
            debug!("Session {} socket is gone, message dropped", self.id);
        }
    }
}

/// Switch to the game network, then read the account
async fn connect_wallet(wallet: Arc<dyn Wallet>) -> Result<Address, WalletError> {
    wallet.ensure_network(&NetworkParams::monad_testnet()).await?;
    wallet.connect().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::game::item::{RegularItem, Token};
    use crate::session::outbound::{self, OutboundReceiver};
    use crate::state::AppState;
    use crate::game::snake::Snake;
    use crate::game::Direction;
    use crate::settlement::{ClaimReceipt, ClaimRequest, Settlement, SettlementClient, SettlementError};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    const PLAYER: &str = "0x0F0BDEbF0F83cD1EE3974779Bcb7315f9808c714";

    struct MockWallet {
        account: Result<Address, WalletError>,
        payment: Result<PaymentReceipt, WalletError>,
        payments: Mutex<Vec<(Address, Decimal)>>,
    }

    impl MockWallet {
        fn approving() -> Self {
            Self {
                account: Ok(Address::parse(PLAYER).unwrap()),
                payment: Ok(PaymentReceipt {
                    reference: "0xfeed".to_string(),
                }),
                payments: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Wallet for MockWallet {
        async fn ensure_network(&self, _params: &NetworkParams) -> Result<(), WalletError> {
            Ok(())
        }

        async fn connect(&self) -> Result<Address, WalletError> {
            self.account.clone()
        }

        async fn send_payment(&self, to: &Address, amount: Decimal) -> Result<PaymentReceipt, WalletError> {
            self.payments.lock().unwrap().push((to.clone(), amount));
            self.payment.clone()
        }
    }

    /// Settles every submitted kind
    #[derive(Default)]
    struct MockSettlement {
        requests: Mutex<Vec<ClaimRequest>>,
    }

    #[async_trait]
    impl SettlementClient for MockSettlement {
        async fn claim(&self, request: &ClaimRequest) -> Result<ClaimReceipt, SettlementError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(ClaimReceipt {
                settlements: request
                    .counts
                    .iter()
                    .map(|(kind, count)| Settlement {
                        kind: kind.clone(),
                        amount: *count * dec!(0.01),
                        reference: format!("ref-{kind}"),
                    })
                    .collect(),
                skipped: Vec::new(),
            })
        }
    }

    struct Harness {
        session: Session,
        events: mpsc::Receiver<SessionEvent>,
        outbound: OutboundReceiver,
        wallet: Arc<MockWallet>,
        settlement: Arc<MockSettlement>,
    }

    impl Harness {
        fn new(wallet: MockWallet) -> Self {
            Self::with_journal(wallet, EventJournal::disabled())
        }

        fn with_journal(wallet: MockWallet, journal: EventJournal) -> Self {
            let wallet = Arc::new(wallet);
            let settlement = Arc::new(MockSettlement::default());
            let deps = SessionDeps {
                wallet: wallet.clone(),
                claims: ClaimCoordinator::new(settlement.clone()),
                journal: Arc::new(journal),
                runtime: RuntimeConfig::default(),
            };
            let (outbound_tx, outbound) = outbound::channel();
            let (session, events) = Session::new(Uuid::new_v4(), deps, outbound_tx);

            Self {
                session,
                events,
                outbound,
                wallet,
                settlement,
            }
        }

        /// Feed the next background result to the session
        async fn pump(&mut self) {
            let event = self.events.recv().await.unwrap();
            self.session.handle_event(event);
        }

        async fn playing(wallet: MockWallet) -> Self {
            let mut h = Self::new(wallet);
            h.session.handle_command(Command::Resize { cols: 10, rows: 10 });
            h.session.handle_command(Command::Connect);
            h.pump().await;
            h.session.handle_command(Command::Pay);
            h.pump().await;
            assert_eq!(h.session.state, SessionState::Playing);
            h
        }

        fn world(&mut self) -> &mut World {
            self.session.world.as_mut().unwrap()
        }

        fn fire(&mut self, kind: TimerKind) {
            let id = self.session.timers.arm(kind, Duration::from_secs(3600));
            self.session.handle_event(SessionEvent::TimerFired { kind, id });
        }

        fn drain(&mut self) -> Vec<ServerMessage> {
            let mut messages = Vec::new();
            while let Some(message) = self.outbound.try_recv() {
                messages.push(message);
            }
            messages
        }

        fn notices(&mut self) -> Vec<String> {
            self.drain()
                .into_iter()
                .filter_map(|m| match m {
                    ServerMessage::Notice { message } => Some(message),
                    _ => None,
                })
                .collect()
        }
    }

    #[tokio::test]
    async fn test_connect_and_pay_starts_game() {
        let h = Harness::playing(MockWallet::approving()).await;

        assert_eq!(h.session.identity.as_ref().map(|a| a.as_str()), Some(PLAYER));
        let world = h.session.world.as_ref().unwrap();
        assert_eq!(world.grid(), Grid::new(10, 10));
        assert_eq!(world.lives().remaining(), MAX_LIVES);
        assert!(world.ledger().is_empty());
        assert!(h.session.timers.is_armed(TimerKind::SpecialSpawn));

        let payments = h.wallet.payments.lock().unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].0, RuntimeConfig::default().treasury);
        assert_eq!(payments[0].1, dec!(0.15));
    }

    #[tokio::test]
    async fn test_pay_pauses_until_confirmed() {
        let mut h = Harness::new(MockWallet::approving());
        h.session.handle_command(Command::Connect);
        h.pump().await;
        h.session.handle_command(Command::Pay);

        assert_eq!(h.session.state, SessionState::AwaitingPayment);
        assert!(!h.session.is_ticking());
        assert!(h.session.world.is_none());
    }

    #[tokio::test]
    async fn test_payment_failure_returns_to_connected() {
        let mut h = Harness::new(MockWallet {
            payment: Err(WalletError::Rejected("User denied".to_string())),
            ..MockWallet::approving()
        });
        h.session.handle_command(Command::Connect);
        h.pump().await;
        h.session.handle_command(Command::Pay);
        h.pump().await;

        assert_eq!(h.session.state, SessionState::Connected);
        assert!(h.session.world.is_none());
        assert!(h.notices().iter().any(|n| n.starts_with("Payment failed")));
    }

    #[tokio::test]
    async fn test_wallet_failure_stays_disconnected() {
        let mut h = Harness::new(MockWallet {
            account: Err(WalletError::Timeout(Duration::from_secs(1))),
            ..MockWallet::approving()
        });
        h.session.handle_command(Command::Connect);
        h.pump().await;

        assert_eq!(h.session.state, SessionState::Disconnected);
        assert!(h.session.identity.is_none());
        assert!(h.session.pending.is_none());
        assert!(h.notices().iter().any(|n| n.starts_with("Wallet connection failed")));
    }

    #[tokio::test]
    async fn test_pay_requires_wallet() {
        let mut h = Harness::new(MockWallet::approving());
        h.session.handle_command(Command::Pay);
        assert_eq!(h.session.state, SessionState::Disconnected);
        assert!(h.session.pending.is_none());
    }

    #[tokio::test]
    async fn test_second_request_while_pending_is_refused() {
        let mut h = Harness::new(MockWallet::approving());
        h.session.handle_command(Command::Connect);
        h.session.handle_command(Command::Connect);

        assert!(h.notices().iter().any(|n| n.contains("still pending")));
        h.pump().await;
        assert_eq!(h.session.state, SessionState::Connected);
    }

    #[tokio::test]
    async fn test_tick_collects_item() {
        let mut h = Harness::playing(MockWallet::approving()).await;
        h.world().place_regular(RegularItem {
            location: Location::new(6, 5),
            token: Token::Yaki,
        });

        h.session.on_tick();

        let world = h.session.world.as_ref().unwrap();
        assert_eq!(world.snake().head(), Location::new(6, 5));
        assert_eq!(world.snake().len(), 2);
        assert_eq!(world.ledger().get(ItemKind::Regular(Token::Yaki)), Decimal::ONE);

        assert_eq!(h.session.float_texts.len(), 1);
        assert_eq!(h.session.float_texts[0].text, "+1 $YAKI");
        let id = h.session.float_texts[0].id;
        assert!(h.session.timers.is_armed(TimerKind::FloatText(id)));

        // Text decays when its timer fires
        h.fire(TimerKind::FloatText(id));
        assert!(h.session.float_texts.is_empty());
    }

    #[tokio::test]
    async fn test_steer_applies_on_next_tick() {
        let mut h = Harness::playing(MockWallet::approving()).await;
        h.world().place_regular(RegularItem {
            location: Location::new(0, 0),
            token: Token::Chog,
        });

        h.session.handle_command(Command::Steer(Direction::Left));
        h.session.handle_command(Command::Steer(Direction::Up));
        h.session.on_tick();
        assert_eq!(h.world().snake().head(), Location::new(5, 4));
    }

    #[tokio::test]
    async fn test_special_expiry_costs_a_life() {
        let mut h = Harness::playing(MockWallet::approving()).await;

        h.fire(TimerKind::SpecialSpawn);
        assert!(h.world().special().is_some());
        assert!(h.session.timers.is_armed(TimerKind::SpecialDwell));

        h.fire(TimerKind::SpecialDwell);
        assert_eq!(h.world().lives().remaining(), MAX_LIVES - 1);
        assert!(h.world().special().is_none());
        assert!(h.session.timers.is_armed(TimerKind::SpecialSpawn));
        assert!(h.session.float_texts.iter().any(|t| t.text == LIFE_LOST_TEXT));
        assert_eq!(h.session.state, SessionState::Playing);
    }

    #[tokio::test]
    async fn test_collecting_special_rearms_spawn() {
        let mut h = Harness::playing(MockWallet::approving()).await;
        h.fire(TimerKind::SpecialSpawn);

        // Put the snake one step left of the special item
        let target = h.world().special().unwrap().location;
        let start = Location::new((target.col + 9) % 10, target.row);
        h.world().replace_snake(Snake::new(start, Direction::Right));
        h.world().place_regular(RegularItem {
            location: Location::new((target.col + 3) % 10, (target.row + 3) % 10),
            token: Token::Dak,
        });

        h.session.on_tick();
        assert!(h.world().special().is_none());
        assert_eq!(h.world().ledger().get(ItemKind::Special), dec!(0.01));
        assert!(!h.session.timers.is_armed(TimerKind::SpecialDwell));
        assert!(h.session.timers.is_armed(TimerKind::SpecialSpawn));
        assert_eq!(h.world().lives().remaining(), MAX_LIVES);
    }

    #[tokio::test]
    async fn test_stale_timer_is_ignored() {
        let mut h = Harness::playing(MockWallet::approving()).await;
        h.session.handle_event(SessionEvent::TimerFired {
            kind: TimerKind::SpecialDwell,
            id: 999,
        });
        h.session.handle_event(SessionEvent::TimerFired {
            kind: TimerKind::SpecialSpawn,
            id: 999,
        });
        assert!(h.world().special().is_none());
        assert_eq!(h.world().lives().remaining(), MAX_LIVES);
    }

    #[tokio::test]
    async fn test_lives_exhausted_ends_game_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");

        let mut h = Harness::with_journal(MockWallet::approving(), EventJournal::open(Some(&path)));
        h.session.handle_command(Command::Connect);
        h.pump().await;
        h.session.handle_command(Command::Pay);
        h.pump().await;

        for _ in 0..MAX_LIVES {
            h.fire(TimerKind::SpecialSpawn);
            h.fire(TimerKind::SpecialDwell);
        }
        assert_eq!(h.session.state, SessionState::GameOver);
        assert_eq!(h.world().lives().remaining(), 0);
        assert!(!h.session.timers.is_armed(TimerKind::SpecialSpawn));
        assert!(!h.session.timers.is_armed(TimerKind::SpecialDwell));

        // Further terminal events change nothing
        h.session.end_game("self_collision");
        h.fire(TimerKind::SpecialDwell);
        assert_eq!(h.session.state, SessionState::GameOver);

        let content = std::fs::read_to_string(&path).unwrap();
        let game_overs = content.lines().filter(|l| l.contains(r#""event":"game_over""#)).count();
        let lives_lost = content.lines().filter(|l| l.contains(r#""event":"life_lost""#)).count();
        assert_eq!(game_overs, 1);
        assert_eq!(lives_lost, MAX_LIVES as usize);
    }

    #[tokio::test]
    async fn test_collision_ends_game() {
        let mut h = Harness::playing(MockWallet::approving()).await;
        let snake = Snake::from_segments(
            [
                Location::new(2, 1),
                Location::new(1, 1),
                Location::new(1, 2),
                Location::new(2, 2),
            ],
            Direction::Left,
        )
        .unwrap();
        h.world().replace_snake(snake);
        h.world().place_regular(RegularItem {
            location: Location::new(8, 8),
            token: Token::Yaki,
        });

        h.session.handle_command(Command::Steer(Direction::Down));
        h.session.on_tick();

        assert_eq!(h.session.state, SessionState::GameOver);
        assert!(!h.session.is_ticking());
        assert!(!h.session.timers.is_armed(TimerKind::SpecialSpawn));
        assert_eq!(h.world().snake().len(), 4);

        // Frozen: steering and ticks do nothing
        h.session.handle_command(Command::Steer(Direction::Left));
        h.session.on_tick();
        assert_eq!(h.world().snake().head(), Location::new(2, 1));
    }

    #[tokio::test]
    async fn test_claim_settles_nonzero_kinds_and_resets() {
        let mut h = Harness::playing(MockWallet::approving()).await;
        h.world().ledger_mut().credit(ItemKind::Regular(Token::Yaki));
        h.world().ledger_mut().credit(ItemKind::Regular(Token::Yaki));

        h.session.handle_command(Command::Claim);
        assert!(!h.session.is_ticking());
        assert!(h.session.timers.is_suspended());
        assert!(!h.session.timers.is_armed(TimerKind::SpecialSpawn));

        h.pump().await;
        assert!(h.world().ledger().is_empty());
        assert!(h.session.is_ticking());
        assert!(h.session.timers.is_armed(TimerKind::SpecialSpawn));

        let requests = h.settlement.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].address, PLAYER);
        assert_eq!(requests[0].counts.len(), 1);
        assert_eq!(requests[0].counts["YAKI"], dec!(2));

        let claimed = h.drain().into_iter().find_map(|m| match m {
            ServerMessage::Claimed { references, reset, .. } => Some((references, reset)),
            _ => None,
        });
        assert_eq!(
            claimed,
            Some((vec!["ref-YAKI".to_string()], vec![ItemKind::Regular(Token::Yaki)]))
        );
    }

    #[tokio::test]
    async fn test_claim_clears_kinds_without_contract() {
        // Default registry has no contract for the special item's MON reward
        let mut h = Harness::playing(MockWallet::approving()).await;
        let state = AppState::new(ServerConfig::default());
        h.session.deps.claims = ClaimCoordinator::new(state.settlement.clone());

        h.world().ledger_mut().credit(ItemKind::Regular(Token::Yaki));
        h.world().ledger_mut().credit(ItemKind::Special);
        h.drain();

        h.session.handle_command(Command::Claim);
        h.pump().await;

        assert!(h.world().ledger().is_empty());
        assert!(h.session.timers.is_armed(TimerKind::SpecialSpawn));

        let messages = h.drain();
        assert!(!messages.iter().any(|m| matches!(m, ServerMessage::Notice { .. })));
        let claimed = messages.into_iter().find_map(|m| match m {
            ServerMessage::Claimed {
                references,
                unsettled,
                skipped,
                ..
            } => Some((references.len(), unsettled, skipped)),
            _ => None,
        });
        assert_eq!(claimed, Some((1, Vec::new(), vec![ItemKind::Special])));

        // A second claim has nothing left to send
        h.session.handle_command(Command::Claim);
        assert_eq!(h.notices(), vec!["Nothing to claim".to_string()]);
    }

    #[tokio::test]
    async fn test_notices_survive_unread_views() {
        let mut h = Harness::playing(MockWallet::approving()).await;

        // A stalled socket: many frames published, none read
        for _ in 0..500 {
            h.session.publish();
        }
        h.session.handle_command(Command::Claim);

        let messages = h.drain();
        let notices: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                ServerMessage::Notice { message } => Some(message.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(notices, vec!["Nothing to claim"]);

        let views = messages
            .iter()
            .filter(|m| matches!(m, ServerMessage::State { .. }))
            .count();
        assert_eq!(views, 1);
    }

    #[tokio::test]
    async fn test_claim_with_empty_ledger() {
        let mut h = Harness::playing(MockWallet::approving()).await;
        h.drain();

        h.session.handle_command(Command::Claim);
        assert!(h.session.pending.is_none());
        assert_eq!(h.notices(), vec!["Nothing to claim".to_string()]);
        assert!(h.settlement.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restart_discards_session() {
        let mut h = Harness::playing(MockWallet::approving()).await;

        // Not allowed mid-game
        h.session.handle_command(Command::Restart);
        assert_eq!(h.session.state, SessionState::Playing);

        h.session.end_game("self_collision");
        h.session.handle_command(Command::Restart);
        assert_eq!(h.session.state, SessionState::Disconnected);
        assert!(h.session.identity.is_none());
        assert!(h.session.world.is_none());

        // Must connect and pay again
        h.session.handle_command(Command::Pay);
        assert_eq!(h.session.state, SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_view_reflects_world() {
        let mut h = Harness::playing(MockWallet::approving()).await;
        h.fire(TimerKind::SpecialSpawn);

        let view = h.session.view();
        assert_eq!(view.state, SessionState::Playing);
        assert_eq!(view.identity.as_deref(), Some(PLAYER));
        assert_eq!(view.snake, vec![Location::new(5, 5)]);
        assert_eq!(view.lives, MAX_LIVES);
        assert!(view.regular.is_some());
        let special = view.special.unwrap();
        assert_eq!(special.kind, ItemKind::Special);
        assert!(special.expires_in_ms.unwrap() <= SPECIAL_DWELL.as_millis() as u64);
        assert_eq!(view.ledger.len(), ItemKind::ALL.len());
    }

    #[tokio::test]
    async fn test_spawned_session_reaches_playing() {
        let wallet = Arc::new(MockWallet::approving());
        let deps = SessionDeps {
            wallet,
            claims: ClaimCoordinator::new(Arc::new(MockSettlement::default())),
            journal: Arc::new(EventJournal::disabled()),
            runtime: RuntimeConfig::default(),
        };
        let (outbound_tx, mut outbound) = outbound::channel();
        let (handle, task) = spawn_session(Uuid::new_v4(), deps, outbound_tx);

        assert!(handle.send(Command::Connect).await);
        assert!(handle.send(Command::Pay).await);

        let reached = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(message) = outbound.recv().await {
                if let ServerMessage::State { data } = message {
                    if data.state == SessionState::Playing {
                        return true;
                    }
                }
            }
            false
        })
        .await
        .unwrap();
        assert!(reached);

        drop(handle);
        tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }
}
