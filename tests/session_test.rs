//! Tests for guarded sessions: commit discipline, caching, restarts and
//! reminders.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use orbital_conquest::{
    Button, Command, DbError, DecisionId, DecisionRequest, EffectProvider, EngineConfig,
    ErrorKind, EventContext, EventTag, Game, GameSetup, GameStatus, GameStore, MemoryGameStore,
    NudgeScheduler, PlayerId, PresentationSink, Prompt, ProviderRegistry, ResolutionRequest,
    SessionManager, StoredGame, TriggeredEffect,
};

const ADA: PlayerId = PlayerId(1);
const BRIN: PlayerId = PlayerId(2);

fn duel(ada_forces: u32, brin_forces: u32) -> GameSetup {
    GameSetup::new("duel")
        .player("Ada", &["advance", "industrious"])
        .player("Brin", &["advance", "sabotage"])
        .planet("Terra", Some("Ada"), ada_forces, 2, &["Mars"])
        .planet("Mars", Some("Brin"), brin_forces, 1, &[])
}

fn manager_over(store: Arc<dyn GameStore>) -> SessionManager {
    SessionManager::new(
        store,
        Arc::new(ProviderRegistry::standard()),
        EngineConfig::default(),
    )
}

fn token(prompt: &Prompt, label: &str) -> DecisionId {
    prompt
        .find(label)
        .unwrap_or_else(|| panic!("No button '{}' in {:?}", label, prompt.labels()))
        .id()
        .clone()
}

fn pending(outcome: &orbital_conquest::SessionOutcome) -> Prompt {
    outcome.prompt.clone().expect("Expected a prompt")
}

/// Delegates to a memory store but can be told to fail every commit.
#[derive(Debug, Default)]
struct FailingStore {
    inner: MemoryGameStore,
    fail_commits: AtomicBool,
}

impl GameStore for FailingStore {
    fn create_game(&self, game: &Game) -> Result<i64, DbError> {
        self.inner.create_game(game)
    }

    fn load_game(&self, id: &str) -> Result<Option<StoredGame>, DbError> {
        self.inner.load_game(id)
    }

    fn game_version(&self, id: &str) -> Result<Option<i64>, DbError> {
        self.inner.game_version(id)
    }

    fn load_decision(&self, id: &DecisionId) -> Result<Option<DecisionRequest>, DbError> {
        self.inner.load_decision(id)
    }

    fn pending_decisions(&self, game_id: &str) -> Result<Vec<DecisionRequest>, DbError> {
        self.inner.pending_decisions(game_id)
    }

    fn commit(
        &self,
        game: &Game,
        expected_version: i64,
        requests: &[DecisionRequest],
    ) -> Result<i64, DbError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(DbError::new("disk full"));
        }
        self.inner.commit(game, expected_version, requests)
    }
}

/// Delegates to a memory store but parks inside every commit until released.
#[derive(Debug)]
struct GatedStore {
    inner: MemoryGameStore,
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl GameStore for GatedStore {
    fn create_game(&self, game: &Game) -> Result<i64, DbError> {
        self.inner.create_game(game)
    }

    fn load_game(&self, id: &str) -> Result<Option<StoredGame>, DbError> {
        self.inner.load_game(id)
    }

    fn game_version(&self, id: &str) -> Result<Option<i64>, DbError> {
        self.inner.game_version(id)
    }

    fn load_decision(&self, id: &DecisionId) -> Result<Option<DecisionRequest>, DbError> {
        self.inner.load_decision(id)
    }

    fn pending_decisions(&self, game_id: &str) -> Result<Vec<DecisionRequest>, DbError> {
        self.inner.pending_decisions(game_id)
    }

    fn commit(
        &self,
        game: &Game,
        expected_version: i64,
        requests: &[DecisionRequest],
    ) -> Result<i64, DbError> {
        self.entered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(())
            .map_err(|e| DbError::new(e.to_string()))?;
        self.release
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv()
            .map_err(|e| DbError::new(e.to_string()))?;
        self.inner.commit(game, expected_version, requests)
    }
}

#[derive(Debug, Default)]
struct RecordingSink {
    texts: Vec<String>,
    buttons: Vec<Button>,
}

impl PresentationSink for RecordingSink {
    fn text(&mut self, text: &str) {
        self.texts.push(text.to_string());
    }

    fn buttons(&mut self, buttons: &[Button]) {
        self.buttons.extend_from_slice(buttons);
    }
}

#[test]
fn test_clicked_button_resolves_and_commits() {
    let store = Arc::new(MemoryGameStore::new());
    let manager = manager_over(store.clone());
    manager.create_game(duel(3, 2)).expect("Create failed");

    let outcome = manager
        .execute("duel", ADA, &Command::Produce)
        .expect("Produce failed");
    assert!(outcome.committed);
    let prompt = pending(&outcome);
    assert_eq!(
        store.pending_decisions("duel").expect("Read failed"),
        prompt.requests().clone()
    );

    let outcome = manager
        .activate(&token(&prompt, "Produce on Terra (output 2)"), ADA)
        .expect("Click failed");
    assert!(outcome.journal.iter().any(|l| l == "Ada produces on Terra"));

    // Brin borders Terra and may sabotage it.
    let prompt = pending(&outcome);
    assert_eq!(prompt.labels(), vec!["Sabotage Terra: -1 force", "Pass (Brin)"]);
    let outcome = manager
        .activate(&token(&prompt, "Pass (Brin)"), BRIN)
        .expect("Pass failed");
    assert!(outcome.prompt.is_none());

    // 3 + 2 + 1 from industrious
    let stored = store.load_game("duel").expect("Read failed").expect("Missing game");
    assert_eq!(
        *stored.game.board().planet("Terra").expect("Missing Terra").forces(),
        6
    );
    assert_eq!(stored.version, 4);
    assert!(store.pending_decisions("duel").expect("Read failed").is_empty());
}

#[test]
fn test_sibling_button_expires_after_click() {
    let manager = manager_over(Arc::new(MemoryGameStore::new()));
    manager
        .create_game(
            GameSetup::new("duel")
                .player("Ada", &[])
                .player("Brin", &[])
                .planet("Terra", Some("Ada"), 1, 1, &["Luna"])
                .planet("Luna", Some("Ada"), 1, 1, &[])
                .planet("Mars", Some("Brin"), 1, 1, &[]),
        )
        .expect("Create failed");

    let prompt = pending(
        &manager
            .execute("duel", ADA, &Command::Produce)
            .expect("Produce failed"),
    );
    let done = token(&prompt, "Done producing");
    manager
        .activate(&token(&prompt, "Produce on Luna (output 1)"), ADA)
        .expect("Click failed");

    let err = manager.activate(&done, ADA).expect_err("Stale button accepted");
    assert_eq!(err.kind, ErrorKind::Input);
    assert_eq!(err.message, "That button has expired");
}

#[test]
fn test_wrong_requester_changes_nothing() {
    let store = Arc::new(MemoryGameStore::new());
    let manager = manager_over(store.clone());
    manager.create_game(duel(3, 2)).expect("Create failed");

    let prompt = pending(
        &manager
            .execute("duel", ADA, &Command::Produce)
            .expect("Produce failed"),
    );
    let before = manager.snapshot("duel").expect("Snapshot failed");

    let err = manager
        .activate(&token(&prompt, "Produce on Terra (output 2)"), BRIN)
        .expect_err("Brin clicked Ada's button");
    assert_eq!(err.kind, ErrorKind::Input);
    assert_eq!(err.message, "This choice is for Ada");

    assert_eq!(manager.snapshot("duel").expect("Snapshot failed"), before);
    assert!(manager.is_cached("duel"));
    assert_eq!(store.game_version("duel").expect("Read failed"), Some(2));
}

#[test]
fn test_out_of_turn_command_refused() {
    let manager = manager_over(Arc::new(MemoryGameStore::new()));
    manager.create_game(duel(3, 2)).expect("Create failed");
    let err = manager
        .execute("duel", BRIN, &Command::EndTurn)
        .expect_err("Brin acted on Ada's turn");
    assert_eq!(err.kind, ErrorKind::Input);
    assert_eq!(err.message, "It is Ada's turn");
}

#[test]
fn test_failed_commit_reports_and_evicts() {
    let store = Arc::new(FailingStore::default());
    let manager = manager_over(store.clone());
    manager.create_game(duel(3, 2)).expect("Create failed");
    assert!(manager.is_cached("duel"));

    store.fail_commits.store(true, Ordering::SeqCst);
    let err = manager
        .execute("duel", ADA, &Command::Produce)
        .expect_err("Commit failure hidden");
    assert_eq!(err.kind, ErrorKind::Persistence);
    assert!(err.message.starts_with("The game state may not have saved"));
    assert!(!manager.is_cached("duel"));

    // Nothing from the failed session reached the store.
    store.fail_commits.store(false, Ordering::SeqCst);
    let game = manager.snapshot("duel").expect("Snapshot failed");
    assert!(game.stack().is_empty());
    assert!(!*game.player(ADA).expect("Missing Ada").produced_this_turn());
    assert_eq!(store.game_version("duel").expect("Read failed"), Some(1));
}

/// Grants a credit at the end of every turn, including its own.
#[derive(Debug)]
struct Echo;

impl EffectProvider for Echo {
    fn key(&self) -> &'static str {
        "echo"
    }

    fn reacts_to(&self) -> &'static [EventTag] {
        &[EventTag::EndTurn]
    }

    fn triggered_effects(&self, ctx: &EventContext<'_>) -> Vec<TriggeredEffect> {
        let credits = ctx.game.player(ctx.owner).map(|p| *p.credits()).unwrap_or(0);
        vec![TriggeredEffect::automatic(
            ctx,
            credits,
            "Echo",
            ResolutionRequest::GainCredits {
                player: ctx.owner,
                amount: 1,
            },
        )]
    }
}

#[test]
fn test_runaway_session_evicts_without_commit() {
    let store = Arc::new(MemoryGameStore::new());
    let mut registry = ProviderRegistry::standard();
    registry.register(Box::new(Echo)).expect("Register failed");
    let manager = SessionManager::new(
        store.clone(),
        Arc::new(registry),
        EngineConfig::default().with_max_resolution_steps(20),
    );
    manager
        .create_game(
            GameSetup::new("duel")
                .player("Ada", &["echo"])
                .player("Brin", &[])
                .planet("Terra", Some("Ada"), 1, 1, &[])
                .planet("Mars", Some("Brin"), 1, 1, &[]),
        )
        .expect("Create failed");

    let err = manager
        .execute("duel", ADA, &Command::EndTurn)
        .expect_err("Runaway resolution committed");
    assert_eq!(err.kind, ErrorKind::Invariant);
    assert!(!manager.is_cached("duel"));
    assert_eq!(store.game_version("duel").expect("Read failed"), Some(1));
}

#[test]
fn test_concurrent_session_is_busy() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let store = Arc::new(GatedStore {
        inner: MemoryGameStore::new(),
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    });
    let manager = manager_over(store);
    manager.create_game(duel(3, 2)).expect("Create failed");

    let worker = {
        let manager = manager.clone();
        std::thread::spawn(move || manager.execute("duel", ADA, &Command::Produce))
    };
    entered_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("First session never reached commit");

    let err = manager
        .execute("duel", ADA, &Command::EndTurn)
        .expect_err("Second session entered");
    assert_eq!(err.kind, ErrorKind::Busy);

    release_tx.send(()).expect("Release failed");
    let outcome = worker
        .join()
        .expect("Worker panicked")
        .expect("First session failed");
    assert!(outcome.committed);
}

#[test]
fn test_restart_resumes_pending_prompt() {
    let store = MemoryGameStore::new();
    let first = manager_over(Arc::new(store.clone()));
    first.create_game(duel(3, 2)).expect("Create failed");
    let prompt = pending(
        &first
            .execute("duel", ADA, &Command::Produce)
            .expect("Produce failed"),
    );
    drop(first);

    let second = manager_over(Arc::new(store));
    assert!(!second.is_cached("duel"));
    let resurfaced = second
        .resurface("duel")
        .expect("Resurface failed")
        .expect("Nothing pending after restart");
    assert_eq!(resurfaced.labels(), prompt.labels());
    assert_eq!(resurfaced.text(), prompt.text());
    assert_eq!(resurfaced.epoch(), prompt.epoch());

    let outcome = second
        .activate(&token(&prompt, "Produce on Terra (output 2)"), ADA)
        .expect("Click after restart failed");
    assert!(outcome.committed);
}

#[test]
fn test_capture_of_last_planet_wins_the_game() {
    let manager = manager_over(Arc::new(MemoryGameStore::new()));
    manager.create_game(duel(5, 2)).expect("Create failed");

    let prompt = pending(
        &manager
            .execute(
                "duel",
                ADA,
                &Command::Move {
                    ability: "advance".to_string(),
                },
            )
            .expect("Move failed"),
    );
    // Mars is the only target and Terra the only source.
    assert_eq!(prompt.labels().len(), 6);
    let prompt = pending(
        &manager
            .activate(&token(&prompt, "Move 5 from Terra"), ADA)
            .expect("Click failed"),
    );
    let outcome = manager
        .activate(&token(&prompt, "Confirm"), ADA)
        .expect("Confirm failed");

    let captured = outcome
        .journal
        .iter()
        .position(|l| l == "Ada captured Mars from Brin")
        .expect("No capture");
    let eliminated = outcome
        .journal
        .iter()
        .position(|l| l == "Brin has been eliminated")
        .expect("No elimination");
    assert!(captured < eliminated);
    assert_eq!(
        *outcome.game.status(),
        GameStatus::Finished { winner: Some(ADA) }
    );

    let mut sink = RecordingSink::default();
    outcome.render(&mut sink);
    assert!(sink.texts.iter().any(|t| t == "Game over: Ada wins!"));

    let err = manager
        .execute("duel", ADA, &Command::EndTurn)
        .expect_err("Finished game accepted a command");
    assert_eq!(err.message, "The game is over");
}

#[test]
fn test_mutual_destruction_ends_without_winner() {
    let manager = manager_over(Arc::new(MemoryGameStore::new()));
    manager.create_game(duel(3, 3)).expect("Create failed");

    let prompt = pending(
        &manager
            .execute(
                "duel",
                ADA,
                &Command::Move {
                    ability: "advance".to_string(),
                },
            )
            .expect("Move failed"),
    );
    let prompt = pending(
        &manager
            .activate(&token(&prompt, "Move 3 from Terra"), ADA)
            .expect("Click failed"),
    );
    let outcome = manager
        .activate(&token(&prompt, "Confirm"), ADA)
        .expect("Confirm failed");

    for line in ["Ada has been eliminated", "Brin has been eliminated"] {
        assert_eq!(outcome.journal.iter().filter(|l| *l == line).count(), 1);
    }
    assert!(!outcome.journal.iter().any(|l| l.contains("captured")));
    assert_eq!(*outcome.game.status(), GameStatus::Finished { winner: None });
    let mars = outcome.game.board().planet("Mars").expect("Missing Mars");
    assert_eq!(*mars.owner(), None);
}

#[test]
fn test_eliminated_player_loses_their_turn_and_voice() {
    let manager = manager_over(Arc::new(MemoryGameStore::new()));
    manager
        .create_game(
            GameSetup::new("trio")
                .player("Ada", &["advance"])
                .player("Brin", &["advance"])
                .player("Cyra", &["advance"])
                .planet("Terra", Some("Ada"), 3, 2, &["Mars"])
                .planet("Mars", Some("Brin"), 3, 1, &[])
                .planet("Phobos", Some("Brin"), 1, 1, &[])
                .planet("Ceres", Some("Cyra"), 2, 1, &[]),
        )
        .expect("Create failed");

    let prompt = pending(
        &manager
            .execute(
                "trio",
                ADA,
                &Command::Move {
                    ability: "advance".to_string(),
                },
            )
            .expect("Move failed"),
    );
    let prompt = pending(
        &manager
            .activate(&token(&prompt, "Move 3 from Terra"), ADA)
            .expect("Click failed"),
    );
    let outcome = manager
        .activate(&token(&prompt, "Confirm"), ADA)
        .expect("Confirm failed");

    assert_eq!(
        outcome
            .journal
            .iter()
            .filter(|l| *l == "Ada has been eliminated")
            .count(),
        1
    );
    assert!(outcome.journal.iter().any(|l| l == "Round 1: it is now Brin's turn"));
    assert!(outcome.prompt.is_none());
    assert_eq!(*outcome.game.status(), GameStatus::InProgress);
    assert_eq!(outcome.game.current_player(), BRIN);

    let err = manager
        .execute("trio", ADA, &Command::Produce)
        .expect_err("Eliminated player produced");
    assert_eq!(err.kind, ErrorKind::Input);
    assert_eq!(err.message, "You have been eliminated");

    // Brin's production menu stays closed to Ada.
    let prompt = pending(
        &manager
            .execute("trio", BRIN, &Command::Produce)
            .expect("Produce failed"),
    );
    let err = manager
        .activate(&token(&prompt, "Done producing"), ADA)
        .expect_err("Eliminated player answered");
    assert_eq!(err.message, "You have been eliminated");

    let terra = manager
        .activate(&token(&prompt, "Done producing"), BRIN)
        .expect("Brin could not finish")
        .game
        .board()
        .planet("Terra")
        .map(|p| *p.forces())
        .expect("Missing Terra");
    assert_eq!(terra, 0);
}

#[test]
fn test_render_hands_out_request_tokens() {
    let manager = manager_over(Arc::new(MemoryGameStore::new()));
    manager.create_game(duel(3, 2)).expect("Create failed");
    let outcome = manager
        .execute("duel", ADA, &Command::Produce)
        .expect("Produce failed");

    let mut sink = RecordingSink::default();
    outcome.render(&mut sink);
    let prompt = pending(&outcome);
    let tokens: Vec<&DecisionId> = sink.buttons.iter().map(|b| &b.token).collect();
    let ids: Vec<&DecisionId> = prompt.requests().iter().map(|r| r.id()).collect();
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens, ids);
    assert_eq!(
        sink.texts.last().map(String::as_str),
        Some("Ada, where do you want to produce?")
    );
}

#[tokio::test]
async fn test_nudge_fires_for_idle_prompt() {
    let manager = Arc::new(manager_over(Arc::new(MemoryGameStore::new())));
    manager.create_game(duel(3, 2)).expect("Create failed");
    let prompt = pending(
        &manager
            .execute("duel", ADA, &Command::Produce)
            .expect("Produce failed"),
    );

    let (tx, rx) = mpsc::channel();
    NudgeScheduler::new(Duration::from_millis(10))
        .schedule(manager.clone(), "duel".to_string(), *prompt.epoch(), move |p| {
            tx.send(p).ok();
        })
        .await
        .expect("Nudge task panicked");

    let nudged = rx.try_recv().expect("No nudge delivered");
    assert_eq!(nudged.labels(), prompt.labels());
}

#[tokio::test]
async fn test_nudge_skipped_once_game_moves_on() {
    let manager = Arc::new(manager_over(Arc::new(MemoryGameStore::new())));
    manager.create_game(duel(3, 2)).expect("Create failed");
    let prompt = pending(
        &manager
            .execute("duel", ADA, &Command::Produce)
            .expect("Produce failed"),
    );
    manager
        .activate(&token(&prompt, "Done producing"), ADA)
        .expect("Click failed");

    let (tx, rx) = mpsc::channel::<Prompt>();
    NudgeScheduler::new(Duration::from_millis(10))
        .schedule(manager.clone(), "duel".to_string(), *prompt.epoch(), move |p| {
            tx.send(p).ok();
        })
        .await
        .expect("Nudge task panicked");

    assert!(rx.try_recv().is_err());
}
