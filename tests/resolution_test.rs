//! Tests for the trigger loop: ordering, optional and mandatory triggers,
//! at-most-once consumption, runaway bounds and suspension.

use orbital_conquest::{
    Command, EffectProvider, EngineConfig, ErrorKind, EventContext, EventKind, EventTag, Game,
    GameSetup, OptionalTriggerPolicy, PlayerId, Plunder, Prompt, ProviderRegistry,
    ResolutionReport, ResolutionRequest, Resolver, TriggeredEffect,
};

const ADA: PlayerId = PlayerId(1);
const BRIN: PlayerId = PlayerId(2);

fn frontier(registry: &ProviderRegistry, ada: &[&str], brin: &[&str]) -> Game {
    GameSetup::new("frontier")
        .player("Ada", ada)
        .player("Brin", brin)
        .planet("Terra", Some("Ada"), 4, 2, &["Luna", "Mars"])
        .planet("Luna", Some("Ada"), 2, 1, &["Mars"])
        .planet("Mars", Some("Brin"), 3, 1, &["Vesta"])
        .planet("Vesta", Some("Brin"), 1, 1, &[])
        .build(registry)
        .expect("Setup failed")
}

fn run(
    resolver: &Resolver<'_>,
    registry: &ProviderRegistry,
    game: &mut Game,
    command: Command,
) -> ResolutionReport {
    let player = game.current_player();
    command
        .execute(game, registry, player)
        .expect("Command refused");
    resolver.continue_resolving(game).expect("Resolution failed")
}

fn click(
    resolver: &Resolver<'_>,
    game: &mut Game,
    prompt: &Prompt,
    label: &str,
    player: PlayerId,
) -> ResolutionReport {
    let request = prompt
        .find(label)
        .unwrap_or_else(|| panic!("No button '{}' in {:?}", label, prompt.labels()))
        .clone();
    resolver
        .activate(game, &request, player)
        .expect("Activation failed")
}

fn prompt_of(report: &ResolutionReport) -> Prompt {
    report.prompt().cloned().expect("Expected a prompt")
}

/// Drives a raid from Terra and Luna into Mars up to the final confirmation.
fn raid_mars(resolver: &Resolver<'_>, registry: &ProviderRegistry, game: &mut Game) -> ResolutionReport {
    let report = run(
        resolver,
        registry,
        game,
        Command::Move {
            ability: "raid".to_string(),
        },
    );
    let mut prompt = prompt_of(&report);
    for label in [
        "To Mars (Brin, 3)",
        "From Terra (4)",
        "From Luna (2)",
        "Move 2 from Terra",
        "Move 2 from Luna",
    ] {
        prompt = prompt_of(&click(resolver, game, &prompt, label, ADA));
    }
    click(resolver, game, &prompt, "Confirm", ADA)
}

#[test]
fn test_automatic_effects_follow_turn_order() {
    let registry = ProviderRegistry::standard();
    let config = EngineConfig::default();
    let resolver = Resolver::new(&registry, &config);
    let mut game = frontier(&registry, &["raid"], &["fortress"]);

    let report = raid_mars(&resolver, &registry, &mut game);

    let raid = report
        .journal
        .iter()
        .position(|l| l == "Raid strikes first (+1)")
        .expect("Raid bonus missing");
    let fortress = report
        .journal
        .iter()
        .position(|l| l == "Fortress holds Mars (+1)")
        .expect("Fortress bonus missing");
    assert!(raid < fortress, "Current player's effects resolve first");

    // 4 + 1 attacking 3 + 1: one survivor takes the planet.
    let mars = game.board().planet("Mars").expect("Missing Mars");
    assert_eq!(*mars.owner(), Some(ADA));
    assert_eq!(*mars.forces(), 1);
}

#[test]
fn test_optional_trigger_offers_pass_to_owner_only() {
    let registry = ProviderRegistry::standard();
    let config = EngineConfig::default();
    let resolver = Resolver::new(&registry, &config);
    let mut game = frontier(&registry, &["industrious"], &["sabotage"]);

    let report = run(&resolver, &registry, &mut game, Command::Produce);
    let prompt = prompt_of(&report);
    assert_eq!(
        prompt.labels(),
        vec![
            "Produce on Luna (output 1)",
            "Produce on Terra (output 2)",
            "Done producing"
        ]
    );

    let report = click(&resolver, &mut game, &prompt, "Produce on Terra (output 2)", ADA);
    assert!(report.journal.iter().any(|l| l == "Industrious: +1 force on Terra"));
    let prompt = prompt_of(&report);
    assert_eq!(prompt.labels(), vec!["Sabotage Terra: -1 force", "Pass (Brin)"]);
    assert!(
        prompt
            .requests()
            .iter()
            .all(|r| r.allowed_players().iter().eq([&BRIN]))
    );

    // Ada cannot answer for Brin.
    let request = prompt.find("Pass (Brin)").expect("Missing pass").clone();
    let err = resolver
        .activate(&mut game, &request, ADA)
        .expect_err("Wrong requester accepted");
    assert_eq!(err.kind, ErrorKind::Input);

    // Terra: 4 + (2 + 1 - 1) = 6, exactly at capacity.
    let report = click(&resolver, &mut game, &prompt, "Sabotage Terra: -1 force", BRIN);
    assert_eq!(*game.board().planet("Terra").expect("Missing Terra").forces(), 6);
    assert!(*game.board().planet("Terra").expect("Missing Terra").exhausted());

    // Back on the production menu with only Luna left.
    let prompt = prompt_of(&report);
    assert_eq!(
        prompt.labels(),
        vec!["Produce on Luna (output 1)", "Done producing"]
    );

    let report = click(&resolver, &mut game, &prompt, "Produce on Luna (output 1)", ADA);
    let prompt = prompt_of(&report);
    assert_eq!(prompt.labels(), vec!["Sabotage Luna: -1 force", "Pass (Brin)"]);

    let report = click(&resolver, &mut game, &prompt, "Pass (Brin)", BRIN);
    assert!(report.prompt().is_none());
    assert!(report.journal.iter().any(|l| l == "Brin passes"));
    assert_eq!(*game.board().planet("Luna").expect("Missing Luna").forces(), 4);
    assert!(game.stack().is_empty());
}

#[test]
fn test_mandatory_trigger_cannot_be_passed() {
    let registry = ProviderRegistry::standard();
    let config = EngineConfig::default();
    let resolver = Resolver::new(&registry, &config);
    let mut game = frontier(&registry, &["raid", "plunder"], &["vengeance"]);

    let report = raid_mars(&resolver, &registry, &mut game);
    assert!(report.journal.iter().any(|l| l == "Plunder Mars: +1 credit"));

    let prompt = prompt_of(&report);
    assert_eq!(prompt.labels(), vec!["Swear vengeance for Mars: +2 credits"]);

    let report = click(
        &resolver,
        &mut game,
        &prompt,
        "Swear vengeance for Mars: +2 credits",
        BRIN,
    );
    assert!(report.prompt().is_none());
    assert_eq!(*game.player(BRIN).expect("Missing Brin").credits(), 2);

    let ada = game.player(ADA).expect("Missing Ada");
    assert_eq!(*ada.credits(), 1);
    assert_eq!(
        ada.ability("plunder").expect("Missing plunder").counter(Plunder::COUNTER),
        1
    );
}

#[test]
fn test_clicked_trigger_cannot_fire_twice() {
    let registry = ProviderRegistry::standard();
    let config = EngineConfig::default();
    let resolver = Resolver::new(&registry, &config);
    let mut game = frontier(&registry, &[], &["sabotage"]);

    let prompt = prompt_of(&run(&resolver, &registry, &mut game, Command::Produce));
    let prompt = prompt_of(&click(
        &resolver,
        &mut game,
        &prompt,
        "Produce on Terra (output 2)",
        ADA,
    ));
    let sabotage = prompt
        .find("Sabotage Terra: -1 force")
        .expect("Missing sabotage")
        .clone();
    let report = resolver
        .activate(&mut game, &sabotage, BRIN)
        .expect("Sabotage failed");

    // The next prompt is the production menu, not the sabotage again.
    assert!(!prompt_of(&report).labels().contains(&"Sabotage Terra: -1 force"));
    let err = resolver
        .activate(&mut game, &sabotage, BRIN)
        .expect_err("Reused button accepted");
    assert_eq!(err.kind, ErrorKind::Input);
    // 4 + (2 - 1)
    assert_eq!(*game.board().planet("Terra").expect("Missing Terra").forces(), 5);
}

#[test]
fn test_sibling_buttons_expire_together() {
    let registry = ProviderRegistry::standard();
    let config = EngineConfig::default();
    let resolver = Resolver::new(&registry, &config);
    let mut game = frontier(&registry, &[], &[]);

    let prompt = prompt_of(&run(&resolver, &registry, &mut game, Command::Produce));
    let done = prompt.find("Done producing").expect("Missing done").clone();
    click(&resolver, &mut game, &prompt, "Produce on Terra (output 2)", ADA);

    let err = resolver
        .activate(&mut game, &done, ADA)
        .expect_err("Stale button accepted");
    assert_eq!(err.kind, ErrorKind::Input);
    assert!(err.message.contains("expired"));
}

#[test]
fn test_one_at_a_time_offers_first_trigger_only() {
    let registry = ProviderRegistry::standard();
    let config = EngineConfig::default().with_optional_triggers(OptionalTriggerPolicy::OneAtATime);
    let resolver = Resolver::new(&registry, &config);
    let mut game = frontier(&registry, &["refinery"], &["sabotage"]);

    let prompt = prompt_of(&run(&resolver, &registry, &mut game, Command::Produce));
    let prompt = prompt_of(&click(
        &resolver,
        &mut game,
        &prompt,
        "Produce on Terra (output 2)",
        ADA,
    ));
    assert_eq!(
        prompt.labels(),
        vec!["Refine on Terra: 1 force into 2 credits", "Pass (Ada)"]
    );

    let prompt = prompt_of(&click(&resolver, &mut game, &prompt, "Pass (Ada)", ADA));
    assert_eq!(prompt.labels(), vec!["Sabotage Terra: -1 force", "Pass (Brin)"]);
}

#[test]
fn test_simultaneous_offers_every_trigger() {
    let registry = ProviderRegistry::standard();
    let config = EngineConfig::default();
    let resolver = Resolver::new(&registry, &config);
    let mut game = frontier(&registry, &["refinery"], &["sabotage"]);

    let prompt = prompt_of(&run(&resolver, &registry, &mut game, Command::Produce));
    let prompt = prompt_of(&click(
        &resolver,
        &mut game,
        &prompt,
        "Produce on Terra (output 2)",
        ADA,
    ));
    assert_eq!(
        prompt.labels(),
        vec![
            "Refine on Terra: 1 force into 2 credits",
            "Sabotage Terra: -1 force",
            "Pass (Ada)",
            "Pass (Brin)"
        ]
    );

    // Refining first leaves one force, which Brin may still sabotage.
    let prompt = prompt_of(&click(
        &resolver,
        &mut game,
        &prompt,
        "Refine on Terra: 1 force into 2 credits",
        ADA,
    ));
    assert_eq!(prompt.labels(), vec!["Sabotage Terra: -1 force", "Pass (Brin)"]);
    click(&resolver, &mut game, &prompt, "Sabotage Terra: -1 force", BRIN);

    assert_eq!(*game.board().planet("Terra").expect("Missing Terra").forces(), 4);
    assert_eq!(*game.player(ADA).expect("Missing Ada").credits(), 2);
}

/// Grants a credit on every end of turn and re-triggers on its own result.
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
fn test_runaway_resolution_is_bounded() {
    let mut registry = ProviderRegistry::standard();
    registry.register(Box::new(Echo)).expect("Register failed");
    let config = EngineConfig::default().with_max_resolution_steps(50);
    let resolver = Resolver::new(&registry, &config);
    let mut game = frontier(&registry, &["echo"], &[]);

    Command::EndTurn
        .execute(&mut game, &registry, ADA)
        .expect("End turn refused");
    let err = resolver
        .continue_resolving(&mut game)
        .expect_err("Runaway resolution settled");
    assert_eq!(err.kind, ErrorKind::Invariant);
}

#[test]
fn test_standard_registry_holds_every_builtin() {
    let registry = ProviderRegistry::standard();
    let keys = [
        "advance",
        "muster",
        "evacuate",
        "raid",
        "industrious",
        "sabotage",
        "refinery",
        "fortress",
        "colonists",
        "plunder",
        "vengeance",
    ];
    assert_eq!(registry.len(), keys.len());
    for key in keys {
        assert!(registry.get(key).is_some(), "missing {}", key);
    }
}

#[test]
fn test_duplicate_provider_key_rejected() {
    let mut registry = ProviderRegistry::standard();
    registry.register(Box::new(Echo)).expect("Register failed");
    let err = registry
        .register(Box::new(Echo))
        .expect_err("Duplicate accepted");
    assert_eq!(err.kind, ErrorKind::Config);
}

#[test]
fn test_suspended_menu_rebuilds_from_persisted_state() {
    let registry = ProviderRegistry::standard();
    let config = EngineConfig::default();
    let resolver = Resolver::new(&registry, &config);
    let mut game = frontier(&registry, &["advance"], &[]);

    let prompt = prompt_of(&run(
        &resolver,
        &registry,
        &mut game,
        Command::Move {
            ability: "advance".to_string(),
        },
    ));
    let prompt = prompt_of(&click(&resolver, &mut game, &prompt, "To Mars (Brin, 3)", ADA));

    let json = serde_json::to_string(&game).expect("Serialize failed");
    let mut restored: Game = serde_json::from_str(&json).expect("Deserialize failed");
    assert_eq!(restored, game);

    let rebuilt = resolver
        .continue_resolving(&mut restored)
        .expect("Resolution failed");
    let rebuilt = prompt_of(&rebuilt);
    assert_eq!(rebuilt.labels(), prompt.labels());
    assert_eq!(rebuilt.text(), prompt.text());
}

#[test]
fn test_end_turn_passes_to_next_player() {
    let registry = ProviderRegistry::standard();
    let config = EngineConfig::default();
    let resolver = Resolver::new(&registry, &config);
    let mut game = frontier(&registry, &[], &[]);

    let report = run(&resolver, &registry, &mut game, Command::EndTurn);
    assert!(report.prompt().is_none());
    assert_eq!(game.current_player(), BRIN);
    assert!(report.journal.iter().any(|l| l == "Round 1: it is now Brin's turn"));

    run(&resolver, &registry, &mut game, Command::EndTurn);
    assert_eq!(game.current_player(), ADA);
    assert_eq!(*game.round(), 2);
}

#[test]
fn test_commands_refused_while_events_pending() {
    let registry = ProviderRegistry::standard();
    let config = EngineConfig::default();
    let resolver = Resolver::new(&registry, &config);
    let mut game = frontier(&registry, &[], &[]);

    run(&resolver, &registry, &mut game, Command::Produce);
    assert!(matches!(
        game.stack().top().map(|e| e.kind()),
        Some(EventKind::ProductionChoice(_))
    ));
    let err = Command::EndTurn
        .execute(&mut game, &registry, ADA)
        .expect_err("Command accepted mid-decision");
    assert_eq!(err.kind, ErrorKind::Input);
}

#[test]
fn test_excess_redirected_to_neighbour() {
    let registry = ProviderRegistry::standard();
    let config = EngineConfig::default();
    let resolver = Resolver::new(&registry, &config);
    let mut game = GameSetup::new("crowded")
        .capacity(5)
        .player("Ada", &["advance", "colonists"])
        .player("Brin", &[])
        .planet("Terra", Some("Ada"), 4, 1, &["Luna"])
        .planet("Luna", Some("Ada"), 2, 1, &[])
        .planet("Mars", Some("Brin"), 1, 1, &[])
        .build(&registry)
        .expect("Setup failed");

    let mut prompt = prompt_of(&run(
        &resolver,
        &registry,
        &mut game,
        Command::Move {
            ability: "advance".to_string(),
        },
    ));
    for label in ["To Luna (Ada, 2)", "Move 4 from Terra", "Confirm"] {
        prompt = prompt_of(&click(&resolver, &mut game, &prompt, label, ADA));
    }
    assert_eq!(prompt.labels(), vec!["Send excess to Terra", "Pass (Ada)"]);

    let report = click(&resolver, &mut game, &prompt, "Send excess to Terra", ADA);
    assert!(report.prompt().is_none());
    assert_eq!(*game.board().planet("Luna").expect("Missing Luna").forces(), 5);
    assert_eq!(*game.board().planet("Terra").expect("Missing Terra").forces(), 1);
    assert!(!report.journal.iter().any(|l| l.contains("lost to capacity")));
}

#[test]
fn test_production_above_capacity_is_destroyed() {
    let registry = ProviderRegistry::standard();
    let config = EngineConfig::default();
    let resolver = Resolver::new(&registry, &config);
    let mut game = frontier(&registry, &["industrious"], &[]);

    let prompt = prompt_of(&run(&resolver, &registry, &mut game, Command::Produce));
    let report = click(&resolver, &mut game, &prompt, "Produce on Terra (output 2)", ADA);

    // Terra: 4 + (2 + 1) = 7, one over capacity.
    let terra = game.board().planet("Terra").expect("Missing Terra");
    assert_eq!(*terra.forces(), *game.capacity());
    assert!(
        report
            .journal
            .iter()
            .any(|l| l == "Ada produced 2 forces on Terra (1 lost to capacity)"),
        "journal: {:?}",
        report.journal
    );
}

/// Cuts three forces from its owner's own production.
#[derive(Debug)]
struct Blight;

impl EffectProvider for Blight {
    fn key(&self) -> &'static str {
        "blight"
    }

    fn reacts_to(&self) -> &'static [EventTag] {
        &[EventTag::BeginProduction]
    }

    fn triggered_effects(&self, ctx: &EventContext<'_>) -> Vec<TriggeredEffect> {
        match ctx.event.kind() {
            EventKind::BeginProduction(production) if production.player == ctx.owner => {
                vec![TriggeredEffect::automatic(
                    ctx,
                    0,
                    "Blight",
                    ResolutionRequest::AdjustProduction {
                        event: *ctx.event.id(),
                        forces: -3,
                        credits: 0,
                    },
                )]
            }
            _ => Vec::new(),
        }
    }
}

#[test]
fn test_negative_production_clamps_to_zero() {
    let mut registry = ProviderRegistry::standard();
    registry.register(Box::new(Blight)).expect("Register failed");
    let config = EngineConfig::default();
    let resolver = Resolver::new(&registry, &config);
    let mut game = frontier(&registry, &["blight"], &[]);

    let prompt = prompt_of(&run(&resolver, &registry, &mut game, Command::Produce));
    let report = click(&resolver, &mut game, &prompt, "Produce on Luna (output 1)", ADA);

    let luna = game.board().planet("Luna").expect("Missing Luna");
    assert_eq!(*luna.forces(), 2);
    assert!(*luna.exhausted());
    assert!(report.journal.iter().any(|l| l == "Ada produced 0 forces on Luna"));
    assert_eq!(*game.player(ADA).expect("Missing Ada").credits(), 0);
}
