pub mod challenge;
pub mod game_trait;
pub mod session;
pub mod time;
pub mod track;
pub mod words;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::VecDeque;
    use std::time::Duration;

    use rand::RngCore;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    use crate::game_trait::{
        Actor, GameConfig, GameKind, GameMetadata, Move, MoveOutcome, PlayerId, TurnGame,
        TurnPolicy,
    };
    use crate::session::Session;
    use crate::words::WordBank;

    /// `n` player ids starting at 1.
    pub fn make_players(n: usize) -> Vec<PlayerId> {
        (1..=n as PlayerId).collect()
    }

    /// Deterministic RNG for reproducible boards.
    pub fn seeded_rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    /// A small word bank covering every tier and a solvable ladder.
    pub fn sample_words() -> WordBank {
        WordBank::from_lists(
            [
                "COLD", "CORD", "CARD", "WARD", "WARM", "WORM", "WORD", "CORE", "BOLD", "BOND",
            ],
            [
                "CAT", "TREE", "APPLE", "BANANA", "GIRAFFE", "ELEPHANT", "MOON", "PLANET",
            ],
        )
    }

    /// Initialise `game` with `n` players and the sample words.
    pub fn init_game(game: &mut dyn TurnGame, n: usize, config: GameConfig, seed: u64) {
        let players = make_players(n);
        let mut rng = seeded_rng(seed);
        game.init(&players, &config, &sample_words(), &mut rng);
    }

    /// Actor helper for seated players.
    pub fn seated(id: PlayerId, seat: usize) -> Actor {
        Actor {
            id,
            seat: Some(seat),
        }
    }

    /// Game that replays a fixed list of outcomes, for exercising the session
    /// machinery without real rules.
    pub struct ScriptedGame {
        policy: TurnPolicy,
        script: VecDeque<MoveOutcome>,
        calls: u32,
    }

    impl ScriptedGame {
        pub fn new(policy: TurnPolicy, script: Vec<MoveOutcome>) -> Self {
            Self {
                policy,
                script: script.into(),
                calls: 0,
            }
        }
    }

    impl TurnGame for ScriptedGame {
        fn metadata(&self) -> GameMetadata {
            GameMetadata {
                name: "Scripted".to_string(),
                description: "Replays canned outcomes".to_string(),
                min_players: if self.policy == TurnPolicy::Alternating {
                    2
                } else {
                    1
                },
                max_players: 2,
                turn_policy: self.policy,
            }
        }

        fn kind(&self) -> GameKind {
            GameKind::ConnectFour
        }

        fn init(
            &mut self,
            _players: &[PlayerId],
            _config: &GameConfig,
            _words: &WordBank,
            _rng: &mut dyn RngCore,
        ) {
        }

        fn apply_move(&mut self, _actor: Actor, _mv: &Move) -> MoveOutcome {
            self.calls += 1;
            self.script.pop_front().unwrap_or(MoveOutcome::CONTINUE)
        }

        fn view(&self) -> serde_json::Value {
            json!({ "calls": self.calls })
        }

        fn reveal(&self) -> Option<String> {
            Some("SECRET".to_string())
        }
    }

    /// Session around a [`ScriptedGame`] with a 300 s inactivity window.
    pub fn scripted_session(
        policy: TurnPolicy,
        players: &[PlayerId],
        script: Vec<MoveOutcome>,
    ) -> Session {
        Session::new(
            "scripted".into(),
            players.to_vec(),
            Box::new(ScriptedGame::new(policy, script)),
            Duration::from_secs(300),
        )
        .expect("scripted session must be valid")
    }

    // ================================================================
    // Game Trait Contract Tests
    // ================================================================
    // Every TurnGame implementation must pass these. Game crates call them
    // from their own #[cfg(test)] modules with an initialised game.

    /// After init() the public view must be a non-null JSON value.
    pub fn contract_init_produces_view(game: &mut dyn TurnGame, players: usize) {
        init_game(game, players, GameConfig::default(), 1);
        assert!(
            !game.view().is_null(),
            "view() must describe the board after init"
        );
    }

    /// An `Invalid` outcome must leave the public state untouched.
    pub fn contract_invalid_move_changes_nothing(game: &mut dyn TurnGame, actor: Actor, mv: &Move) {
        let before = game.view();
        let outcome = game.apply_move(actor, mv);
        assert!(outcome.is_invalid(), "expected Invalid, got {outcome:?}");
        assert_eq!(before, game.view(), "Invalid move must not change state");
    }

    /// A move of the wrong shape is always rejected.
    pub fn contract_rejects_foreign_move_kind(game: &mut dyn TurnGame, actor: Actor, foreign: &Move) {
        let outcome = game.apply_move(actor, foreign);
        assert_eq!(
            outcome,
            MoveOutcome::invalid(crate::game_trait::InvalidMove::WrongMoveKind)
        );
    }

    /// The public view must never contain the secret while the game runs.
    pub fn contract_view_hides_secret(game: &dyn TurnGame) {
        if let Some(secret) = game.reveal() {
            let view = game.view().to_string();
            assert!(
                !view.contains(&format!("\"{secret}\"")),
                "view leaks the secret {secret}: {view}"
            );
        }
    }
}
