use std::collections::HashMap;
use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use fliprush::config::Config;
use fliprush::engine::levels::{Mode, RouteParams};
use fliprush::generator::deck::build_deck;
use fliprush::generator::quiz_bank::{QuizBank, QuizTopic};
use fliprush::session::{GameEvent, GameSession, Phase};
use fliprush::store::{MemoryStore, ProgressStore};

fn bench_build_deck(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(42);

    c.bench_function("build_deck (level 10)", |b| {
        b.iter(|| build_deck(black_box(Mode::Level(10)), &mut rng))
    });
}

fn bench_quiz_sampling(c: &mut Criterion) {
    let bank = QuizBank::bundled();
    let mut rng = SmallRng::seed_from_u64(7);

    c.bench_function("questions_for_topic (mixed, 20)", |b| {
        b.iter(|| bank.questions_for_topic(black_box(&QuizTopic::Mixed), 20, &mut rng))
    });
}

/// Clear a level board pair by pair, ticking the clock between presses.
fn bench_simulated_level(c: &mut Criterion) {
    let bank = Arc::new(QuizBank::bundled());

    c.bench_function("simulated level 10 clear", |b| {
        b.iter(|| {
            let mut session = GameSession::with_rng(
                &RouteParams::new(Mode::Level(10)),
                Config::default(),
                ProgressStore::new(MemoryStore::new()),
                Arc::clone(&bank),
                SmallRng::seed_from_u64(3),
            );
            while session.phase() == Phase::Playing {
                let mut by_pair: HashMap<u32, Vec<u32>> = HashMap::new();
                for card in session.deck().cards().iter().filter(|c| !c.matched) {
                    by_pair.entry(card.pair_id).or_default().push(card.id);
                }
                let Some(ids) = by_pair.into_values().next() else {
                    break;
                };
                session.handle(GameEvent::CardPressed(ids[0]));
                session.handle(GameEvent::CardPressed(ids[1]));
                session.advance_time(black_box(900));
            }
            session.phase()
        })
    });
}

criterion_group!(
    benches,
    bench_build_deck,
    bench_quiz_sampling,
    bench_simulated_level
);
criterion_main!(benches);
