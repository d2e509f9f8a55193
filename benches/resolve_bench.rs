use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hermannia::board::{BoardConfig, BoardState, Order, OrderSpec, OrderType, Player, Season};
use hermannia::resolve::{CombatRules, RoundResolver, SeededDice};
use hermannia::validate::{bind_order, validate_order, validate_order_set};

const DEMO_BOARD: &str = include_str!("../boards/demo.json");

fn demo(season: Season) -> BoardState {
    let mut state = BoardConfig::from_json(DEMO_BOARD)
        .unwrap()
        .build()
        .unwrap();
    state.season = season;
    state
}

fn moves(state: &BoardState, pairs: &[(&str, &str, &str)]) -> Vec<Order> {
    let map = state.map();
    pairs
        .iter()
        .map(|&(player, from, to)| {
            Order::move_to(player, map.id(from).unwrap(), map.id(to).unwrap())
        })
        .collect()
}

fn bench_resolve_quiet(c: &mut Criterion) {
    let state = demo(Season::Spring);
    let orders = moves(
        &state,
        &[("red", "Rotburg", "Rotwald"), ("red", "Rotwald", "Rotburg")],
    );
    c.bench_function("resolve_quiet_swap", |b| {
        let resolver = RoundResolver::new(CombatRules::default(), orders.clone());
        let mut dice = SeededDice::new(1);
        b.iter(|| resolver.run(black_box(&state), &mut dice))
    });
}

fn bench_resolve_battles(c: &mut Criterion) {
    let state = demo(Season::Spring);
    let orders = moves(
        &state,
        &[
            ("yellow", "Hermannia", "Mittelland"),
            ("red", "Rotburg", "Mittelland"),
            ("yellow", "Ostmark", "Altburg"),
            ("green", "Grunhain", "Altburg"),
            ("red", "Rotwald", "Sumpf"),
        ],
    );
    c.bench_function("resolve_crowded_battles", |b| {
        let resolver = RoundResolver::new(CombatRules::default(), orders.clone());
        let mut dice = SeededDice::new(1);
        b.iter(|| resolver.run(black_box(&state), &mut dice))
    });
}

fn bench_validate(c: &mut Criterion) {
    let state = demo(Season::Spring);
    let player = Player::from("yellow");
    let specs = vec![
        OrderSpec::new(OrderType::Move, "Hermannia").to("Mittelland"),
        OrderSpec::new(OrderType::Move, "Ostmark").to("Altburg"),
        OrderSpec::new(OrderType::Transport, "Nordmeer"),
    ];
    c.bench_function("validate_order_set", |b| {
        b.iter(|| {
            let orders: Vec<Order> = specs
                .iter()
                .map(|s| bind_order(s, &player, state.map()).unwrap())
                .collect();
            for order in &orders {
                validate_order(order, state.season, &state).unwrap();
            }
            validate_order_set(black_box(&orders), &state).unwrap();
        })
    });
}

criterion_group!(
    benches,
    bench_resolve_quiet,
    bench_resolve_battles,
    bench_validate
);
criterion_main!(benches);
