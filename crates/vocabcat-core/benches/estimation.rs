use criterion::{black_box, criterion_group, criterion_main, Criterion};

use vocabcat_core::estimation::{estimate, ThetaGrid};
use vocabcat_core::model::{Item, ItemBank, ItemId};

fn make_bank(n: u32) -> ItemBank {
    let items = (1..=n)
        .map(|id| Item {
            id,
            level: (id % 8 + 1) as u8,
            word: format!("word{id}"),
            part_of_speech: String::new(),
            correct_answer: format!("answer{id}"),
            distractors: [format!("a{id}"), format!("b{id}"), format!("c{id}")],
            discrimination: 0.8 + f64::from(id % 7) * 0.1,
            difficulty: -2.5 + f64::from(id % 50) * 0.1,
            guessing: 0.2,
        })
        .collect();
    ItemBank::from_items(items).unwrap()
}

fn bench_estimate(c: &mut Criterion) {
    let bank = make_bank(160);
    let grid = ThetaGrid::default();
    let mut group = c.benchmark_group("estimate");

    for len in [1usize, 10, 30] {
        let administered: Vec<ItemId> = (1..=len as u32).collect();
        let responses: Vec<u8> = (0..len).map(|k| (k % 3 != 0) as u8).collect();
        group.bench_function(format!("history={len}"), |b| {
            b.iter(|| {
                estimate(
                    black_box(&grid),
                    black_box(&administered),
                    black_box(&responses),
                    &bank,
                )
                .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_grid(c: &mut Criterion) {
    c.bench_function("grid_801", |b| b.iter(ThetaGrid::default));
}

criterion_group!(benches, bench_estimate, bench_grid);
criterion_main!(benches);
