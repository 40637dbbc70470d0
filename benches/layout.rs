use std::hint::black_box;
use std::time::{Duration, Instant};

use card_masonry::{
    Dashboard, DocumentTree, MasonryConfig, MasonryLayout, RendererRegistry, Size,
    summary_renderer,
};
use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};

const CATEGORIES: [&str; 8] = [
    "sortie", "alerts", "fissures", "invasions", "news", "events", "syndicates", "trader",
];

fn seeded_document(cards: usize) -> DocumentTree {
    let mut doc = DocumentTree::new(Size::new(1440, 900));
    for idx in 0..cards {
        doc.push_card(80 + ((idx * 37) % 260) as u32);
    }
    doc
}

fn refresh_pass(c: &mut Criterion) {
    let config = MasonryConfig::default().with_columns(4);
    let mut layout = MasonryLayout::new(seeded_document(200), config).expect("layout");
    c.bench_function("masonry_refresh_200_cards", |b| {
        b.iter(|| black_box(layout.refresh()));
    });
}

fn resize_burst(c: &mut Criterion) {
    let config = MasonryConfig::default();
    let mut layout = MasonryLayout::new(seeded_document(60), config).expect("layout");
    let widths = [1440u32, 1100, 820, 560, 1000, 1700];
    c.bench_function("masonry_resize_cycle", |b| {
        let mut now = Instant::now();
        b.iter(|| {
            for width in widths {
                layout.handle_width_change(width, now);
                now += Duration::from_millis(300);
                black_box(layout.poll(now));
            }
        });
    });
}

fn snapshot(round: usize) -> Value {
    let mut map = serde_json::Map::new();
    for (idx, category) in CATEGORIES.iter().enumerate() {
        let lines: Vec<Value> = (0..(idx + round) % 6 + 1)
            .map(|line| json!(format!("{category} entry {line}")))
            .collect();
        map.insert(category.to_string(), Value::Array(lines));
    }
    Value::Object(map)
}

fn dashboard_snapshots(c: &mut Criterion) {
    let mut renderers = RendererRegistry::new();
    for category in CATEGORIES {
        renderers.register(category, summary_renderer(category));
    }
    let mut dashboard =
        Dashboard::new(Size::new(1440, 900), MasonryConfig::default(), renderers)
            .expect("dashboard");
    let snapshots: Vec<Value> = (0..4).map(snapshot).collect();

    c.bench_function("dashboard_apply_snapshot", |b| {
        let mut round = 0;
        b.iter(|| {
            round = (round + 1) % snapshots.len();
            black_box(dashboard.apply_snapshot(&snapshots[round]).expect("snapshot"));
        });
    });
}

criterion_group!(benches, refresh_pass, resize_burst, dashboard_snapshots);
criterion_main!(benches);
