//! Benchmarks du lexer ctcomp (Criterion)
//!
//! ▶ Paramètres via variables d’environnement :
//!   - CRIT_SAMPLES      (def=60)   — taille d’échantillon Criterion
//!   - CRIT_WARMUP_MS    (def=300)  — warmup en ms
//!   - CRIT_MEASURE_MS   (def=1000) — fenêtre de mesure en ms
//!
//! Suites incluses :
//!   1) micro        — petites sources embarquées (variété de jetons)
//!   2) synthetic    — générateurs (arithmétique, mots-clés, commentaires) en [16, 64, 256] KiB

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use ctcomp_lexer::{Lexer, TokenKind};

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|s| s.parse::<usize>().ok()).unwrap_or(default)
}
fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|s| s.parse::<u64>().ok()).unwrap_or(default)
}

fn configure<M: criterion::measurement::Measurement>(group: &mut criterion::BenchmarkGroup<'_, M>) {
    group
        .sample_size(env_usize("CRIT_SAMPLES", 60))
        .warm_up_time(Duration::from_millis(env_u64("CRIT_WARMUP_MS", 300)))
        .measurement_time(Duration::from_millis(env_u64("CRIT_MEASURE_MS", 1000)));
}

/// Number of tokens up to `Eof`; errors included.
fn lex_count(src: &str) -> usize {
    let mut lx = Lexer::new(src);
    let mut n = 0;
    while lx.next_token().kind != TokenKind::Eof {
        n += 1;
    }
    n
}

const MICRO: &[(&str, &str)] = &[
    ("arith", "1 + 2 * 3 - 4 / 5 * (6 - -7.25)"),
    ("keywords", "fn struct return while elif namespace protected generic true false"),
    ("identifiers", "alpha beta_2 _gamma fnx whiles returned includes"),
    ("strings", r#""double" 'single' "it's" 'say "hi"'"#),
    ("comments", "# header\n1 # one\n+ # plus\n2 # two\n"),
];

fn inflate_to_kib(seed: &str, kib: usize) -> String {
    let target = kib * 1024;
    let mut s = String::with_capacity(target + seed.len());
    while s.len() < target {
        s.push_str(seed);
    }
    s
}

pub fn bench_lexer_micro(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer/micro");
    configure(&mut group);
    for &(name, src) in MICRO {
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), src, |b, s| {
            b.iter(|| black_box(lex_count(black_box(s))));
        });
    }
    group.finish();
}

pub fn bench_lexer_synthetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer/synthetic");
    configure(&mut group);
    for kib in [16, 64, 256] {
        let arith = inflate_to_kib("(12.5 + 3) * -4 / 2 - 7\n", kib);
        let words = inflate_to_kib("while whilst fn fnx return retina match matcher\n", kib);
        let notes = inflate_to_kib("# a fairly long comment line that the lexer must skip\n1\n", kib);

        for (name, src) in [("arith", &arith), ("words", &words), ("comments", &notes)] {
            group.throughput(Throughput::Bytes(src.len() as u64));
            group.bench_with_input(BenchmarkId::new(name, kib), src, |b, s| {
                b.iter(|| black_box(lex_count(black_box(s))));
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_lexer_micro, bench_lexer_synthetic);
criterion_main!(benches);
