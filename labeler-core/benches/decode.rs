use criterion::{criterion_group, criterion_main, Criterion};
use labeler_core::sequence::{Sequence, Token};
use labeler_core::{Decoder, WeightVector};

fn synthetic_sequence(n_tokens: usize, n_feats: usize) -> Sequence {
    let tokens = (0..n_tokens)
        .map(|t| {
            let feats = vec![((t % n_feats) as u32, 1.0), (((t + 1) % n_feats) as u32, 0.5)];
            Token::new(feats)
        })
        .collect();
    Sequence::new(tokens)
}

fn bench_decode(c: &mut Criterion) {
    let n_labels = 9;
    let n_feats = 1usize << 18;
    let transition = WeightVector::new(n_labels + 2, n_labels + 2, false);
    let emission = WeightVector::new(n_labels, n_feats, false);
    let base = synthetic_sequence(50, n_feats);

    c.bench_function("decode_50_tokens_9_labels", |b| {
        b.iter(|| {
            let mut seq = base.clone();
            let decoder = Decoder::new(n_labels, &transition, &emission);
            decoder.decode(&mut seq).unwrap();
        })
    });
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
