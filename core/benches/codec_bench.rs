use bsbi_core::compress::{gamma_decode_n, vbyte_decode_n, vbyte_encode, GammaWriter};
use criterion::{criterion_group, criterion_main, Criterion};

fn bench_codecs(c: &mut Criterion) {
    let doc_ids: Vec<u32> = (0..10_000u32).map(|i| i * 7 + 3).collect();
    let freqs: Vec<u32> = (0..10_000u32).map(|i| (i % 200) + 1).collect();

    c.bench_function("vbyte_encode_10k", |b| {
        b.iter(|| {
            let mut out = Vec::new();
            for &v in &doc_ids {
                vbyte_encode(v, &mut out);
            }
            out
        })
    });

    let mut encoded = Vec::new();
    for &v in &doc_ids {
        vbyte_encode(v, &mut encoded);
    }
    c.bench_function("vbyte_decode_10k", |b| {
        b.iter(|| vbyte_decode_n(&encoded, doc_ids.len()).unwrap())
    });

    c.bench_function("gamma_encode_10k", |b| {
        b.iter(|| {
            let mut w = GammaWriter::new();
            for &v in &freqs {
                w.write(v).unwrap();
            }
            w.finish()
        })
    });

    let mut w = GammaWriter::new();
    for &v in &freqs {
        w.write(v).unwrap();
    }
    let gamma_bytes = w.finish();
    c.bench_function("gamma_decode_10k", |b| {
        b.iter(|| gamma_decode_n(&gamma_bytes, freqs.len()).unwrap())
    });
}

criterion_group!(benches, bench_codecs);
criterion_main!(benches);
