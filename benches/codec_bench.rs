use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mcgfmt::sar::catalog;
use mcgfmt::{Container, Sample, Sar, Signal, SignalPair, SignalSample};
use std::io::Cursor;

fn sar_fixture() -> Sar {
    let mut sar = Sar::new(1_700_000_000);
    sar.create_std_analyses("V5", "II");
    for analysis in &mut sar.analyses {
        for (n, (name, _)) in catalog::indexes_for(&analysis.sym).iter().enumerate() {
            analysis.add_std_index(name, (n % 3) as f32 * 0.5);
        }
        analysis.add_idata_f("curve", &[0.25; 256], None);
    }
    sar
}

fn ecg_fixture() -> Sample {
    let v5 = Signal::new("V5", 2, 512, 1.0);
    let ii = Signal::new("II", 2, 512, 1.0);
    let data: Vec<i32> = (0..8192).map(|i| (i % 2000) - 1000).collect();
    Sample::new(
        vec![
            SignalSample::new(v5.clone(), data.clone(), 1_700_000_000),
            SignalSample::new(ii.clone(), data, 1_700_000_000),
        ],
        vec![SignalPair::new(v5, ii, 1.3)],
    )
}

fn bench_sar(c: &mut Criterion) {
    let sar = sar_fixture();
    let mut encoded = Vec::new();
    sar.write(&mut encoded).unwrap();

    c.bench_function("sar_encode", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(encoded.len());
            black_box(&sar).write(&mut buf).unwrap();
            buf
        })
    });
    c.bench_function("sar_decode", |b| {
        b.iter(|| Sar::read(&mut Cursor::new(black_box(&encoded))).unwrap())
    });
    c.bench_function("sar_llo_extended", |b| b.iter(|| black_box(&sar).to_llo_extended().unwrap()));
}

fn bench_ecg(c: &mut Criterion) {
    let sample = ecg_fixture();
    let mut encoded = Vec::new();
    sample.write(&mut encoded).unwrap();

    c.bench_function("ecg_encode_2x8192", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(encoded.len());
            black_box(&sample).write(&mut buf).unwrap();
            buf
        })
    });
    c.bench_function("ecg_decode_2x8192", |b| {
        b.iter(|| Sample::read(&mut Cursor::new(black_box(&encoded))).unwrap())
    });
}

criterion_group!(benches, bench_sar, bench_ecg);
criterion_main!(benches);
