use criterion::{black_box, criterion_group, criterion_main, Criterion};
use plc_dbcache::{
    AccessTracker, AddressParser, MemoryTransport, PlcReader, ReadMode, ReaderConfig,
    S7AddressParser, VariableAddress,
};
use tokio_util::sync::CancellationToken;

fn bench_parse(c: &mut Criterion) {
    let parser = S7AddressParser;
    c.bench_function("parse_address", |b| {
        b.iter(|| parser.parse(black_box("DB100.S20.32")))
    });
}

fn bench_track_access(c: &mut Criterion) {
    let tracker = AccessTracker::new();
    let addresses: Vec<(String, VariableAddress)> = (0..64)
        .map(|i| {
            let name = format!("DB1.INT{}", i * 2);
            let address = name.parse().unwrap();
            (name, address)
        })
        .collect();

    c.bench_function("track_access_known", |b| {
        b.iter(|| {
            for (name, address) in &addresses {
                tracker.track_access(black_box(name), black_box(address));
            }
        })
    });
    c.bench_function("max_offset_for", |b| {
        b.iter(|| tracker.max_offset_for(black_box(1)))
    });
}

fn bench_cached_read(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let device = MemoryTransport::new().with_block(1, vec![0; 256]);
    let reader = PlcReader::new(device, ReaderConfig::default());
    let cancel = CancellationToken::new();

    runtime
        .block_on(reader.read_value::<i32>("DB1.DINT200", ReadMode::Cached, &cancel))
        .unwrap();

    c.bench_function("cached_read_hit", |b| {
        b.iter(|| {
            runtime.block_on(reader.read_value::<i16>(black_box("DB1.INT10"), ReadMode::Cached, &cancel))
        })
    });
    c.bench_function("direct_read", |b| {
        b.iter(|| {
            runtime.block_on(reader.read_value::<i16>(black_box("DB1.INT10"), ReadMode::Direct, &cancel))
        })
    });
}

criterion_group!(benches, bench_parse, bench_track_access, bench_cached_read);
criterion_main!(benches);
