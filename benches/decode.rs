use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use dev9::{FrameDecoder, Uevent};

/// A coldplug-sized dump of `n` events in wire format.
fn build_dump(n: usize) -> Vec<u8> {
    (0..n)
        .flat_map(|i| {
            Uevent::new(&format!("add@/devices/virtual/tty/tty{i}"))
                .set("ACTION", "add")
                .set("SUBSYSTEM", "tty")
                .set("DEVPATH", &format!("/devices/virtual/tty/tty{i}"))
                .set("DEVNAME", &format!("tty{i}"))
                .set("MAJOR", "4")
                .set("MINOR", &i.to_string())
                .set("SEQNUM", &(1000 + i).to_string())
                .to_bytes()
        })
        .collect()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for &n in &[1, 64, 1024] {
        let dump = build_dump(n);
        group.throughput(Throughput::Bytes(dump.len() as u64));

        group.bench_function(&format!("{n}_events_one_read"), |b| {
            b.iter(|| {
                let mut decoder = FrameDecoder::new();
                let mut events = decoder.feed(black_box(&dump));
                events.extend(decoder.finish());
                events
            });
        });

        group.bench_function(&format!("{n}_events_4k_reads"), |b| {
            b.iter(|| {
                let mut decoder = FrameDecoder::new();
                let mut count = 0;
                for chunk in black_box(&dump).chunks(4096) {
                    count += decoder.feed(chunk).len();
                }
                count + usize::from(decoder.finish().is_some())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
