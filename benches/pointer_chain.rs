use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use memory_recorder::process::SyntheticProcess;
use memory_recorder::{Address, AddressWidth, PointerResolver};

const NODE_STRIDE: u64 = 0x1000;

/// `depth` nodes where node i holds a pointer to node i+1 at +0x8
fn linked_nodes(width: AddressWidth, depth: usize) -> SyntheticProcess {
    let process = SyntheticProcess::new(1, width);
    for i in 0..=depth as u64 {
        let node = 0x10_0000 + i * NODE_STRIDE;
        process.map_zeroed(Address::new(node), 0x10);
        process
            .write_pointer(width, Address::new(node + 0x8), Address::new(node + NODE_STRIDE))
            .expect("node is mapped");
    }
    process
}

fn benchmark_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    for width in [AddressWidth::Bits32, AddressWidth::Bits64] {
        for depth in [1usize, 4, 16] {
            let process = linked_nodes(width, depth);
            let offsets = vec![0x8i64; depth + 1];
            let resolver = PointerResolver::new(&process, width);

            group.bench_with_input(
                BenchmarkId::new(width.to_string(), depth),
                &offsets,
                |b, offsets| {
                    b.iter(|| {
                        black_box(
                            resolver
                                .resolve(black_box(Address::new(0x10_0000)), offsets)
                                .unwrap(),
                        )
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, benchmark_resolve);
criterion_main!(benches);
