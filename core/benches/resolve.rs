use criterion::*;
use nnir_core::internal::*;

fn relu_chain(len: usize) -> Graph {
    let mut graph = Graph::new("chain");
    let float = TypeDescriptor::tensor(ElementKind::F32);
    for i in 0..len {
        let input =
            if i == 0 { ValueInfo::typed("x", float.clone()) } else { ValueInfo::untyped(format!("v{}", i - 1)) };
        graph.add_node(format!("relu_{i}"), "Relu", "", &[input], &[ValueInfo::untyped(format!("v{i}"))]);
    }
    graph
}

fn resolve(c: &mut Criterion) {
    register_builtin_ops();
    let mut group = c.benchmark_group("resolve");
    for len in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("relu_chain", len), &len, |b, &len| {
            b.iter_with_setup(|| relu_chain(len), |mut graph| graph.resolve().unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, resolve);
criterion_main!(benches);
