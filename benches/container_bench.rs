//! 容器解析的性能基准测试

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dibox::Container;

/// 测试用的简单服务
#[derive(Clone)]
struct SimpleService {
    value: i32,
}

/// 基准测试：缓存命中的单例解析
fn bench_cached_singleton_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_singleton_resolution");

    for service_count in [1, 10, 100].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(service_count),
            service_count,
            |b, &service_count| {
                let container = Container::new();
                for i in 0..service_count {
                    container
                        .set(&format!("service_{}", i), move |_c: &Container| {
                            SimpleService { value: i as i32 }
                        })
                        .unwrap();
                    // 预热缓存
                    container
                        .get::<SimpleService>(&format!("service_{}", i))
                        .unwrap();
                }

                b.iter(|| {
                    let service = container
                        .get::<SimpleService>(black_box("service_0"))
                        .unwrap();
                    black_box(service.value)
                });
            },
        );
    }
    group.finish();
}

/// 基准测试：工厂解析（每次都构造新实例）
fn bench_factory_resolution(c: &mut Criterion) {
    let container = Container::new();
    container
        .factory("fresh", |_c: &Container| SimpleService { value: 42 })
        .unwrap();

    c.bench_function("factory_resolution", |b| {
        b.iter(|| {
            let service = container.get::<SimpleService>(black_box("fresh")).unwrap();
            black_box(service.value)
        });
    });
}

/// 基准测试：参数读取（普通值与生产函数）
fn bench_param_lookup(c: &mut Criterion) {
    let container = Container::new();
    container.set_param("plain", 7_i64).unwrap();
    container.protect("produced", || 7_i64).unwrap();

    let mut group = c.benchmark_group("param_lookup");
    group.bench_function("plain_value", |b| {
        b.iter(|| black_box(container.get_param::<i64>("plain").unwrap()));
    });
    group.bench_function("producer", |b| {
        b.iter(|| black_box(container.get_param::<i64>("produced").unwrap()));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_cached_singleton_resolution,
    bench_factory_resolution,
    bench_param_lookup
);
criterion_main!(benches);
