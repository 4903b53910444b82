//! Per-respondent evaluation cost of compiled expressions.
//!
//! Run with: `cargo bench --bench evaluator`

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use fieldexpr_core::api::{Engine, EngineOptions};
use fieldexpr_core::model::{
    EntityValue, EntityValueCombination, InMemoryEntityRepository, InMemoryProfile,
    ResponseFieldDescriptor,
};

const BRANDS: i32 = 20;
const PRODUCTS: i32 = 10;

fn survey() -> (Engine, Vec<InMemoryProfile>, EntityValueCombination) {
    let mut repository = InMemoryEntityRepository::new();
    let brand = repository.add_entity_type("Brand", 1..=BRANDS);
    let product = repository.add_entity_type("Product", 1..=PRODUCTS);
    let mut engine = Engine::new(EngineOptions::default(), Arc::new(repository));
    let age = engine.declare_field(ResponseFieldDescriptor::new("Age", []));
    let aware = engine.declare_field(ResponseFieldDescriptor::new("Aware", [brand.clone()]));
    let rating = engine.declare_field(ResponseFieldDescriptor::new(
        "Rating",
        [brand.clone(), product.clone()],
    ));
    engine
        .declare_or_update("Fan", "Aware == 1 and Age >= 18")
        .unwrap();

    let at = |b: i32, p: Option<i32>| {
        let values = [EntityValue::new(brand.clone(), b)]
            .into_iter()
            .chain(p.map(|p| EntityValue::new(product.clone(), p)));
        EntityValueCombination::new(values).unwrap()
    };
    let profiles = (0..100)
        .map(|i: i32| {
            let mut profile = InMemoryProfile::new(i.into())
                .with_answer(&age, EntityValueCombination::empty(), 16 + i % 50);
            for b in 1..=BRANDS {
                if (b + i) % 3 == 0 {
                    profile = profile.with_answer(&aware, at(b, None), 1);
                }
                for p in 1..=PRODUCTS {
                    if (b * p + i) % 4 == 0 {
                        profile = profile.with_answer(&rating, at(b, Some(p)), (b + p + i) % 10);
                    }
                }
            }
            profile
        })
        .collect();
    (engine, profiles, at(7, None))
}

fn bench_evaluate(c: &mut Criterion) {
    let (engine, profiles, context) = survey();
    let mut group = c.benchmark_group("evaluate");

    let expressions = [
        ("scalar", "Age * 2 + 1 > 40"),
        ("field_in_context", "Fan and Aware == 1"),
        ("row_aggregate", "sum(response.Rating(brand=result.brand))"),
        ("grid_comprehension", "len([r for r in response.Rating() if r > 5])"),
        ("variable_grid", "sum(response.Fan())"),
        (
            "lookup",
            "{1: 10, 2: 20, 3: 30}.get(Aware, 0) + max(response.Rating(product=3), default=0)",
        ),
    ];
    for (name, expression) in expressions {
        let variable = engine.parse_numeric_or_null(expression).unwrap().unwrap();
        let mut evaluator = variable.specialize_for_context(&context).unwrap();
        group.bench_with_input(BenchmarkId::new(name, profiles.len()), &profiles, |b, profiles| {
            b.iter(|| {
                for profile in profiles {
                    black_box(evaluator.evaluate(profile).unwrap());
                }
            });
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let (engine, _, context) = survey();
    let expression = "sum([r * 2 for r in response.Rating(brand=result.brand) if r > Age // 10])";
    c.bench_function("compile_and_specialize", |b| {
        b.iter(|| {
            let variable = engine
                .parse_numeric_or_null(black_box(expression))
                .unwrap()
                .unwrap();
            black_box(variable.specialize_for_context(&context).unwrap());
        });
    });
}

criterion_group!(benches, bench_evaluate, bench_compile);
criterion_main!(benches);
