//! Transformation performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flintcss::*;

const STYLESHEET: &str = r#"
@custom-media --narrow (width < 600px);

.card {
  display: flex;
  color: lch(50% 40 30);
  background: url(card.png) no-repeat;
  transition: transform 200ms ease-in-out;

  & .title {
    font-size: calc(1rem + 2px);
    user-select: none;
  }

  &:hover {
    box-shadow: 0 0 0 1px rgb(0 0 0 / 20%);
  }
}

@media (--narrow) {
  .card { flex-direction: column; }
}

@media (400px <= width <= 800px) {
  .sidebar { display: none; }
}

@keyframes fade {
  from { opacity: 0 }
  to { opacity: 1 }
}
"#;

fn request() -> TransformRequest {
    let mut request = TransformRequest::new(STYLESHEET);
    request.parser.filename = "bench.css".to_string();
    request.parser.nesting = true;
    request.parser.custom_media = true;
    request.transform.targets = browserslist_to_targets("safari 12, firefox 60, chrome 70").unwrap();
    request
}

fn bench_parse(c: &mut Criterion) {
    let request = request();
    c.bench_function("parse", |b| {
        b.iter(|| parse(black_box(&request.code), &request.parser).unwrap())
    });
}

fn bench_transform(c: &mut Criterion) {
    let request = request();
    c.bench_function("transform", |b| b.iter(|| transform(black_box(&request)).unwrap()));
}

fn bench_minify_with_source_map(c: &mut Criterion) {
    let mut request = request();
    request.parser.css_modules = true;
    request.printer.minify = true;
    request.printer.source_map = true;
    request.printer.analyze_dependencies = true;
    c.bench_function("minify_with_source_map", |b| {
        b.iter(|| transform(black_box(&request)).unwrap())
    });
}

fn bench_browserslist(c: &mut Criterion) {
    c.bench_function("browserslist", |b| {
        b.iter(|| browserslist_to_targets(black_box("last 2 versions, > 0.5%, not dead")).unwrap())
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_transform,
    bench_minify_with_source_map,
    bench_browserslist
);
criterion_main!(benches);
