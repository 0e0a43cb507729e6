use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hanparse::token::parse_tokens;
use hanparse::{Analyzer, Options, ParseOptions};

const SIMPLE: &str = "저:MM;작:VA;은:ETM;소년:NNG;밥:NNG;을:JKO;먹:VV;다:EF;.:SF";
const COMPLEX: &str = "중국:NNP;음식:NNG;을:JKO;좋아하:VV;기:ETN;때문:NNB;에:JKB;밥:NNG;을:JKO;먹:VV;었:EP;어요:EF;.:SF";

fn criterion_benchmark(c: &mut Criterion) {
  let analyzer = Analyzer::korean().unwrap();
  let simple = parse_tokens(SIMPLE).unwrap();
  let complex = parse_tokens(COMPLEX).unwrap();
  let unmemoized = Options {
    parse: ParseOptions {
      memoize: false,
      ..Default::default()
    },
    ..Default::default()
  };

  c.bench_function("analyze simple", |b| {
    b.iter(|| analyzer.analyze(black_box(&simple), &Options::default()))
  });

  c.bench_function("analyze because phrase", |b| {
    b.iter(|| analyzer.analyze(black_box(&complex), &Options::default()))
  });

  c.bench_function("analyze because phrase unmemoized", |b| {
    b.iter(|| analyzer.analyze(black_box(&complex), &unmemoized))
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
