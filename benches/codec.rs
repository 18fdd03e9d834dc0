use criterion::{criterion_group, criterion_main, Criterion};
use geobuf::{Decoder, Encoder, GeoJson};

fn fixture() -> GeoJson {
    let mut features = Vec::with_capacity(256);
    for i in 0..256 {
        let x = -180.0 + (i as f64) * 1.40625;
        features.push(format!(
            r#"{{"type":"Feature","id":{i},
                "geometry":{{"type":"Polygon","coordinates":[[
                    [{x},0.0],[{x},10.5],[{x2},10.5],[{x2},0.0],[{x},0.0]
                ]]}},
                "properties":{{"name":"cell-{i}","row":{i},"active":true}}}}"#,
            i = i,
            x = x,
            x2 = x + 1.0,
        ));
    }
    format!(
        r#"{{"type":"FeatureCollection","features":[{}]}}"#,
        features.join(",")
    )
    .parse()
    .unwrap()
}

fn benchmark_encode(c: &mut Criterion) {
    let geojson = fixture();
    let mut encoder = Encoder::default();
    c.bench_function("encode feature collection", move |b| {
        b.iter(|| encoder.encode(&geojson))
    });
}

fn benchmark_decode(c: &mut Criterion) {
    let bytes = Encoder::default().encode(&fixture());
    let mut decoder = Decoder::new();
    c.bench_function("decode feature collection", move |b| {
        b.iter(|| decoder.decode(&bytes).unwrap())
    });
}

criterion_group!(benches, benchmark_encode, benchmark_decode);
criterion_main!(benches);
