use chainrouter::{chain, App, Context, HandlerResult, Router};
use criterion::{criterion_group, criterion_main, Criterion};
use http::{Method, Request};
use std::hint::black_box;

fn ok(ctx: &mut Context) -> HandlerResult {
    ctx.send_string("ok")
}

fn example_router() -> Router {
    let app = App::new();
    let routes = [
        (Method::GET, "/"),
        (Method::GET, "/zoo/animals"),
        (Method::POST, "/zoo/animals"),
        (Method::GET, "/zoo/animals/:id"),
        (Method::PUT, "/zoo/animals/:id"),
        (Method::PATCH, "/zoo/animals/:id"),
        (Method::DELETE, "/zoo/animals/:id"),
        (Method::GET, "/zoo/animals/:id/toys/:toy_id"),
        (
            Method::GET,
            "/zoo/:category/animals/:id/habitats/:habitat_id/sections/:section_id",
        ),
        (
            Method::POST,
            "/inventory/:warehouse_id/feeds/:feed_id/items/:item_id/batches/:batch_id",
        ),
        (Method::GET, "/complex/:a/:b/:c/:d/:e/:f/:g/:h/:i"),
        (Method::HEAD, "/zoo/health"),
        (Method::OPTIONS, "/zoo/health"),
        (Method::TRACE, "/zoo/health"),
    ];
    for (method, pattern) in routes {
        app.add(method, pattern, chain![ok]).expect("valid route");
    }
    app.build()
}

fn bench_route_resolution(c: &mut Criterion) {
    let router = example_router();
    c.bench_function("route_match", |b| {
        let test_paths = [
            (Method::GET, "/zoo/animals/123"),
            (Method::GET, "/zoo/animals/123/toys/456"),
            (Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
            (Method::POST, "/inventory/1/feeds/2/items/3/batches/4"),
            (Method::GET, "/complex/1/2/3/4/5/6/7/8/9"),
        ];
        b.iter(|| {
            for (method, path) in &test_paths {
                black_box(router.resolve(method, path));
            }
        })
    });
}

fn bench_handle(c: &mut Criterion) {
    let router = example_router();
    c.bench_function("handle_request", |b| {
        b.iter(|| {
            let req = Request::get("/zoo/animals/123?verbose=1")
                .header("cookie", "session=abc")
                .body("")
                .expect("valid request");
            black_box(router.handle(req));
        })
    });
}

criterion_group!(benches, bench_route_resolution, bench_handle);
criterion_main!(benches);
