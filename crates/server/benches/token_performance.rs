use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use oauth2_server::oauth2::client::basic_auth_credentials;
use oauth2_server::oauth2::scope::{join_sorted, scope_not_greater};
use oauth2_server::oauth2::{OsSecretFactory, SecretFactory, SecretHash};
use oauth2_server::web::redirect::{login_redirect, query_param};

// CI-friendly benchmark configuration
fn is_ci_mode() -> bool {
    std::env::var("CI").is_ok() || std::env::var("QUICK_BENCH").is_ok()
}

fn benchmark_secret_generation(c: &mut Criterion) {
    let factory = OsSecretFactory;

    c.bench_function("secret_generate", |b| {
        b.iter(|| black_box(factory.generate()));
    });
}

fn benchmark_scope_checks(c: &mut Criterion) {
    c.bench_function("scope_not_greater_subset", |b| {
        b.iter(|| {
            black_box(scope_not_greater(
                black_box("read write"),
                black_box("admin read write"),
            ))
        });
    });

    c.bench_function("scope_not_greater_superset", |b| {
        b.iter(|| black_box(scope_not_greater(black_box("admin read"), black_box("read"))));
    });

    c.bench_function("join_sorted", |b| {
        let scopes = ["write", "read", "admin", "read"];
        b.iter(|| black_box(join_sorted(black_box(scopes))));
    });
}

fn benchmark_request_parsing(c: &mut Criterion) {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_static("Basic YWNtZTpzM2NyM3Q="),
    );

    c.bench_function("basic_auth_credentials", |b| {
        b.iter(|| black_box(basic_auth_credentials(black_box(&headers))));
    });

    c.bench_function("login_redirect", |b| {
        let query = Some("client_id=acme&response_type=code&state=xyz");
        b.iter(|| black_box(login_redirect(black_box("/authorize"), black_box(query))));
    });

    c.bench_function("query_param", |b| {
        let query = Some("client_id=acme&response_type=code&state=xyz");
        b.iter(|| black_box(query_param(black_box(query), black_box("state"))));
    });
}

fn benchmark_password_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("password");
    if is_ci_mode() {
        group.sample_size(10);
    }

    let hash = SecretHash::compute("hunter22").unwrap();
    group.bench_function("hash", |b| {
        b.iter(|| black_box(SecretHash::compute(black_box("hunter22")).unwrap()));
    });
    group.bench_function("verify", |b| {
        b.iter(|| black_box(hash.matches(black_box("hunter22"))));
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_secret_generation,
    benchmark_scope_checks,
    benchmark_request_parsing,
    benchmark_password_hashing
);
criterion_main!(benches);
