use goose::prelude::*;
use std::env;

/// Access token cached per simulated client.
struct Token(String);

fn client_credentials() -> (String, String) {
    let id = env::var("CLIENT_ID").unwrap_or_else(|_| "loadtest".to_string());
    let secret = env::var("CLIENT_SECRET").unwrap_or_else(|_| "loadtest-secret".to_string());
    (id, secret)
}

async fn health_check(user: &mut GooseUser) -> TransactionResult {
    let _goose_metrics = user.get("/_ah/health").await?;
    Ok(())
}

/// Client credentials grant. Stores the issued token for introspection.
async fn issue_token(user: &mut GooseUser) -> TransactionResult {
    let (id, secret) = client_credentials();
    let request_builder = user
        .get_request_builder(&GooseMethod::Post, "/v1/oauth/tokens")?
        .basic_auth(id, Some(secret))
        .form(&[("grant_type", "client_credentials"), ("scope", "read")]);
    let goose_request = GooseRequest::builder()
        .method(GooseMethod::Post)
        .path("/v1/oauth/tokens")
        .set_request_builder(request_builder)
        .build();
    let mut goose = user.request(goose_request).await?;

    let body = match goose.response {
        Ok(response) => response.text().await.unwrap_or_default(),
        Err(_) => return Ok(()),
    };
    let token = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["access_token"].as_str().map(str::to_string));
    match token {
        Some(token) => {
            user.set_session_data(Token(token));
            Ok(())
        }
        None => user.set_failure("no access_token in response", &mut goose.request, None, Some(&body)),
    }
}

async fn introspect_token(user: &mut GooseUser) -> TransactionResult {
    let Some(Token(token)) = user.get_session_data::<Token>() else {
        return Ok(());
    };
    let token = token.clone();
    let (id, secret) = client_credentials();
    let request_builder = user
        .get_request_builder(&GooseMethod::Post, "/v1/oauth/introspect")?
        .basic_auth(id, Some(secret))
        .form(&[("token", token.as_str()), ("token_type_hint", "access_token")]);
    let goose_request = GooseRequest::builder()
        .method(GooseMethod::Post)
        .path("/v1/oauth/introspect")
        .set_request_builder(request_builder)
        .build();
    let _goose_metrics = user.request(goose_request).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), GooseError> {
    let (id, _) = client_credentials();
    println!("Authenticating as client '{id}' (set CLIENT_ID / CLIENT_SECRET to override)");

    GooseAttack::initialize()?
        .register_scenario(
            scenario!("HealthCheck").register_transaction(transaction!(health_check)),
        )
        .register_scenario(
            scenario!("TokenLifecycle")
                .register_transaction(transaction!(issue_token).set_on_start())
                .register_transaction(transaction!(issue_token).set_weight(1)?)
                .register_transaction(transaction!(introspect_token).set_weight(5)?),
        )
        .execute()
        .await?;

    Ok(())
}
