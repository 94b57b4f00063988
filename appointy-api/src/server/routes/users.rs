use crate::server::{Result, ServerError, ServerRouter, json::Json};
use appointy_common::model::{
    Id,
    password::PasswordPolicy,
    user::{CreateUser, NewUser, User, UserMarker},
};
use appointy_db::client::DbClient;
use axum::{
    extract::State,
    http::{HeaderName, StatusCode, header::LOCATION},
    routing::post,
};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .route("/users", post(create_user))
        .typed_get(get_user)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}", rejection(ServerError))]
struct GetUserPath {
    id: Id<UserMarker>,
}

async fn get_user(
    GetUserPath { id }: GetUserPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<User>> {
    let user = db
        .fetch_user(id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(user))
}

async fn create_user(
    State(db): State<Arc<DbClient>>,
    State(password_policy): State<PasswordPolicy>,
    Json(user): Json<CreateUser>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Json<User>)> {
    password_policy.check(&user.password)?;

    let CreateUser {
        name,
        email,
        password,
    } = user;
    let password_hash = tokio::task::spawn_blocking(move || password.hash()).await??;

    let user = db
        .create_user(&NewUser {
            name,
            email,
            password_hash,
        })
        .await?;
    info!(user_id = %user.id, "Created user");

    let location = format!("/users/{}", user.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(user)))
}

#[cfg(test)]
mod tests {
    use crate::server::{self, ServerState};
    use appointy_common::{
        model::password::PasswordPolicy,
        snowflake::{ProcessId, WorkerId},
    };
    use appointy_db::{
        client::DbClient,
        store::{Bson, Document, DocumentStore, MemoryStore, Result as StoreResult, StoreError},
    };
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{
            HeaderMap, Request, StatusCode,
            header::{CONTENT_TYPE, LOCATION},
        },
    };
    use serde_json::{Value, json};
    use std::{
        collections::HashSet,
        sync::{Arc, Mutex},
        time::Duration,
    };
    use tower::ServiceExt;

    const USERS: &str = "users";

    fn app(store: Arc<dyn DocumentStore>, password_policy: PasswordPolicy) -> Router {
        let db_client = DbClient::new(
            store,
            USERS,
            WorkerId::default(),
            ProcessId::default(),
            Duration::from_millis(200),
        );

        server::routes().with_state(ServerState {
            db_client: Arc::new(db_client),
            password_policy,
        })
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };

        (status, headers, json)
    }

    fn post_user(body: impl Into<String>) -> Request<Body> {
        Request::post("/users")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.into()))
            .unwrap()
    }

    fn get_user(id: impl std::fmt::Display) -> Request<Body> {
        Request::get(format!("/users/{id}"))
            .body(Body::empty())
            .unwrap()
    }

    /// Accepts reads but has lost its connection for writes.
    #[derive(Debug, Default)]
    struct ReadOnlyStore {
        inner: MemoryStore,
        attempted_ids: Mutex<Vec<Bson>>,
    }

    #[async_trait]
    impl DocumentStore for ReadOnlyStore {
        async fn insert_one(&self, _: &str, document: Document) -> StoreResult<Bson> {
            if let Some(id) = document.get("_id") {
                self.attempted_ids.lock().unwrap().push(id.clone());
            }
            Err(StoreError::Connection("connection reset by peer".to_owned()))
        }

        async fn find_by_id(&self, collection: &str, id: &Bson) -> StoreResult<Option<Document>> {
            self.inner.find_by_id(collection, id).await
        }
    }

    #[derive(Debug)]
    struct StalledStore;

    #[async_trait]
    impl DocumentStore for StalledStore {
        async fn insert_one(&self, _: &str, _: Document) -> StoreResult<Bson> {
            std::future::pending().await
        }

        async fn find_by_id(&self, _: &str, _: &Bson) -> StoreResult<Option<Document>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn create_then_read() {
        let app = app(Arc::new(MemoryStore::new()), PasswordPolicy::default());

        let (status, headers, created) = send(
            &app,
            post_user(r#"{"name":"Camboda Sun","email":"sun@gmail.com","password":"456"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_u64().expect("id is a number");
        assert_eq!(
            created,
            json!({"id": id, "name": "Camboda Sun", "email": "sun@gmail.com"})
        );
        assert_eq!(headers[LOCATION], format!("/users/{id}"));

        let (status, _, fetched) = send(&app, get_user(id)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn client_supplied_id_is_ignored() {
        let app = app(Arc::new(MemoryStore::new()), PasswordPolicy::default());

        let (status, _, created) = send(
            &app,
            post_user(r#"{"id":2,"name":"Camboda Sun","email":"sun@gmail.com","password":"456"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_ne!(created["id"], json!(2));

        let (status, _, _) = send(&app, get_user(2)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_payloads_write_nothing() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone(), PasswordPolicy { min_len: 3 });

        for body in [
            r#"{"name":"","email":"sun@gmail.com","password":"456"}"#,
            r#"{"name":"   ","email":"sun@gmail.com","password":"456"}"#,
            r#"{"name":"Camboda Sun","email":"sun.gmail.com","password":"456"}"#,
            r#"{"name":"Camboda Sun","email":"sun@","password":"456"}"#,
            r#"{"name":"Camboda Sun","email":"sun@gmail.com"}"#,
            r#"{"name":"Camboda Sun","email":"sun@gmail.com","password":"45"}"#,
            r#"{"name":"Camboda Sun","#,
            "[]",
        ] {
            let (status, _, error) = send(&app, post_user(body)).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(error["status"], json!(400));
            assert!(!error.to_string().contains("456"), "{body}");
        }

        assert_eq!(store.count(USERS), 0);
    }

    #[tokio::test]
    async fn mistyped_password_is_not_echoed() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone(), PasswordPolicy::default());

        let (status, _, error) = send(
            &app,
            post_user(r#"{"name":"Camboda Sun","email":"sun@gmail.com","password":98765432}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = error["message"].as_str().expect("client errors carry a message");
        assert!(message.contains("password must be a string"), "{message}");
        assert!(!error.to_string().contains("98765432"), "{error}");
        assert_eq!(store.count(USERS), 0);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let app = app(Arc::new(MemoryStore::new()), PasswordPolicy::default());

        for id in ["1", "18446744073709551615", "not-a-number", "-1"] {
            let (status, _, error) = send(&app, get_user(id)).await;

            assert_eq!(status, StatusCode::NOT_FOUND, "{id}");
            assert_eq!(error["status"], json!(404));
        }
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = app(Arc::new(MemoryStore::new()), PasswordPolicy::default());

        let (status, _, error) = send(
            &app,
            Request::get("/posts/1").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error["status"], json!(404));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_get_distinct_ids() {
        let app = app(Arc::new(MemoryStore::new()), PasswordPolicy::default());

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let app = app.clone();
                tokio::spawn(async move {
                    let body = json!({
                        "name": format!("User {i}"),
                        "email": format!("user{i}@example.com"),
                        "password": "456",
                    });
                    send(&app, post_user(body.to_string())).await
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for task in tasks {
            let (status, _, created) = task.await.unwrap();
            assert_eq!(status, StatusCode::CREATED);
            ids.insert(created["id"].as_u64().unwrap());
        }
        assert_eq!(ids.len(), 16);

        for id in ids {
            let (status, _, fetched) = send(&app, get_user(id)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(fetched["id"], json!(id));
        }
    }

    #[tokio::test]
    async fn lost_connection_on_create_is_unavailable() {
        let store = Arc::new(ReadOnlyStore::default());
        let app = app(store.clone(), PasswordPolicy::default());

        let (status, _, error) = send(
            &app,
            post_user(r#"{"name":"Camboda Sun","email":"sun@gmail.com","password":"456"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error, json!({"status": 503}));

        let attempted_ids = store.attempted_ids.lock().unwrap().clone();
        assert_eq!(attempted_ids.len(), 1);
        let Bson::Int64(stored_id) = attempted_ids[0] else {
            panic!("Snowflake ids are stored as Int64");
        };

        let (status, _, _) = send(&app, get_user(stored_id.cast_unsigned())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stalled_datastore_times_out() {
        let app = app(Arc::new(StalledStore), PasswordPolicy::default());

        let (status, _, error) = send(&app, get_user(1)).await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(error, json!({"status": 504}));
    }
}
