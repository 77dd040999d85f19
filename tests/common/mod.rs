//! Shared setup for integration tests: an in-memory database and a manual
//! clock behind the full router, with media on disk or in an object store.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use std::sync::Arc;

use lectern::{
    ServerConfig,
    clock::Clock,
    create_app,
    db::{Database, Role, RoleSet},
    jwt::JwtConfig,
    media::MediaStorage,
};
use object_store::{ObjectStore, PutPayload, memory::InMemory, path::Path as ObjectPath};
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

pub const NOW: i64 = 1_700_000_000;
pub const SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";
pub const PUBLIC_URL: &str = "https://courses.example.com";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub clock: Clock,
    pub jwt: JwtConfig,
    pub media_dir: TempDir,
    pub objects: Arc<InMemory>,
}

/// Users and content seeded by `TestApp::seeded`.
pub struct Seed {
    pub admin: i64,
    pub org_owner: i64,
    pub other_org: i64,
    pub buyer: i64,
    pub stranger: i64,
    pub event: i64,
    pub session: i64,
}

impl TestApp {
    /// Media served from a temporary directory.
    pub async fn new() -> Self {
        Self::build(false).await
    }

    /// Media served from an in-memory object store under `media/`.
    pub async fn with_object_store() -> Self {
        Self::build(true).await
    }

    async fn build(object_backed: bool) -> Self {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let clock = Clock::manual(NOW);
        let media_dir = tempfile::tempdir().expect("Failed to create media dir");
        let objects = Arc::new(InMemory::new());
        let media = if object_backed {
            MediaStorage::Object {
                store: objects.clone(),
                prefix: ObjectPath::from("media"),
            }
        } else {
            MediaStorage::Local {
                root: media_dir.path().to_path_buf(),
            }
        };
        let config = ServerConfig {
            db: db.clone(),
            jwt_secret: SECRET.to_vec(),
            public_url: Url::parse(PUBLIC_URL).expect("Invalid URL"),
            media,
            clock: clock.clone(),
        };
        let app = create_app(&config).expect("Failed to create app");
        let jwt = JwtConfig::new(SECRET).expect("Invalid secret");

        Self {
            app,
            db,
            clock,
            jwt,
            media_dir,
            objects,
        }
    }

    /// An app with one organization owning an event with a session that
    /// references `lecture1.mp4` and `notes.pdf`, plus a buyer of that session.
    pub async fn seeded() -> (Self, Seed) {
        Self::seed(Self::new().await).await
    }

    /// Same content as `seeded`, with media in the object store.
    pub async fn seeded_with_object_store() -> (Self, Seed) {
        Self::seed(Self::with_object_store().await).await
    }

    async fn seed(app: Self) -> (Self, Seed) {
        let users = app.db.users();

        let admin = users
            .create("admin@example.com", "Admin", &RoleSet::from([Role::User, Role::Admin]))
            .await
            .unwrap();
        let org_owner = users
            .create("org@example.com", "Org", &RoleSet::from([Role::Organization]))
            .await
            .unwrap();
        let other_org = users
            .create("rival@example.com", "Rival", &RoleSet::from([Role::Organization]))
            .await
            .unwrap();
        let buyer = users
            .create("buyer@example.com", "Buyer", &RoleSet::from([Role::User]))
            .await
            .unwrap();
        let stranger = users
            .create("stranger@example.com", "Stranger", &RoleSet::from([Role::User]))
            .await
            .unwrap();

        let org = app.db.organizations().create(org_owner, "Acme").await.unwrap();
        let event = app.db.content().create_event(org, "Rust Week").await.unwrap();
        let session = app
            .db
            .content()
            .create_session(event, "Ownership", Some("lecture1.mp4"), Some("notes.pdf"))
            .await
            .unwrap();
        app.db.purchases().record(buyer, session).await.unwrap();

        (
            app,
            Seed {
                admin,
                org_owner,
                other_org,
                buyer,
                stranger,
                event,
                session,
            },
        )
    }

    /// Issue a token for a stored user at the app's current time.
    pub async fn token_for(&self, user_id: i64) -> String {
        let user = self.db.users().get_by_id(user_id).await.unwrap().unwrap();
        self.jwt
            .issue_at(user.id, &user.roles, self.clock.now())
            .unwrap()
            .token
    }

    /// Write a media file under the temporary media directory.
    pub fn write_media(&self, dir: &str, filename: &str, contents: &[u8]) {
        let dir = self.media_dir.path().join(dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(filename), contents).unwrap();
    }

    /// Store a media object under `media/{dir}/{filename}`.
    pub async fn put_object(&self, dir: &str, filename: &str, contents: &[u8]) {
        let path = ObjectPath::from("media").child(dir).child(filename);
        self.objects
            .put(&path, PutPayload::from(contents.to_vec()))
            .await
            .unwrap();
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("PUT").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Strip the public origin so a signed URL can be sent through the router.
pub fn local_path(url: &str) -> String {
    url.strip_prefix(PUBLIC_URL)
        .expect("link should point at the public URL")
        .to_string()
}
