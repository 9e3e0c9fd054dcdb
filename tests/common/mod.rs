#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use codebox::config::Config;
use codebox::error::RuntimeError;
use codebox::runtime::{ContainerRuntime, CreatedContainer, ExecOutput, TerminalIo};
use codebox::server::{CodeboxState, codebox_router};
use futures::StreamExt;
use serde_json::{Value, json};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const MISSING_IMAGE: &str = "codebox/missing";
pub const TERMINAL_BANNER: &str = "$ ";

pub fn unique_sqlite_path(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "codebox-{prefix}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    temp_path
}

/// One container as the fake engine sees it.
#[derive(Debug, Clone)]
struct FakeContainer {
    status: String,
    dirs: BTreeSet<String>,
    files: BTreeMap<String, String>,
}

impl FakeContainer {
    fn new() -> Self {
        let dirs = ["/app", "/app/src"].into_iter().map(String::from).collect();
        let files = [
            ("/app/README.md", "# demo\n"),
            ("/app/src/main.py", "print('hi')\n"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            status: "created".to_string(),
            dirs,
            files,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub container_id: String,
    pub dest_dir: String,
    pub archive: Vec<u8>,
}

/// In-memory engine with a tiny scripted filesystem and an echoing shell.
#[derive(Default)]
pub struct FakeRuntime {
    containers: Mutex<HashMap<String, FakeContainer>>,
    next_id: Mutex<u64>,
    pub execs: Mutex<Vec<Vec<String>>>,
    pub uploads: Mutex<Vec<Upload>>,
}

impl FakeRuntime {
    pub fn status_of(&self, id: &str) -> Option<String> {
        self.containers
            .lock()
            .unwrap()
            .get(id)
            .map(|c| c.status.clone())
    }

    pub fn has_dir(&self, id: &str, path: &str) -> bool {
        self.containers
            .lock()
            .unwrap()
            .get(id)
            .is_some_and(|c| c.dirs.contains(path))
    }

    pub fn has_file(&self, id: &str, path: &str) -> bool {
        self.containers
            .lock()
            .unwrap()
            .get(id)
            .is_some_and(|c| c.files.contains_key(path))
    }

    /// Drop a container behind the API's back.
    pub fn forget(&self, id: &str) {
        self.containers.lock().unwrap().remove(id);
    }

    fn run(container: &mut FakeContainer, argv: &[String]) -> ExecOutput {
        let args: Vec<&str> = argv.iter().map(String::as_str).collect();
        let ok = |output: String| ExecOutput {
            exit_code: 0,
            output: output.into_bytes(),
        };
        let fail = || ExecOutput {
            exit_code: 1,
            output: Vec::new(),
        };

        match args.as_slice() {
            ["find", _, "-type", "d"] => ok(container
                .dirs
                .iter()
                .map(|d| format!("{d}\n"))
                .collect()),
            ["find", _, "-type", "f"] => ok(container
                .files
                .keys()
                .map(|f| format!("{f}\n"))
                .collect()),
            ["cat", "--", path] => match container.files.get(*path) {
                Some(content) => ok(content.clone()),
                None => fail(),
            },
            ["mv", "--", src, dst] => {
                if let Some(content) = container.files.remove(*src) {
                    container.files.insert(dst.to_string(), content);
                    ok(String::new())
                } else if container.dirs.remove(*src) {
                    container.dirs.insert(dst.to_string());
                    ok(String::new())
                } else {
                    fail()
                }
            }
            ["mkdir", "-p", "--", path] => {
                container.dirs.insert(path.to_string());
                ok(String::new())
            }
            ["touch", "--", path] => {
                container.files.entry(path.to_string()).or_default();
                ok(String::new())
            }
            ["rm", "-rf", "--", path] => {
                let prefix = format!("{path}/");
                container.files.retain(|f, _| f != path && !f.starts_with(&prefix));
                container.dirs.retain(|d| d != path && !d.starts_with(&prefix));
                ok(String::new())
            }
            _ => fail(),
        }
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        if image == MISSING_IMAGE {
            return Err(RuntimeError::ImageNotFound(image.to_string()));
        }
        Ok(())
    }

    async fn create_container(&self, _image: &str) -> Result<CreatedContainer, RuntimeError> {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        let id = format!("fake{:060}", *next);
        self.containers
            .lock()
            .unwrap()
            .insert(id.clone(), FakeContainer::new());
        Ok(CreatedContainer {
            id,
            status: "created".to_string(),
        })
    }

    async fn container_status(&self, id: &str) -> Result<String, RuntimeError> {
        self.status_of(id).ok_or(RuntimeError::ContainerNotFound)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        let mut containers = self.containers.lock().unwrap();
        let c = containers.get_mut(id).ok_or(RuntimeError::ContainerNotFound)?;
        c.status = "running".to_string();
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError> {
        let mut containers = self.containers.lock().unwrap();
        let c = containers.get_mut(id).ok_or(RuntimeError::ContainerNotFound)?;
        c.status = "exited".to_string();
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.containers
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or(RuntimeError::ContainerNotFound)
    }

    async fn exec(&self, id: &str, argv: Vec<String>) -> Result<ExecOutput, RuntimeError> {
        self.execs.lock().unwrap().push(argv.clone());
        let mut containers = self.containers.lock().unwrap();
        let c = containers.get_mut(id).ok_or(RuntimeError::ContainerNotFound)?;
        Ok(Self::run(c, &argv))
    }

    async fn upload_archive(
        &self,
        id: &str,
        dest_dir: &str,
        archive: Vec<u8>,
    ) -> Result<(), RuntimeError> {
        if self.status_of(id).is_none() {
            return Err(RuntimeError::ContainerNotFound);
        }
        self.uploads.lock().unwrap().push(Upload {
            container_id: id.to_string(),
            dest_dir: dest_dir.to_string(),
            archive,
        });
        Ok(())
    }

    /// Prints a prompt, then for every stdin chunk echoes it back followed by `you said: ..`.
    async fn open_terminal(&self, id: &str, _shell: &str) -> Result<TerminalIo, RuntimeError> {
        if self.status_of(id).is_none() {
            return Err(RuntimeError::ContainerNotFound);
        }

        let (stdin_tx, mut stdin_rx) = tokio::io::duplex(4096);
        let (out_tx, out_rx) = mpsc::channel::<Vec<u8>>(16);

        tokio::spawn(async move {
            if out_tx.send(TERMINAL_BANNER.as_bytes().to_vec()).await.is_err() {
                return;
            }
            let mut buf = vec![0u8; 1024];
            loop {
                let n = match stdin_rx.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                if out_tx.send(chunk.clone().into_bytes()).await.is_err() {
                    break;
                }
                let reply = format!("you said: {}", chunk.trim());
                if out_tx.send(reply.into_bytes()).await.is_err() {
                    break;
                }
            }
        });

        let output = futures::stream::unfold(out_rx, |mut rx| async move {
            rx.recv().await.map(|bytes| (Ok::<_, RuntimeError>(bytes), rx))
        })
        .boxed();

        Ok(TerminalIo {
            output,
            input: Box::pin(stdin_tx),
        })
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: CodeboxState,
    pub runtime: Arc<FakeRuntime>,
    pub db_path: PathBuf,
}

impl TestApp {
    pub async fn new(prefix: &str) -> Self {
        Self::with_image(prefix, None).await
    }

    pub async fn with_image(prefix: &str, image: Option<&str>) -> Self {
        Self::with_config(prefix, |cfg| {
            if let Some(image) = image {
                cfg.workspace.image = image.to_string();
            }
        })
        .await
    }

    pub async fn with_config(prefix: &str, tweak: impl FnOnce(&mut Config)) -> Self {
        let db_path = unique_sqlite_path(prefix);
        let database_url = format!("sqlite:{}", db_path.display());

        let mut cfg = Config::default();
        cfg.auth.jwt_secret = "test-secret".to_string();
        tweak(&mut cfg);

        let db = codebox::db::spawn(&database_url).await.expect("spawn db");
        let sessions = codebox::terminal::spawn_registry()
            .await
            .expect("spawn registry");
        let runtime = Arc::new(FakeRuntime::default());

        let state = CodeboxState::new(&cfg, db, runtime.clone(), sessions);
        let app = codebox_router(state.clone());
        Self {
            app,
            state,
            runtime,
            db_path,
        }
    }

    /// A second pool on the same file, for poking rows the API never exposes.
    pub async fn raw_pool(&self) -> sqlx::SqlitePool {
        sqlx::SqlitePool::connect(&format!("sqlite:{}", self.db_path.display()))
            .await
            .expect("open raw pool")
    }

    pub async fn cleanup(self) {
        let _ = tokio::fs::remove_file(&self.db_path).await;
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(req).await.expect("router response")
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };
        let resp = self.send(req).await;
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    pub async fn register(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.json(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "email": email, "password": password, "full_name": "Test User" })),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", email)
            .append_pair("password", password)
            .finish();
        let req = Request::builder()
            .method("POST")
            .uri("/auth/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .expect("request");
        let resp = self.send(req).await;
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    /// Register `email` and return a bearer token for it.
    pub async fn token_for(&self, email: &str) -> String {
        let (status, _) = self.register(email, "correct horse").await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = self.login(email, "correct horse").await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"]
            .as_str()
            .expect("access_token")
            .to_string()
    }

    /// Create a container for `token` and return its engine id.
    pub async fn create_container(&self, token: &str) -> String {
        let (status, body) = self
            .json("POST", "/docker/create-container", Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK, "create failed: {body}");
        body["container_id"]
            .as_str()
            .expect("container_id")
            .to_string()
    }

    pub async fn running_container(&self, token: &str) -> String {
        let id = self.create_container(token).await;
        let (status, _) = self
            .json(
                "PUT",
                &format!("/docker/start-container/{id}"),
                Some(token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        id
    }
}

pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or("<missing>")
}
