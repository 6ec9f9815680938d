use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::Router;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::proxy::quota::upstream::{FETCH_AVAILABLE_MODELS_PATH, LOAD_CODE_ASSIST_PATH};

fn global_env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

pub(crate) fn lock_env() -> std::sync::MutexGuard<'static, ()> {
    global_env_lock()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) struct ScopedEnvVar {
    key: &'static str,
    original: Option<String>,
}

impl ScopedEnvVar {
    pub(crate) fn set(key: &'static str, value: &str) -> Self {
        let original = std::env::var(key).ok();
        std::env::set_var(key, value);
        Self { key, original }
    }

    pub(crate) fn unset(key: &'static str) -> Self {
        let original = std::env::var(key).ok();
        std::env::remove_var(key);
        Self { key, original }
    }
}

impl Drop for ScopedEnvVar {
    fn drop(&mut self) {
        if let Some(value) = self.original.as_deref() {
            std::env::set_var(self.key, value);
        } else {
            std::env::remove_var(self.key);
        }
    }
}

/// Serves `app` on an ephemeral localhost port; returns its base URL.
pub(crate) async fn spawn_mock_upstream(app: Router) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener local addr");
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock upstream");
    });
    (format!("http://{}", addr), server)
}

#[derive(Clone, Debug)]
pub(crate) struct MockReply {
    pub status: u16,
    pub body: String,
}

impl MockReply {
    pub(crate) fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub(crate) fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct CapturedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

/// Fake Cloud Code upstream answering loadCodeAssist and fetchAvailableModels
/// with fixed replies and counting every call.
pub(crate) struct MockCloudCode {
    pub base_url: String,
    identity_calls: Arc<AtomicUsize>,
    models_calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    server: JoinHandle<()>,
}

impl MockCloudCode {
    pub(crate) async fn start(identity: MockReply, models: MockReply) -> Self {
        Self::start_with_delay(identity, models, Duration::ZERO).await
    }

    pub(crate) async fn start_with_delay(
        identity: MockReply,
        models: MockReply,
        delay: Duration,
    ) -> Self {
        let identity_calls = Arc::new(AtomicUsize::new(0));
        let models_calls = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let app = {
            let identity_calls = identity_calls.clone();
            let models_calls = models_calls.clone();
            let requests = requests.clone();
            Router::new().fallback(move |uri: Uri, headers: HeaderMap, body: Bytes| {
                let identity = identity.clone();
                let models = models.clone();
                let identity_calls = identity_calls.clone();
                let models_calls = models_calls.clone();
                let requests = requests.clone();
                async move {
                    requests
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .push(CapturedRequest {
                            path: uri.path().to_string(),
                            authorization: headers
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string),
                            body: String::from_utf8_lossy(&body).to_string(),
                        });
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let reply = match uri.path() {
                        LOAD_CODE_ASSIST_PATH => {
                            identity_calls.fetch_add(1, Ordering::SeqCst);
                            identity
                        }
                        FETCH_AVAILABLE_MODELS_PATH => {
                            models_calls.fetch_add(1, Ordering::SeqCst);
                            models
                        }
                        _ => MockReply::text(404, "not found"),
                    };
                    let status = StatusCode::from_u16(reply.status)
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                    (status, reply.body)
                }
            })
        };

        let (base_url, server) = spawn_mock_upstream(app).await;
        Self {
            base_url,
            identity_calls,
            models_calls,
            requests,
            server,
        }
    }

    pub(crate) fn identity_calls(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn models_calls(&self) -> usize {
        self.models_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.identity_calls() + self.models_calls()
    }

    pub(crate) fn requests(&self) -> Vec<CapturedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Drop for MockCloudCode {
    fn drop(&mut self) {
        self.server.abort();
    }
}
