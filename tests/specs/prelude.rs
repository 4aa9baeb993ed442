//! Shared harness for the behavioral specs.

use engram_adapters::FakeAgentAdapter;
use engram_core::SystemClock;
use engram_daemon::client::Client;
use engram_daemon::config::Config;
use engram_daemon::lifecycle::{startup, LifecycleError, StartupResult};
use std::future::Future;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// A running daemon instance under test.
pub struct SpecDaemon {
    pub client: Client,
    pub adapter: FakeAgentAdapter,
    pub config: Config,
    pub run: JoinHandle<Result<(), LifecycleError>>,
    _dir: TempDir,
}

impl SpecDaemon {
    /// Wait for the supervisor task to finish cleanly.
    pub async fn join(self) {
        tokio::time::timeout(Duration::from_secs(5), self.run)
            .await
            .expect("daemon did not stop within 5s")
            .expect("supervisor panicked")
            .expect("supervisor returned an error");
    }

    /// Ask the daemon to stop and wait for it.
    pub async fn stop(self) {
        self.client.shutdown().await.expect("shutdown request");
        self.join().await;
    }
}

/// Start a daemon with short intervals in a temp state dir.
pub async fn spawn_daemon(
    adapter: FakeAgentAdapter,
    mutate: impl FnOnce(&mut Config),
) -> SpecDaemon {
    let dir = TempDir::new().expect("temp dir");
    let mut config = Config::from_args(["--session-id=spec-session".to_string()])
        .expect("config")
        .with_state_dir(dir.path());
    config.poll_interval = Duration::from_millis(20);
    config.heartbeat_interval = Duration::from_millis(40);
    config.compact_interval = Duration::from_millis(40);
    mutate(&mut config);

    let StartupResult {
        supervisor,
        listener,
        shutdown: _,
        gateway: _,
    } = startup(config.clone(), adapter.clone(), SystemClock)
        .await
        .expect("startup");

    tokio::spawn(listener.run());
    let run = tokio::spawn(supervisor.run());

    let client = Client::new(config.socket_path());
    wait_until(|| {
        let client = client.clone();
        async move { client.ping().await }
    })
    .await;

    SpecDaemon {
        client,
        adapter,
        config,
        run,
        _dir: dir,
    }
}

/// Poll an async condition until true or a 5s deadline.
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if condition().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached within 5s");
}
