#![allow(dead_code)]

use scoreboard::{
    authority::{self, spawn_authority},
    frontend::{self, RemoteAuthority},
};
use std::time::Duration;
use tokio::{net::TcpListener, sync::watch};

/// An authority and one front-end talking to it over HTTP, both on loopback.
pub struct ScoreboardInstance {
    pub authority_port: u16,
    pub frontend_port: u16,
    pub http: reqwest::Client,
    stop_tx: watch::Sender<bool>,
}

impl ScoreboardInstance {
    pub async fn start() -> Self {
        Self::start_with(true).await
    }

    pub async fn start_with(allow_reset: bool) -> Self {
        let authority_port = portpicker::pick_unused_port().expect("no free ports");
        let frontend_port = portpicker::pick_unused_port().expect("no free ports");
        let (stop_tx, stop_rx) = watch::channel(false);

        let (handle, _task) = spawn_authority(64, allow_reset);
        let listener = TcpListener::bind(("127.0.0.1", authority_port))
            .await
            .expect("bind authority");
        tokio::spawn(authority::server::serve(listener, handle, stopped(stop_rx.clone())));

        let remote = RemoteAuthority::new(
            format!("http://127.0.0.1:{authority_port}"),
            Duration::from_secs(5),
        )
        .expect("authority client");
        let listener = TcpListener::bind(("127.0.0.1", frontend_port))
            .await
            .expect("bind front-end");
        tokio::spawn(frontend::serve(
            listener,
            remote.into(),
            allow_reset,
            stopped(stop_rx),
        ));

        Self {
            authority_port,
            frontend_port,
            http: reqwest::Client::new(),
            stop_tx,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.frontend_port)
    }

    pub fn authority_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.authority_port)
    }

    pub async fn put_score(&self, body: serde_json::Value) -> reqwest::Response {
        self.http
            .put(self.url("/score"))
            .json(&body)
            .send()
            .await
            .expect("PUT /score")
    }

    pub async fn get_json(&self, path: &str) -> serde_json::Value {
        let response = self.http.get(self.url(path)).send().await.expect("GET");
        assert!(response.status().is_success(), "{path}: {}", response.status());
        response.json().await.expect("json body")
    }

    /// User ids of a `GET /top/...` answer, in order.
    pub async fn top_users(&self, path: &str) -> Vec<i64> {
        self.get_json(path)
            .await
            .as_array()
            .expect("list body")
            .iter()
            .map(|entry| entry["user"].as_i64().expect("user id"))
            .collect()
    }
}

impl Drop for ScoreboardInstance {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}

async fn stopped(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
