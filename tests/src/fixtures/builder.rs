//! An in-process builder agent that speaks the dispatch protocol but never
//! builds anything. Tests decide when and how a build finishes.

use crate::fixtures::server::wait_for_listener;
use actix_web::dev::ServerHandle;
use actix_web::web::{self, Data, Json, Path};
use actix_web::{get, post, App, HttpResponse, HttpServer, Responder};
use pocketd_common::api::builder::*;
use pocketd_common::api::v1::ApiError;
use pocketd_common::errors::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct AgentState {
    status: BuilderStatus,
    results: HashMap<i32, BuildResult>,
    dispatched: Vec<DispatchRequest>,
    aborted: Vec<i32>,
}

impl Default for AgentState {
    fn default() -> Self {
        AgentState {
            status: BuilderStatus::Idle,
            results: HashMap::new(),
            dispatched: Vec::new(),
            aborted: Vec::new(),
        }
    }
}

type SharedState = Mutex<AgentState>;

#[post("/dispatch")]
async fn dispatch(state: Data<SharedState>, request: Json<DispatchRequest>) -> impl Responder {
    let mut state = state.lock().unwrap();
    let free = matches!(
        state.status,
        BuilderStatus::Idle | BuilderStatus::Aborted { .. }
    );
    let response = if free {
        state.status = BuilderStatus::Building {
            build_id: request.build_id,
            log_tail: String::new(),
        };
        state.dispatched.push(request.into_inner());
        DispatchResponse::Accepted
    } else {
        DispatchResponse::Busy
    };
    HttpResponse::Ok().json(response)
}

#[get("/status")]
async fn status(state: Data<SharedState>) -> impl Responder {
    let state = state.lock().unwrap();
    HttpResponse::Ok().json(&state.status)
}

#[get("/result/{build_id}")]
async fn result(state: Data<SharedState>, build_id: Path<i32>) -> impl Responder {
    let build_id = build_id.into_inner();
    let mut state = state.lock().unwrap();
    if let Some(result) = state.results.remove(&build_id) {
        state.status = BuilderStatus::Idle;
        HttpResponse::Ok().json(result)
    } else {
        HttpResponse::NotFound().json(ApiError {
            kind: "not-found".to_string(),
            message: format!("no result for build {build_id}"),
        })
    }
}

#[post("/abort")]
async fn abort(state: Data<SharedState>, request: Json<AbortRequest>) -> impl Responder {
    let mut state = state.lock().unwrap();
    if state.status.build_id() == Some(request.build_id) {
        state.status = BuilderStatus::Aborted {
            build_id: request.build_id,
        };
    }
    state.aborted.push(request.build_id);
    HttpResponse::NoContent().finish()
}

pub struct FakeBuilder {
    state: Arc<SharedState>,
    handle: ServerHandle,
    pub url: String,
}

impl FakeBuilder {
    pub fn start() -> Result<FakeBuilder> {
        let state = Arc::new(SharedState::default());

        let data = state.clone();
        let server = HttpServer::new(move || {
            App::new().app_data(Data::from(data.clone())).service(
                web::scope("/builder/v1")
                    .service(dispatch)
                    .service(status)
                    .service(result)
                    .service(abort),
            )
        })
        .workers(1)
        .bind("127.0.0.1:0")?;

        let address = server
            .addrs()
            .first()
            .copied()
            .ok_or_else(|| format_err!("Fake builder is not bound to any address"))?;
        let server = server.run();
        let handle = server.handle();
        tokio::spawn(server);
        wait_for_listener(address)?;

        Ok(FakeBuilder {
            state,
            handle,
            url: format!("http://{address}/"),
        })
    }

    /// Every dispatch this builder accepted, oldest first
    pub fn dispatched(&self) -> Vec<DispatchRequest> {
        self.state.lock().unwrap().dispatched.clone()
    }

    pub fn current(&self) -> DispatchRequest {
        self.dispatched()
            .pop()
            .expect("builder was never dispatched to")
    }

    pub fn aborted(&self) -> Vec<i32> {
        self.state.lock().unwrap().aborted.clone()
    }

    pub fn status(&self) -> BuilderStatus {
        self.state.lock().unwrap().status.clone()
    }

    /// Puts the agent to work on a build the daemon never dispatched
    pub fn occupy(&self, build_id: i32) {
        self.state.lock().unwrap().status = BuilderStatus::Building {
            build_id,
            log_tail: String::new(),
        };
    }

    pub fn report_progress(&self, log_tail: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(build_id) = state.status.build_id() {
            state.status = BuilderStatus::Building {
                build_id,
                log_tail: log_tail.to_string(),
            };
        }
    }

    /// Makes `result` available for the daemon to fetch
    pub fn finish(&self, build_result: BuildResult) {
        let mut state = self.state.lock().unwrap();
        state.status = BuilderStatus::Finished {
            build_id: build_result.build_id,
        };
        state.results.insert(build_result.build_id, build_result);
    }

    /// Takes the agent off the network, connections are refused afterwards
    pub async fn stop(&self) {
        self.handle.stop(false).await;
    }

    /// Pretends the agent restarted and forgot its build
    pub fn forget(&self) {
        self.state.lock().unwrap().status = BuilderStatus::Idle;
    }
}

impl Drop for FakeBuilder {
    fn drop(&mut self) {
        #[allow(clippy::let_underscore_future)]
        let _ = self.handle.stop(false);
    }
}
