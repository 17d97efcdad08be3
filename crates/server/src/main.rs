//! BidPilot Server
//!
//! Axum server exposing the bid pipeline over a small JSON API plus an SSE
//! event stream. Also doubles as a CLI: `bidpilot run` executes one pipeline
//! pass in the terminal without the server.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
    routing::{get, post},
    Router,
};
use bidpilot_core::genai::GeminiClient;
use bidpilot_core::project::{LogEntry, Project, ProjectPatch};
use bidpilot_core::store::{DocumentStore, FirestoreStore};
use bidpilot_core::swarm::{
    Orchestrator, Pacing, RunChannels, RunMode, RunOutcome, RunRequest, Stage, SwarmConfig,
};
use clap::{Parser, Subcommand};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::{collections::HashMap, convert::Infallible, net::SocketAddr, sync::Arc};
use tokio::{
    net::TcpListener,
    sync::{broadcast, RwLock},
};
use utoipa::{OpenApi, ToSchema};

/// Demo RFP used when a run request carries no text.
const SAMPLE_RFP: &str = "RFP for Enterprise Logistics System. \
Client: Global Freight Corp. Budget: $150,000. Timeline: 6 months. \
Requirements: Must use Python, Cloud-Native architecture. \
No on-premise solutions. Security: ISO 27001 required.";

const DEFAULT_OWNER: &str = "local-user";

/// Application state
struct AppState {
    /// Local authoritative copy of every project this process has run
    registry: RwLock<HashMap<String, Project>>,
    swarm_status: RwLock<SwarmStatus>,
    event_tx: broadcast::Sender<RunEvent>,
    orchestrator: Arc<Orchestrator>,
    /// Remote mirror, when credentials were present at startup
    store: Option<Arc<dyn DocumentStore>>,
    next_local_id: AtomicU64,
}

type SharedState = Arc<AppState>;

#[derive(Default, Clone, Serialize, ToSchema)]
struct SwarmStatus {
    status: String,
    active_agent: Option<String>,
    pipeline_stage: u8,
}

/// Event fanned out to every SSE subscriber.
#[derive(Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RunEvent {
    Log {
        project_id: String,
        entry: LogEntry,
    },
    Update {
        project_id: String,
        patch: ProjectPatch,
    },
    Stage {
        project_id: String,
        stage: Stage,
    },
    Finished {
        project_id: String,
        outcome: String,
    },
}

// === API Types ===

#[derive(Deserialize, ToSchema)]
struct StartRunRequest {
    /// RFP text to analyze; the demo RFP is used when absent or blank
    rfp_text: Option<String>,
    /// Strategy / win themes to weave into the draft
    strategy: Option<String>,
    owner_id: Option<String>,
    /// Reach the generation service and the remote store
    #[serde(default)]
    connected: bool,
}

#[derive(Serialize, ToSchema)]
struct StartRunResponse {
    success: bool,
    project_id: String,
    message: String,
}

#[derive(Serialize, ToSchema)]
struct ApiResponse {
    success: bool,
    message: String,
}

#[derive(Deserialize)]
struct ListParams {
    owner_id: Option<String>,
}

#[derive(Parser, Clone)]
#[command(author, version, about = "BidPilot - Autonomous Proposal Drafting Swarm")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the BidPilot server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
    /// Run the pipeline once in the terminal, no server
    Run {
        /// RFP text to analyze; the demo RFP is used when omitted
        rfp: Option<String>,
        /// Strategy / win themes
        #[arg(short, long)]
        strategy: Option<String>,
        /// Use the real generation service and store
        #[arg(long)]
        connected: bool,
    },
}

fn outcome_label(outcome: RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Completed => "completed",
        RunOutcome::Rejected => "rejected",
        RunOutcome::Faulted => "faulted",
    }
}

/// Caller text when present and non-blank, else the demo RFP.
fn resolve_rfp(input: Option<String>) -> String {
    match input.filter(|t| !t.trim().is_empty()) {
        Some(text) => text,
        None => SAMPLE_RFP.to_string(),
    }
}

/// Wire the providers that have credentials in the environment.
fn build_orchestrator(config: SwarmConfig, store: Option<Arc<dyn DocumentStore>>) -> Orchestrator {
    let mut orchestrator = Orchestrator::new(config);
    match GeminiClient::from_env() {
        Some(client) => {
            orchestrator = orchestrator.with_generator(Arc::new(client));
        }
        None => tracing::info!("GEMINI_API_KEY not set, connected runs will use fallbacks"),
    }
    if let Some(store) = store {
        orchestrator = orchestrator.with_store(store);
    }
    orchestrator
}

// === Handlers ===

/// Start a pipeline run
#[utoipa::path(
    post,
    path = "/api/v1/bids/run",
    tag = "bids",
    request_body = StartRunRequest,
    responses(
        (status = 200, description = "Run started", body = StartRunResponse)
    )
)]
async fn start_run(
    State(state): State<SharedState>,
    Json(req): Json<StartRunRequest>,
) -> Json<StartRunResponse> {
    let rfp_text = resolve_rfp(req.rfp_text);
    let owner_id = req.owner_id.unwrap_or_else(|| DEFAULT_OWNER.to_string());
    let mode = if req.connected {
        RunMode::Connected
    } else {
        RunMode::Disconnected
    };

    let local_id = format!(
        "local-{}",
        state.next_local_id.fetch_add(1, Ordering::SeqCst)
    );
    let title = format!("Bid Analysis {}", chrono::Utc::now().format("%Y-%m-%d %H:%M"));
    let mut project = Project::new(
        local_id,
        owner_id,
        title,
        rfp_text.clone(),
        req.strategy.clone(),
    );

    // Optimistic create: the run starts on the local record either way, and
    // adopts the remote id only when the remote create succeeds.
    if req.connected {
        if let Some(store) = &state.store {
            match store.create(&project).await {
                Ok(remote_id) => project.id = remote_id,
                Err(e) => {
                    tracing::warn!(error = %e, "remote create failed, running local-only");
                }
            }
        }
    }

    let project_id = project.id.clone();
    state
        .registry
        .write()
        .await
        .insert(project_id.clone(), project);
    {
        let mut status = state.swarm_status.write().await;
        status.status = "running".to_string();
        status.active_agent = None;
        status.pipeline_stage = 0;
    }

    let (channels, receivers) = RunChannels::new();
    let mut log_rx = receivers.log_rx;
    let mut patch_rx = receivers.patch_rx;
    let mut stage_rx = receivers.stage_rx;

    // Bridge log entries into the registry and out to SSE subscribers
    let log_state = state.clone();
    let log_pid = project_id.clone();
    tokio::spawn(async move {
        while let Some(entry) = log_rx.recv().await {
            if let Some(project) = log_state.registry.write().await.get_mut(&log_pid) {
                project.push_log(entry.clone());
            }
            let _ = log_state.event_tx.send(RunEvent::Log {
                project_id: log_pid.clone(),
                entry,
            });
        }
    });

    // The pipeline's own stage machine drives the status view
    let stage_state = state.clone();
    let stage_pid = project_id.clone();
    tokio::spawn(async move {
        while let Some(stage) = stage_rx.recv().await {
            {
                let mut status = stage_state.swarm_status.write().await;
                status.active_agent = stage.agent().map(|a| a.label().to_string());
                status.pipeline_stage = stage.number();
            }
            let _ = stage_state.event_tx.send(RunEvent::Stage {
                project_id: stage_pid.clone(),
                stage,
            });
        }
    });

    // Bridge patches the same way
    let patch_state = state.clone();
    let patch_pid = project_id.clone();
    tokio::spawn(async move {
        while let Some(patch) = patch_rx.recv().await {
            if let Some(project) = patch_state.registry.write().await.get_mut(&patch_pid) {
                project.apply(&patch);
            }
            let _ = patch_state.event_tx.send(RunEvent::Update {
                project_id: patch_pid.clone(),
                patch,
            });
        }
    });

    // Run the pipeline
    let run_state = state.clone();
    let run_pid = project_id.clone();
    let request = RunRequest {
        project_id: project_id.clone(),
        rfp_text,
        strategy: req.strategy,
        mode,
    };
    tokio::spawn(async move {
        let outcome = run_state.orchestrator.run(request, channels).await;
        {
            let mut status = run_state.swarm_status.write().await;
            status.status = match outcome {
                RunOutcome::Completed => "complete",
                RunOutcome::Rejected => "rejected",
                RunOutcome::Faulted => "failed",
            }
            .to_string();
            status.active_agent = None;
        }
        let _ = run_state.event_tx.send(RunEvent::Finished {
            project_id: run_pid,
            outcome: outcome_label(outcome).to_string(),
        });
    });

    Json(StartRunResponse {
        success: true,
        project_id: project_id.clone(),
        message: format!("Pipeline started for project {project_id}"),
    })
}

/// Fetch one project with its full log stream
#[utoipa::path(
    get,
    path = "/api/v1/bids/{id}",
    tag = "bids",
    params(
        ("id" = String, Path, description = "Project id")
    ),
    responses(
        (status = 200, description = "Project record"),
        (status = 404, description = "Unknown project id", body = ApiResponse)
    )
)]
async fn get_bid(State(state): State<SharedState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.registry.read().await.get(&id) {
        Some(project) => Json(project.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse {
                success: false,
                message: format!("No project with id {id}"),
            }),
        )
            .into_response(),
    }
}

/// List projects, newest first
#[utoipa::path(
    get,
    path = "/api/v1/bids",
    tag = "bids",
    responses(
        (status = 200, description = "Project records, newest first")
    )
)]
async fn list_bids(
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Json<Vec<Project>> {
    let registry = state.registry.read().await;
    let mut projects: Vec<Project> = registry
        .values()
        .filter(|p| match &params.owner_id {
            Some(owner) => &p.owner_id == owner,
            None => true,
        })
        .cloned()
        .collect();
    projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(projects)
}

/// Current swarm status
#[utoipa::path(
    get,
    path = "/api/v1/swarm/status",
    tag = "swarm",
    responses(
        (status = 200, description = "Swarm status", body = SwarmStatus)
    )
)]
async fn swarm_status(State(state): State<SharedState>) -> Json<SwarmStatus> {
    Json(state.swarm_status.read().await.clone())
}

/// SSE endpoint for real-time run events with heartbeat
async fn events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.event_tx.subscribe();

    // Timeout-based stream with a heartbeat comment every 15 seconds
    let stream = stream::unfold(rx, |mut rx| async move {
        let timeout = tokio::time::timeout(std::time::Duration::from_secs(15), rx.recv()).await;

        match timeout {
            Ok(Ok(event)) => {
                let json = serde_json::to_string(&event).unwrap_or_default();
                Some((Ok(Event::default().data(json)), rx))
            }
            Ok(Err(_)) => None, // Channel closed
            Err(_) => Some((Ok(Event::default().comment("heartbeat")), rx)),
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(OpenApi)]
#[openapi(
    paths(start_run, get_bid, list_bids, swarm_status),
    components(schemas(StartRunRequest, StartRunResponse, ApiResponse, SwarmStatus)),
    tags(
        (name = "bids", description = "Bid pipeline runs and project records"),
        (name = "swarm", description = "Swarm status")
    )
)]
struct ApiDoc;

async fn serve_openapi() -> impl IntoResponse {
    let spec = ApiDoc::openapi().to_json().unwrap_or_default();
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        spec,
    )
}

async fn run_server(port: u16) -> anyhow::Result<()> {
    let store: Option<Arc<dyn DocumentStore>> =
        FirestoreStore::from_env().map(|s| Arc::new(s) as Arc<dyn DocumentStore>);
    if store.is_none() {
        tracing::info!("Firestore credentials not set, store mirroring disabled");
    }

    let (event_tx, _) = broadcast::channel::<RunEvent>(100);
    let state = Arc::new(AppState {
        registry: RwLock::new(HashMap::new()),
        swarm_status: RwLock::new(SwarmStatus {
            status: "idle".to_string(),
            ..SwarmStatus::default()
        }),
        event_tx,
        orchestrator: Arc::new(build_orchestrator(SwarmConfig::default(), store.clone())),
        store,
        next_local_id: AtomicU64::new(1),
    });

    let app = Router::new()
        .route("/api/v1/bids/run", post(start_run))
        .route("/api/v1/bids", get(list_bids))
        .route("/api/v1/bids/:id", get(get_bid))
        .route("/api/v1/swarm/status", get(swarm_status))
        .route("/api/v1/events", get(events))
        .route("/api/v1/openapi.json", get(serve_openapi))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("🚀 BidPilot Server running at http://{}", addr);
    println!("   API v1 Routes:");
    println!("   Bids:   /api/v1/bids, /api/v1/bids/run, /api/v1/bids/:id");
    println!("   Swarm:  /api/v1/swarm/status");
    println!("   Events: /api/v1/events (SSE)");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_cli(rfp: Option<String>, strategy: Option<String>, connected: bool) -> anyhow::Result<()> {
    let store: Option<Arc<dyn DocumentStore>> =
        FirestoreStore::from_env().map(|s| Arc::new(s) as Arc<dyn DocumentStore>);
    // No theatrical delays in the terminal
    let config = SwarmConfig {
        pacing: Pacing::instant(),
        ..SwarmConfig::default()
    };
    let orchestrator = build_orchestrator(config, store);

    if rfp.as_deref().map_or(true, |t| t.trim().is_empty()) {
        println!("No RFP supplied, using the demo logistics RFP");
    }
    let rfp_text = resolve_rfp(rfp);

    let (channels, receivers) = RunChannels::new();
    let mut log_rx = receivers.log_rx;
    let mut patch_rx = receivers.patch_rx;
    let printer = tokio::spawn(async move {
        while let Some(entry) = log_rx.recv().await {
            println!("[{:>14}] {}", entry.agent.label(), entry.message);
        }
    });
    let collector = tokio::spawn(async move {
        let mut draft = None;
        while let Some(patch) = patch_rx.recv().await {
            if let Some(text) = patch.draft {
                draft = Some(text);
            }
        }
        draft
    });

    let outcome = orchestrator
        .run(
            RunRequest {
                project_id: "cli-run".to_string(),
                rfp_text,
                strategy,
                mode: if connected {
                    RunMode::Connected
                } else {
                    RunMode::Disconnected
                },
            },
            channels,
        )
        .await;

    printer.await?;
    let draft = collector.await?;

    println!("\nOutcome: {}", outcome_label(outcome));
    if let Some(draft) = draft {
        println!("\n{draft}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Some(CliCommand::Run {
            rfp,
            strategy,
            connected,
        }) => run_cli(rfp, strategy, connected).await,
        Some(CliCommand::Serve { port }) => run_server(port).await,
        None => run_server(8080).await,
    }
}
