// CharlesFlow MCP Server
// Provides MCP (Model Context Protocol) tools for capturing, filtering and
// throttling traffic through a local Charles Proxy
//
// Run with: cargo run --bin charlesflow-mcp
// Or install: cargo install --path crates/charlesflow-mcp
//
// The Charles configuration is snapshotted at startup and restored on exit;
// captured sessions are cached locally and purged on exit.

mod mcp;

use std::sync::Arc;
use std::time::Instant;

use rmcp::{
    ErrorData as McpError,
    RoleServer,
    ServerHandler,
    handler::server::tool::{ToolCallContext, ToolRouter},
    handler::server::wrapper::Parameters,
    model::*,
    service::RequestContext,
    tool, tool_router,
};
use tokio::io::{stdin, stdout};
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

use charlesflow_lib::models::{AppConfig, CapturedSession, SnapshotOutcome};
use charlesflow_lib::services::{
    CaptureError, ControlClient, LifecycleManager, SessionCapture, SessionFilter,
};

use mcp::results::{
    capture_error_result, entries_result, reset_result, throttle_result, validate_filter_params,
    validation_error,
};
use mcp::{
    forward_capture_events, needs_exclusive_session, set_client_log_level, CaptureSessionParams,
    FilterSessionParams, PromptRegistry, SetThrottlingParams, SESSION_BUSY_MESSAGE,
    SESSION_SEMAPHORE,
};

// ============================================================================
// MCP Server Implementation
// ============================================================================

#[derive(Clone)]
pub struct CharlesFlowMcp {
    /// Tool router for handling tool calls
    tool_router: ToolRouter<Self>,
    capture: Arc<SessionCapture>,
    lifecycle: Arc<LifecycleManager>,
    client: Arc<ControlClient>,
}

impl CharlesFlowMcp {
    pub fn new(
        capture: Arc<SessionCapture>,
        lifecycle: Arc<LifecycleManager>,
        client: Arc<ControlClient>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            capture,
            lifecycle,
            client,
        }
    }

    /// Run a capture, relaying its progress to the requesting client.
    /// Cancelling the request cancels the capture window.
    async fn capture_with_progress(
        &self,
        duration_seconds: u64,
        context: &RequestContext<RoleServer>,
    ) -> Result<CapturedSession, CaptureError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let forwarder = tokio::spawn(forward_capture_events(
            rx,
            context.peer.clone(),
            context.meta.get_progress_token(),
        ));

        let result = self.capture.capture(duration_seconds, &tx, &context.ct).await;

        drop(tx);
        if let Err(e) = forwarder.await {
            log::debug!("[MCP Server] Progress forwarder stopped: {}", e);
        }
        result
    }
}

#[tool_router]
impl CharlesFlowMcp {
    #[tool(description = "Record live traffic through Charles for duration_seconds and return the captured session as a JSON array of entries. With duration_seconds = 0, return the most recently cached session without recording. Failures return [{\"error\": \"...\"}].")]
    async fn capture_session(
        &self,
        Parameters(params): Parameters<CaptureSessionParams>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        match self.capture_with_progress(params.duration_seconds, &context).await {
            Ok(session) => entries_result(&session),
            Err(e) => capture_error_result(&e),
        }
    }

    #[tool(description = "Capture (duration_seconds > 0) or load a cached session (duration_seconds = 0, optionally a specific session_file) and filter it by host substring, HTTP method and a case-insensitive keyword_regex. Entries matched by the regex carry matchLocation {lineNumber, lineContent}. keep_request/keep_response control whether those objects are included.")]
    async fn filter_session(
        &self,
        Parameters(params): Parameters<FilterSessionParams>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(message) = validate_filter_params(&params) {
            return Ok(validation_error(message));
        }

        let session = match params.session_file() {
            Some(name) => self.capture.read_named(name),
            None => self.capture_with_progress(params.duration_seconds, &context).await,
        };
        let session = match session {
            Ok(session) => session,
            Err(e) => return capture_error_result(&e),
        };

        let results = SessionFilter::filter(&params.criteria(), &session);
        log::info!(
            "[MCP Server] filter_session kept {} of {} entries",
            results.len(),
            session.len()
        );
        entries_result(&results)
    }

    #[tool(description = "Set Charles network throttling. Presets: 3G, 4G, 100+Mbps+Fibre, 32+Mbps+Fibre, 16+Mbps+ADSL2%2B, 8+Mbps+ADSL2, 2+Mbps+ADSL, 32+Mbps+VDSL, 256+kbps+ISDN%2FDSL, 512+kbps+ISDN%2FDSL, 56+kbps+Modem. Use deactivate to turn throttling off; start/on mean 3G.")]
    async fn set_throttling(
        &self,
        Parameters(params): Parameters<SetThrottlingParams>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self.client.set_throttle_by_name(&params.preset).await;
        if let Err(e) = &outcome {
            log::warn!("[MCP Server] Throttling '{}' failed: {}", params.preset, e);
        }
        Ok(throttle_result(outcome))
    }

    #[tool(description = "Quit Charles, restore the configuration saved when this server started, and clear all cached sessions. Use when the environment needs a clean slate.")]
    async fn reset_environment(&self) -> Result<CallToolResult, McpError> {
        match self.lifecycle.reset().await {
            Some(report) => Ok(reset_result(&report)),
            None => Ok(validation_error(
                "Server is shutting down; the environment has already been restored.",
            )),
        }
    }
}

impl ServerHandler for CharlesFlowMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
                prompts: Some(PromptsCapability::default()),
                logging: Some(JsonObject::new()),
                ..Default::default()
            },
            server_info: Implementation {
                name: "charlesflow-mcp".to_string(),
                title: Some("CharlesFlow MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some("CharlesFlow MCP Server captures and filters HTTP traffic through a local Charles Proxy and controls its network throttling. Charles settings are restored when the server exits.".to_string()),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            Ok(ListToolsResult {
                tools: self.tool_router.list_all(),
                next_cursor: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let start_time = Instant::now();
            let tool_name = request.name.clone();
            let arguments = request.arguments.clone().unwrap_or_default();

            // Capture windows and resets drive the single Charles session
            let _permit = if needs_exclusive_session(&tool_name, &arguments) {
                match SESSION_SEMAPHORE.try_acquire() {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        log::warn!("[MCP Server] {} rejected: session busy", tool_name);
                        return Ok(validation_error(SESSION_BUSY_MESSAGE));
                    }
                }
            } else {
                None
            };

            // Execute the tool
            let tool_context = ToolCallContext::new(self, request, context);
            let result = self.tool_router.call(tool_context).await;
            let duration_ms = start_time.elapsed().as_millis() as u64;

            match &result {
                Ok(call_result) => {
                    let status = if call_result.is_error.unwrap_or(false) {
                        "error"
                    } else {
                        "success"
                    };
                    log::info!(
                        "[MCP Server] tool={} status={} duration_ms={}",
                        tool_name,
                        status,
                        duration_ms
                    );
                }
                Err(e) => {
                    log::error!(
                        "[MCP Server] tool={} status=failed duration_ms={} error={}",
                        tool_name,
                        duration_ms,
                        e
                    );
                }
            }

            result
        }
    }

    fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListPromptsResult, McpError>> + Send + '_ {
        async move {
            Ok(ListPromptsResult {
                prompts: PromptRegistry::list(),
                next_cursor: None,
            })
        }
    }

    fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<GetPromptResult, McpError>> + Send + '_ {
        async move { PromptRegistry::get(&request.name) }
    }

    fn set_level(
        &self,
        request: SetLevelRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<(), McpError>> + Send + '_ {
        async move {
            log::debug!("[MCP Server] Client log level set to {:?}", request.level);
            set_client_log_level(&request.level);
            Ok(())
        }
    }
}

/// Print help information about available MCP tools
fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(r#"CharlesFlow MCP Server v{}

USAGE:
    charlesflow-mcp [OPTIONS]

OPTIONS:
    --help, -h      Print this help information
    --version, -v   Print version information
    --list-tools    List all available MCP tools

DESCRIPTION:
    CharlesFlow MCP Server lets AI assistants record, inspect and throttle
    HTTP traffic through a locally running Charles Proxy. The Charles
    configuration is backed up at startup and restored when the server exits.

MCP TOOLS:
    capture_session     Record traffic for N seconds (0 = latest cached session)
    filter_session      Filter a session by host, method and keyword regex
    set_throttling      Apply a network throttling preset or deactivate it
    reset_environment   Quit Charles, restore its config, clear cached sessions

PROMPTS:
    throttling_helper   Reference of throttling presets

CONFIGURATION:
    Config file: <data dir>/charlesflow/config.toml (override with CHARLESFLOW_CONFIG)
    Environment: CHARLESFLOW_USERNAME, CHARLESFLOW_PASSWORD, CHARLESFLOW_PROXY,
                 CHARLESFLOW_CONTROL_URL (also read from .env)
    Logging:     RUST_LOG (default: info, written to stderr)

EXAMPLES:
    # Start the MCP server (for AI integration)
    charlesflow-mcp

    # Claude Desktop / Cursor configuration
    {{
      "mcpServers": {{
        "charlesflow": {{ "command": "charlesflow-mcp" }}
      }}
    }}
"#, version);
}

fn print_version() {
    println!("charlesflow-mcp {}", env!("CARGO_PKG_VERSION"));
}

/// List all tools in a simple format
fn list_tools_simple() {
    println!("CharlesFlow MCP Tools:\n");
    let tools = [
        ("capture_session", "Record traffic for N seconds (0 = latest cached session)"),
        ("filter_session", "Filter a session by host, method and keyword regex"),
        ("set_throttling", "Apply a network throttling preset or deactivate it"),
        ("reset_environment", "Quit Charles, restore its config, clear cached sessions"),
    ];

    for (name, desc) in tools {
        println!("  {:<25} {}", name, desc);
    }
    println!();
}

fn init_logging() {
    // stdout carries the MCP transport
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    for arg in &args[1..] {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-v" => {
                print_version();
                return Ok(());
            }
            "--list-tools" => {
                list_tools_simple();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown option: {}", arg);
                eprintln!("Use --help for usage information");
                std::process::exit(1);
            }
        }
    }

    init_logging();
    log::info!(
        "[MCP Server] Starting CharlesFlow MCP Server (PID: {})...",
        std::process::id()
    );

    let config = AppConfig::load()?;
    let client = Arc::new(ControlClient::new(config.control.clone())?);
    let lifecycle = Arc::new(LifecycleManager::from_config(&config, client.clone()));

    match lifecycle.start() {
        Ok(SnapshotOutcome::Taken(snapshot)) => log::info!(
            "[MCP Server] Charles configuration backed up to {}",
            snapshot.backup_root.display()
        ),
        Ok(SnapshotOutcome::NothingToProtect) => {
            log::warn!("[MCP Server] No Charles configuration found, nothing backed up")
        }
        Err(e) => log::error!("[MCP Server] Configuration backup failed: {}", e),
    }

    let capture = Arc::new(SessionCapture::new(
        client.clone(),
        lifecycle.cache().clone(),
        config.capture.tick_seconds,
    ));
    let server = CharlesFlowMcp::new(capture, lifecycle.clone(), client);

    // Run with stdio transport
    let service = match rmcp::serve_server(server, (stdin(), stdout())).await {
        Ok(service) => service,
        Err(e) => {
            log::error!("[MCP Server] Failed to start service: {}", e);
            lifecycle.shutdown().await;
            return Err(e.into());
        }
    };

    // Set up signal handlers for graceful shutdown (Unix only)
    #[cfg(unix)]
    {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sighup = signal(SignalKind::hangup())?;

        // Wait for either service completion or signal
        tokio::select! {
            result = service.waiting() => {
                match result {
                    Ok(reason) => log::info!("[MCP Server] Service ended: {:?}", reason),
                    Err(e) => log::error!("[MCP Server] Service ended with error: {:?}", e),
                }
            }
            _ = sigterm.recv() => {
                log::info!("[MCP Server] Received SIGTERM, shutting down gracefully...");
            }
            _ = sigint.recv() => {
                log::info!("[MCP Server] Received SIGINT, shutting down gracefully...");
            }
            _ = sighup.recv() => {
                log::info!("[MCP Server] Received SIGHUP (parent process died), shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            result = service.waiting() => {
                if let Err(e) = result {
                    log::error!("[MCP Server] Service ended with error: {:?}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("[MCP Server] Received Ctrl-C, shutting down gracefully...");
            }
        }
    }

    if let Some(report) = lifecycle.shutdown().await {
        if report.is_success() {
            log::info!("[MCP Server] {}", report.summary());
        } else {
            log::warn!("[MCP Server] {}", report.summary());
        }
    }

    log::info!("[MCP Server] Shutdown complete");
    Ok(())
}
