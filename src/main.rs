use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use warp::Filter;
use webnavigator::{BrowserSession, SessionConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 9669)]
    port: u16,

    /// Path to the Chrome executable (auto-detected when omitted)
    #[arg(long)]
    chrome_path: Option<String>,

    /// Pass --no-sandbox to Chrome (Linux AppArmor workaround)
    #[arg(long)]
    no_sandbox: bool,

    /// Run Chrome without a visible window
    #[arg(long)]
    headless: bool,
}

#[derive(Debug, serde::Deserialize)]
struct VisitRequest {
    url: String,
}

#[derive(Debug, serde::Deserialize)]
struct FillTextRequest {
    selector: String,
    text: String,
}

#[derive(Debug, serde::Deserialize)]
struct ClickElementRequest {
    selector: String,
}

#[derive(Debug, serde::Deserialize)]
struct ClickByTextRequest {
    text: String,
    #[serde(default)]
    exact_match: bool,
}

#[derive(Debug, serde::Serialize)]
struct ToolResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ToolResponse {
    fn ok(result: Option<String>) -> Self {
        Self {
            status: "success".to_string(),
            result,
            message: None,
        }
    }

    // Errors come back as the tool's output text so the agent loop can see
    // and react to them.
    fn error(e: impl std::fmt::Display) -> Self {
        Self {
            status: "error".to_string(),
            result: None,
            message: Some(e.to_string()),
        }
    }
}

// One browsing operation in flight at a time: the page is a single shared
// mutable resource, so every tool invocation queues on this mutex.
type SharedSession = Arc<Mutex<BrowserSession>>;

fn with_session(
    session: SharedSession,
) -> impl Filter<Extract = (SharedSession,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || session.clone())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    log::info!("Starting webnavigator tool server on port {}", args.port);

    let config = if args.chrome_path.is_some() || args.no_sandbox || args.headless {
        SessionConfig {
            chrome_path: args.chrome_path.clone(),
            no_sandbox: args.no_sandbox,
            headless: args.headless,
        }
    } else {
        SessionConfig::auto()
    };

    // The session lives for the whole process: initialized here, torn down
    // on every exit path below.
    let mut session = BrowserSession::new();
    if let Err(e) = session.initialize(config).await {
        log::error!("Failed to launch Chrome: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Bind manually to handle "port in use" error gracefully
    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Failed to bind to port {}: {}", args.port, e);
            eprintln!(
                "Error: Port {} is already in use or unavailable.",
                args.port
            );
            session.teardown().await;
            std::process::exit(1);
        }
    };

    let session: SharedSession = Arc::new(Mutex::new(session));

    let health = warp::path("health")
        .and(warp::get())
        .and(with_session(session.clone()))
        .and_then(handle_health);

    let visit = warp::path!("tools" / "visit")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_session(session.clone()))
        .and_then(handle_visit);

    let get_page_content = warp::path!("tools" / "get_page_content")
        .and(warp::post())
        .and(with_session(session.clone()))
        .and_then(handle_get_page_content);

    let fill_text = warp::path!("tools" / "fill_text")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_session(session.clone()))
        .and_then(handle_fill_text);

    let click_element = warp::path!("tools" / "click_element")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_session(session.clone()))
        .and_then(handle_click_element);

    let click_by_text = warp::path!("tools" / "click_by_text")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_session(session.clone()))
        .and_then(handle_click_by_text);

    let get_interactive_elements = warp::path!("tools" / "get_interactive_elements")
        .and(warp::post())
        .and(with_session(session.clone()))
        .and_then(handle_get_interactive_elements);

    let routes = health
        .or(visit)
        .or(get_page_content)
        .or(fill_text)
        .or(click_element)
        .or(click_by_text)
        .or(get_interactive_elements);

    log::info!("Listening on http://{}", addr);

    let server =
        warp::serve(routes).run_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener));

    tokio::select! {
        _ = server => {}
        _ = tokio::signal::ctrl_c() => {
            log::info!("Received shutdown signal");
        }
    }

    session.lock().await.teardown().await;
}

async fn handle_health(session: SharedSession) -> Result<impl warp::Reply, warp::Rejection> {
    let alive = session.lock().await.is_alive().await;
    Ok(warp::reply::json(&serde_json::json!({
        "status": "ok",
        "alive": alive,
    })))
}

async fn handle_visit(
    req: VisitRequest,
    session: SharedSession,
) -> Result<impl warp::Reply, warp::Rejection> {
    let session = session.lock().await;
    let reply = match session.visit(&req.url).await {
        Ok(title) => ToolResponse::ok(Some(title)),
        Err(e) => {
            log::error!("visit failed: {}", e);
            ToolResponse::error(e)
        }
    };
    Ok(warp::reply::json(&reply))
}

async fn handle_get_page_content(
    session: SharedSession,
) -> Result<impl warp::Reply, warp::Rejection> {
    let session = session.lock().await;
    let reply = match session.page_content().await {
        Ok(content) => ToolResponse::ok(Some(content)),
        Err(e) => {
            log::error!("get_page_content failed: {}", e);
            ToolResponse::error(e)
        }
    };
    Ok(warp::reply::json(&reply))
}

async fn handle_fill_text(
    req: FillTextRequest,
    session: SharedSession,
) -> Result<impl warp::Reply, warp::Rejection> {
    let session = session.lock().await;
    let reply = match session.fill_text(&req.selector, &req.text).await {
        Ok(()) => ToolResponse::ok(None),
        Err(e) => {
            log::error!("fill_text failed: {}", e);
            ToolResponse::error(e)
        }
    };
    Ok(warp::reply::json(&reply))
}

async fn handle_click_element(
    req: ClickElementRequest,
    session: SharedSession,
) -> Result<impl warp::Reply, warp::Rejection> {
    let session = session.lock().await;
    let reply = match session.click_element(&req.selector).await {
        Ok(()) => ToolResponse::ok(None),
        Err(e) => {
            log::error!("click_element failed: {}", e);
            ToolResponse::error(e)
        }
    };
    Ok(warp::reply::json(&reply))
}

async fn handle_click_by_text(
    req: ClickByTextRequest,
    session: SharedSession,
) -> Result<impl warp::Reply, warp::Rejection> {
    let session = session.lock().await;
    let reply = match session.click_by_text(&req.text, req.exact_match).await {
        Ok((message, _element)) => ToolResponse::ok(Some(message)),
        Err(e) => {
            log::error!("click_by_text failed: {}", e);
            ToolResponse::error(e)
        }
    };
    Ok(warp::reply::json(&reply))
}

async fn handle_get_interactive_elements(
    session: SharedSession,
) -> Result<impl warp::Reply, warp::Rejection> {
    let session = session.lock().await;
    let reply = match session.scan_interactive_elements().await {
        // Zero qualifying elements is a valid empty JSON array, not an error.
        Ok(elements) => match serde_json::to_string_pretty(&elements) {
            Ok(json) => ToolResponse::ok(Some(json)),
            Err(e) => ToolResponse::error(e),
        },
        Err(e) => {
            log::error!("get_interactive_elements failed: {}", e);
            ToolResponse::error(e)
        }
    };
    Ok(warp::reply::json(&reply))
}
