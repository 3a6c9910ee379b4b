//! HTTP server for interactive mode
//!
//! `commentlens serve` → starts server, opens browser, drives both flows
//! from the embedded page through JSON endpoints:
//!
//! | Method | Path            | Body / query                 |
//! |--------|-----------------|------------------------------|
//! | GET    | `/`             |                              |
//! | POST   | `/api/predict`  | `{"comment"}`                |
//! | POST   | `/api/analyze`  | `{"url", "api_key"?}`        |
//! | GET    | `/api/key`      |                              |
//! | POST   | `/api/key`      | `{"api_key"}`                |
//! | DELETE | `/api/key`      |                              |
//! | POST   | `/api/panel`    | `{"panel"}`                  |
//! | GET    | `/api/backdrop` | `?width=&height=`            |

use crate::api::{ClassificationService, HttpService};
use crate::backdrop::{Backdrop, BackdropTimer, MAX_SIDE, REPAINT_PERIOD};
use crate::charts::{ChartRegistry, ChartSurface};
use crate::config::Config;
use crate::credential::{CredentialStore, ALERT_API_KEY_REQUIRED, API_KEY_SLOT};
use crate::db::Database;
use crate::flows::{CommentPredictor, Outcome, VideoAnalyzer};
use crate::model::{PredictRequest, Prediction};
use crate::panel::{PanelId, Panels};
use crate::screen::{CapturedScreen, Output};
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::sync::{Arc, Mutex};
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, info, warn};

// Embed the UI directly in the binary
const UI_HTML: &str = include_str!("ui.html");

const INITIAL_BACKDROP: (u32, u32) = (1280, 720);

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
    /// Set when the browser must ask the user for an API key
    needs_key: bool,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None, needs_key: false }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self { ok: false, data: None, error: Some(error.into()), needs_key: false }
    }
}

#[derive(Deserialize, Debug)]
pub struct AnalyzeParams {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Deserialize, Debug)]
struct KeyParams {
    #[serde(default)]
    api_key: String,
}

#[derive(Deserialize, Debug)]
struct PanelParams {
    panel: PanelId,
}

#[derive(Deserialize, Debug, Default)]
struct BackdropQuery {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Serialize, Debug)]
struct KeyStatus {
    cached: bool,
}

#[derive(Serialize, Debug)]
struct PanelState {
    panel: PanelId,
    element_id: &'static str,
    shown: bool,
    aria_expanded: &'static str,
}

#[derive(Serialize, Debug)]
struct BackdropFrame {
    width: u32,
    height: u32,
    hidden: usize,
    layers: Vec<LayerFrame>,
}

#[derive(Serialize, Debug)]
struct LayerFrame {
    opacity: f64,
    fade_ms: u64,
    svg: String,
}

/// A routed response before it is turned into a `tiny_http` response
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn html(body: &str) -> Self {
        Self { status: 200, content_type: "text/html; charset=utf-8", body: body.to_string() }
    }

    fn json<T: Serialize>(status: u16, payload: &ApiResponse<T>) -> Self {
        let body = serde_json::to_string(payload)
            .unwrap_or_else(|e| format!(r#"{{"ok":false,"data":null,"error":"{}","needs_key":false}}"#, e));
        Self { status, content_type: "application/json", body }
    }

    fn not_found() -> Self {
        Self { status: 404, content_type: "text/plain", body: "Not found".to_string() }
    }

    fn bad_request(error: impl std::fmt::Display) -> Self {
        Self::json(400, &ApiResponse::<()>::failure(format!("Invalid request: {}", error)))
    }
}

/// State shared by every request the server handles
pub struct App<C: ClassificationService, S: ChartSurface> {
    service: C,
    store: Box<dyn CredentialStore>,
    analyzer: VideoAnalyzer<S>,
    panels: Panels,
    backdrop: Arc<Mutex<Backdrop>>,
}

impl<C: ClassificationService, S: ChartSurface> App<C, S> {
    pub fn new(
        service: C,
        store: Box<dyn CredentialStore>,
        analyzer: VideoAnalyzer<S>,
        backdrop: Arc<Mutex<Backdrop>>,
    ) -> Self {
        Self { service, store, analyzer, panels: Panels::default(), backdrop }
    }

    pub fn analyzer(&self) -> &VideoAnalyzer<S> {
        &self.analyzer
    }

    /// Dispatch one request. `url` may carry a query string.
    pub fn route(&mut self, method: &Method, url: &str, body: &str) -> Reply {
        let path = url.split('?').next().unwrap_or("/");
        let query = url.split('?').nth(1).unwrap_or("");

        match (method, path) {
            // Serve embedded UI
            (&Method::Get, "/") => Reply::html(UI_HTML),

            (&Method::Post, "/api/predict") => match serde_json::from_str::<PredictRequest>(body) {
                Ok(req) => self.predict(&req.comment),
                Err(e) => Reply::bad_request(e),
            },

            (&Method::Post, "/api/analyze") => match serde_json::from_str::<AnalyzeParams>(body) {
                Ok(params) => self.analyze(params),
                Err(e) => Reply::bad_request(e),
            },

            (&Method::Get, "/api/key") => {
                let cached = matches!(self.store.load(API_KEY_SLOT), Ok(Some(k)) if !k.is_empty());
                Reply::json(200, &ApiResponse::success(KeyStatus { cached }))
            }

            (&Method::Post, "/api/key") => match serde_json::from_str::<KeyParams>(body) {
                Ok(params) => self.save_key(params.api_key.trim()),
                Err(e) => Reply::bad_request(e),
            },

            (&Method::Delete, "/api/key") => match self.store.remove(API_KEY_SLOT) {
                Ok(_) => Reply::json(200, &ApiResponse::success(KeyStatus { cached: false })),
                Err(e) => Reply::json(500, &ApiResponse::<()>::failure(e.to_string())),
            },

            (&Method::Post, "/api/panel") => match serde_json::from_str::<PanelParams>(body) {
                Ok(params) => {
                    self.panels.toggle(params.panel);
                    let panel = self.panels.get(params.panel);
                    Reply::json(
                        200,
                        &ApiResponse::success(PanelState {
                            panel: panel.id,
                            element_id: panel.id.element_id(),
                            shown: panel.shown,
                            aria_expanded: panel.aria_expanded(),
                        }),
                    )
                }
                Err(e) => Reply::bad_request(e),
            },

            (&Method::Get, "/api/backdrop") => {
                let query = serde_urlencoded::from_str::<BackdropQuery>(query).unwrap_or_default();
                self.backdrop_frame(query)
            }

            // 404
            _ => Reply::not_found(),
        }
    }

    fn predict(&self, comment: &str) -> Reply {
        let mut screen = CapturedScreen::new();
        let outcome = CommentPredictor::new(&self.service).run(&mut screen, comment);

        match outcome {
            Outcome::Done(()) => {
                let prediction = Prediction {
                    topic: screen.text(Output::Topic).unwrap_or_default().to_string(),
                    sentiment: screen.text(Output::Sentiment).unwrap_or_default().to_string(),
                };
                Reply::json(200, &ApiResponse::success(prediction))
            }
            Outcome::Blocked => {
                let alert = screen.alerts.last().cloned().unwrap_or_default();
                Reply::json(200, &ApiResponse::<()>::failure(alert))
            }
            Outcome::Failed(_) => {
                // Shown in the topic output, "Error: ..."
                let shown = screen.text(Output::Topic).unwrap_or_default().to_string();
                Reply::json(200, &ApiResponse::<()>::failure(shown))
            }
        }
    }

    fn analyze(&mut self, params: AnalyzeParams) -> Reply {
        let supplied = params.api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
        // A blank URL is alerted by the flow before any key is looked at
        let url_given = !params.url.trim().is_empty();
        if let Some(key) = supplied.as_deref().filter(|_| url_given) {
            if let Err(e) = self.store.save(API_KEY_SLOT, key) {
                warn!("could not cache API key: {}", e);
            }
        }

        // The page collects the key itself; a supplied key answers the prompt
        let mut screen = CapturedScreen::new().with_prompt_answer(supplied);
        let outcome = self.analyzer.run(&self.service, self.store.as_ref(), &mut screen, &params.url);

        match outcome {
            Outcome::Done(view) => {
                debug!("{} live charts", self.analyzer.charts().live_slots());
                Reply::json(200, &ApiResponse::success(view))
            }
            Outcome::Blocked => {
                let alert = screen.alerts.last().cloned().unwrap_or_default();
                let mut response = ApiResponse::<()>::failure(alert.clone());
                response.needs_key = alert == ALERT_API_KEY_REQUIRED;
                Reply::json(200, &response)
            }
            Outcome::Failed(message) => {
                let banner = screen.failure.unwrap_or(message);
                Reply::json(200, &ApiResponse::<()>::failure(banner))
            }
        }
    }

    fn save_key(&self, key: &str) -> Reply {
        if key.is_empty() {
            let mut response = ApiResponse::<()>::failure(ALERT_API_KEY_REQUIRED);
            response.needs_key = true;
            return Reply::json(200, &response);
        }
        match self.store.save(API_KEY_SLOT, key) {
            Ok(()) => Reply::json(200, &ApiResponse::success(KeyStatus { cached: true })),
            Err(e) => Reply::json(500, &ApiResponse::<()>::failure(e.to_string())),
        }
    }

    fn backdrop_frame(&self, query: BackdropQuery) -> Reply {
        let too_big = |side: Option<u32>| side.is_some_and(|s| s > MAX_SIDE);
        if too_big(query.width) || too_big(query.height) {
            return Reply::bad_request(format!("viewport larger than {} pixels", MAX_SIDE));
        }

        let mut backdrop = match self.backdrop.lock() {
            Ok(b) => b,
            Err(_) => return Reply::json(500, &ApiResponse::<()>::failure("backdrop unavailable")),
        };

        let (width, height) = backdrop.size();
        let wanted = (query.width.unwrap_or(width), query.height.unwrap_or(height));
        if wanted != (width, height) && wanted.0 > 0 && wanted.1 > 0 {
            backdrop.resize(wanted.0, wanted.1);
        }

        let (width, height) = backdrop.size();
        let frame = BackdropFrame {
            width,
            height,
            hidden: backdrop.hidden_layer(),
            layers: backdrop
                .layers()
                .iter()
                .map(|layer| LayerFrame {
                    opacity: layer.opacity,
                    fade_ms: layer.fade.as_millis() as u64,
                    svg: layer.pattern.to_svg(1.0),
                })
                .collect(),
        };
        Reply::json(200, &ApiResponse::success(frame))
    }
}

/// Start server, open browser, serve UI
pub fn start(port: u16, config: Config, open_browser: bool) -> io::Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    let service = HttpService::new(config.server.clone())
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    let db = Database::open_at(&config.db_path)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    let seed = chrono::Utc::now().timestamp_millis() as u64;
    let backdrop = Arc::new(Mutex::new(Backdrop::new(INITIAL_BACKDROP.0, INITIAL_BACKDROP.1, seed)));
    let timer = BackdropTimer::start(Arc::clone(&backdrop), REPAINT_PERIOD);

    let url = format!("http://localhost:{}", port);

    eprintln!("\n\x1b[1;32mcommentlens\x1b[0m");
    eprintln!("   {}", url);
    eprintln!("   Service: {}\n", config.server);

    let analyzer = VideoAnalyzer::new(config, ChartRegistry::new());
    let mut app = App::new(service, Box::new(db), analyzer, backdrop);

    if open_browser {
        if let Err(e) = open::that(&url) {
            warn!("could not open browser: {}", e);
        }
    }

    // Handle requests
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(&mut app, request) {
            eprintln!("Error: {}", e);
        }
    }

    timer.stop();
    Ok(())
}

fn handle_request<C, S>(app: &mut App<C, S>, mut request: Request) -> io::Result<()>
where
    C: ClassificationService,
    S: ChartSurface,
{
    let method = request.method().clone();
    let url = request.url().to_string();

    let mut body = String::new();
    if method != Method::Get {
        request.as_reader().read_to_string(&mut body)?;
    }

    info!("{} {}", method, url);
    let reply = app.route(&method, &url, &body);

    let header = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "invalid content type"))?;
    let response = Response::from_string(reply.body)
        .with_status_code(reply.status)
        .with_header(header);
    request.respond(response)
}
