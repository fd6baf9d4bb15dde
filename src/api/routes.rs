use actix_web::{get, post, web, HttpResponse, Responder, Result as WebResult};

use crate::api::error::ApiError;
use crate::api::models::{HealthResponse, QueryRequest, QueryResponse, SessionRequest, SessionResponse};
use crate::concierge::{ConciergeError, SessionOutcome};
use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");
const TERMINAL_JS: &str = include_str!("../../static/terminal.js");

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

#[get("/terminal.js")]
pub async fn terminal_script() -> impl Responder {
    HttpResponse::Ok()
        .content_type("application/javascript; charset=utf-8")
        .body(TERMINAL_JS)
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "OK".to_string(),
        message: "OSINT Terminal is running!".to_string(),
    })
}

#[post("/session")]
pub async fn report_session(
    state: web::Data<AppState>,
    req: web::Json<SessionRequest>,
) -> WebResult<HttpResponse, ApiError> {
    let visitor = req.into_inner().into_visitor();

    let message = match state.concierge.record_session(visitor).await {
        Ok(SessionOutcome::NotPersisted) => Some("No database configured".to_string()),
        Ok(SessionOutcome::Recorded | SessionOutcome::Swallowed) => None,
        Err(_) => return Err(ApiError::Session),
    };

    Ok(HttpResponse::Ok().json(SessionResponse {
        success: true,
        message,
    }))
}

#[post("/query")]
pub async fn query(
    state: web::Data<AppState>,
    req: web::Json<QueryRequest>,
) -> WebResult<HttpResponse, ApiError> {
    let req = req.into_inner();

    match state.concierge.answer(req.visitor_id, &req.prompt).await {
        Ok(answer) => Ok(HttpResponse::Ok().json(QueryResponse { answer })),
        Err(ConciergeError::UnknownVisitor(_)) => Err(ApiError::UnknownVisitor),
        Err(_) => Err(ApiError::Query),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::MalformedPayload(err.to_string()).into()),
    )
    .service(index)
    .service(terminal_script)
    .service(health)
    .service(report_session)
    .service(query);
}
