use actix_web::{get, post, web, HttpResponse, Result as WebResult};

use crate::api::models::PaginationQuery;
use crate::chat::{TurnEngine, TurnError, TurnRequest};
use crate::db::{service::DbService, DbPool};

#[post("/turn")]
pub async fn run_turn(
    engine: web::Data<TurnEngine>,
    req: web::Json<TurnRequest>,
) -> WebResult<HttpResponse> {
    match engine.run_turn(req.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e @ TurnError::InvalidInstruction) | Err(e @ TurnError::MissingData) => {
            Ok(HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()})))
        }
        Err(e @ TurnError::Synthesis(_)) => {
            Ok(HttpResponse::BadGateway().json(serde_json::json!({"error": e.to_string()})))
        }
    }
}

#[get("/{session_id}/history")]
pub async fn get_history(
    pool: web::Data<DbPool>,
    session_id: web::Path<String>,
    query: web::Query<PaginationQuery>,
) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();

    match DbService::list_actions(&conn, &session_id, query.limit, query.offset) {
        Ok(actions) => Ok(HttpResponse::Ok().json(actions)),
        Err(e) => Ok(HttpResponse::InternalServerError().body(e.to_string())),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/chat").service(run_turn).service(get_history));
}
