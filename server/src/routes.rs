use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use taskflow_shared::{CreateTaskRequest, RenameTaskRequest, SuggestionRequest, UpdateTaskStatusRequest};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::repository::TaskRepository;
use crate::suggest::SuggestionService;

#[get("/tasks")]
async fn get_tasks(repo: web::Data<TaskRepository>) -> impl Responder {
    HttpResponse::Ok().json(repo.list().await)
}

#[post("/tasks")]
async fn create_task(
    repo: web::Data<TaskRepository>,
    body: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, RepositoryError> {
    let task = repo.create(&body.title, body.priority).await?;
    Ok(HttpResponse::Created().json(task))
}

#[patch("/tasks/{id}/status")]
async fn update_task_status(
    repo: web::Data<TaskRepository>,
    id: web::Path<Uuid>,
    body: web::Json<UpdateTaskStatusRequest>,
) -> Result<HttpResponse, RepositoryError> {
    let task = repo.set_completed(id.into_inner(), body.completed).await?;
    Ok(HttpResponse::Ok().json(task))
}

#[patch("/tasks/{id}/title")]
async fn rename_task(
    repo: web::Data<TaskRepository>,
    id: web::Path<Uuid>,
    body: web::Json<RenameTaskRequest>,
) -> Result<HttpResponse, RepositoryError> {
    let task = repo.rename(id.into_inner(), &body.title).await?;
    Ok(HttpResponse::Ok().json(task))
}

#[delete("/tasks/{id}")]
async fn delete_task(
    repo: web::Data<TaskRepository>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, RepositoryError> {
    repo.delete(id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/suggestions")]
async fn suggest(
    service: web::Data<SuggestionService>,
    body: web::Json<SuggestionRequest>,
) -> impl Responder {
    HttpResponse::Ok().json(service.suggest(&body.title).await)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_tasks)
        .service(create_task)
        .service(update_task_status)
        .service(rename_task)
        .service(delete_task)
        .service(suggest);
}
