// src/main.rs

mod app_state;
mod auth;
mod bid;
mod chat;
mod config;
mod db;
mod invite;
mod models;
mod profile;
mod project;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_cors::Cors;
use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http,
    middleware::Logger,
    web, App, Error, HttpMessage, HttpResponse, HttpServer,
};
use env_logger::Env;
use futures::future::{ok, Ready};

use crate::app_state::AppState;
use crate::auth::{login, signup};
use crate::bid::{accept_bid, create_bid, decline_bid, get_bids};
use crate::chat::start_chat;
use crate::invite::create_invite;
use crate::profile::{
    delete_profile, get_all_users, get_profile, get_public_profile, update_profile,
};
use crate::project::{create_project, get_project_with_bids, list_projects};

#[derive(Debug)]
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware { service })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        // Decode "Bearer <token>" into the caller's user id. Routes that
        // need auth check extensions for it; public routes pass through.
        if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
            if let Ok(auth_str) = auth_header.to_str() {
                if auth_str.starts_with("Bearer ") {
                    let token = auth_str.trim_start_matches("Bearer ").trim();
                    let secret = req
                        .app_data::<web::Data<AppState>>()
                        .map(|data| data.config.jwt_secret.clone())
                        .unwrap_or_default();
                    match auth::decode_user_id(token, &secret) {
                        Ok(user_id) => {
                            req.extensions_mut().insert(user_id);
                        }
                        Err(e) => {
                            let (req_parts, _payload) = req.into_parts();
                            let resp = HttpResponse::Unauthorized()
                                .body(format!("Invalid token: {}", e))
                                .map_into_boxed_body();
                            let srv_resp = ServiceResponse::new(req_parts, resp);
                            return Box::pin(async move { Ok(srv_resp) });
                        }
                    }
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env();
    let mongodb = Arc::new(db::MongoDB::init(&config.mongo_uri, &config.database_name).await);
    let frontend_origin = config.frontend_origin.clone();

    println!("Server running at http://0.0.0.0:8080");
    println!("Allowed CORS Origin: {}", frontend_origin);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Authentication)
            .app_data(web::Data::new(AppState {
                mongodb: mongodb.clone(),
                config: config.clone(),
            }))
            .service(
                web::scope("/auth")
                    .route("/signup", web::post().to(signup))
                    .route("/login", web::post().to(login)),
            )
            // USERS
            .service(
                web::scope("/users")
                    .route("/profile", web::get().to(get_profile))
                    .route("/update-profile", web::put().to(update_profile))
                    .route("/profile", web::delete().to(delete_profile))
                    .route("/profile/{id}", web::get().to(get_public_profile))
                    .route("/all-users", web::get().to(get_all_users)),
            )
            // CHATS
            .service(web::scope("/chats").route("/start", web::post().to(start_chat)))
            // PROJECTS, BIDS, INVITES
            // Literal segments are registered before {id} so the capture
            // cannot shadow /projects/bids and /projects/invites.
            .service(
                web::scope("/projects")
                    .route("/bids", web::post().to(create_bid))
                    .route("/bids", web::get().to(get_bids))
                    .route("/bids/{bid_id}/accept", web::put().to(accept_bid))
                    .route("/bids/{bid_id}/decline", web::put().to(decline_bid))
                    .route("/invites", web::post().to(create_invite))
                    .route("", web::post().to(create_project))
                    .route("", web::get().to(list_projects))
                    .route("/{id}", web::get().to(get_project_with_bids)),
            )
    })
    .bind("0.0.0.0:8080")?
    .run()
    .await
}
