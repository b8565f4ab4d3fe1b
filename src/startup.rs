use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{SessionManager, UserDirectory};
use crate::configuration::SessionSettings;
use crate::logger::RequestLogger;
use crate::middleware::{AuthBoundary, PublicRoutes};
use crate::routes::{exchange, health_check, login, logout, me, refresh, revoke_sessions};

/// Everything the HTTP layer shares across workers
#[derive(Clone)]
pub struct AppState {
    pub session: SessionManager,
    pub directory: Arc<dyn UserDirectory>,
    pub session_settings: SessionSettings,
    pub public_routes: PublicRoutes,
}

pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let codec = state.session.codec().clone();
    let public_routes = state.public_routes;
    let session = web::Data::new(state.session);
    let directory: web::Data<dyn UserDirectory> = web::Data::from(state.directory);
    let session_settings = web::Data::new(state.session_settings);

    let server = HttpServer::new(move || {
        App::new()
            // Innermost first: the boundary runs before any handler and the
            // loggers see the identity it attached.
            .wrap(AuthBoundary::new(codec.clone(), public_routes.clone()))
            .wrap(RequestLogger)
            .wrap(Logger::default())

            // Shared state
            .app_data(session.clone())
            .app_data(directory.clone())
            .app_data(session_settings.clone())

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/exchange", web::post().to(exchange))
                    .route("/logout", web::post().to(logout))
                    .route("/me", web::get().to(me))
                    .route("/sessions", web::delete().to(revoke_sessions)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
