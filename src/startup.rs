use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::SessionService;
use crate::configuration::CookieSettings;
use crate::middleware::{AuthGuard, RequestLogger};
use crate::routes::{change_password, health_check, login, logout, me, refresh, register};

pub fn run(
    listener: TcpListener,
    sessions: SessionService,
    cookies: CookieSettings,
) -> Result<Server, std::io::Error> {
    let sessions = web::Data::new(sessions);
    let cookies = web::Data::new(cookies);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(RequestLogger)
            .app_data(sessions.clone())
            .app_data(cookies.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            // Routes behind a valid access token
            .service(
                web::scope("/api")
                    .wrap(AuthGuard::new(sessions.clone()))
                    .route("/me", web::get().to(me))
                    .route("/logout", web::post().to(logout))
                    .route("/change-password", web::post().to(change_password)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
