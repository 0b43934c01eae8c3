use std::{future::IntoFuture, process, sync::Arc};

use serde::de::DeserializeOwned;
use sqlx::postgres::PgPool;
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use vitrine::{
    application::{
        content::ContentService,
        error::AppError,
        repos::ContentSource,
        resolver::ContentResolver,
        revalidate::RevalidationService,
        sitemap::SitemapService,
        syndication::{SiteProfile, SyndicationService},
    },
    cache::{MemoCache, ResponseCache, VideoPreloadCache},
    config,
    domain::entities::{BlogRecord, ContentRecord, ProjectRecord, WorkRecord},
    infra::{
        backend::{BackendClient, BackendSource},
        db::{self, PostgresSource},
        error::InfraError,
        http::{self, HttpState},
        seed,
        static_content::{self, StaticSource},
        tables::ContentTable,
        telemetry,
        video::HttpVideoLoader,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Validate => run_validate(),
        config::Command::Seed(args) => run_seed(settings, args.dry_run).await,
    }
}

fn run_validate() -> Result<(), AppError> {
    let summary = static_content::validate_embedded()?;
    info!(
        blogs = summary.blogs,
        projects = summary.projects,
        "static content is valid"
    );
    Ok(())
}

async fn run_seed(settings: config::Settings, dry_run: bool) -> Result<(), AppError> {
    let client = if dry_run {
        None
    } else {
        let url = settings.backend.url.as_ref().ok_or_else(|| {
            AppError::from(InfraError::configuration("backend.url is required for seeding"))
        })?;
        let key = settings.backend.service_role_key.as_deref().ok_or_else(|| {
            AppError::from(InfraError::configuration(
                "backend.service_role_key is required for seeding",
            ))
        })?;
        Some(
            BackendClient::new(url, key, settings.backend.request_timeout)
                .map_err(|err| AppError::from(InfraError::backend(err.to_string())))?,
        )
    };

    let summary = seed::seed_backend(client.as_ref())
        .await
        .map_err(|err| AppError::from(InfraError::backend(err.to_string())))?;
    info!(
        blogs = summary.blogs,
        projects = summary.projects,
        dry_run,
        "seed finished"
    );
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let pool = init_database(&settings).await?;
    let state = build_http_state(&settings, pool)?;
    let router = http::build_router(state);
    serve_http(&settings, router).await
}

async fn init_database(settings: &config::Settings) -> Result<Option<PgPool>, AppError> {
    let Some(url) = settings.database.url.as_deref() else {
        info!("database not configured, relational source disabled");
        return Ok(None);
    };

    let pool = db::connect_lazy(url, settings.database.max_connections.get())
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    // An unreachable database only degrades reads; the resolver falls through.
    if let Err(err) = db::run_migrations(&pool).await {
        warn!(error = %err, "database migrations did not run");
    }

    Ok(Some(pool))
}

fn build_http_state(settings: &config::Settings, pool: Option<PgPool>) -> Result<HttpState, AppError> {
    let memo = Arc::new(MemoCache::new());
    let responses = Arc::new(ResponseCache::new(
        settings.cache.response_limit,
        settings.cache.content_ttl,
    ));

    let backend = match (settings.backend.url.as_ref(), settings.backend.anon_key.as_deref()) {
        (Some(url), Some(key)) => Some(Arc::new(
            BackendClient::new(url, key, settings.backend.request_timeout)
                .map_err(|err| AppError::from(InfraError::backend(err.to_string())))?,
        )),
        _ => {
            info!("backend not configured, hosted source disabled");
            None
        }
    };

    let ttl = settings.cache.content_ttl;

    let blogs = ContentResolver::new(vec![
        live::<BlogRecord>(&backend, &memo, ttl),
        relational::<BlogRecord>(&pool),
        embedded(static_content::blog_source()),
    ]);
    let projects = ContentResolver::new(vec![
        live::<ProjectRecord>(&backend, &memo, ttl),
        relational::<ProjectRecord>(&pool),
        embedded(static_content::project_source()),
    ]);
    let works = ContentResolver::new(vec![
        live::<WorkRecord>(&backend, &memo, ttl),
        relational::<WorkRecord>(&pool),
    ]);
    info!(
        blogs = ?blogs.source_names(),
        projects = ?projects.source_names(),
        works = ?works.source_names(),
        "content sources in priority order"
    );

    let loader = HttpVideoLoader::new(settings.backend.request_timeout, settings.cache.video_max_bytes)
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;
    let videos = Arc::new(VideoPreloadCache::new(
        Arc::new(loader),
        settings.cache.video_capacity,
    ));

    let content =
        ContentService::new(blogs, projects, works).with_video_warming(Arc::clone(&videos));
    let site = SiteProfile {
        public_url: settings.site.public_url.to_string(),
        title: settings.site.title.clone(),
        description: settings.site.description.clone(),
    };

    Ok(HttpState {
        syndication: SyndicationService::new(content.clone(), site.clone()),
        sitemap: SitemapService::new(content.clone(), site),
        revalidation: RevalidationService::new(
            memo,
            Arc::clone(&responses),
            settings.revalidate.secret.clone(),
        ),
        content,
        videos,
        responses,
    })
}

fn live<T: ContentTable>(
    backend: &Option<Arc<BackendClient>>,
    memo: &Arc<MemoCache>,
    ttl: std::time::Duration,
) -> Arc<dyn ContentSource<T>> {
    Arc::new(BackendSource::<T>::new(backend.clone(), Arc::clone(memo), ttl))
}

fn relational<T: ContentTable>(pool: &Option<PgPool>) -> Arc<dyn ContentSource<T>> {
    Arc::new(PostgresSource::<T>::new(pool.clone()))
}

fn embedded<T>(source: StaticSource<T>) -> Arc<dyn ContentSource<T>>
where
    T: ContentRecord + DeserializeOwned,
{
    Arc::new(source)
}

async fn serve_http(settings: &config::Settings, router: axum::Router) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.public_addr, "vitrine listening");

    let signalled = Arc::new(Notify::new());
    let trigger = Arc::clone(&signalled);
    let mut server = Box::pin(
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                trigger.notify_one();
            })
            .into_future(),
    );

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = signalled.notified() => {
            info!("shutdown signal received, draining connections");
            match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
                Ok(result) => {
                    result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
                }
                Err(_) => warn!("graceful shutdown timed out"),
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
