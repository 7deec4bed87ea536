use std::{future::IntoFuture, process, sync::Arc};

use docshelf::{
    application::{documents::DocumentService, error::AppError, repos::DocumentsRepo},
    cache::{CacheConfig, CacheConsumer, CacheTrigger, DocumentCache, EventQueue},
    config,
    infra::{
        error::InfraError,
        files::LocalFileStore,
        http::{self, HttpState},
        memory::InMemoryRepositories,
        telemetry,
    },
};
use tokio::{sync::Notify, task::JoinHandle};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

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
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = Arc::new(InMemoryRepositories::new(settings.storage.users.clone()));
    let app = build_application_context(repositories, &settings)?;

    let consumer_handle = app
        .cache_trigger
        .as_ref()
        .map(|trigger| Arc::clone(trigger.consumer()).spawn());

    let result = serve_http(&settings, app.http_state).await;

    if let Some(trigger) = &app.cache_trigger {
        // Apply invalidations published by the last requests before exiting.
        trigger.flush().await;
    }
    if let Some(handle) = consumer_handle {
        handle.abort();
        let _ = handle.await;
    }

    result
}

struct ApplicationContext {
    http_state: HttpState,
    cache_trigger: Option<Arc<CacheTrigger>>,
}

fn build_application_context(
    repositories: Arc<InMemoryRepositories>,
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let documents_repo: Arc<dyn DocumentsRepo> = repositories;
    let files = LocalFileStore::new(&settings.storage.upload_dir).map_err(InfraError::from)?;
    let upload_dir = settings.storage.upload_dir.to_string_lossy().into_owned();
    let mut documents =
        DocumentService::new(documents_repo, upload_dir).with_file_store(Arc::new(files));

    let cache_config = CacheConfig::from(&settings.cache);
    let cache_trigger = if cache_config.is_enabled() {
        let store = Arc::new(DocumentCache::new());
        let queue = Arc::new(EventQueue::new());
        let consumer = Arc::new(CacheConsumer::new(
            cache_config.clone(),
            store.clone(),
            queue.clone(),
        ));
        let trigger = Arc::new(CacheTrigger::new(cache_config.clone(), queue, consumer));

        documents = documents
            .with_cache(store, cache_config.ttl())
            .with_cache_trigger(trigger.clone());
        Some(trigger)
    } else {
        info!("Document cache disabled");
        None
    };

    Ok(ApplicationContext {
        http_state: HttpState {
            documents: Arc::new(documents),
        },
        cache_trigger,
    })
}

async fn serve_http(settings: &config::Settings, http_state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(http_state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::bind(settings.server.addr, err)))?;

    info!(addr = %settings.server.addr, "HTTP server listening");

    let shutdown = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .into_future();
    let mut deadline = grace_deadline(shutdown, settings.server.graceful_shutdown);

    tokio::select! {
        result = server => {
            deadline.abort();
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = &mut deadline => {
            warn!(
                grace_ms = settings.server.graceful_shutdown.as_millis() as u64,
                "Graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: Arc<Notify>) {
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    shutdown.notify_one();
}

fn grace_deadline(shutdown: Arc<Notify>, grace: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        shutdown.notified().await;
        tokio::time::sleep(grace).await;
    })
}
