use std::{future::IntoFuture, path::Path, process, sync::Arc, time::Duration};

use sagoma::{
    application::{
        error::AppError,
        messages::{RenderRequest, ReplyStatus},
        service::{ServiceOptions, TemplateService},
    },
    config,
    domain::RenderData,
    infra::{
        engine::HandlebarsEngine,
        error::InfraError,
        http::{self, HttpState},
        source::FsTemplateSource,
        telemetry,
    },
};
use tokio::sync::watch;
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
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(settings, args).await,
    }
}

fn start_service(settings: &config::Settings) -> Result<TemplateService, AppError> {
    let root = &settings.templates.root;
    if !root.is_dir() {
        return Err(InfraError::configuration(format!(
            "template root `{}` is not a directory",
            root.display()
        ))
        .into());
    }

    let source = Arc::new(FsTemplateSource::new(root.clone()));
    let engine = Arc::new(HandlebarsEngine::new(settings.templates.strict));
    Ok(TemplateService::start(
        ServiceOptions::from(settings),
        source,
        engine,
    ))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let service = start_service(&settings)?;
    let router = http::build_router(HttpState {
        router: service.router(),
    });

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(
        target = "sagoma::serve",
        addr = %settings.server.addr,
        templates = %settings.templates.root.display(),
        "Listening"
    );

    let result = serve_until_signal(listener, router, settings.server.graceful_shutdown).await;
    service.shutdown().await;
    result
}

async fn serve_until_signal(
    listener: tokio::net::TcpListener,
    router: axum::Router,
    grace: Duration,
) -> Result<(), AppError> {
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = stop_rx.changed().await;
        })
        .into_future();
    let mut server = std::pin::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!(target = "sagoma::serve", "Shutdown signal received");
            let _ = stop_tx.send(true);
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => {
                    result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
                }
                Err(_) => warn!(
                    target = "sagoma::serve",
                    grace_secs = grace.as_secs(),
                    "Graceful shutdown timed out"
                ),
            }
        }
    }

    Ok(())
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let data = read_render_data(args.data.as_deref(), args.data_file.as_deref()).await?;
    let service = start_service(&settings)?;

    let reply = service
        .router()
        .render(RenderRequest::new(args.template_id.clone(), data))
        .await;
    service.shutdown().await;

    match (reply.status, reply.output) {
        (ReplyStatus::Ok, Some(output)) => {
            println!("{output}");
            Ok(())
        }
        _ => Err(AppError::Render {
            template_id: args.template_id,
            kind: reply.failure.map(|kind| kind.as_str()).unwrap_or("unknown"),
            message: reply.message.unwrap_or_default(),
        }),
    }
}

async fn read_render_data(
    inline: Option<&str>,
    file: Option<&Path>,
) -> Result<RenderData, AppError> {
    let text = match (inline, file) {
        (Some(inline), _) => inline.to_owned(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .map_err(InfraError::from)?,
        (None, None) => return Ok(RenderData::new()),
    };

    serde_json::from_str(&text)
        .map_err(|err| AppError::validation(format!("render data must be a JSON object: {err}")))
}
