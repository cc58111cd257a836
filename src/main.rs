use agenda_vendas::clock::SystemClock;
use agenda_vendas::config::AppConfig;
use agenda_vendas::db::{init_db, Database};
use agenda_vendas::notify::{BrevoNotifier, LogNotifier, Notifier};
use agenda_vendas::responses::error_to_response;
use agenda_vendas::router::handle;
use agenda_vendas::scheduling::Scheduler;
use anyhow::Context;
use astra::Server;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    let db = Database::new(config.database_path.clone());
    init_db(&db).context("Database initialization failed")?;

    let notifier: Arc<dyn Notifier> = match &config.brevo {
        Some(brevo) => {
            info!(recipient = %brevo.notify_email, "sending notifications through Brevo");
            Arc::new(BrevoNotifier::new(
                brevo.api_key.clone(),
                brevo.sender_email.clone(),
                brevo.sender_name.clone(),
                brevo.notify_email.clone(),
            ))
        }
        None => Arc::new(LogNotifier),
    };

    let scheduler = Arc::new(Scheduler::new(
        db,
        Arc::new(SystemClock),
        notifier,
        config.policy.clone(),
    ));

    if config.sweep_interval_secs > 0 {
        let sweeper = Arc::clone(&scheduler);
        let interval = Duration::from_secs(config.sweep_interval_secs);
        thread::Builder::new()
            .name("hold-sweep".into())
            .spawn(move || loop {
                thread::sleep(interval);
                if let Err(e) = sweeper.sweep_expired() {
                    error!("hold sweep failed: {e}");
                }
            })
            .context("Failed to start the sweep thread")?;
        info!(every_secs = config.sweep_interval_secs, "hold sweep scheduled");
    }

    info!(addr = %config.bind_addr, workers = config.workers, "starting server");

    let server = Server::bind(&config.bind_addr).max_workers(config.workers);
    server
        .serve(move |req, _info| match handle(req, &scheduler) {
            Ok(resp) => resp,
            Err(err) => error_to_response(err),
        })
        .context("Server ended with error")?;

    info!("server shut down cleanly");
    Ok(())
}
