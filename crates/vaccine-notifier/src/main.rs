//! Main entry point for the vaccine availability notifier.
//! Parses the configuration, wires the CoWIN client to the email notifier and polls until
//! a fatal error or Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use slot_scan::{
    CowinClient, EmailService, MockEmailService, NotificationServiceImpl, ScanExecutor,
    ScanExecutorConfig, SmtpEmailService,
};

mod cli;
use cli::{Cli, Delivery};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Cli::parse()
        .into_settings(chrono::Local::now().date_naive())
        .context("Invalid configuration")?;

    log::info!("🚀 Starting vaccine availability notifier...");
    log::info!(
        "🔍 Looking for dose {:?} for age {} from {}",
        settings.criteria.dose,
        settings.criteria.age,
        settings.criteria.api_date()
    );

    let client = Arc::new(
        CowinClient::new(settings.api_base_url.clone()).context("Failed to create API client")?,
    );

    let (recipient, email_service): (String, Arc<dyn EmailService>) = match settings.delivery {
        Delivery::Log { recipient } => {
            log::info!("📝 Dry run: reports will be logged, not emailed");
            let service: Arc<dyn EmailService> = Arc::new(MockEmailService);
            (recipient, service)
        }
        Delivery::Smtp {
            host,
            email,
            password,
        } => {
            let service: Arc<dyn EmailService> = Arc::new(
                SmtpEmailService::new(&host, &email, &password)
                    .context("Failed to set up email delivery")?,
            );
            log::info!("📧 Notifications will be sent to {} via {}", email, host);
            (email, service)
        }
    };

    let notification_service = Arc::new(NotificationServiceImpl::new(&recipient, email_service));

    let executor = ScanExecutor::new(
        client,
        settings.location,
        settings.criteria,
        notification_service,
        Some(ScanExecutorConfig {
            poll_interval: settings.interval,
        }),
    )
    .context("Invalid search configuration")?;

    tokio::select! {
        result = executor.start() => {
            result.context("Availability search stopped")?;
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("👋 Received interrupt, shutting down");
        }
    }

    Ok(())
}
