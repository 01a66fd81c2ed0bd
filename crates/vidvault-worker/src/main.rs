//! Background worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vidvault_email::SmtpMailer;
use vidvault_media::ExtractorConfig;
use vidvault_models::THUMBNAIL_OFFSET_SECONDS;
use vidvault_queue::{JobQueue, Topic};
use vidvault_records::{RestRecordStore, ThumbnailRepository, VideoRepository};
use vidvault_storage::S3Store;
use vidvault_worker::{JobExecutor, ThumbnailPipeline, WorkerConfig, WorkerContext};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vidvault=info".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vidvault-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let queue = match JobQueue::from_env() {
        Ok(q) => Arc::new(q),
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = queue.init().await {
        error!("Failed to initialize job queue: {}", e);
        std::process::exit(1);
    }

    let store = match S3Store::from_env().await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to create object store: {}", e);
            std::process::exit(1);
        }
    };

    let records: Arc<dyn vidvault_records::RecordStore> = match RestRecordStore::from_env() {
        Ok(r) => Arc::new(r),
        Err(e) => {
            error!("Failed to create record store: {}", e);
            std::process::exit(1);
        }
    };

    let mailer = match SmtpMailer::from_env() {
        Ok(m) => Arc::new(m),
        Err(e) => {
            error!("Failed to create email sender: {}", e);
            std::process::exit(1);
        }
    };

    let extractor_config = match ExtractorConfig::resolve(THUMBNAIL_OFFSET_SECONDS) {
        Ok(c) => c.with_timeout(config.extractor_timeout),
        Err(e) => {
            error!("Failed to resolve frame extractor: {}", e);
            std::process::exit(1);
        }
    };

    let videos = VideoRepository::new(Arc::clone(&records));
    let thumbnails = ThumbnailRepository::new(Arc::clone(&records));
    let pipeline = ThumbnailPipeline::new(
        store,
        videos.clone(),
        thumbnails,
        extractor_config,
    );
    let ctx = Arc::new(WorkerContext::new(pipeline, mailer, videos));

    // Video processing runs one job at a time so videos finish in
    // enqueue order; email delivery runs wider.
    let video_executor = Arc::new(JobExecutor::new(
        Topic::VideoProcessing,
        1,
        config.clone(),
        Arc::clone(&queue),
        Arc::clone(&ctx),
    ));
    let email_executor = Arc::new(JobExecutor::new(
        Topic::EmailNotifications,
        config.email_concurrency,
        config.clone(),
        Arc::clone(&queue),
        Arc::clone(&ctx),
    ));

    let shutdown_video = Arc::clone(&video_executor);
    let shutdown_email = Arc::clone(&email_executor);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_video.shutdown();
        shutdown_email.shutdown();
    });

    let video_task = {
        let executor = Arc::clone(&video_executor);
        tokio::spawn(async move { executor.run().await })
    };
    let email_task = {
        let executor = Arc::clone(&email_executor);
        tokio::spawn(async move { executor.run().await })
    };

    for (name, task) in [("video", video_task), ("email", email_task)] {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("{} executor error: {}", name, e),
            Err(e) => error!("{} executor task panicked: {}", name, e),
        }
    }

    info!("Worker shutdown complete");
}
