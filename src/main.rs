use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::time::Duration;

use carspot::config::Config;
use carspot::db::{create_pool, init_db, queries, AppState};
use carspot::handlers;
use carspot::ledger;
use carspot::models::{CreateCar, CreatePaymentPlan, PlanType};
use carspot::webhooks::discord::DiscordClient;
use carspot::webhooks::processor;

#[derive(Parser, Debug)]
#[command(name = "carspot")]
#[command(about = "Server-side API for the CarSpot vehicle marketplace")]
struct Cli {
    /// Seed the database with dev data (plans, users, a dealer, cars)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,

    /// Drain one batch of pending webhook events and exit (cron entry point)
    #[arg(long)]
    process_webhooks: bool,
}

/// Seeds the database with dev data for local testing: the three catalog
/// plans, a private seller, a dealer with an account, and a small vehicle
/// catalog. Only runs in dev mode and when the catalog is empty.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let existing = queries::list_active_plans(&conn).expect("Failed to check plans");
    if !existing.is_empty() {
        tracing::info!("Payment plans already exist, skipping seed");
        return;
    }

    for plan in [
        CreatePaymentPlan {
            name: "Standard Listing".to_string(),
            plan_type: PlanType::Listing,
            price: 1_500,
            duration_days: Some(14),
            duration_hours: None,
        },
        CreatePaymentPlan {
            name: "Featured Placement".to_string(),
            plan_type: PlanType::Featured,
            price: 5_000,
            duration_days: None,
            duration_hours: Some(24),
        },
        CreatePaymentPlan {
            name: "Dealer Monthly".to_string(),
            plan_type: PlanType::Membership,
            price: 25_000,
            duration_days: Some(30),
            duration_hours: None,
        },
    ] {
        queries::create_payment_plan(&conn, &plan).expect("Failed to seed payment plan");
    }

    let seller = queries::create_user(&conn, "Dev Seller", None).expect("Failed to seed user");
    let dealer_user =
        queries::create_user(&conn, "Dev Dealer", Some("devdealer#0001")).expect("Failed to seed user");
    let dealer = queries::create_dealer_account(&conn, &dealer_user.id, "Dev Motors")
        .expect("Failed to seed dealer account");

    let make = queries::create_car_make(&conn, "bmw", "BMW").expect("Failed to seed make");
    let model =
        queries::create_car_model(&conn, &make.id, "m3", "M3").expect("Failed to seed model");

    for (seller_id, dealer_id, price) in [
        (seller.id.clone(), None, 45_000),
        (dealer_user.id.clone(), Some(dealer.id.clone()), 52_000),
    ] {
        queries::create_car(
            &conn,
            &CreateCar {
                seller_id,
                dealer_id,
                make_id: make.id.clone(),
                model_id: model.id.clone(),
                price,
            },
        )
        .expect("Failed to seed car");
    }

    tracing::info!("Dev data seeded (seller {}, dealer {})", seller.id, dealer.id);
}

/// Spawns the background queue drain: claims and delivers pending webhook
/// events on an interval. Failures are logged; the task never dies.
fn spawn_webhook_processor(state: AppState, poll_secs: u64) {
    let client = DiscordClient::new(state.http.clone());

    // `process_pending` holds a `rusqlite::Connection` (which is `!Sync`)
    // across an `.await`, so its future is `!Send` and cannot go through
    // `tokio::spawn`. Drive the identical loop on a dedicated thread via
    // `block_on`, which imposes no `Send` bound while still using the main
    // runtime's IO/time drivers.
    let handle = tokio::runtime::Handle::current();
    std::thread::spawn(move || {
        handle.block_on(async move {
            let interval = Duration::from_secs(poll_secs);

            loop {
                tokio::time::sleep(interval).await;

                let conn = match state.db.get() {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!("Failed to get db connection for webhook batch: {}", e);
                        continue;
                    }
                };

                if let Err(e) = processor::process_pending(
                    &conn,
                    &client,
                    state.webhook_batch_size,
                    state.webhook_max_attempts,
                )
                .await
                {
                    tracing::warn!("Webhook batch failed: {}", e);
                }
            }
        });
    });

    tracing::info!("Webhook processor started (runs every {}s)", poll_secs);
}

/// Spawns the expiry sweep: converges lapsed listings, featured flags and
/// memberships past their grace period. Runs every 5 minutes.
fn spawn_expiry_sweep(state: AppState) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(5 * 60);

        loop {
            tokio::time::sleep(interval).await;

            match state.db.get() {
                Ok(conn) => match ledger::run_expiry_sweep(&conn) {
                    Ok(summary)
                        if summary.expired_listings > 0
                            || summary.unfeatured_cars > 0
                            || summary.expired_memberships > 0 =>
                    {
                        tracing::debug!(
                            "Expiry sweep: {} listings expired, {} cars unfeatured, {} memberships expired",
                            summary.expired_listings,
                            summary.unfeatured_cars,
                            summary.expired_memberships
                        );
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Expiry sweep failed: {}", e),
                },
                Err(e) => tracing::warn!("Failed to get db connection for expiry sweep: {}", e),
            }
        }
    });

    tracing::info!("Expiry sweep task started (runs every 5 minutes)");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carspot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState {
        db: db_pool,
        http: reqwest::Client::new(),
        base_url: config.base_url.clone(),
        webhook_batch_size: config.webhook_batch_size,
        webhook_max_attempts: config.webhook_max_attempts,
        renewal_policy: config.renewal_policy,
        grace_period_days: config.grace_period_days,
    };

    // One-shot queue drain for cron, instead of the server.
    if cli.process_webhooks {
        let conn = state.db.get().expect("Failed to get connection");
        let client = DiscordClient::new(state.http.clone());
        match processor::process_pending(
            &conn,
            &client,
            state.webhook_batch_size,
            state.webhook_max_attempts,
        )
        .await
        {
            Ok(summary) => {
                println!(
                    "Processing complete: {} claimed, {} sent, {} failed, {} dead",
                    summary.claimed, summary.sent, summary.failed, summary.dead
                );
            }
            Err(e) => {
                eprintln!("Webhook processor failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set CARSPOT_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    spawn_webhook_processor(state.clone(), config.webhook_poll_secs);
    spawn_expiry_sweep(state.clone());

    let app: Router = handlers::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("CarSpot server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    if cleanup_on_exit {
        let db_path = &config.database_path;
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        }
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
