use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::Row;
use tokio::net::TcpListener;
use tracing::{info, warn};
use utleie_backend_api::{build_router, AppState};
use utleie_config::load as load_config;
use utleie_database::{UserRepository, UserRole};
use utleie_runtime::{telemetry, BackendServices};

#[derive(Parser)]
#[command(name = "utleie-backend")]
#[command(about = "Enkel Utleie backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Dump users, units and agreements from the database
    DumpData,
    /// Seed the database with a demo landlord, tenant and unit
    SeedData,
    /// Backfill roles for unassigned users from a JSON email->role map
    MigrateRoles {
        /// Path to a JSON file: {"kari@example.com": "landlord", ...}
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::DumpData => dump_data().await,
        Commands::SeedData => seed_data().await,
        Commands::MigrateRoles { file } => migrate_roles(file).await,
    }
}

async fn run_server() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("starting Enkel Utleie backend");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let state = AppState::new(
        services.db_pool.clone(),
        services.authenticator.clone(),
        services.mailer.clone(),
        &config,
    );
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(utleie_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

async fn dump_data() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    println!("=== USERS ===");
    let users = sqlx::query(
        "SELECT id, public_id, email, display_name, role, status, created_at FROM users ORDER BY created_at ASC",
    )
    .fetch_all(&services.db_pool)
    .await
    .context("failed to fetch users")?;

    if users.is_empty() {
        println!("No users found in database");
    } else {
        println!(
            "{:<5} {:<26} {:<30} {:<24} {:<12} {:<10}",
            "ID", "Public ID", "Email", "Display Name", "Role", "Status"
        );
        println!("{}", "-".repeat(110));
        for user in users {
            let id: i64 = user.get("id");
            let public_id: String = user.get("public_id");
            let email: Option<String> = user.get("email");
            let display_name: Option<String> = user.get("display_name");
            let role: String = user.get("role");
            let status: String = user.get("status");
            println!(
                "{:<5} {:<26} {:<30} {:<24} {:<12} {:<10}",
                id,
                public_id,
                email.as_deref().unwrap_or("NULL"),
                display_name.as_deref().unwrap_or("NULL"),
                role,
                status
            );
        }
    }

    println!("\n=== RENTAL UNITS ===");
    let units = sqlx::query(
        "SELECT id, public_id, landlord_id, tenant_id, name, address, status, monthly_rent_ore FROM rental_units ORDER BY created_at ASC",
    )
    .fetch_all(&services.db_pool)
    .await
    .context("failed to fetch rental units")?;

    if units.is_empty() {
        println!("No units found in database");
    } else {
        println!(
            "{:<5} {:<26} {:<10} {:<10} {:<24} {:<30} {:<20} {:<12}",
            "ID", "Public ID", "Landlord", "Tenant", "Name", "Address", "Status", "Rent (øre)"
        );
        println!("{}", "-".repeat(140));
        for unit in units {
            let id: i64 = unit.get("id");
            let public_id: String = unit.get("public_id");
            let landlord_id: i64 = unit.get("landlord_id");
            let tenant_id: Option<i64> = unit.get("tenant_id");
            let name: String = unit.get("name");
            let address: String = unit.get("address");
            let status: String = unit.get("status");
            let rent: i64 = unit.get("monthly_rent_ore");
            println!(
                "{:<5} {:<26} {:<10} {:<10} {:<24} {:<30} {:<20} {:<12}",
                id,
                public_id,
                landlord_id,
                tenant_id.map(|id| id.to_string()).unwrap_or("NULL".to_string()),
                name,
                address,
                status,
                rent
            );
        }
    }

    println!("\n=== RENTAL AGREEMENTS ===");
    let agreements = sqlx::query(
        "SELECT id, public_id, unit_id, landlord_id, tenant_id, status, landlord_signed, tenant_signed FROM rental_agreements ORDER BY created_at ASC",
    )
    .fetch_all(&services.db_pool)
    .await
    .context("failed to fetch agreements")?;

    if agreements.is_empty() {
        println!("No agreements found in database");
    } else {
        println!(
            "{:<5} {:<26} {:<8} {:<10} {:<10} {:<16} {:<10} {:<10}",
            "ID", "Public ID", "Unit", "Landlord", "Tenant", "Status", "L-signed", "T-signed"
        );
        println!("{}", "-".repeat(100));
        for agreement in agreements {
            let id: i64 = agreement.get("id");
            let public_id: String = agreement.get("public_id");
            let unit_id: i64 = agreement.get("unit_id");
            let landlord_id: i64 = agreement.get("landlord_id");
            let tenant_id: i64 = agreement.get("tenant_id");
            let status: String = agreement.get("status");
            let landlord_signed: bool = agreement.get("landlord_signed");
            let tenant_signed: bool = agreement.get("tenant_signed");
            println!(
                "{:<5} {:<26} {:<8} {:<10} {:<10} {:<16} {:<10} {:<10}",
                id, public_id, unit_id, landlord_id, tenant_id, status, landlord_signed, tenant_signed
            );
        }
    }

    Ok(())
}

async fn seed_data() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("seeding database with demo data");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let users = UserRepository::new(services.db_pool.clone());

    let (landlord, _) = services
        .authenticator
        .register_with_password("utleier@example.com", "demo-passord", Some("Kari Utleier"))
        .await
        .context("failed to seed landlord")?;
    users.set_role(landlord.id, UserRole::Landlord).await?;

    let (tenant, _) = services
        .authenticator
        .register_with_password("leietaker@example.com", "demo-passord", Some("Ola Leietaker"))
        .await
        .context("failed to seed tenant")?;
    users.set_role(tenant.id, UserRole::Tenant).await?;

    let now = chrono_now();
    let public_id = utleie_database::new_public_id();
    let unit_id = sqlx::query(
        r#"
        INSERT INTO rental_units
            (public_id, landlord_id, name, address, postal_code, city, status,
             monthly_rent_ore, deposit_ore, furnished, letting_kind, rooms, created_at, updated_at)
        VALUES (?, ?, 'Sokkelleilighet', 'Storgata 1', '0155', 'Oslo', 'vacant',
                1200000, 3600000, true, 'secondary', '[]', ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(landlord.id)
    .bind(&now)
    .bind(&now)
    .execute(&services.db_pool)
    .await
    .context("failed to seed unit")?
    .last_insert_rowid();

    sqlx::query(
        "INSERT INTO unit_landlords (unit_id, user_id, role, ownership_percent, joined_at) VALUES (?, ?, 'owner', 100, ?)",
    )
    .bind(unit_id)
    .bind(landlord.id)
    .bind(&now)
    .execute(&services.db_pool)
    .await
    .context("failed to seed unit ownership")?;

    println!("Database seeded with demo data:");
    println!("- landlord utleier@example.com (password: demo-passord)");
    println!("- tenant leietaker@example.com (password: demo-passord)");
    println!("- unit 'Sokkelleilighet' ({public_id})");
    println!("Run 'dump-data' to see the inserted data");

    Ok(())
}

async fn migrate_roles(file: PathBuf) -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let raw = std::fs::read_to_string(&file)
        .with_context(|| format!("failed to read role map {}", file.display()))?;
    let role_map: HashMap<String, String> =
        serde_json::from_str(&raw).context("role map must be a JSON object of email -> role")?;

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let users = UserRepository::new(services.db_pool.clone());

    let mut migrated = 0usize;
    let mut skipped = 0usize;

    for (email, role_name) in role_map {
        let role = match role_name.as_str() {
            "landlord" => UserRole::Landlord,
            "tenant" => UserRole::Tenant,
            "admin" => UserRole::Admin,
            other => {
                warn!(email, role = other, "unknown role in map, skipping");
                skipped += 1;
                continue;
            }
        };

        let Some(user) = users.find_by_email(&email).await? else {
            warn!(email, "no such user, skipping");
            skipped += 1;
            continue;
        };

        if user.role != UserRole::Unassigned {
            // Locked roles stay locked; the backfill only fills gaps.
            skipped += 1;
            continue;
        }

        users.set_role(user.id, role).await?;
        migrated += 1;
    }

    println!("Role migration complete: {migrated} migrated, {skipped} skipped");
    Ok(())
}

fn chrono_now() -> String {
    sqlx::types::chrono::Utc::now().to_rfc3339()
}
