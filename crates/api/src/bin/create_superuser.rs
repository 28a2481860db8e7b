//! Bootstrap an administrator account in the configured PostgreSQL database.
//!
//! Field validators are skipped so operators can seed accounts that the
//! public registration endpoint would refuse; the password is still hashed.

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::Parser;

use penboard_auth::hash_password;
use penboard_infra::{AppConfig, BlogStore, PostgresBlogStore, StoreError, db};
use penboard_users::NewUser;

#[derive(Parser)]
#[command(name = "create-superuser", about = "Create an active staff + superuser account")]
struct Args {
    /// Login name.
    #[arg(long, default_value = "admin1")]
    username: String,
    /// Plaintext password (hashed before storage).
    #[arg(long, env = "SUPERUSER_PASSWORD")]
    password: String,
    #[arg(long, default_value = "admin1@mail.ru")]
    email: String,
    #[arg(long, default_value = "12")]
    phone_number: String,
    /// Birth date as YYYY-MM-DD.
    #[arg(long, default_value = "2003-01-01")]
    birth_date: NaiveDate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::from_env().context("invalid configuration")?;
    penboard_observability::init(config.log_format);

    let Some(database) = &config.database else {
        bail!("DATABASE_URL must be set to create a superuser");
    };

    let pool = db::connect(database).await.context("failed to connect to PostgreSQL")?;
    let store = PostgresBlogStore::new(pool);
    store.migrate().await?;

    let password_hash = hash_password(&args.password)?;
    let user = NewUser {
        username: args.username,
        email: args.email,
        phone_number: args.phone_number,
        birth_date: args.birth_date,
        password_hash,
        is_staff: true,
        is_superuser: true,
        is_active: true,
    };

    match store.insert_user(user).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, username = %user.username, "superuser created");
            Ok(())
        }
        Err(StoreError::Duplicate { fields }) => bail!("a user with this {} already exists", fields.join(" / ")),
        Err(e) => Err(e.into()),
    }
}
