use anyhow::{Context, Result};
use clap::Parser;
use motorguard::{config::ConfigLoader, crypto, db, repositories::UserRepository};

/// Replace stored plaintext passwords with Argon2 hashes.
#[derive(Debug, Parser)]
#[command(name = "rehash-plaintext-passwords")]
struct Args {
    /// Only list the affected accounts
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loader = ConfigLoader::new();
    let config = loader.load().context("loading configuration")?;

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;

    let users = UserRepository::new(&db);
    let legacy = users
        .find_with_plaintext_passwords()
        .await
        .context("querying users")?;

    if args.dry_run {
        for user in &legacy {
            println!("{}\t{}", user.id, user.email);
        }
        println!(
            "{} account(s) store a plaintext password (dry run, nothing changed).",
            legacy.len()
        );
        return Ok(());
    }

    let mut updated_count = 0usize;
    for user in legacy {
        let hash = crypto::hash_password(&user.password_hash)
            .with_context(|| format!("hashing password for user {}", user.id))?;
        users
            .update_password_hash(user.id, hash)
            .await
            .with_context(|| format!("updating user {}", user.id))?;
        updated_count += 1;
    }

    println!(
        "Re-hashed {} account(s) that stored a plaintext password.",
        updated_count
    );

    Ok(())
}
