use bcrypt::{hash, DEFAULT_COST};
use dotenvy::dotenv;
use peoples_voice::config::AppConfig;
use peoples_voice::db;
use peoples_voice::error::StoreError;
use peoples_voice::models::auth::NewUser;
use peoples_voice::store::{AccountStore, PgStore};
use std::io::{self, Write};

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🗣️  People's Voice - Create User");
    println!("==========================================");

    dotenv().ok();
    let config = AppConfig::from_env()?;
    let pool = db::create_pool(&config).await?;
    let store = PgStore::new(pool.clone());

    let email = prompt("Email address: ")?.to_lowercase();
    if email.is_empty() || !email.contains('@') {
        eprintln!("❌ Invalid email address");
        return Ok(());
    }

    let display_name = prompt("Display name (optional): ")?;
    let display_name = (!display_name.is_empty()).then_some(display_name);

    print!("Password: ");
    io::stdout().flush()?;
    let password = rpassword::read_password()?;
    if password.len() < 6 {
        eprintln!("❌ Password must be at least 6 characters long");
        return Ok(());
    }

    print!("Password (again): ");
    io::stdout().flush()?;
    if password != rpassword::read_password()? {
        eprintln!("❌ Passwords don't match");
        return Ok(());
    }

    let password_hash = hash(&password, DEFAULT_COST)?;

    match store
        .create_user(NewUser {
            email,
            display_name,
            password_hash,
        })
        .await
    {
        Ok(user) => {
            println!();
            println!("✅ User created successfully!");
            println!("   ID: {}", user.id);
            println!("   Email: {}", user.email);
            println!(
                "   Display name: {}",
                user.display_name.as_deref().unwrap_or("(none)")
            );
        }
        Err(StoreError::Conflict(_)) => eprintln!("❌ A user with this email already exists"),
        Err(e) => eprintln!("❌ Failed to create user: {}", e),
    }

    pool.close().await;
    Ok(())
}
