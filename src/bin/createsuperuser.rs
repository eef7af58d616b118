use bcrypt::hash;
use dotenvy::dotenv;
use letterbox::config::AppConfig;
use letterbox::models::auth::NewUser;
use letterbox::store::{PgStore, Store, StoreError};
use letterbox::validators::{validate_email, validate_new_password, validate_username};
use letterbox::db;
use std::io::{self, Write};

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🛡️  Letterbox - Create Superuser");
    println!("==========================================");

    // Load environment variables
    dotenv().ok();
    let config = AppConfig::from_env()?;

    let database_url = match config.database_url.as_deref() {
        Some(url) => url.to_string(),
        None => {
            eprintln!("❌ DATABASE_URL must be set in .env file");
            return Ok(());
        }
    };

    let pool = db::create_pool(&config, &database_url).await?;
    let store = PgStore::new(pool.clone());

    let username = prompt("Username: ")?;
    if let Err(e) = validate_username(&username) {
        eprintln!("❌ {}", e);
        return Ok(());
    }

    if store.user_by_username(&username).await?.is_some() {
        eprintln!("❌ User with this username already exists");
        return Ok(());
    }

    let email = prompt("Email address (optional): ")?;
    if let Err(e) = validate_email(&email) {
        eprintln!("❌ {}", e);
        return Ok(());
    }

    print!("Password: ");
    io::stdout().flush()?;
    let password = rpassword::read_password()?;

    print!("Password (again): ");
    io::stdout().flush()?;
    let password_confirm = rpassword::read_password()?;

    let problems = validate_new_password(&password, &password_confirm, &username);
    if !problems.is_empty() {
        for problem in problems {
            eprintln!("❌ {}", problem);
        }
        return Ok(());
    }

    let password_hash = hash(&password, config.bcrypt_cost)?;

    let result = store
        .create_user(NewUser {
            username,
            email,
            password_hash,
            is_staff: true,
            is_superuser: true,
        })
        .await;

    match result {
        Ok(user) => {
            println!();
            println!("✅ Superuser created successfully!");
            println!("   ID: {}", user.id);
            println!("   Username: {}", user.username);
            println!("   Email: {}", user.email);
            println!();
            println!("🌐 You can now access the admin page at: http://{}/admin/", config.bind_addr);
        }
        Err(StoreError::Conflict(message)) => eprintln!("❌ {}", message),
        Err(e) => eprintln!("❌ Failed to create superuser: {}", e),
    }

    pool.close().await;
    Ok(())
}
