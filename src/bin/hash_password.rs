//! Prints an Argon2 PHC string for the `user_credential.password_hash` column.
//!
//! $ cargo run --bin hash_password -- --password 'correct-horse'

use clap::Parser;
use voyage::application_impl::Argon2PasswordHasher;
use voyage::application_port::CredentialHasher;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let hasher = Argon2PasswordHasher;

    let hash = hasher.hash_password(&args.password).await?;
    if !hasher.verify_password(&args.password, &hash).await? {
        return Err(anyhow::anyhow!("freshly computed hash did not verify"));
    }

    println!("{}", hash);
    Ok(())
}
