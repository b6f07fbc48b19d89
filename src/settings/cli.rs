use super::Parser;

#[derive(Parser, Debug)]
#[command(about = "Session authentication service")]
pub struct Cli {
    /// Path to a TOML settings file; defaults to settings/dev.toml or
    /// settings/release.toml depending on the build.
    #[arg(long)]
    pub settings: Option<String>,
}
