use anyhow::Result;
use flotilla::cli::start;

#[tokio::main]
async fn main() -> Result<()> {
    let action = start::start()?;

    action.execute().await
}
