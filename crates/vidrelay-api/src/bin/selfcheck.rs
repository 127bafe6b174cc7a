use std::path::Path;
use std::process::Command;

use vidrelay_api::ApiConfig;
use vidrelay_dataset::DatasetConfig;
use vidrelay_pipeline::PipelineConfig;
use vidrelay_webdriver::WebDriverClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let api = ApiConfig::from_env();
    let dataset = DatasetConfig::from_env();
    let pipeline = PipelineConfig::from_env();

    println!(
        "vidrelay-selfcheck: starting with upload_dir={} mirror_dir={}",
        api.upload_dir.display(),
        dataset.mirror_dir.display()
    );
    ensure_dir(&api.upload_dir).await?;
    report("upload_dir");
    ensure_dir(&dataset.mirror_dir).await?;
    report("mirror_dir");
    ensure_cli(&dataset.cli)?;
    report("dataset_cli");
    ensure_env_present(&["AUTH_JWT_SECRET"])?;
    report("env");
    pipeline.validate()?;
    report("notebook_config");
    ensure_webdriver(&pipeline.webdriver_url).await?;
    report("webdriver");

    println!("vidrelay-selfcheck: ok");
    Ok(())
}

fn report(check: &str) {
    println!("{}", check_line(check));
}

fn check_line(check: &str) -> String {
    format!("vidrelay-selfcheck: {} ok", check)
}

async fn ensure_dir(path: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {}", path.display(), e))?;
    Ok(())
}

fn ensure_cli(cli: &str) -> anyhow::Result<()> {
    let output = Command::new(cli)
        .arg("--version")
        .output()
        .map_err(|e| anyhow::anyhow!("{} not available: {}", cli, e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "{} --version failed: {:?}",
            cli,
            output.status
        ));
    }
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).map(|v| v.is_empty()).unwrap_or(true) {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}

async fn ensure_webdriver(url: &str) -> anyhow::Result<()> {
    let status = WebDriverClient::new(url)?.status().await?;
    if !status.ready {
        return Err(anyhow::anyhow!(
            "webdriver at {} is not ready: {}",
            url,
            status.message
        ));
    }
    Ok(())
}
