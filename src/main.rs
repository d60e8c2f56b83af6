use anyhow::Result;
use paper_annotator::config::{Config, CONFIG_FILE};
use paper_annotator::utils::logging;
use paper_annotator::App;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load(CONFIG_FILE)?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let _stats = App::initialize(config).await?.run().await?;

    Ok(())
}
