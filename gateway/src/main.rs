// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::Result;
use shaken_common::logging;
use shaken_gateway::{config::Config, startup::Application};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Init Logging
    logging::init("info,axum=info");

    // 2. Load Config
    let config = Config::from_env()?;

    // 3. Build Application
    let app = Application::build(config).await?;

    // 4. Run
    app.run().await
}
