mod check;
mod run;
mod sites;

use anyhow::Result;

use crate::cli::{Cli, Commands};
use crate::driver;

pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            listen,
            interval,
            timeout,
            wake_timeout,
            max_attempts,
            retry_delay,
            wake_selectors,
        } => {
            let (factory, browser) =
                driver::resolve_factory(cli.cdp_endpoint.as_deref(), cli.launch).await?;
            run::execute(run::RunOptions {
                sites: cli.sites,
                listen,
                interval,
                timeout,
                wake_timeout,
                max_attempts,
                retry_delay,
                wake_selectors,
                factory,
                browser,
            })
            .await
        }
        Commands::Check {
            url,
            timeout,
            wake_timeout,
        } => {
            let (factory, _browser) =
                driver::resolve_factory(cli.cdp_endpoint.as_deref(), cli.launch).await?;
            check::execute(&url, timeout, wake_timeout, factory).await
        }
        Commands::Sites => sites::execute(&cli.sites),
    }
}
