//! The `runserver` management command.
//!
//! Serves every path through the render pipeline. `--host` and `--port`
//! override the configured bind address.

use async_trait::async_trait;
use pagewright_core::{PagewrightResult, Settings};
use pagewright_server::PagewrightApp;

use crate::command::ManagementCommand;

/// Starts the rendering server.
pub struct RunserverCommand;

impl RunserverCommand {
    /// Applies `--host` and `--port` to a copy of the settings.
    pub fn settings_with_overrides(matches: &clap::ArgMatches, settings: &Settings) -> Settings {
        let mut settings = settings.clone();
        if let Some(host) = matches.get_one::<String>("host") {
            settings.host.clone_from(host);
        }
        if let Some(port) = matches.get_one::<u16>("port") {
            settings.port = *port;
        }
        settings
    }
}

#[async_trait]
impl ManagementCommand for RunserverCommand {
    fn name(&self) -> &'static str {
        "runserver"
    }

    fn help(&self) -> &'static str {
        "Starts the rendering server"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("host")
                .long("host")
                .help("Host to bind to"),
        )
        .arg(
            clap::Arg::new("port")
                .long("port")
                .value_parser(clap::value_parser!(u16))
                .help("Port to bind to"),
        )
    }

    async fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> PagewrightResult<()> {
        let settings = Self::settings_with_overrides(matches, settings);
        let addr = settings.bind_addr();

        tracing::info!(
            site_url = %settings.site_url,
            template_dir = %settings.template_dir.display(),
            debug = settings.debug,
            "starting server"
        );

        PagewrightApp::from_settings(settings)?.run(&addr).await
    }
}
